//! Device side of the bus. The device generates the clock in both
//! directions; the host only borrows it to announce that it wants to send.

use log::{trace, warn};

use crate::bus::{Bus, Level, Line};
use crate::frame::{DecodeState, Frame, FrameDecoder};
use crate::timing::Cancel;
use crate::{Error, Ps2Port, Transfer};

impl<B, C> Ps2Port<B, C>
where
    B: Bus,
    C: Cancel,
{
    /// Reads a frame the host has requested to send, clocking it in.
    ///
    /// Expects the host to have inhibited the bus and pulled data low; waits
    /// for the host to let go of the clock, then samples each bit while the
    /// clock is released and acknowledges the frame.
    pub fn device_read(&mut self) -> Result<u8, Error<B::Error>> {
        self.wait_while(Line::Data, Level::High)?;
        self.wait_while(Line::Clock, Level::Low)?;

        let mut decoder = FrameDecoder::new();
        let data = loop {
            let bit = match decoder.state() {
                DecodeState::AwaitStart => false,
                _ => self.level(Line::Data)?.is_high(),
            };
            let verified = match decoder.push(bit) {
                Ok(verified) => verified,
                Err(error) => {
                    warn!(
                        "device read: parity mismatch on {:#04x} (parity bit {})",
                        error.data, error.observed as u8
                    );
                    return Err(error.into());
                }
            };
            self.clock_cell()?;
            if let Some(data) = verified {
                break data;
            }
        };

        // ack: hold data low across one more clock pulse
        self.drive_low(Line::Data)?;
        self.half_cell();
        self.pulse_clock()?;
        self.release(Line::Data)?;
        let settle = self.config.release_settle_us;
        self.delay_us(settle);

        trace!("device read {:#04x}", data);
        Ok(data)
    }

    /// Clocks a byte out to the host. There is no acknowledgment in this
    /// direction, so nothing is checked.
    pub fn device_write(&mut self, data: u8) -> Result<(), Error<B::Error>> {
        for bit in Frame::new(data).bits() {
            self.drive(Line::Data, bit)?;
            self.clock_cell()?;
        }
        trace!("device wrote {:#04x}", data);
        Ok(())
    }

    /// This port in the device role.
    pub fn device(&mut self) -> Device<'_, B, C> {
        Device { port: self }
    }
}

/// Device role view of a port.
pub struct Device<'a, B, C>
where
    B: Bus,
    C: Cancel,
{
    port: &'a mut Ps2Port<B, C>,
}

impl<B, C> Transfer for Device<'_, B, C>
where
    B: Bus,
    C: Cancel,
{
    type PinError = B::Error;

    fn read(&mut self) -> Result<u8, Error<B::Error>> {
        self.port.device_read()
    }

    fn write(&mut self, data: u8) -> Result<(), Error<B::Error>> {
        self.port.device_write(data)
    }
}
