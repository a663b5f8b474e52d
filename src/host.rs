//! Host side of the bus: the device owns the clock, the host follows it.

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
    /// Reads a frame clocked out by a device.
    ///
    /// Data is sampled while the device holds the clock low. Blocks until the
    /// device finishes the frame, or until `Config::edge_timeout_us` expires
    /// on a single edge.
    pub fn host_read(&mut self) -> Result<u8, Error<B::Error>> {
        let mut decoder = FrameDecoder::new();
        let data = loop {
            self.wait_while(Line::Clock, Level::High)?;
            let bit = match decoder.state() {
                // the start bit is clocked through without looking at it
                DecodeState::AwaitStart => false,
                _ => self.level(Line::Data)?.is_high(),
            };
            match decoder.push(bit) {
                Ok(Some(data)) => break data,
                Ok(None) => {}
                Err(error) => {
                    warn!(
                        "host read: parity mismatch on {:#04x} (parity bit {})",
                        error.data, error.observed as u8
                    );
                    return Err(error.into());
                }
            }
            self.wait_while(Line::Clock, Level::Low)?;
        };
        self.wait_while(Line::Clock, Level::Low)?;

        // stop bit
        self.wait_while(Line::Clock, Level::High)?;
        self.wait_while(Line::Clock, Level::Low)?;

        trace!("host read {:#04x}", data);
        Ok(data)
    }

    /// Sends a byte to the device.
    ///
    /// Inhibits the device by holding the clock low, requests to send by
    /// pulling data low, then lets the device clock the bits in. The
    /// device's acknowledgment pulse is consumed but not checked.
    pub fn host_write(&mut self, data: u8) -> Result<(), Error<B::Error>> {
        self.drive_low(Line::Clock)?;
        let inhibit = self.config.inhibit_us;
        self.delay_us(inhibit);
        self.drive_low(Line::Data)?;
        self.release(Line::Clock)?;

        // the request to send already put the start bit on the wire
        for bit in Frame::new(data).bits().skip(1) {
            self.wait_while(Line::Clock, Level::High)?;
            self.drive(Line::Data, bit)?;
            self.wait_while(Line::Clock, Level::Low)?;
        }

        // ack
        self.wait_while(Line::Clock, Level::High)?;
        self.wait_while(Line::Clock, Level::Low)?;

        trace!("host wrote {:#04x}", data);
        Ok(())
    }

    /// This port in the host role.
    pub fn host(&mut self) -> Host<'_, B, C> {
        Host { port: self }
    }
}

/// Host role view of a port.
pub struct Host<'a, B, C>
where
    B: Bus,
    C: Cancel,
{
    port: &'a mut Ps2Port<B, C>,
}

impl<B, C> Transfer for Host<'_, B, C>
where
    B: Bus,
    C: Cancel,
{
    type PinError = B::Error;

    fn read(&mut self) -> Result<u8, Error<B::Error>> {
        self.port.host_read()
    }

    fn write(&mut self, data: u8) -> Result<(), Error<B::Error>> {
        self.port.host_write(data)
    }
}
