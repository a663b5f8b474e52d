//! Passive classification of the next frame on the bus.

use log::trace;

use crate::bus::{Bus, Level, Line};
use crate::timing::Cancel;
use crate::{Error, Ps2Port};

/// Who is sending the frame `listen` picked up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    /// device clocking a frame to the host (code 0)
    DeviceToHost,
    /// host sending to the device after inhibiting it (code 1)
    HostToDevice,
    /// Never produced yet: the clock always reads either high or low when
    /// data falls. Kept for when inhibition is tracked.
    Unknown,
}

impl Direction {
    pub fn code(self) -> i8 {
        match self {
            Direction::DeviceToHost => 0,
            Direction::HostToDevice => 1,
            Direction::Unknown => -1,
        }
    }
}

impl<B, C> Ps2Port<B, C>
where
    B: Bus,
    C: Cancel,
{
    /// Waits for the next frame, tells who sends it and decodes it.
    ///
    /// When data falls while the clock is still released, a device has put
    /// its start bit out and is about to clock. When the clock is already low,
    /// the host inhibited the bus before requesting to send.
    ///
    /// The outer error means nothing was classified; once the direction is
    /// known it is reported together with the outcome of the decode.
    pub fn listen(&mut self) -> Result<(Direction, Result<u8, Error<B::Error>>), Error<B::Error>> {
        self.wait_while(Line::Data, Level::High)?;
        let direction = match self.level(Line::Clock)? {
            Level::High => Direction::DeviceToHost,
            Level::Low => Direction::HostToDevice,
        };
        trace!("listen: {:?} frame", direction);

        let data = match direction {
            Direction::DeviceToHost => self.host_read(),
            Direction::HostToDevice => self.device_read(),
            Direction::Unknown => Err(Error::Inhibit),
        };
        Ok((direction, data))
    }
}
