//! PS/2 host and device emulation over two bit-banged open-drain lines.
//!
//! The engine can act as the keyboard (device), as the computer (host), or
//! sit between a real pair and report what goes over the wire:
//!
//! ```ignore
//! let bus = PinBus::new(clk, dat, delay, timer);
//! let mut port = Ps2Port::new(bus)?;
//! if port.handshake().is_ok() {
//!     port.device_write(0x1C)?; // 'A' make code
//! }
//! ```

#![cfg_attr(not(test), no_std)]

extern crate embedded_hal as hal;

pub mod bus;
pub mod device;
pub mod frame;
pub mod handshake;
pub mod host;
pub mod iopin;
pub mod monitor;
pub mod timing;

pub use bus::{Bus, Level, Line, Microseconds, PinBus};
pub use device::Device;
pub use frame::{Frame, FrameDecoder, ParityError};
pub use handshake::Command;
pub use host::Host;
pub use monitor::Direction;
pub use timing::{Cancel, Config, Never};

/// Numeric result codes, for callers that report status as an integer.
pub mod codes {
    pub const SUCCESS: i8 = 0;
    pub const PARITY: i8 = -1;
    /// reserved for host inhibition violations
    pub const INHIBIT: i8 = -2;
    pub const TIMEOUT: i8 = -3;
    pub const CANCELLED: i8 = -4;
    pub const PIN_FAULT: i8 = -5;
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error<E> {
    /// received parity bit does not match the data bits
    #[error("parity mismatch")]
    Parity,
    /// host pulled the clock low while the device was sending.
    /// Reserved: no operation detects inhibition yet.
    #[error("transmission inhibited by host")]
    Inhibit,
    /// a bounded wait ran out
    #[error("timed out waiting for the bus")]
    Timeout,
    #[error("wait cancelled")]
    Cancelled,
    #[error("line fault: {0:?}")]
    Pin(E),
}

impl<E> Error<E> {
    pub fn code(&self) -> i8 {
        match self {
            Error::Parity => codes::PARITY,
            Error::Inhibit => codes::INHIBIT,
            Error::Timeout => codes::TIMEOUT,
            Error::Cancelled => codes::CANCELLED,
            Error::Pin(_) => codes::PIN_FAULT,
        }
    }
}

impl<E> From<ParityError> for Error<E> {
    fn from(_: ParityError) -> Self {
        Error::Parity
    }
}

/// Maps an operation outcome to its numeric code.
pub fn result_code<T, E>(result: &Result<T, Error<E>>) -> i8 {
    match result {
        Ok(_) => codes::SUCCESS,
        Err(error) => error.code(),
    }
}

/// Byte level transfer in one role, host or device.
pub trait Transfer {
    type PinError;

    /// receives one frame sent by the other side
    fn read(&mut self) -> Result<u8, Error<Self::PinError>>;
    /// sends one frame to the other side
    fn write(&mut self, data: u8) -> Result<(), Error<Self::PinError>>;

    fn write_many(&mut self, data: &[u8]) -> Result<(), Error<Self::PinError>> {
        for d in data {
            self.write(*d)?;
        }
        Ok(())
    }

    /// fills the buffer with bytes coming from the other side
    fn read_many(&mut self, buffer: &mut [u8]) -> Result<(), Error<Self::PinError>> {
        for d in buffer.iter_mut() {
            *d = self.read()?;
        }
        Ok(())
    }
}

/// The protocol engine, bound to a line pair.
///
/// Every operation takes `&mut self`, so only one exchange can be on the
/// wire at a time. The engine keeps no protocol state between calls.
pub struct Ps2Port<B, C = Never>
where
    B: Bus,
    C: Cancel,
{
    bus: B,
    config: Config,
    cancel: C,
}

impl<B> Ps2Port<B, Never>
where
    B: Bus,
{
    /// Takes the bus with the default timing (40us cell) and releases both lines.
    pub fn new(bus: B) -> Result<Self, Error<B::Error>> {
        Self::with_config(bus, Config::default())
    }

    pub fn with_config(bus: B, config: Config) -> Result<Self, Error<B::Error>> {
        let mut port = Ps2Port {
            bus,
            config,
            cancel: Never,
        };
        port.release(Line::Clock)?;
        port.release(Line::Data)?;
        Ok(port)
    }
}

impl<B, C> Ps2Port<B, C>
where
    B: Bus,
    C: Cancel,
{
    /// Aborts any wait of this port once `cancel` fires.
    pub fn with_cancel<T: Cancel>(self, cancel: T) -> Ps2Port<B, T> {
        Ps2Port {
            bus: self.bus,
            config: self.config,
            cancel,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// gives back the bus
    pub fn free(self) -> B {
        self.bus
    }

    pub(crate) fn level(&mut self, line: Line) -> Result<Level, Error<B::Error>> {
        self.bus.level(line).map_err(Error::Pin)
    }

    pub(crate) fn drive_low(&mut self, line: Line) -> Result<(), Error<B::Error>> {
        self.bus.drive_low(line).map_err(Error::Pin)
    }

    pub(crate) fn release(&mut self, line: Line) -> Result<(), Error<B::Error>> {
        self.bus.release(line).map_err(Error::Pin)
    }

    /// puts a bit on a line: 1 releases it, 0 pulls it low
    pub(crate) fn drive(&mut self, line: Line, bit: bool) -> Result<(), Error<B::Error>> {
        if bit {
            self.release(line)
        } else {
            self.drive_low(line)
        }
    }
}
