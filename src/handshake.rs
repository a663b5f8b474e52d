//! Power-on handshake of a keyboard with its host.
//!
//! The keyboard announces a passed self test, then acknowledges every host
//! command until the host enables scanning. Only the commands a BIOS or OS
//! sends during enumeration are understood, and their arguments are
//! acknowledged without being acted upon.

use log::{debug, warn};

use crate::bus::{Bus, Level, Line};
use crate::timing::Cancel;
use crate::{Error, Ps2Port, Transfer};

/// sent once after power-on
pub const SELF_TEST_PASSED: u8 = 0xAA;
/// reply to every command byte
pub const ACK: u8 = 0xFA;
/// identity of a standard MF2 keyboard
pub const KEYBOARD_ID: [u8; 2] = [0xAB, 0x83];

/// Host commands recognized during the handshake.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// argument byte of a two byte command (LEDs, typematic)
    Argument,
    SetLeds,
    ReadId,
    SetTypematic,
    Enable,
}

impl Command {
    pub fn from_byte(code: u8) -> Option<Command> {
        match code {
            0x00 => Some(Command::Argument),
            0xED => Some(Command::SetLeds),
            0xF2 => Some(Command::ReadId),
            0xF3 => Some(Command::SetTypematic),
            0xF4 => Some(Command::Enable),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Command::Argument => 0x00,
            Command::SetLeds => 0xED,
            Command::ReadId => 0xF2,
            Command::SetTypematic => 0xF3,
            Command::Enable => 0xF4,
        }
    }
}

impl<B, C> Ps2Port<B, C>
where
    B: Bus,
    C: Cancel,
{
    /// Plays the keyboard side of the power-on handshake.
    ///
    /// Returns `Ok` once the host enables scanning, `Error::Timeout` if the
    /// host stays silent for longer than `Config::request_window_us`.
    /// A command that fails parity is still acknowledged, then skipped.
    pub fn handshake(&mut self) -> Result<(), Error<B::Error>> {
        self.device_write(SELF_TEST_PASSED)?;

        let window = self.config.request_window_us;
        while self.watch_for(Line::Data, Level::Low, window)? {
            let code = match self.device_read() {
                Ok(code) => Some(code),
                Err(Error::Parity) => {
                    warn!("handshake: corrupted command skipped");
                    None
                }
                Err(error) => return Err(error),
            };
            self.device_write(ACK)?;

            let code = match code {
                Some(code) => code,
                None => continue,
            };
            match Command::from_byte(code) {
                Some(Command::ReadId) => {
                    debug!("handshake: identify");
                    self.device().write_many(&KEYBOARD_ID)?;
                }
                Some(Command::Enable) => {
                    debug!("handshake: enabled");
                    return Ok(());
                }
                Some(command) => debug!("handshake: {:?} acknowledged", command),
                None => debug!("handshake: ignoring {:#04x}", code),
            }
        }

        warn!("handshake: no request from host within {}us", window);
        Err(Error::Timeout)
    }
}
