//! Bus timing, bounded waits and cancellation.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::bus::{Bus, Level, Line};
use crate::{Error, Ps2Port};

/// Timing parameters of a port. All values are in microseconds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// half of one clock period; 40us gives a ~12.5kHz clock
    pub cell_us: u16,
    /// how long the host holds the clock low before requesting to send
    pub inhibit_us: u16,
    /// pause after the device releases the data line following an ack,
    /// weak pull-ups need time to bring it back high
    pub release_settle_us: u16,
    /// how long the handshake waits for the host to request to send
    pub request_window_us: u32,
    /// limit for a single wait on a line; `None` waits forever
    pub edge_timeout_us: Option<u32>,
}

impl Config {
    pub const fn new(cell_us: u16) -> Self {
        Config {
            cell_us,
            inhibit_us: 100,
            release_settle_us: 100,
            request_window_us: 5000,
            edge_timeout_us: None,
        }
    }

    pub const fn with_inhibit(mut self, inhibit_us: u16) -> Self {
        self.inhibit_us = inhibit_us;
        self
    }

    pub const fn with_release_settle(mut self, release_settle_us: u16) -> Self {
        self.release_settle_us = release_settle_us;
        self
    }

    pub const fn with_request_window(mut self, request_window_us: u32) -> Self {
        self.request_window_us = request_window_us;
        self
    }

    pub const fn with_edge_timeout(mut self, edge_timeout_us: Option<u32>) -> Self {
        self.edge_timeout_us = edge_timeout_us;
        self
    }

    pub fn half_cell_us(&self) -> u16 {
        self.cell_us / 2
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(40)
    }
}

/// Source of cancellation, polled while the port waits on a line.
pub trait Cancel {
    fn is_cancelled(&self) -> bool;
}

/// Never cancels.
#[derive(Copy, Clone, Debug, Default)]
pub struct Never;

impl Cancel for Never {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Set the flag (e.g. from an interrupt handler) to abort the current wait.
impl Cancel for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<T> Cancel for &T
where
    T: Cancel + ?Sized,
{
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

impl<B, C> Ps2Port<B, C>
where
    B: Bus,
    C: Cancel,
{
    /// Spins while `line` reads `level`, bounded by `Config::edge_timeout_us`.
    pub(crate) fn wait_while(&mut self, line: Line, level: Level) -> Result<(), Error<B::Error>> {
        let limit = self.config.edge_timeout_us;
        self.wait_while_within(line, level, limit)
    }

    pub(crate) fn wait_while_within(
        &mut self,
        line: Line,
        level: Level,
        limit_us: Option<u32>,
    ) -> Result<(), Error<B::Error>> {
        let start = self.bus.now_us();
        loop {
            if self.level(line)? != level {
                return Ok(());
            }
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if let Some(limit) = limit_us {
                if self.bus.now_us().wrapping_sub(start) >= limit {
                    return Err(Error::Timeout);
                }
            }
        }
    }

    /// Reports whether `line` reaches `level` within `window_us`.
    pub(crate) fn watch_for(
        &mut self,
        line: Line,
        level: Level,
        window_us: u32,
    ) -> Result<bool, Error<B::Error>> {
        let other = match level {
            Level::High => Level::Low,
            Level::Low => Level::High,
        };
        match self.wait_while_within(line, other, Some(window_us)) {
            Ok(()) => Ok(true),
            Err(Error::Timeout) => Ok(false),
            Err(error) => Err(error),
        }
    }

    pub(crate) fn delay_us(&mut self, us: u16) {
        self.bus.delay_us(us);
    }

    pub(crate) fn half_cell(&mut self) {
        let half = self.config.half_cell_us();
        self.bus.delay_us(half);
    }

    /// One clock pulse generated by this side: low for a cell, then released.
    pub(crate) fn pulse_clock(&mut self) -> Result<(), Error<B::Error>> {
        self.drive_low(Line::Clock)?;
        let cell = self.config.cell_us;
        self.bus.delay_us(cell);
        self.release(Line::Clock)
    }

    /// A full self-clocked bit period: half cell, pulse, half cell.
    pub(crate) fn clock_cell(&mut self) -> Result<(), Error<B::Error>> {
        self.half_cell();
        self.pulse_clock()?;
        self.half_cell();
        Ok(())
    }
}
