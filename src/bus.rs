//! Line pair capability used by the protocol engine.
//!
//! Both PS/2 lines are open-drain: a participant either pulls a line low or
//! releases it and lets the external pull-up bring it high. It can never
//! force a line high.

use hal::blocking::delay::DelayUs;
use hal::digital::v2::{InputPin, OutputPin};

/// One of the two bus signals.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Line {
    Clock,
    Data,
}

/// Observed or requested level of a line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Level {
    /// actively driven low by some participant
    Low,
    /// released, pulled up externally
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }

    pub fn is_low(self) -> bool {
        self == Level::Low
    }
}

impl From<bool> for Level {
    fn from(bit: bool) -> Level {
        if bit {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> bool {
        level.is_high()
    }
}

/// Everything the engine needs from the hardware: the two lines plus time.
pub trait Bus {
    type Error;

    fn level(&mut self, line: Line) -> Result<Level, Self::Error>;
    fn drive_low(&mut self, line: Line) -> Result<(), Self::Error>;
    /// let the pull-up take the line high
    fn release(&mut self, line: Line) -> Result<(), Self::Error>;
    fn delay_us(&mut self, us: u16);
    /// monotonic microsecond counter, allowed to wrap
    fn now_us(&mut self) -> u32;
}

impl<B> Bus for &mut B
where
    B: Bus + ?Sized,
{
    type Error = B::Error;

    fn level(&mut self, line: Line) -> Result<Level, Self::Error> {
        (**self).level(line)
    }

    fn drive_low(&mut self, line: Line) -> Result<(), Self::Error> {
        (**self).drive_low(line)
    }

    fn release(&mut self, line: Line) -> Result<(), Self::Error> {
        (**self).release(line)
    }

    fn delay_us(&mut self, us: u16) {
        (**self).delay_us(us)
    }

    fn now_us(&mut self) -> u32 {
        (**self).now_us()
    }
}

/// A free running microsecond counter, e.g. a hardware timer or the
/// DWT cycle counter scaled to microseconds.
pub trait Microseconds {
    fn micros(&mut self) -> u32;
}

/// `Bus` built from two embedded_hal pins in open-drain mode.
///
/// Each pin must act as input and output at the same time (see `IOPin` for
/// combining two one directional pins). External pull-ups are required on
/// both lines.
pub struct PinBus<CLK, DAT, DELAY, TIMER> {
    clk: CLK,
    dat: DAT,
    delay: DELAY,
    timer: TIMER,
}

impl<CLK, DAT, DELAY, TIMER, E> PinBus<CLK, DAT, DELAY, TIMER>
where
    CLK: InputPin<Error = E> + OutputPin<Error = E>,
    DAT: InputPin<Error = E> + OutputPin<Error = E>,
    DELAY: DelayUs<u16>,
    TIMER: Microseconds,
{
    pub fn new(clk: CLK, dat: DAT, delay: DELAY, timer: TIMER) -> Self {
        PinBus {
            clk,
            dat,
            delay,
            timer,
        }
    }

    /// gives back the pins, the delay and the timer
    pub fn free(self) -> (CLK, DAT, DELAY, TIMER) {
        (self.clk, self.dat, self.delay, self.timer)
    }
}

impl<CLK, DAT, DELAY, TIMER, E> Bus for PinBus<CLK, DAT, DELAY, TIMER>
where
    CLK: InputPin<Error = E> + OutputPin<Error = E>,
    DAT: InputPin<Error = E> + OutputPin<Error = E>,
    DELAY: DelayUs<u16>,
    TIMER: Microseconds,
{
    type Error = E;

    fn level(&mut self, line: Line) -> Result<Level, E> {
        let high = match line {
            Line::Clock => InputPin::is_high(&self.clk)?,
            Line::Data => InputPin::is_high(&self.dat)?,
        };
        Ok(Level::from(high))
    }

    fn drive_low(&mut self, line: Line) -> Result<(), E> {
        match line {
            Line::Clock => OutputPin::set_low(&mut self.clk),
            Line::Data => OutputPin::set_low(&mut self.dat),
        }
    }

    fn release(&mut self, line: Line) -> Result<(), E> {
        // in open-drain mode "high" means not driving
        match line {
            Line::Clock => OutputPin::set_high(&mut self.clk),
            Line::Data => OutputPin::set_high(&mut self.dat),
        }
    }

    fn delay_us(&mut self, us: u16) {
        self.delay.delay_us(us);
    }

    fn now_us(&mut self) -> u32 {
        self.timer.micros()
    }
}
