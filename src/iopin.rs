//! this helper can turn two 'one directional' pins into one open-drain line pin,
//! which is what `PinBus` expects for both CLOCK and DATA

#![deny(unsafe_code)]

use hal::digital::v2::{InputPin, OutputPin};

/// Output pin in open-drain mode wired together with an input pin in
/// floating input mode. Reads go to the input, writes to the output.
pub struct IOPin<OPIN, IPIN> {
    output: OPIN,
    input: IPIN,
}

impl<OPIN, IPIN, E> IOPin<OPIN, IPIN>
where
    OPIN: OutputPin<Error = E>,
    IPIN: InputPin<Error = E>,
{
    /// Joins the pins and releases the line.
    pub fn new(mut output: OPIN, input: IPIN) -> Result<Self, E> {
        output.set_high()?;
        Ok(IOPin { output, input })
    }

    pub fn free(self) -> (OPIN, IPIN) {
        (self.output, self.input)
    }
}

impl<OPIN, IPIN, E> InputPin for IOPin<OPIN, IPIN>
where
    OPIN: OutputPin<Error = E>,
    IPIN: InputPin<Error = E>,
{
    type Error = E;

    fn is_high(&self) -> Result<bool, E> {
        self.input.is_high()
    }

    fn is_low(&self) -> Result<bool, E> {
        self.input.is_low()
    }
}

impl<OPIN, IPIN, E> OutputPin for IOPin<OPIN, IPIN>
where
    OPIN: OutputPin<Error = E>,
    IPIN: InputPin<Error = E>,
{
    type Error = E;

    fn set_high(&mut self) -> Result<(), E> {
        self.output.set_high()
    }

    fn set_low(&mut self) -> Result<(), E> {
        self.output.set_low()
    }
}
