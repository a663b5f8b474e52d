//! PS/2 frame codec.
//!
//! A frame is 11 slots on the wire:
//!
//! | slot  | content                       |
//! |-------|-------------------------------|
//! | 0     | start bit, always 0           |
//! | 1..=8 | data bits, least significant first |
//! | 9     | odd parity over the data bits |
//! | 10    | stop bit, always 1            |
//!
//! Both transmit paths walk `Frame::bits`, both receive paths feed a
//! `FrameDecoder`, so the bit order and parity rules live only here.

/// number of slots in a frame, acknowledgment excluded
pub const FRAME_BITS: usize = 11;

pub const START_SLOT: usize = 0;
pub const PARITY_SLOT: usize = 9;
pub const STOP_SLOT: usize = 10;

/// Running odd parity: starts at 1 and flips on every set bit, so the data
/// bits plus the parity bit always hold an odd number of ones.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Parity(bool);

impl Parity {
    pub fn new() -> Self {
        Parity(true)
    }

    pub fn update(&mut self, bit: bool) {
        if bit {
            self.0 = !self.0;
        }
    }

    /// the parity bit to put on (or expect from) the wire
    pub fn bit(&self) -> bool {
        self.0
    }
}

impl Default for Parity {
    fn default() -> Self {
        Parity::new()
    }
}

/// Odd parity bit of a data byte.
pub fn odd_parity(data: u8) -> bool {
    let mut parity = Parity::new();
    for i in 0..8 {
        parity.update(data & (1 << i) != 0);
    }
    parity.bit()
}

/// An outgoing frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: u8,
}

impl Frame {
    pub fn new(data: u8) -> Self {
        Frame { data }
    }

    pub fn data(&self) -> u8 {
        self.data
    }

    pub fn parity_bit(&self) -> bool {
        odd_parity(self.data)
    }

    /// the frame packed into a word, bit i holding slot i
    pub fn raw(&self) -> u16 {
        let parity = self.parity_bit() as u16;
        (1 << STOP_SLOT) | (parity << PARITY_SLOT) | ((self.data as u16) << 1)
    }

    /// the slots in wire order, `true` meaning a released (high) line
    pub fn bits(&self) -> impl Iterator<Item = bool> {
        let raw = self.raw();
        (0..FRAME_BITS).map(move |slot| raw & (1 << slot) != 0)
    }
}

impl From<u8> for Frame {
    fn from(data: u8) -> Frame {
        Frame::new(data)
    }
}

/// The parity bit seen on the wire disagrees with the data bits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ParityError {
    /// data bits as received
    pub data: u8,
    /// parity bit as received
    pub observed: bool,
}

/// Where a `FrameDecoder` is within the frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecodeState {
    AwaitStart,
    /// waiting for data bit n (0 = least significant)
    Data(u8),
    Parity,
    /// data verified, only the stop bit is left
    Stop,
}

/// Slot by slot frame decoder shared by the receive paths.
///
/// The start and stop slots are accepted whatever their value; the engine
/// only checks parity.
#[derive(Clone, Debug)]
pub struct FrameDecoder {
    state: DecodeState,
    data: u8,
    parity: Parity,
}

impl FrameDecoder {
    pub fn new() -> Self {
        FrameDecoder {
            state: DecodeState::AwaitStart,
            data: 0,
            parity: Parity::new(),
        }
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Consumes the next slot.
    ///
    /// Returns the byte once the parity slot has been checked; a parity
    /// mismatch leaves the decoder in `DecodeState::Parity`.
    pub fn push(&mut self, bit: bool) -> Result<Option<u8>, ParityError> {
        match self.state {
            DecodeState::AwaitStart => {
                self.state = DecodeState::Data(0);
                Ok(None)
            }
            DecodeState::Data(i) => {
                if bit {
                    self.data |= 1 << i;
                }
                self.parity.update(bit);
                self.state = if i == 7 {
                    DecodeState::Parity
                } else {
                    DecodeState::Data(i + 1)
                };
                Ok(None)
            }
            DecodeState::Parity => {
                if bit != self.parity.bit() {
                    return Err(ParityError {
                        data: self.data,
                        observed: bit,
                    });
                }
                self.state = DecodeState::Stop;
                Ok(Some(self.data))
            }
            DecodeState::Stop => {
                *self = FrameDecoder::new();
                Ok(None)
            }
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        FrameDecoder::new()
    }
}

/// Decodes a captured frame laid out like `Frame::raw`.
pub fn decode(raw: u16) -> Result<u8, ParityError> {
    let data = (raw >> 1) as u8;
    let observed = raw & (1 << PARITY_SLOT) != 0;
    if observed == odd_parity(data) {
        Ok(data)
    } else {
        Err(ParityError { data, observed })
    }
}
