//! Software model of a PS/2 line pair with virtual time.
//!
//! Every line read costs one microsecond and delays advance the clock, so
//! busy waits in the engine always make progress. The other end of the
//! bus is a `Peer` that pulls lines low as a function of time and reacts
//! to what the engine drives.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::convert::Infallible;

use ps2emu::{Bus, Level, Line};

pub const CELL: u32 = 40;
/// one full clock period of the simulated peers
pub const PERIOD: u32 = 2 * CELL;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Frame layout independent from the crate: bit i is slot i.
pub fn frame(data: u8) -> u16 {
    let parity = (data.count_ones() % 2 == 0) as u16;
    (1 << 10) | (parity << 9) | ((data as u16) << 1)
}

/// Checks start, parity and stop of a captured frame.
pub fn unframe(raw: u16) -> Option<u8> {
    let data = (raw >> 1) as u8;
    let parity = (raw >> 9) & 1;
    let ones = data.count_ones() + parity as u32;
    if raw & 1 == 0 && raw & (1 << 10) != 0 && ones % 2 == 1 {
        Some(data)
    } else {
        None
    }
}

/// What the engine currently drives.
#[derive(Copy, Clone, Debug, Default)]
pub struct Ours {
    pub clock_low: bool,
    pub data_low: bool,
}

pub trait Peer {
    fn drives_low(&self, line: Line, now: u32) -> bool;

    /// called whenever the engine changes what it drives on a line
    fn on_drive(&mut self, _now: u32, _line: Line, _low: bool, _ours: Ours) {}
}

/// Nobody on the other end.
pub struct Idle;

impl Peer for Idle {
    fn drives_low(&self, _line: Line, _now: u32) -> bool {
        false
    }
}

pub struct SimBus<P> {
    pub now: u32,
    pub ours: Ours,
    pub peer: P,
    /// every drive change of the engine: (time, line, pulled low)
    pub log: Vec<(u32, Line, bool)>,
}

impl<P: Peer> SimBus<P> {
    pub fn new(peer: P) -> Self {
        SimBus {
            now: 0,
            ours: Ours::default(),
            peer,
            log: Vec::new(),
        }
    }

    pub fn level_now(&self, line: Line) -> Level {
        let ours = match line {
            Line::Clock => self.ours.clock_low,
            Line::Data => self.ours.data_low,
        };
        if ours || self.peer.drives_low(line, self.now) {
            Level::Low
        } else {
            Level::High
        }
    }

    fn set(&mut self, line: Line, low: bool) {
        let slot = match line {
            Line::Clock => &mut self.ours.clock_low,
            Line::Data => &mut self.ours.data_low,
        };
        let changed = *slot != low;
        *slot = low;
        if changed {
            self.log.push((self.now, line, low));
            self.peer.on_drive(self.now, line, low, self.ours);
        }
    }

    /// times at which the engine pulled `line` low
    pub fn falling_edges(&self, line: Line) -> Vec<u32> {
        self.log
            .iter()
            .filter(|(_, l, low)| *l == line && *low)
            .map(|(t, _, _)| *t)
            .collect()
    }

    /// durations for which the engine held `line` low
    pub fn low_pulses(&self, line: Line) -> Vec<u32> {
        let mut pulses = Vec::new();
        let mut since = None;
        for (t, l, low) in &self.log {
            if *l != line {
                continue;
            }
            match (*low, since) {
                (true, _) => since = Some(*t),
                (false, Some(start)) => {
                    pulses.push(t - start);
                    since = None;
                }
                (false, None) => {}
            }
        }
        pulses
    }
}

impl<P: Peer> Bus for SimBus<P> {
    type Error = Infallible;

    fn level(&mut self, line: Line) -> Result<Level, Infallible> {
        self.now += 1;
        Ok(self.level_now(line))
    }

    fn drive_low(&mut self, line: Line) -> Result<(), Infallible> {
        self.set(line, true);
        Ok(())
    }

    fn release(&mut self, line: Line) -> Result<(), Infallible> {
        self.set(line, false);
        Ok(())
    }

    fn delay_us(&mut self, us: u16) {
        self.now += u32::from(us);
    }

    fn now_us(&mut self) -> u32 {
        self.now
    }
}

/// Device clocking prepared frames to the host on a fixed timeline.
///
/// Each frame starts with data falling while the clock is still high; the
/// clock is low from 20us to 60us into every 80us slot and data changes at
/// slot boundaries.
pub struct ScriptedDevice {
    frames: Vec<(u32, u16)>,
}

impl ScriptedDevice {
    pub const GAP: u32 = 200;

    pub fn sending(start: u32, frames: &[u16]) -> Self {
        let frames = frames
            .iter()
            .enumerate()
            .map(|(i, raw)| (start + i as u32 * (11 * PERIOD + Self::GAP), *raw))
            .collect();
        ScriptedDevice { frames }
    }

    fn slot(&self, now: u32) -> Option<(u16, u32, u32)> {
        self.frames.iter().find_map(|(start, raw)| {
            if now < *start {
                return None;
            }
            let k = (now - start) / PERIOD;
            if k < 11 {
                Some((*raw, k, (now - start) % PERIOD))
            } else {
                None
            }
        })
    }
}

impl Peer for ScriptedDevice {
    fn drives_low(&self, line: Line, now: u32) -> bool {
        match (line, self.slot(now)) {
            (Line::Clock, Some((_, _, offset))) => (20..60).contains(&offset),
            (Line::Data, Some((raw, k, _))) => raw & (1 << k) == 0,
            (_, None) => false,
        }
    }
}

/// Device receiving from the host: starts clocking once the host releases
/// the clock with data held low, samples data on every rising edge and
/// pulls data low during the eleventh pulse as acknowledgment.
#[derive(Default)]
pub struct ClockedDevice {
    start: Option<u32>,
    data_log: Vec<(u32, bool)>,
}

impl ClockedDevice {
    pub const LEAD: u32 = 30;

    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, now: u32) -> Option<(u32, u32)> {
        let start = self.start?;
        if now < start {
            return None;
        }
        Some(((now - start) / PERIOD, (now - start) % PERIOD))
    }

    fn host_data_low_at(&self, t: u32) -> bool {
        self.data_log
            .iter()
            .take_while(|(time, _)| *time <= t)
            .last()
            .map_or(false, |(_, low)| *low)
    }

    /// Slots seen on the rising edges: 8 data bits, parity and stop,
    /// packed like `frame` with the start bit taken from the request to send.
    pub fn received(&self) -> Option<u16> {
        let start = self.start?;
        let mut raw = 0u16;
        for k in 0..10 {
            let rising = start + k * PERIOD + 60;
            if !self.host_data_low_at(rising) {
                raw |= 1 << (k + 1);
            }
        }
        Some(raw)
    }
}

impl Peer for ClockedDevice {
    fn drives_low(&self, line: Line, now: u32) -> bool {
        match (line, self.position(now)) {
            (Line::Clock, Some((k, offset))) => k <= 10 && (20..60).contains(&offset),
            (Line::Data, Some((k, offset))) => k == 10 && (10..70).contains(&offset),
            (_, None) => false,
        }
    }

    fn on_drive(&mut self, now: u32, line: Line, low: bool, ours: Ours) {
        if line == Line::Data {
            self.data_log.push((now, low));
        }
        if line == Line::Clock && !low && ours.data_low && self.start.is_none() {
            self.start = Some(now + Self::LEAD);
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum HostPhase {
    Listening,
    /// inhibit at `t0`, request to send at `t0 + 100`, clock released at `t0 + 110`
    Sending {
        t0: u32,
        frame: u16,
        replies: usize,
        edges: u32,
    },
}

/// Host talking to the engine in the device role.
///
/// Decodes whatever the device clocks out on falling edges. After the
/// expected number of replies it inhibits the bus and sends its next
/// scripted frame, presenting each bit on the device's falling clock edges.
pub struct ReactiveHost {
    script: VecDeque<(u16, usize)>,
    pending: usize,
    phase: HostPhase,
    rx: Vec<bool>,
    pub received: Vec<u16>,
    /// data level seen on the ack pulse of every sent frame (true = pulled low),
    /// `false` for a frame the device abandoned
    pub acks: Vec<bool>,
}

impl ReactiveHost {
    pub const GAP: u32 = 150;
    pub const INHIBIT: u32 = 100;
    pub const RELEASE: u32 = 110;

    /// `expect` replies are awaited before the first frame; with none the
    /// first frame starts at `start`. Every frame is followed by its own
    /// number of expected replies.
    pub fn new(expect: usize, start: u32, script: &[(u16, usize)]) -> Self {
        let mut host = ReactiveHost {
            script: script.iter().copied().collect(),
            pending: expect,
            phase: HostPhase::Listening,
            rx: Vec::new(),
            received: Vec::new(),
            acks: Vec::new(),
        };
        if expect == 0 {
            host.schedule(start);
        }
        host
    }

    /// host listening only
    pub fn silent() -> Self {
        Self::new(0, 0, &[])
    }

    pub fn received_bytes(&self) -> Vec<Option<u8>> {
        self.received.iter().map(|raw| unframe(*raw)).collect()
    }

    fn schedule(&mut self, t0: u32) {
        if let Some((frame, replies)) = self.script.pop_front() {
            self.phase = HostPhase::Sending {
                t0,
                frame,
                replies,
                edges: 0,
            };
        }
    }
}

impl Peer for ReactiveHost {
    fn drives_low(&self, line: Line, now: u32) -> bool {
        match (self.phase, line) {
            (HostPhase::Listening, _) => false,
            (HostPhase::Sending { t0, .. }, Line::Clock) => now >= t0 && now < t0 + Self::RELEASE,
            (
                HostPhase::Sending {
                    t0, frame, edges, ..
                },
                Line::Data,
            ) => now >= t0 + Self::INHIBIT && edges <= 10 && frame & (1u16 << edges) == 0,
        }
    }

    fn on_drive(&mut self, now: u32, line: Line, low: bool, ours: Ours) {
        if line == Line::Data && low {
            // the device only pulls data low mid-frame when it gave up on
            // our frame and started a reply of its own
            if let HostPhase::Sending { replies, edges, .. } = self.phase {
                if edges > 0 && edges < 10 {
                    self.acks.push(false);
                    self.pending = replies;
                    self.phase = HostPhase::Listening;
                }
            }
            return;
        }
        if line != Line::Clock || !low {
            return;
        }
        match self.phase {
            HostPhase::Sending {
                t0,
                frame,
                replies,
                edges,
            } => {
                if now < t0 + Self::RELEASE {
                    return;
                }
                let edges = edges + 1;
                if edges == 11 {
                    self.acks.push(ours.data_low);
                    self.pending = replies;
                    self.phase = HostPhase::Listening;
                    if self.pending == 0 {
                        self.schedule(now + Self::GAP);
                    }
                } else {
                    self.phase = HostPhase::Sending {
                        t0,
                        frame,
                        replies,
                        edges,
                    };
                }
            }
            HostPhase::Listening => {
                self.rx.push(!ours.data_low);
                if self.rx.len() == 11 {
                    let raw = self
                        .rx
                        .drain(..)
                        .enumerate()
                        .fold(0u16, |raw, (i, bit)| raw | ((bit as u16) << i));
                    self.received.push(raw);
                    self.pending = self.pending.saturating_sub(1);
                    if self.pending == 0 {
                        self.schedule(now + Self::GAP);
                    }
                }
            }
        }
    }
}
