// bus waveform generator + simulation runners
// runners prepend one reset cycle and drop its sample: trace[k] is the output
// while script tick k is applied
use miette::Diagnostic;
use rhdl::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::chip::{pack_ui_in, Chip};
use crate::types::{BusPins, ChipOutput, PeripheralOutput, WORD_BITS};
use crate::{SpiPeripheral, COMMIT_LATENCY, SYNC_LATENCY};

// fewest idle ticks between frames that let the handshake re-arm before the
// next frame's first bit lands
pub const MIN_IDLE_TICKS: usize = COMMIT_LATENCY + 2;

// widest frame the bench can clock out
const MAX_FRAME_BITS: usize = 32;

#[derive(Debug, Error, Diagnostic)]
pub enum BenchError {
    #[error("register address {0:#04x} does not fit in 7 bits")]
    #[diagnostic(code(bench::address), help("addresses run from 0x00 to 0x7f"))]
    AddressOutOfRange(u8),

    #[error("a frame carries at most 32 clocked bits, got {0}")]
    #[diagnostic(code(bench::frame_length))]
    FrameTooLong(usize),

    #[error("sclk half period of {0} ticks is shorter than the synchronizer latency")]
    #[diagnostic(code(bench::half_period))]
    HalfPeriodTooShort(usize),

    #[error("{0} idle ticks between frames do not let the handshake re-arm")]
    #[diagnostic(code(bench::idle), help("leave at least MIN_IDLE_TICKS idle ticks after each frame"))]
    IdleTooShort(usize),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Simulation(#[from] RHDLError),

    #[error("waveform output failed: {0}")]
    #[diagnostic(code(bench::io))]
    Io(#[from] std::io::Error),
}

// one bus transaction as the controller clocks it out, MSB first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    bits: u32,
    len: usize,
}

impl Frame {
    // a full 16-bit command word
    pub fn command(write: bool, address: u8, data: u8) -> Result<Self, BenchError> {
        if address > 0x7F {
            return Err(BenchError::AddressOutOfRange(address));
        }
        let word = (u32::from(write) << 15) | (u32::from(address) << 8) | u32::from(data);
        Ok(Self {
            bits: word,
            len: WORD_BITS,
        })
    }

    pub fn write(address: u8, data: u8) -> Result<Self, BenchError> {
        Self::command(true, address, data)
    }

    pub fn read(address: u8, data: u8) -> Result<Self, BenchError> {
        Self::command(false, address, data)
    }

    // the low len bits of bits, clocked out from bit len - 1 down to bit 0
    pub fn raw(bits: u32, len: usize) -> Result<Self, BenchError> {
        if len > MAX_FRAME_BITS {
            return Err(BenchError::FrameTooLong(len));
        }
        let mask = if len == MAX_FRAME_BITS { u32::MAX } else { (1u32 << len) - 1 };
        Ok(Self { bits: bits & mask, len })
    }

    // only the first len bits of this frame, as if select was released early
    pub fn truncated(self, len: usize) -> Self {
        let len = len.min(self.len);
        Self {
            bits: if len == 0 { 0 } else { self.bits >> (self.len - len) },
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn word(&self) -> u32 {
        self.bits
    }

    fn bit(&self, index: usize) -> bool {
        // index 0 is the first bit on the wire
        (self.bits >> (self.len - 1 - index)) & 1 == 1
    }
}

// bench timing, in internal clock ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchConfig {
    pub sclk_half_period: usize,
    // select low, clock idle, before the first bit
    pub setup_ticks: usize,
    // select high after the last bit
    pub idle_ticks: usize,
    // simulation time per internal tick
    pub clock_period: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            sclk_half_period: 4,
            setup_ticks: 2,
            idle_ticks: 16,
            clock_period: 100,
        }
    }
}

impl BenchConfig {
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.sclk_half_period < SYNC_LATENCY {
            return Err(BenchError::HalfPeriodTooShort(self.sclk_half_period));
        }
        if self.idle_ticks < MIN_IDLE_TICKS {
            return Err(BenchError::IdleTooShort(self.idle_ticks));
        }
        Ok(())
    }

    // ticks one frame of bits occupies, idle tail included
    pub fn frame_ticks(&self, bits: usize) -> usize {
        self.setup_ticks + 2 * self.sclk_half_period * bits + self.idle_ticks
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tick {
    Reset,
    Pins(BusPins),
}

// where a frame landed in the script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpan {
    // first tick with select asserted
    pub start: usize,
    // first tick with select released
    pub deselect: usize,
    // one past the last idle tick
    pub end: usize,
}

impl FrameSpan {
    // first tick at which the register file shows this frame's write
    pub fn committed(&self) -> usize {
        self.deselect + COMMIT_LATENCY
    }
}

// a per-tick pin stream under construction
#[derive(Debug, Clone)]
pub struct BusScript {
    config: BenchConfig,
    ticks: Vec<Tick>,
}

impl BusScript {
    pub fn new(config: BenchConfig) -> Result<Self, BenchError> {
        config.validate()?;
        Ok(Self {
            config,
            ticks: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn hold(&mut self, pins: BusPins, ticks: usize) -> &mut Self {
        self.ticks.extend(std::iter::repeat(Tick::Pins(pins)).take(ticks));
        self
    }

    // bus idle: select released, clock low
    pub fn idle(&mut self, ticks: usize) -> &mut Self {
        self.hold(BusPins::default(), ticks)
    }

    // holds the system reset for ticks cycles, pins idle
    pub fn reset(&mut self, ticks: usize) -> &mut Self {
        self.ticks.extend(std::iter::repeat(Tick::Reset).take(ticks));
        self
    }

    // clocks out one frame followed by the idle tail
    pub fn frame(&mut self, frame: &Frame) -> FrameSpan {
        let start = self.ticks.len();
        let half = self.config.sclk_half_period;
        let selected = |sclk, copi| BusPins { sclk, copi, ncs: false };

        self.hold(selected(false, false), self.config.setup_ticks);
        for index in 0..frame.len() {
            let bit = frame.bit(index);
            // copi settles while sclk is low, sampled on the rising edge
            self.hold(selected(false, bit), half);
            self.hold(selected(true, bit), half);
        }

        let deselect = self.ticks.len();
        self.idle(self.config.idle_ticks);

        debug!(
            word = frame.word(),
            bits = frame.len(),
            start,
            deselect,
            "frame scripted"
        );

        FrameSpan {
            start,
            deselect,
            end: self.ticks.len(),
        }
    }

    pub fn frames<'a>(&mut self, frames: impl IntoIterator<Item = &'a Frame>) -> Vec<FrameSpan> {
        frames.into_iter().map(|f| self.frame(f)).collect()
    }

    fn stream<T>(&self, map: impl Fn(BusPins) -> T) -> Vec<ResetOrData<T>> {
        std::iter::once(ResetOrData::Reset)
            .chain(self.ticks.iter().map(|tick| match tick {
                Tick::Reset => ResetOrData::Reset,
                Tick::Pins(pins) => ResetOrData::Data(map(*pins)),
            }))
            .collect()
    }
}

// runs the script through a fresh SpiPeripheral
pub fn run_peripheral(script: &BusScript) -> Result<Vec<PeripheralOutput>, BenchError> {
    info!(ticks = script.len(), "simulating spi peripheral");
    let uut = SpiPeripheral::default();
    let stream = script.stream(|pins| pins).into_iter().clock_pos_edge(script.config.clock_period);
    let outputs = uut
        .run(stream)?
        .synchronous_sample()
        .skip(1)
        .map(|s| s.value.2)
        .collect();
    Ok(outputs)
}

// runs the script through a fresh Chip, pins packed onto ui_in
pub fn run_chip(script: &BusScript) -> Result<Vec<ChipOutput>, BenchError> {
    info!(ticks = script.len(), "simulating chip");
    let uut = Chip::default();
    let stream = script.stream(pack_ui_in).into_iter().clock_pos_edge(script.config.clock_period);
    let outputs = uut
        .run(stream)?
        .synchronous_sample()
        .skip(1)
        .map(|s| s.value.2)
        .collect();
    Ok(outputs)
}

// waveform of the script through a fresh Chip, for GTKWave
pub fn trace_chip(script: &BusScript) -> Result<Vcd, BenchError> {
    let uut = Chip::default();
    let stream = script.stream(pack_ui_in).into_iter().clock_pos_edge(script.config.clock_period);
    Ok(uut.run(stream)?.collect::<Vcd>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() -> miette::Result<()> {
        let frame = Frame::write(0x00, 0xAB)?;
        assert_eq!(frame.word(), 0b1_0000000_10101011);
        assert_eq!(frame.len(), 16);

        let frame = Frame::read(0x41, 0xEF)?;
        assert_eq!(frame.word(), 0x41EF);
        Ok(())
    }

    #[test]
    fn test_frame_rejects_wide_address() {
        assert!(matches!(Frame::write(0x80, 0), Err(BenchError::AddressOutOfRange(0x80))));
        assert!(matches!(Frame::raw(0, 33), Err(BenchError::FrameTooLong(33))));
    }

    #[test]
    fn test_truncated_keeps_leading_bits() -> miette::Result<()> {
        let frame = Frame::write(0x01, 0xCC)?.truncated(8);
        assert_eq!(frame.len(), 8);
        assert_eq!(frame.word(), 0x81);
        assert!(Frame::write(0x01, 0xCC)?.truncated(0).is_empty());
        Ok(())
    }

    #[test]
    fn test_config_validation() {
        assert!(BenchConfig::default().validate().is_ok());
        let fast = BenchConfig { sclk_half_period: 1, ..BenchConfig::default() };
        assert!(matches!(fast.validate(), Err(BenchError::HalfPeriodTooShort(1))));
        let tight = BenchConfig { idle_ticks: 2, ..BenchConfig::default() };
        assert!(matches!(BusScript::new(tight), Err(BenchError::IdleTooShort(2))));
    }

    #[test]
    fn test_script_waveform() -> miette::Result<()> {
        let config = BenchConfig::default();
        let mut script = BusScript::new(config)?;
        script.idle(3);
        let span = script.frame(&Frame::write(0x02, 0xFF)?);

        assert_eq!(span.start, 3);
        assert_eq!(span.deselect, 3 + config.frame_ticks(16) - config.idle_ticks);
        assert_eq!(span.end, 3 + config.frame_ticks(16));
        assert_eq!(script.len(), span.end);

        let pins: Vec<BusPins> = script
            .ticks
            .iter()
            .filter_map(|t| match t {
                Tick::Pins(p) => Some(*p),
                Tick::Reset => None,
            })
            .collect();

        // select framing
        assert!(pins[..span.start].iter().all(|p| p.ncs));
        assert!(pins[span.start..span.deselect].iter().all(|p| !p.ncs));
        assert!(pins[span.deselect..].iter().all(|p| p.ncs && !p.sclk));

        // 16 rising sclk edges inside the frame, copi carries the word msb first
        let mut word = 0u32;
        let mut edges = 0;
        for k in span.start + 1..span.deselect {
            if pins[k].sclk && !pins[k - 1].sclk {
                word = (word << 1) | u32::from(pins[k].copi);
                edges += 1;
            }
        }
        assert_eq!(edges, 16);
        assert_eq!(word, 0x82FF);
        Ok(())
    }
}
