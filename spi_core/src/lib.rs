use rhdl::prelude::*;

pub mod types;
pub mod synchronizer;
pub mod edge;
pub mod deserializer;
pub mod handshake;
pub mod decoder;
pub mod pwm;
pub mod chip;
pub mod bench;

pub use types::{BusPins, ChipOutput, Command, PeripheralOutput, Register, RegisterFile, WORD_BITS};
pub use synchronizer::{EdgeSampler, Synchronizer, SYNC_LATENCY};
pub use deserializer::{Capture, Deserializer};
pub use handshake::{Handshake, HandshakeSignals};
pub use decoder::RegisterBank;
pub use pwm::PwmPeripheral;
pub use chip::Chip;

// ticks from the first deselected tick on the pins until the register file
// shows the write: synchronizer, edge, ready, register commit
pub const COMMIT_LATENCY: usize = SYNC_LATENCY + 2;

use edge::{detect_edges, ncs_level, pack_edge_lines, EDGE_LINES_IDLE};
use deserializer::ShiftInput;

// the receiver pipeline: synchronizer -> edges -> deserializer -> handshake -> register bank
#[derive(Synchronous, SynchronousDQ, Clone, Debug)]
pub struct SpiPeripheral {
    copi_sync: Synchronizer<U1>,
    // sclk and ncs, packed as in `edge::pack_edge_lines`
    edge_sync: EdgeSampler<U2>,
    deserializer: Deserializer,
    handshake: Handshake,
    bank: RegisterBank,
}

impl Default for SpiPeripheral {
    fn default() -> Self {
        Self {
            copi_sync: Synchronizer::default(),
            edge_sync: EdgeSampler::new(bits(EDGE_LINES_IDLE)),
            deserializer: Deserializer::default(),
            handshake: Handshake::default(),
            bank: RegisterBank::default(),
        }
    }
}

impl SynchronousIO for SpiPeripheral {
    type I = BusPins;
    type O = PeripheralOutput;
    type Kernel = spi_kernel;
}

// wiring only, every child output depends on its own state
#[kernel]
pub fn spi_kernel(_cr: ClockReset, pins: BusPins, q: Q) -> (PeripheralOutput, D) {
    let mut d = D::dont_care();

    // raw pins into the synchronizers
    d.copi_sync = if pins.copi { bits(1) } else { bits(0) };
    d.edge_sync = pack_edge_lines(pins.sclk, pins.ncs);

    // synchronized view of the bus
    let (current, previous) = q.edge_sync;
    let edges = detect_edges(current, previous);

    d.deserializer = ShiftInput {
        selected: !ncs_level(current),
        sclk_rising: edges.sclk_rising,
        copi: q.copi_sync != bits(0),
        clear: q.handshake.clear,
    };

    d.handshake = edges.select_released;

    d.bank = (q.handshake.decode, q.deserializer);

    (q.bank, d)
}
