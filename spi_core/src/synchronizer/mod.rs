// two flip-flops per bus line before any logic looks at it
// output follows the input exactly SYNC_LATENCY ticks later
use rhdl::prelude::*;
use rhdl_fpga::core::dff::DFF;

pub mod edge_sampler;
pub use edge_sampler::EdgeSampler;

// ticks between a pin change and the synchronized output following it
pub const SYNC_LATENCY: usize = 2;

// two-stage synchronizer for N independent lines
#[derive(Clone, Debug, Synchronous, SynchronousDQ)]
pub struct Synchronizer<N: BitWidth> {
    meta: DFF<Bits<N>>,
    stable: DFF<Bits<N>>,
}

impl<N: BitWidth> Synchronizer<N> {
    // idle is the level every stage takes on reset
    pub fn new(idle: Bits<N>) -> Self {
        Self {
            meta: DFF::new(idle),
            stable: DFF::new(idle),
        }
    }
}

impl<N: BitWidth> Default for Synchronizer<N> {
    fn default() -> Self {
        Self::new(Bits::<N>::default())
    }
}

impl<N: BitWidth> SynchronousIO for Synchronizer<N> {
    type I = Bits<N>;
    type O = Bits<N>;
    type Kernel = synchronizer_kernel<N>;
}

#[kernel]
pub fn synchronizer_kernel<N: BitWidth>(_cr: ClockReset, input: Bits<N>, q: Q<N>) -> (Bits<N>, D<N>) {
    (
        q.stable,
        D::<N> {
            meta: input,
            stable: q.meta,
        },
    )
}
