use rhdl::prelude::*;
use rhdl_fpga::core::dff::DFF;
use super::Synchronizer;

// a Synchronizer plus one more delayed copy of its output, for lines
// whose edges matter. Output is (current, previous)
#[derive(Clone, Debug, Synchronous, SynchronousDQ)]
pub struct EdgeSampler<N: BitWidth> {
    sync: Synchronizer<N>,
    previous: DFF<Bits<N>>,
}

impl<N: BitWidth> EdgeSampler<N> {
    pub fn new(idle: Bits<N>) -> Self {
        Self {
            sync: Synchronizer::new(idle),
            previous: DFF::new(idle),
        }
    }
}

impl<N: BitWidth> Default for EdgeSampler<N> {
    fn default() -> Self {
        Self::new(Bits::<N>::default())
    }
}

impl<N: BitWidth> SynchronousIO for EdgeSampler<N> {
    type I = Bits<N>;
    type O = (Bits<N>, Bits<N>);
    type Kernel = edge_sampler_kernel<N>;
}

#[kernel]
pub fn edge_sampler_kernel<N: BitWidth>(
    _cr: ClockReset,
    input: Bits<N>,
    q: Q<N>,
) -> ((Bits<N>, Bits<N>), D<N>) {
    let current = q.sync;
    (
        (current, q.previous),
        D::<N> {
            sync: input,
            previous: current,
        },
    )
}
