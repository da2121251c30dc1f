use rhdl::prelude::*;

// layout of the edge-sensitive lines inside the sampler word
// bit 0 = sclk, bit 1 = ncs
pub const EDGE_LINES_IDLE: u128 = 0b10;

// one-tick pulses derived from the synchronized history
#[derive(PartialEq, Debug, Digital, Default)]
pub struct BusEdges {
    pub sclk_rising: bool,
    // ncs went from asserted (low) to released (high): end of a transaction
    pub select_released: bool,
}

#[kernel]
pub fn rising(current: bool, previous: bool) -> bool {
    current && !previous
}

// packs the two raw lines into the word the edge sampler carries
#[kernel]
pub fn pack_edge_lines(sclk: bool, ncs: bool) -> b2 {
    let sclk_bit: b2 = if sclk { bits(0b01) } else { bits(0) };
    let ncs_bit: b2 = if ncs { bits(0b10) } else { bits(0) };
    sclk_bit | ncs_bit
}

#[kernel]
pub fn sclk_level(lines: b2) -> bool {
    (lines & bits(0b01)) != bits(0)
}

#[kernel]
pub fn ncs_level(lines: b2) -> bool {
    (lines & bits(0b10)) != bits(0)
}

#[kernel]
pub fn detect_edges(current: b2, previous: b2) -> BusEdges {
    BusEdges {
        sclk_rising: rising(sclk_level(current), sclk_level(previous)),
        select_released: rising(ncs_level(current), ncs_level(previous)),
    }
}
