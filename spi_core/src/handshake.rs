use rhdl::prelude::*;
use rhdl_fpga::core::dff::DFF;

// control signals going out to the deserializer and the register bank
#[derive(PartialEq, Debug, Digital, Default)]
pub struct HandshakeSignals {
    pub decode: bool, // a capture is pending and not yet consumed
    pub clear: bool,  // the capture was consumed, reset the bit counter
}

// two-flag handshake between the bus side and the decode side
//
//   idle      : ready=0 processed=0
//   pending   : ready=1 processed=0  -> decode runs this tick
//   consumed  : ready=1 processed=1  -> ready drops, counter clears
//   re-arming : ready=0 processed=1  -> processed drops
#[derive(Synchronous, SynchronousDQ, Clone, Debug)]
pub struct Handshake {
    ready: DFF<bool>,
    processed: DFF<bool>,
}

impl Default for Handshake {
    fn default() -> Self {
        Self {
            ready: DFF::new(false),
            processed: DFF::new(false),
        }
    }
}

impl SynchronousIO for Handshake {
    type I = bool; // select_released pulse
    type O = HandshakeSignals;
    type Kernel = handshake_kernel;
}

#[kernel]
pub fn handshake_kernel(_cr: ClockReset, select_released: bool, q: Q) -> (HandshakeSignals, D) {
    let decode = q.ready && !q.processed;

    // ready is set on every deselect, whatever was clocked in
    let mut next_ready = q.ready;
    if select_released {
        next_ready = true;
    } else if q.processed {
        next_ready = false;
    }

    // processed follows ready one step behind
    let mut next_processed = q.processed;
    if decode {
        next_processed = true;
    } else if !q.ready && q.processed {
        next_processed = false;
    }

    let signals = HandshakeSignals {
        decode,
        // one tick, the same one in which ready drops
        clear: q.ready && q.processed,
    };

    (signals, D { ready: next_ready, processed: next_processed })
}
