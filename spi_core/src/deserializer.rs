use rhdl::prelude::*;
use rhdl_fpga::core::dff::DFF;

#[derive(PartialEq, Debug, Digital, Default)]
pub struct ShiftInput {
    // synchronized ncs is low
    pub selected: bool,
    pub sclk_rising: bool,
    pub copi: bool,
    // from the handshake: the capture was consumed, start counting again
    pub clear: bool,
}

// what has been clocked in so far. word only means something when count == 16
#[derive(PartialEq, Debug, Digital, Default)]
pub struct Capture {
    pub word: b16,
    pub count: b5,
}

// shift buffer + bit counter, the only owner of both
#[derive(Synchronous, SynchronousDQ, Clone, Debug)]
pub struct Deserializer {
    buffer: DFF<b16>,
    count: DFF<b5>,
}

impl Default for Deserializer {
    fn default() -> Self {
        Self {
            buffer: DFF::new(b16::default()),
            count: DFF::new(b5::default()),
        }
    }
}

impl SynchronousIO for Deserializer {
    type I = ShiftInput;
    type O = Capture;
    type Kernel = deserializer_kernel;
}

#[kernel]
pub fn deserializer_kernel(_cr: ClockReset, input: ShiftInput, q: Q) -> (Capture, D) {
    let mut next_buffer = q.buffer;
    let mut next_count = q.count;

    // mode 0: sample copi on the rising sclk edge, msb first
    let shift = input.selected && input.sclk_rising;
    if shift {
        let bit: b16 = if input.copi { bits(1) } else { bits(0) };
        next_buffer = (q.buffer << 1) | bit;
        // saturate so an overlong frame can never wrap back to 16
        if q.count != bits(31) {
            next_count = q.count + bits(1);
        }
    }

    // restart the count, keeping a bit that lands on the same tick
    if input.clear {
        next_count = if shift { bits(1) } else { bits(0) };
    }

    let capture = Capture {
        word: q.buffer,
        count: q.count,
    };

    (capture, D { buffer: next_buffer, count: next_count })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_in(bit: bool) -> Vec<ShiftInput> {
        vec![
            ShiftInput { selected: true, sclk_rising: true, copi: bit, clear: false },
            ShiftInput { selected: true, sclk_rising: false, copi: bit, clear: false },
        ]
    }

    fn run(inputs: Vec<ShiftInput>) -> miette::Result<Vec<Capture>> {
        let uut = Deserializer::default();
        Ok(uut
            .run(inputs.into_iter().with_reset(1).clock_pos_edge(100))?
            .synchronous_sample()
            .map(|s| s.value.2)
            .collect())
    }

    #[test]
    fn test_shift_msb_first() -> miette::Result<()> {
        let word: u16 = 0x80AB;
        let mut inputs = Vec::new();
        for i in (0..16).rev() {
            inputs.extend(clock_in((word >> i) & 1 == 1));
        }
        inputs.push(ShiftInput::default());

        let last = *run(inputs)?.last().unwrap();
        assert_eq!(last.word, bits(0x80AB));
        assert_eq!(last.count, bits(16));
        Ok(())
    }

    #[test]
    fn test_ignores_edges_while_deselected() -> miette::Result<()> {
        let mut inputs = clock_in(true);
        inputs.push(ShiftInput { selected: false, sclk_rising: true, copi: true, clear: false });
        inputs.push(ShiftInput::default());

        let last = *run(inputs)?.last().unwrap();
        assert_eq!(last.count, bits(1));
        assert_eq!(last.word, bits(1));
        Ok(())
    }

    #[test]
    fn test_clear_resets_count_only() -> miette::Result<()> {
        let mut inputs = Vec::new();
        inputs.extend(clock_in(true));
        inputs.extend(clock_in(false));
        inputs.push(ShiftInput { clear: true, ..ShiftInput::default() });
        inputs.push(ShiftInput::default());

        let last = *run(inputs)?.last().unwrap();
        assert_eq!(last.count, bits(0));
        assert_eq!(last.word, bits(0b10));
        Ok(())
    }

    #[test]
    fn test_clear_keeps_coincident_bit() -> miette::Result<()> {
        let mut inputs = Vec::new();
        for _ in 0..16 {
            inputs.extend(clock_in(false));
        }
        // first bit of the next frame arrives together with the clear
        inputs.push(ShiftInput { selected: true, sclk_rising: true, copi: true, clear: true });
        inputs.push(ShiftInput { selected: true, sclk_rising: false, copi: true, clear: false });
        for _ in 1..16 {
            inputs.extend(clock_in(true));
        }
        inputs.push(ShiftInput::default());

        let last = *run(inputs)?.last().unwrap();
        assert_eq!(last.count, bits(16));
        assert_eq!(last.word, bits(0xFFFF));
        Ok(())
    }

    #[test]
    fn test_count_saturates() -> miette::Result<()> {
        let mut inputs = Vec::new();
        for _ in 0..40 {
            inputs.extend(clock_in(true));
        }
        inputs.push(ShiftInput::default());

        let last = *run(inputs)?.last().unwrap();
        assert_eq!(last.count, bits(31));
        assert_eq!(last.word, bits(0xFFFF));
        Ok(())
    }
}
