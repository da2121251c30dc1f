use rhdl::prelude::*;
use rhdl_fpga::core::dff::DFF;
use crate::deserializer::Capture;
use crate::types::*;

// word layout, msb first:
//   bit 15     write enable
//   bits 14..8 register address
//   bits 7..0  data
#[kernel]
pub fn decode_word(capture: Capture) -> Command {
    let word = capture.word;
    let address: b7 = ((word >> 8) & bits(0x7F)).resize();
    let data: b8 = (word & bits(0xFF)).resize();
    Command {
        valid: capture.count == bits(16),
        write: (word & bits(0x8000)) != bits(0),
        address,
        data,
    }
}

// the single write path into the register file
// returns the next register file and whether a register was hit
#[kernel]
pub fn apply_command(registers: RegisterFile, command: Command) -> (RegisterFile, bool) {
    let mut next = registers;
    let mut hit = false;

    // short/long frames and reads fall through untouched
    if command.valid && command.write {
        hit = true;
        if command.address == bits(0x00) {
            next.out_enable_low = command.data;
        } else if command.address == bits(0x01) {
            next.out_enable_high = command.data;
        } else if command.address == bits(0x02) {
            next.pwm_enable_low = command.data;
        } else if command.address == bits(0x03) {
            next.pwm_enable_high = command.data;
        } else if command.address == bits(0x04) {
            next.pwm_duty_cycle = command.data;
        } else {
            hit = false;
        }
    }

    (next, hit)
}

// register file + write strobe
#[derive(Synchronous, SynchronousDQ, Clone, Debug)]
pub struct RegisterBank {
    registers: DFF<RegisterFile>,
    strobe: DFF<bool>,
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self {
            registers: DFF::new(RegisterFile::default()),
            strobe: DFF::new(false),
        }
    }
}

impl SynchronousIO for RegisterBank {
    type I = (bool, Capture); // (decode, capture)
    type O = PeripheralOutput;
    type Kernel = register_bank_kernel;
}

#[kernel]
pub fn register_bank_kernel(_cr: ClockReset, input: (bool, Capture), q: Q) -> (PeripheralOutput, D) {
    let (decode, capture) = input;

    let command = decode_word(capture);
    let (applied, hit) = apply_command(q.registers, command);

    // hold unless the handshake says this capture is ours to consume
    let mut next_registers = q.registers;
    let mut next_strobe = false;
    if decode {
        next_registers = applied;
        next_strobe = hit;
    }

    let output = PeripheralOutput {
        registers: q.registers,
        write_strobe: q.strobe,
    };

    (output, D { registers: next_registers, strobe: next_strobe })
}
