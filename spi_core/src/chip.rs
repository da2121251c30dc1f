use rhdl::prelude::*;
use crate::pwm::PwmPeripheral;
use crate::types::*;
use crate::SpiPeripheral;

// ui_in pin map
//   bit 0 = sclk
//   bit 1 = copi
//   bit 2 = ncs
//   bits 7..3 unused
#[kernel]
pub fn unpack_ui_in(ui_in: b8) -> BusPins {
    BusPins {
        sclk: (ui_in & bits(0x01)) != bits(0),
        copi: (ui_in & bits(0x02)) != bits(0),
        ncs: (ui_in & bits(0x04)) != bits(0),
    }
}

// host-side inverse of unpack_ui_in
pub fn pack_ui_in(pins: BusPins) -> b8 {
    let raw = u128::from(pins.sclk) | (u128::from(pins.copi) << 1) | (u128::from(pins.ncs) << 2);
    bits(raw)
}

// receiver + pwm stage behind the chip pins
#[derive(Synchronous, SynchronousDQ, Clone, Debug)]
pub struct Chip {
    spi: SpiPeripheral,
    pwm: PwmPeripheral,
}

impl Default for Chip {
    fn default() -> Self {
        Self {
            spi: SpiPeripheral::default(),
            pwm: PwmPeripheral::default(),
        }
    }
}

impl SynchronousIO for Chip {
    type I = b8;
    type O = ChipOutput;
    type Kernel = chip_kernel;
}

#[kernel]
pub fn chip_kernel(_cr: ClockReset, ui_in: b8, q: Q) -> (ChipOutput, D) {
    let mut d = D::dont_care();

    d.spi = unpack_ui_in(ui_in);
    d.pwm = q.spi.registers;

    let output = ChipOutput {
        uo_out: q.pwm.uo_out,
        uio_out: q.pwm.uio_out,
        registers: q.spi.registers,
        write_strobe: q.spi.write_strobe,
    };

    (output, d)
}
