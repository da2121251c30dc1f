use rhdl::prelude::*;

// bits clocked in per transaction
pub const WORD_BITS: usize = 16;

// data structures

// raw bus lines as they arrive from the controller, one sample per internal tick
#[derive(PartialEq, Debug, Digital)]
pub struct BusPins {
    pub sclk: bool,
    pub copi: bool,
    // active low: false = transaction in progress
    pub ncs: bool,
}

// bus idle: clock low, chip deselected
impl Default for BusPins {
    fn default() -> Self {
        Self {
            sclk: false,
            copi: false,
            ncs: true,
        }
    }
}

// the five control registers. Written only by the decoder, read by anyone
#[derive(PartialEq, Debug, Digital, Default)]
pub struct RegisterFile {
    pub out_enable_low: b8,
    pub out_enable_high: b8,
    pub pwm_enable_low: b8,
    pub pwm_enable_high: b8,
    pub pwm_duty_cycle: b8,
}

// a captured word split into its fields
#[derive(PartialEq, Debug, Digital, Default)]
pub struct Command {
    // exactly 16 bits were clocked in
    pub valid: bool,
    pub write: bool,
    pub address: b7,
    pub data: b8,
}

// i/o interface

#[derive(PartialEq, Debug, Digital, Default)]
pub struct PeripheralOutput {
    pub registers: RegisterFile,
    // high for one tick after a register was written
    pub write_strobe: bool,
}

#[derive(PartialEq, Debug, Digital, Default)]
pub struct ChipOutput {
    pub uo_out: b8,
    pub uio_out: b8,
    pub registers: RegisterFile,
    pub write_strobe: bool,
}

// register address map, host side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    OutEnableLow = 0x00,
    OutEnableHigh = 0x01,
    PwmEnableLow = 0x02,
    PwmEnableHigh = 0x03,
    PwmDutyCycle = 0x04,
}

impl Register {
    pub const ALL: [Register; 5] = [
        Register::OutEnableLow,
        Register::OutEnableHigh,
        Register::PwmEnableLow,
        Register::PwmEnableHigh,
        Register::PwmDutyCycle,
    ];

    pub fn address(self) -> u8 {
        self as u8
    }

    pub fn from_address(address: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.address() == address)
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::OutEnableLow => "out_enable_low",
            Register::OutEnableHigh => "out_enable_high",
            Register::PwmEnableLow => "pwm_enable_low",
            Register::PwmEnableHigh => "pwm_enable_high",
            Register::PwmDutyCycle => "pwm_duty_cycle",
        }
    }

    // current value of this register in a sampled register file
    pub fn read(self, registers: &RegisterFile) -> u8 {
        let value = match self {
            Register::OutEnableLow => registers.out_enable_low,
            Register::OutEnableHigh => registers.out_enable_high,
            Register::PwmEnableLow => registers.pwm_enable_low,
            Register::PwmEnableHigh => registers.pwm_enable_high,
            Register::PwmDutyCycle => registers.pwm_duty_cycle,
        };
        value.raw() as u8
    }
}

impl RegisterFile {
    // all five registers as host bytes, in address order
    pub fn snapshot(&self) -> [u8; 5] {
        Register::ALL.map(|r| r.read(self))
    }
}
