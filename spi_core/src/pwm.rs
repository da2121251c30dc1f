// pwm output stage driven by the register file
// counter steps every PWM_PRESCALE ticks, 3328 ticks per period (~3 kHz at 10 MHz)
// out[i] = enable[i] & (pwm_enable[i] ? pwm : 1), registered
use rhdl::prelude::*;
use rhdl_fpga::core::dff::DFF;
use crate::types::RegisterFile;

// internal clock ticks per PWM counter step
pub const PWM_PRESCALE: usize = 13;

// internal clock ticks per PWM period
pub const PWM_PERIOD_TICKS: usize = PWM_PRESCALE * 256;

#[derive(PartialEq, Debug, Digital, Default)]
pub struct PwmOutput {
    pub uo_out: b8,
    pub uio_out: b8,
}

#[derive(Synchronous, SynchronousDQ, Clone, Debug)]
pub struct PwmPeripheral {
    prescaler: DFF<b4>,
    counter: DFF<b8>,
    uo_out: DFF<b8>,
    uio_out: DFF<b8>,
}

impl Default for PwmPeripheral {
    fn default() -> Self {
        Self {
            prescaler: DFF::new(b4::default()),
            counter: DFF::new(b8::default()),
            uo_out: DFF::new(b8::default()),
            uio_out: DFF::new(b8::default()),
        }
    }
}

impl SynchronousIO for PwmPeripheral {
    type I = RegisterFile;
    type O = PwmOutput;
    type Kernel = pwm_kernel;
}

#[kernel]
pub fn pwm_level(counter: b8, duty: b8) -> bool {
    (duty == bits(0xFF)) || (counter < duty)
}

// enabled bits follow pwm where pwm is enabled, stay high otherwise
#[kernel]
pub fn gate_outputs(enable: b8, pwm_enable: b8, level: bool) -> b8 {
    let pwm_mask: b8 = if level { bits(0xFF) } else { bits(0) };
    enable & (!pwm_enable | pwm_mask)
}

#[kernel]
pub fn pwm_kernel(_cr: ClockReset, registers: RegisterFile, q: Q) -> (PwmOutput, D) {
    // prescaler counts 0..=12
    let step = q.prescaler == bits(12);
    let next_prescaler = if step { bits(0) } else { q.prescaler + bits(1) };
    let next_counter = if step { q.counter + bits(1) } else { q.counter };

    let level = pwm_level(q.counter, registers.pwm_duty_cycle);

    let output = PwmOutput {
        uo_out: q.uo_out,
        uio_out: q.uio_out,
    };

    (
        output,
        D {
            prescaler: next_prescaler,
            counter: next_counter,
            uo_out: gate_outputs(registers.out_enable_low, registers.pwm_enable_low, level),
            uio_out: gate_outputs(registers.out_enable_high, registers.pwm_enable_high, level),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registers(enable: u8, pwm_enable: u8, duty: u8) -> RegisterFile {
        RegisterFile {
            out_enable_low: bits(enable as u128),
            pwm_enable_low: bits(pwm_enable as u128),
            pwm_duty_cycle: bits(duty as u128),
            ..RegisterFile::default()
        }
    }

    fn bit4_trace(regs: RegisterFile, ticks: usize) -> miette::Result<Vec<bool>> {
        let uut = PwmPeripheral::default();
        Ok(uut
            .run(vec![regs; ticks].into_iter().with_reset(1).clock_pos_edge(100))?
            .synchronous_sample()
            .map(|s| (s.value.2.uo_out & bits(0x10)) != bits(0))
            .collect())
    }

    #[test]
    fn test_pwm_level() {
        assert!(!pwm_level(bits(0), bits(0)));
        assert!(pwm_level(bits(0), bits(1)));
        assert!(!pwm_level(bits(1), bits(1)));
        assert!(pwm_level(bits(0xFE), bits(0xFF)));
        assert!(pwm_level(bits(0xFF), bits(0xFF)));
    }

    #[test]
    fn test_gate_outputs() {
        // no pwm enabled: plain enables
        assert_eq!(gate_outputs(bits(0xF0), bits(0x00), false), bits(0xF0));
        // pwm on the top nibble, level low
        assert_eq!(gate_outputs(bits(0xFF), bits(0xF0), false), bits(0x0F));
        // pwm enabled on a disabled bit stays low
        assert_eq!(gate_outputs(bits(0x00), bits(0xFF), true), bits(0x00));
    }

    #[test]
    fn test_duty_cycles() -> miette::Result<()> {
        for (duty, expected_high) in [(0x40_u8, 64 * PWM_PRESCALE), (0x80, 128 * PWM_PRESCALE), (0xC0, 192 * PWM_PRESCALE)] {
            let trace = bit4_trace(registers(0xF0, 0xF0, duty), 3 * PWM_PERIOD_TICKS)?;
            // one full period, skipping the first period
            let window = &trace[PWM_PERIOD_TICKS..2 * PWM_PERIOD_TICKS];
            let high = window.iter().filter(|b| **b).count();
            assert_eq!(high, expected_high, "duty {duty:#04x}");
        }
        Ok(())
    }

    #[test]
    fn test_period() -> miette::Result<()> {
        let trace = bit4_trace(registers(0xF0, 0xF0, 0x80), 4 * PWM_PERIOD_TICKS)?;
        let rising: Vec<usize> = (1..trace.len()).filter(|&k| trace[k] && !trace[k - 1]).collect();
        assert!(rising.len() >= 3);
        for pair in rising.windows(2) {
            assert_eq!(pair[1] - pair[0], PWM_PERIOD_TICKS);
        }
        Ok(())
    }

    #[test]
    fn test_duty_extremes() -> miette::Result<()> {
        let trace = bit4_trace(registers(0xF0, 0xF0, 0x00), 2 * PWM_PERIOD_TICKS)?;
        assert!(trace.iter().all(|b| !*b));

        let trace = bit4_trace(registers(0xF0, 0xF0, 0xFF), 2 * PWM_PERIOD_TICKS)?;
        assert!(trace[3..].iter().all(|b| *b));
        Ok(())
    }

    #[test]
    fn test_static_enable_without_pwm() -> miette::Result<()> {
        let trace = bit4_trace(registers(0x10, 0x00, 0x00), 100)?;
        assert!(trace[3..].iter().all(|b| *b));
        Ok(())
    }
}
