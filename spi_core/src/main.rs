use miette::Diagnostic;
use spi_core::bench::{run_chip, trace_chip, BenchConfig, BenchError, BusScript, Frame};
use spi_core::Register;
use tracing::info;

// renders simulator and bench errors the same way
fn miette_report(err: &dyn Diagnostic) -> String {
    let handler = miette::GraphicalReportHandler::new_themed(miette::GraphicalTheme::unicode_nocolor());
    let mut msg = String::new();
    if handler.render_report(&mut msg, err).is_err() {
        msg = err.to_string();
    }
    msg
}

fn run_simulation() -> Result<(), BenchError> {
    info!("starting spi peripheral simulation");

    // scenario: the same sequence the bring-up bench uses
    // two writes, one unmapped write, two reads, then pwm setup
    let frames = [
        Frame::write(Register::OutEnableLow.address(), 0xF0)?,
        Frame::write(Register::OutEnableHigh.address(), 0xCC)?,
        Frame::write(0x30, 0xAA)?,
        Frame::read(0x30, 0xBE)?,
        Frame::read(0x41, 0xEF)?,
        Frame::write(Register::PwmEnableLow.address(), 0xF0)?,
        Frame::write(Register::PwmDutyCycle.address(), 0x80)?,
    ];

    let mut script = BusScript::new(BenchConfig::default())?;
    // reset & settle
    script.idle(5);
    let spans = script.frames(&frames);
    // let the pwm run for a few periods
    script.idle(4 * spi_core::pwm::PWM_PERIOD_TICKS);

    let outputs = run_chip(&script)?;

    for (frame, span) in frames.iter().zip(&spans) {
        let registers = &outputs[span.end - 1].registers;
        info!(
            word = frame.word(),
            registers = ?registers.snapshot(),
            "after frame"
        );
    }

    if let Some(last) = outputs.last() {
        for register in Register::ALL {
            info!("{:>16} = {:#04x}", register.name(), register.read(&last.registers));
        }
    }

    let filename = "spi_peripheral.vcd";
    info!("writing waveform to '{}'", filename);
    let vcd = trace_chip(&script)?;
    vcd.dump_to_file(filename)?;

    info!("done, open the waveform in GTKWave and follow top/spi/bank/registers");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run_simulation() {
        println!("{}", miette_report(&e));
    }
}
