mod data_loader;

use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use spi_core::bench::{run_chip, trace_chip, BenchConfig, BusScript, Frame};
use tracing::info;

use data_loader::TraceRow;

/// Replays a CSV transaction script through the simulated chip and records
/// the register file after each transaction.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Transaction script (columns: rw,address,data[,bits])
    #[arg(short, long, default_value = "data/transactions.csv")]
    input: PathBuf,

    /// Register trace output
    #[arg(short, long, default_value = "data/register_trace.csv")]
    output: PathBuf,

    /// Also dump the full waveform here
    #[arg(long)]
    vcd: Option<PathBuf>,

    /// SCLK half period in internal clock ticks
    #[arg(long, default_value_t = BenchConfig::default().sclk_half_period)]
    sclk_half_period: usize,

    /// Idle ticks after each frame
    #[arg(long, default_value_t = BenchConfig::default().idle_ticks)]
    idle_ticks: usize,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // 1. load the script
    let transactions = data_loader::load_transactions(&args.input)?;
    info!("loaded {} transactions from {}", transactions.len(), args.input.display());

    let frames = transactions
        .iter()
        .map(|t| t.frame())
        .collect::<Result<Vec<Frame>, _>>()?;

    // 2. build the bus waveform
    let config = BenchConfig {
        sclk_half_period: args.sclk_half_period,
        idle_ticks: args.idle_ticks,
        ..BenchConfig::default()
    };
    let mut script = BusScript::new(config)?;
    script.idle(5);
    let spans = script.frames(&frames);

    // 3. simulate
    let start_time = Instant::now();
    let outputs = run_chip(&script)?;
    info!("simulated {} ticks in {:.2?}", outputs.len(), start_time.elapsed());

    // 4. sample the registers at the end of each frame's idle tail
    let mut rows = Vec::with_capacity(frames.len());
    for (index, (frame, span)) in frames.iter().zip(&spans).enumerate() {
        let sample = &outputs[span.end - 1];
        let [out_enable_low, out_enable_high, pwm_enable_low, pwm_enable_high, pwm_duty_cycle] =
            sample.registers.snapshot();
        info!(
            index,
            word = frame.word(),
            bits = frame.len(),
            registers = ?sample.registers.snapshot(),
            "transaction replayed"
        );
        rows.push(TraceRow {
            index,
            word: format!("{:#06x}", frame.word()),
            bits: frame.len(),
            out_enable_low,
            out_enable_high,
            pwm_enable_low,
            pwm_enable_high,
            pwm_duty_cycle,
            uo_out: sample.uo_out.raw() as u8,
            uio_out: sample.uio_out.raw() as u8,
        });
    }

    data_loader::write_trace(&args.output, &rows)?;
    info!("register trace written to {}", args.output.display());

    if let Some(path) = &args.vcd {
        let vcd = trace_chip(&script)?;
        vcd.dump_to_file(path)?;
        info!("waveform written to {}", path.display());
    }

    Ok(())
}
