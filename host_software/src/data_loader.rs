use serde::{Deserialize, Deserializer, Serialize};
use spi_core::bench::{BenchError, Frame};
use spi_core::WORD_BITS;
use std::error::Error;
use std::fs::File;
use std::path::Path;

// one row of the transaction script
#[derive(Debug, Deserialize)]
pub struct Transaction {
    // 1 = write, 0 = read
    #[serde(deserialize_with = "hex_or_decimal")]
    pub rw: u8,
    #[serde(deserialize_with = "hex_or_decimal")]
    pub address: u8,
    #[serde(deserialize_with = "hex_or_decimal")]
    pub data: u8,
    // clocked bits, 16 when left empty
    #[serde(default)]
    pub bits: Option<usize>,
}

impl Transaction {
    pub fn frame(&self) -> Result<Frame, BenchError> {
        let frame = Frame::command(self.rw != 0, self.address, self.data)?;
        match self.bits {
            Some(n) if n < WORD_BITS => Ok(frame.truncated(n)),
            // extra clocks after the word carry zeros
            Some(n) if n > WORD_BITS => Frame::raw(frame.word().checked_shl((n - WORD_BITS) as u32).unwrap_or(0), n),
            _ => Ok(frame),
        }
    }
}

// one row of the register trace, sampled when the frame's idle tail ends
#[derive(Debug, Serialize)]
pub struct TraceRow {
    pub index: usize,
    pub word: String,
    pub bits: usize,
    pub out_enable_low: u8,
    pub out_enable_high: u8,
    pub pwm_enable_low: u8,
    pub pwm_enable_high: u8,
    pub pwm_duty_cycle: u8,
    pub uo_out: u8,
    pub uio_out: u8,
}

fn hex_or_decimal<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => raw.parse::<u8>(),
    };
    parsed.map_err(|e| serde::de::Error::custom(format!("bad byte '{}': {}", raw, e)))
}

pub fn load_transactions(path: &Path) -> Result<Vec<Transaction>, Box<dyn Error>> {
    if !path.exists() {
        return Err(format!("transaction script not found: {}", path.display()).into());
    }

    let file = File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);
    let mut transactions = Vec::new();

    for result in rdr.deserialize() {
        transactions.push(result?);
    }

    if transactions.is_empty() {
        return Err(format!("no transactions in {}", path.display()).into());
    }

    Ok(transactions)
}

pub fn write_trace(path: &Path, rows: &[TraceRow]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
