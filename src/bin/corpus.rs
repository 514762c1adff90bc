//! Synthetic Corpus Export
//!
//! Writes the labeled training corpus the engine would train on, so it can
//! be inspected or fed to other tools.
//!
//! # Usage
//! ```bash
//! ./corpus --samples 5000 --seed 7 --format csv > corpus.csv
//! ```

use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use pdm_engine::ml_engine::CorpusGenerator;
use pdm_engine::types::{ClassLabel, FaultType, TrainingSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// One JSON object per line
    Json,
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "corpus")]
#[command(about = "Export the synthetic predictive-maintenance training corpus")]
#[command(version)]
struct Args {
    /// Number of samples to generate
    #[arg(short = 'n', long, default_value = "30000")]
    samples: usize,

    /// Simulated equipment life in hours
    #[arg(long, default_value = "1000")]
    max_life_hours: f64,

    /// Random seed for reproducibility
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: Format,

    /// Suppress the class summary on stderr
    #[arg(short, long)]
    quiet: bool,
}

fn write_csv<W: Write>(out: &mut W, corpus: &[TrainingSample]) -> io::Result<()> {
    writeln!(out, "temperature,vibration,pressure,rpm,fault_type,severity,rul_hours,recommendation")?;
    for s in corpus {
        writeln!(
            out,
            "{:.4},{:.4},{:.4},{:.2},{},{},{:.2},\"{}\"",
            s.temperature,
            s.vibration,
            s.pressure,
            s.rpm,
            s.fault_type,
            s.severity,
            s.rul_hours,
            s.recommendation.replace('"', "\"\"")
        )?;
    }
    Ok(())
}

fn write_json_lines<W: Write>(out: &mut W, corpus: &[TrainingSample]) -> Result<()> {
    for s in corpus {
        serde_json::to_writer(&mut *out, s)?;
        writeln!(out)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let corpus = CorpusGenerator::new(args.samples, args.max_life_hours, args.seed)
        .generate()
        .context("Corpus generation failed")?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match args.format {
        Format::Csv => write_csv(&mut out, &corpus)?,
        Format::Json => write_json_lines(&mut out, &corpus)?,
    }
    out.flush()?;

    if !args.quiet {
        eprintln!("{} samples (seed {})", corpus.len(), args.seed);
        for fault in FaultType::ALL {
            let n = corpus.iter().filter(|s| s.fault_type == *fault).count();
            eprintln!("  {:<12} {:>6} ({:.1}%)", fault.as_str(), n, 100.0 * n as f64 / corpus.len() as f64);
        }
    }
    Ok(())
}
