//! # Simulate Subcommand
//!
//! Runs the same select-chain the server runs, over a transparent backend,
//! and reveals the result. Useful for checking a candidate threshold file
//! against known inputs before deploying it.
//!
//! ```bash
//! cspin simulate --value 120 --thresholds candidate.yaml
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use cspin_core::{Principal, ThresholdConfig};
use cspin_engine::{classify, INPUT_DOMAIN};
use cspin_sealed::{SealedArithmetic, TransparentBackend};
use serde::Serialize;

use crate::thresholds::load_thresholds;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Clear input in `[0, modulus)`.
    #[arg(long)]
    pub value: u32,

    /// Threshold file. Defaults to 10000 / 50 / 250 / 1000.
    #[arg(long)]
    pub thresholds: Option<PathBuf>,
}

/// Revealed outcome of one simulated classification.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Simulation {
    pub value: u32,
    pub tier: u64,
    pub win: bool,
    pub config: ThresholdConfig,
}

pub fn simulate(args: &SimulateArgs) -> Result<Simulation> {
    let config = match &args.thresholds {
        Some(path) => load_thresholds(path)?,
        None => ThresholdConfig::default(),
    };
    if args.value >= config.modulus {
        bail!("value {} is outside [0, {})", args.value, config.modulus);
    }

    let backend = TransparentBackend::new();
    let who = Principal::new("simulator").context("simulator principal")?;
    let input = TransparentBackend::encrypt(INPUT_DOMAIN, u64::from(args.value), &who)?;
    let sealed = backend.ingest(&input, &who)?;
    let result = classify(&backend, sealed, &config)?;

    let tier = backend.reveal(&result.tier)?;
    let win = backend.reveal(&result.win)? == 1;
    tracing::debug!(value = args.value, tier, win, "simulated classification");

    Ok(Simulation {
        value: args.value,
        tier,
        win,
        config,
    })
}

pub fn run_simulate(args: &SimulateArgs) -> Result<u8> {
    let sim = simulate(args)?;
    println!("{}", serde_json::to_string_pretty(&sim)?);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(value: u32, thresholds: Option<PathBuf>) -> SimulateArgs {
        SimulateArgs { value, thresholds }
    }

    #[test]
    fn default_thresholds_match_reference_partition() {
        for (value, tier, win) in [(30, 3, true), (100, 2, true), (500, 1, true), (9999, 0, false)] {
            let sim = simulate(&args(value, None)).unwrap();
            assert_eq!((sim.tier, sim.win), (tier, win), "value {value}");
        }
    }

    #[test]
    fn uses_threshold_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "modulus: 5000\njackpot_limit: 100\nbig_win_limit: 500\nsmall_win_limit: 2000").unwrap();
        let sim = simulate(&args(75, Some(file.path().to_path_buf()))).unwrap();
        assert_eq!(sim.tier, 3);
        assert_eq!(sim.config.modulus, 5000);
    }

    #[test]
    fn rejects_value_outside_modulus() {
        let err = simulate(&args(10_000, None)).unwrap_err();
        assert!(err.to_string().contains("outside"));
    }
}
