//! # Thresholds Subcommand
//!
//! ```bash
//! cspin thresholds check deploy/thresholds.yaml
//! ```
//!
//! The file holds `modulus`, `jackpot_limit`, `big_win_limit` and
//! `small_win_limit`. `.json` files are parsed as JSON, everything else as
//! YAML.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use cspin_core::ThresholdConfig;

#[derive(Args, Debug)]
pub struct ThresholdsArgs {
    #[command(subcommand)]
    pub command: ThresholdsCommand,
}

#[derive(Subcommand, Debug)]
pub enum ThresholdsCommand {
    /// Check a threshold file against the ordering invariant.
    Check {
        /// Path to the YAML or JSON file.
        file: PathBuf,
    },
}

/// Execute the thresholds subcommand. Returns the process exit code.
pub fn run_thresholds(args: &ThresholdsArgs) -> Result<u8> {
    match &args.command {
        ThresholdsCommand::Check { file } => run_check(file),
    }
}

fn run_check(file: &Path) -> Result<u8> {
    let config = read_thresholds(file)?;
    match config.validate() {
        Ok(()) => {
            println!(
                "OK: 0 < {} < {} < {} <= {}",
                config.jackpot_limit, config.big_win_limit, config.small_win_limit, config.modulus
            );
            Ok(0)
        }
        Err(e) => {
            println!("INVALID: {e}");
            Ok(1)
        }
    }
}

/// Parse a threshold file without validating it.
pub fn read_thresholds(file: &Path) -> Result<ThresholdConfig> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let is_json = file
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    tracing::debug!(path = %file.display(), json = is_json, "parsing threshold file");

    if is_json {
        serde_json::from_str(&raw).with_context(|| format!("{} is not valid threshold JSON", file.display()))
    } else {
        serde_yaml::from_str(&raw).with_context(|| format!("{} is not valid threshold YAML", file.display()))
    }
}

/// Parse and validate a threshold file.
pub fn load_thresholds(file: &Path) -> Result<ThresholdConfig> {
    let config = read_thresholds(file)?;
    config
        .validate()
        .with_context(|| format!("{} violates the threshold ordering", file.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const VALID_YAML: &str = "modulus: 10000\njackpot_limit: 50\nbig_win_limit: 250\nsmall_win_limit: 1000\n";

    #[test]
    fn reads_yaml() {
        let file = write_file(".yaml", VALID_YAML);
        assert_eq!(load_thresholds(file.path()).unwrap(), ThresholdConfig::default());
        assert_eq!(run_check(file.path()).unwrap(), 0);
    }

    #[test]
    fn reads_json() {
        let file = write_file(
            ".json",
            r#"{"modulus": 5000, "jackpot_limit": 10, "big_win_limit": 20, "small_win_limit": 30}"#,
        );
        let config = load_thresholds(file.path()).unwrap();
        assert_eq!(config.modulus, 5000);
        assert_eq!(config.small_win_limit, 30);
    }

    #[test]
    fn invalid_ordering_exits_one() {
        let file = write_file(
            ".yaml",
            "modulus: 10000\njackpot_limit: 250\nbig_win_limit: 250\nsmall_win_limit: 1000\n",
        );
        assert_eq!(run_check(file.path()).unwrap(), 1);
        assert!(load_thresholds(file.path()).is_err());
    }

    #[test]
    fn missing_field_is_an_error() {
        let file = write_file(".yaml", "modulus: 10000\njackpot_limit: 50\n");
        assert!(read_thresholds(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_thresholds(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read"));
    }
}
