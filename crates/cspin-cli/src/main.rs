//! # cspin CLI entry point

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cspin_cli::encrypt::{run_encrypt, EncryptArgs};
use cspin_cli::simulate::{run_simulate, SimulateArgs};
use cspin_cli::thresholds::{run_thresholds, ThresholdsArgs};

/// Operator tooling for confidential spin classification.
#[derive(Parser, Debug)]
#[command(name = "cspin", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate threshold configuration files.
    Thresholds(ThresholdsArgs),

    /// Encrypt a value for a principal with the transparent backend.
    Encrypt(EncryptArgs),

    /// Classify a clear value offline and print the revealed tier.
    Simulate(SimulateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Thresholds(args) => run_thresholds(&args),
        Commands::Encrypt(args) => run_encrypt(&args),
        Commands::Simulate(args) => run_simulate(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_thresholds_check() {
        let cli = Cli::try_parse_from(["cspin", "thresholds", "check", "t.yaml"]).unwrap();
        assert!(matches!(cli.command, Commands::Thresholds(_)));
    }

    #[test]
    fn parses_encrypt_with_default_domain() {
        let cli = Cli::try_parse_from(["cspin", "encrypt", "--value", "30", "--principal", "alice"]).unwrap();
        match cli.command {
            Commands::Encrypt(args) => {
                assert_eq!(args.value, 30);
                assert_eq!(args.domain, cspin_sealed::SealedDomain::Uint16);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_domain() {
        assert!(Cli::try_parse_from([
            "cspin", "encrypt", "--value", "1", "--principal", "a", "--domain", "int64"
        ])
        .is_err());
    }

    #[test]
    fn parses_simulate_and_verbosity() {
        let cli = Cli::try_parse_from(["cspin", "-vv", "simulate", "--value", "120"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Simulate(args) => {
                assert_eq!(args.value, 120);
                assert!(args.thresholds.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn requires_subcommand() {
        assert!(Cli::try_parse_from(["cspin"]).is_err());
    }
}
