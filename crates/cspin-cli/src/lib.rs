//! # cspin-cli: Operator Command-Line Interface
//!
//! ## Subcommands
//!
//! - `thresholds check`: validate a YAML or JSON threshold file
//! - `encrypt`: produce a transparent-backend input and proof for a principal
//! - `simulate`: classify a clear value offline and print its tier
//!
//! Argument parsing lives here; classification and validation are delegated
//! to the domain crates.

pub mod encrypt;
pub mod simulate;
pub mod thresholds;
