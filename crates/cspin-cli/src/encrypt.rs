//! # Encrypt Subcommand
//!
//! Produces an input the API accepts, using the transparent backend's
//! encoding. The proof is bound to `--principal`; submitting it as anyone
//! else is rejected.
//!
//! ```bash
//! cspin encrypt --value 30 --principal alice \
//!   | curl -H "Authorization: Bearer player:alice:$AUTH_TOKEN" \
//!          -H 'Content-Type: application/json' -d @- localhost:8080/v1/spins
//! ```

use anyhow::{Context, Result};
use clap::Args;
use cspin_core::Principal;
use cspin_sealed::{EncryptedInput, SealedDomain, TransparentBackend};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct EncryptArgs {
    /// Clear value to encrypt.
    #[arg(long)]
    pub value: u64,

    /// Principal the proof is bound to.
    #[arg(long)]
    pub principal: String,

    /// Sealed domain: bool, uint8, uint16 or uint32.
    #[arg(long, default_value = "uint16", value_parser = parse_domain)]
    pub domain: SealedDomain,
}

/// Request body for `POST /v1/spins`.
#[derive(Debug, Serialize)]
pub struct EncryptedPayload {
    pub domain: SealedDomain,
    pub ciphertext: String,
    pub proof: String,
}

impl From<&EncryptedInput> for EncryptedPayload {
    fn from(input: &EncryptedInput) -> Self {
        Self {
            domain: input.domain,
            ciphertext: input.ciphertext_hex(),
            proof: input.proof_hex(),
        }
    }
}

pub fn parse_domain(s: &str) -> Result<SealedDomain, String> {
    [
        SealedDomain::Bool,
        SealedDomain::Uint8,
        SealedDomain::Uint16,
        SealedDomain::Uint32,
    ]
    .into_iter()
    .find(|d| d.as_str() == s)
    .ok_or_else(|| format!("unknown domain '{s}', expected bool, uint8, uint16 or uint32"))
}

/// Encrypt `args.value` for `args.principal`.
pub fn encrypt(args: &EncryptArgs) -> Result<EncryptedPayload> {
    let principal = Principal::new(args.principal.as_str()).context("invalid --principal")?;
    let input = TransparentBackend::encrypt(args.domain, args.value, &principal)
        .with_context(|| format!("cannot encrypt {} as {}", args.value, args.domain))?;
    Ok(EncryptedPayload::from(&input))
}

pub fn run_encrypt(args: &EncryptArgs) -> Result<u8> {
    let payload = encrypt(args)?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: u64, principal: &str, domain: SealedDomain) -> EncryptArgs {
        EncryptArgs {
            value,
            principal: principal.to_string(),
            domain,
        }
    }

    #[test]
    fn payload_round_trips_through_from_hex() {
        let payload = encrypt(&args(30, "alice", SealedDomain::Uint16)).unwrap();
        assert_eq!(payload.ciphertext, "0x001e");
        let input = EncryptedInput::from_hex(payload.domain, &payload.ciphertext, &payload.proof).unwrap();
        let backend = TransparentBackend::new();
        let sealed = cspin_sealed::SealedArithmetic::ingest(&backend, &input, &Principal::new("alice").unwrap()).unwrap();
        assert_eq!(backend.reveal(&sealed).unwrap(), 30);
    }

    #[test]
    fn serializes_domain_in_snake_case() {
        let payload = encrypt(&args(1, "alice", SealedDomain::Uint8)).unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["domain"], "uint8");
    }

    #[test]
    fn rejects_out_of_range_and_reserved() {
        assert!(encrypt(&args(70_000, "alice", SealedDomain::Uint16)).is_err());
        assert!(encrypt(&args(1, "cspin:engine", SealedDomain::Uint16)).is_err());
    }

    #[test]
    fn parses_domains() {
        assert_eq!(parse_domain("uint32").unwrap(), SealedDomain::Uint32);
        assert!(parse_domain("int64").is_err());
    }
}
