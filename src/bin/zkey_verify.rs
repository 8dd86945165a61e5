//! Verify a contributed zkey against the initial zkey and the powers of tau.
//!
//! ```text
//! zkey_verify --zkey circuit_final.zkey --init circuit_0000.zkey --ptau pot12.ptau
//!             [--threads N] [--chunk POINTS] [--seed HEX64] [--json]
//! ```
//!
//! Settings start from `ZKEY_VERIFY_*` environment variables; flags override
//! them. Exit status: 0 when valid, 1 when the candidate is rejected, and an
//! error (also non-zero) when a file cannot be decoded.

#![forbid(unsafe_code)]

use std::{env, path::PathBuf, process::ExitCode};

use anyhow::anyhow;
use zkey_mpc::config::{parse_positive, parse_seed};
use zkey_mpc::{verify_zkey_files, TracingProgress, Verdict, VerifyConfig};

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

fn required(args: &[String], key: &str) -> anyhow::Result<PathBuf> {
    parse_flag(args, key)
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("missing required flag {key}\n\nusage: zkey_verify --zkey FILE --init FILE --ptau FILE [--threads N] [--chunk POINTS] [--seed HEX64] [--json]"))
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(env::var("RUST_LOG").unwrap_or_else(|_| "zkey_mpc=info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let zkey = required(&args, "--zkey")?;
    let init = required(&args, "--init")?;
    let ptau = required(&args, "--ptau")?;
    let json = args.iter().any(|a| a == "--json");

    let mut cfg = VerifyConfig::from_env()?;
    if let Some(v) = parse_flag(&args, "--threads") {
        cfg.workers = Some(parse_positive("--threads", &v)?);
    }
    if let Some(v) = parse_flag(&args, "--chunk") {
        cfg.chunk = parse_positive("--chunk", &v)?;
    }
    if let Some(v) = parse_flag(&args, "--seed") {
        cfg.seed = Some(parse_seed("--seed", &v)?);
    }

    let verdict = verify_zkey_files(&zkey, &init, &ptau, &cfg, &TracingProgress)
        .map_err(|e| anyhow!("cannot verify {}: {e}", zkey.display()))?;

    match verdict {
        Verdict::Valid(report) => {
            if json {
                let out = serde_json::json!({ "valid": true, "contributions": report.responses });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("✓ {} is a valid evolution of {}", zkey.display(), init.display());
                for r in &report.responses {
                    println!(
                        "  #{:<3} {:<6} {}",
                        r.index + 1,
                        r.kind,
                        r.name.as_deref().unwrap_or("<unnamed>")
                    );
                    if let (Some(exp), Some(hash)) = (r.iterations_exp, &r.beacon_hash) {
                        println!("        beacon 2^{exp} iterations of {hash}");
                    }
                    println!("        {}", hex::encode(r.digest));
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Verdict::Invalid(rejection) => {
            if json {
                let out = serde_json::json!({
                    "valid": false,
                    "check": rejection.check.to_string(),
                    "kind": format!("{:?}", rejection.kind()),
                    "detail": rejection.detail,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                eprintln!("✗ {} rejected ({:?}): {rejection}", zkey.display(), rejection.kind());
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
