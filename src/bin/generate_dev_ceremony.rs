//! Generate a development ceremony (NOT FOR PRODUCTION)
//!
//! Writes `dev.ptau`, `dev_0000.zkey` (initial) and `dev_0002.zkey` (one plain
//! and one beacon contribution) into `--out-dir`.

use anyhow::Result;
use rand::{rngs::StdRng, SeedableRng};
use std::path::PathBuf;
use zkey_mpc::fixture::{self, ToySetup};
use zkey_mpc::ptau::write_ptau_file;
use zkey_mpc::{write_zkey_file, ContributionKind};

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

/// Half the domain, but at least one private signal beyond the public inputs.
fn default_vars(power: u32, n_public: u32) -> u32 {
    ((1u32 << power.min(20)) / 2).max(n_public.saturating_add(2))
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let power: u32 = parse_flag(&args, "--power").and_then(|s| s.parse().ok()).unwrap_or(10);
    let n_public: u32 = parse_flag(&args, "--public").and_then(|s| s.parse().ok()).unwrap_or(1);
    let n_vars: u32 = parse_flag(&args, "--vars")
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| default_vars(power, n_public));
    let out_dir = parse_flag(&args, "--out-dir").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    if power == 0 || power > 27 {
        anyhow::bail!("--power must be in 1..=27, got {power}");
    }

    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!("⚠️  WARNING: Generating DEVELOPMENT ceremony (seed=42, τ is PUBLIC)");
    eprintln!("⚠️  These artifacts are NOT SECURE and must NEVER be used in production!");
    eprintln!("⚠️  Anyone can forge proofs for circuits set up with them.");
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut rng = StdRng::seed_from_u64(42);
    let setup = ToySetup::new(&mut rng);

    println!("Generating powers of tau: power={power}");
    let (header, tau_g1, tau_g2) = setup.ptau(power);
    let ptau_path = out_dir.join("dev.ptau");
    write_ptau_file(&ptau_path, header, &tau_g1, &tau_g2)?;
    println!("✓ {} ({} G1, {} G2 powers)", ptau_path.display(), tau_g1.len(), tau_g2.len());

    println!("Building initial bundle: nVars={n_vars}, nPublic={n_public}, domain=2^{power}");
    let initial = setup.initial_bundle(n_vars, n_public, 1u32 << power, &mut rng)?;
    let init_path = out_dir.join("dev_0000.zkey");
    write_zkey_file(&init_path, &initial.0, &initial.1)?;
    println!("✓ {}", init_path.display());

    let x = fixture::random_secret(&mut rng);
    let first = fixture::contribute(&initial.0, &initial.1, x, Some("dev contributor"), ContributionKind::Plain, &mut rng)?;

    let beacon_hash = [0x42u8; 32];
    let iterations_exp = 10;
    let x = fixture::beacon_secret(&beacon_hash, iterations_exp);
    let kind = ContributionKind::Beacon { iterations_exp, beacon_hash: beacon_hash.to_vec() };
    let last = fixture::contribute(&first.0, &first.1, x, Some("dev beacon"), kind, &mut rng)?;

    let final_path = out_dir.join("dev_0002.zkey");
    write_zkey_file(&final_path, &last.0, &last.1)?;
    println!("✓ {} ({} contributions)", final_path.display(), last.1.contributions.len());

    Ok(())
}
