//! Toy ceremony generator (tests and the `dev-ceremony` feature only)
//!
//! ⚠️ Every secret here (τ, contribution exponents) is either fixed by a seed or
//! returned to the caller. Artifacts built with this module are for exercising
//! the codecs and verifier and must never back a real deployment.
//!
//! The initial bundle is built directly from τ rather than from a constraint
//! system: IC/A/B/L points are random, `delta = 1`, and `H_j = [L_{2j+1}(τ)]₁`
//! exactly as a real setup derives it, so the H check against
//! [`ToySetup::ptau_bytes`] passes.

#![forbid(unsafe_code)]

use ark_bn254::{G1Projective, G2Projective};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{Field, UniformRand, Zero};
use blake2::{Blake2b512, Digest};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::io::Cursor;

use crate::domain::{odd_lagrange_at, DomainError};
use crate::error::FormatError;
use crate::mpc::{Contribution, ContributionKind, MpcTranscript, PublicKey, HASH_LEN};
use crate::ptau::{write_ptau, PtauHeader};
use crate::transcript::{accumulate, expected_transcript, hash_to_g2};
use crate::zkey::{write_zkey, Coefficient, Groth16Header, Matrix, ProvingKeyBundle};
use crate::{Fr, G1, G2};

/// Failures while building toy artifacts.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// Shape rejected by the codec
    #[error(transparent)]
    Format(#[from] FormatError),
    /// τ landed on the evaluation domain
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// `x = 0` has no inverse
    #[error("contribution secret must be non-zero")]
    ZeroSecret,
}

/// Publicly known τ and constraint-system hash.
#[derive(Clone, Debug)]
pub struct ToySetup {
    /// The toxic waste, in the clear.
    pub tau: Fr,
    /// Stand-in for a real constraint-system hash.
    pub cs_hash: [u8; HASH_LEN],
}

fn scale_g1(points: &[G1], k: Fr) -> Vec<G1> {
    let proj: Vec<G1Projective> = points.iter().map(|p| *p * k).collect();
    G1Projective::normalize_batch(&proj)
}

fn random_g1<R: Rng>(rng: &mut R, n: usize) -> Vec<G1> {
    let proj: Vec<G1Projective> = (0..n).map(|_| G1::generator() * Fr::rand(rng)).collect();
    G1Projective::normalize_batch(&proj)
}

fn random_g2<R: Rng>(rng: &mut R, n: usize) -> Vec<G2> {
    let proj: Vec<G2Projective> = (0..n).map(|_| G2::generator() * Fr::rand(rng)).collect();
    G2Projective::normalize_batch(&proj)
}

/// Non-zero random scalar.
pub fn random_secret<R: Rng>(rng: &mut R) -> Fr {
    loop {
        let x = Fr::rand(rng);
        if !x.is_zero() {
            return x;
        }
    }
}

/// Secret derived from a public beacon: `2^iterations_exp` rounds of BLAKE2b-512.
pub fn beacon_secret(beacon_hash: &[u8], iterations_exp: u8) -> Fr {
    let mut cur = Blake2b512::digest(beacon_hash);
    for _ in 1..(1u64 << iterations_exp.min(63)) {
        cur = Blake2b512::digest(cur);
    }
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&cur[..32]);
    random_secret(&mut ChaCha20Rng::from_seed(seed))
}

impl ToySetup {
    /// Random τ and constraint-system hash.
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        let mut cs_hash = [0u8; HASH_LEN];
        rng.fill_bytes(&mut cs_hash);
        Self { tau: random_secret(rng), cs_hash }
    }

    /// `[τ^i]₁` for `i < 2^(power+1) − 1` and `[τ^i]₂` for `i < 2^power`.
    pub fn ptau(&self, power: u32) -> (PtauHeader, Vec<G1>, Vec<G2>) {
        let header = PtauHeader { power, ceremony_power: power };
        let mut powers = Vec::with_capacity(header.tau_g1_len());
        let mut t = Fr::from(1u64);
        for _ in 0..header.tau_g1_len() {
            powers.push(t);
            t *= self.tau;
        }
        let g1: Vec<G1Projective> = powers.iter().map(|p| G1::generator() * p).collect();
        let g2: Vec<G2Projective> =
            powers[..header.tau_g2_len()].iter().map(|p| G2::generator() * p).collect();
        (header, G1Projective::normalize_batch(&g1), G2Projective::normalize_batch(&g2))
    }

    /// Serialized [`ToySetup::ptau`].
    pub fn ptau_bytes(&self, power: u32) -> Result<Vec<u8>, FormatError> {
        let (header, g1, g2) = self.ptau(power);
        Ok(write_ptau(Cursor::new(Vec::new()), header, &g1, &g2)?.into_inner())
    }

    /// Bundle with no contributions for a circuit of the given shape.
    pub fn initial_bundle<R: Rng>(
        &self,
        n_vars: u32,
        n_public: u32,
        domain_size: u32,
        rng: &mut R,
    ) -> Result<(ProvingKeyBundle, MpcTranscript), FixtureError> {
        let mut header = Groth16Header::bn254(n_vars, n_public, domain_size)?;
        let alpha = random_secret(rng);
        let beta = random_secret(rng);
        let gamma = random_secret(rng);
        header.alpha1 = (G1::generator() * alpha).into_affine();
        header.beta1 = (G1::generator() * beta).into_affine();
        header.beta2 = (G2::generator() * beta).into_affine();
        header.gamma2 = (G2::generator() * gamma).into_affine();

        let mut coeffs = Vec::new();
        for k in 0..domain_size.min(n_vars) {
            coeffs.push(Coefficient { matrix: Matrix::A, constraint: k, signal: k, value: Fr::from(1u64) });
            coeffs.push(Coefficient { matrix: Matrix::B, constraint: k, signal: 0, value: Fr::rand(rng) });
        }

        let lagrange = odd_lagrange_at(domain_size as usize, self.tau)?;
        let h: Vec<G1Projective> = lagrange.iter().map(|l| G1::generator() * l).collect();

        let n_vars = n_vars as usize;
        let bundle = ProvingKeyBundle {
            ic: random_g1(rng, n_public as usize + 1),
            coeffs,
            a: random_g1(rng, n_vars),
            b1: random_g1(rng, n_vars),
            b2: random_g2(rng, n_vars),
            c: random_g1(rng, header.n_private()),
            h: G1Projective::normalize_batch(&h),
            header,
        };
        Ok((bundle, MpcTranscript::new(self.cs_hash)))
    }
}

/// Apply secret `x` to a bundle: delta scales by `x`, L and H by `x⁻¹`, and a
/// matching proof of knowledge is appended to the transcript.
pub fn contribute<R: Rng>(
    bundle: &ProvingKeyBundle,
    mpc: &MpcTranscript,
    x: Fr,
    name: Option<&str>,
    kind: ContributionKind,
    rng: &mut R,
) -> Result<(ProvingKeyBundle, MpcTranscript), FixtureError> {
    let x_inv = x.inverse().ok_or(FixtureError::ZeroSecret)?;

    let s = random_secret(rng);
    let g1_s = (G1::generator() * s).into_affine();
    let g1_sx = (g1_s * x).into_affine();
    let mut key = PublicKey { g1_s, g1_sx, g2_spx: G2::zero() };
    let state = accumulate(&mpc.cs_hash, &mpc.contributions);
    let transcript = expected_transcript(&state, &key);
    key.g2_spx = (hash_to_g2(&transcript) * x).into_affine();

    let mut next = bundle.clone();
    next.header.delta1 = (bundle.header.delta1 * x).into_affine();
    next.header.delta2 = (bundle.header.delta2 * x).into_affine();
    next.c = scale_g1(&bundle.c, x_inv);
    next.h = scale_g1(&bundle.h, x_inv);

    let mut next_mpc = mpc.clone();
    next_mpc.contributions.push(Contribution {
        delta_after: next.header.delta1,
        key,
        transcript,
        name: name.map(str::to_owned),
        kind,
    });
    Ok((next, next_mpc))
}

/// Serialized bundle.
pub fn zkey_bytes(bundle: &ProvingKeyBundle, mpc: &MpcTranscript) -> Result<Vec<u8>, FormatError> {
    Ok(write_zkey(Cursor::new(Vec::new()), bundle, mpc)?.into_inner())
}
