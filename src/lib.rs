//! Crate root: public surface, curve aliases, and artifact-wide invariants
//!
//! `zkey-mpc` persists and audits the artifacts of a Groth16 phase-2 trusted
//! setup: the proving-key bundle (`.zkey`), the MPC transcript embedded in it,
//! and the powers-of-tau file the bundle was derived from.
//!
//! ## Invariants
//!
//! - **Curve.** BN254 only. Scalars are `ark_bn254::Fr` ([`Fr`]), points are
//!   affine ([`G1`], [`G2`]). Headers carrying any other modulus are rejected
//!   with [`FormatError::UnsupportedCurve`]. We **forbid unsafe** throughout.
//!
//! - **Container.** Every artifact is `magic ‖ u32 version ‖ u32 n_sections`
//!   followed by `(u32 id, u64 len, payload)` records, all little-endian
//!   (see [`container`]). Points are stored as little-endian Montgomery limbs
//!   and hashed in big-endian canonical form (see [`group_codec`]).
//!
//! - **Evolving sections.** A contribution with secret `x` multiplies `delta`
//!   by `x` and the L and H sections by `x⁻¹`. Everything else (verification
//!   key, IC, coefficients, A, B1, B2) is byte-identical to the initial bundle.
//!
//! - **Streaming discipline.** The verifier never materializes an L, H or tau
//!   section; it aggregates bounded chunks (see [`stream`], [`msm`]).
//!
//! - **Transcript.** BLAKE2b-512 over the constraint-system hash and the public
//!   keys, in order. Challenges in G2 are derived from a domain-separated hash
//!   (see [`transcript`]).

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms)]

/// Section container: magic/version header and `(id, len)` framed sections.
pub mod container;
/// Error categories for malformed artifacts.
pub mod error;
/// Field element and curve point codecs (storage and hash forms).
pub mod group_codec;
/// Groth16 proving-key bundle codec.
pub mod zkey;
/// MPC transcript codec (section 10 of a bundle).
pub mod mpc;
/// BLAKE2b transcript accumulation and hash-to-G2.
pub mod transcript;
/// Chunked iteration over point sections.
pub mod stream;
/// Radix-2 NTT and the odd-coset transform used by the H check.
pub mod domain;
/// Worker pool for batch point arithmetic.
pub mod pool;
/// Streaming multi-scalar aggregation and the pairing ratio check.
pub mod msm;
/// Powers-of-tau reader and writer.
pub mod ptau;
/// Contribution chain replay.
pub mod chain;
/// Cross-file consistency verifier.
pub mod verify;
/// Verification settings and environment overrides.
pub mod config;
/// Toy ceremony generator (public τ; never for production).
#[cfg(any(test, feature = "dev-ceremony"))]
pub mod fixture;

// ============================================================================
// Canonical aliases and root-level re-exports
// ============================================================================

/// Scalar field of BN254.
pub type Fr = ark_bn254::Fr;

/// Base field of BN254.
pub type Fq = ark_bn254::Fq;

/// G1 affine point.
pub type G1 = ark_bn254::G1Affine;

/// G2 affine point.
pub type G2 = ark_bn254::G2Affine;

pub use crate::chain::{ChainReport, ContributionResponse};
pub use crate::config::{ConfigError, VerifyConfig};
pub use crate::error::FormatError;
pub use crate::mpc::{Contribution, ContributionKind, MpcTranscript, PublicKey};
pub use crate::verify::{
    verify_zkey, verify_zkey_files, Check, NoProgress, Progress, ProgressEvent, Rejection, RejectionKind,
    TracingProgress, Verdict, VerifyError,
};
pub use crate::zkey::{read_zkey, read_zkey_file, write_zkey, write_zkey_file, Groth16Header, ProvingKeyBundle};
