//! Cross-File Consistency Verifier
//!
//! Decides whether a candidate bundle is a legitimate evolution of a freshly
//! built initial bundle through the contributions recorded in its transcript.
//!
//! # Outcomes
//!
//! - `Err(VerifyError)`: a hard fault. Some file is malformed (or I/O failed),
//!   nothing can be concluded.
//! - `Ok(Verdict::Invalid(rejection))`: the files decode but the candidate is
//!   not a valid ceremony step. [`Rejection::kind`] tells consistency problems
//!   (shape, hashes, byte-identical sections) from cryptographic ones
//!   (transcript, pairings, batch checks).
//! - `Ok(Verdict::Valid(report))`: every check passed; the report carries the
//!   per-contribution audit digests.
//!
//! # Check order
//!
//! Cheap structural checks run first and the first failure stops the run:
//!
//! ```text
//! circuit shape → csHash → L/H sizes → ptau size → alpha1/beta1/beta2/gamma2
//!   → IC, coefficients, A, B1, B2 byte equality → contribution chain
//!   → delta1 → delta2 ratio → L batch ratio → H batch ratio
//! ```
//!
//! # Batch checks
//!
//! L: one random 64-bit scalar per point, the same scalars applied to the
//! initial and the candidate section; the aggregates must satisfy
//! `(R_init, R_cand) ~ (delta2_cand, delta2_init)`.
//!
//! H: random `r_i` for `i < n−1` (`r_{n−1} = 0`),
//! `R1 = Σ r_i·([τ^{n+i}]₁ − [τ^i]₁)` from the powers of tau and
//! `R2 = Σ s_j·H_j` with `s = odd_coset_transform(r)` (see [`crate::domain`]);
//! the same ratio check applies. All scalars come from one ChaCha20 stream so
//! a run is reproducible from [`VerifyConfig::seed`].
//!
//! [`same_ratio`] rejects identity operands, so a check with no terms to
//! aggregate (an empty L section, a domain of one point) is skipped rather
//! than evaluated. Curve moduli are not compared here: decoding a header with
//! any modulus other than BN254's is already [`FormatError::UnsupportedCurve`].

#![forbid(unsafe_code)]

use ark_ec::AffineRepr;
use rand::{rngs::OsRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::chain::{self, ChainFault, ChainReport, ContributionResponse};
use crate::config::VerifyConfig;
use crate::container::BinFile;
use crate::domain::{odd_coset_transform, DomainError};
use crate::error::FormatError;
use crate::group_codec::G1_SIZE;
use crate::mpc;
use crate::msm::{random_scalars, same_ratio, Aggregator, MsmError};
use crate::pool::{PoolError, WorkerPool};
use crate::ptau::PowersOfTau;
use crate::stream::{chunks, SectionStream, StreamError};
use crate::zkey::{self, section, Groth16Header};
use crate::{Fr, G1, G2};

// ============================================================================
// Outcomes
// ============================================================================

/// Hard faults: verification could not run to a verdict.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// A file is malformed or unreadable
    #[error(transparent)]
    Format(#[from] FormatError),
    /// Worker pool could not start
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// H check transform failed
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// Aggregation inputs out of step
    #[error(transparent)]
    Msm(#[from] MsmError),
    /// Invalid chunk size
    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Which check rejected the candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Check {
    /// nVars, nPublic or domainSize differ.
    CircuitShape,
    /// Transcripts are for different constraint systems.
    CsHash,
    /// Declared byte size of an evolving section (`"C"` or `"H"`).
    SectionSize(&'static str),
    /// Powers of tau cover a smaller domain than the circuit.
    PtauTooSmall,
    /// A verification-key element no contribution may touch.
    VerificationKey(&'static str),
    /// A section that must be byte-identical to the initial bundle.
    SectionBytes(&'static str),
    /// The chain replay failed.
    Contribution {
        /// Zero-based contribution index.
        index: usize,
        /// Which of its checks failed.
        fault: ChainFault,
    },
    /// `delta1` is not the chain's final delta.
    Delta1,
    /// `delta2` has a different discrete log than `delta1`.
    Delta2,
    /// L (C section) batch ratio.
    LBatch,
    /// H batch ratio against the powers of tau.
    HBatch,
}

/// Consistency failures compare structure; cryptographic ones need pairings or hashes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectionKind {
    /// Structure, hashes or bytes disagree.
    Consistency,
    /// A transcript hash or pairing check failed.
    Cryptographic,
}

impl Check {
    /// Category of this check.
    pub fn kind(&self) -> RejectionKind {
        match self {
            Check::CircuitShape
            | Check::CsHash
            | Check::SectionSize(_)
            | Check::PtauTooSmall
            | Check::VerificationKey(_)
            | Check::SectionBytes(_) => RejectionKind::Consistency,
            Check::Contribution { .. } | Check::Delta1 | Check::Delta2 | Check::LBatch | Check::HBatch => {
                RejectionKind::Cryptographic
            }
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::CircuitShape => write!(f, "circuit shape"),
            Check::CsHash => write!(f, "constraint system hash"),
            Check::SectionSize(s) => write!(f, "{s} section size"),
            Check::PtauTooSmall => write!(f, "powers of tau size"),
            Check::VerificationKey(k) => write!(f, "{k}"),
            Check::SectionBytes(s) => write!(f, "{s} section"),
            Check::Contribution { index, fault } => write!(f, "contribution {index}: {fault}"),
            Check::Delta1 => write!(f, "delta1"),
            Check::Delta2 => write!(f, "delta2"),
            Check::LBatch => write!(f, "L section"),
            Check::HBatch => write!(f, "H section"),
        }
    }
}

/// Why the candidate is not a valid evolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejection {
    /// First failing check.
    pub check: Check,
    /// Human-readable context.
    pub detail: String,
}

impl Rejection {
    /// Category of the failing check.
    #[inline]
    pub fn kind(&self) -> RejectionKind {
        self.check.kind()
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.check, self.detail)
    }
}

/// Outcome of a verification that ran to completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Every check passed.
    Valid(ChainReport),
    /// A check failed.
    Invalid(Rejection),
}

impl Verdict {
    /// `true` for [`Verdict::Valid`].
    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid(_))
    }
}

fn reject(check: Check, detail: impl Into<String>) -> Verdict {
    let rejection = Rejection { check, detail: detail.into() };
    warn!(kind = ?rejection.kind(), "{rejection}");
    Verdict::Invalid(rejection)
}

// ============================================================================
// Progress
// ============================================================================

/// Milestones reported while verifying.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A named check is starting.
    Started(&'static str),
    /// A named check passed.
    Passed(&'static str),
    /// One contribution of the chain verified.
    Contribution(ContributionResponse),
    /// Points of a streamed section processed so far.
    Chunk {
        /// `"L"`, `"H"` or `"tau"`.
        section: &'static str,
        /// Points done.
        done: usize,
        /// Points in the section.
        total: usize,
    },
}

/// Receives progress from deep inside the checks.
pub trait Progress: Sync {
    /// Called synchronously from the verifying thread.
    fn event(&self, event: &ProgressEvent);
}

/// Forwards progress to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingProgress;

impl Progress for TracingProgress {
    fn event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started(what) => info!("checking {what}"),
            ProgressEvent::Passed(what) => debug!("{what}: ok"),
            ProgressEvent::Contribution(r) => info!(
                index = r.index,
                name = r.name.as_deref().unwrap_or("<unnamed>"),
                kind = r.kind,
                digest = %hex::encode(r.digest),
                "contribution verified"
            ),
            ProgressEvent::Chunk { section, done, total } => debug!(section, done, total, "chunk"),
        }
    }
}

/// Discards all progress.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn event(&self, _event: &ProgressEvent) {}
}

// ============================================================================
// Entry points
// ============================================================================

/// Verify `candidate` against `initial` and a powers-of-tau artifact.
pub fn verify_zkey<C, I, P>(
    candidate: C,
    initial: I,
    ptau: P,
    cfg: &VerifyConfig,
    progress: &dyn Progress,
) -> Result<Verdict, VerifyError>
where
    C: Read + Seek,
    I: Read + Seek,
    P: Read + Seek,
{
    let mut cand = BinFile::open(candidate, zkey::ZKEY_MAGIC, zkey::ZKEY_VERSION)?;
    cand.ensure_unique_sections(1..=zkey::ZKEY_SECTIONS)?;
    let mut init = BinFile::open(initial, zkey::ZKEY_MAGIC, zkey::ZKEY_VERSION)?;
    init.ensure_unique_sections(1..=zkey::ZKEY_SECTIONS)?;
    let mut ptau = PowersOfTau::open(ptau)?;

    let cand_header = zkey::read_header(&mut cand)?;
    let init_header = zkey::read_header(&mut init)?;
    let cand_mpc = mpc::read_mpc_params(&mut cand)?;
    let init_mpc = mpc::read_mpc_params(&mut init)?;
    info!(
        n_vars = cand_header.n_vars,
        n_public = cand_header.n_public,
        domain_size = cand_header.domain_size,
        contributions = cand_mpc.contributions.len(),
        "bundles decoded"
    );

    progress.event(&ProgressEvent::Started("headers"));
    if let Some(v) = check_shape(&cand_header, &init_header) {
        return Ok(v);
    }
    if cand_mpc.cs_hash != init_mpc.cs_hash {
        return Ok(reject(Check::CsHash, "candidate and initial transcripts disagree"));
    }
    if let Some(v) = check_section_sizes(&cand, &init, &cand_header)? {
        return Ok(v);
    }
    progress.event(&ProgressEvent::Passed("headers"));
    let ptau_power = ptau.header().power;
    if ptau_power < cand_header.power {
        return Ok(reject(
            Check::PtauTooSmall,
            format!("powers of tau has power {ptau_power}, circuit needs {}", cand_header.power),
        ));
    }
    if let Some(v) = check_invariants(&mut cand, &mut init, &cand_header, &init_header, cfg, progress)? {
        return Ok(v);
    }

    progress.event(&ProgressEvent::Started("contribution chain"));
    let report = match chain::replay(&cand_mpc, progress) {
        Ok(r) => r,
        Err(e) => {
            return Ok(reject(Check::Contribution { index: e.index, fault: e.fault }, e.fault.to_string()))
        }
    };
    if cand_header.delta1 != report.final_delta {
        return Ok(reject(Check::Delta1, "delta1 does not match the contribution chain"));
    }
    if !same_ratio(&G1::generator(), &report.final_delta, &G2::generator(), &cand_header.delta2) {
        return Ok(reject(Check::Delta2, "delta2 is not consistent with delta1"));
    }
    progress.event(&ProgressEvent::Passed("contribution chain"));

    let seed = cfg.seed.unwrap_or_else(|| {
        let mut s = [0u8; 32];
        OsRng.fill_bytes(&mut s);
        s
    });
    let mut rng = ChaCha20Rng::from_seed(seed);
    let pool = WorkerPool::new(cfg.workers)?;

    progress.event(&ProgressEvent::Started("L section"));
    if !check_l(&mut cand, &mut init, &cand_header, &init_header, &pool, &mut rng, cfg, progress)? {
        return Ok(reject(Check::LBatch, "batched same-ratio check failed"));
    }
    progress.event(&ProgressEvent::Passed("L section"));

    progress.event(&ProgressEvent::Started("H section"));
    if !check_h(&mut cand, &mut ptau, &cand_header, &init_header, &pool, &mut rng, cfg, progress)? {
        return Ok(reject(Check::HBatch, "batched same-ratio check against powers of tau failed"));
    }
    progress.event(&ProgressEvent::Passed("H section"));

    info!(contributions = report.responses.len(), "zkey is valid");
    Ok(Verdict::Valid(report))
}

/// Open the three files as independent handles and run [`verify_zkey`].
pub fn verify_zkey_files(
    candidate: impl AsRef<Path>,
    initial: impl AsRef<Path>,
    ptau: impl AsRef<Path>,
    cfg: &VerifyConfig,
    progress: &dyn Progress,
) -> Result<Verdict, VerifyError> {
    let open = |p: &Path| -> Result<BufReader<File>, VerifyError> {
        Ok(BufReader::new(File::open(p).map_err(FormatError::from)?))
    };
    verify_zkey(open(candidate.as_ref())?, open(initial.as_ref())?, open(ptau.as_ref())?, cfg, progress)
}

// ============================================================================
// Checks
// ============================================================================

/// Circuit shape.
fn check_shape(c: &Groth16Header, i: &Groth16Header) -> Option<Verdict> {
    if c.n_vars != i.n_vars || c.n_public != i.n_public || c.domain_size != i.domain_size {
        return Some(reject(
            Check::CircuitShape,
            format!(
                "candidate ({}, {}, {}) vs initial ({}, {}, {}) for (nVars, nPublic, domainSize)",
                c.n_vars, c.n_public, c.domain_size, i.n_vars, i.n_public, i.domain_size
            ),
        ));
    }
    None
}

/// Declared byte sizes of the evolving sections in both files.
fn check_section_sizes<C: Read + Seek, I: Read + Seek>(
    cand: &BinFile<C>,
    init: &BinFile<I>,
    c: &Groth16Header,
) -> Result<Option<Verdict>, VerifyError> {
    let sizes = [
        ("C", section::C, (c.n_private() * G1_SIZE) as u64),
        ("H", section::H, c.domain_size as u64 * G1_SIZE as u64),
    ];
    for (name, id, expected) in sizes {
        for got in [cand.section_size(id)?, init.section_size(id)?] {
            if got != expected {
                return Ok(Some(reject(
                    Check::SectionSize(name),
                    format!("{got} bytes, expected {expected}"),
                )));
            }
        }
    }
    Ok(None)
}

/// Untouchable verification-key elements and byte-identical sections.
fn check_invariants<C: Read + Seek, I: Read + Seek>(
    cand: &mut BinFile<C>,
    init: &mut BinFile<I>,
    c: &Groth16Header,
    i: &Groth16Header,
    cfg: &VerifyConfig,
    progress: &dyn Progress,
) -> Result<Option<Verdict>, VerifyError> {
    progress.event(&ProgressEvent::Started("invariant sections"));
    let g1_keys = [("alpha1", c.alpha1 == i.alpha1), ("beta1", c.beta1 == i.beta1)];
    let g2_keys = [("beta2", c.beta2 == i.beta2), ("gamma2", c.gamma2 == i.gamma2)];
    for (name, equal) in g1_keys.into_iter().chain(g2_keys) {
        if !equal {
            return Ok(Some(reject(Check::VerificationKey(name), "differs from the initial bundle")));
        }
    }

    let byte_chunk = cfg.chunk.saturating_mul(G1_SIZE);
    let sections = [
        ("IC", section::IC),
        ("coefficients", section::COEFFS),
        ("A", section::A),
        ("B1", section::B1),
        ("B2", section::B2),
    ];
    for (name, id) in sections {
        if !cand.section_is_equal(init, id, byte_chunk)? {
            return Ok(Some(reject(Check::SectionBytes(name), "differs from the initial bundle")));
        }
    }
    progress.event(&ProgressEvent::Passed("invariant sections"));
    Ok(None)
}

#[allow(clippy::too_many_arguments)]
fn check_l<C: Read + Seek, I: Read + Seek>(
    cand: &mut BinFile<C>,
    init: &mut BinFile<I>,
    c: &Groth16Header,
    i: &Groth16Header,
    pool: &WorkerPool,
    rng: &mut ChaCha20Rng,
    cfg: &VerifyConfig,
    progress: &dyn Progress,
) -> Result<bool, VerifyError> {
    let mut init_stream = SectionStream::open(init, section::C, cfg.chunk)?;
    let mut cand_stream = SectionStream::open(cand, section::C, cfg.chunk)?;
    if init_stream.is_empty() {
        return Ok(true);
    }
    let total = init_stream.len();
    let mut r1 = Aggregator::new(pool, "L initial");
    let mut r2 = Aggregator::new(pool, "L candidate");

    while let Some(init_chunk) = init_stream.next_chunk()? {
        let cand_chunk = cand_stream.next_chunk()?.ok_or(FormatError::SectionOverrun {
            id: section::C,
            len: init_chunk.len() as u64,
        })?;
        let scalars = random_scalars(rng, init_chunk.len());
        r1.add_chunk(&init_chunk, &scalars)?;
        r2.add_chunk(&cand_chunk, &scalars)?;
        progress.event(&ProgressEvent::Chunk { section: "L", done: r1.cursor(), total });
    }
    Ok(same_ratio(&r1.finalize(), &r2.finalize(), &c.delta2, &i.delta2))
}

#[allow(clippy::too_many_arguments)]
fn check_h<C: Read + Seek, P: Read + Seek>(
    cand: &mut BinFile<C>,
    ptau: &mut PowersOfTau<P>,
    c: &Groth16Header,
    i: &Groth16Header,
    pool: &WorkerPool,
    rng: &mut ChaCha20Rng,
    cfg: &VerifyConfig,
    progress: &dyn Progress,
) -> Result<bool, VerifyError> {
    let n = c.domain_size as usize;
    if n < 2 {
        return Ok(true);
    }
    let mut r: Vec<Fr> = random_scalars(rng, n - 1);
    r.push(Fr::from(0u64));

    // R1 = Σ r_i · ([τ^{n+i}] − [τ^i]) over i < n−1.
    let mut r1 = Aggregator::new(pool, "H tau");
    for (start, end) in chunks(n - 1, cfg.chunk)? {
        let high = ptau.read_tau_g1(n + start, end - start)?;
        let low = ptau.read_tau_g1(start, end - start)?;
        let diff = pool.batch_sub(&high, &low)?;
        r1.add_chunk(&diff, &r[start..end])?;
        progress.event(&ProgressEvent::Chunk { section: "tau", done: end, total: n - 1 });
    }

    let s = pool.install(|| odd_coset_transform(&r))?;

    // R2 = Σ s_j · H_j.
    let mut r2 = Aggregator::new(pool, "H candidate");
    let mut stream = SectionStream::open(cand, section::H, cfg.chunk)?;
    while let Some(chunk) = stream.next_chunk()? {
        let start = r2.cursor();
        r2.add_chunk(&chunk, &s[start..start + chunk.len()])?;
        progress.event(&ProgressEvent::Chunk { section: "H", done: r2.cursor(), total: n });
    }
    Ok(same_ratio(&r1.finalize(), &r2.finalize(), &c.delta2, &i.delta2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{self, ToySetup};
    use crate::mpc::{Contribution, ContributionKind, MpcTranscript, PublicKey};
    use crate::transcript::{expected_transcript, TranscriptHasher};
    use crate::zkey::ProvingKeyBundle;
    use ark_ec::CurveGroup;
    use rand::rngs::StdRng;
    use std::io::Cursor;

    struct Ceremony {
        ptau: Vec<u8>,
        initial: (ProvingKeyBundle, MpcTranscript),
        candidate: (ProvingKeyBundle, MpcTranscript),
    }

    fn ceremony(seed: u8, contributions: usize) -> Ceremony {
        let mut rng = StdRng::from_seed([seed; 32]);
        let setup = ToySetup::new(&mut rng);
        let ptau = setup.ptau_bytes(3).unwrap();
        let initial = setup.initial_bundle(6, 2, 8, &mut rng).unwrap();
        let mut candidate = initial.clone();
        for k in 0..contributions {
            let kind = if k + 1 == contributions && k > 0 {
                ContributionKind::Beacon { iterations_exp: 3, beacon_hash: vec![0x5a; 32] }
            } else {
                ContributionKind::Plain
            };
            let x = fixture::random_secret(&mut rng);
            candidate = fixture::contribute(&candidate.0, &candidate.1, x, Some("p"), kind, &mut rng).unwrap();
        }
        Ceremony { ptau, initial, candidate }
    }

    fn cfg() -> VerifyConfig {
        VerifyConfig { chunk: 3, workers: Some(2), seed: Some([77u8; 32]) }
    }

    fn run(c: &Ceremony) -> Result<Verdict, VerifyError> {
        let cand = fixture::zkey_bytes(&c.candidate.0, &c.candidate.1).unwrap();
        let init = fixture::zkey_bytes(&c.initial.0, &c.initial.1).unwrap();
        verify_zkey(Cursor::new(cand), Cursor::new(init), Cursor::new(c.ptau.clone()), &cfg(), &NoProgress)
    }

    /// `(header offset, payload length)` of section `id` in a serialized container.
    fn locate_section(bytes: &[u8], id: u32) -> (usize, usize) {
        let mut pos = 12;
        while pos + 12 <= bytes.len() {
            let sid = u32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap());
            let len = u64::from_le_bytes(bytes[pos + 4..pos + 12].try_into().unwrap()) as usize;
            if sid == id {
                return (pos, len);
            }
            pos += 12 + len;
        }
        panic!("section {id} not found");
    }

    /// Append `extra` to section `id`, keeping its declared length in step.
    fn grow_section(bytes: &[u8], id: u32, extra: &[u8]) -> Vec<u8> {
        let (pos, len) = locate_section(bytes, id);
        let end = pos + 12 + len;
        let mut out = bytes[..pos + 4].to_vec();
        out.extend_from_slice(&((len + extra.len()) as u64).to_le_bytes());
        out.extend_from_slice(&bytes[pos + 12..end]);
        out.extend_from_slice(extra);
        out.extend_from_slice(&bytes[end..]);
        out
    }

    fn run_bytes(cand: Vec<u8>, c: &Ceremony) -> Result<Verdict, VerifyError> {
        let init = fixture::zkey_bytes(&c.initial.0, &c.initial.1).unwrap();
        verify_zkey(Cursor::new(cand), Cursor::new(init), Cursor::new(c.ptau.clone()), &cfg(), &NoProgress)
    }

    fn rejected(v: Verdict) -> Rejection {
        match v {
            Verdict::Invalid(r) => r,
            Verdict::Valid(_) => panic!("expected a rejection"),
        }
    }

    #[test]
    fn untouched_initial_bundle_is_valid() {
        let c = ceremony(1, 0);
        match run(&c).unwrap() {
            Verdict::Valid(report) => assert!(report.responses.is_empty()),
            Verdict::Invalid(r) => panic!("unexpected rejection: {r}"),
        }
    }

    #[test]
    fn contributed_bundle_is_valid() {
        let c = ceremony(2, 3);
        match run(&c).unwrap() {
            Verdict::Valid(report) => {
                assert_eq!(report.responses.len(), 3);
                assert_eq!(report.responses[2].kind, "beacon");
                assert_eq!(report.final_delta, c.candidate.0.header.delta1);
            }
            Verdict::Invalid(r) => panic!("unexpected rejection: {r}"),
        }
    }

    #[test]
    fn tampered_l_point_fails_the_batch_check() {
        let mut c = ceremony(3, 1);
        let p = c.candidate.0.c[1];
        c.candidate.0.c[1] = (p + G1::generator()).into_affine();
        let r = rejected(run(&c).unwrap());
        assert_eq!(r.check, Check::LBatch);
        assert_eq!(r.kind(), RejectionKind::Cryptographic);
    }

    #[test]
    fn tampered_h_point_fails_the_batch_check() {
        let mut c = ceremony(4, 2);
        let p = c.candidate.0.h[5];
        c.candidate.0.h[5] = (p + G1::generator()).into_affine();
        assert_eq!(rejected(run(&c).unwrap()).check, Check::HBatch);
    }

    #[test]
    fn invariant_sections_must_be_identical() {
        let mut c = ceremony(5, 1);
        c.candidate.0.ic[0] = G1::generator();
        let r = rejected(run(&c).unwrap());
        assert_eq!(r.check, Check::SectionBytes("IC"));
        assert_eq!(r.kind(), RejectionKind::Consistency);

        let mut c = ceremony(5, 1);
        c.candidate.0.header.alpha1 = G1::generator();
        assert_eq!(rejected(run(&c).unwrap()).check, Check::VerificationKey("alpha1"));
    }

    #[test]
    fn cs_hash_and_shape_mismatches_are_consistency_failures() {
        let mut c = ceremony(6, 1);
        c.candidate.1.cs_hash[0] ^= 1;
        assert_eq!(rejected(run(&c).unwrap()).check, Check::CsHash);

        let mut rng = StdRng::from_seed([6u8; 32]);
        let mut c = ceremony(6, 0);
        c.initial = ToySetup::new(&mut rng).initial_bundle(5, 1, 8, &mut rng).unwrap();
        assert_eq!(rejected(run(&c).unwrap()).check, Check::CircuitShape);
    }

    #[test]
    fn delta_mismatches_are_caught() {
        let mut c = ceremony(7, 1);
        c.candidate.0.header.delta1 = G1::generator();
        assert_eq!(rejected(run(&c).unwrap()).check, Check::Delta1);

        let mut c = ceremony(7, 1);
        c.candidate.0.header.delta2 = (G2::generator() * Fr::from(5u64)).into_affine();
        assert_eq!(rejected(run(&c).unwrap()).check, Check::Delta2);
    }

    #[test]
    fn broken_chain_reports_the_contribution_index() {
        let mut c = ceremony(8, 2);
        c.candidate.1.contributions[1].transcript[0] ^= 1;
        let r = rejected(run(&c).unwrap());
        assert_eq!(r.check, Check::Contribution { index: 1, fault: ChainFault::InconsistentTranscript });
        assert_eq!(r.detail, "inconsistent transcript");
    }

    #[test]
    fn oversized_l_or_h_section_is_a_size_rejection() {
        let c = ceremony(12, 1);
        let cand = fixture::zkey_bytes(&c.candidate.0, &c.candidate.1).unwrap();
        let extra = [0u8; G1_SIZE];

        let r = rejected(run_bytes(grow_section(&cand, section::C, &extra), &c).unwrap());
        assert_eq!(r.check, Check::SectionSize("C"));
        assert_eq!(r.kind(), RejectionKind::Consistency);

        let r = rejected(run_bytes(grow_section(&cand, section::H, &extra), &c).unwrap());
        assert_eq!(r.check, Check::SectionSize("H"));
        assert_eq!(r.kind(), RejectionKind::Consistency);
    }

    #[test]
    fn foreign_curve_modulus_is_a_hard_fault() {
        let c = ceremony(13, 1);
        let mut cand = fixture::zkey_bytes(&c.candidate.0, &c.candidate.1).unwrap();
        // first byte of q, after the u32 n8q
        let (pos, _) = locate_section(&cand, section::GROTH_HEADER);
        cand[pos + 12 + 4] ^= 0x02;
        let err = run_bytes(cand, &c).unwrap_err();
        assert!(matches!(err, VerifyError::Format(FormatError::UnsupportedCurve)));
    }

    #[test]
    fn identity_contribution_cannot_zero_the_evolving_sections() {
        let mut rng = StdRng::from_seed([14u8; 32]);
        let mut c = ceremony(14, 0);
        let (bundle, mpc) = &mut c.candidate;
        let key = PublicKey {
            g1_s: (G1::generator() * fixture::random_secret(&mut rng)).into_affine(),
            g1_sx: G1::zero(),
            g2_spx: G2::zero(),
        };
        let transcript = expected_transcript(&TranscriptHasher::new(&mpc.cs_hash), &key);
        mpc.contributions.push(Contribution {
            delta_after: G1::zero(),
            key,
            transcript,
            name: None,
            kind: ContributionKind::Plain,
        });
        bundle.header.delta1 = G1::zero();
        bundle.header.delta2 = G2::zero();
        bundle.c.iter_mut().for_each(|p| *p = G1::zero());
        bundle.h.iter_mut().for_each(|p| *p = G1::zero());

        let r = rejected(run(&c).unwrap());
        assert_eq!(r.check, Check::Contribution { index: 0, fault: ChainFault::PublicKeyRatio });
        assert_eq!(r.kind(), RejectionKind::Cryptographic);
    }

    #[test]
    fn circuit_without_private_signals_verifies() {
        // n_private = 0 and a one-point domain leave no batch terms
        let mut rng = StdRng::from_seed([15u8; 32]);
        let setup = ToySetup::new(&mut rng);
        let initial = setup.initial_bundle(2, 1, 1, &mut rng).unwrap();
        assert!(initial.0.c.is_empty());
        let x = fixture::random_secret(&mut rng);
        let candidate =
            fixture::contribute(&initial.0, &initial.1, x, Some("solo"), ContributionKind::Plain, &mut rng).unwrap();
        let c = Ceremony { ptau: setup.ptau_bytes(1).unwrap(), initial, candidate };
        match run(&c).unwrap() {
            Verdict::Valid(report) => assert_eq!(report.responses.len(), 1),
            Verdict::Invalid(r) => panic!("unexpected rejection: {r}"),
        }
    }

    #[test]
    fn small_ptau_is_rejected_before_any_batch_check() {
        let mut rng = StdRng::from_seed([9u8; 32]);
        let setup = ToySetup::new(&mut rng);
        let mut c = ceremony(9, 1);
        c.ptau = setup.ptau_bytes(2).unwrap();
        assert_eq!(rejected(run(&c).unwrap()).check, Check::PtauTooSmall);
    }

    #[test]
    fn malformed_candidate_is_a_hard_fault() {
        let c = ceremony(10, 1);
        let mut cand = fixture::zkey_bytes(&c.candidate.0, &c.candidate.1).unwrap();
        cand.truncate(cand.len() - 10);
        let init = fixture::zkey_bytes(&c.initial.0, &c.initial.1).unwrap();
        let err = verify_zkey(Cursor::new(cand), Cursor::new(init), Cursor::new(c.ptau.clone()), &cfg(), &NoProgress)
            .unwrap_err();
        assert!(matches!(err, VerifyError::Format(_)));
    }

    #[test]
    fn files_on_disk_verify_and_progress_is_reported() {
        use std::sync::Mutex;

        #[derive(Default)]
        struct Recorder(Mutex<Vec<ProgressEvent>>);
        impl Progress for Recorder {
            fn event(&self, e: &ProgressEvent) {
                if let Ok(mut v) = self.0.lock() {
                    v.push(e.clone());
                }
            }
        }

        let c = ceremony(11, 2);
        let dir = tempfile::tempdir().unwrap();
        let cand = dir.path().join("candidate.zkey");
        let init = dir.path().join("initial.zkey");
        let ptau = dir.path().join("toy.ptau");
        zkey::write_zkey_file(&cand, &c.candidate.0, &c.candidate.1).unwrap();
        zkey::write_zkey_file(&init, &c.initial.0, &c.initial.1).unwrap();
        std::fs::write(&ptau, &c.ptau).unwrap();

        let rec = Recorder::default();
        let verdict = verify_zkey_files(&cand, &init, &ptau, &cfg(), &rec).unwrap();
        assert!(verdict.is_valid());
        let events = rec.0.into_inner().unwrap();
        let contributions = events.iter().filter(|e| matches!(e, ProgressEvent::Contribution(_))).count();
        assert_eq!(contributions, 2);
        assert!(events.contains(&ProgressEvent::Passed("H section")));
        assert!(events.iter().any(|e| matches!(e, ProgressEvent::Chunk { section: "L", .. })));
    }
}
