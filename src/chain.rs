//! Contribution Chain Verifier
//!
//! Replays an [`MpcTranscript`] from the constraint-system hash and the G1
//! generator. For contribution `i`:
//!
//! 1. `transcript_i` must equal the digest of the running state extended with
//!    `g1_s ‖ g1_sx` (binds the key to everything before it),
//! 2. `(g1_s, g1_sx) ~ (H(transcript_i), g2_spx)` (knowledge of the secret),
//! 3. `(delta_{i−1}, deltaAfter_i) ~ (H(transcript_i), g2_spx)` (delta moved by
//!    that same secret),
//!
//! where `~` is [`same_ratio`] and `H` is [`hash_to_g2`]. The running state then
//! absorbs the whole public key. The final delta is returned for the caller to
//! compare against the bundle's `delta1`.

#![forbid(unsafe_code)]

use ark_ec::AffineRepr;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::msm::same_ratio;
use crate::mpc::{MpcTranscript, HASH_LEN};
use crate::transcript::{contribution_response, expected_transcript, hash_to_g2, TranscriptHasher};
use crate::verify::{Progress, ProgressEvent};
use crate::G1;

/// Why a single contribution failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChainFault {
    /// Stored transcript hash is not the digest of the running state and key
    #[error("inconsistent transcript")]
    InconsistentTranscript,
    /// `(g1_s, g1_sx)` and `(H(transcript), g2_spx)` differ in ratio
    #[error("public key ratio mismatch")]
    PublicKeyRatio,
    /// `deltaAfter` is not the previous delta moved by the key's secret
    #[error("deltaAfter does not follow public key")]
    DeltaAfter,
}

/// First failing contribution of a replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("contribution {index}: {fault}")]
pub struct ChainFailure {
    /// Zero-based position in the transcript.
    pub index: usize,
    /// What went wrong.
    pub fault: ChainFault,
}

fn hex_digest<S: Serializer>(d: &[u8; HASH_LEN], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode(d))
}

/// Audit record for one verified contribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContributionResponse {
    /// Zero-based position in the transcript.
    pub index: usize,
    /// Contributor's self-declared name.
    pub name: Option<String>,
    /// `"plain"` or `"beacon"`.
    pub kind: &'static str,
    /// Beacon iteration exponent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations_exp: Option<u8>,
    /// Beacon hash, hex encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beacon_hash: Option<String>,
    /// BLAKE2b-512 of the contribution's public key, hashed from a fresh state.
    #[serde(serialize_with = "hex_digest")]
    pub digest: [u8; HASH_LEN],
}

/// Outcome of a successful replay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    /// `delta1` implied by the chain.
    #[serde(skip)]
    pub final_delta: G1,
    /// One record per contribution, in order.
    pub responses: Vec<ContributionResponse>,
}

/// Replay every contribution in order, stopping at the first failure.
pub fn replay(mpc: &MpcTranscript, progress: &dyn Progress) -> Result<ChainReport, ChainFailure> {
    let mut state = TranscriptHasher::new(&mpc.cs_hash);
    let mut cur_delta = G1::generator();
    let mut responses = Vec::with_capacity(mpc.contributions.len());

    for (index, c) in mpc.contributions.iter().enumerate() {
        let fail = |fault| {
            warn!(index, %fault, "contribution rejected");
            ChainFailure { index, fault }
        };

        if expected_transcript(&state, &c.key) != c.transcript {
            return Err(fail(ChainFault::InconsistentTranscript));
        }
        let challenge = hash_to_g2(&c.transcript);
        if !same_ratio(&c.key.g1_s, &c.key.g1_sx, &challenge, &c.key.g2_spx) {
            return Err(fail(ChainFault::PublicKeyRatio));
        }
        if !same_ratio(&cur_delta, &c.delta_after, &challenge, &c.key.g2_spx) {
            return Err(fail(ChainFault::DeltaAfter));
        }

        state.absorb_public_key(c);
        let digest = contribution_response(c);
        let (iterations_exp, beacon_hash) = match &c.kind {
            crate::mpc::ContributionKind::Plain => (None, None),
            crate::mpc::ContributionKind::Beacon { iterations_exp, beacon_hash } => {
                (Some(*iterations_exp), Some(hex::encode(beacon_hash)))
            }
        };
        let response = ContributionResponse {
            index,
            name: c.name.clone(),
            kind: c.kind.label(),
            iterations_exp,
            beacon_hash,
            digest,
        };
        debug!(index, name = c.name.as_deref().unwrap_or(""), "contribution verified");
        progress.event(&ProgressEvent::Contribution(response.clone()));
        responses.push(response);
        cur_delta = c.delta_after;
    }

    Ok(ChainReport { final_delta: cur_delta, responses })
}
