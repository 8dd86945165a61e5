//! BLAKE2b transcript accumulator for the contribution chain
//!
//! The chain is a single running BLAKE2b-512 state seeded with the
//! constraint-system hash. Each contributor's `transcript` field is the digest
//! of a *clone* of that state after absorbing their `g1_s ‖ g1_sx`; the running
//! state itself then absorbs the full public key so the next contributor's
//! transcript depends on it. Cloning keeps derivation a pure function of the
//! absorb schedule.
//!
//! Points are absorbed in hash form (see [`crate::group_codec`]), never in
//! storage form.
//!
//! ```
//! use zkey_mpc::transcript::TranscriptHasher;
//!
//! let t = TranscriptHasher::new(&[0u8; 64]);
//! let a = t.fork().finalize();
//! let b = t.fork().finalize();
//! assert_eq!(a, b);
//! ```

#![forbid(unsafe_code)]

use ark_ec::CurveGroup;
use ark_ff::UniformRand;
use blake2::{Blake2b512, Digest};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::group_codec::{hash_repr_g1, hash_repr_g2};
use crate::mpc::{Contribution, PublicKey, HASH_LEN};
use crate::{G1, G2};

/// Domain separation tag for [`hash_to_g2`]. Changing it invalidates every
/// existing transcript.
pub const HASH_TO_G2_DST: &[u8] = b"zkey-mpc.hash-to-g2.v1";

/// Running BLAKE2b-512 state.
#[derive(Clone, Default)]
pub struct TranscriptHasher {
    hasher: Blake2b512,
}

impl TranscriptHasher {
    /// Seed a new accumulator with the constraint-system hash.
    pub fn new(cs_hash: &[u8; HASH_LEN]) -> Self {
        let mut t = Self::default();
        t.absorb_bytes(cs_hash);
        t
    }

    /// Independent copy of the current state.
    #[inline]
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// Absorb raw bytes.
    #[inline]
    pub fn absorb_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Absorb a G1 point in hash form.
    #[inline]
    pub fn absorb_g1(&mut self, p: &G1) {
        self.hasher.update(hash_repr_g1(p));
    }

    /// Absorb a G2 point in hash form.
    #[inline]
    pub fn absorb_g2(&mut self, p: &G2) {
        self.hasher.update(hash_repr_g2(p));
    }

    /// Absorb `deltaAfter ‖ g1_s ‖ g1_sx ‖ g2_spx ‖ transcript`.
    pub fn absorb_public_key(&mut self, c: &Contribution) {
        self.absorb_g1(&c.delta_after);
        self.absorb_g1(&c.key.g1_s);
        self.absorb_g1(&c.key.g1_sx);
        self.absorb_g2(&c.key.g2_spx);
        self.absorb_bytes(&c.transcript);
    }

    /// BLAKE2b-512 digest of everything absorbed.
    pub fn finalize(self) -> [u8; HASH_LEN] {
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&self.hasher.finalize());
        out
    }
}

/// Transcript value a contributor must publish given the chain state so far.
pub fn expected_transcript(state: &TranscriptHasher, key: &PublicKey) -> [u8; HASH_LEN] {
    let mut t = state.fork();
    t.absorb_g1(&key.g1_s);
    t.absorb_g1(&key.g1_sx);
    t.finalize()
}

/// Audit digest of a single contribution's public key, hashed from a fresh state.
pub fn contribution_response(c: &Contribution) -> [u8; HASH_LEN] {
    let mut t = TranscriptHasher::default();
    t.absorb_public_key(c);
    t.finalize()
}

/// Running state after folding in every contribution of `contributions`.
pub fn accumulate(cs_hash: &[u8; HASH_LEN], contributions: &[Contribution]) -> TranscriptHasher {
    let mut t = TranscriptHasher::new(cs_hash);
    for c in contributions {
        t.absorb_public_key(c);
    }
    t
}

/// Map a transcript digest to a G2 point of unknown discrete log.
///
/// `BLAKE2b-512(DST ‖ transcript)`; the first 32 bytes seed a ChaCha20 stream
/// from which a uniformly random subgroup point is sampled.
pub fn hash_to_g2(transcript: &[u8; HASH_LEN]) -> G2 {
    let mut h = Blake2b512::new();
    h.update(HASH_TO_G2_DST);
    h.update(transcript);
    let digest = h.finalize();
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&digest[..32]);
    let mut rng = ChaCha20Rng::from_seed(seed);
    ark_bn254::G2Projective::rand(&mut rng).into_affine()
}
