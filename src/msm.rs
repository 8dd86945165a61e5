//! Pairing same-ratio check and streaming MSM aggregation
//!
//! Batch verification of an evolved section reduces to one pairing check:
//! draw a random scalar per element, fold each file's section into a single
//! point with a multi-scalar multiplication, then compare the two aggregates
//! with [`same_ratio`]. Sections arrive in chunks, so the MSM is accumulated
//! chunk by chunk in an [`Aggregator`].

#![forbid(unsafe_code)]

use ark_bn254::{Bn254, Fr, G1Projective};
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup, VariableBaseMSM};
use ark_ff::{One, Zero};
use rand::RngCore;
use tracing::trace;

use crate::pool::WorkerPool;
use crate::{G1, G2};

/// Aggregation misuse.
#[derive(Debug, thiserror::Error)]
pub enum MsmError {
    /// A chunk's bases and scalars differ in length
    #[error("{label}: {bases} bases but {scalars} scalars")]
    LengthMismatch {
        /// Aggregator label.
        label: &'static str,
        /// Number of points.
        bases: usize,
        /// Number of scalars.
        scalars: usize,
    },
}

/// `true` iff `(a, b)` and `(c, d)` share a discrete-log ratio, i.e.
/// `e(a, d) == e(b, c)`.
///
/// Any identity argument yields `false`: `e(0, ·) = 1` would let a zero
/// ratio pass for every other operand.
pub fn same_ratio(a: &G1, b: &G1, c: &G2, d: &G2) -> bool {
    if a.is_zero() || b.is_zero() || c.is_zero() || d.is_zero() {
        return false;
    }
    let neg_b = (-b.into_group()).into_affine();
    let mlo = Bn254::multi_miller_loop([*a, neg_b], [*d, *c]);
    match Bn254::final_exponentiation(mlo) {
        Some(out) => out.0.is_one(),
        None => false,
    }
}

/// `n` uniformly random 64-bit scalars.
pub fn random_scalars<R: RngCore>(rng: &mut R, n: usize) -> Vec<Fr> {
    (0..n).map(|_| Fr::from(rng.next_u64())).collect()
}

/// Accumulates `Σ s_i · P_i` over chunks of `(P, s)` pairs.
pub struct Aggregator<'a> {
    pool: &'a WorkerPool,
    label: &'static str,
    acc: G1Projective,
    cursor: usize,
}

impl<'a> Aggregator<'a> {
    /// Empty aggregate; `label` tags log lines and errors.
    pub fn new(pool: &'a WorkerPool, label: &'static str) -> Self {
        Self { pool, label, acc: G1Projective::zero(), cursor: 0 }
    }

    /// Number of terms absorbed so far.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Absorb one chunk.
    pub fn add_chunk(&mut self, bases: &[G1], scalars: &[Fr]) -> Result<(), MsmError> {
        if bases.len() != scalars.len() {
            return Err(MsmError::LengthMismatch {
                label: self.label,
                bases: bases.len(),
                scalars: scalars.len(),
            });
        }
        if bases.is_empty() {
            return Ok(());
        }
        let part = self.pool.install(|| G1Projective::msm_unchecked(bases, scalars));
        self.acc += part;
        self.cursor += bases.len();
        trace!(label = self.label, cursor = self.cursor, "msm chunk");
        Ok(())
    }

    /// The accumulated point.
    pub fn finalize(self) -> G1 {
        self.acc.into_affine()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::UniformRand;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn same_ratio_accepts_matching_exponents_only() {
        let mut rng = StdRng::from_seed([41u8; 32]);
        let x = Fr::rand(&mut rng);
        let s = Fr::rand(&mut rng);
        let g1 = G1::generator();
        let g2 = G2::generator();
        let a = (g1 * s).into_affine();
        let b = (g1 * (s * x)).into_affine();
        let c = (g2 * Fr::from(7u64)).into_affine();
        let d = (g2 * (Fr::from(7u64) * x)).into_affine();
        assert!(same_ratio(&a, &b, &c, &d));
        assert!(!same_ratio(&a, &b, &c, &c));
        assert!(!same_ratio(&b, &a, &c, &d));
    }

    #[test]
    fn same_ratio_rejects_identity_operands() {
        let mut rng = StdRng::from_seed([43u8; 32]);
        let a = (G1::generator() * Fr::rand(&mut rng)).into_affine();
        let c = (G2::generator() * Fr::rand(&mut rng)).into_affine();
        // e(a, 0) == e(0, c) holds trivially
        assert!(!same_ratio(&a, &G1::zero(), &c, &G2::zero()));
        assert!(!same_ratio(&G1::zero(), &G1::zero(), &G2::zero(), &G2::zero()));
        assert!(!same_ratio(&G1::zero(), &a, &c, &c));
    }

    #[test]
    fn chunked_aggregation_equals_one_shot_msm() {
        let mut rng = StdRng::from_seed([42u8; 32]);
        let pts: Vec<G1> = (0..20).map(|_| (G1::generator() * Fr::rand(&mut rng)).into_affine()).collect();
        let scalars = random_scalars(&mut rng, 20);
        let pool = WorkerPool::new(Some(2)).unwrap();

        let mut agg = Aggregator::new(&pool, "test");
        for (p, s) in pts.chunks(6).zip(scalars.chunks(6)) {
            agg.add_chunk(p, s).unwrap();
        }
        assert_eq!(agg.cursor(), 20);
        let direct: G1Projective = pts.iter().zip(&scalars).map(|(p, s)| *p * s).sum();
        assert_eq!(agg.finalize(), direct.into_affine());

        let mut agg = Aggregator::new(&pool, "test");
        assert!(matches!(agg.add_chunk(&pts[..2], &scalars[..3]), Err(MsmError::LengthMismatch { .. })));
    }
}
