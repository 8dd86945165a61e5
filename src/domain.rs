//! Radix-2 evaluation domains and the odd-coset transform behind the H check
//!
//! The H section of a bundle stores `[L_{2j+1}(τ)/δ]₁` for `j ∈ [0, n)`, where
//! `L_k` are the Lagrange polynomials over the size-`2n` domain `⟨ω_{2n}⟩`.
//! For any `r(X) = Σ r_i X^i` of degree `< n`,
//!
//! ```text
//! r(τ)·(τⁿ − 1) = Σ_j s_j · L_{2j+1}(τ),   s_j = −2 · Σ_i r_i ω_{2n}^i ω_n^{ij}
//! ```
//!
//! because `r(X)(Xⁿ−1)` vanishes on even powers of `ω_{2n}` and equals
//! `−2·r(x)` on odd ones. The left side is computable from powers of tau, the
//! right side from H. [`odd_coset_transform`] turns `r_i` into `s_j`: apply
//! the key `(−2, ω_{2n})` and run a forward size-`n` NTT.

#![forbid(unsafe_code)]

use ark_ff::{batch_inversion, FftField, Field, One, Zero};

use crate::Fr;

/// Multiplicative subgroup of order `n` (a power of two).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Domain {
    /// Number of points.
    pub n: usize,
    /// `log2(n)`.
    pub power: u32,
    /// Generator `ω` of `{1, ω, …, ω^{n−1}}`.
    pub omega: Fr,
}

/// Errors produced by domain checks / transforms.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// Size is zero or not a power of two
    #[error("domain size must be a positive power of two (got {0})")]
    NotPowerOfTwo(usize),
    /// Size exceeds the field's two-adicity
    #[error("no root of unity of order {0} in the scalar field")]
    TooLarge(usize),
    /// Candidate generator has the wrong order
    #[error("omega^N != 1")]
    OmegaNPowNotOne,
    /// Candidate generator has order below `N`
    #[error("omega is not primitive: omega^(N/2) == 1")]
    OmegaNotPrimitive,
    /// Transform input of the wrong length
    #[error("input length {len} does not match domain size {n}")]
    BadLen {
        /// Input length.
        len: usize,
        /// Domain size.
        n: usize,
    },
    /// Lagrange evaluation at a domain point
    #[error("evaluation point lies in the domain")]
    PointInDomain,
}

impl Domain {
    /// Domain of size `n` with the field's canonical root of unity.
    pub fn new(n: usize) -> Result<Self, DomainError> {
        if n == 0 || !n.is_power_of_two() {
            return Err(DomainError::NotPowerOfTwo(n));
        }
        let omega = Fr::get_root_of_unity(n as u64).ok_or(DomainError::TooLarge(n))?;
        Self::with_omega(n, omega)
    }

    /// Domain with an explicit generator, checked for order exactly `n`.
    pub fn with_omega(n: usize, omega: Fr) -> Result<Self, DomainError> {
        if n == 0 || !n.is_power_of_two() {
            return Err(DomainError::NotPowerOfTwo(n));
        }
        if !omega.pow([n as u64]).is_one() {
            return Err(DomainError::OmegaNPowNotOne);
        }
        if n > 1 && omega.pow([(n / 2) as u64]).is_one() {
            return Err(DomainError::OmegaNotPrimitive);
        }
        Ok(Self { n, power: n.trailing_zeros(), omega })
    }

    /// `(a_0 … a_{n−1})` coefficients → evaluations at `ω^j`.
    pub fn ntt(&self, coeffs: &[Fr]) -> Result<Vec<Fr>, DomainError> {
        self.check_len(coeffs.len())?;
        let mut a = coeffs.to_vec();
        ntt_in_place(&mut a, self.omega);
        Ok(a)
    }

    /// Evaluations at `ω^j` → coefficients.
    pub fn intt(&self, evals: &[Fr]) -> Result<Vec<Fr>, DomainError> {
        self.check_len(evals.len())?;
        let mut a = evals.to_vec();
        let inv_root = self.omega.inverse().ok_or(DomainError::OmegaNPowNotOne)?;
        ntt_in_place(&mut a, inv_root);
        let inv_n = Fr::from(self.n as u64).inverse().ok_or(DomainError::NotPowerOfTwo(self.n))?;
        for x in a.iter_mut() {
            *x *= inv_n;
        }
        Ok(a)
    }

    #[inline]
    fn check_len(&self, len: usize) -> Result<(), DomainError> {
        if len != self.n {
            return Err(DomainError::BadLen { len, n: self.n });
        }
        Ok(())
    }
}

fn ntt_in_place(a: &mut [Fr], root: Fr) {
    let n = a.len();
    if n <= 1 {
        return;
    }

    // bit-reversal
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            a.swap(i, j);
        }
    }

    // Cooley–Tukey
    let mut len = 2;
    while len <= n {
        let w_len = root.pow([(n / len) as u64]);
        let half = len / 2;
        for start in (0..n).step_by(len) {
            let mut w = Fr::one();
            for i in 0..half {
                let u = a[start + i];
                let v = a[start + i + half] * w;
                a[start + i] = u + v;
                a[start + i + half] = u - v;
                w *= w_len;
            }
        }
        len <<= 1;
    }
}

/// `a_i ← a_i · first · inc^i`.
pub fn apply_key(a: &mut [Fr], first: Fr, inc: Fr) {
    let mut k = first;
    for x in a.iter_mut() {
        *x *= k;
        k *= inc;
    }
}

/// Map batch scalars `r_i` (tau side) to scalars `s_j` (H side); see the module docs.
pub fn odd_coset_transform(r: &[Fr]) -> Result<Vec<Fr>, DomainError> {
    let n = r.len();
    let domain = Domain::new(n)?;
    let double = Domain::new(2 * n)?;
    let mut a = r.to_vec();
    apply_key(&mut a, -Fr::from(2u64), double.omega);
    domain.ntt(&a)
}

/// `L_{2j+1}(τ)` over the size-`2n` domain, for `j ∈ [0, n)`.
///
/// Uses `L_k(τ) = ω^k (τ^{2n} − 1) / (2n (τ − ω^k))`.
pub fn odd_lagrange_at(n: usize, tau: Fr) -> Result<Vec<Fr>, DomainError> {
    let double = Domain::new(2 * n)?;
    let w = double.omega;
    let w_sq = w.square();
    let z = tau.pow([(2 * n) as u64]) - Fr::one();
    if z.is_zero() {
        return Err(DomainError::PointInDomain);
    }

    let mut points = Vec::with_capacity(n);
    let mut wk = w;
    for _ in 0..n {
        points.push(wk);
        wk *= w_sq;
    }
    let mut denom: Vec<Fr> = points.iter().map(|p| Fr::from((2 * n) as u64) * (tau - p)).collect();
    batch_inversion(&mut denom);
    Ok(points.iter().zip(denom).map(|(p, d)| *p * z * d).collect())
}
