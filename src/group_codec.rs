//! Group codec: fixed-width byte layouts for BN254 points and scalars
//!
//! Two encodings exist and must never be mixed up:
//!
//! - **Storage form** (what lives in bundle and ptau files). Every base-field
//!   coordinate is the little-endian integer `x·R mod q`, `R = 2^256 mod q`
//!   (Montgomery form). G1 is `x ‖ y` (64 bytes), G2 is
//!   `x.c0 ‖ x.c1 ‖ y.c0 ‖ y.c1` (128 bytes). The identity is all zeros.
//! - **Hash form** (what is fed into BLAKE2b). Canonical big-endian
//!   coordinates, G2 limbs ordered `c1 ‖ c0`. The identity is `0x40` followed
//!   by zeros.
//!
//! Decoding storage form validates canonicity, the curve equation and (for G2)
//! subgroup membership.

#![forbid(unsafe_code)]

use ark_bn254::{Fq, Fq2, Fr};
use ark_ec::AffineRepr;
use ark_ff::{Field, PrimeField};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use std::sync::OnceLock;

use crate::error::FormatError;
use crate::{G1, G2};

/// Byte width of a base-field element.
pub const N8Q: usize = 32;
/// Byte width of a scalar-field element.
pub const N8R: usize = 32;
/// Storage width of a G1 point.
pub const G1_SIZE: usize = 2 * N8Q;
/// Storage width of a G2 point.
pub const G2_SIZE: usize = 4 * N8Q;

const HASH_INFINITY_FLAG: u8 = 0x40;

/// `R mod q` and its inverse, computed once.
struct BaseMont {
    r: Fq,
    r_inv: Fq,
}

fn base_mont() -> &'static BaseMont {
    static M: OnceLock<BaseMont> = OnceLock::new();
    M.get_or_init(|| {
        let r = Fq::from(2u64).pow([8 * N8Q as u64]);
        let r_inv = r.inverse().unwrap_or_default();
        BaseMont { r, r_inv }
    })
}

// ------------------------- field elements -------------------------

/// Parse a canonical little-endian prime-field element.
pub fn fe_from_le<P: PrimeField>(bytes: &[u8]) -> Result<P, FormatError> {
    let bigint = P::BigInt::deserialize_uncompressed(bytes)
        .map_err(|_| FormatError::NonCanonicalField)?;
    P::from_bigint(bigint).ok_or(FormatError::NonCanonicalField)
}

/// Canonical little-endian bytes of a prime-field element.
pub fn fe_to_le<P: PrimeField>(f: &P, out: &mut Vec<u8>) {
    let bigint = f.into_bigint();
    // Writing a fixed-size BigInt into a Vec cannot fail.
    let _ = bigint.serialize_uncompressed(out);
}

fn fe_to_be(f: &Fq, out: &mut Vec<u8>) {
    let mut le = Vec::with_capacity(N8Q);
    fe_to_le(f, &mut le);
    out.extend(le.iter().rev());
}

fn fq_to_lem(x: &Fq, out: &mut Vec<u8>) {
    fe_to_le(&(*x * base_mont().r), out);
}

fn fq_from_lem(bytes: &[u8]) -> Result<Fq, FormatError> {
    Ok(fe_from_le::<Fq>(bytes)? * base_mont().r_inv)
}

/// Canonical little-endian scalar (32 bytes).
pub fn encode_fr(f: &Fr) -> [u8; N8R] {
    let mut v = Vec::with_capacity(N8R);
    fe_to_le(f, &mut v);
    let mut out = [0u8; N8R];
    out.copy_from_slice(&v);
    out
}

/// Inverse of [`encode_fr`]; rejects values `>= r`.
pub fn decode_fr(bytes: &[u8]) -> Result<Fr, FormatError> {
    fe_from_le(bytes)
}

// ------------------------- storage form -------------------------

/// Append the storage form of a G1 point.
pub fn write_g1(out: &mut Vec<u8>, p: &G1) {
    if p.infinity {
        out.extend_from_slice(&[0u8; G1_SIZE]);
        return;
    }
    fq_to_lem(&p.x, out);
    fq_to_lem(&p.y, out);
}

/// Append the storage form of a G2 point.
pub fn write_g2(out: &mut Vec<u8>, p: &G2) {
    if p.infinity {
        out.extend_from_slice(&[0u8; G2_SIZE]);
        return;
    }
    fq_to_lem(&p.x.c0, out);
    fq_to_lem(&p.x.c1, out);
    fq_to_lem(&p.y.c0, out);
    fq_to_lem(&p.y.c1, out);
}

/// Storage form of a G1 point as an owned buffer.
pub fn encode_g1(p: &G1) -> Vec<u8> {
    let mut v = Vec::with_capacity(G1_SIZE);
    write_g1(&mut v, p);
    v
}

/// Storage form of a G2 point as an owned buffer.
pub fn encode_g2(p: &G2) -> Vec<u8> {
    let mut v = Vec::with_capacity(G2_SIZE);
    write_g2(&mut v, p);
    v
}

/// Decode one G1 point from exactly [`G1_SIZE`] bytes.
pub fn read_g1(bytes: &[u8]) -> Result<G1, FormatError> {
    if bytes.len() != G1_SIZE {
        return Err(FormatError::ShapeMismatch { what: "G1 bytes", expected: G1_SIZE, got: bytes.len() });
    }
    if bytes.iter().all(|b| *b == 0) {
        return Ok(G1::zero());
    }
    let x = fq_from_lem(&bytes[..N8Q])?;
    let y = fq_from_lem(&bytes[N8Q..])?;
    let p = G1::new_unchecked(x, y);
    // BN254 G1 has cofactor 1: on-curve implies prime-order subgroup.
    if !p.is_on_curve() {
        return Err(FormatError::PointNotOnCurve);
    }
    Ok(p)
}

/// Decode one G2 point from exactly [`G2_SIZE`] bytes.
pub fn read_g2(bytes: &[u8]) -> Result<G2, FormatError> {
    if bytes.len() != G2_SIZE {
        return Err(FormatError::ShapeMismatch { what: "G2 bytes", expected: G2_SIZE, got: bytes.len() });
    }
    if bytes.iter().all(|b| *b == 0) {
        return Ok(G2::zero());
    }
    let x = Fq2::new(fq_from_lem(&bytes[..N8Q])?, fq_from_lem(&bytes[N8Q..2 * N8Q])?);
    let y = Fq2::new(fq_from_lem(&bytes[2 * N8Q..3 * N8Q])?, fq_from_lem(&bytes[3 * N8Q..])?);
    let p = G2::new_unchecked(x, y);
    if !p.is_on_curve() {
        return Err(FormatError::PointNotOnCurve);
    }
    if !p.is_in_correct_subgroup_assuming_on_curve() {
        return Err(FormatError::PointNotInSubgroup);
    }
    Ok(p)
}

/// Decode a packed run of G1 points.
pub fn read_g1_batch(bytes: &[u8]) -> Result<Vec<G1>, FormatError> {
    if bytes.len() % G1_SIZE != 0 {
        return Err(FormatError::RaggedSection { len: bytes.len() as u64, elem: G1_SIZE });
    }
    bytes.chunks_exact(G1_SIZE).map(read_g1).collect()
}

/// Decode a packed run of G2 points.
pub fn read_g2_batch(bytes: &[u8]) -> Result<Vec<G2>, FormatError> {
    if bytes.len() % G2_SIZE != 0 {
        return Err(FormatError::RaggedSection { len: bytes.len() as u64, elem: G2_SIZE });
    }
    bytes.chunks_exact(G2_SIZE).map(read_g2).collect()
}

// ------------------------- hash form -------------------------

/// Uncompressed big-endian encoding of a G1 point, used only for hashing.
pub fn hash_repr_g1(p: &G1) -> [u8; G1_SIZE] {
    let mut out = [0u8; G1_SIZE];
    if p.infinity {
        out[0] = HASH_INFINITY_FLAG;
        return out;
    }
    let mut v = Vec::with_capacity(G1_SIZE);
    fe_to_be(&p.x, &mut v);
    fe_to_be(&p.y, &mut v);
    out.copy_from_slice(&v);
    out
}

/// Uncompressed big-endian encoding of a G2 point, used only for hashing.
pub fn hash_repr_g2(p: &G2) -> [u8; G2_SIZE] {
    let mut out = [0u8; G2_SIZE];
    if p.infinity {
        out[0] = HASH_INFINITY_FLAG;
        return out;
    }
    let mut v = Vec::with_capacity(G2_SIZE);
    fe_to_be(&p.x.c1, &mut v);
    fe_to_be(&p.x.c0, &mut v);
    fe_to_be(&p.y.c1, &mut v);
    fe_to_be(&p.y.c0, &mut v);
    out.copy_from_slice(&v);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::CurveGroup;
    use ark_ff::UniformRand;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn g1_storage_is_montgomery_little_endian() {
        let g = G1::generator();
        let bytes = encode_g1(&g);
        // Generator x = 1, so its storage form is R mod q itself.
        let mut expected = Vec::new();
        fe_to_le(&base_mont().r, &mut expected);
        assert_eq!(&bytes[..N8Q], expected.as_slice());
        assert_eq!(read_g1(&bytes).unwrap(), g);
    }

    #[test]
    fn points_decode_to_what_was_encoded() {
        let mut rng = StdRng::from_seed([3u8; 32]);
        for _ in 0..4 {
            let p = (G1::generator() * Fr::rand(&mut rng)).into_affine();
            let q = (G2::generator() * Fr::rand(&mut rng)).into_affine();
            assert_eq!(read_g1(&encode_g1(&p)).unwrap(), p);
            assert_eq!(read_g2(&encode_g2(&q)).unwrap(), q);
        }
        assert!(read_g1(&encode_g1(&G1::zero())).unwrap().infinity);
        assert!(read_g2(&encode_g2(&G2::zero())).unwrap().infinity);
    }

    #[test]
    fn off_curve_and_non_canonical_points_are_rejected() {
        let mut bytes = encode_g1(&G1::generator());
        bytes[N8Q] ^= 1;
        assert!(matches!(read_g1(&bytes), Err(FormatError::PointNotOnCurve)));

        let bytes = [0xffu8; G1_SIZE];
        assert!(matches!(read_g1(&bytes), Err(FormatError::NonCanonicalField)));
    }

    #[test]
    fn hash_form_differs_from_storage_form() {
        let g = G1::generator();
        let h = hash_repr_g1(&g);
        assert_ne!(h.as_slice(), encode_g1(&g).as_slice());
        // x = 1 big-endian: last byte of the first coordinate.
        assert_eq!(h[N8Q - 1], 1);
        assert!(h[..N8Q - 1].iter().all(|b| *b == 0));
        assert_eq!(hash_repr_g1(&G1::zero())[0], HASH_INFINITY_FLAG);
        assert_eq!(hash_repr_g2(&G2::zero())[0], HASH_INFINITY_FLAG);
    }

    #[test]
    fn scalars_are_canonical_little_endian() {
        let one = encode_fr(&Fr::from(1u64));
        assert_eq!(one[0], 1);
        assert!(one[1..].iter().all(|b| *b == 0));
        assert_eq!(decode_fr(&one).unwrap(), Fr::from(1u64));
        assert!(decode_fr(&[0xffu8; N8R]).is_err());
    }
}
