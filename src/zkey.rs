//! Proving-Key Codec (the `zkey` bundle)
//!
//! ```text
//!  1  Header        u32 protocol id (1 = Groth16)
//!  2  HeaderGroth   n8q | q | n8r | r | nVars | nPublic | domainSize |
//!                   alpha1 | beta1 | beta2 | gamma2 | delta1 | delta2
//!  3  IC            nPublic+1 G1
//!  4  Coefs         u32 count | (u32 matrix, u32 constraint, u32 signal, Fr·R²)*
//!  5  PointsA       nVars G1
//!  6  PointsB1      nVars G1
//!  7  PointsB2      nVars G2
//!  8  PointsC       nVars-nPublic-1 G1 (the L section)
//!  9  PointsH       domainSize G1
//! 10  Contributions MPC transcript (see `mpc`)
//! ```
//!
//! ## Coefficient encoding
//! Consumers of the file do field arithmetic in Montgomery form straight from
//! the bytes, so a coefficient `v` is stored as `v·R² mod r` with
//! `R = 2^(8·n8r) mod r`. Reading multiplies by `R⁻²`. Getting either constant
//! wrong silently invalidates every proof produced from the bundle.
//!
//! Only A and B coefficients are persisted; C coefficients are dropped on
//! write and a matrix id of 2 on read is a format error.

#![forbid(unsafe_code)]

use ark_bn254::{Fq, Fr};
use ark_ec::AffineRepr;
use ark_ff::{Field, PrimeField};
use num_bigint::BigUint;
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;

use crate::container::{BinFile, BinFileWriter};
use crate::error::FormatError;
use crate::group_codec::{self, G1_SIZE, G2_SIZE, N8Q, N8R};
use crate::mpc::{self, MpcTranscript};
use crate::{G1, G2};

/// Container magic for bundles.
pub const ZKEY_MAGIC: &[u8; 4] = b"zkey";
/// Container version written and accepted.
pub const ZKEY_VERSION: u32 = 1;
/// Protocol id stored in section 1.
pub const GROTH16_PROTOCOL_ID: u32 = 1;
/// Number of sections in a complete bundle.
pub const ZKEY_SECTIONS: u32 = 10;
/// Largest supported `log2(domainSize)`; the H check needs a `2·domainSize` root of unity.
pub const MAX_POWER: u32 = 27;

/// Section ids.
pub mod section {
    /// Protocol id.
    pub const HEADER: u32 = 1;
    /// [`super::Groth16Header`].
    pub const GROTH_HEADER: u32 = 2;
    /// IC points, `nPublic + 1` in G1.
    pub const IC: u32 = 3;
    /// Coefficients of matrices A and B.
    pub const COEFFS: u32 = 4;
    /// A points, `nVars` in G1.
    pub const A: u32 = 5;
    /// B points, `nVars` in G1.
    pub const B1: u32 = 6;
    /// B points, `nVars` in G2.
    pub const B2: u32 = 7;
    /// L points, one per private signal.
    pub const C: u32 = 8;
    /// H points, `domainSize` in G1.
    pub const H: u32 = 9;
    /// [`crate::mpc::MpcTranscript`].
    pub const CONTRIBUTIONS: u32 = 10;
}

/// Modulus pair, circuit shape and verification-key elements (section 2).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Groth16Header {
    /// Base field byte width.
    pub n8q: u32,
    /// Base field modulus.
    pub q: BigUint,
    /// Scalar field byte width.
    pub n8r: u32,
    /// Scalar field modulus.
    pub r: BigUint,
    /// Signals, including the constant one.
    pub n_vars: u32,
    /// Public signals (outputs and public inputs).
    pub n_public: u32,
    /// Evaluation domain size, a power of two.
    pub domain_size: u32,
    /// `log2(domain_size)`, derived.
    pub power: u32,
    /// `[α]₁`.
    pub alpha1: G1,
    /// `[β]₁`.
    pub beta1: G1,
    /// `[β]₂`.
    pub beta2: G2,
    /// `[γ]₂`.
    pub gamma2: G2,
    /// Changes with every contribution.
    pub delta1: G1,
    /// Changes with every contribution, in step with `delta1`.
    pub delta2: G2,
}

impl Groth16Header {
    /// BN254 header for the given shape, verification key left at generators.
    pub fn bn254(n_vars: u32, n_public: u32, domain_size: u32) -> Result<Self, FormatError> {
        let h = Self {
            n8q: N8Q as u32,
            q: BigUint::from(Fq::MODULUS),
            n8r: N8R as u32,
            r: BigUint::from(Fr::MODULUS),
            n_vars,
            n_public,
            domain_size,
            power: domain_size.trailing_zeros(),
            alpha1: G1::generator(),
            beta1: G1::generator(),
            beta2: G2::generator(),
            gamma2: G2::generator(),
            delta1: G1::generator(),
            delta2: G2::generator(),
        };
        h.validate()?;
        Ok(h)
    }

    /// Number of points in the C (L) section.
    #[inline]
    pub fn n_private(&self) -> usize {
        (self.n_vars - self.n_public - 1) as usize
    }

    fn validate(&self) -> Result<(), FormatError> {
        if self.q != BigUint::from(Fq::MODULUS) || self.r != BigUint::from(Fr::MODULUS) {
            return Err(FormatError::UnsupportedCurve);
        }
        if self.n8q as usize != N8Q {
            return Err(FormatError::BadFieldWidth { found: self.n8q, expected: N8Q as u32 });
        }
        if self.n8r as usize != N8R {
            return Err(FormatError::BadFieldWidth { found: self.n8r, expected: N8R as u32 });
        }
        if !self.domain_size.is_power_of_two() {
            return Err(FormatError::DomainNotPowerOfTwo(self.domain_size));
        }
        if self.domain_size.trailing_zeros() > MAX_POWER {
            return Err(FormatError::DomainTooLarge(self.domain_size));
        }
        if self.n_public >= self.n_vars {
            return Err(FormatError::BadShape { n_vars: self.n_vars, n_public: self.n_public });
        }
        Ok(())
    }
}

/// Constraint matrix a coefficient belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Matrix {
    /// Persisted as 0.
    A = 0,
    /// Persisted as 1.
    B = 1,
    /// Never persisted.
    C = 2,
}

/// One sparse constraint-matrix entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coefficient {
    /// Owning matrix.
    pub matrix: Matrix,
    /// Row.
    pub constraint: u32,
    /// Column.
    pub signal: u32,
    /// Entry, in the normal (non-Montgomery) domain.
    pub value: Fr,
}

/// Decoded bundle (sections 2..=9).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvingKeyBundle {
    /// Section 2.
    pub header: Groth16Header,
    /// Section 3.
    pub ic: Vec<G1>,
    /// Persisted coefficients: matrices A and B, ordered by constraint.
    pub coeffs: Vec<Coefficient>,
    /// Section 5.
    pub a: Vec<G1>,
    /// Section 6.
    pub b1: Vec<G1>,
    /// Section 7.
    pub b2: Vec<G2>,
    /// Points for signals `nPublic+1 .. nVars`; `c[i]` belongs to signal `nPublic+1+i`.
    pub c: Vec<G1>,
    /// Section 9, scaled by `1/delta` like `c`.
    pub h: Vec<G1>,
}

impl ProvingKeyBundle {
    fn check_shape(&self) -> Result<(), FormatError> {
        let h = &self.header;
        h.validate()?;
        let n_vars = h.n_vars as usize;
        let checks: [(&'static str, usize, usize); 6] = [
            ("IC", h.n_public as usize + 1, self.ic.len()),
            ("A", n_vars, self.a.len()),
            ("B1", n_vars, self.b1.len()),
            ("B2", n_vars, self.b2.len()),
            ("C", h.n_private(), self.c.len()),
            ("H", h.domain_size as usize, self.h.len()),
        ];
        for (what, expected, got) in checks {
            if expected != got {
                return Err(FormatError::ShapeMismatch { what, expected, got });
            }
        }
        Ok(())
    }
}

/// Filter out matrix C and stably sort by constraint index.
pub fn persisted_coefficients(coeffs: &[Coefficient]) -> Vec<Coefficient> {
    let mut out: Vec<Coefficient> =
        coeffs.iter().filter(|c| c.matrix != Matrix::C).cloned().collect();
    out.sort_by_key(|c| c.constraint);
    out
}

/// Montgomery scaling for coefficient values, derived from `n8r`.
#[derive(Clone, Copy, Debug)]
pub struct CoeffMontgomery {
    r2: Fr,
    r_inv2: Fr,
}

impl CoeffMontgomery {
    /// Factors for an `n8r`-byte Montgomery radix.
    pub fn new(n8r: u32) -> Self {
        let r = Fr::from(2u64).pow([8 * n8r as u64]);
        let r2 = r.square();
        let r_inv2 = r2.inverse().unwrap_or_default();
        Self { r2, r_inv2 }
    }

    /// Normal value to the value written on disk (`v·R²`).
    #[inline]
    pub fn to_stored(&self, v: &Fr) -> Fr {
        *v * self.r2
    }

    /// Inverse of [`CoeffMontgomery::to_stored`].
    #[inline]
    pub fn from_stored(&self, v: &Fr) -> Fr {
        *v * self.r_inv2
    }
}

// ============================================================================
// Writing
// ============================================================================

fn write_g1_section<W: Write + Seek>(
    w: &mut BinFileWriter<W>,
    id: u32,
    points: &[G1],
) -> Result<(), FormatError> {
    w.start_section(id)?;
    let mut buf = Vec::with_capacity(points.len() * G1_SIZE);
    for p in points {
        group_codec::write_g1(&mut buf, p);
    }
    w.write_bytes(&buf)?;
    w.end_section()
}

/// Write sections 1 and 2.
pub fn write_header<W: Write + Seek>(
    w: &mut BinFileWriter<W>,
    h: &Groth16Header,
) -> Result<(), FormatError> {
    w.start_section(section::HEADER)?;
    w.write_u32(GROTH16_PROTOCOL_ID)?;
    w.end_section()?;

    w.start_section(section::GROTH_HEADER)?;
    w.write_u32(h.n8q)?;
    w.write_big_int(&h.q, h.n8q as usize)?;
    w.write_u32(h.n8r)?;
    w.write_big_int(&h.r, h.n8r as usize)?;
    w.write_u32(h.n_vars)?;
    w.write_u32(h.n_public)?;
    w.write_u32(h.domain_size)?;
    let mut buf = Vec::with_capacity(3 * G1_SIZE + 3 * G2_SIZE);
    group_codec::write_g1(&mut buf, &h.alpha1);
    group_codec::write_g1(&mut buf, &h.beta1);
    group_codec::write_g2(&mut buf, &h.beta2);
    group_codec::write_g2(&mut buf, &h.gamma2);
    group_codec::write_g1(&mut buf, &h.delta1);
    group_codec::write_g2(&mut buf, &h.delta2);
    w.write_bytes(&buf)?;
    w.end_section()
}

/// Write a complete bundle with its MPC transcript.
pub fn write_zkey<W: Write + Seek>(
    writer: W,
    bundle: &ProvingKeyBundle,
    mpc_params: &MpcTranscript,
) -> Result<W, FormatError> {
    bundle.check_shape()?;
    let h = &bundle.header;
    let mut w = BinFileWriter::create(writer, ZKEY_MAGIC, ZKEY_VERSION, ZKEY_SECTIONS)?;

    write_header(&mut w, h)?;

    let mont = CoeffMontgomery::new(h.n8r);
    let coeffs = persisted_coefficients(&bundle.coeffs);
    w.start_section(section::COEFFS)?;
    w.write_u32(coeffs.len() as u32)?;
    let mut buf = Vec::with_capacity(coeffs.len() * (12 + N8R));
    for c in &coeffs {
        buf.extend_from_slice(&(c.matrix as u32).to_le_bytes());
        buf.extend_from_slice(&c.constraint.to_le_bytes());
        buf.extend_from_slice(&c.signal.to_le_bytes());
        buf.extend_from_slice(&group_codec::encode_fr(&mont.to_stored(&c.value)));
    }
    w.write_bytes(&buf)?;
    w.end_section()?;

    write_g1_section(&mut w, section::IC, &bundle.ic)?;
    write_g1_section(&mut w, section::A, &bundle.a)?;
    write_g1_section(&mut w, section::B1, &bundle.b1)?;

    w.start_section(section::B2)?;
    let mut buf = Vec::with_capacity(bundle.b2.len() * G2_SIZE);
    for p in &bundle.b2 {
        group_codec::write_g2(&mut buf, p);
    }
    w.write_bytes(&buf)?;
    w.end_section()?;

    write_g1_section(&mut w, section::C, &bundle.c)?;
    write_g1_section(&mut w, section::H, &bundle.h)?;

    mpc::write_mpc_params(&mut w, mpc_params)?;
    w.finish()
}

/// Write a complete bundle to `path`.
pub fn write_zkey_file(
    path: impl AsRef<Path>,
    bundle: &ProvingKeyBundle,
    mpc_params: &MpcTranscript,
) -> Result<(), FormatError> {
    let f = File::create(path.as_ref())?;
    write_zkey(std::io::BufWriter::new(f), bundle, mpc_params)?;
    Ok(())
}

// ============================================================================
// Reading
// ============================================================================

/// Open a bundle file and check the unique-section policy for all ten sections.
pub fn open_zkey(path: impl AsRef<Path>) -> Result<BinFile<BufReader<File>>, FormatError> {
    let f = BinFile::open_path(path, ZKEY_MAGIC, ZKEY_VERSION)?;
    f.ensure_unique_sections(1..=ZKEY_SECTIONS)?;
    Ok(f)
}

/// Read and validate sections 1 and 2.
pub fn read_header<R: Read + Seek>(f: &mut BinFile<R>) -> Result<Groth16Header, FormatError> {
    f.start_read_unique_section(section::HEADER)?;
    let protocol = f.read_u32()?;
    if protocol != GROTH16_PROTOCOL_ID {
        return Err(FormatError::WrongProtocol(protocol));
    }
    f.end_read_section()?;

    f.start_read_unique_section(section::GROTH_HEADER)?;
    let n8q = f.read_u32()?;
    if n8q as usize != N8Q {
        return Err(FormatError::BadFieldWidth { found: n8q, expected: N8Q as u32 });
    }
    let q = f.read_big_int(n8q as usize)?;
    let n8r = f.read_u32()?;
    if n8r as usize != N8R {
        return Err(FormatError::BadFieldWidth { found: n8r, expected: N8R as u32 });
    }
    let r = f.read_big_int(n8r as usize)?;
    let n_vars = f.read_u32()?;
    let n_public = f.read_u32()?;
    let domain_size = f.read_u32()?;
    let alpha1 = group_codec::read_g1(&f.read_bytes(G1_SIZE)?)?;
    let beta1 = group_codec::read_g1(&f.read_bytes(G1_SIZE)?)?;
    let beta2 = group_codec::read_g2(&f.read_bytes(G2_SIZE)?)?;
    let gamma2 = group_codec::read_g2(&f.read_bytes(G2_SIZE)?)?;
    let delta1 = group_codec::read_g1(&f.read_bytes(G1_SIZE)?)?;
    let delta2 = group_codec::read_g2(&f.read_bytes(G2_SIZE)?)?;
    f.end_read_section()?;

    let h = Groth16Header {
        n8q,
        q,
        n8r,
        r,
        n_vars,
        n_public,
        domain_size,
        power: domain_size.trailing_zeros(),
        alpha1,
        beta1,
        beta2,
        gamma2,
        delta1,
        delta2,
    };
    h.validate()?;
    Ok(h)
}

fn read_g1_section<R: Read + Seek>(
    f: &mut BinFile<R>,
    id: u32,
    what: &'static str,
    n: usize,
) -> Result<Vec<G1>, FormatError> {
    let s = f.start_read_unique_section(id)?;
    if s.size != (n * G1_SIZE) as u64 {
        return Err(FormatError::ShapeMismatch { what, expected: n, got: (s.size as usize) / G1_SIZE });
    }
    let points = group_codec::read_g1_batch(&f.read_bytes(n * G1_SIZE)?)?;
    f.end_read_section()?;
    Ok(points)
}

fn read_coefficients<R: Read + Seek>(
    f: &mut BinFile<R>,
    n8r: u32,
) -> Result<Vec<Coefficient>, FormatError> {
    let mont = CoeffMontgomery::new(n8r);
    f.start_read_unique_section(section::COEFFS)?;
    let n = f.read_u32()? as usize;
    let entry = 12 + n8r as usize;
    let bytes = f.read_bytes(n * entry)?;
    f.end_read_section()?;

    let mut out = Vec::with_capacity(n);
    let mut last_constraint = 0u32;
    for (index, e) in bytes.chunks_exact(entry).enumerate() {
        let word = |i: usize| u32::from_le_bytes([e[4 * i], e[4 * i + 1], e[4 * i + 2], e[4 * i + 3]]);
        let matrix = match word(0) {
            0 => Matrix::A,
            1 => Matrix::B,
            m => return Err(FormatError::BadMatrix { index, matrix: m }),
        };
        let constraint = word(1);
        if constraint < last_constraint {
            return Err(FormatError::UnsortedCoefficients { index });
        }
        last_constraint = constraint;
        let stored = group_codec::decode_fr(&e[12..])?;
        out.push(Coefficient { matrix, constraint, signal: word(2), value: mont.from_stored(&stored) });
    }
    Ok(out)
}

/// Read sections 1..=9 into a bundle.
pub fn read_bundle<R: Read + Seek>(f: &mut BinFile<R>) -> Result<ProvingKeyBundle, FormatError> {
    let header = read_header(f)?;
    let n_vars = header.n_vars as usize;

    let ic = read_g1_section(f, section::IC, "IC", header.n_public as usize + 1)?;
    let coeffs = read_coefficients(f, header.n8r)?;
    let a = read_g1_section(f, section::A, "A", n_vars)?;
    let b1 = read_g1_section(f, section::B1, "B1", n_vars)?;

    let s = f.start_read_unique_section(section::B2)?;
    if s.size != (n_vars * G2_SIZE) as u64 {
        return Err(FormatError::ShapeMismatch { what: "B2", expected: n_vars, got: s.size as usize / G2_SIZE });
    }
    let b2 = group_codec::read_g2_batch(&f.read_bytes(n_vars * G2_SIZE)?)?;
    f.end_read_section()?;

    let c = read_g1_section(f, section::C, "C", header.n_private())?;
    let h = read_g1_section(f, section::H, "H", header.domain_size as usize)?;

    Ok(ProvingKeyBundle { header, ic, coeffs, a, b1, b2, c, h })
}

/// Read a complete bundle and its MPC transcript.
pub fn read_zkey<R: Read + Seek>(reader: R) -> Result<(ProvingKeyBundle, MpcTranscript), FormatError> {
    let mut f = BinFile::open(reader, ZKEY_MAGIC, ZKEY_VERSION)?;
    f.ensure_unique_sections(1..=ZKEY_SECTIONS)?;
    let bundle = read_bundle(&mut f)?;
    let mpc_params = mpc::read_mpc_params(&mut f)?;
    Ok((bundle, mpc_params))
}

/// Read a complete bundle from `path`.
pub fn read_zkey_file(path: impl AsRef<Path>) -> Result<(ProvingKeyBundle, MpcTranscript), FormatError> {
    let f = File::open(path.as_ref())?;
    read_zkey(BufReader::new(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;
    use ark_ff::UniformRand;
    use num_bigint::BigUint;
    use rand::{rngs::StdRng, SeedableRng};
    use std::io::Cursor;

    fn roundtrip(bundle: &ProvingKeyBundle, mpc_params: &MpcTranscript) -> (ProvingKeyBundle, MpcTranscript) {
        let bytes = write_zkey(Cursor::new(Vec::new()), bundle, mpc_params).unwrap().into_inner();
        read_zkey(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn small_bundle_keeps_every_array_length() {
        let mut rng = StdRng::from_seed([11u8; 32]);
        let setup = fixture::ToySetup::new(&mut rng);
        let (bundle, mpc_params) = setup.initial_bundle(4, 1, 4, &mut rng).unwrap();

        let (back, back_mpc) = roundtrip(&bundle, &mpc_params);
        assert_eq!(back.ic.len(), 2);
        assert_eq!(back.a.len(), 4);
        assert_eq!(back.b1.len(), 4);
        assert_eq!(back.b2.len(), 4);
        assert_eq!(back.c.len(), 2);
        assert_eq!(back.h.len(), 4);
        assert_eq!(back.header.power, 2);
        assert_eq!(back, ProvingKeyBundle { coeffs: persisted_coefficients(&bundle.coeffs), ..bundle });
        assert_eq!(back_mpc, mpc_params);
    }

    #[test]
    fn coefficients_survive_the_montgomery_transform() {
        let mut rng = StdRng::from_seed([12u8; 32]);
        let setup = fixture::ToySetup::new(&mut rng);
        let (mut bundle, mpc_params) = setup.initial_bundle(4, 1, 4, &mut rng).unwrap();
        bundle.coeffs = vec![
            Coefficient { matrix: Matrix::B, constraint: 2, signal: 3, value: Fr::rand(&mut rng) },
            Coefficient { matrix: Matrix::C, constraint: 0, signal: 1, value: Fr::from(9u64) },
            Coefficient { matrix: Matrix::A, constraint: 0, signal: 0, value: Fr::from(1u64) },
            Coefficient { matrix: Matrix::A, constraint: 1, signal: 2, value: -Fr::from(1u64) },
        ];
        let (back, _) = roundtrip(&bundle, &mpc_params);
        assert_eq!(back.coeffs.len(), 3);
        assert_eq!(back.coeffs[0].value, Fr::from(1u64));
        assert_eq!(back.coeffs[1].value, -Fr::from(1u64));
        assert_eq!(back.coeffs[2].value, bundle.coeffs[0].value);
        assert!(back.coeffs.iter().all(|c| c.matrix != Matrix::C));
        assert!(back.coeffs.windows(2).all(|w| w[0].constraint <= w[1].constraint));
    }

    #[test]
    fn stored_coefficient_is_value_times_r_squared() {
        let mut rng = StdRng::from_seed([13u8; 32]);
        let setup = fixture::ToySetup::new(&mut rng);
        let (mut bundle, mpc_params) = setup.initial_bundle(4, 1, 4, &mut rng).unwrap();
        bundle.coeffs =
            vec![Coefficient { matrix: Matrix::A, constraint: 0, signal: 0, value: Fr::from(1u64) }];
        let bytes = write_zkey(Cursor::new(Vec::new()), &bundle, &mpc_params).unwrap().into_inner();

        let mut f = BinFile::open(Cursor::new(bytes), ZKEY_MAGIC, ZKEY_VERSION).unwrap();
        let s = f.unique_section(section::COEFFS).unwrap();
        let raw = f.read_at(section::COEFFS, 16, N8R).unwrap();
        assert_eq!(s.size, 4 + 12 + N8R as u64);

        // Independent computation: 2^(2·256) mod r.
        let r = BigUint::from(Fr::MODULUS);
        let expected = (BigUint::from(1u8) << 512usize) % &r;
        let mut expected = expected.to_bytes_le();
        expected.resize(N8R, 0);
        assert_eq!(raw, expected);
    }

    #[test]
    fn non_power_of_two_domain_is_rejected() {
        assert!(matches!(
            Groth16Header::bn254(4, 1, 6),
            Err(FormatError::DomainNotPowerOfTwo(6))
        ));
    }

    #[test]
    fn wrong_protocol_and_missing_sections_are_fatal() {
        let mut rng = StdRng::from_seed([14u8; 32]);
        let setup = fixture::ToySetup::new(&mut rng);
        let (bundle, mpc_params) = setup.initial_bundle(4, 1, 4, &mut rng).unwrap();
        let mut bytes = write_zkey(Cursor::new(Vec::new()), &bundle, &mpc_params).unwrap().into_inner();

        // Section 1 payload starts right after the container and section headers.
        let mut wrong = bytes.clone();
        wrong[24] = 2;
        assert!(matches!(read_zkey(Cursor::new(wrong)), Err(FormatError::WrongProtocol(2))));

        // Renumber section 1 so that id 1 disappears and id 2 is duplicated.
        bytes[12] = 2;
        assert!(matches!(read_zkey(Cursor::new(bytes)), Err(FormatError::MissingSection(1))));
    }

    #[test]
    fn shape_is_checked_on_write() {
        let mut rng = StdRng::from_seed([15u8; 32]);
        let setup = fixture::ToySetup::new(&mut rng);
        let (mut bundle, mpc_params) = setup.initial_bundle(4, 1, 4, &mut rng).unwrap();
        bundle.c.pop();
        let err = write_zkey(Cursor::new(Vec::new()), &bundle, &mpc_params).unwrap_err();
        assert!(matches!(err, FormatError::ShapeMismatch { what: "C", .. }));
    }
}
