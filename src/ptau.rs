//! Powers-of-tau artifact (read side of the H check, plus a writer for tooling)
//!
//! Only the parts the bundle verifier needs are kept:
//!
//! ```text
//! magic "ptau" | version 1 | 3 sections
//! 1  header  u32 n8q | q | u32 power | u32 ceremonyPower
//! 2  tauG1   2^(power+1) − 1 G1 points  [τ^i]₁
//! 3  tauG2   2^power G2 points          [τ^i]₂
//! ```
//!
//! # Validation layers
//!
//! 1. **Format**: container, field width, BN254 base modulus, section sizes
//!    consistent with `power`.
//! 2. **Structure**: `tauG1[0]` and `tauG2[0]` are the generators.
//! 3. **Cryptographic** (optional, [`PowersOfTau::check_tau_pairing`]):
//!    `e([τ]₁, G₂) = e(G₁, [τ]₂)`.
//!
//! Points are never loaded in bulk; the verifier reads bounded windows of
//! tauG1 through [`PowersOfTau::read_tau_g1`].

#![forbid(unsafe_code)]

use ark_ec::AffineRepr;
use ark_ff::PrimeField;
use num_bigint::BigUint;
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;

use crate::container::{BinFile, BinFileWriter};
use crate::error::FormatError;
use crate::group_codec::{self, G1_SIZE, G2_SIZE, N8Q};
use crate::msm::same_ratio;
use crate::{Fq, G1, G2};

/// Container magic for powers-of-tau files.
pub const PTAU_MAGIC: &[u8; 4] = b"ptau";
/// Container version written and accepted.
pub const PTAU_VERSION: u32 = 1;
const PTAU_SECTIONS: u32 = 3;

/// Section ids.
pub mod section {
    /// `n8q | q | power | ceremonyPower`.
    pub const HEADER: u32 = 1;
    /// `[τ^i]₁`, `i < 2^(power+1) − 1`.
    pub const TAU_G1: u32 = 2;
    /// `[τ^i]₂`, `i < 2^power`.
    pub const TAU_G2: u32 = 3;
}

/// Decoded section 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PtauHeader {
    /// log2 of the largest supported circuit domain.
    pub power: u32,
    /// Power the ceremony was originally run at (≥ `power` if truncated).
    pub ceremony_power: u32,
}

impl PtauHeader {
    /// Number of G1 powers.
    #[inline]
    pub fn tau_g1_len(&self) -> usize {
        (1usize << (self.power + 1)) - 1
    }

    /// Number of G2 powers.
    #[inline]
    pub fn tau_g2_len(&self) -> usize {
        1usize << self.power
    }
}

/// Opened powers-of-tau file with random access to tauG1.
pub struct PowersOfTau<R> {
    file: BinFile<R>,
    header: PtauHeader,
}

impl PowersOfTau<BufReader<File>> {
    /// Open a file on disk.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        let f = File::open(path.as_ref())?;
        Self::open(BufReader::new(f))
    }
}

impl<R: Read + Seek> PowersOfTau<R> {
    /// Validate the header and section sizes; points are read lazily.
    pub fn open(reader: R) -> Result<Self, FormatError> {
        let mut file = BinFile::open(reader, PTAU_MAGIC, PTAU_VERSION)?;
        file.ensure_unique_sections(1..=PTAU_SECTIONS)?;

        file.start_read_unique_section(section::HEADER)?;
        let n8q = file.read_u32()?;
        if n8q as usize != N8Q {
            return Err(FormatError::BadFieldWidth { found: n8q, expected: N8Q as u32 });
        }
        if file.read_big_int(N8Q)? != BigUint::from(Fq::MODULUS) {
            return Err(FormatError::UnsupportedCurve);
        }
        let power = file.read_u32()?;
        let ceremony_power = file.read_u32()?;
        file.end_read_section()?;

        if power == 0 || power > 28 {
            return Err(FormatError::InvalidPowersOfTau("power out of range"));
        }
        let header = PtauHeader { power, ceremony_power };

        if file.section_size(section::TAU_G1)? != (header.tau_g1_len() * G1_SIZE) as u64 {
            return Err(FormatError::InvalidPowersOfTau("tauG1 section size does not match power"));
        }
        if file.section_size(section::TAU_G2)? != (header.tau_g2_len() * G2_SIZE) as u64 {
            return Err(FormatError::InvalidPowersOfTau("tauG2 section size does not match power"));
        }

        let mut ptau = Self { file, header };
        if ptau.read_tau_g1(0, 1)?[0] != G1::generator() || ptau.read_tau_g2(0)? != G2::generator() {
            return Err(FormatError::InvalidPowersOfTau("first power is not the generator"));
        }
        Ok(ptau)
    }

    /// Decoded header.
    #[inline]
    pub fn header(&self) -> PtauHeader {
        self.header
    }

    /// `[τ^first … τ^(first+len−1)]₁`.
    pub fn read_tau_g1(&mut self, first: usize, len: usize) -> Result<Vec<G1>, FormatError> {
        let bytes = self.file.read_at(section::TAU_G1, (first * G1_SIZE) as u64, len * G1_SIZE)?;
        group_codec::read_g1_batch(&bytes)
    }

    /// `[τ^i]₂`.
    pub fn read_tau_g2(&mut self, i: usize) -> Result<G2, FormatError> {
        let bytes = self.file.read_at(section::TAU_G2, (i * G2_SIZE) as u64, G2_SIZE)?;
        group_codec::read_g2(&bytes)
    }

    /// `e([τ]₁, G₂) = e(G₁, [τ]₂)`; two pairings, meant for tooling and tests.
    pub fn check_tau_pairing(&mut self) -> Result<bool, FormatError> {
        let tau1 = self.read_tau_g1(1, 1)?[0];
        let tau2 = self.read_tau_g2(1)?;
        Ok(same_ratio(&G1::generator(), &tau1, &G2::generator(), &tau2))
    }
}

/// Write a powers-of-tau file; point counts must match `power`.
pub fn write_ptau<W: Write + Seek>(
    writer: W,
    header: PtauHeader,
    tau_g1: &[G1],
    tau_g2: &[G2],
) -> Result<W, FormatError> {
    if tau_g1.len() != header.tau_g1_len() {
        return Err(FormatError::ShapeMismatch { what: "tauG1", expected: header.tau_g1_len(), got: tau_g1.len() });
    }
    if tau_g2.len() != header.tau_g2_len() {
        return Err(FormatError::ShapeMismatch { what: "tauG2", expected: header.tau_g2_len(), got: tau_g2.len() });
    }
    let mut w = BinFileWriter::create(writer, PTAU_MAGIC, PTAU_VERSION, PTAU_SECTIONS)?;

    w.start_section(section::HEADER)?;
    w.write_u32(N8Q as u32)?;
    w.write_big_int(&BigUint::from(Fq::MODULUS), N8Q)?;
    w.write_u32(header.power)?;
    w.write_u32(header.ceremony_power)?;
    w.end_section()?;

    w.start_section(section::TAU_G1)?;
    let mut buf = Vec::with_capacity(tau_g1.len() * G1_SIZE);
    for p in tau_g1 {
        group_codec::write_g1(&mut buf, p);
    }
    w.write_bytes(&buf)?;
    w.end_section()?;

    w.start_section(section::TAU_G2)?;
    let mut buf = Vec::with_capacity(tau_g2.len() * G2_SIZE);
    for p in tau_g2 {
        group_codec::write_g2(&mut buf, p);
    }
    w.write_bytes(&buf)?;
    w.end_section()?;

    w.finish()
}

/// [`write_ptau`] to a new file at `path`.
pub fn write_ptau_file(
    path: impl AsRef<Path>,
    header: PtauHeader,
    tau_g1: &[G1],
    tau_g2: &[G2],
) -> Result<(), FormatError> {
    let f = File::create(path.as_ref())?;
    write_ptau(std::io::BufWriter::new(f), header, tau_g1, tau_g2)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::ToySetup;
    use ark_bn254::Fr;
    use ark_ec::CurveGroup;
    use rand::{rngs::StdRng, SeedableRng};
    use std::io::Cursor;

    #[test]
    fn toy_ptau_opens_and_passes_pairing_check() {
        let mut rng = StdRng::from_seed([51u8; 32]);
        let setup = ToySetup::new(&mut rng);
        let bytes = setup.ptau_bytes(3).unwrap();
        let mut ptau = PowersOfTau::open(Cursor::new(bytes)).unwrap();
        assert_eq!(ptau.header().power, 3);
        assert_eq!(ptau.header().tau_g1_len(), 15);
        assert!(ptau.check_tau_pairing().unwrap());

        let window = ptau.read_tau_g1(8, 7).unwrap();
        assert_eq!(window.len(), 7);
        assert!(ptau.read_tau_g1(8, 8).is_err());
    }

    #[test]
    fn wrong_point_counts_are_rejected() {
        let header = PtauHeader { power: 1, ceremony_power: 1 };
        let g1 = vec![G1::generator(); 2];
        let g2 = vec![G2::generator(); 2];
        assert!(matches!(
            write_ptau(Cursor::new(Vec::new()), header, &g1, &g2),
            Err(FormatError::ShapeMismatch { what: "tauG1", expected: 3, got: 2 })
        ));
    }

    #[test]
    fn first_power_must_be_the_generator() {
        let header = PtauHeader { power: 1, ceremony_power: 1 };
        let two = (G1::generator() * Fr::from(2u64)).into_affine();
        let g1 = vec![two, two, two];
        let g2 = vec![G2::generator(); 2];
        let bytes = write_ptau(Cursor::new(Vec::new()), header, &g1, &g2).unwrap().into_inner();
        assert!(matches!(
            PowersOfTau::open(Cursor::new(bytes)),
            Err(FormatError::InvalidPowersOfTau(_))
        ));
    }
}
