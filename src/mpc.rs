//! Transcript Codec: MPC contributions stored in bundle section 10.
//!
//! ```text
//! csHash[64] | u32 count | contribution*
//!
//! contribution := deltaAfter G1 | g1_s G1 | g1_sx G1 | g2_spx G2 |
//!                 transcript[64] | u32 type | u32 params_len | params
//! params       := (u8 tag | payload)*   tags strictly increasing
//!   1 name            u8 len | utf-8 bytes (<= 64)
//!   2 iterations exp  u8
//!   3 beacon hash     u8 len | bytes
//! ```

#![forbid(unsafe_code)]

use std::io::{Read, Seek, Write};

use crate::container::{BinFile, BinFileWriter};
use crate::error::FormatError;
use crate::group_codec::{self, G1_SIZE, G2_SIZE};
use crate::zkey::section;
use crate::{G1, G2};

/// Digest width used throughout the transcript.
pub const HASH_LEN: usize = 64;
/// Longest contribution name kept on encode.
pub const MAX_NAME_LEN: usize = 64;

const TAG_NAME: u8 = 1;
const TAG_ITERATIONS_EXP: u8 = 2;
const TAG_BEACON_HASH: u8 = 3;

const TYPE_PLAIN: u32 = 0;
const TYPE_BEACON: u32 = 1;

/// Proof-of-knowledge material a contributor publishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey {
    /// `[s]₁` for a fresh random `s`.
    pub g1_s: G1,
    /// `[s·x]₁`.
    pub g1_sx: G1,
    /// `x · H(transcript)` in G2.
    pub g2_spx: G2,
}

/// How the contribution's secret was chosen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContributionKind {
    /// Secret chosen privately by the contributor.
    Plain,
    /// Derived from a public random beacon iterated `2^iterations_exp` times.
    Beacon {
        /// Log2 of the hash iterations.
        iterations_exp: u8,
        /// Beacon value the iterations start from.
        beacon_hash: Vec<u8>,
    },
}

impl ContributionKind {
    /// `"plain"` or `"beacon"`.
    pub fn label(&self) -> &'static str {
        match self {
            ContributionKind::Plain => "plain",
            ContributionKind::Beacon { .. } => "beacon",
        }
    }
}

/// One participant's step of the ceremony.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contribution {
    /// delta1 after this contribution was applied.
    pub delta_after: G1,
    /// Proof of knowledge of the secret.
    pub key: PublicKey,
    /// Running transcript hash the key was bound to.
    pub transcript: [u8; HASH_LEN],
    /// Optional self-declared name, at most [`MAX_NAME_LEN`] bytes on disk.
    pub name: Option<String>,
    /// How the secret was chosen.
    pub kind: ContributionKind,
}

/// Constraint-system hash plus the ordered contribution list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MpcTranscript {
    /// Hash of the constraint system the ceremony is for.
    pub cs_hash: [u8; HASH_LEN],
    /// Contributions in ceremony order.
    pub contributions: Vec<Contribution>,
}

impl MpcTranscript {
    /// Transcript with no contributions yet.
    pub fn new(cs_hash: [u8; HASH_LEN]) -> Self {
        Self { cs_hash, contributions: Vec::new() }
    }
}

fn truncate_name(name: &str) -> &str {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// Encode the tagged parameter block (without its length prefix).
pub fn encode_params(c: &Contribution) -> Result<Vec<u8>, FormatError> {
    let mut out = Vec::new();
    if let Some(name) = &c.name {
        let name = truncate_name(name);
        out.push(TAG_NAME);
        out.push(name.len() as u8);
        out.extend_from_slice(name.as_bytes());
    }
    if let ContributionKind::Beacon { iterations_exp, beacon_hash } = &c.kind {
        if beacon_hash.len() > u8::MAX as usize {
            return Err(FormatError::InvalidContribution("beacon hash longer than 255 bytes"));
        }
        out.push(TAG_ITERATIONS_EXP);
        out.push(*iterations_exp);
        out.push(TAG_BEACON_HASH);
        out.push(beacon_hash.len() as u8);
        out.extend_from_slice(beacon_hash);
    }
    Ok(out)
}

#[derive(Default)]
struct Params {
    name: Option<String>,
    iterations_exp: Option<u8>,
    beacon_hash: Option<Vec<u8>>,
}

/// Decode a parameter block of exactly `bytes.len()` declared bytes.
fn decode_params(bytes: &[u8]) -> Result<Params, FormatError> {
    let declared = bytes.len() as u32;
    let short = || FormatError::ParamsLengthMismatch { declared };
    let mut p = Params::default();
    let mut last = 0u8;
    let mut i = 0usize;
    while i < bytes.len() {
        let tag = bytes[i];
        i += 1;
        if tag <= last {
            return Err(FormatError::UnsortedParams { tag, last });
        }
        last = tag;
        match tag {
            TAG_NAME => {
                let len = *bytes.get(i).ok_or_else(short)? as usize;
                let raw = bytes.get(i + 1..i + 1 + len).ok_or_else(short)?;
                let name = std::str::from_utf8(raw).map_err(|_| FormatError::InvalidName)?;
                p.name = Some(name.to_owned());
                i += 1 + len;
            }
            TAG_ITERATIONS_EXP => {
                p.iterations_exp = Some(*bytes.get(i).ok_or_else(short)?);
                i += 1;
            }
            TAG_BEACON_HASH => {
                let len = *bytes.get(i).ok_or_else(short)? as usize;
                let raw = bytes.get(i + 1..i + 1 + len).ok_or_else(short)?;
                p.beacon_hash = Some(raw.to_vec());
                i += 1 + len;
            }
            other => return Err(FormatError::UnknownParam(other)),
        }
    }
    Ok(p)
}

fn read_contribution<R: Read + Seek>(f: &mut BinFile<R>) -> Result<Contribution, FormatError> {
    let delta_after = group_codec::read_g1(&f.read_bytes(G1_SIZE)?)?;
    let g1_s = group_codec::read_g1(&f.read_bytes(G1_SIZE)?)?;
    let g1_sx = group_codec::read_g1(&f.read_bytes(G1_SIZE)?)?;
    let g2_spx = group_codec::read_g2(&f.read_bytes(G2_SIZE)?)?;
    let mut transcript = [0u8; HASH_LEN];
    f.read_into(&mut transcript)?;
    let ty = f.read_u32()?;
    let params_len = f.read_u32()?;
    if params_len as u64 > f.remaining_in_section()? {
        return Err(FormatError::ParamsLengthMismatch { declared: params_len });
    }
    let params = decode_params(&f.read_bytes(params_len as usize)?)?;

    let kind = match ty {
        TYPE_PLAIN => {
            if params.iterations_exp.is_some() || params.beacon_hash.is_some() {
                return Err(FormatError::InvalidContribution("plain contribution carries beacon parameters"));
            }
            ContributionKind::Plain
        }
        TYPE_BEACON => match (params.iterations_exp, params.beacon_hash) {
            (Some(iterations_exp), Some(beacon_hash)) => ContributionKind::Beacon { iterations_exp, beacon_hash },
            _ => return Err(FormatError::InvalidContribution("beacon contribution without beacon parameters")),
        },
        other => return Err(FormatError::UnknownContributionType(other)),
    };

    Ok(Contribution {
        delta_after,
        key: PublicKey { g1_s, g1_sx, g2_spx },
        transcript,
        name: params.name,
        kind,
    })
}

/// Read section 10.
pub fn read_mpc_params<R: Read + Seek>(f: &mut BinFile<R>) -> Result<MpcTranscript, FormatError> {
    f.start_read_unique_section(section::CONTRIBUTIONS)?;
    let mut cs_hash = [0u8; HASH_LEN];
    f.read_into(&mut cs_hash)?;
    let n = f.read_u32()?;
    let mut contributions = Vec::with_capacity(n.min(1024) as usize);
    for _ in 0..n {
        contributions.push(read_contribution(f)?);
    }
    f.end_read_section()?;
    Ok(MpcTranscript { cs_hash, contributions })
}

/// Write section 10.
pub fn write_mpc_params<W: Write + Seek>(
    w: &mut BinFileWriter<W>,
    mpc: &MpcTranscript,
) -> Result<(), FormatError> {
    w.start_section(section::CONTRIBUTIONS)?;
    w.write_bytes(&mpc.cs_hash)?;
    w.write_u32(mpc.contributions.len() as u32)?;
    for c in &mpc.contributions {
        let mut buf = Vec::with_capacity(3 * G1_SIZE + G2_SIZE + HASH_LEN);
        group_codec::write_g1(&mut buf, &c.delta_after);
        group_codec::write_g1(&mut buf, &c.key.g1_s);
        group_codec::write_g1(&mut buf, &c.key.g1_sx);
        group_codec::write_g2(&mut buf, &c.key.g2_spx);
        buf.extend_from_slice(&c.transcript);
        w.write_bytes(&buf)?;
        w.write_u32(match c.kind {
            ContributionKind::Plain => TYPE_PLAIN,
            ContributionKind::Beacon { .. } => TYPE_BEACON,
        })?;
        let params = encode_params(c)?;
        w.write_u32(params.len() as u32)?;
        w.write_bytes(&params)?;
    }
    w.end_section()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::AffineRepr;
    use std::io::Cursor;

    fn contribution(name: Option<&str>, kind: ContributionKind) -> Contribution {
        Contribution {
            delta_after: G1::generator(),
            key: PublicKey { g1_s: G1::generator(), g1_sx: G1::generator(), g2_spx: G2::generator() },
            transcript: [7u8; HASH_LEN],
            name: name.map(str::to_owned),
            kind,
        }
    }

    fn encode(mpc: &MpcTranscript) -> Vec<u8> {
        let mut w = BinFileWriter::create(Cursor::new(Vec::new()), b"zkey", 1, 1).unwrap();
        write_mpc_params(&mut w, mpc).unwrap();
        w.finish().unwrap().into_inner()
    }

    fn decode(bytes: Vec<u8>) -> Result<MpcTranscript, FormatError> {
        let mut f = BinFile::open(Cursor::new(bytes), b"zkey", 1)?;
        read_mpc_params(&mut f)
    }

    #[test]
    fn plain_and_beacon_contributions_decode() {
        let mut mpc = MpcTranscript::new([1u8; HASH_LEN]);
        mpc.contributions.push(contribution(Some("alice"), ContributionKind::Plain));
        mpc.contributions.push(contribution(None, ContributionKind::Plain));
        mpc.contributions.push(contribution(
            Some("final beacon"),
            ContributionKind::Beacon { iterations_exp: 10, beacon_hash: vec![0xab; 32] },
        ));
        assert_eq!(decode(encode(&mpc)).unwrap(), mpc);
    }

    #[test]
    fn long_names_are_truncated_on_a_char_boundary() {
        let name = format!("a{}", "é".repeat(40)); // 81 bytes, byte 64 splits a char
        let c = contribution(Some(&name), ContributionKind::Plain);
        let params = encode_params(&c).unwrap();
        assert_eq!(params[1], 63);
        assert_eq!(std::str::from_utf8(&params[2..]).unwrap(), format!("a{}", "é".repeat(31)));
    }

    #[test]
    fn parameter_block_rules_are_enforced() {
        assert!(matches!(
            decode_params(&[TAG_ITERATIONS_EXP, 3, TAG_NAME, 0]),
            Err(FormatError::UnsortedParams { tag: 1, last: 2 })
        ));
        assert!(matches!(
            decode_params(&[TAG_NAME, 0, TAG_NAME, 0]),
            Err(FormatError::UnsortedParams { tag: 1, last: 1 })
        ));
        assert!(matches!(decode_params(&[9, 0]), Err(FormatError::UnknownParam(9))));
        assert!(matches!(
            decode_params(&[TAG_NAME, 5, b'a']),
            Err(FormatError::ParamsLengthMismatch { declared: 3 })
        ));
        assert!(matches!(decode_params(&[TAG_NAME, 2, 0xff, 0xfe]), Err(FormatError::InvalidName)));
    }

    #[test]
    fn declared_length_must_match_section_contents() {
        let mut mpc = MpcTranscript::new([0u8; HASH_LEN]);
        mpc.contributions.push(contribution(Some("bob"), ContributionKind::Plain));
        let mut bytes = encode(&mpc);
        // params_len sits right before the 5-byte name entry at the end of the file.
        let at = bytes.len() - 5 - 4;
        assert_eq!(bytes[at], 5);
        bytes[at] = 4;
        assert!(matches!(decode(bytes), Err(FormatError::ParamsLengthMismatch { declared: 4 })));
    }

    #[test]
    fn unknown_contribution_type_is_fatal() {
        let mut mpc = MpcTranscript::new([0u8; HASH_LEN]);
        mpc.contributions.push(contribution(None, ContributionKind::Plain));
        let mut bytes = encode(&mpc);
        let at = bytes.len() - 4 - 4;
        bytes[at] = 5;
        assert!(matches!(decode(bytes), Err(FormatError::UnknownContributionType(5))));
    }
}
