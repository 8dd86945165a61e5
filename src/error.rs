//! Hard-fault error taxonomy shared by the codecs.
//!
//! A [`FormatError`] means the bytes on disk cannot be trusted at all: the
//! container is malformed, a section is missing or duplicated, a field element
//! is out of range, or a parameter block violates its encoding rules. There is
//! no recovery; callers stop immediately.
//!
//! Consistency and cryptographic failures are *not* errors in this sense. They
//! are well-formed outcomes reported through [`crate::verify::Verdict`].

#![forbid(unsafe_code)]

/// Fatal decode/encode failures.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Underlying I/O failure (file not found, truncated read, ...).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File does not start with the expected 4-byte tag
    #[error("bad magic: expected {expected:?}, found {found:?}")]
    BadMagic {
        /// Tag for the artifact kind being opened.
        expected: [u8; 4],
        /// Tag actually read.
        found: [u8; 4],
    },

    /// Container version newer than this reader understands
    #[error("unsupported container version {found} (max supported {max})")]
    UnsupportedVersion {
        /// Version in the file.
        found: u32,
        /// Highest version accepted.
        max: u32,
    },

    /// Required section id absent from the section table
    #[error("section {0} is missing")]
    MissingSection(u32),

    /// Section id that must be unique appears twice
    #[error("section {0} appears more than once")]
    DuplicateSection(u32),

    /// Section reader stopped short of (or past) the declared length
    #[error("section {id}: consumed {consumed} bytes, declared {declared}")]
    SectionSizeMismatch {
        /// Section id.
        id: u32,
        /// Bytes read before the section was closed.
        consumed: u64,
        /// Length recorded in the section header.
        declared: u64,
    },

    /// Read would cross the end of a section
    #[error("read of {len} bytes overruns section {id}")]
    SectionOverrun {
        /// Section id.
        id: u32,
        /// Bytes past the section end.
        len: u64,
    },

    /// Positioned read attempted with no section open
    #[error("no section is open for reading")]
    NoActiveSection,

    /// Section opened while another is still open
    #[error("section {0} is already open")]
    SectionAlreadyOpen(u32),

    /// Section 1 names a proving system other than Groth16
    #[error("protocol id {0} is not a Groth16 bundle")]
    WrongProtocol(u32),

    /// Base or scalar modulus is not BN254's
    #[error("moduli in the header do not belong to BN254")]
    UnsupportedCurve,

    /// Field element byte width other than 32
    #[error("field width {found} bytes, expected {expected}")]
    BadFieldWidth {
        /// Width in the header.
        found: u32,
        /// Width of the BN254 fields.
        expected: u32,
    },

    /// Big integer too large for its byte width
    #[error("integer does not fit in {n8} bytes")]
    IntegerTooWide {
        /// Byte width available.
        n8: usize,
    },

    /// Domain size is not a power of two
    #[error("domain size {0} is not a power of two")]
    DomainNotPowerOfTwo(u32),

    /// Domain too large for the roots of unity the H check needs
    #[error("domain size {0} exceeds the scalar field two-adicity headroom")]
    DomainTooLarge(u32),

    /// `nPublic >= nVars`
    #[error("nPublic ({n_public}) must be smaller than nVars ({n_vars})")]
    BadShape {
        /// Total signals.
        n_vars: u32,
        /// Public signals.
        n_public: u32,
    },

    /// Vector length disagrees with the circuit shape
    #[error("{what}: expected {expected} elements, got {got}")]
    ShapeMismatch {
        /// Which vector.
        what: &'static str,
        /// Length implied by the header.
        expected: usize,
        /// Length found.
        got: usize,
    },

    /// Field element encoding is `>=` the modulus
    #[error("non-canonical field element (value >= modulus)")]
    NonCanonicalField,

    /// Point coordinates do not satisfy the curve equation
    #[error("point is not on the curve")]
    PointNotOnCurve,

    /// G2 point outside the prime-order subgroup
    #[error("G2 point is not in the prime-order subgroup")]
    PointNotInSubgroup,

    /// Coefficient references a matrix that is never persisted
    #[error("coefficient {index}: matrix id {matrix} is not persisted (expected 0 or 1)")]
    BadMatrix {
        /// Position in the coefficient list.
        index: usize,
        /// Matrix id read.
        matrix: u32,
    },

    /// Coefficients are not grouped by matrix and constraint
    #[error("coefficient {index} breaks constraint ordering")]
    UnsortedCoefficients {
        /// Position of the first out-of-order coefficient.
        index: usize,
    },

    /// Section length is not a whole number of elements
    #[error("section length {len} is not a multiple of element size {elem}")]
    RaggedSection {
        /// Section byte length.
        len: u64,
        /// Element byte size.
        elem: usize,
    },

    /// Parameter tags out of increasing order
    #[error("contribution parameters must be sorted (tag {tag} after {last})")]
    UnsortedParams {
        /// Offending tag.
        tag: u8,
        /// Tag that preceded it.
        last: u8,
    },

    /// Parameter tag outside the known set
    #[error("contribution parameter tag {0} not recognized")]
    UnknownParam(u8),

    /// Parameter block shorter or longer than its length prefix
    #[error("contribution parameters do not match declared length {declared}")]
    ParamsLengthMismatch {
        /// Length prefix.
        declared: u32,
    },

    /// Contribution type other than plain (0) or beacon (1)
    #[error("contribution type {0} not recognized")]
    UnknownContributionType(u32),

    /// Contribution record violates an encoding rule
    #[error("contribution {0}")]
    InvalidContribution(&'static str),

    /// Contribution name is not UTF-8
    #[error("contribution name is not valid UTF-8")]
    InvalidName,

    /// Powers-of-tau artifact is inconsistent with its header
    #[error("powers of tau: {0}")]
    InvalidPowersOfTau(&'static str),
}
