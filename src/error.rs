use crate::address::Family;

/// What was wrong with a piece of address or subnet text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ParseErrorKind {
    /// Not a valid IPv4 or IPv6 address literal.
    #[error("invalid IP address")]
    Address,
    /// The prefix length is not a number, or exceeds the family width.
    #[error("invalid prefix length")]
    PrefixLength,
    /// The dotted mask is not a contiguous run of ones.
    #[error("invalid subnet mask")]
    Mask,
    /// Neither `addr/len` nor `addr mask`.
    #[error("invalid subnet")]
    Subnet,
    /// Address and mask belong to different families.
    #[error("address and mask families differ")]
    MixedFamily,
}

/// Malformed address or subnet text.
///
/// This is the "invalid" sentinel of the parsers. The join engine turns it into
/// "matches nothing" rather than failing the whole call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
#[error("{kind}: {input:?}")]
pub struct ParseError {
    kind: ParseErrorKind,
    input: String,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, input: &str) -> Self {
        Self {
            kind,
            input: input.to_string(),
        }
    }

    /// What was wrong with the input.
    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    /// The text that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Errors reported by this crate.
///
/// Everything except [`Error::Parse`] is a configuration error: the caller
/// passed a parameter that can never be valid, so the whole call fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("invalid join kind {given:?}, expected one of: Left, Inner, Right, Full")]
    InvalidJoinKind { given: String },

    #[error("invalid match strategy {given:?}, expected one of: Scan, Indexed")]
    InvalidMatchStrategy { given: String },

    #[error("prefix length {prefix_len} exceeds {max} bits for {family}")]
    PrefixOutOfRange {
        family: Family,
        prefix_len: u32,
        max: u8,
    },

    #[error("{what} index {index} out of range 1..={max}")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        max: usize,
    },

    #[error("integer {value} does not fit an {family} address")]
    IntegerOutOfRange { family: Family, value: u128 },

    #[error("expected an {expected} value, got {found}")]
    FamilyMismatch { expected: Family, found: Family },

    #[error("range start {first} is above range end {last}")]
    InvalidRange { first: String, last: String },

    #[error("dividing into {requested} subnets exceeds the limit of {limit}")]
    TooManySubnets { requested: u128, limit: u128 },
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
