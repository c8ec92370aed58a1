//! Error types.
//!
//! Registration and client calls return [`Error`]. While serving, per-request
//! failures are logged as `Error` values and never stop the agent.

use std::net::SocketAddr;
use std::time::Duration;

use crate::oid::Oid;
use crate::pdu::PduType;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong while decoding BER.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    UnexpectedTag { expected: u8, actual: u8 },
    TruncatedData,
    InvalidLength,
    /// Indefinite lengths (0x80) never appear in SNMP.
    IndefiniteLength,
    ZeroLengthInteger,
    InvalidOidEncoding,
    UnknownVersion(i32),
    /// Includes SNMPv1 Trap-PDU (0xA4), which this crate does not decode.
    UnknownPduType(u8),
    ConstructedOctetString,
    InvalidNull,
    InvalidIpAddressLength { length: usize },
    LengthTooLong { octets: usize },
    Integer64TooLong { length: usize },
    /// A TLV's length runs past its enclosing data.
    TlvOverflow,
    InsufficientData { needed: usize, available: usize },
    OidTooLong { count: usize, max: usize },
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedTag { expected, actual } => {
                write!(f, "tag 0x{:02X} where 0x{:02X} was expected", actual, expected)
            }
            Self::TruncatedData => f.write_str("data ends mid-value"),
            Self::InvalidLength => f.write_str("malformed length"),
            Self::IndefiniteLength => f.write_str("indefinite length"),
            Self::ZeroLengthInteger => f.write_str("integer with no content octets"),
            Self::InvalidOidEncoding => f.write_str("malformed OBJECT IDENTIFIER"),
            Self::UnknownVersion(v) => write!(f, "unsupported SNMP version {}", v),
            Self::UnknownPduType(t) => write!(f, "unsupported PDU tag 0x{:02X}", t),
            Self::ConstructedOctetString => f.write_str("constructed OCTET STRING"),
            Self::InvalidNull => f.write_str("NULL with content"),
            Self::InvalidIpAddressLength { length } => {
                write!(f, "IpAddress of {} octets", length)
            }
            Self::LengthTooLong { octets } => write!(f, "length field of {} octets", octets),
            Self::Integer64TooLong { length } => {
                write!(f, "64-bit integer of {} octets", length)
            }
            Self::TlvOverflow => f.write_str("value overruns its container"),
            Self::InsufficientData { needed, available } => {
                write!(f, "{} octets needed, {} left", needed, available)
            }
            Self::OidTooLong { count, max } => {
                write!(f, "OID of {} arcs (at most {} allowed)", count, max)
            }
        }
    }
}

/// OID validation error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OidErrorKind {
    /// Empty OID (string input, or registration at the tree root).
    Empty,
    /// Arc is not a non-negative integer that fits in 32 bits.
    InvalidArc,
}

impl std::fmt::Display for OidErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty OID"),
            Self::InvalidArc => write!(f, "arc must be a non-negative integer"),
        }
    }
}

/// SNMP error status codes (RFC 3416).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorStatus {
    NoError,
    TooBig,
    NoSuchName,
    BadValue,
    ReadOnly,
    GenErr,
    NoAccess,
    WrongType,
    WrongLength,
    WrongEncoding,
    WrongValue,
    NoCreation,
    InconsistentValue,
    ResourceUnavailable,
    CommitFailed,
    UndoFailed,
    AuthorizationError,
    NotWritable,
    InconsistentName,
    /// A code outside RFC 3416.
    Unknown(i32),
}

/// Known statuses, indexed by their wire code.
const STATUS_CODES: [(ErrorStatus, &str); 19] = [
    (ErrorStatus::NoError, "noError"),
    (ErrorStatus::TooBig, "tooBig"),
    (ErrorStatus::NoSuchName, "noSuchName"),
    (ErrorStatus::BadValue, "badValue"),
    (ErrorStatus::ReadOnly, "readOnly"),
    (ErrorStatus::GenErr, "genErr"),
    (ErrorStatus::NoAccess, "noAccess"),
    (ErrorStatus::WrongType, "wrongType"),
    (ErrorStatus::WrongLength, "wrongLength"),
    (ErrorStatus::WrongEncoding, "wrongEncoding"),
    (ErrorStatus::WrongValue, "wrongValue"),
    (ErrorStatus::NoCreation, "noCreation"),
    (ErrorStatus::InconsistentValue, "inconsistentValue"),
    (ErrorStatus::ResourceUnavailable, "resourceUnavailable"),
    (ErrorStatus::CommitFailed, "commitFailed"),
    (ErrorStatus::UndoFailed, "undoFailed"),
    (ErrorStatus::AuthorizationError, "authorizationError"),
    (ErrorStatus::NotWritable, "notWritable"),
    (ErrorStatus::InconsistentName, "inconsistentName"),
];

impl ErrorStatus {
    pub fn from_i32(value: i32) -> Self {
        usize::try_from(value)
            .ok()
            .and_then(|code| STATUS_CODES.get(code))
            .map_or(Self::Unknown(value), |(status, _)| *status)
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Unknown(code) => *code,
            // every named variant is in the table
            known => STATUS_CODES
                .iter()
                .position(|(status, _)| status == known)
                .map_or(5, |code| code as i32),
        }
    }
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown({})", code),
            known => {
                let name = STATUS_CODES
                    .iter()
                    .find(|(status, _)| status == known)
                    .map_or("genErr", |(_, name)| *name);
                f.write_str(name)
            }
        }
    }
}

/// Library error type.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error during communication.
    #[error("I/O error{}: {source}", target.map(|t| format!(" communicating with {}", t)).unwrap_or_default())]
    Io {
        target: Option<SocketAddr>,
        #[source]
        source: std::io::Error,
    },

    /// Request timed out (after retries if configured).
    #[error("timeout after {elapsed:?}{} (request_id={request_id}, retries={retries})", target.map(|t| format!(" waiting for {}", t)).unwrap_or_default())]
    Timeout {
        target: Option<SocketAddr>,
        elapsed: Duration,
        request_id: i32,
        retries: u32,
    },

    /// SNMP protocol error returned by a remote agent.
    #[error("SNMP error{}: {status} at index {index}", target.map(|t| format!(" from {}", t)).unwrap_or_default())]
    Snmp {
        target: Option<SocketAddr>,
        status: ErrorStatus,
        index: u32,
        oid: Option<Oid>,
    },

    /// Invalid OID format or arc.
    #[error("invalid OID{}: {kind}", input.as_ref().map(|i| format!(" '{}'", i)).unwrap_or_default())]
    InvalidOid {
        kind: OidErrorKind,
        input: Option<Box<str>>, // Only allocated when parsing string input
    },

    /// BER decoding error.
    #[error("decode error at offset {offset}: {kind}")]
    Decode {
        offset: usize,
        kind: DecodeErrorKind,
    },

    /// A response decoded but does not answer the request (wrong PDU type,
    /// or missing the varbind it should carry).
    #[error("malformed response{}", target.map(|t| format!(" from {}", t)).unwrap_or_default())]
    MalformedResponse { target: Option<SocketAddr> },

    /// Response request ID doesn't match.
    #[error("request ID mismatch: expected {expected}, got {actual}")]
    RequestIdMismatch { expected: i32, actual: i32 },

    /// Message exceeds maximum size.
    #[error("message too large: {size} bytes exceeds maximum {max}")]
    MessageTooLarge { size: usize, max: usize },

    /// A plugin or proxy registration overlaps an existing one.
    ///
    /// Raised when the OID is already occupied, or when registering would
    /// place a node inside the namespace of an existing plugin or proxy.
    #[error("cannot register at {oid}: {reason}")]
    RegistrationConflict { oid: Oid, reason: &'static str },

    /// The agent received a PDU kind it does not serve.
    #[error("unsupported message kind: {pdu_type}")]
    UnknownMessageKind { pdu_type: PduType },

    /// A proxied request to a remote agent failed.
    #[error("proxy request for {oid} to {target} failed: {source}")]
    RemoteProxy {
        oid: Oid,
        target: Box<str>,
        #[source]
        source: Box<Error>,
    },

    /// A plugin producer returned an error.
    #[error("plugin for {oid} failed: {source}")]
    PluginExecution {
        oid: Oid,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Create a decode error.
    pub fn decode(offset: usize, kind: DecodeErrorKind) -> Self {
        Self::Decode { offset, kind }
    }

    /// Create an invalid OID error from a kind (no input string).
    pub fn invalid_oid(kind: OidErrorKind) -> Self {
        Self::InvalidOid { kind, input: None }
    }

    /// Create an invalid OID error with the input string that failed.
    pub fn invalid_oid_with_input(kind: OidErrorKind, input: impl Into<Box<str>>) -> Self {
        Self::InvalidOid {
            kind,
            input: Some(input.into()),
        }
    }

    /// Create a registration conflict error.
    pub fn conflict(oid: Oid, reason: &'static str) -> Self {
        Self::RegistrationConflict { oid, reason }
    }

    /// Get the target address if this error has one.
    pub fn target(&self) -> Option<SocketAddr> {
        match self {
            Self::Io { target, .. } => *target,
            Self::Timeout { target, .. } => *target,
            Self::Snmp { target, .. } => *target,
            Self::MalformedResponse { target } => *target,
            Self::RemoteProxy { source, .. } => source.target(),
            _ => None,
        }
    }
}
