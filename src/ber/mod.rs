//! BER (Basic Encoding Rules) codec for the SNMP subset the agent speaks.
//!
//! Encoding writes into a reverse buffer so constructed lengths never need
//! to be computed up front. Decoding is zero-copy over [`bytes::Bytes`] and
//! permissive in the places net-snmp is permissive (non-minimal integers and
//! lengths are accepted).

mod decode;
mod encode;
mod length;
pub mod tag;

pub use decode::Decoder;
pub use encode::EncodeBuf;
pub use length::{MAX_LENGTH, decode_length, encode_length};
