//! BER length octets (X.690 8.1.3).

use crate::error::{DecodeErrorKind, Error, Result};

/// Largest content length accepted on decode.
///
/// Datagrams are bounded by the UDP payload size, so anything claiming more
/// than this is garbage.
pub const MAX_LENGTH: usize = 0x00FF_FFFF;

/// Encode a length for the reverse buffer.
///
/// Returns the octets in reverse order (last octet first) and how many of
/// them are valid.
pub fn encode_length(len: usize) -> ([u8; 5], usize) {
    let mut out = [0u8; 5];
    if len < 0x80 {
        out[0] = len as u8;
        return (out, 1);
    }

    let mut n = 0;
    let mut rest = len;
    while rest > 0 && n < 4 {
        out[n] = (rest & 0xFF) as u8;
        rest >>= 8;
        n += 1;
    }
    out[n] = 0x80 | n as u8;
    (out, n + 1)
}

/// Decode a length starting at `data[0]`.
///
/// `base_offset` is the position of `data` in the enclosing message and is
/// only used for error reporting. Returns `(length, octets consumed)`.
pub fn decode_length(data: &[u8], base_offset: usize) -> Result<(usize, usize)> {
    let Some(&first) = data.first() else {
        return Err(fail(base_offset, DecodeErrorKind::TruncatedData));
    };

    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }

    let octets = (first & 0x7F) as usize;
    if octets == 0 {
        return Err(fail(base_offset, DecodeErrorKind::IndefiniteLength));
    }
    if octets > 4 {
        return Err(fail(base_offset, DecodeErrorKind::LengthTooLong { octets }));
    }
    if data.len() < 1 + octets {
        return Err(fail(base_offset, DecodeErrorKind::TruncatedData));
    }

    let len = data[1..=octets]
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | b as usize);
    if len > MAX_LENGTH {
        return Err(fail(base_offset, DecodeErrorKind::InvalidLength));
    }
    Ok((len, 1 + octets))
}

fn fail(offset: usize, kind: DecodeErrorKind) -> Error {
    tracing::debug!(target: "snmp_mib_agent::ber", { snmp.offset = %offset, kind = %kind }, "bad length octets");
    Error::decode(offset, kind)
}
