//! BER encoding into a reverse buffer.
//!
//! Content is written back to front: a constructed value pushes its children
//! in reverse order, then prepends its own length and tag. [`EncodeBuf::finish`]
//! flips the buffer once at the end.

use bytes::Bytes;

use super::length::encode_length;
use super::tag;
use crate::oid::Oid;

/// Reverse-order BER writer.
pub struct EncodeBuf {
    buf: Vec<u8>,
}

impl EncodeBuf {
    /// Create a buffer sized for a typical agent response.
    pub fn new() -> Self {
        Self::with_capacity(512)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Prepend bytes given in forward order.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend(bytes.iter().rev());
    }

    pub fn push_tag(&mut self, tag: u8) {
        self.buf.push(tag);
    }

    pub fn push_length(&mut self, len: usize) {
        let (octets, n) = encode_length(len);
        self.buf.extend_from_slice(&octets[..n]);
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Prepend a primitive TLV.
    fn push_primitive(&mut self, tag: u8, content: &[u8]) {
        self.push_bytes(content);
        self.push_length(content.len());
        self.push_tag(tag);
    }

    /// Wrap whatever `f` writes in a constructed TLV.
    pub fn push_constructed<F>(&mut self, tag: u8, f: F)
    where
        F: FnOnce(&mut Self),
    {
        let mark = self.len();
        f(self);
        let content = self.len() - mark;
        self.push_length(content);
        self.push_tag(tag);
    }

    pub fn push_sequence<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Self),
    {
        self.push_constructed(tag::universal::SEQUENCE, f);
    }

    pub fn push_integer(&mut self, value: i32) {
        let bytes = value.to_be_bytes();
        self.push_primitive(tag::universal::INTEGER, minimal_signed(&bytes));
    }

    /// Unsigned 32-bit value under an application tag (Counter32, Gauge32, TimeTicks).
    pub fn push_unsigned32(&mut self, tag: u8, value: u32) {
        let (arr, start) = unsigned_content(&value.to_be_bytes());
        self.push_primitive(tag, &arr[start..]);
    }

    pub fn push_counter64(&mut self, value: u64) {
        let (arr, start) = unsigned_content(&value.to_be_bytes());
        self.push_primitive(tag::application::COUNTER64, &arr[start..]);
    }

    pub fn push_octet_string(&mut self, data: &[u8]) {
        self.push_primitive(tag::universal::OCTET_STRING, data);
    }

    pub fn push_opaque(&mut self, data: &[u8]) {
        self.push_primitive(tag::application::OPAQUE, data);
    }

    pub fn push_null(&mut self) {
        self.push_primitive(tag::universal::NULL, &[]);
    }

    /// Zero-length primitive under an arbitrary tag (SNMPv2 exceptions).
    pub fn push_empty(&mut self, tag: u8) {
        self.push_primitive(tag, &[]);
    }

    pub fn push_oid(&mut self, oid: &Oid) {
        let ber = oid.to_ber_smallvec();
        self.push_primitive(tag::universal::OBJECT_IDENTIFIER, &ber);
    }

    pub fn push_ip_address(&mut self, addr: [u8; 4]) {
        self.push_primitive(tag::application::IP_ADDRESS, &addr);
    }

    /// Flip the buffer into wire order.
    pub fn finish(mut self) -> Bytes {
        self.buf.reverse();
        Bytes::from(self.buf)
    }
}

impl Default for EncodeBuf {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip redundant sign octets from a big-endian two's complement value.
fn minimal_signed(bytes: &[u8]) -> &[u8] {
    let mut start = 0;
    while start + 1 < bytes.len() {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    &bytes[start..]
}

/// Minimal content octets for an unsigned value, with a leading zero when
/// the high bit would otherwise read as a sign.
///
/// Returns a scratch array one octet wider than the input and the index of
/// the first valid octet.
fn unsigned_content(bytes: &[u8]) -> ([u8; 9], usize) {
    let mut arr = [0u8; 9];
    let offset = arr.len() - bytes.len();
    arr[offset..].copy_from_slice(bytes);

    let mut start = offset;
    while start + 1 < arr.len() && arr[start] == 0 {
        start += 1;
    }
    if arr[start] & 0x80 != 0 {
        start -= 1;
    }
    (arr, start)
}
