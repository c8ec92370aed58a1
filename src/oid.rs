//! Object identifiers.
//!
//! An [`Oid`] is a sequence of `u32` arcs. Ordering is lexicographic over the
//! arcs, which is exactly the SNMP GetNext order: a prefix sorts before every
//! OID that extends it.

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::error::{DecodeErrorKind, Error, OidErrorKind, Result};

/// Maximum number of arcs accepted when decoding from the wire.
pub const MAX_OID_LEN: usize = 128;

/// Object identifier.
///
/// Most OIDs an agent sees are under 16 arcs, so they are stored inline.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid {
    arcs: SmallVec<[u32; 16]>,
}

impl Oid {
    /// The empty OID (the tree root).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(arcs: impl IntoIterator<Item = u32>) -> Self {
        Self {
            arcs: arcs.into_iter().collect(),
        }
    }

    pub fn from_slice(arcs: &[u32]) -> Self {
        Self {
            arcs: SmallVec::from_slice(arcs),
        }
    }

    /// Parse dotted notation such as `"1.3.6.1.2.1"`.
    ///
    /// A single leading dot is accepted. Every arc must be a decimal integer
    /// in `0..=u32::MAX`.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.strip_prefix('.').unwrap_or(s);
        if trimmed.is_empty() {
            return Err(Error::invalid_oid_with_input(OidErrorKind::Empty, s));
        }

        let mut arcs = SmallVec::new();
        for part in trimmed.split('.') {
            let arc = part
                .bytes()
                .all(|b| b.is_ascii_digit())
                .then(|| part.parse::<u32>().ok())
                .flatten()
                .ok_or_else(|| Error::invalid_oid_with_input(OidErrorKind::InvalidArc, s))?;
            arcs.push(arc);
        }
        Ok(Self { arcs })
    }

    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// True if `prefix` is a (non-strict) prefix of this OID.
    pub fn starts_with(&self, prefix: &Oid) -> bool {
        self.arcs.starts_with(&prefix.arcs)
    }

    /// First arc and the remainder, or `None` for the empty OID.
    pub fn split_first(&self) -> Option<(u32, Oid)> {
        let (&first, rest) = self.arcs.split_first()?;
        Some((first, Oid::from_slice(rest)))
    }

    /// Arcs after the first `n`, or an empty OID if `n` exceeds the length.
    pub fn slice_from(&self, n: usize) -> Oid {
        Oid::from_slice(self.arcs.get(n..).unwrap_or_default())
    }

    /// This OID followed by `suffix`.
    pub fn concat(&self, suffix: &[u32]) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.extend_from_slice(suffix);
        Oid { arcs }
    }

    /// This OID extended by one arc.
    pub fn child(&self, arc: u32) -> Oid {
        self.concat(&[arc])
    }

    /// BER content octets (X.690 8.19).
    ///
    /// The first two arcs share one subidentifier. OIDs shorter than two arcs
    /// are padded with zeros, matching net-snmp.
    pub fn to_ber_smallvec(&self) -> SmallVec<[u8; 64]> {
        let mut out = SmallVec::new();
        let (first, second, rest) = match self.arcs.as_slice() {
            [] => (0, 0, &[][..]),
            [a] => (*a, 0, &[][..]),
            [a, b, rest @ ..] => (*a, *b, rest),
        };
        push_subidentifier(&mut out, u64::from(first) * 40 + u64::from(second));
        for &arc in rest {
            push_subidentifier(&mut out, u64::from(arc));
        }
        out
    }

    /// Decode BER content octets.
    pub fn from_ber(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::empty());
        }

        let mut arcs: SmallVec<[u32; 16]> = SmallVec::new();
        let mut value: u64 = 0;
        let mut start = 0;
        for (i, &byte) in data.iter().enumerate() {
            if value == 0 && byte == 0x80 {
                // leading 0x80 is a non-minimal subidentifier
                return Err(Error::decode(i, DecodeErrorKind::InvalidOidEncoding));
            }
            value = (value << 7) | u64::from(byte & 0x7F);
            if value > u64::from(u32::MAX) * 40 + 39 {
                return Err(Error::decode(start, DecodeErrorKind::InvalidOidEncoding));
            }
            if byte & 0x80 != 0 {
                continue;
            }

            if arcs.is_empty() {
                let first = (value / 40).min(2);
                let second = value - first * 40;
                let second = u32::try_from(second)
                    .map_err(|_| Error::decode(start, DecodeErrorKind::InvalidOidEncoding))?;
                arcs.push(first as u32);
                arcs.push(second);
            } else {
                let arc = u32::try_from(value)
                    .map_err(|_| Error::decode(start, DecodeErrorKind::InvalidOidEncoding))?;
                arcs.push(arc);
            }
            if arcs.len() > MAX_OID_LEN {
                return Err(Error::decode(
                    start,
                    DecodeErrorKind::OidTooLong {
                        count: arcs.len(),
                        max: MAX_OID_LEN,
                    },
                ));
            }
            value = 0;
            start = i + 1;
        }

        if start != data.len() {
            // last octet still had the continuation bit set
            return Err(Error::decode(start, DecodeErrorKind::InvalidOidEncoding));
        }
        Ok(Self { arcs })
    }
}

fn push_subidentifier(out: &mut SmallVec<[u8; 64]>, value: u64) {
    let mut chunks: SmallVec<[u8; 10]> = SmallVec::new();
    let mut rest = value;
    chunks.push((rest & 0x7F) as u8);
    rest >>= 7;
    while rest > 0 {
        chunks.push(0x80 | (rest & 0x7F) as u8);
        rest >>= 7;
    }
    out.extend(chunks.into_iter().rev());
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.arcs.iter();
        if let Some(first) = iter.next() {
            write!(f, "{}", first)?;
            for arc in iter {
                write!(f, ".{}", arc)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self)
    }
}

impl FromStr for Oid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<&[u32]> for Oid {
    fn from(arcs: &[u32]) -> Self {
        Self::from_slice(arcs)
    }
}

impl<const N: usize> From<[u32; N]> for Oid {
    fn from(arcs: [u32; N]) -> Self {
        Self::from_slice(&arcs)
    }
}

impl From<Vec<u32>> for Oid {
    fn from(arcs: Vec<u32>) -> Self {
        Self {
            arcs: SmallVec::from_vec(arcs),
        }
    }
}

impl AsRef<[u32]> for Oid {
    fn as_ref(&self) -> &[u32] {
        &self.arcs
    }
}

/// Build an [`Oid`] from literal arcs.
///
/// ```
/// use snmp_mib_agent::oid;
///
/// let sys_descr = oid!(1, 3, 6, 1, 2, 1, 1, 1);
/// assert_eq!(sys_descr.to_string(), "1.3.6.1.2.1.1.1");
/// ```
#[macro_export]
macro_rules! oid {
    () => {
        $crate::oid::Oid::empty()
    };
    ($($arc:expr),+ $(,)?) => {
        $crate::oid::Oid::from_slice(&[$($arc),+])
    };
}
