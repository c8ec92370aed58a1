//! Community-based SNMP messages (v1/v2c).
//!
//! `SEQUENCE { version INTEGER, community OCTET STRING, pdu PDU }`

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::pdu::Pdu;
use crate::version::Version;

/// An SNMPv1 or SNMPv2c message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityMessage {
    pub version: Version,
    /// Community string, compared byte-for-byte against the agent's policy.
    pub community: Bytes,
    pub pdu: Pdu,
}

impl CommunityMessage {
    pub fn new(version: Version, community: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self {
            version,
            community: community.into(),
            pdu,
        }
    }

    /// A message with the same version and community carrying `pdu`.
    pub fn reply(&self, pdu: Pdu) -> Self {
        Self {
            version: self.version,
            community: self.community.clone(),
            pdu,
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            self.pdu.encode(buf);
            buf.push_octet_string(&self.community);
            buf.push_integer(self.version.as_i32());
        });
        buf.finish()
    }

    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;

        let version_offset = seq.offset();
        let raw = seq.read_integer()?;
        let version = Version::from_i32(raw).ok_or_else(|| {
            tracing::debug!(target: "snmp_mib_agent::ber", { snmp.offset = version_offset, kind = %DecodeErrorKind::UnknownVersion(raw) }, "decode error");
            Error::decode(version_offset, DecodeErrorKind::UnknownVersion(raw))
        })?;

        let community = seq.read_octet_string()?;
        let pdu = Pdu::decode(&mut seq)?;
        Ok(Self {
            version,
            community,
            pdu,
        })
    }
}
