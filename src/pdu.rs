//! Protocol data units.
//!
//! Every PDU the agent can receive shares the RFC 3416 layout
//! `request-id, error-status, error-index, variable-bindings`. GetBulk reuses
//! the two error fields for its repetition counts; the agent never serves it,
//! so no separate type exists. The SNMPv1 Trap PDU has a different layout
//! and is rejected at decode time.

use std::fmt;

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, ErrorStatus, Result};
use crate::oid::Oid;
use crate::varbind::{VarBind, decode_varbind_list, encode_varbind_list};

/// PDU type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PduType {
    GetRequest = tag::pdu::GET_REQUEST,
    GetNextRequest = tag::pdu::GET_NEXT_REQUEST,
    Response = tag::pdu::RESPONSE,
    SetRequest = tag::pdu::SET_REQUEST,
    GetBulkRequest = tag::pdu::GET_BULK_REQUEST,
    InformRequest = tag::pdu::INFORM_REQUEST,
    TrapV2 = tag::pdu::TRAP_V2,
    Report = tag::pdu::REPORT,
}

impl PduType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            tag::pdu::GET_REQUEST => Some(Self::GetRequest),
            tag::pdu::GET_NEXT_REQUEST => Some(Self::GetNextRequest),
            tag::pdu::RESPONSE => Some(Self::Response),
            tag::pdu::SET_REQUEST => Some(Self::SetRequest),
            tag::pdu::GET_BULK_REQUEST => Some(Self::GetBulkRequest),
            tag::pdu::INFORM_REQUEST => Some(Self::InformRequest),
            tag::pdu::TRAP_V2 => Some(Self::TrapV2),
            tag::pdu::REPORT => Some(Self::Report),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for PduType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GetRequest => "GetRequest",
            Self::GetNextRequest => "GetNextRequest",
            Self::Response => "Response",
            Self::SetRequest => "SetRequest",
            Self::GetBulkRequest => "GetBulkRequest",
            Self::InformRequest => "InformRequest",
            Self::TrapV2 => "TrapV2",
            Self::Report => "Report",
        };
        f.write_str(name)
    }
}

/// A request or response PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    pub pdu_type: PduType,
    pub request_id: i32,
    /// Raw error status (see [`ErrorStatus`]).
    pub error_status: i32,
    /// 1-based index of the varbind that caused `error_status`, 0 if none.
    pub error_index: i32,
    pub varbinds: Vec<VarBind>,
}

impl Pdu {
    fn request(pdu_type: PduType, request_id: i32, oids: &[Oid]) -> Self {
        Self {
            pdu_type,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds: oids.iter().cloned().map(VarBind::null).collect(),
        }
    }

    pub fn get_request(request_id: i32, oids: &[Oid]) -> Self {
        Self::request(PduType::GetRequest, request_id, oids)
    }

    pub fn get_next_request(request_id: i32, oids: &[Oid]) -> Self {
        Self::request(PduType::GetNextRequest, request_id, oids)
    }

    /// An empty Response answering this PDU.
    ///
    /// Keeps the request ID; varbinds are filled in by the responder.
    pub fn to_response(&self) -> Self {
        Self {
            pdu_type: PduType::Response,
            request_id: self.request_id,
            error_status: 0,
            error_index: 0,
            varbinds: Vec::with_capacity(self.varbinds.len()),
        }
    }

    pub fn error_status(&self) -> ErrorStatus {
        ErrorStatus::from_i32(self.error_status)
    }

    pub fn is_error(&self) -> bool {
        self.error_status != 0
    }

    /// Record an error, keeping the first one if several varbinds fail.
    pub fn set_error(&mut self, status: ErrorStatus, index: usize) {
        if self.error_status == 0 {
            self.error_status = status.as_i32();
            self.error_index = i32::try_from(index).unwrap_or(i32::MAX);
        }
    }

    pub(crate) fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(self.pdu_type.tag(), |buf| {
            encode_varbind_list(buf, &self.varbinds);
            buf.push_integer(self.error_index);
            buf.push_integer(self.error_status);
            buf.push_integer(self.request_id);
        });
    }

    pub(crate) fn decode(decoder: &mut Decoder) -> Result<Self> {
        let start = decoder.offset();
        let raw = decoder.read_tag()?;
        let pdu_type = PduType::from_tag(raw)
            .ok_or_else(|| Error::decode(start, DecodeErrorKind::UnknownPduType(raw)))?;
        let len = decoder.read_length()?;
        let mut body = decoder.sub_decoder(len)?;

        let request_id = body.read_integer()?;
        let error_status = body.read_integer()?;
        let error_index = body.read_integer()?;
        let varbinds = decode_varbind_list(&mut body)?;

        Ok(Self {
            pdu_type,
            request_id,
            error_status,
            error_index,
            varbinds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::value::Value;

    fn wire(pdu: &Pdu) -> Decoder {
        let mut buf = EncodeBuf::new();
        pdu.encode(&mut buf);
        Decoder::new(buf.finish())
    }

    #[test]
    fn test_request_carries_null_placeholders() {
        let pdu = Pdu::get_next_request(17, &[oid!(1, 3, 6), oid!(1, 4)]);
        assert_eq!(pdu.pdu_type, PduType::GetNextRequest);
        assert!(pdu.varbinds.iter().all(|vb| vb.value == Value::Null));
        assert_eq!(Pdu::decode(&mut wire(&pdu)).unwrap(), pdu);
    }

    #[test]
    fn test_to_response_keeps_request_id_only() {
        let pdu = Pdu::get_request(99, &[oid!(1, 2)]);
        let resp = pdu.to_response();
        assert_eq!(resp.pdu_type, PduType::Response);
        assert_eq!(resp.request_id, 99);
        assert!(resp.varbinds.is_empty());
        assert!(!resp.is_error());
    }

    #[test]
    fn test_first_error_wins() {
        let mut resp = Pdu::get_request(1, &[]).to_response();
        resp.set_error(ErrorStatus::NoSuchName, 2);
        resp.set_error(ErrorStatus::GenErr, 3);
        assert_eq!(resp.error_status(), ErrorStatus::NoSuchName);
        assert_eq!(resp.error_index, 2);
    }

    #[test]
    fn test_trap_v1_tag_rejected() {
        let mut dec = Decoder::from_slice(&[0xA4, 0x00]);
        assert!(matches!(
            Pdu::decode(&mut dec).unwrap_err(),
            Error::Decode {
                kind: DecodeErrorKind::UnknownPduType(0xA4),
                ..
            }
        ));
    }
}
