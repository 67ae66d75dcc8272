// SPDX-License-Identifier: MIT OR Apache-2.0

//! The fixed 6-byte KNXnet/IP header shared by every service (spec §4.1).

use zerocopy::{BigEndian, FromBytes, Immutable, IntoBytes, KnownLayout, U16};

use crate::error::ScanError;

pub const HEADER_LEN: usize = 6;
pub const PROTOCOL_VERSION: u8 = 0x10;
pub const HEADER_LENGTH_FIELD: u8 = 0x06;

/// KNXnet/IP service identifiers recognized by this crate (spec §4.1).
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceId {
    SearchRequest = 0x0201,
    SearchResponse = 0x0202,
    DescriptionRequest = 0x0203,
    DescriptionResponse = 0x0204,
    ConnectRequest = 0x0205,
    ConnectResponse = 0x0206,
    ConnectionStateRequest = 0x0207,
    ConnectionStateResponse = 0x0208,
    DisconnectRequest = 0x0209,
    DisconnectResponse = 0x020A,
    TunnellingRequest = 0x0420,
    TunnellingAck = 0x0421,
    RoutingIndication = 0x0530,
    RoutingLostMessage = 0x0531,
}

impl ServiceId {
    pub fn from_u16(v: u16) -> Option<Self> {
        Some(match v {
            0x0201 => Self::SearchRequest,
            0x0202 => Self::SearchResponse,
            0x0203 => Self::DescriptionRequest,
            0x0204 => Self::DescriptionResponse,
            0x0205 => Self::ConnectRequest,
            0x0206 => Self::ConnectResponse,
            0x0207 => Self::ConnectionStateRequest,
            0x0208 => Self::ConnectionStateResponse,
            0x0209 => Self::DisconnectRequest,
            0x020A => Self::DisconnectResponse,
            0x0420 => Self::TunnellingRequest,
            0x0421 => Self::TunnellingAck,
            0x0530 => Self::RoutingIndication,
            0x0531 => Self::RoutingLostMessage,
            _ => return None,
        })
    }
}

/// Wire-layout of the 6-byte KNXnet/IP header.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct RawHeader {
    pub header_length: u8,
    pub protocol_version: u8,
    pub service_type: U16<BigEndian>,
    pub total_length: U16<BigEndian>,
}

/// Parsed, validated header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub service: ServiceId,
    pub total_length: u16,
}

impl Header {
    pub fn parse(bytes: &[u8]) -> Result<(Self, &[u8]), ScanError> {
        if bytes.len() < HEADER_LEN {
            return Err(ScanError::decode(0, "frame shorter than header"));
        }
        let raw = RawHeader::ref_from_bytes(&bytes[..HEADER_LEN])
            .map_err(|_| ScanError::decode(0, "header alignment error"))?;
        if raw.header_length != HEADER_LENGTH_FIELD {
            return Err(ScanError::decode(0, format!("bad header length byte {}", raw.header_length)));
        }
        if raw.protocol_version != PROTOCOL_VERSION {
            return Err(ScanError::decode(
                1,
                format!("unsupported protocol version 0x{:02x}", raw.protocol_version),
            ));
        }
        let service = ServiceId::from_u16(raw.service_type.get())
            .ok_or_else(|| ScanError::decode(2, format!("unknown service id 0x{:04x}", raw.service_type.get())))?;
        let total_length = raw.total_length.get();
        if (total_length as usize) != bytes.len() {
            return Err(ScanError::decode(
                4,
                format!("declared total length {total_length} does not match datagram size {}", bytes.len()),
            ));
        }
        Ok((Header { service, total_length }, &bytes[HEADER_LEN..]))
    }

    /// Writes the 6-byte header for a body of `body_len` bytes, returning
    /// the total frame length.
    pub fn encode(service: ServiceId, body_len: usize, out: &mut Vec<u8>) -> u16 {
        let total = (HEADER_LEN + body_len) as u16;
        let raw = RawHeader {
            header_length: HEADER_LENGTH_FIELD,
            protocol_version: PROTOCOL_VERSION,
            service_type: U16::new(service as u16),
            total_length: U16::new(total),
        };
        out.extend_from_slice(raw.as_bytes());
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let mut buf = Vec::new();
        Header::encode(ServiceId::SearchRequest, 8, &mut buf);
        buf.extend_from_slice(&[0u8; 8]);
        let (hdr, rest) = Header::parse(&buf).expect("parse");
        assert_eq!(hdr.service, ServiceId::SearchRequest);
        assert_eq!(hdr.total_length, 14);
        assert_eq!(rest.len(), 8);
    }

    #[test]
    fn rejects_bad_length_field() {
        let mut buf = vec![0x05, PROTOCOL_VERSION, 0x02, 0x01, 0x00, 0x06];
        buf[0] = 0x05;
        assert!(Header::parse(&buf).is_err());
    }

    #[test]
    fn rejects_mismatched_total_length() {
        let mut buf = Vec::new();
        Header::encode(ServiceId::SearchRequest, 8, &mut buf);
        // Omit the body: declared length says 14 bytes, actual is 6.
        assert!(Header::parse(&buf).is_err());
    }
}
