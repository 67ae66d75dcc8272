// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host Protocol Address Information (spec §3, §4.1): 8 bytes, always
//! `length=8, protocol=UDP`.

use std::net::{Ipv4Addr, SocketAddrV4};

use zerocopy::{BigEndian, FromBytes, Immutable, IntoBytes, KnownLayout, U16};

use crate::error::ScanError;

pub const HPAI_LEN: usize = 8;
const HOST_PROTOCOL_UDP: u8 = 0x01;

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
struct RawHpai {
    structure_length: u8,
    host_protocol_code: u8,
    ip_address: [u8; 4],
    port: U16<BigEndian>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hpai {
    pub addr: SocketAddrV4,
}

impl Hpai {
    pub fn new(addr: SocketAddrV4) -> Self {
        Self { addr }
    }

    pub fn parse(bytes: &[u8]) -> Result<(Self, &[u8]), ScanError> {
        if bytes.len() < HPAI_LEN {
            return Err(ScanError::decode(0, "truncated HPAI"));
        }
        let raw = RawHpai::ref_from_bytes(&bytes[..HPAI_LEN])
            .map_err(|_| ScanError::decode(0, "HPAI alignment error"))?;
        if raw.structure_length != HPAI_LEN as u8 {
            return Err(ScanError::decode(0, format!("HPAI length must be 8, got {}", raw.structure_length)));
        }
        if raw.host_protocol_code != HOST_PROTOCOL_UDP {
            return Err(ScanError::decode(1, format!("unsupported HPAI protocol 0x{:02x}", raw.host_protocol_code)));
        }
        let ip = Ipv4Addr::from(raw.ip_address);
        let addr = SocketAddrV4::new(ip, raw.port.get());
        Ok((Self { addr }, &bytes[HPAI_LEN..]))
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        let raw = RawHpai {
            structure_length: HPAI_LEN as u8,
            host_protocol_code: HOST_PROTOCOL_UDP,
            ip_address: self.addr.ip().octets(),
            port: U16::new(self.addr.port()),
        };
        out.extend_from_slice(raw.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hpai_roundtrip() {
        let hpai = Hpai::new(SocketAddrV4::new(Ipv4Addr::new(192, 0, 2, 10), 3671));
        let mut buf = Vec::new();
        hpai.encode(&mut buf);
        assert_eq!(buf.len(), HPAI_LEN);
        let (parsed, rest) = Hpai::parse(&buf).expect("parse");
        assert_eq!(parsed, hpai);
        assert!(rest.is_empty());
    }

    #[test]
    fn rejects_non_udp_protocol() {
        let mut buf = vec![8, 0x02, 192, 0, 2, 10, 0x0E, 0x57];
        assert!(Hpai::parse(&mut buf).is_err());
    }
}
