// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection Request/Response Information (spec §3).

use zerocopy::{BigEndian, FromBytes, Immutable, IntoBytes, KnownLayout, U16};

use crate::{address::IndividualAddress, error::ScanError};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    DeviceMgmt = 0x03,
    Tunnel = 0x04,
    Remlog = 0x06,
    Remconf = 0x07,
    Objsvr = 0x08,
}

impl ConnectionType {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0x03 => Self::DeviceMgmt,
            0x04 => Self::Tunnel,
            0x06 => Self::Remlog,
            0x07 => Self::Remconf,
            0x08 => Self::Objsvr,
            _ => return None,
        })
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelLayer {
    LinkLayer = 0x02,
    Raw = 0x04,
    BusMonitor = 0x80,
}

impl TunnelLayer {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0x02 => Self::LinkLayer,
            0x04 => Self::Raw,
            0x80 => Self::BusMonitor,
            _ => return None,
        })
    }
}

/// Connection Request Information. Only the `Tunnel` variant carries a
/// layer byte; other connection types are request-only placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cri {
    Tunnel(TunnelLayer),
    Other(ConnectionType),
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
struct RawCriTunnel {
    structure_length: u8,
    connection_type: u8,
    knx_layer: u8,
    reserved: u8,
}

impl Cri {
    pub fn parse(bytes: &[u8]) -> Result<(Self, &[u8]), ScanError> {
        if bytes.len() < 2 {
            return Err(ScanError::decode(0, "truncated CRI"));
        }
        let len = bytes[0] as usize;
        if bytes.len() < len || len < 2 {
            return Err(ScanError::decode(0, "CRI length out of range"));
        }
        let connection_type = ConnectionType::from_u8(bytes[1])
            .ok_or_else(|| ScanError::decode(1, format!("unknown connection type 0x{:02x}", bytes[1])))?;
        let cri = match connection_type {
            ConnectionType::Tunnel => {
                if len < 4 {
                    return Err(ScanError::decode(0, "tunnel CRI shorter than 4 bytes"));
                }
                let layer = TunnelLayer::from_u8(bytes[2])
                    .ok_or_else(|| ScanError::decode(2, format!("unknown tunnel layer 0x{:02x}", bytes[2])))?;
                Cri::Tunnel(layer)
            },
            other => Cri::Other(other),
        };
        Ok((cri, &bytes[len..]))
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Cri::Tunnel(layer) => {
                let raw = RawCriTunnel {
                    structure_length: 4,
                    connection_type: ConnectionType::Tunnel as u8,
                    knx_layer: *layer as u8,
                    reserved: 0,
                };
                out.extend_from_slice(raw.as_bytes());
            },
            Cri::Other(ct) => {
                out.push(2);
                out.push(*ct as u8);
            },
        }
    }
}

/// Connection Response Data. For tunnelling connections this carries the
/// KNX individual address assigned to the tunnel by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crd {
    Tunnel(IndividualAddress),
    Other(ConnectionType),
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
struct RawCrdTunnel {
    structure_length: u8,
    connection_type: u8,
    knx_address: U16<BigEndian>,
}

impl Crd {
    pub fn parse(bytes: &[u8]) -> Result<(Self, &[u8]), ScanError> {
        if bytes.len() < 2 {
            return Err(ScanError::decode(0, "truncated CRD"));
        }
        let len = bytes[0] as usize;
        if bytes.len() < len || len < 2 {
            return Err(ScanError::decode(0, "CRD length out of range"));
        }
        let connection_type = ConnectionType::from_u8(bytes[1])
            .ok_or_else(|| ScanError::decode(1, format!("unknown connection type 0x{:02x}", bytes[1])))?;
        let crd = match connection_type {
            ConnectionType::Tunnel => {
                if len < 4 {
                    return Err(ScanError::decode(0, "tunnel CRD shorter than 4 bytes"));
                }
                let raw = RawCrdTunnel::ref_from_bytes(&bytes[..4])
                    .map_err(|_| ScanError::decode(0, "CRD alignment error"))?;
                Crd::Tunnel(IndividualAddress::from_raw(raw.knx_address.get()))
            },
            other => Crd::Other(other),
        };
        Ok((crd, &bytes[len..]))
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Crd::Tunnel(ia) => {
                let raw = RawCrdTunnel {
                    structure_length: 4,
                    connection_type: ConnectionType::Tunnel as u8,
                    knx_address: U16::new(ia.raw()),
                };
                out.extend_from_slice(raw.as_bytes());
            },
            Crd::Other(ct) => {
                out.push(2);
                out.push(*ct as u8);
            },
        }
    }
}
