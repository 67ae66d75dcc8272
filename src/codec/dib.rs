// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device Information Blocks carried in DESCRIPTION_RESPONSE /
//! SEARCH_RESPONSE bodies (spec §4.1).

use std::net::Ipv4Addr;

use zerocopy::{BigEndian, FromBytes, Immutable, IntoBytes, KnownLayout, U16};

use crate::{address::IndividualAddress, error::ScanError};

const DIB_DEVICE_INFO: u8 = 0x01;
const DIB_SUPP_SVC_FAMILIES: u8 = 0x02;
const DIB_IP_CONFIG: u8 = 0x03;
const DIB_IP_CUR_CONFIG: u8 = 0x04;
const DIB_KNX_ADDRESSES: u8 = 0x05;
const DIB_MFR_DATA: u8 = 0xFE;

const DEVICE_INFO_LEN: usize = 54;
const FRIENDLY_NAME_LEN: usize = 30;

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
struct RawDeviceInfo {
    structure_length: u8,
    description_type_code: u8,
    knx_medium: u8,
    device_status: u8,
    knx_individual_address: U16<BigEndian>,
    project_installation_identifier: U16<BigEndian>,
    device_serial: [u8; 6],
    device_multicast_address: [u8; 4],
    device_mac_address: [u8; 6],
    device_friendly_name: [u8; FRIENDLY_NAME_LEN],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub knx_medium: u8,
    pub device_status: u8,
    pub individual_address: IndividualAddress,
    pub project_installation_identifier: u16,
    pub device_serial: [u8; 6],
    pub multicast_address: Ipv4Addr,
    pub mac_address: [u8; 6],
    pub friendly_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppSvcFamily {
    pub family_id: u8,
    pub version: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpConfig {
    pub ip_address: Ipv4Addr,
    pub subnet_mask: Ipv4Addr,
    pub default_gateway: Ipv4Addr,
    pub capabilities: u8,
    pub assignment_method: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpCurConfig {
    pub current_ip: Ipv4Addr,
    pub current_subnet: Ipv4Addr,
    pub current_gateway: Ipv4Addr,
    pub dhcp_server: Ipv4Addr,
    pub assignment_method: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfrData {
    pub manufacturer_id: u16,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dib {
    DeviceInfo(DeviceInfo),
    SuppSvcFamilies(Vec<SuppSvcFamily>),
    IpConfig(IpConfig),
    IpCurConfig(IpCurConfig),
    KnxAddresses(Vec<IndividualAddress>),
    MfrData(MfrData),
    /// Any DIB type this crate does not interpret; preserved byte-for-byte.
    Unknown { type_code: u8, data: Vec<u8> },
}

impl Dib {
    /// Parses every DIB in a DESCRIPTION/SEARCH response body until the
    /// slice is exhausted.
    pub fn parse_all(mut bytes: &[u8]) -> Result<Vec<Dib>, ScanError> {
        let mut out = Vec::new();
        while !bytes.is_empty() {
            let (dib, rest) = Dib::parse_one(bytes)?;
            out.push(dib);
            bytes = rest;
        }
        Ok(out)
    }

    fn parse_one(bytes: &[u8]) -> Result<(Dib, &[u8]), ScanError> {
        if bytes.len() < 2 {
            return Err(ScanError::decode(0, "truncated DIB header"));
        }
        let len = bytes[0] as usize;
        if len < 2 || bytes.len() < len {
            return Err(ScanError::decode(0, "DIB length out of range"));
        }
        let type_code = bytes[1];
        let body = &bytes[..len];
        let rest = &bytes[len..];

        let dib = match type_code {
            DIB_DEVICE_INFO => Dib::DeviceInfo(Self::parse_device_info(body)?),
            DIB_SUPP_SVC_FAMILIES => Dib::SuppSvcFamilies(Self::parse_svc_families(body)),
            DIB_IP_CONFIG => Dib::IpConfig(Self::parse_ip_config(body)?),
            DIB_IP_CUR_CONFIG => Dib::IpCurConfig(Self::parse_ip_cur_config(body)?),
            DIB_KNX_ADDRESSES => Dib::KnxAddresses(Self::parse_knx_addresses(body)),
            DIB_MFR_DATA => Dib::MfrData(Self::parse_mfr_data(body)?),
            other => Dib::Unknown { type_code: other, data: body.to_vec() },
        };
        Ok((dib, rest))
    }

    fn parse_device_info(body: &[u8]) -> Result<DeviceInfo, ScanError> {
        if body.len() != DEVICE_INFO_LEN {
            return Err(ScanError::decode(0, format!("DEVICE_INFO DIB must be {DEVICE_INFO_LEN} bytes, got {}", body.len())));
        }
        let raw = RawDeviceInfo::ref_from_bytes(body)
            .map_err(|_| ScanError::decode(0, "DEVICE_INFO alignment error"))?;
        let name_end = raw.device_friendly_name.iter().position(|&b| b == 0).unwrap_or(FRIENDLY_NAME_LEN);
        let friendly_name = String::from_utf8_lossy(&raw.device_friendly_name[..name_end]).into_owned();
        Ok(DeviceInfo {
            knx_medium: raw.knx_medium,
            device_status: raw.device_status,
            individual_address: IndividualAddress::from_raw(raw.knx_individual_address.get()),
            project_installation_identifier: raw.project_installation_identifier.get(),
            device_serial: raw.device_serial,
            multicast_address: Ipv4Addr::from(raw.device_multicast_address),
            mac_address: raw.device_mac_address,
            friendly_name,
        })
    }

    fn parse_svc_families(body: &[u8]) -> Vec<SuppSvcFamily> {
        body[2..]
            .chunks_exact(2)
            .map(|c| SuppSvcFamily { family_id: c[0], version: c[1] })
            .collect()
    }

    fn parse_ip_config(body: &[u8]) -> Result<IpConfig, ScanError> {
        if body.len() < 16 {
            return Err(ScanError::decode(0, "IP_CONFIG DIB shorter than 16 bytes"));
        }
        let ip = |off: usize| Ipv4Addr::new(body[off], body[off + 1], body[off + 2], body[off + 3]);
        Ok(IpConfig {
            ip_address: ip(2),
            subnet_mask: ip(6),
            default_gateway: ip(10),
            capabilities: body[14],
            assignment_method: body[15],
        })
    }

    fn parse_ip_cur_config(body: &[u8]) -> Result<IpCurConfig, ScanError> {
        if body.len() < 20 {
            return Err(ScanError::decode(0, "IP_CUR_CONFIG DIB shorter than 20 bytes"));
        }
        let ip = |off: usize| Ipv4Addr::new(body[off], body[off + 1], body[off + 2], body[off + 3]);
        Ok(IpCurConfig {
            current_ip: ip(2),
            current_subnet: ip(6),
            current_gateway: ip(10),
            dhcp_server: ip(14),
            assignment_method: body[18],
        })
    }

    fn parse_knx_addresses(body: &[u8]) -> Vec<IndividualAddress> {
        body[2..]
            .chunks_exact(2)
            .map(|c| IndividualAddress::from_raw(u16::from_be_bytes([c[0], c[1]])))
            .collect()
    }

    fn parse_mfr_data(body: &[u8]) -> Result<MfrData, ScanError> {
        if body.len() < 4 {
            return Err(ScanError::decode(0, "MFR_DATA DIB shorter than 4 bytes"));
        }
        Ok(MfrData {
            manufacturer_id: u16::from_be_bytes([body[2], body[3]]),
            data: body[4..].to_vec(),
        })
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Dib::DeviceInfo(info) => {
                let mut name = [0u8; FRIENDLY_NAME_LEN];
                let bytes = info.friendly_name.as_bytes();
                let n = bytes.len().min(FRIENDLY_NAME_LEN);
                name[..n].copy_from_slice(&bytes[..n]);
                let raw = RawDeviceInfo {
                    structure_length: DEVICE_INFO_LEN as u8,
                    description_type_code: DIB_DEVICE_INFO,
                    knx_medium: info.knx_medium,
                    device_status: info.device_status,
                    knx_individual_address: U16::new(info.individual_address.raw()),
                    project_installation_identifier: U16::new(info.project_installation_identifier),
                    device_serial: info.device_serial,
                    device_multicast_address: info.multicast_address.octets(),
                    device_mac_address: info.mac_address,
                    device_friendly_name: name,
                };
                out.extend_from_slice(raw.as_bytes());
            },
            Dib::SuppSvcFamilies(families) => {
                let len = 2 + families.len() * 2;
                out.push(len as u8);
                out.push(DIB_SUPP_SVC_FAMILIES);
                for f in families {
                    out.push(f.family_id);
                    out.push(f.version);
                }
            },
            Dib::IpConfig(cfg) => {
                out.push(16);
                out.push(DIB_IP_CONFIG);
                out.extend_from_slice(&cfg.ip_address.octets());
                out.extend_from_slice(&cfg.subnet_mask.octets());
                out.extend_from_slice(&cfg.default_gateway.octets());
                out.push(cfg.capabilities);
                out.push(cfg.assignment_method);
            },
            Dib::IpCurConfig(cfg) => {
                out.push(20);
                out.push(DIB_IP_CUR_CONFIG);
                out.extend_from_slice(&cfg.current_ip.octets());
                out.extend_from_slice(&cfg.current_subnet.octets());
                out.extend_from_slice(&cfg.current_gateway.octets());
                out.extend_from_slice(&cfg.dhcp_server.octets());
                out.push(cfg.assignment_method);
                out.push(0);
            },
            Dib::KnxAddresses(addrs) => {
                let len = 2 + addrs.len() * 2;
                out.push(len as u8);
                out.push(DIB_KNX_ADDRESSES);
                for a in addrs {
                    out.extend_from_slice(&a.raw().to_be_bytes());
                }
            },
            Dib::MfrData(mfr) => {
                let len = 4 + mfr.data.len();
                out.push(len as u8);
                out.push(DIB_MFR_DATA);
                out.extend_from_slice(&mfr.manufacturer_id.to_be_bytes());
                out.extend_from_slice(&mfr.data);
            },
            Dib::Unknown { data, .. } => {
                out.extend_from_slice(data);
            },
        }
    }
}
