// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application-Layer Protocol Control Information (spec §3, §4.5).
//!
//! The 10-bit APCI service code is split across the TPCI octet (high 2
//! bits) and the following octet (low 8 bits); any service-specific data
//! that does not fit in the leftover bits of that octet follows as plain
//! bytes. This crate always emits service-specific fields as explicit
//! trailing bytes rather than packing short values into spare bits —
//! smaller on the wire than real devices expect, but round-trips exactly
//! and keeps every field independently inspectable (see DESIGN.md).

use crate::error::ScanError;

macro_rules! apci_codes {
    ($($name:ident = $val:expr),* $(,)?) => {
        $(pub const $name: u16 = $val;)*
    };
}

apci_codes! {
    GROUP_VALUE_READ = 0x000,
    GROUP_VALUE_RESPONSE = 0x040,
    GROUP_VALUE_WRITE = 0x080,
    ADC_READ = 0x180,
    ADC_RESPONSE = 0x1C0,
    MEMORY_READ = 0x200,
    MEMORY_RESPONSE = 0x240,
    MEMORY_WRITE = 0x280,
    DEVICE_DESCRIPTOR_READ = 0x300,
    DEVICE_DESCRIPTOR_RESPONSE = 0x340,
    RESTART = 0x380,
    AUTHORIZE_REQUEST = 0x3D1,
    AUTHORIZE_RESPONSE = 0x3D2,
    KEY_WRITE = 0x3D3,
    KEY_RESPONSE = 0x3D4,
    PROPERTY_VALUE_READ = 0x3D5,
    PROPERTY_VALUE_RESPONSE = 0x3D6,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Apci {
    GroupValueRead,
    GroupValueResponse { data: Vec<u8> },
    GroupValueWrite { data: Vec<u8> },
    AdcRead { channel: u8, count: u8 },
    AdcResponse { channel: u8, count: u8, value: u16 },
    MemoryRead { count: u8, address: u16 },
    MemoryResponse { count: u8, address: u16, data: Vec<u8> },
    MemoryWrite { count: u8, address: u16, data: Vec<u8> },
    DeviceDescriptorRead { descriptor_type: u8 },
    DeviceDescriptorResponse { descriptor_type: u8, data: Vec<u8> },
    Restart,
    AuthorizeRequest { key: u32 },
    AuthorizeResponse { level: u8 },
    KeyWrite { level: u8, key: u32 },
    KeyResponse { level: u8 },
    PropertyValueRead { object_index: u8, property_id: u8, count: u8, start_index: u16 },
    PropertyValueResponse { object_index: u8, property_id: u8, count: u8, start_index: u16, data: Vec<u8> },
    /// Any service code this crate does not interpret; preserved opaquely.
    Unknown { code: u16, data: Vec<u8> },
}

impl Apci {
    pub fn code(&self) -> u16 {
        match self {
            Apci::GroupValueRead => GROUP_VALUE_READ,
            Apci::GroupValueResponse { .. } => GROUP_VALUE_RESPONSE,
            Apci::GroupValueWrite { .. } => GROUP_VALUE_WRITE,
            Apci::AdcRead { .. } => ADC_READ,
            Apci::AdcResponse { .. } => ADC_RESPONSE,
            Apci::MemoryRead { .. } => MEMORY_READ,
            Apci::MemoryResponse { .. } => MEMORY_RESPONSE,
            Apci::MemoryWrite { .. } => MEMORY_WRITE,
            Apci::DeviceDescriptorRead { .. } => DEVICE_DESCRIPTOR_READ,
            Apci::DeviceDescriptorResponse { .. } => DEVICE_DESCRIPTOR_RESPONSE,
            Apci::Restart => RESTART,
            Apci::AuthorizeRequest { .. } => AUTHORIZE_REQUEST,
            Apci::AuthorizeResponse { .. } => AUTHORIZE_RESPONSE,
            Apci::KeyWrite { .. } => KEY_WRITE,
            Apci::KeyResponse { .. } => KEY_RESPONSE,
            Apci::PropertyValueRead { .. } => PROPERTY_VALUE_READ,
            Apci::PropertyValueResponse { .. } => PROPERTY_VALUE_RESPONSE,
            Apci::Unknown { code, .. } => *code,
        }
    }

    /// Encodes the APCI high bits (for the TPCI octet) plus the rest of
    /// the service PDU (low APCI byte + service data).
    pub fn encode(&self) -> (u8, Vec<u8>) {
        let code = self.code();
        let high = ((code >> 8) & 0b11) as u8;
        let low = (code & 0xFF) as u8;
        let mut rest = vec![low];
        match self {
            Apci::GroupValueRead | Apci::Restart => {},
            Apci::GroupValueResponse { data } | Apci::GroupValueWrite { data } => rest.extend_from_slice(data),
            Apci::AdcRead { channel, count } => {
                rest.push(*channel);
                rest.push(*count);
            },
            Apci::AdcResponse { channel, count, value } => {
                rest.push(*channel);
                rest.push(*count);
                rest.extend_from_slice(&value.to_be_bytes());
            },
            Apci::MemoryRead { count, address } => {
                rest.push(*count);
                rest.extend_from_slice(&address.to_be_bytes());
            },
            Apci::MemoryResponse { count, address, data } | Apci::MemoryWrite { count, address, data } => {
                rest.push(*count);
                rest.extend_from_slice(&address.to_be_bytes());
                rest.extend_from_slice(data);
            },
            Apci::DeviceDescriptorRead { descriptor_type } => rest.push(*descriptor_type),
            Apci::DeviceDescriptorResponse { descriptor_type, data } => {
                rest.push(*descriptor_type);
                rest.extend_from_slice(data);
            },
            Apci::AuthorizeRequest { key } => rest.extend_from_slice(&key.to_be_bytes()),
            Apci::AuthorizeResponse { level } => rest.push(*level),
            Apci::KeyWrite { level, key } => {
                rest.push(*level);
                rest.extend_from_slice(&key.to_be_bytes());
            },
            Apci::KeyResponse { level } => rest.push(*level),
            Apci::PropertyValueRead { object_index, property_id, count, start_index } => {
                rest.push(*object_index);
                rest.push(*property_id);
                rest.push(*count);
                rest.extend_from_slice(&start_index.to_be_bytes());
            },
            Apci::PropertyValueResponse { object_index, property_id, count, start_index, data } => {
                rest.push(*object_index);
                rest.push(*property_id);
                rest.push(*count);
                rest.extend_from_slice(&start_index.to_be_bytes());
                rest.extend_from_slice(data);
            },
            Apci::Unknown { data, .. } => rest.extend_from_slice(data),
        }
        (high, rest)
    }

    /// Decodes from the APCI high bits (taken from the TPCI octet) and
    /// the remaining bytes of the NPDU (low byte + service data).
    pub fn decode(high_bits: u8, rest: &[u8]) -> Result<Self, ScanError> {
        if rest.is_empty() {
            return Err(ScanError::decode(0, "truncated APCI"));
        }
        let low = rest[0];
        let code = ((high_bits as u16) << 8) | low as u16;
        let data = &rest[1..];

        let need = |n: usize| -> Result<(), ScanError> {
            if data.len() < n {
                Err(ScanError::decode(0, format!("APCI 0x{code:03x} needs {n} bytes, got {}", data.len())))
            } else {
                Ok(())
            }
        };
        let u16_at = |off: usize| u16::from_be_bytes([data[off], data[off + 1]]);
        let u32_at = |off: usize| u32::from_be_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]]);

        Ok(match code {
            GROUP_VALUE_READ => Apci::GroupValueRead,
            GROUP_VALUE_RESPONSE => Apci::GroupValueResponse { data: data.to_vec() },
            GROUP_VALUE_WRITE => Apci::GroupValueWrite { data: data.to_vec() },
            ADC_READ => {
                need(2)?;
                Apci::AdcRead { channel: data[0], count: data[1] }
            },
            ADC_RESPONSE => {
                need(4)?;
                Apci::AdcResponse { channel: data[0], count: data[1], value: u16_at(2) }
            },
            MEMORY_READ => {
                need(3)?;
                Apci::MemoryRead { count: data[0], address: u16_at(1) }
            },
            MEMORY_RESPONSE => {
                need(3)?;
                Apci::MemoryResponse { count: data[0], address: u16_at(1), data: data[3..].to_vec() }
            },
            MEMORY_WRITE => {
                need(3)?;
                Apci::MemoryWrite { count: data[0], address: u16_at(1), data: data[3..].to_vec() }
            },
            DEVICE_DESCRIPTOR_READ => {
                need(1)?;
                Apci::DeviceDescriptorRead { descriptor_type: data[0] }
            },
            DEVICE_DESCRIPTOR_RESPONSE => {
                need(1)?;
                Apci::DeviceDescriptorResponse { descriptor_type: data[0], data: data[1..].to_vec() }
            },
            RESTART => Apci::Restart,
            AUTHORIZE_REQUEST => {
                need(4)?;
                Apci::AuthorizeRequest { key: u32_at(0) }
            },
            AUTHORIZE_RESPONSE => {
                need(1)?;
                Apci::AuthorizeResponse { level: data[0] }
            },
            KEY_WRITE => {
                need(5)?;
                Apci::KeyWrite { level: data[0], key: u32_at(1) }
            },
            KEY_RESPONSE => {
                need(1)?;
                Apci::KeyResponse { level: data[0] }
            },
            PROPERTY_VALUE_READ => {
                need(5)?;
                Apci::PropertyValueRead { object_index: data[0], property_id: data[1], count: data[2], start_index: u16_at(3) }
            },
            PROPERTY_VALUE_RESPONSE => {
                need(5)?;
                Apci::PropertyValueResponse {
                    object_index: data[0],
                    property_id: data[1],
                    count: data[2],
                    start_index: u16_at(3),
                    data: data[5..].to_vec(),
                }
            },
            other => Apci::Unknown { code: other, data: data.to_vec() },
        })
    }
}
