// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common External Message Interface frames (spec §3, §4.2, §4.5).
//!
//! A cEMI frame is `message_code | additional-info-length | additional
//! info... | control-field-1 | control-field-2 | source | destination |
//! npdu-length | TPCI/APCI...`. `L_Busmon.ind` carries the raw bus frame
//! instead of an NPDU and is handled as its own variant.

use crate::{
    address::{GroupAddress, IndividualAddress},
    codec::{apci::Apci, tpci::Tpci},
    error::ScanError,
};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageCode {
    /// Request to send a frame onto the bus.
    LDataReq = 0x11,
    /// Confirmation that a previously requested frame was sent (or not).
    LDataCon = 0x2E,
    /// Indication that a frame arrived from the bus.
    LDataInd = 0x29,
    /// Raw bus-monitor indication: every frame seen on the bus, unfiltered.
    LBusmonInd = 0x2B,
}

impl MessageCode {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0x11 => Self::LDataReq,
            0x2E => Self::LDataCon,
            0x29 => Self::LDataInd,
            0x2B => Self::LBusmonInd,
            _ => return None,
        })
    }
}

/// Additional-info TLV as carried ahead of the control fields. Only the
/// bus-monitor timestamp is interpreted; everything else is opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdditionalInfo {
    BusmonitorStatus { timestamp: u16 },
    Other { info_type: u8, data: Vec<u8> },
}

impl AdditionalInfo {
    const BUSMONITOR_STATUS_TYPE: u8 = 0x03;

    fn parse(bytes: &[u8]) -> Result<(Self, &[u8]), ScanError> {
        if bytes.len() < 2 {
            return Err(ScanError::decode(0, "truncated additional info TLV"));
        }
        let info_type = bytes[0];
        let len = bytes[1] as usize;
        if bytes.len() < 2 + len {
            return Err(ScanError::decode(0, "additional info TLV longer than frame"));
        }
        let data = &bytes[2..2 + len];
        let info = if info_type == Self::BUSMONITOR_STATUS_TYPE && len == 2 {
            AdditionalInfo::BusmonitorStatus { timestamp: u16::from_be_bytes([data[0], data[1]]) }
        } else {
            AdditionalInfo::Other { info_type, data: data.to_vec() }
        };
        Ok((info, &bytes[2 + len..]))
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            AdditionalInfo::BusmonitorStatus { timestamp } => {
                out.push(Self::BUSMONITOR_STATUS_TYPE);
                out.push(2);
                out.extend_from_slice(&timestamp.to_be_bytes());
            },
            AdditionalInfo::Other { info_type, data } => {
                out.push(*info_type);
                out.push(data.len() as u8);
                out.extend_from_slice(data);
            },
        }
    }
}

fn parse_additional_info(bytes: &[u8]) -> Result<(Vec<AdditionalInfo>, &[u8]), ScanError> {
    if bytes.is_empty() {
        return Err(ScanError::decode(0, "truncated cEMI: missing additional-info length"));
    }
    let total = bytes[0] as usize;
    if bytes.len() < 1 + total {
        return Err(ScanError::decode(0, "additional-info block longer than frame"));
    }
    let mut rest = &bytes[1..1 + total];
    let mut infos = Vec::new();
    while !rest.is_empty() {
        let (info, tail) = AdditionalInfo::parse(rest)?;
        infos.push(info);
        rest = tail;
    }
    Ok((infos, &bytes[1 + total..]))
}

fn encode_additional_info(infos: &[AdditionalInfo], out: &mut Vec<u8>) {
    let mut body = Vec::new();
    for info in infos {
        info.encode(&mut body);
    }
    out.push(body.len() as u8);
    out.extend_from_slice(&body);
}

/// Destination address, discriminated by the address-type bit in control
/// field 2 (spec §3: cEMI Frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Individual(IndividualAddress),
    Group(GroupAddress),
}

/// Control field 1 bits this crate inspects; the remaining bits (repeat
/// flag, broadcast type, priority) are preserved verbatim so a frame can
/// be re-emitted unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlField1 {
    pub raw: u8,
}

impl ControlField1 {
    pub const STANDARD_FRAME: u8 = 0xBC;

    pub fn priority(self) -> u8 {
        (self.raw >> 2) & 0b11
    }
}

/// Control field 2: address type, hop count, extended frame format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlField2 {
    pub raw: u8,
}

impl ControlField2 {
    pub fn for_destination(dest: Destination, hop_count: u8) -> Self {
        let addr_type_bit = match dest {
            Destination::Group(_) => 0x80,
            Destination::Individual(_) => 0x00,
        };
        Self { raw: addr_type_bit | ((hop_count & 0x07) << 4) }
    }

    pub fn is_group_address(self) -> bool {
        self.raw & 0x80 != 0
    }

    pub fn hop_count(self) -> u8 {
        (self.raw >> 4) & 0x07
    }
}

/// A decoded `L_Data.*` cEMI frame carrying an NPDU (TPCI + APCI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub message_code: MessageCode,
    pub additional_info: Vec<AdditionalInfo>,
    pub control1: ControlField1,
    pub control2: ControlField2,
    pub source: IndividualAddress,
    pub destination: Destination,
    pub tpci: Tpci,
    pub apci: Option<Apci>,
}

/// A raw `L_Busmon.ind` frame: the physical bus octets are handed through
/// unparsed, since a monitor device sees frames addressed to others too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusmonFrame {
    pub additional_info: Vec<AdditionalInfo>,
    pub raw: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CemiFrame {
    Data(DataFrame),
    Busmon(BusmonFrame),
}

impl CemiFrame {
    pub fn parse(bytes: &[u8]) -> Result<Self, ScanError> {
        if bytes.is_empty() {
            return Err(ScanError::decode(0, "empty cEMI frame"));
        }
        let message_code = MessageCode::from_u8(bytes[0])
            .ok_or_else(|| ScanError::decode(0, format!("unknown cEMI message code 0x{:02x}", bytes[0])))?;
        let (additional_info, rest) = parse_additional_info(&bytes[1..])?;

        if message_code == MessageCode::LBusmonInd {
            return Ok(CemiFrame::Busmon(BusmonFrame { additional_info, raw: rest.to_vec() }));
        }

        if rest.len() < 6 {
            return Err(ScanError::decode(0, "truncated cEMI L_Data frame"));
        }
        let control1 = ControlField1 { raw: rest[0] };
        let control2 = ControlField2 { raw: rest[1] };
        let source = IndividualAddress::from_raw(u16::from_be_bytes([rest[2], rest[3]]));
        let dest_raw = u16::from_be_bytes([rest[4], rest[5]]);
        let destination = if control2.is_group_address() {
            Destination::Group(GroupAddress::from_raw(dest_raw))
        } else {
            Destination::Individual(IndividualAddress::from_raw(dest_raw))
        };

        let npdu = &rest[6..];
        if npdu.is_empty() {
            return Err(ScanError::decode(6, "missing NPDU length byte"));
        }
        let npdu_len = npdu[0] as usize;
        let npdu_body = &npdu[1..];
        if npdu_body.is_empty() {
            return Err(ScanError::decode(7, "missing TPCI octet"));
        }
        if npdu_body.len() < npdu_len + 1 {
            return Err(ScanError::decode(7, "NPDU shorter than declared length"));
        }
        let (tpci, apci_high) = Tpci::from_first_octet(npdu_body[0]);
        let apci = if tpci.is_control() {
            None
        } else {
            Some(Apci::decode(apci_high, &npdu_body[1..=npdu_len])?)
        };

        Ok(CemiFrame::Data(DataFrame {
            message_code,
            additional_info,
            control1,
            control2,
            source,
            destination,
            tpci,
            apci,
        }))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            CemiFrame::Busmon(frame) => {
                out.push(MessageCode::LBusmonInd as u8);
                encode_additional_info(&frame.additional_info, &mut out);
                out.extend_from_slice(&frame.raw);
            },
            CemiFrame::Data(frame) => {
                out.push(frame.message_code as u8);
                encode_additional_info(&frame.additional_info, &mut out);
                out.push(frame.control1.raw);
                out.push(frame.control2.raw);
                out.extend_from_slice(&frame.source.raw().to_be_bytes());
                let dest_raw: u16 = match frame.destination {
                    Destination::Individual(ia) => ia.raw(),
                    Destination::Group(ga) => ga.raw(),
                };
                out.extend_from_slice(&dest_raw.to_be_bytes());

                let apci_high = frame.apci.as_ref().map(|a| ((a.code() >> 8) & 0b11) as u8).unwrap_or(0);
                let tpci_octet = frame.tpci.to_first_octet(apci_high);
                let mut npdu = vec![tpci_octet];
                if let Some(apci) = &frame.apci {
                    let (_, apci_rest) = apci.encode();
                    npdu.extend_from_slice(&apci_rest);
                }
                // NPDU length excludes the TPCI octet itself (spec §3).
                out.push((npdu.len() - 1) as u8);
                out.extend_from_slice(&npdu);
            },
        }
        out
    }
}
