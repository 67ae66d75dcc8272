// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport-Layer Protocol Control Information (spec §3, §4.5).
//!
//! TPCI occupies the top two bits of the first NPDU octet: `00`=UDT
//! (unnumbered data), `01`=NDT (numbered data), `10`=UCD (unnumbered
//! control), `11`=NCD (numbered control). Numbered variants carry a 4-bit
//! sequence number in the next four bits; control variants use the low
//! two bits of that same octet as a control code.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCode {
    Connect,
    Disconnect,
    Ack,
    Nak,
}

impl ControlCode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => ControlCode::Connect,
            0b01 => ControlCode::Disconnect,
            0b10 => ControlCode::Ack,
            _ => ControlCode::Nak,
        }
    }

    fn bits(self) -> u8 {
        match self {
            ControlCode::Connect => 0b00,
            ControlCode::Disconnect => 0b01,
            ControlCode::Ack => 0b10,
            ControlCode::Nak => 0b11,
        }
    }
}

/// A 4-bit sequence number, wrapping modulo 16 (spec §4.5 invariants).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqNumber(u8);

impl SeqNumber {
    pub const ZERO: SeqNumber = SeqNumber(0);

    pub fn new(v: u8) -> Self {
        Self(v & 0x0F)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn next(self) -> Self {
        Self((self.0 + 1) & 0x0F)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tpci {
    /// Unnumbered data — used for connectionless (group) communication.
    UnnumberedData,
    /// Numbered data — sequenced application data inside a point-to-point
    /// transport connection.
    NumberedData(SeqNumber),
    /// Unnumbered control — T_Connect / T_Disconnect.
    UnnumberedControl(ControlCode),
    /// Numbered control — T_Ack / T_Nak, carrying the sequence being
    /// acknowledged.
    NumberedControl(SeqNumber, ControlCode),
}

impl Tpci {
    /// Decodes the TPCI type/sequence bits from the first NPDU octet. For
    /// UDT/NDT the low two bits of that octet are the high bits of the
    /// 10-bit APCI code and are returned unconsumed.
    pub fn from_first_octet(octet: u8) -> (Self, u8) {
        let kind = (octet >> 6) & 0b11;
        let seq = SeqNumber::new((octet >> 2) & 0x0F);
        let low_bits = octet & 0b11;
        let tpci = match kind {
            0b00 => Tpci::UnnumberedData,
            0b01 => Tpci::NumberedData(seq),
            0b10 => Tpci::UnnumberedControl(ControlCode::from_bits(low_bits)),
            _ => Tpci::NumberedControl(seq, ControlCode::from_bits(low_bits)),
        };
        (tpci, low_bits)
    }

    /// Encodes the TPCI into the first NPDU octet. `apci_high_bits` are
    /// ORed into the low two bits for UDT/NDT; ignored for control PDUs.
    pub fn to_first_octet(self, apci_high_bits: u8) -> u8 {
        match self {
            Tpci::UnnumberedData => apci_high_bits & 0b11,
            Tpci::NumberedData(seq) => (0b01 << 6) | (seq.get() << 2) | (apci_high_bits & 0b11),
            Tpci::UnnumberedControl(code) => (0b10 << 6) | code.bits(),
            Tpci::NumberedControl(seq, code) => (0b11 << 6) | (seq.get() << 2) | code.bits(),
        }
    }

    pub fn is_control(self) -> bool {
        matches!(self, Tpci::UnnumberedControl(_) | Tpci::NumberedControl(..))
    }

    pub fn seq(self) -> Option<SeqNumber> {
        match self {
            Tpci::NumberedData(s) | Tpci::NumberedControl(s, _) => Some(s),
            _ => None,
        }
    }
}
