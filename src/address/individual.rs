// SPDX-License-Identifier: MIT OR Apache-2.0

use core::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A KNX individual address: `area.line.device`, packed as a 16-bit value
/// with a 4/4/8 bit split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndividualAddress(u16);

#[derive(Debug, Error)]
pub enum IndividualAddressError {
    #[error("individual address must have 3 dot-separated parts, got \"{0}\"")]
    Shape(String),
    #[error("individual address part is not a number: \"{0}\"")]
    NotANumber(String),
    #[error("area must be 0..=15, got {0}")]
    AreaRange(u16),
    #[error("line must be 0..=15, got {0}")]
    LineRange(u16),
    #[error("device must be 0..=255, got {0}")]
    DeviceRange(u16),
}

impl IndividualAddress {
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub fn new(area: u8, line: u8, device: u8) -> Result<Self, IndividualAddressError> {
        if area > 0x0F {
            return Err(IndividualAddressError::AreaRange(area as u16));
        }
        if line > 0x0F {
            return Err(IndividualAddressError::LineRange(line as u16));
        }
        let raw = ((area as u16) << 12) | ((line as u16) << 8) | device as u16;
        Ok(Self(raw))
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    pub const fn area(self) -> u8 {
        ((self.0 >> 12) & 0x0F) as u8
    }

    pub const fn line(self) -> u8 {
        ((self.0 >> 8) & 0x0F) as u8
    }

    pub const fn device(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// `*.*.0` is reserved for line/area couplers.
    pub const fn is_coupler(self) -> bool {
        self.device() == 0
    }
}

impl fmt::Display for IndividualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.area(), self.line(), self.device())
    }
}

impl FromStr for IndividualAddress {
    type Err = IndividualAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        let [a, l, d] = parts.as_slice() else {
            return Err(IndividualAddressError::Shape(s.to_string()));
        };
        let parse = |p: &str| -> Result<u16, IndividualAddressError> {
            p.parse::<u16>()
                .map_err(|_| IndividualAddressError::NotANumber(p.to_string()))
        };
        let area = parse(a)?;
        let line = parse(l)?;
        let device = parse(d)?;
        if area > 15 {
            return Err(IndividualAddressError::AreaRange(area));
        }
        if line > 15 {
            return Err(IndividualAddressError::LineRange(line));
        }
        if device > 255 {
            return Err(IndividualAddressError::DeviceRange(device));
        }
        Ok(Self::from_raw((area << 12) | (line << 8) | device))
    }
}

impl From<u16> for IndividualAddress {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<IndividualAddress> for u16 {
    fn from(ia: IndividualAddress) -> Self {
        ia.0
    }
}

/// An inclusive range of individual addresses, as produced by
/// `--bus-targets a.l.d-a.l.d` or `a.l.d/mask`.
#[derive(Debug, Clone, Copy)]
pub struct IndividualAddressRange {
    pub start: IndividualAddress,
    pub end: IndividualAddress,
}

impl IndividualAddressRange {
    pub fn iter(&self) -> impl Iterator<Item = IndividualAddress> + '_ {
        (self.start.raw()..=self.end.raw()).map(IndividualAddress::from_raw)
    }
}

#[derive(Debug, Error)]
pub enum IndividualAddressRangeError {
    #[error(transparent)]
    Address(#[from] IndividualAddressError),
    #[error("mask must be 0..=16, got {0}")]
    MaskRange(u32),
    #[error("range start {start} is greater than end {end}")]
    Inverted {
        start: IndividualAddress,
        end: IndividualAddress,
    },
}

impl FromStr for IndividualAddressRange {
    type Err = IndividualAddressRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((base, mask)) = s.split_once('/') {
            let base: IndividualAddress = base.parse()?;
            let bits: u32 = mask
                .parse()
                .map_err(|_| IndividualAddressRangeError::MaskRange(0))?;
            if bits > 16 {
                return Err(IndividualAddressRangeError::MaskRange(bits));
            }
            let host_bits = 16 - bits;
            let host_mask: u16 = if host_bits == 16 {
                u16::MAX
            } else {
                (1u16 << host_bits) - 1
            };
            let start = IndividualAddress::from_raw(base.raw() & !host_mask);
            let end = IndividualAddress::from_raw(base.raw() | host_mask);
            return Ok(Self { start, end });
        }

        if let Some((start, end)) = s.split_once('-') {
            let start: IndividualAddress = start.parse()?;
            let end: IndividualAddress = end.parse()?;
            if start.raw() > end.raw() {
                return Err(IndividualAddressRangeError::Inverted { start, end });
            }
            return Ok(Self { start, end });
        }

        let single: IndividualAddress = s.parse()?;
        Ok(Self {
            start: single,
            end: single,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_display_parse() {
        for s in ["0.0.1", "15.15.255", "1.1.0", "4.3.200"] {
            let ia: IndividualAddress = s.parse().expect("parse");
            assert_eq!(ia.to_string(), s);
        }
    }

    #[test]
    fn coupler_address_detected() {
        let ia: IndividualAddress = "3.5.0".parse().expect("parse");
        assert!(ia.is_coupler());
        let ia: IndividualAddress = "3.5.1".parse().expect("parse");
        assert!(!ia.is_coupler());
    }

    #[test]
    fn rejects_out_of_range_area() {
        assert!("16.0.0".parse::<IndividualAddress>().is_err());
    }

    #[test]
    fn rejects_malformed_shape() {
        assert!("1.2".parse::<IndividualAddress>().is_err());
        assert!("1.2.3.4".parse::<IndividualAddress>().is_err());
    }

    #[test]
    fn range_dash_syntax() {
        let r: IndividualAddressRange = "1.1.1-1.1.5".parse().expect("parse");
        let got: Vec<_> = r.iter().map(|a| a.to_string()).collect();
        assert_eq!(got, vec!["1.1.1", "1.1.2", "1.1.3", "1.1.4", "1.1.5"]);
    }

    #[test]
    fn range_mask_syntax() {
        // /16 on a full device address pins a single address.
        let r: IndividualAddressRange = "1.1.5/16".parse().expect("parse");
        assert_eq!(r.start.raw(), r.end.raw());
    }

    #[test]
    fn range_rejects_inverted_bounds() {
        assert!("1.1.5-1.1.1".parse::<IndividualAddressRange>().is_err());
    }
}
