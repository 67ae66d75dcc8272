// SPDX-License-Identifier: MIT OR Apache-2.0

use core::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A KNX group address, stored as a raw 16-bit value. Rendering as
/// 2-level (`main/sub`, 5/11 bits) or 3-level (`main/middle/sub`, 5/3/8
/// bits) is purely a display concern; both forms address the same space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupAddress(u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupAddressFormat {
    TwoLevel,
    ThreeLevel,
}

#[derive(Debug, Error)]
pub enum GroupAddressError {
    #[error("group address must have 2 or 3 '/'-separated parts, got \"{0}\"")]
    Shape(String),
    #[error("group address part is not a number: \"{0}\"")]
    NotANumber(String),
    #[error("main group must be 0..=31, got {0}")]
    MainRange(u16),
    #[error("middle group must be 0..=7, got {0}")]
    MiddleRange(u16),
    #[error("sub group ({format:?}) out of range: {value}")]
    SubRange { format: GroupAddressFormat, value: u16 },
}

impl GroupAddress {
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    pub fn new_three_level(main: u8, middle: u8, sub: u8) -> Result<Self, GroupAddressError> {
        if main > 31 {
            return Err(GroupAddressError::MainRange(main as u16));
        }
        if middle > 7 {
            return Err(GroupAddressError::MiddleRange(middle as u16));
        }
        let raw = ((main as u16) << 11) | ((middle as u16) << 8) | sub as u16;
        Ok(Self(raw))
    }

    pub fn new_two_level(main: u8, sub: u16) -> Result<Self, GroupAddressError> {
        if main > 31 {
            return Err(GroupAddressError::MainRange(main as u16));
        }
        if sub > 0x07FF {
            return Err(GroupAddressError::SubRange {
                format: GroupAddressFormat::TwoLevel,
                value: sub,
            });
        }
        let raw = ((main as u16) << 11) | sub;
        Ok(Self(raw))
    }

    pub const fn main(self) -> u8 {
        ((self.0 >> 11) & 0x1F) as u8
    }

    pub const fn middle(self) -> u8 {
        ((self.0 >> 8) & 0x07) as u8
    }

    pub const fn sub_three_level(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub const fn sub_two_level(self) -> u16 {
        self.0 & 0x07FF
    }

    pub fn format(self, format: GroupAddressFormat) -> String {
        match format {
            GroupAddressFormat::TwoLevel => format!("{}/{}", self.main(), self.sub_two_level()),
            GroupAddressFormat::ThreeLevel => {
                format!("{}/{}/{}", self.main(), self.middle(), self.sub_three_level())
            },
        }
    }
}

/// Default textual form is 3-level, matching the CLI's `--group-address`
/// convention and most KNX tooling.
impl fmt::Display for GroupAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(GroupAddressFormat::ThreeLevel))
    }
}

impl FromStr for GroupAddress {
    type Err = GroupAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        let parse = |p: &str| -> Result<u16, GroupAddressError> {
            p.parse::<u16>()
                .map_err(|_| GroupAddressError::NotANumber(p.to_string()))
        };
        match parts.as_slice() {
            [main, middle, sub] => {
                let main = parse(main)?;
                let middle = parse(middle)?;
                let sub = parse(sub)?;
                if main > 31 {
                    return Err(GroupAddressError::MainRange(main));
                }
                if middle > 7 {
                    return Err(GroupAddressError::MiddleRange(middle));
                }
                if sub > 255 {
                    return Err(GroupAddressError::SubRange {
                        format: GroupAddressFormat::ThreeLevel,
                        value: sub,
                    });
                }
                Ok(Self(((main) << 11) | ((middle) << 8) | sub))
            },
            [main, sub] => {
                let main = parse(main)?;
                let sub = parse(sub)?;
                if main > 31 {
                    return Err(GroupAddressError::MainRange(main));
                }
                if sub > 0x07FF {
                    return Err(GroupAddressError::SubRange {
                        format: GroupAddressFormat::TwoLevel,
                        value: sub,
                    });
                }
                Ok(Self((main << 11) | sub))
            },
            _ => Err(GroupAddressError::Shape(s.to_string())),
        }
    }
}

impl From<u16> for GroupAddress {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<GroupAddress> for u16 {
    fn from(ga: GroupAddress) -> Self {
        ga.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_three_level() {
        for s in ["1/2/3", "0/0/0", "31/7/255"] {
            let ga: GroupAddress = s.parse().expect("parse");
            assert_eq!(ga.format(GroupAddressFormat::ThreeLevel), s);
        }
    }

    #[test]
    fn roundtrip_two_level() {
        for s in ["1/2", "0/0", "31/2047"] {
            let ga: GroupAddress = s.parse().expect("parse");
            assert_eq!(ga.format(GroupAddressFormat::TwoLevel), s);
        }
    }

    #[test]
    fn two_and_three_level_address_same_space() {
        let three: GroupAddress = "1/2/3".parse().expect("parse");
        let two: GroupAddress = "1/515".parse().expect("parse");
        assert_eq!(three.raw(), (1u16 << 11) | (2 << 8) | 3);
        assert_eq!(two.raw(), three.raw());
    }

    #[test]
    fn rejects_malformed_shape() {
        assert!("1/2/3/4".parse::<GroupAddress>().is_err());
        assert!("1".parse::<GroupAddress>().is_err());
    }
}
