// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Write;

/// Renders `bytes` as a lowercase hex string with no separators, for
/// logging and presenting raw frame payloads (bus-monitor records, APCI
/// data) without pulling a formatting dependency into the hot path.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(&mut out, "{byte:02x}").expect("writing to String cannot fail");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_dump_roundtrips_through_hex_crate() {
        let bytes = [0x01, 0xAB, 0x00, 0xFF];
        let dumped = hex_dump(&bytes);
        assert_eq!(dumped, "01ab00ff");
        let decoded = hex::decode(&dumped).expect("valid hex");
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn hex_dump_empty_is_empty_string() {
        assert_eq!(hex_dump(&[]), "");
    }
}
