// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fire-and-forget `GroupValueWrite` (spec §4.6 `--group-write`, Open
//! Question: DPT width is not validated — this crate sends whatever bytes
//! the caller provides and does not attempt to infer or enforce a
//! datapoint type from the payload length).

use crate::{address::GroupAddress, codec::apci::Apci, codec::cemi::Destination, error::ScanError, session::tunnel::TunnelSession};

/// Sends a single `GroupValueWrite` to `address` and returns once the
/// gateway has acked the TUNNELLING_REQUEST; no application-layer
/// confirmation is awaited since group communication is connectionless.
pub async fn group_write(session: &mut TunnelSession, address: GroupAddress, data: Vec<u8>) -> Result<(), ScanError> {
    session.send_data(Destination::Group(address), Apci::GroupValueWrite { data }).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_address_survives_round_number_formats() {
        let ga = GroupAddress::new_three_level(1, 2, 3).unwrap();
        assert_eq!(ga.to_string(), "1/2/3");
    }
}
