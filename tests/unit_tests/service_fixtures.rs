// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed wire fixtures for the KNXnet/IP frame header and a handful of
//! service bodies (spec §4.1, §4.3, §4.4). The codec's own `#[cfg(test)]`
//! modules check encode/parse round trips; these fixtures additionally
//! pin the exact byte layout against hand-derived values, so a change
//! that breaks wire compatibility (field order, a dropped reserved byte)
//! fails here even if encode and parse drift together.

use knx_scan_rs::codec::{
    cri::{Cri, TunnelLayer},
    hpai::Hpai,
    service::{ConnectRequest, KnxIpFrame, SearchRequest, TunnellingAck, STATUS_NO_ERROR},
};

fn hpai_fixture() -> (Hpai, [u8; 8]) {
    let hpai = Hpai::new(std::net::SocketAddrV4::new(std::net::Ipv4Addr::new(192, 168, 1, 10), 3671));
    (hpai, [0x08, 0x01, 192, 168, 1, 10, 0x0E, 0x57])
}

#[test]
fn hpai_matches_known_good_bytes() {
    let (hpai, expected) = hpai_fixture();
    let mut buf = Vec::new();
    hpai.encode(&mut buf);
    assert_eq!(buf, expected);
}

#[test]
fn search_request_wire_layout() {
    let (hpai, hpai_bytes) = hpai_fixture();
    let frame = KnxIpFrame::SearchRequest(SearchRequest { discovery_endpoint: hpai });
    let bytes = frame.encode();

    let mut expected = vec![0x06, 0x10, 0x02, 0x01, 0x00, 0x0E];
    expected.extend_from_slice(&hpai_bytes);
    assert_eq!(bytes, expected);
}

#[test]
fn connect_request_wire_layout() {
    let (hpai, hpai_bytes) = hpai_fixture();
    let frame = KnxIpFrame::ConnectRequest(ConnectRequest {
        control_endpoint: hpai,
        data_endpoint: hpai,
        cri: Cri::Tunnel(TunnelLayer::LinkLayer),
    });
    let bytes = frame.encode();

    let mut expected = vec![0x06, 0x10, 0x02, 0x05, 0x00, 0x1A];
    expected.extend_from_slice(&hpai_bytes);
    expected.extend_from_slice(&hpai_bytes);
    // CRI: length=4, connection type TUNNEL_CONNECTION=0x04, layer TUNNEL_LINKLAYER=0x02, reserved=0.
    expected.extend_from_slice(&[0x04, 0x04, 0x02, 0x00]);
    assert_eq!(bytes, expected);
}

#[test]
fn tunnelling_ack_wire_layout() {
    let frame = KnxIpFrame::TunnellingAck(TunnellingAck { channel_id: 0x2A, sequence_counter: 0x07, status: STATUS_NO_ERROR });
    let bytes = frame.encode();
    assert_eq!(bytes, vec![0x06, 0x10, 0x04, 0x21, 0x00, 0x0A, 0x04, 0x2A, 0x07, 0x00]);
}

#[test]
fn header_rejects_truncated_datagram() {
    assert!(KnxIpFrame::parse(&[0x06, 0x10, 0x02, 0x01, 0x00, 0x0E]).is_err());
}

#[test]
fn header_rejects_unknown_service_id() {
    let bytes = [0x06, 0x10, 0xFF, 0xFF, 0x00, 0x06];
    assert!(KnxIpFrame::parse(&bytes).is_err());
}
