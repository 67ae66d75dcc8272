// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared loopback mock-gateway plumbing for the end-to-end scenarios in
//! spec §8. Each scenario binds a plain `tokio::net::UdpSocket` to play the
//! gateway (or bus device) role and drives it from a background task while
//! the scenario under test exercises the real session/bus code against it.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use knx_scan_rs::codec::{
    cri::{Crd, Cri, TunnelLayer},
    dib::{Dib, DeviceInfo},
    hpai::Hpai,
    service::{ConnectResponse, KnxIpFrame, STATUS_NO_ERROR},
};
use tokio::net::UdpSocket;

/// Binds an ephemeral loopback UDP socket, for either end of a scenario.
pub async fn bind_loopback() -> (UdpSocket, SocketAddr) {
    let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).await.expect("bind loopback socket");
    let addr = socket.local_addr().expect("local addr");
    (socket, addr)
}

pub fn device_info_dib(name: &str, ia: knx_scan_rs::address::IndividualAddress) -> Dib {
    Dib::DeviceInfo(DeviceInfo {
        knx_medium: 0x02,
        device_status: 0,
        individual_address: ia,
        project_installation_identifier: 0,
        device_serial: [0; 6],
        multicast_address: Ipv4Addr::new(224, 0, 23, 12),
        mac_address: [0; 6],
        friendly_name: name.to_string(),
    })
}

/// Builds a successful `CONNECT_RESPONSE` for a tunnelling connection.
pub fn connect_response_ok(channel_id: u8, individual_address: knx_scan_rs::address::IndividualAddress) -> KnxIpFrame {
    let hpai = Hpai::new(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0));
    KnxIpFrame::ConnectResponse(ConnectResponse {
        channel_id,
        status: STATUS_NO_ERROR,
        data_endpoint: Some(hpai),
        crd: Some(Crd::Tunnel(individual_address)),
    })
}

pub fn connect_response_error(status: u8) -> KnxIpFrame {
    KnxIpFrame::ConnectResponse(ConnectResponse { channel_id: 0, status, data_endpoint: None, crd: None })
}

/// Reads one datagram and asserts it decodes to a `ConnectRequest` for the
/// expected tunnel layer, returning the sender's address to reply to.
pub async fn expect_connect_request(socket: &UdpSocket, expected_layer: TunnelLayer) -> SocketAddr {
    let mut buf = vec![0u8; 576];
    let (n, from) = socket.recv_from(&mut buf).await.expect("recv CONNECT_REQUEST");
    match KnxIpFrame::parse(&buf[..n]).expect("parse CONNECT_REQUEST") {
        KnxIpFrame::ConnectRequest(req) => assert_eq!(req.cri, Cri::Tunnel(expected_layer)),
        other => panic!("expected ConnectRequest, got {other:?}"),
    }
    from
}
