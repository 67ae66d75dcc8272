// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scenario 4 (spec §8): a gateway that does not support the BUSMONITOR
//! tunnel layer answers CONNECT_REQUEST with `E_CONNECTION_OPTION` (0x23),
//! which must surface the scenario's exact diagnostic text rather than the
//! generic `ConnectError::ConnectionOption` message.

use knx_scan_rs::{codec::cri::TunnelLayer, session::TunnelSession};

use super::common::{bind_loopback, connect_response_error, expect_connect_request};

#[tokio::test]
async fn busmonitor_connect_failure_has_exact_message() {
    let (gateway_socket, gateway_addr) = bind_loopback().await;

    let gateway = tokio::spawn(async move {
        let scanner_addr = expect_connect_request(&gateway_socket, TunnelLayer::BusMonitor).await;
        let response = connect_response_error(0x23);
        gateway_socket.send_to(&response.encode(), scanner_addr).await.expect("send CONNECT_RESPONSE");
    });

    let local = std::net::SocketAddrV4::new(std::net::Ipv4Addr::UNSPECIFIED, 0);
    let result = TunnelSession::connect(local, gateway_addr, TunnelLayer::BusMonitor).await;

    let err = result.expect_err("connect must fail for unsupported bus monitor");
    assert_eq!(err.to_string(), "protocol error: device does not support bus monitor; try group monitor");

    gateway.await.expect("gateway task panicked");
}
