// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scenario 5 (spec §8): a gateway that accepts the tunnel but never
//! answers CONNECTIONSTATE_REQUEST afterward. After three retries the
//! keepalive gives up and the session fails.
//!
//! Run with paused tokio time so the real 50s keepalive interval and the
//! 3x10s retry timeouts resolve without an actual 80-second wait: nothing
//! else in the runtime is runnable while the retry loop waits, so tokio
//! auto-advances the clock past each timeout.

use std::{
    net::{Ipv4Addr, SocketAddrV4},
    time::Duration,
};

use knx_scan_rs::{
    address::IndividualAddress,
    codec::cri::TunnelLayer,
    error::ScanError,
    session::{SessionState, TunnelSession},
};

use super::common::{bind_loopback, connect_response_ok, expect_connect_request};

const GATEWAY_CHANNEL: u8 = 4;

#[tokio::test(start_paused = true)]
async fn keepalive_loss_fails_session_after_three_retries() {
    let (gateway_socket, gateway_addr) = bind_loopback().await;
    let scanner_ia = IndividualAddress::new(1, 1, 9).unwrap();

    tokio::spawn(async move {
        let scanner_addr = expect_connect_request(&gateway_socket, TunnelLayer::LinkLayer).await;
        let response = connect_response_ok(GATEWAY_CHANNEL, scanner_ia);
        gateway_socket.send_to(&response.encode(), scanner_addr).await.expect("send CONNECT_RESPONSE");
        // Never answers CONNECTIONSTATE_REQUEST from here on.
        let mut buf = vec![0u8; 576];
        loop {
            let _ = gateway_socket.recv_from(&mut buf).await;
        }
    });

    let local = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
    let mut session = TunnelSession::connect(local, gateway_addr, TunnelLayer::LinkLayer).await.expect("connect");
    assert_eq!(session.state, SessionState::Active);

    tokio::time::advance(Duration::from_secs(51)).await;

    let result = session.maintain().await;
    assert!(matches!(result, Err(ScanError::Timeout(_))));
    assert_eq!(session.state, SessionState::Failed);
}
