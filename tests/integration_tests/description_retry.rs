// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scenario 2 (spec §8): a gateway drops the first two DESCRIPTION_REQUESTs
//! and answers the third.

use std::{
    net::{Ipv4Addr, SocketAddrV4},
    time::Duration,
};

use knx_scan_rs::{
    address::IndividualAddress,
    codec::service::{DescriptionResponse, KnxIpFrame},
    session,
    transport::UnicastEndpoint,
};

use super::common::{bind_loopback, device_info_dib};

#[tokio::test]
async fn gateway_answers_on_third_attempt() {
    let (gateway_socket, gateway_addr) = bind_loopback().await;
    let ia = IndividualAddress::new(1, 1, 0).unwrap();
    let response = KnxIpFrame::DescriptionResponse(DescriptionResponse { dibs: vec![device_info_dib("GW1", ia)] });
    let response_bytes = response.encode();

    let gateway = tokio::spawn(async move {
        let mut buf = vec![0u8; 576];
        let mut seen = 0u32;
        loop {
            let (n, from) = gateway_socket.recv_from(&mut buf).await.expect("recv DESCRIPTION_REQUEST");
            assert!(matches!(KnxIpFrame::parse(&buf[..n]).expect("parse"), KnxIpFrame::DescriptionRequest(_)));
            seen += 1;
            if seen == 3 {
                gateway_socket.send_to(&response_bytes, from).await.expect("send DESCRIPTION_RESPONSE");
                return seen;
            }
        }
    });

    let client = UnicastEndpoint::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)).await.expect("bind client");
    let dibs = session::describe(&client, gateway_addr, Duration::from_secs(1), 3)
        .await
        .expect("describe eventually succeeds");
    assert_eq!(dibs.len(), 1);

    let seen = gateway.await.expect("gateway task panicked");
    assert_eq!(seen, 3, "expected exactly 3 DESCRIPTION_REQUEST frames");
}

#[tokio::test]
async fn exhausting_retries_times_out() {
    let (gateway_socket, gateway_addr) = bind_loopback().await;
    let gateway = tokio::spawn(async move {
        let mut buf = vec![0u8; 576];
        let mut seen = 0u32;
        // Drain and silently drop every request until the client gives up.
        for _ in 0..3 {
            let _ = gateway_socket.recv_from(&mut buf).await.expect("recv");
            seen += 1;
        }
        seen
    });

    let client = UnicastEndpoint::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)).await.expect("bind client");
    let result = session::describe(&client, gateway_addr, Duration::from_millis(200), 3).await;
    assert!(result.is_err());

    let seen = gateway.await.expect("gateway task panicked");
    assert_eq!(seen, 3);
}
