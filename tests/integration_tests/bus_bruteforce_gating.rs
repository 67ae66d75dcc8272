// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scenario 6 (spec §8): a device whose Authorize key is `0x00000001`.
//! `--bruteforce-key` must walk the key space from zero, tearing the
//! transport connection down and reopening it between failed attempts,
//! and stop as soon as a non-zero access level is granted.
//!
//! Run with paused tokio time: probes the gateway never answers for
//! (device descriptor, memory, property, ADC) each carry a real 3-second
//! T_Ack/response timeout, which collapses to a wall-clock instant since
//! nothing else is runnable while they wait.

use std::net::{Ipv4Addr, SocketAddrV4};

use knx_scan_rs::{
    address::IndividualAddress,
    bus::{probe_device, ProbeOptions},
    codec::{
        apci::Apci,
        cemi::{CemiFrame, ControlField1, ControlField2, DataFrame, Destination, MessageCode},
        cri::TunnelLayer,
        service::{KnxIpFrame, TunnellingAck, TunnellingRequest},
        tpci::{ControlCode, SeqNumber, Tpci},
    },
    session::TunnelSession,
};
use tokio::net::UdpSocket;

use super::common::{bind_loopback, connect_response_ok, expect_connect_request};

const GATEWAY_CHANNEL: u8 = 1;
const DEVICE_KEY: u32 = 1;

/// Receives one TUNNELLING_REQUEST, KNXnet/IP-acks it, and returns its cEMI
/// payload plus the scanner's address to reply to.
async fn recv_and_ack(socket: &UdpSocket, scanner: std::net::SocketAddr) -> CemiFrame {
    let mut buf = vec![0u8; 576];
    let (n, from) = socket.recv_from(&mut buf).await.expect("recv TUNNELLING_REQUEST");
    assert_eq!(from, scanner);
    let req = match KnxIpFrame::parse(&buf[..n]).expect("parse") {
        KnxIpFrame::TunnellingRequest(req) => req,
        other => panic!("expected TunnellingRequest, got {other:?}"),
    };
    assert_eq!(req.channel_id, GATEWAY_CHANNEL);
    let ack = KnxIpFrame::TunnellingAck(TunnellingAck { channel_id: GATEWAY_CHANNEL, sequence_counter: req.sequence_counter, status: 0 });
    socket.send_to(&ack.encode(), from).await.expect("send TUNNELLING_ACK");
    req.cemi
}

/// Sends a gateway-originated TUNNELLING_REQUEST carrying `cemi` and waits
/// for the scanner's KNXnet/IP ack before returning.
async fn send_and_await_ack(socket: &UdpSocket, scanner: std::net::SocketAddr, gw_seq: &mut u8, cemi: CemiFrame) {
    let req = KnxIpFrame::TunnellingRequest(TunnellingRequest { channel_id: GATEWAY_CHANNEL, sequence_counter: *gw_seq, cemi });
    socket.send_to(&req.encode(), scanner).await.expect("send gateway TUNNELLING_REQUEST");
    let mut buf = vec![0u8; 576];
    loop {
        let (n, from) = socket.recv_from(&mut buf).await.expect("recv ack for gateway frame");
        if from != scanner {
            continue;
        }
        if let Ok(KnxIpFrame::TunnellingAck(ack)) = KnxIpFrame::parse(&buf[..n]) {
            if ack.sequence_counter == *gw_seq {
                break;
            }
        }
    }
    *gw_seq = gw_seq.wrapping_add(1);
}

/// Plays the device side of one Authorize_Request/Response round trip:
/// T_Ack for the scanner's request, a numbered Authorize_Response, then
/// the scanner's T_Ack for that response.
async fn answer_authorize(
    socket: &UdpSocket,
    scanner: std::net::SocketAddr,
    target: IndividualAddress,
    scanner_ia: IndividualAddress,
    gw_seq: &mut u8,
    device_seq: SeqNumber,
    level: u8,
) {
    let t_ack = CemiFrame::Data(DataFrame {
        message_code: MessageCode::LDataInd,
        additional_info: Vec::new(),
        control1: ControlField1 { raw: ControlField1::STANDARD_FRAME },
        control2: ControlField2::for_destination(Destination::Individual(scanner_ia), 6),
        source: target,
        destination: Destination::Individual(scanner_ia),
        tpci: Tpci::NumberedControl(device_seq, ControlCode::Ack),
        apci: None,
    });
    send_and_await_ack(socket, scanner, gw_seq, t_ack).await;

    let response = CemiFrame::Data(DataFrame {
        message_code: MessageCode::LDataInd,
        additional_info: Vec::new(),
        control1: ControlField1 { raw: ControlField1::STANDARD_FRAME },
        control2: ControlField2::for_destination(Destination::Individual(scanner_ia), 6),
        source: target,
        destination: Destination::Individual(scanner_ia),
        tpci: Tpci::NumberedData(device_seq),
        apci: Some(Apci::AuthorizeResponse { level }),
    });
    send_and_await_ack(socket, scanner, gw_seq, response).await;

    // The scanner T_Acks our numbered response in turn.
    let ack_frame = recv_and_ack(socket, scanner).await;
    match ack_frame {
        CemiFrame::Data(d) => assert_eq!(d.tpci, Tpci::NumberedControl(device_seq, ControlCode::Ack)),
        CemiFrame::Busmon(_) => panic!("expected data frame"),
    }
}

fn expect_control(frame: CemiFrame, code: ControlCode) {
    match frame {
        CemiFrame::Data(d) => assert_eq!(d.tpci, Tpci::UnnumberedControl(code)),
        CemiFrame::Busmon(_) => panic!("expected data frame"),
    }
}

fn is_authorize_request(frame: &CemiFrame, expected_key: u32) -> bool {
    matches!(
        frame,
        CemiFrame::Data(d) if matches!(d.apci, Some(Apci::AuthorizeRequest { key }) if key == expected_key)
    )
}

#[tokio::test(start_paused = true)]
async fn bruteforce_finds_key_and_toggles_connection_between_attempts() {
    let (gateway_socket, gateway_addr) = bind_loopback().await;
    let scanner_ia = IndividualAddress::new(1, 1, 5).unwrap();
    let target = IndividualAddress::new(1, 1, 20).unwrap();

    let gateway = tokio::spawn(async move {
        let scanner_addr = expect_connect_request(&gateway_socket, TunnelLayer::LinkLayer).await;
        let response = connect_response_ok(GATEWAY_CHANNEL, scanner_ia);
        gateway_socket.send_to(&response.encode(), scanner_addr).await.expect("send CONNECT_RESPONSE");

        let mut gw_seq: u8 = 0;
        let mut connect_count = 0u32;
        let mut disconnect_count = 0u32;

        // Initial T_Connect.
        expect_control(recv_and_ack(&gateway_socket, scanner_addr).await, ControlCode::Connect);
        connect_count += 1;

        // DeviceDescriptor_Read: never answered, left to time out.
        let _ = recv_and_ack(&gateway_socket, scanner_addr).await;

        // First Authorize_Request (key 0): rejected.
        let req = recv_and_ack(&gateway_socket, scanner_addr).await;
        assert!(is_authorize_request(&req, 0));
        answer_authorize(&gateway_socket, scanner_addr, target, scanner_ia, &mut gw_seq, SeqNumber::ZERO, 0).await;

        // T_Disconnect, then reconnect before the next key.
        expect_control(recv_and_ack(&gateway_socket, scanner_addr).await, ControlCode::Disconnect);
        disconnect_count += 1;
        expect_control(recv_and_ack(&gateway_socket, scanner_addr).await, ControlCode::Connect);
        connect_count += 1;

        // Second Authorize_Request (key 1): granted.
        let req = recv_and_ack(&gateway_socket, scanner_addr).await;
        assert!(is_authorize_request(&req, DEVICE_KEY));
        answer_authorize(&gateway_socket, scanner_addr, target, scanner_ia, &mut gw_seq, SeqNumber::ZERO, 2).await;

        // Memory/property/ADC probes on the now-authorized connection: all
        // left unanswered and allowed to time out.
        for _ in 0..(3 + 2 + 1) {
            let _ = recv_and_ack(&gateway_socket, scanner_addr).await;
        }

        // Final T_Disconnect from `probe_device`'s teardown.
        expect_control(recv_and_ack(&gateway_socket, scanner_addr).await, ControlCode::Disconnect);
        disconnect_count += 1;

        (connect_count, disconnect_count)
    });

    let local = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
    let mut session = TunnelSession::connect(local, gateway_addr, TunnelLayer::LinkLayer).await.expect("connect");

    let options = ProbeOptions { auth_key: 0, bruteforce_key: true };
    let result = probe_device(&mut session, target, &options).await.expect("probe succeeds");

    assert_eq!(result.auth_key_found, Some(DEVICE_KEY));
    assert_eq!(result.auth_level, Some(2));

    let (connect_count, disconnect_count) = gateway.await.expect("gateway task panicked");
    assert_eq!(connect_count, 2, "expected a T_Connect for the initial attempt and one reconnect");
    assert_eq!(disconnect_count, 2, "expected a T_Disconnect between attempts and one at final teardown");
}
