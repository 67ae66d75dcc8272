// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scenario 3 (spec §8): open a tunnel, send a GroupValueWrite, and observe
//! the gateway's `L_Data.con` echo acked back in turn.

use std::time::Duration;

use knx_scan_rs::{
    address::{GroupAddress, IndividualAddress},
    codec::{
        apci::Apci,
        cemi::{CemiFrame, ControlField1, ControlField2, DataFrame, Destination, MessageCode},
        cri::TunnelLayer,
        service::{KnxIpFrame, TunnellingAck, TunnellingRequest},
        tpci::Tpci,
    },
    session::TunnelSession,
};

use super::common::{bind_loopback, connect_response_ok, expect_connect_request};

const GATEWAY_CHANNEL: u8 = 7;

#[tokio::test]
async fn group_write_is_echoed_and_acked() {
    let (gateway_socket, gateway_addr) = bind_loopback().await;
    let scanner_ia = IndividualAddress::new(1, 1, 5).unwrap();
    let ga = GroupAddress::new_three_level(0, 0, 1).unwrap();

    let gateway = tokio::spawn(async move {
        let scanner_addr = expect_connect_request(&gateway_socket, TunnelLayer::LinkLayer).await;
        let response = connect_response_ok(GATEWAY_CHANNEL, scanner_ia);
        gateway_socket.send_to(&response.encode(), scanner_addr).await.expect("send CONNECT_RESPONSE");

        // Receive the GroupValueWrite TUNNELLING_REQUEST and ack it.
        let mut buf = vec![0u8; 576];
        let (n, from) = gateway_socket.recv_from(&mut buf).await.expect("recv TUNNELLING_REQUEST");
        let write = match KnxIpFrame::parse(&buf[..n]).expect("parse") {
            KnxIpFrame::TunnellingRequest(req) => req,
            other => panic!("expected TunnellingRequest, got {other:?}"),
        };
        assert_eq!(write.channel_id, GATEWAY_CHANNEL);
        assert_eq!(write.sequence_counter, 0);
        let CemiFrame::Data(data) = &write.cemi else { panic!("expected data frame") };
        assert_eq!(data.destination, Destination::Group(ga));
        let ack = KnxIpFrame::TunnellingAck(TunnellingAck { channel_id: GATEWAY_CHANNEL, sequence_counter: 0, status: 0 });
        gateway_socket.send_to(&ack.encode(), from).await.expect("send TUNNELLING_ACK");

        // Echo L_Data.con from the same source/destination pair.
        let con = CemiFrame::Data(DataFrame {
            message_code: MessageCode::LDataCon,
            additional_info: Vec::new(),
            control1: ControlField1 { raw: ControlField1::STANDARD_FRAME },
            control2: ControlField2::for_destination(Destination::Group(ga), 6),
            source: scanner_ia,
            destination: Destination::Group(ga),
            tpci: Tpci::UnnumberedData,
            apci: Some(Apci::GroupValueWrite { data: vec![0x01] }),
        });
        let echo = KnxIpFrame::TunnellingRequest(TunnellingRequest { channel_id: GATEWAY_CHANNEL, sequence_counter: 0, cemi: con });
        gateway_socket.send_to(&echo.encode(), from).await.expect("send L_Data.con");

        // The session must ack the echoed request in turn.
        let (n, _) = gateway_socket.recv_from(&mut buf).await.expect("recv echo TUNNELLING_ACK");
        match KnxIpFrame::parse(&buf[..n]).expect("parse") {
            KnxIpFrame::TunnellingAck(ack) => {
                assert_eq!(ack.channel_id, GATEWAY_CHANNEL);
                assert_eq!(ack.sequence_counter, 0);
            },
            other => panic!("expected TunnellingAck, got {other:?}"),
        }
    });

    let local = std::net::SocketAddrV4::new(std::net::Ipv4Addr::UNSPECIFIED, 0);
    let mut session = TunnelSession::connect(local, gateway_addr, TunnelLayer::LinkLayer).await.expect("connect");
    assert_eq!(session.channel_id, GATEWAY_CHANNEL);

    session.send_data(Destination::Group(ga), Apci::GroupValueWrite { data: vec![0x01] }).await.expect("send GroupValueWrite");
    assert_eq!(session.send_seq, 1);

    let frame = session.recv_frame(Duration::from_secs(1)).await.expect("recv_frame").expect("L_Data.con delivered");
    match frame {
        CemiFrame::Data(data) => {
            assert_eq!(data.message_code, MessageCode::LDataCon);
            assert_eq!(data.source, scanner_ia);
            assert_eq!(data.destination, Destination::Group(ga));
        },
        CemiFrame::Busmon(_) => panic!("expected data frame"),
    }
    assert_eq!(session.recv_seq, 1);

    gateway.await.expect("gateway task panicked");
}
