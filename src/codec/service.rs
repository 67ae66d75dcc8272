// SPDX-License-Identifier: MIT OR Apache-2.0

//! Top-level KNXnet/IP frame: header + one of the 14 service bodies
//! (spec §4.1, §4.3, §4.4, §4.6, §4.8).

use crate::{
    codec::{
        cemi::CemiFrame,
        cri::{Cri, Crd},
        dib::Dib,
        header::{Header, ServiceId, HEADER_LEN},
        hpai::Hpai,
    },
    error::ScanError,
};

const CONNECTION_HEADER_LEN: usize = 4;

/// `CONNECT_RESPONSE` / `CONNECTIONSTATE_RESPONSE` / `DISCONNECT_RESPONSE`
/// status byte; `0x00` means success.
pub const STATUS_NO_ERROR: u8 = 0x00;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub discovery_endpoint: Hpai,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResponse {
    pub control_endpoint: Hpai,
    pub dibs: Vec<Dib>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionRequest {
    pub control_endpoint: Hpai,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionResponse {
    pub dibs: Vec<Dib>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub control_endpoint: Hpai,
    pub data_endpoint: Hpai,
    pub cri: Cri,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectResponse {
    pub channel_id: u8,
    pub status: u8,
    /// Present only on success; the gateway's own error responses omit
    /// the data endpoint and CRD (spec §4.3).
    pub data_endpoint: Option<Hpai>,
    pub crd: Option<Crd>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStateRequest {
    pub channel_id: u8,
    pub control_endpoint: Hpai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStateResponse {
    pub channel_id: u8,
    pub status: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectRequest {
    pub channel_id: u8,
    pub control_endpoint: Hpai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectResponse {
    pub channel_id: u8,
    pub status: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnellingRequest {
    pub channel_id: u8,
    pub sequence_counter: u8,
    pub cemi: CemiFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunnellingAck {
    pub channel_id: u8,
    pub sequence_counter: u8,
    pub status: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingIndication {
    pub cemi: CemiFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingLostMessage {
    pub device_state: u8,
    pub lost_message_count: u16,
}

/// Every KNXnet/IP service this crate speaks, tagged by its header's
/// service identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnxIpFrame {
    SearchRequest(SearchRequest),
    SearchResponse(SearchResponse),
    DescriptionRequest(DescriptionRequest),
    DescriptionResponse(DescriptionResponse),
    ConnectRequest(ConnectRequest),
    ConnectResponse(ConnectResponse),
    ConnectionStateRequest(ConnectionStateRequest),
    ConnectionStateResponse(ConnectionStateResponse),
    DisconnectRequest(DisconnectRequest),
    DisconnectResponse(DisconnectResponse),
    TunnellingRequest(TunnellingRequest),
    TunnellingAck(TunnellingAck),
    RoutingIndication(RoutingIndication),
    RoutingLostMessage(RoutingLostMessage),
}

fn connection_header(body: &[u8]) -> Result<(u8, u8, &[u8]), ScanError> {
    if body.len() < CONNECTION_HEADER_LEN {
        return Err(ScanError::decode(HEADER_LEN, "truncated connection header"));
    }
    if body[0] != CONNECTION_HEADER_LEN as u8 {
        return Err(ScanError::decode(HEADER_LEN, "connection header length must be 4"));
    }
    Ok((body[1], body[2], &body[CONNECTION_HEADER_LEN..]))
}

fn encode_connection_header(channel_id: u8, field3: u8, out: &mut Vec<u8>) {
    out.push(CONNECTION_HEADER_LEN as u8);
    out.push(channel_id);
    out.push(field3);
    out.push(0);
}

impl KnxIpFrame {
    pub fn parse(datagram: &[u8]) -> Result<Self, ScanError> {
        let (header, body) = Header::parse(datagram)?;
        Ok(match header.service {
            ServiceId::SearchRequest => {
                let (hpai, _) = Hpai::parse(body)?;
                KnxIpFrame::SearchRequest(SearchRequest { discovery_endpoint: hpai })
            },
            ServiceId::SearchResponse => {
                let (hpai, rest) = Hpai::parse(body)?;
                KnxIpFrame::SearchResponse(SearchResponse { control_endpoint: hpai, dibs: Dib::parse_all(rest)? })
            },
            ServiceId::DescriptionRequest => {
                let (hpai, _) = Hpai::parse(body)?;
                KnxIpFrame::DescriptionRequest(DescriptionRequest { control_endpoint: hpai })
            },
            ServiceId::DescriptionResponse => {
                KnxIpFrame::DescriptionResponse(DescriptionResponse { dibs: Dib::parse_all(body)? })
            },
            ServiceId::ConnectRequest => {
                let (control_endpoint, rest) = Hpai::parse(body)?;
                let (data_endpoint, rest) = Hpai::parse(rest)?;
                let (cri, _) = Cri::parse(rest)?;
                KnxIpFrame::ConnectRequest(ConnectRequest { control_endpoint, data_endpoint, cri })
            },
            ServiceId::ConnectResponse => {
                if body.len() < 2 {
                    return Err(ScanError::decode(HEADER_LEN, "truncated CONNECT_RESPONSE"));
                }
                let channel_id = body[0];
                let status = body[1];
                let rest = &body[2..];
                let (data_endpoint, crd) = if status == STATUS_NO_ERROR && !rest.is_empty() {
                    let (hpai, rest) = Hpai::parse(rest)?;
                    let (crd, _) = Crd::parse(rest)?;
                    (Some(hpai), Some(crd))
                } else {
                    (None, None)
                };
                KnxIpFrame::ConnectResponse(ConnectResponse { channel_id, status, data_endpoint, crd })
            },
            ServiceId::ConnectionStateRequest => {
                if body.len() < 2 {
                    return Err(ScanError::decode(HEADER_LEN, "truncated CONNECTIONSTATE_REQUEST"));
                }
                let channel_id = body[0];
                let (control_endpoint, _) = Hpai::parse(&body[2..])?;
                KnxIpFrame::ConnectionStateRequest(ConnectionStateRequest { channel_id, control_endpoint })
            },
            ServiceId::ConnectionStateResponse => {
                if body.len() < 2 {
                    return Err(ScanError::decode(HEADER_LEN, "truncated CONNECTIONSTATE_RESPONSE"));
                }
                KnxIpFrame::ConnectionStateResponse(ConnectionStateResponse { channel_id: body[0], status: body[1] })
            },
            ServiceId::DisconnectRequest => {
                if body.len() < 2 {
                    return Err(ScanError::decode(HEADER_LEN, "truncated DISCONNECT_REQUEST"));
                }
                let channel_id = body[0];
                let (control_endpoint, _) = Hpai::parse(&body[2..])?;
                KnxIpFrame::DisconnectRequest(DisconnectRequest { channel_id, control_endpoint })
            },
            ServiceId::DisconnectResponse => {
                if body.len() < 2 {
                    return Err(ScanError::decode(HEADER_LEN, "truncated DISCONNECT_RESPONSE"));
                }
                KnxIpFrame::DisconnectResponse(DisconnectResponse { channel_id: body[0], status: body[1] })
            },
            ServiceId::TunnellingRequest => {
                let (channel_id, sequence_counter, rest) = connection_header(body)?;
                let cemi = CemiFrame::parse(rest)?;
                KnxIpFrame::TunnellingRequest(TunnellingRequest { channel_id, sequence_counter, cemi })
            },
            ServiceId::TunnellingAck => {
                let (channel_id, sequence_counter, rest) = connection_header(body)?;
                let status = rest.first().copied().unwrap_or(STATUS_NO_ERROR);
                KnxIpFrame::TunnellingAck(TunnellingAck { channel_id, sequence_counter, status })
            },
            ServiceId::RoutingIndication => {
                KnxIpFrame::RoutingIndication(RoutingIndication { cemi: CemiFrame::parse(body)? })
            },
            ServiceId::RoutingLostMessage => {
                if body.len() < 4 {
                    return Err(ScanError::decode(HEADER_LEN, "truncated ROUTING_LOST_MESSAGE"));
                }
                KnxIpFrame::RoutingLostMessage(RoutingLostMessage {
                    device_state: body[1],
                    lost_message_count: u16::from_be_bytes([body[2], body[3]]),
                })
            },
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        let service = match self {
            KnxIpFrame::SearchRequest(req) => {
                req.discovery_endpoint.encode(&mut body);
                ServiceId::SearchRequest
            },
            KnxIpFrame::SearchResponse(resp) => {
                resp.control_endpoint.encode(&mut body);
                for dib in &resp.dibs {
                    dib.encode(&mut body);
                }
                ServiceId::SearchResponse
            },
            KnxIpFrame::DescriptionRequest(req) => {
                req.control_endpoint.encode(&mut body);
                ServiceId::DescriptionRequest
            },
            KnxIpFrame::DescriptionResponse(resp) => {
                for dib in &resp.dibs {
                    dib.encode(&mut body);
                }
                ServiceId::DescriptionResponse
            },
            KnxIpFrame::ConnectRequest(req) => {
                req.control_endpoint.encode(&mut body);
                req.data_endpoint.encode(&mut body);
                req.cri.encode(&mut body);
                ServiceId::ConnectRequest
            },
            KnxIpFrame::ConnectResponse(resp) => {
                body.push(resp.channel_id);
                body.push(resp.status);
                if let (Some(hpai), Some(crd)) = (&resp.data_endpoint, &resp.crd) {
                    hpai.encode(&mut body);
                    crd.encode(&mut body);
                }
                ServiceId::ConnectResponse
            },
            KnxIpFrame::ConnectionStateRequest(req) => {
                body.push(req.channel_id);
                body.push(0);
                req.control_endpoint.encode(&mut body);
                ServiceId::ConnectionStateRequest
            },
            KnxIpFrame::ConnectionStateResponse(resp) => {
                body.push(resp.channel_id);
                body.push(resp.status);
                ServiceId::ConnectionStateResponse
            },
            KnxIpFrame::DisconnectRequest(req) => {
                body.push(req.channel_id);
                body.push(0);
                req.control_endpoint.encode(&mut body);
                ServiceId::DisconnectRequest
            },
            KnxIpFrame::DisconnectResponse(resp) => {
                body.push(resp.channel_id);
                body.push(resp.status);
                ServiceId::DisconnectResponse
            },
            KnxIpFrame::TunnellingRequest(req) => {
                encode_connection_header(req.channel_id, req.sequence_counter, &mut body);
                body.extend_from_slice(&req.cemi.encode());
                ServiceId::TunnellingRequest
            },
            KnxIpFrame::TunnellingAck(ack) => {
                encode_connection_header(ack.channel_id, ack.sequence_counter, &mut body);
                // Reuse the reserved byte the connection header already
                // pushed as the status field (spec §4.1: ack body is
                // exactly the 4-byte connection header).
                let idx = body.len() - 1;
                body[idx] = ack.status;
                ServiceId::TunnellingAck
            },
            KnxIpFrame::RoutingIndication(ind) => {
                body.extend_from_slice(&ind.cemi.encode());
                ServiceId::RoutingIndication
            },
            KnxIpFrame::RoutingLostMessage(msg) => {
                body.push(0);
                body.push(msg.device_state);
                body.extend_from_slice(&msg.lost_message_count.to_be_bytes());
                ServiceId::RoutingLostMessage
            },
        };
        let mut out = Vec::new();
        Header::encode(service, body.len(), &mut out);
        out.extend_from_slice(&body);
        out
    }
}
