// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tunnelling connection FSM (spec §4.3): `Idle -> Connecting -> Active ->
//! Disconnecting -> Closed`, with `Failed` reachable from any non-terminal
//! state. Owns the sequenced TUNNELLING_REQUEST/TUNNELLING_ACK protocol and
//! the connection keepalive.

use std::{
    collections::VecDeque,
    net::{SocketAddr, SocketAddrV4},
    time::Duration,
};

use tracing::{debug, warn};

use crate::{
    address::IndividualAddress,
    codec::{
        cemi::{CemiFrame, ControlField1, ControlField2, DataFrame, Destination, MessageCode},
        cri::{Cri, Crd, TunnelLayer},
        hpai::Hpai,
        service::{
            ConnectRequest, ConnectResponse, ConnectionStateRequest, ConnectionStateResponse, DisconnectRequest,
            DisconnectResponse, KnxIpFrame, TunnellingAck, TunnellingRequest, STATUS_NO_ERROR,
        },
        tpci::Tpci,
    },
    error::{ConnectError, ScanError},
    session::common::SessionState,
    transport::UnicastEndpoint,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const ACK_TIMEOUT: Duration = Duration::from_secs(1);
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(50);
const KEEPALIVE_RETRY_TIMEOUT: Duration = Duration::from_secs(10);
const KEEPALIVE_RETRIES: u32 = 3;
/// Consecutive undecodable inbound frames before the session tears itself
/// down (spec §7: "a counter triggers teardown after 5 consecutive
/// malformed frames").
const MAX_CONSECUTIVE_MALFORMED: u32 = 5;

pub struct TunnelSession {
    endpoint: UnicastEndpoint,
    gateway: SocketAddr,
    pub channel_id: u8,
    pub send_seq: u8,
    pub recv_seq: u8,
    pub individual_address: IndividualAddress,
    pub state: SessionState,
    pending: VecDeque<CemiFrame>,
    last_keepalive: tokio::time::Instant,
    consecutive_malformed: u32,
}

impl TunnelSession {
    /// Opens a tunnelling connection to `gateway` on the given KNX layer
    /// (spec §4.3). On a non-zero status, maps to `ConnectError` except for
    /// the BUSMONITOR/`E_CONNECTION_OPTION` combination, which is reported
    /// with spec's exact diagnostic text (scenario 4).
    pub async fn connect(
        local_addr: SocketAddrV4,
        gateway: SocketAddr,
        layer: TunnelLayer,
    ) -> Result<Self, ScanError> {
        let endpoint = UnicastEndpoint::bind(local_addr).await?;
        let local = endpoint.local_addr()?;
        let SocketAddr::V4(local_v4) = local else {
            return Err(ScanError::protocol("unicast endpoint is not IPv4"));
        };
        let hpai = Hpai::new(local_v4);

        let request = KnxIpFrame::ConnectRequest(ConnectRequest {
            control_endpoint: hpai,
            data_endpoint: hpai,
            cri: Cri::Tunnel(layer),
        });
        endpoint.send_to(&request.encode(), gateway).await?;
        debug!(%gateway, ?layer, "sent CONNECT_REQUEST");

        let response = loop {
            let (datagram, from) = tokio::time::timeout(CONNECT_TIMEOUT, endpoint.recv_from())
                .await
                .map_err(|_| ScanError::timeout("CONNECT_RESPONSE"))??;
            if from != gateway {
                continue;
            }
            match KnxIpFrame::parse(&datagram) {
                Ok(KnxIpFrame::ConnectResponse(resp)) => break resp,
                Ok(_) => continue,
                Err(e) => {
                    debug!(%from, error = %e, "dropping undecodable CONNECT response");
                    continue;
                },
            }
        };

        if response.status != STATUS_NO_ERROR {
            if layer == TunnelLayer::BusMonitor && response.status == 0x23 {
                return Err(ScanError::protocol("device does not support bus monitor; try group monitor"));
            }
            let err = ConnectError::from_status(response.status)
                .expect("non-zero status always maps to a ConnectError variant");
            return Err(ScanError::Connect(err));
        }

        let Some(Crd::Tunnel(individual_address)) = response.crd else {
            return Err(ScanError::protocol("CONNECT_RESPONSE missing tunnel CRD"));
        };

        Ok(TunnelSession {
            endpoint,
            gateway,
            channel_id: response.channel_id,
            send_seq: 0,
            recv_seq: 0,
            individual_address,
            state: SessionState::Active,
            pending: VecDeque::new(),
            last_keepalive: tokio::time::Instant::now(),
            consecutive_malformed: 0,
        })
    }

    /// Runs one CONNECTIONSTATE keepalive round if `KEEPALIVE_INTERVAL` has
    /// elapsed since the last one, otherwise does nothing. Called
    /// opportunistically between probe/monitor steps rather than on its own
    /// task, since every socket read on this session already happens on a
    /// single cooperative loop.
    pub async fn maintain(&mut self) -> Result<(), ScanError> {
        if self.last_keepalive.elapsed() < KEEPALIVE_INTERVAL {
            return Ok(());
        }
        self.last_keepalive = tokio::time::Instant::now();
        if !self.send_connectionstate_request().await? {
            self.state = SessionState::Failed;
            return Err(ScanError::timeout("CONNECTIONSTATE_RESPONSE"));
        }
        Ok(())
    }

    /// Builds and sends an `L_Data.req` with the given destination/APCI,
    /// blocking until the gateway's TUNNELLING_ACK for it arrives.
    pub async fn send_data(
        &mut self,
        destination: Destination,
        apci: crate::codec::apci::Apci,
    ) -> Result<(), ScanError> {
        let cemi = CemiFrame::Data(DataFrame {
            message_code: MessageCode::LDataReq,
            additional_info: Vec::new(),
            control1: ControlField1 { raw: ControlField1::STANDARD_FRAME },
            control2: ControlField2::for_destination(destination, 6),
            source: self.individual_address,
            destination,
            tpci: Tpci::UnnumberedData,
            apci: Some(apci),
        });
        self.send_and_ack(cemi).await
    }

    /// Sends a fully-built cEMI frame (used by the transport layer to
    /// address raw TPCI control/numbered-data frames) and waits for the
    /// gateway's TUNNELLING_ACK.
    pub async fn send_cemi(&mut self, cemi: CemiFrame) -> Result<(), ScanError> {
        self.send_and_ack(cemi).await
    }

    /// Sends `cemi` as a TUNNELLING_REQUEST and waits for its ack, retrying
    /// the send once on ack timeout before treating the link as failed
    /// (spec §4.3: "arm ack timeout (1 s), retry up to 1 time on timeout,
    /// then treat as link failure").
    async fn send_and_ack(&mut self, cemi: CemiFrame) -> Result<(), ScanError> {
        let seq = self.send_seq;
        let request = KnxIpFrame::TunnellingRequest(TunnellingRequest { channel_id: self.channel_id, sequence_counter: seq, cemi });
        let bytes = request.encode();

        for attempt in 0..2 {
            self.endpoint.send_to(&bytes, self.gateway).await?;
            match self.await_tunnelling_ack(seq).await {
                Ok(()) => return Ok(()),
                Err(ScanError::Timeout(_)) if attempt == 0 => {
                    warn!(channel_id = self.channel_id, seq, "TUNNELLING_ACK timed out, retrying once");
                    continue;
                },
                Err(e) => {
                    self.state = SessionState::Failed;
                    return Err(e);
                },
            }
        }
        self.state = SessionState::Failed;
        Err(ScanError::timeout("TUNNELLING_ACK"))
    }

    async fn await_tunnelling_ack(&mut self, seq: u8) -> Result<(), ScanError> {
        loop {
            let (datagram, from) = tokio::time::timeout(ACK_TIMEOUT, self.endpoint.recv_from())
                .await
                .map_err(|_| ScanError::timeout("TUNNELLING_ACK"))??;
            if from != self.gateway {
                continue;
            }
            match KnxIpFrame::parse(&datagram) {
                Ok(KnxIpFrame::TunnellingAck(TunnellingAck { channel_id, sequence_counter, .. })) if channel_id == self.channel_id => {
                    self.consecutive_malformed = 0;
                    if sequence_counter == seq {
                        self.send_seq = self.send_seq.wrapping_add(1);
                        return Ok(());
                    }
                    // stale ack for a different in-flight frame; ignore.
                },
                Ok(KnxIpFrame::TunnellingRequest(req)) if req.channel_id == self.channel_id => {
                    self.consecutive_malformed = 0;
                    self.handle_incoming_request(req).await?;
                },
                Ok(_) => self.consecutive_malformed = 0,
                Err(e) => {
                    debug!(%from, error = %e, "dropping undecodable frame while awaiting ack");
                    self.note_malformed()?;
                },
            }
        }
    }

    /// Tracks a just-dropped undecodable frame, tearing the session down
    /// once `MAX_CONSECUTIVE_MALFORMED` have arrived back to back.
    fn note_malformed(&mut self) -> Result<(), ScanError> {
        self.consecutive_malformed += 1;
        if self.consecutive_malformed >= MAX_CONSECUTIVE_MALFORMED {
            self.state = SessionState::Failed;
            return Err(ScanError::protocol("too many consecutive malformed frames; tearing down session"));
        }
        Ok(())
    }

    /// Acks and (unless it is a duplicate of the previous request) delivers
    /// an inbound TUNNELLING_REQUEST (spec §8 universal properties: every
    /// request with `seq ∈ {recv_seq, recv_seq-1}` gets exactly one ack; a
    /// duplicate is re-acked but never re-delivered).
    async fn handle_incoming_request(&mut self, req: TunnellingRequest) -> Result<(), ScanError> {
        let expected = self.recv_seq;
        let is_duplicate = req.sequence_counter == expected.wrapping_sub(1);

        if req.sequence_counter == expected {
            self.ack(req.sequence_counter).await?;
            self.recv_seq = self.recv_seq.wrapping_add(1);
            self.pending.push_back(req.cemi);
            Ok(())
        } else if is_duplicate {
            self.ack(req.sequence_counter).await
        } else {
            Err(ScanError::protocol(format!(
                "unexpected TUNNELLING_REQUEST seq {} (expected {expected})",
                req.sequence_counter
            )))
        }
    }

    async fn ack(&self, sequence_counter: u8) -> Result<(), ScanError> {
        let ack = KnxIpFrame::TunnellingAck(TunnellingAck { channel_id: self.channel_id, sequence_counter, status: STATUS_NO_ERROR });
        self.endpoint.send_to(&ack.encode(), self.gateway).await
    }

    /// Returns the next delivered `cEMI` frame (from the internal queue or
    /// the socket), waiting up to `timeout`.
    pub async fn recv_frame(&mut self, timeout: Duration) -> Result<Option<CemiFrame>, ScanError> {
        if let Some(frame) = self.pending.pop_front() {
            return Ok(Some(frame));
        }
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            let recv = tokio::time::timeout(remaining, self.endpoint.recv_from()).await;
            let (datagram, from) = match recv {
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) => return Err(e),
                Err(_) => return Ok(None),
            };
            if from != self.gateway {
                continue;
            }
            match KnxIpFrame::parse(&datagram) {
                Ok(KnxIpFrame::TunnellingRequest(req)) if req.channel_id == self.channel_id => {
                    self.consecutive_malformed = 0;
                    self.handle_incoming_request(req).await?;
                    if let Some(frame) = self.pending.pop_front() {
                        return Ok(Some(frame));
                    }
                },
                Ok(_) => self.consecutive_malformed = 0,
                Err(e) => {
                    debug!(%from, error = %e, "dropping undecodable frame");
                    self.note_malformed()?;
                },
            }
        }
    }

    /// Sends a CONNECTIONSTATE_REQUEST, retrying up to `KEEPALIVE_RETRIES`
    /// times at `KEEPALIVE_RETRY_TIMEOUT` before giving up (spec §8
    /// scenario 5).
    async fn send_connectionstate_request(&mut self) -> Result<bool, ScanError> {
        let local = self.endpoint.local_addr()?;
        let SocketAddr::V4(local_v4) = local else {
            return Err(ScanError::protocol("unicast endpoint is not IPv4"));
        };
        let request = KnxIpFrame::ConnectionStateRequest(ConnectionStateRequest {
            channel_id: self.channel_id,
            control_endpoint: Hpai::new(local_v4),
        });
        let frame = request.encode();

        for attempt in 1..=KEEPALIVE_RETRIES {
            self.endpoint.send_to(&frame, self.gateway).await?;
            match tokio::time::timeout(KEEPALIVE_RETRY_TIMEOUT, self.await_connectionstate_response()).await {
                Ok(Ok(true)) => return Ok(true),
                Ok(Ok(false)) | Ok(Err(_)) => continue,
                Err(_) => {
                    warn!(channel_id = self.channel_id, attempt, "CONNECTIONSTATE_REQUEST timed out");
                    continue;
                },
            }
        }
        Ok(false)
    }

    async fn await_connectionstate_response(&mut self) -> Result<bool, ScanError> {
        loop {
            let (datagram, from) = self.endpoint.recv_from().await?;
            if from != self.gateway {
                continue;
            }
            match KnxIpFrame::parse(&datagram) {
                Ok(KnxIpFrame::ConnectionStateResponse(ConnectionStateResponse { channel_id, status }))
                    if channel_id == self.channel_id =>
                {
                    self.consecutive_malformed = 0;
                    return Ok(status == STATUS_NO_ERROR);
                },
                Ok(KnxIpFrame::TunnellingRequest(req)) if req.channel_id == self.channel_id => {
                    self.consecutive_malformed = 0;
                    self.handle_incoming_request(req).await?;
                },
                Ok(_) => self.consecutive_malformed = 0,
                Err(e) => {
                    debug!(%from, error = %e, "dropping undecodable frame while awaiting keepalive response");
                    self.note_malformed()?;
                },
            }
        }
    }

    /// Sends DISCONNECT_REQUEST and waits briefly for the response,
    /// transitioning to `Closed` regardless (a silent gateway should not
    /// block teardown).
    pub async fn disconnect(&mut self) -> Result<(), ScanError> {
        self.state = SessionState::Disconnecting;
        let local = self.endpoint.local_addr()?;
        let SocketAddr::V4(local_v4) = local else {
            return Err(ScanError::protocol("unicast endpoint is not IPv4"));
        };
        let request = KnxIpFrame::DisconnectRequest(DisconnectRequest {
            channel_id: self.channel_id,
            control_endpoint: Hpai::new(local_v4),
        });
        self.endpoint.send_to(&request.encode(), self.gateway).await?;

        let wait = async {
            loop {
                let (datagram, from) = self.endpoint.recv_from().await?;
                if from != self.gateway {
                    continue;
                }
                if let Ok(KnxIpFrame::DisconnectResponse(DisconnectResponse { channel_id, .. })) = KnxIpFrame::parse(&datagram) {
                    if channel_id == self.channel_id {
                        return Ok::<(), ScanError>(());
                    }
                }
            }
        };
        let _ = tokio::time::timeout(ACK_TIMEOUT, wait).await;
        self.state = SessionState::Closed;
        Ok(())
    }
}
