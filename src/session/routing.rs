// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing FSM (spec §4.8): connectionless multicast consumption of
//! `ROUTING_INDICATION`/`ROUTING_LOST_MESSAGE`. Unlike Tunnelling there is
//! no channel id, sequence counter, or keepalive — Routing is stateless
//! except for the lost-message tally it surfaces in the scan result.

use std::time::Duration;

use tracing::debug;

use crate::{
    codec::{cemi::CemiFrame, service::KnxIpFrame},
    error::ScanError,
    transport::MulticastEndpoint,
};

pub struct RoutingSession {
    endpoint: MulticastEndpoint,
    pub lost_message_count: u64,
}

impl RoutingSession {
    pub fn new(endpoint: MulticastEndpoint) -> Self {
        Self { endpoint, lost_message_count: 0 }
    }

    /// Waits up to `timeout` for the next bus frame carried by a
    /// `ROUTING_INDICATION`; `ROUTING_LOST_MESSAGE` frames are tallied and
    /// skipped rather than returned.
    pub async fn recv_frame(&mut self, timeout: Duration) -> Result<Option<CemiFrame>, ScanError> {
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
            match KnxIpFrame::parse(&datagram) {
                Ok(KnxIpFrame::RoutingIndication(ind)) => return Ok(Some(ind.cemi)),
                Ok(KnxIpFrame::RoutingLostMessage(msg)) => {
                    self.lost_message_count += msg.lost_message_count as u64;
                    debug!(%from, total = self.lost_message_count, "ROUTING_LOST_MESSAGE");
                },
                Ok(_) => {},
                Err(e) => debug!(%from, error = %e, "dropping undecodable routing frame"),
            }
        }
    }
}
