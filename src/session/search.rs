// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multicast gateway discovery (spec §4.2 "Search FSM").

use std::{net::SocketAddr, time::Duration};

use tracing::{debug, warn};

use crate::{
    codec::{
        dib::Dib,
        hpai::Hpai,
        service::{KnxIpFrame, SearchRequest, SearchResponse},
    },
    error::ScanError,
    transport::MulticastEndpoint,
};

/// A single gateway discovered via SEARCH_REQUEST/SEARCH_RESPONSE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredGateway {
    pub endpoint: SocketAddr,
    pub name: Option<String>,
    pub individual_address: Option<crate::address::IndividualAddress>,
}

/// Broadcasts one SEARCH_REQUEST on `endpoint` and collects every
/// well-formed SEARCH_RESPONSE that arrives within `timeout`.
pub async fn search(endpoint: &MulticastEndpoint, timeout: Duration) -> Result<Vec<DiscoveredGateway>, ScanError> {
    let local = endpoint.local_addr()?;
    let SocketAddr::V4(local_v4) = local else {
        return Err(ScanError::protocol("multicast endpoint is not IPv4"));
    };

    let request = KnxIpFrame::SearchRequest(SearchRequest { discovery_endpoint: Hpai::new(local_v4) });
    endpoint.send_to_group(&request.encode()).await?;
    debug!(%local, "sent SEARCH_REQUEST");

    let mut gateways = Vec::new();
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        let recv = tokio::time::timeout(remaining, endpoint.recv_from()).await;
        let (datagram, from) = match recv {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                warn!(error = %e, "search transport error");
                continue;
            },
            Err(_) => break,
        };

        match KnxIpFrame::parse(&datagram) {
            Ok(KnxIpFrame::SearchResponse(SearchResponse { control_endpoint, dibs })) => {
                gateways.push(gateway_from_response(from, control_endpoint, &dibs));
            },
            Ok(_) => {},
            Err(e) => {
                debug!(%from, error = %e, "dropping undecodable SEARCH response");
            },
        }
    }

    Ok(gateways)
}

fn gateway_from_response(from: SocketAddr, control_endpoint: Hpai, dibs: &[Dib]) -> DiscoveredGateway {
    let mut name = None;
    let mut individual_address = None;
    for dib in dibs {
        if let Dib::DeviceInfo(info) = dib {
            name = Some(info.friendly_name.clone());
            individual_address = Some(info.individual_address);
        }
    }
    let endpoint = SocketAddr::V4(control_endpoint.addr);
    let endpoint = if endpoint.port() == 0 { from } else { endpoint };
    DiscoveredGateway { endpoint, name, individual_address }
}
