// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway description with bounded retries (spec §4.2 "Description FSM").

use std::{net::SocketAddr, time::Duration};

use tracing::debug;

use crate::{
    codec::{
        dib::Dib,
        hpai::Hpai,
        service::{DescriptionRequest, DescriptionResponse, KnxIpFrame},
    },
    error::ScanError,
    transport::UnicastEndpoint,
};

/// Sends DESCRIPTION_REQUEST to `target`, retrying up to `retries` times
/// with `timeout` between attempts, and returns the DIBs from the first
/// well-formed response (spec §8 scenario 2).
pub async fn describe(
    endpoint: &UnicastEndpoint,
    target: SocketAddr,
    timeout: Duration,
    retries: u32,
) -> Result<Vec<Dib>, ScanError> {
    let local = endpoint.local_addr()?;
    let SocketAddr::V4(local_v4) = local else {
        return Err(ScanError::protocol("unicast endpoint is not IPv4"));
    };
    let request = KnxIpFrame::DescriptionRequest(DescriptionRequest { control_endpoint: Hpai::new(local_v4) });
    let frame = request.encode();

    let mut attempts = 0;
    loop {
        attempts += 1;
        endpoint.send_to(&frame, target).await?;
        debug!(%target, attempt = attempts, "sent DESCRIPTION_REQUEST");

        match tokio::time::timeout(timeout, recv_response(endpoint, target)).await {
            Ok(Ok(dibs)) => return Ok(dibs),
            Ok(Err(e)) => return Err(e),
            Err(_) if attempts >= retries => {
                return Err(ScanError::timeout(format!("DESCRIPTION_RESPONSE from {target}")));
            },
            Err(_) => continue,
        }
    }
}

async fn recv_response(endpoint: &UnicastEndpoint, target: SocketAddr) -> Result<Vec<Dib>, ScanError> {
    loop {
        let (datagram, from) = endpoint.recv_from().await?;
        if from != target {
            continue;
        }
        match KnxIpFrame::parse(&datagram) {
            Ok(KnxIpFrame::DescriptionResponse(DescriptionResponse { dibs })) => return Ok(dibs),
            Ok(_) => continue,
            Err(e) => {
                debug!(%from, error = %e, "dropping undecodable DESCRIPTION response");
                continue;
            },
        }
    }
}
