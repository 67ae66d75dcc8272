// SPDX-License-Identifier: MIT OR Apache-2.0

//! The scanner: fans a `ScanConfig` out into one task per target, bounded
//! by a `Semaphore`-gated worker pool (spec §4.6).

use std::{collections::VecDeque, net::SocketAddr, sync::Arc, time::Duration};

use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    address::IndividualAddress,
    bus::{self, ProbeOptions},
    cfg::{config::ScanConfig, enums::BusMode},
    codec::{
        cemi::{CemiFrame, MessageCode},
        cri::TunnelLayer,
    },
    error::ScanError,
    monitor::MonitorSink,
    session::{self, DiscoveredGateway, RoutingSession, TunnelSession},
    transport::{MulticastEndpoint, UnicastEndpoint},
};

use super::results::{BusTargetResult, TargetResult};

const DESCRIBE_LOCAL: std::net::SocketAddrV4 = std::net::SocketAddrV4::new(std::net::Ipv4Addr::UNSPECIFIED, 0);
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);
const MONITOR_POLL_TIMEOUT: Duration = Duration::from_secs(1);

pub struct Scanner {
    config: ScanConfig,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Runs the full scan: optional multicast discovery, then one
    /// concurrently-bounded task per target.
    pub async fn run(&self, cancellation: CancellationToken) -> Result<Vec<TargetResult>, ScanError> {
        let mut targets = self.config.targets.clone();

        if self.config.search {
            let discovered = self.run_search().await?;
            for gw in discovered {
                if !targets.contains(&gw.endpoint) {
                    targets.push(gw.endpoint);
                }
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let mut handles = Vec::with_capacity(targets.len());

        for target in targets {
            let semaphore = semaphore.clone();
            let config = self.config.clone();
            let cancellation = cancellation.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                scan_target(target, &config, &cancellation).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => warn!(error = %e, "scan task panicked"),
            }
        }
        Ok(results)
    }

    async fn run_search(&self) -> Result<Vec<DiscoveredGateway>, ScanError> {
        let interface = self
            .config
            .interface
            .as_ref()
            .ok_or_else(|| ScanError::config("--search requires --interface"))?;
        let addr: std::net::Ipv4Addr = interface
            .parse()
            .map_err(|_| ScanError::config(format!("--interface must be an IPv4 address, got \"{interface}\"")))?;
        let endpoint = MulticastEndpoint::join(addr).await?;
        let gateways = session::search(&endpoint, self.config.search_timeout).await?;
        info!(count = gateways.len(), "SEARCH discovered gateways");
        Ok(gateways)
    }
}

async fn scan_target(target: SocketAddr, config: &ScanConfig, cancellation: &CancellationToken) -> TargetResult {
    let mut result = TargetResult::ok(target);

    let describe_endpoint = match UnicastEndpoint::bind(DESCRIBE_LOCAL).await {
        Ok(ep) => ep,
        Err(e) => return TargetResult::failed(target, e.to_string()),
    };

    match session::describe(&describe_endpoint, target, config.desc_timeout, config.desc_retries).await {
        Ok(dibs) => result.description = dibs,
        Err(e) => return TargetResult::failed(target, e.to_string()),
    }
    drop(describe_endpoint);

    let Some(bus_mode) = config.bus_mode.or(config.routing.then_some(BusMode::GroupMonitor)) else {
        return result;
    };
    if config.routing {
        return run_routing(target, config, cancellation, result).await;
    }

    let layer = if bus_mode == BusMode::Monitor { TunnelLayer::BusMonitor } else { TunnelLayer::LinkLayer };
    let mut session = match TunnelSession::connect(DESCRIBE_LOCAL, target, layer).await {
        Ok(session) => session,
        Err(e) => return TargetResult::failed(target, e.to_string()),
    };
    result.tunnel_channel = Some(session.channel_id);

    let mut session = match bus_mode {
        BusMode::Info => run_bus_info(session, config, &mut result).await,
        BusMode::GroupWrite => {
            run_group_write(&mut session, config, &mut result).await;
            session
        },
        BusMode::Monitor | BusMode::GroupMonitor => {
            run_tunnel_monitor(&mut session, cancellation, &mut result).await;
            session
        },
    };

    let grace = tokio::time::timeout(DISCONNECT_GRACE, session.disconnect()).await;
    if grace.is_err() {
        warn!(%target, "tunnel did not close within the disconnect grace period");
    }

    result
}

/// Probes every address in `config.bus_targets` through a bounded queue of
/// `config.workers` logical probes (spec §4.6 step 3). Probes fairly
/// contend for the tunnel's single in-flight slot through a `tokio::sync::
/// Mutex` (itself backed by a FIFO-fair semaphore), so `workers` bounds how
/// many probes are logically in flight — awaiting their turn or their own
/// per-probe timeout — while actual wire traffic stays serialized onto the
/// one open tunnel.
async fn run_bus_info(session: TunnelSession, config: &ScanConfig, result: &mut TargetResult) -> TunnelSession {
    let Some(range) = &config.bus_targets else {
        return session;
    };
    let pending: VecDeque<IndividualAddress> = range.iter().collect();
    if pending.is_empty() {
        return session;
    }
    let worker_count = config.workers.min(pending.len());

    let options = Arc::new(ProbeOptions { auth_key: config.auth_key, bruteforce_key: config.bruteforce_key });
    let queue = Arc::new(Mutex::new(pending));
    let session = Arc::new(Mutex::new(session));
    let results = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let queue = queue.clone();
        let session = session.clone();
        let results = results.clone();
        let options = options.clone();
        handles.push(tokio::spawn(async move {
            loop {
                let address = match queue.lock().await.pop_front() {
                    Some(address) => address,
                    None => break,
                };
                let mut session = session.lock().await;
                let probe = match session.maintain().await {
                    Ok(()) => bus::probe_device(&mut session, address, &options).await.map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                drop(session);
                results.lock().await.push(BusTargetResult { address, probe });
            }
        }));
    }
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "bus probe worker panicked");
        }
    }

    result.bus_results = Arc::try_unwrap(results).expect("all bus probe workers joined").into_inner();
    Arc::try_unwrap(session).expect("all bus probe workers joined").into_inner()
}

async fn run_group_write(session: &mut TunnelSession, config: &ScanConfig, result: &mut TargetResult) {
    let (Some(address), Some(data)) = (config.group_address, config.group_write_value.clone()) else {
        result.error = Some("--group-write requires --group-address".to_string());
        result.success = false;
        return;
    };
    if let Err(e) = bus::group_write(session, address, data).await {
        result.error = Some(e.to_string());
        result.success = false;
    }
}

async fn run_tunnel_monitor(session: &mut TunnelSession, cancellation: &CancellationToken, result: &mut TargetResult) {
    loop {
        if cancellation.is_cancelled() {
            return;
        }
        if let Err(e) = session.maintain().await {
            result.error = Some(e.to_string());
            result.success = false;
            return;
        }
        let frame = tokio::select! {
            frame = session.recv_frame(MONITOR_POLL_TIMEOUT) => frame,
            _ = cancellation.cancelled() => return,
        };
        match frame {
            // L_Data.con is the echo of our own locally-sent request, not
            // bus traffic; the monitor stream only reports L_Data.ind and
            // L_Busmon.ind (spec §4.2 open question, §4.7).
            Ok(Some(CemiFrame::Data(data))) if data.message_code == MessageCode::LDataCon => continue,
            Ok(Some(cemi)) => {
                let channel_id = session.channel_id;
                let seq = session.recv_seq;
                result.monitor_records.push(MonitorSink::record(channel_id, seq, &cemi));
            },
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, "monitor frame error");
                continue;
            },
        }
    }
}

async fn run_routing(
    target: SocketAddr,
    config: &ScanConfig,
    cancellation: &CancellationToken,
    mut result: TargetResult,
) -> TargetResult {
    let Some(interface) = &config.interface else {
        return TargetResult::failed(target, "--routing requires --interface");
    };
    let addr: std::net::Ipv4Addr = match interface.parse() {
        Ok(addr) => addr,
        Err(_) => return TargetResult::failed(target, format!("--interface must be an IPv4 address, got \"{interface}\"")),
    };
    let endpoint = match MulticastEndpoint::join(addr).await {
        Ok(ep) => ep,
        Err(e) => return TargetResult::failed(target, e.to_string()),
    };
    let mut routing = RoutingSession::new(endpoint);

    loop {
        if cancellation.is_cancelled() {
            break;
        }
        let frame = tokio::select! {
            frame = routing.recv_frame(MONITOR_POLL_TIMEOUT) => frame,
            _ = cancellation.cancelled() => break,
        };
        match frame {
            Ok(Some(cemi)) => result.monitor_records.push(MonitorSink::record(0, 0, &cemi)),
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, "routing frame error");
                continue;
            },
        }
    }

    result.routing_lost_messages = Some(routing.lost_message_count);
    result
}
