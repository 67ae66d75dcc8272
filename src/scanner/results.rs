// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-target result records (spec §4.6, §7 "User-visible").

use std::net::SocketAddr;

use crate::{address::IndividualAddress, bus::ProbeResult, codec::dib::Dib, monitor::MonitorRecord};

/// Outcome of probing a single bus target within an open tunnel.
#[derive(Debug, Clone)]
pub struct BusTargetResult {
    pub address: IndividualAddress,
    pub probe: Result<ProbeResult, String>,
}

/// Everything learned about one scan target (spec §7: "each result record
/// includes a success flag and, on failure, an error kind and human
/// message").
#[derive(Debug, Clone)]
pub struct TargetResult {
    pub target: SocketAddr,
    pub success: bool,
    pub error: Option<String>,
    pub description: Vec<Dib>,
    pub tunnel_channel: Option<u8>,
    pub bus_results: Vec<BusTargetResult>,
    pub monitor_records: Vec<MonitorRecord>,
    pub routing_lost_messages: Option<u64>,
}

impl TargetResult {
    pub fn failed(target: SocketAddr, error: impl Into<String>) -> Self {
        TargetResult {
            target,
            success: false,
            error: Some(error.into()),
            description: Vec::new(),
            tunnel_channel: None,
            bus_results: Vec::new(),
            monitor_records: Vec::new(),
            routing_lost_messages: None,
        }
    }

    pub fn ok(target: SocketAddr) -> Self {
        TargetResult {
            target,
            success: true,
            error: None,
            description: Vec::new(),
            tunnel_channel: None,
            bus_results: Vec::new(),
            monitor_records: Vec::new(),
            routing_lost_messages: None,
        }
    }
}
