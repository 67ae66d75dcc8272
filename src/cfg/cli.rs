// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::Parser;

/// KNXnet/IP network and bus mapper.
///
/// Scans one or more hosts/CIDRs for KNXnet/IP gateways, optionally opens a
/// tunnelling connection and probes or monitors the KNX bus behind it.
#[derive(Debug, Parser, Clone)]
#[command(name = "knx-scan", version, about)]
pub struct Cli {
    /// Target hostnames, IPs, or CIDRs. May be empty when `--search` is set.
    pub targets: Vec<String>,

    /// KNXnet/IP control port.
    #[arg(long, default_value_t = 3671)]
    pub port: u16,

    /// Maximum number of targets probed concurrently.
    #[arg(long, default_value_t = 30)]
    pub workers: usize,

    /// Network interface to bind for multicast search and routing.
    #[arg(short = 'i', long)]
    pub interface: Option<String>,

    /// Discover gateways via multicast SEARCH_REQUEST instead of (or in
    /// addition to) scanning the positional targets.
    #[arg(long)]
    pub search: bool,

    /// Seconds to wait for SEARCH_RESPONSEs after sending SEARCH_REQUEST.
    #[arg(long, default_value_t = 5)]
    pub search_timeout: u64,

    /// Per-attempt DESCRIPTION_REQUEST timeout, in seconds.
    #[arg(long, default_value_t = 2)]
    pub desc_timeout: u64,

    /// Number of DESCRIPTION_REQUEST attempts before giving up on a target.
    #[arg(long, default_value_t = 3)]
    pub desc_retries: u32,

    /// Individual-address range to probe on the bus (`a.l.d-a.l.d` or
    /// `a.l.d/mask`).
    #[arg(long)]
    pub bus_targets: Option<String>,

    /// Probe each bus target's device descriptor, memory, and properties.
    #[arg(long)]
    pub bus_info: bool,

    /// Open a BUSMONITOR tunnelling connection and stream raw bus frames.
    #[arg(long)]
    pub bus_monitor: bool,

    /// Stream L_Data.ind group traffic instead of probing individual devices.
    #[arg(long)]
    pub group_monitor: bool,

    /// Try every key in `0..=0xFFFFFFFF` (or a narrower range the caller
    /// pre-filters) against Authorize_Request until one is accepted.
    #[arg(long)]
    pub bruteforce_key: bool,

    /// Key to use for Authorize_Request when not bruteforcing.
    #[arg(long, default_value = "0xFFFFFFFF")]
    pub auth_key: String,

    /// Send a single GroupValueWrite and exit.
    #[arg(long)]
    pub group_write: Option<String>,

    /// Group address for `--group-write` or `--group-monitor` filtering.
    #[arg(long)]
    pub group_address: Option<String>,

    /// Consume RoutingIndication/RoutingLostMessage over multicast instead
    /// of opening a tunnelling connection.
    #[arg(long)]
    pub routing: bool,

    /// Increase log verbosity; repeatable (-v, -vv).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all but error-level logging.
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
