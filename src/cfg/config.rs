// SPDX-License-Identifier: MIT OR Apache-2.0

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::{Context, Result, bail, ensure};
use ipnet::IpNet;

use crate::{
    address::{GroupAddress, IndividualAddressRange},
    cfg::{cli::Cli, enums::BusMode},
};

/// Fully validated, normalized scan configuration assembled from the CLI
/// (spec §3 "ScanConfig"). This is what the scanner/orchestrator consumes;
/// nothing downstream re-parses CLI strings.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub targets: Vec<SocketAddr>,
    pub workers: usize,
    pub interface: Option<String>,
    pub search: bool,
    pub search_timeout: std::time::Duration,
    pub desc_timeout: std::time::Duration,
    pub desc_retries: u32,
    pub bus_targets: Option<IndividualAddressRange>,
    pub bus_mode: Option<BusMode>,
    pub bruteforce_key: bool,
    pub auth_key: u32,
    pub group_write_value: Option<Vec<u8>>,
    pub group_address: Option<GroupAddress>,
    pub routing: bool,
}

impl ScanConfig {
    /// Builds and validates a `ScanConfig` from parsed CLI arguments.
    /// Flattens hostnames/CIDRs to concrete `SocketAddr`s and normalizes
    /// mutually-exclusive bus-mode flags into a single `bus_mode`.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut targets = Vec::new();
        for t in &cli.targets {
            targets.extend(resolve_target(t, cli.port)?);
        }

        ensure!(
            !targets.is_empty() || cli.search,
            "no targets given and --search not set; nothing to do"
        );
        ensure!(cli.workers >= 1, "--workers must be >= 1");

        if cli.search {
            ensure!(cli.interface.is_some(), "--search requires -i/--interface");
        }

        let bus_flags = [cli.bus_info, cli.bus_monitor, cli.group_monitor, cli.group_write.is_some()];
        ensure!(
            bus_flags.iter().filter(|b| **b).count() <= 1,
            "--bus-info, --bus-monitor, --group-monitor, and --group-write are mutually exclusive"
        );
        let bus_mode = if cli.bus_info {
            Some(BusMode::Info)
        } else if cli.bus_monitor {
            Some(BusMode::Monitor)
        } else if cli.group_monitor {
            Some(BusMode::GroupMonitor)
        } else if cli.group_write.is_some() {
            Some(BusMode::GroupWrite)
        } else {
            None
        };

        let bus_targets = cli
            .bus_targets
            .as_ref()
            .map(|s| s.parse::<IndividualAddressRange>())
            .transpose()
            .context("invalid --bus-targets")?;

        let group_address = cli
            .group_address
            .as_ref()
            .map(|s| s.parse::<GroupAddress>())
            .transpose()
            .context("invalid --group-address")?;

        if matches!(bus_mode, Some(BusMode::GroupWrite)) {
            ensure!(group_address.is_some(), "--group-write requires --group-address");
        }

        let group_write_value = cli
            .group_write
            .as_ref()
            .map(|s| parse_hex_bytes(s))
            .transpose()
            .context("invalid --group-write payload")?;

        let auth_key = parse_hex_u32(&cli.auth_key).context("invalid --auth-key")?;

        Ok(ScanConfig {
            targets,
            workers: cli.workers,
            interface: cli.interface.clone(),
            search: cli.search,
            search_timeout: std::time::Duration::from_secs(cli.search_timeout),
            desc_timeout: std::time::Duration::from_secs(cli.desc_timeout),
            desc_retries: cli.desc_retries,
            bus_targets,
            bus_mode,
            bruteforce_key: cli.bruteforce_key,
            auth_key,
            group_write_value,
            group_address,
            routing: cli.routing,
        })
    }
}

/// Expands a single CLI target token into concrete gateway addresses.
/// Accepts a bare IPv4 address, a `host:port`-less hostname (resolved via
/// the OS resolver), or an IPv4 CIDR block (every host address in the
/// block, per spec §6's "target hostnames/IPs/CIDRs").
fn resolve_target(token: &str, port: u16) -> Result<Vec<SocketAddr>> {
    if let Ok(net) = token.parse::<IpNet>() {
        let IpNet::V4(net4) = net else {
            bail!("only IPv4 CIDR blocks are supported: {token}");
        };
        let hosts: Vec<SocketAddr> = net4.hosts().map(|ip| SocketAddr::new(IpAddr::V4(ip), port)).collect();
        ensure!(!hosts.is_empty(), "CIDR block {token} has no host addresses");
        return Ok(hosts);
    }

    if let Ok(ip) = token.parse::<Ipv4Addr>() {
        return Ok(vec![SocketAddr::new(IpAddr::V4(ip), port)]);
    }

    let resolved = (token, port)
        .to_socket_addrs_or_lookup()
        .with_context(|| format!("cannot resolve target {token}"))?;
    Ok(resolved)
}

/// Hostname resolution helper kept separate so it can be stubbed in tests
/// without touching the OS resolver.
trait ResolveHost {
    fn to_socket_addrs_or_lookup(&self) -> Result<Vec<SocketAddr>>;
}

impl ResolveHost for (&str, u16) {
    fn to_socket_addrs_or_lookup(&self) -> Result<Vec<SocketAddr>> {
        use std::net::ToSocketAddrs;
        let addrs: Vec<SocketAddr> = (self.0, self.1).to_socket_addrs()?.collect();
        ensure!(!addrs.is_empty(), "hostname {} resolved to no addresses", self.0);
        Ok(addrs)
    }
}

fn parse_hex_u32(s: &str) -> Result<u32> {
    let stripped = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u32::from_str_radix(stripped, 16).with_context(|| format!("not a hex u32: {s}"))
}

fn parse_hex_bytes(s: &str) -> Result<Vec<u8>> {
    let stripped = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    hex::decode(stripped).with_context(|| format!("not valid hex: {s}"))
}
