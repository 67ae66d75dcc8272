// SPDX-License-Identifier: MIT OR Apache-2.0

use tracing_subscriber::{EnvFilter, fmt};

use crate::cfg::enums::Verbosity;

/// Initializes the global tracing subscriber at the level implied by
/// `-v`/`-q` (spec §9: a level hierarchy of ERROR/WARN/INFO/DEBUG/TRACE).
/// `RUST_LOG` still wins if set, matching the usual `tracing` convention.
pub fn init_logger(verbosity: Verbosity) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.as_filter_str()));

    fmt().with_env_filter(filter).with_target(false).try_init().map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

/// Logs an inbound datagram at TRACE, per spec §9's `frame_in` event kind.
pub fn frame_in(from: std::net::SocketAddr, len: usize) {
    tracing::trace!(%from, len, "frame_in");
}

/// Logs an outbound datagram at TRACE, per spec §9's `frame_out` event kind.
pub fn frame_out(to: std::net::SocketAddr, len: usize) {
    tracing::trace!(%to, len, "frame_out");
}
