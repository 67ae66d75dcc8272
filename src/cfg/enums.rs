// SPDX-License-Identifier: MIT OR Apache-2.0

use core::fmt;

use clap::ValueEnum;

/// What this invocation of the scanner is asked to do with the bus, once a
/// tunnelling session is open (spec §4.2, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusMode {
    /// Device descriptor + memory/property probing over the transport layer.
    Info,
    /// Raw bus-monitor stream (`L_Busmon.ind`).
    Monitor,
    /// Group-monitor stream over a routing or tunnelling connection.
    GroupMonitor,
    /// Fire-and-forget GroupValueWrite to a single group address.
    GroupWrite,
}

impl fmt::Display for BusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BusMode::Info => "info",
            BusMode::Monitor => "monitor",
            BusMode::GroupMonitor => "group-monitor",
            BusMode::GroupWrite => "group-write",
        })
    }
}

/// `clap`'s verbosity counting only gives us an integer; this maps it (net
/// of `--quiet`) onto the tracing level hierarchy from spec §9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Verbosity {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Verbosity::Error;
        }
        match verbose {
            0 => Verbosity::Info,
            1 => Verbosity::Debug,
            _ => Verbosity::Trace,
        }
    }

    pub fn as_filter_str(self) -> &'static str {
        match self {
            Verbosity::Error => "error",
            Verbosity::Warn => "warn",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
            Verbosity::Trace => "trace",
        }
    }
}
