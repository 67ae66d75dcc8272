// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unified error taxonomy for the scanner core (see spec §7).
//!
//! Every fallible boundary in the crate returns `ScanError` (or a type that
//! converts into it); the orchestrator and CLI are the only places allowed
//! to flatten it into a human-readable message.

use std::net::SocketAddr;

use thiserror::Error;

/// Top-level error kind shared by the codec, session FSMs, bus layer, and
/// scanner.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A datagram failed to parse as a well-formed KNXnet/IP or cEMI frame.
    #[error("decode error at offset {offset}: {reason}")]
    Decode {
        offset: usize,
        reason: String,
    },

    /// A well-formed frame violated a protocol invariant (wrong channel,
    /// unexpected service, etc).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// CONNECT_RESPONSE carried a non-zero status code.
    #[error("connect error: {0}")]
    Connect(#[from] ConnectError),

    /// A timer-bound operation did not complete in time.
    #[error("timeout waiting for {0}")]
    Timeout(String),

    /// T_Nak, a missing L_Data.con, or a negative APCI response.
    #[error("bus error: {0}")]
    Bus(String),

    /// Socket-level failure (bind, send, recv).
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Authorize_Response granted an access level insufficient for the
    /// requested operation.
    #[error("authorization error: access level {granted} insufficient")]
    Auth { granted: u8 },

    /// Invalid CLI/config combination, caught before the event loop starts.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ScanError {
    pub fn decode(offset: usize, reason: impl Into<String>) -> Self {
        ScanError::Decode {
            offset,
            reason: reason.into(),
        }
    }

    pub fn protocol(reason: impl Into<String>) -> Self {
        ScanError::Protocol(reason.into())
    }

    pub fn bus(reason: impl Into<String>) -> Self {
        ScanError::Bus(reason.into())
    }

    pub fn config(reason: impl Into<String>) -> Self {
        ScanError::Config(reason.into())
    }

    pub fn timeout(what: impl Into<String>) -> Self {
        ScanError::Timeout(what.into())
    }
}

/// Mapped KNXnet/IP CONNECT_RESPONSE / CONNECTIONSTATE_RESPONSE status
/// codes (see spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("E_CONNECTION_TYPE (0x22): requested connection type not supported")]
    ConnectionType,
    #[error("E_CONNECTION_OPTION (0x23): requested connection option not supported")]
    ConnectionOption,
    #[error("E_NO_MORE_CONNECTIONS (0x24): gateway has no free connection slots")]
    NoMoreConnections,
    #[error("E_DATA_CONNECTION (0x26): data connection error")]
    DataConnection,
    #[error("E_KNX_CONNECTION (0x27): KNX subnetwork connection error")]
    KnxConnection,
    #[error("E_TUNNELLING_LAYER (0x29): requested tunnelling layer not supported")]
    TunnellingLayer,
    #[error("unknown connect status 0x{0:02x}")]
    Unknown(u8),
}

impl ConnectError {
    pub fn from_status(status: u8) -> Option<Self> {
        Some(match status {
            0x00 => return None,
            0x22 => ConnectError::ConnectionType,
            0x23 => ConnectError::ConnectionOption,
            0x24 => ConnectError::NoMoreConnections,
            0x26 => ConnectError::DataConnection,
            0x27 => ConnectError::KnxConnection,
            0x29 => ConnectError::TunnellingLayer,
            other => ConnectError::Unknown(other),
        })
    }

    pub fn status_code(self) -> u8 {
        match self {
            ConnectError::ConnectionType => 0x22,
            ConnectError::ConnectionOption => 0x23,
            ConnectError::NoMoreConnections => 0x24,
            ConnectError::DataConnection => 0x26,
            ConnectError::KnxConnection => 0x27,
            ConnectError::TunnellingLayer => 0x29,
            ConnectError::Unknown(v) => v,
        }
    }
}

/// A single scan-result failure, attributed to the target it came from.
#[derive(Debug, Error)]
#[error("{target}: {source}")]
pub struct TargetError {
    pub target: SocketAddr,
    #[source]
    pub source: ScanError,
}
