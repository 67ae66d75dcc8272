// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-target session state machines (spec §4.2-§4.4, §4.8): gateway
//! discovery, description, the sequenced tunnelling connection, and
//! connectionless routing.

pub mod common;
pub mod describe;
pub mod routing;
pub mod search;
pub mod tunnel;

pub use common::SessionState;
pub use describe::describe;
pub use routing::RoutingSession;
pub use search::{search, DiscoveredGateway};
pub use tunnel::TunnelSession;
