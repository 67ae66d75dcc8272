//! UDP endpoints for unicast control/data traffic and multicast routing.

pub mod udp;

pub use udp::{UnicastEndpoint, MulticastEndpoint, KNX_PORT, KNX_MULTICAST_GROUP};
