// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bus layer: point-to-point transport-layer connections over an open
//! tunnel (spec §4.5), the per-device info probe built on top of it
//! (§4.6), and connectionless group writes.

pub mod group_write;
pub mod probe;
pub mod transport_layer;

pub use group_write::group_write;
pub use probe::{probe_device, ProbeOptions, ProbeResult};
pub use transport_layer::TransportConnection;
