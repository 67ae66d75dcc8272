// SPDX-License-Identifier: MIT OR Apache-2.0

//! Monitor Sink (spec §4.7): turns frames delivered by an `Active`
//! bus-monitor or group-monitor tunnel (or a routing session) into
//! structured records.

pub mod sink;

pub use sink::{BusMonitorRecord, GroupMonitorRecord, MonitorRecord, MonitorSink};
