// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured records for monitor-mode traffic (spec §4.7). The sink
//! itself does no presentation — it turns a decoded cEMI frame plus its
//! KNXnet/IP envelope into one of the two record shapes the spec names,
//! and logs it; pretty-printing belongs to the caller.

use crate::{
    address::IndividualAddress,
    codec::{
        cemi::{CemiFrame, Destination, MessageCode},
        tpci::Tpci,
    },
    utils::hex_dump,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMonitorRecord {
    pub channel_id: u8,
    pub sequence_counter: u8,
    pub message_code: MessageCode,
    pub source: IndividualAddress,
    pub destination: Destination,
    pub tpci_kind: &'static str,
    pub tpci_seq: Option<u8>,
    pub apci_kind: &'static str,
    pub apci_data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMonitorRecord {
    pub channel_id: u8,
    pub sequence_counter: u8,
    pub message_code: MessageCode,
    pub timestamp: Option<u16>,
    pub raw_frame: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorRecord {
    Group(GroupMonitorRecord),
    Bus(BusMonitorRecord),
}

/// Turns one delivered cEMI frame into a [`MonitorRecord`] and logs it at
/// INFO, per spec §9's structured-event convention.
pub struct MonitorSink;

impl MonitorSink {
    pub fn record(channel_id: u8, sequence_counter: u8, frame: &CemiFrame) -> MonitorRecord {
        let record = match frame {
            CemiFrame::Data(data) => {
                let (tpci_kind, tpci_seq) = tpci_parts(data.tpci);
                let (apci_kind, apci_data) = data
                    .apci
                    .as_ref()
                    .map(|a| (apci_kind(a), apci_payload(a)))
                    .unwrap_or(("none", Vec::new()));
                MonitorRecord::Group(GroupMonitorRecord {
                    channel_id,
                    sequence_counter,
                    message_code: data.message_code,
                    source: data.source,
                    destination: data.destination,
                    tpci_kind,
                    tpci_seq,
                    apci_kind,
                    apci_data,
                })
            },
            CemiFrame::Busmon(busmon) => {
                let timestamp = busmon.additional_info.iter().find_map(|info| match info {
                    crate::codec::cemi::AdditionalInfo::BusmonitorStatus { timestamp } => Some(*timestamp),
                    _ => None,
                });
                MonitorRecord::Bus(BusMonitorRecord {
                    channel_id,
                    sequence_counter,
                    message_code: MessageCode::LBusmonInd,
                    timestamp,
                    raw_frame: busmon.raw.clone(),
                })
            },
        };

        match &record {
            MonitorRecord::Group(r) => {
                tracing::info!(
                    channel_id,
                    seq = sequence_counter,
                    src = %r.source,
                    apci = r.apci_kind,
                    data = %hex_dump(&r.apci_data),
                    "group_monitor_frame"
                )
            },
            MonitorRecord::Bus(r) => {
                tracing::info!(
                    channel_id,
                    seq = sequence_counter,
                    timestamp = ?r.timestamp,
                    raw = %hex_dump(&r.raw_frame),
                    "bus_monitor_frame"
                )
            },
        }
        record
    }
}

fn tpci_parts(tpci: Tpci) -> (&'static str, Option<u8>) {
    match tpci {
        Tpci::UnnumberedData => ("unnumbered_data", None),
        Tpci::NumberedData(seq) => ("numbered_data", Some(seq.get())),
        Tpci::UnnumberedControl(_) => ("unnumbered_control", None),
        Tpci::NumberedControl(seq, _) => ("numbered_control", Some(seq.get())),
    }
}

fn apci_kind(apci: &crate::codec::apci::Apci) -> &'static str {
    use crate::codec::apci::Apci;
    match apci {
        Apci::GroupValueRead => "group_value_read",
        Apci::GroupValueResponse { .. } => "group_value_response",
        Apci::GroupValueWrite { .. } => "group_value_write",
        Apci::AdcRead { .. } => "adc_read",
        Apci::AdcResponse { .. } => "adc_response",
        Apci::MemoryRead { .. } => "memory_read",
        Apci::MemoryResponse { .. } => "memory_response",
        Apci::MemoryWrite { .. } => "memory_write",
        Apci::DeviceDescriptorRead { .. } => "device_descriptor_read",
        Apci::DeviceDescriptorResponse { .. } => "device_descriptor_response",
        Apci::Restart => "restart",
        Apci::AuthorizeRequest { .. } => "authorize_request",
        Apci::AuthorizeResponse { .. } => "authorize_response",
        Apci::KeyWrite { .. } => "key_write",
        Apci::KeyResponse { .. } => "key_response",
        Apci::PropertyValueRead { .. } => "property_value_read",
        Apci::PropertyValueResponse { .. } => "property_value_response",
        Apci::Unknown { .. } => "unknown",
    }
}

fn apci_payload(apci: &crate::codec::apci::Apci) -> Vec<u8> {
    apci.encode().1
}
