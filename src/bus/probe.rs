// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-device bus info probe (spec §4.6, §8 scenario 6): device descriptor,
//! optional Authorize_Request (with optional key bruteforce), well-known
//! memory locations, standard interface-object properties, and ADC_Read.

use tracing::debug;

use crate::{
    address::IndividualAddress,
    codec::apci::Apci,
    error::ScanError,
    session::tunnel::TunnelSession,
};

use super::transport_layer::TransportConnection;

/// Memory addresses probed after a successful (or skipped) authorization,
/// per spec §4.6 step 5's "manufacturer/device/version" follow-up.
const MEMORY_PROBES: &[(&str, u16, u8)] = &[("manufacturer_id", 0x0104, 2), ("device_type", 0x0101, 2), ("run_error", 0x0060, 1)];

/// `(object_index, property_id)` pairs read from the device object's
/// standard interface-object property table.
const PROPERTY_PROBES: &[(u8, u8)] = &[(0, 0x0B), (0, 0x0D)];

#[derive(Debug, Clone, Default)]
pub struct ProbeResult {
    pub device_descriptor: Option<u16>,
    pub auth_level: Option<u8>,
    pub auth_key_found: Option<u32>,
    pub memory: Vec<(&'static str, u16, Vec<u8>)>,
    pub properties: Vec<(u8, u8, Vec<u8>)>,
    pub adc: Option<u16>,
}

pub struct ProbeOptions {
    pub auth_key: u32,
    pub bruteforce_key: bool,
}

/// Runs the full probe sequence against `target` over `session`'s already
/// open tunnel, opening and (if bruteforcing) repeatedly reopening its own
/// transport-layer connection.
pub async fn probe_device(session: &mut TunnelSession, target: IndividualAddress, options: &ProbeOptions) -> Result<ProbeResult, ScanError> {
    let mut result = ProbeResult::default();
    let mut conn = TransportConnection::connect(session, target).await?;

    if let Ok(Apci::DeviceDescriptorResponse { data, .. }) = conn.request(session, Apci::DeviceDescriptorRead { descriptor_type: 0 }).await {
        if data.len() >= 2 {
            result.device_descriptor = Some(u16::from_be_bytes([data[0], data[1]]));
        }
    }

    conn = authorize(session, target, conn, options, &mut result).await?;

    for (name, address, count) in MEMORY_PROBES {
        let req = Apci::MemoryRead { count: *count, address: *address };
        if let Ok(Apci::MemoryResponse { data, .. }) = conn.request(session, req).await {
            result.memory.push((name, *address, data));
        }
    }

    for (object_index, property_id) in PROPERTY_PROBES {
        let req = Apci::PropertyValueRead { object_index: *object_index, property_id: *property_id, count: 1, start_index: 1 };
        if let Ok(Apci::PropertyValueResponse { data, .. }) = conn.request(session, req).await {
            result.properties.push((*object_index, *property_id, data));
        }
    }

    if let Ok(Apci::AdcResponse { value, .. }) = conn.request(session, Apci::AdcRead { channel: 0, count: 1 }).await {
        result.adc = Some(value);
    }

    conn.disconnect(session).await?;
    Ok(result)
}

/// Runs Authorize_Request either once (with `options.auth_key`) or, when
/// `bruteforce_key` is set, by iterating candidate keys from zero. Between
/// bruteforce attempts the transport connection is torn down and reopened,
/// since real System 2/7 devices require it (spec §8 scenario 6).
async fn authorize(
    session: &mut TunnelSession,
    target: IndividualAddress,
    mut conn: TransportConnection,
    options: &ProbeOptions,
    result: &mut ProbeResult,
) -> Result<TransportConnection, ScanError> {
    if !options.bruteforce_key {
        if let Ok(Apci::AuthorizeResponse { level }) = conn.request(session, Apci::AuthorizeRequest { key: options.auth_key }).await {
            result.auth_level = Some(level);
            if level > 0 {
                result.auth_key_found = Some(options.auth_key);
            }
        }
        return Ok(conn);
    }

    let mut key: u32 = 0;
    loop {
        let response = conn.request(session, Apci::AuthorizeRequest { key }).await;
        if let Ok(Apci::AuthorizeResponse { level }) = response {
            if level > 0 {
                result.auth_level = Some(level);
                result.auth_key_found = Some(key);
                return Ok(conn);
            }
        }
        debug!(%target, key, "Authorize_Request rejected");
        if key == u32::MAX {
            return Ok(conn);
        }
        key += 1;
        conn.disconnect(session).await?;
        conn = TransportConnection::connect(session, target).await?;
    }
}
