// SPDX-License-Identifier: MIT OR Apache-2.0

//! Point-to-point transport-layer connections (spec §4.5): `T_Connect`,
//! numbered `T_Data_Connected` request/ack pairs, and `T_Disconnect`, all
//! carried as cEMI `L_Data.req`/`L_Data.ind` frames over an already-open
//! tunnelling session. This is a second, inner sequence counter (mod 16)
//! layered on top of the KNXnet/IP TUNNELLING_REQUEST/ACK counter (mod
//! 256) the session already manages.
//!
//! `TransportConnection` does not borrow the session: every call takes it
//! as an explicit `&mut TunnelSession` argument, since a bruteforce probe
//! needs to drop and reopen both the transport connection and (in theory)
//! the underlying tunnel between attempts without fighting the borrow
//! checker over who owns the session.

use std::time::Duration;

use tracing::debug;

use crate::{
    address::IndividualAddress,
    codec::{
        apci::Apci,
        cemi::{CemiFrame, ControlField1, ControlField2, DataFrame, Destination, MessageCode},
        tpci::{ControlCode, SeqNumber, Tpci},
    },
    error::ScanError,
    session::tunnel::TunnelSession,
};

const T_ACK_TIMEOUT: Duration = Duration::from_secs(3);

/// An open `T_Connect` to a single device. Dropping this without calling
/// [`TransportConnection::disconnect`] leaves the device's connection table
/// entry occupied until it times out on its own.
pub struct TransportConnection {
    target: IndividualAddress,
    local_seq: SeqNumber,
}

impl TransportConnection {
    pub async fn connect(session: &mut TunnelSession, target: IndividualAddress) -> Result<Self, ScanError> {
        let frame = control_frame(session.individual_address, target, ControlCode::Connect);
        session.send_cemi(frame).await?;
        debug!(%target, "sent T_Connect");
        Ok(TransportConnection { target, local_seq: SeqNumber::ZERO })
    }

    /// Sends a numbered application-layer request and returns the device's
    /// numbered response, acking it in turn. Retries are the caller's
    /// responsibility (spec §4.5: `ProtocolError` on an unexpected sequence
    /// tears down the session rather than being retried internally).
    pub async fn request(&mut self, session: &mut TunnelSession, apci: Apci) -> Result<Apci, ScanError> {
        let seq = self.local_seq;
        let frame = CemiFrame::Data(DataFrame {
            message_code: MessageCode::LDataReq,
            additional_info: Vec::new(),
            control1: ControlField1 { raw: ControlField1::STANDARD_FRAME },
            control2: ControlField2::for_destination(Destination::Individual(self.target), 6),
            source: session.individual_address,
            destination: Destination::Individual(self.target),
            tpci: Tpci::NumberedData(seq),
            apci: Some(apci),
        });
        session.send_cemi(frame).await?;

        self.await_ack(session, seq).await?;
        self.local_seq = seq.next();

        self.await_numbered_response(session).await
    }

    async fn await_ack(&mut self, session: &mut TunnelSession, seq: SeqNumber) -> Result<(), ScanError> {
        let deadline = tokio::time::Instant::now() + T_ACK_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(ScanError::timeout(format!("T_Ack from {}", self.target)));
            }
            let frame = session.recv_frame(remaining).await?;
            let Some(CemiFrame::Data(data)) = frame else { continue };
            if data.source != self.target {
                continue;
            }
            match data.tpci {
                Tpci::NumberedControl(ack_seq, ControlCode::Ack) if ack_seq == seq => return Ok(()),
                Tpci::NumberedControl(_, ControlCode::Nak) => {
                    return Err(ScanError::bus(format!("T_Nak from {}", self.target)));
                },
                _ => continue,
            }
        }
    }

    async fn await_numbered_response(&mut self, session: &mut TunnelSession) -> Result<Apci, ScanError> {
        let deadline = tokio::time::Instant::now() + T_ACK_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(ScanError::timeout(format!("transport-layer response from {}", self.target)));
            }
            let frame = session.recv_frame(remaining).await?;
            let Some(CemiFrame::Data(data)) = frame else { continue };
            if data.source != self.target {
                continue;
            }
            if let Tpci::NumberedData(device_seq) = data.tpci {
                self.ack(session, device_seq).await?;
                if let Some(apci) = data.apci {
                    return Ok(apci);
                }
                continue;
            }
        }
    }

    async fn ack(&mut self, session: &mut TunnelSession, device_seq: SeqNumber) -> Result<(), ScanError> {
        let frame = CemiFrame::Data(DataFrame {
            message_code: MessageCode::LDataReq,
            additional_info: Vec::new(),
            control1: ControlField1 { raw: ControlField1::STANDARD_FRAME },
            control2: ControlField2::for_destination(Destination::Individual(self.target), 6),
            source: session.individual_address,
            destination: Destination::Individual(self.target),
            tpci: Tpci::NumberedControl(device_seq, ControlCode::Ack),
            apci: None,
        });
        session.send_cemi(frame).await
    }

    pub async fn disconnect(self, session: &mut TunnelSession) -> Result<(), ScanError> {
        let frame = control_frame(session.individual_address, self.target, ControlCode::Disconnect);
        session.send_cemi(frame).await
    }
}

fn control_frame(source: IndividualAddress, target: IndividualAddress, code: ControlCode) -> CemiFrame {
    CemiFrame::Data(DataFrame {
        message_code: MessageCode::LDataReq,
        additional_info: Vec::new(),
        control1: ControlField1 { raw: ControlField1::STANDARD_FRAME },
        control2: ControlField2::for_destination(Destination::Individual(target), 6),
        source,
        destination: Destination::Individual(target),
        tpci: Tpci::UnnumberedControl(code),
        apci: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_frame_carries_no_apci() {
        let source = IndividualAddress::new(1, 1, 0).unwrap();
        let target = IndividualAddress::new(1, 1, 5).unwrap();
        let frame = control_frame(source, target, ControlCode::Connect);
        match frame {
            CemiFrame::Data(d) => {
                assert!(d.apci.is_none());
                assert_eq!(d.tpci, Tpci::UnnumberedControl(ControlCode::Connect));
            },
            _ => panic!("expected data frame"),
        }
    }
}
