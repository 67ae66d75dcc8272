// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thin wrappers over `tokio::net::UdpSocket` for the two traffic shapes
//! this crate needs: unicast request/response to a gateway's control or
//! data endpoint, and multicast discovery/routing on 224.0.23.12:3671
//! (spec §4.1, §4.8).

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use tokio::net::UdpSocket;

use crate::{
    cfg::logger::{frame_in, frame_out},
    error::ScanError,
};

pub const KNX_PORT: u16 = 3671;
pub const KNX_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(224, 0, 23, 12);

const MAX_DATAGRAM: usize = 576;

/// A bound UDP socket used for unicast KNXnet/IP exchanges with a single
/// gateway (SEARCH is the only service sent over a non-connected socket).
pub struct UnicastEndpoint {
    socket: UdpSocket,
}

impl UnicastEndpoint {
    /// Binds an ephemeral local port on the given interface address.
    pub async fn bind(local_addr: SocketAddrV4) -> Result<Self, ScanError> {
        let socket = UdpSocket::bind(SocketAddr::V4(local_addr)).await?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ScanError> {
        Ok(self.socket.local_addr()?)
    }

    pub async fn send_to(&self, datagram: &[u8], target: SocketAddr) -> Result<(), ScanError> {
        frame_out(target, datagram.len());
        self.socket.send_to(datagram, target).await?;
        Ok(())
    }

    pub async fn recv_from(&self) -> Result<(Vec<u8>, SocketAddr), ScanError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (n, from) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(n);
        frame_in(from, n);
        Ok((buf, from))
    }
}

/// A socket joined to the KNXnet/IP routing/discovery multicast group on a
/// specific local interface (spec §4.8; the interface must be named
/// explicitly per `--interface`, there is no "default route" guess).
pub struct MulticastEndpoint {
    socket: UdpSocket,
}

impl MulticastEndpoint {
    pub async fn join(interface_addr: Ipv4Addr) -> Result<Self, ScanError> {
        let socket = UdpSocket::bind(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, KNX_PORT))).await?;
        socket.join_multicast_v4(KNX_MULTICAST_GROUP, interface_addr)?;
        socket.set_multicast_loop_v4(false)?;
        Ok(Self { socket })
    }

    pub async fn send_to_group(&self, datagram: &[u8]) -> Result<(), ScanError> {
        let target = SocketAddr::V4(SocketAddrV4::new(KNX_MULTICAST_GROUP, KNX_PORT));
        frame_out(target, datagram.len());
        self.socket.send_to(datagram, target).await?;
        Ok(())
    }

    pub async fn recv_from(&self) -> Result<(Vec<u8>, SocketAddr), ScanError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (n, from) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(n);
        frame_in(from, n);
        Ok((buf, from))
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ScanError> {
        Ok(self.socket.local_addr()?)
    }
}
