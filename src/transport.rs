// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport abstraction and the UDP reference backend (RTPS v2.3 Sec.9.6).
//!
//! [`Transport`] is the boundary the rest of the engine sends/receives
//! through; [`UdpTransport`] is the only backend shipped here. Concrete
//! transports for shared memory, TCP, or constrained links are a concern of
//! the deployment, not this crate.

use crate::config::{
    sedp_unicast_port, spdp_multicast_port, user_unicast_port, DOMAIN_ID_GAIN, MAX_DOMAIN_ID,
    PARTICIPANT_ID_GAIN, PORT_BASE, SEDP_UNICAST_OFFSET, SPDP_MULTICAST_IP, USER_UNICAST_OFFSET,
};
use crate::error::{Error, Result};
use crate::types::Locator;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

/// RTPS v2.3 port allocation for one participant in one domain
/// (Sec.9.6.1.1). `metatraffic_multicast`/`metatraffic_unicast` carry SPDP
/// and SEDP traffic; `user_unicast` carries application DATA.
#[derive(Debug, Clone, Copy)]
pub struct PortMapping {
    pub metatraffic_multicast: u16,
    pub metatraffic_unicast: u16,
    pub user_unicast: u16,
}

/// Override the RTPS formula with fixed ports (firewalled deployments,
/// test isolation). All participants that must discover each other need
/// the same override.
#[derive(Debug, Clone, Copy)]
pub struct CustomPortMapping {
    pub metatraffic_multicast: u16,
    pub metatraffic_unicast: u16,
    pub user_unicast: u16,
}

impl PortMapping {
    #[must_use]
    pub fn from_custom(custom: CustomPortMapping) -> Self {
        Self {
            metatraffic_multicast: custom.metatraffic_multicast,
            metatraffic_unicast: custom.metatraffic_unicast,
            user_unicast: custom.user_unicast,
        }
    }

    /// Compute ports from `domain_id`/`participant_id` (RTPS v2.3 Sec.9.6.1.1).
    pub fn calculate(domain_id: u32, participant_id: u8) -> Result<Self> {
        if domain_id > MAX_DOMAIN_ID {
            return Err(Error::InvalidDomainId(domain_id));
        }
        if participant_id >= 120 {
            return Err(Error::InvalidParticipantId(participant_id));
        }
        Ok(Self {
            metatraffic_multicast: spdp_multicast_port(domain_id),
            metatraffic_unicast: sedp_unicast_port(domain_id, participant_id),
            user_unicast: user_unicast_port(domain_id, participant_id),
        })
    }

    /// Probe participant ids `0..120` and return the first whose unicast
    /// ports are free. The multicast port is shared via `SO_REUSEADDR` and
    /// never probed.
    pub fn auto_assign(domain_id: u32) -> Result<(Self, u8)> {
        for pid in 0..120u8 {
            let mapping = Self::calculate(domain_id, pid)?;
            if is_port_available(mapping.metatraffic_unicast) && is_port_available(mapping.user_unicast) {
                return Ok((mapping, pid));
            }
        }
        Err(Error::NoAvailableParticipantId)
    }
}

fn is_port_available(port: u16) -> bool {
    UdpSocket::bind(("0.0.0.0", port)).is_ok()
}

/// Send/receive boundary the engine drives traffic through. A `Transport`
/// owns no RTPS semantics; it moves bytes to and from [`Locator`]s.
pub trait Transport: Send + Sync {
    /// Send `buf` to `dest`. Best-effort: transports never retry internally.
    fn send_to(&self, buf: &[u8], dest: &Locator) -> Result<usize>;

    /// Receive one datagram into `buf`, non-blocking. `Ok(None)` means no
    /// datagram was available; callers poll/park externally (see
    /// [`crate::timer`]).
    fn recv_from(&self, buf: &mut [u8]) -> Result<Option<(usize, Locator)>>;

    /// Locators this transport can be reached on (advertised in SPDP).
    fn local_locators(&self) -> Vec<Locator>;
}

/// Reference UDP backend: one multicast-joined socket for metatraffic
/// (SPDP/SEDP) and one ephemeral-port socket for user data, mirroring the
/// two-socket split RTPS implementations commonly use to keep discovery
/// broadcast storms off the user-data path.
pub struct UdpTransport {
    metatraffic_socket: UdpSocket,
    user_socket: UdpSocket,
    metatraffic_multicast_addr: SocketAddr,
    local_ip: Ipv4Addr,
    mapping: PortMapping,
}

impl UdpTransport {
    /// Bind both sockets per `mapping` and join the SPDP/SEDP multicast
    /// group on the primary interface.
    pub fn new(mapping: PortMapping) -> Result<Self> {
        let metatraffic_socket = bind_reuseaddr(mapping.metatraffic_multicast)?;
        let local_ip = local_ip_address::local_ip()
            .ok()
            .and_then(|ip| match ip {
                std::net::IpAddr::V4(v4) => Some(v4),
                std::net::IpAddr::V6(_) => None,
            })
            .unwrap_or(Ipv4Addr::UNSPECIFIED);
        let group = Ipv4Addr::from(SPDP_MULTICAST_IP);
        metatraffic_socket
            .join_multicast_v4(&group, &local_ip)
            .map_err(|e| Error::MulticastJoinFailed(e.to_string()))?;
        metatraffic_socket.set_multicast_loop_v4(true)?;
        log::debug!("[Transport] joined {group} on {local_ip} for metatraffic port {}", mapping.metatraffic_multicast);

        let user_socket = bind_reuseaddr(mapping.user_unicast)?;
        log::debug!("[Transport] bound user-data socket on port {}", mapping.user_unicast);

        let metatraffic_multicast_addr = SocketAddr::V4(SocketAddrV4::new(group, mapping.metatraffic_multicast));

        Ok(Self { metatraffic_socket, user_socket, metatraffic_multicast_addr, local_ip, mapping })
    }

    /// Destination for SPDP/SEDP multicast announcements.
    #[must_use]
    pub fn metatraffic_multicast_locator(&self) -> Locator {
        Locator::from_socket_addr(self.metatraffic_multicast_addr)
    }

    fn socket_for(&self, dest: &Locator) -> &UdpSocket {
        if dest.to_socket_addr().map(|a| a.port()) == Some(self.mapping.user_unicast) {
            &self.user_socket
        } else {
            &self.metatraffic_socket
        }
    }
}

fn bind_reuseaddr(port: u16) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
    socket.bind(&addr.into()).map_err(|e| Error::BindFailed(format!("0.0.0.0:{port}: {e}")))?;
    Ok(socket.into())
}

impl Transport for UdpTransport {
    fn send_to(&self, buf: &[u8], dest: &Locator) -> Result<usize> {
        let addr = dest.to_socket_addr().ok_or(Error::SendFailed("non-IP locator".into()))?;
        self.socket_for(dest).send_to(buf, addr).map_err(|e| {
            log::warn!("[Transport] send to {addr} failed: {e}");
            Error::SendFailed(e.to_string())
        })
    }

    fn recv_from(&self, buf: &mut [u8]) -> Result<Option<(usize, Locator)>> {
        match self.metatraffic_socket.recv_from(buf) {
            Ok((n, addr)) => return Ok(Some((n, Locator::from_socket_addr(addr)))),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => return Err(Error::Io(e)),
        }
        match self.user_socket.recv_from(buf) {
            Ok((n, addr)) => Ok(Some((n, Locator::from_socket_addr(addr)))),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn local_locators(&self) -> Vec<Locator> {
        let unicast = SocketAddr::V4(SocketAddrV4::new(self.local_ip, self.mapping.metatraffic_unicast));
        let user = SocketAddr::V4(SocketAddrV4::new(self.local_ip, self.mapping.user_unicast));
        vec![Locator::from_socket_addr(unicast), Locator::from_socket_addr(user), self.metatraffic_multicast_locator()]
    }
}
