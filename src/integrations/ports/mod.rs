//! Host port availability probing

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, UdpSocket};

use crate::integrations::runtime::Protocol;

/// The probe could not tell whether a port is free
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("cannot bind {protocol} port {port}: {source}")]
    Bind {
        port: u16,
        protocol: Protocol,
        #[source]
        source: std::io::Error,
    },
}

/// Answers whether a host port can currently be bound.
///
/// Answers are advisory: another process may claim the port between the
/// probe and the runtime actually binding it.
pub trait PortProbe: Send + Sync {
    fn is_available(&self, port: u16, protocol: Protocol) -> bool;
}

/// Probe that binds transient sockets on all interfaces and drops them at once.
///
/// Both the IPv4 and the IPv6 wildcard are tried, so a port held on either
/// family reads as taken. Hosts without IPv6 fall back to the IPv4 answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketProbe;

impl SocketProbe {
    /// `Ok(false)` when the port is taken, `Err` for any other bind failure
    pub fn probe(&self, port: u16, protocol: Protocol) -> Result<bool, ProbeError> {
        let ipv4 = bind_transient(Ipv4Addr::UNSPECIFIED.into(), port, protocol);
        if !classify(port, protocol, ipv4)? {
            return Ok(false);
        }

        match bind_transient(Ipv6Addr::UNSPECIFIED.into(), port, protocol) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AddrInUse => Ok(false),
            Err(e) => {
                tracing::debug!(port, %protocol, "IPv6 wildcard not bindable: {}", e);
                Ok(true)
            }
        }
    }
}

impl PortProbe for SocketProbe {
    fn is_available(&self, port: u16, protocol: Protocol) -> bool {
        availability(port, protocol, self.probe(port, protocol))
    }
}

fn bind_transient(ip: IpAddr, port: u16, protocol: Protocol) -> std::io::Result<()> {
    let addr = SocketAddr::new(ip, port);
    match protocol {
        Protocol::Tcp => TcpListener::bind(addr).map(drop),
        Protocol::Udp => UdpSocket::bind(addr).map(drop),
    }
}

fn classify(
    port: u16,
    protocol: Protocol,
    bound: std::io::Result<()>,
) -> Result<bool, ProbeError> {
    match bound {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AddrInUse => Ok(false),
        Err(source) => Err(ProbeError::Bind {
            port,
            protocol,
            source,
        }),
    }
}

/// An undecidable probe counts as taken so the runtime picks the port
fn availability(port: u16, protocol: Protocol, probed: Result<bool, ProbeError>) -> bool {
    match probed {
        Ok(available) => {
            tracing::debug!(port, %protocol, available, "probed host port");
            available
        }
        Err(e) => {
            tracing::warn!("{}", e);
            false
        }
    }
}
