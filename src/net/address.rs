//! Address strings of the form `tcp://<ipv4>:<port>` or `udp://<ipv4>:<port>`.
//!
//! The ip part may be `*`, meaning "any local address". Parsed addresses convert to the
//! `sockaddr_in` the socket calls expect.

use libc::{AF_INET, SOCK_DGRAM, SOCK_STREAM, in_addr, sockaddr_in};
use std::fmt;
use std::mem;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::str::FromStr;
use thiserror::Error;

const TCP_PREFIX: &str = "tcp://";
const UDP_PREFIX: &str = "udp://";
const ANY_IP: &str = "*";
const MAX_IP_LEN: usize = 15;

/// Transport protocol of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub(crate) fn socket_type(self) -> libc::c_int {
        match self {
            Protocol::Tcp => SOCK_STREAM,
            Protocol::Udp => SOCK_DGRAM,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("tcp"),
            Protocol::Udp => f.write_str("udp"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("unrecognized prefix in address '{0}'; expected tcp:// or udp://")]
    UnrecognizedPrefix(String),
    #[error("can't parse address '{0}'; missing colon after ip")]
    MissingColon(String),
    #[error("ip length {len} in address '{address}' is out of range 1-15")]
    IpLength { address: String, len: usize },
    #[error("couldn't parse ip '{ip}' in address '{address}'")]
    InvalidIp { address: String, ip: String },
    #[error("empty port in address '{0}'")]
    EmptyPort(String),
    #[error("invalid port in address '{0}'")]
    InvalidPort(String),
}

/// A parsed endpoint descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    protocol: Protocol,
    ip: String,
    ipv4: Ipv4Addr,
    port: u16,
}

impl Address {
    /// Parses `tcp://ip:port` or `udp://ip:port`, where `ip` is dotted IPv4 or `*`.
    ///
    /// # Arguments
    /// * `address` - The address text
    ///
    /// # Returns
    /// The parsed address, or the first grammar rule the text breaks
    pub fn parse(address: &str) -> Result<Self, AddressError> {
        let (protocol, rest) = if let Some(rest) = address.strip_prefix(TCP_PREFIX) {
            (Protocol::Tcp, rest)
        } else if let Some(rest) = address.strip_prefix(UDP_PREFIX) {
            (Protocol::Udp, rest)
        } else {
            return Err(AddressError::UnrecognizedPrefix(address.to_owned()));
        };

        let (ip, port) = rest
            .split_once(':')
            .ok_or_else(|| AddressError::MissingColon(address.to_owned()))?;

        if ip.is_empty() || ip.len() > MAX_IP_LEN {
            return Err(AddressError::IpLength {
                address: address.to_owned(),
                len: ip.len(),
            });
        }

        let ipv4 = if ip == ANY_IP {
            Ipv4Addr::UNSPECIFIED
        } else {
            ip.parse().map_err(|_| AddressError::InvalidIp {
                address: address.to_owned(),
                ip: ip.to_owned(),
            })?
        };

        if port.is_empty() {
            return Err(AddressError::EmptyPort(address.to_owned()));
        }
        if !port.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AddressError::InvalidPort(address.to_owned()));
        }
        let port = port
            .parse()
            .map_err(|_| AddressError::InvalidPort(address.to_owned()))?;

        Ok(Self {
            protocol,
            ip: ip.to_owned(),
            ipv4,
            port,
        })
    }

    /// Returns the transport named by the address prefix.
    ///
    /// # Returns
    /// [`Protocol::Tcp`] for `tcp://`, [`Protocol::Udp`] for `udp://`
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Returns the ip exactly as written.
    ///
    /// # Returns
    /// The dotted quad, or `*` for a wildcard address
    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// Returns the port number.
    ///
    /// # Returns
    /// The port, `0` meaning one chosen by the OS at bind time
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether the address binds every local interface.
    pub fn is_any(&self) -> bool {
        self.ip == ANY_IP
    }

    /// The address to bind or connect to; `*` becomes `0.0.0.0`.
    pub fn socket_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.ipv4, self.port)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.protocol, self.ip, self.port)
    }
}

pub(crate) fn to_sockaddr(address: SocketAddrV4) -> sockaddr_in {
    let mut raw: sockaddr_in = unsafe { mem::zeroed() };

    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
    {
        raw.sin_len = mem::size_of::<sockaddr_in>() as u8;
    }
    raw.sin_family = AF_INET as libc::sa_family_t;
    raw.sin_port = address.port().to_be();
    raw.sin_addr = in_addr {
        s_addr: u32::from(*address.ip()).to_be(),
    };

    raw
}

pub(crate) fn from_sockaddr(raw: &sockaddr_in) -> SocketAddrV4 {
    let ip = Ipv4Addr::from(u32::from_be(raw.sin_addr.s_addr));
    let port = u16::from_be(raw.sin_port);

    SocketAddrV4::new(ip, port)
}
