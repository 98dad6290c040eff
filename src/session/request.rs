//! Request header codec.
//!
//! The first DATA frame of a session opens with the request header:
//!
//! ```text
//! command(1) | dst_port_be16(2) | addr_type(1) | addr
//! ```
//!
//! Address types: 1 = IPv4 (4 bytes), 3 = domain (1-byte length + bytes),
//! 4 = IPv6 (16 bytes). Any payload bytes after the header are the first
//! chunk of user data.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{Error, Result};

/// Requested transport for the proxied link.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Tunnel a TCP connection
    Tcp = 0x01,
    /// Tunnel UDP datagrams
    Udp = 0x02,
}

impl Command {
    /// Parse a command byte.
    pub fn from_u8(v: u8) -> Result<Self> {
        match v {
            0x01 => Ok(Self::Tcp),
            0x02 => Ok(Self::Udp),
            other => Err(Error::request(format!("unknown command: 0x{other:02x}"))),
        }
    }

    /// The wire byte for this command.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Target address of a proxied connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// Literal IPv4 address
    Ipv4(Ipv4Addr),
    /// Hostname, resolved by the dialer behind the dispatcher
    Domain(String),
    /// Literal IPv6 address
    Ipv6(Ipv6Addr),
}

impl Address {
    /// The wire type byte for this address kind.
    pub const fn type_byte(&self) -> u8 {
        match self {
            Self::Ipv4(_) => 1,
            Self::Domain(_) => 3,
            Self::Ipv6(_) => 4,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ipv4(ip) => write!(f, "{ip}"),
            Self::Domain(d) => write!(f, "{d}"),
            Self::Ipv6(ip) => write!(f, "[{ip}]"),
        }
    }
}

/// A dialable target: address plus port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Target address
    pub address: Address,
    /// Target port
    pub port: u16,
}

impl Destination {
    /// Convenience constructor for a domain target.
    pub fn domain(name: impl Into<String>, port: u16) -> Self {
        Self {
            address: Address::Domain(name.into()),
            port,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// The session request header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    /// Requested transport
    pub command: Command,
    /// Target to dispatch to
    pub destination: Destination,
}

impl RequestHeader {
    /// Encode into wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8);
        buf.push(self.command.as_u8());
        buf.extend_from_slice(&self.destination.port.to_be_bytes());
        buf.push(self.destination.address.type_byte());
        match &self.destination.address {
            Address::Ipv4(ip) => buf.extend_from_slice(&ip.octets()),
            Address::Domain(domain) => {
                buf.push(domain.len() as u8);
                buf.extend_from_slice(domain.as_bytes());
            }
            Address::Ipv6(ip) => buf.extend_from_slice(&ip.octets()),
        }
        buf
    }

    /// Decode from the front of a frame payload.
    ///
    /// Returns the header and the number of bytes it consumed; anything
    /// after that offset is initial user data.
    pub fn decode(payload: &[u8]) -> Result<(Self, usize)> {
        if payload.len() < 4 {
            return Err(Error::request("header too short"));
        }

        let command = Command::from_u8(payload[0])?;
        let port = u16::from_be_bytes([payload[1], payload[2]]);
        let addr_type = payload[3];

        let (address, consumed) = match addr_type {
            1 => {
                if payload.len() < 8 {
                    return Err(Error::request("truncated IPv4 address"));
                }
                let octets: [u8; 4] = payload[4..8].try_into().expect("fixed slice");
                (Address::Ipv4(Ipv4Addr::from(octets)), 8)
            }
            3 => {
                if payload.len() < 5 {
                    return Err(Error::request("truncated domain length"));
                }
                let len = payload[4] as usize;
                if len == 0 {
                    return Err(Error::request("empty domain"));
                }
                if payload.len() < 5 + len {
                    return Err(Error::request("truncated domain"));
                }
                let domain = std::str::from_utf8(&payload[5..5 + len])
                    .map_err(|_| Error::request("domain is not valid UTF-8"))?;
                (Address::Domain(domain.to_string()), 5 + len)
            }
            4 => {
                if payload.len() < 20 {
                    return Err(Error::request("truncated IPv6 address"));
                }
                let octets: [u8; 16] = payload[4..20].try_into().expect("fixed slice");
                (Address::Ipv6(Ipv6Addr::from(octets)), 20)
            }
            other => {
                return Err(Error::request(format!("unknown address type: {other}")));
            }
        };

        Ok((
            Self {
                command,
                destination: Destination { address, port },
            },
            consumed,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4_roundtrip() {
        let header = RequestHeader {
            command: Command::Tcp,
            destination: Destination {
                address: Address::Ipv4(Ipv4Addr::new(93, 184, 216, 34)),
                port: 443,
            },
        };

        let encoded = header.encode();
        assert_eq!(encoded, vec![0x01, 0x01, 0xBB, 0x01, 93, 184, 216, 34]);

        let (decoded, consumed) = RequestHeader::decode(&encoded).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(consumed, encoded.len());
    }

    #[test]
    fn test_domain_roundtrip() {
        let header = RequestHeader {
            command: Command::Tcp,
            destination: Destination::domain("example.com", 80),
        };

        let (decoded, consumed) = RequestHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(consumed, 4 + 1 + 11);
    }

    #[test]
    fn test_ipv6_roundtrip() {
        let header = RequestHeader {
            command: Command::Udp,
            destination: Destination {
                address: Address::Ipv6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)),
                port: 53,
            },
        };

        let (decoded, consumed) = RequestHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(consumed, 20);
    }

    #[test]
    fn test_trailing_bytes_are_initial_data() {
        let header = RequestHeader {
            command: Command::Tcp,
            destination: Destination::domain("example.com", 80),
        };

        let mut payload = header.encode();
        payload.extend_from_slice(b"GET / HTTP/1.1\r\n");

        let (decoded, consumed) = RequestHeader::decode(&payload).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(&payload[consumed..], b"GET / HTTP/1.1\r\n");
    }

    #[test]
    fn test_decode_errors() {
        // Too short for the fixed prefix.
        assert!(RequestHeader::decode(&[0x01, 0x00]).is_err());
        // Unknown command.
        assert!(RequestHeader::decode(&[0x09, 0x00, 0x50, 0x01, 1, 2, 3, 4]).is_err());
        // Unknown address type.
        assert!(RequestHeader::decode(&[0x01, 0x00, 0x50, 0x07, 0, 0, 0, 0]).is_err());
        // Truncated IPv4.
        assert!(RequestHeader::decode(&[0x01, 0x00, 0x50, 0x01, 1, 2]).is_err());
        // Truncated domain.
        assert!(RequestHeader::decode(&[0x01, 0x00, 0x50, 0x03, 10, b'a']).is_err());
        // Empty domain.
        assert!(RequestHeader::decode(&[0x01, 0x00, 0x50, 0x03, 0]).is_err());
        // Truncated IPv6.
        assert!(RequestHeader::decode(&[0x01, 0x00, 0x50, 0x04, 0, 0]).is_err());
    }

    #[test]
    fn test_destination_display() {
        assert_eq!(Destination::domain("example.com", 443).to_string(), "example.com:443");
        assert_eq!(
            Destination {
                address: Address::Ipv6(Ipv6Addr::LOCALHOST),
                port: 80
            }
            .to_string(),
            "[::1]:80"
        );
    }
}
