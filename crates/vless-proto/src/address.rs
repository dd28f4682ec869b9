//! Destination address decoding.
//!
//! The address field follows the port in the request header. Its encoding is
//! selected by a one-byte tag; nothing here performs DNS resolution, domains
//! are handed on as literal text.

use std::fmt;
use std::net::Ipv4Addr;

use crate::ParseError;

pub const ATYP_IPV4: u8 = 0x01;
pub const ATYP_DOMAIN: u8 = 0x02;
pub const ATYP_IPV6: u8 = 0x03;

/// Maximum domain name length (bounded by the one-byte length prefix).
pub const MAX_DOMAIN_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRef<'a> {
    Ipv4([u8; 4]),
    Domain(&'a str),
    Ipv6([u8; 16]),
}

impl HostRef<'_> {
    /// Address type tag used on the wire for this host.
    #[inline]
    pub fn atyp(&self) -> u8 {
        match self {
            HostRef::Ipv4(_) => ATYP_IPV4,
            HostRef::Domain(_) => ATYP_DOMAIN,
            HostRef::Ipv6(_) => ATYP_IPV6,
        }
    }
}

/// Formats the host the way it is handed to the connector.
///
/// IPv6 is written as eight colon-separated lowercase hex groups with no
/// zero compression, e.g. `2001:db8:0:0:0:0:0:1`.
impl fmt::Display for HostRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostRef::Ipv4(ip) => write!(f, "{}", Ipv4Addr::from(*ip)),
            HostRef::Domain(domain) => f.write_str(domain),
            HostRef::Ipv6(ip) => {
                for (i, group) in ip.chunks_exact(2).enumerate() {
                    if i > 0 {
                        f.write_str(":")?;
                    }
                    write!(f, "{:x}", u16::from_be_bytes([group[0], group[1]]))?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRef<'a> {
    pub host: HostRef<'a>,
    pub port: u16,
}

impl fmt::Display for AddressRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.host {
            HostRef::Ipv6(_) => write!(f, "[{}]:{}", self.host, self.port),
            _ => write!(f, "{}:{}", self.host, self.port),
        }
    }
}

/// Decode the address field starting at `buf[0]`.
///
/// Returns the host and the number of bytes consumed from `buf`.
#[inline]
pub fn parse_address(atyp: u8, buf: &[u8]) -> Result<(HostRef<'_>, usize), ParseError> {
    match atyp {
        ATYP_IPV4 => {
            if buf.len() < 4 {
                return Err(ParseError::Truncated);
            }
            Ok((HostRef::Ipv4([buf[0], buf[1], buf[2], buf[3]]), 4))
        }
        ATYP_DOMAIN => {
            let Some(&len) = buf.first() else {
                return Err(ParseError::Truncated);
            };
            let len = len as usize;
            if len == 0 {
                return Err(ParseError::InvalidDomain);
            }
            if buf.len() < 1 + len {
                return Err(ParseError::Truncated);
            }
            let domain =
                std::str::from_utf8(&buf[1..1 + len]).map_err(|_| ParseError::InvalidDomain)?;
            Ok((HostRef::Domain(domain), 1 + len))
        }
        ATYP_IPV6 => {
            if buf.len() < 16 {
                return Err(ParseError::Truncated);
            }
            let mut ip = [0u8; 16];
            ip.copy_from_slice(&buf[..16]);
            Ok((HostRef::Ipv6(ip), 16))
        }
        other => Err(ParseError::UnsupportedAddressType(other)),
    }
}
