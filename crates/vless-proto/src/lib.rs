//! VLESS handshake parsing and serialization.
//!
//! A session starts with a single request header followed by raw stream bytes:
//!
//! ```text
//! +---------+----------+-----------+--------+---------+------+------+---------+---------+
//! | version | id (16)  | addon len | addons | command | port | atyp | address | payload |
//! +---------+----------+-----------+--------+---------+------+------+---------+---------+
//! ```
//!
//! Parsers are zero-copy: the decoded request borrows from the input buffer,
//! and whatever follows the address is handed back as `payload`.

mod address;

pub use address::{
    ATYP_DOMAIN, ATYP_IPV4, ATYP_IPV6, AddressRef, HostRef, MAX_DOMAIN_LEN, parse_address,
};

use bytes::BytesMut;

/// The only protocol version understood.
pub const VERSION: u8 = 0x00;
/// Identifier length (a UUID).
pub const ID_LEN: usize = 16;
/// version + id + addon length.
pub const MIN_HEADER_LEN: usize = 1 + ID_LEN + 1;
/// Maximum addons length (bounded by the one-byte length prefix).
pub const MAX_ADDONS_LEN: usize = 255;

pub const CMD_TCP: u8 = 0x01;
/// Recognized on the wire but not relayed.
pub const CMD_UDP: u8 = 0x02;

/// Reply sent once the destination is connected: version echo + empty addons.
pub const ACCEPTANCE: [u8; 2] = [VERSION, 0x00];

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("handshake truncated")]
    Truncated,
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),
    #[error("unsupported command {0}")]
    UnsupportedCommand(u8),
    #[error("unsupported address type {0}")]
    UnsupportedAddressType(u8),
    #[error("invalid domain name")]
    InvalidDomain,
}

/// Errors that can occur when writing protocol data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WriteError {
    /// Domain name exceeds 255 bytes.
    #[error("domain too long")]
    DomainTooLong,
    /// Addons exceed 255 bytes.
    #[error("addons too long")]
    AddonsTooLong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlessRequest<'a> {
    pub version: u8,
    pub id: &'a [u8; ID_LEN],
    /// Skipped; only the length is honored.
    pub addons: &'a [u8],
    pub command: u8,
    pub address: AddressRef<'a>,
    pub header_len: usize,
    /// First bytes of the application stream.
    pub payload: &'a [u8],
}

/// Decode the request header carried by the first frame of a session.
///
/// Any error is fatal for the session; there is no "need more data" state
/// because the whole header arrives in one frame.
pub fn decode_handshake(buf: &[u8]) -> Result<VlessRequest<'_>, ParseError> {
    if buf.len() < MIN_HEADER_LEN {
        return Err(ParseError::Truncated);
    }

    let version = buf[0];
    if version != VERSION {
        return Err(ParseError::UnsupportedVersion(version));
    }

    let id = <&[u8; ID_LEN]>::try_from(&buf[1..1 + ID_LEN]).map_err(|_| ParseError::Truncated)?;
    let addons_len = buf[1 + ID_LEN] as usize;
    let mut offset = MIN_HEADER_LEN;

    // addons + command + port + atyp must all be present before the address.
    if buf.len() < offset + addons_len + 4 {
        return Err(ParseError::Truncated);
    }
    let addons = &buf[offset..offset + addons_len];
    offset += addons_len;

    let command = buf[offset];
    if command != CMD_TCP {
        return Err(ParseError::UnsupportedCommand(command));
    }
    let port = read_u16(&buf[offset + 1..offset + 3]);
    let atyp = buf[offset + 3];
    offset += 4;

    let (host, addr_len) = parse_address(atyp, &buf[offset..])?;
    offset += addr_len;

    Ok(VlessRequest {
        version,
        id,
        addons,
        command,
        address: AddressRef { host, port },
        header_len: offset,
        payload: &buf[offset..],
    })
}

/// The fixed acceptance reply.
#[inline]
pub fn encode_acceptance() -> [u8; 2] {
    ACCEPTANCE
}

/// Writes a request header to the buffer.
///
/// # Errors
/// - `AddonsTooLong` if addons exceed 255 bytes.
/// - `DomainTooLong` if the address is a domain longer than 255 bytes.
#[allow(clippy::cast_possible_truncation)]
pub fn write_request_header(
    buf: &mut BytesMut,
    id: &[u8; ID_LEN],
    addons: &[u8],
    command: u8,
    address: &AddressRef<'_>,
) -> Result<(), WriteError> {
    if addons.len() > MAX_ADDONS_LEN {
        return Err(WriteError::AddonsTooLong);
    }
    if let HostRef::Domain(d) = address.host
        && d.len() > MAX_DOMAIN_LEN
    {
        return Err(WriteError::DomainTooLong);
    }
    buf.extend_from_slice(&[VERSION]);
    buf.extend_from_slice(id);
    buf.extend_from_slice(&[addons.len() as u8]);
    buf.extend_from_slice(addons);
    buf.extend_from_slice(&[command]);
    buf.extend_from_slice(&address.port.to_be_bytes());
    buf.extend_from_slice(&[address.host.atyp()]);
    match address.host {
        HostRef::Ipv4(ip) => buf.extend_from_slice(&ip),
        HostRef::Ipv6(ip) => buf.extend_from_slice(&ip),
        HostRef::Domain(domain) => {
            buf.extend_from_slice(&[domain.len() as u8]);
            buf.extend_from_slice(domain.as_bytes());
        }
    }
    Ok(())
}

#[inline]
fn read_u16(buf: &[u8]) -> u16 {
    debug_assert!(buf.len() >= 2, "read_u16 requires at least 2 bytes");
    u16::from_be_bytes([buf[0], buf[1]])
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: [u8; ID_LEN] = [
        0x90, 0xcd, 0x24, 0x51, 0x93, 0x16, 0x43, 0xf1, 0xb1, 0xe1, 0x12, 0x34, 0x56, 0x78, 0x9a,
        0xbc,
    ];

    fn header(addons: &[u8], address: &AddressRef<'_>, payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        write_request_header(&mut buf, &ID, addons, CMD_TCP, address).unwrap();
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn decodes_every_address_type_with_payload() {
        let hosts = [
            HostRef::Ipv4([93, 184, 216, 34]),
            HostRef::Domain("example.com"),
            HostRef::Ipv6([0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01]),
        ];
        for host in hosts {
            let addr = AddressRef { host, port: 8443 };
            let buf = header(&[], &addr, b"GET / HTTP/1.1\r\n");
            let req = decode_handshake(&buf).unwrap();
            assert_eq!(req.version, VERSION);
            assert_eq!(req.id, &ID);
            assert_eq!(req.command, CMD_TCP);
            assert_eq!(req.address, addr);
            assert_eq!(req.payload, b"GET / HTTP/1.1\r\n");
            assert_eq!(req.header_len + req.payload.len(), buf.len());
        }
    }

    #[test]
    fn addons_are_skipped_but_honored() {
        let addr = AddressRef {
            host: HostRef::Ipv4([10, 0, 0, 1]),
            port: 22,
        };
        let buf = header(&[0x0a, 0x03, b'a', b'b', b'c'], &addr, b"xyz");
        let req = decode_handshake(&buf).unwrap();
        assert_eq!(req.addons.len(), 5);
        assert_eq!(req.address, addr);
        assert_eq!(req.payload, b"xyz");
    }

    #[test]
    fn port_is_big_endian() {
        let addr = AddressRef {
            host: HostRef::Ipv4([1, 1, 1, 1]),
            port: 0x01bb,
        };
        let buf = header(&[], &addr, &[]);
        // version + id + addon len + command
        assert_eq!(&buf[19..21], &[0x01, 0xbb]);
        assert_eq!(decode_handshake(&buf).unwrap().address.port, 443);
    }

    #[test]
    fn short_buffers_are_truncated() {
        assert_eq!(decode_handshake(&[]), Err(ParseError::Truncated));
        assert_eq!(decode_handshake(&[0u8; 17]), Err(ParseError::Truncated));

        let addr = AddressRef {
            host: HostRef::Domain("example.com"),
            port: 80,
        };
        let buf = header(&[1, 2, 3], &addr, &[]);
        // Every prefix that cuts into the header must fail with Truncated.
        for cut in MIN_HEADER_LEN..buf.len() {
            assert_eq!(
                decode_handshake(&buf[..cut]),
                Err(ParseError::Truncated),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn addon_length_past_end_is_truncated() {
        let mut buf = vec![VERSION];
        buf.extend_from_slice(&ID);
        buf.push(200);
        buf.extend_from_slice(&[0u8; 10]);
        assert_eq!(decode_handshake(&buf), Err(ParseError::Truncated));
    }

    #[test]
    fn rejects_other_versions() {
        let addr = AddressRef {
            host: HostRef::Ipv4([1, 2, 3, 4]),
            port: 80,
        };
        let mut buf = header(&[], &addr, &[]);
        buf[0] = 1;
        assert_eq!(decode_handshake(&buf), Err(ParseError::UnsupportedVersion(1)));
    }

    #[test]
    fn udp_is_recognized_but_unsupported() {
        let addr = AddressRef {
            host: HostRef::Ipv4([8, 8, 8, 8]),
            port: 53,
        };
        let mut buf = BytesMut::new();
        write_request_header(&mut buf, &ID, &[], CMD_UDP, &addr).unwrap();
        assert_eq!(decode_handshake(&buf), Err(ParseError::UnsupportedCommand(CMD_UDP)));

        buf.clear();
        write_request_header(&mut buf, &ID, &[], 0x03, &addr).unwrap();
        assert_eq!(decode_handshake(&buf), Err(ParseError::UnsupportedCommand(0x03)));
    }

    #[test]
    fn rejects_unknown_address_type() {
        let addr = AddressRef {
            host: HostRef::Ipv4([1, 2, 3, 4]),
            port: 80,
        };
        let mut buf = header(&[], &addr, &[]);
        buf[21] = 0x07;
        assert_eq!(
            decode_handshake(&buf),
            Err(ParseError::UnsupportedAddressType(0x07))
        );
    }

    #[test]
    fn acceptance_is_two_zero_bytes() {
        assert_eq!(encode_acceptance(), [0x00, 0x00]);
    }

    #[test]
    fn write_rejects_oversized_fields() {
        let long_domain = "a".repeat(256);
        let addr = AddressRef {
            host: HostRef::Domain(&long_domain),
            port: 443,
        };
        let mut buf = BytesMut::new();
        assert_eq!(
            write_request_header(&mut buf, &ID, &[], CMD_TCP, &addr),
            Err(WriteError::DomainTooLong)
        );

        let addr = AddressRef {
            host: HostRef::Ipv4([1, 2, 3, 4]),
            port: 443,
        };
        assert_eq!(
            write_request_header(&mut buf, &ID, &[0u8; 256], CMD_TCP, &addr),
            Err(WriteError::AddonsTooLong)
        );
    }
}
