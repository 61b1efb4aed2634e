use std::fmt;
use std::io;
use std::io::Write;
use std::net::Ipv4Addr;

use crate::consensus::{Decodable, Encodable, encode};

/// The network address a masternode serves on.
///
/// Encoded as a 16 byte IPv6 address, IPv4 addresses being IPv4-mapped
/// (`::ffff:a.b.c.d`), followed by the port in network byte order.
#[derive(Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct ServiceAddress {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl ServiceAddress {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        ServiceAddress {
            ip,
            port,
        }
    }
}

impl fmt::Display for ServiceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

impl Encodable for ServiceAddress {
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, io::Error> {
        let mut ip_address = [0u8; 16];
        ip_address[10] = 0xff;
        ip_address[11] = 0xff;
        ip_address[12..16].copy_from_slice(&self.ip.octets());

        let mut len = ip_address.consensus_encode(writer)?;
        len += self.port.to_be_bytes().consensus_encode(writer)?;
        Ok(len)
    }
}

impl Decodable for ServiceAddress {
    fn consensus_decode<R: io::Read + ?Sized>(reader: &mut R) -> Result<Self, encode::Error> {
        let ip_address: [u8; 16] = Decodable::consensus_decode(reader)?;
        let port: [u8; 2] = Decodable::consensus_decode(reader)?;
        // Non mapped (pure IPv6) addresses keep their last four bytes; masternodes only
        // announce IPv4 endpoints.
        let ip = Ipv4Addr::new(ip_address[12], ip_address[13], ip_address[14], ip_address[15]);
        Ok(ServiceAddress {
            ip,
            port: u16::from_be_bytes(port),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{deserialize, serialize};

    #[test]
    fn ipv4_mapped_with_big_endian_port() {
        let address = ServiceAddress::new(Ipv4Addr::new(192, 168, 1, 10), 9999);
        let bytes = serialize(&address);
        assert_eq!(
            bytes,
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff, 192, 168, 1, 10, 0x27, 0x0f]
        );
        assert_eq!(deserialize::<ServiceAddress>(&bytes).unwrap(), address);
        assert_eq!(address.to_string(), "192.168.1.10:9999");
    }
}
