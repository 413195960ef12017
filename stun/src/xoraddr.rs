use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::attributes::{check_len, AttrType, Getter, Setter, ATTR_XOR_MAPPED_ADDRESS};
use crate::error::{Error, Result};
use crate::message::{Message, MAGIC_COOKIE, TRANSACTION_ID_SIZE};

const FAMILY_IPV4: u16 = 0x0001;
const FAMILY_IPV6: u16 = 0x0002;
const IPV4LEN: usize = 4;
const IPV6LEN: usize = 16;

fn xor_bytes(dst: &mut [u8], a: &[u8], b: &[u8]) {
    for i in 0..dst.len() {
        dst[i] = a[i] ^ b[i];
    }
}

/// XOR-MAPPED-ADDRESS: the address/port observed by the remote peer,
/// obfuscated by XORing with the magic cookie (and, for IPv6, the
/// transaction id too) so that NATs rewriting plain addresses in-flight
/// don't also mangle this one. RFC 5389 §15.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorMappedAddress {
    pub ip: IpAddr,
    pub port: u16,
}

impl Setter for XorMappedAddress {
    fn add_to(&self, m: &mut Message) -> Result<()> {
        self.add_to_as(m, ATTR_XOR_MAPPED_ADDRESS)
    }
}

impl Getter for XorMappedAddress {
    fn get_from(&mut self, m: &Message) -> Result<()> {
        self.get_from_as(m, ATTR_XOR_MAPPED_ADDRESS)
    }
}

impl XorMappedAddress {
    pub fn add_to_as(&self, m: &mut Message, t: AttrType) -> Result<()> {
        let (family, ip_len, ip) = match self.ip {
            IpAddr::V4(v4) => (FAMILY_IPV4, IPV4LEN, v4.octets().to_vec()),
            IpAddr::V6(v6) => (FAMILY_IPV6, IPV6LEN, v6.octets().to_vec()),
        };

        let mut xor_pad = vec![0u8; IPV6LEN];
        xor_pad[0..4].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
        xor_pad[4..].copy_from_slice(&m.transaction_id.0);

        let mut value = vec![0u8; 4 + ip_len];
        value[0..2].copy_from_slice(&family.to_be_bytes());
        value[2..4].copy_from_slice(&(self.port ^ (MAGIC_COOKIE >> 16) as u16).to_be_bytes());
        xor_bytes(&mut value[4..], &ip, &xor_pad[..ip_len]);

        m.add(t, &value);
        Ok(())
    }

    pub fn get_from_as(&mut self, m: &Message, t: AttrType) -> Result<()> {
        let v = m.get(t)?;
        if v.len() <= 4 {
            return Err(Error::AttributeTruncated(t.0));
        }

        let family = u16::from_be_bytes([v[0], v[1]]);
        let ip_len = match family {
            FAMILY_IPV4 => IPV4LEN,
            FAMILY_IPV6 => IPV6LEN,
            other => return Err(Error::UnsupportedFamily(other as u8)),
        };
        check_len(t, v.len() - 4, ip_len)?;

        self.port = u16::from_be_bytes([v[2], v[3]]) ^ (MAGIC_COOKIE >> 16) as u16;

        let mut xor_pad = [0u8; 4 + TRANSACTION_ID_SIZE];
        xor_pad[0..4].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
        xor_pad[4..].copy_from_slice(&m.transaction_id.0);

        if family == FAMILY_IPV6 {
            let mut octets = [0u8; IPV6LEN];
            xor_bytes(&mut octets, &v[4..], &xor_pad);
            self.ip = IpAddr::V6(Ipv6Addr::from(octets));
        } else {
            let mut octets = [0u8; IPV4LEN];
            xor_bytes(&mut octets, &v[4..], &xor_pad[..IPV4LEN]);
            self.ip = IpAddr::V4(Ipv4Addr::from(octets));
        }

        Ok(())
    }
}

#[cfg(test)]
mod xoraddr_test;
