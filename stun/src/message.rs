use rand::Rng;

use crate::attributes::{AttrType, RawAttribute};
use crate::error::{Error, Result};

/// Fixed value that lets a STUN header be told apart from arbitrary
/// datagrams sharing the same port. RFC 5389 §6.
pub const MAGIC_COOKIE: u32 = 0x2112_a442;

pub const HEADER_SIZE: usize = 20;
pub const ATTR_HEADER_SIZE: usize = 4;
pub const TRANSACTION_ID_SIZE: usize = 12;

/// Maximum payload this codec will ever encode or accept, per spec.
pub const MAX_MESSAGE_SIZE: usize = 512;

/// The two STUN message classes this protocol uses. ICE connectivity
/// checks only ever exchange Binding Requests and Binding Success
/// Responses, so there is no Indication or Error Response class here.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MessageType {
    Request,
    Response,
}

impl MessageType {
    fn wire_value(self) -> u16 {
        match self {
            MessageType::Request => 0x0001,
            MessageType::Response => 0x0101,
        }
    }

    fn from_wire(v: u16) -> Option<Self> {
        match v {
            0x0001 => Some(MessageType::Request),
            0x0101 => Some(MessageType::Response),
            _ => None,
        }
    }
}

/// 96-bit random token linking a Request to its Response.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct TransactionId(pub [u8; TRANSACTION_ID_SIZE]);

impl TransactionId {
    /// Generates a new transaction id from a cryptographically seeded RNG.
    pub fn new() -> Self {
        let mut id = [0u8; TRANSACTION_ID_SIZE];
        rand::thread_rng().fill(&mut id);
        TransactionId(id)
    }
}

/// One STUN datagram: header plus an ordered list of attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub typ: MessageType,
    pub transaction_id: TransactionId,
    pub attributes: Vec<RawAttribute>,
}

impl Message {
    /// Builds a fresh Binding Request with a random transaction id.
    pub fn new_request() -> Self {
        Message {
            typ: MessageType::Request,
            transaction_id: TransactionId::new(),
            attributes: Vec::new(),
        }
    }

    /// Builds the Response that answers `req`, copying its transaction id.
    pub fn new_response_to(req: &Message) -> Self {
        Message {
            typ: MessageType::Response,
            transaction_id: req.transaction_id,
            attributes: Vec::new(),
        }
    }

    /// Appends a raw attribute. Callers needing typed access use the
    /// `Setter`/`Getter` impls in `attributes.rs`/`xoraddr.rs` instead.
    pub fn add(&mut self, t: AttrType, value: &[u8]) {
        self.attributes.push(RawAttribute {
            typ: t,
            value: value.to_vec(),
        });
    }

    /// Returns the value bytes of the first attribute of type `t`.
    pub fn get(&self, t: AttrType) -> Result<&[u8]> {
        self.attributes
            .iter()
            .find(|a| a.typ == t)
            .map(|a| a.value.as_slice())
            .ok_or(Error::AttributeNotFound(t.0))
    }

    pub fn contains(&self, t: AttrType) -> bool {
        self.attributes.iter().any(|a| a.typ == t)
    }

    /// Encodes the message as wire bytes: 20-byte header followed by each
    /// attribute's TLV, padded to the next 4-byte boundary, all
    /// big-endian. Panics never; a message built entirely from this
    /// module's attribute helpers can't exceed the attribute-length limits
    /// the wire format allows.
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for attr in &self.attributes {
            body.extend_from_slice(&attr.typ.0.to_be_bytes());
            body.extend_from_slice(&(attr.value.len() as u16).to_be_bytes());
            body.extend_from_slice(&attr.value);
            let pad = (4 - (attr.value.len() % 4)) % 4;
            body.extend(std::iter::repeat(0u8).take(pad));
        }

        let mut out = Vec::with_capacity(HEADER_SIZE + body.len());
        out.extend_from_slice(&self.typ.wire_value().to_be_bytes());
        out.extend_from_slice(&(body.len() as u16).to_be_bytes());
        out.extend_from_slice(&MAGIC_COOKIE.to_be_bytes());
        out.extend_from_slice(&self.transaction_id.0);
        out.extend_from_slice(&body);
        out
    }

    /// Decodes a wire datagram. Rejects anything shorter than the header,
    /// with the wrong magic cookie, or whose declared length doesn't
    /// match what's actually left in `buf`. A caller that gets `Err` here
    /// drops the datagram; decode errors are never fatal to a session.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::Short);
        }

        let typ_raw = u16::from_be_bytes([buf[0], buf[1]]);
        let typ = MessageType::from_wire(typ_raw).ok_or(Error::Short)?;
        let length = u16::from_be_bytes([buf[2], buf[3]]) as usize;
        let cookie = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        if cookie != MAGIC_COOKIE {
            return Err(Error::BadMagicCookie);
        }

        let mut transaction_id = [0u8; TRANSACTION_ID_SIZE];
        transaction_id.copy_from_slice(&buf[8..HEADER_SIZE]);

        let body = &buf[HEADER_SIZE..];
        if body.len() != length {
            return Err(Error::LengthMismatch {
                declared: length,
                remaining: body.len(),
            });
        }

        let mut attributes = Vec::new();
        let mut pos = 0usize;
        while pos < body.len() {
            if body.len() - pos < ATTR_HEADER_SIZE {
                return Err(Error::Short);
            }
            let t = u16::from_be_bytes([body[pos], body[pos + 1]]);
            let len = u16::from_be_bytes([body[pos + 2], body[pos + 3]]) as usize;
            pos += ATTR_HEADER_SIZE;
            if body.len() - pos < len {
                return Err(Error::AttributeTruncated(t));
            }
            attributes.push(RawAttribute {
                typ: AttrType(t),
                value: body[pos..pos + len].to_vec(),
            });
            pos += len;
            let pad = (4 - (len % 4)) % 4;
            pos += pad.min(body.len() - pos);
        }

        Ok(Message {
            typ,
            transaction_id: TransactionId(transaction_id),
            attributes,
        })
    }
}

#[cfg(test)]
mod message_test;
