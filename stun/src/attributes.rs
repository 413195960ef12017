use std::fmt;

use crate::error::{Error, Result};
use crate::message::Message;

/// Type code of a STUN attribute, as carried in the 2-byte `type` field of
/// its TLV header.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
pub struct AttrType(pub u16);

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// XOR-MAPPED-ADDRESS, RFC 5389 §15.2.
pub const ATTR_XOR_MAPPED_ADDRESS: AttrType = AttrType(0x0020);
/// PRIORITY, RFC 8445 §16.1.
pub const ATTR_PRIORITY: AttrType = AttrType(0x0024);
/// USE-CANDIDATE, RFC 8445 §16.1.
pub const ATTR_USE_CANDIDATE: AttrType = AttrType(0x0025);
/// ICE-CONTROLLED, RFC 8445 §16.1.
pub const ATTR_ICE_CONTROLLED: AttrType = AttrType(0x8029);
/// ICE-CONTROLLING, RFC 8445 §16.1.
pub const ATTR_ICE_CONTROLLING: AttrType = AttrType(0x802a);

/// A decoded attribute as stored on a [`Message`] after parsing: just the
/// type code and raw value bytes. Typed accessors (PRIORITY, flags,
/// XOR-MAPPED-ADDRESS) are layered on top in `message.rs` and `xoraddr.rs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub typ: AttrType,
    pub value: Vec<u8>,
}

/// Implemented by values that can be encoded into a [`Message`] as an
/// attribute.
pub trait Setter {
    fn add_to(&self, m: &mut Message) -> Result<()>;
}

/// Implemented by values that can be decoded out of a [`Message`].
pub trait Getter {
    fn get_from(&mut self, m: &Message) -> Result<()>;
}

pub(crate) fn check_len(t: AttrType, got: usize, want: usize) -> Result<()> {
    if got != want {
        Err(Error::AttributeLength {
            attr: t.0,
            len: got,
            expected: want,
        })
    } else {
        Ok(())
    }
}

/// PRIORITY, a plain big-endian `u32`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Priority(pub u32);

impl Setter for Priority {
    fn add_to(&self, m: &mut Message) -> Result<()> {
        m.add(ATTR_PRIORITY, &self.0.to_be_bytes());
        Ok(())
    }
}

impl Getter for Priority {
    fn get_from(&mut self, m: &Message) -> Result<()> {
        let v = m.get(ATTR_PRIORITY)?;
        check_len(ATTR_PRIORITY, v.len(), 4)?;
        self.0 = u32::from_be_bytes([v[0], v[1], v[2], v[3]]);
        Ok(())
    }
}

/// A zero-length, presence-only attribute: USE-CANDIDATE,
/// ICE-CONTROLLED, ICE-CONTROLLING. None of these carry a value on the
/// wire in this deployment (the original implementation never used
/// ICE-CONTROLLED/CONTROLLING as 64-bit tie-breakers, only as role flags,
/// and the spec settles the ambiguity the same way).
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Flag(pub AttrType);

impl Setter for Flag {
    fn add_to(&self, m: &mut Message) -> Result<()> {
        m.add(self.0, &[]);
        Ok(())
    }
}

impl Flag {
    #[must_use]
    pub fn is_set(m: &Message, t: AttrType) -> bool {
        m.get(t).is_ok()
    }
}
