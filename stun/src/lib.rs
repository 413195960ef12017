//! A minimal STUN (RFC 5389) message codec, scoped to exactly what ICE
//! connectivity checks need: the 20-byte header, transaction ids, and the
//! five attributes used by the binding and nomination exchanges
//! (XOR-MAPPED-ADDRESS, PRIORITY, USE-CANDIDATE, ICE-CONTROLLED,
//! ICE-CONTROLLING). There is no message-integrity, fingerprint, or
//! SASLprep support here — those belong to a general-purpose STUN/TURN
//! transport, not to a single connectivity-check exchange riding over an
//! already-authenticated, already-demultiplexed UDP socket.

pub mod agent;
pub mod attributes;
mod error;
pub mod message;
pub mod xoraddr;

pub use error::{Error, Result};
