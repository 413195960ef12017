use std::collections::HashMap;
use std::net::IpAddr;

use crate::message::{Message, TransactionId};

/// Tracks the transaction id of every Request a single Pair Tester has
/// sent, keyed by the peer it expects to answer. Populated by
/// `expect_reply_from` right after a Request is sent; consulted by
/// `verify_response` when a Response-typed datagram comes back.
///
/// Per-Pair-Tester, not shared: §5 of the connectivity-check design keeps
/// each tester's notion of "a reply I'm owed" private, so two testers can't
/// cross-validate each other's transactions even if they happen to share a
/// multiplexer.
#[derive(Debug, Default)]
pub struct ReplyCache {
    expected: HashMap<(IpAddr, u16), TransactionId>,
}

impl ReplyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers that `req` was just sent to `(addr, port)` and a Response
    /// from that peer carrying the same transaction id should be accepted.
    pub fn expect_reply_from(&mut self, req: &Message, addr: IpAddr, port: u16) {
        self.expected.insert((addr, port), req.transaction_id);
    }

    /// True iff `resp`'s transaction id matches the one most recently
    /// registered for `from`. Responses from any other sender, or with a
    /// stale/unknown transaction id, are rejected.
    #[must_use]
    pub fn verify_response(&self, resp: &Message, from: (IpAddr, u16)) -> bool {
        matches!(self.expected.get(&from), Some(id) if *id == resp.transaction_id)
    }
}

#[cfg(test)]
mod agent_test;
