//! Connectivity-check core: probes every candidate pair offered by two ICE
//! agents and elects one usable path per media component (RFC 8445 §7,
//! trimmed to UDP and a single checklist with no freeze/unfreeze scheduling
//! across foundations).
//!
//! The pieces stack bottom-up: [`pair_tester`] drives one candidate pair's
//! binding and nomination handshake; [`candidate_tester`] owns one bound
//! local socket and fans pair testers out over it; [`session`] is the
//! top-level [`session::SessionCoordinator`] that partitions candidates into
//! testers, watches for the first foundation to complete every component,
//! and runs final nomination.

pub mod candidate;
pub mod candidate_tester;
pub mod config;
pub mod control;
mod error;
pub mod mux;
pub mod pair;
pub mod pair_tester;
pub mod session;

pub use error::{Error, Result};
