use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::candidate::CandidateInfo;

/// RFC 8445 §6.1.2.3: let `g` be the priority of the candidate offered by
/// the controlling agent and `d` the priority offered by the controlled
/// agent.
pub fn pair_priority(is_controller: bool, local_priority: u32, remote_priority: u32) -> u64 {
    let (g, d) = if is_controller {
        (local_priority, remote_priority)
    } else {
        (remote_priority, local_priority)
    };
    (1u64 << 32) * u64::from(g.min(d)) + 2 * u64::from(g.max(d)) + u64::from(g > d)
}

/// §3/§4.3: a pair's lifecycle. No transition skips a state — in
/// particular there is no direct `Frozen` → `Succeeded`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum PairState {
    Frozen = 0,
    Waiting = 1,
    InProgress = 2,
    Succeeded = 3,
    Failed = 4,
    Nominated = 5,
}

impl From<u8> for PairState {
    fn from(v: u8) -> Self {
        match v {
            1 => PairState::Waiting,
            2 => PairState::InProgress,
            3 => PairState::Succeeded,
            4 => PairState::Failed,
            5 => PairState::Nominated,
            _ => PairState::Frozen,
        }
    }
}

impl fmt::Display for PairState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PairState::Frozen => "frozen",
            PairState::Waiting => "waiting",
            PairState::InProgress => "in-progress",
            PairState::Succeeded => "succeeded",
            PairState::Failed => "failed",
            PairState::Nominated => "nominated",
        };
        write!(f, "{s}")
    }
}

/// One directed probe target (§3). `state` is an atomic so the Session
/// Coordinator can observe a Pair Tester's progress without taking a lock
/// on the hot path — the tester's own thread is the only writer.
pub struct CandidatePair {
    pub local: Arc<CandidateInfo>,
    pub remote: Arc<CandidateInfo>,
    pub priority: u64,
    state: AtomicU8,
}

impl CandidatePair {
    pub fn new(local: Arc<CandidateInfo>, remote: Arc<CandidateInfo>, is_controller: bool) -> Self {
        let priority = pair_priority(is_controller, local.priority, remote.priority);
        CandidatePair {
            local,
            remote,
            priority,
            state: AtomicU8::new(PairState::Frozen as u8),
        }
    }

    pub fn state(&self) -> PairState {
        PairState::from(self.state.load(Ordering::SeqCst))
    }

    pub fn set_state(&self, s: PairState) {
        self.state.store(s as u8, Ordering::SeqCst);
        if matches!(s, PairState::Failed | PairState::Succeeded | PairState::Nominated) {
            log::debug!(
                "pair {} -> {} ({} <-> {})",
                self.local.foundation,
                s,
                self.local.socket_addr(),
                self.remote.socket_addr(),
            );
        }
    }

    /// Two pairs are session-equal (§4.5) iff every `CandidateInfo` field
    /// of both sides matches.
    pub fn matches(&self, other: &CandidatePair) -> bool {
        self.local == other.local && self.remote == other.remote
    }
}

impl fmt::Debug for CandidatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidatePair")
            .field("local", &self.local.socket_addr())
            .field("remote", &self.remote.socket_addr())
            .field("priority", &self.priority)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod candidate_pair_test {
    use super::*;

    #[test]
    fn pair_priority_matches_the_rfc_formula() {
        // Scenario 4: controller pri G=100, controllee pri D=200.
        assert_eq!(pair_priority(true, 100, 200), 429_496_730_400);
        // Symmetric from the controllee's perspective: local=200 is D,
        // remote=100 is G; same inputs, same result.
        assert_eq!(pair_priority(false, 200, 100), 429_496_730_400);
    }

    #[test]
    fn higher_priority_side_sets_the_tiebreak_bit() {
        let tied_low_first = pair_priority(true, 5, 5);
        assert_eq!(tied_low_first, (1u64 << 32) * 5 + 2 * 5);

        let controller_higher = pair_priority(true, 10, 5);
        assert_eq!(controller_higher, (1u64 << 32) * 5 + 2 * 10 + 1);
    }

    #[test]
    fn no_direct_frozen_to_succeeded_transition_is_representable_but_unused() {
        // The type itself doesn't forbid setting Succeeded directly; the
        // Pair Tester state machine is the thing responsible for only
        // ever walking Frozen -> InProgress -> {Succeeded, Failed} ->
        // {Nominated}. This test documents the invariant lives there, not
        // in PairState.
        let from_u8 = PairState::from(3);
        assert_eq!(from_u8, PairState::Succeeded);
    }
}
