use std::time::Duration;

/// Retransmission schedule constants from §4.3/§9: the canonical numbers,
/// chosen (per the spec's own note) to match the more recently edited of
/// two near-duplicate code paths in the system this was distilled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Attempts waiting for a binding Request/Response, growing `wait_unit_ms * k`.
    pub binding_retries: usize,
    /// Base unit of the growing binding-phase wait schedule, in ms.
    pub wait_unit_ms: u64,
    /// Retransmits of a reply to an incoming binding Request, 20ms apart.
    pub binding_response_retransmits: usize,
    /// Attempts for the controller's final USE-CANDIDATE probe.
    pub nomination_retries: usize,
    /// Attempts for the controllee's nomination wait loop.
    pub controllee_nomination_waits: usize,
    /// Retransmits of the controllee's reply to USE-CANDIDATE, 20ms apart.
    pub nomination_response_retransmits: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            binding_retries: 20,
            wait_unit_ms: 20,
            binding_response_retransmits: 3,
            nomination_retries: 25,
            controllee_nomination_waits: 128,
            nomination_response_retransmits: 5,
        }
    }
}

impl ScheduleConfig {
    /// The wait deadline for the k-th attempt (1-indexed), per §4.3's
    /// "timeout `20*k` ms for the k-th attempt" rule.
    pub fn wait_for_attempt(&self, k: usize) -> Duration {
        Duration::from_millis(self.wait_unit_ms * k as u64)
    }

    pub fn retransmit_spacing(&self) -> Duration {
        Duration::from_millis(self.wait_unit_ms)
    }
}

/// Per-session configuration passed into `SessionCoordinator::start_session`.
/// No process-wide mutable state backs any of this — the spec's Design
/// Notes permit exactly one piece of global state (the RNG seed) and this
/// crate doesn't even need that, since transaction ids are drawn by `stun`
/// itself from `rand::thread_rng()` at encode time.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub controller_timeout: Duration,
    pub controllee_timeout: Duration,
    pub schedule: ScheduleConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            controller_timeout: Duration::from_secs(10),
            controllee_timeout: Duration::from_secs(20),
            schedule: ScheduleConfig::default(),
        }
    }
}
