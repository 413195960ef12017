use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::candidate::CandidateInfo;
use crate::candidate_tester::CandidateTester;
use crate::config::SessionConfig;
use crate::control::Role;
use crate::pair::{CandidatePair, PairState};
use crate::pair_tester::PairOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    Succeeded,
    Failed,
}

/// §6's externally-visible `nominationFailed` reasons — exactly these four,
/// nothing else. A precondition violation (empty candidate list, zero
/// session id) has no dedicated reason of its own; §7 calls for it to
/// surface as a generic failure once past the boundary check, so it's
/// folded into `BindFailure` here rather than minted as a fifth variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Timeout,
    BindFailure,
    NominationRejected,
    Cancelled,
}

/// The elected path for one media component, handed to the media delivery
/// layer (§6).
#[derive(Debug, Clone, Copy)]
pub struct ComponentResult {
    pub local: SocketAddr,
    pub remote: SocketAddr,
}

/// A point-in-time snapshot of one pair's progress, for diagnostics.
/// Mirrors the shape of the teacher's own `CandidatePairStats`, trimmed to
/// what this coordinator actually tracks — no byte/packet counters, since
/// nothing here sits on the data path.
#[derive(Debug, Clone)]
pub struct PairSnapshot {
    pub foundation: String,
    pub component: u8,
    pub local: SocketAddr,
    pub remote: SocketAddr,
    pub priority: u64,
    pub state: PairState,
}

/// What `start_session` resolves to. `AlreadyRunning` is the idempotence
/// no-op case (§4.5): an identical pair-set session is already in flight.
#[derive(Debug)]
pub enum SessionOutcome {
    Succeeded(HashMap<u8, ComponentResult>),
    Failed(FailureReason),
    AlreadyRunning,
}

/// Per-session result state (§3). Owned by the `SessionCoordinator`'s
/// cache; never shared outside a lock.
struct NominationRecord {
    session_id: u64,
    status: SessionStatus,
    pairs: Vec<Arc<CandidatePair>>,
    nominated_pairs: HashMap<u8, Arc<CandidatePair>>,
    failure_reason: Option<FailureReason>,
}

impl NominationRecord {
    /// §4.5 session equality: same cardinality, and every pair in one set
    /// has a matching pair (by all `CandidateInfo` fields on both sides)
    /// in the other.
    fn pair_set_matches(&self, pairs: &[Arc<CandidatePair>]) -> bool {
        self.pairs.len() == pairs.len()
            && pairs.iter().all(|p| self.pairs.iter().any(|q| p.matches(q)))
    }

    fn component_results(&self) -> HashMap<u8, ComponentResult> {
        self.nominated_pairs
            .iter()
            .map(|(&component, pair)| {
                (
                    component,
                    ComponentResult {
                        local: pair.local.socket_addr(),
                        remote: pair.remote.socket_addr(),
                    },
                )
            })
            .collect()
    }
}

/// Top-level per-session driver (§4.5). One `SessionCoordinator` can run
/// many sessions over its lifetime; its record cache is the only state
/// that outlives an individual `start_session` call, and every entry in
/// it is itself a `NominationRecord` keyed by session id, matching §5's
/// "no global mutable state outside a NominationRecord" constraint.
#[derive(Default)]
pub struct SessionCoordinator {
    records: Mutex<Vec<NominationRecord>>,
    cancels: Mutex<HashMap<u64, watch::Sender<bool>>>,
}

impl SessionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops an in-progress session and frees its resources (§6). A
    /// session that has already completed, or that this coordinator never
    /// started, is a no-op.
    pub fn cancel_session(&self, session_id: u64) {
        if let Some(tx) = self.cancels.lock().unwrap().get(&session_id) {
            let _ = tx.send(true);
        }
    }

    /// Snapshot of every pair this session considered, for the signalling
    /// layer's own diagnostics. `None` if no session with this id has ever
    /// run on this coordinator.
    pub fn stats(&self, session_id: u64) -> Option<Vec<PairSnapshot>> {
        let records = self.records.lock().unwrap();
        let record = records.iter().find(|r| r.session_id == session_id)?;
        Some(
            record
                .pairs
                .iter()
                .map(|p| PairSnapshot {
                    foundation: p.local.foundation.clone(),
                    component: p.local.component,
                    local: p.local.socket_addr(),
                    remote: p.remote.socket_addr(),
                    priority: p.priority,
                    state: p.state(),
                })
                .collect(),
        )
    }

    /// Runs (or replays) one ICE session to completion (§4.5 algorithm,
    /// steps 1-9, plus idempotence/caching).
    pub async fn start_session(
        &self,
        session_id: u64,
        local_candidates: Vec<CandidateInfo>,
        remote_candidates: Vec<CandidateInfo>,
        is_controller: bool,
        config: SessionConfig,
    ) -> SessionOutcome {
        if session_id == 0 || local_candidates.is_empty() || remote_candidates.is_empty() {
            log::info!("session {session_id} rejected: empty candidate list or session id 0");
            return SessionOutcome::Failed(FailureReason::BindFailure);
        }

        let pairs = build_pairs(&local_candidates, &remote_candidates, is_controller);

        if let Some(outcome) = self.replay_if_cached(session_id, &pairs) {
            return outcome;
        }

        self.records.lock().unwrap().push(NominationRecord {
            session_id,
            status: SessionStatus::Running,
            pairs: pairs.clone(),
            nominated_pairs: HashMap::new(),
            failure_reason: None,
        });

        let role = if is_controller {
            Role::Controller
        } else {
            Role::Controllee
        };
        let timeout = if is_controller {
            config.controller_timeout
        } else {
            config.controllee_timeout
        };

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.cancels.lock().unwrap().insert(session_id, cancel_tx);

        let outcome = self
            .drive_testers(role, &pairs, config, timeout, cancel_rx)
            .await;

        self.cancels.lock().unwrap().remove(&session_id);
        self.commit(session_id, &outcome);
        outcome
    }

    /// §4.5 idempotence: restarting *this* session id against an identical
    /// pair set replays the cached result. A NominationRecord is always
    /// keyed by session id (§5), so a coincidentally identical pair set
    /// under a different id is a distinct session and reruns.
    fn replay_if_cached(&self, session_id: u64, pairs: &[Arc<CandidatePair>]) -> Option<SessionOutcome> {
        let records = self.records.lock().unwrap();
        let record = records
            .iter()
            .find(|r| r.session_id == session_id && r.pair_set_matches(pairs))?;
        Some(match record.status {
            SessionStatus::Succeeded => SessionOutcome::Succeeded(record.component_results()),
            SessionStatus::Failed => {
                SessionOutcome::Failed(record.failure_reason.unwrap_or(FailureReason::Timeout))
            }
            SessionStatus::Running => SessionOutcome::AlreadyRunning,
        })
    }

    fn commit(&self, session_id: u64, outcome: &SessionOutcome) {
        match outcome {
            SessionOutcome::Succeeded(results) => {
                log::info!("session {session_id} succeeded with {} component(s)", results.len());
            }
            SessionOutcome::Failed(FailureReason::Cancelled) => {
                log::info!("session {session_id} cancelled");
            }
            SessionOutcome::Failed(reason) => {
                log::info!("session {session_id} failed: {reason:?}");
            }
            SessionOutcome::AlreadyRunning => {}
        }

        let mut records = self.records.lock().unwrap();
        let Some(record) = records.iter_mut().find(|r| r.session_id == session_id) else {
            return;
        };
        match outcome {
            SessionOutcome::Succeeded(results) => {
                record.status = SessionStatus::Succeeded;
                record.nominated_pairs = record
                    .pairs
                    .iter()
                    .filter(|p| results.contains_key(&p.local.component) && p.state() == PairState::Nominated)
                    .map(|p| (p.local.component, p.clone()))
                    .collect();
            }
            SessionOutcome::Failed(reason) => {
                record.status = SessionStatus::Failed;
                record.failure_reason = Some(*reason);
            }
            SessionOutcome::AlreadyRunning => {}
        }
    }

    async fn drive_testers(
        &self,
        role: Role,
        pairs: &[Arc<CandidatePair>],
        config: SessionConfig,
        timeout: Duration,
        mut cancel_rx: watch::Receiver<bool>,
    ) -> SessionOutcome {
        let groups = partition_by_local_endpoint(pairs);

        // Keyed by the endpoint the candidates asked for, not the socket's
        // resolved address: a candidate using port 0 gets an OS-assigned
        // ephemeral port, so the two can differ.
        let mut testers: Vec<(SocketAddr, CandidateTester)> = Vec::new();
        for (addr, group_pairs) in groups {
            match CandidateTester::bind(addr, role, config.schedule).await {
                Ok(mut tester) => {
                    for pair in group_pairs {
                        tester.add_pair(pair);
                    }
                    testers.push((addr, tester));
                }
                Err(err) => {
                    log::warn!("failed to bind local endpoint {addr}, skipping: {err}");
                    continue;
                }
            }
        }

        if testers.is_empty() {
            return SessionOutcome::Failed(FailureReason::BindFailure);
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let wgs: Vec<_> = testers.iter().map(|(_, t)| t.start_all(&tx)).collect();
        drop(tx);

        let components: HashSet<u8> = pairs.iter().map(|p| p.local.component).collect();
        let needed = components.len();

        let (winner, was_cancelled) = elect_winner(&mut rx, &mut cancel_rx, timeout, needed).await;

        let winning_pairs = match winner {
            Some(w) => w,
            None => {
                let testers: Vec<CandidateTester> = testers.into_iter().map(|(_, t)| t).collect();
                stop_all(testers, wgs).await;
                return SessionOutcome::Failed(if was_cancelled {
                    FailureReason::Cancelled
                } else {
                    FailureReason::Timeout
                });
            }
        };

        let winning_addr = winning_pairs[0].local.local_bind_target();
        let mut losers = Vec::new();
        let mut losers_wgs = Vec::new();
        let mut winning_tester = None;
        for ((addr, tester), wg) in testers.into_iter().zip(wgs) {
            if winning_tester.is_none() && addr == winning_addr {
                winning_tester = Some((tester, wg));
            } else {
                losers.push(tester);
                losers_wgs.push(wg);
            }
        }
        stop_all(losers, losers_wgs).await;

        let Some((winning_tester, winning_wg)) = winning_tester else {
            return SessionOutcome::Failed(FailureReason::BindFailure);
        };

        if role == Role::Controller
            && winning_tester
                .perform_final_nomination(&winning_pairs)
                .await
                .is_err()
        {
            winning_tester.stop_all(winning_wg).await;
            return SessionOutcome::Failed(FailureReason::NominationRejected);
        }
        winning_tester.stop_all(winning_wg).await;

        for pair in &winning_pairs {
            pair.set_state(PairState::Nominated);
        }

        let mut nominated = HashMap::new();
        for pair in winning_pairs {
            nominated.insert(
                pair.local.component,
                ComponentResult {
                    local: pair.local.socket_addr(),
                    remote: pair.remote.socket_addr(),
                },
            );
        }
        SessionOutcome::Succeeded(nominated)
    }
}

/// §4.5 step 5: consumes Pair Tester outcomes as they arrive, aggregated by
/// `(local.foundation, local.component)`, until one foundation accumulates a
/// succeeded/nominated pair for every component in play. Ties — two
/// foundations completing "simultaneously" — can't occur here since the
/// channel delivers one message at a time; whichever foundation's message
/// completes its set first wins, matching the spec's insertion-order
/// tie-break. Returns `(None, true)` on cancellation and `(None, false)` on
/// timeout or channel close.
async fn elect_winner(
    rx: &mut mpsc::UnboundedReceiver<PairOutcome>,
    cancel_rx: &mut watch::Receiver<bool>,
    timeout: Duration,
    needed: usize,
) -> (Option<Vec<Arc<CandidatePair>>>, bool) {
    let mut progress: HashMap<String, HashMap<u8, Arc<CandidatePair>>> = HashMap::new();

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => return (None, false),
            changed = cancel_rx.changed() => {
                if changed.is_err() || *cancel_rx.borrow() {
                    return (None, true);
                }
            }
            msg = rx.recv() => {
                match msg {
                    None => return (None, *cancel_rx.borrow()),
                    Some(PairOutcome::Failed(_)) => continue,
                    Some(PairOutcome::ControllerSucceeded(pair))
                    | Some(PairOutcome::ControlleeNominated(pair)) => {
                        let entry = progress.entry(pair.local.foundation.clone()).or_default();
                        entry.insert(pair.local.component, pair.clone());
                        if entry.len() == needed {
                            return (Some(entry.values().cloned().collect()), false);
                        }
                    }
                }
            }
        }
    }
}

async fn stop_all(testers: Vec<CandidateTester>, wgs: Vec<waitgroup::WaitGroup>) {
    for (tester, wg) in testers.into_iter().zip(wgs) {
        tester.stop_all(wg).await;
    }
}

fn build_pairs(
    locals: &[CandidateInfo],
    remotes: &[CandidateInfo],
    is_controller: bool,
) -> Vec<Arc<CandidatePair>> {
    let mut pairs = Vec::new();
    for local in locals {
        for remote in remotes {
            if local.component != remote.component {
                continue;
            }
            let local = Arc::new(local.clone());
            let remote = Arc::new(remote.clone());
            pairs.push(Arc::new(CandidatePair::new(local, remote, is_controller)));
        }
    }
    pairs
}

/// §4.5 step 2: group pairs by the local endpoint they'll actually probe
/// from, so each group becomes one `CandidateTester`'s socket.
fn partition_by_local_endpoint(
    pairs: &[Arc<CandidatePair>],
) -> HashMap<SocketAddr, Vec<Arc<CandidatePair>>> {
    let mut groups: HashMap<SocketAddr, Vec<Arc<CandidatePair>>> = HashMap::new();
    for pair in pairs {
        groups
            .entry(pair.local.local_bind_target())
            .or_default()
            .push(pair.clone());
    }
    groups
}
