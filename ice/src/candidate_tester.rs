use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use waitgroup::WaitGroup;

use stun::agent::ReplyCache;
use stun::message::{Message, MessageType};

use crate::config::ScheduleConfig;
use crate::control::{self, Role};
use crate::error::{Error, Result};
use crate::mux::UdpMux;
use crate::pair::{CandidatePair, PairState};
use crate::pair_tester::{PairOutcome, PairTester};

/// Owns one bound local interface and every pair whose local candidate
/// lives there (§4.4). Candidates are divided into interfaces upstream
/// (one `CandidateTester` per unique local (address, port)) because a UDP
/// socket can only be bound once.
pub struct CandidateTester {
    mux: Arc<UdpMux>,
    pairs: Vec<Arc<CandidatePair>>,
    role: Role,
    schedule: ScheduleConfig,
    cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
}

impl CandidateTester {
    pub async fn bind(local_addr: SocketAddr, role: Role, schedule: ScheduleConfig) -> Result<Self> {
        let mux = UdpMux::bind(local_addr).await?;
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Ok(CandidateTester {
            mux,
            pairs: Vec::new(),
            role,
            schedule,
            cancel_tx,
            cancel_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.mux.local_addr()
    }

    /// Registers a pair this tester is responsible for. Every pair added
    /// here must share this tester's local (address, port).
    pub fn add_pair(&mut self, pair: Arc<CandidatePair>) {
        self.pairs.push(pair);
    }

    pub fn pairs(&self) -> &[Arc<CandidatePair>] {
        &self.pairs
    }

    /// Spawns one Pair Tester per added pair, each reporting its outcome on
    /// `tx` as soon as it has one (callers running several Candidate
    /// Testers share one channel so the Session Coordinator sees a single
    /// merged stream). Returns a `WaitGroup` the caller can wait on before
    /// unbinding.
    pub fn start_all(&self, tx: &mpsc::UnboundedSender<PairOutcome>) -> WaitGroup {
        let wg = WaitGroup::new();

        for pair in &self.pairs {
            let pair = pair.clone();
            let mux = self.mux.clone();
            let role = self.role;
            let schedule = self.schedule;
            let cancel_rx = self.cancel_rx.clone();
            let tx = tx.clone();
            let worker = wg.worker();

            tokio::spawn(async move {
                let _worker = worker;
                let tester = PairTester::new(pair, mux, role, schedule, cancel_rx);
                let outcome = tester.run().await;
                let _ = tx.send(outcome);
            });
        }

        wg
    }

    /// Cancels every running Pair Tester and waits for them to unwind,
    /// then releases the socket. Safe to call regardless of whether
    /// nomination succeeded.
    pub async fn stop_all(&self, wg: WaitGroup) {
        let _ = self.cancel_tx.send(true);
        wg.wait().await;
        self.mux.unbind();
    }

    /// Controller-only (§4.4): for each pair selected by the Session
    /// Coordinator, send a Request carrying ICE-CONTROLLING +
    /// USE-CANDIDATE over this tester's already-bound socket and wait for
    /// the matching Response. Every pair must succeed; one rejection fails
    /// the whole nomination, matching `IceCandidateTester::performNomination`.
    pub async fn perform_final_nomination(&self, nominated: &[Arc<CandidatePair>]) -> Result<()> {
        for pair in nominated {
            self.nominate_one(pair).await?;
            pair.set_state(PairState::Nominated);
        }
        Ok(())
    }

    async fn nominate_one(&self, pair: &Arc<CandidatePair>) -> Result<()> {
        let remote = pair.remote.socket_addr();
        let mut reply_cache = ReplyCache::new();

        let mut req = Message::new_request();
        control::add_role(&mut req, Role::Controller);
        control::add_use_candidate(&mut req);
        reply_cache.expect_reply_from(&req, remote.ip(), remote.port());
        let encoded = req.encode();

        let mut inbox = self.mux.register_listener(remote);
        let mut succeeded = false;

        for k in 1..=self.schedule.nomination_retries {
            self.mux.send(&encoded, remote).await?;
            let timeout = self.schedule.wait_for_attempt(k);
            if let Ok(Some(bytes)) = tokio::time::timeout(timeout, inbox.recv()).await {
                match Message::decode(&bytes) {
                    Ok(msg) => {
                        if msg.typ == MessageType::Response
                            && reply_cache.verify_response(&msg, (remote.ip(), remote.port()))
                        {
                            succeeded = true;
                            break;
                        }
                    }
                    Err(err) => {
                        log::warn!("failed to decode STUN message from {remote}: {err}")
                    }
                }
            }
        }

        self.mux.unregister_listener(remote);

        if succeeded {
            Ok(())
        } else {
            Err(Error::NominationRejected)
        }
    }
}

#[cfg(test)]
mod candidate_tester_test;
