use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use stun::agent::ReplyCache;
use stun::attributes::Setter;
use stun::message::{Message, MessageType};

use crate::config::ScheduleConfig;
use crate::control::{self, Role};
use crate::error::{Error, Result};
use crate::mux::UdpMux;
use crate::pair::{CandidatePair, PairState};

/// What a Pair Tester settled on (§4.3). The Candidate Tester uses this to
/// decide which per-foundation slot to fill and, for a controller, which
/// pairs are eligible for final nomination.
#[derive(Debug)]
pub enum PairOutcome {
    /// Controller: the binding phase succeeded; nomination itself happens
    /// later, out of band, via `CandidateTester::perform_final_nomination`.
    ControllerSucceeded(Arc<CandidatePair>),
    /// Controllee: the binding phase succeeded and this pair went on to
    /// receive the controller's USE-CANDIDATE probe.
    ControlleeNominated(Arc<CandidatePair>),
    Failed(Arc<CandidatePair>),
}

enum WaitOutcome {
    Received(Message),
    TimedOut,
    Cancelled,
}

/// Demultiplexes one peer's datagram stream into Requests and Responses.
/// The wire carries both interleaved on the same socket (§4.2); a Pair
/// Tester only ever wants one or the other at a time, so anything of the
/// wrong kind is buffered rather than dropped.
struct Inbox {
    remote: SocketAddr,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    pending_requests: std::collections::VecDeque<Message>,
    pending_responses: std::collections::VecDeque<Message>,
}

enum Want {
    Request,
    Response,
}

impl Inbox {
    fn new(remote: SocketAddr, rx: mpsc::UnboundedReceiver<Vec<u8>>) -> Self {
        Inbox {
            remote,
            rx,
            pending_requests: Default::default(),
            pending_responses: Default::default(),
        }
    }

    fn buffer(&mut self, msg: Message) {
        match msg.typ {
            MessageType::Request => self.pending_requests.push_back(msg),
            MessageType::Response => self.pending_responses.push_back(msg),
        }
    }

    fn take(&mut self, want: &Want, accept: &mut impl FnMut(&Message) -> bool) -> Option<Message> {
        let q = match want {
            Want::Request => &mut self.pending_requests,
            Want::Response => &mut self.pending_responses,
        };
        while let Some(m) = q.pop_front() {
            if accept(&m) {
                return Some(m);
            }
            // fails validation: drop silently, as the original agent does.
        }
        None
    }

    async fn wait_for(
        &mut self,
        want: Want,
        timeout: Duration,
        cancel: &mut watch::Receiver<bool>,
        mut accept: impl FnMut(&Message) -> bool,
    ) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(m) = self.take(&want, &mut accept) {
                return WaitOutcome::Received(m);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return WaitOutcome::TimedOut;
            }
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        return WaitOutcome::Cancelled;
                    }
                }
                _ = tokio::time::sleep(remaining) => {
                    return WaitOutcome::TimedOut;
                }
                datagram = self.rx.recv() => {
                    match datagram {
                        None => return WaitOutcome::TimedOut,
                        Some(bytes) => {
                            match Message::decode(&bytes) {
                                Ok(msg) => self.buffer(msg),
                                Err(err) => log::warn!(
                                    "failed to decode STUN message from {}: {err}",
                                    self.remote
                                ),
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Tests one directed (local, remote) candidate pair for connectivity and,
/// for the controllee side, carries it through nomination (§4.3). One Pair
/// Tester per `CandidatePair`; the Candidate Tester spawns one per pair and
/// joins them all on `stopAll`.
pub struct PairTester {
    pair: Arc<CandidatePair>,
    remote_addr: SocketAddr,
    mux: Arc<UdpMux>,
    role: Role,
    schedule: ScheduleConfig,
    inbox: Inbox,
    reply_cache: ReplyCache,
    cancel_rx: watch::Receiver<bool>,
}

impl PairTester {
    pub fn new(
        pair: Arc<CandidatePair>,
        mux: Arc<UdpMux>,
        role: Role,
        schedule: ScheduleConfig,
        cancel_rx: watch::Receiver<bool>,
    ) -> Self {
        let remote_addr = pair.remote.socket_addr();
        let inbox = Inbox::new(remote_addr, mux.register_listener(remote_addr));
        PairTester {
            pair,
            remote_addr,
            mux,
            role,
            schedule,
            inbox,
            reply_cache: ReplyCache::default(),
            cancel_rx,
        }
    }

    /// Runs the full lifecycle for this pair to completion (or
    /// cancellation) and reports what happened. Never panics on a network
    /// or protocol failure; those become `PairOutcome::Failed`.
    pub async fn run(mut self) -> PairOutcome {
        self.pair.set_state(PairState::InProgress);

        let binding = match self.role {
            Role::Controller => self.controller_binding().await,
            Role::Controllee => self.controllee_binding().await,
        };

        let cancelled = match binding {
            Ok(()) => false,
            Err(Error::Cancelled) => true,
            Err(_) => {
                self.pair.set_state(PairState::Failed);
                self.mux.unregister_listener(self.remote_addr);
                return PairOutcome::Failed(self.pair);
            }
        };

        if cancelled {
            self.mux.unregister_listener(self.remote_addr);
            return PairOutcome::Failed(self.pair);
        }

        self.pair.set_state(PairState::Succeeded);

        let outcome = match self.role {
            Role::Controller => PairOutcome::ControllerSucceeded(self.pair.clone()),
            Role::Controllee => match self.wait_nomination_send_response().await {
                Ok(()) => {
                    self.pair.set_state(PairState::Nominated);
                    PairOutcome::ControlleeNominated(self.pair.clone())
                }
                Err(_) => {
                    // The pair already works; a missed nomination just
                    // means the controller picked a different foundation.
                    PairOutcome::Failed(self.pair.clone())
                }
            },
        };

        self.mux.unregister_listener(self.remote_addr);
        outcome
    }

    async fn send(&self, msg: &Message) -> Result<()> {
        self.mux.send(&msg.encode(), self.remote_addr).await
    }

    /// §4.3 controller sequence: send a binding Request, wait for the
    /// matching Response, then wait for and answer the peer's own Request.
    async fn controller_binding(&mut self) -> Result<()> {
        let mut req = Message::new_request();
        control::add_role(&mut req, Role::Controller);
        stun::attributes::Priority(self.pair.local.priority).add_to(&mut req)?;
        self.reply_cache.expect_reply_from(
            &req,
            self.remote_addr.ip(),
            self.remote_addr.port(),
        );

        self.send_request_wait_response(&req, self.schedule.binding_retries)
            .await?;

        let incoming = self
            .wait_peer_request(self.schedule.binding_retries, PairState::InProgress, false)
            .await?;

        let mut resp = Message::new_response_to(&incoming);
        control::add_role(&mut resp, Role::Controller);
        self.retransmit(&resp, self.schedule.binding_response_retransmits)
            .await
    }

    /// §4.3 controllee sequence: dummy hole-punch Requests until the peer's
    /// own Request arrives, answer it, then run our own Request/Response
    /// exchange in the other direction.
    async fn controllee_binding(&mut self) -> Result<()> {
        let dummy = Message::new_request();

        let incoming = self
            .send_dummy_until_peer_request(&dummy, self.schedule.binding_retries)
            .await?;

        let mut resp = Message::new_response_to(&incoming);
        control::add_role(&mut resp, Role::Controllee);
        self.retransmit(&resp, self.schedule.binding_response_retransmits)
            .await?;

        let mut req = Message::new_request();
        control::add_role(&mut req, Role::Controllee);
        stun::attributes::Priority(self.pair.local.priority).add_to(&mut req)?;
        self.reply_cache.expect_reply_from(
            &req,
            self.remote_addr.ip(),
            self.remote_addr.port(),
        );

        self.send_request_wait_response(&req, self.schedule.binding_retries)
            .await
    }

    /// Controllee nomination wait (§4.3 step 4): keep the hole open with
    /// dummy Requests until the controller's USE-CANDIDATE Request arrives,
    /// then answer it `nomination_response_retransmits` times.
    async fn wait_nomination_send_response(&mut self) -> Result<()> {
        let dummy = Message::new_request();
        let encoded = dummy.encode();

        for k in 1..=self.schedule.controllee_nomination_waits {
            self.mux.send(&encoded, self.remote_addr).await?;

            let want_use_candidate_from = self.expected_peer_role();
            let timeout = self.schedule.wait_for_attempt(k);
            match self
                .inbox
                .wait_for(Want::Request, timeout, &mut self.cancel_rx, |m| {
                    control::peer_role(m) == Some(want_use_candidate_from)
                        && control::has_use_candidate(m)
                })
                .await
            {
                WaitOutcome::Cancelled => return Err(Error::Cancelled),
                WaitOutcome::TimedOut => continue,
                WaitOutcome::Received(req) => {
                    let mut resp = Message::new_response_to(&req);
                    control::add_role(&mut resp, Role::Controllee);
                    return self
                        .retransmit(&resp, self.schedule.nomination_response_retransmits)
                        .await;
                }
            }
        }
        Err(Error::Timeout)
    }

    fn expected_peer_role(&self) -> Role {
        match self.role {
            Role::Controller => Role::Controllee,
            Role::Controllee => Role::Controller,
        }
    }

    async fn send_request_wait_response(&mut self, req: &Message, retries: usize) -> Result<()> {
        let encoded = req.encode();
        for k in 1..=retries {
            self.mux.send(&encoded, self.remote_addr).await?;

            let timeout = self.schedule.wait_for_attempt(k);
            let reply_cache = &self.reply_cache;
            let remote = (self.remote_addr.ip(), self.remote_addr.port());
            match self
                .inbox
                .wait_for(Want::Response, timeout, &mut self.cancel_rx, |m| {
                    reply_cache.verify_response(m, remote)
                })
                .await
            {
                WaitOutcome::Cancelled => return Err(Error::Cancelled),
                WaitOutcome::TimedOut => continue,
                WaitOutcome::Received(_) => return Ok(()),
            }
        }
        Err(Error::Timeout)
    }

    /// Binding-phase wait for the peer's own Request (§4.3): a plain
    /// Request is only acceptable while our pair is still `InProgress`,
    /// and must carry the role flag opposite ours.
    async fn wait_peer_request(
        &mut self,
        retries: usize,
        required_state: PairState,
        expect_use_candidate: bool,
    ) -> Result<Message> {
        let expected_role = self.expected_peer_role();
        for k in 1..=retries {
            let timeout = self.schedule.wait_for_attempt(k);
            let pair = &self.pair;
            match self
                .inbox
                .wait_for(Want::Request, timeout, &mut self.cancel_rx, |m| {
                    control::peer_role(m) == Some(expected_role)
                        && control::has_use_candidate(m) == expect_use_candidate
                        && pair.state() == required_state
                })
                .await
            {
                WaitOutcome::Cancelled => return Err(Error::Cancelled),
                WaitOutcome::TimedOut => continue,
                WaitOutcome::Received(m) => return Ok(m),
            }
        }
        Err(Error::Timeout)
    }

    /// Controllee hole-punch loop: resend the dummy Request while waiting
    /// for the controller's own binding Request.
    async fn send_dummy_until_peer_request(
        &mut self,
        dummy: &Message,
        retries: usize,
    ) -> Result<Message> {
        let encoded = dummy.encode();
        let expected_role = self.expected_peer_role();
        for k in 1..=retries {
            self.mux.send(&encoded, self.remote_addr).await?;

            let timeout = self.schedule.wait_for_attempt(k);
            let pair = &self.pair;
            match self
                .inbox
                .wait_for(Want::Request, timeout, &mut self.cancel_rx, |m| {
                    control::peer_role(m) == Some(expected_role)
                        && !control::has_use_candidate(m)
                        && pair.state() == PairState::InProgress
                })
                .await
            {
                WaitOutcome::Cancelled => return Err(Error::Cancelled),
                WaitOutcome::TimedOut => continue,
                WaitOutcome::Received(m) => return Ok(m),
            }
        }
        Err(Error::Timeout)
    }

    async fn retransmit(&self, msg: &Message, count: usize) -> Result<()> {
        for _ in 0..count {
            self.send(msg).await?;
            tokio::time::sleep(self.schedule.retransmit_spacing()).await;
        }
        Ok(())
    }
}
