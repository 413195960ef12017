use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The failure kinds the core can surface. Every variant here absorbs what
/// would otherwise be a transient STUN-level error inside the Pair
/// Tester/Candidate Tester layers — only these aggregate outcomes ever
/// reach the Session Coordinator's caller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No Response arrived within a connectivity check's full
    /// retransmission schedule.
    #[error("connectivity check timed out")]
    Timeout,

    /// The OS refused to bind a local candidate's socket.
    #[error("failed to bind local endpoint: {0}")]
    Bind(#[source] std::io::Error),

    /// The controller's final USE-CANDIDATE probe did not complete.
    #[error("final nomination was not accepted by the remote peer")]
    NominationRejected,

    /// The session was cancelled before it could complete.
    #[error("session cancelled")]
    Cancelled,

    /// A STUN message couldn't be encoded/decoded; carried only to explain
    /// why a caller-facing operation had nothing to send.
    #[error("STUN codec error: {0}")]
    Codec(#[from] stun::Error),

    /// A precondition the caller is responsible for was violated (empty
    /// candidate list, zero session id, and the like). Surfaces as a
    /// generic `nominationFailed` once past the boundary check.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}
