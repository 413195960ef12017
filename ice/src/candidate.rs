use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// The two ICE components a media stream uses. No other values are valid
/// input; a caller handing in anything else is a programmer error.
pub const COMPONENT_RTP: u8 = 1;
pub const COMPONENT_RTCP: u8 = 2;

/// Candidate type, in the RFC 8445 §5.1.2.1 preference order. The numeric
/// `type_preference` values are fixed by the priority formula in §3.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    Host,
    ServerReflexive,
    PeerReflexive,
    Relay,
}

impl CandidateKind {
    pub fn type_preference(self) -> u32 {
        match self {
            CandidateKind::Host => 126,
            CandidateKind::PeerReflexive => 110,
            CandidateKind::ServerReflexive => 100,
            CandidateKind::Relay => 0,
        }
    }
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CandidateKind::Host => "host",
            CandidateKind::ServerReflexive => "srflx",
            CandidateKind::PeerReflexive => "prflx",
            CandidateKind::Relay => "relay",
        };
        write!(f, "{s}")
    }
}

/// One transport address offered by one endpoint (§3). Only UDP is in
/// scope, so there's no `transport` enum distinct from this type — a
/// `CandidateInfo` is a UDP candidate, full stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateInfo {
    pub foundation: String,
    pub component: u8,
    pub address: IpAddr,
    pub port: u16,
    pub kind: CandidateKind,
    pub related_address: Option<IpAddr>,
    pub related_port: Option<u16>,
    /// Computed by the producer from (type, local preference, component):
    /// `priority = 2^24*type_pref + 2^8*local_pref + (256 - component)`.
    /// The core trusts this value rather than recomputing it — priority
    /// is the signalling layer's concern, not the connectivity checker's.
    pub priority: u32,
}

impl CandidateInfo {
    /// The (address, port) this candidate's side should actually bind to
    /// and probe from. For anything but a host candidate with a known
    /// related address, that's the related address/port (the local base
    /// behind the reflexive/relay/peer-reflexive mapping); otherwise it's
    /// the candidate's own address/port. Mirrors the original
    /// implementation's `getLocalAddress`/`getLocalPort`.
    pub fn local_bind_target(&self) -> SocketAddr {
        if self.kind != CandidateKind::Host {
            if let (Some(addr), Some(port)) = (self.related_address, self.related_port) {
                if port != 0 {
                    return SocketAddr::new(addr, port);
                }
            }
        }
        SocketAddr::new(self.address, self.port)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}
