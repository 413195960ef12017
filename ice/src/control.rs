use stun::attributes::{Flag, ATTR_ICE_CONTROLLED, ATTR_ICE_CONTROLLING, ATTR_USE_CANDIDATE};
use stun::message::Message;

/// Which of the two asymmetric ICE roles this agent is playing this
/// session. Fixed by the signalling layer at session start; never changes
/// mid-session (no ICE restart in scope).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Role {
    Controller,
    Controllee,
}

/// Stamps the role flag appropriate to `role` onto an outgoing message.
pub fn add_role(m: &mut Message, role: Role) {
    let t = match role {
        Role::Controller => ATTR_ICE_CONTROLLING,
        Role::Controllee => ATTR_ICE_CONTROLLED,
    };
    Flag(t).add_to(m).expect("flag attributes never fail to encode");
}

pub fn add_use_candidate(m: &mut Message) {
    Flag(ATTR_USE_CANDIDATE)
        .add_to(m)
        .expect("flag attributes never fail to encode");
}

pub fn has_use_candidate(m: &Message) -> bool {
    Flag::is_set(m, ATTR_USE_CANDIDATE)
}

/// §4.3 validation rule: a Request from the controller MUST carry
/// ICE-CONTROLLING; a Request from the controllee MUST carry
/// ICE-CONTROLLED. Returns the sender's claimed role if the message
/// carries exactly one of the two flags, `None` otherwise (ambiguous or
/// unmarked requests are dropped by the caller).
pub fn peer_role(m: &Message) -> Option<Role> {
    let controlling = Flag::is_set(m, ATTR_ICE_CONTROLLING);
    let controlled = Flag::is_set(m, ATTR_ICE_CONTROLLED);
    match (controlling, controlled) {
        (true, false) => Some(Role::Controller),
        (false, true) => Some(Role::Controllee),
        _ => None,
    }
}

#[cfg(test)]
mod control_test {
    use super::*;

    #[test]
    fn add_role_stamps_the_expected_flag() {
        let mut m = Message::new_request();
        add_role(&mut m, Role::Controller);
        assert_eq!(peer_role(&m), Some(Role::Controller));

        let mut m2 = Message::new_request();
        add_role(&mut m2, Role::Controllee);
        assert_eq!(peer_role(&m2), Some(Role::Controllee));
    }

    #[test]
    fn peer_role_is_none_when_both_or_neither_flag_present() {
        let neither = Message::new_request();
        assert_eq!(peer_role(&neither), None);

        let mut both = Message::new_request();
        add_role(&mut both, Role::Controller);
        add_role(&mut both, Role::Controllee);
        assert_eq!(peer_role(&both), None);
    }

    #[test]
    fn use_candidate_round_trips() {
        let mut m = Message::new_request();
        assert!(!has_use_candidate(&m));
        add_use_candidate(&mut m);
        assert!(has_use_candidate(&m));
    }
}
