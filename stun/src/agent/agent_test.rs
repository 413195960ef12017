use std::net::{IpAddr, Ipv4Addr};

use super::*;
use crate::message::Message;

fn addr(o: u8, port: u16) -> (IpAddr, u16) {
    (IpAddr::V4(Ipv4Addr::new(127, 0, 0, o)), port)
}

#[test]
fn accepts_matching_response_from_expected_peer() {
    let mut cache = ReplyCache::new();
    let req = Message::new_request();
    cache.expect_reply_from(&req, addr(1, 9000).0, 9000);

    let resp = Message::new_response_to(&req);
    assert!(cache.verify_response(&resp, addr(1, 9000)));
}

#[test]
fn rejects_response_from_unexpected_sender() {
    let mut cache = ReplyCache::new();
    let req = Message::new_request();
    cache.expect_reply_from(&req, addr(1, 9000).0, 9000);

    let resp = Message::new_response_to(&req);
    assert!(!cache.verify_response(&resp, addr(2, 9000)));
}

#[test]
fn rejects_response_with_unregistered_transaction_id() {
    let cache = ReplyCache::new();
    let other_req = Message::new_request();
    let resp = Message::new_response_to(&other_req);
    assert!(!cache.verify_response(&resp, addr(1, 9000)));
}

#[test]
fn rejects_response_with_stale_transaction_id_after_new_request_reuses_peer() {
    let mut cache = ReplyCache::new();
    let first_req = Message::new_request();
    cache.expect_reply_from(&first_req, addr(1, 9000).0, 9000);

    let second_req = Message::new_request();
    cache.expect_reply_from(&second_req, addr(1, 9000).0, 9000);

    let stale_resp = Message::new_response_to(&first_req);
    assert!(!cache.verify_response(&stale_resp, addr(1, 9000)));
}
