use super::*;
use crate::attributes::{AttrType, Priority, ATTR_PRIORITY, ATTR_USE_CANDIDATE};

#[test]
fn round_trips_a_request_with_attributes() {
    let mut m = Message::new_request();
    m.add(ATTR_PRIORITY, &100u32.to_be_bytes());
    m.add(ATTR_USE_CANDIDATE, &[]);

    let encoded = m.encode();
    let decoded = Message::decode(&encoded).expect("well-formed message decodes");

    assert_eq!(m, decoded);
}

#[test]
fn new_response_to_copies_transaction_id() {
    let req = Message::new_request();
    let resp = Message::new_response_to(&req);

    assert_eq!(req.transaction_id, resp.transaction_id);
    assert_eq!(resp.typ, MessageType::Response);
}

#[test]
fn decode_rejects_short_buffers() {
    assert_eq!(Message::decode(&[0u8; 10]), Err(Error::Short));
}

#[test]
fn decode_rejects_wrong_magic_cookie() {
    let mut raw = Message::new_request().encode();
    raw[4] = 0; // corrupt the magic cookie
    assert_eq!(Message::decode(&raw), Err(Error::BadMagicCookie));
}

#[test]
fn decode_rejects_length_mismatch() {
    let mut raw = Message::new_request().encode();
    // Claim more body bytes than are actually present.
    raw[2] = 0;
    raw[3] = 4;
    assert!(matches!(
        Message::decode(&raw),
        Err(Error::LengthMismatch { .. })
    ));
}

#[test]
fn get_reports_missing_attribute() {
    let m = Message::new_request();
    assert_eq!(m.get(ATTR_PRIORITY), Err(Error::AttributeNotFound(ATTR_PRIORITY.0)));
}

#[test]
fn priority_round_trips_through_setter_and_getter() {
    use crate::attributes::{Getter, Setter};

    let mut m = Message::new_request();
    Priority(0x7e00_0100).add_to(&mut m).unwrap();

    let raw = m.encode();
    let decoded = Message::decode(&raw).unwrap();

    let mut p = Priority::default();
    p.get_from(&decoded).unwrap();
    assert_eq!(p.0, 0x7e00_0100);
}

#[test]
fn attribute_padding_keeps_subsequent_attributes_aligned() {
    let mut m = Message::new_request();
    // 1-byte value forces 3 bytes of padding before the next attribute.
    m.add(AttrType(0x9999), &[0xAB]);
    m.add(ATTR_USE_CANDIDATE, &[]);

    let raw = m.encode();
    let decoded = Message::decode(&raw).unwrap();
    assert_eq!(decoded.attributes.len(), 2);
    assert_eq!(decoded.attributes[1].typ, ATTR_USE_CANDIDATE);
}
