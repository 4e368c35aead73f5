//! Decoding COSE-style attestation envelopes end to end.

use std::collections::BTreeMap;

use serde_cbor::Value;

use fabstir_tee_channel::{
    curve_ops, decode_attestation, to_wrapped, CurveIdentity, DecodeError,
};

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

/// Build a 4-element COSE_Sign1-style envelope around a payload map.
fn cose_envelope(payload: BTreeMap<Value, Value>) -> Vec<u8> {
    let protected = serde_cbor::to_vec(&Value::Map(
        [(Value::Integer(1), Value::Integer(-35))].into_iter().collect(),
    ))
    .unwrap();
    let payload_bytes = serde_cbor::to_vec(&Value::Map(payload)).unwrap();

    serde_cbor::to_vec(&Value::Array(vec![
        Value::Bytes(protected),
        Value::Map(BTreeMap::new()),
        Value::Bytes(payload_bytes),
        Value::Bytes(vec![0u8; 96]),
    ]))
    .unwrap()
}

fn minimal_payload(public_key: Vec<u8>) -> BTreeMap<Value, Value> {
    let mut pcrs = BTreeMap::new();
    pcrs.insert(Value::Integer(0), Value::Bytes(vec![0u8; 32]));

    let mut payload = BTreeMap::new();
    payload.insert(text("module_id"), text("i-test"));
    payload.insert(text("timestamp"), Value::Integer(1_700_000_000));
    payload.insert(text("pcrs"), Value::Map(pcrs));
    payload.insert(text("public_key"), Value::Bytes(public_key));
    payload
}

fn p384_raw_point() -> Vec<u8> {
    curve_ops(CurveIdentity::P384)
        .generate_keypair()
        .unwrap()
        .public_point()
        .to_vec()
}

#[test]
fn test_minimal_envelope_decodes() {
    let raw_key = p384_raw_point();
    let bytes = cose_envelope(minimal_payload(raw_key.clone()));

    let (document, envelope) = decode_attestation(&bytes).unwrap();

    assert_eq!(document.module_id, "i-test");
    assert_eq!(document.timestamp, 1_700_000_000);
    assert_eq!(document.pcrs["0"], "0".repeat(64));
    assert_eq!(
        document.public_key,
        hex::encode(to_wrapped(&raw_key).unwrap())
    );
    assert_eq!(envelope.signature, Some(vec![0u8; 96]));
}

#[test]
fn test_pcr_values_are_hex_even_when_printable() {
    let mut payload = minimal_payload(p384_raw_point());
    let mut pcrs = BTreeMap::new();
    // "AAAA..." is printable ASCII, but PCRs must still surface as hex
    pcrs.insert(Value::Integer(1), Value::Bytes(vec![0x41u8; 48]));
    payload.insert(text("pcrs"), Value::Map(pcrs));

    let (document, _) = decode_attestation(&cose_envelope(payload)).unwrap();
    assert_eq!(document.pcrs["1"], "41".repeat(48));
}

#[test]
fn test_certificates_surface_as_pem() {
    let mut payload = minimal_payload(p384_raw_point());
    payload.insert(text("certificate"), Value::Bytes(vec![0x30, 0x82, 0x01, 0x00]));
    payload.insert(
        text("cabundle"),
        Value::Array(vec![
            Value::Bytes(vec![0x30, 0x10]),
            Value::Bytes(vec![0x30, 0x20]),
        ]),
    );

    let (document, _) = decode_attestation(&cose_envelope(payload)).unwrap();

    let certificate = document.certificate.unwrap();
    assert!(certificate.starts_with("-----BEGIN CERTIFICATE-----"));
    assert!(certificate.ends_with("-----END CERTIFICATE-----"));
    assert_eq!(document.cabundle.len(), 2);
    assert!(document.cabundle.iter().all(|pem| pem.contains("BEGIN CERTIFICATE")));
}

#[test]
fn test_user_data_with_embedded_address_parses_as_json() {
    let mut payload = minimal_payload(p384_raw_point());
    payload.insert(
        text("user_data"),
        Value::Bytes(br#"{"eth_addr":"0xabc123"}"#.to_vec()),
    );

    let (document, _) = decode_attestation(&cose_envelope(payload)).unwrap();

    assert_eq!(document.user_data.as_deref(), Some(r#"{"eth_addr":"0xabc123"}"#));
    assert_eq!(
        document.user_data_json.unwrap()["eth_addr"],
        serde_json::json!("0xabc123")
    );
}

#[test]
fn test_binary_user_data_surfaces_as_hex() {
    let mut payload = minimal_payload(p384_raw_point());
    payload.insert(text("user_data"), Value::Bytes(vec![0x00, 0x01, 0xfe]));

    let (document, _) = decode_attestation(&cose_envelope(payload)).unwrap();
    assert_eq!(document.user_data.as_deref(), Some("0001fe"));
    assert!(document.user_data_json.is_none());
}

#[test]
fn test_three_element_envelope_without_signature() {
    let payload_bytes =
        serde_cbor::to_vec(&Value::Map(minimal_payload(p384_raw_point()))).unwrap();
    let bytes = serde_cbor::to_vec(&Value::Array(vec![
        Value::Bytes(vec![]),
        Value::Map(BTreeMap::new()),
        Value::Bytes(payload_bytes),
    ]))
    .unwrap();

    let (document, envelope) = decode_attestation(&bytes).unwrap();
    assert_eq!(document.module_id, "i-test");
    assert_eq!(envelope.signature, None);
}

#[test]
fn test_bare_map_fallback_path() {
    // Not an envelope at all: the decoded value itself is the document
    let bytes = serde_cbor::to_vec(&Value::Map(minimal_payload(p384_raw_point()))).unwrap();

    let (document, envelope) = decode_attestation(&bytes).unwrap();
    assert_eq!(document.module_id, "i-test");
    assert_eq!(envelope.protected, Value::Null);
}

#[test]
fn test_wrapped_public_key_in_payload_stays_wrapped() {
    let raw = p384_raw_point();
    let wrapped = to_wrapped(&raw).unwrap();
    let bytes = cose_envelope(minimal_payload(wrapped.clone()));

    let (document, _) = decode_attestation(&bytes).unwrap();
    assert_eq!(document.public_key, hex::encode(wrapped));
}

#[test]
fn test_empty_public_key_fails_with_dedicated_error() {
    let mut payload = minimal_payload(p384_raw_point());
    payload.insert(text("public_key"), Value::Bytes(vec![]));

    assert!(matches!(
        decode_attestation(&cose_envelope(payload)),
        Err(DecodeError::MissingPublicKey)
    ));
}

#[test]
fn test_undecodable_payload_names_payload_stage() {
    let bytes = serde_cbor::to_vec(&Value::Array(vec![
        Value::Bytes(vec![]),
        Value::Map(BTreeMap::new()),
        Value::Bytes(vec![0xff, 0xff, 0xff]),
        Value::Bytes(vec![]),
    ]))
    .unwrap();

    let err = decode_attestation(&bytes).unwrap_err();
    assert!(
        matches!(err, DecodeError::Payload { .. }),
        "expected payload-stage error, got {err:?}"
    );
}

#[test]
fn test_malformed_outer_bytes_name_envelope_stage() {
    let err = decode_attestation(&[0xff, 0x01, 0x02]).unwrap_err();
    assert!(matches!(err, DecodeError::Envelope { .. }));
    assert!(err.to_string().contains("outer structure"));
}
