//! Session client scenarios against the mock enclave peer.

use fabstir_tee_channel::{
    to_wrapped, ChannelError, CurveIdentity, HandshakeState, KeyMode, Method, SessionClient,
    SessionConfig,
};

use super::mock_peer::MockEnclave;

fn client_for(enclave: MockEnclave, configure: impl FnOnce(&mut SessionConfig)) -> SessionClient<MockEnclave> {
    let mut config = SessionConfig::new("https://enclave.example");
    configure(&mut config);
    SessionClient::with_transport(config, enclave)
}

#[tokio::test]
async fn test_connect_establishes_session() {
    let enclave = MockEnclave::new(CurveIdentity::P384);
    let enclave_key = to_wrapped(&enclave.public_point()).unwrap();

    let mut client = client_for(enclave, |_| {});
    assert_eq!(client.state(), HandshakeState::Uninitialized);

    client.connect().await.unwrap();

    assert!(client.is_connected());
    assert_eq!(client.state(), HandshakeState::SessionEstablished);

    let document = client.attestation().unwrap();
    assert_eq!(document.module_id, "i-test-enclave");
    assert_eq!(document.pcrs["0"], "0".repeat(96));
    assert_eq!(document.public_key, hex::encode(enclave_key));
}

#[tokio::test]
async fn test_connect_then_encrypted_echo() {
    let mut client = client_for(MockEnclave::new(CurveIdentity::P384), |_| {});
    client.connect().await.unwrap();

    let reply = client
        .call_encrypted("/echo", &serde_json::json!({ "msg": "hi" }))
        .await
        .unwrap();
    assert_eq!(reply, serde_json::json!({ "msg": "hi" }));
}

#[tokio::test]
async fn test_encrypted_echo_on_secp256k1() {
    let mut client = client_for(MockEnclave::new(CurveIdentity::Secp256k1), |_| {});
    client.connect().await.unwrap();

    let reply = client
        .call_encrypted("/echo", &serde_json::json!({ "n": 42 }))
        .await
        .unwrap();
    assert_eq!(reply, serde_json::json!({ "n": 42 }));
}

#[tokio::test]
async fn test_per_connection_key_mode_round_trips() {
    let mut client = client_for(MockEnclave::new(CurveIdentity::P384), |config| {
        config.key_mode = KeyMode::PerConnection;
    });
    client.connect().await.unwrap();

    for i in 0..3 {
        let reply = client
            .call_encrypted("/echo", &serde_json::json!({ "i": i }))
            .await
            .unwrap();
        assert_eq!(reply, serde_json::json!({ "i": i }));
    }
}

#[tokio::test]
async fn test_all_zero_peer_key_fails_connect_with_handshake_error() {
    let mut enclave = MockEnclave::new(CurveIdentity::P384);
    enclave.zero_public_key = true;

    let mut client = client_for(enclave, |_| {});
    let err = client.connect().await.unwrap_err();

    assert!(
        matches!(err, ChannelError::Handshake(_)),
        "expected handshake failure, got {err:?}"
    );
    assert!(!client.is_connected());
    assert_eq!(client.state(), HandshakeState::Uninitialized);
}

#[tokio::test]
async fn test_get_405_falls_back_to_post() {
    let mut enclave = MockEnclave::new(CurveIdentity::P384);
    enclave.post_only = true;

    let mut client = client_for(enclave, |_| {});
    client.connect().await.unwrap();
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_json_wrapper_framing_accepted() {
    let mut enclave = MockEnclave::new(CurveIdentity::P384);
    enclave.json_framing = true;

    let mut client = client_for(enclave, |_| {});
    client.connect().await.unwrap();

    let reply = client
        .call_encrypted("/echo", &serde_json::json!({ "framed": true }))
        .await
        .unwrap();
    assert_eq!(reply, serde_json::json!({ "framed": true }));
}

#[tokio::test]
async fn test_call_encrypted_before_connect_fails() {
    let mut client = client_for(MockEnclave::new(CurveIdentity::P384), |_| {});
    let err = client
        .call_encrypted("/echo", &serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ChannelError::NotConnected));
}

#[tokio::test]
async fn test_plain_call_passthrough() {
    let client = client_for(MockEnclave::new(CurveIdentity::P384), |_| {});

    let pong = client.call("/ping", Method::Get, None).await.unwrap();
    assert_eq!(pong, serde_json::json!({ "pong": 1 }));

    let body = serde_json::json!({ "hello": "world" });
    let reply = client.call("/plain", Method::Post, Some(&body)).await.unwrap();
    assert_eq!(reply["status"], "ok");
    assert_eq!(reply["echo"], body);
}

#[tokio::test]
async fn test_plain_json_response_passes_through_call_encrypted() {
    let mut client = client_for(MockEnclave::new(CurveIdentity::P384), |_| {});
    client.connect().await.unwrap();

    // /plain answers with unencrypted JSON; it must come back as-is
    let reply = client
        .call_encrypted("/plain", &serde_json::json!({ "x": 1 }))
        .await
        .unwrap();
    assert_eq!(reply["status"], "ok");
}

#[tokio::test]
async fn test_server_error_surfaces_structured_detail() {
    let mut client = client_for(MockEnclave::new(CurveIdentity::P384), |_| {});
    client.connect().await.unwrap();

    let err = client
        .call_encrypted("/busy", &serde_json::json!({}))
        .await
        .unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("503"), "missing status in: {rendered}");
    assert!(rendered.contains("enclave busy"), "missing detail in: {rendered}");

    // A transport failure must not corrupt session state
    assert!(client.is_connected());
    let reply = client
        .call_encrypted("/echo", &serde_json::json!({ "still": "alive" }))
        .await
        .unwrap();
    assert_eq!(reply, serde_json::json!({ "still": "alive" }));
}

#[tokio::test]
async fn test_reconnect_is_allowed_after_failure() {
    let mut enclave = MockEnclave::new(CurveIdentity::P384);
    enclave.zero_public_key = true;
    let mut client = client_for(enclave, |_| {});

    assert!(client.connect().await.is_err());
    assert!(client.connect().await.is_err());
    assert_eq!(client.state(), HandshakeState::Uninitialized);
}

#[tokio::test]
async fn test_trace_records_handshake_and_call_steps() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut client = client_for(MockEnclave::new(CurveIdentity::P384), |config| {
        config.trace = true;
    });
    client.connect().await.unwrap();
    client
        .call_encrypted("/echo", &serde_json::json!({ "traced": true }))
        .await
        .unwrap();

    let trace = client.trace().unwrap();
    let names: Vec<&str> = trace.steps().iter().map(|s| s.name).collect();
    assert!(names.contains(&"fetch_attestation"));
    assert!(names.contains(&"decode_attestation"));
    assert!(names.contains(&"handshake"));
    assert!(names.contains(&"encrypt_request"));
    assert!(names.contains(&"decrypt_response"));
    assert!(trace.steps().iter().all(|s| s.success));

    // The overlay deliberately retains plaintext for operator debugging
    assert!(trace
        .steps()
        .iter()
        .any(|s| s.detail.contains("traced")));
}

#[tokio::test]
async fn test_trace_absent_by_default() {
    let mut client = client_for(MockEnclave::new(CurveIdentity::P384), |_| {});
    client.connect().await.unwrap();
    assert!(client.trace().is_none());
}
