// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn round_trip_request_over_wire() {
    let request = Request::Suggest {
        session_id: "0123456789abcdef".to_string(),
        cwd: "/repo".to_string(),
        buffer: "git ".to_string(),
        max_results: 3,
    };
    let encoded = encode(&request).unwrap();

    let mut wire = Vec::new();
    write_message(&mut wire, &encoded).await.unwrap();
    let mut reader = wire.as_slice();
    let bytes = read_message(&mut reader).await.unwrap();
    let decoded: Request = decode(&bytes).unwrap();
    assert_eq!(decoded, request);
}

#[tokio::test]
async fn round_trip_response() {
    let response = Response::Status {
        version: "0.1.0".to_string(),
        active_sessions: 2,
        uptime_secs: 60,
        commands_logged: 42,
    };
    let encoded = encode(&response).unwrap();
    let mut wire = Vec::new();
    write_message(&mut wire, &encoded).await.unwrap();
    let mut reader = wire.as_slice();
    let decoded: Response = decode(&read_message(&mut reader).await.unwrap()).unwrap();
    assert_eq!(decoded, response);
}

#[tokio::test]
async fn empty_stream_is_connection_closed() {
    let mut reader: &[u8] = &[];
    let err = read_message(&mut reader).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn oversized_length_prefix_rejected() {
    let len = (MAX_MESSAGE_SIZE as u32 + 1).to_be_bytes();
    let mut reader: &[u8] = &len;
    let err = read_message(&mut reader).await.unwrap_err();
    assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
}

#[test]
fn requests_use_tagged_json() {
    let json = serde_json::to_string(&Request::Ping).unwrap();
    assert_eq!(json, r#"{"type":"Ping"}"#);
}

#[test]
fn defaults_fill_optional_fields() {
    let json = r#"{"type":"Suggest","session_id":"s","cwd":"/"}"#;
    let request: Request = serde_json::from_str(json).unwrap();
    match request {
        Request::Suggest {
            buffer, max_results, ..
        } => {
            assert_eq!(buffer, "");
            assert_eq!(max_results, 0);
        }
        other => panic!("unexpected request: {other:?}"),
    }
}

#[test]
fn invalid_response_constructor_sets_code() {
    match Response::invalid("missing session id") {
        Response::Error { code, message } => {
            assert_eq!(code, E_INVALID_REQUEST);
            assert_eq!(message, "missing session id");
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[test]
fn suggestion_wire_maps_reasons() {
    use clai_core::{Reason, Suggestion, TemplateId};
    let suggestion = Suggestion {
        text: "git push".to_string(),
        description: String::new(),
        source: "engine".to_string(),
        score: 12.5,
        risk: false,
        cmd_norm: "git push".to_string(),
        template_id: TemplateId::new("t"),
        confidence: 0.8,
        reasons: vec![Reason::RepoTrans, Reason::GlobalFreq],
        frequency: 1.0,
        last_seen_ms: 0,
        features: [0.0; clai_core::FEATURE_COUNT],
    };
    let wire = SuggestionWire::from(&suggestion);
    assert_eq!(wire.reasons, vec!["repo_trans", "global_freq"]);
}
