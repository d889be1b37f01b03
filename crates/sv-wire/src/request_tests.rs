// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn ping_round_trips() {
    let json = serde_json::to_string(&Request::Ping).unwrap();
    assert_eq!(json, r#"{"type":"Ping"}"#);
    let decoded: Request = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, Request::Ping);
}

#[test]
fn nested_query_request_round_trips() {
    let request = Request::Query { query: Query::Status };
    let json = serde_json::to_string(&request).unwrap();
    let decoded: Request = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, request);
}

#[test]
fn emit_defaults_args_env_and_wait_when_omitted() {
    let json = r#"{"type":"Emit","name":"deploy"}"#;
    let decoded: Request = serde_json::from_str(json).unwrap();
    assert_eq!(
        decoded,
        Request::Emit { name: "deploy".to_string(), args: Vec::new(), env: Default::default(), wait: false }
    );
}

#[test]
fn reload_defaults_source_to_none() {
    let decoded: Request = serde_json::from_str(r#"{"type":"Reload"}"#).unwrap();
    assert_eq!(decoded, Request::Reload { source: None });
}

#[test]
fn reexec_and_subscribe_have_no_fields() {
    assert_eq!(serde_json::to_string(&Request::Reexec).unwrap(), r#"{"type":"Reexec"}"#);
    assert_eq!(serde_json::to_string(&Request::Subscribe).unwrap(), r#"{"type":"Subscribe"}"#);
}

#[test]
fn start_round_trips_with_session() {
    let request = Request::Start { name: "sshd".to_string(), session: sv_core::SessionId::new("null") };
    let json = serde_json::to_string(&request).unwrap();
    let decoded: Request = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, request);
}
