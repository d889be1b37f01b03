// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn list_jobs_round_trips_with_an_explicit_session() {
    let query = Query::ListJobs { session: Some(sv_core::SessionId::new("null")) };
    let json = serde_json::to_string(&query).unwrap();
    assert!(json.contains("\"type\":\"ListJobs\""));

    let decoded: Query = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, query);
}

#[test]
fn list_jobs_omitted_session_defaults_to_none() {
    let decoded: Query = serde_json::from_str(r#"{"type":"ListJobs"}"#).unwrap();
    assert_eq!(decoded, Query::ListJobs { session: None });
}

#[test]
fn get_job_round_trips() {
    let query = Query::GetJob { name: "sshd".to_string(), session: sv_core::SessionId::new("null") };
    let json = serde_json::to_string(&query).unwrap();
    let decoded: Query = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, query);
}

#[test]
fn status_has_no_fields() {
    let json = serde_json::to_string(&Query::Status).unwrap();
    assert_eq!(json, r#"{"type":"Status"}"#);
}
