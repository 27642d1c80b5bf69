// Integration tests for room credential issuance and agent dispatch
//
// These tests verify that a credential routes the interviewer agent into the
// session's room: room naming, the embedded dispatch instruction, and the
// worker-side matching rules.

use interview_orchestrator::config::RealtimeConfig;
use interview_orchestrator::room::naming::{session_id_from_room, DEFAULT_ROOM_PREFIX};
use interview_orchestrator::room::{
    decode_claims, AccessIssuer, CredentialProvider, DispatchRule, HttpCredentialClient,
    WorkerRegistration,
};
use interview_orchestrator::OrchestratorError;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn realtime(agent_name: &str) -> RealtimeConfig {
    RealtimeConfig {
        url: Some("wss://rooms.example.test".to_string()),
        api_key: Some("APIkey123".to_string()),
        api_secret: Some("a-very-secret-signing-key".to_string()),
        agent_name: agent_name.to_string(),
        ..Default::default()
    }
}

#[test]
fn test_unnamed_worker_receives_dispatch_for_session_room() -> anyhow::Result<()> {
    let issuer = AccessIssuer::from_config(&realtime(""))?;

    let credential = issuer.issue("abc123", "Dana")?;
    assert_eq!(credential.room_name, "interview-abc123");
    assert_eq!(credential.url, "wss://rooms.example.test");

    // Agent side: the room matches the dispatch rule and maps back to the session
    let rule = DispatchRule::default();
    assert!(rule.matches(&credential.room_name));
    assert_eq!(
        session_id_from_room(DEFAULT_ROOM_PREFIX, &credential.room_name),
        "abc123"
    );

    // The dispatch instruction in the token targets the unnamed worker pool
    let claims = decode_claims(&credential.token)?;
    assert_eq!(claims.video.room, "interview-abc123");
    let dispatches = claims.dispatches();
    assert_eq!(dispatches.len(), 1);

    let worker = WorkerRegistration::new("");
    assert!(worker.accepts(&dispatches[0]));

    // A named worker is never picked for an unnamed dispatch
    assert!(!WorkerRegistration::new("interviewer").accepts(&dispatches[0]));
    Ok(())
}

#[test]
fn test_named_dispatch_requires_identical_worker_name() -> anyhow::Result<()> {
    let issuer = AccessIssuer::from_config(&realtime("interview-coach"))?;
    let claims = decode_claims(&issuer.issue("abc123", "Dana")?.token)?;
    let dispatch = &claims.dispatches()[0];

    assert!(WorkerRegistration::new("interview-coach").accepts(dispatch));
    assert!(!WorkerRegistration::new("").accepts(dispatch));
    assert!(!WorkerRegistration::new("interview-coach-v2").accepts(dispatch));
    Ok(())
}

#[test]
fn test_issued_token_verifies_and_names_participant() -> anyhow::Result<()> {
    let issuer = AccessIssuer::from_config(&realtime(""))?;
    let credential = issuer.issue("abc123", "Dana")?;

    let claims = issuer.verify(&credential.token)?;
    assert_eq!(claims.sub, "Dana-abc123");
    assert_eq!(claims.name, "Dana");
    assert!(claims.video.can_publish_data);
    assert_eq!(claims.exp - claims.nbf, 7200);
    Ok(())
}

#[test]
fn test_each_issue_is_a_fresh_credential() -> anyhow::Result<()> {
    let issuer = AccessIssuer::from_config(&realtime(""))?;
    let a = decode_claims(&issuer.issue("abc123", "Dana")?.token)?;
    let b = decode_claims(&issuer.issue("abc123", "Dana")?.token)?;
    assert_ne!(a.jti, b.jti);
    Ok(())
}

#[tokio::test]
async fn test_http_client_returns_credential() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/livekit/token"))
        .and(body_partial_json(json!({"session_id": "abc123", "participant_name": "Dana"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "header.payload.sig",
            "url": "wss://rooms.example.test",
            "room_name": "interview-abc123"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpCredentialClient::new(server.uri(), "interview-");
    let credential = client.issue("abc123", "Dana").await?;

    assert_eq!(credential.room_name, "interview-abc123");
    assert_eq!(credential.token, "header.payload.sig");
    Ok(())
}

#[tokio::test]
async fn test_http_client_rejects_room_outside_dispatch_pattern() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/livekit/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "t",
            "url": "wss://rooms.example.test",
            "roomName": "abc123"
        })))
        .mount(&server)
        .await;

    let client = HttpCredentialClient::new(server.uri(), "interview-");
    let err = client.issue("abc123", "Dana").await.unwrap_err();

    assert!(matches!(err, OrchestratorError::Configuration(_)));
    assert!(err.degrades_to_text());
}

#[tokio::test]
async fn test_http_client_fails_closed_on_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/livekit/token"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "detail": "realtime platform URL not configured"
        })))
        .mount(&server)
        .await;

    let client = HttpCredentialClient::new(server.uri(), "interview-");
    let err = client.issue("abc123", "Dana").await.unwrap_err();

    assert_eq!(
        err,
        OrchestratorError::Configuration("realtime platform URL not configured".to_string())
    );
}
