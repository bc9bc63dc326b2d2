use member::config::BusConfig;
use member::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn bus_config(server: &MockServer) -> BusConfig {
    BusConfig {
        auth_url: format!("{}/oauth/token", server.uri()),
        audience: "https://m2m.example.com/".to_string(),
        client_id: "member-api".to_string(),
        client_secret: "s3cret".to_string(),
        bus_api_url: format!("{}/v5/", server.uri()),
        ..Default::default()
    }
}

async fn mount_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_partial_json(json!({
            "grant_type": "client_credentials",
            "client_id": "member-api",
            "client_secret": "s3cret",
            "audience": "https://m2m.example.com/"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "m2m-token",
            "expires_in": 3600
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn post_event_reuses_cached_token() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/v5/bus/events"))
        .and(header("authorization", "Bearer m2m-token"))
        .and(body_partial_json(json!({
            "topic": "member.action.profile.update",
            "originator": "member-api",
            "mime-type": "application/json"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;

    let client = BusClient::new(bus_config(&server));
    for handle in ["alice", "bob"] {
        let event = BusEvent::new(
            "member.action.profile.update",
            "member-api",
            json!({"handle": handle}),
        );
        client.post_event(event).await.unwrap();
    }
}

#[tokio::test]
async fn post_error_event_targets_error_topic() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/v5/bus/events"))
        .and(body_partial_json(json!({
            "topic": "common.error.reporting",
            "payload": {"error": "boom"}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = BusClient::new(bus_config(&server));
    client
        .post_error_event(json!({"error": "boom"}))
        .await
        .unwrap();
}

#[tokio::test]
async fn rejected_event_is_external_error() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/v5/bus/events"))
        .respond_with(ResponseTemplate::new(400).set_body_string("unknown topic"))
        .mount(&server)
        .await;

    let client = BusClient::new(bus_config(&server));
    let event = BusEvent::new("no.such.topic", "member-api", json!({}));
    match client.post_event(event).await.unwrap_err() {
        ServiceError::ExternalService { service, message } => {
            assert_eq!(service, "bus");
            assert!(message.contains("unknown topic"));
        }
        other => panic!("expected ExternalService, got {:?}", other),
    }
}

#[tokio::test]
async fn token_failure_skips_event_post() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "access_denied"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v5/bus/events"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = BusClient::new(bus_config(&server));
    let event = BusEvent::new("member.action.profile.update", "member-api", json!({}));
    let err = client.post_event(event).await.unwrap_err();
    assert!(matches!(err, ServiceError::ExternalService { .. }));
}

#[tokio::test]
async fn member_update_posts_through_bus_client() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/v5/bus/events"))
        .and(body_partial_json(json!({
            "topic": "member.action.profile.update",
            "payload": {"handle": "alice", "description": "Hi"}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = ServiceConfig::default();
    config.bus = bus_config(&server);
    let host = ServiceHost::new(
        config,
        Arc::new(InMemoryStore::with_records([Member::new(2, "alice")])),
        Arc::new(InMemoryStore::<MemberTrait>::new()),
    )
    .unwrap();
    let service = MemberService::new(Arc::new(host));

    let admin = Principal::from_claims(
        &Claims {
            roles: vec!["admin".to_string()],
            ..Default::default()
        },
        &AdminRoles::default(),
    );
    let data = json!({"description": "Hi"}).as_object().cloned().unwrap();
    let view = service
        .update_member("alice", data, Some(&admin))
        .await
        .unwrap();
    assert_eq!(view["description"], "Hi");
}
