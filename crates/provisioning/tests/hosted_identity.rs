//! HTTP-level tests for the hosted identity adapter.

use std::time::Duration;

use common::IdentityId;
use domain::{Email, Password};
use provisioning::{HostedIdentityConfig, HostedIdentityService, IdentityError, IdentityService};
use serde_json::json;
use url::Url;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "service-role-key";
const USERS: &str = "/auth/v1/admin/users";

fn service(server: &MockServer) -> HostedIdentityService {
    HostedIdentityService::new(HostedIdentityConfig {
        base_url: Url::parse(&server.uri()).unwrap(),
        service_key: KEY.to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn email(raw: &str) -> Email {
    Email::parse(raw).unwrap()
}

fn password() -> Password {
    Password::parse("p1").unwrap()
}

#[tokio::test]
async fn test_create_user_sends_credentials_and_confirms_email() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path(USERS))
        .and(header("apikey", KEY))
        .and(header("authorization", format!("Bearer {KEY}").as_str()))
        .and(body_partial_json(json!({
            "email": "a@x.com",
            "password": "p1",
            "email_confirm": true,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "email": "a@x.com",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let identity = service(&server)
        .create_user(&email("a@x.com"), &password())
        .await
        .unwrap();

    assert_eq!(identity.id, IdentityId::from_uuid(id));
    assert_eq!(identity.email, "a@x.com");
}

#[tokio::test]
async fn test_duplicate_email_responses_map_to_email_taken() {
    let cases: [(u16, serde_json::Value); 3] = [
        (409, json!({ "msg": "conflict" })),
        (422, json!({ "code": 422, "error_code": "email_exists", "msg": "taken" })),
        (
            400,
            json!({ "msg": "A user with this email address has already been registered" }),
        ),
    ];

    for (status, body) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(USERS))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;

        let err = service(&server)
            .create_user(&email("a@x.com"), &password())
            .await
            .unwrap_err();
        assert!(
            matches!(err, IdentityError::EmailTaken(ref e) if e == "a@x.com"),
            "status {status}: {err}"
        );
    }
}

#[tokio::test]
async fn test_other_rejections_keep_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(USERS))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "msg": "Password is too weak" })),
        )
        .mount(&server)
        .await;

    let err = service(&server)
        .create_user(&email("a@x.com"), &password())
        .await
        .unwrap_err();

    match err {
        IdentityError::Rejected { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "Password is too weak");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unreadable_create_response_recovers_user_by_email() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path(USERS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": { "id": "x" } })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(USERS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{ "id": id, "email": "a@x.com" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let identity = service(&server)
        .create_user(&email("a@x.com"), &password())
        .await
        .unwrap();

    assert_eq!(identity.id, IdentityId::from_uuid(id));
    assert_eq!(identity.email, "a@x.com");
}

#[tokio::test]
async fn test_unreadable_create_response_without_user_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(USERS))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(USERS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "users": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let err = service(&server)
        .create_user(&email("a@x.com"), &password())
        .await
        .unwrap_err();

    assert!(matches!(err, IdentityError::Malformed(_)), "{err}");
}

#[tokio::test]
async fn test_find_user_by_email_matches_case_insensitively() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path(USERS))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [
                { "id": Uuid::new_v4(), "email": "someone@x.com" },
                { "id": id, "email": "Ada@School.org" },
            ]
        })))
        .mount(&server)
        .await;

    let found = service(&server)
        .find_user_by_email(&email("ada@school.org"))
        .await
        .unwrap()
        .expect("user on first page");

    assert_eq!(found.id, IdentityId::from_uuid(id));
}

#[tokio::test]
async fn test_find_user_by_email_stops_on_short_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(USERS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "users": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let found = service(&server)
        .find_user_by_email(&email("nobody@x.com"))
        .await
        .unwrap();

    assert!(found.is_none());
}

#[tokio::test]
async fn test_delete_user() {
    let server = MockServer::start().await;
    let id = IdentityId::new();
    Mock::given(method("DELETE"))
        .and(path(format!("{USERS}/{id}")))
        .and(header("apikey", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    service(&server).delete_user(id).await.unwrap();
}

#[tokio::test]
async fn test_delete_missing_user_is_not_found() {
    let server = MockServer::start().await;
    let id = IdentityId::new();
    Mock::given(method("DELETE"))
        .and(path(format!("{USERS}/{id}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "msg": "User not found" })))
        .mount(&server)
        .await;

    let err = service(&server).delete_user(id).await.unwrap_err();
    assert!(matches!(err, IdentityError::NotFound(missing) if missing == id));
}

#[tokio::test]
async fn test_base_url_path_prefix_is_kept() {
    let server = MockServer::start().await;
    let id = IdentityId::new();
    Mock::given(method("DELETE"))
        .and(path(format!("/tenant-a{USERS}/{id}")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let service = HostedIdentityService::new(HostedIdentityConfig {
        base_url: Url::parse(&format!("{}/tenant-a", server.uri())).unwrap(),
        service_key: KEY.to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap();

    service.delete_user(id).await.unwrap();
}
