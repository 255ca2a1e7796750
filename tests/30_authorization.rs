mod common;

use anyhow::Result;
use common::{user, TestServer, SECRET};
use iot_guard::auth::{Claims, TokenService};
use iot_guard::config::RoleSource;
use iot_guard::store::{UserRecord, UserStore};
use reqwest::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

fn device() -> serde_json::Value {
    json!({ "name": "greenhouse-7", "type": "sensor", "location": "north bay" })
}

fn mint(username: &str, role: Option<&str>, hours: i64, secret: &str) -> String {
    let claims = Claims::new(
        Uuid::new_v4(),
        username,
        role.map(str::to_string),
        chrono::Duration::hours(hours),
    )
    .unwrap();
    TokenService::new(secret, 1)
        .unwrap()
        .issue_claims(&claims)
        .unwrap()
}

#[tokio::test]
async fn permitted_roles_create_devices() -> Result<()> {
    let server = TestServer::start().await?;

    for username in ["alice", "eddie"] {
        let token = server.login(username).await?;
        let (status, body) = server
            .send(Method::POST, "/api/devices", Some(&token), Some(device()))
            .await?;
        assert_eq!(status, StatusCode::CREATED, "{}: {}", username, body);
        assert_eq!(body["data"]["created_by"], username);
    }

    let token = server.login("victor").await?;
    let (status, body) = server
        .send(Method::GET, "/api/devices", Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn insufficient_role_is_forbidden() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.login("victor").await?;

    let (status, body) = server
        .send(Method::POST, "/api/devices", Some(&token), Some(device()))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "INSUFFICIENT_PRIVILEGE");

    let token = server.login("eddie").await?;
    let (status, _) = server
        .send(
            Method::POST,
            "/api/templates",
            Some(&token),
            Some(json!({ "name": "frost", "body": "Frost warning" })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn denied_request_has_no_side_effect() -> Result<()> {
    let server = TestServer::start().await?;
    let viewer = server.login("victor").await?;
    server
        .send(Method::POST, "/api/devices", Some(&viewer), Some(device()))
        .await?;

    let (_, body) = server
        .send(Method::GET, "/api/devices", Some(&viewer), None)
        .await?;
    assert_eq!(body["data"], json!([]));
    Ok(())
}

#[tokio::test]
async fn missing_token_is_unauthenticated() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, body) = server
        .send(Method::POST, "/api/devices", None, Some(device()))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "MISSING_CREDENTIAL");

    let (status, _) = server.send(Method::GET, "/api/weather", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn token_without_role_is_unauthenticated() -> Result<()> {
    let server = TestServer::start().await?;

    for role in [None, Some(""), Some("   ")] {
        let token = mint("ghost", role, 1, SECRET);
        let (status, body) = server
            .send(Method::GET, "/api/devices", Some(&token), None)
            .await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "role {:?}", role);
        assert_eq!(body["code"], "MISSING_CREDENTIAL");
    }
    Ok(())
}

#[tokio::test]
async fn unknown_role_is_forbidden() -> Result<()> {
    let server = TestServer::start().await?;
    let token = mint("ghost", Some("superuser"), 1, SECRET);

    let (status, body) = server
        .send(Method::GET, "/api/devices", Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "INSUFFICIENT_PRIVILEGE");
    Ok(())
}

#[tokio::test]
async fn expired_or_foreign_tokens_are_rejected() -> Result<()> {
    let server = TestServer::start().await?;

    let expired = mint("alice", Some("admin"), -1, SECRET);
    let foreign = mint("alice", Some("admin"), 1, "some-other-secret");

    for token in [expired, foreign, "not.a.jwt".to_string()] {
        let (status, body) = server
            .send(Method::GET, "/api/devices", Some(&token), None)
            .await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_TOKEN");
    }
    Ok(())
}

#[tokio::test]
async fn role_case_is_ignored() -> Result<()> {
    let server = TestServer::start().await?;

    let token = server.login("shouty").await?;
    let (status, _) = server
        .send(
            Method::POST,
            "/api/templates",
            Some(&token),
            Some(json!({ "name": "frost", "body": "Frost warning" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let token = mint("mixed", Some("Editor"), 1, SECRET);
    let (status, _) = server
        .send(
            Method::POST,
            "/api/weather/collect",
            Some(&token),
            Some(json!({ "location": "north bay", "temperature_c": 4.5 })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn validation_runs_after_authorization() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.login("alice").await?;

    let (status, body) = server
        .send(Method::POST, "/api/devices", Some(&admin), Some(json!({ "type": "sensor" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let viewer = server.login("victor").await?;
    let (status, _) = server
        .send(Method::POST, "/api/devices", Some(&viewer), Some(json!({ "type": "sensor" })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn delete_requires_admin() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.login("alice").await?;
    let editor = server.login("eddie").await?;

    let (_, created) = server
        .send(Method::POST, "/api/devices", Some(&editor), Some(device()))
        .await?;
    let path = format!("/api/devices/{}", created["data"]["id"].as_str().unwrap());

    let (status, _) = server.send(Method::DELETE, &path, Some(&editor), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server.send(Method::DELETE, &path, Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = server.send(Method::DELETE, &path, Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn store_role_source_follows_demotion() -> Result<()> {
    let alice = user("alice", "admin");
    let server = TestServer::start_with(RoleSource::Store, vec![alice.clone()]).await?;
    let token = server.login("alice").await?;

    let (status, _) = server
        .send(Method::POST, "/api/devices", Some(&token), Some(device()))
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    server
        .users
        .upsert(UserRecord {
            role: "viewer".to_string(),
            ..alice.clone()
        })
        .await?;
    let (status, _) = server
        .send(Method::POST, "/api/devices", Some(&token), Some(device()))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert!(server.users.remove(alice.id).await);
    let (status, body) = server
        .send(Method::GET, "/api/devices", Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "MISSING_CREDENTIAL");
    Ok(())
}

#[tokio::test]
async fn token_role_source_keeps_issued_role() -> Result<()> {
    let alice = user("alice", "admin");
    let server = TestServer::start_with(RoleSource::Token, vec![alice.clone()]).await?;
    let token = server.login("alice").await?;

    server
        .users
        .upsert(UserRecord {
            role: "viewer".to_string(),
            ..alice
        })
        .await?;
    let (status, _) = server
        .send(Method::POST, "/api/devices", Some(&token), Some(device()))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}
