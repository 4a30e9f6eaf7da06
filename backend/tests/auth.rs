//! Account endpoints and the bearer extractor.

mod common;

use std::sync::Arc;

use actix_web::{test, App};
use rstest::rstest;
use serde_json::{json, Value};

use toolshare::handlers;
use toolshare::memory::MemoryStore;

use common::{bearer, signup, state};

#[actix_web::test]
async fn signup_token_identifies_the_caller() {
    let app = test::init_service(
        App::new()
            .app_data(state(Arc::new(MemoryStore::new())))
            .configure(handlers::configure),
    )
    .await;
    let ada = signup(&app, "Ada@Example.com", "Ada").await;

    let req = test::TestRequest::get()
        .uri("/auth/me")
        .insert_header(bearer(&ada.token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 200);
    let me: Value = test::read_body_json(res).await;
    assert_eq!(me["id"], ada.id.as_str());
    assert_eq!(me["email"], "ada@example.com");
    assert_eq!(me["verificationTier"], "UNVERIFIED");
    assert!(me.get("passwordHash").is_none());
}

#[actix_web::test]
async fn login_returns_a_fresh_token() {
    let app = test::init_service(
        App::new()
            .app_data(state(Arc::new(MemoryStore::new())))
            .configure(handlers::configure),
    )
    .await;
    signup(&app, "ada@example.com", "Ada").await;

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": "ada@example.com", "password": "correct horse battery" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 200);
    let body: Value = test::read_body_json(res).await;
    assert!(body["accessToken"].as_str().is_some_and(|t| !t.is_empty()));

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": "ada@example.com", "password": "wrong" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 401);
    let err: Value = test::read_body_json(res).await;
    assert_eq!(err["message"], "Invalid credentials");
}

#[rstest]
#[case::missing(None)]
#[case::not_bearer(Some("Basic abc"))]
#[case::garbage(Some("Bearer not-a-jwt"))]
#[actix_web::test]
async fn protected_routes_reject_bad_credentials(#[case] header: Option<&str>) {
    let app = test::init_service(
        App::new()
            .app_data(state(Arc::new(MemoryStore::new())))
            .configure(handlers::configure),
    )
    .await;

    let mut req = test::TestRequest::get().uri("/auth/me");
    if let Some(value) = header {
        req = req.insert_header((actix_web::http::header::AUTHORIZATION, value));
    }
    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status().as_u16(), 401);
    let err: Value = test::read_body_json(res).await;
    assert_eq!(err["code"], "unauthorized");
}

#[actix_web::test]
async fn duplicate_signup_conflicts_and_bad_bodies_are_rejected() {
    let app = test::init_service(
        App::new()
            .app_data(state(Arc::new(MemoryStore::new())))
            .configure(handlers::configure),
    )
    .await;
    signup(&app, "ada@example.com", "Ada").await;

    let req = test::TestRequest::post()
        .uri("/auth/signup")
        .set_json(json!({
            "email": "ada@example.com",
            "password": "another password",
            "displayName": "Ada again",
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 409);

    let req = test::TestRequest::post()
        .uri("/auth/signup")
        .set_json(json!({ "email": "bob@example.com" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 400);
    let err: Value = test::read_body_json(res).await;
    assert_eq!(err["code"], "invalid_request");
}

#[actix_web::test]
async fn forgot_password_does_not_reveal_accounts() {
    let app = test::init_service(
        App::new()
            .app_data(state(Arc::new(MemoryStore::new())))
            .configure(handlers::configure),
    )
    .await;
    signup(&app, "ada@example.com", "Ada").await;

    let mut messages = Vec::new();
    for email in ["ada@example.com", "ghost@example.com"] {
        let req = test::TestRequest::post()
            .uri("/auth/forgot-password")
            .set_json(json!({ "email": email }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status().as_u16(), 200);
        let body: Value = test::read_body_json(res).await;
        messages.push(body["message"].clone());
    }
    assert_eq!(messages[0], messages[1]);
}

#[actix_web::test]
async fn users_list_and_stats() {
    let app = test::init_service(
        App::new()
            .app_data(state(Arc::new(MemoryStore::new())))
            .configure(handlers::configure),
    )
    .await;
    let ada = signup(&app, "ada@example.com", "Ada").await;
    signup(&app, "bob@example.com", "Bob").await;

    let req = test::TestRequest::get()
        .uri("/users")
        .insert_header(bearer(&ada.token))
        .to_request();
    let users: Value = test::call_and_read_body_json(&app, req).await;
    let users = users.as_array().expect("array");
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("passwordHash").is_none()));

    let req = test::TestRequest::get()
        .uri("/users/me/stats")
        .insert_header(bearer(&ada.token))
        .to_request();
    let stats: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(stats, json!({ "listedCount": 0, "rentalCount": 0, "rating": null }));

    let req = test::TestRequest::get().uri("/users").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 401);
}
