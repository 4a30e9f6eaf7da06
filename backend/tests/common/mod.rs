//! Shared wiring for HTTP-level tests: an app over the in-memory store and a
//! frozen clock.

#![allow(dead_code)]

use std::sync::Arc;

use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::header;
use actix_web::{test, web};
use serde_json::{json, Value};

use toolshare::handlers::AppState;
use toolshare::memory::MemoryStore;
use toolshare::services::Services;
use toolshare::test_support::{fixed_clock, test_settings};

pub const NOW: &str = "2024-01-01T09:00:00Z";

pub fn state(store: Arc<MemoryStore>) -> web::Data<AppState> {
    let services = Services::new(store, fixed_clock(NOW), &test_settings());
    web::Data::new(AppState::new(services))
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

pub struct Account {
    pub id: String,
    pub token: String,
}

pub async fn signup(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    email: &str,
    display_name: &str,
) -> Account {
    let req = test::TestRequest::post()
        .uri("/auth/signup")
        .set_json(json!({
            "email": email,
            "password": "correct horse battery",
            "displayName": display_name,
        }))
        .to_request();
    let res = test::call_service(app, req).await;
    assert_eq!(res.status().as_u16(), 201, "signup of {email}");
    let body: Value = test::read_body_json(res).await;
    Account {
        id: body["user"]["id"].as_str().expect("user id").to_owned(),
        token: body["accessToken"].as_str().expect("token").to_owned(),
    }
}

pub async fn list_tool(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    owner: &Account,
    category_id: &str,
    price_per_day: f64,
) -> Value {
    let req = test::TestRequest::post()
        .uri("/tools")
        .insert_header(bearer(&owner.token))
        .set_json(json!({
            "name": "Cordless drill",
            "description": "18V with two batteries",
            "categoryId": category_id,
            "pricePerDay": price_per_day,
            "replacementValue": 180.0,
            "latitude": 53.8,
            "longitude": -1.55,
            "images": ["drill.jpg"],
        }))
        .to_request();
    let res = test::call_service(app, req).await;
    assert_eq!(res.status().as_u16(), 201, "tool creation");
    test::read_body_json(res).await
}
