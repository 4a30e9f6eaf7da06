//! End-to-end rental flow over HTTP.

mod common;

use std::sync::Arc;

use actix_web::{test, App};
use serde_json::{json, Value};

use toolshare::handlers;
use toolshare::memory::MemoryStore;
use toolshare::test_support::sample_categories;

use common::{bearer, list_tool, signup, state};

#[actix_web::test]
async fn bookings_keep_the_terms_they_were_made_under() {
    let categories = sample_categories();
    let power_tools = categories[0].id.to_string();
    let store = Arc::new(MemoryStore::with_categories(categories));
    let app = test::init_service(
        App::new()
            .app_data(state(store.clone()))
            .configure(handlers::configure),
    )
    .await;

    let alice = signup(&app, "alice@example.com", "Alice").await;
    let bob = signup(&app, "bob@example.com", "Bob").await;

    let tool = list_tool(&app, &alice, &power_tools, 20.0).await;
    let tool_id = tool["id"].as_str().expect("tool id").to_owned();
    let first_version = tool["activeVersionId"].clone();
    assert_eq!(tool["pricePerDay"].as_f64(), Some(20.0));
    assert_eq!(tool["category"]["slug"], "power-tools");
    assert_eq!(tool["owner"]["displayName"], "Alice");

    // Bob requests three days.
    let req = test::TestRequest::post()
        .uri("/bookings")
        .insert_header(bearer(&bob.token))
        .set_json(json!({
            "toolId": tool_id,
            "startDate": "2024-01-10T00:00:00Z",
            "endDate": "2024-01-12T00:00:00Z",
            "totalPrice": 60.0,
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 201);
    let booking: Value = test::read_body_json(res).await;
    assert_eq!(booking["status"], "PENDING");
    assert_eq!(booking["toolVersionId"], first_version);
    let booking_id = booking["id"].as_str().expect("booking id").to_owned();

    // Alice approves.
    let req = test::TestRequest::patch()
        .uri(&format!("/bookings/{booking_id}/status"))
        .insert_header(bearer(&alice.token))
        .set_json(json!({ "status": "APPROVED" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 200);
    let approved: Value = test::read_body_json(res).await;
    assert_eq!(approved["status"], "APPROVED");

    let req = test::TestRequest::get()
        .uri(&format!("/tools/{tool_id}/availability"))
        .to_request();
    let availability: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        availability["bookedDates"],
        json!(["2024-01-10", "2024-01-11", "2024-01-12"])
    );
    assert_eq!(availability["manualBlockedDates"], json!([]));

    // A manual block on a booked day is refused and names the day.
    let req = test::TestRequest::patch()
        .uri(&format!("/tools/{tool_id}/availability"))
        .insert_header(bearer(&alice.token))
        .set_json(json!({ "manualBlockedDates": ["2024-01-11"] }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 409);
    let err: Value = test::read_body_json(res).await;
    assert_eq!(err["code"], "conflict");
    assert_eq!(err["details"]["conflictingDates"], json!(["2024-01-11"]));

    // A free day can be blocked.
    let req = test::TestRequest::patch()
        .uri(&format!("/tools/{tool_id}/availability"))
        .insert_header(bearer(&alice.token))
        .set_json(json!({ "manualBlockedDates": ["2024-01-20"] }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 200);
    let availability: Value = test::read_body_json(res).await;
    assert_eq!(availability["manualBlockedDates"], json!(["2024-01-20"]));

    // Price edit creates a new version under the same tool id.
    let req = test::TestRequest::patch()
        .uri(&format!("/tools/{tool_id}"))
        .insert_header(bearer(&alice.token))
        .set_json(json!({ "pricePerDay": 25.0 }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status().as_u16(), 200);
    let edited: Value = test::read_body_json(res).await;
    assert_eq!(edited["id"], tool_id.as_str());
    assert_eq!(edited["pricePerDay"].as_f64(), Some(25.0));
    assert_ne!(edited["activeVersionId"], first_version);

    let req = test::TestRequest::get()
        .uri("/bookings/renter")
        .insert_header(bearer(&bob.token))
        .to_request();
    let rentals: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(rentals.as_array().map(Vec::len), Some(1));
    assert_eq!(rentals[0]["totalPrice"].as_f64(), Some(60.0));
    assert_eq!(rentals[0]["tool"]["pricePerDay"].as_f64(), Some(20.0));
    assert_eq!(rentals[0]["owner"]["displayName"], "Alice");

    let req = test::TestRequest::get()
        .uri("/bookings/owner")
        .insert_header(bearer(&alice.token))
        .to_request();
    let requests: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(requests[0]["renter"]["email"], "bob@example.com");
    assert_eq!(requests[0]["id"], booking_id.as_str());
}

#[actix_web::test]
async fn overlapping_booking_requests_conflict() {
    let categories = sample_categories();
    let power_tools = categories[0].id.to_string();
    let store = Arc::new(MemoryStore::with_categories(categories));
    let app = test::init_service(
        App::new()
            .app_data(state(store.clone()))
            .configure(handlers::configure),
    )
    .await;

    let alice = signup(&app, "alice@example.com", "Alice").await;
    let bob = signup(&app, "bob@example.com", "Bob").await;
    let carol = signup(&app, "carol@example.com", "Carol").await;
    let tool = list_tool(&app, &alice, &power_tools, 20.0).await;
    let tool_id = tool["id"].as_str().expect("tool id").to_owned();

    let request = |token: &str, start: &str, end: &str| {
        test::TestRequest::post()
            .uri("/bookings")
            .insert_header(bearer(token))
            .set_json(json!({
                "toolId": tool_id,
                "startDate": start,
                "endDate": end,
                "totalPrice": 40.0,
            }))
            .to_request()
    };

    let res = test::call_service(
        &app,
        request(&bob.token, "2024-01-10T00:00:00Z", "2024-01-11T00:00:00Z"),
    )
    .await;
    assert_eq!(res.status().as_u16(), 201);

    let res = test::call_service(
        &app,
        request(&carol.token, "2024-01-11T00:00:00Z", "2024-01-12T00:00:00Z"),
    )
    .await;
    assert_eq!(res.status().as_u16(), 409);
    let err: Value = test::read_body_json(res).await;
    assert_eq!(err["details"]["conflictingDates"], json!(["2024-01-11"]));

    let res = test::call_service(
        &app,
        request(&alice.token, "2024-01-20T00:00:00Z", "2024-01-21T00:00:00Z"),
    )
    .await;
    assert_eq!(res.status().as_u16(), 400);
}

#[actix_web::test]
async fn status_changes_enforce_roles_and_lifecycle() {
    let categories = sample_categories();
    let power_tools = categories[0].id.to_string();
    let store = Arc::new(MemoryStore::with_categories(categories));
    let app = test::init_service(
        App::new()
            .app_data(state(store.clone()))
            .configure(handlers::configure),
    )
    .await;

    let alice = signup(&app, "alice@example.com", "Alice").await;
    let bob = signup(&app, "bob@example.com", "Bob").await;
    let tool = list_tool(&app, &alice, &power_tools, 20.0).await;

    let req = test::TestRequest::post()
        .uri("/bookings")
        .insert_header(bearer(&bob.token))
        .set_json(json!({
            "toolId": tool["id"],
            "startDate": "2024-01-10T00:00:00Z",
            "endDate": "2024-01-10T00:00:00Z",
            "totalPrice": 20.0,
        }))
        .to_request();
    let booking: Value = test::call_and_read_body_json(&app, req).await;
    let uri = format!("/bookings/{}/status", booking["id"].as_str().expect("id"));

    let patch = |token: &str, status: &str| {
        test::TestRequest::patch()
            .uri(&uri)
            .insert_header(bearer(token))
            .set_json(json!({ "status": status }))
            .to_request()
    };

    // The renter cannot approve their own request.
    let res = test::call_service(&app, patch(&bob.token, "APPROVED")).await;
    assert_eq!(res.status().as_u16(), 403);

    // PENDING is never a valid target.
    let res = test::call_service(&app, patch(&alice.token, "PENDING")).await;
    assert_eq!(res.status().as_u16(), 400);

    let res = test::call_service(&app, patch(&bob.token, "CANCELLED")).await;
    assert_eq!(res.status().as_u16(), 200);

    let res = test::call_service(&app, patch(&alice.token, "APPROVED")).await;
    assert_eq!(res.status().as_u16(), 409);
}
