//! HTTP surface. Handlers decode the request, run the matching service on
//! actix's blocking pool, and encode the result.

pub mod auth;
pub mod bookings;
pub mod categories;
pub mod tools;
pub mod users;

use actix_web::{error, web, HttpRequest};

use crate::error::Error;
use crate::services::Services;

pub use auth::AuthUser;

/// Shared per-worker state.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

/// Registers every route. `/tools/mine` is declared before `/tools/{id}`
/// so it is not captured as an id.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(path_config())
        .app_data(query_config())
        .service(
            web::scope("/auth")
                .route("/signup", web::post().to(auth::signup))
                .route("/login", web::post().to(auth::login))
                .route("/forgot-password", web::post().to(auth::forgot_password))
                .route("/me", web::get().to(auth::me)),
        )
        .service(
            web::scope("/users")
                .route("", web::get().to(users::list_users))
                .route("/me/stats", web::get().to(users::my_stats)),
        )
        .service(
            web::scope("/categories")
                .route("", web::get().to(categories::list_categories))
                .route("/{id}/children", web::get().to(categories::list_children)),
        )
        .service(
            web::scope("/tools")
                .route("", web::get().to(tools::list_tools))
                .route("", web::post().to(tools::create_tool))
                .route("/mine", web::get().to(tools::my_tools))
                .route("/{id}", web::get().to(tools::get_tool))
                .route("/{id}", web::patch().to(tools::update_tool))
                .route("/{id}", web::delete().to(tools::delete_tool))
                .route("/{id}/availability", web::get().to(tools::get_availability))
                .route("/{id}/availability", web::patch().to(tools::update_availability)),
        )
        .service(
            web::scope("/bookings")
                .route("", web::post().to(bookings::create_booking))
                .route("/renter", web::get().to(bookings::renter_bookings))
                .route("/owner", web::get().to(bookings::owner_bookings))
                .route("/{id}/status", web::patch().to(bookings::update_booking_status)),
        );
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| {
        let message = err.to_string();
        error::InternalError::from_response(err, reject(message)).into()
    })
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req: &HttpRequest| {
        let message = err.to_string();
        error::InternalError::from_response(err, reject(message)).into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req: &HttpRequest| {
        let message = err.to_string();
        error::InternalError::from_response(err, reject(message)).into()
    })
}

fn reject(message: String) -> actix_web::HttpResponse {
    use actix_web::ResponseError;
    Error::invalid_request(message).error_response()
}
