use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use futures::future::{ready, Ready};
use uuid::Uuid;

use crate::error::{ApiResult, Error};
use crate::handlers::AppState;
use crate::models::{ForgotPasswordRequest, LoginRequest, SignupRequest};

/// The caller identified by a valid `Authorization: Bearer <jwt>` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl AuthUser {
    fn from_header(req: &HttpRequest) -> ApiResult<Self> {
        let state = req
            .app_data::<web::Data<AppState>>()
            .ok_or_else(|| Error::internal("application state is not registered"))?;

        let token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::unauthorized("Missing or invalid Authorization header"))?;

        let claims = state.services.auth.tokens().verify(token)?;
        Ok(Self { user_id: claims.sub })
    }
}

impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Self::from_header(req))
    }
}

pub async fn signup(
    data: web::Data<AppState>,
    body: web::Json<SignupRequest>,
) -> ApiResult<HttpResponse> {
    let request = body.into_inner();
    let created = web::block(move || data.services.auth.signup(request)).await??;
    Ok(HttpResponse::Created().json(created))
}

pub async fn login(
    data: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let request = body.into_inner();
    let session = web::block(move || data.services.auth.login(request)).await??;
    Ok(HttpResponse::Ok().json(session))
}

pub async fn forgot_password(
    data: web::Data<AppState>,
    body: web::Json<ForgotPasswordRequest>,
) -> ApiResult<HttpResponse> {
    let email = body.into_inner().email;
    let reply = web::block(move || data.services.auth.forgot_password(&email)).await??;
    Ok(HttpResponse::Ok().json(reply))
}

pub async fn me(data: web::Data<AppState>, user: AuthUser) -> ApiResult<HttpResponse> {
    let profile = web::block(move || data.services.auth.me(user.user_id)).await??;
    Ok(HttpResponse::Ok().json(profile))
}
