use actix_web::{web, HttpResponse};

use crate::error::ApiResult;
use crate::handlers::{AppState, AuthUser};

pub async fn list_users(data: web::Data<AppState>, _user: AuthUser) -> ApiResult<HttpResponse> {
    let users = web::block(move || data.services.users.list()).await??;
    Ok(HttpResponse::Ok().json(users))
}

pub async fn my_stats(data: web::Data<AppState>, user: AuthUser) -> ApiResult<HttpResponse> {
    let stats = web::block(move || data.services.users.stats(user.user_id)).await??;
    Ok(HttpResponse::Ok().json(stats))
}
