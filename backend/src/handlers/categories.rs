use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::handlers::AppState;

pub async fn list_categories(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let categories = web::block(move || data.services.categories.top_level()).await??;
    Ok(HttpResponse::Ok().json(categories))
}

pub async fn list_children(
    data: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let parent_id = id.into_inner();
    let children = web::block(move || data.services.categories.children(parent_id)).await??;
    Ok(HttpResponse::Ok().json(children))
}
