use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::handlers::{AppState, AuthUser};
use crate::models::{CreateToolRequest, ToolsQuery, UpdateAvailabilityRequest, UpdateToolRequest};

pub async fn list_tools(
    data: web::Data<AppState>,
    query: web::Query<ToolsQuery>,
) -> ApiResult<HttpResponse> {
    let exclude = query.into_inner().exclude;
    let tools = web::block(move || data.services.tools.list(exclude)).await??;
    Ok(HttpResponse::Ok().json(tools))
}

pub async fn my_tools(data: web::Data<AppState>, user: AuthUser) -> ApiResult<HttpResponse> {
    let tools = web::block(move || data.services.tools.list_mine(user.user_id)).await??;
    Ok(HttpResponse::Ok().json(tools))
}

pub async fn create_tool(
    data: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreateToolRequest>,
) -> ApiResult<HttpResponse> {
    let request = body.into_inner();
    let tool = web::block(move || data.services.tools.create(user.user_id, request)).await??;
    Ok(HttpResponse::Created().json(tool))
}

pub async fn get_tool(data: web::Data<AppState>, id: web::Path<Uuid>) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let tool = web::block(move || data.services.tools.get(id)).await??;
    Ok(HttpResponse::Ok().json(tool))
}

pub async fn update_tool(
    data: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<UpdateToolRequest>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let request = body.into_inner();
    let tool = web::block(move || data.services.tools.update(id, user.user_id, request)).await??;
    Ok(HttpResponse::Ok().json(tool))
}

pub async fn delete_tool(
    data: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    web::block(move || data.services.tools.delete(id, user.user_id)).await??;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn get_availability(
    data: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let availability = web::block(move || data.services.availability.get(id)).await??;
    Ok(HttpResponse::Ok().json(availability))
}

pub async fn update_availability(
    data: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<UpdateAvailabilityRequest>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let request = body.into_inner();
    let availability =
        web::block(move || data.services.availability.update(id, user.user_id, request)).await??;
    Ok(HttpResponse::Ok().json(availability))
}
