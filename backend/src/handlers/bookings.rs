use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::handlers::{AppState, AuthUser};
use crate::models::{CreateBookingRequest, UpdateBookingStatusRequest};

pub async fn create_booking(
    data: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreateBookingRequest>,
) -> ApiResult<HttpResponse> {
    let request = body.into_inner();
    let booking =
        web::block(move || data.services.bookings.create(user.user_id, request)).await??;
    Ok(HttpResponse::Created().json(booking))
}

pub async fn renter_bookings(
    data: web::Data<AppState>,
    user: AuthUser,
) -> ApiResult<HttpResponse> {
    let bookings = web::block(move || data.services.bookings.list_for_renter(user.user_id)).await??;
    Ok(HttpResponse::Ok().json(bookings))
}

pub async fn owner_bookings(
    data: web::Data<AppState>,
    user: AuthUser,
) -> ApiResult<HttpResponse> {
    let bookings = web::block(move || data.services.bookings.list_for_owner(user.user_id)).await??;
    Ok(HttpResponse::Ok().json(bookings))
}

pub async fn update_booking_status(
    data: web::Data<AppState>,
    user: AuthUser,
    id: web::Path<Uuid>,
    body: web::Json<UpdateBookingStatusRequest>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let status = body.into_inner().status;
    let booking =
        web::block(move || data.services.bookings.update_status(id, user.user_id, status)).await??;
    Ok(HttpResponse::Ok().json(booking))
}
