// src/api/notifications.rs

use actix_web::{get, put, web, HttpResponse, Responder};
use serde_json::json;
use uuid::Uuid;

use crate::{db, AppState};

#[utoipa::path(
    tag = "notifications",
    responses(
        (status = 200, description = "Own notifications, newest first",
         body = [crate::models::Notification]),
    )
)]
#[get("/notifications")]
pub async fn list_notifications(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
) -> impl Responder {
    match db::list_notifications(&state.pool, *user_id).await {
        Ok(notifications) => HttpResponse::Ok().json(notifications),
        Err(e) => {
            log::error!("list_notifications db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[utoipa::path(
    tag = "notifications",
    responses(
        (status = 200, description = "Unread notification count"),
    )
)]
#[get("/notifications/unread-count")]
pub async fn unread_count(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
) -> impl Responder {
    match db::unread_notification_count(&state.pool, *user_id).await {
        Ok(count) => HttpResponse::Ok().json(json!({"unread_count": count})),
        Err(e) => {
            log::error!("unread_count db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[utoipa::path(
    tag = "notifications",
    responses(
        (status = 200, description = "Notification marked read"),
        (status = 404, description = "Not found or not owned by the caller"),
    )
)]
#[put("/notifications/{notification_id}/read")]
pub async fn mark_read(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    path: web::Path<Uuid>,
) -> impl Responder {
    match db::mark_notification_read(&state.pool, *user_id, path.into_inner()).await {
        Ok(true) => HttpResponse::Ok().json(json!({"ok": true})),
        Ok(false) => HttpResponse::NotFound().json(json!({"error": "Notification not found"})),
        Err(e) => {
            log::error!("mark_read db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[utoipa::path(
    tag = "notifications",
    responses(
        (status = 200, description = "All notifications marked read"),
    )
)]
#[put("/notifications/read-all")]
pub async fn mark_all_read(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
) -> impl Responder {
    match db::mark_all_notifications_read(&state.pool, *user_id).await {
        Ok(updated) => HttpResponse::Ok().json(json!({"updated": updated})),
        Err(e) => {
            log::error!("mark_all_read db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
