// src/api/profile.rs

use actix_web::{get, put, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::{db, AppState};

#[utoipa::path(
    tag = "profile",
    responses(
        (status = 200, description = "Own profile", body = crate::models::Profile),
        (status = 404, description = "Profile missing"),
    )
)]
#[get("/profile")]
pub async fn get_profile(state: web::Data<AppState>, user_id: web::ReqData<i32>) -> impl Responder {
    match db::get_profile(&state.pool, *user_id).await {
        Ok(Some(profile)) => HttpResponse::Ok().json(profile),
        Ok(None) => HttpResponse::NotFound().json(json!({"error": "Profile not found"})),
        Err(e) => {
            log::error!("get_profile db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub whatsapp_number: Option<String>,
    pub telegram_id: Option<String>,
}

#[utoipa::path(
    tag = "profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = crate::models::Profile),
        (status = 404, description = "Profile missing"),
    )
)]
#[put("/profile")]
pub async fn update_profile(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    payload: web::Json<UpdateProfileRequest>,
) -> impl Responder {
    let user_id = *user_id;
    let updated = db::update_profile(
        &state.pool,
        user_id,
        payload.full_name.as_deref(),
        payload.whatsapp_number.as_deref(),
        payload.telegram_id.as_deref(),
    )
    .await;

    match updated {
        Ok(true) => match db::get_profile(&state.pool, user_id).await {
            Ok(Some(profile)) => HttpResponse::Ok().json(profile),
            Ok(None) => HttpResponse::NotFound().json(json!({"error": "Profile not found"})),
            Err(e) => {
                log::error!("update_profile reload error: {e}");
                HttpResponse::InternalServerError().finish()
            }
        },
        Ok(false) => HttpResponse::NotFound().json(json!({"error": "Profile not found"})),
        Err(e) => {
            log::error!("update_profile db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
