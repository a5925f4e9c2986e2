pub mod admin;
pub mod auth;
pub mod downloads;
pub mod notifications;
pub mod payment_requests;
pub mod products;
pub mod profile;

use actix_web::HttpResponse;
use sqlx::PgPool;

use crate::db;
use crate::models::Role;

/// Admin gate shared by the back-office handlers. Role rows are absent for
/// plain users, so a missing row means forbidden, not an error.
pub(crate) async fn require_admin(pool: &PgPool, user_id: i32) -> Result<Role, HttpResponse> {
    match db::get_role(pool, user_id).await {
        Ok(role) if role.is_admin() => Ok(role),
        Ok(_) => Err(HttpResponse::Forbidden().json(serde_json::json!({
            "error": "admin role required"
        }))),
        Err(e) => {
            log::error!("role lookup error user_id={user_id}: {e}");
            Err(HttpResponse::InternalServerError().finish())
        }
    }
}
