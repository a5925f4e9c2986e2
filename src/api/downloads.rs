// src/api/downloads.rs

use actix_web::{get, web, HttpResponse, Responder};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{db, lifecycle, s3_utils, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct DownloadResponse {
    /// Signed, time-limited GET URL for the product file.
    pub url: String,
    /// Seconds the client should count down before following the URL.
    pub countdown_secs: u64,
}

#[utoipa::path(
    tag = "downloads",
    responses(
        (status = 200, description = "Signed download URL", body = DownloadResponse),
        (status = 403, description = "No access to this product"),
        (status = 404, description = "Product not found or has no file"),
    )
)]
#[get("/products/{product_id}/download")]
pub async fn download_product(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    path: web::Path<Uuid>,
) -> impl Responder {
    let product_id = path.into_inner();
    let user_id = *user_id;

    // Admins can download inactive products; everyone else sees only the
    // active catalog.
    let role = match db::get_role(&state.pool, user_id).await {
        Ok(r) => r,
        Err(e) => {
            log::error!("download role lookup error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let product = if role.is_admin() {
        db::get_product(&state.pool, product_id).await
    } else {
        db::get_active_product(&state.pool, product_id).await
    };
    let product = match product {
        Ok(Some(p)) => p,
        Ok(None) => return HttpResponse::NotFound().json(json!({"error": "Product not found"})),
        Err(e) => {
            log::error!("download product lookup error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let has_grant = match db::has_access(&state.pool, user_id, product_id).await {
        Ok(v) => v,
        Err(e) => {
            log::error!("download grant lookup error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if !lifecycle::can_download(role, product.price, has_grant) {
        return HttpResponse::Forbidden().json(json!({
            "error": "You do not have access to this product"
        }));
    }

    let Some(file_key) = product.file_key.as_deref() else {
        return HttpResponse::NotFound().json(json!({
            "error": "No file is attached to this product"
        }));
    };

    // Browsers save the file under the product title, not the object key.
    let filename = download_filename(&product.title, file_key);
    let url = match s3_utils::presign_download(
        &state.s3_client,
        &state.s3_bucket,
        file_key,
        &filename,
        state.signed_url_ttl_secs,
    )
    .await
    {
        Ok(url) => url,
        Err(e) => {
            log::error!("presign error product_id={product_id}: {e}");
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to prepare download"}));
        }
    };

    HttpResponse::Ok().json(DownloadResponse {
        url,
        countdown_secs: lifecycle::countdown_secs(role, state.download_countdown_secs),
    })
}

/// Product title plus the stored file's extension.
fn download_filename(title: &str, file_key: &str) -> String {
    match file_key.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && !ext.contains('/') => format!("{title}.{ext}"),
        _ => title.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::download_filename;

    #[test]
    fn filename_keeps_stored_extension() {
        assert_eq!(
            download_filename("Neon Pack", "product-files/abc123.zip"),
            "Neon Pack.zip"
        );
    }

    #[test]
    fn filename_without_extension_is_just_the_title() {
        assert_eq!(
            download_filename("Neon Pack", "product-files/abc123"),
            "Neon Pack"
        );
    }
}
