// src/api/products.rs

use actix_multipart::Multipart;
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::require_admin;
use crate::{db, s3_utils, AppState};

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

#[utoipa::path(
    tag = "catalog",
    responses(
        (status = 200, description = "Active products", body = [crate::models::Product]),
    )
)]
#[get("/products")]
pub async fn list_products(
    state: web::Data<AppState>,
    query: web::Query<CatalogQuery>,
) -> impl Responder {
    match db::list_active_products(
        &state.pool,
        query.category.as_deref(),
        query.search.as_deref(),
    )
    .await
    {
        Ok(products) => HttpResponse::Ok().json(products),
        Err(e) => {
            log::error!("list_products db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[utoipa::path(
    tag = "catalog",
    responses(
        (status = 200, description = "Product details", body = crate::models::Product),
        (status = 404, description = "Product not found or inactive"),
    )
)]
#[get("/products/{product_id}")]
pub async fn get_product(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> impl Responder {
    match db::get_active_product(&state.pool, path.into_inner()).await {
        Ok(Some(product)) => HttpResponse::Ok().json(product),
        Ok(None) => HttpResponse::NotFound().json(json!({"error": "Product not found"})),
        Err(e) => {
            log::error!("get_product db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

const MAX_FEATURE_IMAGES: usize = 6;

async fn read_field_bytes(field: &mut actix_multipart::Field) -> Vec<u8> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        if let Ok(data) = chunk {
            bytes.extend_from_slice(&data);
        }
    }
    bytes
}

#[derive(Default)]
struct ProductForm {
    title: String,
    description: Option<String>,
    price: Option<String>,
    category: Option<String>,
    tags: Option<String>,
    image: Option<(String, Vec<u8>)>,
    file: Option<(String, Vec<u8>)>,
    feature_images: Vec<(String, Vec<u8>)>,
}

async fn parse_product_form(payload: &mut Multipart) -> ProductForm {
    let mut form = ProductForm::default();

    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(f) => f,
            Err(_) => continue,
        };

        let cd = field.content_disposition();
        let Some(name) = cd.get_name().map(str::to_string) else {
            continue;
        };
        let filename = cd.get_filename().map(str::to_string);
        let bytes = read_field_bytes(&mut field).await;

        match name.as_str() {
            "title" => form.title = String::from_utf8_lossy(&bytes).trim().to_string(),
            "description" => {
                let text = String::from_utf8_lossy(&bytes).trim().to_string();
                form.description = (!text.is_empty()).then_some(text);
            }
            "price" => form.price = Some(String::from_utf8_lossy(&bytes).trim().to_string()),
            "category" => {
                let text = String::from_utf8_lossy(&bytes).trim().to_string();
                form.category = (!text.is_empty()).then_some(text);
            }
            "tags" => form.tags = Some(String::from_utf8_lossy(&bytes).trim().to_string()),
            "image" => {
                if let Some(filename) = filename {
                    form.image = Some((filename, bytes));
                }
            }
            "file" => {
                if let Some(filename) = filename {
                    form.file = Some((filename, bytes));
                }
            }
            "feature_images" => {
                if let Some(filename) = filename {
                    form.feature_images.push((filename, bytes));
                }
            }
            _ => {}
        }
    }

    form
}

fn parse_tags(raw: Option<&str>) -> Option<Vec<String>> {
    let tags: Vec<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    (!tags.is_empty()).then_some(tags)
}

#[post("/admin/products")]
pub async fn create_product(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    mut payload: Multipart,
) -> impl Responder {
    if let Err(resp) = require_admin(&state.pool, *user_id).await {
        return resp;
    }

    let form = parse_product_form(&mut payload).await;

    if form.title.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "Please fill in all required fields"
        }));
    }

    // Absent price means a free product.
    let price = match form.price.as_deref().filter(|p| !p.is_empty()) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(p) if p >= 0.0 => p,
            _ => {
                return HttpResponse::BadRequest().json(json!({"error": "Invalid price"}));
            }
        },
        None => 0.0,
    };

    if form.feature_images.len() > MAX_FEATURE_IMAGES {
        return HttpResponse::BadRequest().json(json!({
            "error": "Maximum 6 feature images allowed"
        }));
    }

    let mut image_url = None;
    if let Some((filename, bytes)) = form.image {
        let key = s3_utils::object_key("product-images", &filename);
        let content_type = s3_utils::content_type_for(&filename);
        if let Err(e) =
            s3_utils::upload_object(&state.s3_client, &state.s3_bucket, &key, bytes, content_type)
                .await
        {
            log::error!("product image upload error: {e}");
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to upload product image"}));
        }
        image_url = Some(s3_utils::build_public_url(
            &state.s3_public_base_url,
            &state.s3_bucket,
            &key,
        ));
    }

    let mut feature_image_urls = Vec::new();
    for (filename, bytes) in form.feature_images {
        let key = s3_utils::object_key("product-images", &filename);
        let content_type = s3_utils::content_type_for(&filename);
        if let Err(e) =
            s3_utils::upload_object(&state.s3_client, &state.s3_bucket, &key, bytes, content_type)
                .await
        {
            log::error!("feature image upload error: {e}");
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to upload feature image"}));
        }
        feature_image_urls.push(s3_utils::build_public_url(
            &state.s3_public_base_url,
            &state.s3_bucket,
            &key,
        ));
    }

    // The downloadable file stays private; only its key is stored and
    // downloads go through signed URLs.
    let mut file_key = None;
    if let Some((filename, bytes)) = form.file {
        let key = s3_utils::object_key("product-files", &filename);
        let content_type = s3_utils::content_type_for(&filename);
        if let Err(e) =
            s3_utils::upload_object(&state.s3_client, &state.s3_bucket, &key, bytes, content_type)
                .await
        {
            log::error!("product file upload error: {e}");
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to upload product file"}));
        }
        file_key = Some(key);
    }

    let new = db::NewProduct {
        title: form.title,
        description: form.description,
        price,
        category: form.category,
        tags: parse_tags(form.tags.as_deref()),
        image_url,
        feature_images: (!feature_image_urls.is_empty()).then_some(feature_image_urls),
        file_key,
    };

    match db::insert_product(&state.pool, &new).await {
        Ok(product) => HttpResponse::Ok().json(product),
        Err(e) => {
            log::error!("insert_product db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[put("/admin/products/{product_id}")]
pub async fn update_product(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateProductRequest>,
) -> impl Responder {
    if let Err(resp) = require_admin(&state.pool, *user_id).await {
        return resp;
    }

    if payload.title.trim().is_empty() || payload.price < 0.0 {
        return HttpResponse::BadRequest().json(json!({
            "error": "Please fill in all required fields"
        }));
    }

    match db::update_product(
        &state.pool,
        path.into_inner(),
        payload.title.trim(),
        payload.description.as_deref(),
        payload.price,
        payload.category.as_deref(),
        payload.tags.as_ref(),
    )
    .await
    {
        Ok(true) => HttpResponse::Ok().json(json!({"ok": true})),
        Ok(false) => HttpResponse::NotFound().json(json!({"error": "Product not found"})),
        Err(e) => {
            log::error!("update_product db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

#[put("/admin/products/{product_id}/active")]
pub async fn set_product_active(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    path: web::Path<Uuid>,
    payload: web::Json<SetActiveRequest>,
) -> impl Responder {
    if let Err(resp) = require_admin(&state.pool, *user_id).await {
        return resp;
    }

    match db::set_product_active(&state.pool, path.into_inner(), payload.is_active).await {
        Ok(true) => HttpResponse::Ok().json(json!({"ok": true})),
        Ok(false) => HttpResponse::NotFound().json(json!({"error": "Product not found"})),
        Err(e) => {
            log::error!("set_product_active db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[delete("/admin/products/{product_id}")]
pub async fn delete_product(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    path: web::Path<Uuid>,
) -> impl Responder {
    if let Err(resp) = require_admin(&state.pool, *user_id).await {
        return resp;
    }

    match db::delete_product(&state.pool, path.into_inner()).await {
        Ok(true) => HttpResponse::Ok().json(json!({"ok": true})),
        Ok(false) => HttpResponse::NotFound().json(json!({"error": "Product not found"})),
        Err(e) => {
            log::error!("delete_product db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Admin catalog view includes inactive products.
#[get("/admin/products")]
pub async fn list_all_products(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
) -> impl Responder {
    if let Err(resp) = require_admin(&state.pool, *user_id).await {
        return resp;
    }

    match db::list_all_products(&state.pool, None, None).await {
        Ok(products) => HttpResponse::Ok().json(products),
        Err(e) => {
            log::error!("list_all_products db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
