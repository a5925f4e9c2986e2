// src/api/payment_requests.rs

use actix_multipart::Multipart;
use actix_web::{get, post, put, web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::require_admin;
use crate::lifecycle::{self, PurchaseState, Submission};
use crate::models::{ContactMethod, PaymentMethod};
use crate::{db, s3_utils, ws, AppState};

#[derive(Default)]
struct SubmissionForm {
    payment_method: Option<String>,
    contact_method: Option<String>,
    contact_value: String,
    transaction_id: Option<String>,
    alternative_payment_details: Option<String>,
    screenshot: Option<(String, Vec<u8>)>,
}

async fn parse_submission_form(payload: &mut Multipart) -> SubmissionForm {
    let mut form = SubmissionForm::default();

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

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            if let Ok(data) = chunk {
                bytes.extend_from_slice(&data);
            }
        }

        match name.as_str() {
            "payment_method" => {
                form.payment_method = Some(String::from_utf8_lossy(&bytes).trim().to_string());
            }
            "contact_method" => {
                form.contact_method = Some(String::from_utf8_lossy(&bytes).trim().to_string());
            }
            "contact_value" => {
                form.contact_value = String::from_utf8_lossy(&bytes).trim().to_string();
            }
            "transaction_id" => {
                let t = String::from_utf8_lossy(&bytes).trim().to_string();
                form.transaction_id = (!t.is_empty()).then_some(t);
            }
            "alternative_payment_details" => {
                let t = String::from_utf8_lossy(&bytes).trim().to_string();
                form.alternative_payment_details = (!t.is_empty()).then_some(t);
            }
            "screenshot" => {
                if let Some(filename) = filename.filter(|_| !bytes.is_empty()) {
                    form.screenshot = Some((filename, bytes));
                }
            }
            _ => {}
        }
    }

    form
}

#[utoipa::path(
    tag = "payment-requests",
    responses(
        (status = 200, description = "Request submitted", body = crate::models::PaymentRequest),
        (status = 400, description = "Validation failed or submission not allowed"),
        (status = 404, description = "Product not found"),
    )
)]
#[post("/products/{product_id}/payment-requests")]
pub async fn submit_payment_request(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    path: web::Path<Uuid>,
    mut payload: Multipart,
) -> impl Responder {
    let product_id = path.into_inner();
    let user_id = *user_id;

    let product = match db::get_active_product(&state.pool, product_id).await {
        Ok(Some(p)) => p,
        Ok(None) => return HttpResponse::NotFound().json(json!({"error": "Product not found"})),
        Err(e) => {
            log::error!("submit_payment_request product lookup error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    // Free products never go through the review queue, and a grant or a
    // pending request blocks a new submission. Only rejected (or nothing)
    // falls through.
    let has_grant = match db::has_access(&state.pool, user_id, product_id).await {
        Ok(v) => v,
        Err(e) => {
            log::error!("submit_payment_request grant lookup error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };
    let latest = match db::latest_request_status(&state.pool, user_id, product_id).await {
        Ok(v) => v,
        Err(e) => {
            log::error!("submit_payment_request status lookup error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    match lifecycle::derive_purchase_state(product.price, has_grant, latest) {
        PurchaseState::Free => {
            return HttpResponse::BadRequest().json(json!({
                "error": "This product is free and does not require payment"
            }));
        }
        PurchaseState::Owned => {
            return HttpResponse::BadRequest().json(json!({
                "error": "You already own this product"
            }));
        }
        PurchaseState::Pending => {
            return HttpResponse::BadRequest().json(json!({
                "error": "You already have a pending request for this product"
            }));
        }
        PurchaseState::Rejected | PurchaseState::NotPurchased => {}
    }

    let form = parse_submission_form(&mut payload).await;

    let Some(payment_method) = form.payment_method.as_deref().and_then(PaymentMethod::parse)
    else {
        return HttpResponse::BadRequest().json(json!({"error": "Invalid payment method"}));
    };
    let Some(contact_method) = form.contact_method.as_deref().and_then(ContactMethod::parse)
    else {
        return HttpResponse::BadRequest().json(json!({"error": "Invalid contact method"}));
    };

    // Validate before uploading anything; the screenshot filename stands in
    // for the URL so an attached file counts as proof.
    let mut submission = Submission {
        payment_method,
        contact_method,
        contact_value: form.contact_value,
        transaction_id: form.transaction_id,
        screenshot_url: form.screenshot.as_ref().map(|(name, _)| name.clone()),
        alternative_payment_details: form.alternative_payment_details,
    };

    if let Err(e) = lifecycle::validate_submission(&submission) {
        return HttpResponse::BadRequest().json(json!({"error": e.to_string()}));
    }

    if let Some((filename, bytes)) = form.screenshot {
        let key = s3_utils::object_key("payment-screenshots", &filename);
        let content_type = s3_utils::content_type_for(&filename);
        if let Err(e) =
            s3_utils::upload_object(&state.s3_client, &state.s3_bucket, &key, bytes, content_type)
                .await
        {
            log::error!("screenshot upload error: {e}");
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to upload screenshot"}));
        }
        submission.screenshot_url = Some(s3_utils::build_public_url(
            &state.s3_public_base_url,
            &state.s3_bucket,
            &key,
        ));
    }

    match db::insert_payment_request(&state.pool, user_id, product_id, &submission).await {
        Ok(request) => HttpResponse::Ok().json(request),
        Err(e) => {
            log::error!("insert_payment_request db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[utoipa::path(
    tag = "payment-requests",
    responses(
        (status = 200, description = "Own payment requests, newest first",
         body = [crate::models::PaymentRequest]),
    )
)]
#[get("/payment-requests")]
pub async fn list_my_requests(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
) -> impl Responder {
    match db::list_requests_for_user(&state.pool, *user_id).await {
        Ok(requests) => HttpResponse::Ok().json(requests),
        Err(e) => {
            log::error!("list_my_requests db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[utoipa::path(
    tag = "payment-requests",
    responses(
        (status = 200, description = "Purchase state for the product"),
        (status = 404, description = "Product not found"),
    )
)]
#[get("/products/{product_id}/purchase-state")]
pub async fn purchase_state(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    path: web::Path<Uuid>,
) -> impl Responder {
    let product_id = path.into_inner();
    let user_id = *user_id;

    let product = match db::get_active_product(&state.pool, product_id).await {
        Ok(Some(p)) => p,
        Ok(None) => return HttpResponse::NotFound().json(json!({"error": "Product not found"})),
        Err(e) => {
            log::error!("purchase_state product lookup error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let has_grant = match db::has_access(&state.pool, user_id, product_id).await {
        Ok(v) => v,
        Err(e) => {
            log::error!("purchase_state grant lookup error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };
    let latest = match db::latest_request_status(&state.pool, user_id, product_id).await {
        Ok(v) => v,
        Err(e) => {
            log::error!("purchase_state status lookup error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let state_value = lifecycle::derive_purchase_state(product.price, has_grant, latest);
    HttpResponse::Ok().json(json!({"state": state_value}))
}

#[derive(Debug, Deserialize)]
pub struct RequestRangeQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[get("/admin/payment-requests")]
pub async fn list_all_requests(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    query: web::Query<RequestRangeQuery>,
) -> impl Responder {
    if let Err(resp) = require_admin(&state.pool, *user_id).await {
        return resp;
    }

    match db::list_request_details(&state.pool, query.from, query.to).await {
        Ok(details) => HttpResponse::Ok().json(details),
        Err(e) => {
            log::error!("list_all_requests db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub admin_notes: Option<String>,
}

#[put("/admin/payment-requests/{request_id}/approve")]
pub async fn approve_request(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    path: web::Path<Uuid>,
    payload: web::Json<ReviewRequest>,
) -> impl Responder {
    if let Err(resp) = require_admin(&state.pool, *user_id).await {
        return resp;
    }

    let request_id = path.into_inner();
    match lifecycle::approve(&state.pool, request_id, payload.admin_notes.as_deref()).await {
        Ok(Some(outcome)) => {
            let unread =
                match db::unread_notification_count(&state.pool, outcome.notification.user_id)
                    .await
                {
                    Ok(count) => count,
                    Err(e) => {
                        log::error!("approve_request unread count error: {e}");
                        0
                    }
                };
            ws::push_notification(&state.ws_hub, outcome.notification, unread);
            HttpResponse::Ok().json(json!({"ok": true}))
        }
        Ok(None) => HttpResponse::NotFound().json(json!({"error": "Request not found"})),
        Err(e) => {
            log::error!("approve_request error request_id={request_id}: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[put("/admin/payment-requests/{request_id}/reject")]
pub async fn reject_request(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    path: web::Path<Uuid>,
    payload: web::Json<ReviewRequest>,
) -> impl Responder {
    if let Err(resp) = require_admin(&state.pool, *user_id).await {
        return resp;
    }

    let request_id = path.into_inner();
    match lifecycle::reject(&state.pool, request_id, payload.admin_notes.as_deref()).await {
        Ok(true) => HttpResponse::Ok().json(json!({"ok": true})),
        Ok(false) => HttpResponse::NotFound().json(json!({"error": "Request not found"})),
        Err(e) => {
            log::error!("reject_request error request_id={request_id}: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
