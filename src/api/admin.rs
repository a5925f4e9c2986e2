// src/api/admin.rs
//
// Back-office dashboard, analytics and CSV exports. Aggregation happens in
// memory over wholesale fetches (see analytics.rs).

use actix_web::{get, put, web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::api::require_admin;
use crate::models::{RequestStatus, Role};
use crate::{analytics, db, export, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_products: i64,
    pub pending_requests: i64,
    pub approved_requests: i64,
    pub rejected_requests: i64,
    pub total_revenue: f64,
    pub today_revenue: f64,
}

#[utoipa::path(
    tag = "admin",
    responses(
        (status = 200, description = "Dashboard counters", body = DashboardStats),
        (status = 403, description = "Admin role required"),
    )
)]
#[get("/admin/stats")]
pub async fn dashboard_stats(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
) -> impl Responder {
    if let Err(resp) = require_admin(&state.pool, *user_id).await {
        return resp;
    }

    let stats = async {
        let total_users = db::count_profiles(&state.pool).await?;
        let total_products = db::count_products(&state.pool).await?;
        let pending =
            db::count_requests_by_status(&state.pool, RequestStatus::Pending).await?;
        let approved =
            db::count_requests_by_status(&state.pool, RequestStatus::Approved).await?;
        let rejected =
            db::count_requests_by_status(&state.pool, RequestStatus::Rejected).await?;
        let revenue_rows = db::approved_revenue_rows(&state.pool).await?;

        let today = Utc::now().date_naive();
        let total_revenue: f64 = revenue_rows.iter().map(|(_, price)| price).sum();
        let today_revenue: f64 = revenue_rows
            .iter()
            .filter(|(at, _)| at.date_naive() == today)
            .map(|(_, price)| price)
            .sum();

        Ok::<_, sqlx::Error>(DashboardStats {
            total_users,
            total_products,
            pending_requests: pending,
            approved_requests: approved,
            rejected_requests: rejected,
            total_revenue,
            today_revenue,
        })
    }
    .await;

    match stats {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => {
            log::error!("dashboard_stats db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyticsResponse {
    pub monthly_revenue: Vec<analytics::MonthlyRevenue>,
    pub payment_methods: Vec<analytics::PaymentMethodStats>,
    pub user_growth: Vec<analytics::MonthlyUsers>,
    pub top_products: Vec<analytics::ProductPerformance>,
}

#[utoipa::path(
    tag = "admin",
    responses(
        (status = 200, description = "Aggregated analytics", body = AnalyticsResponse),
        (status = 403, description = "Admin role required"),
    )
)]
#[get("/admin/analytics")]
pub async fn analytics_report(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
) -> impl Responder {
    if let Err(resp) = require_admin(&state.pool, *user_id).await {
        return resp;
    }

    let report = async {
        let revenue_rows = db::approved_revenue_rows(&state.pool).await?;
        let method_rows = db::request_method_status_rows(&state.pool).await?;
        let signups = db::profile_signup_dates(&state.pool).await?;
        let sales = db::approved_sales_rows(&state.pool).await?;
        Ok::<_, sqlx::Error>(AnalyticsResponse {
            monthly_revenue: analytics::monthly_revenue(&revenue_rows),
            payment_methods: analytics::payment_method_stats(&method_rows),
            user_growth: analytics::user_growth(&signups),
            top_products: analytics::product_performance(&sales),
        })
    }
    .await;

    match report {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            log::error!("analytics_report db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserWithRole {
    #[serde(flatten)]
    pub profile: crate::models::Profile,
    pub role: &'static str,
}

#[get("/admin/users")]
pub async fn list_users(state: web::Data<AppState>, user_id: web::ReqData<i32>) -> impl Responder {
    if let Err(resp) = require_admin(&state.pool, *user_id).await {
        return resp;
    }

    match db::list_profiles_with_roles(&state.pool, None, None).await {
        Ok(rows) => HttpResponse::Ok().json(
            rows.into_iter()
                .map(|(profile, role)| UserWithRole {
                    profile,
                    role: role.as_str(),
                })
                .collect::<Vec<_>>(),
        ),
        Err(e) => {
            log::error!("list_users db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRoleRequest {
    pub role: String,
}

/// Only a super admin may hand out roles; regular admins review payments.
#[put("/admin/users/{target_id}/role")]
pub async fn set_user_role(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    path: web::Path<i32>,
    payload: web::Json<SetRoleRequest>,
) -> impl Responder {
    let caller_role = match require_admin(&state.pool, *user_id).await {
        Ok(role) => role,
        Err(resp) => return resp,
    };
    if caller_role != Role::SuperAdmin {
        return HttpResponse::Forbidden().json(json!({"error": "super admin role required"}));
    }

    let Some(role) = Role::parse(&payload.role) else {
        return HttpResponse::BadRequest().json(json!({"error": "Invalid role"}));
    };

    match db::set_role(&state.pool, path.into_inner(), role).await {
        Ok(()) => HttpResponse::Ok().json(json!({"ok": true})),
        Err(e) => {
            log::error!("set_user_role db error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub kind: String,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[get("/admin/export")]
pub async fn export_csv(
    state: web::Data<AppState>,
    user_id: web::ReqData<i32>,
    query: web::Query<ExportQuery>,
) -> impl Responder {
    if let Err(resp) = require_admin(&state.pool, *user_id).await {
        return resp;
    }

    let result = match query.kind.as_str() {
        "payments" => match db::list_request_details(&state.pool, query.from, query.to).await {
            Ok(rows) => export::payment_requests_csv(&rows).map(|b| ("payment-requests", b)),
            Err(e) => return db_error("export payments", e),
        },
        "users" => match db::list_profiles_with_roles(&state.pool, query.from, query.to).await {
            Ok(rows) => export::users_csv(&rows).map(|b| ("users", b)),
            Err(e) => return db_error("export users", e),
        },
        "products" => match db::list_all_products(&state.pool, query.from, query.to).await {
            Ok(rows) => export::products_csv(&rows).map(|b| ("products", b)),
            Err(e) => return db_error("export products", e),
        },
        "analytics" => match analytics_summary(&state).await {
            Ok(summary) => export::analytics_csv(&summary).map(|b| ("analytics", b)),
            Err(e) => return db_error("export analytics", e),
        },
        _ => {
            return HttpResponse::BadRequest().json(json!({"error": "Unknown export kind"}));
        }
    };

    match result {
        Ok((stem, bytes)) => {
            let filename = format!("{stem}-{}.csv", Utc::now().format("%Y-%m-%d"));
            HttpResponse::Ok()
                .content_type("text/csv")
                .insert_header((
                    actix_web::http::header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                ))
                .body(bytes)
        }
        Err(e) => {
            log::error!("csv serialization error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn analytics_summary(state: &AppState) -> Result<export::AnalyticsSummary, sqlx::Error> {
    let total_users = db::count_profiles(&state.pool).await? as u64;
    let total_products = db::count_products(&state.pool).await? as u64;
    let approved = db::count_requests_by_status(&state.pool, RequestStatus::Approved).await? as u64;
    let pending = db::count_requests_by_status(&state.pool, RequestStatus::Pending).await? as u64;
    let rejected = db::count_requests_by_status(&state.pool, RequestStatus::Rejected).await? as u64;
    let total_revenue: f64 = db::approved_revenue_rows(&state.pool)
        .await?
        .iter()
        .map(|(_, price)| price)
        .sum();

    Ok(export::AnalyticsSummary {
        total_users,
        total_products,
        total_payments: approved + pending + rejected,
        approved_payments: approved,
        pending_payments: pending,
        rejected_payments: rejected,
        total_revenue,
    })
}

fn db_error(context: &str, e: sqlx::Error) -> HttpResponse {
    log::error!("{context} db error: {e}");
    HttpResponse::InternalServerError().finish()
}
