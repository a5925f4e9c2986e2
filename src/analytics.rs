// src/analytics.rs
//
// Client-side-style aggregation: rows are fetched wholesale and grouped in
// memory. Correctness depends on dataset size remaining small; this is
// deliberately not a query engine.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{PaymentMethod, RequestStatus};

fn month_label(at: DateTime<Utc>) -> String {
    at.format("%b %Y").to_string()
}

fn month_key(at: DateTime<Utc>) -> (i32, u32) {
    (at.year(), at.month())
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: f64,
}

/// Revenue of approved requests grouped by calendar month, oldest first.
pub fn monthly_revenue(rows: &[(DateTime<Utc>, f64)]) -> Vec<MonthlyRevenue> {
    let mut buckets: BTreeMap<(i32, u32), (String, f64)> = BTreeMap::new();
    for &(at, price) in rows {
        let entry = buckets
            .entry(month_key(at))
            .or_insert_with(|| (month_label(at), 0.0));
        entry.1 += price;
    }
    buckets
        .into_values()
        .map(|(month, revenue)| MonthlyRevenue { month, revenue })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PaymentMethodStats {
    pub method: String,
    pub total: u64,
    pub approved: u64,
    pub pending: u64,
    pub rejected: u64,
}

/// Per-method totals and status breakdown across all requests.
pub fn payment_method_stats(rows: &[(PaymentMethod, RequestStatus)]) -> Vec<PaymentMethodStats> {
    let mut stats: BTreeMap<&'static str, PaymentMethodStats> = BTreeMap::new();
    for &(method, status) in rows {
        let label = match method {
            PaymentMethod::Nayapay => "Nayapay",
            PaymentMethod::Custom => "Custom",
        };
        let entry = stats.entry(label).or_insert_with(|| PaymentMethodStats {
            method: label.to_string(),
            total: 0,
            approved: 0,
            pending: 0,
            rejected: 0,
        });
        entry.total += 1;
        match status {
            RequestStatus::Approved => entry.approved += 1,
            RequestStatus::Pending => entry.pending += 1,
            RequestStatus::Rejected => entry.rejected += 1,
        }
    }
    stats.into_values().collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MonthlyUsers {
    pub month: String,
    pub users: u64,
}

/// Signup counts grouped by calendar month, oldest first.
pub fn user_growth(signup_dates: &[DateTime<Utc>]) -> Vec<MonthlyUsers> {
    let mut buckets: BTreeMap<(i32, u32), (String, u64)> = BTreeMap::new();
    for &at in signup_dates {
        let entry = buckets
            .entry(month_key(at))
            .or_insert_with(|| (month_label(at), 0));
        entry.1 += 1;
    }
    buckets
        .into_values()
        .map(|(month, users)| MonthlyUsers { month, users })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ProductPerformance {
    pub title: String,
    pub sales: u64,
    pub revenue: f64,
}

/// Top products by revenue from approved requests, capped at ten.
pub fn product_performance(sales: &[(Uuid, String, f64)]) -> Vec<ProductPerformance> {
    let mut stats: BTreeMap<Uuid, ProductPerformance> = BTreeMap::new();
    for (product_id, title, price) in sales {
        let entry = stats.entry(*product_id).or_insert_with(|| ProductPerformance {
            title: title.clone(),
            sales: 0,
            revenue: 0.0,
        });
        entry.sales += 1;
        entry.revenue += price;
    }
    let mut ranked: Vec<ProductPerformance> = stats.into_values().collect();
    ranked.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    ranked.truncate(10);
    ranked
}
