// src/export.rs
//
// Admin CSV exports: flat record shapes serialized with the csv crate and
// returned to the client as an attachment.

use serde::Serialize;

use crate::models::{PaymentRequestDetails, Product, Profile, Role};

fn to_csv<T: Serialize>(records: impl IntoIterator<Item = T>) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(std::io::Error::other(e.to_string())))
}

#[derive(Debug, Serialize)]
struct PaymentRequestRecord {
    id: String,
    user_email: String,
    user_name: String,
    product_title: String,
    product_price: f64,
    payment_method: &'static str,
    status: &'static str,
    transaction_id: String,
    contact_method: &'static str,
    contact_value: String,
    admin_notes: String,
    created_at: String,
    updated_at: String,
}

pub fn payment_requests_csv(rows: &[PaymentRequestDetails]) -> Result<Vec<u8>, csv::Error> {
    to_csv(rows.iter().map(|d| PaymentRequestRecord {
        id: d.request.id.to_string(),
        user_email: d.user_email.clone(),
        user_name: d.user_name.clone().unwrap_or_default(),
        product_title: d.product_title.clone(),
        product_price: d.product_price,
        payment_method: d.request.payment_method.as_str(),
        status: d.request.status.as_str(),
        transaction_id: d.request.transaction_id.clone().unwrap_or_default(),
        contact_method: d.request.contact_method.as_str(),
        contact_value: d.request.contact_value.clone(),
        admin_notes: d.request.admin_notes.clone().unwrap_or_default(),
        created_at: d.request.created_at.to_rfc3339(),
        updated_at: d.request.updated_at.to_rfc3339(),
    }))
}

#[derive(Debug, Serialize)]
struct UserRecord {
    id: String,
    email: String,
    full_name: String,
    whatsapp_number: String,
    telegram_id: String,
    role: &'static str,
    created_at: String,
}

pub fn users_csv(rows: &[(Profile, Role)]) -> Result<Vec<u8>, csv::Error> {
    to_csv(rows.iter().map(|(p, role)| UserRecord {
        id: p.id.to_string(),
        email: p.email.clone(),
        full_name: p.full_name.clone().unwrap_or_default(),
        whatsapp_number: p.whatsapp_number.clone().unwrap_or_default(),
        telegram_id: p.telegram_id.clone().unwrap_or_default(),
        role: role.as_str(),
        created_at: p.created_at.to_rfc3339(),
    }))
}

#[derive(Debug, Serialize)]
struct ProductRecord {
    id: String,
    title: String,
    description: String,
    price: f64,
    category: String,
    tags: String,
    is_active: bool,
    created_at: String,
}

pub fn products_csv(rows: &[Product]) -> Result<Vec<u8>, csv::Error> {
    to_csv(rows.iter().map(|p| ProductRecord {
        id: p.id.to_string(),
        title: p.title.clone(),
        description: p.description.clone().unwrap_or_default(),
        price: p.price,
        category: p.category.clone().unwrap_or_default(),
        tags: p.tags.as_deref().unwrap_or_default().join(";"),
        is_active: p.is_active,
        created_at: p.created_at.to_rfc3339(),
    }))
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub total_users: u64,
    pub total_products: u64,
    pub total_payments: u64,
    pub approved_payments: u64,
    pub pending_payments: u64,
    pub rejected_payments: u64,
    pub total_revenue: f64,
}

pub fn analytics_csv(summary: &AnalyticsSummary) -> Result<Vec<u8>, csv::Error> {
    to_csv(std::iter::once(summary))
}
