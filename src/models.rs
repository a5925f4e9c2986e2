// src/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Primary supported method; requires a transaction id or a screenshot.
    Nayapay,
    /// Free-text alternative; requires an explanation of how payment was made.
    Custom,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Nayapay => "nayapay",
            PaymentMethod::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "nayapay" => Some(PaymentMethod::Nayapay),
            "custom" => Some(PaymentMethod::Custom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContactMethod {
    Whatsapp,
    Telegram,
}

impl ContactMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ContactMethod::Whatsapp => "whatsapp",
            ContactMethod::Telegram => "telegram",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "whatsapp" => Some(ContactMethod::Whatsapp),
            "telegram" => Some(ContactMethod::Telegram),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            "super_admin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// 0 means the product is free and bypasses the payment-request flow.
    pub price: f64,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub feature_images: Option<Vec<String>>,
    /// Object-store key of the downloadable file; never exposed to clients.
    #[serde(skip_serializing)]
    pub file_key: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn is_free(&self) -> bool {
        self.price == 0.0
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: i32,
    pub email: String,
    pub full_name: Option<String>,
    pub whatsapp_number: Option<String>,
    pub telegram_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentRequest {
    pub id: Uuid,
    pub user_id: i32,
    pub product_id: Uuid,
    pub status: RequestStatus,
    pub payment_method: PaymentMethod,
    pub contact_method: ContactMethod,
    pub contact_value: String,
    pub transaction_id: Option<String>,
    pub screenshot_url: Option<String>,
    pub alternative_payment_details: Option<String>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin-queue view of a request, joined with product and requester details.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentRequestDetails {
    #[serde(flatten)]
    pub request: PaymentRequest,
    pub product_title: String,
    pub product_price: f64,
    pub user_email: String,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: i32,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub related_request_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
