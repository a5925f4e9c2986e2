// src/lifecycle.rs
//
// Payment-request lifecycle: pending -> approved | rejected.
// A rejected request is re-enterable by submitting a new request for the
// same product; approved is terminal and grants download access.

use std::fmt;

use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::models::{ContactMethod, Notification, PaymentMethod, RequestStatus, Role};

/// A user-submitted claim of payment, validated before any write happens.
#[derive(Debug, Clone)]
pub struct Submission {
    pub payment_method: PaymentMethod,
    pub contact_method: ContactMethod,
    pub contact_value: String,
    pub transaction_id: Option<String>,
    pub screenshot_url: Option<String>,
    pub alternative_payment_details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    MissingContact,
    MissingProof,
    MissingPaymentDetails,
}

impl fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionError::MissingContact => {
                write!(f, "Please fill in all required fields")
            }
            SubmissionError::MissingProof => {
                write!(f, "Please provide either transaction ID or payment screenshot")
            }
            SubmissionError::MissingPaymentDetails => {
                write!(f, "Please explain your payment method")
            }
        }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(str::trim).map_or(true, str::is_empty)
}

/// The only business-rule validation beyond required-field checks:
/// the primary method needs at least one proof artifact, the free-text
/// alternative needs the explanation itself.
pub fn validate_submission(submission: &Submission) -> Result<(), SubmissionError> {
    if submission.contact_value.trim().is_empty() {
        return Err(SubmissionError::MissingContact);
    }

    match submission.payment_method {
        PaymentMethod::Nayapay => {
            if is_blank(submission.transaction_id.as_deref())
                && is_blank(submission.screenshot_url.as_deref())
            {
                return Err(SubmissionError::MissingProof);
            }
        }
        PaymentMethod::Custom => {
            if is_blank(submission.alternative_payment_details.as_deref()) {
                return Err(SubmissionError::MissingPaymentDetails);
            }
        }
    }

    Ok(())
}

/// Effective purchase state for a (user, product) pair, derived rather than
/// stored. Checked in order: free price, access grant, latest request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseState {
    /// Price is zero: downloadable by any authenticated user, no request needed.
    Free,
    /// An access grant exists: downloadable.
    Owned,
    /// A pending request blocks resubmission.
    Pending,
    /// The last request was rejected: resubmission is allowed.
    Rejected,
    /// No request on file: first submission is allowed.
    NotPurchased,
}

pub fn derive_purchase_state(
    price: f64,
    has_grant: bool,
    latest_request: Option<RequestStatus>,
) -> PurchaseState {
    if price == 0.0 {
        return PurchaseState::Free;
    }
    if has_grant {
        return PurchaseState::Owned;
    }
    match latest_request {
        Some(RequestStatus::Pending) => PurchaseState::Pending,
        Some(RequestStatus::Approved) => PurchaseState::Owned,
        Some(RequestStatus::Rejected) => PurchaseState::Rejected,
        None => PurchaseState::NotPurchased,
    }
}

/// Admins bypass the grant check entirely; everyone else needs a free price
/// or a grant.
pub fn can_download(role: Role, price: f64, has_grant: bool) -> bool {
    role.is_admin() || price == 0.0 || has_grant
}

/// The countdown is a UX pacing device, not access control. Admins skip it.
pub fn countdown_secs(role: Role, configured: u64) -> u64 {
    if role.is_admin() { 0 } else { configured }
}

pub struct ApproveOutcome {
    pub notification: Notification,
}

/// Approve transition: three sequential writes with no surrounding
/// transaction (status update, grant insert, notification insert). A failure
/// after the first write leaves the request approved without a grant or
/// notification; that gap is logged and surfaced, not compensated.
pub async fn approve(
    pool: &PgPool,
    request_id: Uuid,
    admin_notes: Option<&str>,
) -> Result<Option<ApproveOutcome>, sqlx::Error> {
    let Some(request) = db::get_payment_request(pool, request_id).await? else {
        return Ok(None);
    };

    let product_title = db::get_product_title(pool, request.product_id)
        .await?
        .unwrap_or_else(|| "your product".to_string());

    db::update_request_status(pool, request_id, RequestStatus::Approved, admin_notes).await?;

    if let Err(e) = db::insert_access_grant(pool, request.user_id, request.product_id).await {
        log::error!(
            "approve: status updated but grant insert failed request_id={request_id}: {e}"
        );
        return Err(e);
    }

    let message = format!(
        "Your payment for \"{product_title}\" has been approved. You can now download the product."
    );
    let notification = match db::insert_notification(
        pool,
        request.user_id,
        "Payment Approved!",
        &message,
        "success",
        Some(request_id),
    )
    .await
    {
        Ok(n) => n,
        Err(e) => {
            log::error!(
                "approve: grant created but notification insert failed request_id={request_id}: {e}"
            );
            return Err(e);
        }
    };

    Ok(Some(ApproveOutcome { notification }))
}

/// Reject transition: status update plus optional notes, nothing else.
/// No grant, and (asymmetrically with approval) no notification.
pub async fn reject(
    pool: &PgPool,
    request_id: Uuid,
    admin_notes: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let Some(_) = db::get_payment_request(pool, request_id).await? else {
        return Ok(false);
    };
    db::update_request_status(pool, request_id, RequestStatus::Rejected, admin_notes).await?;
    Ok(true)
}
