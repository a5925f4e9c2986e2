// src/db.rs
//
// All rows cross into the application through the typed mappers below;
// handlers never touch raw rows.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    ContactMethod, Notification, PaymentMethod, PaymentRequest, PaymentRequestDetails, Product,
    Profile, RequestStatus, Role,
};

fn map_product(r: &PgRow) -> Product {
    Product {
        id: r.get("id"),
        title: r.get("title"),
        description: r.get("description"),
        price: r.get("price"),
        category: r.get("category"),
        tags: r.get("tags"),
        image_url: r.get("image_url"),
        feature_images: r.get("feature_images"),
        file_key: r.get("file_key"),
        is_active: r.get("is_active"),
        created_at: r.get("created_at"),
    }
}

fn map_request(r: &PgRow) -> PaymentRequest {
    // CHECK constraints keep these columns inside the enum domains.
    let status: String = r.get("status");
    let payment_method: String = r.get("payment_method");
    let contact_method: String = r.get("contact_method");
    PaymentRequest {
        id: r.get("id"),
        user_id: r.get("user_id"),
        product_id: r.get("product_id"),
        status: RequestStatus::parse(&status).unwrap_or(RequestStatus::Pending),
        payment_method: PaymentMethod::parse(&payment_method).unwrap_or(PaymentMethod::Custom),
        contact_method: ContactMethod::parse(&contact_method).unwrap_or(ContactMethod::Whatsapp),
        contact_value: r.get("contact_value"),
        transaction_id: r.get("transaction_id"),
        screenshot_url: r.get("screenshot_url"),
        alternative_payment_details: r.get("alternative_payment_details"),
        admin_notes: r.get("admin_notes"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

fn map_notification(r: &PgRow) -> Notification {
    Notification {
        id: r.get("id"),
        user_id: r.get("user_id"),
        title: r.get("title"),
        message: r.get("message"),
        kind: r.get("type"),
        related_request_id: r.get("related_request_id"),
        is_read: r.get("is_read"),
        created_at: r.get("created_at"),
    }
}

fn map_profile(r: &PgRow) -> Profile {
    Profile {
        id: r.get("id"),
        user_id: r.get("user_id"),
        email: r.get("email"),
        full_name: r.get("full_name"),
        whatsapp_number: r.get("whatsapp_number"),
        telegram_id: r.get("telegram_id"),
        created_at: r.get("created_at"),
    }
}

// ---- users & profiles ----

pub async fn create_user(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<i32, sqlx::Error> {
    let row = sqlx::query(
        r#"INSERT INTO users (email, password_hash)
           VALUES ($1, $2)
           RETURNING id"#,
    )
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;
    Ok(row.get("id"))
}

pub async fn get_user_auth(
    pool: &PgPool,
    email: &str,
) -> Result<Option<(i32, String)>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT id, password_hash FROM users WHERE email = $1"#)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| (r.get("id"), r.get("password_hash"))))
}

pub async fn create_profile(
    pool: &PgPool,
    user_id: i32,
    email: &str,
    full_name: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO profiles (user_id, email, full_name)
           VALUES ($1, $2, $3)"#,
    )
    .bind(user_id)
    .bind(email)
    .bind(full_name)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_profile(pool: &PgPool, user_id: i32) -> Result<Option<Profile>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT id, user_id, email, full_name, whatsapp_number, telegram_id, created_at
           FROM profiles
           WHERE user_id = $1"#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.as_ref().map(map_profile))
}

pub async fn update_profile(
    pool: &PgPool,
    user_id: i32,
    full_name: Option<&str>,
    whatsapp_number: Option<&str>,
    telegram_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE profiles
           SET full_name = $2, whatsapp_number = $3, telegram_id = $4, updated_at = NOW()
           WHERE user_id = $1"#,
    )
    .bind(user_id)
    .bind(full_name)
    .bind(whatsapp_number)
    .bind(telegram_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_profiles_with_roles(
    pool: &PgPool,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Vec<(Profile, Role)>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT p.id, p.user_id, p.email, p.full_name, p.whatsapp_number, p.telegram_id,
                  p.created_at, r.role
           FROM profiles p
           LEFT JOIN user_roles r ON r.user_id = p.user_id
           WHERE ($1::timestamptz IS NULL OR p.created_at >= $1)
             AND ($2::timestamptz IS NULL OR p.created_at <= $2)
           ORDER BY p.created_at DESC"#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| {
            let role: Option<String> = r.get("role");
            let role = role.as_deref().and_then(Role::parse).unwrap_or(Role::User);
            (map_profile(&r), role)
        })
        .collect())
}

// ---- roles ----

/// Absence of a row means the plain user role.
pub async fn get_role(pool: &PgPool, user_id: i32) -> Result<Role, sqlx::Error> {
    let row = sqlx::query(r#"SELECT role FROM user_roles WHERE user_id = $1"#)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row
        .map(|r| r.get::<String, _>("role"))
        .as_deref()
        .and_then(Role::parse)
        .unwrap_or(Role::User))
}

pub async fn set_role(pool: &PgPool, user_id: i32, role: Role) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO user_roles (user_id, role)
           VALUES ($1, $2)
           ON CONFLICT (user_id) DO UPDATE SET role = EXCLUDED.role"#,
    )
    .bind(user_id)
    .bind(role.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

// ---- products ----

const PRODUCT_COLUMNS: &str = "id, title, description, price, category, tags, image_url, \
                               feature_images, file_key, is_active, created_at";

pub struct NewProduct {
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub feature_images: Option<Vec<String>>,
    pub file_key: Option<String>,
}

pub async fn insert_product(pool: &PgPool, new: &NewProduct) -> Result<Product, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"INSERT INTO products
               (title, description, price, category, tags, image_url, feature_images, file_key)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
           RETURNING {PRODUCT_COLUMNS}"#,
    ))
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.price)
    .bind(&new.category)
    .bind(&new.tags)
    .bind(&new.image_url)
    .bind(&new.feature_images)
    .bind(&new.file_key)
    .fetch_one(pool)
    .await?;
    Ok(map_product(&row))
}

pub async fn update_product(
    pool: &PgPool,
    id: Uuid,
    title: &str,
    description: Option<&str>,
    price: f64,
    category: Option<&str>,
    tags: Option<&Vec<String>>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE products
           SET title = $2, description = $3, price = $4, category = $5, tags = $6,
               updated_at = NOW()
           WHERE id = $1"#,
    )
    .bind(id)
    .bind(title)
    .bind(description)
    .bind(price)
    .bind(category)
    .bind(tags)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_product_active(
    pool: &PgPool,
    id: Uuid,
    is_active: bool,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query(r#"UPDATE products SET is_active = $2, updated_at = NOW() WHERE id = $1"#)
            .bind(id)
            .bind(is_active)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_product(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM products WHERE id = $1"#)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_active_products(
    pool: &PgPool,
    category: Option<&str>,
    search: Option<&str>,
) -> Result<Vec<Product>, sqlx::Error> {
    let search_pattern = search.map(|s| format!("%{s}%"));
    let rows = sqlx::query(&format!(
        r#"SELECT {PRODUCT_COLUMNS}
           FROM products
           WHERE is_active = TRUE
             AND ($1::text IS NULL OR category = $1)
             AND ($2::text IS NULL OR title ILIKE $2 OR description ILIKE $2)
           ORDER BY created_at DESC"#,
    ))
    .bind(category)
    .bind(search_pattern)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(map_product).collect())
}

pub async fn list_all_products(
    pool: &PgPool,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Vec<Product>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"SELECT {PRODUCT_COLUMNS}
           FROM products
           WHERE ($1::timestamptz IS NULL OR created_at >= $1)
             AND ($2::timestamptz IS NULL OR created_at <= $2)
           ORDER BY created_at DESC"#,
    ))
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(map_product).collect())
}

pub async fn get_product(pool: &PgPool, id: Uuid) -> Result<Option<Product>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"#,
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.as_ref().map(map_product))
}

pub async fn get_active_product(pool: &PgPool, id: Uuid) -> Result<Option<Product>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND is_active = TRUE"#,
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.as_ref().map(map_product))
}

pub async fn get_product_title(pool: &PgPool, id: Uuid) -> Result<Option<String>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT title FROM products WHERE id = $1"#)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get("title")))
}

// ---- payment requests ----

const REQUEST_COLUMNS: &str = "id, user_id, product_id, status, payment_method, contact_method, \
                               contact_value, transaction_id, screenshot_url, \
                               alternative_payment_details, admin_notes, created_at, updated_at";

pub async fn insert_payment_request(
    pool: &PgPool,
    user_id: i32,
    product_id: Uuid,
    submission: &crate::lifecycle::Submission,
) -> Result<PaymentRequest, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"INSERT INTO payment_requests
               (user_id, product_id, payment_method, contact_method, contact_value,
                transaction_id, screenshot_url, alternative_payment_details, status)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending')
           RETURNING {REQUEST_COLUMNS}"#,
    ))
    .bind(user_id)
    .bind(product_id)
    .bind(submission.payment_method.as_str())
    .bind(submission.contact_method.as_str())
    .bind(&submission.contact_value)
    .bind(&submission.transaction_id)
    .bind(&submission.screenshot_url)
    .bind(&submission.alternative_payment_details)
    .fetch_one(pool)
    .await?;
    Ok(map_request(&row))
}

pub async fn get_payment_request(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<PaymentRequest>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"SELECT {REQUEST_COLUMNS} FROM payment_requests WHERE id = $1"#,
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.as_ref().map(map_request))
}

pub async fn list_requests_for_user(
    pool: &PgPool,
    user_id: i32,
) -> Result<Vec<PaymentRequest>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"SELECT {REQUEST_COLUMNS}
           FROM payment_requests
           WHERE user_id = $1
           ORDER BY created_at DESC"#,
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(map_request).collect())
}

pub async fn latest_request_status(
    pool: &PgPool,
    user_id: i32,
    product_id: Uuid,
) -> Result<Option<RequestStatus>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT status
           FROM payment_requests
           WHERE user_id = $1 AND product_id = $2
           ORDER BY created_at DESC
           LIMIT 1"#,
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_optional(pool)
    .await?;
    Ok(row
        .map(|r| r.get::<String, _>("status"))
        .as_deref()
        .and_then(RequestStatus::parse))
}

pub async fn list_request_details(
    pool: &PgPool,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Vec<PaymentRequestDetails>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT pr.id, pr.user_id, pr.product_id, pr.status, pr.payment_method,
                  pr.contact_method, pr.contact_value, pr.transaction_id, pr.screenshot_url,
                  pr.alternative_payment_details, pr.admin_notes, pr.created_at, pr.updated_at,
                  p.title AS product_title, p.price AS product_price,
                  prof.email AS user_email, prof.full_name AS user_name
           FROM payment_requests pr
           JOIN products p ON p.id = pr.product_id
           JOIN profiles prof ON prof.user_id = pr.user_id
           WHERE ($1::timestamptz IS NULL OR pr.created_at >= $1)
             AND ($2::timestamptz IS NULL OR pr.created_at <= $2)
           ORDER BY pr.created_at DESC"#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| PaymentRequestDetails {
            request: map_request(r),
            product_title: r.get("product_title"),
            product_price: r.get("product_price"),
            user_email: r.get("user_email"),
            user_name: r.get("user_name"),
        })
        .collect())
}

pub async fn update_request_status(
    pool: &PgPool,
    id: Uuid,
    status: RequestStatus,
    admin_notes: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"UPDATE payment_requests
           SET status = $2, admin_notes = COALESCE($3, admin_notes), updated_at = NOW()
           WHERE id = $1"#,
    )
    .bind(id)
    .bind(status.as_str())
    .bind(admin_notes)
    .execute(pool)
    .await?;
    Ok(())
}

// ---- access grants ----

/// Append-only; re-approval of the same pair is a no-op.
pub async fn insert_access_grant(
    pool: &PgPool,
    user_id: i32,
    product_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO user_product_access (user_id, product_id)
           VALUES ($1, $2)
           ON CONFLICT (user_id, product_id) DO NOTHING"#,
    )
    .bind(user_id)
    .bind(product_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn has_access(
    pool: &PgPool,
    user_id: i32,
    product_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT 1 AS one FROM user_product_access WHERE user_id = $1 AND product_id = $2"#,
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

// ---- notifications ----

pub async fn insert_notification(
    pool: &PgPool,
    user_id: i32,
    title: &str,
    message: &str,
    kind: &str,
    related_request_id: Option<Uuid>,
) -> Result<Notification, sqlx::Error> {
    let row = sqlx::query(
        r#"INSERT INTO notifications (user_id, title, message, type, related_request_id)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING id, user_id, title, message, type, related_request_id, is_read, created_at"#,
    )
    .bind(user_id)
    .bind(title)
    .bind(message)
    .bind(kind)
    .bind(related_request_id)
    .fetch_one(pool)
    .await?;
    Ok(map_notification(&row))
}

pub async fn list_notifications(
    pool: &PgPool,
    user_id: i32,
) -> Result<Vec<Notification>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT id, user_id, title, message, type, related_request_id, is_read, created_at
           FROM notifications
           WHERE user_id = $1
           ORDER BY created_at DESC"#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(map_notification).collect())
}

pub async fn unread_notification_count(pool: &PgPool, user_id: i32) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT COUNT(*) AS count FROM notifications WHERE user_id = $1 AND is_read = FALSE"#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(row.get("count"))
}

pub async fn mark_notification_read(
    pool: &PgPool,
    user_id: i32,
    id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query(r#"UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2"#)
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_all_notifications_read(
    pool: &PgPool,
    user_id: i32,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(r#"UPDATE notifications SET is_read = TRUE WHERE user_id = $1"#)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// ---- admin aggregates (wholesale fetches; grouping happens in analytics.rs) ----

pub async fn count_profiles(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(r#"SELECT COUNT(*) AS count FROM profiles"#)
        .fetch_one(pool)
        .await?;
    Ok(row.get("count"))
}

pub async fn count_products(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(r#"SELECT COUNT(*) AS count FROM products"#)
        .fetch_one(pool)
        .await?;
    Ok(row.get("count"))
}

pub async fn count_requests_by_status(
    pool: &PgPool,
    status: RequestStatus,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(r#"SELECT COUNT(*) AS count FROM payment_requests WHERE status = $1"#)
        .bind(status.as_str())
        .fetch_one(pool)
        .await?;
    Ok(row.get("count"))
}

/// (created_at, product price) for every approved request.
pub async fn approved_revenue_rows(
    pool: &PgPool,
) -> Result<Vec<(DateTime<Utc>, f64)>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT pr.created_at, p.price
           FROM payment_requests pr
           JOIN products p ON p.id = pr.product_id
           WHERE pr.status = 'approved'"#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| (r.get("created_at"), r.get("price")))
        .collect())
}

pub async fn request_method_status_rows(
    pool: &PgPool,
) -> Result<Vec<(PaymentMethod, RequestStatus)>, sqlx::Error> {
    let rows = sqlx::query(r#"SELECT payment_method, status FROM payment_requests"#)
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|r| {
            let method: String = r.get("payment_method");
            let status: String = r.get("status");
            Some((PaymentMethod::parse(&method)?, RequestStatus::parse(&status)?))
        })
        .collect())
}

pub async fn profile_signup_dates(pool: &PgPool) -> Result<Vec<DateTime<Utc>>, sqlx::Error> {
    let rows = sqlx::query(r#"SELECT created_at FROM profiles"#)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|r| r.get("created_at")).collect())
}

/// (product id, title, price) for every approved request, one row per sale.
pub async fn approved_sales_rows(
    pool: &PgPool,
) -> Result<Vec<(Uuid, String, f64)>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT pr.product_id, p.title, p.price
           FROM payment_requests pr
           JOIN products p ON p.id = pr.product_id
           WHERE pr.status = 'approved'"#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| (r.get("product_id"), r.get("title"), r.get("price")))
        .collect())
}
