use actix_web::test::TestRequest;
use actix_web::{test, web, App};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use neon_store::api::admin::dashboard_stats;
use neon_store::api::auth::{generate_jwt, JwtMiddleware};
use neon_store::api::downloads::download_product;
use neon_store::api::payment_requests::{purchase_state, submit_payment_request};
use neon_store::lifecycle::{self, Submission};
use neon_store::models::{ContactMethod, PaymentMethod, RequestStatus, Role};
use neon_store::db;

mod support;

async fn seed_user(pool: &PgPool, prefix: &str) -> i32 {
    let email = format!("{prefix}_{}@example.com", Uuid::new_v4());
    let user_id: i32 = sqlx::query(
        r#"INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING id"#,
    )
    .bind(&email)
    .bind("test-hash")
    .fetch_one(pool)
    .await
    .expect("insert user")
    .get("id");
    db::create_profile(pool, user_id, &email, Some("Test User"))
        .await
        .expect("insert profile");
    user_id
}

async fn seed_product(pool: &PgPool, title: &str, price: f64) -> Uuid {
    let new = db::NewProduct {
        title: title.to_string(),
        description: Some("Test description".to_string()),
        price,
        category: Some("templates".to_string()),
        tags: None,
        image_url: None,
        feature_images: None,
        file_key: Some(format!("product-files/{}.zip", Uuid::new_v4())),
    };
    db::insert_product(pool, &new).await.expect("insert product").id
}

fn nayapay_submission(transaction_id: &str) -> Submission {
    Submission {
        payment_method: PaymentMethod::Nayapay,
        contact_method: ContactMethod::Whatsapp,
        contact_value: "+923001234567".to_string(),
        transaction_id: Some(transaction_id.to_string()),
        screenshot_url: None,
        alternative_payment_details: None,
    }
}

// Presigning is local request signing; static dummy credentials keep it
// offline and deterministic.
fn set_signing_env() {
    std::env::set_var("JWT_SECRET", "test-secret");
    std::env::set_var("AWS_ACCESS_KEY_ID", "test-access-key");
    std::env::set_var("AWS_SECRET_ACCESS_KEY", "test-secret-key");
}

async fn row_count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query(&format!("SELECT COUNT(*) AS count FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("count rows")
        .get("count")
}

fn multipart_body(fields: &[(&str, &str)]) -> (String, Vec<u8>) {
    let boundary = "neonstoretestboundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

#[actix_web::test]
async fn approve_grants_access_and_creates_notification() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;

    let user_id = seed_user(pool, "buyer").await;
    let product_id = seed_product(pool, "Neon UI Kit", 9.99).await;

    let request =
        db::insert_payment_request(pool, user_id, product_id, &nayapay_submission("TX-1"))
            .await
            .expect("insert request");
    assert_eq!(request.status, RequestStatus::Pending);

    let outcome = lifecycle::approve(pool, request.id, Some("verified manually"))
        .await
        .expect("approve")
        .expect("request exists");

    let stored = db::get_payment_request(pool, request.id)
        .await
        .expect("reload request")
        .expect("request exists");
    assert_eq!(stored.status, RequestStatus::Approved);
    assert_eq!(stored.admin_notes.as_deref(), Some("verified manually"));

    assert!(db::has_access(pool, user_id, product_id).await.expect("grant lookup"));

    assert_eq!(outcome.notification.title, "Payment Approved!");
    assert_eq!(
        outcome.notification.message,
        "Your payment for \"Neon UI Kit\" has been approved. You can now download the product."
    );
    assert_eq!(outcome.notification.related_request_id, Some(request.id));
    assert!(!outcome.notification.is_read);

    assert_eq!(
        db::unread_notification_count(pool, user_id).await.expect("count"),
        1
    );

    // Re-approval of the same request is a no-op on the grant.
    lifecycle::approve(pool, request.id, None)
        .await
        .expect("second approve")
        .expect("request exists");
    assert!(db::has_access(pool, user_id, product_id).await.expect("grant lookup"));
}

#[actix_web::test]
async fn reject_leaves_no_grant_and_allows_resubmission() {
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;

    let user_id = seed_user(pool, "buyer").await;
    let product_id = seed_product(pool, "Neon Icons", 4.99).await;

    let request =
        db::insert_payment_request(pool, user_id, product_id, &nayapay_submission("TX-2"))
            .await
            .expect("insert request");

    let found = lifecycle::reject(pool, request.id, Some("no matching transfer"))
        .await
        .expect("reject");
    assert!(found);

    assert!(!db::has_access(pool, user_id, product_id).await.expect("grant lookup"));
    assert_eq!(
        db::unread_notification_count(pool, user_id).await.expect("count"),
        0
    );

    let product = db::get_product(pool, product_id)
        .await
        .expect("product")
        .expect("exists");
    let latest = db::latest_request_status(pool, user_id, product_id)
        .await
        .expect("latest status");
    assert_eq!(
        lifecycle::derive_purchase_state(product.price, false, latest),
        lifecycle::PurchaseState::Rejected
    );

    // A rejected request does not block a new one.
    let second =
        db::insert_payment_request(pool, user_id, product_id, &nayapay_submission("TX-3"))
            .await
            .expect("resubmit");
    assert_eq!(second.status, RequestStatus::Pending);
}

#[actix_web::test]
async fn submit_endpoint_validates_before_writing() {
    std::env::set_var("JWT_SECRET", "test-secret");
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;

    let user_id = seed_user(pool, "buyer").await;
    let product_id = seed_product(pool, "Neon Fonts", 3.0).await;
    let token = generate_jwt(user_id).expect("jwt");

    let state = web::Data::new(support::build_state(test_db.pool.clone()).await);
    let app = test::init_service(
        App::new().app_data(state.clone()).service(
            web::scope("/api")
                .wrap(JwtMiddleware)
                .service(submit_payment_request)
                .service(purchase_state),
        ),
    )
    .await;

    // Nayapay with neither transaction id nor screenshot: nothing is written.
    let (content_type, body) = multipart_body(&[
        ("payment_method", "nayapay"),
        ("contact_method", "whatsapp"),
        ("contact_value", "+923001234567"),
    ]);
    let req = TestRequest::post()
        .uri(&format!("/api/products/{product_id}/payment-requests"))
        .insert_header(("Authorization", format!("Bearer {token}")))
        .insert_header(("Content-Type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM payment_requests")
        .fetch_one(pool)
        .await
        .expect("count requests")
        .get("count");
    assert_eq!(count, 0);

    // Same submission with a transaction id goes through.
    let (content_type, body) = multipart_body(&[
        ("payment_method", "nayapay"),
        ("contact_method", "whatsapp"),
        ("contact_value", "+923001234567"),
        ("transaction_id", "TX-100"),
    ]);
    let req = TestRequest::post()
        .uri(&format!("/api/products/{product_id}/payment-requests"))
        .insert_header(("Authorization", format!("Bearer {token}")))
        .insert_header(("Content-Type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let status = db::latest_request_status(pool, user_id, product_id)
        .await
        .expect("latest status");
    assert_eq!(status, Some(RequestStatus::Pending));

    // A pending request blocks a second submission.
    let (content_type, body) = multipart_body(&[
        ("payment_method", "nayapay"),
        ("contact_method", "whatsapp"),
        ("contact_value", "+923001234567"),
        ("transaction_id", "TX-101"),
    ]);
    let req = TestRequest::post()
        .uri(&format!("/api/products/{product_id}/payment-requests"))
        .insert_header(("Authorization", format!("Bearer {token}")))
        .insert_header(("Content-Type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let resp: serde_json::Value = test::call_and_read_body_json(
        &app,
        TestRequest::get()
            .uri(&format!("/api/products/{product_id}/purchase-state"))
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request(),
    )
    .await;
    assert_eq!(resp["state"], "pending");
}

#[actix_web::test]
async fn free_products_skip_the_review_queue() {
    std::env::set_var("JWT_SECRET", "test-secret");
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;

    let user_id = seed_user(pool, "buyer").await;
    let product_id = seed_product(pool, "Neon Freebie", 0.0).await;
    let token = generate_jwt(user_id).expect("jwt");

    let state = web::Data::new(support::build_state(test_db.pool.clone()).await);
    let app = test::init_service(
        App::new().app_data(state.clone()).service(
            web::scope("/api")
                .wrap(JwtMiddleware)
                .service(submit_payment_request)
                .service(purchase_state),
        ),
    )
    .await;

    let resp: serde_json::Value = test::call_and_read_body_json(
        &app,
        TestRequest::get()
            .uri(&format!("/api/products/{product_id}/purchase-state"))
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request(),
    )
    .await;
    assert_eq!(resp["state"], "free");

    let (content_type, body) = multipart_body(&[
        ("payment_method", "nayapay"),
        ("contact_method", "whatsapp"),
        ("contact_value", "+923001234567"),
        ("transaction_id", "TX-1"),
    ]);
    let req = TestRequest::post()
        .uri(&format!("/api/products/{product_id}/payment-requests"))
        .insert_header(("Authorization", format!("Bearer {token}")))
        .insert_header(("Content-Type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn admin_stats_report_counts_and_revenue() {
    std::env::set_var("JWT_SECRET", "test-secret");
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;

    let admin_id = seed_user(pool, "admin").await;
    db::set_role(pool, admin_id, Role::Admin).await.expect("set role");
    let buyer_id = seed_user(pool, "buyer").await;
    let product_id = seed_product(pool, "Neon UI Kit", 5.0).await;

    let request =
        db::insert_payment_request(pool, buyer_id, product_id, &nayapay_submission("TX-9"))
            .await
            .expect("insert request");
    lifecycle::approve(pool, request.id, None)
        .await
        .expect("approve")
        .expect("request exists");

    let token = generate_jwt(admin_id).expect("jwt");
    let state = web::Data::new(support::build_state(test_db.pool.clone()).await);
    let app = test::init_service(
        App::new().app_data(state.clone()).service(
            web::scope("/api")
                .wrap(JwtMiddleware)
                .service(dashboard_stats),
        ),
    )
    .await;

    let stats: serde_json::Value = test::call_and_read_body_json(
        &app,
        TestRequest::get()
            .uri("/api/admin/stats")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request(),
    )
    .await;

    assert_eq!(stats["total_users"], 2);
    assert_eq!(stats["total_products"], 1);
    assert_eq!(stats["approved_requests"], 1);
    assert_eq!(stats["pending_requests"], 0);
    assert_eq!(stats["total_revenue"], 5.0);
    assert_eq!(stats["today_revenue"], 5.0);
}

#[actix_web::test]
async fn non_admins_cannot_read_the_dashboard() {
    std::env::set_var("JWT_SECRET", "test-secret");
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;

    let user_id = seed_user(pool, "buyer").await;
    let token = generate_jwt(user_id).expect("jwt");

    let state = web::Data::new(support::build_state(test_db.pool.clone()).await);
    let app = test::init_service(
        App::new().app_data(state.clone()).service(
            web::scope("/api")
                .wrap(JwtMiddleware)
                .service(dashboard_stats),
        ),
    )
    .await;

    let req = TestRequest::get()
        .uri("/api/admin/stats")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
}

#[actix_web::test]
async fn paid_downloads_are_forbidden_without_a_grant() {
    set_signing_env();
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;

    let user_id = seed_user(pool, "buyer").await;
    let product_id = seed_product(pool, "Neon UI Kit", 9.99).await;
    let token = generate_jwt(user_id).expect("jwt");

    let state = web::Data::new(support::build_state(test_db.pool.clone()).await);
    let app = test::init_service(
        App::new().app_data(state.clone()).service(
            web::scope("/api")
                .wrap(JwtMiddleware)
                .service(download_product),
        ),
    )
    .await;

    let req = TestRequest::get()
        .uri(&format!("/api/products/{product_id}/download"))
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);

    // The refusal writes nothing.
    assert_eq!(row_count(pool, "user_product_access").await, 0);
    assert_eq!(row_count(pool, "payment_requests").await, 0);

    // With a grant the same request succeeds and reports the full countdown.
    db::insert_access_grant(pool, user_id, product_id)
        .await
        .expect("insert grant");
    let body: serde_json::Value = test::call_and_read_body_json(
        &app,
        TestRequest::get()
            .uri(&format!("/api/products/{product_id}/download"))
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request(),
    )
    .await;
    assert!(body["url"].as_str().unwrap().contains("X-Amz-Signature"));
    assert_eq!(body["countdown_secs"], 30);
}

#[actix_web::test]
async fn free_downloads_are_stateless_and_repeatable() {
    set_signing_env();
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;

    let user_id = seed_user(pool, "buyer").await;
    let product_id = seed_product(pool, "Neon Freebie", 0.0).await;
    let token = generate_jwt(user_id).expect("jwt");

    let state = web::Data::new(support::build_state(test_db.pool.clone()).await);
    let app = test::init_service(
        App::new().app_data(state.clone()).service(
            web::scope("/api")
                .wrap(JwtMiddleware)
                .service(download_product),
        ),
    )
    .await;

    for _ in 0..2 {
        let body: serde_json::Value = test::call_and_read_body_json(
            &app,
            TestRequest::get()
                .uri(&format!("/api/products/{product_id}/download"))
                .insert_header(("Authorization", format!("Bearer {token}")))
                .to_request(),
        )
        .await;
        assert!(body["url"].as_str().unwrap().contains("X-Amz-Signature"));
        assert_eq!(body["countdown_secs"], 30);

        // No request, grant or notification appears between fetches.
        assert_eq!(row_count(pool, "payment_requests").await, 0);
        assert_eq!(row_count(pool, "user_product_access").await, 0);
        assert_eq!(row_count(pool, "notifications").await, 0);
    }
}

#[actix_web::test]
async fn admins_download_without_grant_or_countdown() {
    set_signing_env();
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;

    let admin_id = seed_user(pool, "admin").await;
    db::set_role(pool, admin_id, Role::Admin).await.expect("set role");
    let product_id = seed_product(pool, "Neon UI Kit", 9.99).await;
    let token = generate_jwt(admin_id).expect("jwt");

    let state = web::Data::new(support::build_state(test_db.pool.clone()).await);
    let app = test::init_service(
        App::new().app_data(state.clone()).service(
            web::scope("/api")
                .wrap(JwtMiddleware)
                .service(download_product),
        ),
    )
    .await;

    let body: serde_json::Value = test::call_and_read_body_json(
        &app,
        TestRequest::get()
            .uri(&format!("/api/products/{product_id}/download"))
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request(),
    )
    .await;
    assert!(body["url"].as_str().unwrap().contains("X-Amz-Signature"));
    assert_eq!(body["countdown_secs"], 0);
}

#[actix_web::test]
async fn download_of_a_product_without_a_file_is_not_found() {
    set_signing_env();
    let test_db = support::init_test_db().await;
    let pool = &test_db.pool;

    let user_id = seed_user(pool, "buyer").await;
    let new = db::NewProduct {
        title: "Neon Preview".to_string(),
        description: None,
        price: 0.0,
        category: None,
        tags: None,
        image_url: None,
        feature_images: None,
        file_key: None,
    };
    let product_id = db::insert_product(pool, &new).await.expect("insert product").id;
    let token = generate_jwt(user_id).expect("jwt");

    let state = web::Data::new(support::build_state(test_db.pool.clone()).await);
    let app = test::init_service(
        App::new().app_data(state.clone()).service(
            web::scope("/api")
                .wrap(JwtMiddleware)
                .service(download_product),
        ),
    )
    .await;

    let req = TestRequest::get()
        .uri(&format!("/api/products/{product_id}/download"))
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}
