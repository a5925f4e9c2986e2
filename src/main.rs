// src/main.rs
use actix::Actor;
use actix_web::{App, HttpResponse, HttpServer, Responder, web};
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::Client as S3Client;
use dotenvy::dotenv;
use sqlx::PgPool;
use std::env;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use neon_store::{AppState, api, docs, ws};

async fn index() -> impl Responder {
    HttpResponse::Ok().body("Service ready!")
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Fail fast instead of erroring on the first login.
    env::var("JWT_SECRET").expect("JWT_SECRET required");

    let s3_bucket = env::var("S3_BUCKET").expect("S3_BUCKET required");
    let s3_endpoint = env::var("S3_ENDPOINT").ok();
    let s3_public_base_url = env::var("S3_PUBLIC_BASE_URL")
        .unwrap_or_else(|_| format!("https://{}.s3.amazonaws.com", s3_bucket));

    let download_countdown_secs = env_u64("DOWNLOAD_COUNTDOWN_SECS", 30);
    let signed_url_ttl_secs = env_u64("SIGNED_URL_TTL_SECS", 3600);
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let region_provider = RegionProviderChain::default_provider().or_else("us-east-1");
    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(region_provider)
        .load()
        .await;
    let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config);

    // Allow custom S3-compatible endpoints (e.g., MinIO)
    if let Some(endpoint) = s3_endpoint {
        s3_config_builder = s3_config_builder
            .endpoint_url(endpoint)
            .force_path_style(true);
    }

    let s3_client = S3Client::from_conf(s3_config_builder.build());

    let ws_hub = ws::NotificationHub::new().start();

    let state = web::Data::new(AppState {
        pool,
        s3_client,
        s3_bucket: s3_bucket.clone(),
        s3_public_base_url: s3_public_base_url.clone(),
        ws_hub,
        download_countdown_secs,
        signed_url_ttl_secs,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/", web::get().to(index))
            .service(
                SwaggerUi::new("/docs/{_:.*}")
                    .url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
            )
            // Public: auth and the browsable catalog
            .service(api::auth::register)
            .service(api::auth::login)
            .service(api::products::list_products)
            .service(api::products::get_product)
            // Notification push; the token rides in the query string
            .route("/ws/notifications", web::get().to(ws::notifications_ws))
            // Everything else requires a JWT
            .service(
                web::scope("/api")
                    .wrap(api::auth::JwtMiddleware)
                    .service(api::payment_requests::submit_payment_request)
                    .service(api::payment_requests::list_my_requests)
                    .service(api::payment_requests::purchase_state)
                    .service(api::downloads::download_product)
                    .service(api::notifications::list_notifications)
                    .service(api::notifications::unread_count)
                    .service(api::notifications::mark_all_read)
                    .service(api::notifications::mark_read)
                    .service(api::profile::get_profile)
                    .service(api::profile::update_profile)
                    .service(api::products::list_all_products)
                    .service(api::products::create_product)
                    .service(api::products::update_product)
                    .service(api::products::set_product_active)
                    .service(api::products::delete_product)
                    .service(api::payment_requests::list_all_requests)
                    .service(api::payment_requests::approve_request)
                    .service(api::payment_requests::reject_request)
                    .service(api::admin::dashboard_stats)
                    .service(api::admin::analytics_report)
                    .service(api::admin::list_users)
                    .service(api::admin::set_user_role)
                    .service(api::admin::export_csv),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
