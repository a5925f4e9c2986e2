pub mod analytics;
pub mod api;
pub mod db;
pub mod docs;
pub mod export;
pub mod lifecycle;
pub mod models;
pub mod s3_utils;
pub mod ws;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub s3_client: S3Client,
    pub s3_bucket: String,
    pub s3_public_base_url: String,
    pub ws_hub: actix::Addr<ws::NotificationHub>,
    /// UX pacing delay before a download starts; admins skip it.
    pub download_countdown_secs: u64,
    pub signed_url_ttl_secs: u64,
}
