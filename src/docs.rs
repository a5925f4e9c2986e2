use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::products::list_products,
        crate::api::products::get_product,
        crate::api::payment_requests::submit_payment_request,
        crate::api::payment_requests::list_my_requests,
        crate::api::payment_requests::purchase_state,
        crate::api::downloads::download_product,
        crate::api::notifications::list_notifications,
        crate::api::notifications::unread_count,
        crate::api::notifications::mark_read,
        crate::api::notifications::mark_all_read,
        crate::api::profile::get_profile,
        crate::api::profile::update_profile,
        crate::api::admin::dashboard_stats,
        crate::api::admin::analytics_report
    ),
    components(
        schemas(
            crate::api::auth::RegisterRequest,
            crate::api::auth::LoginRequest,
            crate::api::auth::AuthResponse,
            crate::api::profile::UpdateProfileRequest,
            crate::api::downloads::DownloadResponse,
            crate::api::admin::DashboardStats,
            crate::api::admin::AnalyticsResponse,
            crate::analytics::MonthlyRevenue,
            crate::analytics::PaymentMethodStats,
            crate::analytics::MonthlyUsers,
            crate::analytics::ProductPerformance,
            crate::lifecycle::PurchaseState,
            crate::models::Product,
            crate::models::Profile,
            crate::models::PaymentRequest,
            crate::models::PaymentRequestDetails,
            crate::models::Notification,
            crate::models::RequestStatus,
            crate::models::PaymentMethod,
            crate::models::ContactMethod,
            crate::models::Role
        )
    ),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "catalog", description = "Public product catalog"),
        (name = "payment-requests", description = "Manual payment verification"),
        (name = "downloads", description = "Gated product downloads"),
        (name = "notifications", description = "In-app notifications"),
        (name = "profile", description = "User profile"),
        (name = "admin", description = "Back office")
    )
)]
pub struct ApiDoc;
