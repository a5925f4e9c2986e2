// src/api/auth.rs

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{post, web, Error, HttpMessage, HttpResponse, Responder};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::task::{Context, Poll};
use utoipa::ToSchema;

use crate::{db, AppState};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i32,
    exp: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: i32,
}

#[utoipa::path(
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = AuthResponse),
        (status = 400, description = "Email already registered or invalid data"),
    )
)]
#[post("/auth/register")]
pub async fn register(
    state: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> impl Responder {
    let password_hash = match hash(&payload.password, DEFAULT_COST) {
        Ok(h) => h,
        Err(e) => {
            log::error!("bcrypt hash error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let user_id = match db::create_user(&state.pool, &payload.email, &password_hash).await {
        Ok(id) => id,
        Err(e) => {
            log::warn!("register db error: {e}");
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "user already exists or invalid data"
            }));
        }
    };

    // One-to-one profile row; contact fields are filled in later from the
    // profile page.
    if let Err(e) = db::create_profile(
        &state.pool,
        user_id,
        &payload.email,
        payload.full_name.as_deref(),
    )
    .await
    {
        log::error!("register profile insert error: {e}");
        return HttpResponse::InternalServerError().finish();
    }

    let token = match generate_jwt(user_id) {
        Ok(t) => t,
        Err(e) => {
            log::error!("jwt encode error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    HttpResponse::Ok().json(AuthResponse { token, user_id })
}

#[utoipa::path(
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[post("/auth/login")]
pub async fn login(state: web::Data<AppState>, payload: web::Json<LoginRequest>) -> impl Responder {
    let row = match db::get_user_auth(&state.pool, &payload.email).await {
        Ok(r) => r,
        Err(e) => {
            log::error!("login db error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let Some((user_id, password_hash)) = row else {
        return HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "invalid credentials"
        }));
    };

    match verify(&payload.password, &password_hash) {
        Ok(true) => {}
        Ok(false) => {
            return HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "invalid credentials"
            }));
        }
        Err(e) => {
            log::error!("bcrypt verify error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let token = match generate_jwt(user_id) {
        Ok(t) => t,
        Err(e) => {
            log::error!("jwt encode error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    HttpResponse::Ok().json(AuthResponse { token, user_id })
}

pub fn generate_jwt(user_id: i32) -> Result<String, jsonwebtoken::errors::Error> {
    let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET required");

    let expiration = Utc::now()
        .checked_add_signed(Duration::days(30))
        .expect("valid timestamp")
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

/// Middleware that takes `Authorization: Bearer <jwt>`, validates the token
/// and puts the `i32` user id into `req.extensions_mut()`.
pub struct JwtMiddleware;

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtMiddlewareInner<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtMiddlewareInner { service }))
    }
}

pub struct JwtMiddlewareInner<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareInner<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let secret = match std::env::var("JWT_SECRET") {
            Ok(s) => s,
            Err(_) => {
                return Box::pin(async move {
                    Err(actix_web::error::ErrorInternalServerError(
                        "JWT secret not set",
                    ))
                })
            }
        };

        let auth_header = req
            .headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("");

        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            match decode::<Claims>(
                token,
                &DecodingKey::from_secret(secret.as_ref()),
                &Validation::default(),
            ) {
                Ok(token_data) => {
                    req.extensions_mut().insert(token_data.claims.sub);
                    let fut = self.service.call(req);
                    return Box::pin(async move { fut.await });
                }
                Err(_) => {
                    return Box::pin(async move {
                        Err(actix_web::error::ErrorUnauthorized("Invalid token"))
                    })
                }
            }
        }

        Box::pin(async move {
            Err(actix_web::error::ErrorUnauthorized(
                "Missing or invalid Authorization header",
            ))
        })
    }
}
