//! Accounts and JWT session handling.
//!
//! Access tokens are short-lived; refresh tokens are long-lived, signed
//! with a separate secret and must match the one persisted for the
//! account. Protected routes go through [`require_auth`].

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use sprout_core::{Role, UserId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const ACCESS_TTL_MINUTES: i64 = 30;
const REFRESH_TTL_DAYS: i64 = 7;

/// JWT claims carried by both token kinds.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: i64,
    /// Account role
    pub role: String,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// Signing material for both token kinds.
#[derive(Clone)]
pub struct AuthKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
}

impl AuthKeys {
    /// Build keys from the two configured secrets.
    pub fn new(access_secret: &str, refresh_secret: &str) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
        }
    }

    fn issue(&self, key: &EncodingKey, user: UserId, role: Role, ttl: Duration) -> ApiResult<String> {
        let claims = Claims {
            sub: user.0,
            role: role.as_str().to_string(),
            exp: (Utc::now() + ttl).timestamp(),
        };

        encode(&Header::default(), &claims, key)
            .map_err(|err| ApiError::Internal(err.into()))
    }

    /// Issue a short-lived access token.
    pub fn issue_access(&self, user: UserId, role: Role) -> ApiResult<String> {
        self.issue(
            &self.access_encoding,
            user,
            role,
            Duration::minutes(ACCESS_TTL_MINUTES),
        )
    }

    /// Issue a long-lived refresh token.
    pub fn issue_refresh(&self, user: UserId, role: Role) -> ApiResult<String> {
        self.issue(
            &self.refresh_encoding,
            user,
            role,
            Duration::days(REFRESH_TTL_DAYS),
        )
    }

    /// Verify an access token.
    pub fn verify_access(&self, token: &str) -> ApiResult<Claims> {
        decode::<Claims>(token, &self.access_decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| ApiError::Unauthorized("invalid or expired token".into()))
    }

    /// Verify a refresh token.
    pub fn verify_refresh(&self, token: &str) -> ApiResult<Claims> {
        decode::<Claims>(token, &self.refresh_decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| ApiError::Unauthorized("invalid or expired refresh token".into()))
    }
}

/// The authenticated caller, attached to the request by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Account id
    pub id: UserId,
    /// Account role
    pub role: String,
}

/// Bearer-token middleware for protected routes.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("access denied, no token provided".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("malformed authorization header".into()))?;

    let claims = state.auth.verify_access(token)?;

    let user = AuthUser {
        id: UserId(claims.sub),
        role: claims.role,
    };
    tracing::debug!(user = %user.id, role = %user.role, "authenticated");
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// `/api/auth` routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
    role: Role,
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<(axum::http::StatusCode, Json<serde_json::Value>)> {
    if body.username.trim().is_empty() || body.password.is_empty() || body.email.trim().is_empty() {
        return Err(ApiError::Validation(
            "username, email and password are required".into(),
        ));
    }

    if state.store.user_by_username(&body.username).await?.is_some() {
        return Err(ApiError::Conflict("username already taken".into()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(body.password.as_bytes(), &salt)
        .map_err(|err| ApiError::Internal(anyhow::anyhow!("password hashing failed: {err}")))?
        .to_string();

    let user_id = state
        .store
        .insert_user(body.username.trim(), body.email.trim(), &hash, body.role)
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({
            "message": "account created",
            "user_id": user_id,
            "role": body.role,
        })),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let user = state
        .store
        .user_by_username(&body.username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid username or password".into()))?;

    let parsed = PasswordHash::new(&user.password_hash)
        .map_err(|err| ApiError::Internal(anyhow::anyhow!("stored hash unreadable: {err}")))?;

    if Argon2::default()
        .verify_password(body.password.as_bytes(), &parsed)
        .is_err()
    {
        return Err(ApiError::Unauthorized("invalid username or password".into()));
    }

    let access_token = state.auth.issue_access(user.id, user.role)?;
    let refresh_token = state.auth.issue_refresh(user.id, user.role)?;
    state
        .store
        .set_refresh_token(user.id, Some(&refresh_token))
        .await?;

    Ok(Json(json!({
        "message": "login successful",
        "access_token": access_token,
        "refresh_token": refresh_token,
        "user": { "user_id": user.id, "username": user.username, "role": user.role },
    })))
}

#[derive(Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let claims = state.auth.verify_refresh(&body.refresh_token)?;
    let user_id = UserId(claims.sub);

    // The token must be the one currently on file for the account.
    if !state
        .store
        .refresh_token_matches(user_id, &body.refresh_token)
        .await?
    {
        return Err(ApiError::Forbidden("refresh token revoked".into()));
    }

    let role: Role = claims
        .role
        .parse()
        .map_err(|_| ApiError::Unauthorized("invalid refresh token".into()))?;
    let access_token = state.auth.issue_access(user_id, role)?;

    Ok(Json(json!({
        "message": "token refreshed",
        "access_token": access_token,
    })))
}
