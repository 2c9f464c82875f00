use std::path::PathBuf;
use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use paperfeed_db::Database;
use paperfeed_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};

use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::users::user_response;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub config: Config,
}

/// Immutable configuration, built once at startup and passed in
/// explicitly. Nothing reads the environment after boot.
#[derive(Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub token_expiry_minutes: i64,
    pub upload_dir: PathBuf,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = req.username.trim().to_lowercase();
    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::Invalid(
            "Username must be between 3 and 32 characters".into(),
        ));
    }
    if !req.email.contains('@') {
        return Err(ApiError::Invalid("Invalid email address".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Invalid(
            "Password must be at least 8 characters".into(),
        ));
    }

    if state.db.get_user_by_username(&username)?.is_some() {
        return Err(ApiError::Conflict("Username already registered"));
    }
    if state.db.get_user_by_email(&req.email)?.is_some() {
        return Err(ApiError::Conflict("Email already registered"));
    }

    // Argon2id with a per-user salt
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string();

    let user_id = Uuid::new_v4();
    state
        .db
        .create_user(&user_id.to_string(), &username, &req.email, &password_hash)?;

    let token = create_token(&state.config, user_id, &username, &req.email)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id,
            username,
            access_token: token,
            token_type: "bearer".into(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .db
        .get_user_by_username(&req.username)?
        .ok_or(ApiError::Unauthorized("Incorrect username or password"))?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("Stored password hash is corrupt: {}", e))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized("Incorrect username or password"))?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("Corrupt user id: {}", e))?;
    let token = create_token(&state.config, user_id, &user.username, &user.email)?;

    Ok(Json(AuthResponse {
        user_id,
        username: user.username,
        access_token: token,
        token_type: "bearer".into(),
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    let row = state
        .db
        .get_user_by_id(&user.id.to_string())?
        .ok_or(ApiError::NotFound("User not found"))?;
    Ok(Json(user_response(&row)?))
}

fn create_token(config: &Config, user_id: Uuid, username: &str, email: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::minutes(config.token_expiry_minutes))
            .timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;

    Ok(token)
}
