use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::{Path, State}, response::IntoResponse};
use uuid::Uuid;

use paperfeed_db::models::UserRow;
use paperfeed_types::api::{UpdateProfileRequest, UserResponse};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;

pub(crate) fn user_response(row: &UserRow) -> anyhow::Result<UserResponse> {
    Ok(UserResponse {
        id: row.id.parse()?,
        username: row.username.clone(),
        email: row.email.clone(),
        is_active: row.is_active,
        created_at: row.created_at.clone(),
    })
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let users = state
        .db
        .list_users()?
        .iter()
        .map(user_response)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let row = state
        .db
        .get_user_by_id(&user_id.to_string())?
        .ok_or(ApiError::NotFound("User not found"))?;
    Ok(Json(user_response(&row)?))
}

/// Sparse patch of the caller's own profile. Uniqueness is checked per
/// changed field; untouched fields keep their stored values.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let new_username = match req.username {
        Some(name) => {
            let name = name.trim().to_lowercase();
            if name != user.username && state.db.get_user_by_username(&name)?.is_some() {
                return Err(ApiError::Conflict("Username already taken"));
            }
            Some(name)
        }
        None => None,
    };

    if let Some(email) = req.email.as_deref() {
        if email != user.email && state.db.get_user_by_email(email)?.is_some() {
            return Err(ApiError::Conflict("Email already registered"));
        }
    }

    let new_password_hash = match req.password.as_deref() {
        Some(password) => {
            if password.len() < 8 {
                return Err(ApiError::Invalid(
                    "Password must be at least 8 characters".into(),
                ));
            }
            let salt = SaltString::generate(&mut OsRng);
            Some(
                Argon2::default()
                    .hash_password(password.as_bytes(), &salt)
                    .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
                    .to_string(),
            )
        }
        None => None,
    };

    state.db.update_user_profile(
        &user.id.to_string(),
        new_username.as_deref(),
        req.email.as_deref(),
        new_password_hash.as_deref(),
    )?;

    let row = state
        .db
        .get_user_by_id(&user.id.to_string())?
        .ok_or(ApiError::NotFound("User not found"))?;
    Ok(Json(user_response(&row)?))
}
