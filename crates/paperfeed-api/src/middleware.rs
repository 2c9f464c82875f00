use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use paperfeed_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

/// Verified caller identity, attached as a request extension by
/// `require_auth`. Handlers never see the raw token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// Extract and validate the bearer JWT, then confirm the user still
/// exists and is active before letting the request through.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized("Not authenticated"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized("Not authenticated"))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized("Could not validate credentials"))?;

    let user = state
        .db
        .get_user_by_id(&token_data.claims.sub.to_string())?
        .ok_or(ApiError::Unauthorized("Could not validate credentials"))?;
    if !user.is_active {
        return Err(ApiError::Invalid("Inactive user".into()));
    }

    req.extensions_mut().insert(CurrentUser {
        id: token_data.claims.sub,
        username: user.username,
        email: user.email,
    });
    Ok(next.run(req).await)
}
