use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::services::AuthService;
use crate::AppState;

/// Authentication middleware
/// Resolves the bearer token to a `UserIdentity` request extension
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized("Missing or invalid Authorization header".to_string())
        })?;

    let identity = AuthService::current_user(&state.db, &state.config, token)
        .await
        .map_err(|e| match e {
            AppError::Jwt(_) | AppError::Unauthorized(_) => {
                tracing::debug!("Rejected bearer token: {}", e);
                AppError::Unauthorized("Invalid token".to_string())
            }
            other => other,
        })?;

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
