use axum::{extract::State, Json};

use crate::error::{ApiResponse, Result};
use crate::models::{CreateUserRequest, LoginRequest, LoginResponse, UserResponse};
use crate::services::AuthService;
use crate::AppState;

/// Register a new user
/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    let user = AuthService::register(&state.db, req).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// Login user
/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    let response = AuthService::login(&state.db, &state.config, req).await?;
    Ok(Json(ApiResponse::success(response)))
}
