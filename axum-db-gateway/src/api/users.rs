//! Registration, login and profile endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::warn;

use crate::identity::{
    IdentityError, IdentityService, LoginRequest, LoginResponse, ProfileUpdateRequest,
    RegisterRequest, UserStore,
};
use super::{error_response, read_body};
use crate::schema::MessageResponse;

const IDENTITY_CONTEXT: &str = "Identity request failed";

fn identity_error_response(error: IdentityError) -> Response {
    warn!("identity request failed: {}", error);
    (
        error.status_code(),
        Json(MessageResponse::failure(error.to_string())),
    )
        .into_response()
}


/// Handler for POST /api/register
pub async fn register_handler<S: UserStore>(
    State(service): State<IdentityService<S>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response {
    let request = match read_body(payload) {
        Ok(request) => request,
        Err(error) => return error_response(IDENTITY_CONTEXT, &error),
    };

    match service.register(request).await {
        Ok(_) => (
            StatusCode::OK,
            Json(MessageResponse::success("Registration successful")),
        )
            .into_response(),
        Err(error) => identity_error_response(error),
    }
}

/// Handler for POST /api/login
///
/// Returns the account summary on success, 401 on bad credentials.
pub async fn login_handler<S: UserStore>(
    State(service): State<IdentityService<S>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let request = match read_body(payload) {
        Ok(request) => request,
        Err(error) => return error_response(IDENTITY_CONTEXT, &error),
    };

    match service.login(request).await {
        Ok(user) => (
            StatusCode::OK,
            Json(LoginResponse {
                success: true,
                user,
            }),
        )
            .into_response(),
        Err(error) => identity_error_response(error),
    }
}

/// Handler for POST /api/profile/update
pub async fn update_profile_handler<S: UserStore>(
    State(service): State<IdentityService<S>>,
    payload: Result<Json<ProfileUpdateRequest>, JsonRejection>,
) -> Response {
    let request = match read_body(payload) {
        Ok(request) => request,
        Err(error) => return error_response(IDENTITY_CONTEXT, &error),
    };

    match service.update_profile(request).await {
        Ok(_) => (
            StatusCode::OK,
            Json(MessageResponse::success("Profile updated successfully")),
        )
            .into_response(),
        Err(error) => identity_error_response(error),
    }
}
