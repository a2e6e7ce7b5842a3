use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{AccountResponse, LoginRequest, LoginResponse, SignupRequest, UpdateProfileRequest},
        extractors::CurrentAccount,
        services,
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(get_me).put(update_me))
}

/// Unwraps a JSON body, reporting a bad body in the API's error envelope.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        warn!(error = %rejection, "rejected request body");
        ApiError::Validation(rejection.body_text())
    })
}

#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let account = services::signup(state.accounts.as_ref(), json_body(payload)?).await?;
    Ok((
        StatusCode::CREATED,
        Json(AccountResponse::with_message("User registered successfully", account)),
    ))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome =
        services::login(state.accounts.as_ref(), &state.jwt, json_body(payload)?).await?;
    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful",
        token: outcome.token,
        user: outcome.account,
    }))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentAccount(account): CurrentAccount) -> Json<AccountResponse> {
    Json(AccountResponse::new(account))
}

#[instrument(skip_all)]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<AccountResponse>, ApiError> {
    let updated =
        services::update_profile(state.accounts.as_ref(), account.id, json_body(payload)?).await?;
    Ok(Json(AccountResponse::with_message(
        "Profile updated successfully",
        updated,
    )))
}
