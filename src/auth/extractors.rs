use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;

use crate::{
    accounts::{AccountStore, PublicAccount},
    auth::jwt::{JwtKeys, TokenError},
    error::ApiError,
    state::AppState,
};

const NOT_AUTHORIZED: &str = "Not authorized. Please login.";
const INVALID_TOKEN: &str = "Invalid token";
const UNKNOWN_ACCOUNT: &str = "User not found";

/// The authenticated, active account behind the request.
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub PublicAccount);

/// [`CurrentAccount`] that additionally holds the admin role.
#[derive(Debug, Clone)]
pub struct AdminAccount(pub PublicAccount);

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::Unauthenticated(NOT_AUTHORIZED))?;

    let token = auth
        .strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(str::trim)
        .ok_or(ApiError::Unauthenticated(NOT_AUTHORIZED))?;

    if token.is_empty() {
        return Err(ApiError::Unauthenticated(NOT_AUTHORIZED));
    }
    Ok(token)
}

/// Runs the gate: extract, verify, resolve, check status.
pub async fn authenticate(
    headers: &HeaderMap,
    keys: &JwtKeys,
    store: &dyn AccountStore,
) -> Result<PublicAccount, ApiError> {
    let token = bearer_token(headers)?;

    let account_id = keys.verify(token).map_err(|e| {
        warn!(error = %e, "token rejected");
        match e {
            TokenError::Expired => ApiError::TokenExpired,
            TokenError::Malformed | TokenError::InvalidSignature => {
                ApiError::Unauthenticated(INVALID_TOKEN)
            }
        }
    })?;

    let account = store
        .find_by_id(account_id)
        .await?
        .ok_or(ApiError::Unauthenticated(UNKNOWN_ACCOUNT))?;

    // Tokens are not revoked; status is checked live on every request.
    if !account.is_active() {
        warn!(account_id = %account.id, "request from deactivated account");
        return Err(ApiError::AccountDeactivated);
    }

    Ok(account.into())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(&parts.headers, &state.jwt, state.accounts.as_ref())
            .await
            .map(CurrentAccount)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminAccount {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentAccount(account) = CurrentAccount::from_request_parts(parts, state).await?;
        if !account.is_admin() {
            warn!(account_id = %account.id, "admin route refused");
            return Err(ApiError::Forbidden);
        }
        Ok(AdminAccount(account))
    }
}
