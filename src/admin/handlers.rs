use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, patch},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{ListQuery, ListResponse, Pagination, PaginationMeta, StatusChangeResponse},
    services,
};
use crate::{auth::extractors::AdminAccount, error::ApiError, state::AppState};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id/activate", patch(activate_user))
        .route("/users/:id/deactivate", patch(deactivate_user))
}

// An id that is not a UUID cannot name an account.
fn parse_id(path: Result<Path<String>, PathRejection>) -> Result<Uuid, ApiError> {
    let Path(raw) = path?;
    Uuid::parse_str(&raw).map_err(|_| ApiError::NotFound)
}

#[instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminAccount,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ListResponse>, ApiError> {
    let Query(q) = query?;
    let page = services::list_accounts(state.accounts.as_ref(), Pagination::from(q)).await?;
    Ok(Json(ListResponse {
        success: true,
        users: page.accounts,
        pagination: PaginationMeta {
            current_page: page.page,
            total_pages: page.total_pages,
            total_users: page.total,
            users_per_page: page.page_size,
        },
    }))
}

#[instrument(skip_all)]
pub async fn activate_user(
    State(state): State<AppState>,
    _admin: AdminAccount,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<StatusChangeResponse>, ApiError> {
    let user = services::activate(state.accounts.as_ref(), parse_id(id)?).await?;
    Ok(Json(StatusChangeResponse {
        success: true,
        message: "User activated successfully",
        user,
    }))
}

#[instrument(skip_all)]
pub async fn deactivate_user(
    State(state): State<AppState>,
    AdminAccount(admin): AdminAccount,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<StatusChangeResponse>, ApiError> {
    let user = services::deactivate(state.accounts.as_ref(), parse_id(id)?, admin.id).await?;
    Ok(Json(StatusChangeResponse {
        success: true,
        message: "User deactivated successfully",
        user,
    }))
}
