use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::Pagination;
use crate::{
    accounts::{AccountStatus, AccountStore, PublicAccount},
    error::ApiError,
};

#[derive(Debug)]
pub struct AccountPage {
    pub accounts: Vec<PublicAccount>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

#[instrument(skip(store))]
pub async fn list_accounts(store: &dyn AccountStore, p: Pagination) -> Result<AccountPage, ApiError> {
    let page_size = p.page_size.max(1);
    let total = store.count().await?;
    let skip = p.page.saturating_sub(1).saturating_mul(page_size);
    let accounts = store
        .find_page(skip, page_size)
        .await?
        .into_iter()
        .map(PublicAccount::from)
        .collect();

    Ok(AccountPage {
        accounts,
        total,
        page: p.page,
        page_size,
        total_pages: total.div_ceil(page_size),
    })
}

#[instrument(skip(store))]
pub async fn activate(store: &dyn AccountStore, account_id: Uuid) -> Result<PublicAccount, ApiError> {
    let account = store.find_by_id(account_id).await?.ok_or(ApiError::NotFound)?;
    if account.status == AccountStatus::Active {
        return Err(ApiError::AlreadyActive);
    }

    let saved = store
        .set_status(account.id, AccountStatus::Active)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(account_id = %saved.id, "account activated");
    Ok(saved.into())
}

#[instrument(skip(store))]
pub async fn deactivate(
    store: &dyn AccountStore,
    account_id: Uuid,
    requester_id: Uuid,
) -> Result<PublicAccount, ApiError> {
    let account = store.find_by_id(account_id).await?.ok_or(ApiError::NotFound)?;
    if account.status == AccountStatus::Inactive {
        return Err(ApiError::AlreadyInactive);
    }
    if account.id == requester_id {
        warn!(account_id = %account.id, "self-deactivation refused");
        return Err(ApiError::SelfDeactivationForbidden);
    }

    let saved = store
        .set_status(account.id, AccountStatus::Inactive)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(account_id = %saved.id, by = %requester_id, "account deactivated");
    Ok(saved.into())
}
