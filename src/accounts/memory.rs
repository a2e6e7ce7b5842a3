use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::{AccountStore, StoreError, StoreResult};
use super::repo_types::{Account, AccountStatus, NewAccount};

/// Process-local account store. Uniqueness of email is checked and the insert
/// performed under the same write lock.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn modify(&self, id: Uuid, apply: impl FnOnce(&mut Account)) -> Option<Account> {
        let mut accounts = self.accounts.write().await;
        let stored = accounts.get_mut(&id)?;
        apply(stored);
        stored.updated_at = OffsetDateTime::now_utc();
        Some(stored.clone())
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let email = email.to_lowercase();
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.email.to_lowercase() == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn create(&self, new: NewAccount) -> StoreResult<Account> {
        let mut accounts = self.accounts.write().await;
        let email = new.email.to_lowercase();
        if accounts.values().any(|a| a.email.to_lowercase() == email) {
            return Err(StoreError::DuplicateEmail);
        }

        let now = OffsetDateTime::now_utc();
        let account = Account {
            id: Uuid::new_v4(),
            full_name: new.full_name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            status: AccountStatus::Active,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<Option<Account>> {
        Ok(self.modify(id, |a| a.last_login_at = Some(at)).await)
    }

    async fn set_status(&self, id: Uuid, status: AccountStatus) -> StoreResult<Option<Account>> {
        Ok(self.modify(id, |a| a.status = status).await)
    }

    async fn update_details(
        &self,
        id: Uuid,
        full_name: Option<&str>,
        password_hash: Option<&str>,
    ) -> StoreResult<Option<Account>> {
        Ok(self
            .modify(id, |a| {
                if let Some(name) = full_name {
                    a.full_name = name.to_string();
                }
                if let Some(hash) = password_hash {
                    a.password_hash = hash.to_string();
                }
            })
            .await)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.accounts.read().await.len() as u64)
    }

    async fn find_page(&self, skip: u64, limit: u64) -> StoreResult<Vec<Account>> {
        let accounts = self.accounts.read().await;
        let mut all: Vec<&Account> = accounts.values().collect();
        all.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(all
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}
