use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Account, AccountStatus, NewAccount};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract for accounts.
///
/// `create` is the authority on email uniqueness: implementations must reject a
/// second account with the same (lowercased) email atomically and report it
/// as [`StoreError::DuplicateEmail`].
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>>;
    async fn create(&self, new: NewAccount) -> StoreResult<Account>;

    // Each update touches only its own columns, bumps `updated_at`, and
    // returns the fresh row, or `None` if the account no longer exists.
    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<Option<Account>>;
    async fn set_status(&self, id: Uuid, status: AccountStatus) -> StoreResult<Option<Account>>;
    /// `None` leaves the corresponding column unchanged.
    async fn update_details(
        &self,
        id: Uuid,
        full_name: Option<&str>,
        password_hash: Option<&str>,
    ) -> StoreResult<Option<Account>>;

    async fn count(&self) -> StoreResult<u64>;
    /// Accounts ordered newest first.
    async fn find_page(&self, skip: u64, limit: u64) -> StoreResult<Vec<Account>>;
}

const ACCOUNT_COLUMNS: &str = "id, full_name, email, password_hash, role, status, \
                               last_login_at, created_at, updated_at";

#[derive(Clone)]
pub struct PgAccountStore {
    db: PgPool,
}

impl PgAccountStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find account by email")?;
        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find account by id")?;
        Ok(account)
    }

    async fn create(&self, new: NewAccount) -> StoreResult<Account> {
        let result = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (id, full_name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.full_name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role)
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(account) => Ok(account),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateEmail),
            Err(e) => Err(anyhow::Error::new(e).context("insert account").into()),
        }
    }

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE accounts
               SET last_login_at = $2, updated_at = now()
             WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(&self.db)
        .await
        .context("record last login")?;
        Ok(account)
    }

    async fn set_status(&self, id: Uuid, status: AccountStatus) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE accounts
               SET status = $2, updated_at = now()
             WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.db)
        .await
        .context("set account status")?;
        Ok(account)
    }

    async fn update_details(
        &self,
        id: Uuid,
        full_name: Option<&str>,
        password_hash: Option<&str>,
    ) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE accounts
               SET full_name = COALESCE($2, full_name),
                   password_hash = COALESCE($3, password_hash),
                   updated_at = now()
             WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(full_name)
        .bind(password_hash)
        .fetch_optional(&self.db)
        .await
        .context("update account details")?;
        Ok(account)
    }

    async fn count(&self) -> StoreResult<u64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.db)
            .await
            .context("count accounts")?;
        Ok(n.max(0) as u64)
    }

    async fn find_page(&self, skip: u64, limit: u64) -> StoreResult<Vec<Account>> {
        let rows = sqlx::query_as::<_, Account>(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
            FROM accounts
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(skip).unwrap_or(i64::MAX))
        .fetch_all(&self.db)
        .await
        .context("list accounts page")?;
        Ok(rows)
    }
}
