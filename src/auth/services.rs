use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    accounts::{
        normalize_email, validate_email, validate_full_name, AccountStore, NewAccount,
        PublicAccount, Role, StoreError,
    },
    auth::{
        dto::{LoginRequest, SignupRequest, UpdateProfileRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    config::AdminSeed,
    error::ApiError,
};

pub const MIN_PASSWORD_LEN: usize = 6;

pub struct LoginOutcome {
    pub token: String,
    pub account: PublicAccount,
}

fn present(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}

fn check_strength(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::WeakPassword);
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn signup(store: &dyn AccountStore, req: SignupRequest) -> Result<PublicAccount, ApiError> {
    let (Some(full_name), Some(email), Some(password), Some(confirm)) = (
        present(req.full_name),
        present(req.email),
        present(req.password),
        present(req.confirm_password),
    ) else {
        return Err(ApiError::MissingField);
    };

    if password != confirm {
        return Err(ApiError::PasswordMismatch);
    }
    check_strength(&password)?;

    let full_name = full_name.trim().to_string();
    let email = normalize_email(&email);
    validate_full_name(&full_name).map_err(ApiError::Validation)?;
    validate_email(&email).map_err(ApiError::Validation)?;

    // Fast path only; the store's unique constraint decides races.
    if store.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::DuplicateEmail);
    }

    let password_hash = hash_password(password).await?;
    let account = store
        .create(NewAccount {
            full_name,
            email,
            password_hash,
            role: Role::User,
        })
        .await?;

    info!(account_id = %account.id, email = %account.email, "account registered");
    Ok(account.into())
}

#[instrument(skip_all)]
pub async fn login(
    store: &dyn AccountStore,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<LoginOutcome, ApiError> {
    let (Some(email), Some(password)) = (present(req.email), present(req.password)) else {
        return Err(ApiError::MissingCredentials);
    };
    let email = normalize_email(&email);

    let Some(mut account) = store.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !account.is_active() {
        warn!(account_id = %account.id, "login on deactivated account");
        return Err(ApiError::AccountDeactivated);
    }

    if !verify_password(password, account.password_hash.clone()).await? {
        warn!(account_id = %account.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    // Best effort: a failed timestamp write must not fail the login.
    match store.record_login(account.id, OffsetDateTime::now_utc()).await {
        Ok(Some(fresh)) => account = fresh,
        Ok(None) => warn!(account_id = %account.id, "account vanished while recording login"),
        Err(e) => warn!(account_id = %account.id, error = %e, "failed to record last login"),
    }

    let token = keys.issue(account.id)?;
    info!(account_id = %account.id, "account logged in");
    Ok(LoginOutcome {
        token,
        account: account.into(),
    })
}

#[instrument(skip(store, req))]
pub async fn update_profile(
    store: &dyn AccountStore,
    account_id: Uuid,
    req: UpdateProfileRequest,
) -> Result<PublicAccount, ApiError> {
    let account = store.find_by_id(account_id).await?.ok_or(ApiError::NotFound)?;

    let full_name = req
        .full_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let current_password = present(req.current_password);
    let new_password = present(req.new_password);

    if new_password.is_some() && current_password.is_none() {
        return Err(ApiError::CurrentPasswordRequired);
    }
    if let Some(current) = current_password {
        if !verify_password(current, account.password_hash.clone()).await? {
            warn!(account_id = %account.id, "profile update with wrong current password");
            return Err(ApiError::InvalidCurrentPassword);
        }
    }
    if let Some(new_password) = &new_password {
        check_strength(new_password)?;
    }
    if let Some(name) = &full_name {
        validate_full_name(name).map_err(ApiError::Validation)?;
    }

    let password_hash = match new_password {
        Some(plain) => Some(hash_password(plain).await?),
        None => None,
    };
    let password_changed = password_hash.is_some();

    let saved = store
        .update_details(account.id, full_name.as_deref(), password_hash.as_deref())
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(account_id = %saved.id, password_changed, "profile updated");
    Ok(saved.into())
}

/// Creates the configured administrator unless an account with that email
/// already exists. An existing account is left untouched, whatever its role.
#[instrument(skip_all, fields(email = %seed.email))]
pub async fn ensure_admin(store: &dyn AccountStore, seed: &AdminSeed) -> Result<(), ApiError> {
    let email = normalize_email(&seed.email);
    if store.find_by_email(&email).await?.is_some() {
        debug!("administrator already present");
        return Ok(());
    }

    let full_name = seed.full_name.trim().to_string();
    validate_full_name(&full_name).map_err(ApiError::Validation)?;
    validate_email(&email).map_err(ApiError::Validation)?;
    check_strength(&seed.password)?;

    let password_hash = hash_password(seed.password.clone()).await?;
    match store
        .create(NewAccount {
            full_name,
            email,
            password_hash,
            role: Role::Admin,
        })
        .await
    {
        Ok(account) => {
            info!(account_id = %account.id, "administrator created");
            Ok(())
        }
        Err(StoreError::DuplicateEmail) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accounts::{Account, AccountStatus, MemoryAccountStore},
        config::JwtConfig,
    };

    type StoreResult<T> = Result<T, StoreError>;

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let store = MemoryAccountStore::new();
        let seed = AdminSeed {
            full_name: "Root".into(),
            email: "Root@Example.com".into(),
            password: "rootpass".into(),
        };
        ensure_admin(&store, &seed).await.unwrap();
        ensure_admin(&store, &seed).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        let admin = store.find_by_email("root@example.com").await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(login(&store, &keys(), login_req("root@example.com", "rootpass"))
            .await
            .is_ok());
    }

    fn keys() -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: "test-secret".into(),
            issuer: "test".into(),
            audience: "test".into(),
            ttl_minutes: 5,
        })
    }

    fn signup_req(name: &str, email: &str, pw: &str, confirm: &str) -> SignupRequest {
        SignupRequest {
            full_name: Some(name.into()),
            email: Some(email.into()),
            password: Some(pw.into()),
            confirm_password: Some(confirm.into()),
        }
    }

    fn login_req(email: &str, pw: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.into()),
            password: Some(pw.into()),
        }
    }

    #[tokio::test]
    async fn signup_then_login() {
        let store = MemoryAccountStore::new();
        let keys = keys();
        let account = signup(&store, signup_req("Ada", "Ada@Example.com", "123456", "123456"))
            .await
            .unwrap();
        assert_eq!(account.email, "ada@example.com");
        assert_eq!(account.role, Role::User);
        assert_eq!(account.status, AccountStatus::Active);

        let stored = store.find_by_id(account.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "123456");

        let outcome = login(&store, &keys, login_req("ada@example.com", "123456"))
            .await
            .unwrap();
        assert_eq!(outcome.account.id, account.id);
        assert!(outcome.account.last_login_at.is_some());
        assert_eq!(keys.verify(&outcome.token), Ok(account.id));
    }

    #[tokio::test]
    async fn signup_input_checks_in_order() {
        let store = MemoryAccountStore::new();
        let mut missing = signup_req("Ada", "ada@example.com", "123456", "123456");
        missing.confirm_password = None;
        assert!(matches!(signup(&store, missing).await, Err(ApiError::MissingField)));
        assert!(matches!(
            signup(&store, signup_req("", "ada@example.com", "123456", "123456")).await,
            Err(ApiError::MissingField)
        ));
        assert!(matches!(
            signup(&store, signup_req("Ada", "ada@example.com", "123456", "1234567")).await,
            Err(ApiError::PasswordMismatch)
        ));
        assert!(matches!(
            signup(&store, signup_req("Ada", "ada@example.com", "12345", "12345")).await,
            Err(ApiError::WeakPassword)
        ));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn signup_surfaces_first_field_violation() {
        let store = MemoryAccountStore::new();
        match signup(&store, signup_req("A", "invalid", "123456", "123456")).await {
            Err(ApiError::Validation(msg)) => {
                assert_eq!(msg, "Full name must be at least 2 characters")
            }
            other => panic!("unexpected: {:?}", other.map(|a| a.id)),
        }
        match signup(&store, signup_req("Ada", "invalid", "123456", "123456")).await {
            Err(ApiError::Validation(msg)) => assert_eq!(msg, "Please enter a valid email address"),
            other => panic!("unexpected: {:?}", other.map(|a| a.id)),
        }
    }

    #[tokio::test]
    async fn signup_rejects_duplicate_email() {
        let store = MemoryAccountStore::new();
        signup(&store, signup_req("Ada", "ada@example.com", "123456", "123456"))
            .await
            .unwrap();
        let err = signup(&store, signup_req("Ada Two", " ADA@example.com", "abcdef", "abcdef"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::DuplicateEmail));
    }

    #[tokio::test]
    async fn login_hides_account_existence() {
        let store = MemoryAccountStore::new();
        let keys = keys();
        signup(&store, signup_req("Ada", "ada@example.com", "123456", "123456"))
            .await
            .unwrap();

        let unknown = login(&store, &keys, login_req("nobody@example.com", "123456"))
            .await
            .err()
            .unwrap();
        let wrong = login(&store, &keys, login_req("ada@example.com", "654321"))
            .await
            .err()
            .unwrap();
        assert!(matches!(unknown, ApiError::InvalidCredentials));
        assert!(matches!(wrong, ApiError::InvalidCredentials));
        assert_eq!(unknown.status_code(), wrong.status_code());
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let store = MemoryAccountStore::new();
        let req = LoginRequest {
            email: Some("ada@example.com".into()),
            password: None,
        };
        assert!(matches!(
            login(&store, &keys(), req).await,
            Err(ApiError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn login_refuses_deactivated_account() {
        let store = MemoryAccountStore::new();
        let created = signup(&store, signup_req("Ada", "ada@example.com", "123456", "123456"))
            .await
            .unwrap();
        store
            .set_status(created.id, AccountStatus::Inactive)
            .await
            .unwrap();

        assert!(matches!(
            login(&store, &keys(), login_req("ada@example.com", "123456")).await,
            Err(ApiError::AccountDeactivated)
        ));
    }

    /// Deactivates the account right after handing out the (still active)
    /// snapshot, as an admin acting mid-login would.
    struct DeactivateAfterLookup(MemoryAccountStore);

    #[async_trait::async_trait]
    impl AccountStore for DeactivateAfterLookup {
        async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
            let snapshot = self.0.find_by_email(email).await?;
            if let Some(account) = &snapshot {
                self.0.set_status(account.id, AccountStatus::Inactive).await?;
            }
            Ok(snapshot)
        }
        async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
            self.0.find_by_id(id).await
        }
        async fn create(&self, new: NewAccount) -> StoreResult<Account> {
            self.0.create(new).await
        }
        async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> StoreResult<Option<Account>> {
            self.0.record_login(id, at).await
        }
        async fn set_status(&self, id: Uuid, status: AccountStatus) -> StoreResult<Option<Account>> {
            self.0.set_status(id, status).await
        }
        async fn update_details(
            &self,
            id: Uuid,
            full_name: Option<&str>,
            password_hash: Option<&str>,
        ) -> StoreResult<Option<Account>> {
            self.0.update_details(id, full_name, password_hash).await
        }
        async fn count(&self) -> StoreResult<u64> {
            self.0.count().await
        }
        async fn find_page(&self, skip: u64, limit: u64) -> StoreResult<Vec<Account>> {
            self.0.find_page(skip, limit).await
        }
    }

    #[tokio::test]
    async fn login_does_not_undo_concurrent_deactivation() {
        let store = DeactivateAfterLookup(MemoryAccountStore::new());
        let created = signup(&store.0, signup_req("Ada", "ada@example.com", "123456", "123456"))
            .await
            .unwrap();

        let outcome = login(&store, &keys(), login_req("ada@example.com", "123456"))
            .await
            .unwrap();
        assert_eq!(outcome.account.status, AccountStatus::Inactive);

        let stored = store.0.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AccountStatus::Inactive);
        assert!(stored.last_login_at.is_some());
    }

    #[tokio::test]
    async fn profile_update_keeps_concurrent_status_change() {
        let store = MemoryAccountStore::new();
        let created = signup(&store, signup_req("Ada", "ada@example.com", "123456", "123456"))
            .await
            .unwrap();
        store
            .set_status(created.id, AccountStatus::Inactive)
            .await
            .unwrap();

        let updated = update_profile(
            &store,
            created.id,
            UpdateProfileRequest {
                current_password: Some("123456".into()),
                new_password: Some("abcdef".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.status, AccountStatus::Inactive);
    }

    #[tokio::test]
    async fn profile_update_changes_name_without_rehash() {
        let store = MemoryAccountStore::new();
        let created = signup(&store, signup_req("Ada", "ada@example.com", "123456", "123456"))
            .await
            .unwrap();
        let before = store.find_by_id(created.id).await.unwrap().unwrap();

        let updated = update_profile(
            &store,
            created.id,
            UpdateProfileRequest {
                full_name: Some("  Ada Lovelace ".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.full_name, "Ada Lovelace");

        let after = store.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(before.password_hash, after.password_hash);
    }

    #[tokio::test]
    async fn profile_password_change_rules() {
        let store = MemoryAccountStore::new();
        let keys = keys();
        let created = signup(&store, signup_req("Ada", "ada@example.com", "123456", "123456"))
            .await
            .unwrap();

        let err = update_profile(
            &store,
            created.id,
            UpdateProfileRequest {
                new_password: Some("abcdef".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::CurrentPasswordRequired));

        let err = update_profile(
            &store,
            created.id,
            UpdateProfileRequest {
                current_password: Some("wrong!".into()),
                new_password: Some("abcdef".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidCurrentPassword));

        let err = update_profile(
            &store,
            created.id,
            UpdateProfileRequest {
                current_password: Some("123456".into()),
                new_password: Some("abc".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::WeakPassword));

        update_profile(
            &store,
            created.id,
            UpdateProfileRequest {
                current_password: Some("123456".into()),
                new_password: Some("abcdef".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(login(&store, &keys, login_req("ada@example.com", "123456")).await.is_err());
        assert!(login(&store, &keys, login_req("ada@example.com", "abcdef")).await.is_ok());
    }

    #[tokio::test]
    async fn profile_update_validates_name() {
        let store = MemoryAccountStore::new();
        let created = signup(&store, signup_req("Ada", "ada@example.com", "123456", "123456"))
            .await
            .unwrap();
        let err = update_profile(
            &store,
            created.id,
            UpdateProfileRequest {
                full_name: Some("x".repeat(51)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
