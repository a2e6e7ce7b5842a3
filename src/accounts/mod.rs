mod memory;
mod repo;
mod repo_types;

pub use memory::MemoryAccountStore;
pub use repo::{AccountStore, PgAccountStore, StoreError};
pub use repo_types::{
    normalize_email, validate_email, validate_full_name, Account, AccountStatus, NewAccount, PublicAccount, Role,
};
