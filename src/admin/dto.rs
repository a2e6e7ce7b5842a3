use serde::{Deserialize, Serialize};

use crate::accounts::PublicAccount;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Raw `?page=&limit=` values; anything unusable falls back to the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl From<ListQuery> for Pagination {
    fn from(q: ListQuery) -> Self {
        fn positive(v: Option<String>, default: u64) -> u64 {
            v.and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(default)
        }
        Self {
            page: positive(q.page, DEFAULT_PAGE),
            page_size: positive(q.limit, DEFAULT_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_users: u64,
    pub users_per_page: u64,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub users: Vec<PublicAccount>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Serialize)]
pub struct StatusChangeResponse {
    pub success: bool,
    pub message: &'static str,
    pub user: PublicAccount,
}
