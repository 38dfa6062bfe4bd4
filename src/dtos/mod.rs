pub mod product;
pub mod stock;
pub mod transaction;
pub mod user;

use serde::Deserialize;

const MAX_PAGE_SIZE: i64 = 100;

/// `?page=&limit=` query parameters, 1-based.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    /// Returns `(limit, offset)` with both values clamped to sane ranges.
    pub fn limit_offset(&self, default_limit: i64) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE);
        (limit, (page - 1) * limit)
    }
}
