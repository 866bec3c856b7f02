//! Pagination utilities for vscore-report
//!
//! Listing endpoints take a 1-indexed `page` and a `limit` (default 10,
//! max 100). A page past the end is served as an empty page rather than
//! clamped, and an empty result set still reports one page.

use serde::{Deserialize, Serialize};

/// Default rows per page
pub const DEFAULT_LIMIT: i64 = 10;

/// Largest accepted page size
pub const MAX_LIMIT: i64 = 100;

/// Raw `page` / `limit` query parameters
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageParams {
    /// Reject out-of-range values with a message suitable for a 400
    pub fn validate(&self) -> Result<(), String> {
        if self.page < 1 {
            return Err(format!("page must be >= 1 (got {})", self.page));
        }
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(format!(
                "limit must be between 1 and {} (got {})",
                MAX_LIMIT, self.limit
            ));
        }
        if (self.page - 1).checked_mul(self.limit).is_none() {
            return Err(format!("page is too large (got {})", self.page));
        }
        Ok(())
    }

    /// SQL OFFSET for this page; saturates for params that failed validation
    pub fn offset(&self) -> i64 {
        self.page
            .saturating_sub(1)
            .max(0)
            .saturating_mul(self.limit.max(0))
    }
}

/// Pagination metadata returned with every listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// Requested page number (1-indexed)
    pub page: i64,
    pub limit: i64,
    pub total_items: i64,
    /// At least 1, even when there are no items
    pub total_pages: i64,
}

/// Calculate pagination metadata from total results and validated params
///
/// # Examples
/// ```
/// use vscore_report::pagination::{calculate_pagination, PageParams};
///
/// // 25 results, 10 per page = 3 pages
/// let p = calculate_pagination(25, &PageParams { page: 2, limit: 10 });
/// assert_eq!(p.total_pages, 3);
///
/// // no results still reports one page
/// let p = calculate_pagination(0, &PageParams::default());
/// assert_eq!(p.total_pages, 1);
/// ```
pub fn calculate_pagination(total_items: i64, params: &PageParams) -> Pagination {
    let total_pages = if total_items > 0 {
        (total_items + params.limit - 1) / params.limit
    } else {
        1
    };

    Pagination {
        page: params.page,
        limit: params.limit,
        total_items,
        total_pages,
    }
}
