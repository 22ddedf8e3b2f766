//! Common types used across the system

use serde::{Deserialize, Serialize};

const MAX_PER_PAGE: u32 = 200;

/// Pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
        }
    }
}

impl Pagination {
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page.clamp(1, MAX_PER_PAGE))
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * self.limit()
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, pagination: Pagination, total_items: u64) -> Self {
        let per_page = pagination.limit() as u64;
        let total_pages = total_items.div_ceil(per_page) as u32;
        Self {
            data,
            pagination: PaginationMeta {
                page: pagination.page.max(1),
                per_page: per_page as u32,
                total_items,
                total_pages,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_offsets() {
        let p = Pagination { page: 3, per_page: 20 };
        assert_eq!(p.limit(), 20);
        assert_eq!(p.offset(), 40);

        let clamped = Pagination { page: 0, per_page: 10_000 };
        assert_eq!(clamped.limit(), 200);
        assert_eq!(clamped.offset(), 0);
    }

    #[test]
    fn test_total_pages() {
        let r = PaginatedResponse::new(vec![1, 2], Pagination { page: 1, per_page: 2 }, 5);
        assert_eq!(r.pagination.total_pages, 3);
    }
}
