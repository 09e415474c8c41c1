//! Page/limit arithmetic shared by list endpoints.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Normalized page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Clamp raw query values: page is at least 1, limit is within `1..=MAX_PAGE_LIMIT`.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }
}

/// Pagination block returned alongside a page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total: i64) -> Self {
        let limit = request.limit as i64;
        let total_pages = (total + limit - 1) / limit;
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages,
            has_next: (request.page as i64) < total_pages,
            has_prev: request.page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        assert_eq!(PageRequest::new(None, None), PageRequest { page: 1, limit: 10 });
        assert_eq!(PageRequest::new(Some(0), Some(0)), PageRequest { page: 1, limit: 1 });
        assert_eq!(PageRequest::new(Some(3), Some(500)).limit, MAX_PAGE_LIMIT);
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(Some(2), Some(10)).offset(), 10);
        assert_eq!(PageRequest::new(Some(1), Some(25)).offset(), 0);
    }

    #[test]
    fn test_total_pages_is_ceiling() {
        let req = PageRequest::new(Some(2), Some(10));
        assert_eq!(Pagination::new(req, 0).total_pages, 0);
        assert_eq!(Pagination::new(req, 10).total_pages, 1);
        assert_eq!(Pagination::new(req, 11).total_pages, 2);
        assert_eq!(Pagination::new(req, 25).total_pages, 3);
    }

    #[test]
    fn test_has_next_and_prev() {
        let p = Pagination::new(PageRequest::new(Some(2), Some(10)), 25);
        assert!(p.has_next);
        assert!(p.has_prev);

        let last = Pagination::new(PageRequest::new(Some(3), Some(10)), 25);
        assert!(!last.has_next);

        let first = Pagination::new(PageRequest::new(Some(1), Some(10)), 5);
        assert!(!first.has_prev);
        assert!(!first.has_next);
    }
}
