//! Pagination types shared by the listing endpoints.

use serde::{Deserialize, Serialize};

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A validated, 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Clamp raw query values: page to at least 1, size to 1..=MAX_PAGE_SIZE.
    pub fn new(page: Option<u32>, page_size: Option<u32>, default_size: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.unwrap_or(default_size).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

/// Raw `page` / `pageSize` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default, alias = "limit")]
    pub page_size: Option<u32>,
}

/// One page of results plus the total across all pages.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: i64,
}

impl<T: Serialize> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let size = i64::from(request.page_size);
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
            total_pages: (total + size - 1) / size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamping() {
        let req = PageRequest::new(Some(0), Some(1000), 20);
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, MAX_PAGE_SIZE);

        let req = PageRequest::new(None, Some(0), 20);
        assert_eq!(req.page_size, 1);

        let req = PageRequest::new(None, None, 20);
        assert_eq!((req.page, req.page_size), (1, 20));
    }

    #[test]
    fn test_offset_and_total_pages() {
        let req = PageRequest::new(Some(3), Some(10), 20);
        assert_eq!(req.offset(), 20);

        let page: Page<i32> = Page::new(vec![], 21, req);
        assert_eq!(page.total_pages, 3);

        let empty: Page<i32> = Page::new(vec![], 0, req);
        assert_eq!(empty.total_pages, 0);
    }
}
