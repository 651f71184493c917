use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct Pagination {
    #[param(default = 1, minimum = 1)]
    pub page: Option<u64>,
    #[param(default = 10, minimum = 1, maximum = 100)]
    pub limit: Option<u64>,
}

impl Pagination {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total_items: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub page_size: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total_items: u64, page: u64, page_size: u64) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total_items.div_ceil(page_size)
        };

        Self {
            data,
            total_items,
            total_pages,
            current_page: page,
            page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped() {
        let p = Pagination { page: Some(0), limit: Some(1_000) };
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), MAX_PAGE_SIZE);

        let p = Pagination::default();
        assert_eq!(p.limit(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page: PaginatedResponse<u8> = PaginatedResponse::new(vec![], 21, 1, 10);
        assert_eq!(page.total_pages, 3);
    }
}
