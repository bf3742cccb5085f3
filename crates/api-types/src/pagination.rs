//! Pagination parameters and the `meta.pagination` block.

use serde::{Deserialize, Serialize};

/// Client-requested page, in either of the two supported styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageParams {
    /// `page[number]` / `page[size]`, 1-based.
    Number { number: u64, size: u64 },
    /// `page[offset]` / `page[limit]`, 0-based offset.
    Offset { offset: u64, limit: u64 },
}

impl PageParams {
    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        match *self {
            PageParams::Number { number, size } => number.saturating_sub(1) * size,
            PageParams::Offset { offset, .. } => offset,
        }
    }

    /// Page size.
    pub fn size(&self) -> u64 {
        match *self {
            PageParams::Number { size, .. } => size,
            PageParams::Offset { limit, .. } => limit,
        }
    }

    /// 1-based page number, derived for the offset style.
    pub fn number(&self) -> u64 {
        match *self {
            PageParams::Number { number, .. } => number,
            PageParams::Offset { offset, limit } => {
                if limit == 0 {
                    1
                } else {
                    offset / limit + 1
                }
            }
        }
    }
}

/// The `meta.pagination` block on paged collection documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub total: u64,
    pub count: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    /// Compute the block for a page of `count` rows out of `total`.
    pub fn compute(total: u64, count: u64, page: &PageParams) -> Self {
        let per_page = page.size();
        let total_pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page)
        };
        Self {
            total,
            count,
            per_page,
            current_page: page.number(),
            total_pages,
        }
    }
}

/// Format a page link in the `?page[number]=N&page[size]=S` style.
pub fn page_link(base: &str, number: u64, size: u64) -> String {
    format!("{base}?page[number]={number}&page[size]={size}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_style_offsets() {
        let page = PageParams::Number { number: 3, size: 10 };
        assert_eq!(page.offset(), 20);
        assert_eq!(page.size(), 10);
        assert_eq!(page.number(), 3);
    }

    #[test]
    fn offset_style_page_number() {
        let page = PageParams::Offset { offset: 40, limit: 20 };
        assert_eq!(page.number(), 3);
        assert_eq!(page.offset(), 40);
    }

    #[test]
    fn meta_rounds_total_pages_up() {
        let page = PageParams::Number { number: 1, size: 10 };
        let meta = PaginationMeta::compute(31, 10, &page);
        assert_eq!(meta.total_pages, 4);
        assert_eq!(meta.current_page, 1);
        assert_eq!(meta.per_page, 10);

        let empty = PaginationMeta::compute(0, 0, &page);
        assert_eq!(empty.total_pages, 0);
    }
}
