//! Dashboard pagination arithmetic

/// Position within a paged listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based
    pub current_page: u64,
    pub total_count: u64,
    pub page_size: u64,
}

impl Pagination {
    /// `current_page` is clamped to the pages that exist, so past-the-end
    /// requests land on the last page
    pub fn new(current_page: u64, total_count: u64, page_size: u64) -> Self {
        let page_size = page_size.max(1);
        let last_page = total_count.div_ceil(page_size).max(1);
        Self {
            current_page: current_page.clamp(1, last_page),
            total_count,
            page_size,
        }
    }

    /// Row offset of a 1-based page, saturating on absurd page numbers
    pub fn offset_for(page: u64, page_size: u64) -> u64 {
        page.saturating_sub(1).saturating_mul(page_size)
    }

    pub fn total_pages(&self) -> u64 {
        self.total_count.div_ceil(self.page_size)
    }

    /// Page count shown in "Page x of y"; never zero
    pub fn display_pages(&self) -> u64 {
        self.total_pages().max(1)
    }

    pub fn offset(&self) -> u64 {
        Self::offset_for(self.current_page, self.page_size)
    }

    pub fn start_item(&self) -> u64 {
        self.offset().saturating_add(1)
    }

    pub fn end_item(&self) -> u64 {
        self.current_page
            .saturating_mul(self.page_size)
            .min(self.total_count)
    }

    pub fn summary(&self) -> String {
        if self.total_count == 0 {
            "No articles found".to_string()
        } else {
            format!(
                "Showing {} to {} of {} articles",
                self.start_item(),
                self.end_item(),
                self.total_count
            )
        }
    }

    pub fn previous_page(&self) -> u64 {
        self.current_page.saturating_sub(1).max(1)
    }

    pub fn next_page(&self) -> u64 {
        self.current_page.saturating_add(1).min(self.display_pages())
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages()
    }
}
