use backoffice_core::{DomainError, DomainResult};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Current page, page size and the total reported by the server.
///
/// `page` is 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    page_size: u32,
    default_page_size: u32,
    total: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
            default_page_size: DEFAULT_PAGE_SIZE,
            total: 0,
        }
    }
}

impl Pagination {
    pub fn new(page_size: u32) -> DomainResult<Self> {
        if page_size == 0 {
            return Err(DomainError::validation("page size must be greater than zero"));
        }
        Ok(Self {
            page_size,
            default_page_size: page_size,
            ..Self::default()
        })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page;
    }

    /// Change the page size; the first page is shown again.
    pub fn set_page_size(&mut self, page_size: u32) -> DomainResult<()> {
        if page_size == 0 {
            return Err(DomainError::validation("page size must be greater than zero"));
        }
        self.page_size = page_size;
        self.page = 0;
        Ok(())
    }

    /// Record the total from a successful fetch.
    ///
    /// Returns whether the current page is still addressable. When it is
    /// not, the owner must [`reset`](Self::reset) before fetching again.
    pub fn set_total(&mut self, total: u64) -> bool {
        self.total = total;
        self.is_valid()
    }

    /// Back to the first page with the default size. The known total is kept.
    pub fn reset(&mut self) {
        self.page = 0;
        self.page_size = self.default_page_size;
    }

    /// Back to the first page, keeping the chosen page size.
    pub fn first_page(&mut self) {
        self.page = 0;
    }

    pub fn page_count(&self) -> u64 {
        self.total.div_ceil(u64::from(self.page_size))
    }

    /// Page 0 is always valid (an empty list still has a first page).
    pub fn is_valid(&self) -> bool {
        self.page == 0 || u64::from(self.page) < self.page_count()
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) + 1 < self.page_count()
    }

    /// Advance one page without resetting anything else.
    ///
    /// Returns `false` (and stays put) on the last page.
    pub fn advance(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.page += 1;
        true
    }
}
