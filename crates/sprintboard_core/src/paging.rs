use crate::error::AppError;

/// Every page after the first advances by this many records.
pub const FOLLOW_UP_PAGE_SIZE: usize = 5;

/// Half-open range `[from, to)` of the created-at-descending record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: usize,
    pub from: usize,
    pub to: usize,
}

impl PageWindow {
    /// Window for `page`. The first page holds `first_page_size` records so it
    /// can fill the screen; later pages always hold `FOLLOW_UP_PAGE_SIZE`.
    pub fn for_page(page: usize, first_page_size: usize) -> Result<Self, AppError> {
        if first_page_size == 0 {
            return Err(AppError::validation("first page size must be positive"));
        }

        if page == 0 {
            return Ok(Self {
                page,
                from: 0,
                to: first_page_size,
            });
        }

        let from = (page - 1)
            .checked_mul(FOLLOW_UP_PAGE_SIZE)
            .and_then(|offset| offset.checked_add(first_page_size))
            .ok_or_else(|| AppError::validation("page number is out of range"))?;
        let to = from
            .checked_add(FOLLOW_UP_PAGE_SIZE)
            .ok_or_else(|| AppError::validation("page number is out of range"))?;

        Ok(Self { page, from, to })
    }

    /// Whether records remain past this window.
    pub fn has_more(&self, total_count: usize) -> bool {
        total_count > self.to
    }
}
