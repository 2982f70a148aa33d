use crate::error::AppError;
use crate::model::Task;
use crate::paging::PageWindow;
use crate::storage::{TaskFilter, TaskRange, TaskStore};

/// One fetched page: the flat records in created-at-descending order.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub window: PageWindow,
    pub records: Vec<Task>,
    pub total_count: usize,
    pub has_more: bool,
}

/// Fetch page `page` of the (optionally sprint-filtered) task list.
pub fn fetch_page<S: TaskStore + ?Sized>(
    store: &S,
    page: usize,
    first_page_size: usize,
    sprint_filter: Option<&str>,
) -> Result<Page, AppError> {
    let window = PageWindow::for_page(page, first_page_size)?;
    let filter = TaskFilter {
        sprint_id: sprint_filter.map(str::to_string),
    };

    let listing = store
        .list_tasks(&filter, TaskRange::new(window.from, window.to))
        .map_err(|err| match err {
            AppError::FetchFailed(_) => err,
            other => AppError::fetch(other.message().to_string()),
        })?;
    let has_more = window.has_more(listing.total_count);

    tracing::debug!(
        page,
        from = window.from,
        to = window.to,
        fetched = listing.records.len(),
        total = listing.total_count,
        has_more,
        sprint = sprint_filter.unwrap_or("-"),
        "fetched task page"
    );

    Ok(Page {
        window,
        records: listing.records,
        total_count: listing.total_count,
        has_more,
    })
}
