//! Lazy, page-budgeted iteration over the leave record source.

use leavesync_core::{AppError, AppResult};
use leavesync_domain::LeaveRecord;
use tracing::debug;

use crate::sync_ports::{LeavePageRequest, LeaveQuery, LeaveRecordSource};

/// Walks the leave record listing one page at a time.
///
/// Pages are only requested when [`LeaveRecordPager::next_page`] is awaited.
/// Fetching more than `max_pages` pages is an error, and so is a cursor that
/// repeats the one just used.
pub struct LeaveRecordPager<'a> {
    source: &'a dyn LeaveRecordSource,
    query: LeaveQuery,
    max_pages: u32,
    pages_fetched: u32,
    cursor: Option<String>,
    exhausted: bool,
}

impl<'a> LeaveRecordPager<'a> {
    /// Creates a pager positioned before the first page.
    #[must_use]
    pub fn new(source: &'a dyn LeaveRecordSource, query: LeaveQuery, max_pages: u32) -> Self {
        Self {
            source,
            query,
            max_pages,
            pages_fetched: 0,
            cursor: None,
            exhausted: false,
        }
    }

    /// Returns the number of pages fetched since the last restart.
    #[must_use]
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Rewinds to the first page.
    pub fn restart(&mut self) {
        self.pages_fetched = 0;
        self.cursor = None;
        self.exhausted = false;
    }

    /// Fetches the next page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> AppResult<Option<Vec<LeaveRecord>>> {
        if self.exhausted {
            return Ok(None);
        }

        if self.pages_fetched >= self.max_pages {
            return Err(AppError::Upstream(format!(
                "leave record listing exceeded the page budget of {} pages",
                self.max_pages
            )));
        }

        let request = LeavePageRequest {
            query: self.query.clone(),
            cursor: self.cursor.clone(),
        };
        let page = self.source.fetch_page(&request).await?;
        self.pages_fetched = self.pages_fetched.saturating_add(1);

        debug!(
            page = self.pages_fetched,
            record_count = page.records.len(),
            has_next = page.next_cursor.is_some(),
            "fetched leave record page"
        );

        match page.next_cursor {
            Some(next_cursor) if self.cursor.as_deref() == Some(next_cursor.as_str()) => {
                return Err(AppError::Upstream(format!(
                    "leave record listing returned the same cursor '{next_cursor}' twice"
                )));
            }
            Some(next_cursor) => self.cursor = Some(next_cursor),
            None => {
                self.cursor = None;
                self.exhausted = true;
            }
        }

        Ok(Some(page.records))
    }

    /// Drains the remaining pages into one vector.
    pub async fn collect_remaining(&mut self) -> AppResult<Vec<LeaveRecord>> {
        let mut records = Vec::new();
        while let Some(page) = self.next_page().await? {
            records.extend(page);
        }

        Ok(records)
    }
}
