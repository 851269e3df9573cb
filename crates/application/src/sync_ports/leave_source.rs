use async_trait::async_trait;
use chrono::NaiveDate;
use leavesync_core::AppResult;
use leavesync_domain::LeaveRecord;

/// Filter applied to every leave record listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveQuery {
    /// Records per page requested from the source.
    pub page_size: u32,
    /// Only leave starting on or after this date is requested.
    pub start_date_floor: NaiveDate,
}

/// One page request against the leave record source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeavePageRequest {
    /// Listing filter.
    pub query: LeaveQuery,
    /// Opaque continuation cursor, absent for the first page.
    pub cursor: Option<String>,
}

/// One page of leave records.
#[derive(Debug, Clone, Default)]
pub struct LeavePage {
    /// Records parsed from the page.
    pub records: Vec<LeaveRecord>,
    /// Cursor for the following page, absent when the listing is exhausted.
    pub next_cursor: Option<String>,
}

/// Port for the paginated HR time-off listing.
#[async_trait]
pub trait LeaveRecordSource: Send + Sync {
    /// Fetches one page of time-off records.
    async fn fetch_page(&self, request: &LeavePageRequest) -> AppResult<LeavePage>;
}
