use common::UserId;
use domain::BookingStatus;

/// Builder for listing bookings.
///
/// Results are ordered newest first (`created_at` descending).
#[derive(Debug, Clone, Default)]
pub struct BookingQuery {
    /// Filter by owning user.
    pub user_id: Option<UserId>,

    /// Filter by booking status.
    pub status: Option<BookingStatus>,

    /// Maximum number of bookings to return.
    pub limit: Option<usize>,

    /// Number of bookings to skip.
    pub offset: Option<usize>,
}

impl BookingQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for one user's bookings.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    /// Filters by booking status.
    pub fn status(mut self, status: BookingStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Selects a 1-based page of `per_page` results.
    ///
    /// Pages too far out to address saturate the offset and come back empty.
    pub fn page(self, page: usize, per_page: usize) -> Self {
        self.offset(page.saturating_sub(1).saturating_mul(per_page))
            .limit(per_page)
    }

    /// Same filters, no paging. Used for counting.
    pub fn without_paging(&self) -> Self {
        Self {
            limit: None,
            offset: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_translates_to_offset_and_limit() {
        let query = BookingQuery::new().page(3, 10);
        assert_eq!(query.offset, Some(20));
        assert_eq!(query.limit, Some(10));
    }

    #[test]
    fn page_zero_is_first_page() {
        let query = BookingQuery::new().page(0, 10);
        assert_eq!(query.offset, Some(0));
    }

    #[test]
    fn huge_page_saturates_offset() {
        let query = BookingQuery::new().page(usize::MAX, 10);
        assert_eq!(query.offset, Some(usize::MAX));
        assert_eq!(query.limit, Some(10));
    }

    #[test]
    fn without_paging_keeps_filters() {
        let user = UserId::new();
        let query = BookingQuery::for_user(user)
            .status(BookingStatus::Cancelled)
            .page(2, 5)
            .without_paging();
        assert_eq!(query.user_id, Some(user));
        assert_eq!(query.status, Some(BookingStatus::Cancelled));
        assert!(query.limit.is_none() && query.offset.is_none());
    }
}
