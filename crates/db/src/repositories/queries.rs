//! Single-statement data access.
//!
//! `Queries` borrows any sea-orm connection, so the same calls run against
//! the pool or inside an open transaction.

use sea_orm::ConnectionTrait;

/// Atomic single-statement operations over a borrowed connection.
#[derive(Debug)]
pub struct Queries<'c, C> {
    pub(crate) conn: &'c C,
}

impl<'c, C: ConnectionTrait> Queries<'c, C> {
    /// Wraps a connection or transaction.
    #[must_use]
    pub const fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// The wrapped connection.
    #[must_use]
    pub const fn connection(&self) -> &'c C {
        self.conn
    }
}

/// Page selection for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Maximum rows returned.
    pub limit: u64,
    /// Rows skipped.
    pub offset: u64,
}

impl Page {
    /// Page `page_id` (1-based) of `page_size` rows.
    #[must_use]
    pub const fn new(page_id: u64, page_size: u64) -> Self {
        Self {
            limit: page_size,
            offset: page_id.saturating_sub(1).saturating_mul(page_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Page;

    #[test]
    fn test_page_offsets() {
        assert_eq!(Page::new(1, 5), Page { limit: 5, offset: 0 });
        assert_eq!(Page::new(3, 10), Page { limit: 10, offset: 20 });
        assert_eq!(Page::new(0, 10).offset, 0);
    }
}
