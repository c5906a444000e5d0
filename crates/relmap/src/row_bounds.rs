//! Row windows for paginated and cursor-style reads.

/// An `(offset, limit)` window bounding which rows of a result are surfaced.
///
/// The default window starts at row zero with no effective limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBounds {
    /// Number of leading rows to skip.
    pub offset: usize,
    /// Maximum number of rows to deliver after the offset.
    pub limit: usize,
}

/// No-limit sentinel used by the default window.
pub const NO_ROW_LIMIT: usize = usize::MAX;

impl RowBounds {
    /// Create a window with the given offset and limit.
    #[must_use]
    pub const fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// The index one past the last deliverable row, saturating.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset.saturating_add(self.limit)
    }
}

impl Default for RowBounds {
    fn default() -> Self {
        Self { offset: 0, limit: NO_ROW_LIMIT }
    }
}
