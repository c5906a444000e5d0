//! Lazy, single-consumer result cursors.

use std::sync::Arc;

use relmap_core::Value;
use relmap_driver::{RowStream, Statement};

use crate::error::{Error, Result};
use crate::mapping::ResultMap;
use crate::result_set::ResultSetHandler;
use crate::row_bounds::RowBounds;

/// Lifecycle of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    /// No rows fetched yet.
    Created,
    /// At least one fetch has happened and the stream is live.
    Open,
    /// Closed before the window was drained.
    Closed,
    /// Fully drained; implies closed.
    Consumed,
}

/// A forward-only cursor over a driver result stream.
///
/// Exactly one iterator may ever be obtained from a cursor, and a cursor is
/// not safe for concurrent use. Rows before the window's offset are pulled
/// and discarded; the cursor closes itself once the window or the stream is
/// exhausted, and [`Drop`] closes it on early abandonment.
pub struct DefaultCursor {
    handler: ResultSetHandler,
    result_map: Arc<ResultMap>,
    stream: Option<Box<dyn RowStream>>,
    statement: Option<Box<dyn Statement>>,
    bounds: RowBounds,
    state: CursorState,
    iterator_issued: bool,
    delivered: usize,
    skipped: bool,
}

impl DefaultCursor {
    /// Wrap an open stream and its owning statement.
    #[must_use]
    pub fn new(
        handler: ResultSetHandler,
        result_map: Arc<ResultMap>,
        stream: Box<dyn RowStream>,
        statement: Box<dyn Statement>,
        bounds: RowBounds,
    ) -> Self {
        Self {
            handler,
            result_map,
            stream: Some(stream),
            statement: Some(statement),
            bounds,
            state: CursorState::Created,
            iterator_issued: false,
            delivered: 0,
            skipped: false,
        }
    }

    /// Returns `true` while rows are being fetched and the stream is live.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == CursorState::Open
    }

    /// Returns `true` once the window or stream has been fully drained.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.state == CursorState::Consumed
    }

    /// The absolute index of the last delivered row, or −1 before the first.
    #[must_use]
    pub fn current_index(&self) -> i64 {
        if self.delivered == 0 {
            -1
        } else {
            (self.bounds.offset + self.delivered - 1) as i64
        }
    }

    /// Obtain the cursor's one iterator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] if an iterator was already obtained, or if
    /// the cursor is closed or consumed.
    pub fn iterator(&mut self) -> Result<CursorIterator<'_>> {
        if self.iterator_issued {
            return Err(Error::state("a cursor can only be iterated once"));
        }
        if matches!(self.state, CursorState::Closed | CursorState::Consumed) {
            return Err(Error::state("cannot iterate a closed cursor"));
        }
        self.iterator_issued = true;
        Ok(CursorIterator { cursor: self })
    }

    /// Close the cursor, releasing the stream and statement.
    ///
    /// Idempotent; close failures from the driver are suppressed. A cursor
    /// closed here before being drained stays `Closed`, never `Consumed`.
    pub fn close(&mut self) {
        self.terminate(CursorState::Closed);
    }

    fn terminate(&mut self, state: CursorState) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.close();
        }
        if let Some(mut statement) = self.statement.take() {
            let _ = statement.close();
        }
        if !matches!(self.state, CursorState::Closed | CursorState::Consumed) {
            self.state = state;
        }
    }

    fn pull(&mut self) -> Result<Option<Value>> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        self.handler.fetch_one(stream.as_mut(), &self.result_map)
    }

    /// Fetch the next row within the window.
    fn fetch_next(&mut self) -> Result<Option<Value>> {
        if matches!(self.state, CursorState::Closed | CursorState::Consumed) {
            return Ok(None);
        }
        self.state = CursorState::Open;

        if !self.skipped {
            self.skipped = true;
            for _ in 0..self.bounds.offset {
                match self.pull() {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        self.terminate(CursorState::Consumed);
                        return Ok(None);
                    }
                    Err(e) => {
                        self.terminate(CursorState::Closed);
                        return Err(e);
                    }
                }
            }
        }

        if self.delivered >= self.bounds.limit {
            self.terminate(CursorState::Consumed);
            return Ok(None);
        }

        match self.pull() {
            Ok(Some(row)) => {
                self.delivered += 1;
                if self.delivered >= self.bounds.limit {
                    // Window exhausted with this delivery.
                    self.terminate(CursorState::Consumed);
                }
                Ok(Some(row))
            }
            Ok(None) => {
                self.terminate(CursorState::Consumed);
                Ok(None)
            }
            Err(e) => {
                self.terminate(CursorState::Closed);
                Err(e)
            }
        }
    }
}

impl Drop for DefaultCursor {
    fn drop(&mut self) {
        self.close();
    }
}

/// The single iterator of a [`DefaultCursor`].
pub struct CursorIterator<'a> {
    cursor: &'a mut DefaultCursor,
}

impl CursorIterator<'_> {
    /// See [`DefaultCursor::current_index`].
    #[must_use]
    pub fn current_index(&self) -> i64 {
        self.cursor.current_index()
    }

    /// See [`DefaultCursor::is_consumed`].
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.cursor.is_consumed()
    }
}

impl Iterator for CursorIterator<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.fetch_next().transpose()
    }
}
