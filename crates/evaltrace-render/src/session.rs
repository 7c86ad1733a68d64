//! Per-render consumption state.
//!
//! A [`RenderSession`] owns one read cursor per tag. The k-th visit to a node
//! during a render consumes exactly the k-th record appended for its tag.
//! Sessions never write to the store, so any number of them can replay the
//! same finished [`TraceStore`] independently.

use std::collections::HashMap;

use evaltrace_core::NodeTag;

use crate::store::{EvalRecord, TraceStore};

/// Where a session stands on one tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// The evaluator never appended a record for this tag.
    Unregistered,
    /// Records exist but this session has consumed all of them.
    Exhausted,
    /// This many records are still unread.
    Pending(usize),
}

#[derive(Debug)]
pub struct RenderSession<'s> {
    store: &'s TraceStore,
    cursors: HashMap<NodeTag, usize>,
    consumed: usize,
}

impl<'s> RenderSession<'s> {
    pub fn new(store: &'s TraceStore) -> Self {
        RenderSession {
            store,
            cursors: HashMap::new(),
            consumed: 0,
        }
    }

    /// Consumes and returns the next unread record for `tag`.
    pub fn next(&mut self, tag: NodeTag) -> Option<&'s EvalRecord> {
        let records = self.store.lookup(tag)?;
        let cursor = self.cursors.entry(tag).or_insert(0);
        match records.get(*cursor) {
            Some(record) => {
                *cursor += 1;
                self.consumed += 1;
                Some(record)
            }
            None => {
                tracing::trace!("tag {} read past its {} record(s)", tag, records.len());
                None
            }
        }
    }

    /// Returns the next unread record for `tag` without consuming it.
    pub fn peek(&self, tag: NodeTag) -> Option<&'s EvalRecord> {
        let records = self.store.lookup(tag)?;
        records.get(self.position(tag))
    }

    pub fn cursor(&self, tag: NodeTag) -> Cursor {
        match self.store.lookup(tag) {
            None => Cursor::Unregistered,
            Some(records) => match records.len().saturating_sub(self.position(tag)) {
                0 => Cursor::Exhausted,
                n => Cursor::Pending(n),
            },
        }
    }

    /// Total records for `tag`, consumed or not.
    pub fn record_count(&self, tag: NodeTag) -> usize {
        self.store.record_count(tag)
    }

    /// Number of records this session has consumed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    fn position(&self, tag: NodeTag) -> usize {
        self.cursors.get(&tag).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TraceStore {
        let mut store = TraceStore::new();
        store.append(NodeTag(0), EvalRecord::scalar(1));
        store.append(NodeTag(0), EvalRecord::scalar(2));
        store
    }

    #[test]
    fn next_consumes_in_append_order() {
        let store = store();
        let mut session = RenderSession::new(&store);
        assert_eq!(session.next(NodeTag(0)), Some(&EvalRecord::scalar(1)));
        assert_eq!(session.next(NodeTag(0)), Some(&EvalRecord::scalar(2)));
        assert_eq!(session.next(NodeTag(0)), None);
        assert_eq!(session.consumed(), 2);
    }

    #[test]
    fn peek_does_not_advance() {
        let store = store();
        let mut session = RenderSession::new(&store);
        assert_eq!(session.peek(NodeTag(0)), Some(&EvalRecord::scalar(1)));
        assert_eq!(session.peek(NodeTag(0)), Some(&EvalRecord::scalar(1)));
        session.next(NodeTag(0));
        assert_eq!(session.peek(NodeTag(0)), Some(&EvalRecord::scalar(2)));
    }

    #[test]
    fn cursor_distinguishes_unregistered_from_exhausted() {
        let store = store();
        let mut session = RenderSession::new(&store);
        assert_eq!(session.cursor(NodeTag(9)), Cursor::Unregistered);
        assert_eq!(session.cursor(NodeTag(0)), Cursor::Pending(2));
        session.next(NodeTag(0));
        session.next(NodeTag(0));
        assert_eq!(session.cursor(NodeTag(0)), Cursor::Exhausted);
        assert_eq!(session.record_count(NodeTag(0)), 2);
    }

    #[test]
    fn sessions_are_independent() {
        let store = store();
        let mut a = RenderSession::new(&store);
        let mut b = RenderSession::new(&store);
        a.next(NodeTag(0));
        assert_eq!(b.next(NodeTag(0)), Some(&EvalRecord::scalar(1)));
        assert_eq!(a.next(NodeTag(0)), Some(&EvalRecord::scalar(2)));
    }
}
