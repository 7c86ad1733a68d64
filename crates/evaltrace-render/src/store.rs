//! The trace store: an append-only, tag-keyed ledger of evaluation records.
//!
//! The host evaluator appends one [`EvalRecord`] every time it actually
//! visits a non-literal node. Records for a tag keep their append order;
//! nothing is ever overwritten or removed. Once evaluation finishes the store
//! is only read, by any number of independent render sessions.

use std::borrow::Cow;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use evaltrace_core::{NodeTag, Value};

/// What the evaluator captured for one visit to one node.
///
/// The payload shape depends on the node kind: collections for arrays and
/// slices, aggregates for maps and pairs, an invocation count for calls
/// whose arguments include a closure, a scalar output for everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvalRecord {
    Scalar { output: Value },
    Collection { elements: Vec<Value> },
    Aggregate { value: Value },
    Call { output: Value, invocations: usize },
}

impl EvalRecord {
    pub fn scalar(output: impl Into<Value>) -> Self {
        EvalRecord::Scalar {
            output: output.into(),
        }
    }

    pub fn collection(elements: Vec<Value>) -> Self {
        EvalRecord::Collection { elements }
    }

    pub fn aggregate(value: impl Into<Value>) -> Self {
        EvalRecord::Aggregate {
            value: value.into(),
        }
    }

    pub fn call(output: impl Into<Value>, invocations: usize) -> Self {
        EvalRecord::Call {
            output: output.into(),
            invocations,
        }
    }

    /// The value this visit produced. Collections come back as an array.
    pub fn output(&self) -> Cow<'_, Value> {
        match self {
            EvalRecord::Scalar { output } | EvalRecord::Call { output, .. } => {
                Cow::Borrowed(output)
            }
            EvalRecord::Aggregate { value } => Cow::Borrowed(value),
            EvalRecord::Collection { elements } => Cow::Owned(Value::Array(elements.clone())),
        }
    }

    /// How many times a closure argument ran during this call; zero for
    /// every other payload.
    pub fn invocations(&self) -> usize {
        match self {
            EvalRecord::Call { invocations, .. } => *invocations,
            _ => 0,
        }
    }
}

/// Most nodes are visited once per evaluation.
type Records = SmallVec<[EvalRecord; 1]>;

/// Tag-keyed, append-only record ledger for one evaluation pass.
///
/// A retry of the same step gets a new store.
#[derive(Debug, Clone, Default)]
pub struct TraceStore {
    records: IndexMap<NodeTag, Records>,
}

impl TraceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record for `tag` after any already stored for it.
    pub fn append(&mut self, tag: NodeTag, record: EvalRecord) {
        self.records.entry(tag).or_default().push(record);
    }

    /// Returns every record for `tag` in append order, or `None` if the
    /// evaluator never visited it.
    pub fn lookup(&self, tag: NodeTag) -> Option<&[EvalRecord]> {
        self.records.get(&tag).map(|r| r.as_slice())
    }

    pub fn record_count(&self, tag: NodeTag) -> usize {
        self.records.get(&tag).map_or(0, |r| r.len())
    }

    /// Tags with at least one record, in order of first visit.
    pub fn tags(&self) -> impl Iterator<Item = NodeTag> + '_ {
        self.records.keys().copied()
    }

    /// Number of distinct tags with records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total number of records across all tags.
    pub fn total_records(&self) -> usize {
        self.records.values().map(|r| r.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_keeps_order_per_tag() {
        let mut store = TraceStore::new();
        store.append(NodeTag(3), EvalRecord::scalar(1));
        store.append(NodeTag(1), EvalRecord::scalar("a"));
        store.append(NodeTag(3), EvalRecord::scalar(2));

        assert_eq!(
            store.lookup(NodeTag(3)).unwrap(),
            &[EvalRecord::scalar(1), EvalRecord::scalar(2)]
        );
        assert_eq!(store.record_count(NodeTag(1)), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.total_records(), 3);
        assert_eq!(store.tags().collect::<Vec<_>>(), vec![NodeTag(3), NodeTag(1)]);
    }

    #[test]
    fn unknown_tag_is_not_found() {
        let store = TraceStore::new();
        assert!(store.lookup(NodeTag(0)).is_none());
        assert_eq!(store.record_count(NodeTag(0)), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn record_outputs() {
        assert_eq!(*EvalRecord::scalar(3).output(), Value::Int(3));
        assert_eq!(
            *EvalRecord::collection(vec![Value::Int(1)]).output(),
            Value::Array(vec![Value::Int(1)])
        );
        assert_eq!(*EvalRecord::aggregate(true).output(), Value::Bool(true));

        let call = EvalRecord::call(vec![2], 3);
        assert_eq!(call.invocations(), 3);
        assert_eq!(EvalRecord::scalar(1).invocations(), 0);
    }

    #[test]
    fn records_serialize_with_kind_tag() {
        let json = serde_json::to_string(&EvalRecord::call(true, 2)).unwrap();
        assert_eq!(json, r#"{"kind":"call","output":{"bool":true},"invocations":2}"#);
        let back: EvalRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EvalRecord::call(true, 2));
    }
}
