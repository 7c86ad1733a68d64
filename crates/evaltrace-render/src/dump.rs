//! Trace dump files.
//!
//! A [`TraceDump`] bundles an expression tree with the records one
//! evaluation produced, as JSON. Tags are pre-order indices, so re-tagging
//! the loaded tree reproduces the numbering the records were keyed by.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use evaltrace_core::{Node, NodeTag};

use crate::error::TraceError;
use crate::render::{render, RenderOptions};
use crate::store::{EvalRecord, TraceStore};
use crate::tagger::{tag, TagTable};
use crate::tree::TreeNode;

/// Errors reading, writing or replaying a trace dump.
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid trace dump: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record for tag {tag}, but the expression has only {nodes} nodes")]
    UnknownTag { tag: NodeTag, nodes: usize },

    #[error(transparent)]
    Trace(#[from] TraceError),
}

/// One appended record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpEntry {
    pub tag: NodeTag,
    pub record: EvalRecord,
}

/// An expression and its evaluation records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceDump {
    pub expr: Node,
    #[serde(default)]
    pub records: Vec<DumpEntry>,
}

impl TraceDump {
    /// Captures `store`, which must be keyed by tags of `expr`.
    ///
    /// Entries are grouped by tag in first-visit order; per-tag order is all
    /// that replay depends on.
    pub fn capture(expr: &Node, store: &TraceStore) -> Self {
        let records = store
            .tags()
            .flat_map(|tag| {
                store
                    .lookup(tag)
                    .unwrap_or_default()
                    .iter()
                    .map(move |record| DumpEntry {
                        tag,
                        record: record.clone(),
                    })
            })
            .collect();
        TraceDump {
            expr: expr.clone(),
            records,
        }
    }

    pub fn from_json(text: &str) -> Result<Self, DumpError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, DumpError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DumpError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DumpError> {
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    /// Rebuilds the trace store against `tags`, which must come from tagging
    /// this dump's `expr`.
    pub fn replay(&self, tags: &TagTable<'_>) -> Result<TraceStore, DumpError> {
        let mut store = TraceStore::new();
        for entry in &self.records {
            if entry.tag.index() >= tags.len() {
                return Err(DumpError::UnknownTag {
                    tag: entry.tag,
                    nodes: tags.len(),
                });
            }
            store.append(entry.tag, entry.record.clone());
        }
        Ok(store)
    }

    /// Tags, replays and renders this dump in one step.
    pub fn render(&self, options: RenderOptions<'_>) -> Result<TreeNode, DumpError> {
        let tags = tag(&self.expr)?;
        let store = self.replay(&tags)?;
        Ok(render(&self.expr, &tags, &store, options)?)
    }
}
