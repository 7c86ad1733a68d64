//! Trace recording and debug-tree rendering for expression evaluation.
//!
//! Explains how an expression reached its result by replaying, against the
//! expression tree, the outputs the evaluator recorded while it ran.
//!
//! # Architecture
//!
//! - [`tag`] walks a tree once and builds a [`TagTable`], giving every node
//!   instance its own [`NodeTag`](evaltrace_core::NodeTag).
//! - The host evaluator appends one [`EvalRecord`] per visited non-literal
//!   node into a [`TraceStore`], keyed by tag.
//! - [`render`] replays the tree against the finished store through a fresh
//!   [`RenderSession`] and produces a [`TreeNode`] of labels such as
//!   `"1 + 2 => 3"`.
//! - [`TraceDump`] persists an expression and its records as JSON for
//!   offline rendering.
//!
//! # Usage
//!
//! ```ignore
//! let tags = tag(&expr)?;
//! let mut store = TraceStore::new();
//! // evaluator: store.append(tags.tag_of(node).unwrap(), EvalRecord::scalar(out));
//! let tree = render(&expr, &tags, &store, RenderOptions::default())?;
//! println!("{}", tree);
//! ```

pub mod dump;
pub mod error;
pub mod format;
pub mod render;
pub mod session;
pub mod store;
pub mod tagger;
pub mod tree;

pub use dump::{DumpEntry, DumpError, TraceDump};
pub use error::TraceError;
pub use render::{render, CallHook, RenderOptions};
pub use session::{Cursor, RenderSession};
pub use store::{EvalRecord, TraceStore};
pub use tagger::{tag, TagTable};
pub use tree::TreeNode;
