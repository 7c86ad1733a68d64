//! Invariant violations raised while tagging or rendering a tree.
//!
//! Expected absence (skipped branches, omitted slice bounds, nodes never
//! reached) is data, rendered as sentinel labels. Everything here means the
//! tree grammar and this crate have drifted apart, so a render that hits one
//! of these produces no output at all.

/// Fatal tagging and rendering errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraceError {
    #[error("unrecognized node kind '{kind}' in `{text}`")]
    UnrecognizedNode { kind: String, text: String },

    #[error("closure `{text}` reached outside of a call argument")]
    ClosureOutsideCall { text: String },

    #[error("node `{text}` has no tag; render the same tree that was tagged")]
    UntaggedNode { text: String },
}
