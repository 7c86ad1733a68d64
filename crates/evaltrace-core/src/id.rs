//! Stable identity newtype for expression-tree nodes.
//!
//! A [`NodeTag`] names one concrete node instance inside one tagged tree. Two
//! textually identical sub-expressions are different instances and receive
//! different tags; a node revisited by a loop keeps the single tag it was
//! given when the tree was tagged.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-instance node identifier, assigned once by the tagger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeTag(pub u32);

impl NodeTag {
    /// Returns the tag as a dense index into the tagger's pre-order table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// Display just prints the inner value.

impl fmt::Display for NodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for NodeTag {
    fn from(idx: usize) -> Self {
        NodeTag(idx as u32)
    }
}
