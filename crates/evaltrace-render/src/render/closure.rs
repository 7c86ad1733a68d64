//! Closure replay.
//!
//! A closure passed to a higher-order call runs once per element the call
//! visits. The call's record carries that invocation count; each invocation
//! appended one record for the closure and one per body node it reached, so
//! replaying the body N times in order lines every record up with the
//! invocation that produced it.

use evaltrace_core::Node;

use crate::error::TraceError;
use crate::format::{ELLIPSIS, NOT_EVALUATED};
use crate::tree::TreeNode;

use super::TreeRenderer;

impl TreeRenderer<'_, '_, '_> {
    /// Renders `invocations` indexed branches for `closure`, each with the
    /// closure `body` beneath it.
    pub(super) fn replay_closure(
        &mut self,
        closure: &Node,
        body: &Node,
        invocations: usize,
        parent: &mut TreeNode,
    ) -> Result<(), TraceError> {
        let tag = self.tag_of(closure)?;
        if invocations == 0 || self.session.record_count(tag) == 0 {
            parent.add_leaf(NOT_EVALUATED);
            return Ok(());
        }

        for i in 0..invocations {
            let prefix = if invocations > 1 {
                format!("({}) ", i)
            } else {
                String::new()
            };
            match self.session.next(tag) {
                Some(record) => {
                    let label = format!("{}{} => {}", prefix, ELLIPSIS, self.format(record));
                    let branch = parent.add_branch(label);
                    self.visit(body, branch)?;
                }
                None => {
                    tracing::trace!(
                        "closure {} has no record for invocation {} of {}",
                        tag,
                        i,
                        invocations
                    );
                    parent.add_leaf(format!("{}{} => {}", prefix, ELLIPSIS, NOT_EVALUATED));
                }
            }
        }
        Ok(())
    }
}
