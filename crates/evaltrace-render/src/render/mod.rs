//! Tree rendering: replaying a finished trace against its expression tree.
//!
//! [`render`] walks the tree with a fresh [`RenderSession`] and builds a
//! [`TreeNode`] per the rules of each node kind:
//!
//! - literals label themselves from the node and never touch the store;
//! - every other node consumes its next record, and a node without one is
//!   rendered as a `[not evaluated]` leaf without descending further;
//! - conditionals and short-circuiting binary operators peek at the operand
//!   that decides the path, render it for real, and show the path not taken
//!   as `[not evaluated]`;
//! - closures are replayed once per invocation by the enclosing call
//!   (see [`closure`]).

mod closure;

use std::fmt;

use evaltrace_core::{BinaryOp, Node, NodeTag, Value};

use crate::error::TraceError;
use crate::format::{self, ELIDED, NOT_EVALUATED, NOT_SPECIFIED};
use crate::session::RenderSession;
use crate::store::{EvalRecord, TraceStore};
use crate::tagger::TagTable;
use crate::tree::TreeNode;

/// Callback invoked for every rendered call or builtin node with the node,
/// its branch, and its output. Lets the host attach its own annotations.
pub type CallHook<'a> = Box<dyn FnMut(&Node, &mut TreeNode, &Value) + 'a>;

/// Knobs for one render pass.
pub struct RenderOptions<'a> {
    pub on_call: Option<CallHook<'a>>,
    /// Omit argument and element branches when every child is a literal.
    pub compact_literals: bool,
    /// Cut formatted values longer than this many characters.
    pub max_value_width: Option<usize>,
    /// Render at most this many element branches per array.
    pub max_elements: Option<usize>,
}

impl Default for RenderOptions<'_> {
    fn default() -> Self {
        RenderOptions {
            on_call: None,
            compact_literals: true,
            max_value_width: None,
            max_elements: None,
        }
    }
}

impl<'a> RenderOptions<'a> {
    pub fn with_call_hook(mut self, hook: impl FnMut(&Node, &mut TreeNode, &Value) + 'a) -> Self {
        self.on_call = Some(Box::new(hook));
        self
    }

    pub fn compact_literals(mut self, compact: bool) -> Self {
        self.compact_literals = compact;
        self
    }

    pub fn max_value_width(mut self, width: usize) -> Self {
        self.max_value_width = Some(width);
        self
    }

    pub fn max_elements(mut self, count: usize) -> Self {
        self.max_elements = Some(count);
        self
    }
}

impl fmt::Debug for RenderOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderOptions")
            .field("on_call", &self.on_call.as_ref().map(|_| "<hook>"))
            .field("compact_literals", &self.compact_literals)
            .field("max_value_width", &self.max_value_width)
            .field("max_elements", &self.max_elements)
            .finish()
    }
}

/// Renders the trace of `root` recorded in `store`.
///
/// `tags` must come from tagging this same `root`. Each call uses its own
/// session, so rendering a store twice yields identical trees.
///
/// # Errors
///
/// Any [`TraceError`] aborts the whole render; no partial tree is returned.
pub fn render(
    root: &Node,
    tags: &TagTable<'_>,
    store: &TraceStore,
    options: RenderOptions<'_>,
) -> Result<TreeNode, TraceError> {
    tracing::debug!(
        "rendering {} tagged nodes against {} records",
        tags.len(),
        store.total_records()
    );
    let mut renderer = TreeRenderer {
        tags,
        session: RenderSession::new(store),
        options,
    };
    let mut top = TreeNode::new(root.to_string());
    renderer.visit(root, &mut top)?;
    tracing::debug!(
        "render consumed {} of {} records",
        renderer.session.consumed(),
        store.total_records()
    );

    if top.children.len() == 1 {
        if let Some(only) = top.children.pop() {
            return Ok(only);
        }
    }
    Ok(top)
}

struct TreeRenderer<'r, 't, 'o> {
    tags: &'r TagTable<'t>,
    session: RenderSession<'r>,
    options: RenderOptions<'o>,
}

impl<'r> TreeRenderer<'r, '_, '_> {
    fn visit(&mut self, node: &Node, parent: &mut TreeNode) -> Result<(), TraceError> {
        match node {
            Node::Nil
            | Node::Bool { .. }
            | Node::Integer { .. }
            | Node::Float { .. }
            | Node::String { .. }
            | Node::Constant { .. } => {
                parent.add_leaf(self.literal_label(node));
                Ok(())
            }

            Node::Identifier { .. } | Node::Pointer { .. } => {
                let record = self.next_record(node)?;
                parent.add_leaf(self.label(node, record));
                Ok(())
            }

            Node::Unary { .. } | Node::Member { .. } => {
                let label = match self.next_record(node)? {
                    Some(record) => format!("{} => {}", node, self.format(record)),
                    None => node.to_string(),
                };
                parent.add_leaf(label);
                Ok(())
            }

            Node::Chain { node: inner } => self.visit(inner, parent),

            Node::VariableDeclarator { name, value, body } => {
                let Some(record) = self.next_record(node)? else {
                    parent.add_leaf(NOT_EVALUATED);
                    return Ok(());
                };
                let branch = parent.add_branch(format!("{} => {}", name, self.format(record)));
                if !value.is_literal() {
                    self.visit(value, branch)?;
                }
                self.visit(body, parent)
            }

            Node::Binary {
                operator,
                left,
                right,
            } => self.visit_binary(node, *operator, left, right, parent),

            Node::Slice { node: subject, from, to } => {
                let record = self.next_record(node)?;
                let branch = parent.add_branch(self.label(node, record));
                self.visit(subject, branch)?;
                self.visit_bound("(from)", from.as_deref(), branch)?;
                self.visit_bound("(to)", to.as_deref(), branch)
            }

            Node::Call { arguments, .. } | Node::Builtin { arguments, .. } => {
                self.visit_call(node, arguments, parent)
            }

            Node::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                let Some(record) = self.next_record(node)? else {
                    parent.add_leaf(NOT_EVALUATED);
                    return Ok(());
                };
                let branch = parent.add_branch(format!("{} => {}", node, self.format(record)));
                // The condition is rendered right after this peek, so the
                // record read here is the one it consumes.
                let taken = self.peek_output(condition)?.and_then(|v| v.as_bool());
                self.visit(condition, branch)?;
                self.visit_arm("(then)", then_branch, taken == Some(true), branch)?;
                self.visit_arm("(else)", else_branch, taken == Some(false), branch)
            }

            Node::Array { elements } => {
                let Some(record) = self.next_record(node)? else {
                    parent.add_leaf(NOT_EVALUATED);
                    return Ok(());
                };
                let branch = parent.add_branch(format!("{} => {}", node, self.format(record)));
                if self.options.compact_literals && elements.iter().all(Node::is_literal) {
                    return Ok(());
                }
                let shown = self.options.max_elements.unwrap_or(elements.len());
                for (i, element) in elements.iter().take(shown).enumerate() {
                    let slot = branch.add_branch(format!("[{}]", i));
                    self.visit(element, slot)?;
                }
                if elements.len() > shown {
                    branch.add_leaf(ELIDED);
                }
                Ok(())
            }

            Node::Map { pairs } => {
                let Some(record) = self.next_record(node)? else {
                    parent.add_leaf(NOT_EVALUATED);
                    return Ok(());
                };
                let branch = parent.add_branch(format!("{} => {}", node, self.format(record)));
                for pair in pairs {
                    self.visit(pair, branch)?;
                }
                Ok(())
            }

            Node::Pair { key, value } => {
                let record = self.next_record(node)?;
                let shown = record.map_or_else(|| NOT_EVALUATED.to_string(), |r| self.format(r));
                let branch = parent.add_branch(format!("{} => {}", key, shown));
                if record.is_some() && !value.is_literal() {
                    self.visit(value, branch)?;
                }
                Ok(())
            }

            Node::Closure { .. } => Err(TraceError::ClosureOutsideCall {
                text: node.to_string(),
            }),

            Node::Unrecognized { name, text } => Err(TraceError::UnrecognizedNode {
                kind: name.clone(),
                text: text.clone(),
            }),
        }
    }

    fn visit_binary(
        &mut self,
        node: &Node,
        operator: BinaryOp,
        left: &Node,
        right: &Node,
        parent: &mut TreeNode,
    ) -> Result<(), TraceError> {
        let Some(record) = self.next_record(node)? else {
            parent.add_leaf(NOT_EVALUATED);
            return Ok(());
        };
        let branch = parent.add_branch(format!("{} => {}", node, self.format(record)));

        let skips_right = if operator.short_circuits() {
            let decided = self.peek_output(left)?;
            match (operator, decided) {
                (BinaryOp::And, Some(Value::Bool(false))) => true,
                (BinaryOp::Or, Some(Value::Bool(true))) => true,
                (BinaryOp::Coalesce, Some(v)) => !v.is_nil(),
                _ => false,
            }
        } else {
            false
        };

        self.visit(left, branch)?;
        if skips_right {
            branch.add_leaf(NOT_EVALUATED);
            Ok(())
        } else {
            self.visit(right, branch)
        }
    }

    fn visit_call(
        &mut self,
        node: &Node,
        arguments: &[Node],
        parent: &mut TreeNode,
    ) -> Result<(), TraceError> {
        let Some(record) = self.next_record(node)? else {
            parent.add_leaf(NOT_EVALUATED);
            return Ok(());
        };
        let branch = parent.add_branch(format!("{} => {}", node, self.format(record)));
        if let Some(hook) = self.options.on_call.as_mut() {
            hook(node, branch, &record.output());
        }

        if self.options.compact_literals && arguments.iter().all(Node::is_literal) {
            return Ok(());
        }
        let invocations = record.invocations();
        for argument in arguments {
            match argument {
                Node::Closure { body } => self.replay_closure(argument, body, invocations, branch)?,
                _ => self.visit(argument, branch)?,
            }
        }
        Ok(())
    }

    /// Renders a conditional arm, or a `[not evaluated]` leaf for the arm
    /// that did not run. A skipped arm is never descended into.
    fn visit_arm(
        &mut self,
        label: &str,
        arm: &Node,
        taken: bool,
        parent: &mut TreeNode,
    ) -> Result<(), TraceError> {
        let branch = parent.add_branch(label);
        if taken {
            self.visit(arm, branch)
        } else {
            branch.add_leaf(NOT_EVALUATED);
            Ok(())
        }
    }

    fn visit_bound(
        &mut self,
        label: &str,
        bound: Option<&Node>,
        parent: &mut TreeNode,
    ) -> Result<(), TraceError> {
        match bound {
            Some(bound) => {
                let branch = parent.add_branch(label);
                self.visit(bound, branch)
            }
            None => {
                parent.add_leaf(format!("{} {}", label, NOT_SPECIFIED));
                Ok(())
            }
        }
    }

    // -- store access --

    fn tag_of(&self, node: &Node) -> Result<NodeTag, TraceError> {
        self.tags.tag_of(node).ok_or_else(|| TraceError::UntaggedNode {
            text: node.to_string(),
        })
    }

    fn next_record(&mut self, node: &Node) -> Result<Option<&'r EvalRecord>, TraceError> {
        let tag = self.tag_of(node)?;
        Ok(self.session.next(tag))
    }

    /// The output `node` will show when it is rendered next, without
    /// consuming anything. Literals answer from the node itself; a `let`
    /// evaluates to its body, whose record is the one that decides.
    fn peek_output(&self, node: &Node) -> Result<Option<Value>, TraceError> {
        if let Some(value) = node.literal_value() {
            return Ok(Some(value));
        }
        match node {
            Node::Chain { node: inner } => return self.peek_output(inner),
            Node::VariableDeclarator { body, .. } => return self.peek_output(body),
            _ => {}
        }
        let tag = self.tag_of(node)?;
        Ok(self.session.peek(tag).map(|r| r.output().into_owned()))
    }

    // -- labels --

    fn format(&self, record: &EvalRecord) -> String {
        format::truncate(format::format_record(record), self.options.max_value_width)
    }

    fn label(&self, node: &Node, record: Option<&EvalRecord>) -> String {
        match record {
            Some(record) => format!("{} => {}", node, self.format(record)),
            None => NOT_EVALUATED.to_string(),
        }
    }

    fn literal_label(&self, node: &Node) -> String {
        let text = node
            .literal_value()
            .map_or_else(|| node.to_string(), |v| format::format_value(&v));
        format::truncate(text, self.options.max_value_width)
    }
}
