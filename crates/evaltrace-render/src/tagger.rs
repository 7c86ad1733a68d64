//! Node tagging.
//!
//! [`tag`] walks a tree in pre-order and assigns each node instance a dense
//! [`NodeTag`]. Identity comes from the instance's address, held in a side
//! table for as long as the [`TagTable`] borrows the tree; source text and
//! positions play no part, so two identical sub-expressions never share a
//! tag. Children are visited in the same order the renderer walks them.

use std::collections::HashMap;

use evaltrace_core::{Node, NodeTag};

use crate::error::TraceError;

/// Tag assignments for one borrowed expression tree.
#[derive(Debug, Clone)]
pub struct TagTable<'t> {
    by_address: HashMap<usize, NodeTag>,
    nodes: Vec<&'t Node>,
}

impl<'t> TagTable<'t> {
    /// Returns the tag of `node`, if it is an instance of the tagged tree.
    pub fn tag_of(&self, node: &Node) -> Option<NodeTag> {
        self.by_address.get(&address(node)).copied()
    }

    /// Returns the node instance carrying `tag`.
    pub fn node(&self, tag: NodeTag) -> Option<&'t Node> {
        self.nodes.get(tag.index()).copied()
    }

    /// Number of tagged nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over `(tag, node)` pairs in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeTag, &'t Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeTag::from(i), *node))
    }
}

fn address(node: &Node) -> usize {
    node as *const Node as usize
}

/// Tags every node of the tree rooted at `root`.
///
/// # Errors
///
/// Returns [`TraceError::UnrecognizedNode`] if the tree contains a grammar
/// kind this crate does not know.
pub fn tag(root: &Node) -> Result<TagTable<'_>, TraceError> {
    let mut table = TagTable {
        by_address: HashMap::new(),
        nodes: Vec::new(),
    };
    visit(root, &mut table)?;
    tracing::debug!("tagged {} expression nodes", table.len());
    Ok(table)
}

fn visit<'t>(node: &'t Node, table: &mut TagTable<'t>) -> Result<(), TraceError> {
    if table.by_address.contains_key(&address(node)) {
        return Ok(());
    }
    table
        .by_address
        .insert(address(node), NodeTag::from(table.nodes.len()));
    table.nodes.push(node);

    match node {
        Node::Nil
        | Node::Bool { .. }
        | Node::Integer { .. }
        | Node::Float { .. }
        | Node::String { .. }
        | Node::Constant { .. }
        | Node::Identifier { .. }
        | Node::Pointer { .. } => Ok(()),

        Node::Unary { node: inner, .. } | Node::Chain { node: inner } => visit(inner, table),
        Node::Closure { body } => visit(body, table),

        Node::Binary { left, right, .. } => {
            visit(left, table)?;
            visit(right, table)
        }
        Node::Member { node, property, .. } => {
            visit(node, table)?;
            visit(property, table)
        }
        Node::Slice { node, from, to } => {
            visit(node, table)?;
            if let Some(from) = from {
                visit(from, table)?;
            }
            if let Some(to) = to {
                visit(to, table)?;
            }
            Ok(())
        }
        Node::Call { callee, arguments } => {
            visit(callee, table)?;
            visit_all(arguments, table)
        }
        Node::Builtin { arguments, .. } => visit_all(arguments, table),
        Node::VariableDeclarator { value, body, .. } => {
            visit(value, table)?;
            visit(body, table)
        }
        Node::Conditional {
            condition,
            then_branch,
            else_branch,
        } => {
            visit(condition, table)?;
            visit(then_branch, table)?;
            visit(else_branch, table)
        }
        Node::Array { elements } => visit_all(elements, table),
        Node::Map { pairs } => visit_all(pairs, table),
        Node::Pair { key, value } => {
            visit(key, table)?;
            visit(value, table)
        }

        Node::Unrecognized { name, text } => Err(TraceError::UnrecognizedNode {
            kind: name.clone(),
            text: text.clone(),
        }),
    }
}

fn visit_all<'t>(nodes: &'t [Node], table: &mut TagTable<'t>) -> Result<(), TraceError> {
    for node in nodes {
        visit(node, table)?;
    }
    Ok(())
}
