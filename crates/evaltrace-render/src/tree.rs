//! The rendered tree: labels arranged for terminal and log output.

use std::fmt;

use serde::Serialize;

/// One labeled node of a rendered trace.
///
/// `Display` draws the tree with box-drawing connectors:
///
/// ```text
/// 1 + 2 => 3
/// ├── 1
/// └── 2
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub label: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(label: impl Into<String>) -> Self {
        TreeNode {
            label: label.into(),
            children: Vec::new(),
        }
    }

    /// Appends a child with no children of its own.
    pub fn add_leaf(&mut self, label: impl Into<String>) {
        self.children.push(TreeNode::new(label));
    }

    /// Appends a child and returns it for further nesting.
    pub fn add_branch(&mut self, label: impl Into<String>) -> &mut TreeNode {
        self.children.push(TreeNode::new(label));
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Child labels, in order.
    pub fn child_labels(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.label.as_str()).collect()
    }

    /// Finds the first node, depth-first, whose label equals `label`.
    pub fn find(&self, label: &str) -> Option<&TreeNode> {
        if self.label == label {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(label))
    }

    /// Number of nodes in the tree, including this one.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }

    fn write_lines(&self, prefix: &str, out: &mut Vec<String>) {
        let count = self.children.len();
        for (i, child) in self.children.iter().enumerate() {
            let (connector, indent) = if i + 1 == count {
                ("└── ", "    ")
            } else {
                ("├── ", "│   ")
            };
            let child_prefix = format!("{}{}", prefix, indent);
            let mut lines = child.label.lines();
            out.push(format!("{}{}{}", prefix, connector, lines.next().unwrap_or("")));
            // Multi-line labels (host annotations) continue under the child.
            for line in lines {
                out.push(format!("{}{}", child_prefix, line));
            }
            child.write_lines(&child_prefix, out);
        }
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out: Vec<String> = self.label.lines().map(str::to_string).collect();
        if out.is_empty() {
            out.push(String::new());
        }
        self.write_lines("", &mut out);
        f.write_str(&out.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_connectors() {
        let mut root = TreeNode::new("a");
        let b = root.add_branch("b");
        b.add_leaf("c");
        b.add_leaf("d");
        root.add_leaf("e");

        insta::assert_snapshot!(root.to_string(), @r"
        a
        ├── b
        │   ├── c
        │   └── d
        └── e
        ");
    }

    #[test]
    fn multi_line_labels_stay_under_their_node() {
        let mut root = TreeNode::new("call()");
        root.add_leaf("GET /users\n200 OK");
        root.add_leaf("x");
        assert_eq!(
            root.to_string(),
            "call()\n├── GET /users\n│   200 OK\n└── x"
        );
    }

    #[test]
    fn helpers() {
        let mut root = TreeNode::new("r");
        root.add_branch("x").add_leaf("y");
        assert_eq!(root.child_labels(), vec!["x"]);
        assert!(root.find("y").unwrap().is_leaf());
        assert!(root.find("z").is_none());
        assert_eq!(root.size(), 3);
    }

    #[test]
    fn serializes_without_empty_children() {
        let mut root = TreeNode::new("r");
        root.add_leaf("x");
        assert_eq!(
            serde_json::to_string(&root).unwrap(),
            r#"{"label":"r","children":[{"label":"x"}]}"#
        );
    }
}
