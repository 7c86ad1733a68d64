//! Expression-tree nodes.
//!
//! [`Node`] is a closed sum type over every grammar kind the tracer knows.
//! Trees are built once by the host's parser and never mutated afterwards;
//! children are boxed (or live in a `Vec`), so every node instance has its own
//! address for as long as the tree is borrowed. The tagger in
//! evaltrace-render relies on that to give each instance its own identity.
//!
//! `Display` prints a node back to source text. Those strings become the
//! left-hand side of rendered labels (`"1 + 2 => 3"`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ops::{BinaryOp, UnaryOp};
use crate::value::Value;

/// One node of an expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    // -- literals: their value lives in the node, never in the trace store --
    Nil,
    Bool {
        value: bool,
    },
    Integer {
        value: i64,
    },
    Float {
        value: f64,
    },
    String {
        value: String,
    },
    /// A constant folded by the parser.
    Constant {
        value: Value,
    },

    Identifier {
        name: String,
    },
    Unary {
        operator: UnaryOp,
        node: Box<Node>,
    },
    Binary {
        operator: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// Transparent wrapper around an optional-chaining expression (`a?.b`).
    Chain {
        node: Box<Node>,
    },
    /// Field or index access. The property is a string literal for `a.b`.
    Member {
        node: Box<Node>,
        property: Box<Node>,
        #[serde(default)]
        optional: bool,
    },
    Slice {
        node: Box<Node>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Box<Node>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<Box<Node>>,
    },
    /// Call of a user-visible function or method.
    Call {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    /// Call of a language builtin (`filter`, `map`, `len`, ...).
    Builtin {
        name: String,
        arguments: Vec<Node>,
    },
    /// Predicate body passed to a higher-order builtin; only valid as an
    /// argument of a call or builtin.
    Closure {
        body: Box<Node>,
    },
    /// Reference to the closure's current element (`#`) or a named one (`#acc`).
    Pointer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// `let name = value; body`
    VariableDeclarator {
        name: String,
        value: Box<Node>,
        body: Box<Node>,
    },
    Conditional {
        condition: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Box<Node>,
    },
    Array {
        elements: Vec<Node>,
    },
    /// Map literal; every entry is a [`Node::Pair`].
    Map {
        pairs: Vec<Node>,
    },
    Pair {
        key: Box<Node>,
        value: Box<Node>,
    },
    /// A construct produced by a newer grammar than this crate understands.
    /// Tagging or rendering one is a hard error.
    Unrecognized {
        name: String,
        text: String,
    },
}

impl Node {
    // -- constructors --

    pub fn nil() -> Node {
        Node::Nil
    }

    pub fn boolean(value: bool) -> Node {
        Node::Bool { value }
    }

    pub fn int(value: i64) -> Node {
        Node::Integer { value }
    }

    pub fn float(value: f64) -> Node {
        Node::Float { value }
    }

    pub fn string(value: impl Into<String>) -> Node {
        Node::String {
            value: value.into(),
        }
    }

    pub fn constant(value: impl Into<Value>) -> Node {
        Node::Constant {
            value: value.into(),
        }
    }

    pub fn ident(name: impl Into<String>) -> Node {
        Node::Identifier { name: name.into() }
    }

    pub fn unary(operator: UnaryOp, node: Node) -> Node {
        Node::Unary {
            operator,
            node: Box::new(node),
        }
    }

    pub fn binary(operator: BinaryOp, left: Node, right: Node) -> Node {
        Node::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn chain(node: Node) -> Node {
        Node::Chain {
            node: Box::new(node),
        }
    }

    pub fn member(node: Node, property: Node) -> Node {
        Node::Member {
            node: Box::new(node),
            property: Box::new(property),
            optional: false,
        }
    }

    /// `node.name`
    pub fn field(node: Node, name: impl Into<String>) -> Node {
        Node::member(node, Node::string(name))
    }

    pub fn slice(node: Node, from: Option<Node>, to: Option<Node>) -> Node {
        Node::Slice {
            node: Box::new(node),
            from: from.map(Box::new),
            to: to.map(Box::new),
        }
    }

    pub fn call(callee: Node, arguments: Vec<Node>) -> Node {
        Node::Call {
            callee: Box::new(callee),
            arguments,
        }
    }

    pub fn builtin(name: impl Into<String>, arguments: Vec<Node>) -> Node {
        Node::Builtin {
            name: name.into(),
            arguments,
        }
    }

    pub fn closure(body: Node) -> Node {
        Node::Closure {
            body: Box::new(body),
        }
    }

    pub fn pointer() -> Node {
        Node::Pointer { name: None }
    }

    pub fn named_pointer(name: impl Into<String>) -> Node {
        Node::Pointer {
            name: Some(name.into()),
        }
    }

    pub fn declare(name: impl Into<String>, value: Node, body: Node) -> Node {
        Node::VariableDeclarator {
            name: name.into(),
            value: Box::new(value),
            body: Box::new(body),
        }
    }

    pub fn conditional(condition: Node, then_branch: Node, else_branch: Node) -> Node {
        Node::Conditional {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        }
    }

    pub fn array(elements: Vec<Node>) -> Node {
        Node::Array { elements }
    }

    pub fn pair(key: Node, value: Node) -> Node {
        Node::Pair {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Builds a map literal, wrapping each entry in a [`Node::Pair`].
    pub fn map(entries: Vec<(Node, Node)>) -> Node {
        Node::Map {
            pairs: entries.into_iter().map(|(k, v)| Node::pair(k, v)).collect(),
        }
    }

    // -- classification --

    /// Returns `true` for nodes whose value is stored inline in the tree.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Node::Nil
                | Node::Bool { .. }
                | Node::Integer { .. }
                | Node::Float { .. }
                | Node::String { .. }
                | Node::Constant { .. }
        )
    }

    /// The inline value of a literal node; `None` for every other kind.
    pub fn literal_value(&self) -> Option<Value> {
        match self {
            Node::Nil => Some(Value::Nil),
            Node::Bool { value } => Some(Value::Bool(*value)),
            Node::Integer { value } => Some(Value::Int(*value)),
            Node::Float { value } => Some(Value::Float(*value)),
            Node::String { value } => Some(Value::String(value.clone())),
            Node::Constant { value } => Some(value.clone()),
            _ => None,
        }
    }

    /// Short name of the node's grammar kind.
    pub fn kind_name(&self) -> &str {
        match self {
            Node::Nil => "nil",
            Node::Bool { .. } => "bool",
            Node::Integer { .. } => "integer",
            Node::Float { .. } => "float",
            Node::String { .. } => "string",
            Node::Constant { .. } => "constant",
            Node::Identifier { .. } => "identifier",
            Node::Unary { .. } => "unary",
            Node::Binary { .. } => "binary",
            Node::Chain { .. } => "chain",
            Node::Member { .. } => "member",
            Node::Slice { .. } => "slice",
            Node::Call { .. } => "call",
            Node::Builtin { .. } => "builtin",
            Node::Closure { .. } => "closure",
            Node::Pointer { .. } => "pointer",
            Node::VariableDeclarator { .. } => "variable_declarator",
            Node::Conditional { .. } => "conditional",
            Node::Array { .. } => "array",
            Node::Map { .. } => "map",
            Node::Pair { .. } => "pair",
            Node::Unrecognized { name, .. } => name.as_str(),
        }
    }
}

// ---------------------------------------------------------------------------
// Source-text printing
// ---------------------------------------------------------------------------

/// Whether `node` must be parenthesized as an operand of a binary operator.
fn needs_parens(node: &Node, parent: BinaryOp, right_side: bool) -> bool {
    match node {
        Node::Binary { operator, .. } => {
            let (child, outer) = (operator.precedence(), parent.precedence());
            if child != outer {
                return child < outer;
            }
            right_side != parent.is_right_associative()
        }
        Node::Conditional { .. } | Node::VariableDeclarator { .. } => true,
        _ => false,
    }
}

/// Subjects of member access, slicing and calls must be primary expressions.
fn is_compound(node: &Node) -> bool {
    matches!(
        node,
        Node::Binary { .. }
            | Node::Unary { .. }
            | Node::Conditional { .. }
            | Node::VariableDeclarator { .. }
    )
}

fn write_wrapped(f: &mut fmt::Formatter<'_>, node: &Node, wrap: bool) -> fmt::Result {
    if wrap {
        write!(f, "({})", node)
    } else {
        write!(f, "{}", node)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, nodes: &[Node]) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", node)?;
    }
    Ok(())
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quoted = serde_json::to_string(s).map_err(|_| fmt::Error)?;
    f.write_str(&quoted)
}

fn is_plain_field(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Prints a folded constant the way it would appear in source.
fn write_value_source(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Nil => f.write_str("nil"),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Int(n) => write!(f, "{}", n),
        Value::Float(x) => write!(f, "{:?}", x),
        Value::String(s) => write_quoted(f, s),
        Value::Array(items) => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_value_source(f, item)?;
            }
            f.write_str("]")
        }
        Value::Map(entries) => {
            f.write_str("{")?;
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_value_source(f, k)?;
                f.write_str(": ")?;
                write_value_source(f, v)?;
            }
            f.write_str("}")
        }
        Value::Func(name) => f.write_str(name),
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Nil => f.write_str("nil"),
            Node::Bool { value } => write!(f, "{}", value),
            Node::Integer { value } => write!(f, "{}", value),
            Node::Float { value } => write!(f, "{:?}", value),
            Node::String { value } => write_quoted(f, value),
            Node::Constant { value } => write_value_source(f, value),
            Node::Identifier { name } => f.write_str(name),
            Node::Unary { operator, node } => {
                let wrap = match node.as_ref() {
                    Node::Binary { operator: inner, .. } => {
                        inner.precedence() < UnaryOp::PRECEDENCE
                    }
                    Node::Conditional { .. } | Node::VariableDeclarator { .. } => true,
                    _ => false,
                };
                f.write_str(operator.as_str())?;
                write_wrapped(f, node, wrap)
            }
            Node::Binary {
                operator,
                left,
                right,
            } => {
                write_wrapped(f, left, needs_parens(left, *operator, false))?;
                write!(f, " {} ", operator)?;
                write_wrapped(f, right, needs_parens(right, *operator, true))
            }
            Node::Chain { node } => write!(f, "{}", node),
            Node::Member {
                node,
                property,
                optional,
            } => {
                write_wrapped(f, node, is_compound(node))?;
                match property.as_ref() {
                    Node::String { value } if is_plain_field(value) => {
                        let dot = if *optional { "?." } else { "." };
                        write!(f, "{}{}", dot, value)
                    }
                    other => {
                        if *optional {
                            f.write_str("?.")?;
                        }
                        write!(f, "[{}]", other)
                    }
                }
            }
            Node::Slice { node, from, to } => {
                write_wrapped(f, node, is_compound(node))?;
                f.write_str("[")?;
                if let Some(from) = from {
                    write!(f, "{}", from)?;
                }
                f.write_str(":")?;
                if let Some(to) = to {
                    write!(f, "{}", to)?;
                }
                f.write_str("]")
            }
            Node::Call { callee, arguments } => {
                write_wrapped(f, callee, is_compound(callee))?;
                f.write_str("(")?;
                write_list(f, arguments)?;
                f.write_str(")")
            }
            Node::Builtin { name, arguments } => {
                write!(f, "{}(", name)?;
                write_list(f, arguments)?;
                f.write_str(")")
            }
            Node::Closure { body } => write!(f, "{{{}}}", body),
            Node::Pointer { name } => match name {
                Some(name) => write!(f, "#{}", name),
                None => f.write_str("#"),
            },
            Node::VariableDeclarator { name, value, body } => {
                write!(f, "let {} = {}; {}", name, value, body)
            }
            Node::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                let wrap = matches!(
                    condition.as_ref(),
                    Node::Conditional { .. } | Node::VariableDeclarator { .. }
                );
                write_wrapped(f, condition, wrap)?;
                write!(f, " ? {} : {}", then_branch, else_branch)
            }
            Node::Array { elements } => {
                f.write_str("[")?;
                write_list(f, elements)?;
                f.write_str("]")
            }
            Node::Map { pairs } => {
                f.write_str("{")?;
                write_list(f, pairs)?;
                f.write_str("}")
            }
            Node::Pair { key, value } => write!(f, "{}: {}", key, value),
            Node::Unrecognized { text, .. } => f.write_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn binary_prints_with_spaces() {
        let n = Node::binary(BinaryOp::Add, Node::int(1), Node::int(2));
        assert_eq!(n.to_string(), "1 + 2");
    }

    #[test]
    fn lower_precedence_operand_is_parenthesized() {
        let sum = Node::binary(BinaryOp::Add, Node::ident("a"), Node::ident("b"));
        let n = Node::binary(BinaryOp::Mul, sum, Node::ident("c"));
        assert_eq!(n.to_string(), "(a + b) * c");
    }

    #[test]
    fn left_associative_right_operand_is_parenthesized() {
        let inner = Node::binary(BinaryOp::Sub, Node::ident("b"), Node::ident("c"));
        let n = Node::binary(BinaryOp::Sub, Node::ident("a"), inner);
        assert_eq!(n.to_string(), "a - (b - c)");

        let inner = Node::binary(BinaryOp::Sub, Node::ident("a"), Node::ident("b"));
        let n = Node::binary(BinaryOp::Sub, inner, Node::ident("c"));
        assert_eq!(n.to_string(), "a - b - c");
    }

    #[test]
    fn conditional_source() {
        let cond = Node::binary(BinaryOp::Ge, Node::ident("age"), Node::int(18));
        let n = Node::conditional(cond, Node::string("adult"), Node::string("minor"));
        assert_eq!(n.to_string(), r#"age >= 18 ? "adult" : "minor""#);
    }

    #[test]
    fn builtin_with_closure_source() {
        let pred = Node::binary(BinaryOp::Gt, Node::pointer(), Node::int(0));
        let n = Node::builtin("filter", vec![Node::ident("items"), Node::closure(pred)]);
        assert_eq!(n.to_string(), "filter(items, {# > 0})");
    }

    #[test]
    fn member_and_slice_source() {
        let m = Node::field(Node::ident("user"), "name");
        assert_eq!(m.to_string(), "user.name");

        let idx = Node::member(Node::ident("items"), Node::int(0));
        assert_eq!(idx.to_string(), "items[0]");

        let odd = Node::field(Node::ident("headers"), "Content-Type");
        assert_eq!(odd.to_string(), r#"headers["Content-Type"]"#);

        let s = Node::slice(Node::ident("a"), Some(Node::int(1)), None);
        assert_eq!(s.to_string(), "a[1:]");
        let s = Node::slice(Node::ident("a"), None, Some(Node::int(2)));
        assert_eq!(s.to_string(), "a[:2]");
    }

    #[test]
    fn optional_chain_source() {
        let m = Node::Member {
            node: Box::new(Node::ident("a")),
            property: Box::new(Node::string("b")),
            optional: true,
        };
        assert_eq!(Node::chain(m).to_string(), "a?.b");
    }

    #[test]
    fn unary_wraps_binary_operand() {
        let n = Node::unary(
            UnaryOp::Not,
            Node::binary(BinaryOp::And, Node::ident("a"), Node::ident("b")),
        );
        assert_eq!(n.to_string(), "!(a && b)");
        assert_eq!(Node::unary(UnaryOp::Neg, Node::ident("x")).to_string(), "-x");
    }

    #[test]
    fn coalesce_binds_tighter_than_arithmetic() {
        let coalesce = || Node::binary(BinaryOp::Coalesce, Node::ident("a"), Node::ident("b"));

        let sum = Node::binary(BinaryOp::Add, coalesce(), Node::int(1));
        assert_eq!(sum.to_string(), "a ?? b + 1");
        let fallback_sum = Node::binary(
            BinaryOp::Coalesce,
            Node::ident("a"),
            Node::binary(BinaryOp::Add, Node::ident("b"), Node::int(1)),
        );
        assert_eq!(fallback_sum.to_string(), "a ?? (b + 1)");

        let power = Node::binary(BinaryOp::Pow, coalesce(), Node::int(2));
        assert_eq!(power.to_string(), "a ?? b ** 2");
        let base = Node::binary(
            BinaryOp::Coalesce,
            Node::binary(BinaryOp::Pow, Node::ident("a"), Node::int(2)),
            Node::ident("b"),
        );
        assert_eq!(base.to_string(), "(a ** 2) ?? b");

        let nested = Node::binary(BinaryOp::Coalesce, Node::ident("x"), coalesce());
        assert_eq!(nested.to_string(), "x ?? (a ?? b)");
    }

    #[test]
    fn map_array_and_let_source() {
        let m = Node::map(vec![
            (Node::string("a"), Node::int(1)),
            (Node::string("b"), Node::ident("x")),
        ]);
        assert_eq!(m.to_string(), r#"{"a": 1, "b": x}"#);

        let a = Node::array(vec![Node::int(1), Node::nil(), Node::boolean(true)]);
        assert_eq!(a.to_string(), "[1, nil, true]");

        let d = Node::declare(
            "x",
            Node::int(1),
            Node::binary(BinaryOp::Add, Node::ident("x"), Node::int(1)),
        );
        assert_eq!(d.to_string(), "let x = 1; x + 1");
    }

    #[test]
    fn literal_text() {
        assert_eq!(Node::float(2.5).to_string(), "2.5");
        assert_eq!(Node::float(3.0).to_string(), "3.0");
        assert_eq!(Node::string("a\"b").to_string(), r#""a\"b""#);
        assert_eq!(
            Node::constant(Value::Array(vec![Value::Int(1), Value::from("x")])).to_string(),
            r#"[1, "x"]"#
        );
        assert_eq!(Node::named_pointer("acc").to_string(), "#acc");
    }

    #[test]
    fn literal_classification() {
        assert!(Node::int(1).is_literal());
        assert!(Node::constant(Value::Nil).is_literal());
        assert!(!Node::ident("x").is_literal());
        assert!(!Node::array(vec![Node::int(1)]).is_literal());
        assert!(!Node::closure(Node::boolean(true)).is_literal());
    }

    #[test]
    fn literal_values_come_from_the_node() {
        assert_eq!(Node::int(3).literal_value(), Some(Value::Int(3)));
        assert_eq!(Node::string("a").literal_value(), Some(Value::from("a")));
        assert_eq!(Node::nil().literal_value(), Some(Value::Nil));
        assert_eq!(Node::ident("a").literal_value(), None);
    }

    #[test]
    fn kind_names() {
        assert_eq!(Node::pointer().kind_name(), "pointer");
        let unknown = Node::Unrecognized {
            name: "sequence".into(),
            text: "a; b".into(),
        };
        assert_eq!(unknown.kind_name(), "sequence");
        assert_eq!(unknown.to_string(), "a; b");
    }

    #[test]
    fn serde_is_internally_tagged() {
        let n = Node::binary(BinaryOp::Add, Node::int(1), Node::ident("x"));
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "binary",
                "operator": "+",
                "left": { "kind": "integer", "value": 1 },
                "right": { "kind": "identifier", "name": "x" },
            })
        );
        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, n);
    }

    #[test]
    fn nested_request_assertion_source() {
        let status = Node::field(Node::field(Node::ident("steps"), "login"), "status");
        let ok = Node::binary(BinaryOp::Eq, status, Node::int(200));
        let body = Node::call(
            Node::field(Node::ident("res"), "json"),
            vec![Node::string("token")],
        );
        let has_token = Node::binary(
            BinaryOp::Ne,
            Node::builtin("len", vec![body]),
            Node::int(0),
        );
        let n = Node::binary(BinaryOp::And, ok, has_token);
        insta::assert_snapshot!(n.to_string(), @r#"steps.login.status == 200 && len(res.json("token")) != 0"#);
    }

    #[test]
    fn slice_bounds_are_optional_in_json() {
        let json = r#"{"kind":"slice","node":{"kind":"identifier","name":"a"},"from":{"kind":"integer","value":1}}"#;
        let n: Node = serde_json::from_str(json).unwrap();
        assert_eq!(n, Node::slice(Node::ident("a"), Some(Node::int(1)), None));
    }

    fn arb_node() -> impl Strategy<Value = Node> {
        let leaf = prop_oneof![
            any::<i64>().prop_map(Node::int),
            "[a-z]{1,6}".prop_map(Node::ident),
            any::<bool>().prop_map(Node::boolean),
            Just(Node::pointer()),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(l, r)| Node::binary(BinaryOp::Add, l, r)),
                (inner.clone(), inner.clone()).prop_map(|(l, r)| Node::binary(BinaryOp::Mul, l, r)),
                (inner.clone(), inner.clone(), inner.clone())
                    .prop_map(|(c, t, e)| Node::conditional(c, t, e)),
                inner.clone().prop_map(|n| Node::unary(UnaryOp::Not, n)),
                prop::collection::vec(inner.clone(), 0..3).prop_map(Node::array),
                (inner.clone(), prop::collection::vec(inner, 0..3))
                    .prop_map(|(c, args)| Node::call(c, args)),
            ]
        })
    }

    proptest! {
        #[test]
        fn printed_source_has_balanced_brackets(node in arb_node()) {
            let text = node.to_string();
            let mut depth: i64 = 0;
            for c in text.chars() {
                match c {
                    '(' | '[' | '{' => depth += 1,
                    ')' | ']' | '}' => depth -= 1,
                    _ => {}
                }
                prop_assert!(depth >= 0, "unbalanced: {}", text);
            }
            prop_assert_eq!(depth, 0);
        }

        #[test]
        fn json_dump_preserves_tree(node in arb_node()) {
            let json = serde_json::to_string(&node).unwrap();
            let back: Node = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(back, node);
        }
    }
}
