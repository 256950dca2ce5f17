//! @ai:module:intent Define the node variants of a parsed doc block
//! @ai:module:layer domain
//! @ai:module:public_api NodeId, Span, Node, TextNode, TagNode, LeafNode, ContainerNode, TagValue, TypedValue, MethodSignature
//! @ai:module:stateless true

use crate::type_expr::{DocTypeMapper, TypeExpr, TypeMapper};
use serde::Serialize;
use std::fmt;

/// @ai:intent Stable identity of a node inside its tree's arena
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// @ai:intent Half-open range of token indices a node was built from
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// @ai:intent Check if `other` lies entirely within this span
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// @ai:intent One entry of a doc block
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// Free-form prose, possibly spanning several lines.
    Text(TextNode),
    Tag(TagNode),
    /// A childless fragment, e.g. one parameter of a method signature.
    Leaf(LeafNode),
    /// A tag owning child nodes.
    Container(ContainerNode),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TextNode {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TagNode {
    pub name: String,
    pub value: TagValue,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LeafNode {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContainerNode {
    pub name: String,
    pub signature: MethodSignature,
    pub children: Vec<NodeId>,
    pub description: String,
}

/// @ai:intent The head of a `@method` tag: everything before the parameter list
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MethodSignature {
    pub is_static: bool,
    pub return_type: Option<TypeExpr>,
    pub method: String,
}

/// @ai:intent Payload of a tag, opaque unless a recognizer understood it
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TagValue {
    Generic { raw: String },
    Typed(TypedValue),
}

/// @ai:intent A tag payload of the form `type [$variable] [description]`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TypedValue {
    pub ty: TypeExpr,
    pub variable: Option<String>,
    pub description: String,
}

impl TagValue {
    pub fn generic(raw: impl Into<String>) -> Self {
        TagValue::Generic { raw: raw.into() }
    }

    pub fn type_expr(&self) -> Option<&TypeExpr> {
        match self {
            TagValue::Typed(typed) => Some(&typed.ty),
            TagValue::Generic { .. } => None,
        }
    }

    pub fn variable(&self) -> Option<&str> {
        match self {
            TagValue::Typed(typed) => typed.variable.as_deref(),
            TagValue::Generic { .. } => None,
        }
    }

    /// @ai:intent Payload text with the type written by the host mapper
    /// @ai:effects pure
    pub fn render(&self, mapper: &dyn TypeMapper) -> String {
        match self {
            TagValue::Generic { raw } => raw.clone(),
            TagValue::Typed(typed) => {
                let mut out = mapper.render(&typed.ty);
                if let Some(variable) = &typed.variable {
                    out.push(' ');
                    out.push_str(variable);
                }
                if !typed.description.is_empty() {
                    out.push(' ');
                    out.push_str(&typed.description);
                }
                out
            }
        }
    }
}

impl MethodSignature {
    pub fn render(&self, mapper: &dyn TypeMapper) -> String {
        let mut out = String::new();
        if self.is_static {
            out.push_str("static ");
        }
        if let Some(ty) = &self.return_type {
            out.push_str(&mapper.render(ty));
            out.push(' ');
        }
        out.push_str(&self.method);
        out
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&DocTypeMapper))
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&DocTypeMapper))
    }
}

impl Node {
    /// @ai:intent Tag name for tag-like nodes, without the `@` marker
    pub fn tag_name(&self) -> Option<&str> {
        match self {
            Node::Tag(tag) => Some(&tag.name),
            Node::Container(container) => Some(&container.name),
            Node::Text(_) | Node::Leaf(_) => None,
        }
    }

    pub fn tag_value(&self) -> Option<&TagValue> {
        match self {
            Node::Tag(tag) => Some(&tag.value),
            _ => None,
        }
    }

    pub fn type_expr(&self) -> Option<&TypeExpr> {
        match self {
            Node::Tag(tag) => tag.value.type_expr(),
            Node::Container(container) => container.signature.return_type.as_ref(),
            Node::Text(_) | Node::Leaf(_) => None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match self {
            Node::Container(container) => &container.children,
            _ => &[],
        }
    }
}
