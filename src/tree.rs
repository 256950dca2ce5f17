//! @ai:module:intent Arena-backed annotation tree with its attribute side table
//! @ai:module:layer domain
//! @ai:module:public_api DocTree
//! @ai:module:depends_on node, attribute, registry

use crate::attribute::Attributes;
use crate::node::{ContainerNode, LeafNode, Node, NodeId, TagNode};
use crate::registry::Resolved;
use crate::type_expr::TypeMapper;
use std::ops::Range;

/// @ai:intent Ordered top-level nodes over an arena that never reuses slots
#[derive(Debug, Clone, Default)]
pub struct DocTree {
    nodes: Vec<Node>,
    children: Vec<NodeId>,
    attributes: Attributes,
}

impl DocTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level nodes in document order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// @ai:intent Iterate top-level nodes with their ids
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.children.iter().map(move |&id| (id, &self.nodes[id.0]))
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn push(&mut self, id: NodeId) {
        self.children.push(id);
    }

    /// @ai:intent Allocate a tag node (plus children) from a recognizer result
    /// @ai:post returned ranges are the payload byte ranges of each child
    pub(crate) fn alloc_resolved(&mut self, name: &str, resolved: Resolved) -> (NodeId, Vec<(NodeId, Range<usize>)>) {
        let (node, children) = self.build_resolved(name, resolved);
        (self.alloc(node), children)
    }

    /// @ai:intent Build a tag node from a recognizer result, allocating only its children
    pub(crate) fn build_resolved(&mut self, name: &str, resolved: Resolved) -> (Node, Vec<(NodeId, Range<usize>)>) {
        match resolved {
            Resolved::Tag(value) => (
                Node::Tag(TagNode {
                    name: name.to_string(),
                    value,
                }),
                Vec::new(),
            ),
            Resolved::Container {
                signature,
                params,
                description,
            } => {
                let children: Vec<(NodeId, Range<usize>)> = params
                    .into_iter()
                    .map(|fragment| (self.alloc(Node::Leaf(LeafNode { text: fragment.text })), fragment.range))
                    .collect();
                let node = Node::Container(ContainerNode {
                    name: name.to_string(),
                    signature,
                    children: children.iter().map(|(child, _)| *child).collect(),
                    description,
                });
                (node, children)
            }
        }
    }

    /// @ai:intent Detach every top-level node matching the predicate
    /// @ai:post relative order of remaining nodes is unchanged
    pub(crate) fn remove_where(&mut self, mut pred: impl FnMut(&Node) -> bool) -> Vec<NodeId> {
        let nodes = &self.nodes;
        let mut removed = Vec::new();
        self.children.retain(|&id| {
            if pred(&nodes[id.0]) {
                removed.push(id);
                false
            } else {
                true
            }
        });
        removed
    }

    /// @ai:intent Swap the content of a node while keeping its identity and position
    pub(crate) fn replace(&mut self, id: NodeId, node: Node) {
        if let Some(slot) = self.nodes.get_mut(id.0) {
            *slot = node;
        }
    }

    /// @ai:intent Check if a node is reachable from the top level
    pub fn contains(&self, id: NodeId) -> bool {
        self.children
            .iter()
            .any(|&top| top == id || self.descendants(top).contains(&id))
    }

    /// @ai:intent Collect all nodes below `id`, depth first
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.node(id) {
            Some(node) => node.children().iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(node) = self.node(next) {
                stack.extend(node.children().iter().rev().copied());
            }
        }
        out
    }

    /// @ai:intent Check if the node or any descendant was edited or synthesized
    pub fn is_modified(&self, id: NodeId) -> bool {
        std::iter::once(id)
            .chain(self.descendants(id))
            .any(|n| self.attributes.is_changed(n) || self.attributes.is_synthesized(n))
    }

    /// @ai:intent Render the payload of a node: everything after the tag name
    /// @ai:effects pure
    pub fn render_payload(&self, id: NodeId, mapper: &dyn TypeMapper) -> String {
        match self.node(id) {
            Some(Node::Tag(tag)) => tag.value.render(mapper),
            Some(Node::Container(container)) => {
                let params: Vec<String> = container
                    .children
                    .iter()
                    .map(|&child| self.render_node(child, mapper))
                    .collect();
                let mut out = format!("{}({})", container.signature.render(mapper), params.join(", "));
                if !container.description.is_empty() {
                    out.push(' ');
                    out.push_str(&container.description);
                }
                out
            }
            Some(Node::Text(text)) => text.text.clone(),
            Some(Node::Leaf(leaf)) => leaf.text.clone(),
            None => String::new(),
        }
    }

    /// @ai:intent Canonical text of a node: `@name payload` for tags
    /// @ai:effects pure
    pub fn render_node(&self, id: NodeId, mapper: &dyn TypeMapper) -> String {
        let payload = self.render_payload(id, mapper);
        match self.node(id).and_then(Node::tag_name) {
            Some(name) if payload.is_empty() => format!("@{}", name),
            Some(name) => format!("@{} {}", name, payload),
            None => payload,
        }
    }
}
