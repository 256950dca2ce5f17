//! @ai:module:intent Side table of per-node metadata: spans, provenance, extension data
//! @ai:module:layer domain
//! @ai:module:public_api Attributes, AttrTarget, AttributeKey, AttributeValue
//! @ai:module:stateless false

use crate::node::{NodeId, Span};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// @ai:intent What an attribute is attached to: the whole tree or one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrTarget {
    Root,
    Node(NodeId),
}

impl From<NodeId> for AttrTarget {
    fn from(id: NodeId) -> Self {
        AttrTarget::Node(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeKey {
    /// Token span the node was parsed from.
    StartAndEnd,
    /// Node was created by a mutation, not parsed.
    Synthesized,
    /// Node content was edited after parsing.
    Changed,
    /// Root only: byte offset where the last node ends.
    LastTokenPosition,
    Custom(String),
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeKey::StartAndEnd => f.write_str("start_and_end"),
            AttributeKey::Synthesized => f.write_str("synthesized"),
            AttributeKey::Changed => f.write_str("changed"),
            AttributeKey::LastTokenPosition => f.write_str("last_token_position"),
            AttributeKey::Custom(name) => write!(f, "custom:{}", name),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum AttributeValue {
    Span(Span),
    Flag(bool),
    Offset(usize),
    Text(String),
}

/// @ai:intent Open-ended attribute storage keyed by node identity
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    table: HashMap<AttrTarget, BTreeMap<AttributeKey, AttributeValue>>,
}

impl Attributes {
    pub fn set(&mut self, target: impl Into<AttrTarget>, key: AttributeKey, value: AttributeValue) {
        self.table.entry(target.into()).or_default().insert(key, value);
    }

    pub fn get(&self, target: impl Into<AttrTarget>, key: &AttributeKey) -> Option<&AttributeValue> {
        self.table.get(&target.into())?.get(key)
    }

    pub fn remove(&mut self, target: impl Into<AttrTarget>, key: &AttributeKey) -> Option<AttributeValue> {
        self.table.get_mut(&target.into())?.remove(key)
    }

    /// @ai:intent List every attribute of a target in key order
    pub fn all(&self, target: impl Into<AttrTarget>) -> Vec<(&AttributeKey, &AttributeValue)> {
        self.table
            .get(&target.into())
            .map(|attrs| attrs.iter().collect())
            .unwrap_or_default()
    }

    pub fn span(&self, id: NodeId) -> Option<Span> {
        match self.get(id, &AttributeKey::StartAndEnd) {
            Some(AttributeValue::Span(span)) => Some(*span),
            _ => None,
        }
    }

    pub fn set_span(&mut self, id: NodeId, span: Span) {
        self.set(id, AttributeKey::StartAndEnd, AttributeValue::Span(span));
    }

    pub fn is_synthesized(&self, id: NodeId) -> bool {
        self.flag(id, &AttributeKey::Synthesized)
    }

    pub fn mark_synthesized(&mut self, id: NodeId) {
        self.set(id, AttributeKey::Synthesized, AttributeValue::Flag(true));
    }

    pub fn is_changed(&self, id: NodeId) -> bool {
        self.flag(id, &AttributeKey::Changed)
    }

    pub fn mark_changed(&mut self, id: NodeId) {
        self.set(id, AttributeKey::Changed, AttributeValue::Flag(true));
    }

    pub fn last_token_position(&self) -> Option<usize> {
        match self.get(AttrTarget::Root, &AttributeKey::LastTokenPosition) {
            Some(AttributeValue::Offset(offset)) => Some(*offset),
            _ => None,
        }
    }

    pub fn set_last_token_position(&mut self, offset: usize) {
        self.set(
            AttrTarget::Root,
            AttributeKey::LastTokenPosition,
            AttributeValue::Offset(offset),
        );
    }

    fn flag(&self, id: NodeId, key: &AttributeKey) -> bool {
        matches!(self.get(id, key), Some(AttributeValue::Flag(true)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_roundtrip_through_table() {
        let mut attrs = Attributes::default();
        let id = NodeId(3);
        assert_eq!(attrs.span(id), None);

        attrs.set_span(id, Span::new(1, 4));
        assert_eq!(attrs.span(id), Some(Span::new(1, 4)));
        assert!(!attrs.is_synthesized(id));
        assert!(!attrs.is_changed(id));
    }

    #[test]
    fn test_custom_attributes_are_kept_per_target() {
        let mut attrs = Attributes::default();
        let key = AttributeKey::Custom("origin".to_string());
        attrs.set(NodeId(0), key.clone(), AttributeValue::Text("rule".to_string()));

        assert_eq!(
            attrs.get(NodeId(0), &key),
            Some(&AttributeValue::Text("rule".to_string()))
        );
        assert_eq!(attrs.get(NodeId(1), &key), None);
        assert_eq!(attrs.remove(NodeId(0), &key), Some(AttributeValue::Text("rule".to_string())));
        assert!(attrs.all(NodeId(0)).is_empty());
    }

    #[test]
    fn test_root_last_token_position() {
        let mut attrs = Attributes::default();
        attrs.set_last_token_position(42);
        assert_eq!(attrs.last_token_position(), Some(42));
        assert_eq!(attrs.all(AttrTarget::Root).len(), 1);
    }
}
