//! @ai:module:intent Per-declaration handle to query and mutate a parsed doc block
//! @ai:module:layer application
//! @ai:module:public_api DocBlock
//! @ai:module:depends_on token, parser, tree, registry, declaration, error

use crate::declaration::DeclarationId;
use crate::error::{Error, Result};
use crate::node::{Node, NodeId, TagValue, TextNode};
use crate::parser::DocParser;
use crate::registry::Registry;
use crate::token::{tokenize, Token};
use crate::tree::DocTree;
use crate::type_expr::TypeExpr;
use std::sync::Arc;

/// @ai:intent Mutable facade over one declaration's doc comment
///
/// Owns the original text, its tokens and the tree built from them. Every
/// mutation path sets the provenance attributes the printer relies on; code
/// that edits a node through [`DocBlock::node_mut`] must follow up with
/// [`DocBlock::mark_node_changed`].
#[derive(Debug)]
pub struct DocBlock {
    declaration: Option<DeclarationId>,
    original_text: String,
    tokens: Vec<Token>,
    tree: DocTree,
    dirty: bool,
    /// Set once a node parsed from the original text has been removed.
    removed_original: bool,
    registry: Arc<Registry>,
}

impl DocBlock {
    /// @ai:intent Tokenize and parse raw comment text into a clean handle
    /// @ai:effects pure
    pub fn parse(declaration: Option<DeclarationId>, raw: &str, registry: Arc<Registry>) -> Self {
        let tokens = tokenize(raw);
        let tree = DocParser::new(&registry).parse(&tokens);
        tracing::debug!(
            "Parsed doc block into {} nodes from {} tokens",
            tree.children().len(),
            tokens.len()
        );
        Self {
            declaration,
            original_text: raw.to_string(),
            tokens,
            tree,
            dirty: false,
            removed_original: false,
            registry,
        }
    }

    /// @ai:intent Create a handle for a declaration without a doc comment
    pub fn empty(declaration: Option<DeclarationId>, registry: Arc<Registry>) -> Self {
        Self {
            declaration,
            original_text: String::new(),
            tokens: Vec::new(),
            tree: DocTree::new(),
            dirty: false,
            removed_original: false,
            registry,
        }
    }

    pub fn declaration(&self) -> Option<DeclarationId> {
        self.declaration
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn tree(&self) -> &DocTree {
        &self.tree
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.tree.node(id)
    }

    /// @ai:intent Direct access for partial edits; pair with mark_node_changed
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.tree.node_mut(id)
    }

    pub fn render_payload(&self, id: NodeId) -> String {
        self.tree.render_payload(id, self.registry.mapper())
    }

    /// @ai:intent Canonical `@name payload` text, types written by the registry's mapper
    pub fn render_node(&self, id: NodeId) -> String {
        self.tree.render_node(id, self.registry.mapper())
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// @ai:intent Check if any top-level tag has this name
    /// @ai:example ("return") on "/** @return int */" -> true
    /// @ai:example ("@return") on "/** @return int */" -> true
    pub fn has_tag(&self, name: &str) -> bool {
        !self.tags_by_name(name).is_empty()
    }

    pub fn has_any_tag(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.has_tag(name))
    }

    /// @ai:intent All top-level tags with this name, in tree order
    pub fn tags_by_name(&self, name: &str) -> Vec<NodeId> {
        let name = strip_marker(name);
        self.tree
            .iter()
            .filter(|(_, node)| node.tag_name() == Some(name))
            .map(|(id, _)| id)
            .collect()
    }

    /// @ai:intent Type payload of the first tag with this name, if it is type-bearing
    pub fn type_for_tag(&self, name: &str) -> Option<&TypeExpr> {
        let first = *self.tags_by_name(name).first()?;
        self.tree.node(first)?.type_expr()
    }

    /// @ai:intent First prose paragraph of the block
    pub fn summary(&self) -> Option<&str> {
        self.tree.iter().find_map(|(_, node)| match node {
            Node::Text(text) => Some(text.text.as_str()),
            _ => None,
        })
    }

    pub fn return_type(&self) -> Option<&TypeExpr> {
        self.type_for_tag("return")
    }

    pub fn var_type(&self) -> Option<&TypeExpr> {
        self.type_for_tag("var")
    }

    /// @ai:intent Type documented for a parameter, matched with or without `$`
    pub fn param_type(&self, variable: &str) -> Option<&TypeExpr> {
        let id = self.param_tag(variable)?;
        self.tree.node(id)?.type_expr()
    }

    /// @ai:intent Variable names of all typed `@param` tags, in order
    pub fn param_names(&self) -> Vec<&str> {
        self.tags_by_name("param")
            .into_iter()
            .filter_map(|id| self.tree.node(id)?.tag_value()?.variable())
            .collect()
    }

    pub fn is_deprecated(&self) -> bool {
        self.has_tag("deprecated")
    }

    fn param_tag(&self, variable: &str) -> Option<NodeId> {
        let wanted = variable.trim_start_matches('$');
        self.tags_by_name("param").into_iter().find(|&id| {
            self.tree
                .node(id)
                .and_then(Node::tag_value)
                .and_then(TagValue::variable)
                .map(|v| v.trim_start_matches(['&', '.', '$']) == wanted)
                .unwrap_or(false)
        })
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// @ai:intent Append a synthesized tag after all existing nodes
    /// @ai:pre name is non-empty and has no whitespace
    /// @ai:post is_dirty() && tags_by_name(name).last() == Some(result)
    pub fn add_tag(&mut self, name: &str, payload: &str) -> Result<NodeId> {
        let name = validate_name(name)?;
        validate_content(payload)?;
        let resolved = self.registry.resolve(name, payload.trim());
        let (id, children) = self.tree.alloc_resolved(name, resolved);
        self.tree.attributes_mut().mark_synthesized(id);
        for (child, _) in children {
            self.tree.attributes_mut().mark_synthesized(child);
        }
        self.tree.push(id);
        self.dirty = true;
        tracing::debug!("Added @{} {:?}", name, payload);
        Ok(id)
    }

    /// @ai:intent Append a synthesized prose node
    pub fn add_text(&mut self, text: &str) -> Result<NodeId> {
        if text.trim().is_empty() {
            return Err(Error::contract("text node must not be empty"));
        }
        validate_content(text)?;
        let id = self.tree.alloc(Node::Text(TextNode {
            text: text.trim().to_string(),
        }));
        self.tree.attributes_mut().mark_synthesized(id);
        self.tree.push(id);
        self.dirty = true;
        Ok(id)
    }

    /// @ai:intent Remove every top-level tag with this name
    /// @ai:post dirty is unchanged when nothing matched
    /// @ai:post removing only synthesized tags leaves the block clean again if nothing else changed
    pub fn remove_tags_by_name(&mut self, name: &str) -> Result<usize> {
        let name = validate_name(name)?;
        let removed = self.tree.remove_where(|node| node.tag_name() == Some(name));
        if !removed.is_empty() {
            let attributes = self.tree.attributes();
            if removed.iter().any(|&id| attributes.span(id).is_some()) {
                self.removed_original = true;
            }
            let tree = &self.tree;
            self.dirty = self.removed_original || tree.children().iter().any(|&id| tree.is_modified(id));
            tracing::debug!("Removed {} @{} tag(s)", removed.len(), name);
        }
        Ok(removed.len())
    }

    /// @ai:intent Replace the payload of a tag, in place when possible
    /// @ai:post a sole original match keeps its position and node id
    pub fn replace_tag(&mut self, name: &str, payload: &str) -> Result<NodeId> {
        let name = validate_name(name)?;
        validate_content(payload)?;
        let matches = self.tags_by_name(name);

        if let [only] = matches[..] {
            if !self.tree.attributes().is_synthesized(only) {
                let resolved = self.registry.resolve(name, payload.trim());
                let (node, children) = self.tree.build_resolved(name, resolved);
                if children.is_empty() && self.tree.node(only) == Some(&node) {
                    return Ok(only);
                }
                for (child, _) in children {
                    self.tree.attributes_mut().mark_synthesized(child);
                }
                self.tree.replace(only, node);
                self.tree.attributes_mut().mark_changed(only);
                self.dirty = true;
                return Ok(only);
            }
        }

        self.remove_tags_by_name(name)?;
        self.add_tag(name, payload)
    }

    /// @ai:intent Flag a node edited through node_mut so the printer re-renders it
    /// @ai:pre id is reachable from the tree
    pub fn mark_node_changed(&mut self, id: NodeId) -> Result<()> {
        if !self.tree.contains(id) {
            return Err(Error::contract(format!("node {} is not part of this doc block", id.index())));
        }
        self.tree.attributes_mut().mark_changed(id);
        self.dirty = true;
        Ok(())
    }

    /// @ai:intent Set the `@return` type, keeping any description
    pub fn change_return_type(&mut self, ty: &TypeExpr) -> Result<NodeId> {
        match self.tags_by_name("return").first() {
            Some(&id) => self.change_type_in_place(id, ty, "return"),
            None => {
                let payload = self.registry.render_type(ty);
                self.add_tag("return", &payload)
            }
        }
    }

    /// @ai:intent Set the `@var` type, keeping any variable and description
    pub fn change_var_type(&mut self, ty: &TypeExpr) -> Result<NodeId> {
        match self.tags_by_name("var").first() {
            Some(&id) => self.change_type_in_place(id, ty, "var"),
            None => {
                let payload = self.registry.render_type(ty);
                self.add_tag("var", &payload)
            }
        }
    }

    /// @ai:intent Set the type of one `@param`, adding the tag if missing
    pub fn change_param_type(&mut self, variable: &str, ty: &TypeExpr) -> Result<NodeId> {
        let bare = variable.trim_start_matches('$');
        if bare.is_empty() {
            return Err(Error::contract("parameter name must not be empty"));
        }
        match self.param_tag(bare) {
            Some(id) => self.change_type_in_place(id, ty, "param"),
            None => {
                let payload = format!("{} ${}", self.registry.render_type(ty), bare);
                self.add_tag("param", &payload)
            }
        }
    }

    fn change_type_in_place(&mut self, id: NodeId, ty: &TypeExpr, name: &str) -> Result<NodeId> {
        let updated = match self.tree.node_mut(id) {
            Some(Node::Tag(tag)) => match &mut tag.value {
                TagValue::Typed(typed) if typed.ty == *ty => return Ok(id),
                TagValue::Typed(typed) => {
                    typed.ty = ty.clone();
                    true
                }
                TagValue::Generic { .. } => false,
            },
            _ => false,
        };
        if updated {
            self.mark_node_changed(id)?;
            Ok(id)
        } else {
            let payload = self.registry.render_type(ty);
            self.replace_tag(name, &payload)
        }
    }
}

/// Callers may spell tag names with or without the leading `@`.
fn strip_marker(name: &str) -> &str {
    name.strip_prefix('@').unwrap_or(name)
}

fn validate_name(name: &str) -> Result<&str> {
    let stripped = strip_marker(name);
    if stripped.is_empty() {
        return Err(Error::contract("tag name must not be empty"));
    }
    if stripped.chars().any(char::is_whitespace) {
        return Err(Error::contract(format!("tag name {:?} contains whitespace", name)));
    }
    validate_content(stripped)?;
    Ok(stripped)
}

/// Text that would close the comment early cannot be stored in a node.
fn validate_content(text: &str) -> Result<()> {
    if text.contains("*/") {
        return Err(Error::contract(format!("{:?} contains the comment terminator */", text)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_expr::TypeMapper;

    fn block(raw: &str) -> DocBlock {
        DocBlock::parse(Some(DeclarationId(1)), raw, Arc::new(Registry::with_defaults()))
    }

    const SAMPLE: &str = "/**\n * Adds numbers.\n *\n * @param int $a\n * @param int|null $b maybe\n * @return int\n */";

    #[test]
    fn test_queries_on_parsed_block() {
        let block = block(SAMPLE);
        assert!(!block.is_dirty());
        assert!(block.has_tag("param"));
        assert!(block.has_tag("@return"));
        assert!(!block.has_tag("Return"));
        assert!(block.has_any_tag(&["throws", "return"]));
        assert_eq!(block.tags_by_name("param").len(), 2);
        assert_eq!(block.summary(), Some("Adds numbers."));
        assert_eq!(block.param_names(), vec!["$a", "$b"]);
        assert_eq!(block.param_type("b").map(|t| t.to_string()), Some("int|null".to_string()));
        assert_eq!(block.return_type(), Some(&TypeExpr::name("int")));
        assert!(!block.is_deprecated());
    }

    #[test]
    fn test_type_for_generic_tag_is_none() {
        let block = block("/**\n * @my-custom-thing foo bar\n */");
        assert!(block.has_tag("my-custom-thing"));
        assert_eq!(block.type_for_tag("my-custom-thing"), None);
        assert_eq!(block.type_for_tag("missing"), None);
    }

    #[test]
    fn test_add_tag_to_empty_block() {
        let mut block = DocBlock::empty(Some(DeclarationId(7)), Arc::new(Registry::with_defaults()));
        let id = block.add_tag("return", "int").unwrap();

        assert!(block.is_dirty());
        assert_eq!(block.tags_by_name("return"), vec![id]);
        assert_eq!(block.render_payload(id), "int");
        assert!(block.tree().attributes().is_synthesized(id));
    }

    #[test]
    fn test_remove_without_match_keeps_clean() {
        let mut block = block(SAMPLE);
        assert_eq!(block.remove_tags_by_name("throws").unwrap(), 0);
        assert!(!block.is_dirty());

        assert_eq!(block.remove_tags_by_name("param").unwrap(), 2);
        assert!(block.is_dirty());
        assert!(!block.has_tag("param"));
    }

    #[test]
    fn test_replace_sole_original_tag_in_place() {
        let mut block = block(SAMPLE);
        let before = block.tags_by_name("return")[0];
        let after = block.replace_tag("return", "string").unwrap();

        assert_eq!(before, after);
        assert!(block.tree().attributes().is_changed(after));
        assert_eq!(block.tree().children().last(), Some(&after));
        assert_eq!(block.return_type(), Some(&TypeExpr::name("string")));
    }

    #[test]
    fn test_replace_with_identical_payload_is_noop() {
        let mut block = block(SAMPLE);
        block.replace_tag("return", "int").unwrap();
        assert!(!block.is_dirty());
    }

    #[test]
    fn test_replace_with_several_matches_appends() {
        let mut block = block(SAMPLE);
        let id = block.replace_tag("param", "string $c").unwrap();
        assert_eq!(block.tags_by_name("param"), vec![id]);
        assert_eq!(block.tree().children().last(), Some(&id));
        assert!(block.tree().attributes().is_synthesized(id));
    }

    #[test]
    fn test_invalid_names_are_contract_violations() {
        let mut block = block(SAMPLE);
        assert!(matches!(block.add_tag("", "int"), Err(Error::ContractViolation(_))));
        assert!(matches!(block.replace_tag("@", "int"), Err(Error::ContractViolation(_))));
        assert!(matches!(block.remove_tags_by_name("a b"), Err(Error::ContractViolation(_))));
        assert!(matches!(block.add_text("  "), Err(Error::ContractViolation(_))));
        assert!(!block.is_dirty());
    }

    #[test]
    fn test_mark_node_changed_after_direct_edit() {
        let mut block = block(SAMPLE);
        let id = block.tags_by_name("param")[0];
        if let Some(Node::Tag(tag)) = block.node_mut(id) {
            if let TagValue::Typed(typed) = &mut tag.value {
                typed.ty = TypeExpr::name("float");
            }
        }
        assert!(!block.is_dirty());

        block.mark_node_changed(id).unwrap();
        assert!(block.is_dirty());
        assert!(block.tree().is_modified(id));

        let removed = block.tags_by_name("return")[0];
        block.remove_tags_by_name("return").unwrap();
        assert!(matches!(block.mark_node_changed(removed), Err(Error::ContractViolation(_))));
    }

    #[test]
    fn test_change_param_type_updates_or_adds() {
        let mut block = block(SAMPLE);
        let existing = block.tags_by_name("param")[1];
        let id = block.change_param_type("$b", &TypeExpr::name("string")).unwrap();
        assert_eq!(id, existing);
        assert_eq!(block.render_payload(id), "string $b maybe");

        let added = block.change_param_type("c", &TypeExpr::name("bool")).unwrap();
        assert_eq!(block.render_payload(added), "bool $c");
        assert_eq!(block.param_names(), vec!["$a", "$b", "$c"]);
    }

    #[test]
    fn test_change_return_type_adds_when_missing() {
        let mut block = block("/**\n * Nothing here.\n */");
        let id = block.change_return_type(&TypeExpr::name("static")).unwrap();
        assert!(block.tree().attributes().is_synthesized(id));
        assert_eq!(block.return_type(), Some(&TypeExpr::name("static")));
    }

    struct UpperMapper;

    impl TypeMapper for UpperMapper {
        fn parse(&self, raw: &str) -> Option<(TypeExpr, usize)> {
            crate::type_expr::parse_type(raw)
        }

        fn render(&self, ty: &TypeExpr) -> String {
            ty.to_string().to_uppercase()
        }
    }

    fn upper_block(raw: &str) -> DocBlock {
        let registry = Registry::from_vocabulary(
            crate::registry::DEFAULT_VARIABLE_TAGS,
            crate::registry::DEFAULT_TYPED_TAGS,
            crate::registry::DEFAULT_VENDOR_PREFIXES,
            Arc::new(UpperMapper),
        );
        DocBlock::parse(Some(DeclarationId(2)), raw, Arc::new(registry))
    }

    #[test]
    fn test_changed_types_render_through_registry_mapper() {
        let mut block = upper_block("/**\n * @return int the sum\n */");
        let id = block.change_return_type(&TypeExpr::name("string")).unwrap();
        assert_eq!(block.render_payload(id), "STRING the sum");

        let added = block.change_param_type("a", &TypeExpr::name("float")).unwrap();
        assert_eq!(block.render_payload(added), "FLOAT $a");
        assert_eq!(block.param_type("a"), Some(&TypeExpr::name("FLOAT")));
    }

    #[test]
    fn test_deeply_nested_type_stays_generic() {
        let payload = format!("{}int{}", "(".repeat(20_000), ")".repeat(20_000));
        let block = block(&format!("/** @var {} */", payload));
        let id = block.tags_by_name("var")[0];
        assert_eq!(block.node(id).and_then(Node::tag_value), Some(&TagValue::generic(payload)));
        assert_eq!(block.var_type(), None);
    }

    #[test]
    fn test_comment_terminator_is_rejected() {
        let mut block = block(SAMPLE);
        assert!(matches!(block.add_tag("see", "a */ b"), Err(Error::ContractViolation(_))));
        assert!(matches!(block.replace_tag("return", "int */"), Err(Error::ContractViolation(_))));
        assert!(matches!(block.add_text("done */ /** more"), Err(Error::ContractViolation(_))));
        assert!(matches!(block.add_tag("x*/", ""), Err(Error::ContractViolation(_))));
        assert!(!block.is_dirty());
        assert_eq!(block.return_type(), Some(&TypeExpr::name("int")));
    }

    #[test]
    fn test_add_then_remove_synthesized_tag_is_clean() {
        let mut block = block(SAMPLE);
        block.add_tag("internal", "").unwrap();
        assert!(block.is_dirty());
        block.remove_tags_by_name("internal").unwrap();
        assert!(!block.is_dirty());

        block.replace_tag("return", "string").unwrap();
        block.add_tag("internal", "").unwrap();
        block.remove_tags_by_name("internal").unwrap();
        assert!(block.is_dirty());
    }

    #[test]
    fn test_removing_original_tag_stays_dirty() {
        let mut block = block(SAMPLE);
        block.remove_tags_by_name("return").unwrap();
        block.add_tag("internal", "").unwrap();
        block.remove_tags_by_name("internal").unwrap();
        assert!(block.is_dirty());
    }
}
