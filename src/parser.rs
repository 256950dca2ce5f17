//! @ai:module:intent Build an annotation tree with token spans from a token stream
//! @ai:module:layer application
//! @ai:module:public_api DocParser
//! @ai:module:depends_on token, tree, registry
//! @ai:module:stateless true

use crate::node::{Node, NodeId, Span, TagNode, TagValue, TextNode};
use crate::registry::Registry;
use crate::token::{Token, TokenKind};
use crate::tree::DocTree;
use std::ops::Range;

/// @ai:intent Grammar core; tag semantics are delegated to the registry
pub struct DocParser<'r> {
    registry: &'r Registry,
}

/// Payload text assembled from tokens, with the payload byte range of each
/// contributing token.
struct Payload {
    text: String,
    map: Vec<(usize, Range<usize>)>,
}

impl<'r> DocParser<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// @ai:intent Parse a token stream into a tree
    /// @ai:post sibling spans are ordered and disjoint
    /// @ai:post every child span lies within its parent span
    /// @ai:effects pure
    pub fn parse(&self, tokens: &[Token]) -> DocTree {
        let mut tree = DocTree::new();
        let mut idx = match tokens.first() {
            Some(token) if token.kind == TokenKind::OpenTag => 1,
            _ => 0,
        };

        loop {
            while idx < tokens.len() && tokens[idx].is_separator() {
                idx += 1;
            }
            if idx >= tokens.len() || tokens[idx].kind == TokenKind::CloseTag {
                break;
            }

            let start = idx;
            let end = node_end(tokens, start);
            let id = if is_tag_start(tokens, start) {
                self.parse_tag(&mut tree, tokens, start, end)
            } else {
                let text = payload(tokens, start, end).text;
                tree.alloc(Node::Text(TextNode { text }))
            };
            tree.attributes_mut().set_span(id, Span::new(start, end));
            tree.push(id);
            idx = end;
        }

        if let Some(&last) = tree.children().last() {
            if let Some(span) = tree.attributes().span(last) {
                let offset = tokens[span.end - 1].end;
                tree.attributes_mut().set_last_token_position(offset);
            }
        }

        tree
    }

    fn parse_tag(&self, tree: &mut DocTree, tokens: &[Token], start: usize, end: usize) -> NodeId {
        let name = tokens[start + 1].text.as_str();
        let mut payload_start = start + 2;
        while payload_start < end && tokens[payload_start].kind == TokenKind::Whitespace {
            payload_start += 1;
        }
        let payload = payload(tokens, payload_start, end);

        let resolved = self.registry.resolve(name, &payload.text);
        let (id, children) = tree.alloc_resolved(name, resolved);

        let mut child_spans = Vec::with_capacity(children.len());
        for (child, range) in &children {
            match span_for_range(&payload.map, range) {
                Some(span) => child_spans.push((*child, span)),
                None => {
                    tracing::debug!("Cannot map @{} fragment {:?} to tokens, keeping tag generic", name, range);
                    tree.replace(
                        id,
                        Node::Tag(TagNode {
                            name: name.to_string(),
                            value: TagValue::generic(payload.text.clone()),
                        }),
                    );
                    return id;
                }
            }
        }
        for (child, span) in child_spans {
            tree.attributes_mut().set_span(child, span);
        }

        id
    }
}

fn is_tag_start(tokens: &[Token], idx: usize) -> bool {
    tokens[idx].kind == TokenKind::TagMarker
        && tokens.get(idx + 1).is_some_and(|t| t.kind == TokenKind::Identifier)
}

/// Finds where the node starting at `start` ends: before a blank line, a new
/// tag line, or the closing delimiter. Trailing separators are excluded.
fn node_end(tokens: &[Token], start: usize) -> usize {
    let mut content_end = start + 1;
    let mut j = start;

    while j < tokens.len() {
        let token = &tokens[j];
        match token.kind {
            TokenKind::CloseTag => break,
            TokenKind::Eol => {
                let mut k = j + 1;
                while k < tokens.len() && tokens[k].kind == TokenKind::Whitespace {
                    k += 1;
                }
                let stops = match tokens.get(k) {
                    None => true,
                    Some(next) => {
                        matches!(next.kind, TokenKind::Eol | TokenKind::CloseTag) || is_tag_start(tokens, k)
                    }
                };
                if stops {
                    break;
                }
            }
            TokenKind::Whitespace => {}
            _ => content_end = j + 1,
        }
        j += 1;
    }

    content_end
}

/// Joins tokens into text, folding each line break and its prefix to `\n`.
fn payload(tokens: &[Token], start: usize, end: usize) -> Payload {
    let mut text = String::new();
    let mut map = Vec::new();
    let mut after_eol = false;

    for (idx, token) in tokens.iter().enumerate().take(end).skip(start) {
        match token.kind {
            TokenKind::Eol => {
                text.push('\n');
                after_eol = true;
            }
            TokenKind::Whitespace if after_eol => {}
            _ => {
                let from = text.len();
                text.push_str(&token.text);
                map.push((idx, from..text.len()));
                after_eol = false;
            }
        }
    }

    Payload { text, map }
}

fn span_for_range(map: &[(usize, Range<usize>)], range: &Range<usize>) -> Option<Span> {
    let mut inside = map
        .iter()
        .filter(|(_, r)| r.start >= range.start && r.end <= range.end);
    let first = inside.next()?;
    let last = inside.last().unwrap_or(first);
    if first.1.start != range.start || last.1.end != range.end {
        return None;
    }
    Some(Span::new(first.0, last.0 + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tokenize;
    use crate::type_expr::DocTypeMapper;

    fn parse(raw: &str) -> (Vec<Token>, DocTree) {
        let registry = Registry::with_defaults();
        let tokens = tokenize(raw);
        let tree = DocParser::new(&registry).parse(&tokens);
        (tokens, tree)
    }

    fn source_of(raw: &str, tokens: &[Token], span: Span) -> String {
        raw[tokens[span.start].start..tokens[span.end - 1].end].to_string()
    }

    #[test]
    fn test_summary_and_tags() {
        let raw = "/**\n * Summary line.\n *\n * @param int $a\n * @return int\n */";
        let (tokens, tree) = parse(raw);

        assert_eq!(tree.children().len(), 3);
        let spans: Vec<String> = tree
            .children()
            .iter()
            .map(|&id| source_of(raw, &tokens, tree.attributes().span(id).unwrap()))
            .collect();
        assert_eq!(spans, vec!["Summary line.", "@param int $a", "@return int"]);
        assert_eq!(
            tree.attributes().last_token_position(),
            Some(raw.find("@return int").unwrap() + "@return int".len())
        );
    }

    #[test]
    fn test_multiline_description_belongs_to_tag() {
        let raw = "/**\n * @param string $name first line\n *     second line\n * @return void\n */";
        let (tokens, tree) = parse(raw);
        let first = tree.children()[0];
        let span = tree.attributes().span(first).unwrap();
        assert_eq!(source_of(raw, &tokens, span), "@param string $name first line\n *     second line");

        let value = tree.node(first).and_then(Node::tag_value).unwrap();
        match value {
            TagValue::Typed(typed) => assert_eq!(typed.description, "first line\nsecond line"),
            other => panic!("expected typed value, got {:?}", other),
        }
    }

    #[test]
    fn test_single_line_block() {
        let (tokens, tree) = parse("/** @var int $count */");
        assert_eq!(tree.children().len(), 1);
        let span = tree.attributes().span(tree.children()[0]).unwrap();
        assert_eq!(tokens[span.end].kind, TokenKind::Whitespace);
        assert_eq!(tokens[span.end + 1].kind, TokenKind::CloseTag);
    }

    #[test]
    fn test_unknown_tag_keeps_raw_payload() {
        let (_, tree) = parse("/**\n * @my-custom-thing foo bar\n */");
        let node = tree.node(tree.children()[0]).unwrap();
        assert_eq!(node.tag_name(), Some("my-custom-thing"));
        assert_eq!(node.tag_value(), Some(&TagValue::generic("foo bar")));
    }

    #[test]
    fn test_inline_at_is_prose() {
        let (_, tree) = parse("/**\n * Mail me at a @b.c or see {@link Foo}\n */");
        assert_eq!(tree.children().len(), 1);
        assert!(matches!(tree.node(tree.children()[0]), Some(Node::Text(_))));
    }

    #[test]
    fn test_method_children_spans_nest_in_parent() {
        let raw = "/**\n * @method static Foo make(int $a, string ...$rest) Factory\n */";
        let (tokens, tree) = parse(raw);
        let parent = tree.children()[0];
        let parent_span = tree.attributes().span(parent).unwrap();
        let children = tree.node(parent).unwrap().children().to_vec();
        assert_eq!(children.len(), 2);

        let mut previous_end = parent_span.start;
        for child in children {
            let span = tree.attributes().span(child).unwrap();
            assert!(parent_span.contains(&span));
            assert!(span.start >= previous_end);
            previous_end = span.end;
        }
        let last = tree.attributes().span(tree.node(parent).unwrap().children()[1]).unwrap();
        assert_eq!(source_of(raw, &tokens, last), "string ...$rest");
    }

    #[test]
    fn test_empty_and_delimiter_only_input() {
        assert!(parse("").1.is_empty());
        assert!(parse("/** */").1.is_empty());
        assert!(parse("/**\n *\n */").1.is_empty());
        assert_eq!(parse("/**\n *\n */").1.attributes().last_token_position(), None);
    }

    #[test]
    fn test_blank_line_splits_text() {
        let (_, tree) = parse("/**\n * First paragraph\n * continues.\n *\n * Second.\n */");
        assert_eq!(tree.children().len(), 2);
        assert_eq!(tree.render_node(tree.children()[0], &DocTypeMapper), "First paragraph\ncontinues.");
    }
}
