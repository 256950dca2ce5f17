//! @ai:module:intent Format CLI reports as text or JSON
//! @ai:module:layer infrastructure
//! @ai:module:public_api OutputFormat, BlockReport, NodeReport, RoundTripReport, EditReport, format_tokens, format_blocks, format_round_trip, format_edit
//! @ai:module:depends_on doc_block, token, attribute
//! @ai:module:stateless true

use crate::attribute::{AttributeKey, AttributeValue};
use crate::doc_block::DocBlock;
use crate::node::{Node, NodeId, Span};
use crate::token::{Token, TokenKind};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// @ai:intent Output format options
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
}

/// @ai:intent Token stream of one doc block
#[derive(Debug, Clone, Serialize)]
pub struct TokenReport {
    pub subject: String,
    pub line: usize,
    pub tokens: Vec<Token>,
}

/// @ai:intent Parsed tree of one doc block
#[derive(Debug, Clone, Serialize)]
pub struct BlockReport {
    pub subject: String,
    pub line: usize,
    pub nodes: Vec<NodeReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    pub id: usize,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// Provenance and extension attributes, keyed by name; the span is reported separately.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeValue>,
    pub rendered: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeReport>,
}

/// @ai:intent Result of printing every block of a file without edits
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoundTripReport {
    pub files: usize,
    pub blocks: usize,
    pub mismatches: Vec<Mismatch>,
    /// Files that could not be read or scanned.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Mismatch {
    pub path: PathBuf,
    pub line: usize,
    pub detail: String,
}

/// @ai:intent Blocks changed by an edit run
#[derive(Debug, Clone, Default, Serialize)]
pub struct EditReport {
    pub files: Vec<EditedFile>,
    pub written: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditedFile {
    pub path: PathBuf,
    pub blocks: Vec<EditedBlock>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditedBlock {
    pub subject: String,
    pub line: usize,
    pub before: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl RoundTripReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

impl BlockReport {
    /// @ai:intent Describe a parsed block node by node
    pub fn new(subject: impl Into<String>, line: usize, block: &DocBlock) -> Self {
        Self {
            subject: subject.into(),
            line,
            nodes: block.tree().children().iter().map(|&id| node_report(block, id)).collect(),
        }
    }
}

fn node_report(block: &DocBlock, id: NodeId) -> NodeReport {
    let tree = block.tree();
    let node = tree.node(id);
    let kind = match node {
        Some(Node::Text(_)) => "text",
        Some(Node::Tag(_)) => "tag",
        Some(Node::Leaf(_)) => "leaf",
        Some(Node::Container(_)) => "container",
        None => "missing",
    };
    NodeReport {
        id: id.index(),
        kind,
        tag: node.and_then(Node::tag_name).map(str::to_string),
        span: tree.attributes().span(id),
        attributes: tree
            .attributes()
            .all(id)
            .into_iter()
            .filter(|(key, _)| **key != AttributeKey::StartAndEnd)
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect(),
        rendered: block.render_node(id),
        children: node
            .map(|n| n.children().iter().map(|&child| node_report(block, child)).collect())
            .unwrap_or_default(),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Option<String> {
    match format {
        OutputFormat::Json => Some(serde_json::to_string(value).unwrap_or_default()),
        OutputFormat::JsonPretty => Some(serde_json::to_string_pretty(value).unwrap_or_default()),
        OutputFormat::Text => None,
    }
}

/// @ai:intent Format token streams
/// @ai:effects pure
pub fn format_tokens(reports: &[TokenReport], format: OutputFormat) -> String {
    if let Some(json) = to_json(reports, format) {
        return json;
    }
    let mut output = String::new();
    for report in reports {
        output.push_str(&format!("{} (line {})\n", report.subject.cyan(), report.line));
        for token in &report.tokens {
            let kind = format!("{:?}", token.kind);
            let kind = match token.kind {
                TokenKind::OpenTag | TokenKind::CloseTag => kind.magenta(),
                TokenKind::TagMarker | TokenKind::Identifier => kind.yellow(),
                TokenKind::Eol | TokenKind::Whitespace => kind.dimmed(),
                TokenKind::Text | TokenKind::Other => kind.normal(),
            };
            output.push_str(&format!(
                "  {:>5}..{:<5} {:<12} {:?}\n",
                token.start, token.end, kind, token.text
            ));
        }
    }
    output
}

/// @ai:intent Format parsed trees
/// @ai:effects pure
pub fn format_blocks(reports: &[BlockReport], format: OutputFormat) -> String {
    if let Some(json) = to_json(reports, format) {
        return json;
    }
    let mut output = String::new();
    for report in reports {
        output.push_str(&format!("{} (line {})\n", report.subject.cyan(), report.line));
        for node in &report.nodes {
            push_node_text(&mut output, node, 1);
        }
    }
    output
}

fn push_node_text(output: &mut String, node: &NodeReport, depth: usize) {
    let indent = "  ".repeat(depth);
    let span = node
        .span
        .map(|s| format!("[{}..{}]", s.start, s.end))
        .unwrap_or_else(|| "[new]".to_string());
    let first_line = node.rendered.lines().next().unwrap_or("");
    let flags: String = node.attributes.keys().map(|key| format!(" <{}>", key)).collect();
    output.push_str(&format!(
        "{}{} {}{} {}\n",
        indent,
        node.kind.bold(),
        span.dimmed(),
        flags.yellow(),
        first_line
    ));
    for child in &node.children {
        push_node_text(output, child, depth + 1);
    }
}

fn push_skipped(output: &mut String, skipped: &[PathBuf]) {
    for path in skipped {
        output.push_str(&format!("{} {}\n", "SKIPPED".yellow().bold(), path.display()));
    }
}

/// @ai:intent Format a round-trip run
/// @ai:effects pure
pub fn format_round_trip(report: &RoundTripReport, format: OutputFormat) -> String {
    if let Some(json) = to_json(report, format) {
        return json;
    }
    let mut output = String::new();
    for mismatch in &report.mismatches {
        output.push_str(&format!(
            "{} {}:{} - {}\n",
            "ERROR".red().bold(),
            mismatch.path.display().to_string().dimmed(),
            mismatch.line,
            mismatch.detail
        ));
    }
    push_skipped(&mut output, &report.skipped);
    output.push_str(&format!(
        "Checked {} files, {} doc blocks\n",
        report.files, report.blocks
    ));
    if report.passed() {
        output.push_str(&format!("{} Every block printed back unchanged\n", "OK".green().bold()));
    } else {
        output.push_str(&format!(
            "{} mismatches\n",
            report.mismatches.len().to_string().red().bold()
        ));
    }
    output
}

/// @ai:intent Format an edit run as before/after pairs
/// @ai:effects pure
pub fn format_edit(report: &EditReport, format: OutputFormat) -> String {
    if let Some(json) = to_json(report, format) {
        return json;
    }
    let mut output = String::new();
    let mut changed = 0;
    for file in &report.files {
        output.push_str(&format!("{}\n", file.path.display().to_string().bold()));
        for block in &file.blocks {
            changed += 1;
            output.push_str(&format!("  {} (line {}):\n", block.subject.cyan(), block.line));
            for line in block.before.lines() {
                output.push_str(&format!("    {}\n", format!("- {}", line).red()));
            }
            match &block.after {
                Some(after) => {
                    for line in after.lines() {
                        output.push_str(&format!("    {}\n", format!("+ {}", line).green()));
                    }
                }
                None => output.push_str(&format!("    {}\n", "(removed)".dimmed())),
            }
        }
    }
    push_skipped(&mut output, &report.skipped);
    let verb = if report.written { "Rewrote" } else { "Would rewrite" };
    output.push_str(&format!("{} {} doc blocks\n", verb, changed));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::DeclarationId;
    use crate::registry::Registry;
    use std::sync::Arc;

    fn block(raw: &str) -> DocBlock {
        DocBlock::parse(Some(DeclarationId(0)), raw, Arc::new(Registry::with_defaults()))
    }

    #[test]
    fn test_block_report_nests_container_children() {
        let report = BlockReport::new("sum", 3, &block("/**\n * Sums.\n * @method int sum(int $a)\n */"));
        assert_eq!(report.nodes.len(), 2);
        assert_eq!(report.nodes[0].kind, "text");
        let method = &report.nodes[1];
        assert_eq!(method.kind, "container");
        assert_eq!(method.tag.as_deref(), Some("method"));
        assert_eq!(method.children.len(), 1);
        assert_eq!(method.children[0].rendered, "int $a");
    }

    #[test]
    fn test_blocks_json_has_spans() {
        let report = BlockReport::new("x", 1, &block("/** @var int */"));
        let json = format_blocks(&[report], OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["nodes"][0]["tag"], "var");
        assert_eq!(value[0]["nodes"][0]["span"]["start"], 2);
    }

    #[test]
    fn test_block_report_lists_provenance_attributes() {
        let mut block = block("/**\n * @return int\n */");
        let added = block.add_tag("throws", "RuntimeException").unwrap();
        let report = BlockReport::new("run", 1, &block);

        assert!(report.nodes[0].attributes.is_empty());
        assert_eq!(report.nodes[1].id, added.index());
        assert_eq!(report.nodes[1].attributes.get("synthesized"), Some(&AttributeValue::Flag(true)));

        let json = format_blocks(&[report.clone()], OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["nodes"][1]["attributes"]["synthesized"], true);
        assert!(value[0]["nodes"][0].get("attributes").is_none());

        colored::control::set_override(false);
        let text = format_blocks(&[report], OutputFormat::Text);
        assert!(text.contains("tag [new] <synthesized> @throws RuntimeException"));
    }

    #[test]
    fn test_round_trip_text_summary() {
        colored::control::set_override(false);
        let mut report = RoundTripReport {
            files: 2,
            blocks: 5,
            mismatches: Vec::new(),
            skipped: Vec::new(),
        };
        assert!(format_round_trip(&report, OutputFormat::Text).contains("OK Every block"));

        report.mismatches.push(Mismatch {
            path: PathBuf::from("a.php"),
            line: 4,
            detail: "output differs".to_string(),
        });
        let text = format_round_trip(&report, OutputFormat::Text);
        assert!(text.contains("ERROR a.php:4 - output differs"));
        assert!(text.contains("1 mismatches"));
    }

    #[test]
    fn test_edit_text_marks_removed_blocks() {
        colored::control::set_override(false);
        let report = EditReport {
            files: vec![EditedFile {
                path: PathBuf::from("a.php"),
                blocks: vec![EditedBlock {
                    subject: "run".to_string(),
                    line: 2,
                    before: "/** @var int */".to_string(),
                    after: None,
                }],
            }],
            written: false,
            skipped: vec![PathBuf::from("broken.php")],
        };
        let text = format_edit(&report, OutputFormat::Text);
        assert!(text.contains("- /** @var int */"));
        assert!(text.contains("(removed)"));
        assert!(text.contains("SKIPPED broken.php\n"));
        assert!(text.ends_with("Would rewrite 1 doc blocks\n"));
    }
}
