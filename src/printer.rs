//! @ai:module:intent Print a doc block, reusing original text for every untouched node
//! @ai:module:layer application
//! @ai:module:public_api DocBlockPrinter
//! @ai:module:depends_on doc_block, declaration, tree, token, error
//! @ai:module:stateless true

use crate::declaration::Declaration;
use crate::doc_block::DocBlock;
use crate::error::{Error, Result};
use crate::node::NodeId;
use crate::token::{Token, TokenKind};

pub const DEFAULT_LINE_MARKER: &str = " * ";

/// @ai:intent Incremental printer with a canonical fallback style
#[derive(Debug, Clone)]
pub struct DocBlockPrinter {
    /// Written after the indentation on every canonically wrapped line.
    line_marker: String,
}

impl Default for DocBlockPrinter {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_MARKER)
    }
}

/// Layout facts about the original text, computed once per print.
struct Layout<'a> {
    raw: &'a str,
    tokens: &'a [Token],
    /// Index past the opening delimiter (0 when there is none).
    open_end: usize,
    /// Index of the first token that belongs to a node.
    first_content: usize,
    /// Byte offset where the last original node ended.
    last_position: usize,
    rewrap: bool,
    eol: String,
}

impl DocBlockPrinter {
    pub fn new(line_marker: impl Into<String>) -> Self {
        Self {
            line_marker: line_marker.into(),
        }
    }

    /// @ai:intent Print the block attached to `host`
    /// @ai:pre block was created for host
    /// @ai:post !block.is_dirty() implies result == block.original_text()
    pub fn print<D>(&self, block: &DocBlock, host: &D) -> Result<String>
    where
        D: Declaration + ?Sized,
    {
        match block.declaration() {
            Some(id) if id == host.id() => Ok(self.print_with_indent(block, host.indentation())),
            Some(id) => Err(Error::invariant(format!(
                "doc block of declaration {} printed for declaration {}",
                id.0,
                host.id().0
            ))),
            None => Err(Error::invariant("doc block is detached from its declaration")),
        }
    }

    /// @ai:intent Print the declaration's cached block and write the text back
    /// @ai:post returns false and leaves the declaration alone when nothing changed
    /// @ai:effects mutates decl
    pub fn apply<D>(&self, decl: &mut D) -> Result<bool>
    where
        D: Declaration + ?Sized,
    {
        let block = decl
            .doc_block()
            .ok_or_else(|| Error::invariant("no doc block attached to declaration"))?;
        if !block.is_dirty() {
            return Ok(false);
        }
        let printed = self.print(block, &*decl)?;
        decl.set_doc_comment(if printed.is_empty() { None } else { Some(printed) });
        Ok(true)
    }

    /// @ai:intent Print with an explicit ambient indentation
    /// @ai:effects pure
    pub fn print_with_indent(&self, block: &DocBlock, indent: &str) -> String {
        if !block.is_dirty() {
            return block.original_text().to_string();
        }
        if block.tree().is_empty() {
            tracing::debug!("All nodes removed, dropping the doc comment");
            return String::new();
        }

        match self.layout(block, indent) {
            Some(layout) => self.print_incremental(block, &layout),
            None => self.print_canonical(block, indent),
        }
    }

    fn print_incremental(&self, block: &DocBlock, layout: &Layout<'_>) -> String {
        let tree = block.tree();
        let mut out = if layout.rewrap {
            let open = match layout.tokens.first() {
                Some(token) if token.kind == TokenKind::OpenTag => token.text.as_str(),
                _ => "/**",
            };
            tracing::debug!("Re-wrapping single-line doc block onto several lines");
            format!("{}{}", open, layout.eol)
        } else {
            layout.raw[..layout.tokens[layout.first_content].start].to_string()
        };

        for (position, &id) in tree.children().iter().enumerate() {
            if position > 0 {
                out.push_str(&self.separator(block, layout, id));
            }
            out.push_str(&self.node_text(block, layout, id));
        }

        if layout.rewrap {
            out.push_str(&closing_line(&layout.eol));
        } else {
            out.push_str(&layout.raw[layout.last_position..]);
        }
        out
    }

    fn print_canonical(&self, block: &DocBlock, indent: &str) -> String {
        let eol = format!("\n{}{}", indent, self.line_marker);
        let tree = block.tree();
        let mut out = String::from("/**");
        for &id in tree.children() {
            out.push_str(&eol);
            out.push_str(&join_lines(&block.render_node(id), &eol));
        }
        out.push_str(&closing_line(&eol));
        out
    }

    fn layout<'a>(&self, block: &'a DocBlock, indent: &str) -> Option<Layout<'a>> {
        let tokens = block.tokens();
        let last_position = block.tree().attributes().last_token_position()?;

        let open_end = match tokens.first() {
            Some(token) if token.kind == TokenKind::OpenTag => 1,
            _ => 0,
        };
        let first_content = (open_end..tokens.len()).find(|&i| !tokens[i].is_separator())?;

        let single_line = !tokens.iter().any(|t| t.kind == TokenKind::Eol);
        let starred = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Eol && t.text.trim_end_matches(' ').ends_with('*'))
            .map(|t| {
                if t.text.ends_with(' ') {
                    t.text.clone()
                } else {
                    format!("{} ", t.text)
                }
            });
        // Blocks written without a star column reuse their bare content prefix
        let eol = starred
            .or_else(|| bare_prefix(tokens))
            .unwrap_or_else(|| format!("\n{}{}", indent, self.line_marker));

        Some(Layout {
            raw: block.original_text(),
            tokens,
            open_end,
            first_content,
            last_position,
            rewrap: single_line && block.tree().children().len() > 1,
            eol,
        })
    }

    /// Original nodes keep the separator that preceded them; everything
    /// else starts on a fresh line.
    fn separator(&self, block: &DocBlock, layout: &Layout<'_>, id: NodeId) -> String {
        if let Some(span) = block.tree().attributes().span(id) {
            let mut gap = span.start;
            while gap > 0 && layout.tokens[gap - 1].is_separator() {
                gap -= 1;
            }
            let touches_header = gap <= layout.open_end;
            if !touches_header && !layout.rewrap && gap < span.start {
                return layout.raw[layout.tokens[gap].start..layout.tokens[span.start].start].to_string();
            }
        }
        layout.eol.clone()
    }

    fn node_text(&self, block: &DocBlock, layout: &Layout<'_>, id: NodeId) -> String {
        let tree = block.tree();
        match tree.attributes().span(id) {
            Some(span) if !tree.is_modified(id) && !span.is_empty() => {
                let start = layout.tokens[span.start].start;
                let end = layout.tokens[span.end - 1].end;
                layout.raw[start..end].to_string()
            }
            _ => join_lines(&block.render_node(id), &layout.eol),
        }
    }
}

/// First line break that leads into content rather than a blank line or the
/// closing delimiter.
fn bare_prefix(tokens: &[Token]) -> Option<String> {
    tokens.windows(2).find_map(|pair| {
        let leads_to_content = !matches!(pair[1].kind, TokenKind::Eol | TokenKind::CloseTag);
        (pair[0].kind == TokenKind::Eol && leads_to_content).then(|| pair[0].text.clone())
    })
}

/// Turns `\n` in rendered text into the block's line prefix, without
/// leaving trailing spaces on empty lines. A `*/` inside the text would end
/// the comment, so it is written as `*\/`.
fn join_lines(text: &str, eol: &str) -> String {
    let text = text.replace("*/", "*\\/");
    let mut out = String::new();
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            if line.is_empty() {
                out.push_str(eol.trim_end_matches(' '));
            } else {
                out.push_str(eol);
            }
        }
        out.push_str(line);
    }
    out
}

/// `"\n    * "` becomes `"\n    */"`.
fn closing_line(eol: &str) -> String {
    format!("{}/", eol.trim_end_matches(' '))
}
