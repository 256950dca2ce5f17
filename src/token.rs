//! @ai:module:intent Split raw doc-block text into a lossless token stream
//! @ai:module:layer domain
//! @ai:module:public_api Token, TokenKind, tokenize, reconstruct
//! @ai:module:stateless true

use serde::{Deserialize, Serialize};

/// @ai:intent Classifies a token of doc-block text
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Opening delimiter `/**` at the very start of the input.
    OpenTag,
    /// Closing delimiter `*/`.
    CloseTag,
    /// The `@` that introduces a tag name.
    TagMarker,
    Identifier,
    /// Line break plus the following line prefix (indent, `*`, one space).
    Eol,
    Whitespace,
    Text,
    Other,
}

/// @ai:intent A slice of the raw input with its byte offsets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl Token {
    /// @ai:intent Check if the token separates nodes rather than belonging to one
    pub fn is_separator(&self) -> bool {
        matches!(self.kind, TokenKind::Eol | TokenKind::Whitespace)
    }
}

const PUNCTUATION: &[char] = &['|', '&', '?', '<', '>', '(', ')', '[', ']', '{', '}', ',', '=', ':', ';'];

/// @ai:intent Tokenize raw doc-block text
/// @ai:post reconstruct(tokenize(raw)) == raw
/// @ai:post tokens are contiguous and ordered by offset
/// @ai:example ("/** @return int */") -> [OpenTag, Whitespace, TagMarker, Identifier, Whitespace, Identifier, Whitespace, CloseTag]
/// @ai:effects pure
pub fn tokenize(raw: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    if raw.starts_with("/**") {
        pos = push(&mut tokens, raw, TokenKind::OpenTag, 0, 3);
    } else if raw.starts_with("/*") {
        pos = push(&mut tokens, raw, TokenKind::OpenTag, 0, 2);
    }

    let mut after_marker = false;

    while pos < raw.len() {
        let rest = &raw[pos..];
        let (kind, len) = next_token(rest, after_marker);
        after_marker = kind == TokenKind::TagMarker;
        pos = push(&mut tokens, raw, kind, pos, pos + len);
    }

    tokens
}

/// @ai:intent Concatenate token texts back into the original input
/// @ai:effects pure
pub fn reconstruct(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

fn push(tokens: &mut Vec<Token>, raw: &str, kind: TokenKind, start: usize, end: usize) -> usize {
    tokens.push(Token {
        kind,
        text: raw[start..end].to_string(),
        start,
        end,
    });
    end
}

/// Returns the kind and byte length of the token at the start of `rest`.
fn next_token(rest: &str, after_marker: bool) -> (TokenKind, usize) {
    // `rest` is never empty here
    let first = rest.chars().next().unwrap_or(' ');

    if rest.starts_with("*/") {
        return (TokenKind::CloseTag, 2);
    }
    if let Some(len) = eol_len(rest) {
        return (TokenKind::Eol, len);
    }
    if after_marker && is_tag_name_char(first) {
        return (TokenKind::Identifier, run_len(rest, is_tag_name_char));
    }
    if is_marker(rest) {
        return (TokenKind::TagMarker, 1);
    }
    if first == ' ' || first == '\t' {
        return (TokenKind::Whitespace, run_len(rest, |c| c == ' ' || c == '\t'));
    }
    if is_word_start(first) {
        return (TokenKind::Identifier, run_len(rest, is_word_char));
    }
    if PUNCTUATION.contains(&first) {
        return (TokenKind::Other, first.len_utf8());
    }

    let mut len = first.len_utf8();
    while len < rest.len() && !starts_special(&rest[len..]) {
        len += rest[len..].chars().next().map_or(1, char::len_utf8);
    }
    (TokenKind::Text, len)
}

/// A line break followed by the line prefix: indentation, a `*` that does
/// not close the block, and at most one space.
fn eol_len(rest: &str) -> Option<usize> {
    let mut len = if rest.starts_with("\r\n") {
        2
    } else if rest.starts_with('\n') {
        1
    } else {
        return None;
    };

    let bytes = rest.as_bytes();
    while len < bytes.len() && (bytes[len] == b' ' || bytes[len] == b'\t') {
        len += 1;
    }
    if len < bytes.len() && bytes[len] == b'*' && bytes.get(len + 1) != Some(&b'/') {
        len += 1;
        if bytes.get(len) == Some(&b' ') {
            len += 1;
        }
    }
    Some(len)
}

fn is_marker(rest: &str) -> bool {
    let mut chars = rest.chars();
    chars.next() == Some('@') && chars.next().is_some_and(is_tag_name_start)
}

fn starts_special(rest: &str) -> bool {
    let first = match rest.chars().next() {
        Some(c) => c,
        None => return true,
    };
    first == ' '
        || first == '\t'
        || first == '\n'
        || rest.starts_with("\r\n")
        || rest.starts_with("*/")
        || is_marker(rest)
        || is_word_start(first)
        || PUNCTUATION.contains(&first)
}

fn run_len(rest: &str, pred: impl Fn(char) -> bool) -> usize {
    rest.char_indices()
        .find(|&(_, c)| !pred(c))
        .map_or(rest.len(), |(idx, _)| idx)
}

fn is_tag_name_start(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '\\'
}

fn is_tag_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '\\' | ':')
}

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '_' | '\\' | '$')
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '\\' | '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(raw: &str) -> Vec<TokenKind> {
        tokenize(raw).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_single_line_block() {
        use TokenKind::*;
        assert_eq!(
            kinds("/** @return int */"),
            vec![OpenTag, Whitespace, TagMarker, Identifier, Whitespace, Identifier, Whitespace, CloseTag]
        );
    }

    #[test]
    fn test_eol_owns_line_prefix() {
        let tokens = tokenize("/**\n     * @var int\n     */");
        assert_eq!(tokens[1].kind, TokenKind::Eol);
        assert_eq!(tokens[1].text, "\n     * ");
        let last_eol = tokens.iter().rev().find(|t| t.kind == TokenKind::Eol).unwrap();
        assert_eq!(last_eol.text, "\n     ");
        assert_eq!(tokens.last().unwrap().kind, TokenKind::CloseTag);
    }

    #[test]
    fn test_tag_name_allows_dashes() {
        let tokens = tokenize("@my-custom-thing foo");
        assert_eq!(tokens[0].kind, TokenKind::TagMarker);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].text, "my-custom-thing");
    }

    #[test]
    fn test_lossless_on_malformed_input() {
        let inputs = [
            "",
            "/**",
            "*/",
            "/** @ */",
            "/**\r\n * über @@param ¿? 0.5 {@see Foo::bar()}\r\n */",
            "plain text, no delimiters\n\n@tag",
            "/** @param array<int, string>|null $x desc */",
        ];
        for raw in inputs {
            let tokens = tokenize(raw);
            assert_eq!(reconstruct(&tokens), raw);
            for pair in tokens.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
        }
    }

    #[test]
    fn test_lone_at_is_text() {
        let tokens = tokenize("a @ b");
        assert!(tokens.iter().all(|t| t.kind != TokenKind::TagMarker));
    }

    #[test]
    fn test_offsets_match_text() {
        let raw = "/** ñ @see \\Foo\\Bar */";
        for token in tokenize(raw) {
            assert_eq!(&raw[token.start..token.end], token.text);
        }
    }
}
