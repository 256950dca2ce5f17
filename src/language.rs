//! @ai:module:intent Define which source languages carry `/** */` doc blocks
//! @ai:module:layer domain
//! @ai:module:public_api Language, CommentStyle, detect_language, is_supported_file
//! @ai:module:stateless true

use serde::Serialize;
use std::path::Path;

/// @ai:intent A source language whose declarations take doc blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Php,
    Java,
    TypeScript,
    JavaScript,
    C,
    Cpp,
    Rust,
}

const ALL_LANGUAGES: [Language; 7] = [
    Language::Php,
    Language::Java,
    Language::TypeScript,
    Language::JavaScript,
    Language::C,
    Language::Cpp,
    Language::Rust,
];

/// @ai:intent Comment syntax the extractor needs to tell doc blocks from plain comments
#[derive(Debug, Clone)]
pub struct CommentStyle {
    pub single_line: Vec<&'static str>,
    pub doc_start: &'static str,
    pub block_start: &'static str,
    pub block_end: &'static str,
}

impl Language {
    /// @ai:intent Get the comment style for this language
    /// @ai:effects pure
    pub fn comment_style(&self) -> CommentStyle {
        let single_line = match self {
            Language::Php => vec!["//", "#"],
            _ => vec!["//"],
        };
        CommentStyle {
            single_line,
            doc_start: "/**",
            block_start: "/*",
            block_end: "*/",
        }
    }

    /// @ai:intent Get file extensions for this language
    /// @ai:effects pure
    pub fn extensions(&self) -> &[&str] {
        match self {
            Language::Php => &["php", "phpt", "inc"],
            Language::Java => &["java"],
            Language::TypeScript => &["ts", "tsx"],
            Language::JavaScript => &["js", "jsx", "mjs"],
            Language::C => &["c", "h"],
            Language::Cpp => &["cpp", "cc", "cxx", "hpp", "hh", "hxx"],
            Language::Rust => &["rs"],
        }
    }

    /// @ai:intent Get language name as string
    /// @ai:effects pure
    pub fn name(&self) -> &'static str {
        match self {
            Language::Php => "php",
            Language::Java => "java",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Rust => "rust",
        }
    }
}

/// @ai:intent Detect the language from a file path
/// @ai:post result is Some if extension is recognized
/// @ai:example ("Foo.php") -> Some(Php)
/// @ai:example ("test.py") -> None
/// @ai:effects pure
pub fn detect_language(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?;
    ALL_LANGUAGES
        .into_iter()
        .find(|lang| lang.extensions().contains(&ext))
}

/// @ai:intent Check if a file should be scanned based on extension
/// @ai:effects pure
pub fn is_supported_file(path: &Path) -> bool {
    detect_language(path).is_some()
}
