//! @ai:module:intent Find doc blocks in source files and splice printed blocks back in
//! @ai:module:layer application
//! @ai:module:public_api SourceFile, DocEntry, extract_file, extract_source, collect_files
//! @ai:module:depends_on language, declaration, config, error

use crate::config::ScanConfig;
use crate::declaration::{Declaration, SourceDeclaration};
use crate::error::{Error, Result};
use crate::language::{detect_language, CommentStyle, Language};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::ops::Range;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

static DECLARATION_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:function|fn|class|interface|trait|enum|struct|const|var|let)\s+&?\$?([A-Za-z_][A-Za-z0-9_]*)")
        .expect("Invalid regex")
});
static PROPERTY_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("Invalid regex"));

/// @ai:intent One doc block found in a source file, with the code it documents
#[derive(Debug, Clone, Serialize)]
pub struct DocEntry {
    /// Byte range of the block, from `/**` through `*/`.
    pub range: Range<usize>,
    /// 1-based line of the opening delimiter.
    pub line: usize,
    pub indentation: String,
    /// Name of the documented declaration, or its first line when unrecognized.
    pub subject: String,
    /// Plain comments directly above or below the block.
    pub comments: Vec<String>,
}

/// @ai:intent A scanned source file
#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub language: Language,
    #[serde(skip)]
    pub source: String,
    pub entries: Vec<DocEntry>,
}

impl SourceFile {
    /// @ai:intent Raw text of an entry's doc block
    pub fn block_text(&self, entry: &DocEntry) -> &str {
        &self.source[entry.range.clone()]
    }

    /// @ai:intent One declaration per doc block, ids are entry indexes
    pub fn declarations(&self) -> Vec<SourceDeclaration> {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let mut decl = SourceDeclaration::new(idx, entry.subject.clone(), Some(self.block_text(entry)))
                    .with_indentation(entry.indentation.clone());
                decl.comments = entry.comments.clone();
                decl
            })
            .collect()
    }

    /// @ai:intent Rebuild the source with each declaration's current doc comment
    /// @ai:pre declarations come from self.declarations()
    /// @ai:post unchanged declarations leave their bytes untouched
    pub fn rewrite(&self, declarations: &[SourceDeclaration]) -> Result<String> {
        if declarations.len() != self.entries.len() {
            return Err(Error::contract(format!(
                "expected {} declarations, got {}",
                self.entries.len(),
                declarations.len()
            )));
        }

        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for (entry, decl) in self.entries.iter().zip(declarations) {
            let original = self.block_text(entry);
            match decl.doc_comment() {
                Some(text) if text == original => continue,
                Some(text) => {
                    out.push_str(&self.source[cursor..entry.range.start]);
                    out.push_str(text);
                    cursor = entry.range.end;
                }
                None => {
                    let lines = self.line_range(entry);
                    out.push_str(&self.source[cursor..lines.start]);
                    cursor = lines.end;
                }
            }
        }
        out.push_str(&self.source[cursor..]);
        Ok(out)
    }

    /// The whole lines a block occupies, trailing newline included.
    fn line_range(&self, entry: &DocEntry) -> Range<usize> {
        let start = entry.range.start - entry.indentation.len();
        let rest = &self.source[entry.range.end..];
        let end = match rest.find('\n') {
            Some(nl) if rest[..nl].trim().is_empty() => entry.range.end + nl + 1,
            _ => entry.range.end,
        };
        start..end
    }
}

/// @ai:intent Read and scan a single source file
/// @ai:pre path is a supported file type
/// @ai:effects fs:read
pub fn extract_file(path: &Path) -> Result<SourceFile> {
    let language = detect_language(path).ok_or_else(|| Error::UnsupportedFileType(path.display().to_string()))?;
    let source = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let file = extract_source(path, language, source);
    tracing::debug!(
        "Found {} {} doc blocks in {}",
        file.entries.len(),
        language.name(),
        path.display()
    );
    Ok(file)
}

/// @ai:intent Scan source text for doc blocks
/// @ai:effects pure
pub fn extract_source(path: &Path, language: Language, source: String) -> SourceFile {
    let style = language.comment_style();
    let mut entries = Vec::new();
    let mut search = 0;

    while let Some(found) = source[search..].find(style.doc_start) {
        let start = search + found;
        let Some(close) = source[start + style.doc_start.len() - 1..].find(style.block_end) else {
            break;
        };
        let end = start + style.doc_start.len() - 1 + close + style.block_end.len();
        search = end;

        let line_start = source[..start].rfind('\n').map_or(0, |nl| nl + 1);
        let indentation = &source[line_start..start];
        // `/**/` is an empty plain comment, and blocks after code are not doc blocks
        if end - start < 5 || !indentation.chars().all(|c| c == ' ' || c == '\t') {
            continue;
        }

        let mut comments = comments_above(&source[..line_start], &style);
        let (below, subject) = comments_and_subject_below(&source[end..], &style);
        comments.extend(below);

        entries.push(DocEntry {
            range: start..end,
            line: source[..start].matches('\n').count() + 1,
            indentation: indentation.to_string(),
            subject,
            comments,
        });
    }

    SourceFile {
        path: path.to_path_buf(),
        language,
        source,
        entries,
    }
}

/// @ai:intent Collect supported files under a path, honoring the scan filter
/// @ai:effects fs:read
pub fn collect_files(path: &Path, scan: &ScanConfig) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| !scan.excludes(p))
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            detect_language(p).is_some() && scan.accepts(ext)
        })
        .collect()
}

fn is_line_comment(line: &str, style: &CommentStyle) -> bool {
    let trimmed = line.trim_start();
    style.single_line.iter().any(|marker| trimmed.starts_with(marker))
        || (trimmed.starts_with(style.block_start)
            && !trimmed.starts_with(style.doc_start)
            && trimmed.trim_end().ends_with(style.block_end))
}

fn comments_above(before: &str, style: &CommentStyle) -> Vec<String> {
    let mut comments: Vec<String> = before
        .lines()
        .rev()
        .take_while(|line| is_line_comment(line, style))
        .map(|line| line.trim().to_string())
        .collect();
    comments.reverse();
    comments
}

fn comments_and_subject_below(after: &str, style: &CommentStyle) -> (Vec<String>, String) {
    let mut comments = Vec::new();
    for line in after.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if is_line_comment(line, style) {
            comments.push(line.trim().to_string());
            continue;
        }
        return (comments, subject_name(line.trim()));
    }
    (comments, String::new())
}

fn subject_name(line: &str) -> String {
    if let Some(captures) = DECLARATION_NAME.captures(line) {
        return captures[1].to_string();
    }
    if let Some(captures) = PROPERTY_NAME.captures(line) {
        return format!("${}", &captures[1]);
    }
    line.chars().take(60).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const PHP: &str = "<?php\n\nclass Calc\n{\n    /**\n     * Adds.\n     * @return int\n     */\n    public function add($a) {}\n\n    // helper\n    /** @var int */\n    private $count;\n}\n";

    fn php(source: &str) -> SourceFile {
        extract_source(Path::new("Calc.php"), Language::Php, source.to_string())
    }

    #[test]
    fn test_finds_blocks_with_subjects() {
        let file = php(PHP);
        assert_eq!(file.entries.len(), 2);

        let first = &file.entries[0];
        assert_eq!(first.line, 5);
        assert_eq!(first.indentation, "    ");
        assert_eq!(first.subject, "add");
        assert!(file.block_text(first).starts_with("/**\n     * Adds."));
        assert!(file.block_text(first).ends_with("     */"));

        let second = &file.entries[1];
        assert_eq!(file.block_text(second), "/** @var int */");
        assert_eq!(second.subject, "$count");
        assert_eq!(second.comments, vec!["// helper"]);
    }

    #[test]
    fn test_skips_empty_and_trailing_comments() {
        let file = php("<?php\n$a = 1; /** not a doc block */\n/**/\nfunction f() {}\n");
        assert!(file.entries.is_empty());
    }

    #[test]
    fn test_rewrite_untouched_is_identity() {
        let file = php(PHP);
        let decls = file.declarations();
        assert_eq!(file.rewrite(&decls).unwrap(), PHP);
    }

    #[test]
    fn test_rewrite_replaces_and_removes() {
        let file = php(PHP);
        let mut decls = file.declarations();
        decls[0].set_doc_comment(Some("/**\n     * @return float\n     */".to_string()));
        decls[1].set_doc_comment(None);

        let rewritten = file.rewrite(&decls).unwrap();
        assert_eq!(
            rewritten,
            "<?php\n\nclass Calc\n{\n    /**\n     * @return float\n     */\n    public function add($a) {}\n\n    // helper\n    private $count;\n}\n"
        );
        assert!(file.rewrite(&decls[..1]).is_err());
    }

    #[test]
    fn test_declarations_carry_context() {
        let decls = php(PHP).declarations();
        assert_eq!(decls[1].id().0, 1);
        assert_eq!(decls[1].indentation(), "    ");
        assert!(decls[1].has_other_comments());
        assert!(!decls[0].has_other_comments());
    }

    #[test]
    fn test_extract_file_and_unsupported_type() {
        let mut file = NamedTempFile::with_suffix(".ts").unwrap();
        write!(file, "/**\n * Greets.\n */\nexport function greet() {{}}\n").unwrap();

        let parsed = extract_file(file.path()).unwrap();
        assert_eq!(parsed.language, Language::TypeScript);
        assert_eq!(parsed.entries[0].subject, "greet");

        let txt = NamedTempFile::with_suffix(".txt").unwrap();
        assert!(matches!(extract_file(txt.path()), Err(Error::UnsupportedFileType(_))));
    }

    #[test]
    fn test_collect_files_honors_scan_config() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("vendor")).unwrap();
        std::fs::write(dir.path().join("a.php"), "").unwrap();
        std::fs::write(dir.path().join("b.js"), "").unwrap();
        std::fs::write(dir.path().join("notes.md"), "").unwrap();
        std::fs::write(dir.path().join("vendor").join("c.php"), "").unwrap();

        let scan = ScanConfig {
            extensions: vec!["php".to_string()],
            exclude: vec!["vendor".to_string()],
        };
        let files = collect_files(dir.path(), &scan);
        assert_eq!(files, vec![dir.path().join("a.php")]);

        assert_eq!(collect_files(dir.path(), &ScanConfig::default()).len(), 3);
    }
}
