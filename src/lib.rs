//! @ai:module:intent Format-preserving doc block parser and incremental printer
//! @ai:module:layer infrastructure
//! @ai:module:public_api token, parser, tree, registry, doc_block, factory, printer, config, extractor, output
//!
//! # Docblock Parser
//!
//! Parses `/** ... */` annotation comments into a tree, lets callers query and
//! edit tags, and prints the result back so that every untouched node keeps
//! its original bytes.
//!
//! ## Example
//!
//! ```rust
//! use docblock_parser::{DocBlockFactory, DocBlockPrinter, SourceDeclaration};
//!
//! let mut decl = SourceDeclaration::new(1, "add", Some("/**\n * @param int $a\n * @return int\n */"));
//! let factory = DocBlockFactory::default();
//! factory.create_from_node_or_empty(&mut decl).remove_tags_by_name("param").unwrap();
//!
//! DocBlockPrinter::default().apply(&mut decl).unwrap();
//! assert_eq!(decl.doc_comment.as_deref(), Some("/**\n * @return int\n */"));
//! ```

pub mod attribute;
pub mod config;
pub mod declaration;
pub mod doc_block;
pub mod error;
pub mod extractor;
pub mod factory;
pub mod language;
pub mod node;
pub mod output;
pub mod parser;
pub mod printer;
pub mod registry;
pub mod token;
pub mod tree;
pub mod type_expr;

pub use attribute::{AttrTarget, AttributeKey, AttributeValue, Attributes};
pub use config::DocblockConfig;
pub use declaration::{Declaration, DeclarationId, SourceDeclaration};
pub use doc_block::DocBlock;
pub use error::{Error, Result};
pub use extractor::{collect_files, extract_file, DocEntry, SourceFile};
pub use factory::DocBlockFactory;
pub use language::{detect_language, is_supported_file, Language};
pub use node::{Node, NodeId, Span, TagValue, TypedValue};
pub use output::OutputFormat;
pub use parser::DocParser;
pub use printer::DocBlockPrinter;
pub use registry::{Registry, Resolved, TagPredicate};
pub use token::{reconstruct, tokenize, Token, TokenKind};
pub use tree::DocTree;
pub use type_expr::{parse_type, DocTypeMapper, TypeExpr, TypeMapper};
