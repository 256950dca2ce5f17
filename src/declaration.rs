//! @ai:module:intent Interface to the host declaration a doc block is attached to
//! @ai:module:layer domain
//! @ai:module:public_api Declaration, DeclarationId, SourceDeclaration
//! @ai:module:depends_on doc_block

use crate::doc_block::DocBlock;
use serde::Serialize;

/// @ai:intent Non-owning reference from a doc block back to its declaration
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub struct DeclarationId(pub usize);

/// @ai:intent What the core needs from a host AST declaration
///
/// The declaration owns its [`DocBlock`] through a single attribute slot;
/// the block only remembers the [`DeclarationId`].
pub trait Declaration {
    fn id(&self) -> DeclarationId;

    /// Raw text of the attached doc comment, delimiters included.
    fn doc_comment(&self) -> Option<&str>;

    /// True if plain (non-doc) comments are attached to the declaration.
    fn has_other_comments(&self) -> bool;

    /// Indentation of the declaration's first line, used when re-wrapping.
    fn indentation(&self) -> &str;

    fn doc_block(&self) -> Option<&DocBlock>;

    /// The attribute slot caching this declaration's doc block.
    fn doc_block_slot(&mut self) -> &mut Option<DocBlock>;

    fn doc_block_mut(&mut self) -> Option<&mut DocBlock> {
        self.doc_block_slot().as_mut()
    }

    /// Replaces (or with `None`, removes) the doc comment text.
    fn set_doc_comment(&mut self, text: Option<String>);
}

/// @ai:intent In-memory declaration used by the CLI and in tests
#[derive(Debug, Default)]
pub struct SourceDeclaration {
    pub id: usize,
    pub name: String,
    pub doc_comment: Option<String>,
    pub comments: Vec<String>,
    pub indentation: String,
    slot: Option<DocBlock>,
}

impl SourceDeclaration {
    /// @ai:intent Create a declaration with an optional doc comment
    pub fn new(id: usize, name: impl Into<String>, doc_comment: Option<&str>) -> Self {
        Self {
            id,
            name: name.into(),
            doc_comment: doc_comment.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn with_indentation(mut self, indentation: impl Into<String>) -> Self {
        self.indentation = indentation.into();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comments.push(comment.into());
        self
    }

    /// @ai:intent Drop the cached doc block; the next request re-parses
    pub fn detach_doc_block(&mut self) -> Option<DocBlock> {
        self.slot.take()
    }
}

impl Declaration for SourceDeclaration {
    fn id(&self) -> DeclarationId {
        DeclarationId(self.id)
    }

    fn doc_comment(&self) -> Option<&str> {
        self.doc_comment.as_deref()
    }

    fn has_other_comments(&self) -> bool {
        !self.comments.is_empty()
    }

    fn indentation(&self) -> &str {
        &self.indentation
    }

    fn doc_block(&self) -> Option<&DocBlock> {
        self.slot.as_ref()
    }

    fn doc_block_slot(&mut self) -> &mut Option<DocBlock> {
        &mut self.slot
    }

    fn set_doc_comment(&mut self, text: Option<String>) {
        self.doc_comment = text;
    }
}
