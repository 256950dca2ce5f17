//! @ai:module:intent Create doc block handles once per declaration and cache them on it
//! @ai:module:layer application
//! @ai:module:public_api DocBlockFactory
//! @ai:module:depends_on doc_block, declaration, registry

use crate::declaration::Declaration;
use crate::doc_block::DocBlock;
use crate::registry::Registry;
use std::sync::Arc;

/// @ai:intent Attach-once factory for [`DocBlock`] handles
#[derive(Debug, Clone)]
pub struct DocBlockFactory {
    registry: Arc<Registry>,
}

impl Default for DocBlockFactory {
    fn default() -> Self {
        Self::new(Registry::global())
    }
}

impl DocBlockFactory {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// @ai:intent Return the cached handle, or parse one, or attach an empty one
    /// @ai:post the same handle is returned for the same declaration until detached
    /// @ai:idempotent true
    pub fn create_from_node_or_empty<'d, D>(&self, decl: &'d mut D) -> &'d mut DocBlock
    where
        D: Declaration + ?Sized,
    {
        let id = decl.id();
        if decl.doc_block().is_none() {
            let block = self
                .build(&*decl)
                .unwrap_or_else(|| DocBlock::empty(Some(id), Arc::clone(&self.registry)));
            return decl.doc_block_slot().insert(block);
        }
        decl.doc_block_slot()
            .get_or_insert_with(|| DocBlock::empty(Some(id), Arc::clone(&self.registry)))
    }

    /// @ai:intent Return the cached handle or parse one from the doc comment
    /// @ai:post None when the declaration has plain comments but no doc comment
    pub fn create_from_node<'d, D>(&self, decl: &'d mut D) -> Option<&'d mut DocBlock>
    where
        D: Declaration + ?Sized,
    {
        if decl.doc_block().is_some() {
            return decl.doc_block_mut();
        }
        let block = self.build(&*decl)?;
        Some(decl.doc_block_slot().insert(block))
    }

    /// @ai:intent Attach an empty handle unless one is already attached
    pub fn create_empty<'d, D>(&self, decl: &'d mut D) -> &'d mut DocBlock
    where
        D: Declaration + ?Sized,
    {
        let id = decl.id();
        decl.doc_block_slot()
            .get_or_insert_with(|| DocBlock::empty(Some(id), Arc::clone(&self.registry)))
    }

    fn build<D>(&self, decl: &D) -> Option<DocBlock>
    where
        D: Declaration + ?Sized,
    {
        let id = decl.id();
        match decl.doc_comment() {
            Some(raw) => Some(DocBlock::parse(Some(id), raw, Arc::clone(&self.registry))),
            None if decl.has_other_comments() => {
                tracing::debug!("Declaration {:?} has plain comments only, not attaching a doc block", id);
                None
            }
            None => Some(DocBlock::empty(Some(id), Arc::clone(&self.registry))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::SourceDeclaration;

    fn factory() -> DocBlockFactory {
        DocBlockFactory::new(Arc::new(Registry::with_defaults()))
    }

    #[test]
    fn test_attach_is_idempotent() {
        let factory = factory();
        let mut decl = SourceDeclaration::new(1, "run", Some("/** @return int */"));

        let first: *const DocBlock = factory.create_from_node_or_empty(&mut decl);
        // a changed comment must not trigger a re-parse while a handle is cached
        decl.doc_comment = Some("/** @return string */".to_string());
        let second: *const DocBlock = factory.create_from_node_or_empty(&mut decl);

        assert!(std::ptr::eq(first, second));
        let block = factory.create_from_node(&mut decl).unwrap();
        assert_eq!(block.original_text(), "/** @return int */");
    }

    #[test]
    fn test_mutations_survive_re_request() {
        let factory = factory();
        let mut decl = SourceDeclaration::new(2, "run", None);
        factory
            .create_from_node_or_empty(&mut decl)
            .add_tag("return", "void")
            .unwrap();

        let block = factory.create_from_node_or_empty(&mut decl);
        assert!(block.is_dirty());
        assert!(block.has_tag("return"));
    }

    #[test]
    fn test_plain_comments_block_creation() {
        let factory = factory();
        let mut decl = SourceDeclaration::new(3, "run", None).with_comment("// note");
        let id = decl.id();
        assert!(factory.create_from_node(&mut decl).is_none());

        let block = factory.create_from_node_or_empty(&mut decl);
        assert!(block.tree().is_empty());
        assert_eq!(block.declaration(), Some(id));
    }

    #[test]
    fn test_create_empty_keeps_existing_handle() {
        let factory = factory();
        let mut decl = SourceDeclaration::new(4, "run", Some("/** @var int */"));
        factory.create_from_node(&mut decl).unwrap();
        let block = factory.create_empty(&mut decl);
        assert!(block.has_tag("var"));
    }

    #[test]
    fn test_detach_allows_reparse() {
        let factory = factory();
        let mut decl = SourceDeclaration::new(5, "run", Some("/** @var int */"));
        factory.create_from_node_or_empty(&mut decl);
        decl.doc_comment = Some("/** @var string */".to_string());
        assert!(decl.detach_doc_block().is_some());

        let block = factory.create_from_node_or_empty(&mut decl);
        assert_eq!(block.var_type().map(|t| t.to_string()), Some("string".to_string()));
    }
}
