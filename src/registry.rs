//! @ai:module:intent Pluggable recognizers that turn generic tags into specialized nodes
//! @ai:module:layer domain
//! @ai:module:public_api Registry, TagPredicate, Resolved, Fragment
//! @ai:module:depends_on node, type_expr, error
//! @ai:module:thread_safe true

use crate::error::{Error, Result};
use crate::node::{MethodSignature, TagValue, TypedValue};
use crate::type_expr::{DocTypeMapper, TypeExpr, TypeMapper};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Tags whose payload is `type [$variable] [description]`.
pub const DEFAULT_VARIABLE_TAGS: &[&str] = &["param", "var", "property", "property-read", "property-write"];

/// Tags whose payload is `type [description]`.
pub const DEFAULT_TYPED_TAGS: &[&str] = &["return", "throws", "mixin", "extends", "implements"];

pub const DEFAULT_VENDOR_PREFIXES: &[&str] = &["phpstan-", "psalm-"];

static METHOD_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(?:phpstan|psalm)-)?method$").expect("Invalid regex"));

static GLOBAL: OnceCell<Arc<Registry>> = OnceCell::new();

/// @ai:intent What a recognizer produced for a tag payload
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Tag(TagValue),
    /// A tag with child fragments; ranges are byte offsets into the payload.
    Container {
        signature: MethodSignature,
        params: Vec<Fragment>,
        description: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub range: Range<usize>,
}

/// @ai:intent Decides which tag names a recognizer applies to
pub enum TagPredicate {
    Exact(String),
    AnyOf(HashSet<String>),
    Prefix(String),
    Pattern(Regex),
    Custom(Box<dyn Fn(&str) -> bool + Send + Sync>),
}

impl TagPredicate {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            TagPredicate::Exact(expected) => name == expected,
            TagPredicate::AnyOf(names) => names.contains(name),
            TagPredicate::Prefix(prefix) => name.starts_with(prefix.as_str()),
            TagPredicate::Pattern(re) => re.is_match(name),
            TagPredicate::Custom(pred) => pred(name),
        }
    }
}

impl fmt::Debug for TagPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagPredicate::Exact(name) => write!(f, "Exact({:?})", name),
            TagPredicate::AnyOf(names) => write!(f, "AnyOf({} names)", names.len()),
            TagPredicate::Prefix(prefix) => write!(f, "Prefix({:?})", prefix),
            TagPredicate::Pattern(re) => write!(f, "Pattern({:?})", re.as_str()),
            TagPredicate::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

type Builder = Box<dyn Fn(&str, &str) -> Option<Resolved> + Send + Sync>;

struct Recognizer {
    predicate: TagPredicate,
    builder: Builder,
}

/// @ai:intent Ordered strategy table of (predicate, builder) pairs
///
/// Built during startup and read-only afterwards, so it is shared between
/// workers through an `Arc` without locking. The mapper that parsed a type
/// also writes it back when an edited node is printed.
pub struct Registry {
    recognizers: Vec<Recognizer>,
    mapper: Arc<dyn TypeMapper>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_mapper(Arc::new(DocTypeMapper))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.recognizers.iter().map(|r| &r.predicate))
            .finish()
    }
}

impl Registry {
    /// @ai:intent Create a registry without recognizers; every tag stays generic
    pub fn new() -> Self {
        Self::default()
    }

    /// @ai:intent Create an empty registry that renders types with `mapper`
    pub fn with_mapper(mapper: Arc<dyn TypeMapper>) -> Self {
        Self {
            recognizers: Vec::new(),
            mapper,
        }
    }

    /// @ai:intent Create a registry with the built-in type-bearing and method recognizers
    pub fn with_defaults() -> Self {
        Self::from_vocabulary(
            DEFAULT_VARIABLE_TAGS,
            DEFAULT_TYPED_TAGS,
            DEFAULT_VENDOR_PREFIXES,
            Arc::new(DocTypeMapper),
        )
    }

    /// @ai:intent Build the standard recognizers for a custom tag vocabulary
    /// @ai:post each name is also recognized with every vendor prefix
    pub fn from_vocabulary<S: AsRef<str>>(
        variable_tags: &[S],
        typed_tags: &[S],
        vendor_prefixes: &[S],
        mapper: Arc<dyn TypeMapper>,
    ) -> Self {
        let mut registry = Self::with_mapper(Arc::clone(&mapper));

        let mapper_for_vars = Arc::clone(&mapper);
        registry.register(
            TagPredicate::AnyOf(expand_names(variable_tags, vendor_prefixes)),
            move |_, payload| resolve_typed(mapper_for_vars.as_ref(), payload, true),
        );

        let mapper_for_types = Arc::clone(&mapper);
        registry.register(
            TagPredicate::AnyOf(expand_names(typed_tags, vendor_prefixes)),
            move |_, payload| resolve_typed(mapper_for_types.as_ref(), payload, false),
        );

        registry.register(TagPredicate::Pattern(METHOD_TAG.clone()), move |_, payload| {
            resolve_method(mapper.as_ref(), payload)
        });

        registry
    }

    /// @ai:intent Append a recognizer; earlier registrations take precedence
    pub fn register<F>(&mut self, predicate: TagPredicate, builder: F) -> &mut Self
    where
        F: Fn(&str, &str) -> Option<Resolved> + Send + Sync + 'static,
    {
        self.recognizers.push(Recognizer {
            predicate,
            builder: Box::new(builder),
        });
        self
    }

    /// @ai:intent Reinterpret a tag payload with the first matching recognizer
    /// @ai:post never fails; unknown or malformed payloads become Generic
    /// @ai:effects pure
    pub fn resolve(&self, name: &str, payload: &str) -> Resolved {
        for recognizer in &self.recognizers {
            if !recognizer.predicate.matches(name) {
                continue;
            }
            if let Some(resolved) = (recognizer.builder)(name, payload) {
                return resolved;
            }
            tracing::debug!("Recognizer {:?} declined @{} payload {:?}", recognizer.predicate, name, payload);
        }
        Resolved::Tag(TagValue::generic(payload))
    }

    pub fn mapper(&self) -> &dyn TypeMapper {
        self.mapper.as_ref()
    }

    /// @ai:intent Write a type back to payload text with the host mapper
    pub fn render_type(&self, ty: &TypeExpr) -> String {
        self.mapper.render(ty)
    }

    pub fn len(&self) -> usize {
        self.recognizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recognizers.is_empty()
    }

    /// @ai:intent Install the process-wide registry during startup
    /// @ai:pre called at most once, before any call to global()
    pub fn install_global(registry: Registry) -> Result<()> {
        GLOBAL
            .set(Arc::new(registry))
            .map_err(|_| Error::contract("global registry is already installed"))
    }

    /// @ai:intent Get the process-wide registry, defaulting to the built-in recognizers
    pub fn global() -> Arc<Registry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Registry::with_defaults())))
    }
}

fn expand_names<S: AsRef<str>>(names: &[S], prefixes: &[S]) -> HashSet<String> {
    let mut expanded = HashSet::new();
    for name in names {
        let name = name.as_ref();
        expanded.insert(name.to_string());
        for prefix in prefixes {
            expanded.insert(format!("{}{}", prefix.as_ref(), name));
        }
    }
    expanded
}

/// Parses `type [$variable] [description]`.
fn resolve_typed(mapper: &dyn TypeMapper, payload: &str, with_variable: bool) -> Option<Resolved> {
    let (ty, consumed) = mapper.parse(payload)?;
    let rest = &payload[consumed..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let mut rest = rest.trim_start();

    let mut variable = None;
    if with_variable {
        let candidate = rest.split_whitespace().next().unwrap_or("");
        let bare = candidate.trim_start_matches('&').trim_start_matches("...");
        if bare.len() > 1 && bare.starts_with('$') {
            variable = Some(candidate.to_string());
            rest = rest[candidate.len()..].trim_start();
        }
    }

    Some(Resolved::Tag(TagValue::Typed(TypedValue {
        ty,
        variable,
        description: rest.to_string(),
    })))
}

/// Parses `[static] [return-type] name(params) [description]`.
fn resolve_method(mapper: &dyn TypeMapper, payload: &str) -> Option<Resolved> {
    let open = payload.find('(')?;
    let close = matching_paren(payload, open)?;
    let head = &payload[..open];

    let (is_static, head) = match head.strip_prefix("static") {
        Some(rest) if rest.starts_with(char::is_whitespace) && !rest.trim().is_empty() => {
            (true, rest.trim_start())
        }
        _ => (false, head),
    };

    let head = head.trim_end();
    let (return_type, method) = match head.rfind(char::is_whitespace) {
        Some(split) => {
            let type_text = head[..split].trim_end();
            let (ty, consumed) = mapper.parse(type_text)?;
            if consumed != type_text.len() {
                return None;
            }
            (Some(ty), head[split..].trim_start())
        }
        None => (None, head),
    };
    if method.is_empty() || !method.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }

    let params = split_params(payload, open + 1, close);
    let description = payload[close + 1..].trim().to_string();

    Some(Resolved::Container {
        signature: MethodSignature {
            is_static,
            return_type,
            method: method.to_string(),
        },
        params,
        description,
    })
}

fn matching_paren(src: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, c) in src[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits `src[start..end]` on top-level commas into trimmed fragments.
fn split_params(src: &str, start: usize, end: usize) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut depth = 0i32;
    let mut piece_start = start;

    let mut push_piece = |from: usize, to: usize| {
        let piece = &src[from..to];
        let trimmed = piece.trim();
        if trimmed.is_empty() {
            return;
        }
        let offset = from + (piece.len() - piece.trim_start().len());
        fragments.push(Fragment {
            text: trimmed.to_string(),
            range: offset..offset + trimmed.len(),
        });
    };

    for (idx, c) in src[start..end].char_indices() {
        match c {
            '(' | '<' | '[' | '{' => depth += 1,
            ')' | '>' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                push_piece(piece_start, start + idx);
                piece_start = start + idx + 1;
            }
            _ => {}
        }
    }
    push_piece(piece_start, end);

    fragments
}
