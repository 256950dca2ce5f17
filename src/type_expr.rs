//! @ai:module:intent Parse and render type expressions found in tag payloads
//! @ai:module:layer domain
//! @ai:module:public_api TypeExpr, TypeMapper, DocTypeMapper, parse_type
//! @ai:module:stateless true

use serde::Serialize;
use std::fmt;

/// @ai:intent A small recursive tree for union/intersection/nullable types
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeExpr {
    Name { name: String },
    Nullable { inner: Box<TypeExpr> },
    Union { types: Vec<TypeExpr> },
    Intersection { types: Vec<TypeExpr> },
    Array { item: Box<TypeExpr> },
    Generic { base: String, params: Vec<TypeExpr> },
}

impl TypeExpr {
    pub fn name(name: impl Into<String>) -> Self {
        TypeExpr::Name { name: name.into() }
    }

    /// @ai:intent Collect every referenced type name in source order
    /// @ai:example ("?array<int, Foo>") -> ["array", "int", "Foo"]
    pub fn referenced_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TypeExpr::Name { name } => out.push(name),
            TypeExpr::Nullable { inner } | TypeExpr::Array { item: inner } => inner.collect_names(out),
            TypeExpr::Union { types } | TypeExpr::Intersection { types } => {
                types.iter().for_each(|t| t.collect_names(out))
            }
            TypeExpr::Generic { base, params } => {
                out.push(base);
                params.iter().for_each(|t| t.collect_names(out));
            }
        }
    }

    /// @ai:intent Check if null is accepted, either via `?T` or a `null` union member
    pub fn is_nullable(&self) -> bool {
        match self {
            TypeExpr::Nullable { .. } => true,
            TypeExpr::Name { name } => name.eq_ignore_ascii_case("null"),
            TypeExpr::Union { types } => types.iter().any(TypeExpr::is_nullable),
            _ => false,
        }
    }

    fn is_compound(&self) -> bool {
        matches!(self, TypeExpr::Union { .. } | TypeExpr::Intersection { .. })
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Name { name } => f.write_str(name),
            TypeExpr::Nullable { inner } if inner.is_compound() => write!(f, "?({})", inner),
            TypeExpr::Nullable { inner } => write!(f, "?{}", inner),
            TypeExpr::Array { item } if item.is_compound() => write!(f, "({})[]", item),
            TypeExpr::Array { item } => write!(f, "{}[]", item),
            TypeExpr::Union { types } => write_joined(f, types, "|"),
            TypeExpr::Intersection { types } => {
                for (idx, ty) in types.iter().enumerate() {
                    if idx > 0 {
                        f.write_str("&")?;
                    }
                    if matches!(ty, TypeExpr::Union { .. }) {
                        write!(f, "({})", ty)?;
                    } else {
                        write!(f, "{}", ty)?;
                    }
                }
                Ok(())
            }
            TypeExpr::Generic { base, params } => {
                write!(f, "{}<", base)?;
                write_joined(f, params, ", ")?;
                f.write_str(">")
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, types: &[TypeExpr], sep: &str) -> fmt::Result {
    for (idx, ty) in types.iter().enumerate() {
        if idx > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", ty)?;
    }
    Ok(())
}

/// @ai:intent Bidirectional contract with the host type system
///
/// Type-bearing recognizers only need to turn payload text into a
/// [`TypeExpr`] and back; hosts with a richer type model plug in here.
pub trait TypeMapper: Send + Sync {
    /// Parses a type at the start of `raw`, returning it with the number of
    /// bytes consumed.
    fn parse(&self, raw: &str) -> Option<(TypeExpr, usize)>;

    fn render(&self, ty: &TypeExpr) -> String;
}

/// @ai:intent Default mapper using the built-in type grammar
#[derive(Debug, Clone, Copy, Default)]
pub struct DocTypeMapper;

impl TypeMapper for DocTypeMapper {
    fn parse(&self, raw: &str) -> Option<(TypeExpr, usize)> {
        parse_type(raw)
    }

    fn render(&self, ty: &TypeExpr) -> String {
        ty.to_string()
    }
}

/// @ai:intent Parse the type expression at the start of `raw`
/// @ai:post Some((ty, n)) means raw[..n] is the text of ty
/// @ai:example ("int|null $x") -> Some((Union[int, null], 8))
/// @ai:example ("$x") -> None
/// @ai:effects pure
pub fn parse_type(raw: &str) -> Option<(TypeExpr, usize)> {
    let mut parser = TypeParser {
        src: raw,
        pos: 0,
        depth: 0,
        nesting: 0,
    };
    let ty = parser.union()?;
    Some((ty, parser.pos))
}

/// Deepest chain of `?`, `(`, `<` or `[]` a type may nest before the
/// payload is left unparsed.
const MAX_NESTING: usize = 64;

struct TypeParser<'a> {
    src: &'a str,
    pos: usize,
    /// Open brackets; whitespace is skipped while non-zero.
    depth: usize,
    /// Open `?`, `(` and `<` levels, bounded by `MAX_NESTING`.
    nesting: usize,
}

impl<'a> TypeParser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Whitespace is only insignificant inside brackets; at the top level it
    /// ends the type.
    fn skip_ws(&mut self) {
        if self.depth > 0 {
            let trimmed = self.rest().trim_start();
            self.pos = self.src.len() - trimmed.len();
        }
    }

    fn eat(&mut self, c: char) -> bool {
        let save = self.pos;
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            self.pos = save;
            false
        }
    }

    /// Enters one nesting level, refusing once the limit is reached.
    fn enter(&mut self) -> bool {
        if self.nesting >= MAX_NESTING {
            return false;
        }
        self.nesting += 1;
        true
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    fn union(&mut self) -> Option<TypeExpr> {
        let mut types = vec![self.intersection()?];
        loop {
            let save = self.pos;
            if !self.eat('|') {
                break;
            }
            self.skip_ws();
            match self.intersection() {
                Some(ty) => types.push(ty),
                None => {
                    self.pos = save;
                    break;
                }
            }
        }
        Some(collapse(types, |types| TypeExpr::Union { types }))
    }

    fn intersection(&mut self) -> Option<TypeExpr> {
        let mut types = vec![self.postfix()?];
        loop {
            let save = self.pos;
            if !self.eat('&') {
                break;
            }
            self.skip_ws();
            // `int &$x` is a by-reference parameter, not an intersection
            if matches!(self.peek(), Some('$') | Some('.')) {
                self.pos = save;
                break;
            }
            match self.postfix() {
                Some(ty) => types.push(ty),
                None => {
                    self.pos = save;
                    break;
                }
            }
        }
        Some(collapse(types, |types| TypeExpr::Intersection { types }))
    }

    fn postfix(&mut self) -> Option<TypeExpr> {
        let start = self.pos;
        let mut ty = self.atom()?;
        let mut dims = 0;
        while self.rest().starts_with("[]") {
            dims += 1;
            if dims > MAX_NESTING {
                self.pos = start;
                return None;
            }
            self.pos += 2;
            ty = TypeExpr::Array { item: Box::new(ty) };
        }
        Some(ty)
    }

    fn atom(&mut self) -> Option<TypeExpr> {
        match self.peek()? {
            '?' => {
                if !self.enter() {
                    return None;
                }
                let save = self.pos;
                self.pos += 1;
                let inner = self.postfix();
                self.leave();
                match inner {
                    Some(inner) => Some(TypeExpr::Nullable { inner: Box::new(inner) }),
                    None => {
                        self.pos = save;
                        None
                    }
                }
            }
            '(' => {
                if !self.enter() {
                    return None;
                }
                let save = self.pos;
                self.pos += 1;
                self.depth += 1;
                self.skip_ws();
                let inner = self.union();
                let closed = inner.is_some() && self.eat(')');
                self.depth -= 1;
                self.leave();
                if closed {
                    inner
                } else {
                    self.pos = save;
                    None
                }
            }
            c if is_name_start(c) => {
                let start = self.pos;
                let name = self.name();
                if name.starts_with('$') && name != "$this" {
                    self.pos = start;
                    return None;
                }
                if self.peek() == Some('<') {
                    let save = self.pos;
                    if let Some(params) = self.generic_params() {
                        return Some(TypeExpr::Generic { base: name, params });
                    }
                    self.pos = save;
                }
                Some(TypeExpr::Name { name })
            }
            _ => None,
        }
    }

    fn name(&mut self) -> String {
        let len = self
            .rest()
            .char_indices()
            .find(|&(_, c)| !is_name_char(c))
            .map_or(self.rest().len(), |(idx, _)| idx);
        let name = self.rest()[..len].to_string();
        self.pos += len;
        name
    }

    fn generic_params(&mut self) -> Option<Vec<TypeExpr>> {
        if !self.enter() {
            return None;
        }
        self.pos += 1;
        self.depth += 1;
        let mut params = Vec::new();
        let result = loop {
            self.skip_ws();
            match self.union() {
                Some(ty) => params.push(ty),
                None => break None,
            }
            if self.eat(',') {
                continue;
            }
            if self.eat('>') {
                break Some(params);
            }
            break None;
        };
        self.depth -= 1;
        self.leave();
        result
    }
}

fn collapse(mut types: Vec<TypeExpr>, wrap: impl FnOnce(Vec<TypeExpr>) -> TypeExpr) -> TypeExpr {
    if types.len() == 1 {
        types.remove(0)
    } else {
        wrap(types)
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '_' | '\\' | '$')
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '\\' | '$' | '-' | ':')
}
