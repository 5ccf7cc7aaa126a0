//! The generic tagged tree: ordered, heterogeneous children under a tag,
//! with cached child-tag cardinality sets driving attribute-style lookup.

use std::collections::HashSet;
use std::fmt;

/// A leaf value. Quoted strings keep their quote characters verbatim;
/// quoting and unquoting is the caller's responsibility.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Atom {
    /// Resolve a raw token: int, else float, else string, in that order.
    pub fn from_token(token: &str) -> Atom {
        if token.starts_with('"') {
            return Atom::Str(token.to_string());
        }
        if let Ok(i) = token.parse::<i64>() {
            return Atom::Int(i);
        }
        if let Ok(v) = token.parse::<f64>() {
            return Atom::Float(v);
        }
        Atom::Str(token.to_string())
    }

    /// Wrap a string in quotes.
    pub fn quoted(s: &str) -> Atom {
        Atom::Str(format!("\"{s}\""))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Atom::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Atom::Int(i) => Some(*i as f64),
            Atom::Float(v) => Some(*v),
            Atom::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Atom::Str(s) => Some(s),
            _ => None,
        }
    }

    /// String content with surrounding quotes stripped, if any.
    pub fn unquoted(&self) -> Option<&str> {
        let s = self.as_str()?;
        if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
            Some(&s[1..s.len() - 1])
        } else {
            Some(s)
        }
    }

    /// Key for keyed child lookup: unquoted text for strings, the printed
    /// form for numbers.
    pub fn key_string(&self) -> String {
        match self {
            Atom::Str(_) => self.unquoted().unwrap_or_default().to_string(),
            other => other.to_string(),
        }
    }

    /// Add a numeric offset in place. No-op on strings.
    pub fn offset(&mut self, d: f64) {
        match self {
            Atom::Int(i) => *self = Atom::Float(*i as f64 + d),
            Atom::Float(v) => *v += d,
            Atom::Str(_) => {}
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Int(i) => write!(f, "{i}"),
            // integral floats print one decimal so the atom stays a float
            // across a serialize/parse round trip
            Atom::Float(v) if v.fract() == 0.0 && v.is_finite() && v.abs() < 1e15 => {
                write!(f, "{v:.1}")
            }
            Atom::Float(v) => write!(f, "{v}"),
            Atom::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Atom {
    fn from(i: i64) -> Self {
        Atom::Int(i)
    }
}

impl From<f64> for Atom {
    fn from(v: f64) -> Self {
        Atom::Float(v)
    }
}

impl From<&str> for Atom {
    fn from(s: &str) -> Self {
        Atom::Str(s.to_string())
    }
}

impl From<String> for Atom {
    fn from(s: String) -> Self {
        Atom::Str(s)
    }
}

/// Which specialized behavior set a node carries. Decided once at parse time
/// by [`super::parse::node_kind`] and never changed for the node's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Plain,
    /// Has a leading `[x, y{, angle}]` position and supports relative moves.
    Movable,
    /// A points container whose translation moves every contained `xy`.
    PointList,
    Pad,
    FootprintLine,
    Polygon,
    Footprint,
    /// Convertible to a vector-graphic fragment.
    Drawable,
    /// A regenerable unique identifier (`uuid`, `tstamp`).
    TimestampId,
    Net,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Atom(Atom),
    Node(Expr),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Atom(a) => write!(f, "{a}"),
            Value::Node(e) => write!(f, "{e}"),
        }
    }
}

/// Result of attribute-style child lookup, see [`Expr::get`].
#[derive(Debug)]
pub enum Attr<'a> {
    NotFound,
    Single(&'a Expr),
    /// Repeated tag keyed by each occurrence's first field (quotes stripped).
    Map(Vec<(String, &'a Expr)>),
    /// Repeated tag with colliding or non-atomic keys: plain ordered list.
    Many(Vec<&'a Expr>),
}

impl<'a> Attr<'a> {
    pub fn single(self) -> Option<&'a Expr> {
        match self {
            Attr::Single(e) => Some(e),
            _ => None,
        }
    }

    /// All occurrences in order regardless of how the lookup resolved.
    pub fn list(self) -> Vec<&'a Expr> {
        match self {
            Attr::NotFound => Vec::new(),
            Attr::Single(e) => vec![e],
            Attr::Map(m) => m.into_iter().map(|(_, e)| e).collect(),
            Attr::Many(v) => v,
        }
    }

    /// Keyed lookup, only available when the tag resolved to a map.
    pub fn by_key(&self, key: &str) -> Option<&'a Expr> {
        match self {
            Attr::Map(m) => m.iter().find(|(k, _)| k == key).map(|(_, e)| *e),
            _ => None,
        }
    }
}

/// A tagged node. Children are both the positional-argument list and the
/// keyword-like storage; insertion order is significant.
#[derive(Debug, Clone)]
pub struct Expr {
    pub tag: String,
    pub kind: NodeKind,
    children: Vec<Value>,
    known_tags: HashSet<String>,
    repeated_tags: HashSet<String>,
}

impl PartialEq for Expr {
    // cardinality sets are derived, kind is derived from context
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.children == other.children
    }
}

impl Expr {
    /// New empty node. The kind is resolved context-free, which is what
    /// programmatic construction wants (`uuid` nodes still randomize etc.).
    pub fn new(tag: &str) -> Expr {
        Self::with_kind(tag, super::parse::node_kind(tag, "", ""))
    }

    pub fn with_kind(tag: &str, kind: NodeKind) -> Expr {
        Expr {
            tag: tag.to_string(),
            kind,
            children: Vec::new(),
            known_tags: HashSet::new(),
            repeated_tags: HashSet::new(),
        }
    }

    // ─── Construction ────────────────────────────────────────────────

    pub fn push(&mut self, value: Value) {
        if let Value::Node(node) = &value {
            if !self.known_tags.insert(node.tag.clone()) {
                self.repeated_tags.insert(node.tag.clone());
            }
        }
        self.children.push(value);
    }

    pub fn push_atom(&mut self, atom: impl Into<Atom>) {
        self.push(Value::Atom(atom.into()));
    }

    pub fn push_node(&mut self, node: Expr) {
        self.push(Value::Node(node));
    }

    /// Chainable atom append, for tree-builder style construction.
    pub fn atom(mut self, atom: impl Into<Atom>) -> Self {
        self.push_atom(atom);
        self
    }

    /// Chainable node append.
    pub fn node(mut self, node: Expr) -> Self {
        self.push_node(node);
        self
    }

    /// Recompute the cardinality sets. `push` maintains them incrementally;
    /// code that mutates `children_mut()` directly must call this before the
    /// next `get`.
    pub fn finalize(&mut self) {
        self.known_tags.clear();
        self.repeated_tags.clear();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut repeated: HashSet<&str> = HashSet::new();
        for child in &self.children {
            if let Value::Node(node) = child {
                if !seen.insert(&node.tag) {
                    repeated.insert(&node.tag);
                }
            }
        }
        self.known_tags = seen.into_iter().map(str::to_string).collect();
        self.repeated_tags = repeated.into_iter().map(str::to_string).collect();
    }

    // ─── Access ──────────────────────────────────────────────────────

    pub fn children(&self) -> &[Value] {
        &self.children
    }

    /// Raw child list access. The cardinality cache is not updated until
    /// [`Expr::finalize`] is called.
    pub fn children_mut(&mut self) -> &mut Vec<Value> {
        &mut self.children
    }

    /// Consume the node, yielding its children.
    pub fn into_children(self) -> Vec<Value> {
        self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Expr> {
        self.children.iter().filter_map(|c| match c {
            Value::Node(e) => Some(e),
            _ => None,
        })
    }

    pub fn atom_at(&self, index: usize) -> Option<&Atom> {
        match self.children.get(index) {
            Some(Value::Atom(a)) => Some(a),
            _ => None,
        }
    }

    pub fn atom_at_mut(&mut self, index: usize) -> Option<&mut Atom> {
        match self.children.get_mut(index) {
            Some(Value::Atom(a)) => Some(a),
            _ => None,
        }
    }

    pub fn f64_at(&self, index: usize) -> Option<f64> {
        self.atom_at(index).and_then(Atom::as_f64)
    }

    pub fn i64_at(&self, index: usize) -> Option<i64> {
        self.atom_at(index).and_then(Atom::as_i64)
    }

    /// The nth child atom as unquoted text.
    pub fn str_at(&self, index: usize) -> Option<&str> {
        self.atom_at(index).and_then(Atom::unquoted)
    }

    /// Attribute-style lookup of a child tag.
    ///
    /// Resolution depends on the data, not a schema: a tag seen exactly once
    /// yields the child itself; a repeated tag yields a map keyed by each
    /// occurrence's first field when those keys are plain atoms without
    /// duplicates, and falls back to an ordered list otherwise.
    pub fn get(&self, tag: &str) -> Attr<'_> {
        if !self.known_tags.contains(tag) {
            return Attr::NotFound;
        }
        if !self.repeated_tags.contains(tag) {
            for node in self.nodes() {
                if node.tag == tag {
                    return Attr::Single(node);
                }
            }
            return Attr::NotFound;
        }

        let items: Vec<&Expr> = self.nodes().filter(|n| n.tag == tag).collect();
        let mut map: Vec<(String, &Expr)> = Vec::with_capacity(items.len());
        let mut seen: HashSet<String> = HashSet::new();
        let mut keyable = true;
        for item in &items {
            match item.children.first() {
                Some(Value::Atom(a)) => {
                    let key = a.key_string();
                    if !seen.insert(key.clone()) {
                        keyable = false;
                        break;
                    }
                    map.push((key, *item));
                }
                _ => {
                    keyable = false;
                    break;
                }
            }
        }
        if keyable {
            Attr::Map(map)
        } else {
            Attr::Many(items)
        }
    }

    /// All children with the given tag, in order.
    pub fn get_all(&self, tag: &str) -> Vec<&Expr> {
        self.nodes().filter(|n| n.tag == tag).collect()
    }

    // ─── Traversal ───────────────────────────────────────────────────

    /// Call `f` on this node and every descendant matching `kind`.
    pub fn walk<F: FnMut(&Expr)>(&self, kind: NodeKind, f: &mut F) {
        if self.kind == kind {
            f(self);
        }
        for node in self.nodes() {
            node.walk(kind, f);
        }
    }

    /// Mutating variant of [`Expr::walk`].
    pub fn walk_mut<F: FnMut(&mut Expr)>(&mut self, kind: NodeKind, f: &mut F) {
        if self.kind == kind {
            f(self);
        }
        for child in &mut self.children {
            if let Value::Node(node) = child {
                node.walk_mut(kind, f);
            }
        }
    }

    /// Fallible mutating traversal; stops at the first error.
    pub fn try_walk_mut<F>(&mut self, kind: NodeKind, f: &mut F) -> Result<(), crate::error::Error>
    where
        F: FnMut(&mut Expr) -> Result<(), crate::error::Error>,
    {
        if self.kind == kind {
            f(self)?;
        }
        for child in &mut self.children {
            if let Value::Node(node) = child {
                node.try_walk_mut(kind, f)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.tag)?;
        for child in &self.children {
            write!(f, " {child}")?;
        }
        write!(f, ")")
    }
}
