//! Typed records over the generic tree.
//!
//! Every record type has an explicit `from_sexpr` constructor driven by
//! [`Args`]: a node's children split into a leading run of plain atoms
//! (positional), child nodes grouped by tag (keyword, repeats collected in
//! order), and bare atoms after the first child node treated as boolean
//! flags (`hide`, `bold`, ...). The schema is closed-world: leftover fields
//! of any kind are rejected.

pub mod schematic;
pub mod shapes;
pub mod symbol;

pub use schematic::{PaperChoice, Schematic, Sheet, SymbolPlaced, Wire, SUPPORTED_SCHEMATIC_VERSION};
pub use shapes::{Fill, FillType, Pts, Stroke, StrokeType, Xy};
pub use symbol::{Effects, Font, Justify, Symbol, SymbolProperty};

use std::collections::HashSet;

use uuid::Uuid;

use crate::error::Error;
use crate::sexpr::{Atom, Expr, Value};

/// Construct a typed record from a generic tree node.
pub trait FromSexpr: Sized {
    /// The s-expression tag this record corresponds to.
    const TAG: &'static str;

    fn from_sexpr(expr: &Expr) -> Result<Self, Error>;
}

/// An RGBA color as KiCad writes it: integer channels plus a float alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: f64) -> Self {
        Color { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::new(0, 0, 0, 1.0)
    }
}

/// Split view over a node's children, with consumption tracking so the
/// closed-world check can name whatever a record did not understand.
pub struct Args<'a> {
    context: String,
    positional: Vec<&'a Atom>,
    pos_taken: usize,
    keyword: Vec<(String, Vec<&'a Expr>)>,
    kw_taken: HashSet<String>,
    flags: Vec<String>,
    flags_taken: HashSet<String>,
}

impl<'a> Args<'a> {
    pub fn new(expr: &'a Expr) -> Args<'a> {
        let mut positional = Vec::new();
        let mut keyword: Vec<(String, Vec<&'a Expr>)> = Vec::new();
        let mut flags = Vec::new();
        let mut seen_node = false;

        for child in expr.children() {
            match child {
                Value::Atom(a) if !seen_node => positional.push(a),
                // a bare atom after keyword arguments acts as a flag
                Value::Atom(a) => flags.push(a.key_string()),
                Value::Node(node) => {
                    seen_node = true;
                    match keyword.iter_mut().find(|(tag, _)| *tag == node.tag) {
                        Some((_, items)) => items.push(node),
                        None => keyword.push((node.tag.clone(), vec![node])),
                    }
                }
            }
        }

        Args {
            context: expr.tag.clone(),
            positional,
            pos_taken: 0,
            keyword,
            kw_taken: HashSet::new(),
            flags,
            flags_taken: HashSet::new(),
        }
    }

    fn err_syntax(&self, msg: String) -> Error {
        Error::syntax(format!("({}) {msg}", self.context))
    }

    fn err_validation(&self, msg: String) -> Error {
        Error::validation(format!("({}) {msg}", self.context))
    }

    // ─── Positional arguments ────────────────────────────────────────

    pub fn opt_pos_atom(&mut self) -> Option<&'a Atom> {
        let atom = *self.positional.get(self.pos_taken)?;
        self.pos_taken += 1;
        Some(atom)
    }

    pub fn pos_atom(&mut self, field: &str) -> Result<&'a Atom, Error> {
        self.opt_pos_atom()
            .ok_or_else(|| self.err_syntax(format!("missing argument '{field}'")))
    }

    pub fn pos_string(&mut self, field: &str) -> Result<String, Error> {
        let atom = self.pos_atom(field)?;
        atom.unquoted()
            .map(str::to_string)
            .ok_or_else(|| self.err_validation(format!("'{field}' is not a string: {atom}")))
    }

    pub fn opt_pos_string(&mut self) -> Option<String> {
        let atom = *self.positional.get(self.pos_taken)?;
        let s = atom.unquoted()?;
        self.pos_taken += 1;
        Some(s.to_string())
    }

    pub fn pos_f64(&mut self, field: &str) -> Result<f64, Error> {
        let atom = self.pos_atom(field)?;
        atom.as_f64()
            .ok_or_else(|| self.err_validation(format!("'{field}' is not a number: {atom}")))
    }

    pub fn opt_pos_i64(&mut self) -> Option<i64> {
        let atom = *self.positional.get(self.pos_taken)?;
        let v = atom.as_i64()?;
        self.pos_taken += 1;
        Some(v)
    }

    // ─── Keyword arguments ───────────────────────────────────────────

    fn take(&mut self, tag: &str) -> Option<Vec<&'a Expr>> {
        self.kw_taken.insert(tag.to_string());
        self.keyword
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, items)| items.clone())
    }

    /// At most one occurrence of `tag`; more is an arity error.
    pub fn one(&mut self, tag: &str) -> Result<Option<&'a Expr>, Error> {
        match self.take(tag) {
            None => Ok(None),
            Some(items) if items.len() == 1 => Ok(Some(items[0])),
            Some(items) => Err(self.err_syntax(format!(
                "expecting only one ({tag}) but got {}",
                items.len()
            ))),
        }
    }

    /// Every occurrence of `tag`, in order.
    pub fn many(&mut self, tag: &str) -> Vec<&'a Expr> {
        self.take(tag).unwrap_or_default()
    }

    pub fn flag(&mut self, name: &str) -> bool {
        self.flags_taken.insert(name.to_string());
        self.flags.iter().any(|f| f == name)
    }

    // ─── Typed keyword conveniences ──────────────────────────────────

    fn scalar_atom(&mut self, tag: &str) -> Result<Option<&'a Atom>, Error> {
        let Some(node) = self.one(tag)? else {
            return Ok(None);
        };
        if node.len() != 1 {
            return Err(self.err_syntax(format!(
                "expecting exactly one value in {node}"
            )));
        }
        match node.atom_at(0) {
            Some(atom) => Ok(Some(atom)),
            None => Err(self.err_validation(format!("expecting an atom in {node}"))),
        }
    }

    pub fn scalar_f64(&mut self, tag: &str) -> Result<Option<f64>, Error> {
        match self.scalar_atom(tag)? {
            None => Ok(None),
            Some(atom) => atom
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.err_validation(format!("({tag}) is not a number: {atom}"))),
        }
    }

    pub fn scalar_i64(&mut self, tag: &str) -> Result<Option<i64>, Error> {
        match self.scalar_atom(tag)? {
            None => Ok(None),
            Some(atom) => atom
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.err_validation(format!("({tag}) is not an integer: {atom}"))),
        }
    }

    pub fn scalar_string(&mut self, tag: &str) -> Result<Option<String>, Error> {
        match self.scalar_atom(tag)? {
            None => Ok(None),
            Some(atom) => Ok(Some(atom.key_string())),
        }
    }

    /// `(tag yes)` / `(tag no)` style booleans.
    pub fn scalar_bool(&mut self, tag: &str) -> Result<Option<bool>, Error> {
        match self.scalar_atom(tag)? {
            None => Ok(None),
            Some(atom) => match atom.unquoted() {
                Some("yes") => Ok(Some(true)),
                Some("no") => Ok(Some(false)),
                _ => Err(self.err_validation(format!("({tag}) is not yes/no: {atom}"))),
            },
        }
    }

    fn tuple_values(&mut self, tag: &str, min: usize, max: usize) -> Result<Option<Vec<f64>>, Error> {
        let Some(node) = self.one(tag)? else {
            return Ok(None);
        };
        if node.len() < min || node.len() > max {
            return Err(self.err_syntax(format!("wrong number of values in {node}")));
        }
        let mut values = Vec::with_capacity(node.len());
        for i in 0..node.len() {
            match node.f64_at(i) {
                Some(v) => values.push(v),
                None => {
                    return Err(self.err_validation(format!("({tag}) is not numeric: {node}")))
                }
            }
        }
        Ok(Some(values))
    }

    pub fn tuple2(&mut self, tag: &str) -> Result<Option<(f64, f64)>, Error> {
        Ok(self.tuple_values(tag, 2, 2)?.map(|v| (v[0], v[1])))
    }

    /// `(tag x y)` or `(tag x y angle)`; a missing angle defaults to 0.
    pub fn tuple3(&mut self, tag: &str) -> Result<Option<(f64, f64, f64)>, Error> {
        Ok(self
            .tuple_values(tag, 2, 3)?
            .map(|v| (v[0], v[1], v.get(2).copied().unwrap_or(0.0))))
    }

    pub fn color(&mut self, tag: &str) -> Result<Option<Color>, Error> {
        let Some(values) = self.tuple_values(tag, 4, 4)? else {
            return Ok(None);
        };
        Ok(Some(Color::new(
            values[0] as u8,
            values[1] as u8,
            values[2] as u8,
            values[3],
        )))
    }

    pub fn uuid(&mut self, tag: &str) -> Result<Option<Uuid>, Error> {
        match self.scalar_atom(tag)? {
            None => Ok(None),
            Some(atom) => {
                let text = atom
                    .unquoted()
                    .ok_or_else(|| self.err_validation(format!("({tag}) is not a string")))?;
                Uuid::parse_str(text).map(Some).map_err(|e| {
                    self.err_validation(format!("({tag}) is not a valid identifier: {e}"))
                })
            }
        }
    }

    /// All atoms of a single `(tag a b c ...)` occurrence as strings.
    pub fn strings(&mut self, tag: &str) -> Result<Vec<String>, Error> {
        let Some(node) = self.one(tag)? else {
            return Ok(Vec::new());
        };
        let mut out = Vec::with_capacity(node.len());
        for child in node.children() {
            match child {
                Value::Atom(a) => out.push(a.key_string()),
                Value::Node(n) => {
                    return Err(self.err_validation(format!("({tag}) holds a non-atom: {n}")))
                }
            }
        }
        Ok(out)
    }

    pub fn record<T: FromSexpr>(&mut self) -> Result<Option<T>, Error> {
        match self.one(T::TAG)? {
            None => Ok(None),
            Some(node) => Ok(Some(T::from_sexpr(node)?)),
        }
    }

    pub fn records<T: FromSexpr>(&mut self) -> Result<Vec<T>, Error> {
        self.many(T::TAG)
            .into_iter()
            .map(T::from_sexpr)
            .collect()
    }

    // ─── Closed world ────────────────────────────────────────────────

    /// Reject anything the record constructor did not consume.
    pub fn finish(self) -> Result<(), Error> {
        if self.pos_taken < self.positional.len() {
            return Err(Error::syntax(format!(
                "({}) has {} unexpected extra argument(s), starting with '{}'",
                self.context,
                self.positional.len() - self.pos_taken,
                self.positional[self.pos_taken]
            )));
        }
        for (tag, _) in &self.keyword {
            if !self.kw_taken.contains(tag) {
                return Err(Error::validation(format!(
                    "({}) has unknown field ({tag})",
                    self.context
                )));
            }
        }
        for flag in &self.flags {
            if !self.flags_taken.contains(flag) {
                return Err(Error::validation(format!(
                    "({}) has unknown flag '{flag}'",
                    self.context
                )));
            }
        }
        Ok(())
    }
}

/// Check the node's tag against the record's, for use at the top of every
/// `from_sexpr`.
pub fn expect_tag(expr: &Expr, tag: &str) -> Result<(), Error> {
    if expr.tag == tag {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "expected ({tag} ...), got ({})",
            expr.tag
        )))
    }
}
