//! S-expression parsing for KiCad files.
//!
//! Grammar:
//!   sexpr  = '(' tag atom_or_sexpr* ')'
//!   atom   = string | number | symbol
//!   string = '"' [^"\\]* (\\. [^"\\]*)* '"'  (escapes kept verbatim)
//!   number = int | float
//!   symbol = [^ \t\n\r()"]+

pub mod expr;
pub mod parse;
pub mod tokens;

pub use expr::{Atom, Attr, Expr, NodeKind, Value};
pub use parse::{from_str, node_kind};
pub use tokens::{tokenize, Token};
