//! Parsing, geometry, and composition for KiCad design files.
//!
//! The core is a tokenizer and recursive-descent parser producing a generic
//! tagged tree ([`sexpr::Expr`]) whose nodes carry specialized behaviors
//! (moves, corner geometry, identifier regeneration), a typed [`schema`]
//! layer validating schematics record by record, and a document model
//! ([`document`]) that resolves hierarchical projects, extracts bill-of-
//! materials metadata, and composes multiple documents into one.

pub mod bbox;
pub mod document;
pub mod draw;
pub mod error;
pub mod geometry;
pub mod schema;
pub mod sexpr;
pub mod svg;

use std::path::Path;

pub use bbox::BoundingBox;
pub use document::{Metadata, Pcb, Project, Schematic};
pub use error::Error;
pub use sexpr::{Atom, Attr, Expr, NodeKind};

/// Parse a schematic file (convenience wrapper).
pub fn parse_schematic(path: &Path) -> Result<Schematic, Error> {
    Schematic::from_file(path)
}

/// Parse a board file (convenience wrapper).
pub fn parse_pcb(path: &Path) -> Result<Pcb, Error> {
    Pcb::from_file(path)
}

/// Parse raw s-expression text into the generic tree.
pub fn parse_str(text: &str) -> Result<Expr, Error> {
    sexpr::from_str(text)
}
