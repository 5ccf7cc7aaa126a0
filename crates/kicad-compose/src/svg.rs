//! Whole-schematic SVG rendering.
//!
//! The symbol library is an explicit table built from a root's
//! `lib_symbols` block and owned by the caller; nothing here is shared
//! process-wide state.

use std::collections::HashMap;

use crate::draw;
use crate::error::Error;
use crate::sexpr::{Expr, NodeKind};

/// A4 landscape, in mm.
const PAGE_WIDTH: f64 = 297.0;
const PAGE_HEIGHT: f64 = 210.0;

/// Lookup table from library identifier (e.g. `Device:R`) to the symbol
/// definition node.
pub struct SymbolLibrary<'a> {
    symbols: HashMap<String, &'a Expr>,
}

impl<'a> SymbolLibrary<'a> {
    /// Collect the `lib_symbols` definitions of a parsed schematic root.
    pub fn from_root(root: &'a Expr) -> SymbolLibrary<'a> {
        let mut symbols = HashMap::new();
        if let Some(libs) = root.get("lib_symbols").single() {
            for symbol in libs.get_all("symbol") {
                if let Some(name) = symbol.str_at(0) {
                    symbols.insert(name.to_string(), symbol);
                }
            }
        }
        SymbolLibrary { symbols }
    }

    pub fn get(&self, name: &str) -> Option<&'a Expr> {
        self.symbols.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Render every drawable element of a schematic to SVG fragments, in
/// document order: sheet-space elements first, then each placed symbol's
/// library drawing at its anchor. Suppressed elements stay as `None` so
/// callers can count or filter them.
pub fn render(root: &Expr, lib: &SymbolLibrary<'_>) -> Result<Vec<Option<String>>, Error> {
    let mut fragments = Vec::new();

    for tag in [
        "wire",
        "junction",
        "label",
        "hierarchical_label",
        "global_label",
        "text",
    ] {
        for node in root.get_all(tag) {
            fragments.push(draw::draw(node, (0.0, 0.0), 0.0)?);
        }
    }

    for instance in root.get_all("symbol") {
        let Some(lib_id) = instance
            .get("lib_id")
            .single()
            .and_then(|l| l.str_at(0))
        else {
            continue;
        };
        let definition = lib.get(lib_id).ok_or_else(|| {
            Error::validation(format!("symbol '{lib_id}' not found in library"))
        })?;

        let at = instance.get("at").single();
        let x = at.and_then(|a| a.f64_at(0)).unwrap_or(0.0);
        let y = at.and_then(|a| a.f64_at(1)).unwrap_or(0.0);
        let angle = at.and_then(|a| a.f64_at(2)).unwrap_or(0.0);

        render_symbol(definition, (x, y), angle, &mut fragments)?;

        // instance properties (reference, value) carry sheet coordinates
        for property in instance.get_all("property") {
            fragments.push(draw::draw(property, (0.0, 0.0), 0.0)?);
        }
    }

    Ok(fragments)
}

/// Draw a library symbol definition (and its unit sub-symbols) at an
/// instance anchor. Library-side property templates are not drawn.
fn render_symbol(
    definition: &Expr,
    origin: (f64, f64),
    angle: f64,
    out: &mut Vec<Option<String>>,
) -> Result<(), Error> {
    for child in definition.nodes() {
        if child.tag == "symbol" {
            render_symbol(child, origin, angle, out)?;
        } else if child.kind == NodeKind::Drawable && child.tag != "property" {
            out.push(draw::draw(child, origin, angle)?);
        }
    }
    Ok(())
}

/// Render a full schematic into one SVG document on a fixed A4 landscape
/// page, filtering suppressed fragments.
pub fn render_document(root: &Expr, lib: &SymbolLibrary<'_>) -> Result<String, Error> {
    let fragments = render(root, lib)?;
    let mut out = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{PAGE_WIDTH}mm\" height=\"{PAGE_HEIGHT}mm\" viewBox=\"0 0 {PAGE_WIDTH} {PAGE_HEIGHT}\">\n"
    );
    for fragment in fragments.into_iter().flatten() {
        out.push_str("  ");
        out.push_str(&fragment);
        out.push('\n');
    }
    out.push_str("</svg>\n");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sexpr::from_str;

    const SCHEMATIC: &str = "(kicad_sch (version 20211123) (generator eeschema) \
        (uuid 5c74e0c8-e1a2-4217-9b38-a3b8f5dcbe33) (paper \"A4\") \
        (lib_symbols \
          (symbol \"Device:R\" (in_bom yes) (on_board yes) \
            (property \"Reference\" \"R\" (id 0) (at 2.032 0 90)) \
            (symbol \"R_0_1\" \
              (rectangle (start -1.016 -2.54) (end 1.016 2.54) \
                (stroke (width 0.254) (type default) (color 0 0 0 0)) \
                (fill (type none)))) \
            (symbol \"R_1_1\" \
              (pin passive line (at 0 3.81 270) (length 1.27) \
                (name \"~\" (effects (font (size 1.27 1.27)))) \
                (number \"1\" (effects (font (size 1.27 1.27)))))))) \
        (wire (pts (xy 27.94 41.91) (xy 43.18 41.91)) \
          (stroke (width 0) (type default) (color 0 0 0 0))) \
        (junction (at 43.18 41.91) (diameter 0) (color 0 0 0 0)) \
        (label \"SCL\" (at 27.94 41.91 0) (effects (font (size 1.27 1.27)))) \
        (symbol (lib_id \"Device:R\") (at 94.615 71.755 0) (unit 1) \
          (in_bom yes) (on_board yes) \
          (uuid b7a1a9ac-3af4-4f03-9b28-b2dfdadae2d9) \
          (property \"Reference\" \"R6\" (id 0) (at 94.615 66.675 0) \
            (effects (font (size 1.27 1.27))))))";

    #[test]
    fn test_symbol_library() {
        let root = from_str(SCHEMATIC).unwrap();
        let lib = SymbolLibrary::from_root(&root);
        assert_eq!(lib.len(), 1);
        assert!(lib.get("Device:R").is_some());
        assert!(lib.get("Device:C").is_none());
    }

    #[test]
    fn test_render_fragments() {
        let root = from_str(SCHEMATIC).unwrap();
        let lib = SymbolLibrary::from_root(&root);
        let fragments = render(&root, &lib).unwrap();
        // wire, junction, label, rectangle, pin (None), instance reference
        assert_eq!(fragments.len(), 6);
        // the pin is suppressed
        assert_eq!(fragments.iter().filter(|f| f.is_none()).count(), 1);
        let joined: String = fragments.into_iter().flatten().collect();
        assert!(joined.contains("<polyline"));
        assert!(joined.contains("<circle"));
        assert!(joined.contains(">R6</text>"));
        assert!(joined.contains("<rect"));
    }

    #[test]
    fn test_render_document_is_a4_landscape() {
        let root = from_str(SCHEMATIC).unwrap();
        let lib = SymbolLibrary::from_root(&root);
        let svg = render_document(&root, &lib).unwrap();
        assert!(svg.starts_with("<svg "));
        assert!(svg.contains("width=\"297mm\" height=\"210mm\""));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(!svg.contains("None"));
    }

    #[test]
    fn test_render_missing_symbol_fails() {
        let root = from_str(
            "(kicad_sch (version 20211123) (lib_symbols) \
               (symbol (lib_id \"Device:R\") (at 0 0 0)))",
        )
        .unwrap();
        let lib = SymbolLibrary::from_root(&root);
        assert!(matches!(
            render(&root, &lib),
            Err(Error::Validation(_))
        ));
    }
}
