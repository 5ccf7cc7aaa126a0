//! Recursive-descent parser from tokens to the generic tree.
//!
//! Which [`NodeKind`] a node gets is decided here, once, from its tag plus
//! the enclosing parent (and for one ambiguity the grandparent) tag. There is
//! a single construction site; adding a kind means extending the enum and
//! this function.

use super::expr::{Atom, Expr, NodeKind, Value};
use super::tokens::{tokenize, Token};
use crate::error::Error;

/// Tags whose position-bearing children are moved along when the board is
/// translated.
const TO_BE_MOVED: &[&str] = &[
    "footprint",
    "module",
    "gr_text",
    "gr_poly",
    "gr_line",
    "gr_arc",
    "via",
    "segment",
    "dimension",
    "gr_circle",
    "gr_curve",
    "arc",
];

/// Position tags: a leading x y {angle} triple.
const MOVABLE_TAGS: &[&str] = &["at", "xy", "start", "end", "center"];

/// Containers whose `pts` child holds the coordinates of the shape itself.
const POINT_CONTAINERS: &[&str] = &["gr_poly", "gr_curve", "polygon", "filled_polygon"];

/// Tags convertible to a vector-graphic fragment.
const DRAWABLE_TAGS: &[&str] = &[
    "pin",
    "polyline",
    "rectangle",
    "wire",
    "property",
    "label",
    "text",
    "hierarchical_label",
    "global_label",
    "junction",
];

/// Decide the node kind for `tag` appearing under `parent` (which itself
/// appears under `grandparent`). Pure; the only use of the grandparent is to
/// exclude point lists nested in a pad's `primitives` container, whose
/// coordinates are pad-local and must not take part in board moves.
pub fn node_kind(tag: &str, parent: &str, grandparent: &str) -> NodeKind {
    if MOVABLE_TAGS.contains(&tag) && TO_BE_MOVED.contains(&parent) {
        return NodeKind::Movable;
    }
    if tag == "pts" && POINT_CONTAINERS.contains(&parent) && grandparent != "primitives" {
        return NodeKind::PointList;
    }
    match tag {
        "pad" => NodeKind::Pad,
        "fp_line" => NodeKind::FootprintLine,
        "gr_poly" | "polygon" => NodeKind::Polygon,
        "footprint" | "module" => NodeKind::Footprint,
        "uuid" | "tstamp" => NodeKind::TimestampId,
        "net" => NodeKind::Net,
        t if DRAWABLE_TAGS.contains(&t) => NodeKind::Drawable,
        _ => NodeKind::Plain,
    }
}

/// Parse one s-expression from `text`.
pub fn from_str(text: &str) -> Result<Expr, Error> {
    let tokens = tokenize(text);
    let mut index = 0;
    match parse_value(&tokens, &mut index, "", "")? {
        Value::Node(expr) => Ok(expr),
        Value::Atom(a) => Err(Error::syntax(format!(
            "expected a parenthesized expression, got atom '{a}'"
        ))),
    }
}

fn parse_value(
    tokens: &[Token<'_>],
    index: &mut usize,
    parent: &str,
    grandparent: &str,
) -> Result<Value, Error> {
    let Some(&token) = tokens.get(*index) else {
        return Err(Error::syntax("unexpected end of input"));
    };
    *index += 1;

    match token {
        Token::Open => {
            let tag = match tokens.get(*index) {
                Some(Token::Atom(t)) => *t,
                Some(Token::Open) | Some(Token::Close) => {
                    return Err(Error::syntax("expected a tag name after '('"));
                }
                None => return Err(Error::syntax("unexpected end of input")),
            };
            *index += 1;

            let mut expr = Expr::with_kind(tag, node_kind(tag, parent, grandparent));
            loop {
                match tokens.get(*index) {
                    Some(Token::Close) => {
                        *index += 1;
                        break;
                    }
                    None => return Err(Error::syntax("unexpected end of input")),
                    Some(_) => {
                        let child = parse_value(tokens, index, tag, parent)?;
                        expr.push(child);
                    }
                }
            }
            Ok(Value::Node(expr))
        }
        Token::Close => Err(Error::syntax("unexpected ')'")),
        Token::Atom(tok) => Ok(Value::Atom(Atom::from_token(tok))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let expr = from_str("(kicad_sch (version 20211123) (uuid e63e39d7))").unwrap();
        assert_eq!(expr.tag, "kicad_sch");
        assert_eq!(
            expr.get("version").single().unwrap().i64_at(0),
            Some(20211123)
        );
    }

    #[test]
    fn test_atom_typing() {
        let expr = from_str("(x 1 2.5 sym \"quoted\")").unwrap();
        assert_eq!(expr.atom_at(0), Some(&Atom::Int(1)));
        assert_eq!(expr.atom_at(1), Some(&Atom::Float(2.5)));
        assert_eq!(expr.atom_at(2), Some(&Atom::Str("sym".to_string())));
        assert_eq!(expr.str_at(3), Some("quoted"));
    }

    #[test]
    fn test_unexpected_eof() {
        assert!(matches!(
            from_str("(a (b 1)"),
            Err(Error::Syntax(_))
        ));
    }

    #[test]
    fn test_stray_close() {
        assert!(matches!(from_str(")"), Err(Error::Syntax(_))));
    }

    #[test]
    fn test_kind_dispatch() {
        let pcb = from_str(
            "(kicad_pcb \
               (footprint \"R_0402\" (at 10 20 90) \
                 (pad \"1\" smd rect (at -0.5 0) (size 0.6 0.5)) \
                 (fp_line (start 0 0) (end 1 0))) \
               (gr_poly (pts (xy 0 0) (xy 1 0) (xy 1 1))) \
               (segment (start 0 0) (end 1 1) (net 1)) \
               (uuid 11111111-2222-3333-4444-555555555555))",
        )
        .unwrap();

        let footprint = pcb.get("footprint").single().unwrap();
        assert_eq!(footprint.kind, NodeKind::Footprint);
        assert_eq!(
            footprint.get("at").single().unwrap().kind,
            NodeKind::Movable
        );
        let pad = footprint.get("pad").single().unwrap();
        assert_eq!(pad.kind, NodeKind::Pad);
        // a pad's own position is pad-local, not board-movable
        assert_eq!(pad.get("at").single().unwrap().kind, NodeKind::Plain);
        assert_eq!(
            footprint.get("fp_line").single().unwrap().kind,
            NodeKind::FootprintLine
        );

        let poly = pcb.get("gr_poly").single().unwrap();
        assert_eq!(poly.kind, NodeKind::Polygon);
        assert_eq!(poly.get("pts").single().unwrap().kind, NodeKind::PointList);

        let segment = pcb.get("segment").single().unwrap();
        assert_eq!(segment.get("start").single().unwrap().kind, NodeKind::Movable);
        assert_eq!(segment.get("net").single().unwrap().kind, NodeKind::Net);

        assert_eq!(pcb.get("uuid").single().unwrap().kind, NodeKind::TimestampId);
    }

    #[test]
    fn test_primitives_point_list_excluded() {
        let pad = from_str(
            "(pad \"1\" smd custom (at 0 0) (size 1 1) \
               (primitives (gr_poly (pts (xy 0 0) (xy 1 0)))))",
        )
        .unwrap();
        let prim_poly = pad
            .get("primitives")
            .single()
            .unwrap()
            .get("gr_poly")
            .single()
            .unwrap();
        // the nested point list stays plain so board moves don't touch it
        assert_eq!(prim_poly.get("pts").single().unwrap().kind, NodeKind::Plain);
    }

    #[test]
    fn test_drawable_dispatch() {
        let sch = from_str(
            "(symbol (rectangle (start -5.08 5.08) (end 5.08 -1.905)) \
               (polyline (pts (xy 0 0) (xy 1 1))) (pin passive line))",
        )
        .unwrap();
        for tag in ["rectangle", "polyline", "pin"] {
            assert_eq!(sch.get(tag).single().unwrap().kind, NodeKind::Drawable);
        }
    }
}
