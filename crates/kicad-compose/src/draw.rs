//! Conversion of drawable tree nodes into SVG fragments.
//!
//! `draw` is a pure read: it never mutates the node it renders. Callers that
//! want the rotated anchor written back (the historical behavior of sheet
//! re-layout tools) do so explicitly with [`apply_rotation`].

use crate::bbox::rotate_point;
use crate::error::Error;
use crate::sexpr::{Expr, Value};

/// KiCad's "0 means default" pen width, in mm.
pub const DEFAULT_PEN_WIDTH: f64 = 0.1524;

/// Round a float to N decimal places.
pub fn round_f64(v: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (v * factor).round() / factor
}

/// Render one drawable node at the given origin offset. Returns `None` for
/// suppressed elements (pins, hidden text). `ambient_angle` is the rotation
/// of the enclosing symbol instance, combined with the node's own angle for
/// the rotation transform.
pub fn draw(expr: &Expr, origin: (f64, f64), ambient_angle: f64) -> Result<Option<String>, Error> {
    match expr.tag.as_str() {
        // pins are not drawn
        "pin" => Ok(None),
        "polyline" => draw_polyline(expr, origin),
        "rectangle" => draw_rectangle(expr, origin),
        "wire" => draw_wire(expr),
        "property" | "label" | "text" | "hierarchical_label" | "global_label" => {
            draw_text(expr, origin, ambient_angle)
        }
        "junction" => draw_junction(expr),
        other => Err(Error::not_implemented(format!(
            "drawing ({other}) is not implemented"
        ))),
    }
}

/// The anchor a rotated node renders at: the position vector rotated by the
/// combined own + ambient angle. Pure; see [`apply_rotation`] for the
/// write-back step.
pub fn rotated_anchor(at: (f64, f64), own_angle: f64, ambient_angle: f64) -> (f64, f64) {
    let p = rotate_point([at.0, at.1], own_angle + ambient_angle);
    (p[0], p[1])
}

/// Store the rotated anchor back into the node's position, the deliberate
/// counterpart to the pure computation used while drawing.
pub fn apply_rotation(expr: &mut Expr, ambient_angle: f64) {
    let mut rotated = None;
    if let Some(at) = expr.get("at").single() {
        if let (Some(x), Some(y)) = (at.f64_at(0), at.f64_at(1)) {
            let own = at.f64_at(2).unwrap_or(0.0);
            rotated = Some(rotated_anchor((x, y), own, ambient_angle));
        }
    }
    let Some((x, y)) = rotated else { return };
    for child in expr.children_mut() {
        if let Value::Node(at) = child {
            if at.tag == "at" {
                if let Some(a) = at.atom_at_mut(0) {
                    *a = x.into();
                }
                if let Some(a) = at.atom_at_mut(1) {
                    *a = y.into();
                }
                return;
            }
        }
    }
}

// ─── Styling ─────────────────────────────────────────────────────────

fn color_of(node: &Expr) -> (i64, i64, i64, f64) {
    match node.get("color").single() {
        Some(color) => {
            let ch = |i: usize| color.f64_at(i).unwrap_or(0.0) as i64;
            let alpha = color.f64_at(3).unwrap_or(0.0);
            // 0 alpha is KiCad's "default", meaning opaque
            let alpha = if alpha == 0.0 { 1.0 } else { alpha };
            (ch(0), ch(1), ch(2), alpha)
        }
        None => (0, 0, 0, 1.0),
    }
}

fn dash_array(stroke_type: &str) -> Option<&'static str> {
    match stroke_type {
        "dash" => Some("4,2"),
        "dot" => Some("1,2"),
        "dash_dot" => Some("4,2,1,2"),
        "dash_dot_dot" => Some("4,2,1,2,1,2"),
        _ => None,
    }
}

/// Shared stroke/fill attribute rendering. A zero stroke width falls back to
/// the nominal pen width; the fill color for `outline` fills is the stroke
/// color, `background` uses the conventional symbol body tint.
fn style_attrs(stroke: Option<&Expr>, fill: Option<&Expr>) -> String {
    let mut out = String::new();

    let (r, g, b, a) = stroke.map(color_of).unwrap_or((0, 0, 0, 1.0));
    let width = stroke
        .and_then(|s| s.get("width").single())
        .and_then(|w| w.f64_at(0))
        .filter(|w| *w != 0.0)
        .unwrap_or(DEFAULT_PEN_WIDTH);
    out.push_str(&format!(
        " stroke=\"rgb({r},{g},{b})\" stroke-opacity=\"{a}\" stroke-width=\"{width}\""
    ));
    if let Some(dashes) = stroke
        .and_then(|s| s.get("type").single())
        .and_then(|t| t.str_at(0))
        .and_then(dash_array)
    {
        out.push_str(&format!(" stroke-dasharray=\"{dashes}\""));
    }

    let fill_type = fill
        .and_then(|f| f.get("type").single())
        .and_then(|t| t.str_at(0))
        .unwrap_or("none");
    match fill_type {
        "outline" => out.push_str(&format!(
            " fill=\"rgb({r},{g},{b})\" fill-opacity=\"{a}\""
        )),
        "background" => out.push_str(" fill=\"rgb(255,255,194)\""),
        _ => out.push_str(" fill=\"none\""),
    }

    out
}

// ─── Shapes ──────────────────────────────────────────────────────────

fn points_of(expr: &Expr) -> Result<Vec<[f64; 2]>, Error> {
    crate::geometry::polygon_points(expr)
}

fn draw_polyline(expr: &Expr, origin: (f64, f64)) -> Result<Option<String>, Error> {
    let mut points = String::new();
    for p in points_of(expr)? {
        // fixed precision to avoid floating-point artifacts in the output
        let x = round_f64(p[0] + origin.0, 3);
        let y = round_f64(p[1] + origin.1, 3);
        if !points.is_empty() {
            points.push(' ');
        }
        points.push_str(&format!("{x},{y}"));
    }
    let style = style_attrs(expr.get("stroke").single(), expr.get("fill").single());
    Ok(Some(format!("<polyline points=\"{points}\"{style} />")))
}

fn draw_wire(expr: &Expr) -> Result<Option<String>, Error> {
    // wires are already in sheet space: no offset, no rounding
    let mut points = String::new();
    for p in points_of(expr)? {
        if !points.is_empty() {
            points.push(' ');
        }
        points.push_str(&format!("{},{}", p[0], p[1]));
    }
    let style = style_attrs(expr.get("stroke").single(), None);
    Ok(Some(format!("<polyline points=\"{points}\"{style} />")))
}

fn draw_rectangle(expr: &Expr, origin: (f64, f64)) -> Result<Option<String>, Error> {
    let corner = |tag: &str| -> Result<(f64, f64), Error> {
        let node = expr
            .get(tag)
            .single()
            .ok_or_else(|| Error::validation(format!("(rectangle) has no {tag}")))?;
        match (node.f64_at(0), node.f64_at(1)) {
            (Some(x), Some(y)) => Ok((x, y)),
            _ => Err(Error::validation(format!("(rectangle) {tag} is not numeric"))),
        }
    };
    let (xs, ys) = corner("start")?;
    let (xe, ye) = corner("end")?;

    // corner order is not guaranteed; symbol-interior y points up and must
    // be flipped into the sheet's y-down frame
    let width = (xs - xe).abs();
    let height = (ys - ye).abs();
    let x = xs.min(xe) + origin.0;
    let y = (-ys).min(-ye) + origin.1;

    let style = style_attrs(expr.get("stroke").single(), expr.get("fill").single());
    Ok(Some(format!(
        "<rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\"{style} />"
    )))
}

fn draw_junction(expr: &Expr) -> Result<Option<String>, Error> {
    let at = expr
        .get("at")
        .single()
        .ok_or_else(|| Error::validation("(junction) has no position"))?;
    let (x, y) = (at.f64_at(0).unwrap_or(0.0), at.f64_at(1).unwrap_or(0.0));
    let diameter = expr
        .get("diameter")
        .single()
        .and_then(|d| d.f64_at(0))
        .filter(|d| *d > 0.0)
        .unwrap_or(1.016);
    let (r, g, b, _) = color_of(expr);
    Ok(Some(format!(
        "<circle cx=\"{x}\" cy=\"{y}\" r=\"{}\" fill=\"rgb({r},{g},{b})\" />",
        diameter / 2.0
    )))
}

// ─── Text ────────────────────────────────────────────────────────────

fn is_hidden(effects: Option<&Expr>) -> bool {
    let Some(effects) = effects else { return false };
    effects.children().iter().any(|c| match c {
        Value::Atom(a) => a.unquoted() == Some("hide"),
        _ => false,
    })
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn draw_text(expr: &Expr, origin: (f64, f64), ambient_angle: f64) -> Result<Option<String>, Error> {
    // properties carry key then value, labels carry the text first
    let slot = if expr.tag == "property" { 1 } else { 0 };
    let content = expr
        .str_at(slot)
        .ok_or_else(|| Error::validation(format!("({}) has no text", expr.tag)))?;

    let effects = expr.get("effects").single();
    if is_hidden(effects) {
        return Ok(None);
    }

    let at = expr
        .get("at")
        .single()
        .ok_or_else(|| Error::validation(format!("({}) has no position", expr.tag)))?;
    let (x, y) = (
        at.f64_at(0).unwrap_or(0.0) + origin.0,
        at.f64_at(1).unwrap_or(0.0) + origin.1,
    );
    let own_angle = at.f64_at(2).unwrap_or(0.0);

    let size = effects
        .and_then(|e| e.get("font").single())
        .and_then(|f| f.get("size").single())
        .and_then(|s| s.f64_at(0))
        .unwrap_or(1.27);

    let anchor = match effects
        .and_then(|e| e.get("justify").single())
        .and_then(|j| j.str_at(0))
    {
        Some("left") => "start",
        Some("right") => "end",
        _ => "middle",
    };

    // vertically center on the anchor using the font size
    let y = y + size / 2.0;

    let total_angle = own_angle + ambient_angle;
    let transform = if total_angle != 0.0 {
        let (rx, ry) = rotated_anchor((x, y), 0.0, total_angle);
        format!(" transform=\"rotate({total_angle} {rx} {ry})\"")
    } else {
        String::new()
    };

    Ok(Some(format!(
        "<text x=\"{x}\" y=\"{y}\" font-size=\"{size}\" text-anchor=\"{anchor}\"{transform}>{}</text>",
        xml_escape(content)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sexpr::from_str;

    #[test]
    fn test_draw_rectangle_literal() {
        let expr = from_str("(rectangle (start -5.08 5.08) (end 5.08 -1.905))").unwrap();
        let markup = draw(&expr, (0.0, 0.0), 0.0).unwrap().unwrap();
        assert!(markup.contains("x=\"-5.08\""), "{markup}");
        assert!(markup.contains("y=\"-5.08\""), "{markup}");
        assert!(markup.contains("width=\"10.16\""), "{markup}");
        assert!(markup.contains("height=\"6.985\""), "{markup}");
    }

    #[test]
    fn test_draw_rectangle_corner_order_irrelevant() {
        let a = from_str("(rectangle (start -5.08 5.08) (end 5.08 -1.905))").unwrap();
        let b = from_str("(rectangle (start 5.08 -1.905) (end -5.08 5.08))").unwrap();
        assert_eq!(
            draw(&a, (0.0, 0.0), 0.0).unwrap(),
            draw(&b, (0.0, 0.0), 0.0).unwrap()
        );
    }

    #[test]
    fn test_draw_rectangle_stroke_and_fill() {
        let expr = from_str(
            "(rectangle (start 0 0) (end 1 1) \
               (stroke (width 0.254) (type dash) (color 120 85 0 0.5)) \
               (fill (type outline)))",
        )
        .unwrap();
        let markup = draw(&expr, (0.0, 0.0), 0.0).unwrap().unwrap();
        assert!(markup.contains("stroke=\"rgb(120,85,0)\""), "{markup}");
        assert!(markup.contains("stroke-opacity=\"0.5\""), "{markup}");
        assert!(markup.contains("stroke-width=\"0.254\""), "{markup}");
        assert!(markup.contains("stroke-dasharray=\"4,2\""), "{markup}");
        assert!(markup.contains("fill=\"rgb(120,85,0)\""), "{markup}");
    }

    #[test]
    fn test_zero_stroke_width_uses_nominal_pen() {
        let expr = from_str(
            "(polyline (pts (xy 0 0) (xy 1 0)) (stroke (width 0) (type default)))",
        )
        .unwrap();
        let markup = draw(&expr, (0.0, 0.0), 0.0).unwrap().unwrap();
        assert!(markup.contains("stroke-width=\"0.1524\""), "{markup}");
    }

    #[test]
    fn test_draw_polyline_offset_and_rounding() {
        let expr = from_str("(polyline (pts (xy -1.524 0.50849) (xy 1.524 0.508)))").unwrap();
        let markup = draw(&expr, (10.0, 2.0), 0.0).unwrap().unwrap();
        assert!(markup.contains("points=\"8.476,2.508 11.524,2.508\""), "{markup}");
    }

    #[test]
    fn test_draw_wire_no_offset() {
        let expr = from_str(
            "(wire (pts (xy 27.94 41.91) (xy 43.18 41.91)) \
               (stroke (width 0) (type default) (color 0 0 0 0)))",
        )
        .unwrap();
        let markup = draw(&expr, (100.0, 100.0), 0.0).unwrap().unwrap();
        assert!(markup.contains("points=\"27.94,41.91 43.18,41.91\""), "{markup}");
    }

    #[test]
    fn test_draw_pin_suppressed() {
        let expr = from_str("(pin passive line (at 0 0 0) (length 2.54))").unwrap();
        assert_eq!(draw(&expr, (0.0, 0.0), 0.0).unwrap(), None);
    }

    #[test]
    fn test_draw_hidden_text_suppressed() {
        let expr = from_str(
            "(property \"Footprint\" \"R_0402\" (at 0 0 0) \
               (effects (font (size 1.27 1.27)) hide))",
        )
        .unwrap();
        assert_eq!(draw(&expr, (0.0, 0.0), 0.0).unwrap(), None);
    }

    #[test]
    fn test_draw_property_text_slot() {
        let expr = from_str(
            "(property \"Reference\" \"R1\" (at 2 3 0) \
               (effects (font (size 1.27 1.27)) (justify left)))",
        )
        .unwrap();
        let markup = draw(&expr, (0.0, 0.0), 0.0).unwrap().unwrap();
        assert!(markup.contains(">R1</text>"), "{markup}");
        assert!(markup.contains("text-anchor=\"start\""), "{markup}");
    }

    #[test]
    fn test_draw_label_text_slot() {
        let expr = from_str("(label \"SDA\" (at 0 0 0))").unwrap();
        let markup = draw(&expr, (0.0, 0.0), 0.0).unwrap().unwrap();
        assert!(markup.contains(">SDA</text>"), "{markup}");
    }

    #[test]
    fn test_draw_junction() {
        let expr = from_str("(junction (at 5 6) (diameter 0) (color 0 0 0 0))").unwrap();
        let markup = draw(&expr, (0.0, 0.0), 0.0).unwrap().unwrap();
        assert!(markup.contains("<circle cx=\"5\" cy=\"6\""), "{markup}");
    }

    #[test]
    fn test_draw_does_not_mutate_position() {
        let expr = from_str("(label \"A\" (at 3 4 90))").unwrap();
        let before = expr.to_string();
        draw(&expr, (0.0, 0.0), 45.0).unwrap();
        assert_eq!(expr.to_string(), before);
    }

    #[test]
    fn test_apply_rotation_is_explicit() {
        let mut expr = from_str("(label \"A\" (at 3 0 90))").unwrap();
        apply_rotation(&mut expr, 0.0);
        let at = expr.get("at").single().unwrap();
        assert!((at.f64_at(0).unwrap() - 0.0).abs() < 1e-9);
        assert!((at.f64_at(1).unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_draw_unknown_tag() {
        let expr = from_str("(bezier (pts (xy 0 0)))").unwrap();
        assert!(matches!(
            draw(&expr, (0.0, 0.0), 0.0),
            Err(Error::NotImplemented(_))
        ));
    }
}
