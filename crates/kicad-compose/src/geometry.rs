//! Geometric and structural behaviors layered on the generic tree,
//! dispatched on [`NodeKind`]: relative moves, corner computation, footprint
//! bounding boxes, hierarchical path prefixing, identifier regeneration, and
//! net renaming.

use std::collections::HashMap;

use uuid::Uuid;

use crate::bbox::{rotate_point, BoundingBox};
use crate::error::Error;
use crate::sexpr::{Atom, Expr, NodeKind};

// ─── Relative moves ──────────────────────────────────────────────────

/// Add `[dx, dy]` to a single node's position: a `Movable` offsets its two
/// leading positional fields, a `PointList` offsets every contained `xy`.
/// Other kinds are left untouched.
pub fn translate(expr: &mut Expr, dx: f64, dy: f64) {
    match expr.kind {
        NodeKind::Movable => {
            if let Some(a) = expr.atom_at_mut(0) {
                a.offset(dx);
            }
            if let Some(a) = expr.atom_at_mut(1) {
                a.offset(dy);
            }
        }
        NodeKind::PointList => {
            for child in expr.children_mut() {
                if let crate::sexpr::Value::Node(xy) = child {
                    if xy.tag == "xy" {
                        if let Some(a) = xy.atom_at_mut(0) {
                            a.offset(dx);
                        }
                        if let Some(a) = xy.atom_at_mut(1) {
                            a.offset(dy);
                        }
                    }
                }
            }
        }
        _ => {}
    }
}

/// Move every position-bearing node in the tree by `[dx, dy]`.
pub fn move_tree(root: &mut Expr, dx: f64, dy: f64) {
    root.walk_mut(NodeKind::Movable, &mut |n| translate(n, dx, dy));
    root.walk_mut(NodeKind::PointList, &mut |n| translate(n, dx, dy));
}

// ─── Corners and bounding boxes ──────────────────────────────────────

fn position_of(expr: &Expr) -> Result<(f64, f64, f64), Error> {
    let at = expr
        .get("at")
        .single()
        .ok_or_else(|| Error::validation(format!("({}) has no position", expr.tag)))?;
    let x = at
        .f64_at(0)
        .ok_or_else(|| Error::validation(format!("({}) position is not numeric", expr.tag)))?;
    let y = at
        .f64_at(1)
        .ok_or_else(|| Error::validation(format!("({}) position is not numeric", expr.tag)))?;
    Ok((x, y, at.f64_at(2).unwrap_or(0.0)))
}

/// The four corner points of a pad, in footprint-local coordinates.
///
/// Box-like shapes scale a unit box by the half-size and rotate it by the
/// pad's own angle; circles become a four-point diamond scaled by the
/// radius. Shapes outside this set are an explicit not-implemented failure,
/// distinct from a corrupt file.
pub fn pad_corners(pad: &Expr) -> Result<[[f64; 2]; 4], Error> {
    let (x, y, angle) = position_of(pad)?;
    let shape = pad
        .str_at(2)
        .ok_or_else(|| Error::validation("pad has no shape field"))?;

    let size = |idx: usize| -> Result<f64, Error> {
        pad.get("size")
            .single()
            .and_then(|s| s.f64_at(idx))
            .ok_or_else(|| Error::validation("pad has no size"))
    };

    let unit: [[f64; 2]; 4] = match shape {
        "rect" | "roundrect" | "custom" => [[1.0, 1.0], [1.0, -1.0], [-1.0, 1.0], [-1.0, -1.0]],
        "oval" => [[1.0, 0.0], [-1.0, 0.0], [0.0, 1.0], [0.0, -1.0]],
        "circle" => {
            let r = size(0)? / 2.0;
            let mut corners = [[0.0; 2]; 4];
            for (i, p) in [[1.0, 0.0], [-1.0, 0.0], [0.0, 1.0], [0.0, -1.0]]
                .iter()
                .enumerate()
            {
                corners[i] = [x + p[0] * r, y + p[1] * r];
            }
            return Ok(corners);
        }
        other => {
            return Err(Error::not_implemented(format!(
                "pad shape {other} is not implemented"
            )))
        }
    };

    let (w, h) = (size(0)? / 2.0, size(1)? / 2.0);
    let mut corners = [[0.0; 2]; 4];
    for (i, p) in unit.iter().enumerate() {
        let rotated = rotate_point([p[0] * w, p[1] * h], angle);
        corners[i] = [x + rotated[0], y + rotated[1]];
    }
    Ok(corners)
}

/// The two endpoints of a footprint line, verbatim.
pub fn footprint_line_corners(line: &Expr) -> Result<[[f64; 2]; 2], Error> {
    let point = |tag: &str| -> Result<[f64; 2], Error> {
        let node = line
            .get(tag)
            .single()
            .ok_or_else(|| Error::validation(format!("(fp_line) has no {tag}")))?;
        match (node.f64_at(0), node.f64_at(1)) {
            (Some(x), Some(y)) => Ok([x, y]),
            _ => Err(Error::validation(format!("(fp_line) {tag} is not numeric"))),
        }
    };
    Ok([point("start")?, point("end")?])
}

/// All `xy` points of a polygon's point list. Any other point entry means
/// the format is not supported.
pub fn polygon_points(poly: &Expr) -> Result<Vec<[f64; 2]>, Error> {
    let pts = poly
        .get("pts")
        .single()
        .ok_or_else(|| Error::validation(format!("({}) has no point list", poly.tag)))?;
    let mut points = Vec::with_capacity(pts.len());
    for child in pts.children() {
        match child {
            crate::sexpr::Value::Node(xy) if xy.tag == "xy" => {
                match (xy.f64_at(0), xy.f64_at(1)) {
                    (Some(x), Some(y)) => points.push([x, y]),
                    _ => {
                        return Err(Error::validation(format!(
                            "({}) point is not numeric",
                            poly.tag
                        )))
                    }
                }
            }
            crate::sexpr::Value::Node(other) => {
                return Err(Error::not_implemented(format!(
                    "polygon point format ({}) is not supported",
                    other.tag
                )))
            }
            crate::sexpr::Value::Atom(a) => {
                return Err(Error::not_implemented(format!(
                    "polygon point format '{a}' is not supported"
                )))
            }
        }
    }
    Ok(points)
}

pub fn polygon_bounding_box(poly: &Expr) -> Result<BoundingBox, Error> {
    Ok(BoundingBox::from_points(&polygon_points(poly)?))
}

/// The axis-aligned envelope of a polygon, as four corners.
pub fn polygon_corners(poly: &Expr) -> Result<[[f64; 2]; 4], Error> {
    polygon_bounding_box(poly)?
        .corners()
        .ok_or_else(|| Error::validation(format!("({}) has no points", poly.tag)))
}

/// Bounding box of a footprint in board coordinates: the union of its pads
/// and lines, rotated by the footprint angle, then translated to its anchor.
/// The rotate-then-translate order matters.
pub fn footprint_bounding_box(footprint: &Expr) -> Result<BoundingBox, Error> {
    let mut bb = BoundingBox::new();
    for pad in footprint.get_all("pad") {
        bb.envelop(&pad_corners(pad)?);
    }
    for line in footprint.get_all("fp_line") {
        bb.envelop(&footprint_line_corners(line)?);
    }

    let (x, y, angle) = position_of(footprint)?;
    if angle != 0.0 {
        bb.rotate(angle);
    }
    bb.translate(x, y);
    Ok(bb)
}

// ─── Structural rewrites ─────────────────────────────────────────────

fn rewrite_str(atom: &mut Atom, f: impl FnOnce(&str) -> String) {
    if let Atom::Str(s) = atom {
        let had_quotes = s.len() >= 2 && s.starts_with('"') && s.ends_with('"');
        let inner = if had_quotes { &s[1..s.len() - 1] } else { &s[..] };
        let new = f(inner);
        *s = if had_quotes { format!("\"{new}\"") } else { new };
    }
}

/// Prefix `/<id>` before a footprint's hierarchical path, preserving the
/// quoting. Footprints without a path (not placed from a netlist) are left
/// alone.
pub fn prepend_path(footprint: &mut Expr, id: &str) {
    for child in footprint.children_mut() {
        if let crate::sexpr::Value::Node(node) = child {
            if node.tag == "path" {
                if let Some(atom) = node.atom_at_mut(0) {
                    rewrite_str(atom, |inner| format!("/{id}{inner}"));
                }
                return;
            }
        }
    }
}

/// Replace a timestamp identifier with a freshly generated one. The existing
/// value must parse as a UUID; anything else signals a corrupt source file.
pub fn randomize_timestamp(node: &mut Expr) -> Result<(), Error> {
    let tag = node.tag.clone();
    let atom = node
        .atom_at_mut(0)
        .ok_or_else(|| Error::validation(format!("({tag}) has no value")))?;
    let current = atom
        .unquoted()
        .ok_or_else(|| Error::validation(format!("({tag}) value is not an identifier")))?;
    Uuid::parse_str(current)
        .map_err(|e| Error::validation(format!("({tag}) holds invalid identifier: {e}")))?;
    let fresh = Uuid::new_v4();
    rewrite_str(atom, |_| fresh.to_string());
    Ok(())
}

/// Regenerate every timestamp identifier in the tree.
pub fn randomize_timestamps(root: &mut Expr) -> Result<(), Error> {
    root.try_walk_mut(NodeKind::TimestampId, &mut randomize_timestamp)
}

/// Apply net renumbering and renaming tables to one net node. A net is
/// number-only, name-only, or number+name; only the fields present and
/// matched by a table change.
pub fn rename_net(
    net: &mut Expr,
    number_map: &HashMap<i64, i64>,
    name_map: &HashMap<String, String>,
) {
    let rename_number = |atom: &mut Atom| {
        if let Some(n) = atom.as_i64() {
            if let Some(new) = number_map.get(&n) {
                *atom = Atom::Int(*new);
            }
        }
    };
    let rename_name = |atom: &mut Atom| {
        let Some(current) = atom.unquoted() else { return };
        if let Some(new) = name_map.get(current) {
            let new = new.clone();
            rewrite_str(atom, |_| new);
        }
    };

    match net.len() {
        1 => {
            if let Some(atom) = net.atom_at_mut(0) {
                match atom {
                    Atom::Int(_) => rename_number(atom),
                    Atom::Str(_) => rename_name(atom),
                    Atom::Float(_) => {}
                }
            }
        }
        2 => {
            if let Some(atom) = net.atom_at_mut(0) {
                rename_number(atom);
            }
            if let Some(atom) = net.atom_at_mut(1) {
                rename_name(atom);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sexpr::from_str;
    use approx::assert_relative_eq;

    fn corners_contain(corners: &[[f64; 2]], expected: [f64; 2]) -> bool {
        corners
            .iter()
            .any(|c| (c[0] - expected[0]).abs() < 1e-9 && (c[1] - expected[1]).abs() < 1e-9)
    }

    #[test]
    fn test_pad_corners_rect() {
        let pad = from_str("(pad \"1\" smd rect (at 10 20) (size 2 1))").unwrap();
        let corners = pad_corners(&pad).unwrap();
        assert_eq!(corners.len(), 4);
        for expected in [[11.0, 20.5], [11.0, 19.5], [9.0, 20.5], [9.0, 19.5]] {
            assert!(corners_contain(&corners, expected), "{corners:?}");
        }
    }

    #[test]
    fn test_pad_corners_rotated() {
        let pad = from_str("(pad \"1\" smd rect (at 0 0 90) (size 2 1))").unwrap();
        let corners = pad_corners(&pad).unwrap();
        // 90 degrees swaps the half-extents
        for expected in [[-0.5, 1.0], [0.5, 1.0], [-0.5, -1.0], [0.5, -1.0]] {
            assert!(corners_contain(&corners, expected), "{corners:?}");
        }
    }

    #[test]
    fn test_pad_corners_circle_diamond() {
        let pad = from_str("(pad \"\" thru_hole circle (at 1 1) (size 3 3))").unwrap();
        let corners = pad_corners(&pad).unwrap();
        for expected in [[2.5, 1.0], [-0.5, 1.0], [1.0, 2.5], [1.0, -0.5]] {
            assert!(corners_contain(&corners, expected), "{corners:?}");
        }
    }

    #[test]
    fn test_pad_corners_every_implemented_shape_yields_four() {
        for shape in ["rect", "roundrect", "oval", "custom", "circle"] {
            let pad = from_str(&format!(
                "(pad \"1\" smd {shape} (at 0 0) (size 1 2))"
            ))
            .unwrap();
            assert_eq!(pad_corners(&pad).unwrap().len(), 4, "shape {shape}");
        }
    }

    #[test]
    fn test_pad_corners_unimplemented_shape() {
        let pad = from_str("(pad \"1\" smd trapezoid (at 0 0) (size 1 2))").unwrap();
        assert!(matches!(
            pad_corners(&pad),
            Err(Error::NotImplemented(_))
        ));
    }

    #[test]
    fn test_footprint_line_corners() {
        let line = from_str("(fp_line (start -1 0.5) (end 3 0.5) (width 0.12))").unwrap();
        let corners = footprint_line_corners(&line).unwrap();
        assert_eq!(corners, [[-1.0, 0.5], [3.0, 0.5]]);
    }

    #[test]
    fn test_polygon_bounding_box() {
        let poly =
            from_str("(gr_poly (pts (xy 0 0) (xy 4 0) (xy 4 3) (xy 0 3)))").unwrap();
        let bb = polygon_bounding_box(&poly).unwrap();
        assert_eq!(bb.area(), 12.0);
        assert_eq!(polygon_corners(&poly).unwrap().len(), 4);
    }

    #[test]
    fn test_polygon_rejects_non_xy_points() {
        let poly = from_str("(gr_poly (pts (xy 0 0) (arc 1 1)))").unwrap();
        assert!(matches!(
            polygon_points(&poly),
            Err(Error::NotImplemented(_))
        ));
    }

    #[test]
    fn test_footprint_bbox_rotate_then_translate() {
        let fp = from_str(
            "(footprint \"R\" (at 10 0 90) \
               (pad \"1\" smd rect (at 2 0) (size 1 1)))",
        )
        .unwrap();
        let bb = footprint_bounding_box(&fp).unwrap();
        // pad box x [1.5, 2.5] rotates to y [1.5, 2.5], then shifts by (10, 0)
        assert_relative_eq!(bb.min_x(), 9.5, epsilon = 1e-9);
        assert_relative_eq!(bb.max_x(), 10.5, epsilon = 1e-9);
        assert_relative_eq!(bb.min_y(), 1.5, epsilon = 1e-9);
        assert_relative_eq!(bb.max_y(), 2.5, epsilon = 1e-9);
    }

    #[test]
    fn test_move_tree() {
        let mut pcb = from_str(
            "(kicad_pcb (segment (start 0 0) (end 1 1)) \
               (gr_poly (pts (xy 0 0) (xy 1 0))) \
               (footprint \"R\" (at 5 5) (pad \"1\" smd rect (at 1 0) (size 1 1))))",
        )
        .unwrap();
        move_tree(&mut pcb, 10.0, 20.0);

        let seg = pcb.get("segment").single().unwrap();
        assert_eq!(seg.get("start").single().unwrap().f64_at(0), Some(10.0));
        assert_eq!(seg.get("end").single().unwrap().f64_at(1), Some(21.0));

        let poly = pcb.get("gr_poly").single().unwrap();
        let pts = poly.get("pts").single().unwrap();
        assert_eq!(pts.get_all("xy")[1].f64_at(0), Some(11.0));

        let fp = pcb.get("footprint").single().unwrap();
        assert_eq!(fp.get("at").single().unwrap().f64_at(0), Some(15.0));
        // pad position is footprint-local and must not move
        let pad = fp.get("pad").single().unwrap();
        assert_eq!(pad.get("at").single().unwrap().f64_at(0), Some(1.0));
    }

    #[test]
    fn test_prepend_path() {
        let mut fp = from_str(
            "(footprint \"R\" (at 0 0) (path \"/aaaa-bbbb\"))",
        )
        .unwrap();
        prepend_path(&mut fp, "1111-2222");
        assert_eq!(
            fp.get("path").single().unwrap().atom_at(0).unwrap().as_str(),
            Some("\"/1111-2222/aaaa-bbbb\"")
        );
    }

    #[test]
    fn test_randomize_timestamp() {
        let mut node = from_str("(uuid 0f0ed4ee-7443-4d4e-b1c2-1bf9a1537b43)").unwrap();
        randomize_timestamp(&mut node).unwrap();
        let new = node.str_at(0).unwrap();
        assert_ne!(new, "0f0ed4ee-7443-4d4e-b1c2-1bf9a1537b43");
        assert!(Uuid::parse_str(new).is_ok());
    }

    #[test]
    fn test_randomize_rejects_corrupt_id() {
        let mut node = from_str("(uuid not-a-uuid)").unwrap();
        assert!(matches!(
            randomize_timestamp(&mut node),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_rename_net_selective() {
        let mut net = from_str("(net 4 \"GND\")").unwrap();
        let numbers = HashMap::new();
        let mut names = HashMap::new();
        names.insert("VCC".to_string(), "VDD".to_string());
        rename_net(&mut net, &numbers, &names);
        // unrelated tables leave both fields untouched
        assert_eq!(net.i64_at(0), Some(4));
        assert_eq!(net.str_at(1), Some("GND"));

        let mut names = HashMap::new();
        names.insert("GND".to_string(), "AGND".to_string());
        rename_net(&mut net, &numbers, &names);
        assert_eq!(net.i64_at(0), Some(4));
        assert_eq!(net.str_at(1), Some("AGND"));
    }

    #[test]
    fn test_rename_net_number_only() {
        let mut net = from_str("(net 2)").unwrap();
        let mut numbers = HashMap::new();
        numbers.insert(2i64, 7i64);
        rename_net(&mut net, &numbers, &HashMap::new());
        assert_eq!(net.i64_at(0), Some(7));
    }
}
