//! Document model: schematics, boards, and whole projects.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::bbox::BoundingBox;
use crate::error::Error;
use crate::geometry;
use crate::schema::SUPPORTED_SCHEMATIC_VERSION;
use crate::sexpr::{from_str, Atom, Expr, NodeKind, Value};
use crate::svg::{render, render_document, SymbolLibrary};

/// Accepted spellings of the sheet-file property key. Localized files write
/// the key in their own spelling; anything outside this set is a hard error.
const SHEET_FILE_KEYS: &[&str] = &["Sheet file", "Sheetfile", "Sheet_file"];

/// Margin around and between synthesized sheets, in mm.
const SHEET_MARGIN: f64 = 20.0;
/// Running X beyond which sheet placement wraps to the next row.
const PAGE_WRAP_X: f64 = 270.0;
/// Horizontal gap between merged boards, in mm.
const BOARD_GAP: f64 = 10.0;

/// Top-level element categories carried over when boards are merged.
const MERGE_CATEGORIES: &[&str] = &[
    "footprint",
    "module",
    "zone",
    "via",
    "segment",
    "arc",
    "gr_text",
    "gr_line",
    "gr_poly",
    "gr_arc",
    "gr_circle",
    "gr_curve",
    "dimension",
];

fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn version_gate(root: &Expr) -> Result<(), Error> {
    let version = root
        .get("version")
        .single()
        .and_then(|v| v.i64_at(0))
        .unwrap_or(SUPPORTED_SCHEMATIC_VERSION);
    if version != SUPPORTED_SCHEMATIC_VERSION {
        return Err(Error::Version {
            found: version,
            supported: SUPPORTED_SCHEMATIC_VERSION,
        });
    }
    Ok(())
}

/// The sheet-file property of a sheet node, tolerating the known key
/// spellings.
fn sheet_file_property(sheet: &Expr) -> Result<String, Error> {
    for property in sheet.get("property").list() {
        if let Some(key) = property.str_at(0) {
            if SHEET_FILE_KEYS.contains(&key) {
                return property
                    .str_at(1)
                    .map(str::to_string)
                    .ok_or_else(|| Error::validation("sheet-file property has no value"));
            }
        }
    }
    Err(Error::validation(format!(
        "sheet has no sheet-file property (accepted spellings: {SHEET_FILE_KEYS:?})"
    )))
}

fn symbol_property(symbol: &Expr, key: &str) -> Option<String> {
    for property in symbol.get_all("property") {
        if property.str_at(0) == Some(key) {
            return property.str_at(1).map(str::to_string);
        }
    }
    None
}

// ─── Schematic ───────────────────────────────────────────────────────

/// A parsed schematic document.
#[derive(Debug, Clone)]
pub struct Schematic {
    root: Expr,
    pub name: String,
    pub file_name: String,
}

impl Schematic {
    pub fn new(root: Expr, name: &str, file_name: &str) -> Schematic {
        Schematic {
            root,
            name: name.to_string(),
            file_name: file_name.to_string(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Schematic, Error> {
        let text = fs::read_to_string(path)?;
        let root = from_str(&text)?;
        version_gate(&root)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = basename(&path.to_string_lossy());
        Ok(Schematic::new(root, &name, &file_name))
    }

    /// A minimal schematic: version, generator, identifier, paper, an empty
    /// symbol library, and the root sheet-instance entry.
    pub fn empty() -> Schematic {
        let root = Expr::new("kicad_sch")
            .node(Expr::new("version").atom(SUPPORTED_SCHEMATIC_VERSION))
            .node(Expr::new("generator").atom("kicad_compose"))
            .node(Expr::new("uuid").atom(Uuid::new_v4().to_string()))
            .node(Expr::new("paper").atom(Atom::quoted("A4")))
            .node(Expr::new("lib_symbols"))
            .node(
                Expr::new("sheet_instances").node(
                    Expr::new("path")
                        .atom(Atom::quoted("/"))
                        .node(Expr::new("page").atom(Atom::quoted("1"))),
                ),
            );
        Schematic::new(root, "", "")
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Expr {
        &mut self.root
    }

    pub fn uuid(&self) -> Option<&str> {
        self.root.get("uuid").single().and_then(|u| u.str_at(0))
    }

    /// Synthesize a sheet node referencing this schematic: a box sized for
    /// the hierarchical labels, with one pin per label, plus the bounding
    /// box it occupies so the caller can place the next sheet.
    pub fn to_sheet(
        &self,
        sheet_name: &str,
        file_name: &str,
        pos_x: f64,
        pos_y: f64,
    ) -> Result<(BoundingBox, Expr), Error> {
        let labels = self.root.get("hierarchical_label").list();
        let longest = labels
            .iter()
            .filter_map(|l| l.str_at(0))
            .map(str::len)
            .max()
            .unwrap_or(0);

        // wide enough for the longest pin name, at least 4 characters, with
        // one character of spacing on each side
        let label_space = (longest.max(4) + 2) as f64;
        let width = label_space * 1.27;
        let height = (labels.len() + 1) as f64 * 2.54;

        let bb = BoundingBox::from_points(&[[pos_x, pos_y], [pos_x + width, pos_y + height]]);

        let effects_label = "(effects (font (size 1.27 1.27)) (justify left bottom))";
        let mut sheet = Expr::new("sheet")
            .node(Expr::new("at").atom(pos_x).atom(pos_y))
            .node(Expr::new("size").atom(width).atom(height))
            .node(Expr::new("fields_autoplaced"))
            .node(from_str("(stroke (width 0) (type solid) (color 0 0 0 0))")?)
            .node(from_str("(fill (color 0 0 0 0.0000))")?)
            .node(Expr::new("uuid").atom(Uuid::new_v4().to_string()))
            .node(
                Expr::new("property")
                    .atom(Atom::quoted("Sheet name"))
                    .atom(Atom::quoted(sheet_name))
                    .node(Expr::new("id").atom(0i64))
                    .node(Expr::new("at").atom(pos_x).atom(pos_y).atom(0i64))
                    .node(from_str(effects_label)?),
            )
            .node(
                Expr::new("property")
                    .atom(Atom::quoted("Sheet file"))
                    .atom(Atom::quoted(file_name))
                    .node(Expr::new("id").atom(1i64))
                    .node(
                        Expr::new("at")
                            .atom(pos_x)
                            .atom(pos_y + height + 2.54)
                            .atom(0i64),
                    )
                    .node(from_str(effects_label)?),
            );

        for (i, label) in labels.iter().enumerate() {
            let name = label
                .atom_at(0)
                .cloned()
                .ok_or_else(|| Error::validation("hierarchical label has no name"))?;
            let shape = label
                .get("shape")
                .single()
                .and_then(|s| s.str_at(0))
                .unwrap_or("bidirectional")
                .to_string();
            sheet.push_node(
                Expr::new("pin")
                    .atom(name)
                    .atom(shape)
                    .node(
                        Expr::new("at")
                            .atom(pos_x)
                            .atom(pos_y + (i + 1) as f64 * 2.54)
                            .atom(0i64),
                    )
                    .node(from_str("(effects (font (size 1.27 1.27)) (justify right))")?)
                    .node(Expr::new("uuid").atom(Uuid::new_v4().to_string())),
            );
        }

        Ok((bb, sheet))
    }

    fn next_page_number(&self) -> i64 {
        let max_page = self
            .root
            .get("sheet_instances")
            .single()
            .map(|si| {
                si.get_all("path")
                    .iter()
                    .filter_map(|p| p.get("page").single())
                    .filter_map(|page| page.str_at(0))
                    .filter_map(|s| s.parse::<i64>().ok())
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);
        max_page + 1
    }

    /// Append sub-schematics as sheets, placed left to right with a fixed
    /// margin and wrapped to a new row once the running X passes the page
    /// width threshold. Each sheet gets a matching sheet-instance entry with
    /// the next free page number.
    pub fn append(&mut self, schematics: &[(String, Schematic)]) -> Result<(), Error> {
        let mut last_x = SHEET_MARGIN;
        let mut last_y = SHEET_MARGIN;
        let mut max_height: f64 = 0.0;

        for (name, schematic) in schematics {
            let (bb, sheet) = schematic.to_sheet(name, &schematic.file_name, last_x, last_y)?;

            last_x += bb.width() + SHEET_MARGIN;
            max_height = max_height.max(bb.height());
            if last_x > PAGE_WRAP_X {
                last_x = SHEET_MARGIN;
                last_y += max_height + SHEET_MARGIN;
                max_height = 0.0;
            }

            let page = self.next_page_number();
            let sheet_uuid = sheet
                .get("uuid")
                .single()
                .and_then(|u| u.str_at(0))
                .unwrap_or_default()
                .to_string();

            self.root.push_node(sheet);
            let instances = self
                .root
                .children_mut()
                .iter_mut()
                .find_map(|c| match c {
                    Value::Node(n) if n.tag == "sheet_instances" => Some(n),
                    _ => None,
                })
                .ok_or_else(|| Error::validation("schematic has no sheet_instances"))?;
            instances.push_node(
                Expr::new("path")
                    .atom(Atom::quoted(&format!("/{sheet_uuid}")))
                    .node(Expr::new("page").atom(Atom::quoted(&page.to_string()))),
            );
        }
        Ok(())
    }

    /// Render to SVG fragments; suppressed elements stay as `None`.
    pub fn draw(&self) -> Result<Vec<Option<String>>, Error> {
        let lib = SymbolLibrary::from_root(&self.root);
        render(&self.root, &lib)
    }

    /// Render to a complete SVG document.
    pub fn to_svg(&self) -> Result<String, Error> {
        let lib = SymbolLibrary::from_root(&self.root);
        render_document(&self.root, &lib)
    }
}

impl std::fmt::Display for Schematic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.root)
    }
}

// ─── PCB ─────────────────────────────────────────────────────────────

/// A parsed board document.
#[derive(Debug, Clone)]
pub struct Pcb {
    root: Expr,
    pub name: String,
    pub file_name: String,
}

impl Pcb {
    pub fn new(root: Expr, name: &str, file_name: &str) -> Pcb {
        Pcb {
            root,
            name: name.to_string(),
            file_name: file_name.to_string(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Pcb, Error> {
        let text = fs::read_to_string(path)?;
        let root = from_str(&text)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = basename(&path.to_string_lossy());
        Ok(Pcb::new(root, &name, &file_name))
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Expr {
        &mut self.root
    }

    /// Union of the bounding boxes of every footprint, polygon, and stray
    /// footprint line in the tree. Footprints are boundaries: their pads and
    /// lines are consumed by the footprint box, which is in board
    /// coordinates.
    pub fn bounding_box(&self) -> Result<BoundingBox, Error> {
        let mut bb = BoundingBox::new();
        Self::collect_bounds(&self.root, &mut bb)?;
        Ok(bb)
    }

    fn collect_bounds(expr: &Expr, bb: &mut BoundingBox) -> Result<(), Error> {
        match expr.kind {
            NodeKind::Footprint => {
                bb.envelop_box(&geometry::footprint_bounding_box(expr)?);
            }
            NodeKind::Polygon => {
                bb.envelop_box(&geometry::polygon_bounding_box(expr)?);
            }
            NodeKind::FootprintLine => {
                bb.envelop(&geometry::footprint_line_corners(expr)?);
            }
            _ => {
                for node in expr.nodes() {
                    Self::collect_bounds(node, bb)?;
                }
            }
        }
        Ok(())
    }

    /// Move every position-bearing element by `[dx, dy]`.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        geometry::move_tree(&mut self.root, dx, dy);
    }

    /// Number of copper layers declared in the board's layer table.
    pub fn copper_layer_count(&self) -> usize {
        self.root
            .get("layers")
            .single()
            .map(|layers| {
                layers
                    .nodes()
                    .filter(|entry| entry.str_at(0).is_some_and(|n| n.ends_with(".Cu")))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Merge other boards into this one: normalize to the origin, place each
    /// board to the right of the current extent with a fixed gap, regenerate
    /// its timestamp identifiers, prefix its footprint paths with the
    /// per-board identifier, and carry over the allow-listed top-level
    /// element categories.
    pub fn append(&mut self, boards: Vec<(String, Pcb)>) -> Result<(), Error> {
        let own = self.bounding_box()?;
        if own.valid() {
            self.translate(-own.min_x(), -own.min_y());
        }
        let mut cursor_x = own.width() + BOARD_GAP;

        // TODO: merge net identities across boards; for now they keep their
        // source numbering
        warn!("board merge keeps source net numbering, net identities are not merged");

        for (id, mut board) in boards {
            let bb = board.bounding_box()?;
            board.translate(cursor_x - bb.min_x(), -bb.min_y());
            cursor_x += bb.width() + BOARD_GAP;

            geometry::randomize_timestamps(board.root_mut())?;
            board
                .root_mut()
                .walk_mut(NodeKind::Footprint, &mut |fp| geometry::prepend_path(fp, &id));

            for child in board.root.into_children() {
                if let Value::Node(node) = child {
                    if MERGE_CATEGORIES.contains(&node.tag.as_str()) {
                        self.root.children_mut().push(Value::Node(node));
                    }
                }
            }
        }

        self.root.finalize();
        Ok(())
    }
}

impl std::fmt::Display for Pcb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.root)
    }
}

// ─── Project ─────────────────────────────────────────────────────────

/// Flat per-symbol entry of the bill of materials: the expanded property
/// map plus the human-readable references instantiated from the symbol.
#[derive(Debug, Clone, Serialize)]
pub struct BomPart {
    #[serde(flatten)]
    pub properties: HashMap<String, String>,
    #[serde(rename = "Reference")]
    pub references: Vec<String>,
}

/// The metadata record extracted from a whole project.
#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub count_part: usize,
    pub count_unique: usize,
    pub parts: HashMap<String, BomPart>,
    pub sheets: usize,
    pub parse_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copper_layers: Option<usize>,
}

/// A KiCad project: the root schematic, its recursively resolved sub-sheets,
/// and the associated board.
pub struct Project {
    sch_path: PathBuf,
    pcb_path: PathBuf,
    /// Schematics by their root identifier.
    pub schematics: HashMap<String, Schematic>,
    /// Sub-sheet file basename to schematic identifier; doubles as the
    /// memoization table so shared sheets parse once.
    pub fn_to_uuid: HashMap<String, String>,
    /// Symbol identifier to the human-readable references instantiated from
    /// it, gathered from the root's symbol-instance table.
    pub symbol_instances: HashMap<String, Vec<String>>,
    top: String,
    pcb: Option<Pcb>,
    parse_time: f64,
}

impl Project {
    pub fn new(sch_path: impl Into<PathBuf>, pcb_path: impl Into<PathBuf>) -> Project {
        Project {
            sch_path: sch_path.into(),
            pcb_path: pcb_path.into(),
            schematics: HashMap::new(),
            fn_to_uuid: HashMap::new(),
            symbol_instances: HashMap::new(),
            top: String::new(),
            pcb: None,
            parse_time: 0.0,
        }
    }

    pub fn pcb(&self) -> Option<&Pcb> {
        self.pcb.as_ref()
    }

    pub fn top_schematic(&self) -> Option<&Schematic> {
        self.schematics.get(&self.top)
    }

    /// Read the root schematic, every referenced sub-sheet (once each), and
    /// the associated board.
    pub fn parse(&mut self) -> Result<(), Error> {
        let start = Instant::now();

        let text = fs::read_to_string(&self.sch_path)?;
        let sch = from_str(&text)?;
        version_gate(&sch)?;

        if let Some(instances) = sch.get("symbol_instances").single() {
            for path in instances.get_all("path") {
                let Some(reference) = path
                    .get("reference")
                    .single()
                    .and_then(|r| r.str_at(0))
                else {
                    continue;
                };
                // skip virtual items, e.g. power symbols
                if reference.starts_with('#') {
                    continue;
                }
                let Some(symbol_id) = path
                    .str_at(0)
                    .and_then(|p| p.split('/').filter(|s| !s.is_empty()).last())
                else {
                    continue;
                };
                self.symbol_instances
                    .entry(symbol_id.to_string())
                    .or_default()
                    .push(reference.to_string());
            }
        }

        self.top = sch
            .get("uuid")
            .single()
            .and_then(|u| u.str_at(0))
            .ok_or_else(|| Error::validation("schematic has no uuid"))?
            .to_string();

        let root_file = self.sch_path.to_string_lossy().into_owned();
        self.parse_sheet(sch, &root_file)?;

        self.pcb = Some(Pcb::from_file(&self.pcb_path)?);

        self.parse_time = start.elapsed().as_secs_f64();
        Ok(())
    }

    fn parse_sheet(&mut self, sch: Expr, file_name: &str) -> Result<(), Error> {
        let uuid = sch
            .get("uuid")
            .single()
            .and_then(|u| u.str_at(0))
            .ok_or_else(|| Error::validation(format!("{file_name} has no uuid")))?
            .to_string();
        self.fn_to_uuid.insert(basename(file_name), uuid.clone());

        let mut sheet_files = Vec::new();
        for sheet in sch.get("sheet").list() {
            sheet_files.push(sheet_file_property(sheet)?);
        }
        self.schematics
            .insert(uuid, Schematic::new(sch, "", &basename(file_name)));

        let dir_name = self
            .sch_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .to_path_buf();
        for sheet_file in sheet_files {
            if self.fn_to_uuid.contains_key(&basename(&sheet_file)) {
                continue;
            }
            debug!("reading {sheet_file}");
            let text = fs::read_to_string(dir_name.join(&sheet_file))?;
            let sub = from_str(&text)?;
            self.parse_sheet(sub, &sheet_file)?;
        }
        Ok(())
    }

    /// Grouping key for unique-part counting: manufacturer part number, else
    /// a distributor part number, else value plus footprint.
    fn part_key(symbol: &Expr) -> String {
        symbol_property(symbol, "MPN")
            .or_else(|| symbol_property(symbol, "LCSC"))
            .unwrap_or_else(|| {
                format!(
                    "{}{}",
                    symbol_property(symbol, "Value").unwrap_or_default(),
                    symbol_property(symbol, "Footprint").unwrap_or_default()
                )
            })
    }

    fn collect_parts<'a>(
        &'a self,
        sch: &'a Expr,
        parts: &mut Vec<&'a Expr>,
        sheets: &mut usize,
    ) -> Result<(), Error> {
        *sheets += 1;

        for symbol in sch.get_all("symbol") {
            let is_virtual = symbol_property(symbol, "Reference")
                .is_some_and(|r| r.starts_with('#'));
            let excluded = symbol
                .get("in_bom")
                .single()
                .and_then(|n| n.str_at(0))
                == Some("no");
            if is_virtual || excluded {
                continue;
            }
            parts.push(symbol);
        }

        for sheet in sch.get("sheet").list() {
            let sheet_file = sheet_file_property(sheet)?;
            let uuid = self
                .fn_to_uuid
                .get(&basename(&sheet_file))
                .ok_or_else(|| Error::validation(format!("unparsed sheet {sheet_file}")))?;
            let sub = self
                .schematics
                .get(uuid)
                .ok_or_else(|| Error::validation(format!("missing schematic for {sheet_file}")))?;
            self.collect_parts(sub.root(), parts, sheets)?;
        }
        Ok(())
    }

    /// Aggregate the bill of materials and board statistics.
    pub fn metadata(&self) -> Result<Metadata, Error> {
        let top = self
            .schematics
            .get(&self.top)
            .ok_or_else(|| Error::validation("project has not been parsed"))?;

        let mut parts = Vec::new();
        let mut sheets = 0;
        self.collect_parts(top.root(), &mut parts, &mut sheets)?;

        let unique: HashSet<String> = parts.iter().map(|s| Self::part_key(s)).collect();

        let mut bom_parts = HashMap::new();
        for symbol in &parts {
            let uuid = symbol
                .get("uuid")
                .single()
                .and_then(|u| u.str_at(0))
                .ok_or_else(|| Error::validation("symbol has no uuid"))?;
            let mut properties = HashMap::new();
            for property in symbol.get_all("property") {
                if let (Some(key), Some(value)) = (property.str_at(0), property.str_at(1)) {
                    properties.insert(key.to_string(), value.to_string());
                }
            }
            let references = self
                .symbol_instances
                .get(uuid)
                .cloned()
                .unwrap_or_default();
            bom_parts.insert(
                uuid.to_string(),
                BomPart {
                    properties,
                    references,
                },
            );
        }

        let (area, width, height, copper_layers) = match &self.pcb {
            Some(pcb) => {
                let bb = pcb.bounding_box()?;
                (
                    Some(bb.area()),
                    Some(bb.width()),
                    Some(bb.height()),
                    Some(pcb.copper_layer_count()),
                )
            }
            None => (None, None, None, None),
        };

        Ok(Metadata {
            count_part: parts.len(),
            count_unique: unique.len(),
            parts: bom_parts,
            sheets,
            parse_time: self.parse_time,
            area,
            width,
            height,
            copper_layers,
        })
    }
}
