//! Records describing the contents of `.kicad_sch` files.

use uuid::Uuid;

use super::shapes::{Pts, Stroke};
use super::symbol::{Effects, Symbol, SymbolProperty};
use super::{expect_tag, Args, Color, FromSexpr};
use crate::error::Error;
use crate::sexpr::Expr;

/// The one supported stable schematic format version (KiCad 6).
pub const SUPPORTED_SCHEMATIC_VERSION: i64 = 20211123;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaperFormat {
    A0,
    A1,
    A2,
    A3,
    #[default]
    A4,
    A5,
    A,
    B,
    C,
    D,
    E,
    UsLetter,
    UsLegal,
    UsLedger,
}

impl PaperFormat {
    fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "A0" => Ok(Self::A0),
            "A1" => Ok(Self::A1),
            "A2" => Ok(Self::A2),
            "A3" => Ok(Self::A3),
            "A4" => Ok(Self::A4),
            "A5" => Ok(Self::A5),
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            "E" => Ok(Self::E),
            "USLetter" => Ok(Self::UsLetter),
            "USLegal" => Ok(Self::UsLegal),
            "USLedger" => Ok(Self::UsLedger),
            other => Err(Error::validation(format!("unknown paper format '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaperOrientation {
    #[default]
    Landscape,
    Portrait,
}

/// A standard paper size, e.g. `(paper "A4")`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paper {
    pub format: PaperFormat,
    pub orientation: PaperOrientation,
}

impl FromSexpr for Paper {
    const TAG: &'static str = "paper";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let format = match args.opt_pos_string() {
            Some(s) => PaperFormat::parse(&s)?,
            None => PaperFormat::default(),
        };
        let orientation = match args.opt_pos_string() {
            Some(s) if s == "portrait" => PaperOrientation::Portrait,
            Some(other) => {
                return Err(Error::validation(format!(
                    "unknown paper orientation '{other}'"
                )))
            }
            None => PaperOrientation::Landscape,
        };
        args.finish()?;
        Ok(Paper {
            format,
            orientation,
        })
    }
}

/// A user-defined paper size, `(paper "User" width height)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperUser {
    pub width: f64,
    pub height: f64,
}

impl FromSexpr for PaperUser {
    const TAG: &'static str = "paper";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let format = args.pos_string("format")?;
        if format != "User" {
            return Err(Error::validation(format!(
                "(paper) format '{format}' is not User"
            )));
        }
        let paper = PaperUser {
            width: args.pos_f64("width")?,
            height: args.pos_f64("height")?,
        };
        args.finish()?;
        Ok(paper)
    }
}

/// Union over the two paper notations, resolved by trying each candidate in
/// declaration order and accepting the first that validates. If none does,
/// the first recorded failure is reported.
#[derive(Debug, Clone, PartialEq)]
pub enum PaperChoice {
    Standard(Paper),
    User(PaperUser),
}

impl Default for PaperChoice {
    fn default() -> Self {
        PaperChoice::Standard(Paper::default())
    }
}

impl FromSexpr for PaperChoice {
    const TAG: &'static str = "paper";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        let mut errors = Vec::new();
        match Paper::from_sexpr(expr) {
            Ok(paper) => return Ok(PaperChoice::Standard(paper)),
            Err(e) => errors.push(e),
        }
        match PaperUser::from_sexpr(expr) {
            Ok(paper) => return Ok(PaperChoice::User(paper)),
            Err(e) => errors.push(e),
        }
        Err(errors.remove(0))
    }
}

/// Pin assignment on a placed symbol instance.
#[derive(Debug, Clone, PartialEq)]
pub struct PinAssignment {
    pub number: String,
    pub uuid: Uuid,
    pub alternate: Option<String>,
}

impl FromSexpr for PinAssignment {
    const TAG: &'static str = "pin";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let pin = PinAssignment {
            number: args.pos_string("number")?,
            uuid: args.uuid("uuid")?.unwrap_or_else(Uuid::new_v4),
            alternate: args.scalar_string("alternate")?,
        };
        args.finish()?;
        Ok(pin)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefaultInstance {
    pub reference: String,
    pub unit: i64,
    pub value: String,
    pub footprint: String,
}

impl FromSexpr for DefaultInstance {
    const TAG: &'static str = "default_instance";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let instance = DefaultInstance {
            reference: args
                .scalar_string("reference")?
                .ok_or_else(|| Error::validation("(default_instance) requires (reference ...)"))?,
            unit: args.scalar_i64("unit")?.unwrap_or(1),
            value: args.scalar_string("value")?.unwrap_or_default(),
            footprint: args.scalar_string("footprint")?.unwrap_or_default(),
        };
        args.finish()?;
        Ok(instance)
    }
}

/// Appears bare as `(fields_autoplaced)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsFieldsAutoplaced;

impl FromSexpr for IsFieldsAutoplaced {
    const TAG: &'static str = "fields_autoplaced";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        Args::new(expr).finish()?;
        Ok(IsFieldsAutoplaced)
    }
}

/// A symbol instance placed on the sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolPlaced {
    pub lib_id: String,
    pub lib_name: Option<String>,
    pub at: (f64, f64, f64),
    pub unit: i64,
    pub convert: Option<i64>,
    pub in_bom: bool,
    pub on_board: bool,
    pub mirror: Option<String>,
    pub uuid: Uuid,
    pub default_instance: Option<DefaultInstance>,
    pub property: Vec<SymbolProperty>,
    pub pin: Vec<PinAssignment>,
    pub fields_autoplaced: Option<IsFieldsAutoplaced>,
}

impl FromSexpr for SymbolPlaced {
    const TAG: &'static str = "symbol";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let symbol = SymbolPlaced {
            lib_id: args
                .scalar_string("lib_id")?
                .ok_or_else(|| Error::validation("(symbol) requires (lib_id ...)"))?,
            lib_name: args.scalar_string("lib_name")?,
            at: args.tuple3("at")?.unwrap_or((0.0, 0.0, 0.0)),
            unit: args.scalar_i64("unit")?.unwrap_or(1),
            convert: args.scalar_i64("convert")?,
            in_bom: args.scalar_bool("in_bom")?.unwrap_or(true),
            on_board: args.scalar_bool("on_board")?.unwrap_or(true),
            mirror: args.scalar_string("mirror")?,
            uuid: args.uuid("uuid")?.unwrap_or_else(Uuid::new_v4),
            default_instance: args.record()?,
            property: args.records()?,
            pin: args.records()?,
            fields_autoplaced: args.record()?,
        };
        args.finish()?;
        Ok(symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Wire {
    pub pts: Pts,
    pub stroke: Stroke,
    pub uuid: Option<Uuid>,
}

impl FromSexpr for Wire {
    const TAG: &'static str = "wire";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let wire = Wire {
            pts: args.record()?.unwrap_or_default(),
            stroke: args.record()?.unwrap_or_default(),
            uuid: args.uuid("uuid")?,
        };
        args.finish()?;
        Ok(wire)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Junction {
    pub at: (f64, f64),
    pub diameter: f64,
    pub color: Color,
    pub uuid: Option<Uuid>,
}

impl FromSexpr for Junction {
    const TAG: &'static str = "junction";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let junction = Junction {
            at: args
                .tuple2("at")?
                .ok_or_else(|| Error::validation("(junction) requires (at ...)"))?,
            diameter: args.scalar_f64("diameter")?.unwrap_or(0.0),
            color: args.color("color")?.unwrap_or(Color::new(0, 0, 0, 0.0)),
            uuid: args.uuid("uuid")?,
        };
        args.finish()?;
        Ok(junction)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoConnect {
    pub at: (f64, f64),
    pub uuid: Option<Uuid>,
}

impl FromSexpr for NoConnect {
    const TAG: &'static str = "no_connect";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let nc = NoConnect {
            at: args
                .tuple2("at")?
                .ok_or_else(|| Error::validation("(no_connect) requires (at ...)"))?,
            uuid: args.uuid("uuid")?,
        };
        args.finish()?;
        Ok(nc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelShape {
    Input,
    Output,
    #[default]
    Bidirectional,
    TriState,
    Passive,
}

impl LabelShape {
    pub fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "input" => Ok(Self::Input),
            "output" => Ok(Self::Output),
            "bidirectional" => Ok(Self::Bidirectional),
            "tri_state" => Ok(Self::TriState),
            "passive" => Ok(Self::Passive),
            other => Err(Error::validation(format!("unknown label shape '{other}'"))),
        }
    }
}

/// A local net label, also used for plain text nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalLabel {
    pub text: String,
    pub at: (f64, f64, f64),
    pub fields_autoplaced: Option<IsFieldsAutoplaced>,
    pub effects: Effects,
    pub uuid: Option<Uuid>,
}

impl LocalLabel {
    fn parse_with_tag(expr: &Expr, tag: &str) -> Result<Self, Error> {
        expect_tag(expr, tag)?;
        let mut args = Args::new(expr);
        let label = LocalLabel {
            text: args.pos_string("text")?,
            at: args
                .tuple3("at")?
                .ok_or_else(|| Error::validation(format!("({tag}) requires (at ...)")))?,
            fields_autoplaced: args.record()?,
            effects: args.record()?.unwrap_or_default(),
            uuid: args.uuid("uuid")?,
        };
        args.finish()?;
        Ok(label)
    }
}

impl FromSexpr for LocalLabel {
    const TAG: &'static str = "label";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        Self::parse_with_tag(expr, Self::TAG)
    }
}

/// Wrapper so `(text ...)` nodes reuse the label record shape.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode(pub LocalLabel);

impl FromSexpr for TextNode {
    const TAG: &'static str = "text";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        Ok(TextNode(LocalLabel::parse_with_tag(expr, Self::TAG)?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalLabel {
    pub text: String,
    pub at: (f64, f64, f64),
    pub shape: LabelShape,
    pub effects: Effects,
    pub uuid: Option<Uuid>,
    pub property: Vec<SymbolProperty>,
    pub fields_autoplaced: Option<IsFieldsAutoplaced>,
}

impl FromSexpr for GlobalLabel {
    const TAG: &'static str = "global_label";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let label = GlobalLabel {
            text: args.pos_string("text")?,
            at: args
                .tuple3("at")?
                .ok_or_else(|| Error::validation("(global_label) requires (at ...)"))?,
            shape: match args.scalar_string("shape")? {
                Some(s) => LabelShape::parse(&s)?,
                None => LabelShape::default(),
            },
            effects: args.record()?.unwrap_or_default(),
            uuid: args.uuid("uuid")?,
            property: args.records()?,
            fields_autoplaced: args.record()?,
        };
        args.finish()?;
        Ok(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HierarchicalLabel {
    pub text: String,
    pub at: (f64, f64, f64),
    pub shape: LabelShape,
    pub effects: Effects,
    pub uuid: Option<Uuid>,
    pub fields_autoplaced: Option<IsFieldsAutoplaced>,
}

impl FromSexpr for HierarchicalLabel {
    const TAG: &'static str = "hierarchical_label";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let label = HierarchicalLabel {
            text: args.pos_string("text")?,
            at: args
                .tuple3("at")?
                .ok_or_else(|| Error::validation("(hierarchical_label) requires (at ...)"))?,
            shape: match args.scalar_string("shape")? {
                Some(s) => LabelShape::parse(&s)?,
                None => LabelShape::default(),
            },
            effects: args.record()?.unwrap_or_default(),
            uuid: args.uuid("uuid")?,
            fields_autoplaced: args.record()?,
        };
        args.finish()?;
        Ok(label)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LibSymbols {
    pub symbol: Vec<Symbol>,
}

impl FromSexpr for LibSymbols {
    const TAG: &'static str = "lib_symbols";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let libs = LibSymbols {
            symbol: args.records()?,
        };
        args.finish()?;
        Ok(libs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleBlockComment {
    pub number: i64,
    pub text: String,
}

impl FromSexpr for TitleBlockComment {
    const TAG: &'static str = "comment";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let comment = TitleBlockComment {
            number: args.opt_pos_i64().unwrap_or(1),
            text: args.opt_pos_string().unwrap_or_default(),
        };
        args.finish()?;
        Ok(comment)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TitleBlock {
    pub title: String,
    pub date: String,
    pub rev: String,
    pub company: String,
    pub comment: Vec<TitleBlockComment>,
}

impl FromSexpr for TitleBlock {
    const TAG: &'static str = "title_block";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let block = TitleBlock {
            title: args.scalar_string("title")?.unwrap_or_default(),
            date: args.scalar_string("date")?.unwrap_or_default(),
            rev: args.scalar_string("rev")?.unwrap_or_default(),
            company: args.scalar_string("company")?.unwrap_or_default(),
            comment: args.records()?,
        };
        args.finish()?;
        Ok(block)
    }
}

/// One `(path "/..." (page "..."))` sheet-instance entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetPath {
    pub path: String,
    pub page: String,
}

impl FromSexpr for SheetPath {
    const TAG: &'static str = "path";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let path = SheetPath {
            path: args.opt_pos_string().unwrap_or_else(|| "/".to_string()),
            page: args.scalar_string("page")?.unwrap_or_else(|| "1".to_string()),
        };
        args.finish()?;
        Ok(path)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetInstances {
    pub path: Vec<SheetPath>,
}

impl FromSexpr for SheetInstances {
    const TAG: &'static str = "sheet_instances";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let instances = SheetInstances {
            path: args.records()?,
        };
        args.finish()?;
        Ok(instances)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolInstancesPath {
    pub path: String,
    pub reference: String,
    pub unit: i64,
    pub value: String,
    pub footprint: String,
}

impl FromSexpr for SymbolInstancesPath {
    const TAG: &'static str = "path";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let path = SymbolInstancesPath {
            path: args.pos_string("path")?,
            reference: args
                .scalar_string("reference")?
                .ok_or_else(|| Error::validation("(path) requires (reference ...)"))?,
            unit: args.scalar_i64("unit")?.unwrap_or(1),
            value: args.scalar_string("value")?.unwrap_or_default(),
            footprint: args.scalar_string("footprint")?.unwrap_or_default(),
        };
        args.finish()?;
        Ok(path)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SymbolInstances {
    pub path: Vec<SymbolInstancesPath>,
}

impl FromSexpr for SymbolInstances {
    const TAG: &'static str = "symbol_instances";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let instances = SymbolInstances {
            path: args.records()?,
        };
        args.finish()?;
        Ok(instances)
    }
}

/// `(fill (color ...))` as used by sheets, distinct from the shape fill.
#[derive(Debug, Clone, PartialEq)]
pub struct FillColor {
    pub color: Color,
}

impl Default for FillColor {
    fn default() -> Self {
        FillColor {
            color: Color::new(0, 0, 0, 0.0),
        }
    }
}

impl FromSexpr for FillColor {
    const TAG: &'static str = "fill";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let fill = FillColor {
            color: args.color("color")?.unwrap_or(Color::new(0, 0, 0, 0.0)),
        };
        args.finish()?;
        Ok(fill)
    }
}

/// A pin on a sheet box, mirroring a hierarchical label of the sub-sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetPin {
    pub name: String,
    pub shape: LabelShape,
    pub at: (f64, f64, f64),
    pub effects: Effects,
    pub uuid: Option<Uuid>,
}

impl FromSexpr for SheetPin {
    const TAG: &'static str = "pin";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let name = args.pos_string("name")?;
        let shape = match args.opt_pos_string() {
            Some(s) => LabelShape::parse(&s)?,
            None => LabelShape::default(),
        };
        let pin = SheetPin {
            name,
            shape,
            at: args.tuple3("at")?.unwrap_or((0.0, 0.0, 0.0)),
            effects: args.record()?.unwrap_or_default(),
            uuid: args.uuid("uuid")?,
        };
        args.finish()?;
        Ok(pin)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub at: (f64, f64),
    pub size: (f64, f64),
    pub stroke: Stroke,
    pub fill: FillColor,
    pub uuid: Option<Uuid>,
    pub property: Vec<SymbolProperty>,
    pub pin: Vec<SheetPin>,
    pub fields_autoplaced: Option<IsFieldsAutoplaced>,
}

impl FromSexpr for Sheet {
    const TAG: &'static str = "sheet";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let sheet = Sheet {
            at: args
                .tuple2("at")?
                .ok_or_else(|| Error::validation("(sheet) requires (at ...)"))?,
            size: args
                .tuple2("size")?
                .ok_or_else(|| Error::validation("(sheet) requires (size ...)"))?,
            stroke: args.record()?.unwrap_or_default(),
            fill: args.record()?.unwrap_or_default(),
            uuid: args.uuid("uuid")?,
            property: args.records()?,
            pin: args.records()?,
            fields_autoplaced: args.record()?,
        };
        args.finish()?;
        Ok(sheet)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BusEntry {
    pub at: (f64, f64),
    pub size: (f64, f64),
    pub stroke: Stroke,
    pub uuid: Option<Uuid>,
}

impl FromSexpr for BusEntry {
    const TAG: &'static str = "bus_entry";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let entry = BusEntry {
            at: args
                .tuple2("at")?
                .ok_or_else(|| Error::validation("(bus_entry) requires (at ...)"))?,
            size: args
                .tuple2("size")?
                .ok_or_else(|| Error::validation("(bus_entry) requires (size ...)"))?,
            stroke: args.record()?.unwrap_or_default(),
            uuid: args.uuid("uuid")?,
        };
        args.finish()?;
        Ok(entry)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bus {
    pub pts: Pts,
    pub stroke: Stroke,
    pub uuid: Option<Uuid>,
}

impl FromSexpr for Bus {
    const TAG: &'static str = "bus";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let bus = Bus {
            pts: args.record()?.unwrap_or_default(),
            stroke: args.record()?.unwrap_or_default(),
            uuid: args.uuid("uuid")?,
        };
        args.finish()?;
        Ok(bus)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub at: (f64, f64),
    pub scale: Option<f64>,
    pub uuid: Option<Uuid>,
    pub data: Vec<String>,
}

impl FromSexpr for Image {
    const TAG: &'static str = "image";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let image = Image {
            at: args
                .tuple2("at")?
                .ok_or_else(|| Error::validation("(image) requires (at ...)"))?,
            scale: args.scalar_f64("scale")?,
            uuid: args.uuid("uuid")?,
            data: args.strings("data")?,
        };
        args.finish()?;
        Ok(image)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BusAlias {
    pub name: String,
    pub members: Vec<String>,
}

impl FromSexpr for BusAlias {
    const TAG: &'static str = "bus_alias";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let alias = BusAlias {
            name: args.pos_string("name")?,
            members: args.strings("members")?,
        };
        args.finish()?;
        Ok(alias)
    }
}

/// The root record of a `.kicad_sch` file.
#[derive(Debug, Clone, PartialEq)]
pub struct Schematic {
    pub version: i64,
    pub generator: String,
    pub uuid: Uuid,
    pub title_block: Option<TitleBlock>,
    pub paper: PaperChoice,
    pub lib_symbols: LibSymbols,
    pub sheet: Vec<Sheet>,
    pub symbol: Vec<SymbolPlaced>,
    pub polyline: Vec<super::shapes::PolyLine>,
    pub wire: Vec<Wire>,
    pub bus: Vec<Bus>,
    pub image: Vec<Image>,
    pub junction: Vec<Junction>,
    pub no_connect: Vec<NoConnect>,
    pub bus_entry: Vec<BusEntry>,
    pub text: Vec<TextNode>,
    pub label: Vec<LocalLabel>,
    pub hierarchical_label: Vec<HierarchicalLabel>,
    pub global_label: Vec<GlobalLabel>,
    pub sheet_instances: SheetInstances,
    pub symbol_instances: SymbolInstances,
    pub bus_alias: Vec<BusAlias>,
}

impl FromSexpr for Schematic {
    const TAG: &'static str = "kicad_sch";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;

        // validate the format version before any other field so an old file
        // fails with a version error, never a field error
        let mut args = Args::new(expr);
        let version = args.scalar_i64("version")?.unwrap_or(SUPPORTED_SCHEMATIC_VERSION);
        if version != SUPPORTED_SCHEMATIC_VERSION {
            return Err(Error::Version {
                found: version,
                supported: SUPPORTED_SCHEMATIC_VERSION,
            });
        }

        let schematic = Schematic {
            version,
            generator: args.scalar_string("generator")?.unwrap_or_default(),
            uuid: args.uuid("uuid")?.unwrap_or_else(Uuid::new_v4),
            title_block: args.record()?,
            paper: args.record()?.unwrap_or_default(),
            lib_symbols: args.record()?.unwrap_or_default(),
            sheet: args.records()?,
            symbol: args.records()?,
            polyline: args.records()?,
            wire: args.records()?,
            bus: args.records()?,
            image: args.records()?,
            junction: args.records()?,
            no_connect: args.records()?,
            bus_entry: args.records()?,
            text: args.records()?,
            label: args.records()?,
            hierarchical_label: args.records()?,
            global_label: args.records()?,
            sheet_instances: args.record()?.unwrap_or_default(),
            symbol_instances: args.record()?.unwrap_or_default(),
            bus_alias: args.records()?,
        };
        args.finish()?;
        Ok(schematic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sexpr::from_str;

    #[test]
    fn test_version_gate_fails_before_other_fields() {
        // everything after version is malformed, the version error must win
        let expr = from_str(
            "(kicad_sch (version 20200310) (junction) (wire (pts (zz))))",
        )
        .unwrap();
        match Schematic::from_sexpr(&expr) {
            Err(Error::Version { found, supported }) => {
                assert_eq!(found, 20200310);
                assert_eq!(supported, SUPPORTED_SCHEMATIC_VERSION);
            }
            other => panic!("expected version error, got {other:?}"),
        }
    }

    #[test]
    fn test_paper_union_standard() {
        let expr = from_str("(paper \"A4\")").unwrap();
        assert_eq!(
            PaperChoice::from_sexpr(&expr).unwrap(),
            PaperChoice::Standard(Paper::default())
        );
    }

    #[test]
    fn test_paper_union_user() {
        let expr = from_str("(paper \"User\" 200.5 150)").unwrap();
        match PaperChoice::from_sexpr(&expr).unwrap() {
            PaperChoice::User(paper) => {
                assert_eq!(paper.width, 200.5);
                assert_eq!(paper.height, 150.0);
            }
            other => panic!("expected user paper, got {other:?}"),
        }
    }

    #[test]
    fn test_paper_union_unresolvable_reports_first_error() {
        let expr = from_str("(paper \"A9\")").unwrap();
        let err = PaperChoice::from_sexpr(&expr).unwrap_err();
        assert!(err.to_string().contains("A9"), "{err}");
    }

    #[test]
    fn test_minimal_schematic() {
        let expr = from_str(
            "(kicad_sch (version 20211123) (generator eeschema) \
               (uuid f1b8e8a0-0b1a-4c77-a6c8-11fe77e10acd) (paper \"A4\") \
               (lib_symbols) \
               (sheet_instances (path \"/\" (page \"1\"))))",
        )
        .unwrap();
        let sch = Schematic::from_sexpr(&expr).unwrap();
        assert_eq!(sch.version, SUPPORTED_SCHEMATIC_VERSION);
        assert_eq!(sch.generator, "eeschema");
        assert_eq!(sch.sheet_instances.path.len(), 1);
        assert_eq!(sch.sheet_instances.path[0].page, "1");
    }

    #[test]
    fn test_placed_symbol() {
        let expr = from_str(
            "(symbol (lib_id \"Device:R\") (at 94.615 71.755 90) (unit 1) \
               (in_bom yes) (on_board yes) \
               (uuid 6085493a-13b2-4eca-8adb-3d2ab2a43132) \
               (property \"Reference\" \"R6\" (id 0) (at 94.615 66.675 90)) \
               (property \"Value\" \"1k\" (id 1) (at 94.615 69.215 90)) \
               (pin \"1\" (uuid 4f8a46fa-5b3a-464c-b079-ba05f6c627e0)) \
               (pin \"2\" (uuid c5f1ba6a-6cf6-409b-94f5-dca09ce6bb1d)))",
        )
        .unwrap();
        let symbol = SymbolPlaced::from_sexpr(&expr).unwrap();
        assert_eq!(symbol.lib_id, "Device:R");
        assert_eq!(symbol.at, (94.615, 71.755, 90.0));
        assert!(symbol.in_bom);
        assert_eq!(symbol.property.len(), 2);
        assert_eq!(symbol.pin.len(), 2);
    }

    #[test]
    fn test_sheet() {
        let expr = from_str(
            "(sheet (at 20 20) (size 12.7 7.62) (fields_autoplaced) \
               (stroke (width 0) (type solid) (color 0 0 0 0)) \
               (fill (color 0 0 0 0.0)) \
               (uuid 7a9a06d9-1d0d-4d99-b2c0-3c8a09d4be21) \
               (property \"Sheet name\" \"sub\" (id 0) (at 20 20 0)) \
               (property \"Sheet file\" \"sub.kicad_sch\" (id 1) (at 20 30.16 0)) \
               (pin \"IO1\" input (at 20 22.54 0) \
                 (effects (font (size 1.27 1.27)) (justify right)) \
                 (uuid 9491e82c-4d7c-4a61-9a4a-18b16cb53a2e)))",
        )
        .unwrap();
        let sheet = Sheet::from_sexpr(&expr).unwrap();
        assert_eq!(sheet.at, (20.0, 20.0));
        assert_eq!(sheet.pin.len(), 1);
        assert_eq!(sheet.pin[0].shape, LabelShape::Input);
        assert_eq!(sheet.property[0].value, "sub");
    }

    #[test]
    fn test_unknown_root_field_rejected() {
        let expr = from_str("(kicad_sch (version 20211123) (wormhole 1))").unwrap();
        assert!(matches!(
            Schematic::from_sexpr(&expr),
            Err(Error::Validation(_))
        ));
    }
}
