//! Records for the symbol definitions found in `lib_symbols`.

use super::shapes::{Arc, Bezier, Circle, PolyLine, Rectangle};
use super::{expect_tag, Args, FromSexpr};
use crate::error::Error;
use crate::sexpr::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JustifyHoriz {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JustifyVert {
    Top,
    #[default]
    Center,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Justify {
    pub horizontal: JustifyHoriz,
    pub vertical: JustifyVert,
    pub mirror: bool,
}

impl FromSexpr for Justify {
    const TAG: &'static str = "justify";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let mut justify = Justify::default();
        // values appear in any combination, e.g. (justify bottom) alone
        while let Some(atom) = args.opt_pos_atom() {
            match atom.unquoted() {
                Some("left") => justify.horizontal = JustifyHoriz::Left,
                Some("right") => justify.horizontal = JustifyHoriz::Right,
                Some("top") => justify.vertical = JustifyVert::Top,
                Some("bottom") => justify.vertical = JustifyVert::Bottom,
                Some("mirror") => justify.mirror = true,
                _ => {
                    return Err(Error::validation(format!(
                        "unknown justify value '{atom}'"
                    )))
                }
            }
        }
        args.finish()?;
        Ok(justify)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinElectricalType {
    Input,
    Output,
    Bidirectional,
    TriState,
    Passive,
    Free,
    #[default]
    Unspecified,
    PowerIn,
    PowerOut,
    OpenCollector,
    OpenEmitter,
    NoConnect,
}

impl PinElectricalType {
    pub fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "input" => Ok(Self::Input),
            "output" => Ok(Self::Output),
            "bidirectional" => Ok(Self::Bidirectional),
            "tri_state" => Ok(Self::TriState),
            "passive" => Ok(Self::Passive),
            "free" => Ok(Self::Free),
            "unspecified" => Ok(Self::Unspecified),
            "power_in" => Ok(Self::PowerIn),
            "power_out" => Ok(Self::PowerOut),
            "open_collector" => Ok(Self::OpenCollector),
            "open_emitter" => Ok(Self::OpenEmitter),
            "no_connect" => Ok(Self::NoConnect),
            other => Err(Error::validation(format!(
                "unknown pin electrical type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinGraphicStyle {
    #[default]
    Line,
    Inverted,
    Clock,
    InvertedClock,
    InputLow,
    ClockLow,
    OutputLow,
    EdgeClockHigh,
    NonLogic,
}

impl PinGraphicStyle {
    pub fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "line" => Ok(Self::Line),
            "inverted" => Ok(Self::Inverted),
            "clock" => Ok(Self::Clock),
            "inverted_clock" => Ok(Self::InvertedClock),
            "input_low" => Ok(Self::InputLow),
            "clock_low" => Ok(Self::ClockLow),
            "output_low" => Ok(Self::OutputLow),
            "edge_clock_high" => Ok(Self::EdgeClockHigh),
            "non_logic" => Ok(Self::NonLogic),
            other => Err(Error::validation(format!(
                "unknown pin graphic style '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    pub size: (f64, f64),
    pub thickness: Option<f64>,
    pub italic: bool,
    pub bold: bool,
}

impl Default for Font {
    fn default() -> Self {
        Font {
            size: (1.27, 1.27),
            thickness: None,
            italic: false,
            bold: false,
        }
    }
}

impl FromSexpr for Font {
    const TAG: &'static str = "font";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let font = Font {
            size: args.tuple2("size")?.unwrap_or((1.27, 1.27)),
            thickness: args.scalar_f64("thickness")?,
            italic: args.flag("italic"),
            bold: args.flag("bold"),
        };
        args.finish()?;
        Ok(font)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Effects {
    pub font: Font,
    pub justify: Justify,
    pub hide: bool,
}

impl FromSexpr for Effects {
    const TAG: &'static str = "effects";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let effects = Effects {
            font: args.record()?.unwrap_or_default(),
            justify: args.record()?.unwrap_or_default(),
            hide: args.flag("hide"),
        };
        args.finish()?;
        Ok(effects)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PinNumber {
    pub text: String,
    pub effects: Effects,
}

impl FromSexpr for PinNumber {
    const TAG: &'static str = "number";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let number = PinNumber {
            text: args.pos_string("text")?,
            effects: args.record()?.unwrap_or_default(),
        };
        args.finish()?;
        Ok(number)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PinName {
    pub text: String,
    pub effects: Effects,
}

impl FromSexpr for PinName {
    const TAG: &'static str = "name";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let name = PinName {
            text: args.pos_string("text")?,
            effects: args.record()?.unwrap_or_default(),
        };
        args.finish()?;
        Ok(name)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SymbolProperty {
    pub key: String,
    pub value: String,
    pub id: i64,
    pub at: (f64, f64, f64),
    pub effects: Effects,
}

impl FromSexpr for SymbolProperty {
    const TAG: &'static str = "property";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let property = SymbolProperty {
            key: args.pos_string("key")?,
            value: args.pos_string("value")?,
            id: args.scalar_i64("id")?.unwrap_or(0),
            at: args.tuple3("at")?.unwrap_or((0.0, 0.0, 0.0)),
            effects: args.record()?.unwrap_or_default(),
        };
        args.finish()?;
        Ok(property)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PinAlternate {
    pub name: String,
    pub electrical_type: PinElectricalType,
    pub graphic_style: PinGraphicStyle,
}

impl FromSexpr for PinAlternate {
    const TAG: &'static str = "alternate";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let name = args.pos_string("name")?;
        let electrical_type = match args.opt_pos_string() {
            Some(s) => PinElectricalType::parse(&s)?,
            None => PinElectricalType::default(),
        };
        let graphic_style = match args.opt_pos_string() {
            Some(s) => PinGraphicStyle::parse(&s)?,
            None => PinGraphicStyle::default(),
        };
        args.finish()?;
        Ok(PinAlternate {
            name,
            electrical_type,
            graphic_style,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pin {
    pub electrical_type: PinElectricalType,
    pub graphic_style: PinGraphicStyle,
    pub at: (f64, f64, f64),
    pub length: f64,
    pub hide: bool,
    pub name: PinName,
    pub number: PinNumber,
    pub alternate: Vec<PinAlternate>,
}

impl FromSexpr for Pin {
    const TAG: &'static str = "pin";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let electrical_type = match args.opt_pos_string() {
            Some(s) => PinElectricalType::parse(&s)?,
            None => PinElectricalType::default(),
        };
        let graphic_style = match args.opt_pos_string() {
            Some(s) => PinGraphicStyle::parse(&s)?,
            None => PinGraphicStyle::default(),
        };
        let pin = Pin {
            electrical_type,
            graphic_style,
            at: args.tuple3("at")?.unwrap_or((0.0, 0.0, 0.0)),
            length: args.scalar_f64("length")?.unwrap_or(0.0),
            hide: args.flag("hide"),
            name: args.record()?.unwrap_or_default(),
            number: args.record()?.unwrap_or_default(),
            alternate: args.records()?,
        };
        args.finish()?;
        Ok(pin)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PinNameSettings {
    pub offset: Option<f64>,
    pub hide: bool,
}

impl FromSexpr for PinNameSettings {
    const TAG: &'static str = "pin_names";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        // (pin_names hide) puts hide in argument position
        let mut hide = args.flag("hide");
        if let Some(atom) = args.opt_pos_atom() {
            if atom.unquoted() == Some("hide") {
                hide = true;
            } else {
                return Err(Error::validation(format!(
                    "(pin_names) unexpected argument '{atom}'"
                )));
            }
        }
        let settings = PinNameSettings {
            offset: args.scalar_f64("offset")?,
            hide,
        };
        args.finish()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PinNumberSettings {
    pub hide: bool,
}

impl FromSexpr for PinNumberSettings {
    const TAG: &'static str = "pin_numbers";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let mut hide = args.flag("hide");
        if let Some(atom) = args.opt_pos_atom() {
            if atom.unquoted() == Some("hide") {
                hide = true;
            } else {
                return Err(Error::validation(format!(
                    "(pin_numbers) unexpected argument '{atom}'"
                )));
            }
        }
        let settings = PinNumberSettings { hide };
        args.finish()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolGraphicText {
    pub text: String,
    pub at: (f64, f64, f64),
    pub effects: Effects,
}

impl FromSexpr for SymbolGraphicText {
    const TAG: &'static str = "text";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let text = SymbolGraphicText {
            text: args.pos_string("text")?,
            at: args
                .tuple3("at")?
                .ok_or_else(|| Error::validation("(text) requires (at ...)"))?,
            effects: args.record()?.unwrap_or_default(),
        };
        args.finish()?;
        Ok(text)
    }
}

/// Appears bare as `(power)` on power symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsPower;

impl FromSexpr for IsPower {
    const TAG: &'static str = "power";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        Args::new(expr).finish()?;
        Ok(IsPower)
    }
}

/// A library symbol definition, possibly containing unit sub-symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub property: Vec<SymbolProperty>,
    pub pin_names: PinNameSettings,
    pub pin_numbers: PinNumberSettings,
    pub in_bom: bool,
    pub on_board: bool,
    pub power: Option<IsPower>,
    pub pin: Vec<Pin>,
    pub symbol: Vec<Symbol>,
    pub polyline: Vec<PolyLine>,
    pub bezier: Vec<Bezier>,
    pub text: Vec<SymbolGraphicText>,
    pub rectangle: Vec<Rectangle>,
    pub circle: Vec<Circle>,
    pub arc: Vec<Arc>,
}

impl FromSexpr for Symbol {
    const TAG: &'static str = "symbol";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let symbol = Symbol {
            name: args.pos_string("name")?,
            property: args.records()?,
            pin_names: args.record()?.unwrap_or_default(),
            pin_numbers: args.record()?.unwrap_or_default(),
            in_bom: args.scalar_bool("in_bom")?.unwrap_or(true),
            on_board: args.scalar_bool("on_board")?.unwrap_or(true),
            power: args.record()?,
            pin: args.records()?,
            symbol: args.records()?,
            polyline: args.records()?,
            bezier: args.records()?,
            text: args.records()?,
            rectangle: args.records()?,
            circle: args.records()?,
            arc: args.records()?,
        };
        args.finish()?;
        Ok(symbol)
    }
}
