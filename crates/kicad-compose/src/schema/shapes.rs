//! Graphic item records found in `.kicad_sch` files.

use uuid::Uuid;

use super::{expect_tag, Args, Color, FromSexpr};
use crate::error::Error;
use crate::sexpr::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillType {
    #[default]
    None,
    Outline,
    Background,
}

impl FillType {
    fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "none" => Ok(FillType::None),
            "outline" => Ok(FillType::Outline),
            "background" => Ok(FillType::Background),
            other => Err(Error::validation(format!("unknown fill type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrokeType {
    #[default]
    Default,
    Dash,
    DashDot,
    DashDotDot,
    Dot,
    Solid,
}

impl StrokeType {
    fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "default" => Ok(StrokeType::Default),
            "dash" => Ok(StrokeType::Dash),
            "dash_dot" => Ok(StrokeType::DashDot),
            "dash_dot_dot" => Ok(StrokeType::DashDotDot),
            "dot" => Ok(StrokeType::Dot),
            "solid" => Ok(StrokeType::Solid),
            other => Err(Error::validation(format!("unknown stroke type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub width: f64,
    pub stroke_type: StrokeType,
    pub color: Color,
}

impl Default for Stroke {
    fn default() -> Self {
        Stroke {
            width: 0.1524,
            stroke_type: StrokeType::Default,
            color: Color::default(),
        }
    }
}

impl FromSexpr for Stroke {
    const TAG: &'static str = "stroke";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let stroke = Stroke {
            width: args.scalar_f64("width")?.unwrap_or(0.1524),
            stroke_type: match args.scalar_string("type")? {
                Some(s) => StrokeType::parse(&s)?,
                None => StrokeType::Default,
            },
            color: args.color("color")?.unwrap_or_default(),
        };
        args.finish()?;
        Ok(stroke)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fill {
    pub fill_type: FillType,
}

impl FromSexpr for Fill {
    const TAG: &'static str = "fill";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let fill = Fill {
            fill_type: match args.scalar_string("type")? {
                Some(s) => FillType::parse(&s)?,
                None => FillType::None,
            },
        };
        args.finish()?;
        Ok(fill)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Xy {
    pub x: f64,
    pub y: f64,
}

impl FromSexpr for Xy {
    const TAG: &'static str = "xy";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let xy = Xy {
            x: args.pos_f64("x")?,
            y: args.pos_f64("y")?,
        };
        args.finish()?;
        Ok(xy)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pts {
    pub xy: Vec<Xy>,
}

impl FromSexpr for Pts {
    const TAG: &'static str = "pts";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let pts = Pts {
            xy: args.records()?,
        };
        args.finish()?;
        Ok(pts)
    }
}

/// A polyline, in a symbol body or at the sheet level (where it also
/// carries an identifier).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolyLine {
    pub pts: Pts,
    pub stroke: Stroke,
    pub fill: Fill,
    pub uuid: Option<Uuid>,
}

impl FromSexpr for PolyLine {
    const TAG: &'static str = "polyline";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let polyline = PolyLine {
            pts: args.record()?.unwrap_or_default(),
            stroke: args.record()?.unwrap_or_default(),
            fill: args.record()?.unwrap_or_default(),
            uuid: args.uuid("uuid")?,
        };
        args.finish()?;
        Ok(polyline)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bezier {
    pub pts: Pts,
    pub stroke: Stroke,
    pub fill: Fill,
}

impl FromSexpr for Bezier {
    const TAG: &'static str = "bezier";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let bezier = Bezier {
            pts: args.record()?.unwrap_or_default(),
            stroke: args.record()?.unwrap_or_default(),
            fill: args.record()?.unwrap_or_default(),
        };
        args.finish()?;
        Ok(bezier)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    pub start: (f64, f64),
    pub end: (f64, f64),
    pub stroke: Stroke,
    pub fill: Fill,
}

impl FromSexpr for Rectangle {
    const TAG: &'static str = "rectangle";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let rectangle = Rectangle {
            start: args
                .tuple2("start")?
                .ok_or_else(|| Error::validation("(rectangle) requires (start ...)"))?,
            end: args
                .tuple2("end")?
                .ok_or_else(|| Error::validation("(rectangle) requires (end ...)"))?,
            stroke: args.record()?.unwrap_or_default(),
            fill: args.record()?.unwrap_or_default(),
        };
        args.finish()?;
        Ok(rectangle)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    pub center: (f64, f64),
    pub radius: f64,
    pub stroke: Stroke,
    pub fill: Fill,
}

impl FromSexpr for Circle {
    const TAG: &'static str = "circle";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let circle = Circle {
            center: args
                .tuple2("center")?
                .ok_or_else(|| Error::validation("(circle) requires (center ...)"))?,
            radius: args
                .scalar_f64("radius")?
                .ok_or_else(|| Error::validation("(circle) requires (radius ...)"))?,
            stroke: args.record()?.unwrap_or_default(),
            fill: args.record()?.unwrap_or_default(),
        };
        args.finish()?;
        Ok(circle)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Radius {
    pub at: (f64, f64),
    pub length: f64,
    pub angles: (f64, f64),
}

impl FromSexpr for Radius {
    const TAG: &'static str = "radius";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let radius = Radius {
            at: args
                .tuple2("at")?
                .ok_or_else(|| Error::validation("(radius) requires (at ...)"))?,
            length: args
                .scalar_f64("length")?
                .ok_or_else(|| Error::validation("(radius) requires (length ...)"))?,
            angles: args
                .tuple2("angles")?
                .ok_or_else(|| Error::validation("(radius) requires (angles ...)"))?,
        };
        args.finish()?;
        Ok(radius)
    }
}

/// An arc, either the three-point form (start/mid/end) or the legacy
/// center-radius form.
#[derive(Debug, Clone, PartialEq)]
pub struct Arc {
    pub start: (f64, f64),
    pub end: (f64, f64),
    pub mid: Option<(f64, f64)>,
    pub radius: Option<Radius>,
    pub stroke: Stroke,
    pub fill: Fill,
}

impl FromSexpr for Arc {
    const TAG: &'static str = "arc";

    fn from_sexpr(expr: &Expr) -> Result<Self, Error> {
        expect_tag(expr, Self::TAG)?;
        let mut args = Args::new(expr);
        let arc = Arc {
            start: args
                .tuple2("start")?
                .ok_or_else(|| Error::validation("(arc) requires (start ...)"))?,
            end: args
                .tuple2("end")?
                .ok_or_else(|| Error::validation("(arc) requires (end ...)"))?,
            mid: args.tuple2("mid")?,
            radius: args.record()?,
            stroke: args.record()?.unwrap_or_default(),
            fill: args.record()?.unwrap_or_default(),
        };
        args.finish()?;
        Ok(arc)
    }
}
