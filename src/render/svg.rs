//! Typed SVG scene graph.
//!
//! Renderers build a [`Document`] out of drawing primitives and serialize it
//! once with [`Document::to_svg`]. Escaping and number formatting live here
//! only, so layout code never touches markup. Serialization fails with
//! [`CardError::RenderInternal`] when a coordinate is not finite.

use crate::models::{CardError, Result};

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const FONT_FAMILY: &str = "'Segoe UI', Ubuntu, 'Helvetica Neue', sans-serif";

/// Escape the five XML special characters for element text and attribute
/// values. Characters XML 1.0 cannot carry at all (most C0 controls,
/// U+FFFE, U+FFFF) become U+FFFD.
pub fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other if is_xml_char(other) => out.push(other),
            _ => out.push(char::REPLACEMENT_CHARACTER),
        }
    }
    out
}

/// The XML 1.0 `Char` production.
fn is_xml_char(ch: char) -> bool {
    matches!(
        ch,
        '\u{9}' | '\u{A}' | '\u{D}'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Shortest stable rendering of a coordinate: at most two decimals, no
/// trailing zeros.
pub fn fmt_num(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let text = format!("{:.2}", rounded);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    fn as_str(&self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub color: String,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub radius: f64,
    pub fill: String,
    pub opacity: Option<f64>,
    pub stroke: Option<Stroke>,
    pub title: Option<String>,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            radius: 0.0,
            fill: "none".to_string(),
            opacity: None,
            stroke: None,
            title: None,
        }
    }

    pub fn fill(mut self, color: &str) -> Self {
        self.fill = color.to_string();
        self
    }

    pub fn radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn stroke(mut self, color: &str, width: f64) -> Self {
        self.stroke = Some(Stroke { color: color.to_string(), width });
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
    pub fill: String,
    pub stroke: Option<Stroke>,
    pub title: Option<String>,
}

impl Circle {
    pub fn new(cx: f64, cy: f64, r: f64) -> Self {
        Self {
            cx,
            cy,
            r,
            fill: "none".to_string(),
            stroke: None,
            title: None,
        }
    }

    pub fn fill(mut self, color: &str) -> Self {
        self.fill = color.to_string();
        self
    }

    pub fn stroke(mut self, color: &str, width: f64) -> Self {
        self.stroke = Some(Stroke { color: color.to_string(), width });
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub stroke: Stroke,
    pub dashed: bool,
}

impl Line {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64, color: &str, width: f64) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            stroke: Stroke { color: color.to_string(), width },
            dashed: false,
        }
    }

    pub fn dashed(mut self) -> Self {
        self.dashed = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub x: f64,
    pub y: f64,
    pub content: String,
    pub size: f64,
    pub fill: String,
    pub anchor: Anchor,
    pub bold: bool,
}

impl Text {
    pub fn new(x: f64, y: f64, content: impl Into<String>) -> Self {
        Self {
            x,
            y,
            content: content.into(),
            size: 12.0,
            fill: "#333333".to_string(),
            anchor: Anchor::Start,
            bold: false,
        }
    }

    pub fn size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn fill(mut self, color: &str) -> Self {
        self.fill = color.to_string();
        self
    }

    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(f64, f64),
    LineTo(f64, f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub commands: Vec<PathCommand>,
    pub stroke: Stroke,
    pub fill: String,
}

impl Path {
    /// Polyline through `points`: one move-to followed by a line-to per
    /// remaining point.
    pub fn polyline(points: &[(f64, f64)], color: &str, width: f64) -> Self {
        let commands = points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                if i == 0 {
                    PathCommand::MoveTo(x, y)
                } else {
                    PathCommand::LineTo(x, y)
                }
            })
            .collect();

        Self {
            commands,
            stroke: Stroke { color: color.to_string(), width },
            fill: "none".to_string(),
        }
    }

    pub fn data(&self) -> String {
        self.commands
            .iter()
            .map(|cmd| match cmd {
                PathCommand::MoveTo(x, y) => format!("M {} {}", fmt_num(*x), fmt_num(*y)),
                PathCommand::LineTo(x, y) => format!("L {} {}", fmt_num(*x), fmt_num(*y)),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub href: String,
    pub clip_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Group {
    pub class: Option<String>,
    pub children: Vec<Node>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(mut self, class: &str) -> Self {
        self.class = Some(class.to_string());
        self
    }

    pub fn push(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Rect(Rect),
    Circle(Circle),
    Line(Line),
    Text(Text),
    Path(Path),
    Image(Image),
    Group(Group),
}

impl From<Rect> for Node {
    fn from(v: Rect) -> Self {
        Node::Rect(v)
    }
}

impl From<Circle> for Node {
    fn from(v: Circle) -> Self {
        Node::Circle(v)
    }
}

impl From<Line> for Node {
    fn from(v: Line) -> Self {
        Node::Line(v)
    }
}

impl From<Text> for Node {
    fn from(v: Text) -> Self {
        Node::Text(v)
    }
}

impl From<Path> for Node {
    fn from(v: Path) -> Self {
        Node::Path(v)
    }
}

impl From<Image> for Node {
    fn from(v: Image) -> Self {
        Node::Image(v)
    }
}

impl From<Group> for Node {
    fn from(v: Group) -> Self {
        Node::Group(v)
    }
}

/// Circular clip region referenced by id.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipCircle {
    pub id: String,
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub width: f64,
    pub height: f64,
    pub title: Option<String>,
    pub clips: Vec<ClipCircle>,
    pub children: Vec<Node>,
}

impl Document {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            title: None,
            clips: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn push(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }

    pub fn clip(&mut self, clip: ClipCircle) {
        self.clips.push(clip);
    }

    /// Serialize the scene to a standalone SVG document.
    pub fn to_svg(&self) -> Result<String> {
        let (w, h) = (num(self.width)?, num(self.height)?);
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

        out.push_str(&format!(
            r#"<svg xmlns="{SVG_NS}" width="{w}" height="{h}" viewBox="0 0 {w} {h}""#
        ));
        out.push_str(&format!(r#" font-family="{}">"#, xml_escape(FONT_FAMILY)));
        out.push('\n');

        if let Some(title) = &self.title {
            out.push_str(&format!("  <title>{}</title>\n", xml_escape(title)));
        }

        if !self.clips.is_empty() {
            out.push_str("  <defs>\n");
            for clip in &self.clips {
                out.push_str(&format!(
                    r#"    <clipPath id="{}"><circle cx="{}" cy="{}" r="{}"/></clipPath>"#,
                    xml_escape(&clip.id),
                    num(clip.cx)?,
                    num(clip.cy)?,
                    num(clip.r)?,
                ));
                out.push('\n');
            }
            out.push_str("  </defs>\n");
        }

        for node in &self.children {
            write_node(&mut out, node, 1)?;
        }

        out.push_str("</svg>\n");
        Ok(out)
    }
}

fn num(value: f64) -> Result<String> {
    if !value.is_finite() {
        return Err(CardError::RenderInternal(format!(
            "non-finite coordinate {}",
            value
        )));
    }
    Ok(fmt_num(value))
}

fn stroke_attrs(stroke: &Stroke) -> Result<String> {
    Ok(format!(
        r#" stroke="{}" stroke-width="{}""#,
        xml_escape(&stroke.color),
        num(stroke.width)?
    ))
}

/// Closes an element, nesting a `<title>` tooltip when one is present.
fn close_with_title(out: &mut String, title: &Option<String>, tag: &str) {
    match title {
        Some(t) => out.push_str(&format!("><title>{}</title></{}>\n", xml_escape(t), tag)),
        None => out.push_str("/>\n"),
    }
}

fn write_node(out: &mut String, node: &Node, depth: usize) -> Result<()> {
    let indent = "  ".repeat(depth);

    match node {
        Node::Rect(r) => {
            out.push_str(&format!(
                r#"{indent}<rect x="{}" y="{}" width="{}" height="{}" fill="{}""#,
                num(r.x)?,
                num(r.y)?,
                num(r.width)?,
                num(r.height)?,
                xml_escape(&r.fill),
            ));
            if r.radius > 0.0 {
                let radius = num(r.radius)?;
                out.push_str(&format!(r#" rx="{radius}" ry="{radius}""#));
            }
            if let Some(opacity) = r.opacity {
                out.push_str(&format!(r#" fill-opacity="{}""#, num(opacity)?));
            }
            if let Some(stroke) = &r.stroke {
                out.push_str(&stroke_attrs(stroke)?);
            }
            close_with_title(out, &r.title, "rect");
        }
        Node::Circle(c) => {
            out.push_str(&format!(
                r#"{indent}<circle cx="{}" cy="{}" r="{}" fill="{}""#,
                num(c.cx)?,
                num(c.cy)?,
                num(c.r)?,
                xml_escape(&c.fill),
            ));
            if let Some(stroke) = &c.stroke {
                out.push_str(&stroke_attrs(stroke)?);
            }
            close_with_title(out, &c.title, "circle");
        }
        Node::Line(l) => {
            out.push_str(&format!(
                r#"{indent}<line x1="{}" y1="{}" x2="{}" y2="{}""#,
                num(l.x1)?,
                num(l.y1)?,
                num(l.x2)?,
                num(l.y2)?,
            ));
            out.push_str(&stroke_attrs(&l.stroke)?);
            if l.dashed {
                out.push_str(r#" stroke-dasharray="4 4""#);
            }
            out.push_str("/>\n");
        }
        Node::Text(t) => {
            out.push_str(&format!(
                r#"{indent}<text x="{}" y="{}" font-size="{}" fill="{}""#,
                num(t.x)?,
                num(t.y)?,
                num(t.size)?,
                xml_escape(&t.fill),
            ));
            if t.anchor != Anchor::Start {
                out.push_str(&format!(r#" text-anchor="{}""#, t.anchor.as_str()));
            }
            if t.bold {
                out.push_str(r#" font-weight="bold""#);
            }
            out.push_str(&format!(">{}</text>\n", xml_escape(&t.content)));
        }
        Node::Path(p) => {
            for cmd in &p.commands {
                let (PathCommand::MoveTo(x, y) | PathCommand::LineTo(x, y)) = cmd;
                num(*x)?;
                num(*y)?;
            }
            out.push_str(&format!(
                r#"{indent}<path d="{}" fill="{}""#,
                p.data(),
                xml_escape(&p.fill),
            ));
            out.push_str(&stroke_attrs(&p.stroke)?);
            out.push_str(" stroke-linejoin=\"round\"/>\n");
        }
        Node::Image(i) => {
            out.push_str(&format!(
                r#"{indent}<image x="{}" y="{}" width="{}" height="{}" href="{}""#,
                num(i.x)?,
                num(i.y)?,
                num(i.width)?,
                num(i.height)?,
                xml_escape(&i.href),
            ));
            out.push_str(r#" preserveAspectRatio="xMidYMid slice""#);
            if let Some(clip) = &i.clip_path {
                out.push_str(&format!(r#" clip-path="url(#{})""#, xml_escape(clip)));
            }
            out.push_str("/>\n");
        }
        Node::Group(g) => {
            out.push_str(&format!("{indent}<g"));
            if let Some(class) = &g.class {
                out.push_str(&format!(r#" class="{}""#, xml_escape(class)));
            }
            out.push_str(">\n");
            for child in &g.children {
                write_node(out, child, depth + 1)?;
            }
            out.push_str(&format!("{indent}</g>\n"));
        }
    }

    Ok(())
}
