//! Table image rendering.
//!
//! Walks a `TableLayout` and paints it: row backgrounds, a thin border per
//! cell, and left-aligned multi-line text. The drawing is expressed as an SVG
//! scene, rasterized with resvg and written as a PNG file.

use crate::layout::{RowLayout, TableLayout};
use crate::typeface::Typeface;
use crate::types::TicketColumn;
use log::debug;
use resvg::{tiny_skia, usvg};
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// An opaque RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    fn css(self) -> String {
        format!("rgb({},{},{})", self.0, self.1, self.2)
    }
}

pub const HEADER_BACKGROUND: Rgb = Rgb(45, 90, 45);
pub const HIGHLIGHT_BACKGROUND: Rgb = Rgb(255, 204, 128);
pub const ROW_BACKGROUND: Rgb = Rgb(255, 255, 255);
pub const BORDER_COLOR: Rgb = Rgb(200, 200, 200);
pub const HEADER_TEXT: Rgb = Rgb(255, 255, 255);
pub const BODY_TEXT: Rgb = Rgb(0, 0, 0);

/// Offset of the first text line from the cell's top-left corner
pub const TEXT_INSET: u32 = 15;
/// Extra pixels between wrapped lines
pub const LINE_SPACING: u32 = 8;
pub const BODY_FONT_SIZE: u32 = 28;
pub const HEADER_FONT_SIZE: u32 = 30;

/// Visual style of one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowStyle {
    pub background: Rgb,
    pub text: Rgb,
    pub font_size: u32,
    pub bold: bool,
}

/// Pick the style of a row. The header style wins over highlighting.
pub fn row_style(row: &RowLayout, highlighted: bool) -> RowStyle {
    if row.is_header {
        RowStyle { background: HEADER_BACKGROUND, text: HEADER_TEXT, font_size: HEADER_FONT_SIZE, bold: true }
    } else if highlighted {
        RowStyle { background: HIGHLIGHT_BACKGROUND, text: BODY_TEXT, font_size: BODY_FONT_SIZE, bold: false }
    } else {
        RowStyle { background: ROW_BACKGROUND, text: BODY_TEXT, font_size: BODY_FONT_SIZE, bold: false }
    }
}

/// Highlight predicate matching the row whose store equals `store`.
/// `None` highlights nothing.
pub fn highlight_store(store: Option<&str>) -> impl Fn(&RowLayout) -> bool {
    let target = store.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    move |row: &RowLayout| match &target {
        Some(store) => !row.is_header && row.cell_text(TicketColumn::Store) == store,
        None => false,
    }
}

/// Error raised while producing the image file
#[derive(Debug)]
pub enum RenderError {
    /// The scene could not be parsed by the rasterizer
    Scene(String),
    /// The canvas could not be allocated
    Canvas { width: u32, height: u32 },
    /// PNG encoding failed
    Encode(String),
    Io(std::io::Error),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Scene(e) => write!(f, "invalid table scene: {}", e),
            RenderError::Canvas { width, height } => write!(f, "cannot allocate {}x{} canvas", width, height),
            RenderError::Encode(e) => write!(f, "PNG encoding failed: {}", e),
            RenderError::Io(e) => write!(f, "I/O error writing image: {}", e),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        RenderError::Io(e)
    }
}

/// Build the SVG scene for a layout.
pub fn build_table_svg<F>(layout: &TableLayout, font_family: &str, should_highlight: F) -> String
where
    F: Fn(&RowLayout) -> bool,
{
    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
        w = layout.width,
        h = layout.height
    ));
    svg.push_str(&format!(
        "<rect x=\"0\" y=\"0\" width=\"{}\" height=\"{}\" fill=\"{}\"/>\n",
        layout.width,
        layout.height,
        ROW_BACKGROUND.css()
    ));

    for row in &layout.rows {
        let style = row_style(row, should_highlight(row));
        write_row(&mut svg, row, &style, font_family);
    }

    svg.push_str("</svg>\n");
    svg
}

fn write_row(svg: &mut String, row: &RowLayout, style: &RowStyle, font_family: &str) {
    let Some(first) = row.cells.first() else {
        return;
    };
    let row_width: u32 = row.cells.iter().map(|c| c.width).sum();

    svg.push_str(&format!(
        "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" shape-rendering=\"crispEdges\"/>\n",
        first.x,
        row.y,
        row_width,
        row.height,
        style.background.css()
    ));

    for cell in &row.cells {
        svg.push_str(&format!(
            "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1\" shape-rendering=\"crispEdges\"/>\n",
            cell.x,
            row.y,
            cell.width,
            row.height,
            BORDER_COLOR.css()
        ));

        if cell.lines.iter().all(|l| l.is_empty()) {
            continue;
        }

        let text_x = cell.x + TEXT_INSET;
        svg.push_str(&format!(
            "<text font-family=\"{}\" font-size=\"{}\" font-weight=\"{}\" fill=\"{}\" xml:space=\"preserve\">",
            svg_escape(font_family),
            style.font_size,
            if style.bold { "bold" } else { "normal" },
            style.text.css()
        ));
        for (i, line) in cell.lines.iter().enumerate() {
            let baseline = row.y + TEXT_INSET + style.font_size + i as u32 * (style.font_size + LINE_SPACING);
            svg.push_str(&format!("<tspan x=\"{}\" y=\"{}\">{}</tspan>", text_x, baseline, svg_escape(line)));
        }
        svg.push_str("</text>\n");
    }
}

fn svg_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;").replace('\'', "&apos;")
}

/// Rasterize a layout into a pixmap
pub fn render_table<F>(layout: &TableLayout, typeface: &Typeface, should_highlight: F) -> Result<tiny_skia::Pixmap, RenderError>
where
    F: Fn(&RowLayout) -> bool,
{
    let svg = build_table_svg(layout, &typeface.font_family(), should_highlight);

    let mut options = usvg::Options::default();
    options.fontdb = typeface.database();
    let tree = usvg::Tree::from_str(&svg, &options).map_err(|e| RenderError::Scene(e.to_string()))?;

    let mut pixmap = tiny_skia::Pixmap::new(layout.width, layout.height)
        .ok_or(RenderError::Canvas { width: layout.width, height: layout.height })?;
    pixmap.fill(tiny_skia::Color::WHITE);
    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

    Ok(pixmap)
}

/// Encode a pixmap as an 8-bit RGBA PNG
pub fn write_png(pixmap: &tiny_skia::Pixmap, path: &Path) -> Result<(), RenderError> {
    let file = File::create(path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), pixmap.width(), pixmap.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Default);

    let mut writer = encoder.write_header().map_err(|e| RenderError::Encode(e.to_string()))?;
    writer.write_image_data(pixmap.data()).map_err(|e| RenderError::Encode(e.to_string()))?;
    writer.finish().map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(())
}

/// Render a layout and write exactly one PNG to `path`
pub fn render_to_file<F>(layout: &TableLayout, typeface: &Typeface, should_highlight: F, path: &Path) -> Result<(), RenderError>
where
    F: Fn(&RowLayout) -> bool,
{
    let pixmap = render_table(layout, typeface, should_highlight)?;
    write_png(&pixmap, path)?;
    debug!("wrote {}x{} table image to {}", layout.width, layout.height, path.display());
    Ok(())
}

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;
