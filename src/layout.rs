/// Table layout module - pure geometry for the worklist image
///
/// This module turns rows of raw cell text into:
/// - Normalized, word-wrapped cell lines
/// - Per-row heights driven by the tallest cell
/// - Pixel rectangles for every cell and the full canvas size
///
/// Nothing here draws. The render module walks the resulting `TableLayout`.

use crate::types::{DISPLAY_COLUMNS, HEADER_LABELS, Ticket, TicketColumn, is_blank_cell};
use log::debug;

/// Largest accepted value for any pixel setting
pub const MAX_PIXELS: u32 = 10_000;

/// Column and spacing configuration for the table image
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Pixel width of each column
    pub column_widths: [u32; DISPLAY_COLUMNS],
    /// Maximum characters per line for each column
    pub wrap_widths: [usize; DISPLAY_COLUMNS],
    /// Pixel height of one text line
    pub line_height: u32,
    /// Extra pixels added to every row
    pub row_padding: u32,
    /// Canvas margin on every side
    pub padding: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        // Phone wraps narrow, address and issue wide
        LayoutConfig {
            column_widths: [80, 160, 220, 150, 250, 550, 550],
            wrap_widths: [4, 10, 8, 10, 14, 22, 22],
            line_height: 45,
            row_padding: 35,
            padding: 30,
        }
    }
}

impl LayoutConfig {
    /// Check that every width is usable
    pub fn validate(&self) -> Result<(), String> {
        if let Some(i) = self.column_widths.iter().position(|w| *w == 0) {
            return Err(format!("layout.column_widths[{}] must be greater than 0", i));
        }
        if let Some(i) = self.wrap_widths.iter().position(|w| *w == 0) {
            return Err(format!("layout.wrap_widths[{}] must be greater than 0", i));
        }
        if self.line_height == 0 {
            return Err("layout.line_height must be greater than 0".to_string());
        }

        let pixels = self
            .column_widths
            .iter()
            .enumerate()
            .map(|(i, w)| (format!("layout.column_widths[{}]", i), *w))
            .chain([
                ("layout.line_height".to_string(), self.line_height),
                ("layout.row_padding".to_string(), self.row_padding),
                ("layout.padding".to_string(), self.padding),
            ]);
        for (name, value) in pixels {
            if value > MAX_PIXELS {
                return Err(format!("{} must be at most {} (got {})", name, MAX_PIXELS, value));
            }
        }
        Ok(())
    }

    /// Sum of all column widths (the table body width, without padding)
    pub fn table_width(&self) -> u32 {
        self.column_widths.iter().fold(0u32, |acc, w| acc.saturating_add(*w))
    }

    /// Height of a row needing `lines` text lines
    pub fn row_height(&self, lines: usize) -> u32 {
        let lines = u32::try_from(lines).unwrap_or(u32::MAX);
        lines.saturating_mul(self.line_height).saturating_add(self.row_padding)
    }
}

/// One cell: its rectangle origin/width and wrapped lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellLayout {
    pub x: u32,
    pub width: u32,
    /// Normalized text before wrapping
    pub text: String,
    /// Wrapped lines, never empty
    pub lines: Vec<String>,
}

/// One table row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLayout {
    pub y: u32,
    pub height: u32,
    pub line_count: usize,
    pub is_header: bool,
    pub cells: Vec<CellLayout>,
}

impl RowLayout {
    /// Normalized text of a display column
    pub fn cell_text(&self, column: TicketColumn) -> &str {
        self.cells.get(column.index()).map(|c| c.text.as_str()).unwrap_or("")
    }
}

/// Complete geometry of the table image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub width: u32,
    pub height: u32,
    /// Header first, then one row per input row
    pub rows: Vec<RowLayout>,
}

impl TableLayout {
    /// Rows after the header
    pub fn body_rows(&self) -> &[RowLayout] {
        &self.rows[1..]
    }
}

/// Lay out the header plus the given rows.
///
/// Both canvas dimensions are known when this returns, before anything is drawn.
pub fn layout_table(rows: &[Vec<String>], config: &LayoutConfig) -> TableLayout {
    let mut laid_out = Vec::with_capacity(rows.len() + 1);
    let mut y = config.padding;

    let header = header_row(config, y);
    y = y.saturating_add(header.height);
    laid_out.push(header);

    for raw in rows {
        let row = body_row(raw, config, y);
        y = y.saturating_add(row.height);
        laid_out.push(row);
    }

    let margins = config.padding.saturating_mul(2);
    let layout = TableLayout {
        width: config.table_width().saturating_add(margins),
        height: y.saturating_add(config.padding),
        rows: laid_out,
    };

    debug!("laid out {} rows into {}x{} canvas", rows.len(), layout.width, layout.height);

    layout
}

/// Lay out the open subset of raw sheet rows (column 0 non-blank)
pub fn layout_open_rows(rows: &[Vec<String>], config: &LayoutConfig) -> TableLayout {
    let open: Vec<Vec<String>> =
        rows.iter().filter(|r| r.first().is_some_and(|c| !is_blank_cell(c))).cloned().collect();
    layout_table(&open, config)
}

/// Lay out the open tickets of a snapshot, in snapshot order
pub fn layout_tickets(tickets: &[Ticket], config: &LayoutConfig) -> TableLayout {
    let rows: Vec<Vec<String>> = tickets.iter().map(|t| t.display_cells()).collect();
    layout_open_rows(&rows, config)
}

fn header_row(config: &LayoutConfig, y: u32) -> RowLayout {
    let mut x = config.padding;
    let cells = HEADER_LABELS
        .iter()
        .zip(config.column_widths.iter())
        .map(|(label, width)| {
            let cell = CellLayout { x, width: *width, text: label.to_string(), lines: vec![label.to_string()] };
            x = x.saturating_add(*width);
            cell
        })
        .collect();

    RowLayout { y, height: config.row_height(1), line_count: 1, is_header: true, cells }
}

fn body_row(raw: &[String], config: &LayoutConfig, y: u32) -> RowLayout {
    let mut x = config.padding;
    let mut cells = Vec::with_capacity(DISPLAY_COLUMNS);

    for col in 0..DISPLAY_COLUMNS {
        let raw_value = raw.get(col).map(String::as_str).unwrap_or("");
        let text = if col == TicketColumn::Ordinal.index() { format_ordinal(raw_value) } else { normalize_cell(raw_value) };
        let lines = wrap_text(&text, config.wrap_widths[col]);
        let width = config.column_widths[col];
        cells.push(CellLayout { x, width, text, lines });
        x = x.saturating_add(width);
    }

    let line_count = cells.iter().map(|c| c.lines.len()).max().unwrap_or(1).max(1);
    RowLayout { y, height: config.row_height(line_count), line_count, is_header: false, cells }
}

//
// Text Normalization
//

/// Normalize a raw cell value.
///
/// Line breaks and tabs become spaces, other control characters and
/// zero-width characters are dropped, surrounding whitespace is trimmed,
/// and the literal "nan" becomes empty.
pub fn normalize_cell(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() && c.is_control() {
                Some(' ')
            } else if c.is_control() || is_zero_width(c) {
                None
            } else {
                Some(c)
            }
        })
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.eq_ignore_ascii_case("nan") { String::new() } else { trimmed.to_string() }
}

fn is_zero_width(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200F}' | '\u{2028}'..='\u{202E}' | '\u{2060}'..='\u{2064}' | '\u{FEFF}' | '\u{00AD}')
}

/// Format the ordinal column: numbers lose any fractional part ("1.0" -> "1")
pub fn format_ordinal(raw: &str) -> String {
    let text = normalize_cell(raw);
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() => format!("{}", n.trunc() as i64),
        _ => text,
    }
}

//
// Word Wrapping
//

/// Greedy word wrap by character count.
///
/// Words are separated by whitespace. A word longer than `width` is broken,
/// first filling whatever room is left on the current line. Empty input
/// gives a single empty line.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut rest: Vec<char> = word.chars().collect();
        let sep = usize::from(current_len > 0);

        if current_len + sep + rest.len() <= width {
            if sep == 1 {
                current.push(' ');
            }
            current_len += sep + rest.len();
            current.extend(rest);
            continue;
        }

        if rest.len() > width && current_len > 0 && current_len + 1 < width {
            let take = width - current_len - 1;
            current.push(' ');
            current.extend(rest.drain(..take));
            current_len = width;
        }

        if current_len > 0 {
            lines.push(std::mem::take(&mut current));
        }

        while rest.len() > width {
            lines.push(rest.drain(..width).collect());
        }
        current_len = rest.len();
        current = rest.into_iter().collect();
    }

    if current_len > 0 {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
#[path = "layout_test.rs"]
mod layout_test;
