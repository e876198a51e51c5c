/// Console formatting module - terminal preview of the worklist
///
/// This module handles console output of the open worklist:
/// - Box-drawn table sized to the terminal
/// - Display-width aware truncation and padding (CJK text is double width)
/// - Highlighting the most recently completed store
///
/// `TableWriter` writes to any `std::io::Write`, so the same code prints to
/// stdout and renders into buffers for tests.

use crate::layout::{format_ordinal, normalize_cell};
use crate::types::{DISPLAY_COLUMNS, HEADER_LABELS, Ticket};
use std::io::{self, IsTerminal, Write};
use std::sync::OnceLock;
use terminal_size::{Width, terminal_size};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Amber, matching the highlight fill of the rendered image
const HIGHLIGHT_ANSI: &str = "\x1b[38;2;255;204;128m";
const RESET_ANSI: &str = "\x1b[0m";

/// Writer for table output - configurable for color/plain text
pub struct TableWriter<W: Write> {
    writer: W,
    use_colors: bool,
    widths: TableWidths,
}

impl<W: Write> TableWriter<W> {
    pub fn new(writer: W, use_colors: bool, widths: TableWidths) -> Self {
        Self { writer, use_colors, widths }
    }

    /// Consume the writer, returning the destination
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_highlighted(&mut self, text: &str) -> io::Result<()> {
        if self.use_colors {
            write!(self.writer, "{}{}{}", HIGHLIGHT_ANSI, text, RESET_ANSI)
        } else {
            write!(self.writer, "{}", text)
        }
    }

    fn write_border(&mut self, left: char, middle: char, right: char) -> io::Result<()> {
        let segments: Vec<String> = self.widths.columns.iter().map(|w| "─".repeat(*w)).collect();
        writeln!(self.writer, "{}{}{}", left, segments.join(&middle.to_string()), right)
    }

    fn format_row(&self, cells: &[String]) -> String {
        let displays: Vec<String> = self
            .widths
            .columns
            .iter()
            .enumerate()
            .map(|(i, width)| {
                let cell = cells.get(i).map(|c| c.as_str()).unwrap_or("");
                truncate_with_padding(cell, width.saturating_sub(2))
            })
            .collect();
        format!("│ {} │", displays.join(" │ "))
    }

    /// Title line, top border, column labels and the header separator
    pub fn write_table_header(&mut self, open_count: usize) -> io::Result<()> {
        writeln!(self.writer, "\nOpen repair tickets: {}\n", open_count)?;
        self.write_border('┌', '┬', '┐')?;
        let labels: Vec<String> = HEADER_LABELS.iter().map(|l| l.to_string()).collect();
        let row = self.format_row(&labels);
        writeln!(self.writer, "{}", row)?;
        self.write_border('├', '┼', '┤')
    }

    /// One ticket row; highlighted rows are colored when colors are enabled
    pub fn write_ticket_row(&mut self, cells: &[String], highlighted: bool) -> io::Result<()> {
        let row = self.format_row(cells);
        if highlighted {
            self.write_highlighted(&row)?;
            writeln!(self.writer)
        } else {
            writeln!(self.writer, "{}", row)
        }
    }

    pub fn write_empty_row(&mut self) -> io::Result<()> {
        let inner = self.widths.total.saturating_sub(4);
        writeln!(self.writer, "│ {} │", truncate_with_padding("(no open tickets)", inner))
    }

    pub fn write_table_footer(&mut self) -> io::Result<()> {
        self.write_border('└', '┴', '┘')
    }

    /// The whole worklist: header, one row per open ticket, footer
    pub fn write_worklist(&mut self, tickets: &[Ticket], highlight: Option<&str>) -> io::Result<()> {
        let open: Vec<&Ticket> = tickets.iter().filter(|t| t.is_open()).collect();
        self.write_table_header(open.len())?;

        if open.is_empty() {
            // Spans every column, so the column separators disappear here
            self.write_empty_row()?;
        }
        for ticket in open {
            let highlighted = highlight.is_some_and(|h| h == ticket.store);
            self.write_ticket_row(&console_cells(ticket), highlighted)?;
        }

        self.write_table_footer()
    }
}

/// Display cells for the console: normalized, ordinal without decimals
pub fn console_cells(ticket: &Ticket) -> Vec<String> {
    ticket
        .display_cells()
        .iter()
        .enumerate()
        .map(|(i, cell)| if i == 0 { format_ordinal(cell) } else { normalize_cell(cell) })
        .collect()
}

//
// Table Layout and Widths
//

/// Column widths for the 7-column worklist, each including one space of
/// padding on both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableWidths {
    pub columns: [usize; DISPLAY_COLUMNS],
    /// Total table width including borders
    pub total: usize,
}

impl TableWidths {
    pub fn new(terminal_width: usize) -> Self {
        // One │ before each column plus one at the end
        let borders = DISPLAY_COLUMNS + 1;
        let available = terminal_width.saturating_sub(borders);

        // Ordinal, date, store, model, phone are short and predictable
        let fixed = [6, 12, 14, 12, 14];
        let fixed_total: usize = fixed.iter().sum();

        // Address and issue share whatever is left, issue taking the larger half
        let remaining = available.saturating_sub(fixed_total).max(24);
        let address = (remaining * 2 / 5).max(12);
        let issue = remaining.saturating_sub(address).max(12);

        let columns = [fixed[0], fixed[1], fixed[2], fixed[3], fixed[4], address, issue];
        let total = columns.iter().sum::<usize>() + borders;
        TableWidths { columns, total }
    }
}

// Console width override (for tests and --console-width)
static CONSOLE_WIDTH: OnceLock<usize> = OnceLock::new();

/// Pin the console width instead of asking the terminal
pub fn set_console_width(width: usize) {
    let _ = CONSOLE_WIDTH.set(width); // Ignore error if already initialized
}

/// Get the console width: override, then terminal size, then 120
pub fn get_terminal_width() -> usize {
    if let Some(width) = CONSOLE_WIDTH.get() {
        return *width;
    }
    if let Some((Width(w), _)) = terminal_size() { w as usize } else { 120 }
}

//
// Text Formatting Utilities
//

/// Count the display width of a string, accounting for wide Unicode characters
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate and pad string to exact width
pub fn truncate_with_padding(s: &str, width: usize) -> String {
    let display_w = display_width(s);

    if display_w > width {
        let mut result = String::new();
        let mut current_width = 0;

        // Reserve space for "..."
        let target_width = if width >= 3 { width - 3 } else { width };

        for c in s.chars() {
            let c_width = UnicodeWidthChar::width(c).unwrap_or(1);

            if current_width + c_width > target_width {
                break;
            }

            result.push(c);
            current_width += c_width;
        }

        if width >= 3 {
            result.push_str("...");
            current_width += 3;
        }

        // A wide character may leave one column over
        if current_width < width {
            result.push_str(&" ".repeat(width - current_width));
        }

        result
    } else {
        let padding = width - display_w;
        format!("{}{}", s, " ".repeat(padding))
    }
}

/// Format the worklist as plain text at the given width
pub fn format_worklist(tickets: &[Ticket], highlight: Option<&str>, terminal_width: usize) -> String {
    let mut writer = TableWriter::new(Vec::new(), false, TableWidths::new(terminal_width));
    // Writing into a Vec cannot fail
    let _ = writer.write_worklist(tickets, highlight);
    String::from_utf8_lossy(&writer.into_inner()).into_owned()
}

/// Print the worklist to stdout, with colors when stdout is a terminal
pub fn print_worklist(tickets: &[Ticket], highlight: Option<&str>) -> io::Result<()> {
    let width = get_terminal_width();
    let stdout = io::stdout();

    if !stdout.is_terminal() {
        return stdout.lock().write_all(format_worklist(tickets, highlight, width).as_bytes());
    }

    let mut writer = TableWriter::new(stdout.lock(), true, TableWidths::new(width));
    writer.write_worklist(tickets, highlight)
}

#[cfg(test)]
#[path = "console_format_test.rs"]
mod console_format_test;
