/// Tests for console formatting module
///
/// These tests pin the console table geometry so rows, borders and the
/// empty placeholder always line up.

#[cfg(test)]
mod tests {
    use crate::console_format::*;
    use crate::types::Ticket;

    /// Standard width for tests to ensure reproducible output
    const TEST_CONSOLE_WIDTH: usize = 120;

    fn ticket(cells: &[&str]) -> Ticket {
        let row: Vec<String> = cells.iter().map(|s| s.to_string()).collect();
        Ticket::from_row(&row)
    }

    fn sample() -> Vec<Ticket> {
        vec![
            ticket(&["1.0", "2024/01/01", "StoreA", "M1", "02-1234", "台北市信義路", "冷氣漏水"]),
            ticket(&["", "2024/01/02", "StoreB", "M2", "02-5678", "Addr", "closed"]),
            ticket(&["2", "2024/01/03", "StoreC", "M3", "02-0000", "Addr\nline two", "Noise"]),
        ]
    }

    #[test]
    fn test_display_width_ascii() {
        assert_eq!(display_width("hello"), 5);
        assert_eq!(display_width(""), 0);
    }

    #[test]
    fn test_display_width_unicode() {
        assert_eq!(display_width("│"), 1);
        assert_eq!(display_width("─"), 1);
        // CJK characters are double width
        assert_eq!(display_width("報修"), 4);
        assert_eq!(display_width("📦"), 2);
    }

    #[test]
    fn test_truncate_with_padding_exact_fit() {
        let result = truncate_with_padding("hello", 5);
        assert_eq!(result, "hello");
    }

    #[test]
    fn test_truncate_with_padding_needs_padding() {
        let result = truncate_with_padding("hi", 5);
        assert_eq!(result, "hi   ");
    }

    #[test]
    fn test_truncate_with_padding_needs_truncation() {
        let result = truncate_with_padding("hello world", 8);
        assert_eq!(result, "hello...");
    }

    #[test]
    fn test_truncate_with_padding_wide_chars() {
        // 7 columns of room: two CJK chars (4) then "..." (3)
        let result = truncate_with_padding("台北市信義路", 7);
        assert_eq!(result, "台北...");
        // 8 columns: still two CJK chars, one pad space
        let result = truncate_with_padding("台北市信義路", 8);
        assert_eq!(result, "台北... ");
        assert_eq!(display_width(&result), 8);
    }

    #[test]
    fn test_table_widths_fill_terminal() {
        let widths = TableWidths::new(TEST_CONSOLE_WIDTH);
        assert_eq!(widths.total, TEST_CONSOLE_WIDTH);
        assert!(widths.columns[6] > widths.columns[5]);
        assert!(widths.columns.iter().all(|w| *w >= 6));
    }

    #[test]
    fn test_table_widths_have_minimums_on_narrow_terminals() {
        let widths = TableWidths::new(40);
        assert!(widths.columns[5] >= 12);
        assert!(widths.columns[6] >= 12);
        assert!(widths.total > 40);
    }

    #[test]
    fn test_worklist_lists_open_rows_only() {
        let output = format_worklist(&sample(), None, TEST_CONSOLE_WIDTH);

        assert!(output.contains("Open repair tickets: 2"));
        assert!(output.contains("StoreA"));
        assert!(output.contains("StoreC"));
        assert!(!output.contains("StoreB"));
        assert!(output.contains("排序"));
    }

    #[test]
    fn test_worklist_normalizes_cells() {
        let output = format_worklist(&sample(), None, TEST_CONSOLE_WIDTH);

        assert!(output.contains("│ 1    │"));
        assert!(!output.contains("1.0"));
        // Line break inside the address collapses to a space
        assert!(output.contains("Addr line two"));
    }

    #[test]
    fn test_worklist_lines_share_one_width() {
        let output = format_worklist(&sample(), Some("StoreA"), TEST_CONSOLE_WIDTH);
        let table_lines: Vec<&str> = output
            .lines()
            .filter(|l| l.starts_with('│') || l.starts_with('┌') || l.starts_with('├') || l.starts_with('└'))
            .collect();

        // Top border, labels, separator, two tickets, bottom border
        assert_eq!(table_lines.len(), 6);
        for line in table_lines {
            assert_eq!(display_width(line), TEST_CONSOLE_WIDTH, "misaligned line: {}", line);
        }
    }

    #[test]
    fn test_empty_worklist_placeholder() {
        let output = format_worklist(&[], None, TEST_CONSOLE_WIDTH);

        assert!(output.contains("Open repair tickets: 0"));
        let placeholder = output.lines().find(|l| l.contains("(no open tickets)")).unwrap();
        assert_eq!(display_width(placeholder), TEST_CONSOLE_WIDTH);
    }

    #[test]
    fn test_highlight_is_plain_without_colors() {
        let output = format_worklist(&sample(), Some("StoreA"), TEST_CONSOLE_WIDTH);
        assert!(!output.contains('\x1b'));
    }

    #[test]
    fn test_highlight_colors_only_matching_row() {
        let widths = TableWidths::new(TEST_CONSOLE_WIDTH);
        let mut writer = TableWriter::new(Vec::new(), true, widths);
        writer.write_worklist(&sample(), Some("StoreC")).unwrap();
        let output = String::from_utf8(writer.into_inner()).unwrap();

        let colored: Vec<&str> = output.lines().filter(|l| l.contains('\x1b')).collect();
        assert_eq!(colored.len(), 1);
        assert!(colored[0].contains("StoreC"));
    }
}
