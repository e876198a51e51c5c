/// Tests for the table renderer

#[cfg(test)]
mod tests {
    use crate::layout::{LayoutConfig, layout_table};
    use crate::render::*;
    use crate::typeface::{Typeface, load_typeface};
    use std::fs::File;
    use std::path::Path;
    use tempfile::TempDir;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn sample_rows() -> Vec<Vec<String>> {
        vec![
            row(&["1", "2024/01/01", "StoreA", "M1", "111", "AddrA", "Leak"]),
            row(&["2", "2024/01/02", "StoreB", "M2", "222", "AddrB", "Noise & <hum>"]),
        ]
    }

    /// Decode a PNG into (width, height, rgba bytes)
    fn decode_png(path: &Path) -> (u32, u32, Vec<u8>) {
        let decoder = png::Decoder::new(File::open(path).unwrap());
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();
        buf.truncate(info.buffer_size());
        (info.width, info.height, buf)
    }

    fn pixel(data: &[u8], width: u32, x: u32, y: u32) -> Rgb {
        let i = ((y * width + x) * 4) as usize;
        Rgb(data[i], data[i + 1], data[i + 2])
    }

    #[test]
    fn test_row_style_header_wins() {
        let layout = layout_table(&sample_rows(), &LayoutConfig::default());
        let header = row_style(&layout.rows[0], true);
        assert_eq!(header.background, HEADER_BACKGROUND);
        assert_eq!(header.text, HEADER_TEXT);
        assert!(header.bold);

        let highlighted = row_style(&layout.rows[1], true);
        assert_eq!(highlighted.background, HIGHLIGHT_BACKGROUND);
        assert_eq!(highlighted.text, BODY_TEXT);

        let plain = row_style(&layout.rows[2], false);
        assert_eq!(plain.background, ROW_BACKGROUND);
    }

    #[test]
    fn test_highlight_store_matches_only_that_store() {
        let layout = layout_table(&sample_rows(), &LayoutConfig::default());
        let predicate = highlight_store(Some("StoreB"));
        assert!(!predicate(&layout.rows[0]));
        assert!(!predicate(&layout.rows[1]));
        assert!(predicate(&layout.rows[2]));

        let nothing = highlight_store(None);
        assert!(layout.rows.iter().all(|r| !nothing(r)));
    }

    #[test]
    fn test_svg_scene_contents() {
        let layout = layout_table(&sample_rows(), &LayoutConfig::default());
        let svg = build_table_svg(&layout, "sans-serif", highlight_store(Some("StoreA")));

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(&format!("width=\"{}\" height=\"{}\"", layout.width, layout.height)));
        assert!(svg.contains("rgb(45,90,45)"));
        assert!(svg.contains("rgb(255,204,128)"));
        assert!(svg.contains("rgb(200,200,200)"));
        // Text is escaped
        assert!(svg.contains("Noise &amp; &lt;hum&gt;"));
        assert!(!svg.contains("<hum>"));
        // One border rect per cell
        assert_eq!(svg.matches("stroke=\"rgb(200,200,200)\"").count(), 3 * 7);
    }

    #[test]
    fn test_svg_multiline_cells_use_line_spacing() {
        let issue = "x".repeat(30);
        let rows = vec![row(&["1", "2024/01/01", "StoreA", "M1", "111", "AddrA", &issue])];
        let layout = layout_table(&rows, &LayoutConfig::default());
        let svg = build_table_svg(&layout, "sans-serif", |_| false);

        let body = &layout.rows[1];
        let first = body.y + TEXT_INSET + BODY_FONT_SIZE;
        let second = first + BODY_FONT_SIZE + LINE_SPACING;
        assert!(svg.contains(&format!("y=\"{}\">{}</tspan>", first, "x".repeat(22))));
        assert!(svg.contains(&format!("y=\"{}\">{}</tspan>", second, "x".repeat(8))));
    }

    #[test]
    fn test_render_writes_png_with_layout_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.png");
        let layout = layout_table(&sample_rows(), &LayoutConfig::default());

        render_to_file(&layout, &Typeface::builtin(), highlight_store(Some("StoreB")), &path).unwrap();

        let (width, height, data) = decode_png(&path);
        assert_eq!((width, height), (layout.width, layout.height));

        // Sample inside each row, away from borders and text
        let header = &layout.rows[0];
        assert_eq!(pixel(&data, width, header.cells[0].x + 4, header.y + 4), HEADER_BACKGROUND);
        let plain = &layout.rows[1];
        assert_eq!(pixel(&data, width, plain.cells[0].x + 4, plain.y + 4), ROW_BACKGROUND);
        let highlighted = &layout.rows[2];
        assert_eq!(pixel(&data, width, highlighted.cells[0].x + 4, highlighted.y + 4), HIGHLIGHT_BACKGROUND);
        // Margin stays white
        assert_eq!(pixel(&data, width, 2, 2), ROW_BACKGROUND);
    }

    #[test]
    fn test_render_empty_table_with_missing_font() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.png");
        let layout = layout_table(&[], &LayoutConfig::default());
        let typeface = load_typeface(Some(Path::new("/missing/font.ttf")));

        render_to_file(&layout, &typeface, |_| false, &path).unwrap();

        let (width, height, _) = decode_png(&path);
        assert_eq!(width, layout.width);
        assert_eq!(height, layout.height);
    }
}
