//! PDF export
//!
//! Layout is computed first by [`paginate`], in points measured from the top
//! of the page, then drawn with printpdf. Keeping the two apart lets the page
//! breaks be checked without decoding a PDF.

use std::fmt::Debug;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use printpdf::{BuiltinFont, Mm, PdfDocument, Pt};

use super::ExportError;
use crate::datalog::{ExportFormat, Record};

/// Document title, drawn at the top of the first page
pub const TITLE: &str = "Datalog Export";

/// A4 portrait width
pub const PAGE_WIDTH_PT: f32 = 595.0;
/// A4 portrait height
pub const PAGE_HEIGHT_PT: f32 = 842.0;
/// Top and bottom margin
pub const MARGIN_PT: f32 = 40.0;
/// Left edge of every text line
pub const LEFT_PT: f32 = 50.0;
/// Distance between consecutive lines
pub const LINE_HEIGHT_PT: f32 = 20.0;

const TITLE_Y_PT: f32 = MARGIN_PT;
const FIRST_LINE_Y_PT: f32 = TITLE_Y_PT + 40.0;
const PRINTABLE_BOTTOM_PT: f32 = PAGE_HEIGHT_PT - MARGIN_PT;

const TITLE_FONT_SIZE: f32 = 14.0;
const LINE_FONT_SIZE: f32 = 10.0;

/// One record's line, positioned on its page
#[derive(Debug, Clone, PartialEq)]
pub struct PdfLine {
    /// Index of the record in the exported slice
    pub record_index: usize,
    /// Distance from the top edge of the page
    pub y_pt: f32,
    /// Rendered text, see [`format_line`]
    pub text: String,
}

/// Contents of one page
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PdfPage {
    /// Heading, first page only
    pub title: Option<&'static str>,
    /// Record lines, top to bottom
    pub lines: Vec<PdfLine>,
}

/// Fixed-width text for one record
pub fn format_line(record: &Record) -> String {
    format!(
        "{:<19} | {:>7} | {:>7} | {}",
        record.timestamp(),
        record.temperature(),
        record.min_temperature(),
        record.status()
    )
}

/// Split records into pages.
///
/// The first page carries the title. A new page begins whenever the next line
/// would reach into the bottom margin. There is always at least one page.
pub fn paginate(records: &[Record]) -> Vec<PdfPage> {
    let mut pages = Vec::new();
    let mut current = PdfPage {
        title: Some(TITLE),
        lines: Vec::new(),
    };
    let mut y = FIRST_LINE_Y_PT;

    for (record_index, record) in records.iter().enumerate() {
        if y + LINE_FONT_SIZE > PRINTABLE_BOTTOM_PT {
            pages.push(std::mem::take(&mut current));
            y = MARGIN_PT;
        }
        current.lines.push(PdfLine {
            record_index,
            y_pt: y,
            text: format_line(record),
        });
        y += LINE_HEIGHT_PT;
    }

    pages.push(current);
    pages
}

fn pdf_error(err: impl Debug) -> ExportError {
    ExportError::failed(ExportFormat::Pdf, format!("{err:?}"))
}

fn io_error(err: io::Error) -> ExportError {
    ExportError::failed(ExportFormat::Pdf, err.to_string())
}

/// Convert a top-down position to a printpdf baseline coordinate
fn baseline(y_pt: f32, font_size: f32) -> Mm {
    Mm::from(Pt(PAGE_HEIGHT_PT - y_pt - font_size))
}

/// Write records to a PDF document at `path`
pub fn export_pdf_to_file<P: AsRef<Path>>(records: &[Record], path: P) -> Result<(), ExportError> {
    let width = Mm::from(Pt(PAGE_WIDTH_PT));
    let height = Mm::from(Pt(PAGE_HEIGHT_PT));

    let (doc, first_page, first_layer) = PdfDocument::new(TITLE, width, height, "Layer 1");
    let title_font = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;
    let body_font = doc
        .add_builtin_font(BuiltinFont::Courier)
        .map_err(pdf_error)?;

    let mut target = Some((first_page, first_layer));
    for page in paginate(records) {
        let (page_index, layer_index) = match target.take() {
            Some(indices) => indices,
            None => doc.add_page(width, height, "Layer 1"),
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);

        if let Some(title) = page.title {
            // Helvetica-Bold averages a little over half an em per glyph
            let text_width = title.len() as f32 * TITLE_FONT_SIZE * 0.55;
            let x = Mm::from(Pt((PAGE_WIDTH_PT - text_width) / 2.0));
            layer.use_text(
                title,
                TITLE_FONT_SIZE,
                x,
                baseline(TITLE_Y_PT, TITLE_FONT_SIZE),
                &title_font,
            );
        }

        for line in &page.lines {
            layer.use_text(
                line.text.as_str(),
                LINE_FONT_SIZE,
                Mm::from(Pt(LEFT_PT)),
                baseline(line.y_pt, LINE_FONT_SIZE),
                &body_font,
            );
        }
    }

    let file = File::create(path).map_err(io_error)?;
    doc.save(&mut BufWriter::new(file)).map_err(pdf_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record::new(format!("2024-01-01 10:{:02}:00", i % 60), "21.5", "18.0", "OK"))
            .collect()
    }

    #[test]
    fn test_empty_export_has_title_page() {
        let pages = paginate(&[]);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, Some(TITLE));
        assert!(pages[0].lines.is_empty());
    }

    #[test]
    fn test_first_page_capacity() {
        // 80pt to 780pt inclusive in 20pt steps
        assert_eq!(paginate(&records(36)).len(), 1);
        let pages = paginate(&records(37));
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].title, None);
        assert_eq!(pages[1].lines[0].y_pt, MARGIN_PT);
    }

    #[test]
    fn test_lines_stay_inside_printable_area() {
        for page in paginate(&records(200)) {
            for line in &page.lines {
                assert!(line.y_pt >= MARGIN_PT);
                assert!(line.y_pt + LINE_FONT_SIZE <= PRINTABLE_BOTTOM_PT);
            }
        }
    }

    #[test]
    fn test_later_pages_capacity() {
        // 40pt to 780pt inclusive
        let pages = paginate(&records(36 + 38 + 1));
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1].lines.len(), 38);
        assert_eq!(pages[2].lines.len(), 1);
    }

    #[test]
    fn test_unwritable_path_reports_readable_cause() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("log.pdf");

        match export_pdf_to_file(&records(1), &path) {
            Err(ExportError::Failed { format, message }) => {
                assert_eq!(format, ExportFormat::Pdf);
                assert!(!message.contains("Os {"), "{message}");
                assert!(!message.contains("kind:"), "{message}");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_format_line_is_fixed_width() {
        let a = format_line(&Record::new("2024-01-01 10:00:00", "1.0", "0.5", "OK"));
        let b = format_line(&Record::new("2024-01-01 10:00:00", "-12.25", "-20.0", "OK"));
        assert_eq!(a.len(), b.len());
        assert!(a.starts_with("2024-01-01 10:00:00 |"));
    }
}
