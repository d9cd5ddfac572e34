use std::io::Write;

use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use thiserror::Error;

use crate::repository::profile::{Profile, ReviewStatus};

/// Placeholder rendered for attributes the profile never supplied.
pub const MISSING_VALUE: &str = "—";

const CSV_HEADER: [&str; 7] = [
    "Name",
    "Email",
    "Gender",
    "City",
    "Education",
    "Occupation",
    "Status",
];

const PAGE_WIDTH_MM: f64 = 210.0;
const PAGE_HEIGHT_MM: f64 = 297.0;
const MARGIN_MM: f64 = 10.0;
const TABLE_TOP_MM: f64 = 37.0;
const ROW_HEIGHT_MM: f64 = 12.0;
const BOTTOM_MARGIN_MM: f64 = 20.0;

/// Cell text is cut at this many characters rather than wrapped.
const COLUMN_TEXT_MAX_CHARS: usize = 20;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write delimited report: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to render printable report: {0}")]
    Pdf(String),
    #[error("failed to flush report: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes the delimited-text report.
///
/// Every value is quoted so the output parses back into the same rows and
/// fields under standard CSV rules, whatever the stored text contains.
pub fn write_csv<W: Write>(profiles: &[Profile], writer: W) -> Result<usize, ExportError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(writer);

    csv_writer.write_record(CSV_HEADER)?;

    let mut count = 0;
    for profile in profiles {
        csv_writer.write_record([
            field(&profile.name),
            profile.owner_email.as_str(),
            profile.gender.as_str(),
            field(&profile.city),
            field(&profile.education),
            field(&profile.occupation),
            status_label(profile.review_status),
        ])?;
        count += 1;
    }

    csv_writer.flush()?;

    Ok(count)
}

/// Renders the printable report: title, generation timestamp and total on the
/// first page, then a fixed-height three-column table that breaks onto a new
/// page once the printable area is used up.
pub fn write_pdf(
    profiles: &[Profile],
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>, ExportError> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        "Profile Report",
        Mm(PAGE_WIDTH_MM as f32),
        Mm(PAGE_HEIGHT_MM as f32),
        "Layer 1",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;

    {
        let layer = doc.get_page(first_page).get_layer(first_layer);
        layer.use_text(
            "Rishta - Profile Report",
            14.0,
            Mm(MARGIN_MM as f32),
            from_top(12.0),
            &bold,
        );
        layer.use_text(
            format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M UTC")),
            10.0,
            Mm(MARGIN_MM as f32),
            from_top(22.0),
            &font,
        );
        layer.use_text(
            format!("Total profiles: {}", profiles.len()),
            10.0,
            Mm((PAGE_WIDTH_MM / 2.0) as f32),
            from_top(22.0),
            &font,
        );
        table_header(&layer, &bold);
    }

    for (page_index, rows) in profiles.chunks(rows_per_page()).enumerate() {
        let layer = if page_index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) =
                doc.add_page(Mm(PAGE_WIDTH_MM as f32), Mm(PAGE_HEIGHT_MM as f32), "Layer 1");
            let layer = doc.get_page(page).get_layer(layer);
            table_header(&layer, &bold);
            layer
        };

        for (row_index, profile) in rows.iter().enumerate() {
            let y = from_top(TABLE_TOP_MM + row_index as f64 * ROW_HEIGHT_MM + 8.0);
            let [name_x, gender_x, city_x] = column_positions();
            layer.use_text(cell(field(&profile.name)), 10.0, name_x, y, &font);
            layer.use_text(cell(profile.gender.as_str()), 10.0, gender_x, y, &font);
            layer.use_text(cell(field(&profile.city)), 10.0, city_x, y, &font);
        }
    }

    doc.save_to_bytes().map_err(pdf_error)
}

/// Rows that fit between the table top and the bottom margin.
pub fn rows_per_page() -> usize {
    ((PAGE_HEIGHT_MM - BOTTOM_MARGIN_MM - TABLE_TOP_MM) / ROW_HEIGHT_MM) as usize
}

/// Pages the printable report will span; an empty report still has its
/// title page.
pub fn page_count(rows: usize) -> usize {
    if rows == 0 {
        1
    } else {
        (rows + rows_per_page() - 1) / rows_per_page()
    }
}

fn table_header(layer: &PdfLayerReference, bold: &IndirectFontRef) {
    let y = from_top(TABLE_TOP_MM - 4.0);
    let [name_x, gender_x, city_x] = column_positions();
    layer.use_text("Name", 10.0, name_x, y, bold);
    layer.use_text("Gender", 10.0, gender_x, y, bold);
    layer.use_text("City", 10.0, city_x, y, bold);
}

fn column_positions() -> [Mm; 3] {
    let column_width = (PAGE_WIDTH_MM - 2.0 * MARGIN_MM) / 3.0;
    [
        Mm((MARGIN_MM + 2.0) as f32),
        Mm((MARGIN_MM + column_width + 2.0) as f32),
        Mm((MARGIN_MM + 2.0 * column_width + 2.0) as f32),
    ]
}

fn from_top(mm: f64) -> Mm {
    Mm((PAGE_HEIGHT_MM - mm) as f32)
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(MISSING_VALUE)
}

fn status_label(status: ReviewStatus) -> &'static str {
    if status.is_approved() {
        "Approved"
    } else {
        "Pending"
    }
}

fn cell(value: &str) -> &str {
    truncate(value, COLUMN_TEXT_MAX_CHARS)
}

fn truncate(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((offset, _)) => &value[..offset],
        None => value,
    }
}

fn pdf_error<E: std::fmt::Display>(e: E) -> ExportError {
    ExportError::Pdf(e.to_string())
}
