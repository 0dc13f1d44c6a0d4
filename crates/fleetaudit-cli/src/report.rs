//! Report rendering
//!
//! Pure serialization of the collected records: field values pass through
//! untouched and columns keep their record order.

use std::io::Write;

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};

/// Render records as a console table
#[must_use]
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(headers.to_vec());

    for row in rows {
        table.add_row(row.clone());
    }

    table.to_string()
}

/// Write records as CSV, headers first
///
/// # Errors
/// Returns an error if the underlying writer fails
pub fn write_csv<W: Write>(writer: W, headers: &[&str], rows: &[Vec<String>]) -> eyre::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(headers)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;

    Ok(())
}
