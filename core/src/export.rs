//! Cleaned-record CSV export.

use crate::{error::IngestResult, record::DeveloperRecord};
use csv::{QuoteStyle, WriterBuilder};
use std::io::Write;

pub const EXPORT_HEADERS: [&str; 11] = [
    "ID",
    "Email",
    "First Name",
    "Last Name",
    "Partner Code",
    "Country",
    "Progress",
    "Status",
    "Score",
    "Duration (Hrs)",
    "Risk Flag",
];

/// Human-readable risk column: suspicion wins over data error.
pub fn risk_label(r: &DeveloperRecord) -> String {
    if r.is_suspicious {
        format!("Suspicious: {}", r.suspicion_reason())
    } else if r.data_error {
        "Data Error".to_string()
    } else {
        String::new()
    }
}

fn export_row(r: &DeveloperRecord) -> [String; 11] {
    [
        r.id.clone(),
        r.email.clone(),
        r.first_name.clone(),
        r.last_name.clone(),
        r.partner_code.clone(),
        r.country.clone(),
        format!("{}%", r.percentage_completed),
        r.final_grade.to_string(),
        r.final_score.to_string(),
        r.duration_hours.map(|h| format!("{h:.2}")).unwrap_or_default(),
        risk_label(r),
    ]
}

/// Write records in fixed column order. Fields are quoted only when they
/// contain the delimiter, a quote or a line break; embedded quotes double.
pub fn export_csv<'a, W, I>(records: I, out: W) -> IngestResult<()>
where
    W: Write,
    I: IntoIterator<Item = &'a DeveloperRecord>,
{
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(out);
    writer.write_record(EXPORT_HEADERS)?;
    for r in records {
        writer.write_record(export_row(r))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_csv_string<'a, I>(records: I) -> IngestResult<String>
where
    I: IntoIterator<Item = &'a DeveloperRecord>,
{
    let mut buf = Vec::new();
    export_csv(records, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
