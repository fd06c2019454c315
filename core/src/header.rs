//! Delimiter & header detection.
//!
//! Runs once per file: strips the BOM, splits lines, picks the delimiter
//! from the header line and resolves every logical field to a column.

use crate::{
    error::{IngestError, IngestResult},
    splitter::{count_unquoted, split_line},
};
use serde::{Deserialize, Serialize};

/// Logical fields of the target schema.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum LogicalField {
    Email,
    FirstName,
    LastName,
    Phone,
    Country,
    MembershipAccepted,
    MarketingAccepted,
    WalletAddress,
    PartnerCode,
    PartnerName,
    PercentageCompleted,
    CreatedAt,
    CompletedAt,
    FinalScore,
    FinalGrade,
    CaStatus,
}

impl LogicalField {
    pub const ALL: [LogicalField; 16] = [
        Self::Email,
        Self::FirstName,
        Self::LastName,
        Self::Phone,
        Self::Country,
        Self::MembershipAccepted,
        Self::MarketingAccepted,
        Self::WalletAddress,
        Self::PartnerCode,
        Self::PartnerName,
        Self::PercentageCompleted,
        Self::CreatedAt,
        Self::CompletedAt,
        Self::FinalScore,
        Self::FinalGrade,
        Self::CaStatus,
    ];

    /// Header names accepted for this field, highest priority first.
    /// Listed in lower case; headers are normalized before matching.
    pub fn candidates(&self) -> &'static [&'static str] {
        match self {
            Self::Email               => &["email"],
            Self::FirstName           => &["first name", "firstname"],
            Self::LastName            => &["last name", "lastname"],
            Self::Phone               => &["phone number", "phone"],
            Self::Country             => &["country"],
            Self::MembershipAccepted  => &["accepted membership", "membership"],
            Self::MarketingAccepted   => &["accepted marketing", "marketing"],
            Self::WalletAddress       => &["wallet address", "wallet"],
            Self::PartnerCode         => &["code", "partner code", "partnercode"],
            Self::PartnerName         => &["partner"],
            Self::PercentageCompleted => &["percentage completed", "percentage"],
            Self::CreatedAt           => &["created at", "start date"],
            Self::CompletedAt         => &["completed at", "completion date"],
            Self::FinalScore          => &["final score"],
            Self::FinalGrade          => &["final grade", "grade"],
            Self::CaStatus            => &["ca status", "status"],
        }
    }
}

/// Column index per logical field; `None` means absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMap {
    pub email: Option<usize>,
    pub first_name: Option<usize>,
    pub last_name: Option<usize>,
    pub phone: Option<usize>,
    pub country: Option<usize>,
    pub membership_accepted: Option<usize>,
    pub marketing_accepted: Option<usize>,
    pub wallet_address: Option<usize>,
    pub partner_code: Option<usize>,
    pub partner_name: Option<usize>,
    pub percentage_completed: Option<usize>,
    pub created_at: Option<usize>,
    pub completed_at: Option<usize>,
    pub final_score: Option<usize>,
    pub final_grade: Option<usize>,
    pub ca_status: Option<usize>,
}

impl ColumnMap {
    /// Resolve every field against normalized headers. Does not enforce
    /// the email requirement; see [`detect`].
    pub fn resolve(headers: &[String]) -> Self {
        let mut map = ColumnMap::default();
        for field in LogicalField::ALL {
            *map.slot_mut(field) = find_column(headers, field.candidates());
        }
        if map.partner_code.is_none() && map.partner_name.is_some() {
            map.partner_code = map.partner_name;
        }
        map
    }

    pub fn get(&self, field: LogicalField) -> Option<usize> {
        match field {
            LogicalField::Email               => self.email,
            LogicalField::FirstName           => self.first_name,
            LogicalField::LastName            => self.last_name,
            LogicalField::Phone               => self.phone,
            LogicalField::Country             => self.country,
            LogicalField::MembershipAccepted  => self.membership_accepted,
            LogicalField::MarketingAccepted   => self.marketing_accepted,
            LogicalField::WalletAddress       => self.wallet_address,
            LogicalField::PartnerCode         => self.partner_code,
            LogicalField::PartnerName         => self.partner_name,
            LogicalField::PercentageCompleted => self.percentage_completed,
            LogicalField::CreatedAt           => self.created_at,
            LogicalField::CompletedAt         => self.completed_at,
            LogicalField::FinalScore          => self.final_score,
            LogicalField::FinalGrade          => self.final_grade,
            LogicalField::CaStatus            => self.ca_status,
        }
    }

    fn slot_mut(&mut self, field: LogicalField) -> &mut Option<usize> {
        match field {
            LogicalField::Email               => &mut self.email,
            LogicalField::FirstName           => &mut self.first_name,
            LogicalField::LastName            => &mut self.last_name,
            LogicalField::Phone               => &mut self.phone,
            LogicalField::Country             => &mut self.country,
            LogicalField::MembershipAccepted  => &mut self.membership_accepted,
            LogicalField::MarketingAccepted   => &mut self.marketing_accepted,
            LogicalField::WalletAddress       => &mut self.wallet_address,
            LogicalField::PartnerCode         => &mut self.partner_code,
            LogicalField::PartnerName         => &mut self.partner_name,
            LogicalField::PercentageCompleted => &mut self.percentage_completed,
            LogicalField::CreatedAt           => &mut self.created_at,
            LogicalField::CompletedAt         => &mut self.completed_at,
            LogicalField::FinalScore          => &mut self.final_score,
            LogicalField::FinalGrade          => &mut self.final_grade,
            LogicalField::CaStatus            => &mut self.ca_status,
        }
    }
}

/// Result of header detection. Borrows its lines from the input text.
#[derive(Debug, Clone)]
pub struct CsvLayout<'a> {
    pub delimiter: char,
    pub headers: Vec<String>,
    pub columns: ColumnMap,
    /// All non-empty lines; index 0 is the header.
    pub lines: Vec<&'a str>,
}

impl CsvLayout<'_> {
    pub fn data_row_count(&self) -> usize {
        self.lines.len().saturating_sub(1)
    }
}

/// Choose `;` only when it strictly outnumbers `,` in the header line.
pub fn detect_delimiter(header_line: &str) -> char {
    let commas = count_unquoted(header_line, ',');
    let semis = count_unquoted(header_line, ';');
    if semis > commas { ';' } else { ',' }
}

/// Lower-case and collapse internal whitespace.
pub fn normalize_header(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Exact match first (in header order), then substring containment.
fn find_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| candidates.contains(&h.as_str()))
        .or_else(|| {
            headers
                .iter()
                .position(|h| candidates.iter().any(|c| h.contains(c)))
        })
}

/// Analyse full file text: BOM, lines, delimiter, headers, column map.
pub fn detect(text: &str) -> IngestResult<CsvLayout<'_>> {
    let content = text.strip_prefix('\u{feff}').unwrap_or(text);

    // "\r\n" yields an empty piece between the two breaks; dropped below.
    let lines: Vec<&str> = content
        .split(['\r', '\n'])
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.len() < 2 {
        return Err(IngestError::EmptyInput);
    }

    let delimiter = detect_delimiter(lines[0]);
    let headers: Vec<String> = split_line(lines[0], delimiter)
        .iter()
        .map(|h| normalize_header(h))
        .collect();

    let columns = ColumnMap::resolve(&headers);
    if columns.email.is_none() {
        return Err(IngestError::MissingRequiredColumn { headers });
    }

    log::info!(
        "Detected delimiter '{delimiter}' with {} header(s), {} data row(s)",
        headers.len(),
        lines.len() - 1
    );

    Ok(CsvLayout { delimiter, headers, columns, lines })
}
