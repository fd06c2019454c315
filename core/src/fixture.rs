//! Deterministic synthetic certification exports.
//!
//! RULE: Fixtures never call a platform RNG. Every value flows from the
//! seed on the FixtureSpec, so the same spec always yields the same text.
//!
//! Defects are injected at fixed rates so screening, repair and chunking
//! have something to find: shared wallets, alias and disposable emails,
//! speed runs, dropped AM/PM markers, day-first dates, blank lines and
//! corrupt rows.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

/// Seeded RNG for fixture generation.
pub struct FixtureRng {
    inner: Pcg64Mcg,
}

impl FixtureRng {
    pub fn new(seed: u64) -> Self {
        Self { inner: Pcg64Mcg::seed_from_u64(seed) }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n). `n == 0` yields 0.
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        if n == 0 {
            return 0;
        }
        self.inner.next_u64() % n
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    pub fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.next_u64_below(items.len() as u64) as usize]
    }
}

const FIRST_NAMES: &[&str] = &[
    "Ada", "Amara", "Ananya", "Bongani", "Camila", "Chen", "Chioma", "Daniel",
    "Diego", "Efua", "Elena", "Farah", "Gabriel", "Hana", "Ibrahim", "Isabela",
    "Jamal", "Jin", "Kavya", "Kwame", "Laila", "Lucas", "Mahnoor", "Mateo",
    "Mei", "Nadia", "Nikhil", "Olu", "Priya", "Rafael", "Rohan", "Sade",
    "Sofia", "Tariq", "Thandiwe", "Valentina", "Wanjiru", "Yusuf", "Zainab", "Zhao",
];

const LAST_NAMES: &[&str] = &[
    "Abara", "Adeyemi", "Alvarez", "Banerjee", "Bello", "Castillo", "Chowdhury",
    "Da Silva", "Dlamini", "Eze", "Fernandes", "Gupta", "Haddad", "Ibekwe",
    "Kamau", "Khan", "Kim", "Li", "Mensah", "Mwangi", "Nakamura", "Ndlovu",
    "Nguyen", "Okafor", "Osei", "Patel", "Pereira", "Qureshi", "Reyes", "Rossi",
    "Santos", "Sharma", "Tan", "Torres", "Usman", "Wang", "Yilmaz", "Zulu",
];

const COUNTRIES: &[&str] = &[
    "Nigeria", "Kenya", "Ghana", "South Africa", "India", "Brazil", "Argentina",
    "Vietnam", "Indonesia", "Pakistan", "Egypt", "Mexico",
];

const PARTNERS: &[&str] = &["LAGOS-DAO", "NAIROBI-BUILD", "ACCRA-WEB3", "SAO-PAULO", "DELHI-DEV"];

const DOMAINS: &[&str] = &["gmail.com", "outlook.com", "proton.me", "company.com", "univ.edu"];

const DISPOSABLE: &[&str] = &["mailinator.com", "yopmail.com", "guerrillamail.com"];

pub const FIXTURE_HEADERS: [&str; 14] = [
    "Email",
    "First Name",
    "Last Name",
    "Phone Number",
    "Country",
    "Accepted Membership",
    "Accepted Marketing",
    "Wallet Address",
    "Partner Code",
    "Percentage Completed",
    "Created At",
    "Completed At",
    "Final Score",
    "Final Grade",
];

/// Shape of one synthetic export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSpec {
    pub rows: usize,
    pub seed: u64,
    /// `,` or `;`.
    pub delimiter: char,
    /// Earliest enrollment; rows spread over the following `span_days`.
    pub start: DateTime<Utc>,
    pub span_days: i64,
    /// Inject blank lines and corrupt rows.
    pub with_defects: bool,
}

impl Default for FixtureSpec {
    fn default() -> Self {
        Self {
            rows: 500,
            seed: 42,
            delimiter: ',',
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default(),
            span_days: 120,
            with_defects: true,
        }
    }
}

/// Counts of what a fixture should contain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureStats {
    /// Well-formed data rows (corrupt rows excluded).
    pub valid_rows: usize,
    pub corrupt_rows: usize,
    pub blank_lines: usize,
}

/// Generate the CSV text for `spec` and the expected counts.
pub fn generate_csv(spec: &FixtureSpec) -> (String, FixtureStats) {
    let mut rng = FixtureRng::new(spec.seed);
    let mut stats = FixtureStats::default();
    let d = spec.delimiter;
    let sep = d.to_string();
    let mut out = String::new();

    out.push_str(&FIXTURE_HEADERS.join(sep.as_str()));
    out.push('\n');

    // A small pool of wallets that several developers reuse.
    let shared: Vec<String> = (0..4).map(|i| format!("0xSHAREDPOOL{i:04}{:08x}", spec.seed as u32)).collect();

    for i in 0..spec.rows {
        if spec.with_defects && rng.chance(0.01) {
            out.push('\n');
            stats.blank_lines += 1;
        }
        if spec.with_defects && rng.chance(0.01) {
            out.push_str("corrupt-row-without-delimiters\n");
            stats.corrupt_rows += 1;
        }

        let first = rng.pick(FIRST_NAMES);
        let last = rng.pick(LAST_NAMES);
        let email = fixture_email(&mut rng, first, last, i);
        let wallet = if rng.chance(0.05) {
            shared[rng.next_u64_below(shared.len() as u64) as usize].clone()
        } else if rng.chance(0.1) {
            "n/a".to_string()
        } else {
            format!("0x{:016x}{:08x}", rng.next_u64(), i)
        };
        let partner = if rng.chance(0.15) { "" } else { rng.pick(PARTNERS) };

        let created = spec.start
            + Duration::minutes(rng.next_u64_below((spec.span_days.max(1) * 24 * 60) as u64) as i64);
        let certified = rng.chance(0.6);
        let percentage = if certified { 100 } else { rng.next_u64_below(100) };
        let (completed_cell, grade, score) = if certified {
            let hours = if rng.chance(0.05) { rng.next_f64() * 3.5 } else { 4.5 + rng.next_f64() * 200.0 };
            let completed = created + Duration::minutes((hours * 60.0) as i64);
            let passed = rng.chance(0.85);
            let score = if passed { 70 + rng.next_u64_below(31) } else { rng.next_u64_below(70) };
            let grade = if passed { "Pass" } else { "Fail" };
            (completion_cell(&mut rng, created, completed), grade, score.to_string())
        } else {
            (String::new(), "Pending", String::new())
        };

        let created_cell = if rng.chance(0.05) && created.day() > 12 {
            created.format("%d/%m/%Y %H:%M").to_string()
        } else {
            created.format("%Y-%m-%dT%H:%M:%SZ").to_string()
        };

        let phone = format!("+{}", 200_000_000 + rng.next_u64_below(800_000_000));
        let country = rng.pick(COUNTRIES);
        let cells = [
            email,
            first.to_string(),
            last.to_string(),
            phone,
            country.to_string(),
            yes_no(rng.chance(0.4)).to_string(),
            yes_no(rng.chance(0.5)).to_string(),
            wallet,
            partner.to_string(),
            percentage.to_string(),
            created_cell,
            completed_cell,
            score,
            grade.to_string(),
        ];
        let line: Vec<String> = cells.iter().map(|c| quote_if_needed(c, d)).collect();
        out.push_str(&line.join(sep.as_str()));
        out.push('\n');
        stats.valid_rows += 1;
    }

    (out, stats)
}

fn fixture_email(rng: &mut FixtureRng, first: &str, last: &str, i: usize) -> String {
    let local = format!("{}.{}{i}", first.to_lowercase(), last.to_lowercase().replace(' ', ""));
    if rng.chance(0.03) {
        format!("{local}+cert@{}", rng.pick(DOMAINS))
    } else if rng.chance(0.03) {
        format!("{local}@{}", rng.pick(DISPOSABLE))
    } else {
        format!("{local}@{}", rng.pick(DOMAINS))
    }
}

/// Some exports drop the AM/PM marker, so an afternoon completion reads
/// 12h early. Only produced when the shifted value lands before the start.
fn completion_cell(rng: &mut FixtureRng, created: DateTime<Utc>, completed: DateTime<Utc>) -> String {
    let shifted = completed - Duration::hours(12);
    if rng.chance(0.03) && shifted < created && completed - created < Duration::hours(12) {
        return shifted.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    }
    completed.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn yes_no(b: bool) -> &'static str {
    if b { "Yes" } else { "No" }
}

fn quote_if_needed(cell: &str, delimiter: char) -> String {
    if cell.contains(delimiter) || cell.contains('"') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_text() {
        let spec = FixtureSpec { rows: 50, ..FixtureSpec::default() };
        assert_eq!(generate_csv(&spec).0, generate_csv(&spec).0);
    }

    #[test]
    fn different_seed_different_text() {
        let a = FixtureSpec { rows: 50, seed: 1, ..FixtureSpec::default() };
        let b = FixtureSpec { rows: 50, seed: 2, ..FixtureSpec::default() };
        assert_ne!(generate_csv(&a).0, generate_csv(&b).0);
    }

    #[test]
    fn row_count_matches_stats() {
        let spec = FixtureSpec { rows: 300, ..FixtureSpec::default() };
        let (text, stats) = generate_csv(&spec);
        let non_blank = text.lines().filter(|l| !l.trim().is_empty()).count();
        assert_eq!(non_blank, 1 + stats.valid_rows + stats.corrupt_rows);
        assert_eq!(stats.valid_rows, 300);
    }
}
