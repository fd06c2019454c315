//! End-to-end ingestion: detection, chunked parsing, repair, screening.

use certlens_core::{
    clock::IngestClock,
    config::IngestConfig,
    error::IngestError,
    event::IngestEvent,
    fixture::{generate_csv, FixtureSpec},
    header::{detect, detect_delimiter},
    ingest::Ingestor,
    record::{Grade, SuspicionFlag},
    types::UNKNOWN_PARTNER,
};
use chrono::{DateTime, TimeZone, Utc};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
}

fn ingestor(batch_size: usize) -> Ingestor {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut config = IngestConfig::default_test();
    config.parser.batch_size = batch_size;
    Ingestor::new(config, IngestClock::fixed(fixed_now()))
}

const SAMPLE: &str = "\u{feff}Email,First Name,Partner Code,Percentage Completed,Created At,Completed At,Final Grade,Wallet Address\r\n\
alice@company.com,Alice,LAGOS,100,2024-03-01T10:00:00Z,2024-03-01T02:00:00Z,Pass,0xABCDEF1234567\r\n\
bob+1@company.com,Bob,,40,2024-03-02T09:00:00Z,,Pending,n/a\r\n\
\r\n\
broken\r\n\
carol@mailinator.com,Carol,NAIROBI,100,2024-03-03T08:00:00Z,2024-03-03T08:10:00Z,Pass,0xabcdef1234567\r\n";

// ── Detection ─────────────────────────────────────────────────────────────────

#[test]
fn semicolon_wins_only_when_it_outnumbers_commas() {
    assert_eq!(detect_delimiter("Email;Name;Code"), ';');
    assert_eq!(detect_delimiter("Email,Name;Code"), ',', "tie keeps comma");
    assert_eq!(detect_delimiter("\"Email\";\"Last, First\";Code"), ';');
}

#[test]
fn detect_resolves_columns_and_strips_bom() {
    let layout = detect(SAMPLE).expect("sample layout");
    assert_eq!(layout.delimiter, ',');
    assert_eq!(layout.headers[0], "email", "BOM must not leak into first header");
    assert_eq!(layout.columns.email, Some(0));
    assert_eq!(layout.columns.partner_code, Some(2));
    assert_eq!(layout.columns.wallet_address, Some(7));
    assert_eq!(layout.columns.phone, None);
    assert_eq!(layout.data_row_count(), 4, "blank line dropped, corrupt row kept for parser");
}

#[test]
fn empty_or_header_only_file_is_rejected() {
    for text in ["", "Email,Name", "\u{feff}Email,Name\r\n\r\n   \n"] {
        assert!(
            matches!(detect(text), Err(IngestError::EmptyInput)),
            "expected EmptyInput for {text:?}"
        );
    }
}

#[test]
fn missing_email_column_names_found_headers() {
    let err = detect("Name,Code\nAda,X").unwrap_err();
    match &err {
        IngestError::MissingRequiredColumn { headers } => {
            assert_eq!(headers, &vec!["name".to_string(), "code".to_string()]);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.to_string().contains("Found: name, code"));
}

#[test]
fn partner_column_aliases_partner_code() {
    let layout = detect("Email Address,Partner\nx@y.com,ACME").expect("layout");
    assert_eq!(layout.columns.email, Some(0), "substring match on email");
    assert_eq!(layout.columns.partner_code, Some(1));
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

#[test]
fn sample_file_is_normalized_repaired_and_screened() {
    let version = ingestor(100).ingest("sample.csv", SAMPLE).expect("ingest");
    assert_eq!(version.record_count, 3, "corrupt row skipped");
    assert_eq!(version.file_name, "sample.csv");
    assert_eq!(version.upload_date, fixed_now());

    let alice = &version.data[0];
    assert_eq!(
        alice.completed_at,
        Some(Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap()),
        "dropped PM marker repaired"
    );
    assert_eq!(alice.duration_hours, Some(4.0));
    assert_eq!(alice.suspicion_reasons, vec![SuspicionFlag::SharedWallet], "4h exactly is not a speed run");

    let bob = &version.data[1];
    assert_eq!(bob.partner_code, UNKNOWN_PARTNER);
    assert_eq!(bob.wallet_address, "");
    assert_eq!(bob.final_grade, Grade::Pending);
    assert_eq!(bob.suspicion_reasons, vec![SuspicionFlag::EmailAlias]);
    assert_eq!(bob.duration_hours, None);

    let carol = &version.data[2];
    assert_eq!(
        carol.suspicion_reasons,
        vec![SuspicionFlag::BotActivity, SuspicionFlag::DisposableEmail, SuspicionFlag::SharedWallet]
    );
    assert_eq!(carol.suspicion_reason(), "Bot Activity (<30m), Disposable Email, Sybil (Shared Wallet)");
}

#[test]
fn record_ids_embed_line_index_and_stamp() {
    let version = ingestor(100).ingest("sample.csv", SAMPLE).expect("ingest");
    let stamp = fixed_now().timestamp_millis();
    let ids: Vec<String> = version.data.iter().map(|r| r.id.clone()).collect();
    assert_eq!(
        ids,
        vec![format!("row_1_{stamp}"), format!("row_2_{stamp}"), format!("row_4_{stamp}")]
    );
}

#[test]
fn gap_beyond_twelve_hours_stays_a_data_error() {
    let csv = "Email,Created At,Completed At,Final Grade,Percentage Completed\n\
               late@company.com,2024-03-02T10:00:00Z,2024-03-01T10:00:00Z,Pass,100\n";
    let version = ingestor(100).ingest("late.csv", csv).expect("ingest");
    let r = &version.data[0];
    assert!(r.data_error);
    assert_eq!(r.duration_hours, Some(-12.0));
    assert!(!r.is_suspicious, "negative durations are never timing flags");
}

#[test]
fn unparseable_date_uses_processing_time_and_skips_timing_flags() {
    let csv = "Email,Created At,Completed At,Final Grade,Percentage Completed\n\
               x@company.com,not a date,2024-06-30T12:10:00Z,Pass,100\n";
    let version = ingestor(100).ingest("bad-date.csv", csv).expect("ingest");
    let r = &version.data[0];
    assert!(r.date_fallback_applied);
    assert_eq!(r.created_at, Some(fixed_now()));
    assert!(!r.is_suspicious, "10 minutes against a fabricated start is not bot activity");
}

#[test]
fn empty_email_gets_synthetic_address() {
    let csv = "Email,First Name\n,Nameless\n";
    let version = ingestor(100).ingest("x.csv", csv).expect("ingest");
    assert_eq!(version.data[0].email, "unknown_1@noemail.com");
    assert_eq!(version.data[0].country, "Unknown");
}

// ── Events & progress ─────────────────────────────────────────────────────────

#[test]
fn events_arrive_in_stage_order_with_batch_progress() {
    let mut events = Vec::new();
    let version = ingestor(2)
        .ingest_with("sample.csv", SAMPLE, |e| events.push(e.clone()))
        .expect("ingest");

    let names: Vec<&str> = events.iter().map(IngestEvent::type_name).collect();
    assert_eq!(
        names,
        vec![
            "ingestion_started",
            "batch_processed",
            "batch_processed",
            "records_screened",
            "ingestion_completed",
        ]
    );

    let progress: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            IngestEvent::BatchProcessed { progress } => Some(*progress),
            _ => None,
        })
        .collect();
    assert_eq!(progress[0].rows_processed, 2);
    assert_eq!(progress[0].percent, 50);
    assert_eq!(progress[1].rows_processed, 4);
    assert_eq!(progress[1].percent, 100);
    assert_eq!(progress[1].rows_skipped, 1);

    match events.last() {
        Some(IngestEvent::IngestionCompleted { version_id, record_count, rows_skipped }) => {
            assert_eq!(version_id, &version.id);
            assert_eq!(*record_count, 3);
            assert_eq!(*rows_skipped, 1);
        }
        other => panic!("unexpected final event {other:?}"),
    }
}

#[test]
fn file_level_failure_emits_nothing() {
    let mut events = Vec::new();
    let result = ingestor(100).ingest_with("bad.csv", "Name\nAda", |e| events.push(e.clone()));
    assert!(matches!(result, Err(IngestError::MissingRequiredColumn { .. })));
    assert!(events.is_empty());
}

// ── Chunking on fixtures ──────────────────────────────────────────────────────

#[test]
fn multi_batch_fixture_preserves_order_and_counts() {
    let spec = FixtureSpec { rows: 1_000, seed: 7, ..FixtureSpec::default() };
    let (text, stats) = generate_csv(&spec);

    let mut batches = 0;
    let version = ingestor(100)
        .ingest_with("fixture.csv", &text, |e| {
            if matches!(e, IngestEvent::BatchProcessed { .. }) {
                batches += 1;
            }
        })
        .expect("ingest fixture");

    assert_eq!(version.record_count, stats.valid_rows);
    assert_eq!(batches, (stats.valid_rows + stats.corrupt_rows).div_ceil(100));

    let lines: Vec<usize> = version
        .data
        .iter()
        .map(|r| r.id.split('_').nth(1).and_then(|n| n.parse().ok()).expect("line index in id"))
        .collect();
    assert!(lines.windows(2).all(|w| w[0] < w[1]), "records must keep input order");

    assert!(version.data.iter().all(|r| !r.date_fallback_applied), "fixture dates are all readable");
    assert!(version.data.iter().all(|r| !r.data_error), "AM/PM shifts are repaired");
    assert!(version.data.iter().any(|r| r.suspicion_reasons.contains(&SuspicionFlag::SharedWallet)));
}

#[test]
fn batch_size_does_not_change_results() {
    let spec = FixtureSpec { rows: 400, seed: 11, ..FixtureSpec::default() };
    let (text, _) = generate_csv(&spec);

    let small = ingestor(7).ingest("f.csv", &text).expect("small batches");
    let large = ingestor(5_000).ingest("f.csv", &text).expect("single batch");
    assert_eq!(small.data, large.data);
}

#[test]
fn semicolon_fixture_ingests_like_comma_fixture() {
    let comma = FixtureSpec { rows: 200, seed: 3, ..FixtureSpec::default() };
    let semi = FixtureSpec { delimiter: ';', ..comma.clone() };

    let a = ingestor(50).ingest("a.csv", &generate_csv(&comma).0).expect("comma");
    let b = ingestor(50).ingest("b.csv", &generate_csv(&semi).0).expect("semicolon");
    assert_eq!(a.data, b.data);
}
