//! ingest-runner: headless ingestion runner for certification exports.
//!
//! Usage:
//!   ingest-runner --file export.csv --db versions.db --timeframe 90d
//!   ingest-runner --file export.csv --community LAGOS-DAO --timeframe 2024-03 --json
//!   ingest-runner --file export.csv --export flagged.csv --flagged
//!   ingest-runner --file export.csv --now 2024-06-30 --timeframe 30d
//!   ingest-runner --generate 5000 --seed 7 --out fixture.csv

use anyhow::{bail, Context, Result};
use certlens_core::{
    clock::IngestClock,
    config::IngestConfig,
    dataset::VersionSummary,
    event::IngestEvent,
    export::export_csv,
    fixture::{generate_csv, FixtureSpec},
    ingest::Ingestor,
    metrics::MetricsSnapshot,
    query::{RecordQuery, StatusFilter},
    report::comparative_report,
    store::VersionStore,
    timeframe::Timeframe,
};
use chrono::{NaiveDate, NaiveTime};
use std::{env, fs, io};

#[derive(serde::Serialize)]
struct RunOutput<T: serde::Serialize> {
    version: VersionSummary,
    events_logged: i64,
    result: T,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if let Some(rows) = string_arg(&args, "--generate") {
        let rows: usize = rows.parse().with_context(|| format!("Bad --generate value '{rows}'"))?;
        return generate(&args, rows);
    }

    let Some(file) = string_arg(&args, "--file") else {
        bail!("--file <path> is required (or --generate <rows>)");
    };
    let config = match string_arg(&args, "--config") {
        Some(path) => IngestConfig::load(path)?,
        None => IngestConfig::default(),
    };
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let timeframe_arg = string_arg(&args, "--timeframe").unwrap_or("all");
    let timeframe = Timeframe::parse(timeframe_arg)
        .with_context(|| format!("Unknown timeframe '{timeframe_arg}'"))?;
    let json = args.iter().any(|a| a == "--json");

    let text = fs::read_to_string(file).with_context(|| format!("Cannot read {file}"))?;
    let file_name = std::path::Path::new(file)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file);

    let store = if db == ":memory:" { VersionStore::in_memory()? } else { VersionStore::open(db)? };
    store.migrate()?;

    // --now pins the processing clock so relative timeframes are reproducible.
    let clock = match string_arg(&args, "--now") {
        Some(day) => {
            let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
                .with_context(|| format!("Bad --now date '{day}' (expected YYYY-MM-DD)"))?;
            IngestClock::fixed(date.and_time(NaiveTime::MIN).and_utc())
        }
        None => IngestClock::System,
    };
    let ingestor = Ingestor::new(config, clock);
    let mut events: Vec<IngestEvent> = Vec::new();
    let version = ingestor.ingest_with(file_name, &text, |event| {
        if let IngestEvent::BatchProcessed { progress } = event {
            if !json {
                eprintln!(
                    "  batch {:>4}: {:>3}% ({}/{} rows)",
                    progress.batch_index + 1,
                    progress.percent,
                    progress.rows_processed,
                    progress.total_rows
                );
            }
        }
        events.push(event.clone());
    })?;

    store.insert_version(&version)?;
    for event in &events {
        store.append_event(&version.id, event)?;
    }

    let events_logged = store.event_count(&version.id)?;

    let window = timeframe
        .resolve(ingestor.clock.now())
        .with_context(|| format!("Timeframe '{timeframe_arg}' does not resolve to a window"))?;
    let metrics_cfg = &ingestor.config.metrics;

    if let Some(community) = string_arg(&args, "--community") {
        let report = comparative_report(version.records(), community, window, metrics_cfg)
            .context("Community reports need a bounded timeframe (e.g. --timeframe 2024-03)")?;
        if json {
            let out = RunOutput { version: version.summary(), events_logged, result: report };
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            println!("=== COMMUNITY REPORT: {community} ===");
            println!("  registered:     {}", report.current.total_registered);
            println!("  certified:      {}", report.current.total_certified);
            println!("  cert rate:      {:.1}%", report.current.certification_rate);
            println!("  prev certified: {}", report.previous.total_certified);
            match report.deltas.total_certified.change_pct {
                Some(pct) => println!("  change:         {pct:+.1}%"),
                None      => println!("  change:         n/a"),
            }
            println!("  global rate:    {:.1}%", report.global.certification_rate);
        }
    } else {
        let snapshot = MetricsSnapshot::compute(version.records(), window, metrics_cfg);
        if json {
            let out = RunOutput { version: version.summary(), events_logged, result: snapshot };
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            print_summary(&version.summary(), events_logged, &snapshot);
        }
    }

    if let Some(out) = string_arg(&args, "--export") {
        let query = RecordQuery {
            status: if args.iter().any(|a| a == "--flagged") { StatusFilter::Flagged } else { StatusFilter::All },
            community: string_arg(&args, "--community").map(str::to_string),
            search: string_arg(&args, "--search").map(str::to_string),
        };
        let selected = query.apply(version.records());
        let file = fs::File::create(out).with_context(|| format!("Cannot create {out}"))?;
        export_csv(selected.iter().copied(), io::BufWriter::new(file))?;
        log::info!("Exported {} record(s) to {out}", selected.len());
    }

    Ok(())
}

fn generate(args: &[String], rows: usize) -> Result<()> {
    let spec = FixtureSpec {
        rows,
        seed: parse_arg(args, "--seed", 42u64),
        delimiter: parse_arg(args, "--delimiter", ','),
        with_defects: !args.iter().any(|a| a == "--clean"),
        ..FixtureSpec::default()
    };
    let (text, stats) = generate_csv(&spec);
    match string_arg(args, "--out") {
        Some(out) => {
            fs::write(out, text).with_context(|| format!("Cannot write {out}"))?;
            println!(
                "Wrote {out}: {} valid row(s), {} corrupt, {} blank line(s)",
                stats.valid_rows, stats.corrupt_rows, stats.blank_lines
            );
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn print_summary(version: &VersionSummary, events_logged: i64, snapshot: &MetricsSnapshot) {
    let d = &snapshot.dashboard;
    println!("=== INGESTION SUMMARY ===");
    println!("  version:        {}", version.id);
    println!("  file:           {}", version.file_name);
    println!("  uploaded:       {}", version.upload_date.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  records:        {}", version.record_count);
    println!("  events logged:  {events_logged}");
    println!();
    println!("=== DASHBOARD ===");
    println!("  registered:     {}", d.total_registered);
    println!("  started:        {} ({:.1}%)", d.users_started_course, d.users_started_course_pct);
    println!("  certified:      {} ({:.1}%)", d.total_certified, d.certification_rate);
    println!("  avg days:       {:.2}", d.avg_completion_time_days);
    println!("  subscribers:    {:.1}%", d.overall_subscriber_rate);
    println!("  communities:    {}", d.active_communities);
    println!("  flagged:        {} ({:.1}%)", d.potential_fake_accounts, d.potential_fake_accounts_pct);
    println!("  rapid:          {}", d.rapid_completions);
    println!();
    println!("=== LEADERBOARD ===");
    if snapshot.leaderboard.is_empty() {
        println!("  (No certified community members)");
    }
    for (rank, entry) in snapshot.leaderboard.iter().enumerate() {
        println!("  {:>2}. {:<20} {}", rank + 1, entry.name, entry.value);
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}
