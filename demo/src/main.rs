//! custos audit ledger — demo CLI
//!
//! Runs one or all of four scenarios against an in-memory ledger: chain
//! building and verification, a tamper drill, a retention pass (purge +
//! redaction), and a signed export with offline verification.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- chain
//!   cargo run -p demo -- tamper
//!   cargo run -p demo -- retention
//!   cargo run -p demo -- export

use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use custos_contracts::{
    error::LedgerResult,
    query::RecordFilter,
    record::{Decision, DecisionInput, DecisionRecord, RecordId},
    scope::ScopeFields,
};
use custos_core::traits::LedgerStore;
use custos_export::{verify_line, ExportFormat, StaticKeyProvider};
use custos_ledger::{hash_record, request_fingerprint, InMemoryLedgerStore};
use custos_retention::TomlRetentionPolicy;
use custos_service::{LedgerService, RetentionRun};

// ── CLI definition ────────────────────────────────────────────────────────────

/// custos — tamper-evident safety-decision audit ledger demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "custos audit ledger demo",
    long_about = "Runs custos demo scenarios showing per-scope hash chains,\n\
                  tamper detection, retention (purge + redaction), and signed export."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all four scenarios in sequence.
    RunAll,
    /// Scenario 1: per-scope hash chains and verification.
    Chain,
    /// Scenario 2: tamper drill — corrupt a record, watch the verifier catch it.
    Tamper,
    /// Scenario 3: retention — preview, purge, redact, re-verify.
    Retention,
    /// Scenario 4: signed export verified offline with the shared key.
    Export,
}

const DEMO_KEY: &[u8] = b"demo-export-signing-key";

const DEMO_POLICY: &str = r#"
[defaults]
retention_days = 90
auto_purge = false

[[org]]
id = "acme"
retention_days = 30
auto_purge = true
"#;

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Structured logging; set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::RunAll => run_all(),
        Command::Chain => run_chain(),
        Command::Tamper => run_tamper(),
        Command::Retention => run_retention(),
        Command::Export => run_export(),
    };

    if let Err(e) = result {
        eprintln!("demo error: {e}");
        std::process::exit(1);
    }
}

fn run_all() -> LedgerResult<()> {
    run_chain()?;
    run_tamper()?;
    run_retention()?;
    run_export()
}

// ── Scenario wiring ──────────────────────────────────────────────────────────

fn build_service() -> LedgerResult<(Arc<InMemoryLedgerStore>, LedgerService)> {
    let store = Arc::new(InMemoryLedgerStore::new());
    let policy = Arc::new(TomlRetentionPolicy::from_toml_str(DEMO_POLICY)?);
    let service = LedgerService::new(store.clone(), policy, &StaticKeyProvider::new(DEMO_KEY))?;
    Ok((store, service))
}

fn decision_input(org: Option<&str>, user: Option<&str>, decision: Decision, text: &str) -> DecisionInput {
    let mut metadata = serde_json::Map::new();
    metadata.insert("reasoning".to_string(), json!(format!("filter hit on: {text}")));
    DecisionInput {
        scope: ScopeFields {
            org_id: org.map(str::to_string),
            user_id: user.map(str::to_string),
            ..ScopeFields::default()
        },
        content_type: "chat_message".to_string(),
        decision,
        confidence: Some(0.92),
        applied_filters: vec!["toxicity".to_string(), "pii".to_string()],
        request_hash: Some(request_fingerprint(
            text,
            None,
            "chat_message",
            user,
            &["toxicity".to_string(), "pii".to_string()],
        )),
        metadata,
    }
}

fn seed(service: &LedgerService) -> LedgerResult<()> {
    service.record(decision_input(Some("acme"), None, Decision::Allow, "hello there"))?;
    service.record(decision_input(Some("acme"), None, Decision::Block, "buy cheap meds"))?;
    service.record(decision_input(Some("acme"), None, Decision::Modify, "my SSN is ..."))?;
    service.record(decision_input(Some("globex"), None, Decision::Allow, "quarterly report"))?;
    service.record(decision_input(None, Some("u-42"), Decision::Escalate, "worrying message"))?;
    Ok(())
}

// ── Scenarios ────────────────────────────────────────────────────────────────

fn run_chain() -> LedgerResult<()> {
    println!("── chain ────────────────────────────────────────────");
    let (_, service) = build_service()?;
    seed(&service)?;

    let report = service.verify(&RecordFilter::default(), None)?;
    println!("scanned {} records, valid: {}", report.scanned, report.valid);
    for chain in &report.chains {
        println!(
            "  chain {}:{} — {} records, {} breaks",
            chain.scope,
            chain.key.as_deref().unwrap_or("-"),
            chain.count,
            chain.breaks
        );
    }
    Ok(())
}

fn run_tamper() -> LedgerResult<()> {
    println!("── tamper drill ─────────────────────────────────────");
    let (store, service) = build_service()?;
    seed(&service)?;

    // Flip a stored confidence value behind the ledger's back.
    let victims = store.scan(&RecordFilter::for_org("acme"), None)?;
    store.mutate_record(&victims[1].id, |r| r.confidence = Some(0.01))?;
    println!("mutated confidence of record {}", victims[1].id);

    let report = service.verify(&RecordFilter::for_org("acme"), None)?;
    println!("valid: {}", report.valid);
    for b in &report.breaks {
        println!(
            "  break {:?} on {} in {} at {}",
            b.kind, b.record_id, b.scope, b.created_at
        );
    }
    Ok(())
}

fn run_retention() -> LedgerResult<()> {
    println!("── retention ────────────────────────────────────────");
    let (store, service) = build_service()?;
    seed(&service)?;

    // Backdate some acme history past the 30-day policy window.
    for age_days in [90, 45] {
        let mut metadata = serde_json::Map::new();
        metadata.insert("reasoning".to_string(), json!("aged decision"));
        let mut record = DecisionRecord {
            id: RecordId::new(),
            scope: ScopeFields {
                org_id: Some("acme".to_string()),
                ..ScopeFields::default()
            },
            content_type: "chat_message".to_string(),
            decision: Decision::Block,
            confidence: None,
            applied_filters: vec![],
            request_hash: None,
            prev_hash: None,
            record_hash: String::new(),
            created_at: Utc::now() - Duration::days(age_days),
            seq: 0,
            metadata,
        };
        record.record_hash = hash_record(&record)?;
        store.insert(record)?;
    }

    println!(
        "purge candidates (policy window): {}",
        service.retention_preview(Some("acme"), None)?
    );

    let outcome = service.retention_run(&RetentionRun {
        org_id: Some("acme".to_string()),
        redact: true,
        redact_days: Some(0),
        ..RetentionRun::default()
    })?;
    println!(
        "purged {} of {} candidates; redacted {} of {}",
        outcome.purge.purged,
        outcome.purge.candidates,
        outcome.redaction.as_ref().map(|r| r.redacted).unwrap_or(0),
        outcome.redaction.as_ref().map(|r| r.candidates).unwrap_or(0)
    );

    // Redacted records verify as expected divergence, not tampering.
    let report = service.verify(&RecordFilter::for_org("acme"), None)?;
    println!(
        "post-retention verify — valid: {}, redacted: {}",
        report.valid, report.redacted
    );
    Ok(())
}

fn run_export() -> LedgerResult<()> {
    println!("── signed export ────────────────────────────────────");
    let (_, service) = build_service()?;
    seed(&service)?;

    let lines: Vec<String> = service
        .export(&RecordFilter::for_org("acme"), ExportFormat::Ndjson, 0, None)?
        .collect::<Result<_, _>>()?;

    for line in &lines {
        let ok = verify_line(DEMO_KEY, line)?;
        let preview: String = line.chars().take(72).collect();
        println!("  [{}] {preview}…", if ok { "ok" } else { "BAD" });
    }
    println!("{} signed lines, all offline-verifiable", lines.len());
    Ok(())
}
