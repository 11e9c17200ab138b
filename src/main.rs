use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::fs::{self, File};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use triple_check::{
    count_reports, insert_reports, load_records, setup_database, Evidence, TripleCheckValidator,
    ValidationSession, ValidatorConfig,
};

#[derive(Parser, Debug)]
#[command(name = "triple-check")]
#[command(about = "Cascading three-layer validation of address records")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a JSON array of records
    Validate {
        /// Records to validate (JSON array)
        #[arg(short, long)]
        records: PathBuf,

        /// Collected source and index evidence (JSON)
        #[arg(short, long)]
        evidence: Option<PathBuf>,

        /// Validator configuration (JSON); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the full batch report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Persist reports and audit entries to this SQLite database
        #[arg(long)]
        db: Option<PathBuf>,

        /// Write GOLD and SILVER records as CSV
        #[arg(long)]
        export_csv: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "triple_check=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match Args::parse().command {
        Command::Validate {
            records,
            evidence,
            config,
            output,
            db,
            export_csv,
        } => run_validate(records, evidence, config, output, db, export_csv).await,
    }
}

async fn run_validate(
    records_path: PathBuf,
    evidence_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
    db: Option<PathBuf>,
    export_csv: Option<PathBuf>,
) -> Result<()> {
    println!("🔍 Triple Check Validation");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load inputs
    let config = match config_path {
        Some(path) => ValidatorConfig::from_file(&path)?,
        None => ValidatorConfig::default(),
    };
    let evidence = match evidence_path {
        Some(path) => Evidence::from_file(&path)?,
        None => Evidence::default(),
    };
    let records = load_records(&records_path)?;
    println!("\n📂 Loaded {} records", records.len());
    println!(
        "✓ {} external sources, {} reproducibility indices",
        evidence.sources.len(),
        evidence.indices.len()
    );

    // 2. Validate
    let validator =
        TripleCheckValidator::new(config, evidence.verifier_panel(), evidence.index_panel())
            .context("Invalid validator configuration")?;
    let session = ValidationSession::new();
    info!(session = session.id(), "Validation session started");

    let report = validator
        .generate_validation_report(&session, &records)
        .await;

    println!("\n📊 Results");
    for result in &report.validation_results {
        println!("   {} ({}/3 layers)", result.summary(), result.layers_executed());
    }

    // 3. Outputs
    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write report: {:?}", path))?;
        println!("\n💾 Report written to {}", path.display());
    }

    if let Some(path) = db {
        let mut conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database: {:?}", path))?;
        setup_database(&conn)?;
        let inserted = insert_reports(&mut conn, session.id(), &report.validation_results)?;
        println!("💾 Stored {} reports in {}", inserted, path.display());
        println!("✓ Database contains {} reports", count_reports(&conn)?);
    }

    let (_audit, ledger) = session.into_parts();

    if let Some(path) = export_csv {
        let file =
            File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
        let rows = ledger.write_exportable_csv(file)?;
        println!("📤 Exported {} GOLD/SILVER records to {}", rows, path.display());
    }

    // 4. Summary
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ {}", report.summary());
    println!("✓ Releasable (GOLD/SILVER): {}", ledger.exportable().len());
    println!("⚠️  Needs review (BRONZE): {}", ledger.needs_review().len());
    println!("❌ Rejected: {}", ledger.rejected().len());

    for rejected in ledger.rejected() {
        println!("   - {}", rejected.summary());
    }

    Ok(())
}
