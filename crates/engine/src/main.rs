use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use lotkeeper_engine::{EngineConfig, Snapshot};
use lotkeeper_ledger::{
    LedgerAggregator, LedgerEvent, LedgerFilter, LegacySaleRecord, PageRequest, TransactionFilter, audit, export_csv,
    migrate_legacy,
};
use lotkeeper_sync::{HttpInventoryService, SyncAdapter};

#[derive(Debug, Parser)]
#[command(name = "lotkeeper", version, about = "Lot allocation and compliance ledger")]
struct Cli {
    /// Snapshot file. Defaults to `storage.snapshot_path` from configuration.
    #[arg(long, global = true, env = "LOTKEEPER_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write the compliance ledger as CSV.
    Export {
        /// Date ages are computed against. Defaults to today (UTC).
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Only records with at least one sale.
        #[arg(long)]
        sold: bool,
        /// Output file; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Import legacy sale records (JSON array) into the snapshot's ledger.
    Migrate { input: PathBuf },
    /// List ledger records missing compliance fields.
    Audit {
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Page through the external inventory service.
    Pull,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load().context("loading configuration")?;
    lotkeeper_observability::init_with(&config.logging);

    let path = cli.snapshot.clone().unwrap_or_else(|| config.storage.snapshot_path.clone());
    match cli.command {
        Command::Export {
            as_of,
            from,
            to,
            sold,
            out,
        } => {
            let filter = LedgerFilter {
                from,
                to,
                transaction: if sold { TransactionFilter::WithSale } else { TransactionFilter::All },
                ..LedgerFilter::default()
            };
            export(&path, &filter, as_of.unwrap_or_else(today), out.as_deref())
        }
        Command::Migrate { input } => migrate(&path, &input),
        Command::Audit { as_of } => run_audit(&path, as_of.unwrap_or_else(today)),
        Command::Pull => pull(&path, &config).await,
    }
}

fn export(path: &Path, filter: &LedgerFilter, as_of: NaiveDate, out: Option<&Path>) -> anyhow::Result<()> {
    let (_, ledger, _) = Snapshot::load(path).context("reading snapshot")?.into_stores();
    let page = LedgerAggregator::new(ledger)
        .query(filter, PageRequest::all(), as_of)
        .context("querying ledger")?;

    let writer: Box<dyn Write> = match out {
        Some(file) => Box::new(
            fs::File::create(file).with_context(|| format!("creating {}", file.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    export_csv(&page.rows, as_of, writer).context("writing csv")?;
    info!(rows = page.total, %as_of, "ledger exported");
    Ok(())
}

fn migrate(path: &Path, input: &Path) -> anyhow::Result<()> {
    let raw = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let records: Vec<LegacySaleRecord> =
        serde_json::from_str(&raw).with_context(|| format!("parsing legacy records in {}", input.display()))?;

    let (lots, ledger, activity) = Snapshot::load(path).context("reading snapshot")?.into_stores();
    let outcome = migrate_legacy(records);
    let ledger = LedgerAggregator::new(ledger);
    let appended = ledger
        .append_all(outcome.events.into_iter().map(LedgerEvent::from))
        .context("appending migrated events")?;

    Snapshot::capture(&lots, ledger.log(), &activity)
        .context("capturing state")?
        .save(path)
        .context("writing snapshot")?;
    println!(
        "migrated {} records: {appended} new events, {} duplicates dropped, {} rows without a positive quantity skipped",
        outcome.records.len(),
        outcome.duplicates,
        outcome.rejected
    );
    Ok(())
}

fn run_audit(path: &Path, as_of: NaiveDate) -> anyhow::Result<()> {
    let (_, ledger, _) = Snapshot::load(path).context("reading snapshot")?.into_stores();
    let records = LedgerAggregator::new(ledger).rebuild_all().context("rebuilding ledger")?;
    let violations = audit(&records, as_of);
    for v in &violations {
        let missing: Vec<&str> = v.missing.iter().map(|m| m.as_str()).collect();
        println!("{}\t{}", v.identity, missing.join(","));
    }
    if !violations.is_empty() {
        warn!(count = violations.len(), total = records.len(), "non-compliant ledger records");
    }
    Ok(())
}

async fn pull(path: &Path, config: &EngineConfig) -> anyhow::Result<()> {
    let (lots, ledger, activity) = Snapshot::load(path).context("reading snapshot")?.into_stores();
    let service = HttpInventoryService::new(
        config.sync.base_url.clone(),
        config.sync.api_key.clone(),
        config.sync.request_timeout(),
    )
    .context("building http client")?;
    let adapter = SyncAdapter::new(service, activity, config.sync.retry_policy());

    let pulled = adapter.pull(config.sync.pull_options()).await;

    Snapshot::capture(&lots, &ledger, adapter.activity())
        .context("capturing state")?
        .save(path)
        .context("writing snapshot")?;
    let items = pulled.context("pulling remote items")?;
    println!("pulled {} items", items.len());
    Ok(())
}
