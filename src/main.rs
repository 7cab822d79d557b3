use anyhow::{anyhow, Context};
use causelist_notifier::apis::create_source;
use causelist_notifier::config::{Config, SourceConfig};
use causelist_notifier::extract::{parse_ndjson_rows, CommandExtractor, ExtractionPool};
use causelist_notifier::matcher::WatcherMatcher;
use causelist_notifier::notifier::Notifier;
use causelist_notifier::pipeline::{clean_rows, BatchReport, BatchRunner, Orchestrator};
use causelist_notifier::storage::{SqliteStore, WatermarkStore};
use causelist_notifier::transport::{LogTransport, MailApiTransport, Transport};
use causelist_notifier::types::CourtSource;
use causelist_notifier::{logging, metrics};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "causelist")]
#[command(about = "Court cause list ingester and case notifier")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one batch over the configured sources
    Run {
        /// Specific sources to run (comma-separated ids)
        #[arg(long)]
        sources: Option<String>,
        /// Log notifications instead of sending them
        #[arg(long)]
        dry_run: bool,
        /// Keep downloaded lists and cleaned tables after the run
        #[arg(long)]
        keep_artifacts: bool,
    },
    /// Rebuild records offline from a JSON-lines file of raw rows
    Reconstruct {
        #[arg(long)]
        source: String,
        #[arg(long)]
        input: PathBuf,
        /// Write the cleaned table here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Inspect or change per-source watermarks
    Watermark {
        #[command(subcommand)]
        action: WatermarkCommand,
    },
    /// Manage watchers and the cases they follow
    Watchers {
        #[command(subcommand)]
        action: WatcherCommand,
    },
    /// List configured sources with their watermark
    Sources,
}

#[derive(Subcommand)]
enum WatermarkCommand {
    Show,
    /// Set a watermark (YYYY-MM-DD)
    Set { source: String, date: String },
    /// Forget a watermark so the next run starts from today
    Clear { source: String },
}

#[derive(Subcommand)]
enum WatcherCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long = "case")]
        case_number: String,
    },
    List {
        #[arg(long = "case")]
        case_number: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _guard = logging::init_logging();

    let cli = Cli::parse();
    let mut config = Config::load_or_default(&cli.config)?;
    config.apply_env();

    match cli.command {
        Commands::Run {
            sources,
            dry_run,
            keep_artifacts,
        } => {
            let selected = select_sources(&config, sources.as_deref());
            if selected.is_empty() {
                return Err(anyhow!("no enabled sources selected"));
            }
            let report = run_batch(&config, selected, dry_run, keep_artifacts).await?;
            print_report(&report);
        }
        Commands::Reconstruct {
            source,
            input,
            output,
        } => reconstruct(&config, &source, &input, output).await?,
        Commands::Watermark { action } => {
            let store = open_store(&config)?;
            match action {
                WatermarkCommand::Show => print_sources(&config, &store)?,
                WatermarkCommand::Set { source, date } => {
                    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                        .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", date))?;
                    store.set_watermark(&source, date).await?;
                    println!("✅ Watermark for {} set to {}", source, date);
                }
                WatermarkCommand::Clear { source } => {
                    store.clear_watermark(&source)?;
                    println!("✅ Watermark for {} cleared", source);
                }
            }
        }
        Commands::Watchers { action } => {
            let store = open_store(&config)?;
            match action {
                WatcherCommand::Add {
                    name,
                    email,
                    case_number,
                } => {
                    store.add_watcher(&name, &email, &case_number)?;
                    println!("✅ {} <{}> now watches {}", name, email, case_number);
                }
                WatcherCommand::List { case_number } => {
                    for (case, watcher) in store.list_watchers(case_number.as_deref())? {
                        println!("{}\t{}\t{}", case, watcher.name, watcher.email);
                    }
                }
            }
        }
        Commands::Sources => {
            let store = open_store(&config)?;
            print_sources(&config, &store)?;
        }
    }

    Ok(())
}

fn select_sources<'a>(config: &'a Config, filter: Option<&str>) -> Vec<&'a SourceConfig> {
    let Some(filter) = filter else {
        return config.enabled_sources().collect();
    };
    let wanted: Vec<&str> = filter.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
    for id in &wanted {
        if !config.sources.iter().any(|s| s.id == *id) {
            warn!("Unknown source '{}' ignored", id);
        }
    }
    config
        .enabled_sources()
        .filter(|s| wanted.contains(&s.id.as_str()))
        .collect()
}

fn open_store(config: &Config) -> anyhow::Result<SqliteStore> {
    let store = SqliteStore::open(&config.storage.database).with_context(|| {
        format!("failed to open database {}", config.storage.database.display())
    })?;
    for source in &config.sources {
        store.register_source(&source.id, &source.name)?;
    }
    Ok(store)
}

async fn run_batch(
    config: &Config,
    selected: Vec<&SourceConfig>,
    dry_run: bool,
    keep_artifacts: bool,
) -> anyhow::Result<BatchReport> {
    metrics::init_metrics();

    let store = Arc::new(open_store(config)?);
    let client = reqwest::Client::builder()
        .user_agent(concat!("causelist/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let mut sources: Vec<Arc<dyn CourtSource>> = Vec::with_capacity(selected.len());
    for source_config in selected {
        sources.push(create_source(source_config, client.clone())?);
    }

    let transport: Arc<dyn Transport> = if dry_run {
        info!("Dry run: notifications are logged, not sent");
        Arc::new(LogTransport::new())
    } else {
        Arc::new(MailApiTransport::new(client.clone(), &config.mail)?)
    };

    let pipeline = &config.pipeline;
    let pool = ExtractionPool::new(
        Arc::new(CommandExtractor::new(&config.extractor)),
        pipeline.worker_count(),
    );
    let orchestrator = Orchestrator::new(
        pool,
        WatcherMatcher::new(store.clone()),
        Notifier::new(transport, config.mail.subject.clone()),
        pipeline.chunk_size,
        pipeline.first_page,
    );
    let runner = BatchRunner::new(
        Arc::new(orchestrator),
        store,
        pipeline.data_dir.clone(),
        keep_artifacts || pipeline.keep_artifacts,
    );

    let report = runner.run(sources).await?;

    if let Some(url) = &config.storage.pushgateway_url {
        if let Err(e) = metrics::push_to_gateway(url, &report.run_id.to_string()).await {
            warn!("Failed to push metrics to Pushgateway: {}", e);
        }
    }
    Ok(report)
}

async fn reconstruct(
    config: &Config,
    source_id: &str,
    input: &PathBuf,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let source_config = config
        .sources
        .iter()
        .find(|s| s.id == source_id)
        .ok_or_else(|| anyhow!("unknown source '{}'", source_id))?;
    let source = create_source(source_config, reqwest::Client::new())?;

    let content = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))?;
    let rows = parse_ndjson_rows(&content, input.display())?;
    let (records, report) = clean_rows(source.as_ref(), rows);
    info!(
        "Rebuilt {} record(s) from {} row(s): {} blank, {} pre-amble, {} anomalies",
        records.len(),
        report.rows_seen,
        report.blank_rows,
        report.preamble_rows,
        report.anomalies.len()
    );

    let mut out: Box<dyn Write> = match &output {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(std::io::stdout().lock()),
    };
    for record in &records {
        serde_json::to_writer(&mut out, &record.record.to_table_object())?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

fn print_sources(config: &Config, store: &SqliteStore) -> anyhow::Result<()> {
    let rows = store.list_sources()?;
    for source in &config.sources {
        let watermark = rows
            .iter()
            .find(|r| r.source_id == source.id)
            .and_then(|r| r.last_list_date)
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}\t{}\t{}\t{}\twatermark={}",
            source.id,
            source.name,
            source.kind,
            if source.enabled { "enabled" } else { "disabled" },
            watermark
        );
    }
    Ok(())
}

fn print_report(report: &BatchReport) {
    println!("\n📊 Batch {} results:", report.run_id);
    for source in &report.sources {
        let watermark = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
        println!("   {} ({})", source.display_name, source.source_id);
        println!(
            "      Documents: {} accepted, {} processed",
            source.documents_accepted, source.documents_processed
        );
        println!(
            "      Records: {} ({} unmatched, {} anomalies, {} failed chunks)",
            source.records, source.unmatched, source.anomalies, source.chunk_failures
        );
        println!(
            "      Notifications: {} sent, {} failed",
            source.notifications.sent, source.notifications.failed
        );
        println!(
            "      Watermark: {} -> {}",
            watermark(source.watermark_before),
            watermark(source.watermark_after)
        );
        if let Some(failure) = &source.failure {
            error!("Source {} failed: {}", source.source_id, failure);
            println!("      ❌ {}", failure);
        }
    }
}
