use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use tally_core::backend::{BackendKind, MemoryBackend, ReportBackend};
use tally_core::config::TallyConfig;
use tally_core::reports::{to_mem_table, ReportKind};
use tally_core::schema::{sales_records_from_table, SALES_TABLE};
use tally_core::table::MemTable;
use tally_distexec::DistributedBackend;
use tally_postgres::{PostgresBackend, PostgresClient, WriteMode};

mod output;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl From<LogFormat> for logutil::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Pretty => logutil::LogFormat::HumanReadable,
            LogFormat::Json => logutil::LogFormat::Json,
        }
    }
}

#[derive(Parser)]
#[clap(name = "tally")]
#[clap(version)]
#[clap(about = "Sales analytics over interchangeable backends", long_about = None)]
struct Cli {
    /// Log verbosity.
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format.
    #[clap(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Path to a TOML configuration file.
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Report backend (postgres, memory, distributed). Overrides the
    /// configured one.
    #[clap(short, long)]
    backend: Option<BackendKind>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the demo schema and load the built-in dataset.
    Seed(SeedArgs),
    /// Load a CSV file into a database table.
    LoadCsv(LoadCsvArgs),
    /// Run one report, or all of them.
    Report(ReportArgs),
    /// Compute the derived tables and write them back to the database.
    Materialize,
    /// Count the rows in a table.
    RowCount(RowCountArgs),
}

#[derive(clap::Args)]
struct SeedArgs {
    /// Drop and recreate the tables before seeding.
    #[clap(long)]
    reset: bool,
}

#[derive(clap::Args)]
struct LoadCsvArgs {
    /// CSV file to load.
    #[clap(short, long)]
    path: PathBuf,

    /// Destination table. Loads into the live sales table go through the
    /// typed, all-or-nothing path.
    #[clap(long, default_value = "sales_import")]
    table: String,

    /// What to do when the destination already exists (fail, replace,
    /// append).
    #[clap(long, default_value_t = WriteMode::Fail)]
    mode: WriteMode,
}

#[derive(clap::Args)]
struct ReportArgs {
    /// Report to run; omit to run every report.
    name: Option<ReportKind>,

    /// Print rows as JSON instead of a table.
    #[clap(long)]
    json: bool,
}

#[derive(clap::Args)]
struct RowCountArgs {
    /// Table to count.
    #[clap(long)]
    table: String,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    logutil::configure_global_logger(level, cli.log_format.into(), io::stderr);

    if let Err(err) = run(cli) {
        println!("ERROR: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = TallyConfig::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = %config.backend,
        "starting tally"
    );

    let runtime = build_runtime("tally")?;
    runtime.block_on(async move {
        match cli.command {
            Commands::Seed(args) => seed(&config, args).await,
            Commands::LoadCsv(args) => load_csv(&config, args).await,
            Commands::Report(args) => report(&config, args).await,
            Commands::Materialize => materialize(&config).await,
            Commands::RowCount(args) => row_count(&config, args).await,
        }
    })
}

fn build_runtime(thread_label: &'static str) -> Result<Runtime> {
    let runtime = Builder::new_multi_thread()
        .thread_name_fn(move || {
            static THREAD_ID: AtomicU64 = AtomicU64::new(0);
            let id = THREAD_ID.fetch_add(1, Ordering::Relaxed);
            format!("{}-thread-{}", thread_label, id)
        })
        .enable_all()
        .build()?;

    Ok(runtime)
}

async fn connect(config: &TallyConfig) -> Result<PostgresClient> {
    PostgresClient::connect(&config.postgres.conn_string())
        .await
        .with_context(|| {
            format!(
                "connecting to postgres at {}:{}",
                config.postgres.host, config.postgres.port
            )
        })
}

/// Construct the configured report backend.
///
/// The in-memory backend is hydrated from the database first, paging the
/// sales scan at the configured chunk size, so every engine answers over
/// the same data.
async fn build_backend(config: &TallyConfig) -> Result<Box<dyn ReportBackend>> {
    let backend: Box<dyn ReportBackend> = match config.backend {
        BackendKind::Postgres => Box::new(PostgresBackend::connect(&config.postgres).await?),
        BackendKind::Memory => {
            let client = connect(config).await?;
            let mut sales = Vec::new();
            let mut scan = client.scan_table(SALES_TABLE, config.scan.chunk_size).await?;
            while let Some(chunk) = scan.next_chunk().await? {
                sales.extend(sales_records_from_table(&chunk)?);
            }
            let customers = client.fetch_customers().await?;
            Box::new(MemoryBackend::new(sales, customers))
        }
        BackendKind::Distributed => Box::new(DistributedBackend::from_config(
            &config.postgres,
            &config.scan,
        )),
    };
    debug!(backend = backend.name(), "report backend ready");
    Ok(backend)
}

async fn seed(config: &TallyConfig, args: SeedArgs) -> Result<()> {
    let mut client = connect(config).await?;
    let summary = if args.reset {
        client.reseed().await?
    } else {
        client.seed().await?
    };
    println!(
        "seeded {} customers and {} sales",
        summary.customers_inserted, summary.sales_inserted
    );
    Ok(())
}

async fn load_csv(config: &TallyConfig, args: LoadCsvArgs) -> Result<()> {
    let mut client = connect(config).await?;

    // The live sales table has a serial id and check constraints; loads into
    // it go through the typed path, which honors the mode without touching
    // the DDL.
    if args.table == SALES_TABLE {
        let records = tally_csv::read_sales_records(&args.path)
            .with_context(|| format!("reading {}", args.path.display()))?;
        let written = client.write_sales(&records, args.mode).await?;
        let total = client.row_count(SALES_TABLE).await?;
        println!("wrote {} sales rows ({} rows total)", written, total);
        return Ok(());
    }

    let table = tally_csv::read_table(&args.path)
        .with_context(|| format!("reading {}", args.path.display()))?;
    let written = client.write_table(&args.table, &table, args.mode).await?;
    // read the destination back; the printed total comes from the read side
    // of the round trip
    let read_back = client.read_table(&args.table).await?;
    println!(
        "wrote {} rows to {} ({} rows total)",
        written,
        args.table,
        read_back.num_rows()
    );
    Ok(())
}

async fn report(config: &TallyConfig, args: ReportArgs) -> Result<()> {
    let backend = build_backend(config).await?;
    let kinds = match args.name {
        Some(kind) => vec![kind],
        None => ReportKind::ALL.to_vec(),
    };

    for kind in kinds {
        if args.json {
            println!("{}", report_json(backend.as_ref(), kind).await?);
        } else {
            println!("{}:", kind);
            let table = report_table(backend.as_ref(), kind).await?;
            println!("{}", output::render_table(&table));
        }
    }
    Ok(())
}

async fn report_table(backend: &dyn ReportBackend, kind: ReportKind) -> Result<MemTable> {
    let table = match kind {
        ReportKind::ProductRevenue => to_mem_table(&backend.product_revenue().await?)?,
        ReportKind::CategorySummary => to_mem_table(&backend.category_summary().await?)?,
        ReportKind::RegionalSummary => to_mem_table(&backend.regional_summary().await?)?,
        ReportKind::MonthlyRevenue => to_mem_table(&backend.monthly_revenue().await?)?,
        ReportKind::CustomerStats => to_mem_table(&backend.customer_stats().await?)?,
    };
    Ok(table)
}

async fn report_json(backend: &dyn ReportBackend, kind: ReportKind) -> Result<String> {
    let rows = match kind {
        ReportKind::ProductRevenue => serde_json::to_value(backend.product_revenue().await?)?,
        ReportKind::CategorySummary => serde_json::to_value(backend.category_summary().await?)?,
        ReportKind::RegionalSummary => serde_json::to_value(backend.regional_summary().await?)?,
        ReportKind::MonthlyRevenue => serde_json::to_value(backend.monthly_revenue().await?)?,
        ReportKind::CustomerStats => serde_json::to_value(backend.customer_stats().await?)?,
    };
    Ok(serde_json::to_string_pretty(&rows)?)
}

async fn materialize(config: &TallyConfig) -> Result<()> {
    let backend = build_backend(config).await?;

    let products = to_mem_table(&backend.product_catalog().await?)?;
    let categories = to_mem_table(&backend.category_summary().await?)?;
    let regional = to_mem_table(&backend.regional_summary().await?)?;

    let mut client = connect(config).await?;
    for (name, table) in [
        ("products", &products),
        ("category_sales_summary", &categories),
        ("regional_category_summary", &regional),
    ] {
        let written = client.write_table(name, table, WriteMode::Replace).await?;
        println!("materialized {} ({} rows)", name, written);
    }
    Ok(())
}

async fn row_count(config: &TallyConfig, args: RowCountArgs) -> Result<()> {
    let client = connect(config).await?;
    let count = client.row_count(&args.table).await?;
    println!("{}", count);
    Ok(())
}
