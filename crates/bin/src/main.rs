//! edgarbook CLI binary.
//!
//! Search companies, list their filings, scan filings for tables and build
//! statement workbooks.

mod integration;

use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use edgarbook::data::config::EdgarConfig;
use edgarbook::data::edgar::{CompanyEntry, FilingDescriptor, FilingQuery};
use edgarbook::output::{ExportFormat, Layout, export_workbook};
use edgarbook::{
    DEFAULT_SCAN_TTL_SECS, GenerateRequest, Pipeline, ScanId, ScanReport, parse_table_id,
};
use indicatif::{ProgressBar, ProgressStyle};
use integration::cache_manager::{
    format_bytes, load_config, open_cache, print_cache_info, scans_dir,
};
use integration::scan_store::ScanStore;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process;
use std::time::Duration as StdDuration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filings scanned when neither `--limit` nor `--accession` is given.
const DEFAULT_SELECTED_FILINGS: usize = 4;

#[derive(Parser)]
#[command(name = "edgarbook")]
#[command(about = "edgarbook: SEC filings to financial statement workbooks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilingArgs {
    /// Form types to include (amendments are included too)
    #[arg(long, value_delimiter = ',', default_value = "10-K,10-Q,8-K")]
    forms: Vec<String>,

    /// Look-back window in years
    #[arg(long, default_value = "5")]
    years: u32,

    /// Use only the newest N filings
    #[arg(long)]
    limit: Option<usize>,

    /// Use only these accession numbers
    #[arg(long, value_delimiter = ',')]
    accession: Vec<String>,

    /// Disable the response cache (always fetch fresh data)
    #[arg(long)]
    no_cache: bool,
}

impl FilingArgs {
    fn query(&self) -> FilingQuery {
        FilingQuery { forms: self.forms.clone(), years: self.years }
    }

    /// Narrow a listing to the requested filings, keeping its order.
    fn select(
        &self,
        filings: Vec<FilingDescriptor>,
        default_limit: Option<usize>,
    ) -> Vec<FilingDescriptor> {
        let mut selected: Vec<FilingDescriptor> = if self.accession.is_empty() {
            filings
        } else {
            filings.into_iter().filter(|f| self.accession.contains(&f.accession)).collect()
        };
        let limit = self.limit.or(if self.accession.is_empty() { default_limit } else { None });
        if let Some(limit) = limit {
            selected.truncate(limit);
        }
        selected
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Excel workbook with live formulas
    Xlsx,
    /// One CSV file per sheet plus a manifest
    Csv,
    /// A single JSON document
    Json,
}

impl From<OutputFormat> for ExportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Xlsx => Self::Xlsx,
            OutputFormat::Csv => Self::Csv,
            OutputFormat::Json => Self::PrettyJson,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Search companies by ticker or name
    Search {
        /// Ticker or part of a company name
        query: String,
    },

    /// List a company's filings
    Filings {
        /// Ticker, name or CIK
        company: String,

        #[command(flatten)]
        filings: FilingArgs,
    },

    /// Extract tables from a company's filings
    Scan {
        /// Ticker, name or CIK
        company: String,

        #[command(flatten)]
        filings: FilingArgs,

        /// Print the scan report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a statement workbook
    Generate {
        /// Ticker, name or CIK
        company: String,

        #[command(flatten)]
        filings: FilingArgs,

        /// Scan id whose tables to include
        #[arg(long)]
        scan: Option<ScanId>,

        /// Table ids (`accession:index`) to include
        #[arg(long, value_delimiter = ',')]
        tables: Vec<String>,

        /// Put everything on one sheet
        #[arg(long)]
        single_sheet: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "xlsx")]
        format: OutputFormat,

        /// Output directory
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },

    /// Inspect or clear the local cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show where the cache lives and how much it holds
    Stats,
    /// Delete every cached response and saved scan
    Clear,
    /// Delete cached responses older than the given age
    Purge {
        /// Maximum age in days
        #[arg(long, default_value = "30")]
        days: u32,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("edgarbook=info")))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Search { query } => {
            search(&query).await?;
        }
        Commands::Filings { company, filings } => {
            list_filings(&company, &filings).await?;
        }
        Commands::Scan { company, filings, json } => {
            scan(&company, &filings, json).await?;
        }
        Commands::Generate { company, filings, scan, tables, single_sheet, format, output } => {
            let layout = if single_sheet { Layout::SingleSheet } else { Layout::MultiSheet };
            generate(&company, &filings, scan, tables, layout, format, output).await?;
        }
        Commands::Cache { action } => {
            cache(action)?;
        }
    }

    Ok(())
}

fn open_pipeline(no_cache: bool) -> Result<(Pipeline, EdgarConfig), Box<dyn std::error::Error>> {
    let config = load_config(no_cache)?;
    let pipeline = Pipeline::from_config(&config)?;
    Ok((pipeline, config))
}

fn spinner(message: &'static str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(StdDuration::from_millis(100));
    pb.set_message(message);
    Ok(pb)
}

fn company_label(company: &CompanyEntry) -> String {
    match (company.name.is_empty(), company.ticker.is_empty()) {
        (false, false) => format!("{} ({})", company.name, company.ticker),
        (false, true) => company.name.clone(),
        _ => format!("CIK {}", company.cik),
    }
}

async fn search(query: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (mut pipeline, _) = open_pipeline(false)?;
    let hits = pipeline.search(query).await?;

    if hits.is_empty() {
        println!("No companies match \"{}\"", query);
        return Ok(());
    }

    println!("{:<8} {:<12} Name", "Ticker", "CIK");
    for hit in hits {
        println!("{:<8} {:<12} {}", hit.ticker, hit.cik, hit.name);
    }
    Ok(())
}

async fn resolve_filings(
    pipeline: &mut Pipeline,
    company: &str,
    args: &FilingArgs,
    default_limit: Option<usize>,
) -> Result<(CompanyEntry, Vec<FilingDescriptor>), Box<dyn std::error::Error>> {
    let company = pipeline.resolve_company(company).await?;
    let listed = pipeline.filings(&company.cik, &args.query()).await?;
    let selected = args.select(listed, default_limit);
    Ok((company, selected))
}

async fn list_filings(company: &str, args: &FilingArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (mut pipeline, _) = open_pipeline(args.no_cache)?;
    let (company, filings) = resolve_filings(&mut pipeline, company, args, None).await?;

    println!("{}: {} filing(s)\n", company_label(&company), filings.len());
    println!("{:<8} {:<12} {:<22} Description", "Type", "Date", "Accession");
    for filing in &filings {
        println!(
            "{:<8} {:<12} {:<22} {}",
            filing.form_type, filing.date, filing.accession, filing.description
        );
    }
    Ok(())
}

async fn scan(company: &str, args: &FilingArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (mut pipeline, config) = open_pipeline(args.no_cache)?;
    let (company, filings) =
        resolve_filings(&mut pipeline, company, args, Some(DEFAULT_SELECTED_FILINGS)).await?;
    if filings.is_empty() {
        return Err(format!("No filings found for {}", company_label(&company)).into());
    }

    if !json {
        println!("Scanning {} filing(s) of {}", filings.len(), company_label(&company));
        print_cache_info(&config);
        println!();
    }

    let fetchable = filings.iter().filter(|f| !f.doc_url.is_empty()).count();
    let pb = ProgressBar::new(fetchable as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(StdDuration::from_millis(100));
    pb.set_message("Fetching filings...");

    let report = pipeline
        .scan_with_progress(&company.cik, filings, |scan| {
            pb.inc(1);
            if let Some(error) = &scan.error {
                pb.suspend(|| {
                    eprintln!(
                        "  ✗ {} {} ({}): {}",
                        scan.filing.form_type, scan.filing.date, scan.filing.accession, error
                    );
                });
            } else {
                pb.set_message(format!("{} {}", scan.filing.form_type, scan.filing.date));
            }
        })
        .await?;
    pb.finish_with_message(format!(
        "{} of {} filings scanned, {} table(s)",
        report.succeeded,
        report.attempted(),
        report.tables.len()
    ));

    let store = ScanStore::new(scans_dir());
    let ttl = pipeline.scans().ttl();
    match store.prune(ttl, Utc::now()) {
        Ok(0) => {}
        Ok(removed) => info!(removed, "removed expired scans"),
        Err(e) => warn!(error = %e, "could not prune saved scans"),
    }
    if let Some(entry) = pipeline.scans().get(&report.scan_id) {
        store.save(&report.scan_id, entry)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_scan_report(&report);
    }
    Ok(())
}

fn print_scan_report(report: &ScanReport) {
    println!();
    if report.skipped > 0 {
        println!("  {} filing(s) had no primary document", report.skipped);
    }
    if report.is_partial() {
        println!("  {} of {} filings scanned", report.succeeded, report.attempted());
    }

    println!("{:<26} {:<8} {:<12} {:>5} {:>5}  Title", "Id", "Type", "Date", "Rows", "Cols");
    for table in &report.tables {
        println!(
            "{:<26} {:<8} {:<12} {:>5} {:>5}  {}",
            table.id, table.filing_type, table.filing_date, table.rows, table.cols, table.title
        );
    }

    println!(
        "\nScan id: {} (kept for {} minutes)",
        report.scan_id,
        DEFAULT_SCAN_TTL_SECS / 60
    );
    println!(
        "Include tables with: edgarbook generate {} --scan {} --tables <id>,<id>",
        report.cik, report.scan_id
    );
}

async fn generate(
    company: &str,
    args: &FilingArgs,
    scan_id: Option<ScanId>,
    table_ids: Vec<String>,
    layout: Layout,
    format: OutputFormat,
    output: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    for id in &table_ids {
        parse_table_id(id)?;
    }

    let (mut pipeline, _) = open_pipeline(args.no_cache)?;
    let company = pipeline.resolve_company(company).await?;

    // a saved scan also fixes which filings were selected
    let mut scanned_filings = None;
    if let Some(id) = scan_id {
        match ScanStore::new(scans_dir()).load(&id)? {
            Some(entry) => {
                if entry.company_id != company.cik {
                    warn!(
                        scan = %id,
                        scanned = %entry.company_id,
                        requested = %company.cik,
                        "scan belongs to another company"
                    );
                }
                scanned_filings = Some(entry.filings.clone());
                pipeline.scans_mut().restore(id, entry);
            }
            None => warn!(scan = %id, "scan not found, tables will be re-extracted"),
        }
    }

    let filings = match scanned_filings {
        Some(filings) if !filings.is_empty() => args.select(filings, None),
        _ => {
            let listed = pipeline.filings(&company.cik, &args.query()).await?;
            args.select(listed, Some(DEFAULT_SELECTED_FILINGS))
        }
    };
    if filings.is_empty() {
        return Err(format!("No filings found for {}", company_label(&company)).into());
    }

    let request = GenerateRequest {
        cik: company.cik.clone(),
        company_name: company.name.clone(),
        ticker: company.ticker.clone(),
        filings,
        scan_id,
        table_ids: table_ids.into_iter().collect::<BTreeSet<_>>(),
        layout,
    };

    if let Some(id) = &request.scan_id
        && pipeline.scans().get(id).is_none()
    {
        warn!(scan = %id, "scan expired, tables will be re-extracted");
    }

    let pb = spinner("Building workbook...")?;
    let workbook = match pipeline.generate(&request).await {
        Ok(workbook) => workbook,
        Err(e) => {
            pb.finish_with_message("Failed!");
            return Err(e.into());
        }
    };
    pb.finish_with_message(format!("Built {} sheet(s)", workbook.sheets.len()));

    let files = export_workbook(&workbook, &output, format.into())?;
    println!("\n{}", workbook.company_name);
    for name in workbook.sheet_names() {
        println!("  {}", name);
    }
    println!();
    for file in files {
        println!("Wrote {}", file.display());
    }
    Ok(())
}

fn cache(action: CacheAction) -> Result<(), Box<dyn std::error::Error>> {
    let (responses, path) = open_cache()?;
    let scans = ScanStore::new(scans_dir());

    match action {
        CacheAction::Stats => {
            let stats = responses.get_stats()?;
            println!("Cache location: {}", path.display());
            println!("  Responses:   {}", stats.responses);
            println!("  Size:        {}", format_bytes(stats.total_bytes));
            println!("  Saved scans: {}", scans.count()?);
        }
        CacheAction::Clear => {
            responses.clear_all()?;
            let removed = scans.clear()?;
            println!("Cleared cached responses and {} saved scan(s)", removed);
        }
        CacheAction::Purge { days } => {
            let removed = responses.purge_older_than(chrono::Duration::days(i64::from(days)))?;
            let expired = scans.prune(chrono::Duration::seconds(DEFAULT_SCAN_TTL_SECS), Utc::now())?;
            println!(
                "Removed {} response(s) older than {} day(s) and {} expired scan(s)",
                removed, days, expired
            );
        }
    }
    Ok(())
}
