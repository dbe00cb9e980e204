//! CLI command definitions, routing, and tracing setup.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use prospector_core::{
    CompanyState, ContactSink, Pipeline, ProgressReporter, RunReport, RunStatus,
};
use prospector_search::{AnymailfinderClient, EmailFinder, HtmlSearchClient, SearchProvider, SerperClient};
use prospector_shared::{
    AppConfig, CompanyRecord, DecisionMaker, PipelineConfig, ProspectorError, SearchBackend,
    init_config, load_config, resolve_api_key,
};
use prospector_storage::Storage;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Prospector — find decision-makers from company email addresses.
#[derive(Parser)]
#[command(
    name = "prospector",
    version,
    about = "Discover decision-maker contacts for a list of companies, starting from their email addresses.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run discovery over a JSON array of companies.
    Run(RunArgs),

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Persistent lookup cache.
    Cache {
        /// Cache database path (defaults to the configured one).
        #[arg(long, global = true)]
        cache_db: Option<String>,

        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show recent runs recorded in the cache database.
    Runs {
        /// Number of runs to show.
        #[arg(short, long, default_value = "10")]
        limit: u32,

        /// Cache database path (defaults to the configured one).
        #[arg(long)]
        cache_db: Option<String>,
    },
}

#[derive(Args)]
pub(crate) struct RunArgs {
    /// JSON file containing an array of company records.
    #[arg(short, long)]
    input: PathBuf,

    /// Write contacts as JSON lines to this file instead of stdout.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Persist lookups and run history to this database.
    #[arg(long)]
    cache_db: Option<String>,

    /// Companies processed concurrently.
    #[arg(long)]
    company_concurrency: Option<usize>,

    /// Emails processed concurrently per company.
    #[arg(long)]
    email_concurrency: Option<usize>,

    /// Overall run deadline in seconds (0 disables it).
    #[arg(long)]
    timeout_secs: Option<u64>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Cache subcommands.
#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Show entry counts.
    Stats,
    /// Drop cached website and email lookups (run history is kept).
    Clear,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries contacts.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "prospector=info",
        1 => "prospector=debug",
        _ => "prospector=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => cmd_run(args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
        Command::Cache { cache_db, action } => match action {
            CacheAction::Stats => cmd_cache_stats(cache_db.as_deref()).await,
            CacheAction::Clear => cmd_cache_clear(cache_db.as_deref()).await,
        },
        Command::Runs { limit, cache_db } => cmd_runs(limit, cache_db.as_deref()).await,
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(args: RunArgs) -> Result<()> {
    // Missing keys are fatal before any work starts.
    let config = load_config()?;
    let search = build_search(&config)?;
    let finder = build_finder(&config)?;

    let pipeline_config = apply_overrides(PipelineConfig::from(&config), &args)?;
    let companies = read_companies(&args.input)?;

    let mut pipeline = Pipeline::new(pipeline_config, search, finder);
    let cache_path = match args.cache_db.as_deref() {
        Some(path) => Some(PathBuf::from(path)),
        None if config.cache.persist => Some(config.cache_path()?),
        None => None,
    };
    if let Some(path) = &cache_path {
        let storage = Storage::open(path)
            .await
            .wrap_err_with(|| format!("failed to open cache database {}", path.display()))?;
        pipeline = pipeline.with_storage(Arc::new(storage));
    }

    info!(
        input = %args.input.display(),
        companies = companies.len(),
        backend = ?config.search.backend,
        cache = cache_path.is_some(),
        "starting discovery"
    );

    let sink = JsonlSink::open(args.out.as_deref())?;
    let reporter = CliProgress::new();
    let report = pipeline.run(companies, &sink, &reporter).await?;
    sink.flush()?;

    print_summary(&report, args.out.as_deref());
    Ok(())
}

fn build_search(config: &AppConfig) -> Result<Arc<dyn SearchProvider>> {
    let base_url = config.search.base_url.as_deref();
    let search: Arc<dyn SearchProvider> = match config.search.backend {
        SearchBackend::Serper => {
            let key = resolve_api_key(&config.search.api_key_env)?;
            let client = SerperClient::new(key)?;
            Arc::new(match base_url {
                Some(url) => client.with_base_url(url),
                None => client,
            })
        }
        SearchBackend::Html => {
            let client = HtmlSearchClient::new()?;
            Arc::new(match base_url {
                Some(url) => client.with_base_url(url),
                None => client,
            })
        }
    };
    Ok(search)
}

fn build_finder(config: &AppConfig) -> Result<Arc<dyn EmailFinder>> {
    let key = resolve_api_key(&config.email_finder.api_key_env)?;
    let client = AnymailfinderClient::new(key)?;
    let client = match config.email_finder.base_url.as_deref() {
        Some(url) => client.with_base_url(url),
        None => client,
    };
    Ok(Arc::new(client))
}

fn apply_overrides(mut config: PipelineConfig, args: &RunArgs) -> Result<PipelineConfig> {
    if let Some(n) = args.company_concurrency {
        if n == 0 {
            return Err(eyre!("--company-concurrency must be at least 1"));
        }
        config.company_concurrency = n;
    }
    if let Some(n) = args.email_concurrency {
        if n == 0 {
            return Err(eyre!("--email-concurrency must be at least 1"));
        }
        config.email_concurrency = n;
    }
    if let Some(secs) = args.timeout_secs {
        config.run_timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }
    Ok(config)
}

fn read_companies(path: &Path) -> Result<Vec<CompanyRecord>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ProspectorError::io(path, e))?;
    let companies: Vec<CompanyRecord> = serde_json::from_str(&content)
        .wrap_err_with(|| format!("{} is not a JSON array of company records", path.display()))?;

    let unnamed = companies.iter().filter(|c| c.name.trim().is_empty()).count();
    if unnamed > 0 {
        warn!(count = unnamed, "input contains records without a company name");
    }
    Ok(companies)
}

fn print_summary(report: &RunReport, out: Option<&Path>) {
    let s = &report.summary;
    let status = match report.status {
        RunStatus::Complete => "complete",
        RunStatus::PartialSuccess => "partial success",
        RunStatus::NoResults => "no results",
    };

    eprintln!();
    eprintln!("  Run {} finished: {status}", report.run_id);
    eprintln!("  Companies:        {}", s.companies);
    eprintln!("  No website:       {}", s.no_website);
    eprintln!("  No emails:        {}", s.no_emails);
    eprintln!("  Emails checked:   {}", s.emails);
    eprintln!("  Generic skipped:  {}", s.skipped_generic);
    eprintln!("  Low confidence:   {}", s.skipped_low_confidence);
    eprintln!("  No profile:       {}", s.no_person_match);
    eprintln!("  Title rejected:   {}", s.rejected_title);
    eprintln!("  Duplicates:       {}", s.duplicates);
    eprintln!("  Provider errors:  {}", s.provider_errors);
    if report.timed_out {
        eprintln!("  Abandoned:        {} (deadline reached)", s.abandoned);
    }
    eprintln!("  Decision-makers:  {}", s.accepted);
    if let Some(path) = out {
        eprintln!("  Output:           {}", path.display());
    }
    eprintln!("  Time:             {:.1}s", report.elapsed.as_secs_f64());
    eprintln!();
}

// ---------------------------------------------------------------------------
// Output sink
// ---------------------------------------------------------------------------

/// Writes one JSON object per contact to a file or stdout.
struct JsonlSink {
    label: PathBuf,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonlSink {
    fn open(path: Option<&Path>) -> Result<Self> {
        let (label, writer): (PathBuf, Box<dyn Write + Send>) = match path {
            Some(path) => {
                let file = File::create(path).map_err(|e| ProspectorError::io(path, e))?;
                (path.to_path_buf(), Box::new(BufWriter::new(file)))
            }
            None => (PathBuf::from("<stdout>"), Box::new(std::io::stdout())),
        };
        Ok(Self {
            label,
            writer: Mutex::new(writer),
        })
    }

    fn flush(&self) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| eyre!("output writer poisoned"))?;
        writer
            .flush()
            .map_err(|e| ProspectorError::io(&self.label, e))?;
        Ok(())
    }
}

impl ContactSink for JsonlSink {
    fn accept(&self, contact: &DecisionMaker) -> prospector_shared::Result<()> {
        let line = serde_json::to_string(contact)
            .map_err(|e| ProspectorError::parse(e.to_string()))?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| ProspectorError::validation("output writer poisoned"))?;
        writeln!(writer, "{line}").map_err(|e| ProspectorError::io(&self.label, e))
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn company_finished(&self, company: &str, state: CompanyState, finished: usize, total: usize) {
        let outcome = match state {
            CompanyState::NoWebsite => "no website",
            CompanyState::NoEmails => "no emails",
            CompanyState::Processed => "done",
        };
        self.spinner
            .set_message(format!("[{finished}/{total}] {company}: {outcome}"));
    }

    fn contact_found(&self, contact: &DecisionMaker) {
        self.spinner.println(format!(
            "  + {} ({}) at {}",
            contact.full_name, contact.title, contact.company_name
        ));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// config / cache / runs
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn cache_path(cache_db: Option<&str>) -> Result<PathBuf> {
    match cache_db {
        Some(path) => Ok(PathBuf::from(path)),
        None => Ok(load_config()?.cache_path()?),
    }
}

async fn cmd_cache_stats(cache_db: Option<&str>) -> Result<()> {
    let path = cache_path(cache_db)?;
    if !path.exists() {
        println!("No cache database at {}", path.display());
        return Ok(());
    }

    let storage = Storage::open_readonly(&path).await?;
    let stats = storage.cache_stats().await?;
    println!("  Cache:    {}", path.display());
    println!("  Websites: {}", stats.website_entries);
    println!("  Emails:   {}", stats.email_entries);
    println!("  Runs:     {}", stats.runs);
    println!("  Contacts: {}", stats.contacts);
    Ok(())
}

async fn cmd_cache_clear(cache_db: Option<&str>) -> Result<()> {
    let path = cache_path(cache_db)?;
    if !path.exists() {
        println!("No cache database at {}", path.display());
        return Ok(());
    }

    let storage = Storage::open(&path).await?;
    storage.clear_cache().await?;
    info!(path = %path.display(), "cache cleared");
    println!("Cleared cached lookups in {}", path.display());
    Ok(())
}

async fn cmd_runs(limit: u32, cache_db: Option<&str>) -> Result<()> {
    let path = cache_path(cache_db)?;
    if !path.exists() {
        println!("No cache database at {}", path.display());
        return Ok(());
    }

    let storage = Storage::open_readonly(&path).await?;
    let runs = storage.list_runs(limit).await?;
    if runs.is_empty() {
        println!("No runs recorded.");
        return Ok(());
    }

    println!("{:<38} {:<22} {:<16} {:>8}", "RUN", "STARTED", "STATUS", "CONTACTS");
    for run in runs {
        println!(
            "{:<38} {:<22} {:<16} {:>8}",
            run.id,
            run.started_at,
            run.status.as_deref().unwrap_or("running"),
            run.contacts
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["prospector", "run", "--input", "companies.json"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Run(args) => args,
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn flags_override_config() {
        let args = run_args(&[
            "--company-concurrency",
            "8",
            "--email-concurrency",
            "2",
            "--timeout-secs",
            "0",
        ]);
        let config = apply_overrides(PipelineConfig::default(), &args).unwrap();
        assert_eq!(config.company_concurrency, 8);
        assert_eq!(config.email_concurrency, 2);
        assert_eq!(config.run_timeout, None);
    }

    #[test]
    fn zero_width_is_rejected() {
        let args = run_args(&["--company-concurrency", "0"]);
        assert!(apply_overrides(PipelineConfig::default(), &args).is_err());
    }

    #[test]
    fn reads_company_array() {
        let path = std::env::temp_dir().join(format!("prospector_input_{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"name": "Acme Co", "location": "Toronto"}, {"name": "Beta", "website": "beta.io"}]"#,
        )
        .unwrap();
        let companies = read_companies(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(companies.len(), 2);
        assert_eq!(companies[1].website.as_deref(), Some("beta.io"));
    }

    #[test]
    fn jsonl_sink_writes_one_line_per_contact() {
        let path = std::env::temp_dir().join(format!("prospector_out_{}.jsonl", std::process::id()));
        let sink = JsonlSink::open(Some(&path)).unwrap();
        let contact = DecisionMaker {
            company_name: "Acme Co".into(),
            full_name: "John Doe".into(),
            title: "CFO".into(),
            email: "john.doe@acme.com".into(),
            profile_url: "https://www.linkedin.com/in/johndoe".into(),
            domain: "acme.com".into(),
            industry: None,
            confidence: 0.95,
            found_at: chrono::Utc::now(),
        };
        sink.accept(&contact).unwrap();
        sink.accept(&contact).unwrap();
        sink.flush().unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: DecisionMaker = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.full_name, "John Doe");
    }
}
