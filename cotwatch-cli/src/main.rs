//! cotwatch CLI — incremental market-data updates from the command line.
//!
//! Commands:
//! - `sources` — list every registered source with its title and atoms
//! - `update` — bring named sources (and their dependents) up to date
//! - `update-all` — run the "Update all" composite group
//! - `config` — print a source's display configuration as JSON
//! - `show` — dump a source's stored rows, optionally clipped to a window
//!
//! Publisher endpoints and the store location come from a TOML config file;
//! a missing file means built-in defaults.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use cotwatch_core::sources::{daily, monetary, quotes, weekly};
use cotwatch_core::store::{Schema, Value};
use cotwatch_core::{AppConfig, Env, Registry, UpdateManager, UpdateResult};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cotwatch",
    about = "cotwatch CLI — commodity-futures market-data tracker"
)]
struct Cli {
    /// Path to the TOML config file. Built-in defaults when absent.
    #[arg(long, default_value = "cotwatch.toml")]
    config: PathBuf,

    /// Pretend today is this date (YYYY-MM-DD); useful for replays.
    #[arg(long)]
    today: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered source with its title and atoms.
    Sources,
    /// Bring the named sources (and their dependents) up to date.
    Update {
        /// Source names, as shown by `sources`.
        #[arg(required = true)]
        sources: Vec<String>,
    },
    /// Update every source family, skipping unreachable publishers.
    UpdateAll,
    /// Print a source's display configuration as JSON.
    Config {
        /// Source name, as shown by `sources`.
        source: String,
    },
    /// Dump a source's stored rows.
    Show {
        /// Source name, as shown by `sources`.
        source: String,

        /// First date to include (YYYY-MM-DD).
        #[arg(long)]
        begin: Option<String>,

        /// Last date to include (YYYY-MM-DD).
        #[arg(long)]
        end: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;

    let mut env = Env::new(config);
    if let Some(today) = &cli.today {
        let today = NaiveDate::parse_from_str(today, "%Y-%m-%d")
            .context("--today must be YYYY-MM-DD")?;
        env = env.with_today(today);
    }

    let mut manager = UpdateManager::new(&env, &Registry::standard());

    match cli.command {
        Commands::Sources => run_sources(&manager),
        Commands::Update { sources } => run_update(&mut manager, &sources),
        Commands::UpdateAll => run_update(&mut manager, &["Update all".to_string()]),
        Commands::Config { source } => run_config(&manager, &source),
        Commands::Show { source, begin, end } => run_show(&env, &source, begin, end),
    }
}

fn run_sources(manager: &UpdateManager) -> Result<()> {
    println!("{:<20} {:<30} Atoms", "Name", "Title");
    println!("{}", "-".repeat(70));
    for info in manager.sources() {
        let atoms = manager
            .config(&info.name)
            .map(|c| c.atoms.join(", "))
            .unwrap_or_default();
        println!("{:<20} {:<30} {atoms}", info.name, info.title);
    }
    Ok(())
}

fn run_update(manager: &mut UpdateManager, sources: &[String]) -> Result<()> {
    let mut written = Vec::new();
    for source in sources {
        let results = manager
            .update_source(source)
            .with_context(|| format!("updating {source}"))?;

        if results.is_empty() {
            println!("{source}: already up to date");
            continue;
        }
        for result in &results {
            print_result(result);
        }
        written.extend(results);
    }

    if !written.is_empty() {
        println!("Done. {} source(s) written.", distinct_sources(&written));
    }
    Ok(())
}

/// Dependency fan-out can report the same source more than once; the summary
/// counts each written source once.
fn distinct_sources(results: &[UpdateResult]) -> usize {
    results
        .iter()
        .map(|r| r.source.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

fn run_config(manager: &UpdateManager, source: &str) -> Result<()> {
    let config = manager.config(source)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn run_show(env: &Env, source: &str, begin: Option<String>, end: Option<String>) -> Result<()> {
    let Some(schema) = schema_for(env, source) else {
        bail!("'{source}' has no stored table; run `cotwatch sources` for the catalogue");
    };

    let begin = parse_date(begin.as_deref())?;
    let end = parse_date(end.as_deref())?;

    let table = env.table(source, schema.clone());
    let rows = table.read(begin, end)?;
    if rows.is_empty() {
        println!("{source}: no stored rows in the requested window");
        return Ok(());
    }

    let header: Vec<String> = std::iter::once("Date".to_string())
        .chain(schema.atoms())
        .collect();
    println!("{}", header.join("\t"));
    for row in &rows {
        let cells: Vec<String> = std::iter::once(row.date.to_string())
            .chain(row.values.iter().map(format_value))
            .collect();
        println!("{}", cells.join("\t"));
    }
    println!("{} row(s)", rows.len());
    Ok(())
}

/// The persisted schema for a named source; `None` for composites and
/// unregistered names.
fn schema_for(env: &Env, source: &str) -> Option<Schema> {
    match source {
        monetary::MONETARY => Some(monetary::schema()),
        monetary::MONETARY_DELTA => Some(monetary::delta_schema()),
        weekly::CFTC_FUTURES_ONLY | weekly::ICE_FUTURES_ONLY => Some(weekly::schema()),
        _ if env.config().daily.iter().any(|b| b.name == source) => Some(daily::schema()),
        _ if env.config().quotes.iter().any(|q| q.name == source) => Some(quotes::schema()),
        _ => None,
    }
}

fn parse_date(text: Option<&str>) -> Result<Option<NaiveDate>> {
    text.map(|t| {
        NaiveDate::parse_from_str(t, "%Y-%m-%d").with_context(|| format!("bad date '{t}'"))
    })
    .transpose()
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Float(v) => format!("{v}"),
        Value::Int(v) => v.to_string(),
        Value::Text(v) => v.clone(),
    }
}

fn print_result(result: &UpdateResult) {
    let (first, last) = result.range;
    println!("{:<20} wrote {first} to {last}", result.source);
}
