use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use walkdir::WalkDir;

use sqlsem_core::{
    ConfidenceLevel, Config, Origin, Report, ReportEntry, Severity, SqlSemantics,
};
use sqlsem_sql::{join_edges, MetadataBundle, SqlExtractor};

/// Default config file looked up in the working directory
const DEFAULT_CONFIG_FILE: &str = "sqlsem.toml";

/// Environment variable naming a config file
const CONFIG_ENV_VAR: &str = "SQLSEM_CONFIG";

/// sqlsem - table, join and column extraction for embedded SQL commands
#[derive(Parser)]
#[command(name = "sqlsem")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: $SQLSEM_CONFIG, then sqlsem.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract one statement from a file or stdin
    Extract {
        /// SQL file to read ("-" or omitted for stdin)
        input: Option<PathBuf>,

        /// Package file recorded as the statement's origin
        #[arg(long)]
        file_path: Option<String>,

        /// Property that held the SQL text
        #[arg(long, default_value = "SqlCommand")]
        property: String,

        /// XML location of the property inside the package
        #[arg(long)]
        xml_location: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Extract every .sql file under a directory into a report
    Scan {
        /// Directory to walk
        dir: PathBuf,

        /// Output file for report.json
        #[arg(short, long, default_value = "report.json")]
        output: PathBuf,

        /// Fail when any statement falls below this level (error diagnostics always fail)
        #[arg(long, default_value = "low")]
        min_confidence: ConfidenceLevel,
    },

    /// Write a default sqlsem.toml
    InitConfig {
        /// Destination (default: sqlsem.toml)
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::InitConfig { path } => init_config_command(path.as_deref(), cli.verbose),
        Commands::Extract {
            input,
            file_path,
            property,
            xml_location,
            format,
        } => {
            let config = load_config(cli.config.as_deref(), cli.verbose)?;
            let mut origin = Origin::new(
                file_path.unwrap_or_else(|| input_label(input.as_deref())),
                property,
            );
            if let Some(location) = xml_location {
                origin = origin.with_xml_location(location);
            }
            extract_command(config, input.as_deref(), origin, format)
        }
        Commands::Scan {
            dir,
            output,
            min_confidence,
        } => {
            let config = load_config(cli.config.as_deref(), cli.verbose)?;
            scan_command(config, &dir, &output, min_confidence, cli.verbose).await
        }
    }
}

/// Log to stderr; RUST_LOG wins over --verbose
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Config from --config, then $SQLSEM_CONFIG, then ./sqlsem.toml, then defaults
fn load_config(explicit: Option<&Path>, verbose: bool) -> Result<Config> {
    let from_env = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
    let path = match (explicit, from_env) {
        (Some(path), _) => Some(path.to_path_buf()),
        (None, Some(path)) => Some(path),
        (None, None) => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
    };

    let Some(path) = path else {
        if verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        return Ok(Config::default());
    };

    let config = Config::from_file(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    if verbose {
        eprintln!("{} {}", "Loaded config from:".cyan(), path.display());
        eprintln!("{} dialect: {:?}", "Using".cyan(), config.dialect);
    }
    Ok(config)
}

fn input_label(input: Option<&Path>) -> String {
    match input {
        Some(path) if path != Path::new("-") => path.display().to_string(),
        _ => "<stdin>".to_string(),
    }
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read SQL file {}", path.display())),
        _ => {
            let mut sql = String::new();
            std::io::stdin()
                .read_to_string(&mut sql)
                .context("Failed to read SQL from stdin")?;
            Ok(sql)
        }
    }
}

/// Extract command - one statement to stdout
fn extract_command(config: Config, input: Option<&Path>, origin: Origin, format: OutputFormat) -> Result<()> {
    let sql = read_input(input)?;
    let thresholds = config.confidence.clone();
    let extraction = SqlExtractor::with_config(config).extract_with_origin(Some(&sql), origin);

    match format {
        OutputFormat::Json => {
            let bundle = MetadataBundle::new(&extraction.semantics, &extraction.origin, &thresholds);
            let output = serde_json::json!({
                "properties": bundle.to_properties()?,
                "edges": join_edges(&extraction.semantics),
                "diagnostics": extraction.semantics.diagnostics,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            let level = extraction.semantics.confidence_level(&thresholds);
            print_semantics(&extraction.origin, &extraction.semantics, level);
        }
    }

    Ok(())
}

/// All `*.sql` files under `dir`, sorted by path
fn collect_sql_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        let is_sql = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"));
        if entry.file_type().is_file() && is_sql {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Scan command - every .sql file under a directory
async fn scan_command(
    config: Config,
    dir: &Path,
    output: &Path,
    min_confidence: ConfidenceLevel,
    verbose: bool,
) -> Result<()> {
    if verbose {
        eprintln!("{} {}", "Scanning".cyan(), dir.display());
    }

    let files = collect_sql_files(dir)?;
    let thresholds = config.confidence.clone();
    let extractor = Arc::new(SqlExtractor::with_config(config));

    let handles: Vec<_> = files
        .into_iter()
        .map(|path| {
            let extractor = Arc::clone(&extractor);
            tokio::task::spawn_blocking(move || -> Result<(Origin, SqlSemantics)> {
                let sql = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read SQL file {}", path.display()))?;
                let origin = Origin::new(path.display().to_string(), "SqlCommand");
                Ok((origin, extractor.extract(Some(&sql))))
            })
        })
        .collect();

    // Awaiting in spawn order keeps the report sorted by path
    let mut entries = Vec::with_capacity(handles.len());
    for handle in handles {
        let (origin, semantics) = handle.await.context("Extraction task panicked")??;
        let confidence_level = semantics.confidence_level(&thresholds);
        if verbose {
            eprintln!("  {} {} ({})", "Extracted".cyan(), origin.file_path, colored_level(confidence_level));
        }
        entries.push(ReportEntry {
            origin,
            confidence_level,
            semantics,
        });
    }

    let report = Report::from_entries(entries);
    report
        .save_to_file(output)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    if verbose {
        eprintln!("{} {}", "Report saved to:".green(), output.display());
    }

    print_report_summary(&report, min_confidence);

    if scan_failed(&report, min_confidence) {
        std::process::exit(1);
    }

    Ok(())
}

/// A scan fails on any error diagnostic or any statement below the minimum level
fn scan_failed(report: &Report, min_confidence: ConfidenceLevel) -> bool {
    report.has_errors() || report.below(min_confidence).next().is_some()
}

/// Init-config command - write the default configuration
fn init_config_command(path: Option<&Path>, verbose: bool) -> Result<()> {
    let path = path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
    if path.exists() {
        return Err(anyhow::anyhow!("{} already exists; not overwriting", path.display()));
    }

    Config::default()
        .save_to_file(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    if verbose {
        eprintln!("{} {}", "Config written to:".green(), path.display());
    } else {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn colored_level(level: ConfidenceLevel) -> colored::ColoredString {
    match level {
        ConfidenceLevel::High => level.as_str().green(),
        ConfidenceLevel::Medium => level.as_str().yellow(),
        ConfidenceLevel::Low => level.as_str().red().bold(),
    }
}

fn colored_severity(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Error => "ERROR".red().bold(),
        Severity::Warn => "WARN".yellow().bold(),
        Severity::Info => "INFO".cyan(),
    }
}

/// Print one statement's extraction to stdout
fn print_semantics(origin: &Origin, semantics: &SqlSemantics, level: ConfidenceLevel) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "SQL Reference Extraction".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("{} {} ({})", "Origin:".bold(), origin.file_path, origin.property_name);
    if let Some(location) = &origin.xml_location {
        println!("{} {}", "Location:".bold(), location);
    }
    println!("{} {}", "Statement:".bold(), semantics.statement_kind);
    println!(
        "{} {:.2} ({})",
        "Confidence:".bold(),
        semantics.confidence,
        colored_level(level)
    );
    println!();

    println!("{}", "Tables:".bold());
    for table in &semantics.tables {
        match &table.alias {
            Some(alias) => println!("  {}. {} {}", table.appearance_order, table.full_name().green(), alias),
            None => println!("  {}. {}", table.appearance_order, table.full_name().green()),
        }
    }

    if !semantics.joins.is_empty() {
        println!();
        println!("{}", "Joins:".bold());
        for join in &semantics.joins {
            let Some((left, right)) = semantics.join_tables(join) else {
                continue;
            };
            println!(
                "  {} {} {}",
                left.display_name(),
                join.join_kind.as_sql().yellow(),
                right.display_name()
            );
            if let Some(condition) = &join.condition_text {
                println!("    ON {}", condition);
            }
        }
    }

    if !semantics.columns.is_empty() {
        println!();
        println!("{}", "Columns:".bold());
        for column in &semantics.columns {
            match &column.alias {
                Some(alias) => println!("  {} AS {}", column.expression, alias.green()),
                None => println!("  {}", column.expression),
            }
        }
    }

    if !semantics.diagnostics.is_empty() {
        println!();
        println!("{}", "Diagnostics:".bold());
        for diag in &semantics.diagnostics {
            println!("  [{}] {}: {}", colored_severity(diag.severity), diag.code, diag.message);
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

/// Print report summary to stdout
fn print_report_summary(report: &Report, min_confidence: ConfidenceLevel) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "SQL Extraction Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    println!();

    let summary = &report.summary;
    println!("{}", "Summary:".bold());
    println!("  Statements: {}", summary.statements);
    println!("  Tables:     {}", summary.tables);
    println!("  Joins:      {}", summary.joins);
    println!("  Columns:    {}", summary.columns);
    println!();
    println!("  High confidence:   {}", summary.high_confidence.to_string().green());
    println!("  Medium confidence: {}", summary.medium_confidence.to_string().yellow());
    if summary.low_confidence > 0 {
        println!("  Low confidence:    {}", summary.low_confidence.to_string().red().bold());
    } else {
        println!("  Low confidence:    {}", summary.low_confidence.to_string().green());
    }
    println!();

    let flagged: Vec<_> = report.below(min_confidence).collect();
    if flagged.is_empty() {
        println!("{}", format!("✓ All statements at or above {} confidence", min_confidence).green().bold());
    } else {
        println!("{}", format!("Statements below {} confidence:", min_confidence).bold());
        for entry in flagged {
            println!(
                "  {} ({:.2}, {})",
                entry.origin.file_path.yellow(),
                entry.semantics.confidence,
                colored_level(entry.confidence_level)
            );
            for diag in entry.semantics.diagnostics.iter().filter(|d| d.severity != Severity::Info) {
                println!("    [{}] {}: {}", colored_severity(diag.severity), diag.code, diag.message);
            }
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}
