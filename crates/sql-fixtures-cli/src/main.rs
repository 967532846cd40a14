//! sql-fixtures CLI - load YAML fixtures into a database.

use clap::{Parser, Subcommand};
use serde::Serialize;
use sql_fixtures::core::Dialect;
use sql_fixtures::fixture::read_fixture;
use sql_fixtures::{
    connect, load_files_with_mode, parse_document, Config, DialectImpl, FixtureError, LoadSummary,
    RowStatements, TransactionMode,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "sql-fixtures")]
#[command(about = "Load YAML fixtures into PostgreSQL, MySQL or SQLite")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "fixtures.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load fixture files into the configured database
    Load {
        /// Fixture files, loaded in order [default: load.files from the config]
        files: Vec<PathBuf>,

        /// Commit each row in its own transaction
        #[arg(long)]
        per_row_transaction: bool,

        /// Expected dialect; fails if the configured database is of another type
        #[arg(long)]
        dialect: Option<String>,
    },

    /// Parse fixture files without connecting to a database
    Check {
        /// Fixture files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Dialect used to render statements
        #[arg(long, default_value = "postgres")]
        dialect: String,

        /// Print the statements each row may issue
        #[arg(long)]
        show_sql: bool,
    },

    /// Test the database connection
    HealthCheck,
}

#[derive(Serialize)]
struct FileReport {
    file: String,
    rows: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    statements: Vec<RowReport>,
}

#[derive(Serialize)]
struct RowReport {
    row: usize,
    table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_path: Option<String>,
    count: String,
    insert: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    update: Option<String>,
}

#[derive(Serialize)]
struct LoadReport {
    files: Vec<String>,
    transaction_mode: TransactionMode,
    #[serde(flatten)]
    summary: LoadSummary,
    duration_seconds: f64,
}

#[derive(Serialize)]
struct HealthReport {
    database: String,
    healthy: bool,
    latency_ms: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), FixtureError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| FixtureError::Config(e.to_string()))?;

    // check never touches a database, so it does not need a config file
    if let Commands::Check {
        files,
        dialect,
        show_sql,
    } = &cli.command
    {
        return check(files, dialect, *show_sql, cli.output_json);
    }

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Check { .. } => unreachable!(), // Handled above

        Commands::Load {
            files,
            per_row_transaction,
            dialect,
        } => {
            let configured = config.database.dialect()?;
            if let Some(expected) = dialect {
                let expected = DialectImpl::from_name(&expected)?;
                if expected.name() != configured.name() {
                    return Err(FixtureError::Config(format!(
                        "--dialect {} does not match configured database type {}",
                        expected, configured
                    )));
                }
            }

            let files = if files.is_empty() {
                config.load.files.clone()
            } else {
                files
            };
            if files.is_empty() {
                return Err(FixtureError::Config(
                    "no fixture files given and load.files is empty".to_string(),
                ));
            }

            let mode = if per_row_transaction {
                TransactionMode::PerRowTransaction
            } else {
                config.load.transaction_mode
            };

            let start = Instant::now();
            let db = connect(&config.database).await?;
            let result = load_files_with_mode(&files, db.as_ref(), configured.name(), mode).await;
            db.close().await;
            let summary = result?;

            let report = LoadReport {
                files: files.iter().map(|f| f.display().to_string()).collect(),
                transaction_mode: mode,
                summary,
                duration_seconds: start.elapsed().as_secs_f64(),
            };

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\nFixtures loaded!");
                println!("  Files: {}", report.files.len());
                println!("  Transaction mode: {}", report.transaction_mode);
                println!("  Rows inserted: {}", summary.rows_inserted);
                println!("  Rows updated: {}", summary.rows_updated);
                println!("  Sequences corrected: {}", summary.sequences_corrected);
                println!("  Duration: {:.2}s", report.duration_seconds);
            }
        }

        Commands::HealthCheck => {
            let start = Instant::now();
            let db = connect(&config.database).await?;
            db.health_check().await?;
            let report = HealthReport {
                database: config.database.display_target(),
                healthy: true,
                latency_ms: start.elapsed().as_millis() as u64,
            };
            db.close().await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Database ({}): OK ({}ms)",
                    report.database, report.latency_ms
                );
            }
        }
    }

    Ok(())
}

/// Parse fixture files and report what loading them would do.
fn check(
    files: &[PathBuf],
    dialect: &str,
    show_sql: bool,
    output_json: bool,
) -> Result<(), FixtureError> {
    let dialect = DialectImpl::from_name(dialect)?;
    let mut reports = Vec::with_capacity(files.len());

    for file in files {
        let rows = parse_document(&read_fixture(file)?)?;
        let mut statements = Vec::new();
        for (idx, row) in rows.iter().enumerate() {
            let rendered =
                RowStatements::render(&dialect, row).map_err(|e| FixtureError::row(idx + 1, e))?;
            if show_sql {
                statements.push(RowReport {
                    row: idx + 1,
                    table: row.table().to_string(),
                    search_path: rendered.search_path,
                    count: rendered.count,
                    insert: rendered.insert,
                    update: rendered.update,
                });
            }
        }
        reports.push(FileReport {
            file: file.display().to_string(),
            rows: rows.len(),
            statements,
        });
    }

    if output_json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        println!("{}: {} rows OK", report.file, report.rows);
        for row in &report.statements {
            println!("  row {} ({})", row.row, row.table);
            if let Some(sql) = &row.search_path {
                println!("    {}", sql);
            }
            println!("    {}", row.count);
            println!("    {}", row.insert);
            if let Some(sql) = &row.update {
                println!("    {}", sql);
            }
        }
    }
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("Invalid verbosity '{}'", other)),
    };

    // stdout is reserved for results
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("Invalid log format '{}'. Use text or json", other)),
    }

    Ok(())
}
