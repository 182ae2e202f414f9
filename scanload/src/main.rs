use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use scan_sqlite::Db;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod pipeline;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat { Text, Json }

#[derive(Debug, Parser)]
#[command(name = "scanload", version, about = "Load internet-scan records into a normalized SQLite store")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./scanload.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Create the schema if it does not exist yet
    Init {
        /// Database file (default: DB_PATH, DB_NAME, config, then scan.db)
        #[arg(long, value_name = "FILE")]
        db: Option<PathBuf>,
    },
    /// Load every file of a data directory
    Load {
        /// Directory of JSON files (JSON array or one record per line)
        #[arg(long, value_name = "DIR")]
        data: Option<PathBuf>,
        /// Database file (default: DB_PATH, DB_NAME, config, then scan.db)
        #[arg(long, value_name = "FILE")]
        db: Option<PathBuf>,
        /// Surrogate key scheme; legacy matches databases filled by the old loader
        #[arg(long, value_parser = ["legacy", "hashed"])]
        key_scheme: Option<String>,
        /// Threads reading and normalizing files; inserts stay on one connection
        #[arg(long)]
        workers: Option<usize>,
        /// Log and skip malformed records and files instead of aborting
        #[arg(long, default_value_t = false)]
        skip_malformed: bool,
        /// Summary format: text or json
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _ = dotenv::dotenv();
    init_tracing(cli.verbose)?;
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    // only commands that touch the database read the config file
    let layers = || -> Result<(config::FileConfig, config::EnvConfig)> {
        Ok((config::load_config(cli.config.as_deref())?, config::EnvConfig::from_env()))
    };

    match cli.command {
        Commands::Version => {
            println!("scanload {} (core {})", env!("CARGO_PKG_VERSION"), scanload_core::version());
        }
        Commands::Init { db } => {
            let (file_cfg, env_cfg) = layers()?;
            let path = config::resolve_db_path(db.as_deref(), &env_cfg, &file_cfg);
            Db::open_or_create(&path).with_context(|| format!("opening database {}", path.display()))?;
            info!(db = %path.display(), schema = scan_sqlite::SCHEMA_VERSION, "schema ready");
        }
        Commands::Load { data, db, key_scheme, workers, skip_malformed, format } => {
            let (file_cfg, env_cfg) = layers()?;
            let overrides = config::Overrides {
                data_path: data,
                db_path: db,
                key_scheme: key_scheme.map(|s| s.parse()).transpose().map_err(anyhow::Error::msg)?,
                workers,
                skip_malformed,
            };
            let settings = config::Settings::resolve(&overrides, &env_cfg, &file_cfg)?;
            let db = Db::open_or_create(&settings.db_path)
                .with_context(|| format!("opening database {}", settings.db_path.display()))?;
            info!(db = %settings.db_path.display(), key_scheme = ?settings.key_scheme, "connected");

            let summary = pipeline::run(&db, &settings)?;
            drop(db);

            match format {
                OutputFormat::Text => println!(
                    "{} records from {} files ({} inserted, {} already present, {} records and {} files skipped); process finished in {:.3} seconds",
                    summary.records,
                    summary.files,
                    summary.statements.inserted,
                    summary.statements.already_exists,
                    summary.skipped_records,
                    summary.skipped_files,
                    summary.elapsed_secs,
                ),
                OutputFormat::Json => println!("{}", serde_json::to_string(&summary)?),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ignores_a_broken_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("scanload.yaml");
        std::fs::write(&cfg, "workers: [not, a, number\n").unwrap();
        let cfg = cfg.to_string_lossy().to_string();

        assert!(run(Cli::parse_from(["scanload", "--config", &cfg, "version"])).is_ok());

        let db = dir.path().join("scan.db").to_string_lossy().to_string();
        let err = run(Cli::parse_from(["scanload", "--config", &cfg, "init", "--db", &db])).unwrap_err();
        assert!(format!("{err:#}").contains("parsing config"), "{err:#}");
        assert!(!dir.path().join("scan.db").exists());
    }
}
