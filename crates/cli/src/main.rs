// stocktally CLI - reconcile inventory exports into SQLite, ABC-classify sales

mod abc;
mod exit_codes;
mod import;
mod logger;
mod tables;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use stocktally_config::{ConfigError, Labels, Locale, Settings};
use stocktally_io::{SalesQuery, SqliteStore};

use exit_codes::{EXIT_CONFIG, EXIT_ERROR, EXIT_STORE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "stocktally")]
#[command(about = "Keep an inventory database in step with its spreadsheet exports, and rank products by sales")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Config file (default: ./stocktally.toml, then the per-user config)
    #[arg(long, short = 'c', global = true, env = "STOCKTALLY_CONFIG")]
    config: Option<PathBuf>,

    /// Database file, overriding [database].path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Report language (en, pl), overriding `locale`
    #[arg(long, global = true)]
    locale: Option<Locale>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile tables against their export files (dedup, insert, delete)
    #[command(after_help = "\
Examples:
  stocktally import
  stocktally import Products Orders
  stocktally import --json > import-report.json
  stocktally import --create-missing --db fresh.db")]
    Import {
        /// Tables to import (default: every table in [tables], in order)
        tables: Vec<String>,

        /// Print the batch report as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Create tables that do not exist yet, using the export's columns
        #[arg(long)]
        create_missing: bool,
    },

    /// Show what an import would change, without writing
    #[command(after_help = "\
Examples:
  stocktally plan
  stocktally plan Products --json")]
    Plan {
        /// Tables to plan (default: every table in [tables])
        tables: Vec<String>,

        /// Print plans as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// ABC (Pareto) classification of products by quantity sold
    #[command(after_help = "\
Examples:
  stocktally abc
  stocktally abc --from 2024-01-01 --to 2024-03-31
  stocktally abc --from 2024-01-01 --to 2024-12-31 --export analiza_abc.xlsx --locale pl
  stocktally abc --json")]
    Abc {
        /// First order date included (default: earliest order)
        #[arg(long, value_name = "YYYY-MM-DD")]
        from: Option<NaiveDate>,

        /// Last order date included (default: latest order)
        #[arg(long, value_name = "YYYY-MM-DD")]
        to: Option<NaiveDate>,

        /// Write the classification to a .csv, .xlsx or .json file
        #[arg(long, short = 'o', value_name = "PATH")]
        export: Option<PathBuf>,

        /// Print classification and summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// List database tables and the configured export files
    #[command(after_help = "\
Examples:
  stocktally tables
  stocktally tables --json")]
    Tables {
        #[arg(long)]
        json: bool,
    },

    /// Print the rows of one table
    #[command(after_help = "\
Examples:
  stocktally show Products
  stocktally show Orders --limit 20 --json")]
    Show {
        table: String,

        /// Show at most this many rows
        #[arg(long, short = 'n')]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let (mut settings, loaded_from) = match Settings::load(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            logger::init(logger::level_for(cli.verbose, cli.quiet, None));
            return Err(CliError::config(e));
        }
    };
    logger::init(logger::level_for(cli.verbose, cli.quiet, settings.log_level.as_deref()));

    match &loaded_from {
        Some(path) => log::info!("config: {}", path.display()),
        None => log::info!("config: defaults (no stocktally.toml found)"),
    }

    if let Some(db) = cli.db {
        settings.database.path = db;
    }
    if let Some(locale) = cli.locale {
        settings.locale = locale;
    }

    let ctx = Context { settings, loaded_from };

    match cli.command {
        Commands::Import { tables, json, create_missing } => import::cmd_import(&ctx, tables, json, create_missing),
        Commands::Plan { tables, json } => import::cmd_plan(&ctx, tables, json),
        Commands::Abc { from, to, export, json } => abc::cmd_abc(&ctx, from, to, export, json),
        Commands::Tables { json } => tables::cmd_tables(&ctx, json),
        Commands::Show { table, limit, json } => tables::cmd_show(&ctx, &table, limit, json),
        Commands::Config => cmd_config(&ctx),
    }
}

/// Loaded settings plus where they came from.
pub(crate) struct Context {
    pub settings: Settings,
    pub loaded_from: Option<PathBuf>,
}

impl Context {
    pub fn labels(&self) -> &'static Labels {
        Labels::for_locale(self.settings.locale)
    }

    /// Open the configured database. Only `import` may create a new file.
    pub fn open_store(&self, create: bool) -> Result<SqliteStore, CliError> {
        let path = &self.settings.database.path;
        if !create && !path.is_file() {
            return Err(CliError::new(EXIT_STORE, format!("database not found: {}", path.display()))
                .with_hint("run `stocktally import --create-missing` to create it from the exports"));
        }
        let store = SqliteStore::open(path)
            .map_err(|e| CliError::new(EXIT_STORE, format!("cannot open {}: {e}", path.display())))?;
        Ok(store.with_sales_query(SalesQuery::new(&self.settings.sales)))
    }

    /// Tables named on the command line, or all configured ones.
    pub fn select_tables(&self, requested: Vec<String>) -> Result<Vec<String>, CliError> {
        if requested.is_empty() {
            return Ok(self.settings.table_names().into_iter().map(String::from).collect());
        }
        if let Some(unknown) = requested.iter().find(|t| self.settings.source_for(t).is_none()) {
            return Err(CliError::usage(format!("table '{unknown}' is not listed in [tables]"))
                .with_hint(format!("configured tables: {}", self.settings.table_names().join(", "))));
        }
        Ok(requested)
    }
}

fn cmd_config(ctx: &Context) -> Result<(), CliError> {
    let text = ctx
        .settings
        .to_toml()
        .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
    match &ctx.loaded_from {
        Some(path) => println!("# loaded from {}", path.display()),
        None => println!("# defaults; save as {} to customize", stocktally_config::settings::LOCAL_FILE),
    }
    print!("{text}");
    Ok(())
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn config(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::Read { .. } => Some("pass --config with an existing file, or omit it to use defaults".to_string()),
            _ => None,
        };
        Self { code: EXIT_CONFIG, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Serialize `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
    println!("{text}");
    Ok(())
}
