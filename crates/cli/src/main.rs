//! drift - command-line schema migration tool for PostgreSQL and MySQL.
//!
//! Flags override environment variables; a `.env` file in the working
//! directory is loaded first when present. Exit code is 0 on success and 1
//! on any error.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use drift_core::{
    AppConfig, ConnectionConfig, DatabaseDriver, DriftError, DriftResult, SslMode, StdinPrompt,
    Style,
};
use drift_engine::{creator, Command as MigrateCommand, Migrator, SqlRepository};

#[derive(Parser)]
#[command(name = "drift")]
#[command(version, about = "Schema migration tool for PostgreSQL and MySQL")]
struct Cli {
    /// Database driver (POSTGRES or MYSQL)
    #[arg(long, env = "DRIFT_DB_DRIVER")]
    dbdriver: Option<String>,

    /// Database host IP or URL
    #[arg(long, env = "DRIFT_DB_HOST")]
    host: Option<String>,

    /// Database port
    #[arg(long, env = "DRIFT_DB_PORT")]
    port: Option<u16>,

    /// Database name
    #[arg(long, env = "DRIFT_DB_NAME")]
    dbname: Option<String>,

    /// Database username
    #[arg(long, env = "DRIFT_DB_USERNAME")]
    user: Option<String>,

    /// Database password
    #[arg(long, env = "DRIFT_DB_PASSWORD")]
    password: Option<String>,

    /// Database SSL setting (disable, prefer, require)
    #[arg(long, env = "DRIFT_DB_SSL", default_value = "disable")]
    dbssl: String,

    /// Path of the migration files
    #[arg(long, env = "DRIFT_PATH", default_value = "./migrations")]
    path: PathBuf,

    /// Allow the fix command to repair migration gaps
    #[arg(long, env = "DRIFT_ALLOW_FIX")]
    allow_fix: bool,

    /// Answer confirmation prompts with yes
    #[arg(long, env = "DRIFT_SILENT")]
    silent: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: DriftCommand,
}

#[derive(Subcommand)]
enum DriftCommand {
    /// Create a new up/down migration file pair
    Create {
        /// Description; sanitized into the filename
        description: String,
    },

    /// Apply pending up migrations (all, or only the next N)
    Up {
        /// Number of migrations to apply
        count: Option<String>,
    },

    /// Roll back applied migrations (all, or only N)
    Down {
        /// Number of migrations to roll back
        count: Option<String>,
    },

    /// Migrate up to a specific version
    Upto {
        /// Target version (YYYYMMDD_HHMMSS)
        version: String,
    },

    /// Migrate down to a specific version
    Downto {
        /// Target version (YYYYMMDD_HHMMSS)
        version: String,
    },

    /// Migrate up or down as required to reach a version
    Goto {
        /// Target version (YYYYMMDD_HHMMSS)
        version: String,
    },

    /// List migration state as a table
    List {
        /// Show only the last N entries
        count: Option<usize>,
    },

    /// Print the current migration version
    Version,

    /// Repair migration gaps (requires --allow-fix)
    Fix,

    /// Set the tracked version without running any script
    Force {
        /// Target version (YYYYMMDD_HHMMSS)
        version: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        tracing::error!("{}", e);
        Style.error(&e.to_string());
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> DriftResult<()> {
    // create never touches the database, so it skips connection validation
    if let DriftCommand::Create { ref description } = cli.command {
        creator::create(&cli.path, description)?;
        return Ok(());
    }

    let config = build_config(&cli)?;
    let store = SqlRepository::new(config.driver, config.connection.clone());
    let mut migrator = Migrator::new(store, config, Box::new(StdinPrompt));

    match cli.command {
        DriftCommand::Create { .. } => unreachable!("handled above"),
        DriftCommand::Up { count } => migrator.migrate(MigrateCommand::Up, count.as_deref()).await,
        DriftCommand::Down { count } => {
            migrator.migrate(MigrateCommand::Down, count.as_deref()).await
        }
        DriftCommand::Upto { version } => {
            migrator.migrate(MigrateCommand::Upto, Some(&version)).await
        }
        DriftCommand::Downto { version } => {
            migrator.migrate(MigrateCommand::Downto, Some(&version)).await
        }
        DriftCommand::Goto { version } => {
            migrator.migrate(MigrateCommand::Goto, Some(&version)).await
        }
        DriftCommand::Force { version } => {
            migrator.migrate(MigrateCommand::Force, Some(&version)).await
        }
        DriftCommand::List { count } => migrator.list(count).await,
        DriftCommand::Version => migrator.version().await,
        DriftCommand::Fix => migrator.fix().await,
    }
}

/// Collects the connection parameters and reports every missing one in a
/// single error.
fn build_config(cli: &Cli) -> DriftResult<AppConfig> {
    let mut missing = Vec::new();
    if cli.dbdriver.is_none() {
        missing.push("dbdriver");
    }
    if cli.host.is_none() {
        missing.push("host");
    }
    if cli.port.is_none() {
        missing.push("port");
    }
    if cli.dbname.is_none() {
        missing.push("dbname");
    }
    if cli.user.is_none() {
        missing.push("user");
    }
    if cli.password.is_none() {
        missing.push("password");
    }

    if !missing.is_empty() {
        let list = missing
            .iter()
            .map(|name| format!("* {}", name))
            .collect::<Vec<_>>()
            .join("\n");
        return Err(DriftError::Config(format!(
            "config - the following required parameters are missing:\n{}\nrun drift --help for more information",
            list
        )));
    }

    let driver: DatabaseDriver = cli.dbdriver.as_deref().unwrap_or_default().parse()?;
    let ssl_mode: SslMode = cli.dbssl.parse()?;

    Ok(AppConfig {
        driver,
        connection: ConnectionConfig {
            host: cli.host.clone().unwrap_or_default(),
            port: cli.port.unwrap_or_default(),
            database: cli.dbname.clone().unwrap_or_default(),
            user: cli.user.clone().unwrap_or_default(),
            password: cli.password.clone().unwrap_or_default(),
            ssl_mode,
        },
        migrations_dir: cli.path.clone(),
        allow_fix: cli.allow_fix,
        silent_mode: cli.silent,
        verbose: cli.verbose,
    })
}
