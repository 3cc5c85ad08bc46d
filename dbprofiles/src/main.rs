//! Command-line front end for dbprofiles.
//!
//! Manages named database connection profiles stored in a sectioned
//! configuration file, and can run as a line-oriented JSON service that a
//! graphical front end drives with intent messages.
//!
//! # Security Guarantees
//! - Passwords are never logged or echoed
//! - `--ask-password` reads the password without terminal echo
//! - Connection strings in error output are redacted

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use dbprofiles_core::{
    ConnectionRegistry, ConnectorManager, ManagerConfig, ProfileError, RegistryConfig,
    Response, SaveRequest, SqlxRegistry, config::CONFIG_PATH_ENV, init_logging,
    intent::handle_message, templates,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};

#[cfg(not(any(feature = "postgresql", feature = "mysql", feature = "sqlite")))]
compile_error!("enable at least one backend feature: postgresql, mysql or sqlite");

#[derive(Parser)]
#[command(name = "dbprofiles")]
#[command(about = "Manage named database connection profiles")]
#[command(version)]
#[command(long_about = "
dbprofiles - named database connection profiles

Profiles are stored as sections of a plain-text configuration file:

  [pg]
  username = user
  password = pass
  host = db.example.com
  database = mydb
  drivername = postgresql
  port = 5432

A profile is only saved after a connection to it succeeds, unless
--no-connect is given.

SUPPORTED LIVE CONNECTIONS:
- PostgreSQL and Redshift (postgresql, redshift+redshift_connector)
- MySQL and MariaDB (mysql+pymysql, mariadb) [if compiled with --features mysql]
- SQLite (sqlite)

Other drivers (duckdb, snowflake, oracle+oracledb, mssql+pyodbc) can be
stored with --no-connect.

EXAMPLES:
  dbprofiles save --name scratch --driver sqlite --database :memory:
  dbprofiles save --name pg --driver postgresql --host localhost --username me --ask-password
  dbprofiles list
  dbprofiles serve < intents.jsonl
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,

    /// Profile configuration file
    #[arg(
        long,
        env = CONFIG_PATH_ENV,
        default_value = dbprofiles_core::config::DEFAULT_CONFIG_FILE,
        help = "Path of the connection profile file"
    )]
    pub config_file: PathBuf,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value = "30",
        help = "Seconds to wait for a connection before giving up"
    )]
    pub connect_timeout: u64,
}

#[derive(Subcommand)]
pub enum Command {
    /// List stored profiles
    List(ListArgs),
    /// Check whether the profile file exists
    Check,
    /// Print the driver template table as JSON
    Templates,
    /// Connect to a stored profile
    Connect(ConnectArgs),
    /// Create or edit a profile, connecting to it first
    Save(SaveArgs),
    /// Delete a stored profile
    Delete(DeleteArgs),
    /// Serve intent messages as JSON lines on stdin/stdout
    Serve,
}

#[derive(Args)]
pub struct ListArgs {
    /// Print as JSON
    #[arg(long, help = "Print profiles as a JSON array")]
    pub json: bool,
}

#[derive(Args)]
pub struct ConnectArgs {
    /// Profile alias
    #[arg(help = "Alias of the stored profile")]
    pub alias: String,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Profile alias
    #[arg(help = "Alias of the stored profile to delete")]
    pub alias: String,
}

#[derive(Args)]
pub struct SaveArgs {
    /// Profile alias
    #[arg(long, help = "Alias to save the profile under")]
    pub name: String,

    /// Driver identifier
    #[arg(long, help = "Driver identifier, e.g. postgresql or mysql+pymysql")]
    pub driver: String,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(
        long,
        conflicts_with = "ask_password",
        help = "Password (prefer --ask-password; command lines are visible to other users)"
    )]
    pub password: Option<String>,

    #[arg(long, help = "Prompt for the password without echo")]
    pub ask_password: bool,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long, help = "Database name, or file path for embedded engines")]
    pub database: Option<String>,

    #[arg(long, help = "Port; defaults to the driver's usual port when a host is given")]
    pub port: Option<String>,

    /// Alias being edited
    #[arg(long, help = "Alias of the profile being edited (renames it to --name)")]
    pub existing: Option<String>,

    #[arg(long, help = "Save without attempting a connection")]
    pub no_connect: bool,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all output except errors")]
    pub quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    let config = ManagerConfig::default()
        .with_config_path(cli.config_file.clone())
        .with_registry(
            RegistryConfig::default().with_connect_timeout(Duration::from_secs(cli.connect_timeout)),
        );
    let registry = SqlxRegistry::new(config.registry.clone())?;
    let mut manager = ConnectorManager::new(&config, registry)?;

    let result = run(&cli.command, &mut manager).await;
    manager.close_all().await;
    result
}

async fn run<R: ConnectionRegistry>(
    command: &Command,
    manager: &mut ConnectorManager<R>,
) -> anyhow::Result<()> {
    match command {
        Command::List(args) => list_profiles(manager, args.json),
        Command::Check => {
            let present = manager.config_file_present();
            println!("{}", present);
            if !present {
                info!(
                    "No profile file at {}",
                    manager.store().path().display()
                );
            }
            Ok(())
        }
        Command::Templates => {
            println!("{}", templates::to_json());
            Ok(())
        }
        Command::Connect(args) => {
            manager.connect_existing(&args.alias).await.map_err(report)?;
            println!("Connected to '{}'", args.alias);
            Ok(())
        }
        Command::Save(args) => {
            let request = save_request(args)?;
            let alias = manager
                .save_and_connect(&request, request.options())
                .await
                .map_err(report)?;
            println!("Saved '{}' to {}", alias, manager.store().path().display());
            Ok(())
        }
        Command::Delete(args) => {
            manager.delete_profile(&args.alias).map_err(report)?;
            println!("Deleted '{}'", args.alias);
            Ok(())
        }
        Command::Serve => serve(manager).await,
    }
}

fn list_profiles<R: ConnectionRegistry>(
    manager: &ConnectorManager<R>,
    json: bool,
) -> anyhow::Result<()> {
    let profiles = manager.list_profiles().map_err(report)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&profiles)?);
        return Ok(());
    }
    if profiles.is_empty() {
        println!("No stored connections in {}", manager.store().path().display());
    }
    for profile in &profiles {
        println!("{:<24} {}", profile.name, profile.driver);
    }
    Ok(())
}

/// Builds a save request from CLI flags, prompting for the password if asked.
fn save_request(args: &SaveArgs) -> anyhow::Result<SaveRequest> {
    let mut request = SaveRequest::new(args.name.clone(), args.driver.clone());
    request.username = args.username.clone();
    request.host = args.host.clone();
    request.database = args.database.clone();
    request.existing_connection_alias = args.existing.clone();
    request.attempt_connection = Some(!args.no_connect);

    request.password = if args.ask_password {
        Some(rpassword::prompt_password("Password: ").context("Failed to read password")?)
    } else {
        args.password.clone()
    };

    request.port = match (&args.port, &args.host) {
        (Some(port), _) => Some(serde_json::Value::String(port.clone())),
        (None, Some(_)) => templates::by_driver(&args.driver)
            .and_then(|template| template.default_port())
            .map(serde_json::Value::from),
        (None, None) => None,
    };
    Ok(request)
}

/// Reads one intent per stdin line and writes one response per stdout line.
async fn serve<R: ConnectionRegistry>(manager: &mut ConnectorManager<R>) -> anyhow::Result<()> {
    info!(
        "Serving intents for {}",
        manager.store().path().display()
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let responses = match serde_json::from_str::<serde_json::Value>(&line) {
            Ok(message) => handle_message(manager, &message).await,
            Err(e) => vec![Response::from_error(&ProfileError::protocol(format!(
                "Invalid JSON: {}",
                e
            )))],
        };
        for response in responses {
            stdout.write_all(response.to_json().as_bytes()).await?;
            stdout.write_all(b"\n").await?;
        }
        stdout.flush().await?;
    }
    Ok(())
}

/// Logs a manager error in user-facing form and converts it for `main`.
fn report(e: ProfileError) -> anyhow::Error {
    error!("{}", e.display_for_user());
    anyhow::Error::new(e)
}
