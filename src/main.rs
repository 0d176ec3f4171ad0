use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_sqlite_orm::schema::Schema;
use rust_sqlite_orm::{logging, tutorial, web, Config, SqliteConfig, SqliteStore};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "rust_sqlite_orm", version, about = "SQLite walkthroughs and a hello-world server")]
struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log every SQL statement
    #[arg(long, global = true)]
    echo: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the web server (SECRET_KEY, DATABASE_URL, BIND_ADDR, SQL_ECHO, DEBUG)
    Serve,
    /// Create a table and insert a row with plain SQL
    RawSql {
        #[arg(long, default_value = tutorial::RAW_SQL_DATABASE)]
        database: PathBuf,
    },
    /// Tables, CRUD, join and aggregate
    Core {
        #[arg(long, default_value = tutorial::CORE_DATABASE)]
        database: PathBuf,
    },
    /// Mapped models and a session
    Orm {
        #[arg(long, default_value = tutorial::ORM_DATABASE)]
        database: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => {
            let mut config = Config::from_env().context("loading configuration")?;
            config.echo |= cli.echo;
            logging::init_logger(cli.verbose || config.debug);
            tracing::debug!(
                database_url = %config.database_url,
                bind_addr = %config.bind_addr,
                "configuration loaded"
            );
            web::serve(config).await
        }
        Command::RawSql { database } => {
            logging::init_logger(cli.verbose);
            let store = open(&database, cli.echo)?;
            print(&tutorial::raw_sql(&store)?)
        }
        Command::Core { database } => {
            logging::init_logger(cli.verbose);
            let store = open(&database, cli.echo)?;
            print(&tutorial::core(&store)?)
        }
        Command::Orm { database } => {
            logging::init_logger(cli.verbose);
            let store = open(&database, cli.echo)?;
            print(&tutorial::orm(&store)?)
        }
    }
}

fn open(database: &std::path::Path, echo: bool) -> anyhow::Result<SqliteStore> {
    let path = database.to_string_lossy().into_owned();
    SqliteStore::open(SqliteConfig::new(path, Schema::new()).with_echo(echo))
        .with_context(|| format!("opening {}", database.display()))
}

fn print<T: Serialize>(report: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
