//! Taskboard
//!
//! A multi-user task tracker: tasks carry a status, an author, an
//! optional executor, and labels, managed through a small web UI.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use taskboard::cli::{AddUserArgs, Cli, Command};
use taskboard::config::Config;
use taskboard::db::Database;
use taskboard::handlers;
use taskboard::types::UserInput;
use taskboard::web;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    // Load configuration and apply CLI overrides
    let mut config = Config::load(cli.config.as_deref().map(Path::new))?;

    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    match cli.command {
        Some(Command::AddUser(args)) => {
            run_add_user(&config, args)?;
        }
        Some(Command::Serve) | None => {
            run_server(config).await?;
        }
    }

    Ok(())
}

/// Run the web server.
async fn run_server(config: Config) -> Result<()> {
    config.ensure_db_dir()?;

    info!("Starting Taskboard v{}", env!("CARGO_PKG_VERSION"));
    info!("Database: {:?}", config.server.db_path);

    let db = Database::open(&config.server.db_path)?;
    let db = Arc::new(db);

    let purged = db.purge_expired_sessions()?;
    if purged > 0 {
        info!("Purged {} expired sessions", purged);
    }

    web::start_server(
        db,
        &config.server.host,
        config.server.port,
        config.server.session_ttl_ms(),
    )
    .await
}

/// Create a user account from the command line.
fn run_add_user(config: &Config, args: AddUserArgs) -> Result<()> {
    config.ensure_db_dir()?;
    let db = Database::open(&config.server.db_path)?;

    let input = UserInput {
        username: args.username,
        first_name: args.first_name,
        last_name: args.last_name,
        email: args.email,
        password: Some(args.password),
    };

    let user = handlers::users::register(&db, &input)
        .map_err(|e| anyhow::anyhow!("failed to create user: {}", e))?;

    println!("Created user '{}' (id {})", user.username, user.id);
    Ok(())
}
