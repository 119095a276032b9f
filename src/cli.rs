//! CLI command definitions for taskboard.
//!
//! The main entry point is the `Cli` struct which contains subcommands.
//! Running without a subcommand starts the web server.

use clap::{Args, Parser, Subcommand};

/// Task board web server and CLI tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web server (default if no subcommand given)
    Serve,

    /// Create a user account from the command line
    AddUser(AddUserArgs),
}

/// Arguments for the add-user subcommand.
#[derive(Args, Debug)]
pub struct AddUserArgs {
    /// Username for the new account
    #[arg(long)]
    pub username: String,

    /// Password for the new account
    #[arg(long)]
    pub password: String,

    /// First name
    #[arg(long, default_value = "")]
    pub first_name: String,

    /// Last name
    #[arg(long, default_value = "")]
    pub last_name: String,

    /// Email address
    #[arg(long)]
    pub email: Option<String>,
}
