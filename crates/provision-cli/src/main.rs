//! `mongo-init` — provisions the customer database on a fresh MongoDB.
//!
//! Creates the application user, the `customers` collection with its
//! `$jsonSchema` validator and the unique `cpf`/`email` indexes, then prints
//! a single completion line. Meant to run once, before any application
//! traffic; a second run fails because the user already exists.
//!
//! # Usage
//!
//! ```
//! mongo-init                       # same as `mongo-init init`
//! mongo-init init --dry-run        # run the plan against an in-memory server
//! mongo-init verify                # compare the server against the plan
//! mongo-init plan                  # print the plan as extended JSON
//! mongo-init check customer.json   # validate documents offline
//! ```
//!
//! Connection settings come from `mongo-init.toml` (or `--config`), then
//! `MONGO_INIT_*` environment variables, then `--uri`.

mod commands;
mod settings;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Provision the customer database on MongoDB")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "mongo-init.toml")]
  config: PathBuf,

  /// MongoDB connection string; overrides the config file and environment.
  #[arg(long, global = true)]
  uri: Option<String>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create the user, collection and indexes (default).
  Init {
    /// Run against an in-memory server and print the steps instead.
    #[arg(long)]
    dry_run: bool,
  },
  /// Report every difference between the server and the plan.
  Verify,
  /// Print the plan as relaxed extended JSON.
  Plan,
  /// Validate customer documents (extended JSON) against the collection rules.
  Check {
    /// File holding one document or an array of documents.
    file: PathBuf,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr; stdout is reserved for command output.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command.unwrap_or(Command::Init { dry_run: false }) {
    Command::Init { dry_run: true } => commands::dry_run().await,
    Command::Init { dry_run: false } => {
      let settings = settings::load(&cli.config, cli.uri)?;
      commands::init(&settings).await
    }
    Command::Verify => {
      let settings = settings::load(&cli.config, cli.uri)?;
      commands::verify(&settings).await
    }
    Command::Plan => commands::plan(),
    Command::Check { file } => commands::check(&file).await,
  }
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory;

  use super::*;

  #[test]
  fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
  }

  #[test]
  fn no_subcommand_means_init() {
    let cli = Cli::try_parse_from(["mongo-init"]).unwrap();
    assert!(cli.command.is_none());
    assert_eq!(cli.config, PathBuf::from("mongo-init.toml"));
  }

  #[test]
  fn global_uri_after_subcommand() {
    let cli =
      Cli::try_parse_from(["mongo-init", "verify", "--uri", "mongodb://db:27017"]).unwrap();
    assert!(matches!(cli.command, Some(Command::Verify)));
    assert_eq!(cli.uri.as_deref(), Some("mongodb://db:27017"));
  }

  #[test]
  fn check_requires_a_file() {
    assert!(Cli::try_parse_from(["mongo-init", "check"]).is_err());
  }
}
