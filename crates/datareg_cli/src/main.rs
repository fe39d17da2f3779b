//! Catalog command-line entry point.
//!
//! # Responsibility
//! - Provide a deterministic check of `datareg_core` linkage.
//! - Expose user/token administration and read-only catalog access
//!   against the configured database.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use datareg_core::browse::Browser;
use datareg_core::{
    init_from_config, registry, ApiRequest, ApiRouter, AuthService, CatalogConfig,
    SqliteUserRepository,
};
use log::info;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "datareg")]
#[command(about = "Data provenance catalog")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print core linkage check output
    Ping,

    /// Register a user and print a fresh API token
    AddUser { username: String },

    /// Replace a user's API token and print it
    Token { username: String },

    /// Summarize every data object type
    Index,

    /// Issue one API read, e.g. `/sources/?name=J*`
    Get {
        target: String,
        #[arg(long, env = "DATAREG_TOKEN")]
        token: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command.unwrap_or(Command::Ping)) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<ExitCode> {
    if let Command::Ping = command {
        println!("datareg_core ping={}", datareg_core::ping());
        println!("datareg_core version={}", datareg_core::core_version());
        return Ok(ExitCode::SUCCESS);
    }

    let config = CatalogConfig::from_env().context("reading configuration")?;
    init_from_config(&config).context("initializing logging")?;
    let conn = datareg_core::db::open_from_config(&config)
        .with_context(|| format!("opening {}", config.db_path.display()))?;
    info!(
        "event=cli_start module=cli status=ok db_path={}",
        config.db_path.display()
    );

    let auth = AuthService::new(SqliteUserRepository::new(&conn));
    match command {
        Command::Ping => {}
        Command::AddUser { username } => {
            let user = auth.register_user(&username)?;
            println!("{}", auth.issue_token(&user)?);
        }
        Command::Token { username } => {
            let user = auth
                .find_user(&username)?
                .with_context(|| format!("no user named `{username}`"))?;
            println!("{}", auth.issue_token(&user)?);
        }
        Command::Index => {
            let index = Browser::new(&conn).index()?;
            for object in &index.objects {
                println!("{:<32} {:>6}  {}", object.display_name, object.count, object.doc);
            }
            println!("issues: {}", index.issues.len());
        }
        Command::Get { target, token } => {
            let mut request = ApiRequest::get(&target);
            if let Some(token) = token {
                request = request.with_token(token);
            }
            let router = ApiRouter::from_registry(registry(), config.page_size);
            let response = router.handle(&conn, &request);
            println!("{}", serde_json::to_string_pretty(&response.body)?);
            if !response.is_success() {
                eprintln!("status={}", response.status);
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
