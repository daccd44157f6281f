use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use drive_credentials::config::parse_format_byte;
use drive_credentials::defaults::Defaults;
use drive_credentials::SessionConfig;

mod cli;
mod commands;

use crate::cli::{Cli, Command};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Defaults::LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&std::path::Path>) -> Result<SessionConfig> {
    let base = match path {
        Some(p) => SessionConfig::from_file(p)?,
        None => SessionConfig::default(),
    };
    SessionConfig::from_env_over(base).context("applying DRIVE_* overrides")
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    debug!(?config, "effective configuration");

    match cli.cmd {
        Command::Keygen { count, out } => {
            let records = commands::keygen::generate(count);
            commands::keygen::emit(records, out)?;
        }

        Command::Sign { key, digest, message, suffix } => {
            let digest = commands::sign::resolve_digest(digest.as_deref(), message.as_deref())?;
            let format_byte = match suffix {
                Some(s) => parse_format_byte(&s).context("parsing --suffix")?,
                None => config.signature_format_byte,
            };
            println!("{}", commands::sign::sign_hex(&key, &digest, format_byte)?);
        }

        Command::Verify { public_key, digest, message, signature } => {
            let digest = commands::sign::resolve_digest(digest.as_deref(), message.as_deref())?;
            if commands::sign::verify_hex(&public_key, &digest, &signature)? {
                println!("✓ valid");
            } else {
                println!("✗ invalid");
                std::process::exit(1);
            }
        }

        Command::SessionSignature { user_id, key } => {
            let out = commands::session::build(&config, &user_id, key.as_deref())
                .with_context(|| format!("building session signature for {user_id}"))?;
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}
