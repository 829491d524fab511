use anyhow::{Context, Result};
use clap::Parser;
use gsweep::auth;
use gsweep::cli::{Cli, Command, TargetArgs};
use gsweep::config::Config;
use gsweep::db::Database;
use gsweep::gmail::GmailClient;
use gsweep::mutation::{Action, Coordinator};
use gsweep::report::MailboxReport;
use gsweep::sync::{SyncOptions, Syncer};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = Config::load(&cli.config)?;

    // Handle token reset
    if let Command::ResetToken = cli.command {
        auth::RingStorage::new(&config.keyring).clear_token().await?;
        println!("Token cleared. The next remote command will ask for consent again.");
        return Ok(());
    }

    let db = Database::new(&config.database_url)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;
    db.run_migrations().await.context("applying schema")?;

    match &cli.command {
        Command::Sync { prune } => {
            let gmail = GmailClient::new(auth::connect(&config).await?, &config);
            let report = Syncer::new(&gmail, &db)
                .run(SyncOptions { prune: *prune })
                .await?;
            eprintln!(
                "Synced {} messages ({} new, {} pruned).",
                report.seen, report.inserted, report.pruned
            );
        }
        Command::Query { filter, report } => {
            let messages = db.query(&filter.to_spec()?).await?;
            if *report {
                print_json(&MailboxReport::build(messages))?;
            } else {
                print_json(&messages)?;
            }
        }
        Command::Senders => print_json(&db.distinct_senders().await?)?,
        Command::Delete(target) => mutate(&config, &db, target, Action::Delete).await?,
        Command::MarkRead(target) => mutate(&config, &db, target, Action::MarkRead).await?,
        Command::ResetToken => {}
    }

    Ok(())
}

async fn mutate(config: &Config, db: &Database, target: &TargetArgs, action: Action) -> Result<()> {
    // Resolve the arguments before asking for a token.
    let selection = target.to_selection()?;
    let gmail = GmailClient::new(auth::connect(config).await?, config);
    let outcome = Coordinator::new(&gmail, db)
        .mutate(&selection, action)
        .await?;
    print_json(&outcome)
}

fn init_tracing(debug: bool) {
    let default = if debug { "gsweep=debug" } else { "gsweep=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
