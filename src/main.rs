use std::process::ExitCode;

use autoreply::cli::Cli;
use autoreply::credentials::{load_template, CredentialStore};
use autoreply::gmail_api::{AuthSession, GmailClient, NoPrompt, StdinPrompt};
use autoreply::pipeline::{self, RunOutcome};
use autoreply::Result;
use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Run aborted");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: &Cli) -> Result<RunOutcome> {
    // Template problems should surface before anyone is asked to authorize
    let template = load_template(&cli.template).await?;
    let client = authenticate(cli).await?;
    pipeline::run(&client, &cli.run_config(), &template).await
}

async fn authenticate(cli: &Cli) -> Result<GmailClient> {
    let store = CredentialStore::new(&cli.credentials, &cli.token);
    if cli.no_prompt {
        AuthSession::new(store, NoPrompt).authenticate().await
    } else {
        AuthSession::new(store, StdinPrompt).authenticate().await
    }
}
