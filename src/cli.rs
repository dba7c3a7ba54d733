use std::path::PathBuf;

use clap::Parser;

use crate::credentials::{DEFAULT_CREDENTIALS_PATH, DEFAULT_TEMPLATE_PATH, DEFAULT_TOKEN_PATH};
use crate::pipeline::{RunConfig, DEFAULT_LABEL};

/// Reply once to every unread message under a Gmail label, then mark it read.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// OAuth client secret downloaded from the Google Cloud console.
    #[clap(long, default_value = DEFAULT_CREDENTIALS_PATH)]
    pub credentials: PathBuf,

    /// Where the user token is read from and written to.
    #[clap(long, default_value = DEFAULT_TOKEN_PATH)]
    pub token: PathBuf,

    /// HTML file sent verbatim as the reply body.
    #[clap(long, default_value = DEFAULT_TEMPLATE_PATH)]
    pub template: PathBuf,

    /// Label whose unread messages get a reply.
    #[clap(long, default_value = DEFAULT_LABEL)]
    pub label: String,

    /// Compose replies and log them without sending or marking anything read.
    #[clap(long)]
    pub dry_run: bool,

    /// Fail instead of prompting for an authorization code.
    #[clap(long)]
    pub no_prompt: bool,

    /// Debug-level logging unless RUST_LOG is set.
    #[clap(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            label: self.label.clone(),
            dry_run: self.dry_run,
        }
    }
}
