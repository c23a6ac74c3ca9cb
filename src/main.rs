mod aggregate;
mod calendar;
mod config;
mod error;
mod fetcher;
mod github;
mod input;
mod store;
#[cfg(test)]
mod testutil;

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use clap::{Args, Parser, Subcommand};
use config::Config;
use github::GithubClient;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use store::Store;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Exit status for validation, configuration or totals-write errors.
const EXIT_FAILURE: u8 = 1;
/// Exit status when some users failed but the rest were written.
const EXIT_PARTIAL: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "contrib-tally",
    about = "Fetch daily GitHub contribution counts and total them across users",
    version
)]
struct Cli {
    /// GitHub token used as the bearer credential
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// GraphQL endpoint
    #[arg(long, env = "GITHUB_GRAPHQL_URL", default_value = config::DEFAULT_API_URL, global = true)]
    api_url: String,

    /// Directory the YAML files are written to and read from
    #[arg(short, long, env = "CONTRIB_OUTPUT_DIR", default_value = ".", global = true)]
    output_dir: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, env = "CONTRIB_TIMEOUT_SECS", default_value_t = config::DEFAULT_TIMEOUT_SECS, global = true)]
    timeout: u64,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct YearUsers {
    /// Calendar year to query
    #[arg(short, long)]
    year: i32,

    /// GitHub usernames
    #[arg(required = true)]
    usernames: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and save each user's daily contributions for a year
    Fetch(YearUsers),
    /// Sum previously saved per-user files into a yearly total
    Total(YearUsers),
    /// Fetch every user, then write the yearly total
    Run(YearUsers),
    /// Print a user's contribution summary
    Summary {
        /// GitHub username
        username: String,
    },
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            token: self.token.clone(),
            api_url: self.api_url.clone(),
            output_dir: self.output_dir.clone(),
            request_timeout: Duration::from_secs(self.timeout),
            ..Config::default()
        }
    }
}

fn setup_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn validated(args: &YearUsers) -> Result<(i32, Vec<String>)> {
    let year = input::validate_year(args.year, Utc::now().year())?;
    let usernames = input::normalize_usernames(&args.usernames)?;
    Ok((year, usernames))
}

async fn fetch(config: &Config, year: i32, usernames: &[String]) -> Result<bool> {
    let client = GithubClient::new(config)?;
    let store = Store::new(&config.output_dir);

    let mut complete = true;
    for (username, result) in fetcher::fetch_all(&client, &store, usernames, year).await {
        match result {
            Ok(map) => println!(
                "{username}: {} days written to {}",
                map.len(),
                store.user_path(&username, year).display()
            ),
            Err(e) => {
                complete = false;
                println!("{username}: {e}");
            }
        }
    }
    Ok(complete)
}

fn total(config: &Config, year: i32, usernames: &[String]) -> Result<bool> {
    let store = Store::new(&config.output_dir);
    let aggregation = aggregate::aggregate(&store, usernames, year)
        .with_context(|| format!("Failed to write totals for {year}"))?;

    for failure in &aggregation.failures {
        println!("skipped {failure}");
    }
    println!(
        "Total contributions for {} of {} users in {year} written to {}",
        usernames.len() - aggregation.failures.len(),
        usernames.len(),
        store.total_path(year).display()
    );
    Ok(aggregation.is_complete())
}

async fn summary(config: &Config, username: &str) -> Result<()> {
    let client = GithubClient::new(config)?;
    let s = client
        .contribution_summary(username)
        .await
        .with_context(|| format!("Failed to fetch summary for {username}"))?;

    println!("Contributions Summary:");
    println!("Commits: {}", s.commits);
    println!("Pull Requests: {}", s.pull_requests);
    println!("Issues: {}", s.issues);
    println!("Restricted Contributions: {}", s.restricted);
    Ok(())
}

async fn run(cli: Cli) -> Result<bool> {
    let config = cli.config();
    match &cli.command {
        Command::Fetch(args) => {
            let (year, usernames) = validated(args)?;
            fetch(&config, year, &usernames).await
        }
        Command::Total(args) => {
            let (year, usernames) = validated(args)?;
            total(&config, year, &usernames)
        }
        Command::Run(args) => {
            let (year, usernames) = validated(args)?;
            let fetched = fetch(&config, year, &usernames).await?;
            let totalled = total(&config, year, &usernames)?;
            Ok(fetched && totalled)
        }
        Command::Summary { username } => {
            let username = input::normalize_usernames([username])?.remove(0);
            summary(&config, &username).await?;
            Ok(true)
        }
    }
}

fn exit_status(outcome: &Result<bool>) -> u8 {
    match outcome {
        Ok(true) => 0,
        Ok(false) => EXIT_PARTIAL,
        Err(_) => EXIT_FAILURE,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let outcome = run(cli).await;
    if let Err(e) = &outcome {
        error!("{e:#}");
    }
    ExitCode::from(exit_status(&outcome))
}
