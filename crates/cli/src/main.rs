//! Tollgate Load Generator
//! Fires GET requests at a fixed pace and reports how many were throttled.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use tabled::{Table, Tabled};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

const DEFAULT_URL: &str = "http://localhost:8080";
const DEFAULT_REQUESTS: usize = 20;
const DEFAULT_DELAY_MS: u64 = 200;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "tollgate-load")]
#[command(about = "Send paced requests to a Tollgate server", long_about = None)]
#[command(version)]
struct Cli {
    /// Target URL
    #[arg(long, env = "TOLLGATE_URL", default_value = DEFAULT_URL)]
    url: String,

    /// Number of requests to send
    #[arg(short = 'n', long, default_value_t = DEFAULT_REQUESTS)]
    requests: usize,

    /// Delay between request launches, in milliseconds
    #[arg(short, long, default_value_t = DEFAULT_DELAY_MS)]
    delay_ms: u64,

    /// Print the summary as JSON instead of a table
    #[arg(long)]
    json: bool,
}

/// Result of a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Accepted,
    Throttled,
    Failed,
}

fn classify(status: StatusCode) -> Outcome {
    if status == StatusCode::TOO_MANY_REQUESTS {
        Outcome::Throttled
    } else {
        Outcome::Accepted
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Tabled)]
struct Summary {
    sent: usize,
    accepted: usize,
    throttled: usize,
    failed: usize,
}

impl Summary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Accepted => self.accepted += 1,
            Outcome::Throttled => self.throttled += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

async fn send_request(client: &reqwest::Client, url: &str, index: usize) -> Outcome {
    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status();
            let outcome = classify(status);
            match outcome {
                Outcome::Throttled => {
                    warn!(request = index, status = status.as_u16(), "Request dropped by rate limiter")
                }
                _ => info!(request = index, status = status.as_u16(), "Request successful"),
            }
            outcome
        }
        Err(e) => {
            error!(request = index, error = %e, "Request failed");
            Outcome::Failed
        }
    }
}

/// Launch `requests` GETs, `delay` apart, without waiting for earlier ones
async fn run_load(
    client: &reqwest::Client,
    url: &str,
    requests: usize,
    delay: Duration,
) -> Summary {
    let mut tasks = JoinSet::new();

    for i in 0..requests {
        let client = client.clone();
        let url = url.to_string();
        tasks.spawn(async move { send_request(&client, &url, i + 1).await });

        if i + 1 < requests {
            tokio::time::sleep(delay).await;
        }
    }

    let mut summary = Summary {
        sent: requests,
        ..Default::default()
    };
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => summary.record(outcome),
            Err(e) => {
                error!(error = %e, "Request task panicked");
                summary.record(Outcome::Failed);
            }
        }
    }
    summary
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tollgate_load=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;

    info!(
        url = %cli.url,
        requests = cli.requests,
        delay_ms = cli.delay_ms,
        "Starting load run"
    );

    let summary = run_load(
        &client,
        &cli.url,
        cli.requests,
        Duration::from_millis(cli.delay_ms),
    )
    .await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", "Load run complete".cyan().bold());
        println!();
        println!("{}", Table::new(vec![summary.clone()]));
        if summary.throttled > 0 {
            println!(
                "{}",
                format!("{} request(s) throttled with 429", summary.throttled).yellow()
            );
        }
    }

    if summary.sent > 0 && summary.failed == summary.sent {
        anyhow::bail!("No request reached {}", cli.url);
    }

    Ok(())
}
