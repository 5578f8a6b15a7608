//! rr-balancer e2e test runner
//!
//! Default (no args): starts mock backends, spawns the balancer, runs all tests, kills it.
//!
//!   cargo run                          # auto-detect balancer binary, run all tests
//!   cargo run -- list                  # list all tests
//!   cargo run -- run                   # connect to already-running balancer
//!   cargo run -- spawn-and-run [opts]  # explicit paths / ports

mod backend;
mod client;
mod runner;
mod tests;
mod types;

use clap::{Parser, Subcommand};
use colored::Colorize;
use runner::{list_tests, run_tests, TestContext};
use std::sync::Arc;
use std::time::Duration;
use tests::all_tests;

/// Default balancer binary candidates, tried in order
const DEFAULT_BALANCER_BINS: &[&str] = &["../target/release/rr-balancer", "../target/debug/rr-balancer"];

const DEFAULT_BALANCER_CONFIG: &str = "test_configs/balancer.yaml";
const DEFAULT_FIRST_BACKEND_PORT: u16 = 18071;
const DEFAULT_BALANCER_PORT: u16 = 18070;
const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 1;

/// Mock backend names, in the order the config lists their ports
const BACKEND_NAMES: &[&str] = &["alpha", "bravo", "charlie"];

#[derive(Parser)]
#[command(
    name = "e2e",
    about = "End-to-end tests for rr-balancer",
    long_about = "Runs all e2e tests by default (no arguments needed).\n\
                  Starts three mock backends, spawns the balancer binary, runs tests, then kills it."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Only run tests whose name contains this string (applies to default run)
    #[arg(long, short, global = true)]
    filter: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to an already-running balancer and run tests
    Run {
        /// Address of the real balancer
        #[arg(long, default_value = "127.0.0.1:18070")]
        proxy_addr: String,

        /// Port of the first mock backend; the others follow consecutively
        #[arg(long, default_value_t = DEFAULT_FIRST_BACKEND_PORT)]
        backend_port: u16,

        /// Health check interval the balancer runs with, in seconds
        #[arg(long, default_value_t = DEFAULT_HEALTH_INTERVAL_SECS)]
        health_interval: u64,

        /// Only run tests whose name contains this string
        #[arg(long, short)]
        filter: Option<String>,
    },

    /// List all available tests
    List,

    /// Spawn the balancer binary, run all tests, then kill it
    SpawnAndRun {
        /// Path to the rr-balancer binary
        #[arg(long)]
        proxy_bin: Option<String>,

        /// Path to the balancer config YAML (backends must point at the mock backend ports)
        #[arg(long, default_value = DEFAULT_BALANCER_CONFIG)]
        proxy_config: String,

        /// Port of the first mock backend - must match config
        #[arg(long, default_value_t = DEFAULT_FIRST_BACKEND_PORT)]
        backend_port: u16,

        /// Balancer listen port - must match config
        #[arg(long, default_value_t = DEFAULT_BALANCER_PORT)]
        proxy_port: u16,

        /// Health check interval - must match config, in seconds
        #[arg(long, default_value_t = DEFAULT_HEALTH_INTERVAL_SECS)]
        health_interval: u64,

        /// Only run tests whose name contains this string
        #[arg(long, short)]
        filter: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // ── No subcommand: default full run ──────────────────────────────────
        None => {
            let proxy_bin = find_balancer_bin()?;
            do_spawn_and_run(
                proxy_bin,
                DEFAULT_BALANCER_CONFIG.to_string(),
                DEFAULT_FIRST_BACKEND_PORT,
                DEFAULT_BALANCER_PORT,
                DEFAULT_HEALTH_INTERVAL_SECS,
                cli.filter,
            )
            .await?;
        }

        // ── list ─────────────────────────────────────────────────────────────
        Some(Command::List) => {
            list_tests(&all_tests());
        }

        // ── run (connect to existing balancer) ───────────────────────────────
        Some(Command::Run {
            proxy_addr,
            backend_port,
            health_interval,
            filter,
        }) => {
            let filter = filter.or(cli.filter);
            let ctx = start_backends(proxy_addr, backend_port, health_interval).await?;

            // The balancer may have marked the backends dead before they came up
            ctx.wait_for_probes().await;

            let results = run_tests(all_tests(), ctx, filter.as_deref()).await;
            exit_on_failure(&results);
        }

        // ── spawn-and-run ─────────────────────────────────────────────────────
        Some(Command::SpawnAndRun {
            proxy_bin,
            proxy_config,
            backend_port,
            proxy_port,
            health_interval,
            filter,
        }) => {
            let filter = filter.or(cli.filter);
            let proxy_bin = match proxy_bin {
                Some(p) => p,
                None => find_balancer_bin()?,
            };
            do_spawn_and_run(proxy_bin, proxy_config, backend_port, proxy_port, health_interval, filter).await?;
        }
    }

    Ok(())
}

/// Start the mock backends and build the test context around them
async fn start_backends(proxy_addr: String, first_port: u16, health_interval: u64) -> anyhow::Result<TestContext> {
    println!(
        "Starting {} mock backends on ports {}-{}...",
        BACKEND_NAMES.len(),
        first_port,
        first_port + BACKEND_NAMES.len() as u16 - 1
    );
    let backends = backend::start_all(BACKEND_NAMES, first_port).await?;
    println!("Mock backends running");

    Ok(TestContext {
        proxy_addr,
        backends: Arc::new(tokio::sync::Mutex::new(backends)),
        http_client: client::build_client(),
        health_interval: Duration::from_secs(health_interval),
    })
}

/// Shared implementation for spawn-and-run (used by both default and explicit subcommand)
async fn do_spawn_and_run(
    proxy_bin: String,
    proxy_config: String,
    backend_port: u16,
    proxy_port: u16,
    health_interval: u64,
    filter: Option<String>,
) -> anyhow::Result<()> {
    let proxy_addr = format!("127.0.0.1:{}", proxy_port);
    let ctx = start_backends(proxy_addr.clone(), backend_port, health_interval).await?;

    println!("Spawning balancer: {} run --config {}", proxy_bin, proxy_config);
    let mut proxy_process = tokio::process::Command::new(&proxy_bin)
        .arg("run")
        .arg("--config")
        .arg(&proxy_config)
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| anyhow::anyhow!("Failed to spawn '{}': {}", proxy_bin, e))?;

    println!("Waiting for balancer at {}...", proxy_addr);
    wait_for_balancer(&proxy_addr).await?;
    println!("Balancer is ready!\n");

    let results = run_tests(all_tests(), ctx, filter.as_deref()).await;

    proxy_process.kill().await.ok();

    exit_on_failure(&results);
    Ok(())
}

/// Find the balancer binary, trying release then debug builds
fn find_balancer_bin() -> anyhow::Result<String> {
    for candidate in DEFAULT_BALANCER_BINS {
        if std::path::Path::new(candidate).exists() {
            println!("Using balancer binary: {}", candidate.bright_cyan());
            return Ok(candidate.to_string());
        }
    }
    Err(anyhow::anyhow!(
        "No balancer binary found. Tried: {}\nBuild with: cd .. && cargo build --release",
        DEFAULT_BALANCER_BINS.join(", ")
    ))
}

/// Exit with code 1 if any tests failed
fn exit_on_failure(results: &[crate::types::TestResult]) {
    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        std::process::exit(1);
    }
}

/// Wait for the balancer to start accepting connections (retry with backoff)
///
/// Any HTTP answer counts, since every path is forwarded.
async fn wait_for_balancer(addr: &str) -> anyhow::Result<()> {
    let client = client::build_client();
    let url = format!("http://{}/", addr);

    for attempt in 0..30 {
        tokio::time::sleep(Duration::from_millis(200 + attempt * 100)).await;
        if client.get(&url).send().await.is_ok() {
            return Ok(());
        }
    }

    Err(anyhow::anyhow!(
        "Balancer did not start within timeout. Is the binary correct? Check: {}",
        addr
    ))
}
