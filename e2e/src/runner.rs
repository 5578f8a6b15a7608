//! Test runner - executes tests and reports results

use colored::Colorize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::backend::{clear_requests, MockBackend};
use crate::types::TestResult;

/// A single test case
pub struct TestCase {
    pub name: &'static str,
    pub description: &'static str,
    pub run: Box<
        dyn Fn(TestContext) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>> + Send + Sync,
    >,
}

/// Context passed to each test - balancer address and the mock backends behind it
#[derive(Clone)]
pub struct TestContext {
    pub proxy_addr: String,
    pub backends: Arc<Mutex<Vec<MockBackend>>>,
    pub http_client: reqwest::Client,
    /// Health check interval the balancer was configured with
    pub health_interval: Duration,
}

impl TestContext {
    /// Long enough for every backend to have been probed at least once more
    pub fn probe_settle_time(&self) -> Duration {
        self.health_interval * 2 + Duration::from_millis(500)
    }

    /// Wait for the balancer to notice backend state changes
    pub async fn wait_for_probes(&self) {
        tokio::time::sleep(self.probe_settle_time()).await;
    }

    /// Restart any stopped backend and clear every request log
    pub async fn reset(&self) -> anyhow::Result<()> {
        let mut restarted = false;
        {
            let mut backends = self.backends.lock().await;
            for backend in backends.iter_mut() {
                if !backend.is_running() {
                    backend.restart().await?;
                    restarted = true;
                }
                clear_requests(&backend.state);
            }
        }
        if restarted {
            self.wait_for_probes().await;
        }
        Ok(())
    }
}

/// Run all provided test cases sequentially and report results
pub async fn run_tests(cases: Vec<TestCase>, ctx: TestContext, filter: Option<&str>) -> Vec<TestResult> {
    let mut results = Vec::new();
    let mut passed = 0;
    let mut failed = 0;

    println!("\n{}", "═══════════════════════════════════════════════════".bright_blue());
    println!("{}", "  rr-balancer End-to-End Tests".bright_white().bold());
    println!("{}", "═══════════════════════════════════════════════════".bright_blue());
    println!("  Balancer: {}", ctx.proxy_addr.bright_cyan());
    {
        let backends = ctx.backends.lock().await;
        for backend in backends.iter() {
            println!("  Backend:  {} on port {}", backend.name.bright_cyan(), backend.port);
        }
    }

    // Filter tests if requested
    let cases_to_run: Vec<&TestCase> = if let Some(f) = filter {
        cases.iter().filter(|c| c.name.contains(f)).collect()
    } else {
        cases.iter().collect()
    };

    println!("  Running:  {} test(s)\n", cases_to_run.len().to_string().bright_cyan());

    for case in &cases_to_run {
        let start = Instant::now();
        print!("  {} {} ... ", "▶".bright_blue(), case.name.bright_white());

        // Reset backend state before each test
        let result = match ctx.reset().await {
            Ok(()) => (case.run)(ctx.clone()).await,
            Err(e) => Err(e.context("Failed to reset mock backends")),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        let test_result = match result {
            Ok(()) => {
                println!("{} ({duration_ms}ms)", "PASS".bright_green().bold());
                passed += 1;
                TestResult {
                    name: case.name.to_string(),
                    passed: true,
                    error: None,
                    duration_ms,
                }
            }
            Err(e) => {
                println!("{} ({duration_ms}ms)", "FAIL".bright_red().bold());
                println!("    {} {}", "Error:".bright_red(), e);
                // Print cause chain
                let mut src = e.source();
                while let Some(cause) = src {
                    println!("    {} {}", "Caused by:".yellow(), cause);
                    src = cause.source();
                }
                failed += 1;
                TestResult {
                    name: case.name.to_string(),
                    passed: false,
                    error: Some(e.to_string()),
                    duration_ms,
                }
            }
        };

        results.push(test_result);
    }

    println!("\n{}", "───────────────────────────────────────────────────".bright_blue());
    let summary = format!("  Results: {} passed, {} failed", passed, failed);
    if failed == 0 {
        println!("{}", summary.bright_green().bold());
    } else {
        println!("{}", summary.bright_red().bold());
    }
    println!("{}\n", "═══════════════════════════════════════════════════".bright_blue());

    results
}

/// Helper to list all available tests
pub fn list_tests(cases: &[TestCase]) {
    println!("\n{}", "Available tests:".bright_white().bold());
    for case in cases {
        println!("  {} - {}", case.name.bright_cyan(), case.description);
    }
    println!();
}
