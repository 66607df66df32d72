//! Clicker API Load Test
//!
//! Every worker plays as its own player: it saves progress, reads it back,
//! browses the shop, buys items and polls the leaderboard. Measures latency
//! percentiles (p50/p95/p99), throughput and error rate per endpoint.
//!
//! Usage:
//!   cargo run --release --bin http_load_test -- --url http://localhost:10000 --concurrency 10 --duration 30
//!
//! Requires: clicker-server running on the target URL.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

// ============================================================================
// Scenario
// ============================================================================

#[derive(Clone, Copy)]
enum Step {
    Health,
    Save,
    GetUser,
    Shop,
    Purchase,
    Leaderboard,
}

const SCENARIO: [Step; 6] = [
    Step::Health,
    Step::Save,
    Step::GetUser,
    Step::Shop,
    Step::Purchase,
    Step::Leaderboard,
];

impl Step {
    fn name(self) -> &'static str {
        match self {
            Step::Health => "Health",
            Step::Save => "Save",
            Step::GetUser => "GetUser",
            Step::Shop => "Shop",
            Step::Purchase => "Purchase",
            Step::Leaderboard => "Leaderboard",
        }
    }

    /// A purchase the player cannot afford is a normal game outcome
    fn accepts(self, status: StatusCode) -> bool {
        match self {
            Step::Purchase => status.is_success() || status == StatusCode::BAD_REQUEST,
            _ => status.is_success(),
        }
    }
}

/// Per-worker game state, advanced on every save
struct Player {
    id: String,
    coins: i64,
    clicks: i64,
}

impl Player {
    fn new(worker_id: usize) -> Self {
        Self {
            id: format!("load_{}", worker_id),
            coins: 100,
            clicks: 0,
        }
    }

    fn play(&mut self) -> Value {
        self.clicks += 25;
        self.coins += 25 * (1 + (self.clicks % 7));
        json!({
            "player_id": self.id,
            "username": self.id,
            "coins": self.coins,
            "total_clicks": self.clicks,
        })
    }
}

async fn run_step(
    client: &Client,
    base_url: &str,
    step: Step,
    player: &mut Player,
) -> reqwest::Result<StatusCode> {
    let resp = match step {
        Step::Health => client.get(format!("{}/health", base_url)).send().await?,
        Step::Save => {
            client
                .post(format!("{}/api/save", base_url))
                .json(&player.play())
                .send()
                .await?
        }
        Step::GetUser => {
            client
                .get(format!("{}/api/user/{}", base_url, player.id))
                .send()
                .await?
        }
        Step::Shop => {
            client
                .get(format!("{}/api/shop?player_id={}", base_url, player.id))
                .send()
                .await?
        }
        Step::Purchase => {
            let resp = client
                .post(format!("{}/api/purchase", base_url))
                .json(&json!({"player_id": player.id, "item_id": "power"}))
                .send()
                .await?;
            if resp.status().is_success() {
                if let Ok(body) = resp.json::<PurchaseReply>().await {
                    player.coins = body.player.coins;
                }
                return Ok(StatusCode::OK);
            }
            resp
        }
        Step::Leaderboard => {
            client
                .get(format!("{}/api/leaderboard?limit=10", base_url))
                .send()
                .await?
        }
    };
    Ok(resp.status())
}

// ============================================================================
// Server replies
// ============================================================================

#[derive(Deserialize)]
struct HealthReply {
    status: String,
    version: String,
}

#[derive(Deserialize)]
struct PurchaseReply {
    player: PlayerReply,
}

#[derive(Deserialize)]
struct PlayerReply {
    coins: i64,
}

#[derive(Debug, Deserialize, Serialize)]
struct ServerMetricsReply {
    player_count: i64,
    total_requests: u64,
    total_errors: u64,
    saves: u64,
    leaderboard_refreshes: u64,
    avg_request_duration_ms: f64,
}

// ============================================================================
// Per-endpoint statistics
// ============================================================================

struct EndpointStats {
    name: &'static str,
    latencies_us: parking_lot::Mutex<Vec<u64>>,
    success: AtomicU64,
    errors: AtomicU64,
}

impl EndpointStats {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            latencies_us: parking_lot::Mutex::new(Vec::with_capacity(10_000)),
            success: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    fn record(&self, duration_us: u64, ok: bool) {
        self.latencies_us.lock().push(duration_us);
        if ok {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn percentile(&self, p: f64) -> f64 {
        let mut lat = self.latencies_us.lock().clone();
        if lat.is_empty() {
            return 0.0;
        }
        lat.sort_unstable();
        let idx = ((p / 100.0) * lat.len() as f64) as usize;
        let idx = idx.min(lat.len() - 1);
        lat[idx] as f64 / 1000.0 // return ms
    }

    fn report(&self) -> EndpointReport {
        let success = self.success.load(Ordering::Relaxed);
        let errors = self.errors.load(Ordering::Relaxed);
        EndpointReport {
            name: self.name,
            count: success + errors,
            errors,
            p50_ms: self.percentile(50.0),
            p95_ms: self.percentile(95.0),
            p99_ms: self.percentile(99.0),
        }
    }
}

#[derive(Serialize)]
struct EndpointReport {
    name: &'static str,
    count: u64,
    errors: u64,
    p50_ms: f64,
    p95_ms: f64,
    p99_ms: f64,
}

#[derive(Serialize)]
struct LoadTestReport {
    base_url: String,
    concurrency: usize,
    duration_secs: f64,
    total_requests: u64,
    total_errors: u64,
    rps: f64,
    error_rate: f64,
    endpoints: Vec<EndpointReport>,
    server: Option<ServerMetricsReply>,
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).with_level(true).init();

    let args: Vec<String> = std::env::args().collect();
    let base_url = parse_str_arg(&args, "--url").unwrap_or_else(|| "http://localhost:10000".into());
    let concurrency: usize = parse_num_arg(&args, "--concurrency").unwrap_or(10).max(1);
    let duration_secs: u64 = parse_num_arg(&args, "--duration").unwrap_or(30);

    info!(
        "Load test against {} ({} workers, {}s)",
        base_url, concurrency, duration_secs
    );

    let client = Client::builder().timeout(Duration::from_secs(5)).build()?;

    // Verify server is up
    let health: HealthReply = client
        .get(format!("{}/health", base_url))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    info!("Server health: {} (version {})", health.status, health.version);

    let stats: Arc<Vec<EndpointStats>> =
        Arc::new(SCENARIO.iter().map(|s| EndpointStats::new(s.name())).collect());

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let start = Instant::now();
    let deadline = start + Duration::from_secs(duration_secs);
    let total_requests = Arc::new(AtomicU64::new(0));

    let mut handles = Vec::new();
    for worker_id in 0..concurrency {
        let client = client.clone();
        let base_url = base_url.clone();
        let sem = semaphore.clone();
        let stats = stats.clone();
        let total = total_requests.clone();

        handles.push(tokio::spawn(async move {
            let mut player = Player::new(worker_id);
            let mut idx = 0;
            while Instant::now() < deadline {
                let Ok(_permit) = sem.acquire().await else {
                    break;
                };
                let step = SCENARIO[idx];

                let req_start = Instant::now();
                let result = run_step(&client, &base_url, step, &mut player).await;
                let duration_us = req_start.elapsed().as_micros() as u64;

                let ok = matches!(result, Ok(status) if step.accepts(status));
                stats[idx].record(duration_us, ok);
                total.fetch_add(1, Ordering::Relaxed);

                idx = (idx + 1) % SCENARIO.len();
            }
        }));
    }

    // Progress reporter
    let total_clone = total_requests.clone();
    let progress = tokio::spawn(async move {
        let mut last_count = 0u64;
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            if Instant::now() >= deadline {
                break;
            }
            let current = total_clone.load(Ordering::Relaxed);
            let elapsed = start.elapsed().as_secs_f64();
            info!(
                "[{:.0}s] {} requests ({:.0} rps, +{} last 5s)",
                elapsed,
                current,
                current as f64 / elapsed,
                current - last_count
            );
            last_count = current;
        }
    });

    for h in handles {
        if let Err(e) = h.await {
            error!("Worker panicked: {}", e);
        }
    }
    progress.abort();

    let total_time = start.elapsed().as_secs_f64();
    let total_reqs = total_requests.load(Ordering::Relaxed);
    let endpoints: Vec<EndpointReport> = stats.iter().map(EndpointStats::report).collect();
    let total_errors: u64 = endpoints.iter().map(|e| e.errors).sum();

    println!("\n=== Results ===\n");
    println!(
        "Total: {} requests in {:.2}s ({:.1} rps)\n",
        total_reqs,
        total_time,
        total_reqs as f64 / total_time
    );
    println!(
        "{:<15} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "Endpoint", "Count", "Errors", "p50(ms)", "p95(ms)", "p99(ms)", "Err%"
    );
    println!("{}", "-".repeat(75));
    for e in &endpoints {
        let err_pct = if e.count > 0 {
            e.errors as f64 / e.count as f64 * 100.0
        } else {
            0.0
        };
        println!(
            "{:<15} {:>8} {:>8} {:>8.2} {:>8.2} {:>8.2} {:>7.1}%",
            e.name, e.count, e.errors, e.p50_ms, e.p95_ms, e.p99_ms, err_pct,
        );
    }
    println!("{}", "-".repeat(75));
    println!("{:<15} {:>8} {:>8}", "TOTAL", total_reqs, total_errors);

    // Server-side view of the same run
    let server = match client.get(format!("{}/metrics/json", base_url)).send().await {
        Ok(resp) => resp.json::<ServerMetricsReply>().await.ok(),
        Err(e) => {
            warn!("Could not fetch server metrics: {}", e);
            None
        }
    };
    if let Some(m) = &server {
        info!(
            "Server: {} players, {} saves, {} leaderboard rebuilds, avg {:.2}ms",
            m.player_count, m.saves, m.leaderboard_refreshes, m.avg_request_duration_ms
        );
    }

    let error_rate = total_errors as f64 / total_reqs.max(1) as f64;
    let report = LoadTestReport {
        base_url,
        concurrency,
        duration_secs: total_time,
        total_requests: total_reqs,
        total_errors,
        rps: total_reqs as f64 / total_time,
        error_rate,
        endpoints,
        server,
    };

    let results_path = "load_test_results.json";
    match serde_json::to_string_pretty(&report)
        .map_err(|e| e.to_string())
        .and_then(|s| std::fs::write(results_path, s).map_err(|e| e.to_string()))
    {
        Ok(()) => info!("Results written to {}", results_path),
        Err(e) => warn!("Failed to write results: {}", e),
    }

    // Exit with error code if error rate > 10%
    if error_rate > 0.10 {
        error!("Error rate {:.1}% exceeds 10% threshold", error_rate * 100.0);
        std::process::exit(1);
    }
    Ok(())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_num_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    parse_str_arg(args, flag).and_then(|v| v.parse().ok())
}
