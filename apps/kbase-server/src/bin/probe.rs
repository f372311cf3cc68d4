use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::{json, Value};

use kbase_server::QueryResponse;

const DEFAULT_QUERIES: &[(&str, u8)] = &[
    ("What spells can a Wizard learn at level 5?", 3),
    ("Describe a Common, Goblin", 2),
    ("What are the available backgrounds in the official 5e sourcebooks?", 1),
    ("List the available feats for a Rogue character.", 3),
];

const PREVIEW_CHARS: usize = 150;

/// Smoke-test a deployed knowledge base service.
#[derive(Parser)]
#[command(name = "kbase-probe", version, about)]
struct Args {
    /// Base URL of the service.
    #[arg(long, env = "KBASE_URL", default_value = "http://127.0.0.1:8080")]
    url: String,

    /// Query to send; repeatable. Replaces the built-in query set.
    #[arg(long = "query")]
    queries: Vec<String>,

    /// `top_k` sent with `--query` queries.
    #[arg(long, default_value_t = 3)]
    top_k: u8,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 45)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let base = args.url.trim_end_matches('/').to_string();
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;

    let plan: Vec<(String, u8)> = if args.queries.is_empty() {
        DEFAULT_QUERIES.iter().map(|(q, k)| (q.to_string(), *k)).collect()
    } else {
        args.queries.into_iter().map(|q| (q, args.top_k)).collect()
    };

    let mut failures = 0usize;
    if let Err(e) = check_health(&client, &base).await {
        println!("health: FAILED ({e:#})");
        failures += 1;
    }
    for (query, top_k) in &plan {
        println!("\nquery: {query} (top_k={top_k})");
        if let Err(e) = run_query(&client, &base, query, *top_k).await {
            println!("  FAILED ({e:#})");
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{failures} probe request(s) failed");
    }
    println!("\nall probe requests succeeded");
    Ok(())
}

async fn check_health(client: &reqwest::Client, base: &str) -> Result<()> {
    let started = Instant::now();
    let response = client.get(format!("{base}/health")).send().await.context("request failed")?;
    let status = response.status();
    let body: Value = response.json().await.context("health body is not JSON")?;
    println!("health: {status} in {:.2}s {body}", started.elapsed().as_secs_f64());
    if body["status"] != "ok" {
        bail!("service reports {}", body["status"]);
    }
    Ok(())
}

async fn run_query(client: &reqwest::Client, base: &str, query: &str, top_k: u8) -> Result<()> {
    let started = Instant::now();
    let response = client
        .post(format!("{base}/query"))
        .json(&json!({ "query": query, "top_k": top_k }))
        .send()
        .await
        .context("request failed")?;
    let status = response.status();
    println!("  status: {status} in {:.2}s", started.elapsed().as_secs_f64());
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        bail!("unexpected status {status}: {text}");
    }

    let body: QueryResponse = response.json().await.context("response body does not match the query schema")?;
    println!("  results: {}", body.results.len());
    if let Some(top) = body.results.first() {
        let source = top.metadata.get("source").and_then(Value::as_str).unwrap_or("N/A");
        let preview: String = top.content.chars().take(PREVIEW_CHARS).collect();
        println!("  top: score={:.4} source={source}", top.score);
        println!("       {preview}...");
    }
    Ok(())
}
