use anyhow::Result;
use clap::Parser;

use kbase_core::config::Config;
use kbase_retrieval::load_resources;
use kbase_server::init_tracing;

/// Run one query against the configured artifacts without starting the server.
#[derive(Parser)]
#[command(name = "kbase-query", version, about)]
struct Args {
    /// Query text.
    query: String,

    /// Number of results; defaults to `search.default_top_k`.
    #[arg(long)]
    top_k: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let settings = Config::load()?.settings()?;
    let top_k = settings.search.resolve_top_k(args.top_k)?;

    let retriever = load_resources(&settings).await?;
    let results = retriever.query(&args.query, top_k).await?;

    println!("Found {} results for: \"{}\"", results.len(), args.query);
    for (i, result) in results.iter().enumerate() {
        let source = result.metadata.get("source").and_then(|v| v.as_str()).unwrap_or("N/A");
        println!("\n  {}. score={:.4}  source={}", i + 1, result.score, source);
        println!("     {}", result.content);
    }
    Ok(())
}
