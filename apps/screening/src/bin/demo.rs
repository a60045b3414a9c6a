//! End-to-end demo: ingests a few sample resumes, submits one hiring
//! requirement, and prints the ranked screening report.
//!
//! Requires ANTHROPIC_API_KEY and OPENAI_API_KEY (see Config::from_env).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use screening::cache::{CacheLayer, CacheStore, MemoryCacheStore, RedisCacheStore};
use screening::embedding::OpenAiEmbedder;
use screening::index::MemoryVectorIndex;
use screening::llm::AnthropicClient;
use screening::models::QueryStatus;
use screening::{Config, ScreeningConfig, ScreeningPipeline};

const SAMPLE_RESUMES: [&str; 3] = [
    "Jane Doe — Senior Backend Engineer. 7 years building payment systems in \
     Rust and PostgreSQL. MSc Computer Science. Based in Berlin, open to \
     hybrid work. Expected salary 28K. Led a team of four at a fintech \
     startup; strong ownership and mentoring record.",
    "John Smith — Data Engineer. 4 years of Python, Spark, and Airflow on \
     analytics pipelines. Bachelor's degree. Remote worker based in Lisbon, \
     comfortable with async collaboration. Expected salary 22K.",
    "Maria Garcia — Staff Engineer. 11 years across infrastructure and \
     distributed systems, mostly Go and Rust. PhD in distributed computing. \
     Based in Munich, expects 45K, on-site preferred.",
];

const QUERY: &str = "Senior Rust engineer for our Berlin payments team, at \
    least 5 years of experience, bachelor's degree or better, budget \
    20K-30K. Fintech background is a big plus.";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting screening demo v{}", env!("CARGO_PKG_VERSION"));

    let llm = Arc::new(AnthropicClient::new(
        config.anthropic_api_key.clone(),
        Duration::from_secs(60),
    ));
    let embedder = Arc::new(OpenAiEmbedder::new(
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
        config.embedding_model.clone(),
        config.embedding_dimension,
    ));
    let index = Arc::new(MemoryVectorIndex::new());

    let store: Arc<dyn CacheStore> = match &config.redis_url {
        Some(url) => {
            info!("using redis cache at {url}");
            Arc::new(RedisCacheStore::new(url)?)
        }
        None => {
            info!("REDIS_URL not set, using in-memory cache");
            Arc::new(MemoryCacheStore::new())
        }
    };
    let cache = Arc::new(CacheLayer::new(store));

    let pipeline =
        ScreeningPipeline::new(llm, embedder, index, cache, ScreeningConfig::default());

    info!("ingesting {} sample resumes", SAMPLE_RESUMES.len());
    let ids = pipeline
        .ingest_batch(SAMPLE_RESUMES.iter().map(|r| r.to_string()).collect())
        .await;
    info!("ingested {} resumes", ids.len());

    let query_id = pipeline.submit_query(QUERY).await?;
    info!(%query_id, "query submitted, polling for results");

    let report = loop {
        match pipeline.fetch_results(query_id).await? {
            QueryStatus::Pending => tokio::time::sleep(Duration::from_millis(250)).await,
            QueryStatus::Ready { report } => break *report,
            QueryStatus::Failed { message, retryable } => {
                anyhow::bail!("screening failed (retryable: {retryable}): {message}")
            }
        }
    };

    println!("\n=== Screening report for query {} ===", report.query_id);
    println!("{}\n", report.query_text);
    println!(
        "retrieved {} / filtered out {} / insufficient data {}",
        report.provenance.retrieved,
        report.provenance.filtered_out,
        report.provenance.insufficient_data,
    );
    println!(
        "cache: interpretation hit = {}, analysis {} hits / {} misses\n",
        report.provenance.interpretation_cache_hit,
        report.provenance.analysis_cache_hits,
        report.provenance.analysis_cache_misses,
    );

    for candidate in &report.candidates {
        println!(
            "#{} {} — composite {:.1} (similarity {:.3})",
            candidate.rank,
            candidate.name.as_deref().unwrap_or("<unknown>"),
            candidate.breakdown.composite,
            candidate.similarity,
        );
        let b = &candidate.breakdown;
        println!(
            "   skills {:.0} | experience {:.0} | education {:.0} | salary {:.0} | location {:.0} | domain {:.0}",
            b.skills, b.experience, b.education, b.salary, b.location, b.domain,
        );
        if let Some(narrative) = &candidate.narrative {
            println!("   {narrative}");
        }
        for annotation in &candidate.annotations {
            println!("   note: {annotation:?}");
        }
        println!();
    }

    Ok(())
}
