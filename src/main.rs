use anyhow::Result;
use resume_ranker::logging::init_tracing;
use resume_ranker::{start_web_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::load()?;

    info!("Starting ResumeRanker API Server");
    info!("Environment: {}", AppConfig::get_environment());
    info!("Scorer: {}", if config.llm.is_enabled() { "llm" } else { "keyword" });

    start_web_server(config).await
}
