use bankassist_agent::{
    agent::BankingAgent,
    api::{start_server, ApiState},
    config::Settings,
    rag::{corpus::FileCorpus, BankingRag},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    dotenv::dotenv().ok();
    let settings = Settings::from_env();

    if settings.gemini_api_key.is_empty() {
        eprintln!("⚠️  GEMINI_API_KEY not set in .env");
        eprintln!("📌 Chat requests will fail until it is configured");
    }

    info!("🚀 Banking AI Agent - API Server");
    info!("📍 Port: {}", settings.backend_port);

    let corpus = FileCorpus::new(&settings.data_dir);
    let rag = Arc::new(BankingRag::initialize(&settings, &corpus)?);
    info!("✅ RAG ready ({} indexed chunks)", rag.len());

    let rag_entries = rag.len();
    let agent = Arc::new(BankingAgent::from_settings(&settings, rag));

    info!("✅ Agent initialized");
    info!("📡 Starting API server...");

    start_server(
        ApiState {
            agent,
            model: settings.gemini_model.clone(),
            rag_entries,
        },
        settings.backend_port,
    )
    .await?;

    Ok(())
}
