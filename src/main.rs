use std::sync::Arc;

use anyhow::Context;

use mail_triage::api::mail_routes;
use mail_triage::config::AppConfig;
use mail_triage::llm::create_gateway;
use mail_triage::pipeline::TriageService;
use mail_triage::store::{Database, MailStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    eprintln!("📬 Mail Triage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Generation model: {}", config.gateway.generation_model);
    eprintln!("   Classifier model: {}", config.gateway.classifier_model);
    eprintln!("   Inference: {}", config.gateway.base_url);
    if config.gateway.api_token.is_none() {
        eprintln!("   Warning: HF_TOKEN not set, hosted inference will reject requests");
    }

    // Model handles are created once and shared by every request.
    let gateway = create_gateway(&config.gateway).context("Failed to create model gateway")?;

    // ── Database ─────────────────────────────────────────────────────────
    let store = MailStore::new(Database::new(&config.db_path));
    store
        .init_schema()
        .with_context(|| format!("Failed to initialise database at {}", config.db_path.display()))?;
    eprintln!("   Database: {}", config.db_path.display());

    let service = Arc::new(TriageService::new(gateway, store));
    let app = mail_routes(service);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    eprintln!("   API: http://{}\n", config.bind_addr);
    tracing::info!(addr = %config.bind_addr, "Mail triage server started");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
