mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use citygdp_api::auth::{self, AppStateInner};
use citygdp_api::chatbot::ChatClient;
use citygdp_api::reports::ReportCatalog;
use citygdp_crypto::password::Hasher;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "citygdp=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    info!("Starting with {:?}", config);

    let db = Arc::new(citygdp_db::Database::open(&PathBuf::from(&config.db_path))?);
    let hasher = Hasher::new(config.hash_cost)?;

    if config.report_embed_url.is_empty() {
        warn!("CITYGDP_REPORT_EMBED_URL is not set; report views will have no embed URL");
    }
    let reports = ReportCatalog::new(config.report_embed_url.clone());

    let chat = match config.chat.clone() {
        Some(chat) => Some(ChatClient::new(chat)?),
        None => {
            warn!("CITYGDP_CHAT_API_KEY is not set; chatbot disabled");
            None
        }
    };

    let state = AppStateInner::new(db, hasher, reports, chat);

    let app = auth::routes(state.clone())
        .merge(citygdp_gateway::routes(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("CityGDP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
