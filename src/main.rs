// src/main.rs
use pallet_plan::config::AppConfig;
use pallet_plan::{api, logging};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let dotenv_result = dotenvy::dotenv();
    logging::init();
    if let Err(err) = dotenv_result {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!("⚠️ Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();

    info!("🚀 Pallet planner starting...");
    if let Err(err) = api::start_api_server(app_config.api, app_config.planner).await {
        error!("❌ Pallet planner stopped: {err}");
        std::process::exit(1);
    }
}
