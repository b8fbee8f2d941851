use std::path::Path;
use std::process::ExitCode;

use tracing::{error, info, warn};

use mailgate::{web, AppState, Config, Database, WebServer};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    // Load configuration
    let config_missing = !Path::new(&config_path).exists();
    let config = if config_missing {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    } else {
        match Config::load_with_env(&config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {config_path}: {e}");
                return ExitCode::FAILURE;
            }
        }
    };

    // Initialize logging
    if let Err(e) = mailgate::logging::init(&config.logging) {
        eprintln!("Failed to open log file, logging to the console only: {e}");
        let console = mailgate::config::LoggingConfig {
            file: String::new(),
            ..config.logging.clone()
        };
        let _ = mailgate::logging::init(&console);
    }

    info!("mailgate - authenticated mail gateway");
    if config_missing {
        warn!("{} not found, using defaults and environment", config_path);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    let db = match Database::open(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let state = match AppState::from_config(&config, db.clone()) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize: {}", e);
            db.close().await;
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Relay {}:{}, mailbox {}:{}",
        config.relay.host, config.relay.port, config.mailbox.host, config.mailbox.port
    );

    let result = match WebServer::new(&config.server, state, &config.auth) {
        Ok(server) => server.run(web::shutdown_signal()).await,
        Err(e) => Err(e),
    };

    db.close().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
