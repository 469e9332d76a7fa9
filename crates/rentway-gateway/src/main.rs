//! Rentway API gateway — entry point.
//!
//! Reads configuration from the optional settings file (`GATEWAY_CONFIG`,
//! default `gateway.{toml,yaml,json}`) and the environment, then starts the
//! axum-based HTTP gateway.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PORT` | `3000` | TCP port to listen on. |
//! | `GATEWAY_ENV` | `development` | `production` restricts CORS to the allow-list. |
//! | `LOG_LEVEL` | `info` | Level used when `RUST_LOG` is unset. |
//! | `LOG_FORMAT` | `text` | `text` or `json`. |
//! | `FRONTEND_URL` | `http://frontend:4000` | First allowed CORS origin. |
//! | `ADDITIONAL_CORS_ORIGINS` | *(none)* | Comma-separated extra origins. |
//! | `RATE_LIMIT_MAX_REQUESTS` | `100` | Requests per client per window. |
//! | `RATE_LIMIT_WINDOW_SECONDS` | `60` | Sliding window length. |
//! | `PUBLIC_API_PATHS` | *(built-in list)* | Comma-separated paths that skip auth. |
//! | `REQUEST_TIMEOUT_SECS` | `30` | Upstream timeout. |
//! | `*_SERVICE_URL` | `http://<name>-service:300N` | Backend base URLs. |

use rentway_gateway::server::GatewayServer;
use rentway_gateway::settings::{LogFormat, Settings};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Gateway configuration error: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(&settings);

    info!(
        port        = settings.port,
        env         = ?settings.gateway_env,
        rate_limit  = settings.rate_limit_max_requests,
        window_secs = settings.rate_limit_window_seconds,
        "Rentway gateway configuration loaded"
    );

    let server = GatewayServer::new(settings.server_config());
    if let Err(e) = server.start(settings.gateway_config()).await {
        error!(error = %e, "gateway terminated");
        std::process::exit(1);
    }
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_directive()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match settings.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
