use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use paperfeed_api::auth::{AppState, AppStateInner, Config};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paperfeed=debug,tower_http=debug".into()),
        )
        .init();

    // Config — read once, then immutable
    let jwt_secret = std::env::var("PAPERFEED_JWT_SECRET").unwrap_or_default();
    if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
        eprintln!("FATAL: PAPERFEED_JWT_SECRET is unset or still a placeholder.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    let db_path = std::env::var("PAPERFEED_DB_PATH").unwrap_or_else(|_| "paperfeed.db".into());
    let host = std::env::var("PAPERFEED_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PAPERFEED_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let upload_dir: PathBuf = std::env::var("PAPERFEED_UPLOAD_DIR")
        .unwrap_or_else(|_| "./uploads".into())
        .into();
    let token_expiry_minutes: i64 = std::env::var("PAPERFEED_TOKEN_EXPIRY_MINUTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(60 * 24);

    let db = paperfeed_db::Database::open(&PathBuf::from(&db_path))?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        config: Config {
            jwt_secret,
            token_expiry_minutes,
            upload_dir,
        },
    });

    let app = paperfeed_api::router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("paperfeed server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
