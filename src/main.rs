use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use eventdesk::config::AppConfig;
use eventdesk::database::{schema, ChangeFeed};
use eventdesk::services::admin_session_service::AdminSessions;
use eventdesk::services::sheets_gateway::AppsScriptGateway;
use eventdesk::services::sync_manager::SyncManager;
use eventdesk::web::{self, state::AppState};

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    info!(database_url = %config.database_url, "connecting to database");

    let pool = schema::open_pool(&config.database_url)
        .await
        .expect("cannot open database");

    let gateway = Arc::new(AppsScriptGateway::new(
        config.sheets_gateway_url.clone(),
        config.sheets_gateway_timeout,
    ));
    let feed = ChangeFeed::default();
    let sync = Arc::new(SyncManager::new(pool.clone(), gateway.clone(), feed.clone()));
    let _listener = sync.start();

    let state = AppState {
        pool,
        feed,
        sync,
        proxy: gateway,
        sessions: Arc::new(AdminSessions::new()),
        config: Arc::new(config.clone()),
    };
    let app = web::router(state);

    // Bind, falling back to port + 1
    let host = config.host.clone();
    let port = config.port;
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("cannot parse HOST/PORT");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            let fallback_port = port.saturating_add(1);
            warn!(
                "could not bind {}: {}, trying fallback {}:{}",
                addr, e, host, fallback_port
            );
            let fallback: SocketAddr = format!("{}:{}", host, fallback_port)
                .parse()
                .expect("cannot parse fallback address");
            tokio::net::TcpListener::bind(fallback)
                .await
                .expect("cannot bind fallback port")
        }
    };

    let bound_addr = listener.local_addr().expect("listener has no local address");
    info!("server listening on http://{}", bound_addr);

    axum::serve(listener, app).await.expect("server error");
}
