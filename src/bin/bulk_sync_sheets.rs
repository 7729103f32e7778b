use std::env;
use std::sync::Arc;

use dotenvy::dotenv;

use eventdesk::config::AppConfig;
use eventdesk::database::{schema, ChangeFeed};
use eventdesk::services::event_service;
use eventdesk::services::sheets_gateway::AppsScriptGateway;
use eventdesk::services::sync_manager::SyncManager;

/// One-shot mirror of every event (or the single event id given as argument).
#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    let pool = schema::open_pool(&config.database_url)
        .await
        .expect("cannot open database");
    let gateway = Arc::new(AppsScriptGateway::new(
        config.sheets_gateway_url.clone(),
        config.sheets_gateway_timeout,
    ));
    let sync = SyncManager::new(pool.clone(), gateway, ChangeFeed::default());

    let result = match env::args().nth(1) {
        Some(event_id) => sync.bulk_sync_for_event(&event_id).await,
        None => {
            let events = match event_service::build_event_summaries(&pool, None).await {
                Ok(events) => events,
                Err(e) => {
                    eprintln!("bulk sync: cannot load events: {}", e);
                    std::process::exit(1);
                }
            };
            println!("bulk sync: {} events", events.len());
            sync.bulk_sync(events).await
        }
    };

    match result {
        Ok(res) => {
            println!(
                "bulk sync: status={}, success={}",
                res.status,
                res.success.unwrap_or(true)
            );
        }
        Err(e) => {
            eprintln!("bulk sync failed: {}", e);
            std::process::exit(1);
        }
    }
}
