use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::database::ChangeFeed;
use crate::services::admin_session_service::AdminSessions;
use crate::services::sheets_gateway::AppsScriptGateway;
use crate::services::sync_manager::SyncManager;

/// Shared handles every handler can reach.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub feed: ChangeFeed,
    pub sync: Arc<SyncManager>,
    /// Raw forwarder behind `/api/sheets`.
    pub proxy: Arc<AppsScriptGateway>,
    pub sessions: Arc<AdminSessions>,
    pub config: Arc<AppConfig>,
}
