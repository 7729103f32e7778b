use std::env;
use std::time::Duration;

use tracing::warn;

use crate::services::attendance_service::DEFAULT_ATTENDANCE_UPDATE_LIMIT;

const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Runtime settings, read once at start-up.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Deployed Apps Script web-app URL. Unset disables the spreadsheet mirror.
    pub sheets_gateway_url: Option<String>,
    /// Unset means requests to the web app are never cut off.
    pub sheets_gateway_timeout: Option<Duration>,
    pub admin_username: String,
    pub admin_password: String,
    pub attendance_update_limit: i64,
    pub public_origin: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://eventdesk.db?mode=rwc".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            sheets_gateway_url: None,
            sheets_gateway_timeout: None,
            admin_username: DEFAULT_ADMIN_USERNAME.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            attendance_update_limit: DEFAULT_ATTENDANCE_UPDATE_LIMIT,
            public_origin: None,
        }
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = non_empty(name)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("{} has an invalid value {:?}, using the default", name, raw);
            None
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let admin_username = non_empty("ADMIN_USERNAME");
        let admin_password = non_empty("ADMIN_PASSWORD");
        if admin_username.is_none() || admin_password.is_none() {
            warn!("ADMIN_USERNAME/ADMIN_PASSWORD not set, falling back to the default admin login");
        }

        let config = Self {
            database_url: non_empty("DATABASE_URL").unwrap_or(defaults.database_url),
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: parsed("PORT").unwrap_or(defaults.port),
            sheets_gateway_url: non_empty("SHEETS_GATEWAY_URL"),
            sheets_gateway_timeout: parsed::<u64>("SHEETS_GATEWAY_TIMEOUT_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs),
            admin_username: admin_username.unwrap_or(defaults.admin_username),
            admin_password: admin_password.unwrap_or(defaults.admin_password),
            attendance_update_limit: parsed("ATTENDANCE_UPDATE_LIMIT")
                .unwrap_or(defaults.attendance_update_limit),
            public_origin: non_empty("PUBLIC_ORIGIN"),
        };

        if config.sheets_gateway_url.is_none() {
            warn!("SHEETS_GATEWAY_URL not set, spreadsheet sync calls will fail");
        }
        config
    }
}
