use std::collections::HashSet;
use std::sync::Mutex;

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppConfig;

pub const ADMIN_SESSION_COOKIE: &str = "admin_session";

/// Live admin session tokens. Process-local; a restart logs everyone out.
#[derive(Default)]
pub struct AdminSessions {
    tokens: Mutex<HashSet<String>>,
}

impl AdminSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh token when the credential pair matches the configured one.
    pub fn login(&self, config: &AppConfig, username: &str, password: &str) -> Option<String> {
        if username.trim() != config.admin_username || password != config.admin_password {
            warn!(username = username.trim(), "admin login rejected");
            return None;
        }
        let token = Uuid::new_v4().simple().to_string();
        self.tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.clone());
        info!("admin session opened");
        Some(token)
    }

    pub fn is_valid(&self, token: &str) -> bool {
        self.tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(token)
    }

    pub fn logout(&self, token: &str) -> bool {
        self.tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(token)
    }
}
