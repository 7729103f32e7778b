use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::services::sync_error::SyncError;

const FALLBACK_ERROR: &str = "Failed to sync with sheet";

/// Every request the spreadsheet web app understands. Serialized as
/// `{ "action": <name>, ...payload }` with camelCase payload keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SheetAction {
    CreateEvent {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        event_name: String,
        problem_statements: Vec<String>,
    },
    SyncProblem {
        event_id: String,
        problem_id: String,
    },
    SyncRegistration {
        registration_id: String,
    },
    SyncAllRegistrations {
        event_id: String,
    },
    BulkSync {
        events: Vec<EventSummary>,
    },
    AddProblemStatement {
        spreadsheet_id: String,
        problem_statement: ProblemStatementTitle,
    },
    AppendRow {
        spreadsheet_id: String,
        tab_name: String,
        data: Value,
    },
    UpdateRow {
        spreadsheet_id: String,
        tab_name: String,
        search_key: String,
        search_value: String,
        data: Value,
    },
    FindRow {
        spreadsheet_id: String,
        tab_name: String,
        search_key: String,
        search_value: String,
    },
    #[serde(rename = "exportFromSupabase")]
    ExportFromStore {
        event_id: String,
        problem_id: String,
        event_name: String,
        problem_title: String,
        spreadsheet_id: String,
    },
}

impl SheetAction {
    pub fn name(&self) -> &'static str {
        match self {
            SheetAction::CreateEvent { .. } => "createEvent",
            SheetAction::SyncProblem { .. } => "syncProblem",
            SheetAction::SyncRegistration { .. } => "syncRegistration",
            SheetAction::SyncAllRegistrations { .. } => "syncAllRegistrations",
            SheetAction::BulkSync { .. } => "bulkSync",
            SheetAction::AddProblemStatement { .. } => "addProblemStatement",
            SheetAction::AppendRow { .. } => "appendRow",
            SheetAction::UpdateRow { .. } => "updateRow",
            SheetAction::FindRow { .. } => "findRow",
            SheetAction::ExportFromStore { .. } => "exportFromSupabase",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemStatementTitle {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,
    #[serde(default)]
    pub problem_statements: Vec<ProblemSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemSummary {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_name: Option<String>,
}

/// Response envelope of the spreadsheet web app.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetResponse {
    #[serde(default)]
    pub status: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_number: Option<i64>,
    #[serde(rename = "reg_code", skip_serializing_if = "Option::is_none")]
    pub reg_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found: Option<bool>,
}

impl SheetResponse {
    pub fn ok() -> Self {
        Self {
            status: 200,
            success: Some(true),
            ..Default::default()
        }
    }

    /// An envelope with `status >= 400` is a failure even when the transport succeeded.
    pub fn into_result(self) -> Result<Self, SyncError> {
        if self.status >= 400 {
            return Err(SyncError::Remote(
                self.error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| FALLBACK_ERROR.to_string()),
            ));
        }
        Ok(self)
    }
}

#[async_trait]
pub trait SheetsGateway: Send + Sync {
    /// Sends one action. Transport failures and non-2xx statuses are errors;
    /// the envelope itself is returned unchecked.
    async fn post(&self, action: &SheetAction) -> Result<SheetResponse, SyncError>;
}

/// Sends `action` and applies the envelope status rule.
pub async fn post_checked(
    gateway: &dyn SheetsGateway,
    action: SheetAction,
) -> Result<SheetResponse, SyncError> {
    debug!(action = action.name(), "sheets_post");
    let response = gateway.post(&action).await?;
    response.into_result().inspect_err(|e| {
        warn!(action = action.name(), error = %e, "sheets_post_rejected");
    })
}

/// Raw reply relayed by the `/api/sheets` proxy.
#[derive(Debug, Clone)]
pub struct ProxyReply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("SHEETS_GATEWAY_URL not configured")]
    NotConfigured,
    #[error("{0}")]
    Transport(String),
}

/// Client for a deployed Apps Script web app.
#[derive(Clone)]
pub struct AppsScriptGateway {
    client: reqwest::Client,
    url: Option<String>,
}

impl AppsScriptGateway {
    /// `timeout = None` leaves requests unbounded, like the browser fetch it replaces.
    pub fn new(url: Option<String>, timeout: Option<Duration>) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().unwrap_or_else(|e| {
            warn!("sheets client builder failed, using defaults: {}", e);
            reqwest::Client::new()
        });
        Self {
            client,
            url: url.filter(|u| !u.trim().is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Forwards a caller-built JSON body untouched and relays the reply.
    pub async fn forward_raw(&self, body: String) -> Result<ProxyReply, ProxyError> {
        let url = self.url.as_deref().ok_or(ProxyError::NotConfigured)?;
        let resp = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ProxyError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = resp
            .text()
            .await
            .map_err(|e| ProxyError::Transport(e.to_string()))?;
        debug!(status, body_len = body.len(), "sheets_proxy_reply");
        Ok(ProxyReply {
            status,
            content_type,
            body,
        })
    }
}

fn connect_failed(url: &str, err: impl ToString) -> SyncError {
    SyncError::Remote(format!("connect_failed: {} ({})", err.to_string(), url))
}

#[async_trait]
impl SheetsGateway for AppsScriptGateway {
    async fn post(&self, action: &SheetAction) -> Result<SheetResponse, SyncError> {
        let Some(url) = self.url.as_deref() else {
            return Err(SyncError::Remote("sheets gateway not configured".to_string()));
        };

        let resp = self
            .client
            .post(url)
            .json(action)
            .send()
            .await
            .map_err(|e| connect_failed(url, e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| connect_failed(url, e))?;
        let parsed = serde_json::from_str::<SheetResponse>(&text);

        if !status.is_success() {
            let message = parsed
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| FALLBACK_ERROR.to_string());
            warn!(action = action.name(), status = %status, "sheets_gateway_non_ok");
            return Err(SyncError::Remote(message));
        }

        parsed.map_err(|e| SyncError::Remote(format!("invalid sheets response: {}", e)))
    }
}
