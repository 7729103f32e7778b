use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::services::sheets_gateway::{SheetAction, SheetResponse, SheetsGateway};
use crate::services::sync_error::SyncError;

/// In-process gateway that records every action it receives.
///
/// Unscripted calls succeed; `createEvent` hands out `sheet-<n>` ids.
#[derive(Default)]
pub struct FakeSheetsGateway {
    calls: Mutex<Vec<SheetAction>>,
    scripted: Mutex<HashMap<&'static str, VecDeque<Result<SheetResponse, String>>>>,
    created: AtomicU64,
    delay: Duration,
}

impl FakeSheetsGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `delay` after being recorded.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Queues the reply for the next call of `action`.
    pub fn script(&self, action: &'static str, response: SheetResponse) {
        self.queue(action, Ok(response));
    }

    /// Queues a transport failure for the next call of `action`.
    pub fn fail_next(&self, action: &'static str, message: &str) {
        self.queue(action, Err(message.to_string()));
    }

    pub fn calls(&self) -> Vec<SheetAction> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls().iter().map(|a| a.name()).collect()
    }

    pub fn count(&self, action: &str) -> usize {
        self.calls().iter().filter(|a| a.name() == action).count()
    }

    fn queue(&self, action: &'static str, reply: Result<SheetResponse, String>) {
        self.scripted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(action)
            .or_default()
            .push_back(reply);
    }

    fn default_reply(&self, action: &SheetAction) -> SheetResponse {
        match action {
            SheetAction::CreateEvent { .. } => {
                let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
                SheetResponse {
                    spreadsheet_id: Some(format!("sheet-{}", n)),
                    ..SheetResponse::ok()
                }
            }
            SheetAction::FindRow { .. } => SheetResponse {
                found: Some(false),
                ..SheetResponse::ok()
            },
            _ => SheetResponse::ok(),
        }
    }
}

#[async_trait]
impl SheetsGateway for FakeSheetsGateway {
    async fn post(&self, action: &SheetAction) -> Result<SheetResponse, SyncError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(action.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = self
            .scripted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(action.name())
            .and_then(|q| q.pop_front());

        match scripted {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(SyncError::Remote(message)),
            None => Ok(self.default_reply(action)),
        }
    }
}
