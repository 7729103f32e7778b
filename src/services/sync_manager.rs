use std::sync::Arc;

use serde_json::json;
use sqlx::SqlitePool;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::database::{
    events_repo, now_timestamp, problem_statements_repo, registrations_repo, ChangeFeed,
    ChangeKind, RowChange, Table,
};
use crate::models::RegistrationPatch;
use crate::services::in_flight::{InFlightGuard, InFlightOps};
use crate::services::sheets_gateway::{
    post_checked, EventSummary, ProblemStatementTitle, SheetAction, SheetResponse, SheetsGateway,
};
use crate::services::sync_error::SyncError;

const KEY_ENSURE_EVENT: &str = "ensureEvent";
const KEY_ENSURE_PROBLEM: &str = "ensureProblem";
const KEY_SYNC_REGISTRATION: &str = "syncReg";
const KEY_UPSERT_REGISTRATION: &str = "upsertReg";
const KEY_UPDATE_BY_CODE: &str = "updateByCode";
const KEY_SYNC_ALL: &str = "syncAll";
const KEY_APPEND_REGISTRATION: &str = "appendReg";
const KEY_BULK_SYNC: &str = "bulkSync";
const KEY_ADD_PROBLEM: &str = "addProblem";

/// Mirrors events, problem statements and registrations into the event spreadsheets.
///
/// At most one locally started operation runs per key (operation kind plus
/// target). A second call under a running key fails with `SyncError::Conflict`,
/// except the two tab operations which return `Ok(())` instead. Nothing is queued
/// or retried.
pub struct SyncManager {
    pool: SqlitePool,
    gateway: Arc<dyn SheetsGateway>,
    feed: ChangeFeed,
    in_flight: InFlightOps,
}

impl SyncManager {
    /// Builds the coordinator without listening to the feed; see [`SyncManager::start`].
    pub fn new(pool: SqlitePool, gateway: Arc<dyn SheetsGateway>, feed: ChangeFeed) -> Self {
        Self {
            pool,
            gateway,
            feed,
            in_flight: InFlightOps::new(),
        }
    }

    pub fn gateway(&self) -> &dyn SheetsGateway {
        self.gateway.as_ref()
    }

    pub fn in_flight(&self) -> &InFlightOps {
        &self.in_flight
    }

    fn begin(&self, prefix: &str, id: Option<&str>) -> Result<InFlightGuard<'_>, SyncError> {
        let key = InFlightOps::key(prefix, id);
        self.in_flight
            .try_begin(&key)
            .ok_or(SyncError::Conflict(key))
    }

    async fn post(&self, action: SheetAction) -> Result<SheetResponse, SyncError> {
        post_checked(self.gateway.as_ref(), action).await
    }

    /// Returns the event's spreadsheet id, creating the spreadsheet when the
    /// event has none yet.
    pub async fn ensure_event_spreadsheet(&self, event_id: &str) -> Result<String, SyncError> {
        let _guard = self.begin(KEY_ENSURE_EVENT, Some(event_id))?;

        let event = events_repo::load_event(&self.pool, event_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("event {}", event_id)))?;

        if let Some(sheet_id) = event.spreadsheet_id() {
            return Ok(sheet_id.to_string());
        }

        let problem_titles = problem_statements_repo::list_for_event(&self.pool, event_id)
            .await?
            .into_iter()
            .map(|p| p.title)
            .collect();

        let res = self
            .post(SheetAction::CreateEvent {
                event_id: Some(event.id.clone()),
                event_name: event.name.clone(),
                problem_statements: problem_titles,
            })
            .await?;

        let spreadsheet_id = res
            .spreadsheet_id
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| SyncError::Remote("Failed to create spreadsheet".to_string()))?;

        let claimed =
            events_repo::claim_sheet_id(&self.pool, event_id, &spreadsheet_id, &now_timestamp())
                .await?;
        if claimed == 0 {
            // Someone stored an id between our read and write; theirs stands.
            if let Some(existing) = events_repo::load_event(&self.pool, event_id)
                .await?
                .and_then(|e| e.spreadsheet_id().map(|s| s.to_string()))
            {
                warn!(
                    event_id,
                    kept = %existing,
                    discarded = %spreadsheet_id,
                    "event spreadsheet already assigned"
                );
                return Ok(existing);
            }
        }

        info!(event_id, spreadsheet_id = %spreadsheet_id, "event spreadsheet created");
        Ok(spreadsheet_id)
    }

    /// Creates or refreshes the problem statement's tab. A call for a pair that
    /// is already running is a silent no-op.
    pub async fn ensure_problem_tab(&self, event_id: &str, problem_id: &str) -> Result<(), SyncError> {
        let pair = format!("{}-{}", event_id, problem_id);
        let Ok(_guard) = self.begin(KEY_ENSURE_PROBLEM, Some(&pair)) else {
            debug!(event_id, problem_id, "problem tab sync already running, skipping");
            return Ok(());
        };

        let res = self
            .post(SheetAction::SyncProblem {
                event_id: event_id.to_string(),
                problem_id: problem_id.to_string(),
            })
            .await?;

        if let Some(tab) = res.tab_name.as_deref().filter(|t| !t.is_empty()) {
            problem_statements_repo::set_tab_name(&self.pool, problem_id, tab).await?;
        }
        Ok(())
    }

    pub async fn sync_registration(&self, registration_id: &str) -> Result<SheetResponse, SyncError> {
        let _guard = self.begin(KEY_SYNC_REGISTRATION, Some(registration_id))?;
        self.post(SheetAction::SyncRegistration {
            registration_id: registration_id.to_string(),
        })
        .await
    }

    /// Same remote action as [`SyncManager::sync_registration`] under its own key,
    /// so the two never reject each other.
    pub async fn upsert_registration(&self, registration_id: &str) -> Result<(), SyncError> {
        let _guard = self.begin(KEY_UPSERT_REGISTRATION, Some(registration_id))?;
        self.post(SheetAction::SyncRegistration {
            registration_id: registration_id.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Writes `patch` to the registration matching `(reg_code, event_id)` and then
    /// mirrors it. A gateway failure leaves the database write in place.
    pub async fn update_registration_by_code(
        &self,
        event_id: &str,
        reg_code: &str,
        patch: &RegistrationPatch,
    ) -> Result<bool, SyncError> {
        let _guard = self.begin(KEY_UPDATE_BY_CODE, Some(reg_code))?;

        let registration_id = registrations_repo::update_by_code(
            &self.pool,
            event_id,
            reg_code,
            patch,
            &now_timestamp(),
        )
        .await?
        .ok_or_else(|| SyncError::NotFound(format!("registration {}", reg_code)))?;

        self.feed.publish(
            Table::Registrations,
            ChangeKind::Update,
            json!({ "id": registration_id, "event_id": event_id, "reg_code": reg_code }),
        );

        self.post(SheetAction::SyncRegistration { registration_id })
            .await?;
        Ok(true)
    }

    pub async fn sync_all_registrations(&self, event_id: &str) -> Result<SheetResponse, SyncError> {
        let _guard = self.begin(KEY_SYNC_ALL, Some(event_id))?;
        self.post(SheetAction::SyncAllRegistrations {
            event_id: event_id.to_string(),
        })
        .await
    }

    /// Alias of [`SyncManager::sync_all_registrations`].
    pub async fn bulk_sync_for_event(&self, event_id: &str) -> Result<SheetResponse, SyncError> {
        self.sync_all_registrations(event_id).await
    }

    /// Ensures spreadsheet, then tab, then upserts the registration row; stops at
    /// the first failure.
    pub async fn append_registration(&self, registration_id: &str) -> Result<(), SyncError> {
        let _guard = self.begin(KEY_APPEND_REGISTRATION, Some(registration_id))?;

        let reg = registrations_repo::load_sheet_context(&self.pool, registration_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("registration {}", registration_id)))?;

        self.ensure_event_spreadsheet(&reg.event_id).await?;
        self.ensure_problem_tab(&reg.event_id, &reg.problem_statement_id)
            .await?;

        self.post(SheetAction::SyncRegistration {
            registration_id: registration_id.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Process-wide: a second bulk sync is refused whatever events it names.
    pub async fn bulk_sync(&self, events: Vec<EventSummary>) -> Result<SheetResponse, SyncError> {
        let _guard = self.begin(KEY_BULK_SYNC, None)?;
        info!(events = events.len(), "bulk sync started");
        self.post(SheetAction::BulkSync { events }).await
    }

    pub async fn add_problem_statement(
        &self,
        event_id: &str,
        problem_id: &str,
        title: &str,
    ) -> Result<(), SyncError> {
        let pair = format!("{}:{}", event_id, problem_id);
        let Ok(_guard) = self.begin(KEY_ADD_PROBLEM, Some(&pair)) else {
            return Ok(());
        };

        let spreadsheet_id = self.ensure_event_spreadsheet(event_id).await?;
        self.post(SheetAction::AddProblemStatement {
            spreadsheet_id,
            problem_statement: ProblemStatementTitle {
                title: title.to_string(),
            },
        })
        .await?;
        Ok(())
    }

    /// Subscribes to the change feed and mirrors inserts (and registration
    /// updates) as they commit. Each change is handled on its own task.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.feed.subscribe();
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            info!("sync manager listening for row changes");
            loop {
                match rx.recv().await {
                    Ok(change) => {
                        let manager = Arc::clone(&manager);
                        tokio::spawn(async move { manager.handle_change(change).await });
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "sync manager lagged behind the change feed");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            info!("change feed closed, sync manager stopped");
        })
    }

    async fn handle_change(&self, change: RowChange) {
        let Some(id) = change.id() else {
            return;
        };

        let result = match (change.table, change.kind) {
            (Table::Events, ChangeKind::Insert) => {
                self.ensure_event_spreadsheet(id).await.map(|_| ())
            }
            (Table::ProblemStatements, ChangeKind::Insert) => {
                let Some(event_id) = change.field("event_id") else {
                    return;
                };
                self.ensure_problem_tab(event_id, id).await
            }
            (Table::Registrations, ChangeKind::Insert | ChangeKind::Update) => {
                self.sync_registration(id).await.map(|_| ())
            }
            _ => return,
        };

        match result {
            Ok(()) => debug!(table = change.table.as_str(), id, "auto sync done"),
            Err(e) if e.is_conflict() => {
                debug!(table = change.table.as_str(), id, "auto sync skipped, already being handled")
            }
            Err(e) => warn!(table = change.table.as_str(), id, error = %e, "auto sync failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::services::fake_sheets_gateway::FakeSheetsGateway;
    use crate::services::test_support::{memory_pool, seed_event, seed_problem, seed_registration};

    fn manager(pool: &SqlitePool, gateway: &Arc<FakeSheetsGateway>) -> SyncManager {
        SyncManager::new(pool.clone(), gateway.clone(), ChangeFeed::default())
    }

    fn slow_gateway() -> Arc<FakeSheetsGateway> {
        Arc::new(FakeSheetsGateway::with_delay(Duration::from_millis(25)))
    }

    #[tokio::test]
    async fn concurrent_ensure_event_creates_one_spreadsheet() {
        let pool = memory_pool().await;
        seed_event(&pool, "e1", None).await;
        let gateway = slow_gateway();
        let sync = manager(&pool, &gateway);

        let (first, second) = tokio::join!(
            sync.ensure_event_spreadsheet("e1"),
            sync.ensure_event_spreadsheet("e1")
        );

        assert_eq!(first.unwrap(), "sheet-1");
        assert!(matches!(second, Err(SyncError::Conflict(ref k)) if k == "ensureEvent:e1"));
        assert_eq!(gateway.count("createEvent"), 1);
        assert!(sync.in_flight().is_empty());

        let stored = events_repo::load_event(&pool, "e1").await.unwrap().unwrap();
        assert_eq!(stored.sheet_id.as_deref(), Some("sheet-1"));
    }

    #[tokio::test]
    async fn ensure_event_returns_existing_id_without_remote_call() {
        let pool = memory_pool().await;
        seed_event(&pool, "e1", Some("existing-sheet")).await;
        let gateway = Arc::new(FakeSheetsGateway::new());
        let sync = manager(&pool, &gateway);

        assert_eq!(sync.ensure_event_spreadsheet("e1").await.unwrap(), "existing-sheet");
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn ensure_event_sends_event_name_and_problem_titles() {
        let pool = memory_pool().await;
        seed_event(&pool, "e1", None).await;
        seed_problem(&pool, "p1", "e1", "Smart Farming").await;
        let gateway = Arc::new(FakeSheetsGateway::new());
        let sync = manager(&pool, &gateway);

        sync.ensure_event_spreadsheet("e1").await.unwrap();
        assert_eq!(
            gateway.calls(),
            vec![SheetAction::CreateEvent {
                event_id: Some("e1".into()),
                event_name: "Event e1".into(),
                problem_statements: vec!["Smart Farming".into()],
            }]
        );
    }

    #[tokio::test]
    async fn failed_ensure_releases_key_for_retry() {
        let pool = memory_pool().await;
        seed_event(&pool, "e1", None).await;
        let gateway = Arc::new(FakeSheetsGateway::new());
        gateway.fail_next("createEvent", "apps script down");
        let sync = manager(&pool, &gateway);

        let err = sync.ensure_event_spreadsheet("e1").await.unwrap_err();
        assert!(matches!(err, SyncError::Remote(ref m) if m == "apps script down"));
        assert!(!sync.in_flight().contains("ensureEvent:e1"));

        assert_eq!(sync.ensure_event_spreadsheet("e1").await.unwrap(), "sheet-1");
        assert_eq!(gateway.count("createEvent"), 2);
    }

    #[tokio::test]
    async fn ensure_event_without_returned_id_is_remote_error() {
        let pool = memory_pool().await;
        seed_event(&pool, "e1", None).await;
        let gateway = Arc::new(FakeSheetsGateway::new());
        gateway.script("createEvent", SheetResponse::ok());
        let sync = manager(&pool, &gateway);

        let err = sync.ensure_event_spreadsheet("e1").await.unwrap_err();
        assert!(matches!(err, SyncError::Remote(_)));
        let stored = events_repo::load_event(&pool, "e1").await.unwrap().unwrap();
        assert!(stored.sheet_id.is_none());
    }

    #[tokio::test]
    async fn ensure_event_for_missing_row_is_not_found() {
        let pool = memory_pool().await;
        let gateway = Arc::new(FakeSheetsGateway::new());
        let sync = manager(&pool, &gateway);

        let err = sync.ensure_event_spreadsheet("ghost").await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
        assert!(gateway.calls().is_empty());
        assert!(sync.in_flight().is_empty());
    }

    #[tokio::test]
    async fn concurrent_ensure_problem_tab_is_a_silent_no_op() {
        let pool = memory_pool().await;
        seed_event(&pool, "e1", Some("s1")).await;
        seed_problem(&pool, "p1", "e1", "AI").await;
        let gateway = slow_gateway();
        let sync = manager(&pool, &gateway);

        let (first, second) = tokio::join!(
            sync.ensure_problem_tab("e1", "p1"),
            sync.ensure_problem_tab("e1", "p1")
        );
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(gateway.count("syncProblem"), 1);
    }

    #[tokio::test]
    async fn ensure_problem_tab_stores_returned_tab_name() {
        let pool = memory_pool().await;
        seed_event(&pool, "e1", Some("s1")).await;
        seed_problem(&pool, "p1", "e1", "AI").await;
        let gateway = Arc::new(FakeSheetsGateway::new());
        gateway.script(
            "syncProblem",
            SheetResponse {
                tab_name: Some("AI (p1)".into()),
                ..SheetResponse::ok()
            },
        );
        let sync = manager(&pool, &gateway);

        sync.ensure_problem_tab("e1", "p1").await.unwrap();
        let problem = problem_statements_repo::load_problem_statement(&pool, "p1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(problem.sheet_tab_name.as_deref(), Some("AI (p1)"));
    }

    #[tokio::test]
    async fn sync_and_upsert_use_separate_keys() {
        let pool = memory_pool().await;
        let gateway = slow_gateway();
        let sync = manager(&pool, &gateway);

        let (synced, upserted) =
            tokio::join!(sync.sync_registration("r1"), sync.upsert_registration("r1"));
        assert!(synced.is_ok());
        assert!(upserted.is_ok());
        assert_eq!(gateway.count("syncRegistration"), 2);

        let (a, b) = tokio::join!(sync.sync_registration("r1"), sync.sync_registration("r1"));
        assert!(a.is_ok());
        assert!(matches!(b, Err(SyncError::Conflict(_))));
    }

    #[tokio::test]
    async fn update_by_unknown_code_is_not_found_without_remote_call() {
        let pool = memory_pool().await;
        seed_event(&pool, "e1", Some("s1")).await;
        seed_problem(&pool, "p1", "e1", "AI").await;
        seed_registration(&pool, "r1", "e1", "p1", "CODE1", &["Ann"]).await;
        let gateway = Arc::new(FakeSheetsGateway::new());
        let sync = manager(&pool, &gateway);

        let patch = RegistrationPatch {
            team_name: Some("Renamed".into()),
            ..Default::default()
        };
        let err = sync
            .update_registration_by_code("e1", "NOPE", &patch)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));

        // Right code, wrong event.
        let err = sync
            .update_registration_by_code("e2", "CODE1", &patch)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn update_by_code_writes_then_mirrors() {
        let pool = memory_pool().await;
        seed_event(&pool, "e1", Some("s1")).await;
        seed_problem(&pool, "p1", "e1", "AI").await;
        seed_registration(&pool, "r1", "e1", "p1", "CODE1", &["Ann"]).await;
        let gateway = Arc::new(FakeSheetsGateway::new());
        let feed = ChangeFeed::default();
        let mut rx = feed.subscribe();
        let sync = SyncManager::new(pool.clone(), gateway.clone(), feed);

        let patch = RegistrationPatch {
            team_name: Some("Renamed".into()),
            team_members: Some(vec!["Ann".into(), "Bo".into()]),
            team_size: Some(2),
            ..Default::default()
        };
        assert!(sync
            .update_registration_by_code("e1", "CODE1", &patch)
            .await
            .unwrap());

        let row = registrations_repo::load_registration(&pool, "r1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.team_name, "Renamed");
        assert_eq!(row.members(), vec!["Ann", "Bo"]);
        assert_eq!(row.college_name, "IIT");
        assert_eq!(
            gateway.calls(),
            vec![SheetAction::SyncRegistration {
                registration_id: "r1".into()
            }]
        );

        let change = rx.recv().await.unwrap();
        assert_eq!((change.table, change.kind), (Table::Registrations, ChangeKind::Update));
        assert_eq!(change.id(), Some("r1"));
    }

    #[tokio::test]
    async fn update_by_code_keeps_database_write_when_gateway_fails() {
        let pool = memory_pool().await;
        seed_event(&pool, "e1", Some("s1")).await;
        seed_problem(&pool, "p1", "e1", "AI").await;
        seed_registration(&pool, "r1", "e1", "p1", "CODE1", &["Ann"]).await;
        let gateway = Arc::new(FakeSheetsGateway::new());
        gateway.fail_next("syncRegistration", "timeout");
        let sync = manager(&pool, &gateway);

        let patch = RegistrationPatch {
            email: Some("new@example.com".into()),
            ..Default::default()
        };
        let err = sync
            .update_registration_by_code("e1", "CODE1", &patch)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Remote(_)));

        let row = registrations_repo::load_by_code(&pool, "CODE1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.email, "new@example.com");
    }

    #[tokio::test]
    async fn append_registration_ensures_sheet_then_tab_then_upserts() {
        let pool = memory_pool().await;
        seed_event(&pool, "e1", None).await;
        seed_problem(&pool, "p1", "e1", "AI").await;
        seed_registration(&pool, "r1", "e1", "p1", "CODE1", &["Ann"]).await;
        let gateway = Arc::new(FakeSheetsGateway::new());
        let sync = manager(&pool, &gateway);

        sync.append_registration("r1").await.unwrap();
        assert_eq!(
            gateway.call_names(),
            vec!["createEvent", "syncProblem", "syncRegistration"]
        );
        assert_eq!(
            gateway.calls()[1],
            SheetAction::SyncProblem {
                event_id: "e1".into(),
                problem_id: "p1".into()
            }
        );
    }

    #[tokio::test]
    async fn append_registration_stops_at_first_failure() {
        let pool = memory_pool().await;
        seed_event(&pool, "e1", None).await;
        seed_problem(&pool, "p1", "e1", "AI").await;
        seed_registration(&pool, "r1", "e1", "p1", "CODE1", &["Ann"]).await;
        let gateway = Arc::new(FakeSheetsGateway::new());
        gateway.fail_next("createEvent", "no quota");
        let sync = manager(&pool, &gateway);

        assert!(matches!(
            sync.append_registration("r1").await,
            Err(SyncError::Remote(_))
        ));
        assert_eq!(gateway.call_names(), vec!["createEvent"]);
        assert!(sync.in_flight().is_empty());

        assert!(matches!(
            sync.append_registration("missing").await,
            Err(SyncError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn append_same_registration_twice_is_rejected() {
        let pool = memory_pool().await;
        seed_event(&pool, "e1", Some("s1")).await;
        seed_problem(&pool, "p1", "e1", "AI").await;
        seed_registration(&pool, "r1", "e1", "p1", "CODE1", &["Ann"]).await;
        seed_registration(&pool, "r2", "e1", "p1", "CODE2", &["Bo"]).await;
        let gateway = slow_gateway();
        let sync = manager(&pool, &gateway);

        let (a, b) = tokio::join!(sync.append_registration("r1"), sync.append_registration("r1"));
        assert!(a.is_ok());
        assert!(matches!(b, Err(SyncError::Conflict(ref k)) if k == "appendReg:r1"));
    }

    #[tokio::test]
    async fn bulk_sync_is_gated_globally() {
        let pool = memory_pool().await;
        let gateway = slow_gateway();
        let sync = manager(&pool, &gateway);

        let one = vec![EventSummary {
            id: "e1".into(),
            name: "One".into(),
            spreadsheet_id: None,
            problem_statements: Vec::new(),
        }];
        let two = vec![EventSummary {
            id: "e2".into(),
            name: "Two".into(),
            spreadsheet_id: Some("s2".into()),
            problem_statements: Vec::new(),
        }];

        let (a, b) = tokio::join!(sync.bulk_sync(one), sync.bulk_sync(two));
        assert!(a.is_ok());
        assert!(matches!(b, Err(SyncError::Conflict(ref k)) if k == "bulkSync:global"));
        assert_eq!(gateway.count("bulkSync"), 1);
    }

    #[tokio::test]
    async fn bulk_sync_for_event_matches_sync_all() {
        let pool = memory_pool().await;
        let gateway = Arc::new(FakeSheetsGateway::new());
        gateway.script(
            "syncAllRegistrations",
            SheetResponse {
                status: 500,
                error: Some("quota".into()),
                ..Default::default()
            },
        );
        let sync = manager(&pool, &gateway);

        assert!(matches!(
            sync.bulk_sync_for_event("e1").await,
            Err(SyncError::Remote(ref m)) if m == "quota"
        ));
        assert!(sync.sync_all_registrations("e1").await.is_ok());
        assert_eq!(
            gateway.calls(),
            vec![
                SheetAction::SyncAllRegistrations { event_id: "e1".into() },
                SheetAction::SyncAllRegistrations { event_id: "e1".into() },
            ]
        );
    }

    #[tokio::test]
    async fn add_problem_statement_targets_the_event_spreadsheet() {
        let pool = memory_pool().await;
        seed_event(&pool, "e1", Some("s1")).await;
        let gateway = Arc::new(FakeSheetsGateway::new());
        let sync = manager(&pool, &gateway);

        sync.add_problem_statement("e1", "p1", "Health").await.unwrap();
        assert_eq!(
            gateway.calls(),
            vec![SheetAction::AddProblemStatement {
                spreadsheet_id: "s1".into(),
                problem_statement: ProblemStatementTitle {
                    title: "Health".into()
                },
            }]
        );
    }

    #[tokio::test]
    async fn started_manager_mirrors_inserts_from_the_feed() {
        let pool = memory_pool().await;
        seed_event(&pool, "e1", None).await;
        let gateway = Arc::new(FakeSheetsGateway::new());
        let feed = ChangeFeed::default();
        let sync = Arc::new(SyncManager::new(pool.clone(), gateway.clone(), feed.clone()));
        let listener = sync.start();

        feed.publish(Table::Events, ChangeKind::Insert, json!({ "id": "e1" }));
        feed.publish(Table::Events, ChangeKind::Delete, json!({ "id": "e1" }));
        feed.publish(
            Table::Registrations,
            ChangeKind::Update,
            json!({ "id": "r9", "event_id": "e1" }),
        );

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while gateway.calls().len() < 2 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let mut names = gateway.call_names();
        names.sort();
        assert_eq!(names, vec!["createEvent", "syncRegistration"]);
        listener.abort();
    }
}
