use serde_json::{json, Value};
use sqlx::SqlitePool;
use tracing::info;

use crate::database::{events_repo, problem_statements_repo, registrations_repo};
use crate::services::sheets_gateway::{post_checked, SheetAction, SheetResponse, SheetsGateway};
use crate::services::sync_error::SyncError;

const REG_CODE_COLUMN: &str = "reg_code";

/// Row number of the first row whose `search_key` column equals `search_value`.
pub async fn find_row(
    gateway: &dyn SheetsGateway,
    spreadsheet_id: &str,
    tab_name: &str,
    search_key: &str,
    search_value: &str,
) -> Result<Option<i64>, SyncError> {
    let res = post_checked(
        gateway,
        SheetAction::FindRow {
            spreadsheet_id: spreadsheet_id.to_string(),
            tab_name: tab_name.to_string(),
            search_key: search_key.to_string(),
            search_value: search_value.to_string(),
        },
    )
    .await?;
    if res.found == Some(true) {
        Ok(res.row_number)
    } else {
        Ok(None)
    }
}

/// Updates the row keyed by `data.reg_code`, appending it when absent.
pub async fn append_or_update_row(
    gateway: &dyn SheetsGateway,
    spreadsheet_id: &str,
    tab_name: &str,
    data: Value,
) -> Result<SheetResponse, SyncError> {
    let reg_code = data
        .get(REG_CODE_COLUMN)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .ok_or_else(|| SyncError::Invalid("Registration code is required for sheet sync".into()))?;

    let existing = find_row(gateway, spreadsheet_id, tab_name, REG_CODE_COLUMN, &reg_code).await?;
    let action = match existing {
        Some(_) => SheetAction::UpdateRow {
            spreadsheet_id: spreadsheet_id.to_string(),
            tab_name: tab_name.to_string(),
            search_key: REG_CODE_COLUMN.to_string(),
            search_value: reg_code,
            data,
        },
        None => SheetAction::AppendRow {
            spreadsheet_id: spreadsheet_id.to_string(),
            tab_name: tab_name.to_string(),
            data,
        },
    };
    post_checked(gateway, action).await
}

/// Writes one registration into its problem statement's tab of the event spreadsheet.
pub async fn append_registration_row(
    pool: &SqlitePool,
    gateway: &dyn SheetsGateway,
    registration_id: &str,
) -> Result<SheetResponse, SyncError> {
    let reg = registrations_repo::load_registration(pool, registration_id)
        .await?
        .ok_or_else(|| SyncError::NotFound(format!("registration {}", registration_id)))?;
    let event = events_repo::load_event(pool, &reg.event_id)
        .await?
        .ok_or_else(|| SyncError::NotFound(format!("event {}", reg.event_id)))?;
    let spreadsheet_id = event
        .spreadsheet_id()
        .ok_or_else(|| SyncError::NotFound(format!("spreadsheet for event {}", event.id)))?;
    let problem = problem_statements_repo::load_problem_statement(pool, &reg.problem_statement_id)
        .await?
        .ok_or_else(|| {
            SyncError::NotFound(format!("problem statement {}", reg.problem_statement_id))
        })?;

    let data = json!({
        "reg_code": reg.reg_code,
        "team_name": reg.team_name,
        "college_name": reg.college_name,
        "contact_number": reg.contact_number,
        "email": reg.email,
        "team_size": reg.team_size,
        "team_members": reg.members().join(", "),
        "problem_statement": problem.title,
        "created_at": reg.created_at,
    });

    let tab_name = problem.tab_name();
    let res = append_or_update_row(gateway, spreadsheet_id, &tab_name, data).await?;
    info!(registration_id, tab = %tab_name, row = ?res.row_number, "registration row written");
    Ok(res)
}

/// Asks the sheet to pull every registration of one event/problem pair.
pub async fn export_event(
    pool: &SqlitePool,
    gateway: &dyn SheetsGateway,
    event_id: &str,
    problem_id: &str,
) -> Result<SheetResponse, SyncError> {
    let event = events_repo::load_event(pool, event_id)
        .await?
        .ok_or_else(|| SyncError::NotFound(format!("event {}", event_id)))?;
    let spreadsheet_id = event
        .spreadsheet_id()
        .ok_or_else(|| SyncError::NotFound(format!("spreadsheet for event {}", event_id)))?
        .to_string();
    let problem = problem_statements_repo::load_problem_statement(pool, problem_id)
        .await?
        .filter(|p| p.event_id == event.id)
        .ok_or_else(|| SyncError::NotFound(format!("problem statement {}", problem_id)))?;

    post_checked(
        gateway,
        SheetAction::ExportFromStore {
            event_id: event.id,
            problem_id: problem.id,
            event_name: event.name,
            problem_title: problem.title,
            spreadsheet_id,
        },
    )
    .await
}
