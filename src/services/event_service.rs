use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::database::{
    events_repo, now_timestamp, problem_statements_repo, ChangeFeed, ChangeKind, Table,
};
use crate::models::{EventsRow, ProblemStatementsRow};
use crate::services::sheets_gateway::{EventSummary, ProblemSummary};

pub const DEFAULT_MAX_TEAM_SIZE: i64 = 4;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Invalid(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub max_team_size: Option<i64>,
    #[serde(default)]
    pub registration_deadline: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProblemStatementInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: EventsRow,
    pub problem_statements: Vec<ProblemStatementsRow>,
}

struct CleanEvent {
    name: String,
    description: String,
    is_active: bool,
    max_team_size: i64,
    registration_deadline: Option<String>,
}

fn clean_event(input: EventInput) -> Result<CleanEvent, EventError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(EventError::Invalid("event name is required".to_string()));
    }
    let max_team_size = input.max_team_size.unwrap_or(DEFAULT_MAX_TEAM_SIZE);
    if max_team_size < 1 {
        return Err(EventError::Invalid("max_team_size must be at least 1".to_string()));
    }
    let registration_deadline = input
        .registration_deadline
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    if let Some(deadline) = registration_deadline.as_deref() {
        chrono::DateTime::parse_from_rfc3339(deadline).map_err(|_| {
            EventError::Invalid("registration_deadline must be an RFC 3339 timestamp".to_string())
        })?;
    }
    Ok(CleanEvent {
        name,
        description: input.description.unwrap_or_default().trim().to_string(),
        is_active: input.is_active.unwrap_or(true),
        max_team_size,
        registration_deadline,
    })
}

fn clean_title(input: &ProblemStatementInput) -> Result<String, EventError> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(EventError::Invalid("problem statement title is required".to_string()));
    }
    Ok(title.to_string())
}

/// Inserts the event and announces it; the sync listener creates its spreadsheet.
pub async fn create_event(
    pool: &SqlitePool,
    feed: &ChangeFeed,
    input: EventInput,
) -> Result<EventsRow, EventError> {
    let event = clean_event(input)?;
    let id = Uuid::new_v4().to_string();
    events_repo::insert_event(
        pool,
        events_repo::NewEvent {
            id: &id,
            name: &event.name,
            description: &event.description,
            is_active: event.is_active,
            max_team_size: event.max_team_size,
            registration_deadline: event.registration_deadline.as_deref(),
            created_at: &now_timestamp(),
        },
    )
    .await?;
    info!(event_id = %id, name = %event.name, "event created");

    let row = events_repo::load_event(pool, &id)
        .await?
        .ok_or(EventError::NotFound("event"))?;
    feed.publish(Table::Events, ChangeKind::Insert, json!({ "id": row.id, "name": row.name }));
    Ok(row)
}

pub async fn update_event(
    pool: &SqlitePool,
    feed: &ChangeFeed,
    event_id: &str,
    input: EventInput,
) -> Result<EventsRow, EventError> {
    let event = clean_event(input)?;
    let affected = events_repo::update_event(
        pool,
        event_id,
        events_repo::EventUpdate {
            name: &event.name,
            description: &event.description,
            is_active: event.is_active,
            max_team_size: event.max_team_size,
            registration_deadline: event.registration_deadline.as_deref(),
            updated_at: &now_timestamp(),
        },
    )
    .await?;
    if affected == 0 {
        return Err(EventError::NotFound("event"));
    }

    let row = events_repo::load_event(pool, event_id)
        .await?
        .ok_or(EventError::NotFound("event"))?;
    feed.publish(Table::Events, ChangeKind::Update, json!({ "id": row.id, "name": row.name }));
    Ok(row)
}

/// Deletes the event together with its problem statements and registrations.
pub async fn delete_event(
    pool: &SqlitePool,
    feed: &ChangeFeed,
    event_id: &str,
) -> Result<(), EventError> {
    if events_repo::delete_event(pool, event_id).await? == 0 {
        return Err(EventError::NotFound("event"));
    }
    info!(event_id, "event deleted");
    feed.publish(Table::Events, ChangeKind::Delete, json!({ "id": event_id }));
    Ok(())
}

pub async fn list_events(pool: &SqlitePool, active_only: bool) -> sqlx::Result<Vec<EventsRow>> {
    if active_only {
        events_repo::list_active_events(pool).await
    } else {
        events_repo::list_events(pool).await
    }
}

pub async fn load_event_detail(
    pool: &SqlitePool,
    event_id: &str,
) -> sqlx::Result<Option<EventDetail>> {
    let Some(event) = events_repo::load_event(pool, event_id).await? else {
        return Ok(None);
    };
    let problem_statements = problem_statements_repo::list_for_event(pool, event_id).await?;
    Ok(Some(EventDetail {
        event,
        problem_statements,
    }))
}

/// Inserts the problem statement and announces it; the sync listener creates its tab.
pub async fn create_problem_statement(
    pool: &SqlitePool,
    feed: &ChangeFeed,
    event_id: &str,
    input: ProblemStatementInput,
) -> Result<ProblemStatementsRow, EventError> {
    let title = clean_title(&input)?;
    if events_repo::load_event(pool, event_id).await?.is_none() {
        return Err(EventError::NotFound("event"));
    }

    let id = Uuid::new_v4().to_string();
    problem_statements_repo::insert_problem_statement(
        pool,
        problem_statements_repo::NewProblemStatement {
            id: &id,
            event_id,
            title: &title,
            description: input.description.as_deref().unwrap_or("").trim(),
            created_at: &now_timestamp(),
        },
    )
    .await?;
    info!(event_id, problem_id = %id, "problem statement created");

    let row = problem_statements_repo::load_problem_statement(pool, &id)
        .await?
        .ok_or(EventError::NotFound("problem statement"))?;
    feed.publish(
        Table::ProblemStatements,
        ChangeKind::Insert,
        json!({ "id": row.id, "event_id": row.event_id, "title": row.title }),
    );
    Ok(row)
}

pub async fn update_problem_statement(
    pool: &SqlitePool,
    feed: &ChangeFeed,
    problem_id: &str,
    input: ProblemStatementInput,
) -> Result<ProblemStatementsRow, EventError> {
    let title = clean_title(&input)?;
    let description = input.description.as_deref().unwrap_or("").trim();
    let affected = problem_statements_repo::update_problem_statement(
        pool,
        problem_id,
        &title,
        description,
        &now_timestamp(),
    )
    .await?;
    if affected == 0 {
        return Err(EventError::NotFound("problem statement"));
    }

    let row = problem_statements_repo::load_problem_statement(pool, problem_id)
        .await?
        .ok_or(EventError::NotFound("problem statement"))?;
    feed.publish(
        Table::ProblemStatements,
        ChangeKind::Update,
        json!({ "id": row.id, "event_id": row.event_id, "title": row.title }),
    );
    Ok(row)
}

pub async fn delete_problem_statement(
    pool: &SqlitePool,
    feed: &ChangeFeed,
    problem_id: &str,
) -> Result<(), EventError> {
    if problem_statements_repo::delete_problem_statement(pool, problem_id).await? == 0 {
        return Err(EventError::NotFound("problem statement"));
    }
    feed.publish(
        Table::ProblemStatements,
        ChangeKind::Delete,
        json!({ "id": problem_id }),
    );
    Ok(())
}

/// Snapshot of events (all, or the listed ids) in the shape `bulkSync` expects.
pub async fn build_event_summaries(
    pool: &SqlitePool,
    event_ids: Option<&[String]>,
) -> sqlx::Result<Vec<EventSummary>> {
    let events = events_repo::list_events(pool).await?;
    let mut summaries = Vec::with_capacity(events.len());
    for event in events {
        if let Some(ids) = event_ids {
            if !ids.iter().any(|id| id == &event.id) {
                continue;
            }
        }
        let problem_statements = problem_statements_repo::list_for_event(pool, &event.id)
            .await?
            .into_iter()
            .map(|p| ProblemSummary {
                tab_name: Some(p.tab_name()),
                id: p.id,
                title: p.title,
            })
            .collect();
        summaries.push(EventSummary {
            spreadsheet_id: event.spreadsheet_id().map(|s| s.to_string()),
            id: event.id,
            name: event.name,
            problem_statements,
        });
    }
    Ok(summaries)
}
