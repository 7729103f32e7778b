use sqlx::SqlitePool;

use crate::models::ProblemStatementsRow;

const SQL_INSERT_PROBLEM_STATEMENT: &str = r#"
INSERT INTO problem_statements (
  id,
  event_id,
  title,
  description,
  created_at,
  updated_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?5)
"#;

pub struct NewProblemStatement<'a> {
    pub id: &'a str,
    pub event_id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub created_at: &'a str,
}

pub async fn insert_problem_statement(
    pool: &SqlitePool,
    problem: NewProblemStatement<'_>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_INSERT_PROBLEM_STATEMENT)
        .bind(problem.id)
        .bind(problem.event_id)
        .bind(problem.title)
        .bind(problem.description)
        .bind(problem.created_at)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_LOAD_PROBLEM_STATEMENT: &str = r#"
SELECT
  id,
  event_id,
  title,
  description,
  sheet_tab_name,
  created_at,
  updated_at
FROM problem_statements
WHERE id = ?1
LIMIT 1
"#;

pub async fn load_problem_statement(
    pool: &SqlitePool,
    problem_id: &str,
) -> sqlx::Result<Option<ProblemStatementsRow>> {
    sqlx::query_as::<_, ProblemStatementsRow>(SQL_LOAD_PROBLEM_STATEMENT)
        .bind(problem_id)
        .fetch_optional(pool)
        .await
}

const SQL_LIST_FOR_EVENT: &str = r#"
SELECT
  id,
  event_id,
  title,
  description,
  sheet_tab_name,
  created_at,
  updated_at
FROM problem_statements
WHERE event_id = ?1
ORDER BY created_at ASC, title ASC
"#;

pub async fn list_for_event(
    pool: &SqlitePool,
    event_id: &str,
) -> sqlx::Result<Vec<ProblemStatementsRow>> {
    sqlx::query_as::<_, ProblemStatementsRow>(SQL_LIST_FOR_EVENT)
        .bind(event_id)
        .fetch_all(pool)
        .await
}

const SQL_UPDATE_PROBLEM_STATEMENT: &str = r#"
UPDATE problem_statements
SET title = ?1,
    description = ?2,
    updated_at = ?3
WHERE id = ?4
"#;

pub async fn update_problem_statement(
    pool: &SqlitePool,
    problem_id: &str,
    title: &str,
    description: &str,
    updated_at: &str,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_UPDATE_PROBLEM_STATEMENT)
        .bind(title)
        .bind(description)
        .bind(updated_at)
        .bind(problem_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

pub async fn delete_problem_statement(pool: &SqlitePool, problem_id: &str) -> sqlx::Result<u64> {
    let res = sqlx::query("DELETE FROM problem_statements WHERE id = ?1")
        .bind(problem_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

pub async fn set_tab_name(pool: &SqlitePool, problem_id: &str, tab_name: &str) -> sqlx::Result<u64> {
    let res = sqlx::query("UPDATE problem_statements SET sheet_tab_name = ?1 WHERE id = ?2")
        .bind(tab_name)
        .bind(problem_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
