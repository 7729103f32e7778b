use serde::Serialize;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EventsRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub max_team_size: i64,
    pub registration_deadline: Option<String>,
    pub sheet_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl EventsRow {
    /// Stored spreadsheet id, treating an empty string as unset.
    pub fn spreadsheet_id(&self) -> Option<&str> {
        self.sheet_id.as_deref().filter(|s| !s.trim().is_empty())
    }
}
