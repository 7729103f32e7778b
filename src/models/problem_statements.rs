use serde::Serialize;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProblemStatementsRow {
    pub id: String,
    pub event_id: String,
    pub title: String,
    pub description: String,
    pub sheet_tab_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ProblemStatementsRow {
    /// Tab the problem's registrations land in.
    pub fn tab_name(&self) -> String {
        if let Some(tab) = self.sheet_tab_name.as_deref().filter(|s| !s.is_empty()) {
            return tab.to_string();
        }
        let title = self.title.trim();
        if title.is_empty() {
            format!("Problem-{}", self.id)
        } else {
            title.to_string()
        }
    }
}
