use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RegistrationsRow {
    pub id: String,
    pub event_id: String,
    pub problem_statement_id: String,
    pub team_name: String,
    pub college_name: String,
    pub contact_number: String,
    pub email: String,
    pub team_size: i64,
    pub team_members: String, // JSON array of names
    pub reg_code: String,
    pub is_locked: bool,
    pub attendance_update_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl RegistrationsRow {
    pub fn members(&self) -> Vec<String> {
        serde_json::from_str::<Vec<String>>(&self.team_members).unwrap_or_default()
    }
}

/// Partial field set for an update by registration code. `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RegistrationPatch {
    pub team_name: Option<String>,
    pub college_name: Option<String>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub team_size: Option<i64>,
    pub team_members: Option<Vec<String>>,
}

impl RegistrationPatch {
    pub fn is_empty(&self) -> bool {
        self.team_name.is_none()
            && self.college_name.is_none()
            && self.contact_number.is_none()
            && self.email.is_none()
            && self.team_size.is_none()
            && self.team_members.is_none()
    }
}

/// Registration joined with the event and problem statement it belongs to.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RegistrationSheetContextRow {
    pub registration_id: String,
    pub event_id: String,
    pub problem_statement_id: String,
    pub reg_code: String,
    pub event_name: String,
    pub sheet_id: Option<String>,
    pub problem_title: String,
    pub sheet_tab_name: Option<String>,
}
