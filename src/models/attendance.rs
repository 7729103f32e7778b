#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttendanceRow {
    pub registration_id: String,
    pub member_name: String,
    pub is_present: bool,
    pub last_updated: String,
}
