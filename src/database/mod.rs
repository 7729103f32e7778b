pub mod attendance_repo;
pub mod change_feed;
pub mod events_repo;
pub mod problem_statements_repo;
pub mod registrations_repo;
pub mod schema;

pub use change_feed::{ChangeFeed, ChangeKind, RowChange, Table};

/// RFC 3339 UTC timestamp used for every `*_at` column.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
