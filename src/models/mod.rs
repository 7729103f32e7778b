pub mod attendance;
pub mod events;
pub mod problem_statements;
pub mod registrations;

pub use attendance::AttendanceRow;
pub use events::EventsRow;
pub use problem_statements::ProblemStatementsRow;
pub use registrations::{RegistrationPatch, RegistrationSheetContextRow, RegistrationsRow};
