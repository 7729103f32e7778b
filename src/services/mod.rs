pub mod admin_session_service;
pub mod attendance_service;
pub mod event_service;
#[cfg(any(test, feature = "test-support"))]
pub mod fake_sheets_gateway;
pub mod in_flight;
pub mod registration_service;
pub mod sheet_rows_service;
pub mod sheets_gateway;
pub mod sync_error;
pub mod sync_manager;

#[cfg(test)]
mod test_support;
