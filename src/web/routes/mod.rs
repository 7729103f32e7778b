pub mod attendance;
pub mod auth;
pub mod events;
pub mod health;
pub mod registrations;
pub mod sheets_proxy;
pub mod sync;
