//! Appointment and medicine reminder scheduling for the elderly companion app

pub mod config;
pub mod email;
pub mod errors;
pub mod forms;
pub mod google_calendar;
pub mod http_utils;
pub mod scheduler;

pub use config::Config;
pub use errors::{CompanionError, CompanionResult};
