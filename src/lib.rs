pub mod booking;
pub mod config;
pub mod error;
pub mod models;
pub mod realtime;
pub mod services;

pub use booking::{BookingFlow, BookingSession};
pub use config::Config;
pub use error::{ApiError, BookingError, PushError};
