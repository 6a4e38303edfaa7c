pub mod client;
pub mod config;
pub mod dates;
mod error;
pub mod models;
pub mod requests;
pub mod routes;
pub mod views;

pub use client::JournalClient;
pub use config::{ClientConfig, CookieTemplate, DefaultHeaders, JournalEnv, LoadFromEnv};
pub use dates::{DateBound, date_to_str, str_to_date};
pub use error::{JournalError, Result};
pub use requests::{HttpReply, Session, Transport};
