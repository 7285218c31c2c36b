//! Ticket sales backend: event listings and purchases against a limited
//! ticket inventory, persisted in SQLite.

pub mod app;
pub mod app_config;
pub mod db;
pub mod models;
pub mod purchase_service;

pub use crate::app::AppState;
pub use crate::app_config::AppConfig;
pub use crate::db::{Database, PersistenceError};
pub use crate::models::*;
pub use crate::purchase_service::*;
