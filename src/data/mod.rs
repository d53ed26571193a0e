//! Data layer module
//!
//! Handles all data persistence:
//! - Users and their provider accounts
//! - Ideas, components and saves

mod database;
mod models;

pub use database::{Database, ProviderIdentity};
pub use models::*;
