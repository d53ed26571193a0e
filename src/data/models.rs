//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Users & Accounts
// =============================================================================

/// A person who signed in through one or more OAuth providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    /// Avatar URL reported by the provider
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Provider identity linked to a user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    pub user_id: String,
    /// Provider id: github, discord
    pub provider: String,
    /// User id at the provider
    pub provider_account_id: String,
    pub created_at: DateTime<Utc>,
}

/// Result of linking a provider identity to a local user
#[derive(Debug, Clone)]
pub struct LinkedUser {
    pub user: User,
    /// true when the user row was inserted by this sign-in
    pub created: bool,
}

// =============================================================================
// Ideas
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Idea {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A building block of an idea, ordered by `position`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IdeaComponent {
    pub id: String,
    pub idea_id: String,
    pub name: String,
    pub description: Option<String>,
    pub position: i64,
}

/// Component input for [`crate::data::Database::create_idea`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewIdeaComponent {
    pub name: String,
    pub description: Option<String>,
}
