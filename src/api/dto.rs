//! API response and request DTOs
//!
//! Field names are camelCase to match what the web client reads from the
//! session payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::NewIdeaComponent;

/// Author summary embedded in an idea
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorDto {
    pub id: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaComponentDto {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub position: i64,
}

/// Transfer representation of an idea
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaDto {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub author: AuthorDto,
    pub components: Vec<IdeaComponentDto>,
    pub created_at: DateTime<Utc>,
}

/// User part of the session payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUserDto {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
}

/// Session payload with credits and ideas attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydratedSession {
    pub user: SessionUserDto,
    pub expires: DateTime<Utc>,
    pub credits: i64,
    pub saved_ideas: Vec<IdeaDto>,
    pub ideas: Vec<IdeaDto>,
}

/// Body of `POST /api/ideas`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateIdeaRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub components: Vec<NewIdeaComponent>,
}
