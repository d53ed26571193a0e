//! Conversion functions from database models to API DTOs

use crate::api::dto::*;
use crate::data::{Database, Idea, IdeaComponent, User};
use crate::error::AppError;

pub fn user_to_author(user: &User) -> AuthorDto {
    AuthorDto {
        id: user.id.clone(),
        name: user.name.clone(),
        image: user.image.clone(),
    }
}

pub fn component_to_dto(component: IdeaComponent) -> IdeaComponentDto {
    IdeaComponentDto {
        id: component.id,
        name: component.name,
        description: component.description,
        position: component.position,
    }
}

pub fn user_to_session_user(user: User) -> SessionUserDto {
    SessionUserDto {
        id: user.id,
        name: user.name,
        email: user.email,
        image: user.image,
    }
}

/// Convert Idea to IdeaDto, loading its author and components
pub async fn idea_to_dto(db: &Database, idea: Idea) -> Result<IdeaDto, AppError> {
    let (author, components) = tokio::try_join!(
        db.get_user(&idea.author_id),
        db.get_idea_components(&idea.id)
    )?;

    // Deleted authors cascade their ideas, so this only trips on a broken row
    let author = author.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "idea {} references missing author {}",
            idea.id,
            idea.author_id
        ))
    })?;

    Ok(IdeaDto {
        id: idea.id,
        title: idea.title,
        description: idea.description,
        author: user_to_author(&author),
        components: components.into_iter().map(component_to_dto).collect(),
        created_at: idea.created_at,
    })
}

/// Convert a batch of ideas, preserving order
pub async fn ideas_to_dtos(db: &Database, ideas: Vec<Idea>) -> Result<Vec<IdeaDto>, AppError> {
    futures::future::try_join_all(ideas.into_iter().map(|idea| idea_to_dto(db, idea))).await
}
