//! SQLite database operations
//!
//! All database access goes through this module.

use chrono::Utc;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Identity reported by an OAuth provider after a successful exchange
#[derive(Debug, Clone)]
pub struct ProviderIdentity {
    pub provider: String,
    pub provider_account_id: String,
    pub email: Option<String>,
    /// Whether the provider vouches for `email`; only verified emails link or get stored
    pub email_verified: bool,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// Attempts for a link that loses a race against a concurrent sign-in
const LINK_ATTEMPTS: usize = 3;

/// Unique-constraint hits and SQLite busy errors mean another sign-in committed first
fn is_link_conflict(error: &AppError) -> bool {
    let AppError::Database(sqlx::Error::Database(db_error)) = error else {
        return false;
    };
    db_error.is_unique_violation()
        || matches!(db_error.code().as_deref(), Some("5") | Some("517"))
}

/// Database connection pool wrapper
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open (creating if needed) the SQLite file and run migrations.
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Resolve a provider identity to a local user, creating one if needed.
    ///
    /// # Order
    /// 1. Existing account link: refresh name/image and return the user
    /// 2. Existing user with the same *verified* email: link a new account to it
    /// 3. Otherwise insert user and account; `created` is true
    ///
    /// Unverified emails never link to an existing user and are not stored.
    /// A link that conflicts with a concurrent sign-in is retried, and the
    /// retry sees the committed row.
    pub async fn link_oauth_user(&self, identity: &ProviderIdentity) -> Result<LinkedUser, AppError> {
        let mut attempt = 1;
        loop {
            match self.try_link_oauth_user(identity).await {
                Err(error) if attempt < LINK_ATTEMPTS && is_link_conflict(&error) => {
                    tracing::debug!(
                        provider = %identity.provider,
                        attempt,
                        %error,
                        "Concurrent sign-in conflict; retrying link"
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn try_link_oauth_user(&self, identity: &ProviderIdentity) -> Result<LinkedUser, AppError> {
        let now = Utc::now();
        let verified_email = identity
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| identity.email_verified && !email.is_empty());

        let mut tx = self.pool.begin().await?;

        let linked = sqlx::query_as::<_, User>(
            r#"
            SELECT u.* FROM users u
            INNER JOIN accounts a ON a.user_id = u.id
            WHERE a.provider = ? AND a.provider_account_id = ?
            "#,
        )
        .bind(&identity.provider)
        .bind(&identity.provider_account_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(user) = linked {
            let user = sqlx::query_as::<_, User>(
                r#"
                UPDATE users
                SET name = COALESCE(?, name), image = COALESCE(?, image), updated_at = ?
                WHERE id = ?
                RETURNING *
                "#,
            )
            .bind(&identity.name)
            .bind(&identity.image)
            .bind(now)
            .bind(&user.id)
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;

            return Ok(LinkedUser {
                user,
                created: false,
            });
        }

        let by_email = match verified_email {
            Some(email) => {
                sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
                    .bind(email)
                    .fetch_optional(&mut *tx)
                    .await?
            }
            None => None,
        };

        let (user, created) = match by_email {
            Some(user) => (user, false),
            None => {
                let user = User {
                    id: EntityId::new().0,
                    email: verified_email.map(ToOwned::to_owned),
                    name: identity.name.clone(),
                    image: identity.image.clone(),
                    created_at: now,
                    updated_at: now,
                };
                sqlx::query(
                    r#"
                    INSERT INTO users (id, email, name, image, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&user.id)
                .bind(&user.email)
                .bind(&user.name)
                .bind(&user.image)
                .bind(user.created_at)
                .bind(user.updated_at)
                .execute(&mut *tx)
                .await?;
                (user, true)
            }
        };

        sqlx::query(
            r#"
            INSERT INTO accounts (id, user_id, provider, provider_account_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(EntityId::new().0)
        .bind(&user.id)
        .bind(&identity.provider)
        .bind(&identity.provider_account_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            user_id = %user.id,
            provider = %identity.provider,
            created,
            "Linked provider account"
        );

        Ok(LinkedUser { user, created })
    }

    pub async fn get_accounts_for_user(&self, user_id: &str) -> Result<Vec<Account>, AppError> {
        let accounts = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE user_id = ? ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    // =========================================================================
    // Ideas
    // =========================================================================

    /// Insert an idea with its components; component order is preserved.
    pub async fn create_idea(
        &self,
        author_id: &str,
        title: &str,
        description: Option<&str>,
        components: &[NewIdeaComponent],
    ) -> Result<Idea, AppError> {
        let now = Utc::now();
        let idea = Idea {
            id: EntityId::new().0,
            author_id: author_id.to_string(),
            title: title.to_string(),
            description: description.map(ToOwned::to_owned),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO ideas (id, author_id, title, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&idea.id)
        .bind(&idea.author_id)
        .bind(&idea.title)
        .bind(&idea.description)
        .bind(idea.created_at)
        .bind(idea.updated_at)
        .execute(&mut *tx)
        .await?;

        for (position, component) in components.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO idea_components (id, idea_id, name, description, position)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(EntityId::new().0)
            .bind(&idea.id)
            .bind(&component.name)
            .bind(&component.description)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(idea)
    }

    pub async fn get_idea(&self, id: &str) -> Result<Option<Idea>, AppError> {
        let idea = sqlx::query_as::<_, Idea>("SELECT * FROM ideas WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(idea)
    }

    pub async fn get_idea_components(&self, idea_id: &str) -> Result<Vec<IdeaComponent>, AppError> {
        let components = sqlx::query_as::<_, IdeaComponent>(
            "SELECT * FROM idea_components WHERE idea_id = ? ORDER BY position ASC",
        )
        .bind(idea_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(components)
    }

    /// Ideas authored by a user, newest first
    pub async fn get_ideas_by_author(
        &self,
        author_id: &str,
        limit: usize,
    ) -> Result<Vec<Idea>, AppError> {
        let ideas = sqlx::query_as::<_, Idea>(
            "SELECT * FROM ideas WHERE author_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(author_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(ideas)
    }

    /// Ideas saved by a user, most recently saved first
    pub async fn get_saved_ideas(&self, user_id: &str, limit: usize) -> Result<Vec<Idea>, AppError> {
        let ideas = sqlx::query_as::<_, Idea>(
            r#"
            SELECT i.* FROM ideas i
            INNER JOIN saved_ideas s ON s.idea_id = i.id
            WHERE s.user_id = ?
            ORDER BY s.created_at DESC, i.id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(ideas)
    }

    /// Save an idea for a user.
    ///
    /// Returns false if it was already saved.
    pub async fn save_idea(&self, user_id: &str, idea_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO saved_ideas (user_id, idea_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(idea_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Returns false if the idea was not saved.
    pub async fn unsave_idea(&self, user_id: &str, idea_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM saved_ideas WHERE user_id = ? AND idea_id = ?")
            .bind(user_id)
            .bind(idea_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
