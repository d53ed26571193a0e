//! Session hydration
//!
//! Every session read attaches the user's credit balance plus a short list of
//! saved and authored ideas. Nothing is cached; each call queries fresh, and
//! the user profile comes from the store rather than the signed token.

use crate::api::{HydratedSession, ideas_to_dtos, user_to_session_user};
use crate::credits::CreditsService;
use crate::data::Database;
use crate::error::AppError;

use super::Session;

/// Ideas attached per list (saved, authored)
pub const SESSION_IDEA_LIMIT: usize = 3;

/// Fails with [`AppError::Unauthorized`] when the session's user no longer exists.
pub async fn hydrate_session(
    db: &Database,
    credits: &dyn CreditsService,
    session: &Session,
) -> Result<HydratedSession, AppError> {
    let user_id = session.user_id.as_str();

    let user = db.get_user(user_id).await?.ok_or(AppError::Unauthorized)?;
    let balance = credits.balance(user_id).await?;
    let saved = db.get_saved_ideas(user_id, SESSION_IDEA_LIMIT).await?;
    let authored = db.get_ideas_by_author(user_id, SESSION_IDEA_LIMIT).await?;

    let saved_ideas = ideas_to_dtos(db, saved).await?;
    let ideas = ideas_to_dtos(db, authored).await?;

    crate::metrics::SESSION_HYDRATIONS_TOTAL.inc();
    tracing::debug!(
        user_id,
        credits = balance,
        saved = saved_ideas.len(),
        authored = ideas.len(),
        "Session hydrated"
    );

    Ok(HydratedSession {
        user: user_to_session_user(user),
        expires: session.expires_at,
        credits: balance,
        saved_ideas,
        ideas,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credits::MockCreditsService;
    use crate::data::{NewIdeaComponent, ProviderIdentity, User};
    use tempfile::TempDir;

    async fn setup() -> (Database, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(&temp_dir.path().join("hydrate.db"))
            .await
            .unwrap();
        (db, temp_dir)
    }

    async fn user(db: &Database, account_id: &str, name: &str) -> User {
        db.link_oauth_user(&ProviderIdentity {
            provider: "github".to_string(),
            provider_account_id: account_id.to_string(),
            email: None,
            email_verified: false,
            name: Some(name.to_string()),
            image: None,
        })
        .await
        .unwrap()
        .user
    }

    fn credits_with_balance(balance: i64) -> MockCreditsService {
        let mut credits = MockCreditsService::new();
        credits.expect_balance().times(1).returning(move |_| Ok(balance));
        credits.expect_reward().never();
        credits
    }

    #[tokio::test]
    async fn new_user_session_has_balance_and_no_ideas() {
        let (db, _dir) = setup().await;
        let ada = user(&db, "1", "Ada").await;
        let session = Session::for_user(&ada, "github", 3600);

        let hydrated = hydrate_session(&db, &credits_with_balance(3), &session)
            .await
            .unwrap();

        assert_eq!(hydrated.user.id, ada.id);
        assert_eq!(hydrated.user.name.as_deref(), Some("Ada"));
        assert_eq!(hydrated.credits, 3);
        assert_eq!(hydrated.expires, session.expires_at);
        assert!(hydrated.saved_ideas.is_empty());
        assert!(hydrated.ideas.is_empty());
    }

    #[tokio::test]
    async fn profile_is_read_from_store_not_token() {
        let (db, _dir) = setup().await;
        let ada = user(&db, "1", "Ada").await;
        let session = Session::for_user(&ada, "github", 3600);

        // Profile refreshed by a later sign-in after this token was issued
        user(&db, "1", "Ada Lovelace").await;

        let hydrated = hydrate_session(&db, &credits_with_balance(3), &session)
            .await
            .unwrap();

        assert_eq!(session.name.as_deref(), Some("Ada"));
        assert_eq!(hydrated.user.name.as_deref(), Some("Ada Lovelace"));
    }

    #[tokio::test]
    async fn missing_user_is_unauthorized() {
        let (db, _dir) = setup().await;
        let ada = user(&db, "1", "Ada").await;
        let mut session = Session::for_user(&ada, "github", 3600);
        session.user_id = "01HZX5N4Q4Y1S3V2W0K8M6T9RA".to_string();

        let mut credits = MockCreditsService::new();
        credits.expect_balance().never();

        let error = hydrate_session(&db, &credits, &session).await.unwrap_err();
        assert!(matches!(error, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn lists_are_capped_at_three() {
        let (db, _dir) = setup().await;
        let ada = user(&db, "1", "Ada").await;
        let grace = user(&db, "2", "Grace").await;

        for i in 0..5 {
            db.create_idea(&ada.id, &format!("mine {i}"), None, &[])
                .await
                .unwrap();
            let theirs = db
                .create_idea(&grace.id, &format!("theirs {i}"), None, &[])
                .await
                .unwrap();
            db.save_idea(&ada.id, &theirs.id).await.unwrap();
        }

        let session = Session::for_user(&ada, "github", 3600);
        let hydrated = hydrate_session(&db, &credits_with_balance(0), &session)
            .await
            .unwrap();

        assert_eq!(hydrated.ideas.len(), SESSION_IDEA_LIMIT);
        assert_eq!(hydrated.saved_ideas.len(), SESSION_IDEA_LIMIT);
        assert!(hydrated.ideas.iter().all(|i| i.author.id == ada.id));
        assert!(
            hydrated
                .saved_ideas
                .iter()
                .all(|i| i.author.name.as_deref() == Some("Grace"))
        );
    }

    #[tokio::test]
    async fn ideas_carry_components_in_order() {
        let (db, _dir) = setup().await;
        let ada = user(&db, "1", "Ada").await;
        let components = ["Engine", "Store", "UI"].map(|name| NewIdeaComponent {
            name: name.to_string(),
            description: None,
        });
        db.create_idea(&ada.id, "Analytical engine", Some("gears"), &components)
            .await
            .unwrap();

        let session = Session::for_user(&ada, "github", 3600);
        let hydrated = hydrate_session(&db, &credits_with_balance(1), &session)
            .await
            .unwrap();

        let idea = &hydrated.ideas[0];
        assert_eq!(idea.title, "Analytical engine");
        assert_eq!(idea.description.as_deref(), Some("gears"));
        let names: Vec<_> = idea.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Engine", "Store", "UI"]);
    }

    #[tokio::test]
    async fn credits_failure_propagates() {
        let (db, _dir) = setup().await;
        let ada = user(&db, "1", "Ada").await;
        let mut credits = MockCreditsService::new();
        credits
            .expect_balance()
            .returning(|_| Err(AppError::Credits("down".to_string())));

        let session = Session::for_user(&ada, "github", 3600);
        let error = hydrate_session(&db, &credits, &session).await.unwrap_err();
        assert!(matches!(error, AppError::Credits(_)));
    }

    #[test]
    fn payload_uses_camel_case_keys() {
        let payload = serde_json::to_value(HydratedSession {
            user: crate::api::SessionUserDto {
                id: "u".to_string(),
                name: None,
                email: None,
                image: None,
            },
            expires: chrono::Utc::now(),
            credits: 3,
            saved_ideas: vec![],
            ideas: vec![],
        })
        .unwrap();

        assert!(payload.get("savedIdeas").is_some());
        assert!(payload.get("ideas").is_some());
        assert_eq!(payload["credits"], 3);
    }
}
