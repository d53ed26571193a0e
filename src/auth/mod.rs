//! OAuth authentication and sessions
//!
//! Handles:
//! - GitHub and Discord OAuth flow
//! - Signed session tokens and extractors
//! - New-user credits and session hydration

pub mod events;
pub mod hydrate;
mod middleware;
mod oauth;
pub mod providers;
pub mod session;

pub use events::{STARTING_CREDITS, on_user_created};
pub use hydrate::{SESSION_IDEA_LIMIT, hydrate_session};
pub use middleware::{CurrentUser, MaybeUser};
pub use oauth::auth_router;
pub use providers::{ProviderKind, ProviderRegistry};
pub use session::{SESSION_COOKIE, Session, create_session_token, verify_session_token};
