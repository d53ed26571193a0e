//! Sign-in lifecycle events

use crate::credits::CreditsService;
use crate::data::User;
use crate::error::AppError;

/// Credits granted to a brand-new user with no credit history
pub const STARTING_CREDITS: i64 = 3;

/// Runs once, right after a user row is inserted by an OAuth sign-in.
///
/// Grants [`STARTING_CREDITS`] when the user's balance is zero. Returns the
/// amount granted.
pub async fn on_user_created(credits: &dyn CreditsService, user: &User) -> Result<i64, AppError> {
    let balance = credits.balance(&user.id).await?;
    if balance != 0 {
        tracing::info!(user_id = %user.id, balance, "New user already has credits; no starting grant");
        return Ok(0);
    }

    credits.reward(&user.id, STARTING_CREDITS).await?;
    tracing::info!(user_id = %user.id, amount = STARTING_CREDITS, "Granted starting credits");

    Ok(STARTING_CREDITS)
}
