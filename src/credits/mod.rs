//! Credits service integration
//!
//! Balances live in an external microservice. The rest of the crate talks to it
//! through [`CreditsService`] so handlers and tests can swap the transport.

mod client;

use async_trait::async_trait;

use crate::error::AppError;

pub use client::HttpCreditsClient;

/// Contract of the credits microservice
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CreditsService: Send + Sync {
    /// Current credit balance of a user
    async fn balance(&self, user_id: &str) -> Result<i64, AppError>;

    /// Grant `amount` credits to a user
    async fn reward(&self, user_id: &str, amount: i64) -> Result<(), AppError>;
}
