//! OAuth provider registry
//!
//! GitHub and Discord are supported. Each provider knows its endpoints,
//! scopes and how to turn its user-info payload into a [`ProviderIdentity`].

use serde::Serialize;
use serde_json::Value;

use crate::config::{AuthConfig, OAuthProviderConfig};
use crate::data::ProviderIdentity;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    GitHub,
    Discord,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::GitHub, ProviderKind::Discord];

    pub fn id(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::Discord => "discord",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::GitHub => "GitHub",
            Self::Discord => "Discord",
        }
    }

    fn default_authorize_url(self) -> &'static str {
        match self {
            Self::GitHub => "https://github.com/login/oauth/authorize",
            Self::Discord => "https://discord.com/api/oauth2/authorize",
        }
    }

    fn default_token_url(self) -> &'static str {
        match self {
            Self::GitHub => "https://github.com/login/oauth/access_token",
            Self::Discord => "https://discord.com/api/oauth2/token",
        }
    }

    fn default_userinfo_url(self) -> &'static str {
        match self {
            Self::GitHub => "https://api.github.com/user",
            Self::Discord => "https://discord.com/api/users/@me",
        }
    }

    pub fn scope(self) -> &'static str {
        match self {
            Self::GitHub => "read:user user:email",
            Self::Discord => "identify email",
        }
    }

    fn config(self, auth: &AuthConfig) -> &OAuthProviderConfig {
        match self {
            Self::GitHub => &auth.github,
            Self::Discord => &auth.discord,
        }
    }

    /// Map the provider's user-info JSON to an identity
    pub fn parse_profile(self, profile: &Value) -> Result<ProviderIdentity, AppError> {
        let account_id = match &profile["id"] {
            Value::String(id) => id.clone(),
            Value::Number(id) => id.to_string(),
            _ => {
                return Err(AppError::OAuth(format!(
                    "{} profile is missing an id",
                    self.display_name()
                )));
            }
        };
        let text = |key: &str| {
            profile[key]
                .as_str()
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned)
        };

        let (name, image) = match self {
            Self::GitHub => (
                text("name").or_else(|| text("login")),
                text("avatar_url"),
            ),
            Self::Discord => {
                let image = match text("avatar") {
                    Some(hash) => {
                        let ext = if hash.starts_with("a_") { "gif" } else { "png" };
                        format!("https://cdn.discordapp.com/avatars/{account_id}/{hash}.{ext}")
                    }
                    None => {
                        let index = account_id.parse::<u64>().map(|id| (id >> 22) % 6).unwrap_or(0);
                        format!("https://cdn.discordapp.com/embed/avatars/{index}.png")
                    }
                };
                (text("global_name").or_else(|| text("username")), Some(image))
            }
        };

        // GitHub's profile email carries no verification flag; the callback
        // resolves it through `/user/emails`
        let email_verified = match self {
            Self::GitHub => false,
            Self::Discord => profile.get("verified").and_then(Value::as_bool) == Some(true),
        };

        Ok(ProviderIdentity {
            provider: self.id().to_string(),
            provider_account_id: account_id,
            email: text("email"),
            email_verified,
            name,
            image,
        })
    }
}

/// A fully configured provider
#[derive(Debug, Clone)]
pub struct OAuthProvider {
    pub kind: ProviderKind,
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

/// Entry of `GET /api/auth/providers`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub signin_url: String,
    pub callback_url: String,
}

impl OAuthProvider {
    pub fn callback_url(&self, base_url: &str) -> String {
        format!("{}/api/auth/callback/{}", base_url, self.kind.id())
    }

    pub fn info(&self, base_url: &str) -> ProviderInfo {
        ProviderInfo {
            id: self.kind.id(),
            name: self.kind.display_name(),
            signin_url: format!("{}/api/auth/signin/{}", base_url, self.kind.id()),
            callback_url: self.callback_url(base_url),
        }
    }

    /// Provider authorization URL carrying the CSRF state
    pub fn authorization_url(&self, base_url: &str, state: &str) -> Result<String, AppError> {
        let url = url::Url::parse_with_params(
            &self.authorize_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.callback_url(base_url).as_str()),
                ("response_type", "code"),
                ("scope", self.kind.scope()),
                ("state", state),
            ],
        )
        .map_err(|e| AppError::Config(format!("invalid {} authorize URL: {e}", self.kind.id())))?;

        Ok(url.into())
    }
}

/// Providers enabled by configuration
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<OAuthProvider>,
}

impl ProviderRegistry {
    pub fn from_config(auth: &AuthConfig) -> Self {
        let providers = ProviderKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let config = kind.config(auth);
                let (client_id, client_secret) = config.credentials()?;
                Some(OAuthProvider {
                    kind,
                    client_id: client_id.to_string(),
                    client_secret: client_secret.to_string(),
                    authorize_url: config
                        .authorize_url
                        .clone()
                        .unwrap_or_else(|| kind.default_authorize_url().to_string()),
                    token_url: config
                        .token_url
                        .clone()
                        .unwrap_or_else(|| kind.default_token_url().to_string()),
                    userinfo_url: config
                        .userinfo_url
                        .clone()
                        .unwrap_or_else(|| kind.default_userinfo_url().to_string()),
                })
            })
            .collect();

        Self { providers }
    }

    pub fn get(&self, id: &str) -> Option<&OAuthProvider> {
        self.providers.iter().find(|p| p.kind.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OAuthProvider> {
        self.providers.iter()
    }
}
