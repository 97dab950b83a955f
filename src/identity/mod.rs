pub mod fake;
pub mod google;

use crate::errors::AppResult;
use crate::models::IdentityProfile;
use async_trait::async_trait;

pub use fake::FakeIdentityProvider;
pub use google::GoogleIdentityProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderGrant {
    pub access_token: String,
}

/// External OAuth identity provider used by the login routes.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn provider_tag(&self) -> &'static str;

    /// Public client id rendered into the login page, if any.
    fn client_id(&self) -> Option<&str>;

    /// Trades a one-time authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> AppResult<ProviderGrant>;

    async fn fetch_profile(&self, access_token: &str) -> AppResult<IdentityProfile>;

    async fn revoke(&self, access_token: &str) -> AppResult<()>;
}
