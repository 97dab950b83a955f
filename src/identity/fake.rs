use crate::errors::{AppError, AppResult};
use crate::identity::{IdentityProvider, ProviderGrant};
use crate::models::IdentityProfile;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// In-memory provider: each registered code maps to one profile.
#[derive(Default)]
pub struct FakeIdentityProvider {
    pub codes: Mutex<HashMap<String, IdentityProfile>>,
    pub tokens: Mutex<HashMap<String, IdentityProfile>>,
    pub revoked: Mutex<Vec<String>>,
    pub fail_revoke: bool,
    issued: AtomicU64,
}

impl FakeIdentityProvider {
    pub fn with_failing_revoke() -> Self {
        Self {
            fail_revoke: true,
            ..Self::default()
        }
    }

    pub async fn register_code(&self, code: &str, profile: IdentityProfile) {
        self.codes.lock().await.insert(code.to_string(), profile);
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    fn provider_tag(&self) -> &'static str {
        "fake"
    }

    fn client_id(&self) -> Option<&str> {
        Some("fake-client-id")
    }

    async fn exchange_code(&self, code: &str) -> AppResult<ProviderGrant> {
        let profile = self
            .codes
            .lock()
            .await
            .remove(code)
            .ok_or_else(|| AppError::Identity("unknown authorization code".to_string()))?;
        let access_token = format!("fake-token-{}", self.issued.fetch_add(1, Ordering::Relaxed));
        self.tokens.lock().await.insert(access_token.clone(), profile);
        Ok(ProviderGrant { access_token })
    }

    async fn fetch_profile(&self, access_token: &str) -> AppResult<IdentityProfile> {
        self.tokens
            .lock()
            .await
            .get(access_token)
            .cloned()
            .ok_or_else(|| AppError::Identity("unknown access token".to_string()))
    }

    async fn revoke(&self, access_token: &str) -> AppResult<()> {
        if self.fail_revoke {
            return Err(AppError::Identity("revocation rejected".to_string()));
        }
        self.tokens.lock().await.remove(access_token);
        self.revoked.lock().await.push(access_token.to_string());
        Ok(())
    }
}
