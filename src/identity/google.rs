use crate::config::GoogleClientConfig;
use crate::errors::{AppError, AppResult};
use crate::identity::{IdentityProvider, ProviderGrant};
use crate::models::IdentityProfile;
use crate::redaction::Redactor;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v1/userinfo";
const REVOKE_ENDPOINT: &str = "https://oauth2.googleapis.com/revoke";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    picture: String,
}

pub struct GoogleIdentityProvider {
    config: GoogleClientConfig,
    client: reqwest::Client,
    redactor: Redactor,
}

impl GoogleIdentityProvider {
    pub fn new(config: GoogleClientConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|error| AppError::Internal(format!("failed to build Google HTTP client: {}", error)))?;
        Ok(Self {
            config,
            client,
            redactor: Redactor::new(),
        })
    }

    fn ensure_configured(&self) -> AppResult<()> {
        if self.config.is_configured() {
            return Ok(());
        }
        Err(AppError::Identity(
            "Google sign-in is not configured (set GOOGLE_CLIENT_SECRETS_FILE or GOOGLE_CLIENT_ID/SECRET)".to_string(),
        ))
    }

    async fn failure(&self, stage: &str, response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let redacted = self.redactor.redact(&body);
        tracing::warn!(
            provider = "google",
            stage,
            status = status.as_u16(),
            body = %redacted.content,
            "identity provider request failed"
        );
        AppError::Identity(format!("Google {} request failed with status {}", stage, status))
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn provider_tag(&self) -> &'static str {
        "google"
    }

    fn client_id(&self) -> Option<&str> {
        Some(self.config.client_id.as_str()).filter(|id| !id.is_empty())
    }

    async fn exchange_code(&self, code: &str) -> AppResult<ProviderGrant> {
        self.ensure_configured()?;
        let response = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.failure("token", response).await);
        }
        let token: TokenResponse = response.json().await?;
        Ok(ProviderGrant {
            access_token: token.access_token,
        })
    }

    async fn fetch_profile(&self, access_token: &str) -> AppResult<IdentityProfile> {
        let response = self
            .client
            .get(USERINFO_ENDPOINT)
            .query(&[("alt", "json")])
            .bearer_auth(access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.failure("userinfo", response).await);
        }
        let info: UserInfoResponse = response.json().await?;
        let name = if info.name.trim().is_empty() {
            info.email.split('@').next().unwrap_or_default().to_string()
        } else {
            info.name
        };
        Ok(IdentityProfile {
            email: info.email,
            name,
            picture_url: info.picture,
        })
    }

    async fn revoke(&self, access_token: &str) -> AppResult<()> {
        let response = self
            .client
            .post(REVOKE_ENDPOINT)
            .form(&[("token", access_token)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.failure("revoke", response).await);
        }
        Ok(())
    }
}
