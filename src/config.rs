use crate::models::ItemNamePolicy;
use anyhow::Context;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_LATEST_ITEMS: usize = 10;
const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;
const DEFAULT_SESSION_COOKIE: &str = "catalog_session";
const DEFAULT_REDIRECT_URI: &str = "postmessage";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GoogleClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl GoogleClientConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub latest_items: usize,
    pub item_name_policy: ItemNamePolicy,
    pub seed_demo: bool,
    pub session_ttl: Duration,
    pub session_cookie: String,
    pub google: GoogleClientConfig,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    web: ClientSecretsWeb,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsWeb {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

impl CatalogConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |name: &str| lookup(name).map(|value| value.trim().to_string()).filter(|v| !v.is_empty());

        let bind_raw = var("CATALOG_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_raw
            .parse()
            .with_context(|| format!("CATALOG_BIND_ADDR '{}' is not a socket address", bind_raw))?;

        let data_dir = PathBuf::from(var("CATALOG_DATA_DIR").unwrap_or_else(|| "data".to_string()));
        let db_path = var("CATALOG_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("catalog.sqlite"));
        let log_dir = var("CATALOG_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("logs"));

        let item_name_policy = if parse_bool(var("CATALOG_UNIQUE_ITEM_NAMES"), false) {
            ItemNamePolicy::UniqueNames
        } else {
            ItemNamePolicy::AllowDuplicates
        };

        let mut google = match var("GOOGLE_CLIENT_SECRETS_FILE") {
            Some(path) => load_client_secrets(Path::new(&path))?,
            None => GoogleClientConfig::default(),
        };
        if let Some(client_id) = var("GOOGLE_CLIENT_ID") {
            google.client_id = client_id;
        }
        if let Some(client_secret) = var("GOOGLE_CLIENT_SECRET") {
            google.client_secret = client_secret;
        }
        if let Some(redirect_uri) = var("GOOGLE_REDIRECT_URI") {
            google.redirect_uri = redirect_uri;
        }
        if google.redirect_uri.is_empty() {
            google.redirect_uri = DEFAULT_REDIRECT_URI.to_string();
        }

        Ok(Self {
            bind_addr,
            data_dir,
            db_path,
            log_dir,
            latest_items: parse_usize(var("CATALOG_LATEST_ITEMS"), DEFAULT_LATEST_ITEMS).clamp(1, 100),
            item_name_policy,
            seed_demo: parse_bool(var("CATALOG_SEED_DEMO"), false),
            session_ttl: Duration::from_secs(parse_u64(var("CATALOG_SESSION_TTL_SECS"), DEFAULT_SESSION_TTL_SECS)),
            session_cookie: var("CATALOG_SESSION_COOKIE").unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string()),
            google,
        })
    }
}

fn load_client_secrets(path: &Path) -> anyhow::Result<GoogleClientConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read Google client secrets from {}", path.display()))?;
    let parsed: ClientSecretsFile = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse Google client secrets in {}", path.display()))?;
    Ok(GoogleClientConfig {
        client_id: parsed.web.client_id,
        client_secret: parsed.web.client_secret,
        redirect_uri: parsed.web.redirect_uris.into_iter().next().unwrap_or_default(),
    })
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    value
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn parse_u64(value: Option<String>, default: u64) -> u64 {
    value.and_then(|v| v.parse::<u64>().ok()).unwrap_or(default)
}

fn parse_usize(value: Option<String>, default: usize) -> usize {
    value.and_then(|v| v.parse::<usize>().ok()).unwrap_or(default)
}
