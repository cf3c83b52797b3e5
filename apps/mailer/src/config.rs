use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use url::Url;

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8000";

/// Client configuration loaded from environment variables (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the email service, without a trailing slash.
    pub service_url: String,
    /// Résumé attached when the session starts.
    pub resume_path: Option<PathBuf>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw_url = lookup("EMAIL_SERVICE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());

        Ok(Config {
            service_url: parse_service_url(&raw_url)?,
            resume_path: lookup("RESUME_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_service_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim())
        .with_context(|| format!("EMAIL_SERVICE_URL '{raw}' is not a valid URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("EMAIL_SERVICE_URL must use http or https, got '{}'", url.scheme());
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}
