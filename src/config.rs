use crate::tenant::data::DEFAULT_TENANT_ID;
use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;

pub const DEFAULT_SESSION_TTL_SECS: i64 = 3600;

/// Process settings read from the environment at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub session_key: Vec<u8>,
    pub session_ttl_secs: i64,
    pub tenant_id: String,
    pub auto_login: bool,
    /// Browser origin allowed to call the API, if any.
    pub cors_origin: Option<String>,
    /// Mark the session cookie `Secure`; set when served over HTTPS.
    pub secure_cookies: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = var("BIND_ADDR").unwrap_or_else(|| {
            let port = var("PORT").unwrap_or_else(|| "3000".to_string());
            format!("0.0.0.0:{}", port)
        });

        let database_url = var("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let session_key = match var("SESSION_KEY") {
            Some(raw) => general_purpose::STANDARD
                .decode(raw.trim())
                .context("SESSION_KEY must be base64")?,
            None => {
                tracing::warn!("SESSION_KEY not set, generating an ephemeral key");
                let mut key = vec![0u8; 32];
                rand::thread_rng().fill_bytes(&mut key);
                key
            }
        };
        if session_key.len() < 16 {
            anyhow::bail!("SESSION_KEY must decode to at least 16 bytes");
        }

        let session_ttl_secs = match var("SESSION_TTL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|ttl| *ttl > 0)
                .context("SESSION_TTL_SECS must be a positive number of seconds")?,
            None => DEFAULT_SESSION_TTL_SECS,
        };

        let tenant_id = var("TENANT_ID").unwrap_or_else(|| DEFAULT_TENANT_ID.to_string());
        let flag = |name: &str| {
            var(name)
                .map(|raw| matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false)
        };
        let auto_login = flag("AUTO_LOGIN");
        // Any value of PRODUCTION switches secure cookies on.
        let secure_cookies = flag("SECURE_COOKIES") || var("PRODUCTION").is_some();

        let cors_origin = var("CORS_ORIGIN").filter(|origin| !origin.trim().is_empty());

        Ok(Self {
            bind_addr,
            database_url,
            session_key,
            session_ttl_secs,
            tenant_id,
            auto_login,
            cors_origin,
            secure_cookies,
        })
    }
}
