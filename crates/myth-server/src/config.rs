use anyhow::{Context, bail};

/// Secrets that ship in sample env files and must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-change-me", "change-me", "changeme", "secret"];

/// Server configuration loaded from environment variables.
///
/// | Env Var                | Default          |
/// |------------------------|------------------|
/// | `MYTH_HOST`            | `0.0.0.0`        |
/// | `MYTH_PORT`            | `8000`           |
/// | `MYTH_DB_PATH`         | `mythbusters.db` |
/// | `MYTH_JWT_SECRET`      | required         |
/// | `MYTH_TOKEN_TTL_HOURS` | `24`             |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = get("MYTH_HOST").unwrap_or_else(|| "0.0.0.0".into());

        let port: u16 = get("MYTH_PORT")
            .unwrap_or_else(|| "8000".into())
            .parse()
            .context("MYTH_PORT must be a valid u16")?;

        let db_path = get("MYTH_DB_PATH").unwrap_or_else(|| "mythbusters.db".into());

        let jwt_secret = get("MYTH_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() {
            bail!("MYTH_JWT_SECRET must be set");
        }
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.trim()) {
            bail!("MYTH_JWT_SECRET is a placeholder value; set a real secret");
        }

        let token_ttl_hours: i64 = get("MYTH_TOKEN_TTL_HOURS")
            .unwrap_or_else(|| "24".into())
            .parse()
            .context("MYTH_TOKEN_TTL_HOURS must be a whole number of hours")?;
        if token_ttl_hours <= 0 {
            bail!("MYTH_TOKEN_TTL_HOURS must be positive");
        }

        Ok(Self {
            host,
            port,
            db_path,
            jwt_secret,
            token_ttl_hours,
        })
    }
}
