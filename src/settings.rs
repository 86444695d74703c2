use anyhow::{Context, Result};
use config::Config;
use tracing::debug;

const DEFAULT_BUCKET: &str = "scrape";
const DEFAULT_OBJECT: &str = "info.html";

/// Settings from `course_harvest.toml` (optional) overlaid with `SUPABASE_*` env vars.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub url: Option<String>,
    pub key: Option<String>,
    pub bucket: String,
    pub object: String,
}

/// Credentials for the hosted store, present by construction.
#[derive(Debug, Clone)]
pub struct Remote {
    pub url: String,
    pub key: String,
    pub bucket: String,
    pub object: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let cfg = Config::builder()
            .add_source(config::File::with_name("course_harvest").required(false))
            .add_source(config::Environment::with_prefix("SUPABASE"))
            .build()
            .context("Failed to load configuration")?;
        let settings = Self::from_config(&cfg);
        debug!(url = ?settings.url, bucket = %settings.bucket, "Loaded settings");
        Ok(settings)
    }

    fn from_config(cfg: &Config) -> Self {
        let non_empty = |k: &str| cfg.get_string(k).ok().filter(|v| !v.trim().is_empty());
        Settings {
            url: non_empty("url").map(|u| u.trim_end_matches('/').to_string()),
            key: non_empty("key"),
            bucket: non_empty("bucket").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            object: non_empty("object").unwrap_or_else(|| DEFAULT_OBJECT.to_string()),
        }
    }

    /// Fails unless both SUPABASE_URL and SUPABASE_KEY are set.
    pub fn require_remote(&self) -> Result<Remote> {
        let url = self
            .url
            .clone()
            .context("SUPABASE_URL environment variable must be set")?;
        let key = self
            .key
            .clone()
            .context("SUPABASE_KEY environment variable must be set")?;
        Ok(Remote {
            url,
            key,
            bucket: self.bucket.clone(),
            object: self.object.clone(),
        })
    }
}
