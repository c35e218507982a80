use std::path::PathBuf;
use std::time::Duration;

use crate::api::MUSE_API_URL;
use crate::db::Store;
use crate::normalize::LevelPolicy;

pub const API_KEY_VAR: &str = "MUSE_API_KEY";
pub const BASE_URL_VAR: &str = "MUSE_API_BASE_URL";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    /// Sent as `api_key`; without it the API serves a smaller quota.
    pub api_key: Option<String>,
    pub db_path: PathBuf,
    pub level_policy: LevelPolicy,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env(db_path: Option<PathBuf>, require_level: bool) -> Self {
        // Load environment variables from .env file, if it exists
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok(), db_path, require_level)
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        db_path: Option<PathBuf>,
        require_level: bool,
    ) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            base_url: non_empty(BASE_URL_VAR).unwrap_or_else(|| MUSE_API_URL.to_string()),
            api_key: non_empty(API_KEY_VAR),
            db_path: db_path.unwrap_or_else(Store::default_path),
            level_policy: if require_level {
                LevelPolicy::Required
            } else {
                LevelPolicy::Optional
            },
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}
