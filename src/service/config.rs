use std::{env, path::PathBuf, sync::Arc};

use crate::config::Config;

pub trait ConfigService: Send + Sync {
    fn port(&self) -> u16;
    fn values(&self) -> &Config;
}

pub struct ConfigServiceImpl {
    config: Arc<Config>,
}

impl ConfigServiceImpl {
    fn strip_wrapping_quotes(value: &str) -> &str {
        if value.len() >= 2 {
            let bytes = value.as_bytes();
            let first = bytes[0];
            let last = bytes[value.len() - 1];
            if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
                return &value[1..value.len() - 1];
            }
        }
        value
    }

    fn normalize(value: &str) -> Option<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        let normalized = Self::strip_wrapping_quotes(trimmed).trim();
        if normalized.is_empty() {
            None
        } else {
            Some(normalized.to_string())
        }
    }

    fn env_nonempty(key: &str) -> Option<String> {
        env::var(key).ok().and_then(|value| Self::normalize(&value))
    }

    fn env_u16(key: &str) -> Option<u16> {
        Self::env_nonempty(key).and_then(|value| value.parse::<u16>().ok())
    }

    fn env_u64(key: &str) -> Option<u64> {
        Self::env_nonempty(key).and_then(|value| value.parse::<u64>().ok())
    }

    fn env_bool(key: &str, default: bool) -> bool {
        Self::env_nonempty(key)
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(default)
    }

    /// Reads the environment, falling back to [`Config::default`] per key.
    pub fn new() -> Self {
        let defaults = Config::default();

        let port = Self::env_u16("PORT").unwrap_or(defaults.port);
        let data_dir = Self::env_nonempty("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let redis_url = Self::env_nonempty("REDIS_URL");
        let session_ttl_seconds =
            Self::env_u64("SESSION_TTL_SECONDS").unwrap_or(defaults.session_ttl_seconds);
        let session_key_prefix =
            Self::env_nonempty("SESSION_KEY_PREFIX").unwrap_or(defaults.session_key_prefix);
        let cookie_secure = Self::env_bool("COOKIE_SECURE", defaults.cookie_secure);
        let cookie_domain = Self::env_nonempty("COOKIE_DOMAIN");
        let watch_timeout_seconds =
            Self::env_u64("WATCH_TIMEOUT_SECONDS").unwrap_or(defaults.watch_timeout_seconds);
        let cors_allow_origin = Self::env_nonempty("CORS_ALLOW_ORIGIN");

        Self::with_values(Config {
            port,
            data_dir,
            redis_url,
            session_ttl_seconds,
            session_key_prefix,
            cookie_secure,
            cookie_domain,
            watch_timeout_seconds,
            cors_allow_origin,
        })
    }

    pub fn with_values(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl Default for ConfigServiceImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigService for ConfigServiceImpl {
    fn port(&self) -> u16 {
        self.config.port
    }

    fn values(&self) -> &Config {
        &self.config
    }
}
