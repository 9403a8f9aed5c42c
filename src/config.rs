use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Directory holding `submissions.json`, `admins.json` and `phone_numbers.json`.
    pub data_dir: PathBuf,
    pub redis_url: Option<String>,
    pub session_ttl_seconds: u64,
    pub session_key_prefix: String,
    pub cookie_secure: bool,
    pub cookie_domain: Option<String>,
    /// Upper bound on how long a watch request is held open.
    pub watch_timeout_seconds: u64,
    pub cors_allow_origin: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3333,
            data_dir: PathBuf::from("./data"),
            redis_url: None,
            session_ttl_seconds: 60 * 60 * 24 * 7,
            session_key_prefix: "bridge-api".to_string(),
            cookie_secure: false,
            cookie_domain: None,
            watch_timeout_seconds: 25,
            cors_allow_origin: None,
        }
    }
}
