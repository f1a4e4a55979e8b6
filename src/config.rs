//! Application configuration management.
//!
//! Configuration comes from environment variables (optionally seeded from a
//! `.env` file) and is deserialized into a type-safe struct with `envy`.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `APP_BASE_URL` (optional): base for links sent in auth emails
/// - `SESSION_TTL_HOURS` (optional): login session lifetime, defaults to 30 days
/// - `PASSWORD_RESET_TTL_MINUTES` (optional): defaults to 60
/// - `MAGIC_LINK_TTL_MINUTES` (optional): defaults to 15
/// - `MAIL_HOOK_URL` / `MAIL_HOOK_SECRET` (optional): outbound mail relay
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_base_url")]
    pub app_base_url: String,

    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,

    #[serde(default = "default_password_reset_ttl_minutes")]
    pub password_reset_ttl_minutes: i64,

    #[serde(default = "default_magic_link_ttl_minutes")]
    pub magic_link_ttl_minutes: i64,

    /// When unset, auth emails are written to the log instead of being sent.
    #[serde(default)]
    pub mail_hook_url: Option<String>,

    #[serde(default)]
    pub mail_hook_secret: Option<String>,
}

fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_session_ttl_hours() -> i64 {
    24 * 30
}

fn default_password_reset_ttl_minutes() -> i64 {
    60
}

fn default_magic_link_ttl_minutes() -> i64 {
    15
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is loaded first if present.
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a value cannot be
    /// parsed into its expected type.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>()
    }

    /// Configuration suitable for tests that never touch the network.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::from_pairs(vec![(
            "DATABASE_URL".to_string(),
            "postgres://localhost/campaign_keeper_test".to_string(),
        )])
        .expect("test config")
    }

    #[cfg(test)]
    fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, envy::Error> {
        envy::from_iter::<_, Config>(pairs)
    }
}
