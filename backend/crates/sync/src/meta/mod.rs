pub mod token;

pub use token::MetaTokenExchanger;

pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com/v19.0";

#[derive(Debug, Clone)]
pub struct MetaClientConfig {
    pub app_id: String,
    pub app_secret: String,
    pub graph_url: String,
    pub timeout_secs: u64,
}

impl MetaClientConfig {
    /// Load Meta config from environment.
    ///
    /// Returns `None` if `META_APP_ID` or `META_APP_SECRET` is missing.
    pub fn from_env() -> Option<Self> {
        let app_id = std::env::var("META_APP_ID").ok().filter(|v| !v.is_empty())?;
        let app_secret = std::env::var("META_APP_SECRET")
            .ok()
            .filter(|v| !v.is_empty())?;
        let graph_url = std::env::var("META_GRAPH_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_GRAPH_URL.to_string());
        let timeout_secs = std::env::var("META_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Some(Self {
            app_id,
            app_secret,
            graph_url,
            timeout_secs,
        })
    }
}
