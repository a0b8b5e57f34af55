#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// Base URL of the backend serving `/api/nearby_stations`.
    pub backend_base_url: String,
    /// Mapping-library API key. Not validated: an empty key still produces a
    /// script URL, it just fails upstream.
    pub maps_api_key: String,
    /// Mapping-library script URL, without the key. May carry its own query.
    pub maps_script_url: String,
    pub map_zoom: u8,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("backend_base_url", &self.backend_base_url)
            .field(
                "maps_api_key",
                &if self.maps_api_key.is_empty() {
                    "[unset]"
                } else {
                    "[redacted]"
                },
            )
            .field("maps_script_url", &self.maps_script_url)
            .field("map_zoom", &self.map_zoom)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
