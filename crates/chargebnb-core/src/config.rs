use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a numeric value does not parse.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a numeric value does not parse.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable has a default. String values are taken as-is without
/// validation; only numeric values can fail.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u8 = |var: &str, default: &str| -> Result<u8, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u8>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let env = parse_environment(&or_default("CHARGEBNB_ENV", "development"));
    let log_level = or_default("CHARGEBNB_LOG_LEVEL", "info");
    let backend_base_url = or_default("CHARGEBNB_BACKEND_URL", "http://127.0.0.1:5000");
    let maps_api_key = or_default("CHARGEBNB_MAPS_API_KEY", "");
    let maps_script_url = or_default(
        "CHARGEBNB_MAPS_SCRIPT_URL",
        "https://maps.googleapis.com/maps/api/js",
    );
    let map_zoom = parse_u8("CHARGEBNB_MAP_ZOOM", "14")?;
    let request_timeout_secs = parse_u64("CHARGEBNB_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("CHARGEBNB_USER_AGENT", "chargebnb/0.1 (station-discovery)");

    Ok(AppConfig {
        env,
        log_level,
        backend_base_url,
        maps_api_key,
        maps_script_url,
        map_zoom,
        request_timeout_secs,
        user_agent,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
