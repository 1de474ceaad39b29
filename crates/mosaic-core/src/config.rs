use std::path::PathBuf;

use crate::app_config::AppConfig;
use crate::ConfigError;

pub const DEFAULT_USER_AGENT: &str = "mosaic/0.1 (public-profile-extraction)";

/// Read `.env` (if any), then build the config from the process environment.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Build the config from the current process environment without touching `.env`.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Every `MOSAIC_*` setting resolved through `lookup`.
///
/// Every setting has a default; only malformed numbers are rejected.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let log_level = or_default("MOSAIC_LOG_LEVEL", "warn");
    let results_dir = PathBuf::from(or_default("MOSAIC_RESULTS_DIR", "./results"));
    let staging_dir = PathBuf::from(or_default("MOSAIC_STAGING_DIR", "."));
    let credentials_path = PathBuf::from(or_default("MOSAIC_CONFIG_PATH", "./config.yaml"));

    let request_timeout_secs = parse_u64("MOSAIC_REQUEST_TIMEOUT_SECS", "15")?;
    if request_timeout_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "MOSAIC_REQUEST_TIMEOUT_SECS".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    let user_agent = or_default("MOSAIC_USER_AGENT", DEFAULT_USER_AGENT);
    let page_delay_ms = parse_u64("MOSAIC_PAGE_DELAY_MS", "500")?;
    let platform_cooldown_ms = parse_u64("MOSAIC_PLATFORM_COOLDOWN_MS", "1000")?;
    let identity_cooldown_ms = parse_u64("MOSAIC_IDENTITY_COOLDOWN_MS", "1000")?;

    let ollama_url = or_default("MOSAIC_OLLAMA_URL", "http://localhost:11434");
    let ollama_model = or_default("MOSAIC_OLLAMA_MODEL", "qwen:0.5b");
    let prompts_dir = PathBuf::from(or_default("MOSAIC_PROMPTS_DIR", "./prompts"));

    Ok(AppConfig {
        log_level,
        results_dir,
        staging_dir,
        credentials_path,
        request_timeout_secs,
        user_agent,
        page_delay_ms,
        platform_cooldown_ms,
        identity_cooldown_ms,
        ollama_url,
        ollama_model,
        prompts_dir,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
