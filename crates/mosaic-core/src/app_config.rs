use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub results_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub credentials_path: PathBuf,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub page_delay_ms: u64,
    pub platform_cooldown_ms: u64,
    pub identity_cooldown_ms: u64,
    pub ollama_url: String,
    pub ollama_model: String,
    pub prompts_dir: PathBuf,
}

impl AppConfig {
    #[must_use]
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    #[must_use]
    pub fn platform_cooldown(&self) -> Duration {
        Duration::from_millis(self.platform_cooldown_ms)
    }

    #[must_use]
    pub fn identity_cooldown(&self) -> Duration {
        Duration::from_millis(self.identity_cooldown_ms)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The Ollama URL may embed basic-auth credentials behind a proxy.
        let ollama_url = if self.ollama_url.contains('@') {
            "[redacted]"
        } else {
            self.ollama_url.as_str()
        };
        f.debug_struct("AppConfig")
            .field("log_level", &self.log_level)
            .field("results_dir", &self.results_dir)
            .field("staging_dir", &self.staging_dir)
            .field("credentials_path", &self.credentials_path)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("page_delay_ms", &self.page_delay_ms)
            .field("platform_cooldown_ms", &self.platform_cooldown_ms)
            .field("identity_cooldown_ms", &self.identity_cooldown_ms)
            .field("ollama_url", &ollama_url)
            .field("ollama_model", &self.ollama_model)
            .field("prompts_dir", &self.prompts_dir)
            .finish()
    }
}
