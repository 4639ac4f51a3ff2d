use std::time::Duration;

use serde::Deserialize;
use survey_domain::surveys::SurveyServiceConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_env: String,
    pub port: u16,
    pub log_level: String,
    pub data_backend: String,
    pub surreal_endpoint: String,
    pub surreal_ns: String,
    pub surreal_db: String,
    pub surreal_user: String,
    pub surreal_pass: String,
    pub store_timeout_ms: u64,
    pub token_max_attempts: usize,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let cfg = config::Config::builder()
            .set_default("app_env", "development")?
            .set_default("port", 3000)?
            .set_default("log_level", "info")?
            .set_default("data_backend", "memory")?
            .set_default("surreal_endpoint", "ws://127.0.0.1:8000")?
            .set_default("surreal_ns", "survey")?
            .set_default("surreal_db", "survey")?
            .set_default("surreal_user", "root")?
            .set_default("surreal_pass", "root")?
            .set_default("store_timeout_ms", 5000)?
            .set_default("token_max_attempts", 16)?
            .set_default("request_timeout_secs", 30)?
            .add_source(config::Environment::default().separator("__"))
            .build()?;
        cfg.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    pub fn is_test(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("test")
    }

    pub fn survey_service_config(&self) -> SurveyServiceConfig {
        SurveyServiceConfig {
            store_timeout: Duration::from_millis(self.store_timeout_ms.max(1)),
            token_max_attempts: self.token_max_attempts.max(1),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
