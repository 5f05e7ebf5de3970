use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub kafka: KafkaConfig,
    pub provider: ProviderConfig,
    pub email: EmailConfig,
    pub scheduler: SchedulerConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub alert_topic: String,
    pub consumer_group: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    pub award_base_url: String,
    pub flight_base_url: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_fanout_interval")]
    pub fanout_interval_hours: u64,
    #[serde(default = "default_manual_triggers")]
    pub manual_triggers_enabled: bool,
}

fn default_fanout_interval() -> u64 {
    6
}

fn default_manual_triggers() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub admin_token: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Environment wins: FAREWATCH__DATABASE__URL etc.
            .add_source(config::Environment::with_prefix("FAREWATCH").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
