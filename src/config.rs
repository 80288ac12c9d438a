use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Default location of the optional config file (extension resolved by `config`)
pub const DEFAULT_CONFIG_PATH: &str = "config/stt-relay";

/// Environment variable holding the recognizer API key
pub const API_KEY_ENV: &str = "YANDEX_STT_API_KEY";

/// Environment variable overriding the listen port
pub const PORT_ENV: &str = "PORT";

const ENV_PREFIX: &str = "RELAY";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub recognizer: RecognizerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognizerConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub connect_timeout_secs: u64,
}

impl Config {
    /// Load from defaults, an optional file and the process environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like `load`, reading variables from `env` instead of the process
    /// environment when given
    pub fn load_with_env(path: Option<&str>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::with_name(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };

        let lookup = |key: &str| match &env {
            Some(vars) => vars.get(key).cloned(),
            None => std::env::var(key).ok(),
        };

        let mut builder = config::Config::builder()
            .set_default("service.name", "stt-relay")?
            .set_default("service.http.bind", "0.0.0.0")?
            .set_default("service.http.port", 8000)?
            .set_default("recognizer.endpoint", "https://stt.api.cloud.yandex.net:443")?
            .set_default("recognizer.connect_timeout_secs", 10)?
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .source(env.clone()),
            );

        if let Some(port) = lookup(PORT_ENV) {
            let port: u16 = port
                .trim()
                .parse()
                .with_context(|| format!("{} is not a valid port: {:?}", PORT_ENV, port))?;
            builder = builder.set_override("service.http.port", i64::from(port))?;
        }

        if let Some(key) = lookup(API_KEY_ENV) {
            builder = builder.set_override("recognizer.api_key", key)?;
        }

        let settings = builder.build().context("Failed to load configuration")?;

        Ok(settings.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.service.http.port == 0 {
            bail!("service.http.port must be non-zero");
        }
        if self.recognizer.endpoint.trim().is_empty() {
            bail!("recognizer.endpoint must not be empty");
        }
        if self.recognizer.connect_timeout_secs == 0 {
            bail!("recognizer.connect_timeout_secs must be non-zero");
        }
        if self.credential().is_none() {
            bail!("No recognizer API key configured; set {}", API_KEY_ENV);
        }
        Ok(())
    }

    /// The API key, if one is configured and non-blank
    pub fn credential(&self) -> Option<&str> {
        self.recognizer
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.recognizer.connect_timeout_secs)
    }
}
