//! Daemon configuration.
//!
//! Priority (highest to lowest):
//! 1. Environment variables prefixed with `HEATPUMP_`, `__` separating levels
//! 2. The TOML file given on the command line
//! 3. Built-in defaults

use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::poller::PollSettings;
use crate::profile::{DeviceKind, DeviceProfile};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default = "default_things")]
    pub things: Vec<HandlerConfig>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Tcp,
    Serial,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub transport: TransportKind,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub baud: u32,
    pub slave_id: u8,
    pub timeout_millis: u64,
    pub time_between_transactions_millis: u64,
    pub reconnect_millis: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Tcp,
            host: "127.0.0.1".to_string(),
            port: 502,
            path: "/dev/ttyUSB0".to_string(),
            baud: 19200,
            slave_id: 1,
            timeout_millis: 1000,
            time_between_transactions_millis: 60,
            reconnect_millis: 1000,
        }
    }
}

impl EndpointConfig {
    pub fn label(&self) -> String {
        match self.transport {
            TransportKind::Tcp => format!("{}:{} (slave {})", self.host, self.port, self.slave_id),
            TransportKind::Serial => format!("{} (slave {})", self.path, self.slave_id),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_millis)
    }

    pub fn time_between_transactions(&self) -> Duration {
        Duration::from_millis(self.time_between_transactions_millis)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_millis)
    }
}

/// Per-thing settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HandlerConfig {
    pub kind: DeviceKind,
    #[serde(default = "default_index")]
    pub index: u16,
    #[serde(default = "default_refresh_millis")]
    pub refresh_millis: u64,
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,
}

impl HandlerConfig {
    pub fn new(kind: DeviceKind, index: u16) -> Self {
        Self {
            kind,
            index,
            refresh_millis: default_refresh_millis(),
            max_tries: default_max_tries(),
        }
    }

    pub fn thing_uid(&self) -> String {
        format!("lambda:{}:{}", self.kind, self.index)
    }

    /// Checks the settings and resolves the register layout they select.
    pub fn validate(&self) -> Result<DeviceProfile> {
        if self.refresh_millis == 0 {
            return Err(Error::Configuration(
                "refresh interval must be positive".to_string(),
            ));
        }
        if self.max_tries == 0 {
            return Err(Error::Configuration(
                "max_tries must be at least 1".to_string(),
            ));
        }
        DeviceProfile::new(self.kind, self.index)
    }

    pub fn poll_settings(&self, timeout: Duration) -> PollSettings {
        PollSettings {
            refresh: Duration::from_millis(self.refresh_millis),
            timeout,
            max_tries: self.max_tries,
        }
    }
}

fn default_things() -> Vec<HandlerConfig> {
    vec![HandlerConfig::new(DeviceKind::General, 1)]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_index() -> u16 {
    1
}

fn default_refresh_millis() -> u64 {
    30_000
}

fn default_max_tries() -> u32 {
    3
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("HEATPUMP_").split("__"));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment
            .extract()
            .map_err(|e| Error::Configuration(format!("Failed to load configuration: {}", e)))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            things: default_things(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Result<AppConfig> {
        AppConfig::from_figment(
            Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string(toml)),
        )
    }

    #[test]
    fn defaults_without_file() {
        let config = parse("").unwrap();
        assert_eq!(config.endpoint, EndpointConfig::default());
        assert_eq!(config.things, vec![HandlerConfig::new(DeviceKind::General, 1)]);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn file_overrides_defaults() {
        let config = parse(
            r#"
            log_level = "debug"

            [endpoint]
            transport = "serial"
            path = "/dev/ttyAMA0"
            slave_id = 4

            [[things]]
            kind = "heating-circuit"
            index = 2
            refresh_millis = 5000

            [[things]]
            kind = "boiler"
            "#,
        )
        .unwrap();
        assert_eq!(config.endpoint.transport, TransportKind::Serial);
        assert_eq!(config.endpoint.slave_id, 4);
        assert_eq!(config.endpoint.baud, 19200);
        assert_eq!(config.endpoint.timeout(), Duration::from_secs(1));
        assert_eq!(config.things.len(), 2);
        assert_eq!(config.things[0].thing_uid(), "lambda:heating-circuit:2");
        assert_eq!(config.things[1].index, 1);
        assert_eq!(config.things[1].max_tries, 3);
        assert_eq!(config.things[1].refresh_millis, 30_000);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = parse("[[things]]\nkind = \"pool\"").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn validation() {
        assert!(HandlerConfig::new(DeviceKind::Solar, 2).validate().is_ok());
        assert!(HandlerConfig::new(DeviceKind::Solar, 3).validate().is_err());

        let mut config = HandlerConfig::new(DeviceKind::Boiler, 1);
        config.refresh_millis = 0;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let config = HandlerConfig::new(DeviceKind::Boiler, 1);
        let settings = config.poll_settings(Duration::from_millis(1000));
        assert_eq!(settings.refresh, Duration::from_millis(30_000));
        assert_eq!(settings.max_tries, 3);
    }
}
