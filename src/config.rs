use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context as _, ensure};
use serde_derive::Deserialize;

use crate::node::Timing;

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub mqtt: MqttConfig,
    pub node: Option<NodeConfig>,
    pub timing: Option<TimingConfig>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub publisher_id: Option<String>,
    pub topic: Option<String>,
    pub keep_alive_seconds: Option<u64>,
    pub reconnect_delay_seconds: Option<u64>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Office,
    Door,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Office => f.write_str("office"),
            Role::Door => f.write_str("door"),
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct NodeConfig {
    pub role: Option<Role>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct TimingConfig {
    pub ring_timeout_ms: Option<u64>,
    pub grant_timeout_ms: Option<u64>,
    pub pulse_half_period_ms: Option<u64>,
    pub blink_half_period_ms: Option<u64>,
    pub tick_ms: Option<u64>,
}

pub const DEFAULT_TOPIC: &str = "busylight";
pub const DEFAULT_TICK_MS: u64 = 10;

impl AppConfig {
    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::de::from_str(contents).context("invalid config file")?;
        let timing = config.timing();
        ensure!(
            timing.pulse_half_period_ms > 0 && timing.blink_half_period_ms > 0,
            "pulse and blink half-periods must be non-zero"
        );
        ensure!(config.tick_ms() > 0, "tick_ms must be non-zero");
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display()))?;
        Self::parse(&contents)
    }

    pub fn timing(&self) -> Timing {
        let defaults = Timing::default();
        let timing = self.timing.clone().unwrap_or_default();
        Timing {
            ring_timeout_ms: timing.ring_timeout_ms.unwrap_or(defaults.ring_timeout_ms),
            grant_timeout_ms: timing.grant_timeout_ms.unwrap_or(defaults.grant_timeout_ms),
            pulse_half_period_ms: timing
                .pulse_half_period_ms
                .unwrap_or(defaults.pulse_half_period_ms),
            blink_half_period_ms: timing
                .blink_half_period_ms
                .unwrap_or(defaults.blink_half_period_ms),
        }
    }

    pub fn tick_ms(&self) -> u64 {
        self.timing
            .as_ref()
            .and_then(|t| t.tick_ms)
            .unwrap_or(DEFAULT_TICK_MS)
    }

    /// The command line wins over the config file.
    pub fn role(&self, from_cli: Option<Role>) -> anyhow::Result<Role> {
        from_cli
            .or_else(|| self.node.as_ref().and_then(|n| n.role))
            .context("no node role given; pass `office` or `door`, or set [node] role")
    }
}

impl MqttConfig {
    pub fn topic(&self) -> &str {
        self.topic.as_deref().unwrap_or(DEFAULT_TOPIC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config() {
        let config_str = r#"
            [mqtt]
            host = "localhost"
            port = 1883
            username = "user"
            password = "pass"

            [node]
            role = "door"

            [timing]
            ring_timeout_ms = 20000
            tick_ms = 5
        "#;
        let config = AppConfig::parse(config_str).unwrap();
        assert!(config.mqtt.host == "localhost");
        assert_eq!(config.mqtt.topic(), "busylight");
        assert_eq!(config.role(None).unwrap(), Role::Door);
        assert_eq!(config.tick_ms(), 5);

        let timing = config.timing();
        assert_eq!(timing.ring_timeout_ms, 20_000);
        assert_eq!(timing.grant_timeout_ms, 5_000);
        assert_eq!(timing.pulse_half_period_ms, 500);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::parse("[mqtt]\nhost = \"broker\"\n").unwrap();
        assert_eq!(config.timing(), Timing::default());
        assert_eq!(config.tick_ms(), DEFAULT_TICK_MS);
        assert!(config.role(None).is_err());
    }

    #[test]
    fn test_cli_role_overrides_file() {
        let config = AppConfig::parse("[mqtt]\nhost = \"b\"\n[node]\nrole = \"door\"\n").unwrap();
        assert_eq!(config.role(Some(Role::Office)).unwrap(), Role::Office);
    }

    #[test]
    fn test_rejects_zero_periods() {
        let config_str = "[mqtt]\nhost = \"b\"\n[timing]\nblink_half_period_ms = 0\n";
        assert!(AppConfig::parse(config_str).is_err());
        let config_str = "[mqtt]\nhost = \"b\"\n[timing]\ntick_ms = 0\n";
        assert!(AppConfig::parse(config_str).is_err());
    }

    #[test]
    fn test_rejects_unknown_role() {
        assert!(AppConfig::parse("[mqtt]\nhost = \"b\"\n[node]\nrole = \"lobby\"\n").is_err());
    }
}
