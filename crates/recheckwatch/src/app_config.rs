//! Process configuration (§4.J / §6 "Process config"): the flat
//! key/value sections read from the configuration file named on the
//! command line.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration from {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: config::ConfigError,
    },
    #[error("channel config file not found at {0}")]
    ChannelConfigMissing(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataSourceConfig {
    pub base_url: String,
    #[serde(default = "default_index_template")]
    pub index_template: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_index_template() -> String {
    "logstash-%Y.%m.%d".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventSourceConfig {
    pub user: String,
    pub host: String,
    pub key: String,
    pub query_file: String,
    #[serde(default = "default_gerrit_port")]
    pub port: u16,
}

fn default_gerrit_port() -> u16 {
    29418
}

#[derive(Debug, Clone, Deserialize)]
pub struct IrcBotConfig {
    pub nick: String,
    pub pass: String,
    pub server: String,
    #[serde(default = "default_irc_port")]
    pub port: u16,
    pub channel_config: String,
}

fn default_irc_port() -> u16 {
    6667
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecheckwatchConfig {
    pub ci_username: String,
    pub catalog_dir: String,
    #[serde(default)]
    pub gating_job_patterns: Vec<String>,
    #[serde(default)]
    pub suppressed_job_substrings: Vec<String>,
    #[serde(default = "default_true")]
    pub suppress_nonvoting_annotation: bool,
    #[serde(default = "default_true")]
    pub suppress_check_queue_chat: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub data_source: DataSourceConfig,
    pub event_source: EventSourceConfig,
    pub ircbot: IrcBotConfig,
    pub recheckwatch: RecheckwatchConfig,
}

impl AppConfig {
    /// Load `path` with `RECHECKWATCH_`-prefixed environment variable
    /// overrides (e.g. `RECHECKWATCH_IRCBOT__PASS`).
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("RECHECKWATCH").separator("__"))
            .build()
            .map_err(|source| ConfigError::Load {
                path: path.to_string(),
                source,
            })?;

        settings
            .try_deserialize()
            .map_err(|source| ConfigError::Load {
                path: path.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_every_section_from_a_flat_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recheckwatch.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[data_source]
base_url = "http://logstash.example.org/elasticsearch"

[event_source]
user = "ci-bot"
host = "review.example.org"
key = "/etc/recheckwatch/id_rsa"
query_file = "/etc/recheckwatch/queries"

[ircbot]
nick = "recheckwatch"
pass = "secret"
server = "irc.example.org"
channel_config = "/etc/recheckwatch/channels.yaml"

[recheckwatch]
ci_username = "jenkins"
catalog_dir = "/etc/recheckwatch/queries"
"#
        )
        .unwrap();

        let cfg = AppConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.data_source.index_template, "logstash-%Y.%m.%d");
        assert_eq!(cfg.event_source.port, 29418);
        assert_eq!(cfg.ircbot.port, 6667);
        assert!(cfg.recheckwatch.suppress_check_queue_chat);
    }
}
