//! Configuration for Mailrelay

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub mailgun: MailgunConfig,

    #[serde(default)]
    pub slack: SlackConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RelayConfig {
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| crate::Error::ConfigRead(format!("{}: {}", path.as_ref().display(), e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::ConfigParse(e.to_string()))
    }

    /// Overlay values from `MAILRELAY_*` variables onto this config.
    ///
    /// The lookup is injected so callers (and tests) control the source.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("MAILRELAY_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }
        if let Some(port) = lookup("MAILRELAY_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Some(path) = lookup("MAILRELAY_WEBHOOK_PATH") {
            self.server.webhook_path = path;
        }
        if let Some(key) = lookup("MAILRELAY_SIGNING_KEY") {
            self.mailgun.signing_key = key;
        }
        if let Some(url) = lookup("MAILRELAY_SLACK_WEBHOOK_URL") {
            self.slack.webhook_url = url;
        }
        if let Some(title) = lookup("MAILRELAY_SLACK_TITLE") {
            self.slack.title = title;
        }
        if let Some(level) = lookup("MAILRELAY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("MAILRELAY_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.server.validate()?;
        self.mailgun.validate()?;
        self.slack.validate()?;
        self.logging.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Path the provider posts webhook events to
    pub webhook_path: String,
    pub max_body_bytes: usize,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            webhook_path: crate::DEFAULT_WEBHOOK_PATH.to_string(),
            max_body_bytes: crate::DEFAULT_MAX_BODY_BYTES,
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if !self.webhook_path.starts_with('/') {
            return Err(crate::Error::InvalidConfig(format!(
                "webhook_path must start with '/': {}",
                self.webhook_path
            )));
        }
        if matches!(self.webhook_path.as_str(), "/health" | "/metrics") {
            return Err(crate::Error::InvalidConfig(format!(
                "webhook_path collides with a built-in route: {}",
                self.webhook_path
            )));
        }
        if self.max_body_bytes == 0 {
            return Err(crate::Error::InvalidConfig(
                "max_body_bytes must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Mailgun webhook settings
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MailgunConfig {
    /// HTTP webhook signing key from the Mailgun dashboard
    pub signing_key: String,
}

impl std::fmt::Debug for MailgunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailgunConfig")
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

impl MailgunConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.signing_key.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "mailgun.signing_key is not set".into(),
            ));
        }
        Ok(())
    }
}

/// Slack incoming webhook settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub webhook_url: String,
    /// Title of every notification
    pub title: String,
    pub timeout_secs: u64,
    /// Pending deliveries buffered before new ones are refused
    pub queue_capacity: usize,
    /// Concurrent requests to Slack
    pub max_in_flight: usize,
    /// How long shutdown waits for queued deliveries
    pub drain_timeout_secs: u64,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            title: crate::DEFAULT_TITLE.to_string(),
            timeout_secs: 10,
            queue_capacity: 1024,
            max_in_flight: 4,
            drain_timeout_secs: 10,
        }
    }
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("webhook_url", &crate::utils::redact_url(&self.webhook_url))
            .field("title", &self.title)
            .field("timeout_secs", &self.timeout_secs)
            .field("queue_capacity", &self.queue_capacity)
            .field("max_in_flight", &self.max_in_flight)
            .field("drain_timeout_secs", &self.drain_timeout_secs)
            .finish()
    }
}

impl SlackConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.webhook_url.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "slack.webhook_url is not set".into(),
            ));
        }
        let url = url::Url::parse(&self.webhook_url)
            .map_err(|e| crate::Error::InvalidConfig(format!("slack.webhook_url: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(crate::Error::InvalidConfig(format!(
                "slack.webhook_url must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.queue_capacity == 0 {
            return Err(crate::Error::InvalidConfig(
                "slack.queue_capacity must be greater than zero".into(),
            ));
        }
        if self.max_in_flight == 0 {
            return Err(crate::Error::InvalidConfig(
                "slack.max_in_flight must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> crate::Result<()> {
        match self.format.as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(crate::Error::InvalidConfig(format!(
                "logging.format must be 'pretty' or 'json', got '{}'",
                other
            ))),
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == "json"
    }
}
