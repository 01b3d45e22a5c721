//! Escalation configuration from TOML (`[escalation]` section)
//!
//! ```toml
//! [escalation]
//! rate_limit = 5
//! rate_window_secs = 3600
//! notify_drain_secs = 10
//! tickets_path = "/var/lib/model-council/tickets.json"
//!
//! [[escalation.channels]]
//! kind = "chat_ops"
//! url = "https://hooks.example.com/council"
//!
//! [[escalation.channels]]
//! kind = "email"
//! outbox_dir = "/var/spool/council-outbox"
//! to = ["reviewers@example.com"]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use council_application::{ChannelKind, EscalationParams};
use council_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};

/// One `[[escalation.channels]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChannelConfig {
    pub kind: ChannelKind,
    /// Webhook URL (`chat_ops`)
    #[serde(default)]
    pub url: Option<String>,
    /// Directory handed to the external mailer (`email`)
    #[serde(default)]
    pub outbox_dir: Option<PathBuf>,
    /// Recipients (`email`)
    #[serde(default)]
    pub to: Vec<String>,
}

impl FileChannelConfig {
    fn issues(&self) -> Vec<ConfigIssue> {
        let missing = match self.kind {
            ChannelKind::ChatOps if self.url.as_deref().is_none_or(|u| u.trim().is_empty()) => {
                Some("url")
            }
            ChannelKind::Email if self.outbox_dir.is_none() => Some("outbox_dir"),
            _ => None,
        };
        missing
            .map(|field| {
                ConfigIssue::error(
                    ConfigIssueCode::MissingChannelTarget,
                    format!(
                        "escalation.channels: '{}' channel requires '{}'",
                        self.kind.as_str(),
                        field
                    ),
                )
            })
            .into_iter()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEscalationConfig {
    pub rate_limit: usize,
    pub rate_window_secs: u64,
    pub persist_attempts: u32,
    pub persist_backoff_ms: u64,
    pub max_text_chars: usize,
    /// Seconds to wait for in-flight notifications before exiting
    pub notify_drain_secs: u64,
    /// Ticket store file (unset: the platform data directory)
    pub tickets_path: Option<PathBuf>,
    /// Keep tickets in memory only
    pub in_memory: bool,
    pub channels: Vec<FileChannelConfig>,
}

impl Default for FileEscalationConfig {
    fn default() -> Self {
        let params = EscalationParams::default();
        Self {
            rate_limit: params.rate_limit,
            rate_window_secs: params.rate_window.as_secs(),
            persist_attempts: params.persist_attempts,
            persist_backoff_ms: params.persist_backoff.as_millis() as u64,
            max_text_chars: params.max_text_chars,
            notify_drain_secs: params.notify_drain_timeout.as_secs(),
            tickets_path: None,
            in_memory: false,
            channels: Vec::new(),
        }
    }
}

impl FileEscalationConfig {
    pub fn to_params(&self) -> (EscalationParams, Vec<ConfigIssue>) {
        let params = EscalationParams {
            rate_limit: self.rate_limit,
            rate_window: Duration::from_secs(self.rate_window_secs),
            persist_attempts: self.persist_attempts,
            persist_backoff: Duration::from_millis(self.persist_backoff_ms),
            max_text_chars: self.max_text_chars,
            notify_drain_timeout: Duration::from_secs(self.notify_drain_secs),
        };
        let mut issues: Vec<ConfigIssue> = match params.validate() {
            Ok(()) => Vec::new(),
            Err(e) => vec![ConfigIssue::error(
                ConfigIssueCode::InvalidThreshold,
                e.to_string(),
            )],
        };
        issues.extend(self.channels.iter().flat_map(FileChannelConfig::issues));
        (params, issues)
    }

    /// Where tickets are stored, `None` when kept in memory
    pub fn resolved_tickets_path(&self) -> Option<PathBuf> {
        if self.in_memory {
            return None;
        }
        self.tickets_path.clone().or_else(|| {
            dirs::data_dir().map(|d| d.join("model-council").join("tickets.json"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channels_deserialize() {
        let toml_str = r#"
rate_limit = 2
notify_drain_secs = 3

[[channels]]
kind = "chat_ops"
url = "https://hooks.example.com/x"

[[channels]]
kind = "log"
"#;
        let config: FileEscalationConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.rate_limit, 2);
        assert_eq!(config.to_params().0.notify_drain_timeout, Duration::from_secs(3));
        assert_eq!(config.channels[0].kind, ChannelKind::ChatOps);
        assert_eq!(config.channels[1].kind, ChannelKind::Log);
        assert!(config.to_params().1.is_empty());
    }

    #[test]
    fn test_channel_without_target() {
        let config = FileEscalationConfig {
            channels: vec![FileChannelConfig {
                kind: ChannelKind::Email,
                url: None,
                outbox_dir: None,
                to: Vec::new(),
            }],
            ..Default::default()
        };
        let (_, issues) = config.to_params();
        assert_eq!(issues[0].code, ConfigIssueCode::MissingChannelTarget);
    }

    #[test]
    fn test_in_memory_has_no_path() {
        let config = FileEscalationConfig {
            in_memory: true,
            tickets_path: Some(PathBuf::from("x.json")),
            ..Default::default()
        };
        assert!(config.resolved_tickets_path().is_none());
    }
}
