//! Council membership from TOML (`[council]` section)
//!
//! ```toml
//! [council]
//! moderator = "claude"
//! share_peer_answers = false
//! request_timeout_secs = 300
//! max_query_chars = 32000
//!
//! [[council.members]]
//! id = "claude"
//! backend = "anthropic"
//! weight = 1.5
//!
//! [[council.members]]
//! id = "gpt"
//! backend = "openai"
//! ```

use std::collections::HashSet;

use council_domain::{ConfigIssue, ConfigIssueCode, CouncilMember, DEFAULT_MAX_QUESTION_CHARS};
use serde::{Deserialize, Serialize};

/// One `[[council.members]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMemberConfig {
    pub id: String,
    /// Name of a `[providers.<name>]` entry
    pub backend: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_weight() -> f64 {
    1.0
}

fn default_enabled() -> bool {
    true
}

impl FileMemberConfig {
    pub fn to_member(&self) -> CouncilMember {
        let member = CouncilMember::new(self.id.trim(), self.backend.trim()).with_weight(self.weight);
        if self.enabled { member } else { member.disabled() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCouncilConfig {
    pub members: Vec<FileMemberConfig>,
    /// Member composing the answer under the `moderator` strategy
    pub moderator: Option<String>,
    /// Show peers' previous answers in negotiation prompts
    pub share_peer_answers: bool,
    /// Overall budget of one request across all rounds
    pub request_timeout_secs: u64,
    /// Longest accepted question, in characters
    pub max_query_chars: usize,
}

impl Default for FileCouncilConfig {
    fn default() -> Self {
        Self {
            members: Vec::new(),
            moderator: None,
            share_peer_answers: false,
            request_timeout_secs: 300,
            max_query_chars: DEFAULT_MAX_QUESTION_CHARS,
        }
    }
}

impl FileCouncilConfig {
    /// Members in configuration order, with the issues found on the way.
    ///
    /// Invalid or duplicated entries are reported and skipped.
    pub fn parse_members(&self) -> (Vec<CouncilMember>, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();
        let mut members = Vec::new();

        for entry in &self.members {
            let member = entry.to_member();
            if let Err(e) = member.validate() {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::InvalidMember,
                    format!("council.members: {}", e),
                ));
                continue;
            }
            if !seen.insert(member.id.clone()) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::DuplicateMember,
                    format!("council.members: duplicate member id '{}'", member.id),
                ));
                continue;
            }
            members.push(member);
        }

        if !members.iter().any(|m| m.enabled) {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::NoMembers,
                "council.members: at least one enabled member is required",
            ));
        }
        if self.request_timeout_secs == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidDuration,
                "council.request_timeout_secs must be positive",
            ));
        }
        if self.max_query_chars == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidThreshold,
                "council.max_query_chars must be at least 1",
            ));
        }

        (members, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, backend: &str) -> FileMemberConfig {
        FileMemberConfig {
            id: id.to_string(),
            backend: backend.to_string(),
            weight: 1.0,
            enabled: true,
        }
    }

    #[test]
    fn test_parse_members_reports_duplicates_and_invalid() {
        let config = FileCouncilConfig {
            members: vec![
                entry("a", "openai"),
                entry("a", "local"),
                entry("", "openai"),
                FileMemberConfig {
                    weight: -1.0,
                    ..entry("b", "openai")
                },
            ],
            ..Default::default()
        };

        let (members, issues) = config.parse_members();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].backend, "openai");
        let codes: Vec<_> = issues.iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![
                ConfigIssueCode::DuplicateMember,
                ConfigIssueCode::InvalidMember,
                ConfigIssueCode::InvalidMember,
            ]
        );
    }

    #[test]
    fn test_empty_council_is_an_error() {
        let (members, issues) = FileCouncilConfig::default().parse_members();
        assert!(members.is_empty());
        assert_eq!(issues[0].code, ConfigIssueCode::NoMembers);
        assert!(issues[0].is_error());
    }

    #[test]
    fn test_member_defaults() {
        let toml_str = r#"
[[members]]
id = "gpt"
backend = "openai"
"#;
        let config: FileCouncilConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.members[0].weight, 1.0);
        assert!(config.members[0].enabled);
        assert_eq!(config.request_timeout_secs, 300);
        assert_eq!(config.max_query_chars, DEFAULT_MAX_QUESTION_CHARS);
    }

    #[test]
    fn test_zero_query_limit_is_an_error() {
        let config = FileCouncilConfig {
            members: vec![entry("a", "openai")],
            max_query_chars: 0,
            ..Default::default()
        };
        let (_, issues) = config.parse_members();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ConfigIssueCode::InvalidThreshold);
    }
}
