//! Structured configuration issues.
//!
//! Loaders collect every problem they find instead of stopping at the first
//! one; the binary aborts on any [`Severity::Error`] and logs warnings.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// No enabled council member.
    NoMembers,
    /// Two members share an id.
    DuplicateMember,
    /// A member's id, backend or weight is unusable.
    InvalidMember,
    /// A member names a backend with no `[providers.<name>]` entry.
    UnknownProvider,
    /// Fewer enabled members than `min_responses`: consensus is unreachable.
    TooFewMembers,
    /// A threshold or count is out of range.
    InvalidThreshold,
    /// Strategy name is not recognised.
    UnknownStrategy,
    /// `moderator` strategy without a usable moderator member.
    MissingModerator,
    /// Per-call timeout exceeds the round deadline.
    TimeoutExceedsDeadline,
    /// A zero duration where a positive one is required.
    InvalidDuration,
    /// A notification channel lacks its target (url or directory).
    MissingChannelTarget,
    /// A provider's api key environment variable is unset.
    MissingApiKey,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", level, self.message)
    }
}
