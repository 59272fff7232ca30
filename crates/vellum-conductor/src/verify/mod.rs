pub mod shell;

pub use shell::ShellVerifier;

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

/// Result of running one verification command.
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub passed: bool,
    pub detail: Option<String>,
    pub duration: Duration,
}

impl VerifyOutcome {
    pub fn passed(duration: Duration) -> Self {
        Self {
            passed: true,
            detail: None,
            duration,
        }
    }

    pub fn failed(detail: String, duration: Duration) -> Self {
        Self {
            passed: false,
            detail: Some(detail),
            duration,
        }
    }

    pub fn timed_out(command: &str, timeout: Duration) -> Self {
        Self::failed(
            format!("command timed out after {}s: {command}", timeout.as_secs()),
            timeout,
        )
    }
}

/// Runs a verification command against the workspace after a changeset has
/// been applied. Anything other than `passed == true` triggers rollback.
#[async_trait::async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, command: &str, timeout: Duration) -> VerifyOutcome;
}

/// Credential shapes hidden from verifier output, with their replacements.
const SECRET_SHAPES: &[(&str, &str)] = &[
    (r"\b(?:sk|pk)-[a-zA-Z0-9_\-]{20,}", "[MASKED]"),
    (r"\b(?:ghp|gho|ghs|ghu)_[a-zA-Z0-9]{36,}", "[MASKED]"),
    (r"\bAKIA[A-Z0-9]{16}\b", "[MASKED]"),
    (r"(?i)\b(bearer)\s+[a-zA-Z0-9._\-]+", "$1 [MASKED]"),
    (
        r"(?i)\b(password|passwd|secret|token|key|api_key|apikey)=[^\s&]+",
        "$1=[MASKED]",
    ),
];

static SECRET_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    SECRET_SHAPES
        .iter()
        .filter_map(|(shape, with)| Regex::new(shape).ok().map(|re| (re, *with)))
        .collect()
});

/// Hide credentials in verifier output before it lands in an outcome, a log
/// line or the audit trail.
pub fn mask_secrets(text: &str) -> String {
    SECRET_PATTERNS
        .iter()
        .fold(text.to_string(), |acc, (re, with)| {
            re.replace_all(&acc, *with).into_owned()
        })
}
