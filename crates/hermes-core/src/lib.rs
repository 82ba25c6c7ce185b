pub mod config;
pub mod error;

pub use config::HermesConfig;
pub use error::{Error, Result};

/// Emoji/label pair per node status, used by the `Subproblems` and
/// `ProblemPathHierarchy` sections and by the post-turn status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NodeStatus {
    NotStarted,
    Pending,
    InProgress,
    Finished,
    Failed,
    Cancelled,
}

impl NodeStatus {
    pub fn emoji(&self) -> &'static str {
        match self {
            NodeStatus::NotStarted => "⚪",
            NodeStatus::Pending => "🟡",
            NodeStatus::InProgress => "🔵",
            NodeStatus::Finished => "🟢",
            NodeStatus::Failed => "🔴",
            NodeStatus::Cancelled => "⚫",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeStatus::NotStarted => "not started",
            NodeStatus::Pending => "pending",
            NodeStatus::InProgress => "in progress",
            NodeStatus::Finished => "finished",
            NodeStatus::Failed => "failed",
            NodeStatus::Cancelled => "cancelled",
        }
    }
}

/// The sentinel that forces the engine loop to terminate immediately,
/// regardless of scheduler state, wherever it appears in an LLM response.
pub const SHUTDOWN_SENTINEL: &str = "SHUT_DOWN_DEEP_RESEARCHER";

/// Truncates `content` to `max_len` characters, appending a marker with the
/// omitted character count and percentage when truncation occurs.
pub fn truncate_with_marker(content: &str, max_len: Option<usize>) -> String {
    let Some(max_len) = max_len else { return content.to_string() };
    let total = content.chars().count();
    if total <= max_len {
        return content.to_string();
    }
    let omitted = total - max_len;
    let percent = (omitted as f64 / total as f64 * 100.0).round() as u64;
    let head: String = content.chars().take(max_len).collect();
    format!("{head}[...{omitted} characters omitted ({percent}%)]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_under_limit_is_unchanged() {
        assert_eq!(truncate_with_marker("hello", Some(10)), "hello");
    }

    #[test]
    fn truncate_over_limit_appends_marker() {
        let s = "a".repeat(100);
        let out = truncate_with_marker(&s, Some(10));
        assert!(out.starts_with(&"a".repeat(10)));
        assert!(out.contains("characters omitted"));
    }

    #[test]
    fn truncate_with_no_limit_is_unchanged() {
        let s = "a".repeat(1000);
        assert_eq!(truncate_with_marker(&s, None), s);
    }
}
