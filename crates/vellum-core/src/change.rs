use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Create,
    Modify,
    Delete,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Create => write!(f, "CREATE"),
            ChangeKind::Modify => write!(f, "MODIFY"),
            ChangeKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// A single parsed change. Produced by the bundle parser, consumed read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOp {
    #[serde(rename = "operation")]
    pub kind: ChangeKind,
    #[serde(rename = "file_path")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ChangeOp {
    pub fn create(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Create,
            path: path.into(),
            new_content: Some(content.into()),
            reason: None,
        }
    }

    pub fn modify(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Modify,
            path: path.into(),
            new_content: Some(content.into()),
            reason: None,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Delete,
            path: path.into(),
            new_content: None,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Content bytes for CREATE/MODIFY. A missing body is treated as empty.
    pub fn content_bytes(&self) -> &[u8] {
        self.new_content.as_deref().map(str::as_bytes).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_parser_output() {
        let raw = r#"[
            {"operation": "CREATE", "file_path": "/x.js", "new_content": "let x;", "reason": "new"},
            {"operation": "MODIFY", "file_path": "/y.js", "new_content": "let y;"},
            {"operation": "DELETE", "file_path": "/z.js"}
        ]"#;
        let ops: Vec<ChangeOp> = serde_json::from_str(raw).unwrap();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0], ChangeOp::create("/x.js", "let x;").with_reason("new"));
        assert_eq!(ops[1].kind, ChangeKind::Modify);
        assert_eq!(ops[2], ChangeOp::delete("/z.js"));
        assert!(ops[2].content_bytes().is_empty());
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let raw = r#"{"operation": "RENAME", "file_path": "/x.js"}"#;
        assert!(serde_json::from_str::<ChangeOp>(raw).is_err());
    }
}
