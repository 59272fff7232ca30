use crate::artifact::ArtifactMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub seed: String,
    #[serde(default)]
    pub cumulative: String,
    #[serde(default)]
    pub stack: Vec<String>,
}

/// The single structured application-state object. Persisted whole after
/// every mutation; unknown top-level keys are kept in `config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalState {
    #[serde(default)]
    pub total_cycles: u64,
    #[serde(default)]
    pub current_goal: Option<Goal>,
    #[serde(default)]
    pub artifact_metadata: BTreeMap<String, ArtifactMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(flatten)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl GlobalState {
    pub fn is_tracked(&self, path: &str) -> bool {
        self.artifact_metadata.contains_key(path)
    }

    /// Tracked paths under `prefix`, in lexical order.
    pub fn paths_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.artifact_metadata
            .keys()
            .filter(move |p| p.starts_with(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_minimal() {
        let s = GlobalState::default();
        assert_eq!(s.total_cycles, 0);
        assert!(s.current_goal.is_none());
        assert!(s.artifact_metadata.is_empty());
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["totalCycles"], 0);
        assert!(v["currentGoal"].is_null());
        assert!(v.get("apiKey").is_none());
    }

    #[test]
    fn unknown_keys_survive_round_trip() {
        let raw = r#"{
            "totalCycles": 4,
            "currentGoal": {"seed": "ship it", "cumulative": "ship it", "stack": ["a"]},
            "artifactMetadata": {"/docs/a.md": {"type": "markdown", "description": "a"}},
            "apiKey": "k",
            "theme": "dark"
        }"#;
        let s: GlobalState = serde_json::from_str(raw).unwrap();
        assert_eq!(s.total_cycles, 4);
        assert_eq!(s.current_goal.as_ref().unwrap().stack, vec!["a".to_string()]);
        assert!(s.is_tracked("/docs/a.md"));
        assert_eq!(s.config["theme"], "dark");

        let back = serde_json::to_value(&s).unwrap();
        assert_eq!(back["theme"], "dark");
        assert_eq!(back["apiKey"], "k");
    }

    #[test]
    fn prefix_filter() {
        let mut s = GlobalState::default();
        for p in ["/sessions/a/x.md", "/sessions/ab/y.md", "/docs/z.md"] {
            s.artifact_metadata
                .insert(p.to_string(), ArtifactMeta::new("markdown", ""));
        }
        let hits: Vec<_> = s.paths_with_prefix("/sessions/a/").collect();
        assert_eq!(hits, vec!["/sessions/a/x.md"]);
    }
}
