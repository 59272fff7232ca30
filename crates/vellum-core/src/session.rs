use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Archived,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    #[default]
    Pending,
    Proposed,
    Applied,
    Rejected,
}

impl std::fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnStatus::Pending => write!(f, "pending"),
            TurnStatus::Proposed => write!(f, "proposed"),
            TurnStatus::Applied => write!(f, "applied"),
            TurnStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for TurnStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TurnStatus::Pending),
            "proposed" => Ok(TurnStatus::Proposed),
            "applied" => Ok(TurnStatus::Applied),
            "rejected" => Ok(TurnStatus::Rejected),
            _ => Err(format!(
                "invalid turn status: {s}. Expected: pending, proposed, applied, rejected"
            )),
        }
    }
}

/// One step of a session. `index` equals the turn's position at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    #[serde(rename = "turn")]
    pub index: usize,
    #[serde(rename = "cats_path")]
    pub context_bundle_path: String,
    #[serde(rename = "dogs_path")]
    pub proposal_bundle_path: String,
    #[serde(default)]
    pub status: TurnStatus,
    #[serde(default)]
    pub checkpoint_id: Option<String>,
    pub created_at: String,
}

/// Session manifest, stored at `/sessions/{id}/session.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub goal: String,
    pub status: SessionStatus,
    pub start_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub turns: Vec<Turn>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn turn(&self, index: usize) -> Option<&Turn> {
        self.turns.iter().find(|t| t.index == index)
    }

    pub fn turn_mut(&mut self, index: usize) -> Option<&mut Turn> {
        self.turns.iter_mut().find(|t| t.index == index)
    }

    /// Index the next appended turn will receive.
    pub fn next_turn_index(&self) -> usize {
        self.turns.len()
    }

    /// Drop every turn whose index is greater than `index`.
    pub fn truncate_after(&mut self, index: usize) {
        self.turns.retain(|t| t.index <= index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(index: usize) -> Turn {
        Turn {
            index,
            context_bundle_path: format!("/sessions/s/turn-{index}.context.md"),
            proposal_bundle_path: format!("/sessions/s/turn-{index}.proposal.md"),
            status: TurnStatus::Pending,
            checkpoint_id: None,
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn manifest_wire_shape() {
        let s = Session {
            id: "ses_a".into(),
            goal: "refactor".into(),
            status: SessionStatus::Active,
            start_time: "2026-01-01T00:00:00Z".into(),
            end_time: None,
            turns: vec![turn(0)],
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["status"], "active");
        assert_eq!(v["startTime"], "2026-01-01T00:00:00Z");
        assert!(v.get("endTime").is_none());
        let t = &v["turns"][0];
        assert_eq!(t["turn"], 0);
        assert_eq!(t["cats_path"], "/sessions/s/turn-0.context.md");
        assert_eq!(t["dogs_path"], "/sessions/s/turn-0.proposal.md");
        assert!(t["checkpointId"].is_null());
        assert_eq!(t["createdAt"], "2026-01-01T00:00:00Z");
    }

    #[test]
    fn truncate_keeps_prefix() {
        let mut s = Session {
            id: "ses_a".into(),
            goal: "g".into(),
            status: SessionStatus::Active,
            start_time: String::new(),
            end_time: None,
            turns: (0..5).map(turn).collect(),
        };
        assert_eq!(s.next_turn_index(), 5);
        s.truncate_after(2);
        assert_eq!(s.turns.len(), 3);
        assert!(s.turn(2).is_some());
        assert!(s.turn(3).is_none());
        assert_eq!(s.next_turn_index(), 3);
    }
}
