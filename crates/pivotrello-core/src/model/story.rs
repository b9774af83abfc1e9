use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Pivotal story id.
pub type StoryId = u64;

/// Pivotal person id (story owners, project members).
pub type PersonId = u64;

/// Pivotal story type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryKind {
    Feature,
    Chore,
    Bug,
    Release,
}

impl StoryKind {
    pub const ALL: [Self; 4] = [Self::Feature, Self::Chore, Self::Bug, Self::Release];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Chore => "chore",
            Self::Bug => "bug",
            Self::Release => "release",
        }
    }
}

impl fmt::Display for StoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoryKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError::new("story kind", s))
    }
}

/// Pivotal `current_state`.
///
/// States this tool has no mapping for decode as [`StoryState::Unknown`]
/// and are skipped during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryState {
    Unscheduled,
    Unstarted,
    Planned,
    Started,
    Finished,
    Delivered,
    Accepted,
    Rejected,
    #[serde(other)]
    Unknown,
}

impl StoryState {
    /// States that are routed by the state-keyed list table.
    pub const MAPPED: [Self; 6] = [
        Self::Unscheduled,
        Self::Started,
        Self::Finished,
        Self::Delivered,
        Self::Accepted,
        Self::Rejected,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unscheduled => "unscheduled",
            Self::Unstarted => "unstarted",
            Self::Planned => "planned",
            Self::Started => "started",
            Self::Finished => "finished",
            Self::Delivered => "delivered",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        }
    }

    /// The board column name Pivotal users know this state by.
    #[must_use]
    pub const fn panel_name(self) -> &'static str {
        match self {
            Self::Unscheduled => "icebox",
            Self::Started => "current",
            Self::Unstarted | Self::Planned => "backlog",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for StoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoryState {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        let state = match value.as_str() {
            "unscheduled" | "icebox" => Self::Unscheduled,
            "unstarted" => Self::Unstarted,
            "planned" => Self::Planned,
            "started" | "current" => Self::Started,
            "finished" => Self::Finished,
            "delivered" => Self::Delivered,
            "accepted" => Self::Accepted,
            "rejected" => Self::Rejected,
            _ => return Err(ParseEnumError::new("story state", s)),
        };
        Ok(state)
    }
}

/// A story task; becomes a checklist item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub description: String,
    #[serde(default)]
    pub complete: bool,
}

/// One Pivotal story, read-only for the whole run.
///
/// `before_id` names the story displayed directly after this one and
/// `after_id` the story displayed directly before it, following Pivotal's
/// field naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub id: StoryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: StoryKind,
    pub state: StoryState,
    #[serde(default)]
    pub estimate: Option<i64>,
    #[serde(default)]
    pub owner_ids: Vec<PersonId>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub comments: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub before_id: Option<StoryId>,
    #[serde(default)]
    pub after_id: Option<StoryId>,
}

impl Story {
    /// Minimal story with no sub-resources and no ordering links.
    pub fn new(id: StoryId, name: impl Into<String>, kind: StoryKind, state: StoryState) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            kind,
            state,
            estimate: None,
            owner_ids: Vec::new(),
            labels: Vec::new(),
            comments: Vec::new(),
            tasks: Vec::new(),
            before_id: None,
            after_id: None,
        }
    }
}

/// Pivotal project summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
}

/// Pivotal person, as listed in project memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Unrecognized enum spelling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what} '{value}'")]
pub struct ParseEnumError {
    pub what: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in StoryKind::ALL {
            assert_eq!(kind.as_str().parse::<StoryKind>(), Ok(kind));
        }
        assert!("epic".parse::<StoryKind>().is_err());
    }

    #[test]
    fn state_accepts_panel_aliases() {
        assert_eq!("icebox".parse::<StoryState>(), Ok(StoryState::Unscheduled));
        assert_eq!("Current".parse::<StoryState>(), Ok(StoryState::Started));
        assert!("unknown".parse::<StoryState>().is_err());
    }

    #[test]
    fn unrecognized_state_deserializes_as_unknown() {
        let state: StoryState = serde_json::from_str("\"someday\"").expect("decode");
        assert_eq!(state, StoryState::Unknown);
    }

    #[test]
    fn story_defaults_optional_fields() {
        let json = r#"{"id":7,"name":"Fix login","kind":"bug","state":"started"}"#;
        let story: Story = serde_json::from_str(json).expect("decode");
        assert_eq!(story.estimate, None);
        assert!(story.owner_ids.is_empty());
        assert!(story.tasks.is_empty());
        assert_eq!(story.before_id, None);
    }
}
