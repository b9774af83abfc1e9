//! Operator-chosen routing of stories to lists and of labels to colors.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{LabelColor, Story, StoryKind, StoryState, TrelloId};

/// Which list each story lands in.
///
/// Stories in the `unstarted` state (the Pivotal backlog) are routed by
/// kind; every other state is routed by state. A missing entry means "do
/// not import".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListMapping {
    by_state: BTreeMap<StoryState, TrelloId>,
    by_kind: BTreeMap<StoryKind, TrelloId>,
}

impl ListMapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `state` to `list_id`, or stop importing it when `None`.
    pub fn set_state(&mut self, state: StoryState, list_id: Option<TrelloId>) {
        match list_id {
            Some(id) => {
                self.by_state.insert(state, id);
            }
            None => {
                self.by_state.remove(&state);
            }
        }
    }

    /// Route unstarted stories of `kind` to `list_id`, or stop importing them.
    pub fn set_kind(&mut self, kind: StoryKind, list_id: Option<TrelloId>) {
        match list_id {
            Some(id) => {
                self.by_kind.insert(kind, id);
            }
            None => {
                self.by_kind.remove(&kind);
            }
        }
    }

    #[must_use]
    pub fn for_state(&self, state: StoryState) -> Option<&str> {
        self.by_state.get(&state).map(String::as_str)
    }

    #[must_use]
    pub fn for_kind(&self, kind: StoryKind) -> Option<&str> {
        self.by_kind.get(&kind).map(String::as_str)
    }

    /// The list a story belongs in, if any.
    #[must_use]
    pub fn resolve(&self, story: &Story) -> Option<&str> {
        if story.state == StoryState::Unstarted {
            self.for_kind(story.kind)
        } else {
            self.for_state(story.state)
        }
    }
}

/// Label colors. `None` everywhere means "do not create this label".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelColors {
    kinds: BTreeMap<StoryKind, LabelColor>,
    pub tracker_labels: Option<LabelColor>,
    pub estimate: Option<LabelColor>,
}

impl LabelColors {
    pub fn set_kind(&mut self, kind: StoryKind, color: Option<LabelColor>) {
        match color {
            Some(color) => {
                self.kinds.insert(kind, color);
            }
            None => {
                self.kinds.remove(&kind);
            }
        }
    }

    #[must_use]
    pub fn for_kind(&self, kind: StoryKind) -> Option<LabelColor> {
        self.kinds.get(&kind).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> ListMapping {
        let mut lists = ListMapping::new();
        lists.set_state(StoryState::Started, Some("current".into()));
        lists.set_state(StoryState::Accepted, Some("done".into()));
        lists.set_kind(StoryKind::Bug, Some("bugs".into()));
        lists.set_kind(StoryKind::Feature, Some("features".into()));
        lists
    }

    #[test]
    fn non_backlog_states_route_by_state() {
        let story = Story::new(1, "x", StoryKind::Bug, StoryState::Started);
        assert_eq!(mapping().resolve(&story), Some("current"));
    }

    #[test]
    fn backlog_routes_by_kind() {
        let bug = Story::new(1, "x", StoryKind::Bug, StoryState::Unstarted);
        let feature = Story::new(2, "y", StoryKind::Feature, StoryState::Unstarted);
        assert_eq!(mapping().resolve(&bug), Some("bugs"));
        assert_eq!(mapping().resolve(&feature), Some("features"));
    }

    #[test]
    fn unmapped_story_resolves_to_none() {
        let chore = Story::new(1, "x", StoryKind::Chore, StoryState::Unstarted);
        let rejected = Story::new(2, "y", StoryKind::Bug, StoryState::Rejected);
        let unknown = Story::new(3, "z", StoryKind::Bug, StoryState::Unknown);
        let lists = mapping();
        assert_eq!(lists.resolve(&chore), None);
        assert_eq!(lists.resolve(&rejected), None);
        assert_eq!(lists.resolve(&unknown), None);
    }

    #[test]
    fn clearing_an_entry_stops_import() {
        let mut lists = mapping();
        lists.set_state(StoryState::Started, None);
        let story = Story::new(1, "x", StoryKind::Bug, StoryState::Started);
        assert_eq!(lists.resolve(&story), None);
    }

    #[test]
    fn label_colors_default_to_none() {
        let mut colors = LabelColors::default();
        assert_eq!(colors.for_kind(StoryKind::Bug), None);
        colors.set_kind(StoryKind::Bug, Some(LabelColor::Red));
        assert_eq!(colors.for_kind(StoryKind::Bug), Some(LabelColor::Red));
    }
}
