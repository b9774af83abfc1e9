use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::story::ParseEnumError;

/// Trello object id (boards, lists, cards, labels, members, checklists).
pub type TrelloId = String;

/// The label colors Trello offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelColor {
    Yellow,
    Purple,
    Blue,
    Red,
    Green,
    Orange,
    Black,
    Sky,
    Pink,
    Lime,
}

impl LabelColor {
    pub const ALL: [Self; 10] = [
        Self::Yellow,
        Self::Purple,
        Self::Blue,
        Self::Red,
        Self::Green,
        Self::Orange,
        Self::Black,
        Self::Sky,
        Self::Pink,
        Self::Lime,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yellow => "yellow",
            Self::Purple => "purple",
            Self::Blue => "blue",
            Self::Red => "red",
            Self::Green => "green",
            Self::Orange => "orange",
            Self::Black => "black",
            Self::Sky => "sky",
            Self::Pink => "pink",
            Self::Lime => "lime",
        }
    }
}

impl fmt::Display for LabelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabelColor {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|color| color.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError::new("label color", s))
    }
}

/// A board label. Trello allows colorless labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: TrelloId,
    pub name: String,
    pub color: Option<LabelColor>,
}

impl Label {
    #[must_use]
    pub fn matches(&self, name: &str, color: Option<LabelColor>) -> bool {
        self.name == name && self.color == color
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckItem {
    pub id: TrelloId,
    pub name: String,
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    pub id: TrelloId,
    pub name: String,
    #[serde(default)]
    pub items: Vec<CheckItem>,
}

impl Checklist {
    #[must_use]
    pub fn has_item(&self, name: &str) -> bool {
        self.items.iter().any(|item| item.name == name)
    }
}

/// A Trello card as last seen by this run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: TrelloId,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    pub list_id: TrelloId,
    pub pos: f64,
    #[serde(default)]
    pub label_ids: Vec<TrelloId>,
    #[serde(default)]
    pub member_ids: Vec<TrelloId>,
    #[serde(default)]
    pub checklists: Vec<Checklist>,
    #[serde(default)]
    pub comments: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Card {
    #[must_use]
    pub fn checklist(&self, name: &str) -> Option<&Checklist> {
        self.checklists.iter().find(|checklist| checklist.name == name)
    }

    pub fn checklist_mut(&mut self, name: &str) -> Option<&mut Checklist> {
        self.checklists
            .iter_mut()
            .find(|checklist| checklist.name == name)
    }

    /// Whether some existing comment equals `text` once both are trimmed.
    #[must_use]
    pub fn has_comment(&self, text: &str) -> bool {
        let text = text.trim();
        self.comments.iter().any(|existing| existing.trim() == text)
    }
}

/// Parameters for a card that does not exist yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCard {
    pub name: String,
    pub desc: String,
    pub list_id: TrelloId,
    pub pos: f64,
}

/// A list (column) on a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardList {
    pub id: TrelloId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardMember {
    pub id: TrelloId,
    pub full_name: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSummary {
    pub id: TrelloId,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_match_ignores_surrounding_whitespace() {
        let card = Card {
            id: "c1".into(),
            name: "A".into(),
            desc: String::new(),
            list_id: "l1".into(),
            pos: 1.0,
            label_ids: Vec::new(),
            member_ids: Vec::new(),
            checklists: Vec::new(),
            comments: vec!["  looks good\n".into()],
            url: None,
        };
        assert!(card.has_comment("looks good"));
        assert!(card.has_comment(" looks good "));
        assert!(!card.has_comment("looks bad"));
    }

    #[test]
    fn label_color_parses_case_insensitively() {
        assert_eq!("Sky".parse::<LabelColor>(), Ok(LabelColor::Sky));
        assert!("magenta".parse::<LabelColor>().is_err());
    }

    #[test]
    fn label_match_requires_name_and_color() {
        let label = Label {
            id: "lb1".into(),
            name: "bug".into(),
            color: Some(LabelColor::Red),
        };
        assert!(label.matches("bug", Some(LabelColor::Red)));
        assert!(!label.matches("bug", Some(LabelColor::Green)));
        assert!(!label.matches("bug", None));
    }
}
