//! Records read from Pivotal and Trello.

pub mod card;
pub mod story;

pub use card::{
    BoardList, BoardMember, BoardSummary, Card, CheckItem, Checklist, Label, LabelColor, NewCard,
    TrelloId,
};
pub use story::{ParseEnumError, Person, PersonId, Project, Story, StoryId, StoryKind, StoryState, Task};
