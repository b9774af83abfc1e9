//! The two remote systems, reduced to the calls the engine makes.
//!
//! Implementations return [`RemoteError`] with an accurate
//! [`RemoteErrorKind`](crate::error::RemoteErrorKind); the retry executor
//! decides what to do with it.

use crate::error::RemoteError;
use crate::model::{
    BoardList, BoardMember, BoardSummary, Card, CheckItem, Checklist, Label, LabelColor, NewCard,
    Person, Project, Story,
};

/// Read-only access to Pivotal Tracker.
pub trait SourceTracker {
    fn projects(&mut self) -> Result<Vec<Project>, RemoteError>;

    /// Every story in the project, with ordering links and sub-resources.
    fn stories(&mut self, project_id: u64) -> Result<Vec<Story>, RemoteError>;

    /// People with a membership in the project.
    fn people(&mut self, project_id: u64) -> Result<Vec<Person>, RemoteError>;
}

/// Read/write access to Trello.
pub trait DestinationBoard {
    fn boards(&mut self) -> Result<Vec<BoardSummary>, RemoteError>;

    /// Open lists on the board.
    fn lists(&mut self, board_id: &str) -> Result<Vec<BoardList>, RemoteError>;

    fn members(&mut self, board_id: &str) -> Result<Vec<BoardMember>, RemoteError>;

    fn labels(&mut self, board_id: &str) -> Result<Vec<Label>, RemoteError>;

    /// Open cards in a list, with checklists and comments.
    fn cards(&mut self, list_id: &str) -> Result<Vec<Card>, RemoteError>;

    fn create_card(&mut self, card: &NewCard) -> Result<Card, RemoteError>;

    fn move_card(&mut self, card_id: &str, list_id: &str) -> Result<(), RemoteError>;

    fn set_position(&mut self, card_id: &str, pos: f64) -> Result<(), RemoteError>;

    fn create_label(
        &mut self,
        board_id: &str,
        name: &str,
        color: Option<LabelColor>,
    ) -> Result<Label, RemoteError>;

    fn add_label(&mut self, card_id: &str, label_id: &str) -> Result<(), RemoteError>;

    fn remove_label(&mut self, card_id: &str, label_id: &str) -> Result<(), RemoteError>;

    fn add_member(&mut self, card_id: &str, member_id: &str) -> Result<(), RemoteError>;

    fn remove_member(&mut self, card_id: &str, member_id: &str) -> Result<(), RemoteError>;

    fn create_checklist(&mut self, card_id: &str, name: &str) -> Result<Checklist, RemoteError>;

    fn add_check_item(
        &mut self,
        checklist_id: &str,
        name: &str,
        complete: bool,
    ) -> Result<CheckItem, RemoteError>;

    fn add_comment(&mut self, card_id: &str, text: &str) -> Result<(), RemoteError>;

    fn delete_card(&mut self, card_id: &str) -> Result<(), RemoteError>;

    fn archive_all_cards(&mut self, list_id: &str) -> Result<(), RemoteError>;

    fn close_list(&mut self, list_id: &str) -> Result<(), RemoteError>;
}
