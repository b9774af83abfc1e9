//! In-memory [`DestinationBoard`].
//!
//! Every write is appended to a mutation log. Failures can be queued with
//! [`MemoryBoard::fail_next`] to exercise the retry path. `import --dry-run`
//! snapshots the real board into one of these and reconciles against it.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;

use crate::cache::BoardCache;
use crate::error::{RemoteError, RemoteErrorKind, SyncError};
use crate::model::{
    BoardList, BoardMember, BoardSummary, Card, CheckItem, Checklist, Label, LabelColor, NewCard,
    TrelloId,
};
use crate::remote::DestinationBoard;
use crate::retry::RetryExecutor;

/// One remote write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    CreateCard {
        card_id: TrelloId,
        list_id: TrelloId,
        name: String,
        pos: f64,
    },
    MoveCard {
        card_id: TrelloId,
        list_id: TrelloId,
    },
    SetPosition {
        card_id: TrelloId,
        pos: f64,
    },
    CreateLabel {
        label_id: TrelloId,
        name: String,
        color: Option<LabelColor>,
    },
    AddLabel {
        card_id: TrelloId,
        label_id: TrelloId,
    },
    RemoveLabel {
        card_id: TrelloId,
        label_id: TrelloId,
    },
    AddMember {
        card_id: TrelloId,
        member_id: TrelloId,
    },
    RemoveMember {
        card_id: TrelloId,
        member_id: TrelloId,
    },
    CreateChecklist {
        card_id: TrelloId,
        checklist_id: TrelloId,
        name: String,
    },
    AddCheckItem {
        checklist_id: TrelloId,
        name: String,
        complete: bool,
    },
    AddComment {
        card_id: TrelloId,
        text: String,
    },
    DeleteCard {
        card_id: TrelloId,
    },
    ArchiveAllCards {
        list_id: TrelloId,
    },
    CloseList {
        list_id: TrelloId,
    },
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateCard {
                list_id, name, pos, ..
            } => write!(f, "create card {name:?} in list {list_id} at {pos}"),
            Self::MoveCard { card_id, list_id } => write!(f, "move card {card_id} to list {list_id}"),
            Self::SetPosition { card_id, pos } => write!(f, "set card {card_id} position to {pos}"),
            Self::CreateLabel { name, color, .. } => match color {
                Some(color) => write!(f, "create label {name:?} ({color})"),
                None => write!(f, "create label {name:?}"),
            },
            Self::AddLabel { card_id, label_id } => write!(f, "add label {label_id} to card {card_id}"),
            Self::RemoveLabel { card_id, label_id } => {
                write!(f, "remove label {label_id} from card {card_id}")
            }
            Self::AddMember { card_id, member_id } => {
                write!(f, "add member {member_id} to card {card_id}")
            }
            Self::RemoveMember { card_id, member_id } => {
                write!(f, "remove member {member_id} from card {card_id}")
            }
            Self::CreateChecklist { card_id, name, .. } => {
                write!(f, "create checklist {name:?} on card {card_id}")
            }
            Self::AddCheckItem {
                checklist_id,
                name,
                complete,
            } => {
                let mark = if *complete { "x" } else { " " };
                write!(f, "add [{mark}] {name:?} to checklist {checklist_id}")
            }
            Self::AddComment { card_id, text } => write!(f, "comment on card {card_id}: {text:?}"),
            Self::DeleteCard { card_id } => write!(f, "delete card {card_id}"),
            Self::ArchiveAllCards { list_id } => write!(f, "archive all cards in list {list_id}"),
            Self::CloseList { list_id } => write!(f, "close list {list_id}"),
        }
    }
}

#[derive(Debug, Clone)]
struct ListEntry {
    board_id: TrelloId,
    list: BoardList,
    closed: bool,
}

/// A Trello stand-in that keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBoard {
    boards: Vec<BoardSummary>,
    lists: Vec<ListEntry>,
    cards: Vec<Card>,
    labels: Vec<(TrelloId, Label)>,
    members: Vec<BoardMember>,
    mutations: Vec<Mutation>,
    failures: VecDeque<RemoteErrorKind>,
    calls: usize,
    next_id: u64,
}

impl MemoryBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the current state of `source` (lists, cards, labels, members).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Remote`] when a read against `source` fails.
    pub fn snapshot<D>(source: &mut D, retry: &RetryExecutor, board_id: &str) -> Result<Self, SyncError>
    where
        D: DestinationBoard + ?Sized,
    {
        let cache = BoardCache::load(source, retry, board_id)?;
        let members = retry.execute("fetch members", || source.members(board_id))?;

        let mut board = Self::new();
        board.insert_board(board_id, board_id);
        for list in cache.lists() {
            board.insert_list(board_id, &list.id, &list.name);
        }
        for label in cache.labels() {
            board.labels.push((board_id.to_string(), label.clone()));
        }
        board.cards = cache.existing_cards().to_vec();
        board.members = members;
        Ok(board)
    }

    pub fn insert_board(&mut self, id: &str, name: &str) -> &mut Self {
        self.boards.push(BoardSummary {
            id: id.to_string(),
            name: name.to_string(),
            url: None,
        });
        self
    }

    pub fn insert_list(&mut self, board_id: &str, id: &str, name: &str) -> &mut Self {
        self.lists.push(ListEntry {
            board_id: board_id.to_string(),
            list: BoardList {
                id: id.to_string(),
                name: name.to_string(),
            },
            closed: false,
        });
        self
    }

    pub fn insert_member(&mut self, id: &str, full_name: &str, username: &str) -> &mut Self {
        self.members.push(BoardMember {
            id: id.to_string(),
            full_name: full_name.to_string(),
            username: username.to_string(),
        });
        self
    }

    pub fn insert_label(&mut self, board_id: &str, label: Label) -> &mut Self {
        self.labels.push((board_id.to_string(), label));
        self
    }

    /// Place a card directly, without logging a mutation.
    pub fn insert_card(&mut self, card: Card) -> &mut Self {
        self.cards.push(card);
        self
    }

    /// Make the next `count` calls fail with `kind`.
    pub fn fail_next(&mut self, count: usize, kind: RemoteErrorKind) -> &mut Self {
        self.failures.extend(std::iter::repeat_n(kind, count));
        self
    }

    #[must_use]
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn clear_mutations(&mut self) {
        self.mutations.clear();
    }

    /// Calls made so far, failed ones included.
    #[must_use]
    pub const fn calls(&self) -> usize {
        self.calls
    }

    #[must_use]
    pub fn all_cards(&self) -> &[Card] {
        &self.cards
    }

    #[must_use]
    pub fn card(&self, card_id: &str) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == card_id)
    }

    #[must_use]
    pub fn card_named(&self, name: &str) -> Option<&Card> {
        self.cards.iter().find(|card| card.name == name)
    }

    #[must_use]
    pub fn is_list_closed(&self, list_id: &str) -> bool {
        self.lists
            .iter()
            .any(|entry| entry.list.id == list_id && entry.closed)
    }

    fn enter(&mut self) -> Result<(), RemoteError> {
        self.calls += 1;
        match self.failures.pop_front() {
            Some(kind) => Err(RemoteError::new(kind, format!("injected failure on call {}", self.calls))),
            None => Ok(()),
        }
    }

    fn fresh_id(&mut self, prefix: &str) -> TrelloId {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn card_mut(&mut self, card_id: &str) -> Result<&mut Card, RemoteError> {
        self.cards
            .iter_mut()
            .find(|card| card.id == card_id)
            .ok_or_else(|| not_found("card", card_id))
    }

    fn open_list_exists(&self, list_id: &str) -> bool {
        self.lists
            .iter()
            .any(|entry| entry.list.id == list_id && !entry.closed)
    }
}

fn not_found(what: &str, id: &str) -> RemoteError {
    RemoteError::new(RemoteErrorKind::NotFound, format!("{what} {id} not found"))
}

impl DestinationBoard for MemoryBoard {
    fn boards(&mut self) -> Result<Vec<BoardSummary>, RemoteError> {
        self.enter()?;
        Ok(self.boards.clone())
    }

    fn lists(&mut self, board_id: &str) -> Result<Vec<BoardList>, RemoteError> {
        self.enter()?;
        Ok(self
            .lists
            .iter()
            .filter(|entry| entry.board_id == board_id && !entry.closed)
            .map(|entry| entry.list.clone())
            .collect())
    }

    fn members(&mut self, _board_id: &str) -> Result<Vec<BoardMember>, RemoteError> {
        self.enter()?;
        Ok(self.members.clone())
    }

    fn labels(&mut self, board_id: &str) -> Result<Vec<Label>, RemoteError> {
        self.enter()?;
        Ok(self
            .labels
            .iter()
            .filter(|(board, _)| board == board_id)
            .map(|(_, label)| label.clone())
            .collect())
    }

    fn cards(&mut self, list_id: &str) -> Result<Vec<Card>, RemoteError> {
        self.enter()?;
        let mut cards: Vec<Card> = self
            .cards
            .iter()
            .filter(|card| card.list_id == list_id)
            .cloned()
            .collect();
        cards.sort_by(|a, b| a.pos.total_cmp(&b.pos));
        Ok(cards)
    }

    fn create_card(&mut self, card: &NewCard) -> Result<Card, RemoteError> {
        self.enter()?;
        if !self.open_list_exists(&card.list_id) {
            return Err(not_found("list", &card.list_id));
        }
        let created = Card {
            id: self.fresh_id("card"),
            name: card.name.clone(),
            desc: card.desc.clone(),
            list_id: card.list_id.clone(),
            pos: card.pos,
            label_ids: Vec::new(),
            member_ids: Vec::new(),
            checklists: Vec::new(),
            comments: Vec::new(),
            url: None,
        };
        self.mutations.push(Mutation::CreateCard {
            card_id: created.id.clone(),
            list_id: created.list_id.clone(),
            name: created.name.clone(),
            pos: created.pos,
        });
        self.cards.push(created.clone());
        Ok(created)
    }

    fn move_card(&mut self, card_id: &str, list_id: &str) -> Result<(), RemoteError> {
        self.enter()?;
        if !self.open_list_exists(list_id) {
            return Err(not_found("list", list_id));
        }
        self.card_mut(card_id)?.list_id = list_id.to_string();
        self.mutations.push(Mutation::MoveCard {
            card_id: card_id.to_string(),
            list_id: list_id.to_string(),
        });
        Ok(())
    }

    fn set_position(&mut self, card_id: &str, pos: f64) -> Result<(), RemoteError> {
        self.enter()?;
        self.card_mut(card_id)?.pos = pos;
        self.mutations.push(Mutation::SetPosition {
            card_id: card_id.to_string(),
            pos,
        });
        Ok(())
    }

    fn create_label(
        &mut self,
        board_id: &str,
        name: &str,
        color: Option<LabelColor>,
    ) -> Result<Label, RemoteError> {
        self.enter()?;
        let label = Label {
            id: self.fresh_id("label"),
            name: name.to_string(),
            color,
        };
        self.labels.push((board_id.to_string(), label.clone()));
        self.mutations.push(Mutation::CreateLabel {
            label_id: label.id.clone(),
            name: label.name.clone(),
            color,
        });
        Ok(label)
    }

    fn add_label(&mut self, card_id: &str, label_id: &str) -> Result<(), RemoteError> {
        self.enter()?;
        let card = self.card_mut(card_id)?;
        if !card.label_ids.iter().any(|id| id == label_id) {
            card.label_ids.push(label_id.to_string());
        }
        self.mutations.push(Mutation::AddLabel {
            card_id: card_id.to_string(),
            label_id: label_id.to_string(),
        });
        Ok(())
    }

    fn remove_label(&mut self, card_id: &str, label_id: &str) -> Result<(), RemoteError> {
        self.enter()?;
        self.card_mut(card_id)?.label_ids.retain(|id| id != label_id);
        self.mutations.push(Mutation::RemoveLabel {
            card_id: card_id.to_string(),
            label_id: label_id.to_string(),
        });
        Ok(())
    }

    fn add_member(&mut self, card_id: &str, member_id: &str) -> Result<(), RemoteError> {
        self.enter()?;
        let card = self.card_mut(card_id)?;
        if !card.member_ids.iter().any(|id| id == member_id) {
            card.member_ids.push(member_id.to_string());
        }
        self.mutations.push(Mutation::AddMember {
            card_id: card_id.to_string(),
            member_id: member_id.to_string(),
        });
        Ok(())
    }

    fn remove_member(&mut self, card_id: &str, member_id: &str) -> Result<(), RemoteError> {
        self.enter()?;
        self.card_mut(card_id)?.member_ids.retain(|id| id != member_id);
        self.mutations.push(Mutation::RemoveMember {
            card_id: card_id.to_string(),
            member_id: member_id.to_string(),
        });
        Ok(())
    }

    fn create_checklist(&mut self, card_id: &str, name: &str) -> Result<Checklist, RemoteError> {
        self.enter()?;
        let checklist = Checklist {
            id: self.fresh_id("checklist"),
            name: name.to_string(),
            items: Vec::new(),
        };
        self.card_mut(card_id)?.checklists.push(checklist.clone());
        self.mutations.push(Mutation::CreateChecklist {
            card_id: card_id.to_string(),
            checklist_id: checklist.id.clone(),
            name: checklist.name.clone(),
        });
        Ok(checklist)
    }

    fn add_check_item(
        &mut self,
        checklist_id: &str,
        name: &str,
        complete: bool,
    ) -> Result<CheckItem, RemoteError> {
        self.enter()?;
        let item = CheckItem {
            id: self.fresh_id("item"),
            name: name.to_string(),
            complete,
        };
        let checklist = self
            .cards
            .iter_mut()
            .flat_map(|card| card.checklists.iter_mut())
            .find(|checklist| checklist.id == checklist_id)
            .ok_or_else(|| not_found("checklist", checklist_id))?;
        checklist.items.push(item.clone());
        self.mutations.push(Mutation::AddCheckItem {
            checklist_id: checklist_id.to_string(),
            name: item.name.clone(),
            complete,
        });
        Ok(item)
    }

    fn add_comment(&mut self, card_id: &str, text: &str) -> Result<(), RemoteError> {
        self.enter()?;
        self.card_mut(card_id)?.comments.push(text.to_string());
        self.mutations.push(Mutation::AddComment {
            card_id: card_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    fn delete_card(&mut self, card_id: &str) -> Result<(), RemoteError> {
        self.enter()?;
        let before = self.cards.len();
        self.cards.retain(|card| card.id != card_id);
        if self.cards.len() == before {
            return Err(not_found("card", card_id));
        }
        self.mutations.push(Mutation::DeleteCard {
            card_id: card_id.to_string(),
        });
        Ok(())
    }

    fn archive_all_cards(&mut self, list_id: &str) -> Result<(), RemoteError> {
        self.enter()?;
        self.cards.retain(|card| card.list_id != list_id);
        self.mutations.push(Mutation::ArchiveAllCards {
            list_id: list_id.to_string(),
        });
        Ok(())
    }

    fn close_list(&mut self, list_id: &str) -> Result<(), RemoteError> {
        self.enter()?;
        let entry = self
            .lists
            .iter_mut()
            .find(|entry| entry.list.id == list_id)
            .ok_or_else(|| not_found("list", list_id))?;
        entry.closed = true;
        self.mutations.push(Mutation::CloseList {
            list_id: list_id.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> MemoryBoard {
        let mut board = MemoryBoard::new();
        board
            .insert_board("b1", "Board")
            .insert_list("b1", "l1", "Todo")
            .insert_list("b1", "l2", "Done");
        board
    }

    fn new_card(name: &str, list_id: &str, pos: f64) -> NewCard {
        NewCard {
            name: name.to_string(),
            desc: String::new(),
            list_id: list_id.to_string(),
            pos,
        }
    }

    #[test]
    fn writes_are_logged_and_reads_are_not() {
        let mut board = board();
        let card = board.create_card(&new_card("A", "l1", 1.0)).expect("create");
        board.move_card(&card.id, "l2").expect("move");
        let cards = board.cards("l2").expect("read");

        assert_eq!(cards.len(), 1);
        assert_eq!(board.mutations().len(), 2);
        assert_eq!(board.mutations()[1].to_string(), format!("move card {} to list l2", card.id));
    }

    #[test]
    fn injected_failures_are_consumed_in_order() {
        let mut board = board();
        board.fail_next(2, RemoteErrorKind::RateLimited);

        let first = board.lists("b1").expect_err("first fails");
        assert_eq!(first.kind, RemoteErrorKind::RateLimited);
        assert!(board.lists("b1").is_err());
        assert_eq!(board.lists("b1").expect("third succeeds").len(), 2);
        assert_eq!(board.calls(), 3);
    }

    #[test]
    fn label_removal_detaches_label() {
        let mut board = board();
        let card = board.create_card(&new_card("A", "l1", 1.0)).expect("create");
        let label = board.create_label("b1", "bug", Some(LabelColor::Red)).expect("label");
        board.add_label(&card.id, &label.id).expect("attach");
        board.remove_label(&card.id, &label.id).expect("detach");

        assert!(board.card(&card.id).expect("exists").label_ids.is_empty());
        assert_eq!(board.labels("b1").expect("labels"), vec![label]);
    }

    #[test]
    fn checklist_items_land_on_their_card() {
        let mut board = board();
        let card = board.create_card(&new_card("A", "l1", 1.0)).expect("create");
        let checklist = board.create_checklist(&card.id, "Tasks").expect("checklist");
        board.add_check_item(&checklist.id, "write", true).expect("item");

        let stored = board.card(&card.id).expect("exists");
        assert!(stored.checklist("Tasks").expect("present").has_item("write"));
        assert!(board.add_check_item("missing", "x", false).is_err());
    }

    #[test]
    fn archive_and_close_hide_content() {
        let mut board = board();
        board.create_card(&new_card("A", "l1", 1.0)).expect("create");
        board.create_card(&new_card("B", "l2", 1.0)).expect("create");
        board.archive_all_cards("l1").expect("archive");
        board.close_list("l1").expect("close");

        assert!(board.card_named("A").is_none());
        assert!(board.card_named("B").is_some());
        assert!(board.is_list_closed("l1"));
        assert_eq!(board.lists("b1").expect("lists").len(), 1);
        assert!(board.create_card(&new_card("C", "l1", 1.0)).is_err());
    }

    #[test]
    fn delete_unknown_card_is_not_found() {
        let mut board = board();
        let err = board.delete_card("nope").expect_err("missing");
        assert_eq!(err.kind, RemoteErrorKind::NotFound);
        assert!(board.mutations().is_empty());
    }

    #[test]
    fn snapshot_copies_without_mutating_source() {
        let mut source = board();
        source.insert_member("m1", "Ada", "ada");
        source.create_card(&new_card("A", "l1", 1.0)).expect("create");
        source.clear_mutations();

        let retry = RetryExecutor::with_sleeper(
            crate::retry::RetryPolicy::default(),
            crate::retry::RecordingSleeper::default(),
        );
        let mut copy = MemoryBoard::snapshot(&mut source, &retry, "b1").expect("snapshot");
        copy.delete_card(&source.all_cards()[0].id).expect("delete in copy");

        assert_eq!(source.all_cards().len(), 1);
        assert!(source.mutations().is_empty());
        assert_eq!(copy.members("b1").expect("members").len(), 1);
        assert!(copy.all_cards().is_empty());
    }
}
