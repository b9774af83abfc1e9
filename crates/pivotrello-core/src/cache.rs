//! Run-scoped snapshot of the destination board.
//!
//! Built once at the start of a run and owned by the engine until the run
//! ends. Nothing invalidates it mid-run: the board is assumed to change only
//! through this process while a run is in progress.

use std::collections::{BTreeSet, HashMap};

use tracing::info;

use crate::duplicates::{DuplicateGroup, find_duplicates};
use crate::error::SyncError;
use crate::identity::IdentityKey;
use crate::model::{BoardList, Card, Label, LabelColor, TrelloId};
use crate::remote::DestinationBoard;
use crate::retry::RetryExecutor;

/// Lists, cards and labels of one board.
#[derive(Debug, Clone, Default)]
pub struct BoardCache {
    board_id: TrelloId,
    lists: Vec<BoardList>,
    /// Cards present before the run, in list then position order.
    existing: Vec<Card>,
    cards: HashMap<TrelloId, Card>,
    by_key: HashMap<IdentityKey, TrelloId>,
    labels: Vec<Label>,
}

impl BoardCache {
    /// Fetch lists, every card in every list, and the board labels.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Remote`] when a fetch fails after retries.
    pub fn load<D>(board: &mut D, retry: &RetryExecutor, board_id: &str) -> Result<Self, SyncError>
    where
        D: DestinationBoard + ?Sized,
    {
        let lists = retry.execute("fetch lists", || board.lists(board_id))?;

        let mut existing = Vec::new();
        for list in &lists {
            let mut cards = retry.execute("fetch cards", || board.cards(&list.id))?;
            cards.sort_by(|a, b| a.pos.total_cmp(&b.pos));
            existing.extend(cards);
        }

        let labels = retry.execute("fetch labels", || board.labels(board_id))?;

        info!(
            board = board_id,
            lists = lists.len(),
            cards = existing.len(),
            labels = labels.len(),
            "loaded board"
        );

        Ok(Self::from_parts(board_id, lists, existing, labels))
    }

    /// Assemble a cache from already-fetched parts.
    pub fn from_parts(
        board_id: impl Into<TrelloId>,
        lists: Vec<BoardList>,
        existing: Vec<Card>,
        labels: Vec<Label>,
    ) -> Self {
        let mut cache = Self {
            board_id: board_id.into(),
            lists,
            existing: Vec::new(),
            cards: HashMap::new(),
            by_key: HashMap::new(),
            labels,
        };
        for card in &existing {
            cache.store(card.clone());
        }
        cache.existing = existing;
        cache
    }

    #[must_use]
    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    #[must_use]
    pub fn lists(&self) -> &[BoardList] {
        &self.lists
    }

    #[must_use]
    pub fn list_name(&self, list_id: &str) -> Option<&str> {
        self.lists
            .iter()
            .find(|list| list.id == list_id)
            .map(|list| list.name.as_str())
    }

    /// Cards that were on the board when the cache was loaded.
    #[must_use]
    pub fn existing_cards(&self) -> &[Card] {
        &self.existing
    }

    /// Card currently representing `key`. With duplicates, the last one
    /// loaded wins.
    #[must_use]
    pub fn card_for(&self, key: &IdentityKey) -> Option<&Card> {
        self.by_key.get(key).and_then(|id| self.cards.get(id))
    }

    /// Insert or replace a card, indexing it under its current key.
    pub fn store(&mut self, card: Card) {
        let key = IdentityKey::new(&card.name, &card.desc);
        self.by_key.insert(key, card.id.clone());
        self.cards.insert(card.id.clone(), card);
    }

    /// Forget every card, e.g. after wiping the board.
    pub fn clear_cards(&mut self) {
        self.existing.clear();
        self.cards.clear();
        self.by_key.clear();
    }

    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    #[must_use]
    pub fn find_label(&self, name: &str, color: Option<LabelColor>) -> Option<&Label> {
        self.labels.iter().find(|label| label.matches(name, color))
    }

    pub fn push_label(&mut self, label: Label) {
        self.labels.push(label);
    }

    /// Pre-existing cards sharing an identity key.
    #[must_use]
    pub fn duplicates(&self) -> Vec<DuplicateGroup> {
        find_duplicates(&self.existing)
    }
}

/// Card ids created or confirmed during this run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TouchedSet {
    ids: BTreeSet<TrelloId>,
}

impl TouchedSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the card was already touched.
    pub fn insert(&mut self, card_id: impl Into<TrelloId>) -> bool {
        self.ids.insert(card_id.into())
    }

    #[must_use]
    pub fn contains(&self, card_id: &str) -> bool {
        self.ids.contains(card_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: Into<TrelloId>> FromIterator<S> for TouchedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}
