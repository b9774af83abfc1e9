//! Story-by-story reconciliation of the board against the backlog.
//!
//! For each story, in chain order:
//!
//! 1. resolve the target list (a miss skips the story),
//! 2. find the card by [`IdentityKey`] or create it,
//! 3. move it and set its position when they differ,
//! 4. add whatever comments, check items, members and labels are missing,
//! 5. mark it touched and refresh the cached copy.
//!
//! Every step compares against the cached card first, so a rerun over an
//! unchanged backlog and board issues no writes at all.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{BoardCache, TouchedSet};
use crate::error::{RemoteError, SyncError};
use crate::identity::IdentityKey;
use crate::mapping::{LabelColors, ListMapping};
use crate::members::OwnerMembershipMap;
use crate::model::{Card, LabelColor, NewCard, Story, StoryId, TrelloId};
use crate::order::PositionMap;
use crate::remote::DestinationBoard;
use crate::retry::RetryExecutor;

/// Checklist that receives story tasks unless configured otherwise.
pub const DEFAULT_CHECKLIST_NAME: &str = "Tasks";

/// Operator choices that stay fixed for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSettings {
    pub lists: ListMapping,
    pub colors: LabelColors,
    pub owners: OwnerMembershipMap,
    pub checklist_name: String,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            lists: ListMapping::default(),
            colors: LabelColors::default(),
            owners: OwnerMembershipMap::default(),
            checklist_name: DEFAULT_CHECKLIST_NAME.to_string(),
        }
    }
}

/// What happened to one story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
    Skipped,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub stories_seen: usize,
    pub stories_skipped: usize,
    pub stories_resumed_past: usize,
    pub cards_created: usize,
    pub cards_reused: usize,
    pub cards_moved: usize,
    pub cards_repositioned: usize,
    pub comments_added: usize,
    pub checklists_created: usize,
    pub check_items_added: usize,
    pub labels_created: usize,
    pub labels_attached: usize,
    pub members_added: usize,
    pub members_removed: usize,
    /// Last story fully reconciled; pass it to `--resume-after` after a failure.
    pub last_story: Option<StoryId>,
}

impl ReconcileReport {
    /// Remote writes issued during the run.
    #[must_use]
    pub const fn mutations(&self) -> usize {
        self.cards_created
            + self.cards_moved
            + self.cards_repositioned
            + self.comments_added
            + self.checklists_created
            + self.check_items_added
            + self.labels_created
            + self.labels_attached
            + self.members_added
            + self.members_removed
    }
}

/// Everything a finished engine hands back.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub report: ReconcileReport,
    pub touched: TouchedSet,
    pub cache: BoardCache,
}

/// Drives one reconciliation run against a board.
pub struct ReconciliationEngine<'a, D: DestinationBoard + ?Sized> {
    board: &'a mut D,
    retry: &'a RetryExecutor,
    settings: &'a ReconcileSettings,
    cache: BoardCache,
    touched: TouchedSet,
    report: ReconcileReport,
}

impl<'a, D: DestinationBoard + ?Sized> ReconciliationEngine<'a, D> {
    pub fn new(
        board: &'a mut D,
        retry: &'a RetryExecutor,
        settings: &'a ReconcileSettings,
        cache: BoardCache,
    ) -> Self {
        Self {
            board,
            retry,
            settings,
            cache,
            touched: TouchedSet::new(),
            report: ReconcileReport::default(),
        }
    }

    #[must_use]
    pub const fn report(&self) -> &ReconcileReport {
        &self.report
    }

    #[must_use]
    pub const fn touched(&self) -> &TouchedSet {
        &self.touched
    }

    /// Stories to process with their ranks, in chain order.
    ///
    /// Stories whose id is at or below `resume_after` are left out and
    /// counted as resumed past. Their existing cards are marked touched so
    /// the untouched scan does not offer them for deletion.
    pub fn schedule<'s>(
        &mut self,
        stories: &'s [Story],
        positions: &PositionMap,
        resume_after: Option<StoryId>,
    ) -> Vec<(&'s Story, u32)> {
        let by_id: HashMap<StoryId, &Story> = stories.iter().map(|story| (story.id, story)).collect();
        let mut work = Vec::with_capacity(positions.len());

        for id in positions.ordered_ids() {
            let (Some(story), Some(rank)) = (by_id.get(&id), positions.rank(id)) else {
                continue;
            };
            if resume_after.is_some_and(|cursor| id <= cursor) {
                self.report.stories_resumed_past += 1;
                let key = IdentityKey::new(&story.name, &story.description);
                if let Some(card) = self.cache.card_for(&key) {
                    self.touched.insert(card.id.clone());
                }
                continue;
            }
            work.push((*story, rank));
        }

        if let Some(cursor) = resume_after {
            info!(
                cursor,
                skipped = self.report.stories_resumed_past,
                remaining = work.len(),
                "resuming after story"
            );
        }
        work
    }

    /// Reconcile every scheduled story, stopping at the first fatal error.
    ///
    /// # Errors
    ///
    /// Returns the first [`SyncError`] raised by a story.
    pub fn run(
        &mut self,
        stories: &[Story],
        positions: &PositionMap,
        resume_after: Option<StoryId>,
    ) -> Result<(), SyncError> {
        for (story, rank) in self.schedule(stories, positions, resume_after) {
            self.reconcile_story(story, rank)?;
        }
        Ok(())
    }

    /// Bring the card for `story` in line with it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Remote`] when a call fails after retries. The
    /// card may be left partly reconciled; the next run finishes it.
    pub fn reconcile_story(&mut self, story: &Story, rank: u32) -> Result<Outcome, SyncError> {
        self.report.stories_seen += 1;

        let Some(list_id) = self.settings.lists.resolve(story).map(ToOwned::to_owned) else {
            warn!(
                story = story.id,
                name = %story.name,
                state = %story.state,
                kind = %story.kind,
                "no list mapped for story, skipping"
            );
            self.report.stories_skipped += 1;
            return Ok(Outcome::Skipped);
        };

        let pos = f64::from(rank);
        let key = IdentityKey::new(&story.name, &story.description);
        let writes_before = self.report.mutations();

        let (mut card, created) = if let Some(card) = self.cache.card_for(&key).cloned() {
            debug!(story = story.id, card = %card.id, key = key.short(), "reusing card");
            self.report.cards_reused += 1;
            (card, false)
        } else {
            let new_card = NewCard {
                name: story.name.clone(),
                desc: story.description.clone(),
                list_id: list_id.clone(),
                pos,
            };
            let card = self.remote("create card", |board| board.create_card(&new_card))?;
            info!(story = story.id, card = %card.id, list = %list_id, pos, "created card");
            self.report.cards_created += 1;
            (card, true)
        };

        self.place(&mut card, &list_id, pos)?;
        self.sync_comments(&mut card, story)?;
        self.sync_checklist(&mut card, story)?;
        self.sync_members(&mut card, story)?;
        self.sync_labels(&mut card, story)?;

        self.touched.insert(card.id.clone());
        self.cache.store(card);
        self.report.last_story = Some(story.id);

        Ok(if created {
            Outcome::Created
        } else if self.report.mutations() > writes_before {
            Outcome::Updated
        } else {
            Outcome::Unchanged
        })
    }

    /// Hand back the report, the touched set and the refreshed cache.
    #[must_use]
    pub fn finish(self) -> RunResult {
        RunResult {
            report: self.report,
            touched: self.touched,
            cache: self.cache,
        }
    }

    fn remote<T, F>(&mut self, operation: &str, mut call: F) -> Result<T, SyncError>
    where
        F: FnMut(&mut D) -> Result<T, RemoteError>,
    {
        let board = &mut *self.board;
        self.retry.execute(operation, || call(board))
    }

    fn place(&mut self, card: &mut Card, list_id: &str, pos: f64) -> Result<(), SyncError> {
        if card.list_id != list_id {
            self.remote("move card", |board| board.move_card(&card.id, list_id))?;
            info!(card = %card.id, from = %card.list_id, to = list_id, "moved card");
            card.list_id = list_id.to_string();
            self.report.cards_moved += 1;
        }
        if (card.pos - pos).abs() > f64::EPSILON {
            self.remote("set card position", |board| board.set_position(&card.id, pos))?;
            debug!(card = %card.id, from = card.pos, to = pos, "repositioned card");
            card.pos = pos;
            self.report.cards_repositioned += 1;
        }
        Ok(())
    }

    fn sync_comments(&mut self, card: &mut Card, story: &Story) -> Result<(), SyncError> {
        for comment in &story.comments {
            let text = comment.trim();
            if text.is_empty() || card.has_comment(text) {
                continue;
            }
            self.remote("add comment", |board| board.add_comment(&card.id, text))?;
            debug!(card = %card.id, "added comment");
            card.comments.push(text.to_string());
            self.report.comments_added += 1;
        }
        Ok(())
    }

    fn sync_checklist(&mut self, card: &mut Card, story: &Story) -> Result<(), SyncError> {
        if story.tasks.is_empty() {
            return Ok(());
        }
        let settings = self.settings;
        let name = settings.checklist_name.as_str();

        let checklist_id = if let Some(checklist) = card.checklist(name) {
            checklist.id.clone()
        } else {
            let checklist = self.remote("create checklist", |board| board.create_checklist(&card.id, name))?;
            debug!(card = %card.id, checklist = %checklist.id, "created checklist");
            let id = checklist.id.clone();
            card.checklists.push(checklist);
            self.report.checklists_created += 1;
            id
        };

        for task in &story.tasks {
            let description = task.description.trim();
            if description.is_empty() || card.checklist(name).is_some_and(|c| c.has_item(description)) {
                continue;
            }
            let item = self.remote("add check item", |board| {
                board.add_check_item(&checklist_id, description, task.complete)
            })?;
            debug!(card = %card.id, complete = task.complete, "added check item");
            if let Some(checklist) = card.checklist_mut(name) {
                checklist.items.push(item);
            }
            self.report.check_items_added += 1;
        }
        Ok(())
    }

    fn sync_members(&mut self, card: &mut Card, story: &Story) -> Result<(), SyncError> {
        let settings = self.settings;
        let expected = settings.owners.expected_members(&story.owner_ids);

        let stale: Vec<TrelloId> = card
            .member_ids
            .iter()
            .filter(|member| !expected.contains(*member))
            .cloned()
            .collect();
        for member in stale {
            self.remote("remove member", |board| board.remove_member(&card.id, &member))?;
            debug!(card = %card.id, member = %member, "removed member");
            card.member_ids.retain(|id| *id != member);
            self.report.members_removed += 1;
        }

        for member in expected {
            if card.member_ids.contains(&member) {
                continue;
            }
            self.remote("add member", |board| board.add_member(&card.id, &member))?;
            debug!(card = %card.id, member = %member, "added member");
            card.member_ids.push(member);
            self.report.members_added += 1;
        }
        Ok(())
    }

    fn sync_labels(&mut self, card: &mut Card, story: &Story) -> Result<(), SyncError> {
        let settings = self.settings;
        for (name, color) in wanted_labels(story, &settings.colors) {
            let label_id = self.ensure_label(&name, color)?;
            if card.label_ids.contains(&label_id) {
                continue;
            }
            self.remote("add label", |board| board.add_label(&card.id, &label_id))?;
            debug!(card = %card.id, label = %name, "attached label");
            card.label_ids.push(label_id);
            self.report.labels_attached += 1;
        }
        Ok(())
    }

    fn ensure_label(&mut self, name: &str, color: LabelColor) -> Result<TrelloId, SyncError> {
        if let Some(label) = self.cache.find_label(name, Some(color)) {
            return Ok(label.id.clone());
        }
        let board_id = self.cache.board_id().to_string();
        let label = self.remote("create label", |board| board.create_label(&board_id, name, Some(color)))?;
        info!(label = name, color = %color, id = %label.id, "created label");
        let id = label.id.clone();
        self.cache.push_label(label);
        self.report.labels_created += 1;
        Ok(id)
    }
}

/// Labels a card for `story` should carry, as (name, color) pairs.
///
/// Kinds, tracker labels and estimates without a configured color produce
/// nothing.
#[must_use]
pub fn wanted_labels(story: &Story, colors: &LabelColors) -> Vec<(String, LabelColor)> {
    let mut wanted = Vec::new();
    if let Some(color) = colors.for_kind(story.kind) {
        wanted.push((story.kind.as_str().to_string(), color));
    }
    if let Some(color) = colors.tracker_labels {
        wanted.extend(story.labels.iter().map(|label| (label.clone(), color)));
    }
    if let (Some(estimate), Some(color)) = (story.estimate, colors.estimate) {
        wanted.push((estimate.to_string(), color));
    }
    wanted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBoard, Mutation};
    use crate::model::{StoryKind, StoryState, Task};
    use crate::retry::{RecordingSleeper, RetryPolicy};

    fn retry() -> RetryExecutor {
        RetryExecutor::with_sleeper(RetryPolicy::default(), RecordingSleeper::default())
    }

    fn board() -> MemoryBoard {
        let mut board = MemoryBoard::new();
        board
            .insert_board("b1", "Board")
            .insert_list("b1", "current", "Current")
            .insert_list("b1", "done", "Done");
        board
    }

    fn settings() -> ReconcileSettings {
        let mut settings = ReconcileSettings::default();
        settings.lists.set_state(StoryState::Started, Some("current".into()));
        settings.lists.set_state(StoryState::Accepted, Some("done".into()));
        settings
    }

    fn engine_run(board: &mut MemoryBoard, settings: &ReconcileSettings, story: &Story) -> Outcome {
        let retry = retry();
        let cache = BoardCache::load(board, &retry, "b1").expect("load");
        let mut engine = ReconciliationEngine::new(board, &retry, settings, cache);
        engine.reconcile_story(story, 1).expect("reconcile")
    }

    #[test]
    fn unmapped_story_is_skipped_without_writes() {
        let mut board = board();
        let story = Story::new(1, "A", StoryKind::Bug, StoryState::Rejected);
        assert_eq!(engine_run(&mut board, &settings(), &story), Outcome::Skipped);
        assert!(board.mutations().is_empty());
    }

    #[test]
    fn new_story_creates_card_in_place() {
        let mut board = board();
        let story = Story::new(1, "A", StoryKind::Bug, StoryState::Started);
        assert_eq!(engine_run(&mut board, &settings(), &story), Outcome::Created);

        assert_eq!(board.mutations().len(), 1, "no move or reposition after create");
        let card = board.card_named("A").expect("created");
        assert_eq!(card.list_id, "current");
        assert!((card.pos - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn state_change_moves_existing_card() {
        let mut board = board();
        let mut story = Story::new(1, "A", StoryKind::Bug, StoryState::Started);
        engine_run(&mut board, &settings(), &story);
        board.clear_mutations();

        story.state = StoryState::Accepted;
        assert_eq!(engine_run(&mut board, &settings(), &story), Outcome::Updated);
        assert!(matches!(
            board.mutations(),
            [Mutation::MoveCard { list_id, .. }] if list_id == "done"
        ));
    }

    #[test]
    fn blank_and_repeated_comments_are_not_posted() {
        let mut board = board();
        let mut story = Story::new(1, "A", StoryKind::Bug, StoryState::Started);
        story.comments = vec!["  ".into(), "ship it".into(), "ship it ".into()];
        engine_run(&mut board, &settings(), &story);

        let card = board.card_named("A").expect("created");
        assert_eq!(card.comments, vec!["ship it".to_string()]);
    }

    #[test]
    fn tasks_fill_one_checklist() {
        let mut board = board();
        let mut story = Story::new(1, "A", StoryKind::Bug, StoryState::Started);
        story.tasks = vec![
            Task {
                description: "write".into(),
                complete: true,
            },
            Task {
                description: "review".into(),
                complete: false,
            },
        ];
        let mut settings = settings();
        settings.checklist_name = "Todo".into();
        engine_run(&mut board, &settings, &story);

        let card = board.card_named("A").expect("created");
        assert_eq!(card.checklists.len(), 1);
        let checklist = card.checklist("Todo").expect("named from settings");
        assert_eq!(checklist.items.len(), 2);
        assert!(checklist.items[0].complete);
        assert!(!checklist.items[1].complete);
    }

    #[test]
    fn story_without_tasks_gets_no_checklist() {
        let mut board = board();
        let story = Story::new(1, "A", StoryKind::Bug, StoryState::Started);
        engine_run(&mut board, &settings(), &story);
        assert!(board.card_named("A").expect("created").checklists.is_empty());
    }

    #[test]
    fn labels_are_created_once_and_shared() {
        let mut board = board();
        let mut settings = settings();
        settings.colors.set_kind(StoryKind::Bug, Some(LabelColor::Red));
        settings.colors.tracker_labels = Some(LabelColor::Sky);
        settings.colors.estimate = Some(LabelColor::Black);

        let mut first = Story::new(1, "A", StoryKind::Bug, StoryState::Started);
        first.labels = vec!["api".into()];
        first.estimate = Some(3);
        let mut second = Story::new(2, "B", StoryKind::Bug, StoryState::Started);
        second.labels = vec!["api".into()];

        let retry = retry();
        let cache = BoardCache::load(&mut board, &retry, "b1").expect("load");
        let mut engine = ReconciliationEngine::new(&mut board, &retry, &settings, cache);
        engine.reconcile_story(&first, 1).expect("first");
        engine.reconcile_story(&second, 2).expect("second");
        let result = engine.finish();

        assert_eq!(result.report.labels_created, 3, "bug, api, 3");
        assert_eq!(result.report.labels_attached, 5);
        assert_eq!(board.card_named("B").expect("b").label_ids.len(), 2);
    }

    #[test]
    fn wanted_labels_skip_uncolored_sources() {
        let mut story = Story::new(1, "A", StoryKind::Feature, StoryState::Started);
        story.labels = vec!["ui".into()];
        story.estimate = Some(2);

        assert!(wanted_labels(&story, &LabelColors::default()).is_empty());

        let mut colors = LabelColors::default();
        colors.estimate = Some(LabelColor::Black);
        assert_eq!(wanted_labels(&story, &colors), vec![("2".to_string(), LabelColor::Black)]);
    }

    #[test]
    fn schedule_follows_chain_and_honors_cursor() {
        let mut a = Story::new(30, "A", StoryKind::Bug, StoryState::Started);
        let mut b = Story::new(10, "B", StoryKind::Bug, StoryState::Started);
        let mut c = Story::new(20, "C", StoryKind::Bug, StoryState::Started);
        a.before_id = Some(10);
        b.after_id = Some(30);
        b.before_id = Some(20);
        c.after_id = Some(10);
        let stories = vec![c, a, b];
        let positions = crate::order::resolve_positions(&stories).expect("valid chain");

        let mut board = board();
        let retry = retry();
        let settings = settings();
        let mut engine = ReconciliationEngine::new(&mut board, &retry, &settings, BoardCache::default());

        let all: Vec<(StoryId, u32)> = engine
            .schedule(&stories, &positions, None)
            .into_iter()
            .map(|(story, rank)| (story.id, rank))
            .collect();
        assert_eq!(all, vec![(30, 1), (10, 2), (20, 3)]);

        let resumed: Vec<StoryId> = engine
            .schedule(&stories, &positions, Some(20))
            .into_iter()
            .map(|(story, _)| story.id)
            .collect();
        assert_eq!(resumed, vec![30]);
        assert_eq!(engine.report().stories_resumed_past, 2);
    }
}
