//! Display order of stories, rebuilt from Pivotal's before/after links.
//!
//! Pivotal does not return a rank. Each story names its neighbours:
//! `after_id` is the story shown directly above it and `before_id` the
//! story shown directly below. The first story is the one that comes after
//! nothing; walking `before_id` from there visits the backlog top to bottom.
//!
//! Any defect in the chain is fatal. A partial order would put cards in
//! the wrong place on every subsequent rerun, so the run stops before the
//! first remote write instead.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::model::{Story, StoryId};

/// Rank (1-based) of every story in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionMap {
    ranks: HashMap<StoryId, u32>,
}

impl PositionMap {
    #[must_use]
    pub fn rank(&self, id: StoryId) -> Option<u32> {
        self.ranks.get(&id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Story ids sorted by rank.
    #[must_use]
    pub fn ordered_ids(&self) -> Vec<StoryId> {
        let by_rank: BTreeMap<u32, StoryId> =
            self.ranks.iter().map(|(id, rank)| (*rank, *id)).collect();
        by_rank.into_values().collect()
    }
}

/// Input-consistency failures in the ordering chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("no story is first in the backlog: every story has an after_id")]
    NoHead,

    #[error("{} stories claim to be first in the backlog: {ids:?}", ids.len())]
    MultipleHeads { ids: Vec<StoryId> },

    #[error("duplicate story id {0} in input")]
    DuplicateId(StoryId),

    #[error("story {from} links to unknown story {to}")]
    DanglingLink { from: StoryId, to: StoryId },

    #[error("ordering chain loops back to story {0}")]
    Cycle(StoryId),

    #[error("ordering chain reaches {visited} of {total} stories")]
    Disconnected { visited: usize, total: usize },
}

/// Assign ranks 1..N following the before/after chain.
///
/// # Errors
///
/// Returns an [`OrderError`] unless exactly one story has no `after_id`
/// and following `before_id` from it visits every story exactly once.
pub fn resolve_positions(stories: &[Story]) -> Result<PositionMap, OrderError> {
    if stories.is_empty() {
        return Ok(PositionMap::default());
    }

    let mut next: HashMap<StoryId, Option<StoryId>> = HashMap::with_capacity(stories.len());
    for story in stories {
        if next.insert(story.id, story.before_id).is_some() {
            return Err(OrderError::DuplicateId(story.id));
        }
    }

    let heads: Vec<StoryId> = stories
        .iter()
        .filter(|story| story.after_id.is_none())
        .map(|story| story.id)
        .collect();

    let head = match heads.as_slice() {
        [] => return Err(OrderError::NoHead),
        [only] => *only,
        _ => return Err(OrderError::MultipleHeads { ids: heads }),
    };

    let mut ranks = HashMap::with_capacity(stories.len());
    let mut seen = HashSet::with_capacity(stories.len());
    let mut current = Some(head);
    let mut rank: u32 = 1;

    while let Some(id) = current {
        if !seen.insert(id) {
            return Err(OrderError::Cycle(id));
        }
        ranks.insert(id, rank);
        rank += 1;

        current = next.get(&id).copied().flatten();

        if let Some(following) = current {
            if !next.contains_key(&following) {
                return Err(OrderError::DanglingLink {
                    from: id,
                    to: following,
                });
            }
        }
    }

    if ranks.len() != stories.len() {
        return Err(OrderError::Disconnected {
            visited: ranks.len(),
            total: stories.len(),
        });
    }

    tracing::debug!(stories = ranks.len(), "resolved backlog order");
    Ok(PositionMap { ranks })
}
