//! Clearing a board before a fresh import.

use serde::Serialize;
use tracing::info;

use crate::error::SyncError;
use crate::model::{BoardList, Card};
use crate::remote::DestinationBoard;
use crate::retry::RetryExecutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WipeMode {
    /// Delete cards one by one.
    #[default]
    Delete,
    /// Archive every card of each list in one call per list.
    Archive,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WipeReport {
    pub cards_deleted: usize,
    pub lists_archived: usize,
    pub lists_closed: usize,
}

/// Remove `cards` from the board (or archive `lists`) and optionally close
/// the lists. `on_card` is called after each deleted card.
///
/// # Errors
///
/// Returns [`SyncError::Remote`] on the first call that fails after retries.
pub fn wipe_board<D, F>(
    board: &mut D,
    retry: &RetryExecutor,
    lists: &[BoardList],
    cards: &[Card],
    mode: WipeMode,
    close_lists: bool,
    mut on_card: F,
) -> Result<WipeReport, SyncError>
where
    D: DestinationBoard + ?Sized,
    F: FnMut(&Card),
{
    let mut report = WipeReport::default();

    match mode {
        WipeMode::Delete => {
            for card in cards {
                retry.execute("delete card", || board.delete_card(&card.id))?;
                report.cards_deleted += 1;
                on_card(card);
            }
        }
        WipeMode::Archive => {
            for list in lists {
                retry.execute("archive list cards", || board.archive_all_cards(&list.id))?;
                report.lists_archived += 1;
            }
        }
    }

    if close_lists {
        for list in lists {
            retry.execute("close list", || board.close_list(&list.id))?;
            report.lists_closed += 1;
        }
    }

    info!(
        deleted = report.cards_deleted,
        archived_lists = report.lists_archived,
        closed_lists = report.lists_closed,
        "wiped board"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBoard, Mutation};
    use crate::model::NewCard;
    use crate::retry::{RecordingSleeper, RetryPolicy};

    fn setup() -> (MemoryBoard, Vec<BoardList>, Vec<Card>) {
        let mut board = MemoryBoard::new();
        board
            .insert_board("b1", "Board")
            .insert_list("b1", "l1", "Todo")
            .insert_list("b1", "l2", "Done");
        let mut cards = Vec::new();
        for (name, list) in [("A", "l1"), ("B", "l1"), ("C", "l2")] {
            cards.push(
                board
                    .create_card(&NewCard {
                        name: name.into(),
                        desc: String::new(),
                        list_id: list.into(),
                        pos: 1.0,
                    })
                    .expect("create"),
            );
        }
        board.clear_mutations();
        let lists = board.lists("b1").expect("lists");
        (board, lists, cards)
    }

    fn retry() -> RetryExecutor {
        RetryExecutor::with_sleeper(RetryPolicy::default(), RecordingSleeper::default())
    }

    #[test]
    fn delete_mode_reports_each_card() {
        let (mut board, lists, cards) = setup();
        let mut seen = Vec::new();
        let report = wipe_board(&mut board, &retry(), &lists, &cards, WipeMode::Delete, false, |card| {
            seen.push(card.name.clone());
        })
        .expect("wipe");

        assert_eq!(report.cards_deleted, 3);
        assert_eq!(seen, vec!["A", "B", "C"]);
        assert!(board.all_cards().is_empty());
    }

    #[test]
    fn archive_mode_works_per_list_and_closes() {
        let (mut board, lists, cards) = setup();
        let report = wipe_board(&mut board, &retry(), &lists, &cards, WipeMode::Archive, true, |_| {})
            .expect("wipe");

        assert_eq!(report.lists_archived, 2);
        assert_eq!(report.lists_closed, 2);
        assert!(board.all_cards().is_empty());
        assert!(board.is_list_closed("l1"));
        assert!(matches!(board.mutations()[0], Mutation::ArchiveAllCards { .. }));
    }
}
