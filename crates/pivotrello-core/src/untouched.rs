//! Cards the run never touched.
//!
//! After reconciliation, any card that was on the board before the run and
//! was not created or confirmed by it no longer corresponds to a story. The
//! operator decides what happens to them through an [`UntouchedReviewer`].

use serde::Serialize;
use tracing::info;

use crate::cache::TouchedSet;
use crate::error::SyncError;
use crate::model::{Card, TrelloId};
use crate::remote::DestinationBoard;
use crate::retry::RetryExecutor;

/// Pre-existing cards missing from `touched`, in board order.
#[must_use]
pub fn untouched_cards(existing: &[Card], touched: &TouchedSet) -> Vec<Card> {
    existing
        .iter()
        .filter(|card| !touched.contains(&card.id))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    DeleteAll,
    ReviewEach,
    KeepAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Keep,
    Delete,
    /// Keep this card and every remaining one.
    Quit,
}

/// The operator's side of the untouched-card conversation.
pub trait UntouchedReviewer {
    fn choose_disposition(&mut self, cards: &[Card]) -> Result<Disposition, SyncError>;

    /// Second confirmation before deleting everything.
    fn confirm_delete_all(&mut self, count: usize) -> Result<bool, SyncError>;

    fn review(&mut self, card: &Card) -> Result<ReviewDecision, SyncError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispositionReport {
    pub deleted: Vec<TrelloId>,
    pub kept: usize,
}

/// Ask `reviewer` what to do with `cards` and carry it out.
///
/// # Errors
///
/// Returns [`SyncError::Remote`] when a delete fails after retries, or
/// whatever the reviewer returns.
pub fn dispose_untouched<D, R>(
    board: &mut D,
    retry: &RetryExecutor,
    cards: &[Card],
    reviewer: &mut R,
) -> Result<DispositionReport, SyncError>
where
    D: DestinationBoard + ?Sized,
    R: UntouchedReviewer + ?Sized,
{
    let mut report = DispositionReport::default();
    if cards.is_empty() {
        return Ok(report);
    }

    match reviewer.choose_disposition(cards)? {
        Disposition::KeepAll => report.kept = cards.len(),
        Disposition::DeleteAll => {
            if reviewer.confirm_delete_all(cards.len())? {
                for card in cards {
                    delete(board, retry, card, &mut report)?;
                }
            } else {
                report.kept = cards.len();
            }
        }
        Disposition::ReviewEach => {
            for (index, card) in cards.iter().enumerate() {
                match reviewer.review(card)? {
                    ReviewDecision::Keep => report.kept += 1,
                    ReviewDecision::Delete => delete(board, retry, card, &mut report)?,
                    ReviewDecision::Quit => {
                        report.kept += cards.len() - index;
                        break;
                    }
                }
            }
        }
    }

    info!(
        deleted = report.deleted.len(),
        kept = report.kept,
        "handled untouched cards"
    );
    Ok(report)
}

fn delete<D: DestinationBoard + ?Sized>(
    board: &mut D,
    retry: &RetryExecutor,
    card: &Card,
    report: &mut DispositionReport,
) -> Result<(), SyncError> {
    retry.execute("delete card", || board.delete_card(&card.id))?;
    info!(card = %card.id, name = %card.name, "deleted untouched card");
    report.deleted.push(card.id.clone());
    Ok(())
}
