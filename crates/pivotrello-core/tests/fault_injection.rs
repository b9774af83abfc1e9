//! Remote failures injected into a reconciliation run.
//!
//! `MemoryBoard::fail_next` makes the next N calls fail with a chosen kind;
//! the engine must ride out transient failures through the retry executor,
//! give up after the configured cap, and stop at once on permanent ones.

use std::time::Duration;

use pivotrello_core::cache::BoardCache;
use pivotrello_core::engine::{ReconcileSettings, ReconciliationEngine};
use pivotrello_core::error::{ErrorCode, RemoteErrorKind, SyncError};
use pivotrello_core::memory::MemoryBoard;
use pivotrello_core::model::{Story, StoryKind, StoryState};
use pivotrello_core::order::resolve_positions;
use pivotrello_core::retry::{RecordingSleeper, RetryExecutor, RetryPolicy};

const BOARD: &str = "b1";

fn board() -> MemoryBoard {
    let mut board = MemoryBoard::new();
    board.insert_board(BOARD, "Board").insert_list(BOARD, "l1", "Current");
    board
}

fn settings() -> ReconcileSettings {
    let mut settings = ReconcileSettings::default();
    settings.lists.set_state(StoryState::Started, Some("l1".into()));
    settings
}

fn story() -> Story {
    Story::new(42, "Flaky", StoryKind::Feature, StoryState::Started)
}

/// Load the cache cleanly, queue failures, then reconcile one story.
fn reconcile_with_failures(
    failures: usize,
    kind: RemoteErrorKind,
    max_retries: u32,
) -> (MemoryBoard, RecordingSleeper, Result<(), SyncError>) {
    let mut board = board();
    let sleeper = RecordingSleeper::default();
    let retry = RetryExecutor::with_sleeper(
        RetryPolicy::new(max_retries, Duration::from_secs(30)),
        sleeper.clone(),
    );
    let settings = settings();
    let stories = vec![story()];
    let positions = resolve_positions(&stories).expect("single story chain");

    let cache = BoardCache::load(&mut board, &retry, BOARD).expect("load");
    board.fail_next(failures, kind);

    let result = {
        let mut engine = ReconciliationEngine::new(&mut board, &retry, &settings, cache);
        engine.run(&stories, &positions, None)
    };
    (board, sleeper, result)
}

#[test]
fn three_transient_failures_then_success() {
    let (board, sleeper, result) = reconcile_with_failures(3, RemoteErrorKind::Network, 7);

    result.expect("recovers");
    assert!(board.card_named("Flaky").is_some());
    assert_eq!(
        sleeper.delays(),
        vec![
            Duration::from_secs(30),
            Duration::from_secs(60),
            Duration::from_secs(120)
        ]
    );
}

#[test]
fn transient_failures_past_the_cap_abort_the_run() {
    let (board, sleeper, result) = reconcile_with_failures(8, RemoteErrorKind::RateLimited, 7);

    let err = result.expect_err("retries exhausted");
    assert_eq!(err.code(), ErrorCode::RemoteUnavailable);
    assert!(matches!(
        err,
        SyncError::Remote { attempts: 8, ref operation, .. } if operation == "create card"
    ));
    assert_eq!(sleeper.delays().len(), 7);
    assert_eq!(sleeper.delays()[6], Duration::from_secs(30 * 64));
    assert!(board.all_cards().is_empty());
}

#[test]
fn permanent_failure_is_not_retried() {
    let (board, sleeper, result) = reconcile_with_failures(1, RemoteErrorKind::Unauthorized, 7);

    let err = result.expect_err("fatal");
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    assert!(sleeper.delays().is_empty());
    assert!(board.mutations().is_empty());
}

#[test]
fn failed_run_is_healed_by_rerun() {
    let (mut board, _, result) = reconcile_with_failures(2, RemoteErrorKind::Server, 1);
    assert!(result.is_err());

    let retry = RetryExecutor::with_sleeper(RetryPolicy::default(), RecordingSleeper::default());
    let settings = settings();
    let stories = vec![story()];
    let positions = resolve_positions(&stories).expect("chain");
    let cache = BoardCache::load(&mut board, &retry, BOARD).expect("load");
    let mut engine = ReconciliationEngine::new(&mut board, &retry, &settings, cache);
    engine.run(&stories, &positions, None).expect("rerun");

    assert_eq!(engine.report().cards_created, 1);
    assert_eq!(board.all_cards().len(), 1);
}

#[test]
fn board_load_retries_too() {
    let mut board = board();
    board.fail_next(2, RemoteErrorKind::Timeout);
    let sleeper = RecordingSleeper::default();
    let retry = RetryExecutor::with_sleeper(RetryPolicy::default(), sleeper.clone());

    let cache = BoardCache::load(&mut board, &retry, BOARD).expect("load after retries");
    assert_eq!(cache.lists().len(), 1);
    assert_eq!(sleeper.delays().len(), 2);
}
