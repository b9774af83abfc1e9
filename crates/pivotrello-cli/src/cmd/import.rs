use std::io::Write;

use anyhow::{Context as _, Result, bail};
use clap::Args;
use pivotrello_core::cache::BoardCache;
use pivotrello_core::config::Presets;
use pivotrello_core::engine::{ReconcileReport, ReconcileSettings, ReconciliationEngine};
use pivotrello_core::error::SyncError;
use pivotrello_core::mapping::{LabelColors, ListMapping};
use pivotrello_core::members::{OwnerMembershipMap, distinct_owners};
use pivotrello_core::memory::MemoryBoard;
use pivotrello_core::model::{Story, StoryKind, StoryState, TrelloId};
use pivotrello_core::order::resolve_positions;
use pivotrello_core::remote::{DestinationBoard, SourceTracker};
use pivotrello_core::retry::RetryExecutor;
use pivotrello_core::untouched::{DispositionReport, dispose_untouched, untouched_cards};
use pivotrello_core::wipe::{WipeMode, WipeReport, wipe_board};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::Context;
use super::duplicates::{DuplicateCardsFound, print_groups};
use crate::output::{pretty_kv, pretty_rule, pretty_section, render_mode};
use crate::{progress, prompt};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Pivotal project id. Prompts when omitted.
    #[arg(long)]
    pub project: Option<u64>,

    /// Trello board id. Prompts when omitted.
    #[arg(long)]
    pub board: Option<String>,

    /// Skip stories whose id is at or below this one.
    #[arg(long, value_name = "STORY_ID")]
    pub resume_after: Option<u64>,

    /// Reconcile against a local copy of the board and print the planned changes.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct ImportSummary {
    project_id: u64,
    board_id: TrelloId,
    dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    wiped: Option<WipeReport>,
    duplicate_groups: usize,
    report: ReconcileReport,
    untouched: usize,
    disposition: DispositionReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    planned: Vec<String>,
}

pub fn run_import(args: &ImportArgs, ctx: &Context) -> Result<()> {
    let mut pivotal = ctx.pivotal()?;
    let mut trello = ctx.trello()?;
    let retry = ctx.retry();
    let presets = ctx.config.presets()?;

    let project_id = match args.project {
        Some(id) => id,
        None => choose_project(&mut pivotal, &retry)?,
    };
    let stories = retry.execute("fetch stories", || pivotal.stories(project_id))?;
    let people = retry.execute("fetch project members", || pivotal.people(project_id))?;
    let positions = resolve_positions(&stories)
        .map_err(SyncError::from)
        .context("Cannot order the backlog; nothing was changed")?;
    info!(project_id, stories = positions.len(), "resolved story order");
    debug!(requests = pivotal.request_count(), "pivotal requests");

    let board_id = match &args.board {
        Some(id) => id.clone(),
        None => choose_board(&mut trello, &retry)?,
    };

    let mut snapshot = if args.dry_run {
        Some(MemoryBoard::snapshot(&mut trello, &retry, &board_id)?)
    } else {
        None
    };
    let board: &mut dyn DestinationBoard = match snapshot.as_mut() {
        Some(copy) => copy,
        None => &mut trello,
    };

    let mut cache = BoardCache::load(&mut *board, &retry, &board_id)?;
    let wiped = offer_wipe(ctx, &mut *board, &retry, &mut cache)?;

    let groups = cache.duplicates();
    if !groups.is_empty() {
        warn!(groups = groups.len(), "board has duplicate cards");
        if !ctx.output.is_json() {
            print_groups(ctx, &cache, &groups)?;
        }
        if !prompt::is_interactive_terminal() {
            return Err(DuplicateCardsFound {
                groups: groups.len(),
            }
            .into());
        }
        if !prompt::ask_proceed_with_duplicates(groups.len())? {
            return Err(SyncError::Aborted("duplicate cards on the board".into()).into());
        }
    }

    let members = retry.execute("fetch board members", || board.members(&board_id))?;
    let settings = ReconcileSettings {
        lists: choose_lists(&presets, &cache, &stories)?,
        colors: choose_colors(&presets, &stories)?,
        owners: OwnerMembershipMap::build(
            &distinct_owners(&stories, &people),
            &members,
            prompt::ask_member,
        )?,
        checklist_name: ctx.config.import.checklist_name.clone(),
    };

    let result = {
        let mut engine = ReconciliationEngine::new(&mut *board, &retry, &settings, cache);
        let work = engine.schedule(&stories, &positions, args.resume_after);
        let bar = progress::bar(work.len(), "importing", ctx.show_progress());

        for (story, rank) in work {
            if let Err(err) = engine.reconcile_story(story, rank) {
                bar.abandon();
                let resume = engine.report().last_story.map_or_else(
                    || "rerun the import".to_string(),
                    |id| format!("rerun with --resume-after {id}"),
                );
                return Err(anyhow::Error::new(err)
                    .context(format!("Stopped at story {} ({}); {resume}", story.id, story.name)));
            }
            bar.inc(1);
        }
        bar.finish_and_clear();
        engine.finish()
    };

    let untouched = untouched_cards(result.cache.existing_cards(), &result.touched);
    let disposition = if untouched.is_empty() {
        DispositionReport::default()
    } else if prompt::is_interactive_terminal() {
        let mut reviewer = prompt::TerminalReviewer::new(result.cache.lists());
        dispose_untouched(board, &retry, &untouched, &mut reviewer)?
    } else {
        warn!(cards = untouched.len(), "keeping untouched cards without a terminal to ask");
        DispositionReport {
            deleted: Vec::new(),
            kept: untouched.len(),
        }
    };

    let planned = snapshot
        .map(|copy| copy.mutations().iter().map(ToString::to_string).collect())
        .unwrap_or_default();
    debug!(requests = trello.request_count(), "trello requests");

    let summary = ImportSummary {
        project_id,
        board_id,
        dry_run: args.dry_run,
        wiped,
        duplicate_groups: groups.len(),
        report: result.report,
        untouched: untouched.len(),
        disposition,
        planned,
    };
    render_mode(
        ctx.output,
        &summary,
        |summary, w| write_text(summary, w),
        |summary, w| write_pretty(summary, w),
    )
}

fn choose_project(pivotal: &mut dyn SourceTracker, retry: &RetryExecutor) -> Result<u64> {
    let mut projects = retry.execute("list projects", || pivotal.projects())?;
    if projects.is_empty() {
        bail!("The Pivotal token has no projects");
    }
    projects.sort_by(|a, b| a.name.cmp(&b.name));
    let choices: Vec<(u64, String)> = projects.into_iter().map(|p| (p.id, p.name)).collect();
    Ok(prompt::ask_project(&choices)?)
}

fn choose_board(trello: &mut dyn DestinationBoard, retry: &RetryExecutor) -> Result<TrelloId> {
    let mut boards = retry.execute("list boards", || trello.boards())?;
    if boards.is_empty() {
        bail!("The Trello token has no open boards");
    }
    boards.sort_by(|a, b| a.name.cmp(&b.name));
    let choices: Vec<(TrelloId, String)> = boards.into_iter().map(|b| (b.id, b.name)).collect();
    Ok(prompt::ask_board(&choices)?)
}

/// Delete every card first when the operator asks for it.
fn offer_wipe(
    ctx: &Context,
    board: &mut dyn DestinationBoard,
    retry: &RetryExecutor,
    cache: &mut BoardCache,
) -> Result<Option<WipeReport>> {
    let count = cache.existing_cards().len();
    if count == 0 {
        return Ok(None);
    }
    if !prompt::is_interactive_terminal() {
        debug!("no terminal, keeping existing cards");
        return Ok(None);
    }
    if !prompt::ask_wipe(count)? {
        return Ok(None);
    }

    let bar = progress::bar(count, "deleting", ctx.show_progress());
    let report = wipe_board(
        board,
        retry,
        cache.lists(),
        cache.existing_cards(),
        WipeMode::Delete,
        false,
        |_| bar.inc(1),
    )?;
    bar.finish_and_clear();
    cache.clear_cards();
    Ok(Some(report))
}

fn preset_list(cache: &BoardCache, list: Option<&TrelloId>, table: &str) -> Result<()> {
    match list {
        Some(id) if cache.list_name(id).is_none() => {
            bail!("List {id} from [lists.{table}] is not an open list on the board")
        }
        _ => Ok(()),
    }
}

/// Lists for every state and backlog kind present in `stories`.
fn choose_lists(presets: &Presets, cache: &BoardCache, stories: &[Story]) -> Result<ListMapping> {
    let mut lists = ListMapping::new();

    for state in StoryState::MAPPED {
        if !stories.iter().any(|story| story.state == state) {
            continue;
        }
        let list = match presets.states.get(&state) {
            Some(preset) => {
                preset_list(cache, preset.as_ref(), "state")?;
                preset.clone()
            }
            None => prompt::ask_list(state.panel_name(), cache.lists())?,
        };
        lists.set_state(state, list);
    }

    for kind in StoryKind::ALL {
        let in_backlog = stories
            .iter()
            .any(|story| story.state == StoryState::Unstarted && story.kind == kind);
        if !in_backlog {
            continue;
        }
        let list = match presets.kinds.get(&kind) {
            Some(preset) => {
                preset_list(cache, preset.as_ref(), "kind")?;
                preset.clone()
            }
            None => prompt::ask_list(&format!("unstarted {kind}"), cache.lists())?,
        };
        lists.set_kind(kind, list);
    }

    Ok(lists)
}

fn choose_colors(presets: &Presets, stories: &[Story]) -> Result<LabelColors> {
    let mut colors = LabelColors::default();

    for kind in StoryKind::ALL {
        if !stories.iter().any(|story| story.kind == kind) {
            continue;
        }
        let color = match presets.kind_colors.get(&kind) {
            Some(preset) => *preset,
            None => prompt::ask_color(&format!("{kind} stories"))?,
        };
        colors.set_kind(kind, color);
    }

    if stories.iter().any(|story| !story.labels.is_empty()) {
        colors.tracker_labels = match presets.tracker_labels {
            Some(preset) => preset,
            None => prompt::ask_color("Pivotal labels")?,
        };
    }
    if stories.iter().any(|story| story.estimate.is_some()) {
        colors.estimate = match presets.estimate {
            Some(preset) => preset,
            None => prompt::ask_color("estimates")?,
        };
    }

    Ok(colors)
}

fn write_pretty(summary: &ImportSummary, w: &mut dyn Write) -> std::io::Result<()> {
    let heading = if summary.dry_run {
        "Import dry run"
    } else {
        "Import finished"
    };
    pretty_section(w, heading)?;
    pretty_kv(w, "Project", summary.project_id.to_string())?;
    pretty_kv(w, "Board", &summary.board_id)?;
    if let Some(wiped) = &summary.wiped {
        pretty_kv(w, "Cards wiped", wiped.cards_deleted.to_string())?;
    }

    let report = &summary.report;
    pretty_kv(
        w,
        "Stories",
        format!(
            "{} seen, {} skipped, {} resumed past",
            report.stories_seen, report.stories_skipped, report.stories_resumed_past
        ),
    )?;
    pretty_kv(
        w,
        "Cards",
        format!(
            "{} created, {} reused, {} moved, {} repositioned",
            report.cards_created, report.cards_reused, report.cards_moved, report.cards_repositioned
        ),
    )?;
    pretty_kv(w, "Comments added", report.comments_added.to_string())?;
    pretty_kv(
        w,
        "Checklists",
        format!(
            "{} created, {} items added",
            report.checklists_created, report.check_items_added
        ),
    )?;
    pretty_kv(
        w,
        "Labels",
        format!(
            "{} created, {} attached",
            report.labels_created, report.labels_attached
        ),
    )?;
    pretty_kv(
        w,
        "Members",
        format!(
            "{} added, {} removed",
            report.members_added, report.members_removed
        ),
    )?;
    pretty_kv(
        w,
        "Untouched cards",
        format!(
            "{} ({} deleted, {} kept)",
            summary.untouched,
            summary.disposition.deleted.len(),
            summary.disposition.kept
        ),
    )?;

    if !summary.planned.is_empty() {
        pretty_rule(w)?;
        writeln!(w, "Planned changes ({}):", summary.planned.len())?;
        for change in &summary.planned {
            writeln!(w, "  {change}")?;
        }
    }
    Ok(())
}

fn write_text(summary: &ImportSummary, w: &mut dyn Write) -> std::io::Result<()> {
    let report = &summary.report;
    let rows = [
        ("stories_seen", report.stories_seen),
        ("stories_skipped", report.stories_skipped),
        ("cards_created", report.cards_created),
        ("cards_moved", report.cards_moved),
        ("cards_repositioned", report.cards_repositioned),
        ("mutations", report.mutations()),
        ("untouched", summary.untouched),
        ("deleted", summary.disposition.deleted.len()),
    ];
    for (key, value) in rows {
        writeln!(w, "{key}\t{value}")?;
    }
    for change in &summary.planned {
        writeln!(w, "planned\t{change}")?;
    }
    Ok(())
}
