use std::io::Write;

use anyhow::Result;
use clap::Args;
use pivotrello_core::cache::BoardCache;
use pivotrello_core::error::SyncError;
use pivotrello_core::wipe::{WipeMode, WipeReport, wipe_board};
use tracing::info;

use super::Context;
use crate::output::{pretty_kv, pretty_section, render_mode};
use crate::{progress, prompt};

#[derive(Args, Debug)]
pub struct WipeArgs {
    /// Trello board id.
    #[arg(long)]
    pub board: String,

    /// Archive cards list by list instead of deleting them.
    #[arg(long)]
    pub archive: bool,

    /// Close every list afterwards.
    #[arg(long)]
    pub close_lists: bool,

    /// Do not ask for confirmation.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

impl WipeArgs {
    const fn mode(&self) -> WipeMode {
        if self.archive {
            WipeMode::Archive
        } else {
            WipeMode::Delete
        }
    }
}

pub fn run_wipe(args: &WipeArgs, ctx: &Context) -> Result<()> {
    let mut trello = ctx.trello()?;
    let retry = ctx.retry();
    let cache = BoardCache::load(&mut trello, &retry, &args.board)?;
    let cards = cache.existing_cards();

    if !args.yes {
        prompt::require_interactive("confirming a wipe (or pass --yes)")?;
        let verb = if args.archive { "Archive" } else { "Delete" };
        let question = format!(
            "{verb} {} card(s) on board {}{}?",
            cards.len(),
            args.board,
            if args.close_lists { " and close every list" } else { "" }
        );
        if !prompt::ask_confirm(&question)? {
            return Err(SyncError::Aborted("wipe declined".into()).into());
        }
    }

    let bar = progress::bar(
        cards.len(),
        "deleting",
        ctx.show_progress() && args.mode() == WipeMode::Delete,
    );
    let report = wipe_board(
        &mut trello,
        &retry,
        cache.lists(),
        cards,
        args.mode(),
        args.close_lists,
        |_| bar.inc(1),
    )?;
    bar.finish_and_clear();
    info!(board = %args.board, cards = report.cards_deleted, "board wiped");

    render_mode(
        ctx.output,
        &report,
        |report, w| write_text(report, w),
        |report, w| write_pretty(report, w),
    )
}

fn write_pretty(report: &WipeReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Board wiped")?;
    pretty_kv(w, "Cards deleted", report.cards_deleted.to_string())?;
    pretty_kv(w, "Lists archived", report.lists_archived.to_string())?;
    pretty_kv(w, "Lists closed", report.lists_closed.to_string())
}

fn write_text(report: &WipeReport, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "cards_deleted\t{}", report.cards_deleted)?;
    writeln!(w, "lists_archived\t{}", report.lists_archived)?;
    writeln!(w, "lists_closed\t{}", report.lists_closed)
}
