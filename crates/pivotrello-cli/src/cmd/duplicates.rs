use std::io::Write;

use anyhow::Result;
use clap::Args;
use pivotrello_core::cache::BoardCache;
use pivotrello_core::duplicates::DuplicateGroup;
use pivotrello_core::error::ErrorCode;
use serde::Serialize;

use super::Context;
use crate::output::{pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct DuplicatesArgs {
    /// Trello board id.
    #[arg(long)]
    pub board: String,
}

/// Duplicate cards were found and nobody was there to approve going on.
#[derive(Debug, thiserror::Error)]
#[error("{groups} story name(s) have more than one card on the board")]
pub struct DuplicateCardsFound {
    pub groups: usize,
}

impl DuplicateCardsFound {
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::DuplicateCards
    }
}

#[derive(Debug, Serialize)]
struct DuplicateRow {
    name: String,
    key: String,
    cards: Vec<DuplicateCard>,
}

#[derive(Debug, Serialize)]
struct DuplicateCard {
    id: String,
    list: String,
    url: Option<String>,
}

fn rows(cache: &BoardCache, groups: &[DuplicateGroup]) -> Vec<DuplicateRow> {
    groups
        .iter()
        .map(|group| DuplicateRow {
            name: group.name().to_string(),
            key: group.key.short().to_string(),
            cards: group
                .cards
                .iter()
                .map(|card| DuplicateCard {
                    id: card.id.clone(),
                    list: cache
                        .list_name(&card.list_id)
                        .unwrap_or(&card.list_id)
                        .to_string(),
                    url: card.url.clone(),
                })
                .collect(),
        })
        .collect()
}

fn write_pretty(rows: &[DuplicateRow], w: &mut dyn Write) -> std::io::Result<()> {
    if rows.is_empty() {
        return writeln!(w, "No duplicate cards.");
    }
    pretty_section(w, &format!("Duplicate cards ({} group(s))", rows.len()))?;
    for row in rows {
        writeln!(w, "{}", row.name)?;
        for card in &row.cards {
            pretty_kv(w, &format!("  {}", card.list), card.url.as_deref().unwrap_or(&card.id))?;
        }
    }
    Ok(())
}

fn write_text(rows: &[DuplicateRow], w: &mut dyn Write) -> std::io::Result<()> {
    for row in rows {
        for card in &row.cards {
            writeln!(w, "{}\t{}\t{}\t{}", row.key, card.id, card.list, row.name)?;
        }
    }
    Ok(())
}

/// Print duplicate groups for an already-loaded board.
pub fn print_groups(ctx: &Context, cache: &BoardCache, groups: &[DuplicateGroup]) -> Result<()> {
    let rows = rows(cache, groups);
    render_mode(
        ctx.output,
        &rows,
        |rows, w| write_text(rows, w),
        |rows, w| write_pretty(rows, w),
    )
}

pub fn run_duplicates(args: &DuplicatesArgs, ctx: &Context) -> Result<()> {
    let mut trello = ctx.trello()?;
    let retry = ctx.retry();
    let cache = BoardCache::load(&mut trello, &retry, &args.board)?;
    let groups = cache.duplicates();
    print_groups(ctx, &cache, &groups)
}
