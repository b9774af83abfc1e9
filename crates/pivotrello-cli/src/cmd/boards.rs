//! `boards` and `projects`: ids for scripted imports.

use std::io::Write;

use anyhow::Result;
use pivotrello_core::model::{BoardSummary, Project};
use pivotrello_core::remote::{DestinationBoard, SourceTracker};

use super::Context;
use crate::output::{pretty_section, render_mode};

pub fn run_boards(ctx: &Context) -> Result<()> {
    let mut trello = ctx.trello()?;
    let mut boards = ctx.retry().execute("list boards", || trello.boards())?;
    boards.sort_by(|a, b| a.name.cmp(&b.name));
    render_mode(
        ctx.output,
        &boards,
        |boards, w| write_boards_text(boards, w),
        |boards, w| write_boards_pretty(boards, w),
    )
}

pub fn run_projects(ctx: &Context) -> Result<()> {
    let mut pivotal = ctx.pivotal()?;
    let mut projects = ctx.retry().execute("list projects", || pivotal.projects())?;
    projects.sort_by(|a, b| a.name.cmp(&b.name));
    render_mode(
        ctx.output,
        &projects,
        |projects, w| write_projects_text(projects, w),
        |projects, w| write_projects_pretty(projects, w),
    )
}

fn write_boards_text(boards: &[BoardSummary], w: &mut dyn Write) -> std::io::Result<()> {
    for board in boards {
        writeln!(w, "{}\t{}", board.id, board.name)?;
    }
    Ok(())
}

fn write_boards_pretty(boards: &[BoardSummary], w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("Trello boards ({})", boards.len()))?;
    for board in boards {
        writeln!(w, "{:<26} {}", board.id, board.name)?;
    }
    Ok(())
}

fn write_projects_text(projects: &[Project], w: &mut dyn Write) -> std::io::Result<()> {
    for project in projects {
        writeln!(w, "{}\t{}", project.id, project.name)?;
    }
    Ok(())
}

fn write_projects_pretty(projects: &[Project], w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("Pivotal projects ({})", projects.len()))?;
    for project in projects {
        writeln!(w, "{:<10} {}", project.id, project.name)?;
    }
    Ok(())
}
