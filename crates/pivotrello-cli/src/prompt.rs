//! Interactive questions asked during an import.
//!
//! Choice lists are built by plain functions so their order and wording
//! can be tested without a terminal; the `ask_*` functions only hand them
//! to dialoguer.

use std::collections::HashMap;
use std::io::IsTerminal;

use dialoguer::{Confirm, Select};
use pivotrello_core::error::SyncError;
use pivotrello_core::model::{BoardList, BoardMember, Card, LabelColor, Person, TrelloId};
use pivotrello_core::untouched::{Disposition, ReviewDecision, UntouchedReviewer};

pub const SKIP_LIST: &str = "[don't import these stories]";
pub const SKIP_LABEL: &str = "[do not create this label]";
pub const SKIP_MEMBER: &str = "[leave unassigned]";

/// Both stdin and stderr are terminals; dialoguer draws on stderr.
pub fn is_interactive_terminal() -> bool {
    std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
}

pub fn require_interactive(reason: &str) -> Result<(), SyncError> {
    if is_interactive_terminal() {
        Ok(())
    } else {
        Err(SyncError::Interaction(format!(
            "{reason} needs an interactive terminal"
        )))
    }
}

fn interaction(err: dialoguer::Error) -> SyncError {
    SyncError::Interaction(err.to_string())
}

fn select(prompt: &str, items: &[String], default: usize) -> Result<usize, SyncError> {
    Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(default)
        .interact()
        .map_err(interaction)
}

fn confirm(prompt: &str, default: bool) -> Result<bool, SyncError> {
    Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(interaction)
}

/// Lists sorted by name, then the "don't import" entry.
pub fn list_choices(lists: &[BoardList]) -> Vec<(String, Option<TrelloId>)> {
    let mut choices: Vec<(String, Option<TrelloId>)> = lists
        .iter()
        .map(|list| (list.name.clone(), Some(list.id.clone())))
        .collect();
    choices.sort_by(|a, b| a.0.cmp(&b.0));
    choices.push((SKIP_LIST.to_string(), None));
    choices
}

pub fn color_choices() -> Vec<(String, Option<LabelColor>)> {
    LabelColor::ALL
        .into_iter()
        .map(|color| (color.to_string(), Some(color)))
        .chain(std::iter::once((SKIP_LABEL.to_string(), None)))
        .collect()
}

/// Board members by name plus "unassigned", with the index to preselect.
pub fn member_choices(
    person: &Person,
    members: &[BoardMember],
) -> (Vec<(String, Option<TrelloId>)>, usize) {
    let mut choices: Vec<(String, Option<TrelloId>)> = members
        .iter()
        .map(|member| {
            let label = if member.username.is_empty() {
                member.full_name.clone()
            } else {
                format!("{} (@{})", member.full_name, member.username)
            };
            (label, Some(member.id.clone()))
        })
        .collect();
    choices.push((SKIP_MEMBER.to_string(), None));

    let suggested = pivotrello_core::members::suggest_member(person, members)
        .and_then(|found| members.iter().position(|member| member.id == found.id))
        .unwrap_or(choices.len() - 1);
    (choices, suggested)
}

/// Card summary shown when reviewing untouched cards.
pub fn describe_card(card: &Card, list_name: Option<&str>) -> String {
    let mut text = format!("Name:        {}\n", card.name);
    if !card.desc.trim().is_empty() {
        text.push_str(&format!("Description: {}\n", card.desc.trim()));
    }
    text.push_str(&format!("List:        {}\n", list_name.unwrap_or(&card.list_id)));
    if let Some(url) = &card.url {
        text.push_str(&format!("URL:         {url}\n"));
    }
    text
}

fn labels<T>(choices: &[(String, T)]) -> Vec<String> {
    choices.iter().map(|(label, _)| label.clone()).collect()
}

pub fn ask_project(projects: &[(u64, String)]) -> Result<u64, SyncError> {
    let items: Vec<String> = projects
        .iter()
        .map(|(id, name)| format!("{name} ({id})"))
        .collect();
    let index = select("Which Pivotal project would you like to import?", &items, 0)?;
    projects
        .get(index)
        .map(|(id, _)| *id)
        .ok_or_else(|| SyncError::Interaction("no project selected".into()))
}

pub fn ask_board(boards: &[(TrelloId, String)]) -> Result<TrelloId, SyncError> {
    let items: Vec<String> = boards.iter().map(|(_, name)| name.clone()).collect();
    let index = select("Which Trello board would you like to import into?", &items, 0)?;
    boards
        .get(index)
        .map(|(id, _)| id.clone())
        .ok_or_else(|| SyncError::Interaction("no board selected".into()))
}

/// `subject` is e.g. "icebox" or "unstarted bug".
pub fn ask_list(subject: &str, lists: &[BoardList]) -> Result<Option<TrelloId>, SyncError> {
    let choices = list_choices(lists);
    let index = select(
        &format!("Which Trello list would you like to put {subject} stories in?"),
        &labels(&choices),
        0,
    )?;
    Ok(choices.into_iter().nth(index).and_then(|(_, id)| id))
}

pub fn ask_color(subject: &str) -> Result<Option<LabelColor>, SyncError> {
    let choices = color_choices();
    let index = select(
        &format!("What color would you like to label {subject} with?"),
        &labels(&choices),
        0,
    )?;
    Ok(choices.into_iter().nth(index).and_then(|(_, color)| color))
}

pub fn ask_member(person: &Person, members: &[BoardMember]) -> Result<Option<TrelloId>, SyncError> {
    let (choices, suggested) = member_choices(person, members);
    let index = select(
        &format!("Which Trello member should own cards for {}?", person.name),
        &labels(&choices),
        suggested,
    )?;
    Ok(choices.into_iter().nth(index).and_then(|(_, id)| id))
}

pub fn ask_wipe(card_count: usize) -> Result<bool, SyncError> {
    let items = vec![
        "No, do not delete any Trello cards".to_string(),
        format!("Yes, DELETE EVERY CARD ({card_count}) in the Trello board before beginning the import"),
    ];
    let index = select("Do you want to delete all cards on the board first?", &items, 0)?;
    if index == 0 {
        return Ok(false);
    }
    confirm(
        &format!("Really delete {card_count} card(s)? This cannot be undone"),
        false,
    )
}

pub fn ask_proceed_with_duplicates(group_count: usize) -> Result<bool, SyncError> {
    confirm(
        &format!(
            "{group_count} story name(s) already have duplicate cards; the last of each will be updated. Continue?"
        ),
        false,
    )
}

pub fn ask_confirm(prompt: &str) -> Result<bool, SyncError> {
    confirm(prompt, false)
}

/// Reviews untouched cards on the terminal.
pub struct TerminalReviewer {
    list_names: HashMap<TrelloId, String>,
}

impl TerminalReviewer {
    pub fn new(lists: &[BoardList]) -> Self {
        Self {
            list_names: lists
                .iter()
                .map(|list| (list.id.clone(), list.name.clone()))
                .collect(),
        }
    }
}

impl UntouchedReviewer for TerminalReviewer {
    fn choose_disposition(&mut self, cards: &[Card]) -> Result<Disposition, SyncError> {
        let items = vec![
            "Keep them all".to_string(),
            "Review them one by one".to_string(),
            "Delete them all".to_string(),
        ];
        let index = select(
            &format!(
                "{} card(s) on the board do not match any imported story. What should happen to them?",
                cards.len()
            ),
            &items,
            0,
        )?;
        Ok(match index {
            1 => Disposition::ReviewEach,
            2 => Disposition::DeleteAll,
            _ => Disposition::KeepAll,
        })
    }

    fn confirm_delete_all(&mut self, count: usize) -> Result<bool, SyncError> {
        confirm(&format!("Really delete {count} card(s)?"), false)
    }

    fn review(&mut self, card: &Card) -> Result<ReviewDecision, SyncError> {
        let list_name = self.list_names.get(&card.list_id).map(String::as_str);
        eprintln!("\n{}", describe_card(card, list_name));
        let items = vec![
            "Keep".to_string(),
            "Delete".to_string(),
            "Keep this and all remaining cards".to_string(),
        ];
        let index = select("Delete this card?", &items, 0)?;
        Ok(match index {
            1 => ReviewDecision::Delete,
            2 => ReviewDecision::Quit,
            _ => ReviewDecision::Keep,
        })
    }
}
