//! Cards that share an identity key.
//!
//! Two cards with the same name and description make lookup ambiguous: the
//! engine would keep updating one and leave the other behind. The import
//! reports them before touching the board so the operator can clean up.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::identity::IdentityKey;
use crate::model::Card;

/// Cards sharing one key, in board order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    pub key: IdentityKey,
    pub cards: Vec<Card>,
}

impl DuplicateGroup {
    /// Name shared by every card in the group.
    #[must_use]
    pub fn name(&self) -> &str {
        self.cards.first().map_or("", |card| card.name.as_str())
    }
}

/// Groups of more than one card, ordered by key.
#[must_use]
pub fn find_duplicates(cards: &[Card]) -> Vec<DuplicateGroup> {
    let mut groups: BTreeMap<IdentityKey, Vec<Card>> = BTreeMap::new();
    for card in cards {
        groups
            .entry(IdentityKey::new(&card.name, &card.desc))
            .or_default()
            .push(card.clone());
    }

    groups
        .into_iter()
        .filter(|(_, cards)| cards.len() > 1)
        .map(|(key, cards)| DuplicateGroup { key, cards })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: &str, name: &str, desc: &str) -> Card {
        Card {
            id: id.into(),
            name: name.into(),
            desc: desc.into(),
            list_id: "l1".into(),
            pos: 1.0,
            label_ids: Vec::new(),
            member_ids: Vec::new(),
            checklists: Vec::new(),
            comments: Vec::new(),
            url: None,
        }
    }

    #[test]
    fn distinct_cards_have_no_duplicates() {
        let cards = vec![card("1", "A", ""), card("2", "B", ""), card("3", "A", "x")];
        assert!(find_duplicates(&cards).is_empty());
    }

    #[test]
    fn groups_keep_board_order() {
        let cards = vec![
            card("1", "A", "d"),
            card("2", "B", ""),
            card("3", "A", "d"),
            card("4", "A", "d"),
        ];
        let groups = find_duplicates(&cards);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name(), "A");
        let ids: Vec<&str> = groups[0].cards.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "4"]);
    }

    #[test]
    fn groups_are_ordered_by_key() {
        let cards = vec![
            card("1", "A", ""),
            card("2", "B", ""),
            card("3", "B", ""),
            card("4", "A", ""),
        ];
        let groups = find_duplicates(&cards);
        assert_eq!(groups.len(), 2);
        assert!(groups[0].key < groups[1].key);
    }
}
