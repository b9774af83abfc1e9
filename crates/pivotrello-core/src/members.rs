//! Mapping Pivotal story owners onto Trello board members.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{BoardMember, Person, PersonId, Story, TrelloId};

/// Frozen owner -> member lookup for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerMembershipMap {
    members: BTreeMap<PersonId, Option<TrelloId>>,
}

impl OwnerMembershipMap {
    /// Ask `resolve` once per owner and freeze the answers.
    ///
    /// # Errors
    ///
    /// Propagates the first error `resolve` returns.
    pub fn build<E, F>(owners: &[Person], members: &[BoardMember], mut resolve: F) -> Result<Self, E>
    where
        F: FnMut(&Person, &[BoardMember]) -> Result<Option<TrelloId>, E>,
    {
        let mut map = BTreeMap::new();
        for owner in owners {
            if map.contains_key(&owner.id) {
                continue;
            }
            let member = resolve(owner, members)?;
            match &member {
                Some(id) => tracing::debug!(owner = %owner.name, member = %id, "owner mapped"),
                None => tracing::debug!(owner = %owner.name, "owner left unmapped"),
            }
            map.insert(owner.id, member);
        }
        Ok(Self { members: map })
    }

    /// Build from known pairs, skipping the prompt step.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (PersonId, Option<TrelloId>)>) -> Self {
        Self {
            members: pairs.into_iter().collect(),
        }
    }

    /// Member for an owner, `None` when unmapped or never seen.
    #[must_use]
    pub fn member_for(&self, owner: PersonId) -> Option<&str> {
        self.members.get(&owner).and_then(Option::as_deref)
    }

    /// Member ids a card for these owners should carry, in owner order.
    #[must_use]
    pub fn expected_members(&self, owner_ids: &[PersonId]) -> Vec<TrelloId> {
        let mut seen = BTreeSet::new();
        owner_ids
            .iter()
            .filter_map(|owner| self.member_for(*owner))
            .filter(|member| seen.insert(*member))
            .map(ToOwned::to_owned)
            .collect()
    }

    #[must_use]
    pub fn mapped_count(&self) -> usize {
        self.members.values().filter(|member| member.is_some()).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// The people who own at least one of `stories`, in first-seen order.
///
/// Owners missing from `people` (former project members) get a
/// placeholder name so they can still be mapped.
#[must_use]
pub fn distinct_owners(stories: &[Story], people: &[Person]) -> Vec<Person> {
    let by_id: BTreeMap<PersonId, &Person> = people.iter().map(|p| (p.id, p)).collect();
    let mut seen = BTreeSet::new();
    let mut owners = Vec::new();

    for owner_id in stories.iter().flat_map(|story| story.owner_ids.iter()) {
        if !seen.insert(*owner_id) {
            continue;
        }
        let person = by_id.get(owner_id).map_or_else(
            || Person {
                id: *owner_id,
                name: format!("person #{owner_id}"),
                username: None,
            },
            |person| (*person).clone(),
        );
        owners.push(person);
    }

    owners
}

/// Board member whose full name or username matches the person's.
#[must_use]
pub fn suggest_member<'a>(person: &Person, members: &'a [BoardMember]) -> Option<&'a BoardMember> {
    let name = person.name.trim();
    members.iter().find(|member| {
        member.full_name.trim().eq_ignore_ascii_case(name)
            || person
                .username
                .as_deref()
                .is_some_and(|username| member.username.eq_ignore_ascii_case(username.trim()))
    })
}
