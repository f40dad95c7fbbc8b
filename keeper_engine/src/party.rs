//! Named hero parties.
//!
//! Parties are declared with `CREATE_PARTY` while the script loads and filled
//! by `ADD_TO_PARTY`, possibly from deferred triggers. `ADD_PARTY_TO_LEVEL`
//! spawns a snapshot of the members at that moment.

use keeper_data::HeroObjective;
use serde::Serialize;

use crate::diagnostic::{CapacityError, ProcessError, ScriptError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartyMember {
    pub creature: u16,
    pub level: u8,
    pub gold: i64,
    pub objective: HeroObjective,
    /// Turns the member waits before pursuing its objective.
    pub countdown: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Party {
    pub name: String,
    pub members: Vec<PartyMember>,
}

#[derive(Debug, Clone)]
pub struct PartyTable {
    parties: Vec<Party>,
    max_parties: usize,
    max_members: usize,
}

impl PartyTable {
    pub fn new(max_parties: usize, max_members: usize) -> Self {
        Self {
            parties: Vec::new(),
            max_parties,
            max_members,
        }
    }

    /// Declare a new, empty party.
    ///
    /// # Errors
    /// Duplicate names and a full table are refused.
    pub fn create(&mut self, name: &str) -> Result<u8, ScriptError> {
        if self.find(name).is_some() {
            return Err(ScriptError::Invalid(format!("party '{name}' already exists")));
        }
        let limit = CapacityError {
            what: "parties",
            limit: self.max_parties,
        };
        if self.parties.len() >= self.max_parties {
            return Err(limit.into());
        }
        let id = u8::try_from(self.parties.len()).map_err(|_| limit)?;
        self.parties.push(Party {
            name: name.to_string(),
            members: Vec::new(),
        });
        Ok(id)
    }

    pub fn find(&self, name: &str) -> Option<u8> {
        self.parties
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))
            .and_then(|idx| u8::try_from(idx).ok())
    }

    pub fn get(&self, id: u8) -> Option<&Party> {
        self.parties.get(usize::from(id))
    }

    /// # Errors
    /// Unknown party id or a full party.
    pub fn add_member(&mut self, id: u8, member: PartyMember) -> Result<(), ProcessError> {
        let max_members = self.max_members;
        let party = self
            .parties
            .get_mut(usize::from(id))
            .ok_or_else(|| ProcessError::Unresolved(format!("party #{id}")))?;
        if party.members.len() >= max_members {
            return Err(CapacityError {
                what: "party members",
                limit: max_members,
            }
            .into());
        }
        party.members.push(member);
        Ok(())
    }

    /// Remove the first member of the given kind and level. Returns whether one was found.
    pub fn remove_member(&mut self, id: u8, creature: u16, level: u8) -> bool {
        let Some(party) = self.parties.get_mut(usize::from(id)) else {
            return false;
        };
        match party
            .members
            .iter()
            .position(|m| m.creature == creature && m.level == level)
        {
            Some(idx) => {
                party.members.remove(idx);
                true
            },
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.parties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parties.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knight(level: u8) -> PartyMember {
        PartyMember {
            creature: 2,
            level,
            gold: 100,
            objective: HeroObjective::AttackDungeonHeart,
            countdown: 0,
        }
    }

    #[test]
    fn parties_are_found_ignoring_case() {
        let mut table = PartyTable::new(2, 2);
        let id = table.create("Landlord").unwrap();
        assert_eq!(table.find("LANDLORD"), Some(id));
        assert!(table.create("landlord").is_err());
    }

    #[test]
    fn table_and_party_capacity_are_enforced() {
        let mut table = PartyTable::new(1, 1);
        let id = table.create("A").unwrap();
        assert!(matches!(table.create("B"), Err(ScriptError::Capacity(_))));
        table.add_member(id, knight(1)).unwrap();
        assert!(matches!(table.add_member(id, knight(2)), Err(ProcessError::Capacity(_))));
        assert!(matches!(table.add_member(7, knight(2)), Err(ProcessError::Unresolved(_))));
    }

    #[test]
    fn members_are_removed_by_kind_and_level() {
        let mut table = PartyTable::new(1, 4);
        let id = table.create("A").unwrap();
        table.add_member(id, knight(3)).unwrap();
        table.add_member(id, knight(5)).unwrap();
        assert!(!table.remove_member(id, 2, 4));
        assert!(table.remove_member(id, 2, 5));
        assert_eq!(table.get(id).unwrap().members, vec![knight(3)]);
    }
}
