//! Deferred command triggers.
//!
//! A command compiled under an `IF` block, or marked reusable, is not run
//! while the script loads. It becomes a [`Trigger`]: the encoded value plus
//! the gate that releases it. The queue is append-only and keeps creation
//! order, which is also firing order.

use keeper_data::PlayerRange;
use serde::Serialize;

use crate::condition::ConditionRef;
use crate::diagnostic::CapacityError;
use crate::registry::CommandId;
use crate::value::EncodedValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TriggerState {
    Armed,
    Retired,
}

#[derive(Debug, Clone)]
pub struct Trigger {
    pub command: CommandId,
    pub value: EncodedValue,
    /// Players the command acts on.
    pub players: PlayerRange,
    pub condition: ConditionRef,
    /// Re-arms after firing instead of retiring.
    pub reusable: bool,
    pub state: TriggerState,
    /// Script line the trigger was compiled from.
    pub line: usize,
    pub fired: u32,
}

impl Trigger {
    pub fn new(
        command: CommandId,
        value: EncodedValue,
        players: PlayerRange,
        condition: ConditionRef,
        reusable: bool,
        line: usize,
    ) -> Self {
        Self {
            command,
            value,
            players,
            condition,
            reusable,
            state: TriggerState::Armed,
            line,
            fired: 0,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state == TriggerState::Armed
    }

    /// Record one firing; one-shot triggers retire.
    pub fn fire(&mut self) {
        self.fired += 1;
        if !self.reusable {
            self.state = TriggerState::Retired;
        }
    }
}

#[derive(Debug, Clone)]
pub struct TriggerQueue {
    triggers: Vec<Trigger>,
    capacity: usize,
}

impl TriggerQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            triggers: Vec::new(),
            capacity,
        }
    }

    /// Add a trigger at the end of the queue. Returns its index.
    ///
    /// # Errors
    /// [`CapacityError`] once the queue holds `capacity` triggers.
    pub fn append(&mut self, trigger: Trigger) -> Result<usize, CapacityError> {
        if self.triggers.len() >= self.capacity {
            return Err(CapacityError {
                what: "triggers",
                limit: self.capacity,
            });
        }
        self.triggers.push(trigger);
        Ok(self.triggers.len() - 1)
    }

    /// Visit armed triggers in creation order.
    pub fn for_each_active(&mut self, mut f: impl FnMut(usize, &mut Trigger)) {
        for (index, trigger) in self.triggers.iter_mut().enumerate() {
            if trigger.is_armed() {
                f(index, trigger);
            }
        }
    }

    pub fn get(&self, index: usize) -> Option<&Trigger> {
        self.triggers.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Trigger> {
        self.triggers.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trigger> {
        self.triggers.iter()
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.triggers.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Triggers still waiting to fire.
    pub fn armed(&self) -> usize {
        self.triggers.iter().filter(|t| t.is_armed()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{HideValue, Payload};

    fn trigger(reusable: bool) -> Trigger {
        Trigger::new(
            CommandId(0),
            HideValue.wrap(),
            PlayerRange::all(),
            ConditionRef::Index(0),
            reusable,
            1,
        )
    }

    #[test]
    fn one_shot_triggers_retire() {
        let mut queue = TriggerQueue::new(4);
        queue.append(trigger(false)).unwrap();
        queue.append(trigger(true)).unwrap();
        for _ in 0..3 {
            queue.for_each_active(|_, t| t.fire());
        }
        assert_eq!(queue.get(0).unwrap().fired, 1);
        assert_eq!(queue.get(1).unwrap().fired, 3);
        assert_eq!(queue.armed(), 1);
    }

    #[test]
    fn append_beyond_capacity_fails() {
        let mut queue = TriggerQueue::new(1);
        assert_eq!(queue.append(trigger(false)), Ok(0));
        let err = queue.append(trigger(false)).unwrap_err();
        assert_eq!(err.to_string(), "too many triggers (limit 1)");
        assert_eq!(queue.len(), 1);
        assert!(queue.is_full());
    }

    #[test]
    fn visits_follow_creation_order() {
        let mut queue = TriggerQueue::new(3);
        for line in 1..=3 {
            let mut t = trigger(true);
            t.line = line;
            queue.append(t).unwrap();
        }
        let mut seen = Vec::new();
        queue.for_each_active(|_, t| seen.push(t.line));
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
