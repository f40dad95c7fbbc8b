//! Script string arena.
//!
//! Message texts are interned once at load time and referenced from encoded
//! values through small `Copy` handles. The arena has a fixed byte budget; a
//! handle carries the generation of its slot, so a handle that outlived its
//! text (released or cleared) is detected instead of reading someone else's
//! string.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StringError {
    #[error("string pool full ({requested} bytes requested, {available} free)")]
    PoolFull { requested: usize, available: usize },
    #[error("stale string handle")]
    Stale,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StringArena {
    budget: usize,
    used: usize,
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl StringArena {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            used: 0,
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Bytes a string occupies, including its terminator.
    fn cost(text: &str) -> usize {
        text.len() + 1
    }

    /// Store a copy of `text`.
    ///
    /// # Errors
    /// [`StringError::PoolFull`] when the byte budget would be exceeded.
    pub fn intern(&mut self, text: &str) -> Result<StrHandle, StringError> {
        let requested = Self::cost(text);
        let available = self.budget.saturating_sub(self.used);
        if requested > available {
            return Err(StringError::PoolFull { requested, available });
        }
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.slots.len()).map_err(|_| StringError::PoolFull { requested, available })?;
                self.slots.push(Slot::default());
                index
            },
        };
        self.used += requested;
        let slot = &mut self.slots[index as usize];
        slot.text = Some(text.to_string());
        Ok(StrHandle {
            index,
            generation: slot.generation,
        })
    }

    /// # Errors
    /// [`StringError::Stale`] if the handle's text was released.
    pub fn get(&self, handle: StrHandle) -> Result<&str, StringError> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.text.as_deref())
            .ok_or(StringError::Stale)
    }

    /// Return a string's bytes to the pool. Existing copies of the handle become stale.
    ///
    /// # Errors
    /// [`StringError::Stale`] if the handle was already released.
    pub fn release(&mut self, handle: StrHandle) -> Result<(), StringError> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.text.is_some())
            .ok_or(StringError::Stale)?;
        if let Some(text) = slot.text.take() {
            self.used -= Self::cost(&text);
        }
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Ok(())
    }

    /// Drop every string; all outstanding handles become stale.
    pub fn clear(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            slot.text = None;
            slot.generation = slot.generation.wrapping_add(1);
            if let Ok(index) = u32::try_from(index) {
                self.free.push(index);
            }
        }
        self.used = 0;
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn budget(&self) -> usize {
        self.budget
    }
}
