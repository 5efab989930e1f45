//! The bounded buffer: a fixed row of slots holding produced items.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::ProcessId;

/// An item placed in the buffer by a producer.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Item {
    /// Deterministic id of the form `item-<step>-<producer>`.
    pub id: String,
    pub produced_by: ProcessId,
    /// Step number at which the item was produced.
    pub timestamp: u64,
}

/// One buffer slot. `id` is the slot index; a slot is occupied iff it holds
/// an item.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Slot {
    pub id: usize,
    pub item: Option<Item>,
}

impl Slot {
    pub fn is_occupied(&self) -> bool {
        self.item.is_some()
    }
}

// Serialized with an explicit `occupied` flag; `item` only appears on
// occupied slots. This is the shape exported traces commit to.
impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if self.item.is_some() { 3 } else { 2 };
        let mut state = serializer.serialize_struct("Slot", fields)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("occupied", &self.is_occupied())?;
        if let Some(item) = &self.item {
            state.serialize_field("item", item)?;
        }
        state.end()
    }
}

/// Fixed-capacity slot storage. Slots are created unoccupied and never added
/// or removed after construction.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Buffer {
    slots: Vec<Slot>,
}

impl Buffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|id| Slot { id, item: None }).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_occupied()).count()
    }

    /// Lowest-indexed free slot. Ascending scan order keeps replay
    /// deterministic.
    pub fn first_free(&self) -> Option<usize> {
        self.slots.iter().position(|s| !s.is_occupied())
    }

    /// Lowest-indexed occupied slot.
    pub fn first_occupied(&self) -> Option<usize> {
        self.slots.iter().position(|s| s.is_occupied())
    }

    /// Put `item` into the slot at `index`, which must be free.
    pub fn place(&mut self, index: usize, item: Item) {
        let slot = &mut self.slots[index];
        assert!(slot.item.is_none(), "slot {index} is already occupied");
        slot.item = Some(item);
    }

    /// Remove and return the item in the slot at `index`.
    pub fn take(&mut self, index: usize) -> Option<Item> {
        self.slots[index].item.take()
    }
}
