use crate::touch::error::TouchError;
use crate::touch::model::{Point, TouchId};

pub const DEFAULT_MAX_TOUCHES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Free,
    Active,
    /// Terminal for the current occupant; the slot can be reclaimed.
    Ended,
}

impl SlotState {
    pub fn is_reclaimable(self) -> bool {
        matches!(self, SlotState::Free | SlotState::Ended)
    }
}

/// Opaque reference to one occupancy of a slot.
///
/// The generation changes on every allocation, so a handle kept past `release`
/// never resolves to the slot's next occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotHandle {
    index: usize,
    generation: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TouchSlot {
    state: SlotState,
    touch_id: Option<TouchId>,
    position: Point,
    generation: u32,
}

impl TouchSlot {
    fn free() -> Self {
        Self {
            state: SlotState::Free,
            touch_id: None,
            position: Point::default(),
            generation: 0,
        }
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn touch_id(&self) -> Option<TouchId> {
        self.touch_id
    }

    pub fn position(&self) -> Point {
        self.position
    }

    fn is_active(&self) -> bool {
        self.state == SlotState::Active
    }
}

/// Fixed-capacity table of touch slots with linear lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchRegistry {
    slots: Vec<TouchSlot>,
}

impl Default for TouchRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_TOUCHES)
    }
}

impl TouchRegistry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![TouchSlot::free(); capacity.max(1)],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn allocate(&mut self, id: TouchId, position: Point) -> Result<SlotHandle, TouchError> {
        let capacity = self.capacity();
        let Some((index, slot)) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.state.is_reclaimable())
        else {
            return Err(TouchError::Capacity { id, capacity });
        };

        slot.generation = slot.generation.wrapping_add(1);
        slot.state = SlotState::Active;
        slot.touch_id = Some(id);
        slot.position = position;
        Ok(SlotHandle {
            index,
            generation: slot.generation,
        })
    }

    pub fn find(&self, id: TouchId) -> Option<SlotHandle> {
        self.slots
            .iter()
            .enumerate()
            .find(|(_, slot)| slot.is_active() && slot.touch_id == Some(id))
            .map(|(index, slot)| SlotHandle {
                index,
                generation: slot.generation,
            })
    }

    pub fn get(&self, handle: SlotHandle) -> Option<&TouchSlot> {
        self.slots
            .get(handle.index)
            .filter(|slot| slot.generation == handle.generation)
    }

    pub fn update(&mut self, handle: SlotHandle, position: Point) -> Result<(), TouchError> {
        let slot = self.active_slot_mut(handle)?;
        slot.position = position;
        Ok(())
    }

    pub fn release(&mut self, handle: SlotHandle, position: Point) -> Result<(), TouchError> {
        let slot = self.active_slot_mut(handle)?;
        slot.position = position;
        slot.state = SlotState::Ended;
        Ok(())
    }

    /// Ends every active slot in place. Returns how many were released.
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;
        for slot in self.slots.iter_mut().filter(|slot| slot.is_active()) {
            slot.state = SlotState::Ended;
            released += 1;
        }
        released
    }

    pub fn active(&self) -> impl Iterator<Item = (SlotHandle, &TouchSlot)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_active())
            .map(|(index, slot)| {
                (
                    SlotHandle {
                        index,
                        generation: slot.generation,
                    },
                    slot,
                )
            })
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_active()).count()
    }

    fn active_slot_mut(&mut self, handle: SlotHandle) -> Result<&mut TouchSlot, TouchError> {
        self.slots
            .get_mut(handle.index)
            .filter(|slot| slot.generation == handle.generation && slot.is_active())
            .ok_or(TouchError::StaleHandle)
    }

    #[cfg(test)]
    pub(crate) fn slot_index(handle: SlotHandle) -> usize {
        handle.index
    }
}
