//! Fixed-capacity task registry
//!
//! An arena of descriptor slots with in-use flags: no allocation, slot
//! reuse only after explicit removal, and linear lookup by kernel identity
//! (capacities are small by design). Deadline recovery recreates a task in
//! its existing slot, so slot indices are stable across recreation.

use cadence_core::{KernelTaskId, SchedError, SchedResult, SlotIndex};

use crate::task::TaskDescriptor;

/// Opaque handle to a registered periodic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle(SlotIndex);

impl TaskHandle {
    pub(crate) const fn new(slot: SlotIndex) -> Self {
        Self(slot)
    }

    /// The registry slot this handle refers to
    pub const fn slot(self) -> SlotIndex {
        self.0
    }
}

/// Fixed-capacity store of task descriptors.
pub struct Registry<const N: usize> {
    slots: [TaskDescriptor; N],
    active: usize,
}

impl<const N: usize> Registry<N> {
    /// Create an empty registry
    pub const fn new() -> Self {
        Self {
            slots: [TaskDescriptor::EMPTY; N],
            active: 0,
        }
    }

    /// Reset every slot to vacant
    pub fn reset(&mut self) {
        self.slots = [TaskDescriptor::EMPTY; N];
        self.active = 0;
    }

    /// Store a descriptor in an unused slot.
    ///
    /// Fails with `CapacityExceeded` and no side effects when full.
    pub fn insert(&mut self, descriptor: TaskDescriptor) -> SchedResult<SlotIndex> {
        let Some(free) = self.slots.iter().position(|slot| !slot.in_use) else {
            return Err(SchedError::CapacityExceeded);
        };
        self.slots[free] = descriptor;
        self.active += 1;
        Ok(SlotIndex::new(free as u8))
    }

    /// Mark a slot free.
    ///
    /// Fails with `InvalidHandle` if the slot is not in use.
    pub fn remove(&mut self, slot: SlotIndex) -> SchedResult<()> {
        let descriptor = self
            .slots
            .get_mut(slot.index())
            .ok_or(SchedError::InvalidHandle)?;
        if !descriptor.in_use {
            return Err(SchedError::InvalidHandle);
        }
        *descriptor = TaskDescriptor::EMPTY;
        self.active -= 1;
        Ok(())
    }

    /// Linear scan for the slot owning the given kernel identity
    pub fn find_by_identity(&self, id: KernelTaskId) -> Option<SlotIndex> {
        self.slots
            .iter()
            .position(|slot| slot.in_use && slot.kernel_id == Some(id))
            .map(|index| SlotIndex::new(index as u8))
    }

    /// Borrow a slot's descriptor; the slot index must be in range
    pub fn slot(&self, slot: SlotIndex) -> &TaskDescriptor {
        &self.slots[slot.index()]
    }

    /// Mutably borrow a slot's descriptor; the slot index must be in range
    pub fn slot_mut(&mut self, slot: SlotIndex) -> &mut TaskDescriptor {
        &mut self.slots[slot.index()]
    }

    /// Borrow a slot's descriptor if the index is in range
    pub fn slot_checked_mut(&mut self, slot: SlotIndex) -> Option<&mut TaskDescriptor> {
        self.slots.get_mut(slot.index())
    }

    /// Iterate over in-use slots
    pub fn iter_in_use(&self) -> impl Iterator<Item = (SlotIndex, &TaskDescriptor)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, descriptor)| descriptor.in_use)
            .map(|(index, descriptor)| (SlotIndex::new(index as u8), descriptor))
    }

    /// Iterate mutably over in-use slots
    pub fn iter_in_use_mut(&mut self) -> impl Iterator<Item = (SlotIndex, &mut TaskDescriptor)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter(|(_, descriptor)| descriptor.in_use)
            .map(|(index, descriptor)| (SlotIndex::new(index as u8), descriptor))
    }

    /// Number of in-use slots
    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Total slot capacity
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for Registry<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{JobBinding, TaskConfig};
    use cadence_core::Duration;

    fn descriptor(name: &'static str) -> TaskDescriptor {
        TaskDescriptor::from_config(
            JobBinding::Unbound,
            &TaskConfig::new(name, Duration::from_ticks(10)),
            false,
        )
    }

    #[test]
    fn insert_until_full_then_reject() {
        let mut registry: Registry<2> = Registry::new();

        registry.insert(descriptor("a")).unwrap();
        registry.insert(descriptor("b")).unwrap();
        assert_eq!(registry.active_count(), 2);

        assert_eq!(
            registry.insert(descriptor("c")),
            Err(SchedError::CapacityExceeded)
        );
        assert_eq!(registry.active_count(), 2);
    }

    #[test]
    fn removed_slot_is_reused() {
        let mut registry: Registry<2> = Registry::new();

        let first = registry.insert(descriptor("a")).unwrap();
        registry.insert(descriptor("b")).unwrap();

        registry.remove(first).unwrap();
        assert_eq!(registry.active_count(), 1);

        let reused = registry.insert(descriptor("c")).unwrap();
        assert_eq!(reused, first);
    }

    #[test]
    fn remove_free_slot_is_invalid() {
        let mut registry: Registry<2> = Registry::new();
        let slot = registry.insert(descriptor("a")).unwrap();
        registry.remove(slot).unwrap();

        assert_eq!(registry.remove(slot), Err(SchedError::InvalidHandle));
    }

    #[test]
    fn find_by_identity_scans_in_use_slots() {
        let mut registry: Registry<4> = Registry::new();
        let slot = registry.insert(descriptor("a")).unwrap();
        let other = registry.insert(descriptor("b")).unwrap();

        let id = KernelTaskId::new(7);
        registry.slot_mut(slot).kernel_id = Some(id);
        registry.slot_mut(other).kernel_id = Some(KernelTaskId::new(8));

        assert_eq!(registry.find_by_identity(id), Some(slot));
        assert_eq!(registry.find_by_identity(KernelTaskId::new(99)), None);
    }
}
