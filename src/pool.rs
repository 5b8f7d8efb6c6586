//! Fixed-size buffer pools.
//!
//! A pool is `N` slots of `SIZE` bytes plus an in-use bitmask. Slots are handed out in index
//! order, and identified by a [`SlotId`]; there is no reverse lookup by address. Used for legacy
//! advertising data, and for PAwR subevent and response data.

/// Index of a slot in a [`SlotPool`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotId(pub(crate) u8);

impl SlotId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Represents a pool of `N` statically-sized buffers. `N` must be 64 or less.
pub struct SlotPool<const N: usize, const SIZE: usize> {
    slots: [[u8; SIZE]; N],
    used: u64,
}

impl<const N: usize, const SIZE: usize> SlotPool<N, SIZE> {
    /// Create a pool with all slots free.
    pub const fn new() -> Self {
        const { assert!(N <= 64, "A slot pool tracks at most 64 buffers.") };

        Self {
            slots: [[0; SIZE]; N],
            used: 0,
        }
    }

    /// Mark every slot as free.
    pub fn reset(&mut self) {
        self.used = 0;
    }

    fn in_use(&self, i: usize) -> bool {
        self.used & (1 << i) != 0
    }

    /// Allocate the first free slot, or return `None` if the pool is exhausted.
    pub fn alloc(&mut self) -> Option<SlotId> {
        let i = (0..N).find(|&i| !self.in_use(i))?;
        self.used |= 1 << i;

        Some(SlotId(i as u8))
    }

    /// Mark a slot as free. Freeing a slot that's already free, or out of range, does nothing.
    pub fn free(&mut self, id: SlotId) {
        if id.index() < N {
            self.used &= !(1 << id.index());
        }
    }

    /// Number of slots currently free.
    pub fn num_available(&self) -> usize {
        (0..N).filter(|&i| !self.in_use(i)).count()
    }

    pub fn is_allocated(&self, id: SlotId) -> bool {
        id.index() < N && self.in_use(id.index())
    }

    /// The contents of a slot.
    pub fn buf(&self, id: SlotId) -> &[u8; SIZE] {
        &self.slots[id.index()]
    }

    pub fn buf_mut(&mut self, id: SlotId) -> &mut [u8; SIZE] {
        &mut self.slots[id.index()]
    }

    /// Allocate a slot and copy `data` into it. `None` if the pool is exhausted, or if `data`
    /// doesn't fit in a slot.
    pub fn alloc_with(&mut self, data: &[u8]) -> Option<SlotId> {
        if data.len() > SIZE {
            return None;
        }
        let id = self.alloc()?;
        self.slots[id.index()][..data.len()].copy_from_slice(data);

        Some(id)
    }
}

impl<const N: usize, const SIZE: usize> Default for SlotPool<N, SIZE> {
    fn default() -> Self {
        Self::new()
    }
}
