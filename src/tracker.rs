//! Per-advertising-set bookkeeping of the buffer the link layer is reading ("current") and the
//! buffer the host is assembling ("next").
//!
//! A record is created the first time a handle allocates data of a given type. Installing a
//! complete buffer retires the old current one; retired buffers stay allocated until the link
//! layer reports it no longer reads them, through [`AdvBufferTracker::release`]. While a record
//! holds a retired buffer, new assemblies are refused.

use heapless::Vec;

use crate::{
    arena::{ArenaId, BlockArena},
    config::NUM_ADV_SETS,
    error::AllocError,
};

/// The classes of data an advertising set carries. Each has its own records.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DataType {
    AdvData = 0,
    ScanRespData = 1,
    PeriodicAdvData = 2,
}

const NUM_DATA_TYPES: usize = 3;

/// Observable state of one (handle, data type) pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BufferState {
    /// Nothing allocated.
    Empty,
    /// A next buffer holds `len` bytes of fragments so far.
    Assembling { len: usize },
    /// A replaced buffer is waiting for the link layer to release it.
    PendingRelease,
    /// The link layer is reading a current buffer of `len` bytes.
    Active { len: usize },
}

/// Result of [`AdvBufferTracker::alloc`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reservation {
    /// A zero-length request: there's no buffer to write into.
    Empty,
    /// Write the new bytes into `id`, starting at `offset`.
    Buffer { id: ArenaId, offset: usize },
}

#[derive(Debug)]
struct AdvRecord {
    handle: u8,
    /// Replaced buffers the link layer may still be reading.
    retired: Vec<ArenaId, 2>,
    current: Option<ArenaId>,
    next: Option<ArenaId>,
}

impl AdvRecord {
    fn new(handle: u8) -> Self {
        Self {
            handle,
            retired: Vec::new(),
            current: None,
            next: None,
        }
    }
}

type Records = [Option<AdvRecord>; NUM_ADV_SETS];

/// Find the record for a handle, creating it in a free location if needed.
fn find_or_insert(records: &mut Records, handle: u8) -> Option<&mut AdvRecord> {
    let i = match records
        .iter()
        .position(|r| r.as_ref().is_some_and(|r| r.handle == handle))
    {
        Some(i) => i,
        None => {
            let i = records.iter().position(Option::is_none)?;
            records[i] = Some(AdvRecord::new(handle));
            i
        }
    };

    records[i].as_mut()
}

/// Owns the extended advertising arena, and the current/next records of every advertising set.
pub struct AdvBufferTracker {
    arena: BlockArena,
    records: [Records; NUM_DATA_TYPES],
}

impl AdvBufferTracker {
    pub const fn new() -> Self {
        Self {
            arena: BlockArena::new(),
            records: [const { [const { None }; NUM_ADV_SETS] }; NUM_DATA_TYPES],
        }
    }

    /// Forget every record, and free the whole arena.
    pub fn reset(&mut self) {
        self.arena.reset();
        for records in &mut self.records {
            for r in records.iter_mut() {
                *r = None;
            }
        }
    }

    pub fn arena(&self) -> &BlockArena {
        &self.arena
    }

    fn record(&self, handle: u8, ty: DataType) -> Option<&AdvRecord> {
        self.records[ty as usize]
            .iter()
            .flatten()
            .find(|r| r.handle == handle)
    }

    /// Reserve room for `len` new bytes of data.
    ///
    /// Without `extend`, any next buffer is discarded and a fresh one of `len` bytes is
    /// allocated; this is refused while a retired buffer is still held. With `extend`, the
    /// existing next buffer grows by `len` bytes, and is freed if it can't grow.
    pub fn alloc(
        &mut self,
        handle: u8,
        ty: DataType,
        len: usize,
        extend: bool,
    ) -> Result<Reservation, AllocError> {
        let Self { arena, records } = self;
        let Some(record) = find_or_insert(&mut records[ty as usize], handle) else {
            warn!("No free record for adv handle {}", handle);
            return Err(AllocError);
        };

        if !extend {
            if !record.retired.is_empty() {
                debug!("Adv handle {} still holds a retired buffer", handle);
                return Err(AllocError);
            }
            if let Some(next) = record.next.take() {
                arena.free(next);
            }
            if len == 0 {
                return Ok(Reservation::Empty);
            }
            let id = arena.alloc(len)?;
            record.next = Some(id);

            Ok(Reservation::Buffer { id, offset: 0 })
        } else {
            let id = record.next.ok_or(AllocError)?;
            let offset = arena.len(id);

            if arena.realloc(id, offset + len).is_err() {
                arena.free(id);
                record.next = None;
                return Err(AllocError);
            }

            Ok(Reservation::Buffer { id, offset })
        }
    }

    /// Copy `data` into a reserved buffer at `offset`.
    pub fn write(&mut self, id: ArenaId, offset: usize, data: &[u8]) {
        if let Some(dest) = self.arena.data_mut(id).get_mut(offset..offset + data.len()) {
            dest.copy_from_slice(data);
        }
    }

    /// The full contents of a buffer.
    pub fn data(&self, id: ArenaId) -> &[u8] {
        self.arena.data(id)
    }

    /// Free the current buffer immediately, without waiting for the link layer.
    pub fn free_current(&mut self, handle: u8, ty: DataType) {
        let Self { arena, records } = self;
        if let Some(r) = records[ty as usize].iter_mut().flatten().find(|r| r.handle == handle)
            && let Some(id) = r.current.take()
        {
            arena.free(id);
        }
    }

    /// Discard the buffer being assembled.
    pub fn free_next(&mut self, handle: u8, ty: DataType) {
        let Self { arena, records } = self;
        if let Some(r) = records[ty as usize].iter_mut().flatten().find(|r| r.handle == handle)
            && let Some(id) = r.next.take()
        {
            arena.free(id);
        }
    }

    /// The next buffer becomes current. Call after [`Self::deactivate_current`].
    pub fn activate_next(&mut self, handle: u8, ty: DataType) {
        if let Some(r) = self.records[ty as usize]
            .iter_mut()
            .flatten()
            .find(|r| r.handle == handle)
        {
            r.current = r.next.take();
        }
    }

    /// Retire the current buffer. It stays allocated until [`Self::release`] is called for it.
    pub fn deactivate_current(&mut self, handle: u8, ty: DataType) {
        let Self { arena, records } = self;
        let Some(r) = records[ty as usize].iter_mut().flatten().find(|r| r.handle == handle) else {
            return;
        };
        if let Some(id) = r.current.take()
            && r.retired.push(id).is_err()
        {
            // Can't track it any more; the link layer has stopped reading at least the oldest.
            warn!("Retired buffer list full for adv handle {}", handle);
            arena.free(r.retired.remove(0));
            let _ = r.retired.push(id);
        }
    }

    /// Whether a handle has a partially or fully assembled buffer that hasn't been installed.
    pub fn has_pending(&self, handle: u8, ty: DataType) -> bool {
        self.record(handle, ty).is_some_and(|r| r.next.is_some())
    }

    pub fn current(&self, handle: u8, ty: DataType) -> Option<ArenaId> {
        self.record(handle, ty)?.current
    }

    pub fn next(&self, handle: u8, ty: DataType) -> Option<ArenaId> {
        self.record(handle, ty)?.next
    }

    pub fn state(&self, handle: u8, ty: DataType) -> BufferState {
        let Some(r) = self.record(handle, ty) else {
            return BufferState::Empty;
        };

        if let Some(id) = r.next {
            BufferState::Assembling {
                len: self.arena.len(id),
            }
        } else if !r.retired.is_empty() {
            BufferState::PendingRelease
        } else if let Some(id) = r.current {
            BufferState::Active {
                len: self.arena.len(id),
            }
        } else {
            BufferState::Empty
        }
    }

    /// The link layer no longer reads `id`: free it.
    ///
    /// `id` is normally a retired buffer. If it's a current buffer instead, its advertising
    /// set was removed: every buffer of the record is freed and the record is dropped. The link
    /// layer reads none of them once the set is gone. Returns `false` if `id` isn't tracked.
    pub fn release(&mut self, id: ArenaId) -> bool {
        let Self { arena, records } = self;

        for records in records.iter_mut() {
            for slot in records.iter_mut() {
                let Some(r) = slot else {
                    continue;
                };
                if let Some(i) = r.retired.iter().position(|&old| old == id) {
                    r.retired.remove(i);
                    arena.free(id);
                    return true;
                }
                if r.current == Some(id) {
                    arena.free(id);
                    for &old in r.retired.iter() {
                        arena.free(old);
                    }
                    if let Some(next) = r.next.take() {
                        arena.free(next);
                    }
                    *slot = None;
                    return true;
                }
            }
        }

        false
    }
}

impl Default for AdvBufferTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: u8 = 3;

    fn buffer(r: Reservation) -> (ArenaId, usize) {
        match r {
            Reservation::Buffer { id, offset } => (id, offset),
            Reservation::Empty => panic!("expected a buffer"),
        }
    }

    #[test]
    fn fragments_accumulate_in_next() {
        let mut t = AdvBufferTracker::new();

        let (id, offset) = buffer(t.alloc(H, DataType::AdvData, 200, false).unwrap());
        assert_eq!(offset, 0);
        t.write(id, 0, &[0xAA; 200]);

        let (id2, offset) = buffer(t.alloc(H, DataType::AdvData, 100, true).unwrap());
        assert_eq!(id2, id);
        assert_eq!(offset, 200);
        t.write(id, offset, &[0xBB; 100]);

        assert_eq!(t.state(H, DataType::AdvData), BufferState::Assembling { len: 300 });
        let data = t.data(id);
        assert_eq!(data.len(), 300);
        assert!(data[..200].iter().all(|&b| b == 0xAA));
        assert!(data[200..].iter().all(|&b| b == 0xBB));
    }

    #[test]
    fn extend_without_next_fails() {
        let mut t = AdvBufferTracker::new();
        assert_eq!(t.alloc(H, DataType::AdvData, 10, true), Err(AllocError));
    }

    #[test]
    fn zero_length_fresh_alloc_has_no_buffer() {
        let mut t = AdvBufferTracker::new();
        t.alloc(H, DataType::ScanRespData, 5, false).unwrap();
        assert_eq!(
            t.alloc(H, DataType::ScanRespData, 0, false),
            Ok(Reservation::Empty)
        );
        // The stale next was discarded.
        assert!(!t.has_pending(H, DataType::ScanRespData));
        assert_eq!(t.arena().live(), 0);
    }

    #[test]
    fn swap_retires_current_until_released() {
        let mut t = AdvBufferTracker::new();
        let ty = DataType::AdvData;

        let (a, _) = buffer(t.alloc(H, ty, 10, false).unwrap());
        t.deactivate_current(H, ty);
        t.activate_next(H, ty);
        assert_eq!(t.current(H, ty), Some(a));
        assert_eq!(t.state(H, ty), BufferState::Active { len: 10 });

        let (b, _) = buffer(t.alloc(H, ty, 20, false).unwrap());
        t.deactivate_current(H, ty);
        t.activate_next(H, ty);
        assert_eq!(t.current(H, ty), Some(b));
        assert_eq!(t.state(H, ty), BufferState::PendingRelease);

        // No new assembly until the old buffer is released.
        assert_eq!(t.alloc(H, ty, 5, false), Err(AllocError));
        assert!(t.release(a));
        assert!(!t.arena().is_allocated(a));
        assert_eq!(t.state(H, ty), BufferState::Active { len: 20 });
        assert!(t.alloc(H, ty, 5, false).is_ok());
    }

    #[test]
    fn releasing_current_drops_the_record() {
        let mut t = AdvBufferTracker::new();
        let ty = DataType::PeriodicAdvData;

        let (a, _) = buffer(t.alloc(H, ty, 10, false).unwrap());
        t.activate_next(H, ty);
        assert!(t.release(a));
        assert_eq!(t.state(H, ty), BufferState::Empty);
        assert_eq!(t.current(H, ty), None);
        assert!(!t.release(a));
    }

    #[test]
    fn releasing_current_also_frees_retired() {
        let mut t = AdvBufferTracker::new();
        let ty = DataType::AdvData;

        let (a, _) = buffer(t.alloc(H, ty, 10, false).unwrap());
        t.activate_next(H, ty);
        let (b, _) = buffer(t.alloc(H, ty, 20, false).unwrap());
        t.deactivate_current(H, ty);
        t.activate_next(H, ty);
        assert_eq!(t.state(H, ty), BufferState::PendingRelease);

        // The set is removed; the link layer releases the current buffer first.
        assert!(t.release(b));
        assert_eq!(t.arena().live(), 0);
        assert_eq!(t.state(H, ty), BufferState::Empty);
        assert!(!t.release(a));
    }

    #[test]
    fn releasing_current_also_frees_next() {
        let mut t = AdvBufferTracker::new();
        let ty = DataType::ScanRespData;

        let (a, _) = buffer(t.alloc(H, ty, 10, false).unwrap());
        t.activate_next(H, ty);
        t.alloc(H, ty, 30, false).unwrap();
        assert!(t.has_pending(H, ty));

        assert!(t.release(a));
        assert_eq!(t.arena().live(), 0);
        assert!(!t.has_pending(H, ty));
    }

    #[test]
    fn records_are_limited_per_data_type() {
        let mut t = AdvBufferTracker::new();
        for h in 0..NUM_ADV_SETS as u8 {
            t.alloc(h, DataType::AdvData, 1, false).unwrap();
        }
        assert_eq!(t.alloc(0x20, DataType::AdvData, 1, false), Err(AllocError));
        // Other data types have their own records.
        assert!(t.alloc(0x20, DataType::ScanRespData, 1, false).is_ok());
    }

    #[test]
    fn failed_extend_frees_next() {
        let mut t = AdvBufferTracker::new();
        let ty = DataType::AdvData;
        t.alloc(H, ty, 100, false).unwrap();

        let cap = t.arena().capacity();
        assert_eq!(t.alloc(H, ty, cap, true), Err(AllocError));
        assert!(!t.has_pending(H, ty));
        assert_eq!(t.arena().live(), 0);
    }

    #[test]
    fn free_next_keeps_current() {
        let mut t = AdvBufferTracker::new();
        let ty = DataType::ScanRespData;
        let (a, _) = buffer(t.alloc(H, ty, 4, false).unwrap());
        t.activate_next(H, ty);
        t.alloc(H, ty, 8, false).unwrap();

        t.free_next(H, ty);
        assert_eq!(t.current(H, ty), Some(a));
        assert_eq!(t.next(H, ty), None);

        t.free_current(H, ty);
        assert_eq!(t.arena().live(), 0);
    }
}
