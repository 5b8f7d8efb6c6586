//! Block arena for extended advertising data.
//!
//! Extended and periodic advertising data are variable length, and grow fragment by fragment,
//! so they don't fit the fixed slots of [`crate::pool`]. The arena is a static byte array split
//! into equally sized blocks. An allocation is a contiguous run of blocks, chosen best-fit.
//! Growing an allocation extends it in place when the blocks that follow it are free, and
//! otherwise moves it to a new run. The [`ArenaId`] of an allocation stays the same when it
//! moves.

use crate::{
    config::{ADV_ARENA_BLOCK_SIZE, ADV_ARENA_BLOCKS, ADV_ARENA_EXTENTS},
    error::AllocError,
};

/// Handle to an allocation in a [`BlockArena`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ArenaId(pub(crate) u8);

impl ArenaId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug)]
struct Extent {
    /// First block.
    start: usize,
    /// Number of blocks reserved.
    blocks: usize,
    /// Number of bytes requested.
    len: usize,
}

impl Extent {
    fn byte_range(&self) -> core::ops::Range<usize> {
        let start = self.start * ADV_ARENA_BLOCK_SIZE;
        start..start + self.len
    }
}

fn blocks_for(len: usize) -> usize {
    len.div_ceil(ADV_ARENA_BLOCK_SIZE).max(1)
}

/// Represents the advertising data arena: `BLOCKS` blocks of [`ADV_ARENA_BLOCK_SIZE`] bytes,
/// with at most `EXTENTS` live allocations.
pub struct BlockArena<const BLOCKS: usize = ADV_ARENA_BLOCKS, const EXTENTS: usize = ADV_ARENA_EXTENTS> {
    storage: [[u8; ADV_ARENA_BLOCK_SIZE]; BLOCKS],
    used: [bool; BLOCKS],
    extents: [Option<Extent>; EXTENTS],
}

impl<const BLOCKS: usize, const EXTENTS: usize> BlockArena<BLOCKS, EXTENTS> {
    pub const fn new() -> Self {
        const { assert!(EXTENTS <= 256, "Arena IDs are one byte.") };

        Self {
            storage: [[0; ADV_ARENA_BLOCK_SIZE]; BLOCKS],
            used: [false; BLOCKS],
            extents: [None; EXTENTS],
        }
    }

    /// Free every allocation.
    pub fn reset(&mut self) {
        self.used = [false; BLOCKS];
        self.extents = [None; EXTENTS];
    }

    /// Total capacity in bytes.
    pub const fn capacity(&self) -> usize {
        BLOCKS * ADV_ARENA_BLOCK_SIZE
    }

    /// Number of blocks not currently allocated.
    pub fn free_blocks(&self) -> usize {
        self.used.iter().filter(|u| !**u).count()
    }

    /// Number of live allocations.
    pub fn live(&self) -> usize {
        self.extents.iter().filter(|e| e.is_some()).count()
    }

    fn extent(&self, id: ArenaId) -> Option<&Extent> {
        self.extents.get(id.index())?.as_ref()
    }

    /// Best fit: the smallest run of free blocks that holds `blocks` blocks.
    fn find_run(&self, blocks: usize) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        let mut i = 0;

        while i < BLOCKS {
            if self.used[i] {
                i += 1;
                continue;
            }
            let start = i;
            while i < BLOCKS && !self.used[i] {
                i += 1;
            }
            let run = i - start;
            if run >= blocks && best.is_none_or(|(_, b)| run < b) {
                best = Some((start, run));
            }
        }

        best.map(|(start, _)| start)
    }

    fn mark(&mut self, start: usize, blocks: usize, used: bool) {
        for u in &mut self.used[start..start + blocks] {
            *u = used;
        }
    }

    /// Allocate `len` bytes.
    pub fn alloc(&mut self, len: usize) -> Result<ArenaId, AllocError> {
        let slot = self
            .extents
            .iter()
            .position(|e| e.is_none())
            .ok_or(AllocError)?;

        let blocks = blocks_for(len);
        let start = self.find_run(blocks).ok_or(AllocError)?;

        self.mark(start, blocks, true);
        self.extents[slot] = Some(Extent { start, blocks, len });

        Ok(ArenaId(slot as u8))
    }

    /// Resize an allocation to `len` bytes, keeping its contents up to the smaller of the old
    /// and new lengths. On failure, the allocation is left untouched.
    pub fn realloc(&mut self, id: ArenaId, len: usize) -> Result<(), AllocError> {
        let ext = *self.extent(id).ok_or(AllocError)?;
        let needed = blocks_for(len);

        let start = if needed <= ext.blocks {
            // Shrink, and give back the tail.
            self.mark(ext.start + needed, ext.blocks - needed, false);
            ext.start
        } else if ext.start + needed <= BLOCKS
            && self.used[ext.start + ext.blocks..ext.start + needed]
                .iter()
                .all(|u| !*u)
        {
            // Grow in place.
            self.mark(ext.start + ext.blocks, needed - ext.blocks, true);
            ext.start
        } else {
            let start = self.find_run(needed).ok_or(AllocError)?;
            trace!("Moving {} arena blocks from {} to {}", ext.blocks, ext.start, start);
            let from = ext.byte_range();
            self.storage
                .as_flattened_mut()
                .copy_within(from, start * ADV_ARENA_BLOCK_SIZE);
            self.mark(ext.start, ext.blocks, false);
            self.mark(start, needed, true);
            start
        };

        self.extents[id.index()] = Some(Extent {
            start,
            blocks: needed,
            len,
        });

        Ok(())
    }

    /// Free an allocation. Unknown or already freed IDs are ignored.
    pub fn free(&mut self, id: ArenaId) {
        if let Some(ext) = self.extents.get_mut(id.index()).and_then(Option::take) {
            self.mark(ext.start, ext.blocks, false);
        }
    }

    pub fn is_allocated(&self, id: ArenaId) -> bool {
        self.extent(id).is_some()
    }

    /// Length in bytes of an allocation; 0 if it's not allocated.
    pub fn len(&self, id: ArenaId) -> usize {
        self.extent(id).map(|e| e.len).unwrap_or(0)
    }

    /// Contents of an allocation; empty if it's not allocated.
    pub fn data(&self, id: ArenaId) -> &[u8] {
        match self.extent(id) {
            Some(ext) => &self.storage.as_flattened()[ext.byte_range()],
            None => &[],
        }
    }

    pub fn data_mut(&mut self, id: ArenaId) -> &mut [u8] {
        match self.extents.get(id.index()).copied().flatten() {
            Some(ext) => &mut self.storage.as_flattened_mut()[ext.byte_range()],
            None => &mut [],
        }
    }
}

impl<const BLOCKS: usize, const EXTENTS: usize> Default for BlockArena<BLOCKS, EXTENTS> {
    fn default() -> Self {
        Self::new()
    }
}
