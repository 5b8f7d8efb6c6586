//! Compile-time sizing of the advertising buffers, and the runtime capability tag.
//!
//! The constants here match the values the BLE stack library is built with; changing them
//! without rebuilding the stack with matching values is not supported.

use cfg_if::cfg_if;

/// Number of advertising sets the controller is configured for.
pub const NUM_ADV_SETS: usize = 2;

/// Handle used internally for the legacy (`HCI_LE_Set_Advertising_Data`) advertising set.
pub const LEGACY_ADV_HANDLE: u8 = 0xFE;

/// Highest valid advertising handle for extended advertising commands.
pub const MAX_ADV_HANDLE: u8 = 0xEF;

/// Advertising and scan response payload size for legacy PDUs.
pub const LEGACY_ADV_DATA_LEN: usize = 31;

/// More than one legacy buffer lets the application change data on the fly, even in the
/// middle of an advertising event: the link layer keeps reading the old buffer until it reports
/// that the new one is in use.
pub const LEGACY_BUFFER_COUNT: usize = 4;

/// Maximum data length of a single extended advertising or scan response data command.
pub const MAX_EXT_ADV_DATA_FRAGMENT_LEN: usize = 251;

/// Granularity of the extended advertising data arena, in bytes.
pub const ADV_ARENA_BLOCK_SIZE: usize = 16;

/// Number of blocks in the extended advertising data arena.
pub const ADV_ARENA_BLOCKS: usize = 208;

/// Maximum number of buffers live in the arena at once.
pub const ADV_ARENA_EXTENTS: usize = 16;

/// Bytes the arena reserves for its own bookkeeping per allocation.
pub const MEM_ALLOC_OVERHEAD: usize = 8;

/// Aggregate advertising or scan response data length reported to the host.
pub const MAX_ADV_DATA_LENGTH: usize = min(ADV_ARENA_BLOCKS * ADV_ARENA_BLOCK_SIZE - MEM_ALLOC_OVERHEAD, 1650);

/// Maximum length of a single periodic advertising data command.
pub const MAX_PERIODIC_ADV_DATA_LEN: usize = 252;

/// Maximum number of subevent data buffers that can be queued in the controller.
pub const PAWR_SUBEVENT_DATA_COUNT_MAX: usize = 8;

/// Maximum size of data in a PAwR subevent. Must be at least 249 for full compliance with HCI.
pub const MAX_PAWR_SUBEVENT_DATA_SIZE: usize = 249;

/// Maximum size of data in a PAwR response slot. Must be at least 247 for full compliance
/// with HCI.
pub const MAX_PAWR_RESPONSE_DATA_SIZE: usize = 247;

/// The stack allows up to 8 response data packets in its queue.
pub const MAX_PAWR_RESPONSE_SUBEVENT_COUNT: usize = 8;

const fn min(a: usize, b: usize) -> usize {
    if a < b { a } else { b }
}

/// Advertising features the controller library was built with. Each variant includes the
/// ones before it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Capability {
    /// Legacy advertising only: single-shot data of at most 31 bytes.
    LegacyOnly,
    /// Extended advertising, with fragmented data.
    ExtendedAdvertising,
    /// Extended and periodic advertising.
    PeriodicAdvertising,
    /// Periodic advertising with responses.
    PeriodicAdvertisingWithResponses,
}

impl Capability {
    pub fn extended(self) -> bool {
        self >= Self::ExtendedAdvertising
    }

    pub fn periodic(self) -> bool {
        self >= Self::PeriodicAdvertising
    }

    pub fn pawr(self) -> bool {
        self >= Self::PeriodicAdvertisingWithResponses
    }
}

impl Default for Capability {
    fn default() -> Self {
        cfg_if! {
            if #[cfg(feature = "pawr")] {
                Self::PeriodicAdvertisingWithResponses
            } else if #[cfg(periodic)] {
                Self::PeriodicAdvertising
            } else if #[cfg(legacy_only)] {
                Self::LegacyOnly
            } else {
                Self::ExtendedAdvertising
            }
        }
    }
}
