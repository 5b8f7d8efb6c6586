//! Buffers for Periodic Advertising with Responses: one pool for subevent data, and one for
//! response data. The link layer hands buffers back through the PAwR data free event, tagged
//! with their type.

use crate::{
    config::{
        MAX_PAWR_RESPONSE_DATA_SIZE, MAX_PAWR_RESPONSE_SUBEVENT_COUNT, MAX_PAWR_SUBEVENT_DATA_SIZE,
        PAWR_SUBEVENT_DATA_COUNT_MAX,
    },
    pool::{SlotId, SlotPool},
};

/// Which pool a PAwR buffer belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PawrDataType {
    Subevent = 0,
    Response = 1,
}

impl TryFrom<u8> for PawrDataType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Subevent),
            1 => Ok(Self::Response),
            v => Err(v),
        }
    }
}

pub type SubeventPool = SlotPool<PAWR_SUBEVENT_DATA_COUNT_MAX, MAX_PAWR_SUBEVENT_DATA_SIZE>;
pub type ResponsePool = SlotPool<MAX_PAWR_RESPONSE_SUBEVENT_COUNT, MAX_PAWR_RESPONSE_DATA_SIZE>;

pub struct PawrBuffers {
    subevent: SubeventPool,
    response: ResponsePool,
}

impl PawrBuffers {
    pub const fn new() -> Self {
        Self {
            subevent: SlotPool::new(),
            response: SlotPool::new(),
        }
    }

    pub fn reset(&mut self) {
        self.subevent.reset();
        self.response.reset();
    }

    /// Return a buffer to the pool named by `ty`.
    pub fn free(&mut self, id: SlotId, ty: PawrDataType) {
        match ty {
            PawrDataType::Subevent => self.subevent.free(id),
            PawrDataType::Response => self.response.free(id),
        }
    }

    /// Allocate a subevent buffer holding `data`.
    pub fn subevent_alloc(&mut self, data: &[u8]) -> Option<SlotId> {
        self.subevent.alloc_with(data)
    }

    /// Allocate a response buffer holding `data`.
    pub fn resp_alloc(&mut self, data: &[u8]) -> Option<SlotId> {
        self.response.alloc_with(data)
    }

    pub fn subevent_num_available(&self) -> usize {
        self.subevent.num_available()
    }

    pub fn resp_num_available(&self) -> usize {
        self.response.num_available()
    }

    pub fn subevent_buf(&self, id: SlotId) -> &[u8] {
        self.subevent.buf(id)
    }

    pub fn resp_buf(&self, id: SlotId) -> &[u8] {
        self.response.buf(id)
    }
}

impl Default for PawrBuffers {
    fn default() -> Self {
        Self::new()
    }
}
