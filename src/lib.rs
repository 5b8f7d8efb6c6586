//! Advertising data buffer management for the STM32 BLE controller library.
//!
//! The controller library doesn't copy advertising, scan response, periodic advertising or PAwR
//! data: it reads it in place from buffers the application provides, and reports when each
//! buffer is released. This crate owns those buffers. [`AdvNwk`] sits between the host's HCI
//! commands and the controller's buffer interface ([`LinkLayer`]): it validates parameters,
//! reassembles fragmented data, double-buffers each advertising set so that data is swapped
//! atomically, and frees buffers on the controller's release events.
//!
//! Example use:
//!
//! ```ignore
//! let mut nwk = AdvNwk::new(controller, Capability::default());
//!
//! nwk.hci_le_set_extended_advertising_data(1, Operation::FirstFragment, 0, &first)?;
//! nwk.hci_le_set_extended_advertising_data(1, Operation::LastFragment, 0, &last)?;
//!
//! // From the controller's event handler:
//! nwk.aci_hal_adv_scan_resp_data_update_event_preprocess(old, new);
//! ```

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod arena;
pub mod command;
pub mod config;
#[cfg(gap_layer)]
pub mod ead;
pub mod error;
pub mod link_layer;
pub mod nwk;
pub mod opcode;
pub mod pawr;
pub mod pool;
pub mod tracker;
pub mod validate;

pub use crate::{
    arena::ArenaId,
    command::CommandComplete,
    config::Capability,
    error::{Error, Result},
    link_layer::{
        AdvertisingInfo, AdvertisingSetParameters, BufferId, DataRef, EventProperties, LinkLayer,
        ResponseParameters, SubeventData, SubeventDataRef,
    },
    nwk::{AdvNwk, Layer},
    opcode::Opcode,
    pawr::PawrDataType,
    pool::SlotId,
    tracker::{BufferState, DataType},
    validate::Operation,
};
