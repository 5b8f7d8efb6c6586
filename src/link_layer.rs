//! The interface to the BLE controller library.
//!
//! The controller keeps a reference to every data buffer it is given, and reads it until it
//! reports the buffer released (see [`crate::AdvNwk::aci_hal_adv_scan_resp_data_update_event_preprocess`]
//! and [`crate::AdvNwk::aci_hal_pawr_data_free_event_preprocess`]). Buffers are passed as a
//! [`DataRef`]: an opaque [`BufferId`] to report back in those events, along with the bytes.

use bitflags::bitflags;

use crate::{
    arena::ArenaId,
    error::{Error, Result},
    pool::SlotId,
    validate::Operation,
};

/// Identifies a buffer handed to the link layer, across all pools.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BufferId {
    /// Legacy advertising or scan response data, in legacy-only builds.
    Legacy(SlotId),
    /// Extended, scan response or periodic advertising data.
    Extended(ArenaId),
    /// PAwR subevent data.
    Subevent(SlotId),
    /// PAwR response data.
    Response(SlotId),
}

/// Data to install, and the buffer that holds it. `buffer` is `None` when there's no data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DataRef<'a> {
    pub buffer: Option<BufferId>,
    pub data: &'a [u8],
}

impl DataRef<'static> {
    /// No data; used to cancel the data of an advertising set.
    pub const EMPTY: Self = Self {
        buffer: None,
        data: &[],
    };
}

impl DataRef<'_> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

bitflags! {
    /// Advertising_Event_Properties of an advertising set, as passed to
    /// HCI_LE_Set_Extended_Advertising_Parameters.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct EventProperties: u16 {
        const CONNECTABLE = 0x0001;
        const SCANNABLE = 0x0002;
        const DIRECTED = 0x0004;
        /// High duty cycle directed connectable advertising.
        const HDC_DIRECTED = 0x0008;
        /// Use legacy advertising PDUs.
        const LEGACY = 0x0010;
        /// Omit the advertiser's address.
        const ANONYMOUS = 0x0020;
        /// Include TxPower in the extended header.
        const TXPOWER_INC = 0x0040;
    }
}

/// State of an advertising set, as reported by the link layer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AdvertisingInfo {
    pub enabled: bool,
    pub periodic_configured: bool,
    pub periodic_enabled: bool,
    pub properties: EventProperties,
}

/// One subevent, as received from the host in HCI_LE_Set_Periodic_Advertising_Subevent_Data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SubeventData<'a> {
    pub subevent: u8,
    pub response_slot_start: u8,
    pub response_slot_count: u8,
    pub data: &'a [u8],
}

/// One subevent, with its data copied into a PAwR buffer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SubeventDataRef<'a> {
    pub subevent: u8,
    pub response_slot_start: u8,
    pub response_slot_count: u8,
    pub data: DataRef<'a>,
}

/// Parameters of HCI_LE_Set_Periodic_Advertising_Response_Data, other than the data itself.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ResponseParameters {
    pub sync_handle: u16,
    pub request_event: u16,
    pub request_subevent: u8,
    pub response_subevent: u8,
    pub response_slot: u8,
}

/// Per-set parameters of HCI_LE_Set_Extended_Advertising_Enable.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdvertisingSetParameters {
    pub handle: u8,
    /// In units of 10ms; 0 means no limit.
    pub duration: u16,
    pub max_extended_advertising_events: u8,
}

/// Primitives of the BLE controller library used by the advertising adaptation layer.
///
/// Every method returns the controller's status: `Ok(())` for success, or the error to report
/// to the host. The GAP methods are only present in full-stack builds; their default
/// implementations report [`Error::UnknownHciCommand`].
pub trait LinkLayer {
    /// State of an advertising set, or `None` if no set with that handle exists.
    fn advertising_info(&self, handle: u8) -> Option<AdvertisingInfo>;

    /// Install the data of the legacy advertising set.
    fn set_legacy_advertising_data(&mut self, data: DataRef<'_>) -> Result<()>;

    /// Install the scan response data of the legacy advertising set.
    fn set_legacy_scan_response_data(&mut self, data: DataRef<'_>) -> Result<()>;

    /// Install the advertising data of an extended advertising set. `op` is
    /// [`Operation::CompleteData`], or [`Operation::UnchangedData`] to keep the current data
    /// while updating the Advertising DID.
    fn set_advertising_data(&mut self, handle: u8, op: Operation, data: DataRef<'_>)
    -> Result<()>;

    /// Install the scan response data of an extended advertising set.
    fn set_scan_response_data(&mut self, handle: u8, data: DataRef<'_>) -> Result<()>;

    /// Install the periodic advertising data of an advertising set.
    fn set_periodic_advertising_data(
        &mut self,
        handle: u8,
        op: Operation,
        data: DataRef<'_>,
    ) -> Result<()>;

    /// Queue PAwR subevent data. On success, each subevent buffer is returned later through the
    /// PAwR data free event.
    fn set_periodic_advertising_subevent_data(
        &mut self,
        handle: u8,
        subevents: &[SubeventDataRef<'_>],
    ) -> Result<()>;

    /// Queue PAwR response data. On success, the buffer is returned later through the PAwR data
    /// free event.
    fn set_periodic_advertising_response_data(
        &mut self,
        params: &ResponseParameters,
        data: DataRef<'_>,
    ) -> Result<()>;

    fn set_extended_advertising_enable(
        &mut self,
        enable: u8,
        sets: &[AdvertisingSetParameters],
    ) -> Result<()>;

    fn set_periodic_advertising_enable(&mut self, enable: u8, handle: u8) -> Result<()>;

    /// ACI_GAP_SET_ADVERTISING_DATA.
    fn gap_set_advertising_data(
        &mut self,
        _handle: u8,
        _op: Operation,
        _data: DataRef<'_>,
    ) -> Result<()> {
        Err(Error::UnknownHciCommand)
    }

    /// ACI_GAP_SET_SCAN_RESPONSE_DATA.
    fn gap_set_scan_response_data(&mut self, _handle: u8, _data: DataRef<'_>) -> Result<()> {
        Err(Error::UnknownHciCommand)
    }

    /// ACI_GAP_SET_ADVERTISING_ENABLE.
    fn gap_set_advertising_enable(
        &mut self,
        _enable: u8,
        _sets: &[AdvertisingSetParameters],
    ) -> Result<()> {
        Err(Error::UnknownHciCommand)
    }

    /// Encrypt advertising data. `encrypted` is 9 bytes longer than `clear`: a 5-byte randomizer
    /// before the payload, and a 4-byte MIC after it.
    fn gap_encrypt_adv_data(
        &mut self,
        _session_key: &[u8; 16],
        _iv: &[u8; 8],
        _clear: &[u8],
        _encrypted: &mut [u8],
    ) -> Result<()> {
        Err(Error::UnknownHciCommand)
    }

    /// Decrypt advertising data. `clear` is 9 bytes shorter than `encrypted`.
    fn gap_decrypt_adv_data(
        &mut self,
        _session_key: &[u8; 16],
        _iv: &[u8; 8],
        _encrypted: &[u8],
        _clear: &mut [u8],
    ) -> Result<()> {
        Err(Error::UnknownHciCommand)
    }
}
