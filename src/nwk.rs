//! Adaptation of the host's advertising data commands to the link layer's buffer interface.
//!
//! The link layer doesn't copy advertising data: it reads it from buffers it's handed, for as
//! long as it needs to. This module owns those buffers. It validates each command, assembles
//! fragmented data, installs complete data, and frees buffers when the link layer reports it's
//! done with them.

use heapless::Vec;

use crate::{
    arena::ArenaId,
    config::{
        Capability, LEGACY_ADV_DATA_LEN, LEGACY_ADV_HANDLE, LEGACY_BUFFER_COUNT,
        MAX_ADV_DATA_LENGTH, MAX_ADV_HANDLE, MAX_PAWR_RESPONSE_DATA_SIZE,
        MAX_PAWR_SUBEVENT_DATA_SIZE, PAWR_SUBEVENT_DATA_COUNT_MAX,
    },
    error::{Error, Result},
    link_layer::{
        AdvertisingSetParameters, BufferId, DataRef, LinkLayer, ResponseParameters, SubeventData,
        SubeventDataRef,
    },
    pawr::{PawrBuffers, PawrDataType},
    pool::{SlotId, SlotPool},
    tracker::{AdvBufferTracker, BufferState, DataType, Reservation},
    validate::{self, Operation},
};

/// Buffers for legacy advertising and scan response data, in legacy-only builds.
pub type LegacyPool = SlotPool<LEGACY_BUFFER_COUNT, LEGACY_ADV_DATA_LEN>;

/// Which interface installs the data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Layer {
    /// The link layer, for HCI commands.
    Ll,
    /// The GAP layer of the full stack, for ACI GAP commands.
    Gap,
}

/// Install data through the link layer or the GAP layer.
fn install<L: LinkLayer>(
    ll: &mut L,
    handle: u8,
    ty: DataType,
    op: Operation,
    data: DataRef<'_>,
    layer: Layer,
) -> Result<()> {
    #[cfg(not(gap_layer))]
    let _ = layer;

    match ty {
        DataType::AdvData => {
            #[cfg(gap_layer)]
            if layer == Layer::Gap {
                return ll.gap_set_advertising_data(handle, op, data);
            }
            if handle == LEGACY_ADV_HANDLE {
                ll.set_legacy_advertising_data(data)
            } else {
                ll.set_advertising_data(handle, op, data)
            }
        }
        DataType::ScanRespData => {
            #[cfg(gap_layer)]
            if layer == Layer::Gap {
                return ll.gap_set_scan_response_data(handle, data);
            }
            if handle == LEGACY_ADV_HANDLE {
                ll.set_legacy_scan_response_data(data)
            } else {
                ll.set_scan_response_data(handle, data)
            }
        }
        DataType::PeriodicAdvData => ll.set_periodic_advertising_data(handle, op, data),
    }
}

/// Install legacy-only data. The GAP layer addresses the single legacy set as handle 0.
fn install_legacy<L: LinkLayer>(
    ll: &mut L,
    ty: DataType,
    data: DataRef<'_>,
    layer: Layer,
) -> Result<()> {
    #[cfg(not(gap_layer))]
    let _ = layer;

    match ty {
        DataType::AdvData => {
            #[cfg(gap_layer)]
            if layer == Layer::Gap {
                return ll.gap_set_advertising_data(0, Operation::CompleteData, data);
            }
            ll.set_legacy_advertising_data(data)
        }
        DataType::ScanRespData => {
            #[cfg(gap_layer)]
            if layer == Layer::Gap {
                return ll.gap_set_scan_response_data(0, data);
            }
            ll.set_legacy_scan_response_data(data)
        }
        DataType::PeriodicAdvData => Err(Error::UnknownHciCommand),
    }
}

fn extended_ref(buffers: &AdvBufferTracker, id: Option<ArenaId>) -> DataRef<'_> {
    match id {
        Some(id) => DataRef {
            buffer: Some(BufferId::Extended(id)),
            data: buffers.data(id),
        },
        None => DataRef::EMPTY,
    }
}

/// Represents the advertising network adaptation layer, in front of a link layer.
pub struct AdvNwk<L: LinkLayer> {
    ll: L,
    capability: Capability,
    legacy: LegacyPool,
    buffers: AdvBufferTracker,
    pawr: PawrBuffers,
}

impl<L: LinkLayer> AdvNwk<L> {
    /// Create the adaptation layer with every buffer free.
    pub fn new(ll: L, capability: Capability) -> Self {
        debug!("Adv nwk init: {}", capability);

        Self {
            ll,
            capability,
            legacy: SlotPool::new(),
            buffers: AdvBufferTracker::new(),
            pawr: PawrBuffers::new(),
        }
    }

    /// Free every buffer and forget every advertising set. Only call this when the link layer
    /// has been reset too, since it may otherwise still read the buffers.
    pub fn reset(&mut self) {
        self.legacy.reset();
        self.buffers.reset();
        self.pawr.reset();
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn link_layer(&self) -> &L {
        &self.ll
    }

    pub fn link_layer_mut(&mut self) -> &mut L {
        &mut self.ll
    }

    pub fn legacy_buffers(&self) -> &LegacyPool {
        &self.legacy
    }

    pub fn adv_buffers(&self) -> &AdvBufferTracker {
        &self.buffers
    }

    pub fn pawr_buffers(&self) -> &PawrBuffers {
        &self.pawr
    }

    /// Buffer state of one data type of an advertising set.
    pub fn state(&self, handle: u8, ty: DataType) -> BufferState {
        self.buffers.state(handle, ty)
    }

    /// HCI_LE_Set_Advertising_Data: legacy advertising data, up to 31 bytes.
    pub fn hci_le_set_advertising_data(&mut self, data: &[u8]) -> Result<()> {
        self.set_data(
            LEGACY_ADV_HANDLE,
            Operation::CompleteData,
            data,
            DataType::AdvData,
            Layer::Ll,
        )
    }

    /// HCI_LE_Set_Scan_Response_Data: legacy scan response data, up to 31 bytes.
    pub fn hci_le_set_scan_response_data(&mut self, data: &[u8]) -> Result<()> {
        self.set_data(
            LEGACY_ADV_HANDLE,
            Operation::CompleteData,
            data,
            DataType::ScanRespData,
            Layer::Ll,
        )
    }

    /// HCI_LE_Set_Extended_Advertising_Data. Data may be split in fragments over several
    /// commands, up to [`MAX_ADV_DATA_LENGTH`] bytes in total. The fragment preference is
    /// ignored: the link layer fragments as it sees fit.
    pub fn hci_le_set_extended_advertising_data(
        &mut self,
        handle: u8,
        op: Operation,
        _fragment_preference: u8,
        data: &[u8],
    ) -> Result<()> {
        if !self.capability.extended() {
            return Err(Error::UnknownHciCommand);
        }
        self.set_data(handle, op, data, DataType::AdvData, Layer::Ll)
    }

    /// HCI_LE_Set_Extended_Scan_Response_Data.
    pub fn hci_le_set_extended_scan_response_data(
        &mut self,
        handle: u8,
        op: Operation,
        _fragment_preference: u8,
        data: &[u8],
    ) -> Result<()> {
        if !self.capability.extended() {
            return Err(Error::UnknownHciCommand);
        }
        self.set_data(handle, op, data, DataType::ScanRespData, Layer::Ll)
    }

    /// HCI_LE_Set_Periodic_Advertising_Data.
    pub fn hci_le_set_periodic_advertising_data(
        &mut self,
        handle: u8,
        op: Operation,
        data: &[u8],
    ) -> Result<()> {
        if !self.capability.periodic() {
            return Err(Error::UnknownHciCommand);
        }
        self.set_data(handle, op, data, DataType::PeriodicAdvData, Layer::Ll)
    }

    /// ACI_GAP_SET_ADVERTISING_DATA, with the data kept in buffers owned by this layer.
    #[cfg(gap_layer)]
    pub fn aci_gap_set_advertising_data_nwk(
        &mut self,
        handle: u8,
        op: Operation,
        data: &[u8],
    ) -> Result<()> {
        self.set_data(handle, op, data, DataType::AdvData, Layer::Gap)
    }

    /// ACI_GAP_SET_SCAN_RESPONSE_DATA, with the data kept in buffers owned by this layer.
    #[cfg(gap_layer)]
    pub fn aci_gap_set_scan_response_data_nwk(
        &mut self,
        handle: u8,
        op: Operation,
        data: &[u8],
    ) -> Result<()> {
        self.set_data(handle, op, data, DataType::ScanRespData, Layer::Gap)
    }

    fn set_data(
        &mut self,
        handle: u8,
        op: Operation,
        data: &[u8],
        ty: DataType,
        layer: Layer,
    ) -> Result<()> {
        if self.capability.extended() {
            self.set_data_ext(handle, op, data, ty, layer)
        } else {
            self.set_data_legacy(op, data, ty, layer)
        }
    }

    /// Legacy-only builds: a single 31-byte buffer per command, installed at once.
    fn set_data_legacy(
        &mut self,
        op: Operation,
        data: &[u8],
        ty: DataType,
        layer: Layer,
    ) -> Result<()> {
        if op != Operation::CompleteData || data.len() > LEGACY_ADV_DATA_LEN {
            return Err(Error::InvalidHciCmdParams);
        }

        let Some(id) = self.legacy.alloc_with(data) else {
            debug!("No free legacy adv buffer");
            return Err(Error::ControllerBusy);
        };

        let buf = DataRef {
            buffer: Some(BufferId::Legacy(id)),
            data: &self.legacy.buf(id)[..data.len()],
        };

        let result = install_legacy(&mut self.ll, ty, buf, layer);
        if result.is_err() {
            self.legacy.free(id);
        }

        result
    }

    fn check_params(&self, handle: u8, op: Operation, len: usize, ty: DataType) -> Result<()> {
        let info = |h| self.ll.advertising_info(h);

        match ty {
            DataType::AdvData => validate::adv_data(handle, op, len, info),
            DataType::ScanRespData => validate::scan_resp_data(handle, op, len, info),
            DataType::PeriodicAdvData => {
                if !self.capability.periodic() {
                    return Err(Error::UnknownHciCommand);
                }
                validate::periodic_adv_data(handle, op, len, info)
            }
        }
    }

    /// Extended builds: assemble fragments in the arena, and swap the complete buffer in.
    fn set_data_ext(
        &mut self,
        handle: u8,
        op: Operation,
        data: &[u8],
        ty: DataType,
        layer: Layer,
    ) -> Result<()> {
        if handle == LEGACY_ADV_HANDLE && layer != Layer::Ll {
            return Err(Error::InvalidHciCmdParams);
        }

        self.check_params(handle, op, data.len(), ty)?;

        let extend = match op {
            Operation::UnchangedData => {
                let current = extended_ref(&self.buffers, self.buffers.current(handle, ty));
                return install(&mut self.ll, handle, ty, op, current, layer);
            }
            Operation::FirstFragment | Operation::CompleteData => {
                self.buffers.free_next(handle, ty);
                false
            }
            Operation::IntermediateFragment | Operation::LastFragment => true,
        };

        let (next, offset) = match self.buffers.alloc(handle, ty, data.len(), extend) {
            Ok(Reservation::Buffer { id, offset }) if offset + data.len() <= MAX_ADV_DATA_LENGTH => {
                (Some(id), offset)
            }
            Ok(Reservation::Empty) => (None, 0),
            Err(_) if data.is_empty() => (None, 0),
            _ => {
                warn!(
                    "Adv data for handle {} exceeds capacity; cancelling {}",
                    handle,
                    ty
                );
                // Tell the link layer the current data is cancelled.
                if let Err(e) = install(
                    &mut self.ll,
                    handle,
                    ty,
                    Operation::CompleteData,
                    DataRef::EMPTY,
                    layer,
                ) {
                    warn!("Link layer refused cancel for handle {}: {}", handle, e);
                }
                self.buffers.deactivate_current(handle, ty);
                self.buffers.free_next(handle, ty);

                return Err(Error::MemoryCapacityExceeded);
            }
        };

        if let Some(id) = next {
            self.buffers.write(id, offset, data);
        }

        match op {
            Operation::LastFragment | Operation::CompleteData => {
                let complete = extended_ref(&self.buffers, next);
                let result = install(
                    &mut self.ll,
                    handle,
                    ty,
                    Operation::CompleteData,
                    complete,
                    layer,
                );

                match result {
                    Ok(()) => {
                        self.buffers.deactivate_current(handle, ty);
                        self.buffers.activate_next(handle, ty);
                    }
                    Err(e) => {
                        warn!("Link layer refused adv data for handle {}: {}", handle, e);
                        self.buffers.free_next(handle, ty);
                    }
                }

                result
            }
            Operation::FirstFragment => {
                // Discard existing data while the new one is assembled.
                if let Err(e) = install(
                    &mut self.ll,
                    handle,
                    ty,
                    Operation::CompleteData,
                    DataRef::EMPTY,
                    layer,
                ) {
                    warn!("Link layer refused discard for handle {}: {}", handle, e);
                }
                self.buffers.deactivate_current(handle, ty);

                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// HCI_LE_Set_Periodic_Advertising_Subevent_Data. Each subevent's data is copied into its
    /// own buffer; the link layer returns them through the PAwR data free event.
    pub fn hci_le_set_periodic_advertising_subevent_data(
        &mut self,
        handle: u8,
        subevents: &[SubeventData<'_>],
    ) -> Result<()> {
        if !self.capability.pawr() {
            return Err(Error::UnknownHciCommand);
        }

        if handle > MAX_ADV_HANDLE {
            return Err(Error::InvalidHciCmdParams);
        }

        if self.ll.advertising_info(handle).is_none() {
            return Err(Error::UnknownAdvertisingIdentifier);
        }

        // The host gave more data than the controller requested.
        if self.pawr.subevent_num_available() < subevents.len() {
            debug!(
                "{} subevents requested, {} buffers free",
                subevents.len(),
                self.pawr.subevent_num_available()
            );
            return Err(Error::CommandDisallowed);
        }

        let mut ids: Vec<SlotId, PAWR_SUBEVENT_DATA_COUNT_MAX> = Vec::new();

        for s in subevents {
            let id = if s.data.len() > MAX_PAWR_SUBEVENT_DATA_SIZE {
                None
            } else {
                self.pawr.subevent_alloc(s.data)
            };

            match id.map(|id| ids.push(id)) {
                Some(Ok(())) => (),
                Some(Err(id)) => {
                    self.pawr.free(id, PawrDataType::Subevent);
                    self.free_subevents(&ids);
                    return Err(Error::MemoryCapacityExceeded);
                }
                None => {
                    error!("Subevent buffer allocation failed");
                    self.free_subevents(&ids);
                    return Err(Error::MemoryCapacityExceeded);
                }
            }
        }

        let result = {
            let mut refs: Vec<SubeventDataRef<'_>, PAWR_SUBEVENT_DATA_COUNT_MAX> = Vec::new();
            for (s, &id) in subevents.iter().zip(ids.iter()) {
                // Bounded by `ids`.
                let _ = refs.push(SubeventDataRef {
                    subevent: s.subevent,
                    response_slot_start: s.response_slot_start,
                    response_slot_count: s.response_slot_count,
                    data: DataRef {
                        buffer: Some(BufferId::Subevent(id)),
                        data: &self.pawr.subevent_buf(id)[..s.data.len()],
                    },
                });
            }

            self.ll.set_periodic_advertising_subevent_data(handle, &refs)
        };

        if result.is_err() {
            warn!("Link layer refused subevent data for handle {}", handle);
            self.free_subevents(&ids);
        }

        result
    }

    fn free_subevents(&mut self, ids: &[SlotId]) {
        for &id in ids {
            self.pawr.free(id, PawrDataType::Subevent);
        }
    }

    /// HCI_LE_Set_Periodic_Advertising_Response_Data.
    pub fn hci_le_set_periodic_advertising_response_data(
        &mut self,
        params: &ResponseParameters,
        data: &[u8],
    ) -> Result<()> {
        if !self.capability.pawr() {
            return Err(Error::UnknownHciCommand);
        }

        if data.len() > MAX_PAWR_RESPONSE_DATA_SIZE {
            return Err(Error::MemoryCapacityExceeded);
        }

        let Some(id) = self.pawr.resp_alloc(data) else {
            debug!("No free PAwR response buffer");
            return Err(Error::MemoryCapacityExceeded);
        };

        let buf = DataRef {
            buffer: Some(BufferId::Response(id)),
            data: &self.pawr.resp_buf(id)[..data.len()],
        };

        let result = self.ll.set_periodic_advertising_response_data(params, buf);
        if result.is_err() {
            self.pawr.free(id, PawrDataType::Response);
        }

        result
    }

    /// Refuse to enable a set whose advertising or scan response data is incomplete.
    fn check_enable(&self, enable: u8, sets: &[AdvertisingSetParameters]) -> Result<()> {
        if !self.capability.extended() || enable != 1 {
            return Ok(());
        }

        let incomplete = sets.iter().find(|s| {
            self.buffers.has_pending(s.handle, DataType::AdvData)
                || self.buffers.has_pending(s.handle, DataType::ScanRespData)
        });

        if let Some(s) = incomplete {
            debug!("Adv set {} has incomplete data", s.handle);
            return Err(Error::CommandDisallowed);
        }

        Ok(())
    }

    /// HCI_LE_Set_Extended_Advertising_Enable.
    pub fn hci_le_set_extended_advertising_enable(
        &mut self,
        enable: u8,
        sets: &[AdvertisingSetParameters],
    ) -> Result<()> {
        if !self.capability.extended() {
            return Err(Error::UnknownHciCommand);
        }
        self.check_enable(enable, sets)?;

        self.ll.set_extended_advertising_enable(enable, sets)
    }

    /// ACI_GAP_SET_ADVERTISING_ENABLE.
    #[cfg(gap_layer)]
    pub fn aci_gap_set_advertising_enable(
        &mut self,
        enable: u8,
        sets: &[AdvertisingSetParameters],
    ) -> Result<()> {
        self.check_enable(enable, sets)?;

        self.ll.gap_set_advertising_enable(enable, sets)
    }

    /// HCI_LE_Set_Periodic_Advertising_Enable. Bit 0 of `enable` enables periodic advertising;
    /// this is refused while the set's periodic data is incomplete.
    pub fn hci_le_set_periodic_advertising_enable(&mut self, enable: u8, handle: u8) -> Result<()> {
        if !self.capability.periodic() {
            return Err(Error::UnknownHciCommand);
        }

        if enable & 0x01 != 0 && self.buffers.has_pending(handle, DataType::PeriodicAdvData) {
            debug!("Periodic adv set {} has incomplete data", handle);
            return Err(Error::CommandDisallowed);
        }

        self.ll.set_periodic_advertising_enable(enable, handle)
    }

    /// HCI_LE_Read_Maximum_Advertising_Data_Length.
    pub fn hci_le_read_maximum_advertising_data_length(&self) -> Result<u16> {
        if !self.capability.extended() {
            return Err(Error::UnknownHciCommand);
        }
        Ok(MAX_ADV_DATA_LENGTH as u16)
    }

    /// Handle the link layer's advertising data update event: `new` is now in use, so `old` can
    /// be freed. Returns whether the event should be forwarded to the host, which it never is.
    pub fn aci_hal_adv_scan_resp_data_update_event_preprocess(
        &mut self,
        old: Option<BufferId>,
        new: Option<BufferId>,
    ) -> bool {
        if old != new {
            match old {
                Some(BufferId::Legacy(id)) => self.legacy.free(id),
                Some(BufferId::Extended(id)) => {
                    if !self.buffers.release(id) {
                        debug!("Released adv buffer {} isn't tracked", id);
                    }
                }
                Some(other) => warn!("Unexpected buffer in adv data update: {}", other),
                None => (),
            }
        }

        false
    }

    /// Handle the link layer's PAwR data free event. Returns whether the event should be
    /// forwarded to the host, which it never is.
    pub fn aci_hal_pawr_data_free_event_preprocess(
        &mut self,
        buffer: SlotId,
        ty: PawrDataType,
    ) -> bool {
        self.pawr.free(buffer, ty);

        false
    }
}
