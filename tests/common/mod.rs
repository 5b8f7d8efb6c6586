//! A link layer that records every call, for driving `AdvNwk` on the host.

#![allow(dead_code)]

use std::collections::HashMap;

use stm32_adv_nwk::{
    AdvNwk, AdvertisingInfo, AdvertisingSetParameters, BufferId, Capability, DataRef, Error,
    EventProperties, LinkLayer, Operation, ResponseParameters, Result, SubeventDataRef,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    LegacyAdv {
        buffer: Option<BufferId>,
        data: Vec<u8>,
    },
    LegacyScanResp {
        buffer: Option<BufferId>,
        data: Vec<u8>,
    },
    Adv {
        handle: u8,
        op: Operation,
        buffer: Option<BufferId>,
        data: Vec<u8>,
    },
    ScanResp {
        handle: u8,
        buffer: Option<BufferId>,
        data: Vec<u8>,
    },
    Periodic {
        handle: u8,
        op: Operation,
        buffer: Option<BufferId>,
        data: Vec<u8>,
    },
    Subevents {
        handle: u8,
        subevents: Vec<(u8, Option<BufferId>, Vec<u8>)>,
    },
    Response {
        params: ResponseParameters,
        buffer: Option<BufferId>,
        data: Vec<u8>,
    },
    ExtEnable {
        enable: u8,
        handles: Vec<u8>,
    },
    PeriodicEnable {
        enable: u8,
        handle: u8,
    },
    GapAdv {
        handle: u8,
        op: Operation,
        buffer: Option<BufferId>,
        data: Vec<u8>,
    },
    GapScanResp {
        handle: u8,
        buffer: Option<BufferId>,
        data: Vec<u8>,
    },
    GapEnable {
        enable: u8,
        handles: Vec<u8>,
    },
}

#[derive(Default)]
pub struct MockLinkLayer {
    pub sets: HashMap<u8, AdvertisingInfo>,
    pub calls: Vec<Call>,
    /// Returned, once, by the next install or enable call.
    pub fail_next: Option<Error>,
}

impl MockLinkLayer {
    pub fn last(&self) -> Option<&Call> {
        self.calls.last()
    }

    fn respond(&mut self, call: Call) -> Result<()> {
        self.calls.push(call);
        match self.fail_next.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl LinkLayer for MockLinkLayer {
    fn advertising_info(&self, handle: u8) -> Option<AdvertisingInfo> {
        self.sets.get(&handle).copied()
    }

    fn set_legacy_advertising_data(&mut self, data: DataRef<'_>) -> Result<()> {
        self.respond(Call::LegacyAdv {
            buffer: data.buffer,
            data: data.data.to_vec(),
        })
    }

    fn set_legacy_scan_response_data(&mut self, data: DataRef<'_>) -> Result<()> {
        self.respond(Call::LegacyScanResp {
            buffer: data.buffer,
            data: data.data.to_vec(),
        })
    }

    fn set_advertising_data(&mut self, handle: u8, op: Operation, data: DataRef<'_>) -> Result<()> {
        self.respond(Call::Adv {
            handle,
            op,
            buffer: data.buffer,
            data: data.data.to_vec(),
        })
    }

    fn set_scan_response_data(&mut self, handle: u8, data: DataRef<'_>) -> Result<()> {
        self.respond(Call::ScanResp {
            handle,
            buffer: data.buffer,
            data: data.data.to_vec(),
        })
    }

    fn set_periodic_advertising_data(
        &mut self,
        handle: u8,
        op: Operation,
        data: DataRef<'_>,
    ) -> Result<()> {
        self.respond(Call::Periodic {
            handle,
            op,
            buffer: data.buffer,
            data: data.data.to_vec(),
        })
    }

    fn set_periodic_advertising_subevent_data(
        &mut self,
        handle: u8,
        subevents: &[SubeventDataRef<'_>],
    ) -> Result<()> {
        let subevents = subevents
            .iter()
            .map(|s| (s.subevent, s.data.buffer, s.data.data.to_vec()))
            .collect();
        self.respond(Call::Subevents { handle, subevents })
    }

    fn set_periodic_advertising_response_data(
        &mut self,
        params: &ResponseParameters,
        data: DataRef<'_>,
    ) -> Result<()> {
        self.respond(Call::Response {
            params: *params,
            buffer: data.buffer,
            data: data.data.to_vec(),
        })
    }

    fn set_extended_advertising_enable(
        &mut self,
        enable: u8,
        sets: &[AdvertisingSetParameters],
    ) -> Result<()> {
        let handles = sets.iter().map(|s| s.handle).collect();
        self.respond(Call::ExtEnable { enable, handles })
    }

    fn set_periodic_advertising_enable(&mut self, enable: u8, handle: u8) -> Result<()> {
        self.respond(Call::PeriodicEnable { enable, handle })
    }

    fn gap_set_advertising_data(
        &mut self,
        handle: u8,
        op: Operation,
        data: DataRef<'_>,
    ) -> Result<()> {
        self.respond(Call::GapAdv {
            handle,
            op,
            buffer: data.buffer,
            data: data.data.to_vec(),
        })
    }

    fn gap_set_scan_response_data(&mut self, handle: u8, data: DataRef<'_>) -> Result<()> {
        self.respond(Call::GapScanResp {
            handle,
            buffer: data.buffer,
            data: data.data.to_vec(),
        })
    }

    fn gap_set_advertising_enable(
        &mut self,
        enable: u8,
        sets: &[AdvertisingSetParameters],
    ) -> Result<()> {
        let handles = sets.iter().map(|s| s.handle).collect();
        self.respond(Call::GapEnable { enable, handles })
    }

    /// Not real encryption: a fixed randomizer and MIC around the clear data.
    fn gap_encrypt_adv_data(
        &mut self,
        _session_key: &[u8; 16],
        _iv: &[u8; 8],
        clear: &[u8],
        encrypted: &mut [u8],
    ) -> Result<()> {
        let n = clear.len();
        encrypted[..5].copy_from_slice(&[0x11; 5]);
        encrypted[5..5 + n].copy_from_slice(clear);
        encrypted[5 + n..].copy_from_slice(&[0x22; 4]);
        Ok(())
    }

    fn gap_decrypt_adv_data(
        &mut self,
        _session_key: &[u8; 16],
        _iv: &[u8; 8],
        encrypted: &[u8],
        clear: &mut [u8],
    ) -> Result<()> {
        clear.copy_from_slice(&encrypted[5..encrypted.len() - 4]);
        Ok(())
    }
}

/// Extended, connectable, non-scannable.
pub const EXT_SET: u8 = 1;
/// Extended, scannable.
pub const SCANNABLE_SET: u8 = 2;
/// Legacy PDUs, connectable and scannable.
pub const LEGACY_SET: u8 = 3;
/// Configured for periodic advertising.
pub const PERIODIC_SET: u8 = 4;
/// Extended, currently enabled.
pub const ENABLED_SET: u8 = 5;

pub fn link_layer() -> MockLinkLayer {
    let mut ll = MockLinkLayer::default();

    let set = |properties| AdvertisingInfo {
        properties,
        ..Default::default()
    };

    ll.sets.insert(EXT_SET, set(EventProperties::CONNECTABLE));
    ll.sets.insert(SCANNABLE_SET, set(EventProperties::SCANNABLE));
    ll.sets.insert(
        LEGACY_SET,
        set(EventProperties::LEGACY | EventProperties::CONNECTABLE | EventProperties::SCANNABLE),
    );
    ll.sets.insert(
        PERIODIC_SET,
        AdvertisingInfo {
            periodic_configured: true,
            ..Default::default()
        },
    );
    ll.sets.insert(
        ENABLED_SET,
        AdvertisingInfo {
            enabled: true,
            ..Default::default()
        },
    );

    ll
}

pub fn nwk(capability: Capability) -> AdvNwk<MockLinkLayer> {
    AdvNwk::new(link_layer(), capability)
}

/// The extended buffer installed by the last call, if any.
pub fn installed_buffer(nwk: &AdvNwk<MockLinkLayer>) -> Option<BufferId> {
    match nwk.link_layer().last()? {
        Call::LegacyAdv { buffer, .. }
        | Call::LegacyScanResp { buffer, .. }
        | Call::Adv { buffer, .. }
        | Call::ScanResp { buffer, .. }
        | Call::Periodic { buffer, .. }
        | Call::GapAdv { buffer, .. }
        | Call::GapScanResp { buffer, .. }
        | Call::Response { buffer, .. } => *buffer,
        _ => None,
    }
}
