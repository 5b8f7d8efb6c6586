//! Parameter checks for the LE Set (Extended / Periodic) Advertising Data and Scan Response
//! Data commands, as required by Bluetooth Core Specification, Vol 4, Part E, 7.8.54, 7.8.55
//! and 7.8.62.
//!
//! Each check takes a lookup for the advertising set's state, which is only called once the
//! handle itself has been validated.

use crate::{
    config::{
        LEGACY_ADV_DATA_LEN, LEGACY_ADV_HANDLE, MAX_ADV_HANDLE, MAX_EXT_ADV_DATA_FRAGMENT_LEN,
        MAX_PERIODIC_ADV_DATA_LEN,
    },
    error::{Error, Result},
    link_layer::{AdvertisingInfo, EventProperties},
};

/// The Operation parameter of the advertising data commands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Operation {
    IntermediateFragment = 0,
    FirstFragment = 1,
    LastFragment = 2,
    CompleteData = 3,
    /// Keep the existing data, and update the Advertising DID.
    UnchangedData = 4,
}

impl Operation {
    /// `CompleteData` and `UnchangedData` don't need the set to be disabled, and allow a zero
    /// length.
    pub fn is_fragment(self) -> bool {
        !matches!(self, Self::CompleteData | Self::UnchangedData)
    }
}

impl TryFrom<u8> for Operation {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0 => Self::IntermediateFragment,
            1 => Self::FirstFragment,
            2 => Self::LastFragment,
            3 => Self::CompleteData,
            4 => Self::UnchangedData,
            _ => return Err(Error::InvalidHciCmdParams),
        })
    }
}

/// The legacy handle only takes complete data that fits in a legacy PDU.
fn check_legacy(op: Operation, len: usize) -> Result<()> {
    if op != Operation::CompleteData || len > LEGACY_ADV_DATA_LEN {
        return Err(Error::InvalidHciCmdParams);
    }
    Ok(())
}

/// Checks for HCI_LE_Set_Extended_Advertising_Data.
pub fn adv_data(
    handle: u8,
    op: Operation,
    len: usize,
    info: impl FnOnce(u8) -> Option<AdvertisingInfo>,
) -> Result<()> {
    if handle == LEGACY_ADV_HANDLE {
        return check_legacy(op, len);
    }

    if handle > MAX_ADV_HANDLE || len > MAX_EXT_ADV_DATA_FRAGMENT_LEN {
        return Err(Error::InvalidHciCmdParams);
    }

    let info = info(handle).ok_or(Error::UnknownAdvertisingIdentifier)?;
    let props = info.properties;
    let legacy = props.contains(EventProperties::LEGACY);

    // Set types that don't carry advertising data.
    if (legacy && props.contains(EventProperties::DIRECTED))
        || (props.contains(EventProperties::SCANNABLE) && !legacy)
    {
        return Err(Error::InvalidHciCmdParams);
    }

    if legacy && (op != Operation::CompleteData || len > LEGACY_ADV_DATA_LEN) {
        return Err(Error::InvalidHciCmdParams);
    }

    if op.is_fragment() && len == 0 {
        return Err(Error::InvalidHciCmdParams);
    }

    if info.enabled && op.is_fragment() {
        return Err(Error::CommandDisallowed);
    }

    Ok(())
}

/// Checks for HCI_LE_Set_Extended_Scan_Response_Data. Unlike advertising data,
/// `UnchangedData` isn't allowed.
pub fn scan_resp_data(
    handle: u8,
    op: Operation,
    len: usize,
    info: impl FnOnce(u8) -> Option<AdvertisingInfo>,
) -> Result<()> {
    if handle == LEGACY_ADV_HANDLE {
        return check_legacy(op, len);
    }

    if op == Operation::UnchangedData || len > MAX_EXT_ADV_DATA_FRAGMENT_LEN {
        return Err(Error::InvalidHciCmdParams);
    }

    let info = info(handle).ok_or(Error::UnknownAdvertisingIdentifier)?;
    let props = info.properties;
    let scannable = props.contains(EventProperties::SCANNABLE);

    // A non-scannable set may only discard its data.
    if !scannable && len != 0 {
        return Err(Error::InvalidHciCmdParams);
    }

    if props.contains(EventProperties::LEGACY)
        && scannable
        && (op != Operation::CompleteData || len > LEGACY_ADV_DATA_LEN)
    {
        return Err(Error::InvalidHciCmdParams);
    }

    if op != Operation::CompleteData && len == 0 {
        return Err(Error::InvalidHciCmdParams);
    }

    if info.enabled && op != Operation::CompleteData {
        return Err(Error::CommandDisallowed);
    }

    Ok(())
}

/// Checks for HCI_LE_Set_Periodic_Advertising_Data.
pub fn periodic_adv_data(
    handle: u8,
    op: Operation,
    len: usize,
    info: impl FnOnce(u8) -> Option<AdvertisingInfo>,
) -> Result<()> {
    let info = info(handle).ok_or(Error::UnknownAdvertisingIdentifier)?;

    if !info.periodic_configured {
        return Err(Error::CommandDisallowed);
    }

    if len > MAX_PERIODIC_ADV_DATA_LEN {
        return Err(Error::InvalidHciCmdParams);
    }

    if op.is_fragment() {
        if info.periodic_enabled {
            return Err(Error::CommandDisallowed);
        }
        if len == 0 {
            return Err(Error::InvalidHciCmdParams);
        }
    }

    Ok(())
}
