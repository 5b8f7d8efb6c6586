//! Decoding of raw HCI command parameters, for transports that hand over complete command
//! packets. Commands this crate doesn't handle are left to the caller.

use byteorder::{ByteOrder, LittleEndian};
use heapless::Vec;

use crate::{
    error::{Error, Result, status},
    link_layer::{AdvertisingSetParameters, LinkLayer, ResponseParameters, SubeventData},
    nwk::AdvNwk,
    opcode::{self, Opcode},
    validate::Operation,
};

/// Largest Num_Sets of HCI_LE_Set_Extended_Advertising_Enable.
const MAX_ENABLE_SETS: usize = 0x3F;

/// Largest Num_Subevents of HCI_LE_Set_Periodic_Advertising_Subevent_Data.
const MAX_SUBEVENTS: usize = 0x0F;

/// Return parameters of a Command Complete event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandComplete {
    Status(u8),
    MaximumAdvertisingDataLength { status: u8, length: u16 },
}

impl CommandComplete {
    pub fn status(&self) -> u8 {
        match self {
            Self::Status(s) => *s,
            Self::MaximumAdvertisingDataLength { status, .. } => *status,
        }
    }

    /// Length of the return parameters, in bytes.
    pub fn required_len(&self) -> usize {
        match self {
            Self::Status(_) => 1,
            Self::MaximumAdvertisingDataLength { .. } => 3,
        }
    }

    /// Serialize the return parameters. Returns the number of bytes written.
    pub fn copy_into_slice(&self, bytes: &mut [u8]) -> usize {
        let len = self.required_len();
        assert!(len <= bytes.len());

        match self {
            Self::Status(s) => bytes[0] = *s,
            Self::MaximumAdvertisingDataLength { status, length } => {
                bytes[0] = *status;
                LittleEndian::write_u16(&mut bytes[1..3], *length);
            }
        }

        len
    }
}

/// Reads little-endian fields from a parameter block. Running out of bytes is an invalid
/// parameter error.
struct Params<'a> {
    bytes: &'a [u8],
}

impl<'a> Params<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.bytes.len() {
            return Err(Error::InvalidHciCmdParams);
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.bytes(2)?))
    }

    fn operation(&mut self) -> Result<Operation> {
        Operation::try_from(self.u8()?)
    }

    /// A length byte, then that many bytes of data.
    fn data(&mut self) -> Result<&'a [u8]> {
        let len = self.u8()? as usize;
        self.bytes(len)
    }
}

impl<L: LinkLayer> AdvNwk<L> {
    /// Handle an HCI command given its opcode and raw parameters. Returns the Command Complete
    /// return parameters, or `None` if the opcode isn't one this layer handles.
    pub fn dispatch(&mut self, code: Opcode, params: &[u8]) -> Option<CommandComplete> {
        let mut p = Params::new(params);

        let result = match code {
            opcode::LE_SET_ADVERTISING_DATA => p
                .data()
                .and_then(|data| self.hci_le_set_advertising_data(data)),
            opcode::LE_SET_SCAN_RESPONSE_DATA => p
                .data()
                .and_then(|data| self.hci_le_set_scan_response_data(data)),
            opcode::LE_SET_EXTENDED_ADVERTISING_DATA => self.decode_extended_data(&mut p, false),
            opcode::LE_SET_EXTENDED_SCAN_RESPONSE_DATA => self.decode_extended_data(&mut p, true),
            opcode::LE_SET_EXTENDED_ADVERTISING_ENABLE => self.decode_extended_enable(&mut p),
            opcode::LE_SET_PERIODIC_ADVERTISING_DATA => self.decode_periodic_data(&mut p),
            opcode::LE_SET_PERIODIC_ADVERTISING_ENABLE => self.decode_periodic_enable(&mut p),
            opcode::LE_SET_PERIODIC_ADVERTISING_SUBEVENT_DATA => self.decode_subevent_data(&mut p),
            opcode::LE_SET_PERIODIC_ADVERTISING_RESPONSE_DATA => self.decode_response_data(&mut p),
            opcode::LE_READ_MAXIMUM_ADVERTISING_DATA_LENGTH => {
                let complete = match self.hci_le_read_maximum_advertising_data_length() {
                    Ok(length) => CommandComplete::MaximumAdvertisingDataLength { status: 0, length },
                    Err(e) => CommandComplete::MaximumAdvertisingDataLength {
                        status: e.code(),
                        length: 0,
                    },
                };
                return Some(complete);
            }
            _ => return None,
        };

        Some(CommandComplete::Status(status(&result)))
    }

    fn decode_extended_data(&mut self, p: &mut Params<'_>, scan_response: bool) -> Result<()> {
        let handle = p.u8()?;
        let op = p.operation()?;
        let fragment_preference = p.u8()?;
        let data = p.data()?;

        if scan_response {
            self.hci_le_set_extended_scan_response_data(handle, op, fragment_preference, data)
        } else {
            self.hci_le_set_extended_advertising_data(handle, op, fragment_preference, data)
        }
    }

    fn decode_extended_enable(&mut self, p: &mut Params<'_>) -> Result<()> {
        let enable = p.u8()?;
        let num_sets = p.u8()? as usize;

        let mut sets: Vec<AdvertisingSetParameters, MAX_ENABLE_SETS> = Vec::new();
        for _ in 0..num_sets {
            let set = AdvertisingSetParameters {
                handle: p.u8()?,
                duration: p.u16()?,
                max_extended_advertising_events: p.u8()?,
            };
            sets.push(set).map_err(|_| Error::InvalidHciCmdParams)?;
        }

        self.hci_le_set_extended_advertising_enable(enable, &sets)
    }

    fn decode_periodic_data(&mut self, p: &mut Params<'_>) -> Result<()> {
        let handle = p.u8()?;
        let op = p.operation()?;
        let data = p.data()?;

        self.hci_le_set_periodic_advertising_data(handle, op, data)
    }

    fn decode_periodic_enable(&mut self, p: &mut Params<'_>) -> Result<()> {
        let enable = p.u8()?;
        let handle = p.u8()?;

        self.hci_le_set_periodic_advertising_enable(enable, handle)
    }

    fn decode_subevent_data(&mut self, p: &mut Params<'_>) -> Result<()> {
        let handle = p.u8()?;
        let num_subevents = p.u8()? as usize;

        let mut subevents: Vec<SubeventData<'_>, MAX_SUBEVENTS> = Vec::new();
        for _ in 0..num_subevents {
            let subevent = SubeventData {
                subevent: p.u8()?,
                response_slot_start: p.u8()?,
                response_slot_count: p.u8()?,
                data: p.data()?,
            };
            subevents
                .push(subevent)
                .map_err(|_| Error::InvalidHciCmdParams)?;
        }

        self.hci_le_set_periodic_advertising_subevent_data(handle, &subevents)
    }

    fn decode_response_data(&mut self, p: &mut Params<'_>) -> Result<()> {
        let params = ResponseParameters {
            sync_handle: p.u16()?,
            request_event: p.u16()?,
            request_subevent: p.u8()?,
            response_subevent: p.u8()?,
            response_slot: p.u8()?,
        };
        let data = p.data()?;

        self.hci_le_set_periodic_advertising_response_data(&params, data)
    }
}
