//! Encrypted Advertising Data (Core Specification Supplement, Part A, 1.23) through the GAP
//! layer. The GAP layer requires word-aligned clear data, so payloads are staged in aligned
//! buffers on both directions.

use crate::{
    error::{Error, Result},
    link_layer::LinkLayer,
    nwk::AdvNwk,
};

/// Largest clear payload: the encrypted result has to fit in a Command Complete event.
pub const EAD_CLEAR_DATA_LEN_MAX: usize = 241;

/// Largest encrypted payload: an AD structure length is one byte.
pub const EAD_ENCRYPTED_DATA_LEN_MAX: usize = 254;

/// A 5-byte randomizer before the payload, and a 4-byte MIC after it.
pub const EAD_OVERHEAD: usize = 9;

#[repr(align(4))]
struct Aligned<const N: usize>([u8; N]);

impl<L: LinkLayer> AdvNwk<L> {
    /// Encrypt `clear` into `encrypted`, returning the encrypted length: `clear.len()` + 9.
    ///
    /// # Errors
    /// [`Error::InvalidHciCmdParams`] if `clear` is empty or longer than 241 bytes, or if
    /// `encrypted` can't hold the result. Otherwise, the GAP layer's status.
    pub fn aci_gap_encrypt_adv_data_nwk(
        &mut self,
        session_key: &[u8; 16],
        iv: &[u8; 8],
        clear: &[u8],
        encrypted: &mut [u8],
    ) -> Result<usize> {
        if clear.is_empty() || clear.len() > EAD_CLEAR_DATA_LEN_MAX {
            return Err(Error::InvalidHciCmdParams);
        }

        let len = clear.len() + EAD_OVERHEAD;
        let out = encrypted
            .get_mut(..len)
            .ok_or(Error::InvalidHciCmdParams)?;

        let mut staged = Aligned([0; EAD_CLEAR_DATA_LEN_MAX]);
        staged.0[..clear.len()].copy_from_slice(clear);

        self.link_layer_mut()
            .gap_encrypt_adv_data(session_key, iv, &staged.0[..clear.len()], out)?;

        Ok(len)
    }

    /// Decrypt `encrypted` into `clear`, returning the clear length: `encrypted.len()` - 9.
    ///
    /// # Errors
    /// [`Error::InvalidHciCmdParams`] if `encrypted` is shorter than 9 bytes or longer than 254,
    /// or if `clear` can't hold the result. Otherwise, the GAP layer's status.
    pub fn aci_gap_decrypt_adv_data_nwk(
        &mut self,
        session_key: &[u8; 16],
        iv: &[u8; 8],
        encrypted: &[u8],
        clear: &mut [u8],
    ) -> Result<usize> {
        if encrypted.len() < EAD_OVERHEAD || encrypted.len() > EAD_ENCRYPTED_DATA_LEN_MAX {
            return Err(Error::InvalidHciCmdParams);
        }

        let len = encrypted.len() - EAD_OVERHEAD;
        let out = clear.get_mut(..len).ok_or(Error::InvalidHciCmdParams)?;

        let mut staged = Aligned([0; EAD_ENCRYPTED_DATA_LEN_MAX - EAD_OVERHEAD]);
        self.link_layer_mut()
            .gap_decrypt_adv_data(session_key, iv, encrypted, &mut staged.0[..len])?;

        out.copy_from_slice(&staged.0[..len]);

        Ok(len)
    }
}
