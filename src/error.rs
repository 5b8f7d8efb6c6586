//! Common error definitions.
//!
//! Every command in this crate reports its outcome as a single-byte HCI status. Success is
//! `Ok(())`; each non-zero status is an [`Error`] variant.

macro_rules! hci_errors {
    (
        $(
            $(#[$doc:meta])*
            $variant:ident = $code:literal,
        )+
    ) => {
        /// HCI status codes produced by the advertising adaptation layer, as defined in
        /// Bluetooth Core Specification, Vol 1, Part F.
        #[derive(Debug, Clone, Copy, Eq, PartialEq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        pub enum Error {
            $(
                $(#[$doc])*
                $variant,
            )+
            /// Any other non-zero status, usually passed through from the link layer.
            Other(u8),
        }

        impl Error {
            /// The raw HCI status byte.
            pub const fn code(self) -> u8 {
                match self {
                    $(Self::$variant => $code,)+
                    Self::Other(c) => c,
                }
            }

            /// Interpret a raw HCI status byte. `0x00` is success, and maps to `None`.
            pub const fn from_code(code: u8) -> Option<Self> {
                match code {
                    0 => None,
                    $($code => Some(Self::$variant),)+
                    c => Some(Self::Other(c)),
                }
            }
        }
    };
}

hci_errors! {
    /// The command is not supported by this build (eg periodic advertising is disabled).
    UnknownHciCommand = 0x01,
    /// A buffer pool, or the aggregate advertising data length, is exhausted.
    MemoryCapacityExceeded = 0x07,
    /// The command is legal, but not in the current state of the advertising set.
    CommandDisallowed = 0x0C,
    /// The parameters are structurally illegal.
    InvalidHciCmdParams = 0x12,
    /// No legacy buffer is free; the link layer still holds all of them.
    ControllerBusy = 0x3A,
    /// The advertising handle doesn't correspond to a configured advertising set.
    UnknownAdvertisingIdentifier = 0x42,
}

/// Alias for Result<T, Error>.
pub type Result<T> = core::result::Result<T, Error>;

/// HCI status byte for a command result: `0x00` on success.
pub fn status<T>(result: &Result<T>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(e) => e.code(),
    }
}

impl From<Error> for u8 {
    fn from(error: Error) -> Self {
        error.code()
    }
}

/// A fixed pool, or the advertising arena, has no room for the request.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AllocError;
