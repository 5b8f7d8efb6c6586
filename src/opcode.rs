//! Opcodes of the HCI commands this crate handles.

pub use bluetooth_hci::Opcode;

const LE_CONTROLLER_OGF: u16 = 0x08;

macro_rules! opcodes {
    (
        $(
            $_ogf_comment:ident = $ogf:expr;
            {
                $(pub const $var:ident = $ocf:expr;)+
            }
        )+
    ) => {
        $($(
            pub const $var: Opcode = Opcode::new($ogf, $ocf);
        )+)+
    }
}

opcodes! {
    LeController = LE_CONTROLLER_OGF;
    {
        pub const LE_SET_ADVERTISING_DATA = 0x0008;
        pub const LE_SET_SCAN_RESPONSE_DATA = 0x0009;
        pub const LE_SET_EXTENDED_ADVERTISING_DATA = 0x0037;
        pub const LE_SET_EXTENDED_SCAN_RESPONSE_DATA = 0x0038;
        pub const LE_SET_EXTENDED_ADVERTISING_ENABLE = 0x0039;
        pub const LE_READ_MAXIMUM_ADVERTISING_DATA_LENGTH = 0x003A;
        pub const LE_SET_PERIODIC_ADVERTISING_DATA = 0x003F;
        pub const LE_SET_PERIODIC_ADVERTISING_ENABLE = 0x0040;
        pub const LE_SET_PERIODIC_ADVERTISING_SUBEVENT_DATA = 0x0082;
        pub const LE_SET_PERIODIC_ADVERTISING_RESPONSE_DATA = 0x0083;
    }
}
