//! Informational parameter commands

/// Read the version information of the local controller
pub mod read_local_version_information {
    use crate::command::{send_command, CommandParameter, Expect, ReturnParameter};
    use crate::opcodes;
    use bt_exchange_channel::{Error, Result, SynchronousChannel, Transport};
    use std::time::Duration;

    #[derive(Clone, Copy)]
    struct Parameter;

    impl CommandParameter<0> for Parameter {
        const COMMAND: opcodes::HciCommand = opcodes::HciCommand::InformationParameters(
            opcodes::InformationParameters::ReadLocalSupportedVersionInformation,
        );
        fn get_parameter(&self) -> [u8; 0] {
            []
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LocalVersion {
        pub hci_version: u8,
        pub hci_revision: u16,
        pub lmp_version: u8,
        pub manufacturer_name: u16,
        pub lmp_subversion: u16,
    }

    impl ReturnParameter for LocalVersion {
        fn try_from_raw(raw: &[u8]) -> Option<Self> {
            // the first byte is the status
            let raw = raw.get(1..9)?;

            Some(LocalVersion {
                hci_version: raw[0],
                hci_revision: u16::from_le_bytes([raw[1], raw[2]]),
                lmp_version: raw[3],
                manufacturer_name: u16::from_le_bytes([raw[4], raw[5]]),
                lmp_subversion: u16::from_le_bytes([raw[6], raw[7]]),
            })
        }
    }

    pub fn send<T: Transport>(channel: &SynchronousChannel<T>, wait: Duration) -> Result<LocalVersion> {
        send_command(channel, wait, Parameter, Expect::CommandComplete)?
            .return_parameter()
            .ok_or(Error::General)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn parse_local_version() {
            let raw = [0x00, 0x09, 0x0D, 0x00, 0x09, 0x0F, 0x00, 0x10, 0x22];

            assert_eq!(
                Some(LocalVersion {
                    hci_version: 9,
                    hci_revision: 0x000D,
                    lmp_version: 9,
                    manufacturer_name: 0x000F,
                    lmp_subversion: 0x2210,
                }),
                LocalVersion::try_from_raw(&raw)
            );

            assert_eq!(None, LocalVersion::try_from_raw(&raw[..5]));
        }
    }
}

/// Read the address of the local controller
pub mod read_bd_addr {
    use crate::command::{send_command, CommandParameter, Expect};
    use crate::opcodes;
    use bt_exchange_channel::{Error, Result, SynchronousChannel, Transport};
    use bt_exchange_core::Address;
    use std::time::Duration;

    #[derive(Clone, Copy)]
    struct Parameter;

    impl CommandParameter<0> for Parameter {
        const COMMAND: opcodes::HciCommand =
            opcodes::HciCommand::InformationParameters(opcodes::InformationParameters::ReadBD_ADDR);
        fn get_parameter(&self) -> [u8; 0] {
            []
        }
    }

    pub fn send<T: Transport>(channel: &SynchronousChannel<T>, wait: Duration) -> Result<Address> {
        let frame = send_command(channel, wait, Parameter, Expect::CommandComplete)?;

        frame
            .response()
            .get(1..7)
            .and_then(Address::try_from_slice)
            .ok_or(Error::General)
    }
}
