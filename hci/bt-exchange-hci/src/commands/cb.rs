//! Controller and baseband commands

/// Reset the controller
pub mod reset {
    use crate::command::{send_command, CommandParameter, Expect};
    use crate::opcodes;
    use bt_exchange_channel::{Result, SynchronousChannel, Transport};
    use std::time::Duration;

    #[derive(Clone, Copy)]
    struct Parameter;

    impl CommandParameter<0> for Parameter {
        const COMMAND: opcodes::HciCommand =
            opcodes::HciCommand::ControllerAndBaseband(opcodes::ControllerAndBaseband::Reset);
        fn get_parameter(&self) -> [u8; 0] {
            []
        }
    }

    pub fn send<T: Transport>(channel: &SynchronousChannel<T>, wait: Duration) -> Result<()> {
        send_command(channel, wait, Parameter, Expect::CommandComplete).map(|_| ())
    }
}

/// Set the events the controller sends to the host
pub mod set_event_mask {
    use crate::command::{send_command, CommandParameter, Expect};
    use crate::opcodes;
    use bt_exchange_channel::{Result, SynchronousChannel, Transport};
    use std::time::Duration;

    /// The default event mask of a controller after a reset
    pub const DEFAULT_MASK: u64 = 0x0000_1FFF_FFFF_FFFF;

    /// Mask bit of the LE meta event
    pub const LE_META_EVENT: u64 = 1 << 61;

    struct Parameter(u64);

    impl CommandParameter<8> for Parameter {
        const COMMAND: opcodes::HciCommand =
            opcodes::HciCommand::ControllerAndBaseband(opcodes::ControllerAndBaseband::SetEventMask);
        fn get_parameter(&self) -> [u8; 8] {
            self.0.to_le_bytes()
        }
    }

    pub fn send<T: Transport>(channel: &SynchronousChannel<T>, wait: Duration, mask: u64) -> Result<()> {
        send_command(channel, wait, Parameter(mask), Expect::CommandComplete).map(|_| ())
    }
}
