//! HCI commands
//!
//! Commands are grouped by their opcode group. Each command is a module with the parameter of the
//! command and a `send` function that blocks until the event ending the command is received.

pub mod cb;
pub mod info_params;
pub mod le;
pub mod link_control;

use std::time::Duration;

/// The time to wait for a controller to respond to a command
pub const COMMAND_TIMEOUT: Duration = Duration::from_millis(1000);
