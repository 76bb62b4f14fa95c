//! HCI Command Opcodes
//!
//! Opcodes are composed of a group identifier and an individual command identifier specific to the
//! group. The group identifier and individual identifier are put together to form the raw opcode
//! value.
//!
//! Instead of using group and command codes to create an opcode, the enum `HciCommand` should be
//! used to create an opcode. `HciCommand` is an enumeration of the HCI commands used by this
//! library, an opcode can be acquired by the method `into_opcode`.
//!
//! ```
//! # use bt_exchange_hci::opcodes::{HciCommand, LinkControl};
//!
//! assert_eq!(0x405, HciCommand::LinkControl(LinkControl::CreateConnection).into_opcode());
//! ```

use core::convert::TryFrom;

/// Enumerations of the various HCI command opcodes.
///
/// HciCommands consists of the HCI command groups containing the HCI commands within the group.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HciCommand {
    LinkControl(LinkControl),
    ControllerAndBaseband(ControllerAndBaseband),
    InformationParameters(InformationParameters),
    LEController(LEController),
}

impl HciCommand {
    /// Get the opcode for this command
    pub const fn into_opcode(self) -> u16 {
        self.into_opcode_pair().into_opcode()
    }

    /// Get the `OpCodePair` for this command
    pub const fn into_opcode_pair(self) -> OpCodePair {
        match self {
            HciCommand::LinkControl(ocf) => ocf.into_opcode_pair(),
            HciCommand::ControllerAndBaseband(ocf) => ocf.into_opcode_pair(),
            HciCommand::InformationParameters(ocf) => ocf.into_opcode_pair(),
            HciCommand::LEController(ocf) => ocf.into_opcode_pair(),
        }
    }
}

impl core::fmt::Display for HciCommand {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let opcode = self.into_opcode_pair();

        match self {
            HciCommand::LinkControl(c) => write!(f, "link control - {} ({:#x}:{:#x})", c, opcode.ogf, opcode.ocf),
            HciCommand::ControllerAndBaseband(c) => write!(
                f,
                "controller and baseband - {} ({:#x}:{:#x})",
                c, opcode.ogf, opcode.ocf
            ),
            HciCommand::InformationParameters(c) => write!(
                f,
                "information parameters - {} ({:#x}:{:#x})",
                c, opcode.ogf, opcode.ocf
            ),
            HciCommand::LEController(c) => write!(f, "LE controller - {} ({:#x}:{:#x})", c, opcode.ogf, opcode.ocf),
        }
    }
}

/// An type for the pair of OGF (OpCode Group Field) and OCF (OpCode Command Field)
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct OpCodePair {
    pub ogf: u16,
    pub ocf: u16,
}

impl OpCodePair {
    /// Convert the OpCodePair into the opcode
    ///
    /// The returned value is the OpCode used with building a HCI command Packet.
    pub const fn into_opcode(self) -> u16 {
        // The first 10 bits of the OpCode is the OCF field and the last 6 bits is the OGF field.
        (self.ocf & 0x3FFu16) | (self.ogf << 10)
    }

    /// Convert a HCI command packet formatted Op Code into an OpCodePair
    pub const fn from_opcode(value: u16) -> Self {
        OpCodePair {
            ogf: value >> 10,
            ocf: value & 0x3FFu16,
        }
    }
}

impl From<HciCommand> for OpCodePair {
    fn from(cmd: HciCommand) -> OpCodePair {
        cmd.into_opcode_pair()
    }
}

impl TryFrom<OpCodePair> for HciCommand {
    type Error = String;

    fn try_from(opc_pair: OpCodePair) -> Result<Self, Self::Error> {
        match opc_pair.ogf {
            0x1 => Ok(HciCommand::LinkControl(LinkControl::try_from(opc_pair.ocf)?)),
            0x3 => Ok(HciCommand::ControllerAndBaseband(ControllerAndBaseband::try_from(
                opc_pair.ocf,
            )?)),
            0x4 => Ok(HciCommand::InformationParameters(InformationParameters::try_from(
                opc_pair.ocf,
            )?)),
            0x8 => Ok(HciCommand::LEController(LEController::try_from(opc_pair.ocf)?)),
            _ => Err(format!("Unknown OpCode Group Field value: 0x{:x}", opc_pair.ogf)),
        }
    }
}

impl TryFrom<u16> for HciCommand {
    type Error = String;

    fn try_from(opcode: u16) -> Result<Self, Self::Error> {
        HciCommand::try_from(OpCodePair::from_opcode(opcode))
    }
}

macro_rules! ocf_error {
    () => {
        "OpCode Group Field '{}' doesn't have the Op Code Field 0x{:x}"
    };
}

/// Link control commands
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum LinkControl {
    CreateConnection,
    Disconnect,
    RemoteNameRequest,
}

impl LinkControl {
    const OGF: u16 = 0x1;

    const fn into_opcode_pair(self) -> OpCodePair {
        use self::LinkControl::*;

        OpCodePair {
            ogf: LinkControl::OGF,
            ocf: match self {
                CreateConnection => 0x5,
                Disconnect => 0x6,
                RemoteNameRequest => 0x19,
            },
        }
    }

    fn try_from(ocf: u16) -> Result<Self, String> {
        match ocf {
            0x5 => Ok(LinkControl::CreateConnection),
            0x6 => Ok(LinkControl::Disconnect),
            0x19 => Ok(LinkControl::RemoteNameRequest),
            _ => Err(format!(ocf_error!(), "Link Control", ocf)),
        }
    }
}

impl core::fmt::Display for LinkControl {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            LinkControl::CreateConnection => f.write_str("create connection"),
            LinkControl::Disconnect => f.write_str("disconnect"),
            LinkControl::RemoteNameRequest => f.write_str("remote name request"),
        }
    }
}

/// Controller and baseband commands
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum ControllerAndBaseband {
    SetEventMask,
    Reset,
}

impl ControllerAndBaseband {
    const OGF: u16 = 0x3;

    const fn into_opcode_pair(self) -> OpCodePair {
        use self::ControllerAndBaseband::*;

        OpCodePair {
            ogf: ControllerAndBaseband::OGF,
            ocf: match self {
                SetEventMask => 0x1,
                Reset => 0x3,
            },
        }
    }

    fn try_from(ocf: u16) -> Result<Self, String> {
        match ocf {
            0x1 => Ok(ControllerAndBaseband::SetEventMask),
            0x3 => Ok(ControllerAndBaseband::Reset),
            _ => Err(format!(ocf_error!(), "Controller and Baseband", ocf)),
        }
    }
}

impl core::fmt::Display for ControllerAndBaseband {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            ControllerAndBaseband::SetEventMask => f.write_str("set event mask"),
            ControllerAndBaseband::Reset => f.write_str("reset"),
        }
    }
}

/// Information parameter commands
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum InformationParameters {
    ReadLocalSupportedVersionInformation,
    #[allow(non_camel_case_types)]
    ReadBD_ADDR,
}

impl InformationParameters {
    const OGF: u16 = 0x4;

    const fn into_opcode_pair(self) -> OpCodePair {
        use self::InformationParameters::*;

        OpCodePair {
            ogf: InformationParameters::OGF,
            ocf: match self {
                ReadLocalSupportedVersionInformation => 0x1,
                ReadBD_ADDR => 0x9,
            },
        }
    }

    fn try_from(ocf: u16) -> Result<Self, String> {
        match ocf {
            0x1 => Ok(InformationParameters::ReadLocalSupportedVersionInformation),
            0x9 => Ok(InformationParameters::ReadBD_ADDR),
            _ => Err(format!(ocf_error!(), "Information Parameters", ocf)),
        }
    }
}

impl core::fmt::Display for InformationParameters {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            InformationParameters::ReadLocalSupportedVersionInformation => {
                f.write_str("read local supported version information")
            }
            InformationParameters::ReadBD_ADDR => f.write_str("read BR_ADDR"),
        }
    }
}

/// Bluetooth LE commands
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum LEController {
    SetAdvertisingParameters,
    SetAdvertisingData,
    SetAdvertisingEnable,
    SetScanParameters,
    SetScanEnable,
    CreateConnection,
    CreateConnectionCancel,
    ReadRemoteFeatures,
}

impl LEController {
    const OGF: u16 = 0x8;

    const fn into_opcode_pair(self) -> OpCodePair {
        use self::LEController::*;

        OpCodePair {
            ogf: LEController::OGF,
            ocf: match self {
                SetAdvertisingParameters => 0x6,
                SetAdvertisingData => 0x8,
                SetAdvertisingEnable => 0xa,
                SetScanParameters => 0xb,
                SetScanEnable => 0xC,
                CreateConnection => 0xD,
                CreateConnectionCancel => 0xe,
                ReadRemoteFeatures => 0x16,
            },
        }
    }

    fn try_from(ocf: u16) -> Result<Self, String> {
        match ocf {
            0x6 => Ok(LEController::SetAdvertisingParameters),
            0x8 => Ok(LEController::SetAdvertisingData),
            0xa => Ok(LEController::SetAdvertisingEnable),
            0xb => Ok(LEController::SetScanParameters),
            0xC => Ok(LEController::SetScanEnable),
            0xD => Ok(LEController::CreateConnection),
            0xe => Ok(LEController::CreateConnectionCancel),
            0x16 => Ok(LEController::ReadRemoteFeatures),
            _ => Err(format!(ocf_error!(), "LE Controller", ocf)),
        }
    }
}

impl core::fmt::Display for LEController {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            LEController::SetAdvertisingParameters => f.write_str("set advertising parameters"),
            LEController::SetAdvertisingData => f.write_str("set advertising data"),
            LEController::SetAdvertisingEnable => f.write_str("set advertising enable"),
            LEController::SetScanParameters => f.write_str("set scan parameters"),
            LEController::SetScanEnable => f.write_str("set scan enable"),
            LEController::CreateConnection => f.write_str("create connection"),
            LEController::CreateConnectionCancel => f.write_str("create connection cancel"),
            LEController::ReadRemoteFeatures => f.write_str("read remote features"),
        }
    }
}
