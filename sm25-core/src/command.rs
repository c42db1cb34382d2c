//! SM25 command codes

use std::fmt;

use crate::error::{Error, Result};

/// Reader command codes
///
/// The same code identifies an outgoing request and the frames the
/// reader answers it with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Command {
    // Matching
    Verify = 0x0101,
    Identify = 0x0102,

    // Enrollment
    Enroll = 0x0103,
    EnrollOneTime = 0x0104,
    GetEnrollData = 0x0105,
    StoreEnrollData = 0x0106,

    // Template storage
    ClearTemplate = 0x0107,
    ClearAllTemplate = 0x0108,
    GetEmptyId = 0x0109,
    ReadTemplate = 0x010A,
    WriteTemplate = 0x010B,
    GetTemplateStatus = 0x010C,
    GetBrokenTemplate = 0x010D,
    GetEnrollCount = 0x0128,

    // Device
    SetParam = 0x0111,
    GetParam = 0x0112,
    GetDeviceName = 0x0113,
    GetFwVersion = 0x0114,
    FingerDetect = 0x0115,
    SetFingerTimeout = 0x0116,
    SetDeviceId = 0x0117,
    SetSecurityLevel = 0x0118,
    SetDuplicationCheck = 0x0119,
    SetBaudRate = 0x011A,
    AdjustSensor = 0x0137,
    EnterStandbyState = 0x0155,

    // Session
    FpCancel = 0x0130,
    TestConnection = 0x0150,

    /// Sentinel for codes this table does not know
    Unknown = 0xFFFF,
}

impl Command {
    /// Map a raw code, falling back to [`Command::Unknown`]
    pub fn from_code(code: u16) -> Self {
        Self::try_from(code).unwrap_or(Self::Unknown)
    }

    /// Raw wire code
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Get command name
    pub fn name(self) -> &'static str {
        match self {
            Self::Verify => "CMD_VERIFY",
            Self::Identify => "CMD_IDENTIFY",
            Self::Enroll => "CMD_ENROLL",
            Self::EnrollOneTime => "CMD_ENROLL_ONETIME",
            Self::GetEnrollData => "CMD_GET_ENROLL_DATA",
            Self::StoreEnrollData => "CMD_STORE_ENROLL_DATA",
            Self::ClearTemplate => "CMD_CLEAR_TEMPLATE",
            Self::ClearAllTemplate => "CMD_CLEAR_ALLTEMPLATE",
            Self::GetEmptyId => "CMD_GET_EMPTY_ID",
            Self::ReadTemplate => "CMD_READ_TEMPLATE",
            Self::WriteTemplate => "CMD_WRITE_TEMPLATE",
            Self::GetTemplateStatus => "CMD_GET_TEMPLATE_STATUS",
            Self::GetBrokenTemplate => "CMD_GET_BROKEN_TEMPLATE",
            Self::GetEnrollCount => "CMD_GET_ENROLL_COUNT",
            Self::SetParam => "CMD_SET_PARAM",
            Self::GetParam => "CMD_GET_PARAM",
            Self::GetDeviceName => "CMD_GET_DEVICE_NAME",
            Self::GetFwVersion => "CMD_GET_FW_VERSION",
            Self::FingerDetect => "CMD_FINGER_DETECT",
            Self::SetFingerTimeout => "CMD_SET_FINGER_TIMEOUT",
            Self::SetDeviceId => "CMD_SET_DEVICE_ID",
            Self::SetSecurityLevel => "CMD_SET_SECURITYLEVEL",
            Self::SetDuplicationCheck => "CMD_SET_DUP_CHECK",
            Self::SetBaudRate => "CMD_SET_BAUDRATE",
            Self::AdjustSensor => "CMD_ADJUST_SENSOR",
            Self::EnterStandbyState => "CMD_ENTERSTANDBY_STATE",
            Self::FpCancel => "CMD_FP_CANCEL",
            Self::TestConnection => "CMD_TEST_CONNECTION",
            Self::Unknown => "CMD_UNKNOWN",
        }
    }
}

impl From<Command> for u16 {
    fn from(cmd: Command) -> u16 {
        cmd as u16
    }
}

impl TryFrom<u16> for Command {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0x0101 => Ok(Self::Verify),
            0x0102 => Ok(Self::Identify),
            0x0103 => Ok(Self::Enroll),
            0x0104 => Ok(Self::EnrollOneTime),
            0x0105 => Ok(Self::GetEnrollData),
            0x0106 => Ok(Self::StoreEnrollData),
            0x0107 => Ok(Self::ClearTemplate),
            0x0108 => Ok(Self::ClearAllTemplate),
            0x0109 => Ok(Self::GetEmptyId),
            0x010A => Ok(Self::ReadTemplate),
            0x010B => Ok(Self::WriteTemplate),
            0x010C => Ok(Self::GetTemplateStatus),
            0x010D => Ok(Self::GetBrokenTemplate),
            0x0128 => Ok(Self::GetEnrollCount),
            0x0111 => Ok(Self::SetParam),
            0x0112 => Ok(Self::GetParam),
            0x0113 => Ok(Self::GetDeviceName),
            0x0114 => Ok(Self::GetFwVersion),
            0x0115 => Ok(Self::FingerDetect),
            0x0116 => Ok(Self::SetFingerTimeout),
            0x0117 => Ok(Self::SetDeviceId),
            0x0118 => Ok(Self::SetSecurityLevel),
            0x0119 => Ok(Self::SetDuplicationCheck),
            0x011A => Ok(Self::SetBaudRate),
            0x0137 => Ok(Self::AdjustSensor),
            0x0155 => Ok(Self::EnterStandbyState),
            0x0130 => Ok(Self::FpCancel),
            0x0150 => Ok(Self::TestConnection),
            _ => Err(Error::UnknownCommand(value)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:04X})", self.name(), *self as u16)
    }
}
