use std::ops::BitOr;

use serde::{Deserialize, Serialize};

/// Direction audio flows through an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFlow {
    Render,
    Capture,
}

/// Endpoint role assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceRole {
    /// Games, system sounds, general applications.
    Console,
    /// Music and video playback.
    Multimedia,
    /// VoIP and telephony.
    Communications,
}

/// Endpoint connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    Active,
    Disabled,
    NotPresent,
    Unplugged,
}

impl DeviceState {
    fn bit(self) -> u32 {
        match self {
            Self::Active => 0x1,
            Self::Disabled => 0x2,
            Self::NotPresent => 0x4,
            Self::Unplugged => 0x8,
        }
    }
}

/// Bit mask selecting which device states an enumeration includes.
///
/// The bit layout matches the platform's state constants, so backends
/// can pass `bits()` straight through to the native enumeration call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateMask(u32);

impl StateMask {
    pub const ACTIVE: StateMask = StateMask(0x1);
    pub const DISABLED: StateMask = StateMask(0x2);
    pub const NOT_PRESENT: StateMask = StateMask(0x4);
    pub const UNPLUGGED: StateMask = StateMask(0x8);
    pub const ALL: StateMask = StateMask(0xF);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, state: DeviceState) -> bool {
        self.0 & state.bit() != 0
    }
}

impl BitOr for StateMask {
    type Output = StateMask;

    fn bitor(self, rhs: StateMask) -> StateMask {
        StateMask(self.0 | rhs.0)
    }
}

/// An audio endpoint as reported by the platform enumerator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDevice {
    /// Opaque native endpoint identifier.
    pub id: String,
    /// Human-readable endpoint name.
    pub name: String,
    pub flow: DataFlow,
    pub state: DeviceState,
    /// Roles for which this endpoint is currently the platform default.
    pub default_roles: Vec<DeviceRole>,
}

impl AudioDevice {
    pub fn is_default_for(&self, role: DeviceRole) -> bool {
        self.default_roles.contains(&role)
    }
}
