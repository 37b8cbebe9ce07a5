use serde::{Deserialize, Serialize};

use super::device::{DataFlow, DeviceRole, DeviceState};
use super::session::{DisconnectReason, SessionState};

/// Tagged notification delivered by the native session callback
/// interface.
///
/// The platform reports events through a fixed set of synchronous
/// callback methods; the backend collapses them into this enum so the
/// controller can dispatch on the event kind in one place. Volume in
/// `SimpleVolumeChanged` is on the native 0.0–1.0 scale.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotification {
    DisplayNameChanged(String),
    IconPathChanged(String),
    SimpleVolumeChanged { volume: f32, muted: bool },
    StateChanged(SessionState),
    Disconnected(DisconnectReason),
}

/// Session volume changed (0–100 scale).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeChangedEvent {
    pub session_id: String,
    pub volume: f64,
}

/// Session mute flag changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuteChangedEvent {
    pub session_id: String,
    pub muted: bool,
}

/// Session lifecycle state changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChangedEvent {
    pub session_id: String,
    pub state: SessionState,
}

/// Session was disconnected by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectedEvent {
    pub session_id: String,
    pub reason: DisconnectReason,
}

/// Sampled peak level (0–100 scale).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakValueChangedEvent {
    pub session_id: String,
    pub peak: f64,
}

/// Device-topology events forwarded from the platform enumerator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceEvent {
    DeviceAdded {
        device_id: String,
    },
    DeviceRemoved {
        device_id: String,
    },
    DeviceStateChanged {
        device_id: String,
        new_state: DeviceState,
    },
    DefaultDeviceChanged {
        flow: DataFlow,
        role: DeviceRole,
        /// `None` when no default remains for the role.
        device_id: Option<String>,
    },
    PropertyChanged {
        device_id: String,
    },
}
