use serde::{Deserialize, Serialize};

/// Lifecycle state of an application audio session.
///
/// `Active` means the session currently has a live audio stream,
/// `Inactive` means it exists but is silent, and `Expired` means the
/// owning application no longer holds the session open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Inactive,
    Active,
    Expired,
}

/// Reason reported by the platform when a session is disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    DeviceRemoved,
    ServerShutdown,
    FormatChanged,
    SessionLogoff,
    SessionDisconnected,
    ExclusiveModeOverride,
}
