use thiserror::Error;

/// Errors surfaced by session controllers and device enumeration.
///
/// Faults raised inside event callbacks or peak polling are absorbed
/// locally and never appear here; see the controller and poller modules.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioError {
    /// The session handle does not expose a facet that is required at
    /// construction time (control/notification or simple volume).
    #[error("session handle is missing the {0} facet")]
    InvalidHandle(&'static str),

    /// No endpoint with the requested identifier exists.
    #[error("device not found: {device_id}")]
    DeviceNotFound { device_id: String },

    /// The underlying platform call reported a non-success status.
    #[error("native call failed: {context} (status {status:#010x})")]
    NativeCall {
        context: &'static str,
        status: i32,
    },

    /// The native object behind a handle has been released while a
    /// poller or callback was still using it.
    #[error("native handle is no longer valid")]
    StaleHandle,
}

impl AudioError {
    pub fn native(context: &'static str, status: i32) -> Self {
        Self::NativeCall { context, status }
    }
}
