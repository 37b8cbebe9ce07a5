use std::sync::Arc;

use crate::models::error::AudioError;
use crate::models::events::SessionNotification;
use crate::models::session::SessionState;

/// Control and notification facet of a native session handle.
///
/// All methods except `release` are only ever called on the executor
/// worker thread; implementations may rely on that for apartment
/// affinity.
pub trait SessionControl: Send + Sync {
    /// Whether this is the system-sounds ("dummy") session.
    fn is_system_sounds(&self) -> Result<bool, AudioError>;

    fn display_name(&self) -> Result<String, AudioError>;

    fn icon_path(&self) -> Result<String, AudioError>;

    fn state(&self) -> Result<SessionState, AudioError>;

    /// Owning process id; 0 for system sessions.
    fn process_id(&self) -> Result<u32, AudioError>;

    fn session_identifier(&self) -> Result<String, AudioError>;

    /// Register `sink` to receive native session notifications.
    ///
    /// The sink stays registered until `unregister_notification_sink`
    /// is called; leaving it registered leaks a native reference.
    fn register_notification_sink(
        &self,
        sink: Arc<dyn SessionNotificationSink>,
    ) -> Result<(), AudioError>;

    fn unregister_notification_sink(&self) -> Result<(), AudioError>;

    /// Drop the native reference backing this handle. Idempotent.
    ///
    /// After release, every facet sharing the handle reports
    /// `AudioError::StaleHandle`.
    fn release(&self);
}

/// Simple volume facet: master volume and mute, native 0.0–1.0 scale.
pub trait SimpleVolume: Send + Sync {
    fn master_volume(&self) -> Result<f32, AudioError>;

    fn set_master_volume(&self, level: f32) -> Result<(), AudioError>;

    fn mute(&self) -> Result<bool, AudioError>;

    fn set_mute(&self, muted: bool) -> Result<(), AudioError>;
}

/// Optional peak metering facet.
pub trait PeakMeter: Send + Sync {
    /// Current peak sample value, native 0.0–1.0 scale.
    fn peak_value(&self) -> Result<f32, AudioError>;
}

/// One native session handle and the capability facets it exposes.
///
/// A handle must expose `control` and `volume` for a
/// `SessionController` to be constructed over it; `metering` is
/// optional and enables peak polling when present.
pub trait SessionHandle: Send + Sync {
    fn control(&self) -> Option<Arc<dyn SessionControl>>;

    fn volume(&self) -> Option<Arc<dyn SimpleVolume>>;

    fn metering(&self) -> Option<Arc<dyn PeakMeter>>;
}

/// Receiver for tagged session notifications.
///
/// Invoked synchronously by the native callback, possibly on the
/// executor worker thread; implementations must not block.
pub trait SessionNotificationSink: Send + Sync {
    fn on_notification(&self, event: SessionNotification);
}
