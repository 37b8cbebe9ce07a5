use std::sync::Arc;

use crate::models::device::{AudioDevice, DataFlow, DeviceRole, StateMask};
use crate::models::error::AudioError;
use crate::models::events::DeviceEvent;

/// Platform device-enumerator backend.
///
/// `DeviceEnumeratorService` marshals every call through the serial
/// executor, so implementations may assume apartment affinity.
pub trait EndpointBackend: Send + Sync {
    /// List endpoints matching `flow` and `mask`.
    ///
    /// Either the full matching set is returned or the call fails;
    /// never a partially-filled collection.
    fn enumerate_endpoints(
        &self,
        flow: DataFlow,
        mask: StateMask,
    ) -> Result<Vec<AudioDevice>, AudioError>;

    /// Default endpoint for `flow`/`role`, `None` when not configured.
    fn default_endpoint(
        &self,
        flow: DataFlow,
        role: DeviceRole,
    ) -> Result<Option<AudioDevice>, AudioError>;

    /// Identifier of the default endpoint without building the full
    /// device object.
    fn default_endpoint_id(
        &self,
        flow: DataFlow,
        role: DeviceRole,
    ) -> Result<Option<String>, AudioError>;

    /// Resolve a specific endpoint by identifier.
    fn device(&self, device_id: &str) -> Result<AudioDevice, AudioError>;

    /// Register `sink` for device-topology notifications.
    ///
    /// Must be undone with `unregister_notification_sink` before the
    /// backend is dropped or the sink leaks at the native layer.
    fn register_notification_sink(
        &self,
        sink: Arc<dyn DeviceNotificationSink>,
    ) -> Result<(), AudioError>;

    fn unregister_notification_sink(&self) -> Result<(), AudioError>;
}

/// Client-implemented receiver for device-topology events.
pub trait DeviceNotificationSink: Send + Sync {
    fn on_device_event(&self, event: DeviceEvent);
}
