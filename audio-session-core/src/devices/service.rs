//! Endpoint enumeration and topology notifications.
//!
//! Thin policy layer over the platform `EndpointBackend`: every call is
//! marshaled through the serial executor, and default-endpoint lookups
//! treat "not configured" as an absent result rather than an error.

use std::sync::Arc;

use crate::models::device::{AudioDevice, DataFlow, DeviceRole, StateMask};
use crate::models::error::AudioError;
use crate::threading::SerialExecutor;
use crate::traits::endpoint_backend::{DeviceNotificationSink, EndpointBackend};

/// Device enumeration service.
pub struct DeviceEnumeratorService {
    backend: Arc<dyn EndpointBackend>,
    executor: SerialExecutor,
}

impl DeviceEnumeratorService {
    pub fn new(backend: Arc<dyn EndpointBackend>, executor: SerialExecutor) -> Self {
        Self { backend, executor }
    }

    /// List endpoints for `flow` matching `mask`.
    ///
    /// Zero matches is an empty collection; a failing native call is a
    /// propagated error, never a partial result.
    pub fn enumerate_endpoints(
        &self,
        flow: DataFlow,
        mask: StateMask,
    ) -> Result<Vec<AudioDevice>, AudioError> {
        let backend = Arc::clone(&self.backend);
        self.executor
            .invoke(move || backend.enumerate_endpoints(flow, mask))
    }

    /// Default endpoint for `flow`/`role`; `None` when no default is
    /// configured or resolution fails (failures are logged, not
    /// surfaced).
    pub fn default_endpoint(&self, flow: DataFlow, role: DeviceRole) -> Option<AudioDevice> {
        let backend = Arc::clone(&self.backend);
        match self
            .executor
            .invoke(move || backend.default_endpoint(flow, role))
        {
            Ok(device) => device,
            Err(err) => {
                log::warn!("default endpoint lookup failed for {flow:?}/{role:?}: {err}");
                None
            }
        }
    }

    /// Identifier-only variant of `default_endpoint`.
    pub fn default_endpoint_id(&self, flow: DataFlow, role: DeviceRole) -> Option<String> {
        let backend = Arc::clone(&self.backend);
        match self
            .executor
            .invoke(move || backend.default_endpoint_id(flow, role))
        {
            Ok(id) => id,
            Err(err) => {
                log::warn!("default endpoint id lookup failed for {flow:?}/{role:?}: {err}");
                None
            }
        }
    }

    /// Resolve an endpoint by identifier; `DeviceNotFound` when no such
    /// endpoint exists.
    pub fn device(&self, device_id: &str) -> Result<AudioDevice, AudioError> {
        let backend = Arc::clone(&self.backend);
        let device_id = device_id.to_string();
        self.executor.invoke(move || backend.device(&device_id))
    }

    /// Forward device-topology notifications to `sink`.
    ///
    /// Must be undone with `unregister_notification_sink` before
    /// process exit or the sink leaks at the native layer.
    pub fn register_notification_sink(
        &self,
        sink: Arc<dyn DeviceNotificationSink>,
    ) -> Result<(), AudioError> {
        let backend = Arc::clone(&self.backend);
        self.executor
            .invoke(move || backend.register_notification_sink(sink))
    }

    pub fn unregister_notification_sink(&self) -> Result<(), AudioError> {
        let backend = Arc::clone(&self.backend);
        self.executor
            .invoke(move || backend.unregister_notification_sink())
    }
}
