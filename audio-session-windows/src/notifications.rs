//! `IMMNotificationClient` adapter.
//!
//! Forwards device-topology callbacks from the MMDevice enumerator to
//! the registered `DeviceNotificationSink`.

use std::sync::Arc;

use windows::core::{implement, PCWSTR};
use windows::Win32::Media::Audio::{
    eCapture, eCommunications, eMultimedia, EDataFlow, ERole, IMMNotificationClient,
    IMMNotificationClient_Impl, DEVICE_STATE,
};
use windows::Win32::UI::Shell::PropertiesSystem::PROPERTYKEY;
// Re-export windows_core so the implement macro can find it
#[allow(unused_imports)]
use windows_core;

use audio_session_core::{DataFlow, DeviceEvent, DeviceNotificationSink, DeviceRole};

use crate::endpoints::convert_device_state;

/// COM callback object forwarding topology events to a sink.
#[implement(IMMNotificationClient)]
pub struct NotificationForwarder {
    sink: Arc<dyn DeviceNotificationSink>,
}

impl NotificationForwarder {
    pub fn new(sink: Arc<dyn DeviceNotificationSink>) -> Self {
        Self { sink }
    }

    fn convert_flow(flow: EDataFlow) -> DataFlow {
        if flow == eCapture {
            DataFlow::Capture
        } else {
            DataFlow::Render
        }
    }

    fn convert_role(role: ERole) -> DeviceRole {
        if role == eCommunications {
            DeviceRole::Communications
        } else if role == eMultimedia {
            DeviceRole::Multimedia
        } else {
            DeviceRole::Console
        }
    }
}

impl IMMNotificationClient_Impl for NotificationForwarder_Impl {
    fn OnDeviceStateChanged(
        &self,
        pwstrdeviceid: &PCWSTR,
        dwnewstate: DEVICE_STATE,
    ) -> windows::core::Result<()> {
        unsafe {
            if let Ok(device_id) = pwstrdeviceid.to_string() {
                self.sink.on_device_event(DeviceEvent::DeviceStateChanged {
                    device_id,
                    new_state: convert_device_state(dwnewstate),
                });
            }
        }
        Ok(())
    }

    fn OnDeviceAdded(&self, pwstrdeviceid: &PCWSTR) -> windows::core::Result<()> {
        unsafe {
            if let Ok(device_id) = pwstrdeviceid.to_string() {
                self.sink
                    .on_device_event(DeviceEvent::DeviceAdded { device_id });
            }
        }
        Ok(())
    }

    fn OnDeviceRemoved(&self, pwstrdeviceid: &PCWSTR) -> windows::core::Result<()> {
        unsafe {
            if let Ok(device_id) = pwstrdeviceid.to_string() {
                self.sink
                    .on_device_event(DeviceEvent::DeviceRemoved { device_id });
            }
        }
        Ok(())
    }

    fn OnDefaultDeviceChanged(
        &self,
        flow: EDataFlow,
        role: ERole,
        pwstrdefaultdeviceid: &PCWSTR,
    ) -> windows::core::Result<()> {
        unsafe {
            let device_id = if pwstrdefaultdeviceid.is_null() {
                None
            } else {
                pwstrdefaultdeviceid.to_string().ok()
            };

            self.sink.on_device_event(DeviceEvent::DefaultDeviceChanged {
                flow: NotificationForwarder::convert_flow(flow),
                role: NotificationForwarder::convert_role(role),
                device_id,
            });
        }
        Ok(())
    }

    fn OnPropertyValueChanged(
        &self,
        pwstrdeviceid: &PCWSTR,
        _key: &PROPERTYKEY,
    ) -> windows::core::Result<()> {
        unsafe {
            if let Ok(device_id) = pwstrdeviceid.to_string() {
                self.sink
                    .on_device_event(DeviceEvent::PropertyChanged { device_id });
            }
        }
        Ok(())
    }
}
