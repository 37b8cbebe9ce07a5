//! MMDevice endpoint backend.
//!
//! Implements `EndpointBackend` over `IMMDeviceEnumerator`: endpoint
//! listing with state filtering, default-endpoint resolution per role,
//! lookup by identifier, and topology notification registration.

use std::sync::Arc;

use parking_lot::Mutex;
use windows::core::PCWSTR;
use windows::Win32::Devices::FunctionDiscovery::PKEY_Device_FriendlyName;
use windows::Win32::Media::Audio::{
    eCapture, eCommunications, eConsole, eMultimedia, eRender, EDataFlow, ERole, IMMDevice,
    IMMDeviceEnumerator, IMMNotificationClient, MMDeviceEnumerator, DEVICE_STATE,
};
use windows::Win32::System::Com::StructuredStorage::{PropVariantClear, PROPVARIANT};
use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_ALL, STGM_READ};
use windows::Win32::System::Variant::VT_LPWSTR;

use audio_session_core::{
    AudioDevice, AudioError, DataFlow, DeviceNotificationSink, DeviceRole, DeviceState,
    EndpointBackend, SerialExecutor, StateMask,
};

use crate::com::{com_error, to_wide, E_NOTFOUND};
use crate::notifications::NotificationForwarder;

const ROLES: [DeviceRole; 3] = [
    DeviceRole::Console,
    DeviceRole::Multimedia,
    DeviceRole::Communications,
];

/// Endpoint backend over the MMDevice enumerator.
pub struct WasapiEndpointBackend {
    enumerator: IMMDeviceEnumerator,
    /// The registered notification client, kept alive until
    /// unregistration.
    notification: Mutex<Option<IMMNotificationClient>>,
}

// SAFETY: the enumerator and notification client are only used on the
// executor worker thread; DeviceEnumeratorService marshals every call
// there.
unsafe impl Send for WasapiEndpointBackend {}
unsafe impl Sync for WasapiEndpointBackend {}

impl WasapiEndpointBackend {
    /// Create the backend on `executor`'s worker thread.
    pub fn new(executor: &SerialExecutor) -> Result<Arc<Self>, AudioError> {
        executor.invoke(|| unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                    .map_err(|e| com_error("CoCreateInstance(MMDeviceEnumerator)", e))?;
            Ok(Arc::new(Self {
                enumerator,
                notification: Mutex::new(None),
            }))
        })
    }

    /// Default endpoint ids per role for `flow`, best effort. Used to
    /// annotate enumerated devices; roles with no default resolve to
    /// `None`.
    fn default_ids(&self, flow: DataFlow) -> Vec<(DeviceRole, Option<String>)> {
        ROLES
            .iter()
            .map(|&role| {
                let id = unsafe {
                    self.enumerator
                        .GetDefaultAudioEndpoint(to_edataflow(flow), to_erole(role))
                        .ok()
                        .and_then(|device| device.GetId().ok())
                        .and_then(|id| id.to_string().ok())
                };
                (role, id)
            })
            .collect()
    }

    fn describe(
        &self,
        device: &IMMDevice,
        flow: DataFlow,
        defaults: &[(DeviceRole, Option<String>)],
    ) -> Result<AudioDevice, AudioError> {
        unsafe {
            let id = device
                .GetId()
                .map_err(|e| com_error("GetId", e))?
                .to_string()
                .unwrap_or_default();

            let state = device.GetState().map_err(|e| com_error("GetState", e))?;

            let name = read_friendly_name(device).unwrap_or_else(|| id.clone());

            let default_roles = defaults
                .iter()
                .filter(|(_, default)| default.as_deref() == Some(id.as_str()))
                .map(|(role, _)| *role)
                .collect();

            Ok(AudioDevice {
                id,
                name,
                flow,
                state: convert_device_state(state),
                default_roles,
            })
        }
    }
}

impl EndpointBackend for WasapiEndpointBackend {
    fn enumerate_endpoints(
        &self,
        flow: DataFlow,
        mask: StateMask,
    ) -> Result<Vec<AudioDevice>, AudioError> {
        unsafe {
            let collection = self
                .enumerator
                .EnumAudioEndpoints(to_edataflow(flow), DEVICE_STATE(mask.bits()))
                .map_err(|e| com_error("EnumAudioEndpoints", e))?;

            let count = collection.GetCount().map_err(|e| com_error("GetCount", e))?;
            let defaults = self.default_ids(flow);

            let mut devices = Vec::with_capacity(count as usize);
            for i in 0..count {
                let device = collection.Item(i).map_err(|e| com_error("Item", e))?;
                devices.push(self.describe(&device, flow, &defaults)?);
            }
            Ok(devices)
        }
    }

    fn default_endpoint(
        &self,
        flow: DataFlow,
        role: DeviceRole,
    ) -> Result<Option<AudioDevice>, AudioError> {
        unsafe {
            match self
                .enumerator
                .GetDefaultAudioEndpoint(to_edataflow(flow), to_erole(role))
            {
                Ok(device) => {
                    let defaults = self.default_ids(flow);
                    Ok(Some(self.describe(&device, flow, &defaults)?))
                }
                Err(err) if err.code() == E_NOTFOUND => Ok(None),
                Err(err) => Err(com_error("GetDefaultAudioEndpoint", err)),
            }
        }
    }

    fn default_endpoint_id(
        &self,
        flow: DataFlow,
        role: DeviceRole,
    ) -> Result<Option<String>, AudioError> {
        unsafe {
            match self
                .enumerator
                .GetDefaultAudioEndpoint(to_edataflow(flow), to_erole(role))
            {
                Ok(device) => {
                    let id = device.GetId().map_err(|e| com_error("GetId", e))?;
                    Ok(Some(id.to_string().unwrap_or_default()))
                }
                Err(err) if err.code() == E_NOTFOUND => Ok(None),
                Err(err) => Err(com_error("GetDefaultAudioEndpoint", err)),
            }
        }
    }

    fn device(&self, device_id: &str) -> Result<AudioDevice, AudioError> {
        unsafe {
            let wide = to_wide(device_id);
            let device = self
                .enumerator
                .GetDevice(PCWSTR(wide.as_ptr()))
                .map_err(|e| device_lookup_error(device_id, e))?;
            // Flow is not recoverable from IMMDevice directly; infer it
            // from which flow's enumeration claims the id.
            let flow = self.flow_of(device_id)?;
            let defaults = self.default_ids(flow);
            self.describe(&device, flow, &defaults)
        }
    }

    fn register_notification_sink(
        &self,
        sink: Arc<dyn DeviceNotificationSink>,
    ) -> Result<(), AudioError> {
        unsafe {
            let mut slot = self.notification.lock();
            // The enumerator holds its own reference to a registered
            // client; dropping ours without unregistering would leave
            // the old sink registered with no way to remove it.
            if let Some(previous) = slot.take() {
                self.enumerator
                    .UnregisterEndpointNotificationCallback(&previous)
                    .map_err(|e| com_error("UnregisterEndpointNotificationCallback", e))?;
            }
            let client: IMMNotificationClient = NotificationForwarder::new(sink).into();
            self.enumerator
                .RegisterEndpointNotificationCallback(&client)
                .map_err(|e| com_error("RegisterEndpointNotificationCallback", e))?;
            *slot = Some(client);
            Ok(())
        }
    }

    fn unregister_notification_sink(&self) -> Result<(), AudioError> {
        let client = self.notification.lock().take();
        let Some(client) = client else {
            return Ok(());
        };
        unsafe {
            self.enumerator
                .UnregisterEndpointNotificationCallback(&client)
                .map_err(|e| com_error("UnregisterEndpointNotificationCallback", e))
        }
    }
}

impl WasapiEndpointBackend {
    fn flow_of(&self, device_id: &str) -> Result<DataFlow, AudioError> {
        for flow in [DataFlow::Render, DataFlow::Capture] {
            let matches = unsafe {
                let collection = self
                    .enumerator
                    .EnumAudioEndpoints(to_edataflow(flow), DEVICE_STATE(StateMask::ALL.bits()))
                    .map_err(|e| com_error("EnumAudioEndpoints", e))?;
                let count = collection.GetCount().map_err(|e| com_error("GetCount", e))?;
                let mut found = false;
                for i in 0..count {
                    let device = collection.Item(i).map_err(|e| com_error("Item", e))?;
                    let id = device
                        .GetId()
                        .map_err(|e| com_error("GetId", e))?
                        .to_string()
                        .unwrap_or_default();
                    if id == device_id {
                        found = true;
                        break;
                    }
                }
                found
            };
            if matches {
                return Ok(flow);
            }
        }
        Err(AudioError::DeviceNotFound {
            device_id: device_id.to_string(),
        })
    }
}

/// Unknown ids come back as `DeviceNotFound`; any other `GetDevice`
/// failure keeps its native status.
pub(crate) fn device_lookup_error(device_id: &str, error: windows::core::Error) -> AudioError {
    if error.code() == E_NOTFOUND {
        AudioError::DeviceNotFound {
            device_id: device_id.to_string(),
        }
    } else {
        com_error("GetDevice", error)
    }
}

pub(crate) fn to_edataflow(flow: DataFlow) -> EDataFlow {
    match flow {
        DataFlow::Render => eRender,
        DataFlow::Capture => eCapture,
    }
}

pub(crate) fn to_erole(role: DeviceRole) -> ERole {
    match role {
        DeviceRole::Console => eConsole,
        DeviceRole::Multimedia => eMultimedia,
        DeviceRole::Communications => eCommunications,
    }
}

pub(crate) fn convert_device_state(state: DEVICE_STATE) -> DeviceState {
    match state.0 {
        0x1 => DeviceState::Active,
        0x2 => DeviceState::Disabled,
        0x8 => DeviceState::Unplugged,
        _ => DeviceState::NotPresent,
    }
}

/// Read `PKEY_Device_FriendlyName` from the endpoint's property store.
fn read_friendly_name(device: &IMMDevice) -> Option<String> {
    unsafe {
        let store = device.OpenPropertyStore(STGM_READ).ok()?;

        let mut prop = std::mem::zeroed::<PROPVARIANT>();
        store.GetValue(&PKEY_Device_FriendlyName, &mut prop).ok()?;

        let name = if prop.Anonymous.Anonymous.vt == VT_LPWSTR {
            let pwsz = prop.Anonymous.Anonymous.Anonymous.pwszVal;
            if pwsz.is_null() {
                None
            } else {
                let len = (0..).take_while(|&i| *pwsz.offset(i) != 0).count();
                Some(String::from_utf16_lossy(std::slice::from_raw_parts(
                    pwsz, len,
                )))
            }
        } else {
            None
        };

        PropVariantClear(&mut prop).ok();
        name
    }
}
