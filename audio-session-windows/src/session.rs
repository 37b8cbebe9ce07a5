//! WASAPI session handle and its capability facets.
//!
//! `WasapiSession` wraps one `IAudioSessionControl` and casts out the
//! interfaces backing the three facets. The facets share a single slot
//! of native interfaces so that `release` on the control facet makes
//! every facet report `StaleHandle` from then on.

use std::sync::Arc;

use parking_lot::Mutex;
use windows::core::Interface;
use windows::Win32::Media::Audio::Endpoints::IAudioMeterInformation;
use windows::Win32::Media::Audio::{
    AudioSessionState, AudioSessionStateActive, AudioSessionStateExpired, IAudioSessionControl,
    IAudioSessionControl2, IAudioSessionEvents, ISimpleAudioVolume,
};
use windows::Win32::System::Com::CoTaskMemFree;

use audio_session_core::{
    AudioError, PeakMeter, SessionControl, SessionHandle, SessionNotificationSink, SessionState,
    SimpleVolume,
};

use crate::com::com_error;
use crate::session_events::EventForwarder;

struct NativeHandles {
    control: Option<IAudioSessionControl2>,
    volume: Option<ISimpleAudioVolume>,
    meter: Option<IAudioMeterInformation>,
}

/// Shared slot of native interfaces. Emptied exactly once by `release`.
struct ComSlot {
    handles: Mutex<Option<NativeHandles>>,
}

// SAFETY: the interfaces in the slot are only dereferenced on the
// executor worker thread (the apartment that created them); the slot
// itself is plain storage guarded by the mutex.
unsafe impl Send for ComSlot {}
unsafe impl Sync for ComSlot {}

impl ComSlot {
    fn with_control<R>(
        &self,
        f: impl FnOnce(&IAudioSessionControl2) -> Result<R, AudioError>,
    ) -> Result<R, AudioError> {
        let guard = self.handles.lock();
        match guard.as_ref().and_then(|h| h.control.as_ref()) {
            Some(control) => f(control),
            None => Err(AudioError::StaleHandle),
        }
    }

    fn with_volume<R>(
        &self,
        f: impl FnOnce(&ISimpleAudioVolume) -> Result<R, AudioError>,
    ) -> Result<R, AudioError> {
        let guard = self.handles.lock();
        match guard.as_ref().and_then(|h| h.volume.as_ref()) {
            Some(volume) => f(volume),
            None => Err(AudioError::StaleHandle),
        }
    }

    fn with_meter<R>(
        &self,
        f: impl FnOnce(&IAudioMeterInformation) -> Result<R, AudioError>,
    ) -> Result<R, AudioError> {
        let guard = self.handles.lock();
        match guard.as_ref().and_then(|h| h.meter.as_ref()) {
            Some(meter) => f(meter),
            None => Err(AudioError::StaleHandle),
        }
    }
}

/// Session handle over one `IAudioSessionControl`.
///
/// Construct on the executor worker thread; the facets then marshal all
/// further access through the slot.
pub struct WasapiSession {
    control: Option<Arc<ControlFacet>>,
    volume: Option<Arc<VolumeFacet>>,
    meter: Option<Arc<MeterFacet>>,
}

impl WasapiSession {
    /// Wrap `control`, casting out whichever facet interfaces it
    /// supports. Missing casts leave the facet absent rather than
    /// failing here; the controller layer decides what is mandatory.
    pub fn new(control: &IAudioSessionControl) -> Self {
        let control2: Option<IAudioSessionControl2> = control.cast().ok();
        let volume: Option<ISimpleAudioVolume> = control.cast().ok();
        let meter: Option<IAudioMeterInformation> = control.cast().ok();

        let has_control = control2.is_some();
        let has_volume = volume.is_some();
        let has_meter = meter.is_some();

        let slot = Arc::new(ComSlot {
            handles: Mutex::new(Some(NativeHandles {
                control: control2,
                volume,
                meter,
            })),
        });

        Self {
            control: has_control.then(|| {
                Arc::new(ControlFacet {
                    slot: Arc::clone(&slot),
                    events: Mutex::new(None),
                })
            }),
            volume: has_volume.then(|| {
                Arc::new(VolumeFacet {
                    slot: Arc::clone(&slot),
                })
            }),
            meter: has_meter.then(|| MeterFacet { slot }).map(Arc::new),
        }
    }
}

impl SessionHandle for WasapiSession {
    fn control(&self) -> Option<Arc<dyn SessionControl>> {
        self.control
            .clone()
            .map(|c| -> Arc<dyn SessionControl> { c })
    }

    fn volume(&self) -> Option<Arc<dyn SimpleVolume>> {
        self.volume.clone().map(|v| -> Arc<dyn SimpleVolume> { v })
    }

    fn metering(&self) -> Option<Arc<dyn PeakMeter>> {
        self.meter.clone().map(|m| -> Arc<dyn PeakMeter> { m })
    }
}

struct ControlFacet {
    slot: Arc<ComSlot>,
    /// The registered notification forwarder, kept alive until
    /// unregistration so the native side can keep calling it.
    events: Mutex<Option<IAudioSessionEvents>>,
}

// SAFETY: see ComSlot; the stored IAudioSessionEvents is only handed
// back to the native layer on the executor worker thread.
unsafe impl Send for ControlFacet {}
unsafe impl Sync for ControlFacet {}

impl SessionControl for ControlFacet {
    fn is_system_sounds(&self) -> Result<bool, AudioError> {
        self.slot.with_control(|control| unsafe {
            // S_OK for the system-sounds session, S_FALSE otherwise.
            Ok(control.IsSystemSoundsSession().0 == 0)
        })
    }

    fn display_name(&self) -> Result<String, AudioError> {
        self.slot.with_control(|control| unsafe {
            let raw = control
                .GetDisplayName()
                .map_err(|e| com_error("GetDisplayName", e))?;
            Ok(take_com_string(raw.0))
        })
    }

    fn icon_path(&self) -> Result<String, AudioError> {
        self.slot.with_control(|control| unsafe {
            let raw = control
                .GetIconPath()
                .map_err(|e| com_error("GetIconPath", e))?;
            Ok(take_com_string(raw.0))
        })
    }

    fn state(&self) -> Result<SessionState, AudioError> {
        self.slot.with_control(|control| unsafe {
            let state = control.GetState().map_err(|e| com_error("GetState", e))?;
            Ok(convert_state(state))
        })
    }

    fn process_id(&self) -> Result<u32, AudioError> {
        self.slot.with_control(|control| unsafe {
            control
                .GetProcessId()
                .map_err(|e| com_error("GetProcessId", e))
        })
    }

    fn session_identifier(&self) -> Result<String, AudioError> {
        self.slot.with_control(|control| unsafe {
            let raw = control
                .GetSessionIdentifier()
                .map_err(|e| com_error("GetSessionIdentifier", e))?;
            Ok(take_com_string(raw.0))
        })
    }

    fn register_notification_sink(
        &self,
        sink: Arc<dyn SessionNotificationSink>,
    ) -> Result<(), AudioError> {
        self.slot.with_control(|control| unsafe {
            let forwarder: IAudioSessionEvents = EventForwarder::new(sink).into();
            control
                .RegisterAudioSessionNotification(&forwarder)
                .map_err(|e| com_error("RegisterAudioSessionNotification", e))?;
            *self.events.lock() = Some(forwarder);
            Ok(())
        })
    }

    fn unregister_notification_sink(&self) -> Result<(), AudioError> {
        let forwarder = self.events.lock().take();
        let Some(forwarder) = forwarder else {
            return Ok(());
        };
        self.slot.with_control(|control| unsafe {
            control
                .UnregisterAudioSessionNotification(&forwarder)
                .map_err(|e| com_error("UnregisterAudioSessionNotification", e))
        })
    }

    fn release(&self) {
        // Dropping the interfaces releases the native references; every
        // facet sharing the slot turns stale at this point.
        *self.slot.handles.lock() = None;
    }
}

struct VolumeFacet {
    slot: Arc<ComSlot>,
}

impl SimpleVolume for VolumeFacet {
    fn master_volume(&self) -> Result<f32, AudioError> {
        self.slot.with_volume(|volume| unsafe {
            volume
                .GetMasterVolume()
                .map_err(|e| com_error("GetMasterVolume", e))
        })
    }

    fn set_master_volume(&self, level: f32) -> Result<(), AudioError> {
        self.slot.with_volume(|volume| unsafe {
            volume
                .SetMasterVolume(level.clamp(0.0, 1.0), std::ptr::null())
                .map_err(|e| com_error("SetMasterVolume", e))
        })
    }

    fn mute(&self) -> Result<bool, AudioError> {
        self.slot.with_volume(|volume| unsafe {
            volume
                .GetMute()
                .map(|muted| muted.as_bool())
                .map_err(|e| com_error("GetMute", e))
        })
    }

    fn set_mute(&self, muted: bool) -> Result<(), AudioError> {
        self.slot.with_volume(|volume| unsafe {
            volume
                .SetMute(muted, std::ptr::null())
                .map_err(|e| com_error("SetMute", e))
        })
    }
}

struct MeterFacet {
    slot: Arc<ComSlot>,
}

impl PeakMeter for MeterFacet {
    fn peak_value(&self) -> Result<f32, AudioError> {
        self.slot.with_meter(|meter| unsafe {
            meter
                .GetPeakValue()
                .map_err(|e| com_error("GetPeakValue", e))
        })
    }
}

pub(crate) fn convert_state(state: AudioSessionState) -> SessionState {
    if state == AudioSessionStateActive {
        SessionState::Active
    } else if state == AudioSessionStateExpired {
        SessionState::Expired
    } else {
        SessionState::Inactive
    }
}

/// Copy a COM-allocated wide string and free the native buffer. Null
/// and unpaired-surrogate inputs become lossy/empty strings rather than
/// errors.
pub(crate) unsafe fn take_com_string(raw: *mut u16) -> String {
    if raw.is_null() {
        return String::new();
    }
    let len = (0..).take_while(|&i| *raw.offset(i) != 0).count();
    let value = String::from_utf16_lossy(std::slice::from_raw_parts(raw, len));
    CoTaskMemFree(Some(raw as *const _));
    value
}
