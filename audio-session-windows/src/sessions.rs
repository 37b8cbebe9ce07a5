//! Per-endpoint session discovery.
//!
//! Activates `IAudioSessionManager2` on an endpoint and walks its
//! session enumerator, yielding one `WasapiSession` handle per live
//! session. Callers typically wrap each handle in a
//! `SessionController`.

use std::sync::Arc;

use windows::core::PCWSTR;
use windows::Win32::Media::Audio::{
    IAudioSessionManager2, IMMDeviceEnumerator, MMDeviceEnumerator,
};
use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_ALL};

use audio_session_core::{AudioError, SerialExecutor};

use crate::com::{com_error, to_wide};
use crate::session::WasapiSession;

/// List the live audio sessions on the endpoint identified by
/// `device_id`.
///
/// Runs entirely on the executor worker; the returned handles marshal
/// their own native access through the shared interface slot.
pub fn sessions_for_device(
    executor: &SerialExecutor,
    device_id: &str,
) -> Result<Vec<Arc<WasapiSession>>, AudioError> {
    let device_id = device_id.to_string();
    executor.invoke(move || unsafe {
        let enumerator: IMMDeviceEnumerator =
            CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                .map_err(|e| com_error("CoCreateInstance(MMDeviceEnumerator)", e))?;

        let wide = to_wide(&device_id);
        let device = enumerator
            .GetDevice(PCWSTR(wide.as_ptr()))
            .map_err(|e| crate::endpoints::device_lookup_error(&device_id, e))?;

        let manager: IAudioSessionManager2 = device
            .Activate(CLSCTX_ALL, None)
            .map_err(|e| com_error("Activate(IAudioSessionManager2)", e))?;

        let sessions = manager
            .GetSessionEnumerator()
            .map_err(|e| com_error("GetSessionEnumerator", e))?;

        let count = sessions.GetCount().map_err(|e| com_error("GetCount", e))?;
        let mut handles = Vec::with_capacity(count.max(0) as usize);
        for i in 0..count {
            let control = sessions
                .GetSession(i)
                .map_err(|e| com_error("GetSession", e))?;
            handles.push(Arc::new(WasapiSession::new(&control)));
        }
        Ok(handles)
    })
}
