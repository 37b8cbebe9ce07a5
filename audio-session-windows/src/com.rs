//! COM plumbing shared by the backend.
//!
//! All MMDevice/WASAPI objects in this crate live on one executor worker
//! thread; `com_executor` builds that executor and initializes an STA on
//! the worker before the first job runs.

use audio_session_core::{AudioError, SerialExecutor};
use windows::core::HRESULT;
use windows::Win32::Foundation::RPC_E_DISCONNECTED;
use windows::Win32::Media::Audio::AUDCLNT_E_DEVICE_INVALIDATED;
use windows::Win32::System::Com::{CoInitializeEx, COINIT_APARTMENTTHREADED};

/// `HRESULT_FROM_WIN32(ERROR_NOT_FOUND)`: returned by
/// `GetDefaultAudioEndpoint` when no default is configured.
pub(crate) const E_NOTFOUND: HRESULT = HRESULT(0x8007_0490_u32 as i32);

/// Create the executor whose worker thread owns every COM object this
/// crate touches.
///
/// The worker services native calls for the life of the process, so COM
/// is initialized once and never uninitialized.
pub fn com_executor() -> SerialExecutor {
    SerialExecutor::with_thread_init("wasapi-com", || unsafe {
        if let Err(err) = CoInitializeEx(None, COINIT_APARTMENTTHREADED).ok() {
            log::warn!("CoInitializeEx failed on executor worker: {err}");
        }
    })
}

/// Map a COM failure to the crate error, detecting handles that point at
/// released or invalidated native objects.
pub(crate) fn com_error(context: &'static str, error: windows::core::Error) -> AudioError {
    let code = error.code();
    if code == RPC_E_DISCONNECTED || code == AUDCLNT_E_DEVICE_INVALIDATED {
        AudioError::StaleHandle
    } else {
        AudioError::native(context, code.0)
    }
}

/// NUL-terminated UTF-16 for passing `&str` as `PCWSTR`.
pub(crate) fn to_wide(value: &str) -> Vec<u16> {
    value.encode_utf16().chain(std::iter::once(0)).collect()
}
