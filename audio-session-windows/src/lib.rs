//! # audio-session-windows
//!
//! Windows WASAPI/MMDevice backend for audio-session-kit.
//!
//! Provides:
//! - `com_executor`: a `SerialExecutor` whose worker thread owns COM
//! - `WasapiSession`: `SessionHandle` over `IAudioSessionControl`
//! - `WasapiEndpointBackend`: `EndpointBackend` over `IMMDeviceEnumerator`
//! - `sessions_for_device`: live session discovery per endpoint
//! - `WindowsProcessMetadata`: executable path and file description lookup
//!
//! ## Usage
//! ```ignore
//! use audio_session_core::{DeviceEnumeratorService, SessionController};
//! use audio_session_windows::{com_executor, sessions_for_device, WasapiEndpointBackend,
//!     WindowsProcessMetadata};
//!
//! let executor = com_executor();
//! let backend = WasapiEndpointBackend::new(&executor)?;
//! let devices = DeviceEnumeratorService::new(backend, executor.clone());
//! ```

#[cfg(target_os = "windows")]
pub mod com;
#[cfg(target_os = "windows")]
pub mod endpoints;
#[cfg(target_os = "windows")]
pub mod notifications;
#[cfg(target_os = "windows")]
pub mod process_info;
#[cfg(target_os = "windows")]
pub mod session;
#[cfg(target_os = "windows")]
pub mod session_events;
#[cfg(target_os = "windows")]
pub mod sessions;

#[cfg(target_os = "windows")]
pub use com::com_executor;
#[cfg(target_os = "windows")]
pub use endpoints::WasapiEndpointBackend;
#[cfg(target_os = "windows")]
pub use process_info::WindowsProcessMetadata;
#[cfg(target_os = "windows")]
pub use session::WasapiSession;
#[cfg(target_os = "windows")]
pub use sessions::sessions_for_device;
