//! # audio-session-core
//!
//! Platform-agnostic audio session observation core.
//!
//! Exposes live device and per-application session state (volume, mute,
//! peak level, lifecycle) as push-delivered event streams. Platform
//! backends (Windows WASAPI) implement the traits in `traits/` and plug
//! into the generic controllers here; the native object model's
//! apartment affinity is honored by funneling every native call through
//! one `SerialExecutor`.
//!
//! ## Architecture
//!
//! ```text
//! audio-session-core (this crate)
//! ├── traits/      ← SessionHandle facets, EndpointBackend, sinks, ProcessMetadata
//! ├── models/      ← AudioDevice, SessionState, event payloads, AudioError
//! ├── threading/   ← SerialExecutor (single-worker native-call queue)
//! ├── broadcast/   ← Broadcaster<T> multi-subscriber event channels
//! ├── session/     ← SessionController + PeakMeterPoller
//! └── devices/     ← DeviceEnumeratorService
//! ```

pub mod broadcast;
pub mod devices;
pub mod models;
pub mod session;
pub mod threading;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use broadcast::{Broadcaster, Subscription};
pub use devices::DeviceEnumeratorService;
pub use models::device::{AudioDevice, DataFlow, DeviceRole, DeviceState, StateMask};
pub use models::error::AudioError;
pub use models::events::{
    DeviceEvent, DisconnectedEvent, MuteChangedEvent, PeakValueChangedEvent, SessionNotification,
    StateChangedEvent, VolumeChangedEvent,
};
pub use models::session::{DisconnectReason, SessionState};
pub use session::{SessionController, PEAK_POLL_INTERVAL};
pub use threading::SerialExecutor;
pub use traits::endpoint_backend::{DeviceNotificationSink, EndpointBackend};
pub use traits::process_metadata::{NoProcessMetadata, ProcessMetadata};
pub use traits::session_handle::{
    PeakMeter, SessionControl, SessionHandle, SessionNotificationSink, SimpleVolume,
};
