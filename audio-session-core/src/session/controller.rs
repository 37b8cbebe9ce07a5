//! Per-session state mirroring and event translation.
//!
//! A `SessionController` wraps one native session handle for its whole
//! lifetime. It caches volume, mute, and descriptive properties locally
//! (reads never hit the native object), writes mutations through via
//! the serial executor, and translates the native callback interface
//! into independent broadcast streams.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::broadcast::{Broadcaster, Subscription};
use crate::models::error::AudioError;
use crate::models::events::{
    DisconnectedEvent, MuteChangedEvent, PeakValueChangedEvent, SessionNotification,
    StateChangedEvent, VolumeChangedEvent,
};
use crate::models::session::SessionState;
use crate::session::poller::PeakMeterPoller;
use crate::threading::SerialExecutor;
use crate::traits::process_metadata::ProcessMetadata;
use crate::traits::session_handle::{
    SessionControl, SessionHandle, SessionNotificationSink, SimpleVolume,
};

/// Locally cached session state.
///
/// Invariant: volume and mute always hold the last value observed from
/// a native notification or a local write; they are never read back
/// from the native object on access.
struct CachedState {
    id: String,
    process_id: u32,
    is_system: bool,
    display_name: String,
    file_description: String,
    icon_path: String,
    executable_path: Option<PathBuf>,
    state: SessionState,
    volume: f64,
    muted: bool,
}

impl Default for CachedState {
    fn default() -> Self {
        Self {
            id: String::new(),
            process_id: 0,
            is_system: false,
            display_name: String::new(),
            file_description: String::new(),
            icon_path: String::new(),
            executable_path: None,
            state: SessionState::Inactive,
            volume: 0.0,
            muted: false,
        }
    }
}

struct SessionEvents {
    volume_changed: Broadcaster<VolumeChangedEvent>,
    mute_changed: Broadcaster<MuteChangedEvent>,
    state_changed: Broadcaster<StateChangedEvent>,
    disconnected: Broadcaster<DisconnectedEvent>,
    peak_value_changed: Broadcaster<PeakValueChangedEvent>,
}

impl SessionEvents {
    fn new() -> Self {
        Self {
            volume_changed: Broadcaster::new(),
            mute_changed: Broadcaster::new(),
            state_changed: Broadcaster::new(),
            disconnected: Broadcaster::new(),
            peak_value_changed: Broadcaster::new(),
        }
    }

    fn dispose_all(&self) {
        self.volume_changed.dispose();
        self.mute_changed.dispose();
        self.state_changed.dispose();
        self.disconnected.dispose();
        self.peak_value_changed.dispose();
    }
}

/// State shared between the controller, its notification sink, and the
/// peak poller.
pub(crate) struct SessionShared {
    control: Arc<dyn SessionControl>,
    volume: Arc<dyn SimpleVolume>,
    pub(crate) executor: SerialExecutor,
    cache: Mutex<CachedState>,
    pub(crate) disposed: AtomicBool,
    events: SessionEvents,
}

impl SessionShared {
    fn session_id(&self) -> String {
        self.cache.lock().id.clone()
    }

    fn publish_volume(&self, volume: f64) {
        self.events.volume_changed.publish(VolumeChangedEvent {
            session_id: self.session_id(),
            volume,
        });
    }

    fn publish_mute(&self, muted: bool) {
        self.events.mute_changed.publish(MuteChangedEvent {
            session_id: self.session_id(),
            muted,
        });
    }

    pub(crate) fn publish_peak(&self, peak: f64) {
        self.events.peak_value_changed.publish(PeakValueChangedEvent {
            session_id: self.session_id(),
            peak,
        });
    }

    /// Single dispatch point for the fixed-method native callback
    /// interface. May run on the executor worker thread; publishing is
    /// enqueue-only so the native call is never blocked on subscribers.
    fn handle_notification(&self, event: SessionNotification) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        match event {
            // Cache-only: no public stream carries name or icon
            // changes, the next property read picks them up.
            SessionNotification::DisplayNameChanged(name) => {
                self.cache.lock().display_name = name;
            }
            SessionNotification::IconPathChanged(path) => {
                self.cache.lock().icon_path = path;
            }
            SessionNotification::SimpleVolumeChanged { volume, muted } => {
                let scaled = f64::from(volume) * 100.0;
                let (volume_changed, mute_changed) = {
                    let mut cache = self.cache.lock();
                    let volume_changed = (cache.volume - scaled).abs() > 0.0;
                    if volume_changed {
                        cache.volume = scaled;
                    }
                    let mute_changed = cache.muted != muted;
                    if mute_changed {
                        cache.muted = muted;
                    }
                    (volume_changed, mute_changed)
                };
                if volume_changed {
                    self.publish_volume(scaled);
                }
                if mute_changed {
                    self.publish_mute(muted);
                }
            }
            SessionNotification::StateChanged(state) => {
                self.cache.lock().state = state;
                self.events.state_changed.publish(StateChangedEvent {
                    session_id: self.session_id(),
                    state,
                });
            }
            SessionNotification::Disconnected(reason) => {
                self.events.disconnected.publish(DisconnectedEvent {
                    session_id: self.session_id(),
                    reason,
                });
            }
        }
    }
}

/// Sink registered with the native notification interface.
///
/// Holds the shared state weakly: the native layer keeps the sink alive
/// until unregistration, and a callback racing with disposal must not
/// resurrect released resources.
struct ControllerSink {
    shared: Weak<SessionShared>,
}

impl SessionNotificationSink for ControllerSink {
    fn on_notification(&self, event: SessionNotification) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_notification(event);
        }
    }
}

struct PropertySnapshot {
    id: String,
    process_id: u32,
    is_system: bool,
    display_name: String,
    icon_path: String,
    state: SessionState,
    executable_path: Option<PathBuf>,
    file_description: Option<String>,
}

/// Owner of one native audio session.
///
/// Constructed over a `SessionHandle` exposing at least the control and
/// simple-volume facets. When the metering facet is present, peak
/// polling starts automatically and runs for the controller's lifetime.
pub struct SessionController {
    shared: Arc<SessionShared>,
    poller: Option<PeakMeterPoller>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController").finish_non_exhaustive()
    }
}

impl SessionController {
    pub fn new(
        handle: &dyn SessionHandle,
        executor: SerialExecutor,
        metadata: Arc<dyn ProcessMetadata>,
    ) -> Result<Self, AudioError> {
        let control = handle
            .control()
            .ok_or(AudioError::InvalidHandle("control"))?;
        let volume = handle
            .volume()
            .ok_or(AudioError::InvalidHandle("simple volume"))?;
        let metering = handle.metering();

        let shared = Arc::new(SessionShared {
            control,
            volume,
            executor,
            cache: Mutex::new(CachedState::default()),
            disposed: AtomicBool::new(false),
            events: SessionEvents::new(),
        });

        let sink: Arc<dyn SessionNotificationSink> = Arc::new(ControllerSink {
            shared: Arc::downgrade(&shared),
        });
        {
            let control = Arc::clone(&shared.control);
            shared
                .executor
                .invoke(move || control.register_notification_sink(sink))?;
        }

        if let Err(err) = Self::refresh_properties(&shared, metadata)
            .and_then(|()| Self::refresh_volume(&shared))
        {
            let control = Arc::clone(&shared.control);
            shared.executor.invoke(move || {
                if let Err(err) = control.unregister_notification_sink() {
                    log::debug!("unregister during construction cleanup failed: {err}");
                }
                control.release();
            });
            return Err(err);
        }

        let poller = metering.map(|meter| PeakMeterPoller::start(Arc::clone(&shared), meter));

        Ok(Self { shared, poller })
    }

    /// Synchronously mirror the native descriptive properties into the
    /// cache. Process-metadata lookups are best-effort and never fail
    /// construction.
    fn refresh_properties(
        shared: &Arc<SessionShared>,
        metadata: Arc<dyn ProcessMetadata>,
    ) -> Result<(), AudioError> {
        let control = Arc::clone(&shared.control);
        let snapshot = shared.executor.invoke(move || {
            let is_system = control.is_system_sounds()?;
            let display_name = control.display_name()?;
            let icon_path = control.icon_path()?;
            let state = control.state()?;
            let process_id = control.process_id()?;
            let id = control.session_identifier()?;

            let (executable_path, file_description) = if process_id > 0 {
                (
                    metadata.executable_path(process_id),
                    metadata.file_description(process_id),
                )
            } else {
                (None, None)
            };

            Ok::<_, AudioError>(PropertySnapshot {
                id,
                process_id,
                is_system,
                display_name,
                icon_path,
                state,
                executable_path,
                file_description,
            })
        })?;

        let mut cache = shared.cache.lock();
        cache.id = snapshot.id;
        cache.process_id = snapshot.process_id;
        cache.is_system = snapshot.is_system;
        cache.display_name = snapshot.display_name;
        cache.icon_path = snapshot.icon_path;
        cache.state = snapshot.state;
        cache.executable_path = snapshot.executable_path;
        cache.file_description = snapshot.file_description.unwrap_or_default();
        Ok(())
    }

    fn refresh_volume(shared: &Arc<SessionShared>) -> Result<(), AudioError> {
        let volume = Arc::clone(&shared.volume);
        let (level, muted) = shared
            .executor
            .invoke(move || Ok::<_, AudioError>((volume.master_volume()?, volume.mute()?)))?;

        let mut cache = shared.cache.lock();
        cache.volume = f64::from(level) * 100.0;
        cache.muted = muted;
        Ok(())
    }

    // --- Cached property accessors ---

    pub fn id(&self) -> String {
        self.shared.cache.lock().id.clone()
    }

    pub fn process_id(&self) -> u32 {
        self.shared.cache.lock().process_id
    }

    pub fn is_system_session(&self) -> bool {
        self.shared.cache.lock().is_system
    }

    /// Display name, falling back to the discovered file description
    /// when the native name is empty or whitespace.
    pub fn display_name(&self) -> String {
        let cache = self.shared.cache.lock();
        if cache.display_name.trim().is_empty() {
            cache.file_description.clone()
        } else {
            cache.display_name.clone()
        }
    }

    pub fn icon_path(&self) -> String {
        self.shared.cache.lock().icon_path.clone()
    }

    pub fn executable_path(&self) -> Option<PathBuf> {
        self.shared.cache.lock().executable_path.clone()
    }

    pub fn state(&self) -> SessionState {
        self.shared.cache.lock().state
    }

    /// Last observed volume on the 0–100 scale.
    pub fn volume(&self) -> f64 {
        self.shared.cache.lock().volume
    }

    pub fn is_muted(&self) -> bool {
        self.shared.cache.lock().muted
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::SeqCst)
    }

    pub fn has_metering(&self) -> bool {
        self.poller.is_some()
    }

    // --- Mutators ---

    /// Write `volume` (0–100) through to the native facet, update the
    /// cache, and publish. No-op once disposed.
    pub fn set_volume(&self, volume: f64) -> Result<(), AudioError> {
        if self.is_disposed() {
            return Ok(());
        }
        let scalar = (volume / 100.0) as f32;
        {
            let facet = Arc::clone(&self.shared.volume);
            self.shared
                .executor
                .invoke(move || facet.set_master_volume(scalar))?;
        }
        self.shared.cache.lock().volume = volume;
        self.shared.publish_volume(volume);
        Ok(())
    }

    /// Write the mute flag through. No-op once disposed or when the
    /// value is unchanged.
    pub fn set_muted(&self, muted: bool) -> Result<(), AudioError> {
        if self.is_disposed() || self.shared.cache.lock().muted == muted {
            return Ok(());
        }
        {
            let facet = Arc::clone(&self.shared.volume);
            self.shared.executor.invoke(move || facet.set_mute(muted))?;
        }
        self.shared.cache.lock().muted = muted;
        self.shared.publish_mute(muted);
        Ok(())
    }

    // --- Event streams ---

    pub fn volume_changed(&self) -> Subscription<VolumeChangedEvent> {
        self.shared.events.volume_changed.subscribe()
    }

    pub fn mute_changed(&self) -> Subscription<MuteChangedEvent> {
        self.shared.events.mute_changed.subscribe()
    }

    pub fn state_changed(&self) -> Subscription<StateChangedEvent> {
        self.shared.events.state_changed.subscribe()
    }

    pub fn disconnected(&self) -> Subscription<DisconnectedEvent> {
        self.shared.events.disconnected.subscribe()
    }

    pub fn peak_value_changed(&self) -> Subscription<PeakValueChangedEvent> {
        self.shared.events.peak_value_changed.subscribe()
    }

    /// Tear down the controller: stop peak polling, finish all event
    /// streams, unregister the notification sink, and release the
    /// native reference. Idempotent and safe to race with lingering
    /// callbacks.
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(poller) = &self.poller {
            poller.stop();
        }
        self.shared.events.dispose_all();

        let control = Arc::clone(&self.shared.control);
        self.shared.executor.invoke(move || {
            if let Err(err) = control.unregister_notification_sink() {
                log::debug!("unregister during dispose failed: {err}");
            }
            control.release();
        });
    }
}

impl Drop for SessionController {
    /// Backstop for clients that never call `dispose` explicitly; the
    /// primary path is always an explicit `dispose`.
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::DisconnectReason;
    use crate::traits::process_metadata::NoProcessMetadata;
    use crate::traits::session_handle::PeakMeter;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    struct MockControl {
        display_name: Mutex<String>,
        icon_path: Mutex<String>,
        id: Mutex<String>,
        process_id: Mutex<u32>,
        is_system: Mutex<bool>,
        state: Mutex<SessionState>,
        fail_state: AtomicBool,
        sink: Mutex<Option<Arc<dyn SessionNotificationSink>>>,
        unregister_calls: AtomicUsize,
        release_calls: AtomicUsize,
    }

    impl MockControl {
        fn with_id(id: &str, pid: u32) -> Arc<Self> {
            Arc::new(Self {
                display_name: Mutex::new(String::new()),
                icon_path: Mutex::new(String::new()),
                id: Mutex::new(id.to_string()),
                process_id: Mutex::new(pid),
                is_system: Mutex::new(false),
                state: Mutex::new(SessionState::Inactive),
                fail_state: AtomicBool::new(false),
                sink: Mutex::new(None),
                unregister_calls: AtomicUsize::new(0),
                release_calls: AtomicUsize::new(0),
            })
        }

        fn fire(&self, event: SessionNotification) {
            let sink = self.sink.lock().clone();
            if let Some(sink) = sink {
                sink.on_notification(event);
            }
        }
    }

    impl SessionControl for MockControl {
        fn is_system_sounds(&self) -> Result<bool, AudioError> {
            Ok(*self.is_system.lock())
        }

        fn display_name(&self) -> Result<String, AudioError> {
            Ok(self.display_name.lock().clone())
        }

        fn icon_path(&self) -> Result<String, AudioError> {
            Ok(self.icon_path.lock().clone())
        }

        fn state(&self) -> Result<SessionState, AudioError> {
            if self.fail_state.load(Ordering::SeqCst) {
                return Err(AudioError::native("GetState", -1));
            }
            Ok(*self.state.lock())
        }

        fn process_id(&self) -> Result<u32, AudioError> {
            Ok(*self.process_id.lock())
        }

        fn session_identifier(&self) -> Result<String, AudioError> {
            Ok(self.id.lock().clone())
        }

        fn register_notification_sink(
            &self,
            sink: Arc<dyn SessionNotificationSink>,
        ) -> Result<(), AudioError> {
            *self.sink.lock() = Some(sink);
            Ok(())
        }

        fn unregister_notification_sink(&self) -> Result<(), AudioError> {
            self.unregister_calls.fetch_add(1, Ordering::SeqCst);
            *self.sink.lock() = None;
            Ok(())
        }

        fn release(&self) {
            self.release_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct MockVolume {
        level: Mutex<f32>,
        muted: Mutex<bool>,
        set_levels: Mutex<Vec<f32>>,
    }

    impl MockVolume {
        fn new(level: f32, muted: bool) -> Arc<Self> {
            Arc::new(Self {
                level: Mutex::new(level),
                muted: Mutex::new(muted),
                set_levels: Mutex::new(Vec::new()),
            })
        }
    }

    impl SimpleVolume for MockVolume {
        fn master_volume(&self) -> Result<f32, AudioError> {
            Ok(*self.level.lock())
        }

        fn set_master_volume(&self, level: f32) -> Result<(), AudioError> {
            *self.level.lock() = level;
            self.set_levels.lock().push(level);
            Ok(())
        }

        fn mute(&self) -> Result<bool, AudioError> {
            Ok(*self.muted.lock())
        }

        fn set_mute(&self, muted: bool) -> Result<(), AudioError> {
            *self.muted.lock() = muted;
            Ok(())
        }
    }

    struct MockMeter {
        value: Mutex<f32>,
        stale: AtomicBool,
    }

    impl MockMeter {
        fn new(value: f32) -> Arc<Self> {
            Arc::new(Self {
                value: Mutex::new(value),
                stale: AtomicBool::new(false),
            })
        }
    }

    impl PeakMeter for MockMeter {
        fn peak_value(&self) -> Result<f32, AudioError> {
            if self.stale.load(Ordering::SeqCst) {
                Err(AudioError::StaleHandle)
            } else {
                Ok(*self.value.lock())
            }
        }
    }

    struct MockHandle {
        control: Option<Arc<MockControl>>,
        volume: Option<Arc<MockVolume>>,
        meter: Option<Arc<dyn PeakMeter>>,
    }

    impl MockHandle {
        fn new(control: Arc<MockControl>, volume: Arc<MockVolume>) -> Self {
            Self {
                control: Some(control),
                volume: Some(volume),
                meter: None,
            }
        }
    }

    impl SessionHandle for MockHandle {
        fn control(&self) -> Option<Arc<dyn SessionControl>> {
            self.control.clone().map(|c| -> Arc<dyn SessionControl> { c })
        }

        fn volume(&self) -> Option<Arc<dyn SimpleVolume>> {
            self.volume.clone().map(|v| -> Arc<dyn SimpleVolume> { v })
        }

        fn metering(&self) -> Option<Arc<dyn PeakMeter>> {
            self.meter.clone()
        }
    }

    fn controller(handle: &MockHandle) -> SessionController {
        SessionController::new(
            handle,
            SerialExecutor::new("test-com"),
            Arc::new(NoProcessMetadata),
        )
        .unwrap()
    }

    #[test]
    fn construction_mirrors_native_state() {
        let control = MockControl::with_id("app:1234", 1234);
        let volume = MockVolume::new(0.65, false);
        let handle = MockHandle::new(control, Arc::clone(&volume));

        let session = controller(&handle);

        assert_eq!(session.id(), "app:1234");
        assert_eq!(session.process_id(), 1234);
        assert!((session.volume() - 65.0).abs() < 1e-9);
        assert!(!session.is_muted());

        let volume_events = session.volume_changed();
        session.set_volume(30.0).unwrap();

        assert!((session.volume() - 30.0).abs() < 1e-9);
        assert_eq!(volume.set_levels.lock().as_slice(), &[0.30]);

        let events = volume_events.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].session_id, "app:1234");
        assert!((events[0].volume - 30.0).abs() < 1e-9);
    }

    #[test]
    fn construction_requires_control_facet() {
        let mut handle = MockHandle::new(MockControl::with_id("s", 0), MockVolume::new(0.5, false));
        handle.control = None;

        let err = SessionController::new(
            &handle,
            SerialExecutor::new("test-com"),
            Arc::new(NoProcessMetadata),
        )
        .unwrap_err();
        assert_eq!(err, AudioError::InvalidHandle("control"));
    }

    #[test]
    fn construction_requires_volume_facet() {
        let mut handle = MockHandle::new(MockControl::with_id("s", 0), MockVolume::new(0.5, false));
        handle.volume = None;

        let err = SessionController::new(
            &handle,
            SerialExecutor::new("test-com"),
            Arc::new(NoProcessMetadata),
        )
        .unwrap_err();
        assert_eq!(err, AudioError::InvalidHandle("simple volume"));
    }

    #[test]
    fn failed_refresh_unregisters_and_releases() {
        let control = MockControl::with_id("s", 0);
        control.fail_state.store(true, Ordering::SeqCst);
        let handle = MockHandle::new(Arc::clone(&control), MockVolume::new(0.5, false));

        let err = SessionController::new(
            &handle,
            SerialExecutor::new("test-com"),
            Arc::new(NoProcessMetadata),
        )
        .unwrap_err();

        assert!(matches!(err, AudioError::NativeCall { .. }));
        assert_eq!(control.unregister_calls.load(Ordering::SeqCst), 1);
        assert_eq!(control.release_calls.load(Ordering::SeqCst), 1);
        assert!(control.sink.lock().is_none());
    }

    #[test]
    fn set_mute_to_current_value_is_a_noop() {
        let handle = MockHandle::new(MockControl::with_id("s", 0), MockVolume::new(0.5, false));
        let session = controller(&handle);

        let mute_events = session.mute_changed();
        session.set_muted(false).unwrap();
        assert!(mute_events.drain().is_empty());

        session.set_muted(true).unwrap();
        let events = mute_events.drain();
        assert_eq!(events.len(), 1);
        assert!(events[0].muted);
        assert!(session.is_muted());
    }

    #[test]
    fn disposed_mutators_are_silent_noops() {
        let control = MockControl::with_id("s", 0);
        let volume = MockVolume::new(0.5, false);
        let handle = MockHandle::new(Arc::clone(&control), Arc::clone(&volume));
        let session = controller(&handle);

        let volume_events = session.volume_changed();
        session.dispose();

        session.set_volume(80.0).unwrap();
        session.set_muted(true).unwrap();

        assert!(volume_events.drain().is_empty());
        assert!(volume.set_levels.lock().is_empty());
        assert!(!*volume.muted.lock());
    }

    #[test]
    fn dispose_is_idempotent() {
        let control = MockControl::with_id("s", 0);
        let handle = MockHandle::new(Arc::clone(&control), MockVolume::new(0.5, false));
        let session = controller(&handle);

        session.dispose();
        session.dispose();

        assert_eq!(control.unregister_calls.load(Ordering::SeqCst), 1);
        assert_eq!(control.release_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases_native_reference() {
        let control = MockControl::with_id("s", 0);
        {
            let handle = MockHandle::new(Arc::clone(&control), MockVolume::new(0.5, false));
            let _session = controller(&handle);
        }
        assert_eq!(control.release_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disconnect_callback_publishes_to_every_subscriber() {
        let control = MockControl::with_id("s", 0);
        let handle = MockHandle::new(Arc::clone(&control), MockVolume::new(0.5, false));
        let session = controller(&handle);

        let first = session.disconnected();
        let second = session.disconnected();

        control.fire(SessionNotification::Disconnected(
            DisconnectReason::DeviceRemoved,
        ));

        for sub in [first, second] {
            let events = sub.drain();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].reason, DisconnectReason::DeviceRemoved);
        }
    }

    #[test]
    fn display_name_callback_updates_cache_without_publishing() {
        let control = MockControl::with_id("s", 0);
        let handle = MockHandle::new(Arc::clone(&control), MockVolume::new(0.5, false));
        let session = controller(&handle);

        let volume_events = session.volume_changed();
        let state_events = session.state_changed();

        control.fire(SessionNotification::DisplayNameChanged("Player".into()));
        control.fire(SessionNotification::IconPathChanged("C:\\p.ico".into()));

        assert_eq!(session.display_name(), "Player");
        assert_eq!(session.icon_path(), "C:\\p.ico");
        assert!(volume_events.drain().is_empty());
        assert!(state_events.drain().is_empty());
    }

    #[test]
    fn display_name_falls_back_to_file_description() {
        struct DescribedProcess;

        impl ProcessMetadata for DescribedProcess {
            fn executable_path(&self, _pid: u32) -> Option<PathBuf> {
                Some(PathBuf::from("C:\\apps\\player.exe"))
            }

            fn file_description(&self, _pid: u32) -> Option<String> {
                Some("Media Player".into())
            }
        }

        let control = MockControl::with_id("s", 42);
        *control.display_name.lock() = "   ".into();
        let handle = MockHandle::new(control, MockVolume::new(0.5, false));

        let session = SessionController::new(
            &handle,
            SerialExecutor::new("test-com"),
            Arc::new(DescribedProcess),
        )
        .unwrap();

        assert_eq!(session.display_name(), "Media Player");
        assert_eq!(
            session.executable_path(),
            Some(PathBuf::from("C:\\apps\\player.exe"))
        );
    }

    #[test]
    fn native_volume_callback_deduplicates_unchanged_values() {
        let control = MockControl::with_id("s", 0);
        let handle = MockHandle::new(Arc::clone(&control), MockVolume::new(0.5, false));
        let session = controller(&handle);

        let volume_events = session.volume_changed();
        let mute_events = session.mute_changed();

        // Echo of the current state: nothing to publish.
        control.fire(SessionNotification::SimpleVolumeChanged {
            volume: 0.5,
            muted: false,
        });
        assert!(volume_events.drain().is_empty());
        assert!(mute_events.drain().is_empty());

        // Any detectable change publishes.
        control.fire(SessionNotification::SimpleVolumeChanged {
            volume: 0.75,
            muted: true,
        });
        let volumes = volume_events.drain();
        assert_eq!(volumes.len(), 1);
        assert!((volumes[0].volume - 75.0).abs() < 1e-9);
        assert_eq!(mute_events.drain().len(), 1);
        assert!((session.volume() - 75.0).abs() < 1e-9);
        assert!(session.is_muted());
    }

    #[test]
    fn state_change_callback_updates_cache_and_publishes() {
        let control = MockControl::with_id("s", 0);
        let handle = MockHandle::new(Arc::clone(&control), MockVolume::new(0.5, false));
        let session = controller(&handle);

        let state_events = session.state_changed();
        control.fire(SessionNotification::StateChanged(SessionState::Expired));

        assert_eq!(session.state(), SessionState::Expired);
        let events = state_events.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].state, SessionState::Expired);
    }

    #[test]
    fn callbacks_after_dispose_are_ignored() {
        let control = MockControl::with_id("s", 0);
        let handle = MockHandle::new(Arc::clone(&control), MockVolume::new(0.5, false));
        let session = controller(&handle);

        // Grab the sink before dispose to simulate an in-flight native
        // callback arriving after teardown.
        let sink = control.sink.lock().clone().unwrap();
        session.dispose();

        sink.on_notification(SessionNotification::StateChanged(SessionState::Active));
        assert_eq!(session.state(), SessionState::Inactive);
    }

    #[test]
    fn peak_poller_publishes_and_stops_on_stale_handle() {
        let control = MockControl::with_id("s", 0);
        let meter = MockMeter::new(0.5);
        let mut handle = MockHandle::new(control, MockVolume::new(0.5, false));
        let metering: Arc<dyn PeakMeter> = meter.clone();
        handle.meter = Some(metering);

        let session = controller(&handle);
        assert!(session.has_metering());
        let peaks = session.peak_value_changed();

        let first = peaks
            .recv_timeout(Duration::from_secs(2))
            .expect("no peak event");
        assert!((first.peak - 50.0).abs() < 1e-6);

        meter.stale.store(true, Ordering::SeqCst);
        // The poller publishes a final zero sample, then stops itself.
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        loop {
            let event = peaks
                .recv_timeout(Duration::from_secs(2))
                .expect("poller stopped without final sample");
            if event.peak == 0.0 {
                break;
            }
            assert!(std::time::Instant::now() < deadline);
        }
        thread::sleep(Duration::from_millis(100));
        peaks.drain();
        thread::sleep(Duration::from_millis(100));
        assert!(peaks.drain().is_empty());
    }

    #[test]
    fn first_peak_sample_is_not_delayed_by_an_interval() {
        use crate::session::poller::PEAK_POLL_INTERVAL;
        use std::time::Instant;

        struct TimestampingMeter {
            first_sample_at: Mutex<Option<Instant>>,
        }

        impl PeakMeter for TimestampingMeter {
            fn peak_value(&self) -> Result<f32, AudioError> {
                self.first_sample_at.lock().get_or_insert_with(Instant::now);
                Ok(0.25)
            }
        }

        let meter = Arc::new(TimestampingMeter {
            first_sample_at: Mutex::new(None),
        });
        let control = MockControl::with_id("s", 0);
        let mut handle = MockHandle::new(control, MockVolume::new(0.5, false));
        let metering: Arc<dyn PeakMeter> = meter.clone();
        handle.meter = Some(metering);

        let started = Instant::now();
        let session = controller(&handle);

        let deadline = Instant::now() + Duration::from_secs(2);
        let first = loop {
            if let Some(at) = *meter.first_sample_at.lock() {
                break at;
            }
            assert!(Instant::now() < deadline, "poller never sampled");
            thread::yield_now();
        };
        // The poller samples on startup rather than sleeping out the
        // first tick interval.
        assert!(first.duration_since(started) < PEAK_POLL_INTERVAL);
        session.dispose();
    }

    #[test]
    fn no_metering_facet_means_no_peak_events() {
        let handle = MockHandle::new(MockControl::with_id("s", 0), MockVolume::new(0.5, false));
        let session = controller(&handle);

        assert!(!session.has_metering());
        let peaks = session.peak_value_changed();
        assert!(peaks.recv_timeout(Duration::from_millis(100)).is_none());
    }

    #[test]
    fn concurrent_sets_across_sessions_stay_consistent() {
        let executor = SerialExecutor::new("test-com");
        let mut sessions = Vec::new();
        for i in 0..4 {
            let control = MockControl::with_id(&format!("s{i}"), 0);
            let volume = MockVolume::new(0.0, false);
            let handle = MockHandle::new(control, Arc::clone(&volume));
            let session = SessionController::new(
                &handle,
                executor.clone(),
                Arc::new(NoProcessMetadata),
            )
            .unwrap();
            sessions.push((Arc::new(session), volume));
        }

        let mut threads = Vec::new();
        for (session, _) in &sessions {
            let session = Arc::clone(session);
            threads.push(thread::spawn(move || {
                for v in 0..50 {
                    session.set_volume(f64::from(v)).unwrap();
                }
            }));
        }
        for t in threads {
            t.join().unwrap();
        }

        for (session, volume) in &sessions {
            assert!((session.volume() - 49.0).abs() < 1e-9);
            assert_eq!(*volume.set_levels.lock().last().unwrap(), 0.49);
        }
    }
}
