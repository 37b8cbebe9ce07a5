//! `IAudioSessionEvents` adapter.
//!
//! Translates the raw COM callbacks into `SessionNotification` values
//! and hands them to the registered sink. Channel-volume and
//! grouping-parameter callbacks are acknowledged and dropped; nothing
//! upstream consumes them.

use std::sync::Arc;

use windows::core::{implement, BOOL, GUID, PCWSTR};
use windows::Win32::Media::Audio::{
    AudioSessionDisconnectReason, AudioSessionState, DisconnectReasonDeviceRemoval,
    DisconnectReasonExclusiveModeOverride, DisconnectReasonFormatChanged,
    DisconnectReasonServerShutdown, DisconnectReasonSessionLogoff, IAudioSessionEvents,
    IAudioSessionEvents_Impl,
};
// Re-export windows_core so the implement macro can find it
#[allow(unused_imports)]
use windows_core;

use audio_session_core::{DisconnectReason, SessionNotification, SessionNotificationSink};

use crate::session::convert_state;

/// COM callback object forwarding session notifications to a sink.
#[implement(IAudioSessionEvents)]
pub struct EventForwarder {
    sink: Arc<dyn SessionNotificationSink>,
}

impl EventForwarder {
    pub fn new(sink: Arc<dyn SessionNotificationSink>) -> Self {
        Self { sink }
    }

    fn convert_reason(reason: AudioSessionDisconnectReason) -> DisconnectReason {
        if reason == DisconnectReasonDeviceRemoval {
            DisconnectReason::DeviceRemoved
        } else if reason == DisconnectReasonServerShutdown {
            DisconnectReason::ServerShutdown
        } else if reason == DisconnectReasonFormatChanged {
            DisconnectReason::FormatChanged
        } else if reason == DisconnectReasonSessionLogoff {
            DisconnectReason::SessionLogoff
        } else if reason == DisconnectReasonExclusiveModeOverride {
            DisconnectReason::ExclusiveModeOverride
        } else {
            // DisconnectReasonSessionDisconnected and anything newer.
            DisconnectReason::SessionDisconnected
        }
    }
}

impl IAudioSessionEvents_Impl for EventForwarder_Impl {
    fn OnDisplayNameChanged(
        &self,
        newdisplayname: &PCWSTR,
        _eventcontext: *const GUID,
    ) -> windows::core::Result<()> {
        unsafe {
            if let Ok(name) = newdisplayname.to_string() {
                self.sink
                    .on_notification(SessionNotification::DisplayNameChanged(name));
            }
        }
        Ok(())
    }

    fn OnIconPathChanged(
        &self,
        newiconpath: &PCWSTR,
        _eventcontext: *const GUID,
    ) -> windows::core::Result<()> {
        unsafe {
            if let Ok(path) = newiconpath.to_string() {
                self.sink
                    .on_notification(SessionNotification::IconPathChanged(path));
            }
        }
        Ok(())
    }

    fn OnSimpleVolumeChanged(
        &self,
        newvolume: f32,
        newmute: BOOL,
        _eventcontext: *const GUID,
    ) -> windows::core::Result<()> {
        self.sink
            .on_notification(SessionNotification::SimpleVolumeChanged {
                volume: newvolume,
                muted: newmute.as_bool(),
            });
        Ok(())
    }

    fn OnChannelVolumeChanged(
        &self,
        _channelcount: u32,
        _newchannelvolumearray: *const f32,
        _changedchannel: u32,
        _eventcontext: *const GUID,
    ) -> windows::core::Result<()> {
        Ok(())
    }

    fn OnGroupingParamChanged(
        &self,
        _newgroupingparam: *const GUID,
        _eventcontext: *const GUID,
    ) -> windows::core::Result<()> {
        Ok(())
    }

    fn OnStateChanged(&self, newstate: AudioSessionState) -> windows::core::Result<()> {
        self.sink
            .on_notification(SessionNotification::StateChanged(convert_state(newstate)));
        Ok(())
    }

    fn OnSessionDisconnected(
        &self,
        disconnectreason: AudioSessionDisconnectReason,
    ) -> windows::core::Result<()> {
        self.sink
            .on_notification(SessionNotification::Disconnected(
                EventForwarder::convert_reason(disconnectreason),
            ));
        Ok(())
    }
}
