//! Fixed-interval peak metering.
//!
//! The platform exposes no push notification for peak level, so
//! sessions with a metering facet are sampled on a timer. Samples go
//! through the serial executor like every other native call and are
//! republished as `PeakValueChanged` events, unconditionally (no
//! de-duplication).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::error::AudioError;
use crate::session::controller::SessionShared;
use crate::traits::session_handle::PeakMeter;

/// Interval between peak samples.
pub const PEAK_POLL_INTERVAL: Duration = Duration::from_millis(20);

pub(crate) struct PeakMeterPoller {
    running: Arc<AtomicBool>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl PeakMeterPoller {
    pub(crate) fn start(shared: Arc<SessionShared>, meter: Arc<dyn PeakMeter>) -> Self {
        let running = Arc::new(AtomicBool::new(true));

        let tick_running = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("peak-meter-poll".into())
            .spawn(move || {
                // First sample fires immediately, then one per interval.
                loop {
                    if !tick_running.load(Ordering::SeqCst)
                        || shared.disposed.load(Ordering::SeqCst)
                    {
                        break;
                    }

                    let sample = {
                        let meter = Arc::clone(&meter);
                        shared.executor.invoke(move || meter.peak_value())
                    };
                    match sample {
                        Ok(peak) => shared.publish_peak(f64::from(peak) * 100.0),
                        Err(AudioError::StaleHandle) => {
                            // The native object was released while the
                            // timer was still ticking. Expected; report
                            // silence and stop.
                            shared.publish_peak(0.0);
                            break;
                        }
                        Err(_) => shared.publish_peak(0.0),
                    }

                    thread::sleep(PEAK_POLL_INTERVAL);
                }
            })
            .expect("failed to spawn peak poll thread");

        Self {
            running,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Signal the tick thread to exit. Does not join: a tick may be
    /// blocked in `invoke` while dispose itself runs on the executor
    /// worker, and joining here would deadlock. The thread exits on its
    /// own within one interval; publishes it races against disposal hit
    /// already-disposed broadcasters and no-op.
    pub(crate) fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        drop(self.handle.lock().take());
    }
}
