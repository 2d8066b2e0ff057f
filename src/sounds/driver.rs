// Shared controller handle and the polling task that advances its timers.
use std::cell::RefCell;
use std::rc::Rc;

use dioxus::prelude::*;

use super::{PlatformAudio, PlatformController, PlaybackError, SystemClock};

/// Poll cadence for retries, repeats and late playback failures.
pub const TICK_MS: u32 = 100;

/// Controller shared between UI callbacks and the tick task (single thread).
#[derive(Clone)]
pub struct SoundHandle(pub Rc<RefCell<PlatformController>>);

impl SoundHandle {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(PlatformController::new(
            PlatformAudio::default(),
            SystemClock,
        ))))
    }
}

impl Default for SoundHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// What the preview panel needs to re-render after a tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackSnapshot {
    pub active_sound: Option<String>,
    pub playing: bool,
    pub repeating: bool,
    pub retry_pending: bool,
    pub last_error: Option<PlaybackError>,
}

impl PlaybackSnapshot {
    pub fn capture(controller: &PlatformController) -> Self {
        Self {
            active_sound: controller.active_sound().map(str::to_string),
            playing: controller.is_playing(),
            repeating: controller.is_repeating(),
            retry_pending: controller.has_pending_retry(),
            last_error: controller.last_error().cloned(),
        }
    }

    /// Nothing audible now and no retry about to make it audible.
    pub fn is_idle(&self) -> bool {
        !self.playing && !self.retry_pending
    }
}

pub async fn sleep_ms(ms: u32) {
    #[cfg(target_arch = "wasm32")]
    gloo_timers::future::TimeoutFuture::new(ms).await;
    #[cfg(not(target_arch = "wasm32"))]
    tokio::time::sleep(std::time::Duration::from_millis(u64::from(ms))).await;
}

/// Tick the controller forever, publishing a snapshot when it changes.
pub fn spawn_sound_driver(handle: SoundHandle, mut snapshot: Signal<PlaybackSnapshot>) {
    spawn(async move {
        loop {
            sleep_ms(TICK_MS).await;

            let next = {
                let mut controller = handle.0.borrow_mut();
                controller.tick();
                PlaybackSnapshot::capture(&controller)
            };
            if *snapshot.peek() != next {
                snapshot.set(next);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_busy_while_playing_or_retrying() {
        assert!(PlaybackSnapshot::default().is_idle());

        let playing = PlaybackSnapshot {
            active_sound: Some("alert".into()),
            playing: true,
            ..PlaybackSnapshot::default()
        };
        assert!(!playing.is_idle());

        let retrying = PlaybackSnapshot {
            retry_pending: true,
            last_error: Some(PlaybackError::PermissionDenied("NotAllowedError".into())),
            ..PlaybackSnapshot::default()
        };
        assert!(!retrying.is_idle());

        let finished = PlaybackSnapshot {
            active_sound: Some("alert".into()),
            ..PlaybackSnapshot::default()
        };
        assert!(finished.is_idle());
    }
}
