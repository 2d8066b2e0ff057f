// Platform seams: audio output, failure reporting, and the clock that drives timers.
use thiserror::Error;

/// Why a playback attempt did not produce sound.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// Autoplay gate: the user has not interacted with the page yet, or audio is blocked.
    #[error("playback was blocked by the platform: {0}")]
    PermissionDenied(String),
    /// Missing, unreadable or undecodable sound resource.
    #[error("sound resource {url} failed to load: {reason}")]
    ResourceFailed { url: String, reason: String },
    /// No output device or audio element could be created.
    #[allow(dead_code)]
    #[error("audio output is unavailable: {0}")]
    OutputUnavailable(String),
    #[error("audio playback is not supported on this platform")]
    Unsupported,
}

impl PlaybackError {
    pub fn resource(url: &str, reason: impl Into<String>) -> Self {
        Self::ResourceFailed {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether a later user gesture could make this playback succeed.
    pub fn needs_interaction(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

/// Identifies one playback attempt so late failures can be matched to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackTicket(pub u64);

impl PlaybackTicket {
    /// Reserved for the silent unlock attempt.
    pub const UNLOCK: PlaybackTicket = PlaybackTicket(0);
}

/// What the controller asks a backend to play.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRequest<'a> {
    pub url: &'a str,
    pub volume: f64,
    pub looped: bool,
    pub ticket: PlaybackTicket,
}

/// A sound that has been started and can be halted.
pub trait ActiveSound {
    /// Stop output and rewind. Must be safe to call on a sound that already ended.
    fn halt(&mut self);

    fn is_finished(&self) -> bool;
}

/// Platform audio capability.
///
/// `start` reports synchronous refusals directly. Platforms whose playback
/// start is asynchronous report later refusals through `take_failures`,
/// tagged with the ticket of the request they belong to.
pub trait AudioBackend {
    /// A warmed resource kept by the preload cache.
    type Clip;
    type Sound: ActiveSound;

    fn load(&mut self, url: &str) -> Result<Self::Clip, PlaybackError>;

    fn start(
        &mut self,
        request: &PlayRequest<'_>,
        clip: Option<&Self::Clip>,
    ) -> Result<Self::Sound, PlaybackError>;

    /// Silent playback used to satisfy autoplay gating inside a user gesture.
    fn unlock(&mut self) -> Result<(), PlaybackError>;

    fn take_failures(&mut self) -> Vec<(PlaybackTicket, PlaybackError)>;
}

/// Millisecond clock. Only differences between readings matter.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[cfg(target_arch = "wasm32")]
impl Clock for SystemClock {
    /// `performance.now()` is monotonic; the wall clock can jump under NTP or a manual change.
    fn now_ms(&self) -> u64 {
        let reading = web_sys::window()
            .and_then(|win| win.performance())
            .map_or_else(js_sys::Date::now, |perf| perf.now());
        whole_ms(reading)
    }
}

/// Truncate a fractional millisecond reading, mapping NaN and negatives to 0.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn whole_ms(reading: f64) -> u64 {
    if reading.is_nan() || reading <= 0.0 {
        0
    } else {
        reading as u64
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[cfg(not(target_arch = "wasm32"))]
impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        use once_cell::sync::Lazy;
        use std::time::Instant;

        static ORIGIN: Lazy<Instant> = Lazy::new(Instant::now);
        ORIGIN.elapsed().as_millis() as u64
    }
}

/// Native builds without the desktop feature have no audio output.
#[cfg(all(not(target_arch = "wasm32"), not(feature = "desktop")))]
#[derive(Debug, Default)]
pub struct UnavailableAudio;

#[cfg(all(not(target_arch = "wasm32"), not(feature = "desktop")))]
pub struct NoSound;

#[cfg(all(not(target_arch = "wasm32"), not(feature = "desktop")))]
impl ActiveSound for NoSound {
    fn halt(&mut self) {}

    fn is_finished(&self) -> bool {
        true
    }
}

#[cfg(all(not(target_arch = "wasm32"), not(feature = "desktop")))]
impl AudioBackend for UnavailableAudio {
    type Clip = ();
    type Sound = NoSound;

    fn load(&mut self, _url: &str) -> Result<Self::Clip, PlaybackError> {
        Err(PlaybackError::Unsupported)
    }

    fn start(
        &mut self,
        _request: &PlayRequest<'_>,
        _clip: Option<&Self::Clip>,
    ) -> Result<Self::Sound, PlaybackError> {
        Err(PlaybackError::Unsupported)
    }

    fn unlock(&mut self) -> Result<(), PlaybackError> {
        Err(PlaybackError::Unsupported)
    }

    fn take_failures(&mut self) -> Vec<(PlaybackTicket, PlaybackError)> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_permission_errors_wait_for_interaction() {
        assert!(PlaybackError::PermissionDenied("NotAllowedError".into()).needs_interaction());
        assert!(!PlaybackError::resource("/sounds/x.mp3", "404").needs_interaction());
        assert!(!PlaybackError::Unsupported.needs_interaction());
        assert!(!PlaybackError::OutputUnavailable("no device".into()).needs_interaction());
    }

    #[test]
    fn resource_error_mentions_url() {
        let err = PlaybackError::resource("/sounds/alert.mp3", "decode error");
        assert_eq!(
            err.to_string(),
            "sound resource /sounds/alert.mp3 failed to load: decode error"
        );
    }

    #[test]
    fn fractional_readings_truncate_to_whole_ms() {
        assert_eq!(whole_ms(1234.987), 1234);
        assert_eq!(whole_ms(0.4), 0);
        assert_eq!(whole_ms(-5.0), 0);
        assert_eq!(whole_ms(f64::NAN), 0);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock;
        let first = clock.now_ms();
        assert!(clock.now_ms() >= first);
    }
}
