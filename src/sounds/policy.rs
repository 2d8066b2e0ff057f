//! Pure decisions: which sound an event plays, at what volume, and when to retry.

use crate::db::NotificationSettings;
use crate::sounds::registry::{DEFAULT_SOUND, SILENT_SOUND};

pub const DEFAULT_VOLUME: f64 = 0.5;
pub const RETRY_DELAY_MS: u64 = 500;

/// Semantic events that have a configurable sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundEvent {
    /// A new ticket arrived.
    Notification,
    /// A ticket is running late.
    Alert,
    Podium,
    FirstPlace,
}

impl SoundEvent {
    pub const ALL: [SoundEvent; 4] = [
        SoundEvent::Notification,
        SoundEvent::Alert,
        SoundEvent::Podium,
        SoundEvent::FirstPlace,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SoundEvent::Notification => "notification",
            SoundEvent::Alert => "alert",
            SoundEvent::Podium => "podium",
            SoundEvent::FirstPlace => "firstPlace",
        }
    }

    /// Name of the settings field holding this event's sound.
    pub fn settings_key(self) -> &'static str {
        match self {
            SoundEvent::Notification => "notificationSound",
            SoundEvent::Alert => "alertSound",
            SoundEvent::Podium => "podiumSound",
            SoundEvent::FirstPlace => "firstPlaceSound",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SoundEvent::Notification => "New ticket",
            SoundEvent::Alert => "Delay alert",
            SoundEvent::Podium => "Podium entry",
            SoundEvent::FirstPlace => "First place",
        }
    }
}

/// What an event should do once settings are applied.
#[derive(Debug, Clone, PartialEq)]
pub enum EventSound {
    /// The event is configured as `"none"`.
    Silent,
    Play {
        sound: String,
        volume: f64,
        /// No sound was configured and the default was substituted.
        defaulted: bool,
    },
}

/// Setting lookup, then the `"none"` sentinel, then default substitution.
///
/// New-ticket notifications always play at full volume so they are never
/// missed, whatever volume is configured or passed in.
pub fn resolve_event_sound(
    event: SoundEvent,
    settings: &NotificationSettings,
    volume_override: Option<f64>,
) -> EventSound {
    let configured = settings
        .sound_for(event)
        .map(str::trim)
        .filter(|name| !name.is_empty());

    if configured == Some(SILENT_SOUND) {
        return EventSound::Silent;
    }

    let volume = match event {
        SoundEvent::Notification => 1.0,
        _ => clamp_volume(
            volume_override
                .or(settings.sound_volume)
                .unwrap_or(DEFAULT_VOLUME),
        ),
    };

    match configured {
        Some(name) => EventSound::Play {
            sound: name.to_string(),
            volume,
            defaulted: false,
        },
        None => EventSound::Play {
            sound: DEFAULT_SOUND.to_string(),
            volume,
            defaulted: true,
        },
    }
}

pub fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Two attempts with a fixed delay between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            delay_ms: RETRY_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// When to try again after `attempts_made` attempts, the last failing at `failed_at_ms`.
    pub fn next_attempt_at(&self, attempts_made: u8, failed_at_ms: u64) -> Option<u64> {
        (attempts_made < self.max_attempts).then(|| failed_at_ms.saturating_add(self.delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> NotificationSettings {
        NotificationSettings::default()
    }

    #[test]
    fn configured_sound_and_volume_are_used() {
        let settings = NotificationSettings {
            alert_sound: Some("beep".into()),
            sound_volume: Some(0.3),
            ..settings()
        };
        assert_eq!(
            resolve_event_sound(SoundEvent::Alert, &settings, None),
            EventSound::Play {
                sound: "beep".into(),
                volume: 0.3,
                defaulted: false,
            }
        );
    }

    #[test]
    fn none_sentinel_is_silent() {
        let settings = NotificationSettings {
            podium_sound: Some("none".into()),
            ..settings()
        };
        assert_eq!(
            resolve_event_sound(SoundEvent::Podium, &settings, Some(0.9)),
            EventSound::Silent
        );
    }

    #[test]
    fn notification_volume_is_forced_to_max() {
        let settings = NotificationSettings {
            notification_sound: Some("beep".into()),
            sound_volume: Some(0.1),
            ..settings()
        };
        for volume_override in [None, Some(0.0), Some(0.4)] {
            match resolve_event_sound(SoundEvent::Notification, &settings, volume_override) {
                EventSound::Play { volume, .. } => assert_eq!(volume, 1.0),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn missing_or_blank_sound_uses_default() {
        let blank = NotificationSettings {
            first_place_sound: Some("  ".into()),
            ..settings()
        };
        for settings in [settings(), blank] {
            assert_eq!(
                resolve_event_sound(SoundEvent::FirstPlace, &settings, None),
                EventSound::Play {
                    sound: "notification".into(),
                    volume: DEFAULT_VOLUME,
                    defaulted: true,
                }
            );
        }
    }

    #[test]
    fn override_beats_settings_volume_and_is_clamped() {
        let settings = NotificationSettings {
            alert_sound: Some("alert".into()),
            sound_volume: Some(0.2),
            ..settings()
        };
        match resolve_event_sound(SoundEvent::Alert, &settings, Some(3.0)) {
            EventSound::Play { volume, .. } => assert_eq!(volume, 1.0),
            other => panic!("unexpected {other:?}"),
        }
        match resolve_event_sound(SoundEvent::Alert, &settings, Some(0.7)) {
            EventSound::Play { volume, .. } => assert_eq!(volume, 0.7),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn volume_clamps_to_nearest_bound() {
        assert_eq!(clamp_volume(-0.5), 0.0);
        assert_eq!(clamp_volume(1.5), 1.0);
        assert_eq!(clamp_volume(0.25), 0.25);
        assert_eq!(clamp_volume(f64::NAN), 0.0);
    }

    #[test]
    fn retry_policy_allows_one_retry() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_attempt_at(1, 1_000), Some(1_500));
        assert_eq!(policy.next_attempt_at(2, 1_500), None);
    }

    #[test]
    fn settings_keys_follow_event_keys() {
        for event in SoundEvent::ALL {
            assert_eq!(event.settings_key(), format!("{}Sound", event.key()));
        }
    }
}
