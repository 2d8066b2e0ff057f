//! Playback controller: owns the single active sound, the one pending retry and
//! the one repeating alert. Timer-driven work happens in [`PlaybackController::tick`].

use std::collections::HashMap;

use tracing::{debug, error, info, warn};

use crate::db::NotificationSettings;
use crate::sounds::backend::{
    ActiveSound, AudioBackend, Clock, PlayRequest, PlaybackError, PlaybackTicket,
};
use crate::sounds::permissions::InteractionState;
use crate::sounds::policy::{
    clamp_volume, resolve_event_sound, EventSound, RetryPolicy, SoundEvent,
};
use crate::sounds::registry::SoundRegistry;

pub const DEFAULT_REPEAT_INTERVAL_SECS: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
struct Replay {
    sound: String,
    volume: f64,
    looped: bool,
}

struct ActivePlayback<S> {
    ticket: PlaybackTicket,
    replay: Replay,
    // Attempts made so far when this playback belongs to a retryable event.
    attempts: Option<u8>,
    sound: S,
}

#[derive(Debug, Clone, PartialEq)]
struct PendingRetry {
    due_ms: u64,
    attempts_made: u8,
    replay: Replay,
}

#[derive(Debug, Clone, PartialEq)]
struct RepeatingAlert {
    sound: String,
    volume: f64,
    period_ms: u64,
    next_due_ms: u64,
}

pub struct PlaybackController<B: AudioBackend, C: Clock> {
    backend: B,
    clock: C,
    registry: SoundRegistry,
    retry_policy: RetryPolicy,
    clips: HashMap<String, B::Clip>,
    active: Option<ActivePlayback<B::Sound>>,
    pending_retry: Option<PendingRetry>,
    repeating: Option<RepeatingAlert>,
    interaction: InteractionState,
    next_ticket: u64,
    last_error: Option<PlaybackError>,
}

impl<B: AudioBackend, C: Clock> PlaybackController<B, C> {
    pub fn new(backend: B, clock: C) -> Self {
        Self {
            backend,
            clock,
            registry: SoundRegistry::new(),
            retry_policy: RetryPolicy::default(),
            clips: HashMap::new(),
            active: None,
            pending_retry: None,
            repeating: None,
            interaction: InteractionState::default(),
            next_ticket: PlaybackTicket::UNLOCK.0 + 1,
            last_error: None,
        }
    }

    pub fn registry(&self) -> &SoundRegistry {
        &self.registry
    }

    /// Warm a handle for every registered sound. Discards the previous cache.
    pub fn preload(&mut self) -> usize {
        self.clips.clear();
        for entry in self.registry.entries() {
            match self.backend.load(entry.url) {
                Ok(clip) => {
                    debug!(sound = entry.name, url = entry.url, "preloaded sound");
                    self.clips.insert(entry.url.to_string(), clip);
                }
                Err(err) => error!(sound = entry.name, %err, "failed to preload sound"),
            }
        }
        self.clips.len()
    }

    /// Stop whatever is playing and start `sound`. Never fails loudly.
    pub fn play(&mut self, sound: &str, volume: f64, looped: bool) -> bool {
        self.pending_retry = None;
        self.start(
            Replay {
                sound: sound.to_string(),
                volume,
                looped,
            },
            None,
        )
        .is_ok()
    }

    /// Halt and release the active sound. Returns whether one was held.
    pub fn stop(&mut self) -> bool {
        self.pending_retry = None;
        self.halt_active()
    }

    /// Play the sound configured for `event`, retrying once on failure.
    pub fn play_by_event(
        &mut self,
        event: SoundEvent,
        settings: &NotificationSettings,
        volume_override: Option<f64>,
        looped: bool,
    ) -> bool {
        match resolve_event_sound(event, settings, volume_override) {
            EventSound::Silent => {
                info!(event = event.key(), "event sound is set to none; staying silent");
                self.pending_retry = None;
                true
            }
            EventSound::Play {
                sound,
                volume,
                defaulted,
            } => {
                if defaulted {
                    warn!(
                        event = event.key(),
                        setting = event.settings_key(),
                        "no sound configured for event; using default"
                    );
                }
                self.pending_retry = None;
                self.attempt(
                    Replay {
                        sound,
                        volume,
                        looped,
                    },
                    1,
                )
            }
        }
    }

    /// Play now, then again every `interval_secs`. Replaces any running repeat.
    pub fn start_repeating(&mut self, sound: &str, volume: f64, interval_secs: u32) -> bool {
        if let Some(previous) = self.repeating.take() {
            debug!(sound = %previous.sound, "replacing repeating alert");
        }

        let played = self.play(sound, volume, false);
        let period_ms = u64::from(interval_secs.max(1)) * 1000;
        self.repeating = Some(RepeatingAlert {
            sound: sound.to_string(),
            volume,
            period_ms,
            next_due_ms: self.clock.now_ms().saturating_add(period_ms),
        });
        info!(sound, volume, interval_secs, "started repeating alert");
        played
    }

    pub fn stop_repeating(&mut self) -> bool {
        self.stop();
        let was_active = self.repeating.take().is_some();
        if was_active {
            info!("repeating alert stopped");
        }
        was_active
    }

    /// Silent playback to satisfy autoplay gating. Call from a user gesture.
    pub fn unlock(&mut self) -> bool {
        if self.interaction.audio_unlocked() {
            return true;
        }
        match self.backend.unlock() {
            Ok(()) => {
                self.interaction.set_audio_unlocked(true);
                debug!("audio unlocked");
                true
            }
            Err(err) => {
                warn!(%err, "could not unlock audio");
                false
            }
        }
    }

    pub fn mark_user_interaction(&mut self) {
        self.interaction.mark_user_interaction();
    }

    pub fn has_user_interacted(&self) -> bool {
        self.interaction.has_user_interacted()
    }

    /// Drain late platform failures, then fire a due retry and a due repeat.
    pub fn tick(&mut self) {
        for (ticket, err) in self.backend.take_failures() {
            self.handle_late_failure(ticket, err);
        }

        let now = self.clock.now_ms();

        if self
            .pending_retry
            .as_ref()
            .is_some_and(|retry| retry.due_ms <= now)
        {
            if let Some(retry) = self.pending_retry.take() {
                info!(sound = %retry.replay.sound, "retrying sound playback");
                self.unlock();
                self.attempt(retry.replay, retry.attempts_made + 1);
            }
        }

        let due_repeat = match self.repeating.as_mut() {
            Some(repeat) if repeat.next_due_ms <= now => {
                repeat.next_due_ms = repeat.next_due_ms.saturating_add(repeat.period_ms);
                if repeat.next_due_ms <= now {
                    repeat.next_due_ms = now.saturating_add(repeat.period_ms);
                }
                Some((repeat.sound.clone(), repeat.volume))
            }
            _ => None,
        };
        if let Some((sound, volume)) = due_repeat {
            self.play(&sound, volume, false);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.sound.is_finished())
    }

    pub fn active_sound(&self) -> Option<&str> {
        self.active
            .as_ref()
            .map(|active| active.replay.sound.as_str())
    }

    pub fn is_repeating(&self) -> bool {
        self.repeating.is_some()
    }

    pub fn has_pending_retry(&self) -> bool {
        self.pending_retry.is_some()
    }

    pub fn last_error(&self) -> Option<&PlaybackError> {
        self.last_error.as_ref()
    }

    fn attempt(&mut self, replay: Replay, attempts_made: u8) -> bool {
        match self.start(replay.clone(), Some(attempts_made)) {
            Ok(_) => true,
            Err(_) => {
                self.schedule_retry(replay, attempts_made);
                false
            }
        }
    }

    fn schedule_retry(&mut self, replay: Replay, attempts_made: u8) {
        let now = self.clock.now_ms();
        if let Some(due_ms) = self.retry_policy.next_attempt_at(attempts_made, now) {
            debug!(sound = %replay.sound, due_ms, "scheduled playback retry");
            self.pending_retry = Some(PendingRetry {
                due_ms,
                attempts_made,
                replay,
            });
        }
    }

    fn start(
        &mut self,
        mut replay: Replay,
        attempts: Option<u8>,
    ) -> Result<PlaybackTicket, PlaybackError> {
        replay.volume = clamp_volume(replay.volume);
        self.halt_active();

        let resolved = self.registry.resolve(&replay.sound);
        if resolved.fallback {
            warn!(sound = %replay.sound, "unknown sound; using default");
        }

        let ticket = PlaybackTicket(self.next_ticket);
        self.next_ticket += 1;

        let request = PlayRequest {
            url: &resolved.url,
            volume: replay.volume,
            looped: replay.looped,
            ticket,
        };
        let clip = self.clips.get(&resolved.url);
        match self.backend.start(&request, clip) {
            Ok(sound) => {
                info!(
                    sound = %replay.sound,
                    volume = replay.volume,
                    looped = replay.looped,
                    url = %resolved.url,
                    "playing sound"
                );
                self.last_error = None;
                self.active = Some(ActivePlayback {
                    ticket,
                    replay,
                    attempts,
                    sound,
                });
                Ok(ticket)
            }
            Err(err) => {
                log_playback_error(&replay.sound, &err);
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn halt_active(&mut self) -> bool {
        match self.active.take() {
            Some(mut active) => {
                active.sound.halt();
                debug!(sound = %active.replay.sound, "sound stopped");
                true
            }
            None => false,
        }
    }

    fn handle_late_failure(&mut self, ticket: PlaybackTicket, err: PlaybackError) {
        if ticket == PlaybackTicket::UNLOCK {
            warn!(%err, "silent unlock playback was refused");
            self.interaction.set_audio_unlocked(false);
            return;
        }

        let is_current = self
            .active
            .as_ref()
            .is_some_and(|active| active.ticket == ticket);
        if !is_current {
            debug!(ticket = ticket.0, %err, "ignoring failure of a replaced sound");
            return;
        }

        if let Some(mut active) = self.active.take() {
            log_playback_error(&active.replay.sound, &err);
            active.sound.halt();
            self.last_error = Some(err);
            if let Some(attempts_made) = active.attempts {
                self.schedule_retry(active.replay, attempts_made);
            }
        }
    }
}

fn log_playback_error(sound: &str, err: &PlaybackError) {
    if err.needs_interaction() {
        warn!(sound, %err, "audio playback was prevented; user interaction is required first");
    } else {
        error!(sound, %err, "error playing sound");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Load(String),
        Start {
            url: String,
            volume: f64,
            looped: bool,
            ticket: PlaybackTicket,
            cached: bool,
        },
        Halt(PlaybackTicket),
        Unlock,
    }

    #[derive(Default)]
    struct Shared {
        calls: Vec<Call>,
        refuse_starts: usize,
        refuse_unlock: bool,
        failing_loads: Vec<String>,
        late_failures: Vec<(PlaybackTicket, PlaybackError)>,
    }

    #[derive(Clone, Default)]
    struct FakeBackend(Rc<RefCell<Shared>>);

    impl FakeBackend {
        fn calls(&self) -> Vec<Call> {
            self.0.borrow().calls.clone()
        }

        fn starts(&self) -> Vec<Call> {
            self.calls()
                .into_iter()
                .filter(|call| matches!(call, Call::Start { .. }))
                .collect()
        }

        fn refuse_next_starts(&self, count: usize) {
            self.0.borrow_mut().refuse_starts = count;
        }

        fn fail_later(&self, ticket: PlaybackTicket, err: PlaybackError) {
            self.0.borrow_mut().late_failures.push((ticket, err));
        }
    }

    struct FakeSound {
        ticket: PlaybackTicket,
        shared: Rc<RefCell<Shared>>,
    }

    impl ActiveSound for FakeSound {
        fn halt(&mut self) {
            self.shared.borrow_mut().calls.push(Call::Halt(self.ticket));
        }

        fn is_finished(&self) -> bool {
            false
        }
    }

    impl AudioBackend for FakeBackend {
        type Clip = ();
        type Sound = FakeSound;

        fn load(&mut self, url: &str) -> Result<(), PlaybackError> {
            let mut shared = self.0.borrow_mut();
            shared.calls.push(Call::Load(url.to_string()));
            if shared.failing_loads.iter().any(|failing| failing == url) {
                return Err(PlaybackError::resource(url, "404"));
            }
            Ok(())
        }

        fn start(
            &mut self,
            request: &PlayRequest<'_>,
            clip: Option<&()>,
        ) -> Result<FakeSound, PlaybackError> {
            let mut shared = self.0.borrow_mut();
            shared.calls.push(Call::Start {
                url: request.url.to_string(),
                volume: request.volume,
                looped: request.looped,
                ticket: request.ticket,
                cached: clip.is_some(),
            });
            if shared.refuse_starts > 0 {
                shared.refuse_starts -= 1;
                return Err(PlaybackError::PermissionDenied("NotAllowedError".into()));
            }
            Ok(FakeSound {
                ticket: request.ticket,
                shared: Rc::clone(&self.0),
            })
        }

        fn unlock(&mut self) -> Result<(), PlaybackError> {
            let mut shared = self.0.borrow_mut();
            shared.calls.push(Call::Unlock);
            if shared.refuse_unlock {
                return Err(PlaybackError::PermissionDenied("no gesture".into()));
            }
            Ok(())
        }

        fn take_failures(&mut self) -> Vec<(PlaybackTicket, PlaybackError)> {
            std::mem::take(&mut self.0.borrow_mut().late_failures)
        }
    }

    #[derive(Clone, Default)]
    struct ManualClock(Rc<Cell<u64>>);

    impl ManualClock {
        fn advance(&self, ms: u64) {
            self.0.set(self.0.get() + ms);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> u64 {
            self.0.get()
        }
    }

    fn controller() -> (
        PlaybackController<FakeBackend, ManualClock>,
        FakeBackend,
        ManualClock,
    ) {
        let backend = FakeBackend::default();
        let clock = ManualClock::default();
        (
            PlaybackController::new(backend.clone(), clock.clone()),
            backend,
            clock,
        )
    }

    fn started_volume(call: &Call) -> f64 {
        match call {
            Call::Start { volume, .. } => *volume,
            other => panic!("not a start: {other:?}"),
        }
    }

    fn started_url(call: &Call) -> &str {
        match call {
            Call::Start { url, .. } => url,
            other => panic!("not a start: {other:?}"),
        }
    }

    #[test]
    fn play_clamps_volume() {
        let (mut controller, backend, _) = controller();
        assert!(controller.play("beep", 4.2, false));
        assert!(controller.play("beep", -1.0, true));
        let starts = backend.starts();
        assert_eq!(started_volume(&starts[0]), 1.0);
        assert_eq!(started_volume(&starts[1]), 0.0);
        assert!(matches!(starts[1], Call::Start { looped: true, .. }));
    }

    #[test]
    fn new_play_stops_previous_first() {
        let (mut controller, backend, _) = controller();
        controller.play("alert", 0.5, false);
        controller.play("podium", 0.5, false);

        let calls = backend.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1], Call::Halt(PlaybackTicket(1)));
        assert_eq!(started_url(&calls[2]), "/sounds/podium.mp3");
        assert_eq!(controller.active_sound(), Some("podium"));
    }

    #[test]
    fn stop_reports_whether_anything_played() {
        let (mut controller, backend, _) = controller();
        assert!(!controller.stop());
        assert!(backend.calls().is_empty());

        controller.play("alert", 0.5, false);
        assert!(controller.is_playing());
        assert!(controller.stop());
        assert!(!controller.is_playing());
        assert!(!controller.stop());
    }

    #[test]
    fn refused_play_returns_false_and_keeps_error() {
        let (mut controller, backend, _) = controller();
        backend.refuse_next_starts(1);
        assert!(!controller.play("alert", 0.5, false));
        assert!(controller
            .last_error()
            .is_some_and(PlaybackError::needs_interaction));
        assert_eq!(controller.active_sound(), None);
        assert!(!controller.has_pending_retry());
    }

    #[test]
    fn event_uses_configured_sound_and_volume() {
        let (mut controller, backend, _) = controller();
        let settings = NotificationSettings {
            alert_sound: Some("beep".into()),
            sound_volume: Some(0.3),
            ..NotificationSettings::default()
        };
        assert!(controller.play_by_event(SoundEvent::Alert, &settings, None, false));
        let starts = backend.starts();
        assert_eq!(started_url(&starts[0]), "/sounds/beep.mp3");
        assert_eq!(started_volume(&starts[0]), 0.3);
    }

    #[test]
    fn none_event_is_silent_success() {
        let (mut controller, backend, _) = controller();
        let settings = NotificationSettings {
            podium_sound: Some("none".into()),
            ..NotificationSettings::default()
        };
        assert!(controller.play_by_event(SoundEvent::Podium, &settings, None, false));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn none_event_cancels_earlier_retry() {
        let (mut controller, backend, clock) = controller();
        let settings = NotificationSettings {
            alert_sound: Some("alert".into()),
            podium_sound: Some("none".into()),
            ..NotificationSettings::default()
        };
        backend.refuse_next_starts(1);
        assert!(!controller.play_by_event(SoundEvent::Alert, &settings, None, false));
        assert!(controller.has_pending_retry());

        assert!(controller.play_by_event(SoundEvent::Podium, &settings, None, false));
        assert!(!controller.has_pending_retry());

        clock.advance(500);
        controller.tick();
        assert_eq!(backend.starts().len(), 1);
    }

    #[test]
    fn none_event_leaves_current_sound_playing() {
        let (mut controller, backend, _) = controller();
        let settings = NotificationSettings {
            podium_sound: Some("none".into()),
            ..NotificationSettings::default()
        };
        controller.play("alert", 0.5, false);
        assert!(controller.play_by_event(SoundEvent::Podium, &settings, None, false));
        assert_eq!(controller.active_sound(), Some("alert"));
        assert!(!backend.calls().iter().any(|call| matches!(call, Call::Halt(_))));
    }

    #[test]
    fn notification_event_plays_at_full_volume() {
        let (mut controller, backend, _) = controller();
        let settings = NotificationSettings {
            notification_sound: Some("notification".into()),
            sound_volume: Some(0.2),
            ..NotificationSettings::default()
        };
        controller.play_by_event(SoundEvent::Notification, &settings, Some(0.1), false);
        assert_eq!(started_volume(&backend.starts()[0]), 1.0);
    }

    #[test]
    fn missing_setting_plays_default() {
        let (mut controller, backend, _) = controller();
        let settings = NotificationSettings::default();
        assert!(controller.play_by_event(SoundEvent::FirstPlace, &settings, None, false));
        let starts = backend.starts();
        assert_eq!(started_url(&starts[0]), "/sounds/notification.mp3");
        assert_eq!(started_volume(&starts[0]), 0.5);

        backend.refuse_next_starts(1);
        assert!(!controller.play_by_event(SoundEvent::FirstPlace, &settings, None, false));
    }

    /// Collects the messages of WARN events emitted while it is installed.
    #[derive(Clone, Default)]
    struct WarningLog(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

    struct MessageVisitor(Option<String>);

    impl tracing::field::Visit for MessageVisitor {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = Some(format!("{value:?}"));
            }
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarningLog {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() != tracing::Level::WARN {
                return;
            }
            let mut visitor = MessageVisitor(None);
            event.record(&mut visitor);
            if let (Some(message), Ok(mut messages)) = (visitor.0, self.0.lock()) {
                messages.push(message);
            }
        }
    }

    impl WarningLog {
        fn capture(&self, f: impl FnOnce()) {
            use tracing_subscriber::layer::SubscriberExt;
            let subscriber = tracing_subscriber::registry().with(self.clone());
            tracing::subscriber::with_default(subscriber, f);
        }

        fn messages(&self) -> Vec<String> {
            self.0.lock().map(|messages| messages.clone()).unwrap_or_default()
        }
    }

    #[test]
    fn missing_setting_logs_warning() {
        let (mut controller, _, _) = controller();
        let log = WarningLog::default();
        log.capture(|| {
            controller.play_by_event(SoundEvent::Podium, &NotificationSettings::default(), None, false);
        });
        assert_eq!(
            log.messages(),
            vec!["no sound configured for event; using default".to_string()]
        );
    }

    #[test]
    fn unknown_sound_logs_warning() {
        let (mut controller, backend, _) = controller();
        let log = WarningLog::default();
        log.capture(|| {
            assert!(controller.play("../secret.mp3", 0.5, false));
        });
        assert_eq!(started_url(&backend.starts()[0]), "/sounds/notification.mp3");
        assert_eq!(log.messages(), vec!["unknown sound; using default".to_string()]);

        let quiet = WarningLog::default();
        quiet.capture(|| {
            controller.play("alerta.mp3", 0.5, false);
        });
        assert!(quiet.messages().is_empty());
    }

    #[test]
    fn failed_event_retries_exactly_once() {
        let (mut controller, backend, clock) = controller();
        let settings = NotificationSettings {
            alert_sound: Some("alert".into()),
            ..NotificationSettings::default()
        };
        backend.refuse_next_starts(2);
        assert!(!controller.play_by_event(SoundEvent::Alert, &settings, None, false));
        assert!(controller.has_pending_retry());

        clock.advance(499);
        controller.tick();
        assert_eq!(backend.starts().len(), 1);

        clock.advance(1);
        controller.tick();
        let calls = backend.calls();
        assert_eq!(backend.starts().len(), 2);
        assert!(calls.contains(&Call::Unlock));
        assert!(!controller.has_pending_retry());

        clock.advance(10_000);
        controller.tick();
        assert_eq!(backend.starts().len(), 2);
    }

    #[test]
    fn successful_retry_becomes_active() {
        let (mut controller, backend, clock) = controller();
        let settings = NotificationSettings {
            alert_sound: Some("alert".into()),
            ..NotificationSettings::default()
        };
        backend.refuse_next_starts(1);
        controller.play_by_event(SoundEvent::Alert, &settings, None, false);
        clock.advance(500);
        controller.tick();
        assert_eq!(controller.active_sound(), Some("alert"));
        assert!(controller.last_error().is_none());
    }

    #[test]
    fn explicit_stop_cancels_pending_retry() {
        let (mut controller, backend, clock) = controller();
        backend.refuse_next_starts(1);
        controller.play_by_event(SoundEvent::Alert, &NotificationSettings::default(), None, false);
        controller.stop();
        clock.advance(1_000);
        controller.tick();
        assert_eq!(backend.starts().len(), 1);
    }

    #[test]
    fn late_failure_of_current_event_schedules_retry() {
        let (mut controller, backend, clock) = controller();
        assert!(controller.play_by_event(
            SoundEvent::Podium,
            &NotificationSettings::default(),
            None,
            false
        ));
        backend.fail_later(
            PlaybackTicket(1),
            PlaybackError::PermissionDenied("NotAllowedError".into()),
        );
        controller.tick();
        assert_eq!(controller.active_sound(), None);
        assert!(controller.has_pending_retry());

        clock.advance(500);
        controller.tick();
        assert_eq!(backend.starts().len(), 2);

        backend.fail_later(PlaybackTicket(2), PlaybackError::resource("/sounds/x.mp3", "404"));
        clock.advance(500);
        controller.tick();
        assert!(!controller.has_pending_retry());
        assert_eq!(backend.starts().len(), 2);
    }

    #[test]
    fn late_failure_of_replaced_sound_is_ignored() {
        let (mut controller, backend, _) = controller();
        controller.play("alert", 0.5, false);
        controller.play("beep", 0.5, false);
        backend.fail_later(
            PlaybackTicket(1),
            PlaybackError::PermissionDenied("NotAllowedError".into()),
        );
        controller.tick();
        assert_eq!(controller.active_sound(), Some("beep"));
        assert!(controller.last_error().is_none());
    }

    #[test]
    fn late_failure_of_plain_play_does_not_retry() {
        let (mut controller, backend, _) = controller();
        controller.play("alert", 0.5, false);
        backend.fail_later(PlaybackTicket(1), PlaybackError::resource("/sounds/alert.mp3", "404"));
        controller.tick();
        assert!(!controller.has_pending_retry());
        assert!(controller.last_error().is_some());
    }

    #[test]
    fn repeating_alert_replays_on_period() {
        let (mut controller, backend, clock) = controller();
        assert!(controller.start_repeating("alert", 0.8, 10));
        assert_eq!(backend.starts().len(), 1);

        clock.advance(9_999);
        controller.tick();
        assert_eq!(backend.starts().len(), 1);

        clock.advance(1);
        controller.tick();
        assert_eq!(backend.starts().len(), 2);

        clock.advance(10_000);
        controller.tick();
        assert_eq!(backend.starts().len(), 3);
    }

    #[test]
    fn second_repeating_alert_replaces_first() {
        let (mut controller, backend, clock) = controller();
        controller.start_repeating("alert", 0.8, 10);
        clock.advance(5_000);
        controller.start_repeating("beep", 0.4, 10);

        clock.advance(5_000);
        controller.tick();
        assert_eq!(backend.starts().len(), 2);

        clock.advance(5_000);
        controller.tick();
        let starts = backend.starts();
        assert_eq!(starts.len(), 3);
        assert_eq!(started_url(&starts[2]), "/sounds/beep.mp3");
    }

    #[test]
    fn stop_repeating_cancels_timer_and_sound() {
        let (mut controller, backend, clock) = controller();
        assert!(!controller.stop_repeating());
        controller.start_repeating("alert", 0.8, 0);
        assert!(controller.stop_repeating());
        assert!(!controller.is_repeating());
        assert_eq!(controller.active_sound(), None);

        clock.advance(60_000);
        controller.tick();
        assert_eq!(backend.starts().len(), 1);
    }

    #[test]
    fn preload_is_idempotent_and_tolerates_failures() {
        let (mut controller, backend, _) = controller();
        backend
            .0
            .borrow_mut()
            .failing_loads
            .push("/sounds/podium.mp3".into());

        assert_eq!(controller.preload(), 4);
        assert_eq!(controller.preload(), 4);
        let loads = backend
            .calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Load(_)))
            .count();
        assert_eq!(loads, 10);

        controller.play("alert", 0.5, false);
        controller.play("podium", 0.5, false);
        let starts = backend.starts();
        assert!(matches!(starts[0], Call::Start { cached: true, .. }));
        assert!(matches!(starts[1], Call::Start { cached: false, .. }));
    }

    #[test]
    fn unlock_is_idempotent_after_success() {
        let (mut controller, backend, _) = controller();
        backend.0.borrow_mut().refuse_unlock = true;
        assert!(!controller.unlock());

        backend.0.borrow_mut().refuse_unlock = false;
        assert!(controller.unlock());
        assert!(controller.unlock());
        let unlocks = backend
            .calls()
            .into_iter()
            .filter(|call| *call == Call::Unlock)
            .count();
        assert_eq!(unlocks, 2);
    }

    #[test]
    fn refused_silent_unlock_is_attempted_again() {
        let (mut controller, backend, _) = controller();
        assert!(controller.unlock());
        backend.fail_later(
            PlaybackTicket::UNLOCK,
            PlaybackError::PermissionDenied("NotAllowedError".into()),
        );
        controller.tick();
        assert!(controller.unlock());
        let unlocks = backend
            .calls()
            .into_iter()
            .filter(|call| *call == Call::Unlock)
            .count();
        assert_eq!(unlocks, 2);
    }

    #[test]
    fn interaction_is_remembered() {
        let (mut controller, _, _) = controller();
        assert!(!controller.has_user_interacted());
        controller.mark_user_interaction();
        assert!(controller.has_user_interacted());
    }
}
