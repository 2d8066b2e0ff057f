use crate::components::{SnapshotSignal, StatusKind, StatusMessage};
use crate::db::NotificationSettings;
use crate::sounds::{sleep_ms, PlaybackSnapshot, SoundEvent, SoundHandle};
use dioxus::prelude::*;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsCast;

/// How long a preview keeps watching for an asynchronous playback refusal.
const RESULT_WINDOW_MS: u32 = 3000;

/// Preview buttons, one per event, using the form's current values.
#[component]
pub fn SoundTester(
    form: NotificationSettings,
    volume: f64,
    muted: bool,
    status: Signal<Option<StatusMessage>>,
) -> Element {
    let sounds = use_context::<SoundHandle>();
    let mut snapshot = use_context::<SnapshotSignal>().0;
    let mut playing_event = use_signal(|| None::<SoundEvent>);
    // Preview whose asynchronous outcome is still being watched.
    let mut waiting_for_result = use_signal(|| None::<(SoundEvent, NotificationSettings)>);

    // Browser playback refusals arrive after play() returned.
    {
        let sounds = sounds.clone();
        use_effect(move || {
            let current = snapshot();
            let Some((event, settings)) = waiting_for_result() else {
                return;
            };
            let Some(err) = current.last_error else {
                return;
            };
            waiting_for_result.set(None);
            if err.needs_interaction() {
                show_status(
                    status,
                    StatusKind::Warning,
                    "To allow audio playback, interact with the page first.",
                );
                retry_on_next_click(sounds.clone(), event, settings);
            } else {
                show_status(
                    status,
                    StatusKind::Error,
                    "Could not play the sound. Check your browser settings.",
                );
            }
        });
    }

    // Buttons return to idle once the controller has nothing playing or pending.
    use_effect(move || {
        if snapshot().is_idle() && playing_event.peek().is_some() {
            playing_event.set(None);
        }
    });

    let preview = {
        let sounds = sounds.clone();
        let form = form.clone();
        move |event: SoundEvent| {
            let mut controller = sounds.0.borrow_mut();
            controller.stop();

            if muted {
                show_status(
                    status,
                    StatusKind::Warning,
                    "Sound is muted. Turn the volume back on to preview.",
                );
                return;
            }

            tracing::debug!(
                event = event.key(),
                sound = ?form.sound_for(event),
                volume,
                "previewing sound"
            );
            playing_event.set(Some(event));

            // Must happen inside the click for iOS/Safari.
            controller.unlock();
            controller.preload();

            let preview_settings = with_volume(&form, volume);
            let success = controller.play_by_event(event, &preview_settings, None, false);
            let interacted = controller.has_user_interacted();
            snapshot.set(PlaybackSnapshot::capture(&controller));
            drop(controller);

            spawn(async move {
                sleep_ms(RESULT_WINDOW_MS).await;
                if waiting_for_result.peek().as_ref().is_some_and(|(e, _)| *e == event) {
                    waiting_for_result.set(None);
                }
            });

            if success {
                waiting_for_result.set(Some((event, preview_settings)));
                show_status(
                    status,
                    StatusKind::Success,
                    format!("{} sound played", event.label()),
                );
            } else if !interacted {
                show_status(
                    status,
                    StatusKind::Warning,
                    "To allow audio playback, interact with the page first.",
                );
                retry_on_next_click(sounds.clone(), event, preview_settings);
            } else {
                show_status(
                    status,
                    StatusKind::Error,
                    "Could not play the sound. Check your browser settings.",
                );
            }
        }
    };

    let on_stop = {
        let sounds = sounds.clone();
        move |_| {
            sounds.0.borrow_mut().stop();
            playing_event.set(None);
            waiting_for_result.set(None);
        }
    };

    let busy = playing_event().is_some();
    let current = snapshot();

    rsx! {
        div { class: "pt-2",
            p { class: "text-sm mb-2 text-zinc-300", "Test sounds:" }
            div { class: "flex flex-wrap gap-2",
                for event in SoundEvent::ALL {
                    button {
                        key: "{event:?}",
                        r#type: "button",
                        class: "relative px-3 py-1.5 rounded-lg border border-zinc-700 text-sm text-zinc-200 hover:bg-zinc-800 disabled:opacity-50",
                        disabled: muted || busy,
                        onclick: {
                            let mut preview = preview.clone();
                            move |_| preview(event)
                        },
                        if playing_event() == Some(event) {
                            "Playing... "
                            span { class: "animate-ping absolute right-2", "🔊" }
                        } else {
                            {format!("{} ▶", event.label())}
                        }
                    }
                }
                if busy {
                    if current.retry_pending {
                        span { class: "self-center text-xs text-amber-300", "Retrying..." }
                    } else if let Some(sound) = current.active_sound.as_deref() {
                        span { class: "self-center text-xs text-zinc-400", "Now playing: {sound}" }
                    }
                    button {
                        r#type: "button",
                        class: "px-3 py-1.5 rounded-lg bg-red-500/80 text-sm text-white hover:bg-red-500",
                        onclick: on_stop,
                        "■ Stop"
                    }
                }
            }
        }
    }
}

fn with_volume(form: &NotificationSettings, volume: f64) -> NotificationSettings {
    NotificationSettings {
        sound_volume: Some(volume),
        ..form.clone()
    }
}

pub(crate) fn show_status(
    mut status: Signal<Option<StatusMessage>>,
    kind: StatusKind,
    text: impl Into<String>,
) {
    let message = StatusMessage {
        kind,
        text: text.into(),
    };
    status.set(Some(message.clone()));
    spawn(async move {
        sleep_ms(5000).await;
        if status.peek().as_ref() == Some(&message) {
            status.set(None);
        }
    });
}

/// One-shot document click handler that unlocks, preloads and replays.
///
/// Registered after the current click finished dispatching, otherwise the
/// click that triggered the preview would fire it immediately.
#[cfg(target_arch = "wasm32")]
fn retry_on_next_click(sounds: SoundHandle, event: SoundEvent, settings: NotificationSettings) {
    wasm_bindgen_futures::spawn_local(async move {
        sleep_ms(0).await;
        let Some(doc) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let callback = wasm_bindgen::closure::Closure::once_into_js(move || {
            let Ok(mut controller) = sounds.0.try_borrow_mut() else {
                return;
            };
            controller.mark_user_interaction();
            controller.unlock();
            controller.preload();
            controller.play_by_event(event, &settings, None, false);
        });
        let options = web_sys::AddEventListenerOptions::new();
        options.set_once(true);
        let _ = doc.add_event_listener_with_callback_and_add_event_listener_options(
            "click",
            callback.unchecked_ref(),
            &options,
        );
    });
}

#[cfg(not(target_arch = "wasm32"))]
fn retry_on_next_click(_sounds: SoundHandle, _event: SoundEvent, _settings: NotificationSettings) {}
