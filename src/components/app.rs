use crate::components::SoundSettingsView;
use crate::db::{initialize_database, load_settings, NotificationSettings};
use crate::sounds::{spawn_sound_driver, PlaybackSnapshot, SoundHandle};
use dioxus::prelude::*;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::closure::Closure;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsCast;
#[cfg(target_arch = "wasm32")]
use web_sys::window;

/// Settings currently shown in the form (saved or not).
#[derive(Clone, Copy)]
pub struct SettingsSignal(pub Signal<NotificationSettings>);

#[derive(Clone, Copy)]
pub struct SnapshotSignal(pub Signal<PlaybackSnapshot>);

#[component]
pub fn AppShell() -> Element {
    let sounds = use_hook(SoundHandle::new);
    let mut settings = use_signal(NotificationSettings::initial);
    let snapshot = use_signal(PlaybackSnapshot::default);
    let mut settings_loaded = use_signal(|| false);

    use_context_provider(|| sounds.clone());
    use_context_provider(|| SettingsSignal(settings));
    use_context_provider(|| SnapshotSignal(snapshot));

    // Load saved settings and start ticking the controller on mount
    {
        let sounds = sounds.clone();
        use_effect(move || {
            spawn(async move {
                if let Err(err) = initialize_database().await {
                    tracing::error!(?err, "failed to initialize settings storage");
                } else {
                    match load_settings().await {
                        Ok(saved) => settings.set(saved),
                        Err(err) => tracing::warn!(?err, "could not load settings; using defaults"),
                    }
                }
                settings_loaded.set(true);
            });
            spawn_sound_driver(sounds.clone(), snapshot);
        });
    }

    // Browsers gate audio until the first gesture: unlock and warm the cache then.
    #[cfg(target_arch = "wasm32")]
    {
        let sounds = sounds.clone();
        use_effect(move || {
            let Some(doc) = window().and_then(|w| w.document()) else {
                return;
            };
            for event in ["click", "keydown", "touchstart"] {
                let sounds = sounds.clone();
                let cb = Closure::wrap(Box::new(move || {
                    let Ok(mut controller) = sounds.0.try_borrow_mut() else {
                        return;
                    };
                    if controller.has_user_interacted() {
                        return;
                    }
                    controller.mark_user_interaction();
                    controller.unlock();
                    controller.preload();
                }) as Box<dyn FnMut()>);
                let _ = doc.add_event_listener_with_callback(event, cb.as_ref().unchecked_ref());
                cb.forget();
            }
        });
    }

    // Desktop output has no autoplay gate.
    #[cfg(not(target_arch = "wasm32"))]
    {
        let sounds = sounds.clone();
        use_effect(move || {
            let mut controller = sounds.0.borrow_mut();
            controller.mark_user_interaction();
            controller.preload();
        });
    }

    rsx! {
        main { class: "min-h-screen bg-zinc-950 text-zinc-100 p-6",
            if settings_loaded() {
                SoundSettingsView {}
            } else {
                p { class: "text-sm text-zinc-400", "Loading settings..." }
            }
        }
    }
}
