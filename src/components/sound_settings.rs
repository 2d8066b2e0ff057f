use crate::components::{SettingsSignal, SnapshotSignal, SoundTester};
use crate::components::sound_tester::show_status;
use crate::db::{save_settings, NotificationSettings};
use crate::sounds::{
    request_notification_permission, resolve_event_sound, send_notification, EventSound,
    NotificationOptions, PlatformNotifications, SoundEvent, SoundHandle, DEFAULT_VOLUME,
    SILENT_SOUND,
};
use dioxus::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

fn persist(settings: NotificationSettings) {
    spawn(async move {
        if let Err(err) = save_settings(settings).await {
            tracing::error!(?err, "failed to save notification settings");
        }
    });
}

#[component]
pub fn SoundSettingsView() -> Element {
    let sounds = use_context::<SoundHandle>();
    let mut settings = use_context::<SettingsSignal>().0;
    let snapshot = use_context::<SnapshotSignal>().0;
    let status = use_signal(|| None::<StatusMessage>);

    let sound_options = use_hook(|| {
        let controller = sounds.0.borrow();
        let registry = controller.registry();
        let mut options: Vec<String> = registry
            .entries()
            .iter()
            .map(|entry| entry.name.to_string())
            .collect();
        options.extend(
            registry
                .available_files()
                .into_iter()
                .filter(|file| {
                    !registry
                        .entries()
                        .iter()
                        .any(|entry| entry.url.ends_with(file.as_str()))
                }),
        );
        options
    });

    let on_volume_change = move |evt: FormEvent| {
        if let Ok(percent) = evt.value().parse::<f64>() {
            let mut updated = settings();
            updated.sound_volume = Some((percent / 100.0).clamp(0.0, 1.0));
            settings.set(updated.clone());
            persist(updated);
        }
    };

    let on_mute_toggle = move |_| {
        let mut updated = settings();
        updated.muted = !updated.muted;
        settings.set(updated.clone());
        persist(updated);
    };

    let on_interval_change = move |evt: FormEvent| {
        if let Ok(secs) = evt.value().parse::<u32>() {
            let mut updated = settings();
            updated.alert_interval_secs = secs.clamp(1, 600);
            settings.set(updated.clone());
            persist(updated);
        }
    };

    let on_repeat_toggle = {
        let sounds = sounds.clone();
        move |_| {
            let mut controller = sounds.0.borrow_mut();
            if controller.is_repeating() {
                controller.stop_repeating();
                return;
            }
            let current = settings();
            if current.muted {
                show_status(status, StatusKind::Warning, "Sound is muted.");
                return;
            }
            match resolve_event_sound(SoundEvent::Alert, &current, None) {
                EventSound::Silent => {
                    show_status(status, StatusKind::Warning, "The delay alert sound is set to none.");
                }
                EventSound::Play { sound, volume, .. } => {
                    controller.unlock();
                    controller.start_repeating(&sound, volume, current.alert_interval_secs);
                }
            }
        }
    };

    let on_request_permission = move |_| {
        spawn(async move {
            if request_notification_permission(&PlatformNotifications::default()).await {
                show_status(status, StatusKind::Success, "Desktop notifications enabled");
            } else {
                show_status(
                    status,
                    StatusKind::Warning,
                    "Desktop notifications are blocked or unsupported.",
                );
            }
        });
    };

    let on_test_notification = move |_| {
        let sent = send_notification(
            &PlatformNotifications::default(),
            "New ticket",
            &NotificationOptions::with_body("This is how new tickets will be announced."),
        );
        if !sent {
            show_status(
                status,
                StatusKind::Warning,
                "Enable desktop notifications first.",
            );
        }
    };

    let current = settings();
    let volume = current.sound_volume.unwrap_or(DEFAULT_VOLUME);
    let volume_percent = (volume * 100.0).round() as i32;
    let repeating = snapshot().repeating;

    rsx! {
        div { class: "space-y-8 max-w-2xl",
            header { class: "page-header",
                h1 { class: "page-title", "Notification Sounds" }
                p { class: "page-subtitle", "Choose the sound for each event and test it" }
            }

            if let Some(message) = status() {
                div {
                    class: match message.kind {
                        StatusKind::Success => "fixed top-4 right-4 px-4 py-2 bg-emerald-500/20 border border-emerald-500/50 rounded-lg text-emerald-400 text-sm",
                        StatusKind::Warning => "fixed top-4 right-4 px-4 py-2 bg-amber-500/20 border border-amber-500/50 rounded-lg text-amber-300 text-sm",
                        StatusKind::Error => "fixed top-4 right-4 px-4 py-2 bg-red-500/20 border border-red-500/50 rounded-lg text-red-400 text-sm",
                    },
                    "{message.text}"
                }
            }

            section { class: "bg-zinc-800/30 rounded-2xl border border-zinc-700/30 p-6 space-y-6",
                h2 { class: "text-lg font-semibold text-white", "Sounds" }

                for event in SoundEvent::ALL {
                    div { key: "{event:?}", class: "flex items-center justify-between gap-4",
                        label { class: "text-sm font-medium text-zinc-400", {event.label()} }
                        select {
                            class: "bg-zinc-900 border border-zinc-700 rounded-lg px-3 py-1.5 text-sm",
                            onchange: move |evt: FormEvent| {
                                let mut updated = settings();
                                updated.set_sound_for(event, Some(evt.value()));
                                settings.set(updated.clone());
                                persist(updated);
                            },
                            option {
                                value: SILENT_SOUND,
                                selected: current.sound_for(event) == Some(SILENT_SOUND),
                                "No sound"
                            }
                            for name in sound_options.iter() {
                                option {
                                    key: "{name}",
                                    value: "{name}",
                                    selected: current.sound_for(event) == Some(name.as_str()),
                                    "{name}"
                                }
                            }
                        }
                    }
                }

                div {
                    label { class: "block text-sm font-medium text-zinc-400 mb-3", "Volume" }
                    div { class: "flex items-center gap-4",
                        button {
                            r#type: "button",
                            class: "text-sm text-zinc-300 w-16",
                            onclick: on_mute_toggle,
                            if current.muted { "Unmute" } else { "Mute" }
                        }
                        input {
                            r#type: "range",
                            min: "0",
                            max: "100",
                            value: "{volume_percent}",
                            disabled: current.muted,
                            class: "flex-1 h-2 bg-zinc-700 rounded-lg appearance-none cursor-pointer accent-emerald-500",
                            oninput: on_volume_change,
                            onchange: on_volume_change,
                        }
                        span { class: "text-sm text-zinc-400 w-12 text-right", "{volume_percent}%" }
                    }
                    p { class: "text-xs text-zinc-500 mt-2",
                        "New ticket notifications always play at full volume."
                    }
                }

                SoundTester {
                    form: current.clone(),
                    volume,
                    muted: current.muted,
                    status,
                }
            }

            section { class: "bg-zinc-800/30 rounded-2xl border border-zinc-700/30 p-6 space-y-4",
                h2 { class: "text-lg font-semibold text-white", "Delay Alert" }
                div { class: "flex items-center gap-4",
                    label { class: "text-sm text-zinc-400", "Repeat every" }
                    input {
                        r#type: "number",
                        min: "1",
                        max: "600",
                        value: "{current.alert_interval_secs}",
                        class: "w-20 bg-zinc-900 border border-zinc-700 rounded-lg px-2 py-1 text-sm",
                        onchange: on_interval_change,
                    }
                    span { class: "text-sm text-zinc-400", "seconds" }
                    button {
                        r#type: "button",
                        class: "ml-auto px-3 py-1.5 rounded-lg border border-zinc-700 text-sm",
                        onclick: on_repeat_toggle,
                        if repeating { "Stop alert" } else { "Start alert" }
                    }
                }
            }

            section { class: "bg-zinc-800/30 rounded-2xl border border-zinc-700/30 p-6 space-y-4",
                h2 { class: "text-lg font-semibold text-white", "Desktop Notifications" }
                div { class: "flex gap-2",
                    button {
                        r#type: "button",
                        class: "px-3 py-1.5 rounded-lg border border-zinc-700 text-sm",
                        onclick: on_request_permission,
                        "Enable notifications"
                    }
                    button {
                        r#type: "button",
                        class: "px-3 py-1.5 rounded-lg border border-zinc-700 text-sm",
                        onclick: on_test_notification,
                        "Send test notification"
                    }
                }
            }
        }
    }
}
