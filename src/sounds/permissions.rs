// Interaction, autoplay-unlock and desktop notification permission handling.
use thiserror::Error;
use tracing::{info, warn};

/// Per-session interaction flags. Set once, never reset by user action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionState {
    user_interacted: bool,
    audio_unlocked: bool,
}

impl InteractionState {
    pub fn mark_user_interaction(&mut self) {
        if !self.user_interacted {
            info!("user interaction detected; audio can be unlocked");
        }
        self.user_interacted = true;
    }

    pub fn has_user_interacted(&self) -> bool {
        self.user_interacted
    }

    pub fn audio_unlocked(&self) -> bool {
        self.audio_unlocked
    }

    pub(crate) fn set_audio_unlocked(&mut self, unlocked: bool) {
        self.audio_unlocked = unlocked;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    /// The user has not decided yet.
    Default,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationOptions {
    pub body: Option<String>,
    pub icon: Option<String>,
    pub tag: Option<String>,
}

impl NotificationOptions {
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("notifications are not supported here")]
    Unsupported,
    #[allow(dead_code)]
    #[error("notification platform error: {0}")]
    Platform(String),
}

/// System notification capability.
#[allow(async_fn_in_trait)]
pub trait NotificationPlatform {
    fn is_supported(&self) -> bool;

    fn permission(&self) -> NotificationPermission;

    /// Prompt the user. Only called while permission is undecided.
    async fn request_permission(&self) -> Result<NotificationPermission, NotificationError>;

    fn show(&self, title: &str, options: &NotificationOptions) -> Result<(), NotificationError>;
}

/// Returns whether notifications may be shown, prompting only if undecided.
pub async fn request_notification_permission<P: NotificationPlatform>(platform: &P) -> bool {
    if !platform.is_supported() {
        info!("this platform does not support desktop notifications");
        return false;
    }

    match platform.permission() {
        NotificationPermission::Granted => true,
        NotificationPermission::Denied => false,
        NotificationPermission::Default => match platform.request_permission().await {
            Ok(permission) => {
                info!(?permission, "notification permission decided");
                permission == NotificationPermission::Granted
            }
            Err(err) => {
                warn!(%err, "notification permission request failed");
                false
            }
        },
    }
}

/// Shows a notification if supported and granted.
pub fn send_notification<P: NotificationPlatform>(
    platform: &P,
    title: &str,
    options: &NotificationOptions,
) -> bool {
    if !platform.is_supported() || platform.permission() != NotificationPermission::Granted {
        return false;
    }

    match platform.show(title, options) {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(%err, title, "error sending notification");
            false
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::WebNotifications as PlatformNotifications;

#[cfg(all(not(target_arch = "wasm32"), feature = "desktop"))]
pub use desktop::DesktopNotifications as PlatformNotifications;

#[cfg(all(not(target_arch = "wasm32"), not(feature = "desktop")))]
pub use headless::NoNotifications as PlatformNotifications;

#[cfg(target_arch = "wasm32")]
mod web {
    use super::*;
    use wasm_bindgen::JsValue;
    use web_sys::{window, Notification};

    #[derive(Debug, Clone, Copy, Default)]
    pub struct WebNotifications;

    impl NotificationPlatform for WebNotifications {
        fn is_supported(&self) -> bool {
            window()
                .map(|win| js_sys::Reflect::has(&win, &JsValue::from_str("Notification")).unwrap_or(false))
                .unwrap_or(false)
        }

        fn permission(&self) -> NotificationPermission {
            match Notification::permission() {
                web_sys::NotificationPermission::Granted => NotificationPermission::Granted,
                web_sys::NotificationPermission::Denied => NotificationPermission::Denied,
                _ => NotificationPermission::Default,
            }
        }

        async fn request_permission(&self) -> Result<NotificationPermission, NotificationError> {
            let promise = Notification::request_permission()
                .map_err(|err| NotificationError::Platform(format!("{err:?}")))?;
            let outcome = wasm_bindgen_futures::JsFuture::from(promise)
                .await
                .map_err(|err| NotificationError::Platform(format!("{err:?}")))?;
            Ok(match outcome.as_string().as_deref() {
                Some("granted") => NotificationPermission::Granted,
                Some("denied") => NotificationPermission::Denied,
                _ => NotificationPermission::Default,
            })
        }

        fn show(&self, title: &str, options: &NotificationOptions) -> Result<(), NotificationError> {
            let web_options = web_sys::NotificationOptions::new();
            if let Some(body) = options.body.as_deref() {
                web_options.set_body(body);
            }
            if let Some(icon) = options.icon.as_deref() {
                web_options.set_icon(icon);
            }
            if let Some(tag) = options.tag.as_deref() {
                web_options.set_tag(tag);
            }
            Notification::new_with_options(title, &web_options)
                .map(|_| ())
                .map_err(|err| NotificationError::Platform(format!("{err:?}")))
        }
    }
}

#[cfg(all(not(target_arch = "wasm32"), feature = "desktop"))]
mod desktop {
    use super::*;

    /// Desktop notification daemons have no permission prompt.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct DesktopNotifications;

    impl NotificationPlatform for DesktopNotifications {
        fn is_supported(&self) -> bool {
            true
        }

        fn permission(&self) -> NotificationPermission {
            NotificationPermission::Granted
        }

        async fn request_permission(&self) -> Result<NotificationPermission, NotificationError> {
            Ok(NotificationPermission::Granted)
        }

        fn show(&self, title: &str, options: &NotificationOptions) -> Result<(), NotificationError> {
            build_notification(title, options)
                .show()
                .map(|_| ())
                .map_err(|err| NotificationError::Platform(err.to_string()))
        }
    }

    /// XDG servers replace a shown notification that carries the same
    /// synchronous hint, which matches the browser `tag` behavior. Other
    /// desktops have no equivalent and ignore the tag.
    pub(super) fn build_notification(
        title: &str,
        options: &NotificationOptions,
    ) -> notify_rust::Notification {
        let mut notification = notify_rust::Notification::new();
        notification.summary(title);
        if let Some(body) = options.body.as_deref() {
            notification.body(body);
        }
        if let Some(icon) = options.icon.as_deref() {
            notification.icon(icon);
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        if let Some(tag) = options.tag.as_deref() {
            notification.hint(notify_rust::Hint::Custom(
                SYNCHRONOUS_HINT.to_string(),
                tag.to_string(),
            ));
        }
        notification
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    pub(super) const SYNCHRONOUS_HINT: &str = "x-canonical-private-synchronous";
}

#[cfg(all(not(target_arch = "wasm32"), not(feature = "desktop")))]
mod headless {
    use super::*;

    #[derive(Debug, Clone, Copy, Default)]
    pub struct NoNotifications;

    impl NotificationPlatform for NoNotifications {
        fn is_supported(&self) -> bool {
            false
        }

        fn permission(&self) -> NotificationPermission {
            NotificationPermission::Denied
        }

        async fn request_permission(&self) -> Result<NotificationPermission, NotificationError> {
            Err(NotificationError::Unsupported)
        }

        fn show(&self, _title: &str, _options: &NotificationOptions) -> Result<(), NotificationError> {
            Err(NotificationError::Unsupported)
        }
    }
}
