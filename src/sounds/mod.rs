//! Notification sounds: registry, event → sound policy, the single-sound
//! playback controller, and the platform audio/notification backends.

mod backend;
mod controller;
mod driver;
mod permissions;
mod policy;
mod registry;

#[cfg(all(not(target_arch = "wasm32"), feature = "desktop"))]
mod audio_native;
#[cfg(target_arch = "wasm32")]
mod audio_web;

pub use backend::*;
pub use controller::*;
pub use driver::*;
pub use permissions::*;
pub use policy::*;
pub use registry::*;

#[cfg(all(not(target_arch = "wasm32"), feature = "desktop"))]
pub use audio_native::RodioBackend as PlatformAudio;
#[cfg(all(not(target_arch = "wasm32"), not(feature = "desktop")))]
pub use backend::UnavailableAudio as PlatformAudio;
#[cfg(target_arch = "wasm32")]
pub use audio_web::WebAudioBackend as PlatformAudio;

pub type PlatformController = PlaybackController<PlatformAudio, SystemClock>;
