//! Settings screen for notification sounds.

mod app;
mod sound_settings;
mod sound_tester;

pub use app::*;
pub use sound_settings::*;
pub use sound_tester::*;
