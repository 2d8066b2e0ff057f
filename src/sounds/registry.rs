//! Fixed table of notification sounds and the name → resource lookup.

pub const DEFAULT_SOUND: &str = "notification";
/// Setting value meaning "play nothing for this event".
pub const SILENT_SOUND: &str = "none";
pub const SOUND_DIR: &str = "/sounds";

const BUILTIN_SOUNDS: [(&str, &str); 5] = [
    ("notification", "/sounds/notification.mp3"),
    ("alert", "/sounds/alert.mp3"),
    ("beep", "/sounds/beep.mp3"),
    ("podium", "/sounds/podium.mp3"),
    ("firstPlace", "/sounds/firstPlace.mp3"),
];

// Files shipped in the sound directory that have no symbolic name.
const EXTRA_FILES: [&str; 1] = ["alerta.mp3"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundEntry {
    pub name: &'static str,
    pub url: &'static str,
}

/// Result of looking a sound name up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSound {
    pub url: String,
    /// The name was not recognised and the default sound was substituted.
    pub fallback: bool,
}

#[derive(Debug, Clone)]
pub struct SoundRegistry {
    entries: Vec<SoundEntry>,
}

impl Default for SoundRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundRegistry {
    pub fn new() -> Self {
        Self {
            entries: BUILTIN_SOUNDS
                .iter()
                .map(|(name, url)| SoundEntry { name, url })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[SoundEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&SoundEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Built-in names map to their fixed path, bare `.mp3` file names map into
    /// the sound directory, anything else falls back to the default sound.
    pub fn resolve(&self, name: &str) -> ResolvedSound {
        if let Some(entry) = self.get(name) {
            return ResolvedSound {
                url: entry.url.to_string(),
                fallback: false,
            };
        }

        if is_custom_file(name) {
            return ResolvedSound {
                url: format!("{SOUND_DIR}/{name}"),
                fallback: false,
            };
        }

        ResolvedSound {
            url: self.default_url().to_string(),
            fallback: true,
        }
    }

    pub fn default_url(&self) -> &'static str {
        self.get(DEFAULT_SOUND)
            .map(|entry| entry.url)
            .unwrap_or("/sounds/notification.mp3")
    }

    /// File names known to exist in the sound directory, for the settings selectors.
    pub fn available_files(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|entry| entry.url.rsplit('/').next())
            .chain(EXTRA_FILES.iter().copied())
            .map(str::to_string)
            .collect()
    }
}

fn is_custom_file(name: &str) -> bool {
    name.len() > ".mp3".len()
        && name.ends_with(".mp3")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
}
