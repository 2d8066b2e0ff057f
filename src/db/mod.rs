use serde::{Deserialize, Serialize};

use crate::sounds::{SoundEvent, DEFAULT_REPEAT_INTERVAL_SECS};

#[cfg(target_arch = "wasm32")]
use gloo_storage::{errors::StorageError, LocalStorage, Storage};

/// Error type for settings storage on native platforms
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("failed to open settings database: {0}")]
    Open(#[source] rusqlite::Error),
    #[error("settings query failed: {0}")]
    Query(#[from] rusqlite::Error),
    #[error("stored settings are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(target_arch = "wasm32")]
const SETTINGS_KEY: &str = "soundcue.notification_settings";

/// Sound settings snapshot, in the camelCase shape the settings form uses.
///
/// Each sound field holds a registry name, a custom `.mp3` file name, or
/// `"none"`. Missing fields are filled in by the playback policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    #[serde(default)]
    pub notification_sound: Option<String>,
    #[serde(default)]
    pub alert_sound: Option<String>,
    #[serde(default)]
    pub podium_sound: Option<String>,
    #[serde(default)]
    pub first_place_sound: Option<String>,
    #[serde(default)]
    pub sound_volume: Option<f64>,
    #[serde(default)]
    pub muted: bool,
    #[serde(default = "default_alert_interval_secs")]
    pub alert_interval_secs: u32,
}

fn default_alert_interval_secs() -> u32 {
    DEFAULT_REPEAT_INTERVAL_SECS
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            notification_sound: None,
            alert_sound: None,
            podium_sound: None,
            first_place_sound: None,
            sound_volume: None,
            muted: false,
            alert_interval_secs: default_alert_interval_secs(),
        }
    }
}

impl NotificationSettings {
    /// Defaults the settings screen starts from on first launch.
    pub fn initial() -> Self {
        Self {
            notification_sound: Some("notification".to_string()),
            alert_sound: Some("alert".to_string()),
            podium_sound: Some("podium".to_string()),
            first_place_sound: Some("firstPlace".to_string()),
            sound_volume: Some(0.5),
            ..Self::default()
        }
    }

    pub fn sound_for(&self, event: SoundEvent) -> Option<&str> {
        match event {
            SoundEvent::Notification => self.notification_sound.as_deref(),
            SoundEvent::Alert => self.alert_sound.as_deref(),
            SoundEvent::Podium => self.podium_sound.as_deref(),
            SoundEvent::FirstPlace => self.first_place_sound.as_deref(),
        }
    }

    pub fn set_sound_for(&mut self, event: SoundEvent, sound: Option<String>) {
        let slot = match event {
            SoundEvent::Notification => &mut self.notification_sound,
            SoundEvent::Alert => &mut self.alert_sound,
            SoundEvent::Podium => &mut self.podium_sound,
            SoundEvent::FirstPlace => &mut self.first_place_sound,
        };
        *slot = sound;
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub async fn save_settings(settings: NotificationSettings) -> Result<(), DbError> {
    let conn = get_db_connection()?;
    write_settings(&conn, &settings)
}

#[cfg(target_arch = "wasm32")]
pub async fn save_settings(settings: NotificationSettings) -> Result<(), StorageError> {
    LocalStorage::set(SETTINGS_KEY, settings)
}

#[cfg(not(target_arch = "wasm32"))]
pub async fn load_settings() -> Result<NotificationSettings, DbError> {
    let conn = get_db_connection()?;
    read_settings(&conn)
}

#[cfg(target_arch = "wasm32")]
pub async fn load_settings() -> Result<NotificationSettings, StorageError> {
    match LocalStorage::get(SETTINGS_KEY) {
        Ok(settings) => Ok(settings),
        Err(_) => Ok(NotificationSettings::initial()),
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub async fn initialize_database() -> Result<(), DbError> {
    let conn = get_db_connection()?;
    create_tables(&conn)
}

#[cfg(target_arch = "wasm32")]
pub async fn initialize_database() -> Result<(), StorageError> {
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn create_tables(conn: &rusqlite::Connection) -> Result<(), DbError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn write_settings(
    conn: &rusqlite::Connection,
    settings: &NotificationSettings,
) -> Result<(), DbError> {
    let settings_json = serde_json::to_string(settings)?;
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES ('notification_settings', ?1)",
        [&settings_json],
    )?;
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn read_settings(conn: &rusqlite::Connection) -> Result<NotificationSettings, DbError> {
    use rusqlite::OptionalExtension;

    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key = 'notification_settings'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    match stored {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(NotificationSettings::initial()),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn get_db_connection() -> Result<rusqlite::Connection, DbError> {
    let data_dir = dirs::data_dir()
        .map(|dir| dir.join("soundcue"))
        .unwrap_or_else(|| std::path::PathBuf::from(".soundcue"));
    // A missing directory surfaces as an open error below.
    let _ = std::fs::create_dir_all(&data_dir);

    rusqlite::Connection::open(data_dir.join("soundcue.db")).map_err(DbError::Open)
}
