//! Persisted user preferences.
//!
//! The only state that survives a session: playback volume and the
//! preferred recognition/synthesis language.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::VoiceError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserPrefs {
    /// Playback volume, 0.0 to 1.0.
    pub volume: f32,
    /// Preferred language code (e.g. "de-DE"). None means the page config
    /// decides.
    pub language: Option<String>,
}

impl Default for UserPrefs {
    fn default() -> Self {
        Self {
            volume: 0.7,
            language: None,
        }
    }
}

impl UserPrefs {
    /// Load preferences, falling back to defaults when the file is missing.
    /// A corrupt file is an error; silently resetting preferences would hide
    /// real bugs.
    pub fn load(path: &Path) -> Result<Self, VoiceError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                let mut prefs: UserPrefs = toml::from_str(&raw)
                    .map_err(|e| VoiceError::Config(format!("invalid prefs file: {}", e)))?;
                prefs.volume = prefs.volume.clamp(0.0, 1.0);
                Ok(prefs)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(VoiceError::Config(format!("failed to read prefs: {}", e))),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), VoiceError> {
        let raw = toml::to_string_pretty(self)
            .map_err(|e| VoiceError::Config(format!("failed to encode prefs: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| VoiceError::Config(format!("failed to create prefs dir: {}", e)))?;
        }
        std::fs::write(path, raw)
            .map_err(|e| VoiceError::Config(format!("failed to write prefs: {}", e)))
    }
}
