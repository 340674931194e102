use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::utils::get_data_dir;

const SETTINGS_FILE_NAME: &str = "settings.json";

pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Persisted tool settings. Read at the moment a request is built, rewritten
/// immediately on every edit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Settings {
    pub temperature: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl Settings {
    /// Temperature as handed to the model, pinned to the valid sampling range.
    pub fn effective_temperature(&self) -> f32 {
        self.temperature.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
const TEST_SETTINGS_PATH_ENV: &str = "CARDFORGE_TEST_SETTINGS_PATH";

pub fn load_settings() -> Result<Settings> {
    let path = settings_file_path()?;
    Ok(read_settings_file(&path)?.unwrap_or_default())
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let path = settings_file_path()?;
    write_settings_file(&path, settings)
}

fn settings_file_path() -> Result<PathBuf> {
    #[cfg(test)]
    {
        if let Ok(path) = env::var(TEST_SETTINGS_PATH_ENV)
            && !path.trim().is_empty()
        {
            return Ok(PathBuf::from(path));
        }
    }

    let data_dir = get_data_dir()?;
    Ok(data_dir.join(SETTINGS_FILE_NAME))
}

fn read_settings_file(path: &Path) -> Result<Option<Settings>> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            if contents.trim().is_empty() {
                return Ok(Some(Settings::default()));
            }
            let parsed: Settings = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings file at {}", path.display()))?;
            Ok(Some(parsed))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => {
            Err(err).with_context(|| format!("Failed to read settings file at {}", path.display()))
        }
    }
}

fn write_settings_file(path: &Path, settings: &Settings) -> Result<()> {
    let contents = format!("{}\n", serde_json::to_string_pretty(settings)?);
    fs::write(path, contents)
        .with_context(|| format!("Failed to write settings file at {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        assert!(read_settings_file(&path).unwrap().is_none());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        unsafe {
            env::set_var(TEST_SETTINGS_PATH_ENV, &path);
        }

        let initial = load_settings().unwrap();
        assert_eq!(initial.temperature, DEFAULT_TEMPERATURE);

        save_settings(&Settings { temperature: 0.8 }).unwrap();
        let reloaded = load_settings().unwrap();
        assert_eq!(reloaded.temperature, 0.8);
    }

    #[test]
    fn out_of_range_temperature_is_clamped_when_used() {
        let settings = Settings { temperature: 3.5 };
        assert_eq!(settings.effective_temperature(), 1.0);

        let settings = Settings { temperature: -0.2 };
        assert_eq!(settings.effective_temperature(), 0.0);
    }
}
