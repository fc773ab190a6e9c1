use crate::slots::TimeIncrement;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "settings.yml";

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(
        rename = "timeIncrement",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    time_increment: Option<serde_yaml::Value>,
}

/// User preferences, read once at startup and written back on every change.
#[derive(Debug, Clone)]
pub struct Settings {
    path: PathBuf,
    time_increment: TimeIncrement,
}

impl Settings {
    pub fn load(path: impl Into<PathBuf>) -> Settings {
        let path = path.into();
        let time_increment = read_increment(&path).unwrap_or_else(|reason| {
            log::warn!(
                "using default {} minute increment: {}",
                TimeIncrement::default(),
                reason
            );
            TimeIncrement::default()
        });
        Settings {
            path,
            time_increment,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn time_increment(&self) -> TimeIncrement {
        self.time_increment
    }

    pub fn set_time_increment(&mut self, increment: TimeIncrement) -> Result<()> {
        if increment == self.time_increment {
            return Ok(());
        }
        self.time_increment = increment;
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
        }
        let file = SettingsFile {
            time_increment: Some(serde_yaml::Value::String(self.time_increment.to_string())),
        };
        let serialized = serde_yaml::to_string(&file).context("serializing settings")?;
        fs::write(&self.path, serialized).with_context(|| format!("writing {:?}", self.path))?;
        log::info!("saved time increment {} to {:?}", self.time_increment, self.path);
        Ok(())
    }
}

fn read_increment(path: &Path) -> Result<TimeIncrement> {
    let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let file: SettingsFile = serde_yaml::from_str(&data).context("parsing settings file")?;
    let raw = match file.time_increment.context("timeIncrement is not set")? {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        other => anyhow::bail!("timeIncrement has unexpected value {:?}", other),
    };
    Ok(raw.parse::<TimeIncrement>()?)
}
