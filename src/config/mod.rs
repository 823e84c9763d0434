use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::errors::{FormError, Result};
use crate::form::{ExpansionPolicy, DEFAULT_FAILURE_MESSAGE};
use crate::utils::{self, ensure_dir, write_atomic};


/// Engine behaviour knobs shared by every form session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Keep element zero of every collection open on first render and on
    /// error, even after a manual collapse.
    pub pin_first_item: bool,
    /// Re-run the last validation after each edit while errors are shown.
    pub revalidate_on_change: bool,
    /// Banner text when the save call fails without a message of its own.
    pub failure_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pin_first_item: true,
            revalidate_on_change: true,
            failure_message: DEFAULT_FAILURE_MESSAGE.into(),
            data_dir: None,
        }
    }
}

impl EngineConfig {
    pub fn expansion_policy(&self) -> ExpansionPolicy {
        ExpansionPolicy {
            pin_first_item: self.pin_first_item,
        }
    }

    /// Root for stored records: the configured override or the app directory.
    pub fn records_root(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(utils::app_data_dir)
    }

    pub fn validate(&self) -> Result<()> {
        if self.failure_message.trim().is_empty() {
            return Err(FormError::Config("failure_message must not be empty".into()));
        }
        Ok(())
    }
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::from_base(utils::app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        Self::from_base(base)
    }

    fn from_base(base: PathBuf) -> Result<Self> {
        ensure_dir(&base)?;
        Ok(Self {
            path: utils::config_file_in(&base),
        })
    }

    pub fn load(&self) -> Result<EngineConfig> {
        if !self.path.exists() {
            return Ok(EngineConfig::default());
        }
        let data = fs::read_to_string(&self.path)?;
        let config: EngineConfig = serde_json::from_str(&data)
            .map_err(|err| FormError::Config(format!("{}: {}", self.path.display(), err)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &EngineConfig) -> Result<()> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.path, &json)?;
        tracing::debug!(path = %self.path.display(), "configuration saved");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
