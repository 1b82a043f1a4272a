use std::fs;
use std::io;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::config::get_config_dir;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Writes the selected model back to the config file without clobbering
/// hand-edited keys. The file is edited as a raw TOML table, so keys the
/// client does not know about survive the rewrite.
pub struct ConfigPersister {
    config_path: PathBuf,
    write_lock: Mutex<()>,
}

impl ConfigPersister {
    #[must_use]
    pub const fn new(config_path: PathBuf) -> Self {
        Self {
            config_path,
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_default_path() -> Option<Self> {
        get_config_dir().map(|dir| Self::new(dir.join("config.toml")))
    }

    pub fn persist_model(&self, model: &str) -> ConfigResult<()> {
        let _lock = self.write_lock.lock();

        let mut table = self.read_table()?;
        table.insert("model".to_string(), toml::Value::String(model.to_string()));
        self.write_table(&table)
    }

    fn read_table(&self) -> ConfigResult<toml::Table> {
        match fs::read_to_string(&self.config_path) {
            Ok(content) => Ok(content.parse::<toml::Table>()?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(toml::Table::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_table(&self, table: &toml::Table) -> ConfigResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let body = toml::to_string_pretty(table)?;
        let content = format!("# mallama configuration\n\n{body}");

        // Write-then-rename so a crash never leaves a truncated file behind.
        let temp_path = self.config_path.with_extension("toml.tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.config_path)?;
        Ok(())
    }
}
