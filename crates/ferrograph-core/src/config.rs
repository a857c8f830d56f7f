//! Store configuration
//!
//! Block sizes are fixed for the lifetime of a data directory: changing them
//! after files were written makes every dynamic store unreadable.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Node records
pub const NODE_STORE_FILE: &str = "ferrograph.nodestore.db";
/// Relationship records
pub const RELATIONSHIP_STORE_FILE: &str = "ferrograph.relationshipstore.db";
/// Property records
pub const PROPERTY_STORE_FILE: &str = "ferrograph.propertystore.db";
/// Type records
pub const TYPE_STORE_FILE: &str = "ferrograph.typestore.db";
/// Schema (type-of-type) records
pub const SCHEMA_STORE_FILE: &str = "ferrograph.schemastore.db";
/// Type name blocks
pub const TYPE_NAME_STORE_FILE: &str = "ferrograph.typestore.names.db";
/// Schema and property name blocks
pub const SCHEMA_NAME_STORE_FILE: &str = "ferrograph.schemastore.names.db";
/// String value blocks
pub const STRING_STORE_FILE: &str = "ferrograph.stringstore.db";
/// Array value blocks
pub const ARRAY_STORE_FILE: &str = "ferrograph.arraystore.db";

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding every store file
    pub data_dir: PathBuf,
    /// Payload bytes per string value block
    pub string_block_size: usize,
    /// Payload bytes per name block (type, schema and property names)
    pub name_block_size: usize,
    /// Payload bytes per array block (multiple of 8)
    pub array_block_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            string_block_size: 32,
            name_block_size: 16,
            array_block_size: 40,
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `data_dir`
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Build a configuration from `FERROGRAPH_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("FERROGRAPH_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(size) = env_block_size("FERROGRAPH_STRING_BLOCK_SIZE")? {
            config.string_block_size = size;
        }
        if let Some(size) = env_block_size("FERROGRAPH_NAME_BLOCK_SIZE")? {
            config.name_block_size = size;
        }
        if let Some(size) = env_block_size("FERROGRAPH_ARRAY_BLOCK_SIZE")? {
            config.array_block_size = size;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Write this configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Check block sizes
    pub fn validate(&self) -> Result<()> {
        if self.string_block_size == 0 {
            return Err(Error::config("string_block_size must be non-zero"));
        }
        if self.name_block_size == 0 {
            return Err(Error::config("name_block_size must be non-zero"));
        }
        if self.array_block_size == 0 || self.array_block_size % 8 != 0 {
            return Err(Error::config(format!(
                "array_block_size must be a non-zero multiple of 8, got {}",
                self.array_block_size
            )));
        }
        Ok(())
    }

    /// Full path of a store file inside the data directory
    pub fn store_path(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }
}

fn env_block_size(var: &str) -> Result<Option<usize>> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|e| Error::config(format!("{var}={raw:?}: {e}"))),
        Err(_) => Ok(None),
    }
}
