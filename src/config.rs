//! # Driver Configuration
//!
//! This module centralizes the flags that govern how table and index handles
//! behave. A [`Config`] is threaded through every open and create call and is
//! captured immutably by the resulting handle; there is no process-global
//! state. Two handles opened with different configurations coexist without
//! interfering.
//!
//! ## Flags
//!
//! | Flag | Default | Effect |
//! |------|---------|--------|
//! | `current_directory` | `"."` | Base directory for relative-path opens |
//! | `auto_trim` | `true` | Strip trailing spaces when decoding `C` fields |
//! | `dbt_block_size` | `8` | Block size (×64 bytes) for newly created DBTs |
//! | `file_locking` | `false` | Arm advisory byte-range locks on disk |
//! | `synchronous_writes` | `false` | Open files with `O_SYNC` |
//! | `thread_safety` | `false` | Acquire the handle lock in public methods |
//!
//! `dbt_block_size` only affects DBT files created through this
//! configuration; existing DBTs carry their block size in their header.

use std::path::{Path, PathBuf};

/// Per-open driver configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory for relative-path table opens.
    pub current_directory: PathBuf,
    /// Whether to strip trailing spaces when decoding character fields.
    pub auto_trim: bool,
    /// Block size for newly created DBT files, in units of 64 bytes.
    pub dbt_block_size: u16,
    /// Whether advisory file-region locks are taken around reads and writes.
    pub file_locking: bool,
    /// Whether files are opened so each write reaches durable storage.
    pub synchronous_writes: bool,
    /// Whether public methods acquire the per-handle intrinsic lock.
    pub thread_safety: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            current_directory: PathBuf::from("."),
            auto_trim: true,
            dbt_block_size: 8,
            file_locking: false,
            synchronous_writes: false,
            thread_safety: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block size of newly created DBT files in bytes.
    pub fn dbt_block_bytes(&self) -> u32 {
        u32::from(self.dbt_block_size) * 64
    }

    pub fn with_current_directory(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_directory = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_auto_trim(mut self, enabled: bool) -> Self {
        self.auto_trim = enabled;
        self
    }

    pub fn with_dbt_block_size(mut self, size: u16) -> Self {
        self.dbt_block_size = size;
        self
    }

    pub fn with_file_locking(mut self, enabled: bool) -> Self {
        self.file_locking = enabled;
        self
    }

    pub fn with_synchronous_writes(mut self, enabled: bool) -> Self {
        self.synchronous_writes = enabled;
        self
    }

    pub fn with_thread_safety(mut self, enabled: bool) -> Self {
        self.thread_safety = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert!(config.auto_trim);
        assert_eq!(config.dbt_block_size, 8);
        assert_eq!(config.dbt_block_bytes(), 512);
        assert!(!config.file_locking);
        assert!(!config.synchronous_writes);
        assert!(!config.thread_safety);
    }

    #[test]
    fn builder_overrides_stick() {
        let config = Config::new()
            .with_dbt_block_size(16)
            .with_file_locking(true)
            .with_auto_trim(false);
        assert_eq!(config.dbt_block_bytes(), 1024);
        assert!(config.file_locking);
        assert!(!config.auto_trim);
    }
}
