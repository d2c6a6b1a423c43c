//! Persistent batch configuration.
//!
//! Stored as JSON in a platform-appropriate config directory, or at an explicit
//! path given on the command line.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// On-disk configuration for the batch driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Template corpus: `<template_dir>/<set id>/<card code>.<ext>`.
    pub template_dir: PathBuf,

    /// Local copy of the card database used for display names.
    pub names_file: Option<PathBuf>,

    /// Card database URL, used when no `names_file` is set.
    ///
    /// Fetched results are cached; without either source raw card codes are
    /// reported.
    pub names_url: Option<String>,

    /// Worker threads for screenshot processing. 0 picks a count from the CPU.
    pub max_workers: usize,

    #[serde(rename = "match")]
    pub matching: recog::MatchConfig,

    pub layout: recog::LayoutConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("resources").join("card_imgs"),
            names_file: None,
            names_url: None,
            max_workers: 0,
            matching: recog::MatchConfig::default(),
            layout: recog::LayoutConfig::default(),
        }
    }
}

impl Config {
    /// Path to the default config file.
    pub fn path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("config_dir() unavailable")?;
        Ok(base.join("cardcounter.json"))
    }

    /// Load configuration, falling back to defaults on any failure.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let loaded = match path {
            Some(path) => Self::try_load_from(path),
            None => Self::path().and_then(|path| Self::try_load_from(&path)),
        };
        match loaded {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "failed to load config; using defaults");
                Self::default()
            }
        }
    }

    /// Try to load configuration from `path`. A missing file yields defaults.
    pub fn try_load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "config file not found; using defaults");
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
        let cfg = serde_json::from_str(&json).with_context(|| format!("parse {:?}", path))?;
        Ok(cfg)
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(path, json).with_context(|| format!("write {:?}", path))?;
        Ok(())
    }

    /// Worker count for the screenshot pool.
    pub fn worker_count(&self) -> usize {
        worker_count(self.max_workers, std::thread::available_parallelism().map_or(2, |n| n.get()))
    }
}

/// Leave one core free, but never use more than 8 threads.
fn worker_count(configured: usize, cpus: usize) -> usize {
    if configured > 0 {
        return configured;
    }
    cpus.saturating_sub(1).clamp(1, 8)
}
