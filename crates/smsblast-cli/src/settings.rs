use anyhow::Context;
use smsblast_core::config::{Config, DEFAULT_CONFIG_FILE};
use std::path::{Path, PathBuf};

/// The effective config plus the directory relative paths in it resolve from.
pub struct Settings {
    pub config: Config,
    /// Where the config came from, if a file was found.
    pub source: Option<PathBuf>,
    base_dir: PathBuf,
}

impl Settings {
    /// Priority:
    /// 1. `--config` flag / `SMSBLAST_CONFIG` env var (must exist)
    /// 2. `./smsblast.yaml` if present
    /// 3. Built-in defaults
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => Some(cwd.join(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
        };

        let Some(path) = path else {
            return Ok(Self {
                config: Config::default(),
                source: None,
                base_dir: cwd,
            });
        };

        let config = Config::load(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?;
        let base_dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => cwd,
        };
        Ok(Self {
            config,
            source: Some(path),
            base_dir,
        })
    }

    /// Flag value first, then `state_file` from the config (relative to the
    /// config file's directory).
    pub fn state_path(&self, flag: Option<&Path>) -> anyhow::Result<PathBuf> {
        if let Some(p) = flag {
            return Ok(p.to_path_buf());
        }
        match &self.config.state_file {
            Some(p) if p.is_absolute() => Ok(p.clone()),
            Some(p) => Ok(self.base_dir.join(p)),
            None => anyhow::bail!("no state file: pass --state or set state_file in the config"),
        }
    }
}
