//! Loads [`SchedulerConfig`] from an `XDG_CONFIG_HOME`-relative JSON file,
//! the same convention the teacher uses for its submitter config.

use std::path::PathBuf;

use batchctl_scheduler::SchedulerConfig;

fn xdg_config_home() -> anyhow::Result<PathBuf> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME") {
        let dir = PathBuf::from(dir);
        if dir.as_os_str().is_empty() {
            anyhow::bail!("XDG_CONFIG_HOME is set but empty");
        }
        return Ok(dir);
    }

    let home = std::env::var_os("HOME").ok_or_else(|| anyhow::anyhow!("HOME is not set"))?;
    let home = PathBuf::from(home);
    if home.as_os_str().is_empty() {
        anyhow::bail!("HOME is set but empty");
    }
    Ok(home.join(".config"))
}

/// Path to the config file: `$XDG_CONFIG_HOME/batchctl/config.json`.
pub fn config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_home()?.join("batchctl").join("config.json"))
}

/// Load the config file if present, falling back to [`SchedulerConfig::default`]
/// when it's missing. A malformed file is an error, not a silent fallback.
pub fn load_config() -> anyhow::Result<SchedulerConfig> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(SchedulerConfig::default());
    }
    let raw = std::fs::read_to_string(&path)?;
    let cfg: SchedulerConfig = serde_json::from_str(&raw)?;
    Ok(cfg)
}
