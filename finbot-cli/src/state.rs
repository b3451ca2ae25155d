use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$FINBOT_HOME`, else `~/.finbot`
pub fn finbot_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("FINBOT_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".finbot"))
}

pub fn ensure_finbot_home() -> Result<PathBuf> {
    let dir = finbot_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// Resolve a configured path: absolute as given, relative to the home dir otherwise.
pub fn resolve_path(configured: &str) -> Result<PathBuf> {
    let p = PathBuf::from(configured);
    if p.is_absolute() {
        return Ok(p);
    }
    if let Some(rest) = configured.strip_prefix("~/") {
        let home = std::env::var("HOME").context("HOME is not set")?;
        return Ok(PathBuf::from(home).join(rest));
    }
    Ok(finbot_home()?.join(p))
}
