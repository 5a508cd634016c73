mod session;
mod settings;

pub use session::Session;
pub use settings::{ApiSettings, Config, ReportSettings};

use crate::error::{PayoutError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (XDG config dir, or ~/.payouts/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "payouts") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    let home = dirs_home().ok_or_else(|| {
        PayoutError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".payouts"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(PayoutError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| PayoutError::ConfigParse { path, source: e })
}

/// Load session.toml (empty session if missing)
pub fn load_session(config_dir: &Path) -> Result<Session> {
    let path = config_dir.join("session.toml");
    if !path.exists() {
        return Ok(Session::default());
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| PayoutError::ConfigParse { path, source: e })
}

/// Save session.toml
pub fn save_session(config_dir: &Path, session: &Session) -> Result<()> {
    let path = config_dir.join("session.toml");
    let content = toml::to_string_pretty(session).map_err(|e| PayoutError::ConfigWrite {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    fs::write(path, content)?;
    Ok(())
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[api]
base_url = "http://localhost:5000"
payments_path = "/api/admin/payments"
timeout_secs = 15

[report]
currency_symbol = "$"
# What to do when --from/--to cannot be parsed:
#   "accept-all"  keep every record that has a timestamp
#   "reject-all"  report nothing
on_invalid_range = "accept-all"
"#;
