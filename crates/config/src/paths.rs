//! Config directory resolution: `$XDG_CONFIG_HOME/whai` on Unix,
//! `%APPDATA%\whai` on Windows.

use std::env;
use std::path::PathBuf;

pub fn config_dir() -> PathBuf {
    let base = if cfg!(windows) {
        env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| home_dir().join("AppData").join("Roaming"))
    } else {
        env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| home_dir().join(".config"))
    };
    base.join("whai")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn roles_dir() -> PathBuf {
    config_dir().join("roles")
}

pub fn role_path(name: &str) -> PathBuf {
    roles_dir().join(format!("{name}.md"))
}

pub fn mcp_config_path() -> PathBuf {
    config_dir().join("mcp.json")
}

pub fn sessions_dir() -> PathBuf {
    config_dir().join("sessions")
}

fn home_dir() -> PathBuf {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}
