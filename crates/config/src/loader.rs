use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::WaypostConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["waypost.toml", "waypost.yaml", "waypost.yml", "waypost.json"];

/// Override for the config directory, set via `set_config_dir()`.
static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Set a custom config directory. When set, discovery only looks there;
/// project-local and user-global paths are skipped. Tests use this for
/// isolation. Each call replaces the previous override.
pub fn set_config_dir(path: PathBuf) {
    *CONFIG_DIR_OVERRIDE.lock().unwrap() = Some(path);
}

fn config_dir_override() -> Option<PathBuf> {
    CONFIG_DIR_OVERRIDE.lock().unwrap().clone()
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<WaypostConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./waypost.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/waypost/waypost.{toml,yaml,yml,json}` (user-global)
///
/// When no file exists, a default config is written to the user-global path
/// and returned.
pub fn discover_and_load() -> WaypostConfig {
    match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            match load_config(&path) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                    WaypostConfig::default()
                },
            }
        },
        None => {
            let config = WaypostConfig::default();
            if let Err(e) = write_default_config(&config) {
                warn!(error = %e, "failed to write default config file");
            }
            config
        },
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
        // Override is set: don't fall through to other locations.
        return None;
    }

    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(dir) = home_dir().map(|h| h.join(".config").join("waypost")) {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the config directory: override, or `~/.config/waypost/`.
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        return Some(dir);
    }
    home_dir().map(|h| h.join(".config").join("waypost"))
}

/// Returns the data directory (roster file home): `~/.waypost/`.
pub fn data_dir() -> PathBuf {
    home_dir()
        .map(|h| h.join(".waypost"))
        .unwrap_or_else(|| PathBuf::from(".waypost"))
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

/// Write the default config to the standard path. Only called when no config
/// file exists yet.
fn write_default_config(config: &WaypostConfig) -> anyhow::Result<()> {
    let dir = config_dir().unwrap_or_else(|| PathBuf::from("."));
    let path = dir.join(CONFIG_FILENAMES[0]);
    if path.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(&dir)?;
    let toml_str =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("serialize config: {e}"))?;
    std::fs::write(&path, toml_str)?;
    debug!(path = %path.display(), "wrote default config file");
    Ok(())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<WaypostConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waypost.toml");
        std::fs::write(&path, "[gateway]\nport = 9000\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.gateway.bind, "0.0.0.0");
    }

    #[test]
    fn loads_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waypost.yaml");
        std::fs::write(&path, "channel:\n  owner_id: 7\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.channel.owner_id, Some(7));
    }

    #[test]
    fn discovery_honors_override_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("waypost.toml"), "[gateway]\nport = 9100\n").unwrap();
        set_config_dir(dir.path().to_path_buf());
        let config = discover_and_load();
        assert_eq!(config.gateway.port, 9100);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waypost.ini");
        std::fs::write(&path, "whatever").unwrap();
        assert!(load_config(&path).is_err());
    }
}
