//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::ConfigError;

use super::types::Config;

/// File names probed when discovering configuration
const CONFIG_FILE_NAMES: &[&str] = &["gantry.toml", ".gantry.toml"];

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    info!(path = %path.display(), "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: Config = toml::from_str(&content).map_err(ConfigError::TomlError)?;

    validate_config(&config)?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Find a configuration file in the directory or its parents.
///
/// At each level `gantry.toml` is preferred over `.gantry.toml`; parents are
/// walked until the filesystem root.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in CONFIG_FILE_NAMES {
            let config_path = current.join(name);
            if config_path.exists() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration from a directory (searching parent directories)
pub fn load_config_from_dir(dir: &Path) -> Result<(Config, PathBuf), ConfigError> {
    let config_path = find_config(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;
    let config = load_config(&config_path)?;
    Ok((config, config_path))
}

/// Load configuration or fall back to defaults
pub fn load_config_or_default(dir: &Path) -> (Config, Option<PathBuf>) {
    match load_config_from_dir(dir) {
        Ok((config, path)) => (config, Some(path)),
        Err(_) => {
            warn!(dir = %dir.display(), "no config found, using defaults");
            (Config::default(), None)
        }
    }
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    for (field, value) in [("app.name", &config.app.name), ("app.version", &config.app.version)] {
        if value.trim() != *value {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                message: "leading or trailing whitespace".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_config() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("gantry.toml");
        std::fs::write(&config_path, "[app]\nname = \"Demo\"\n").unwrap();

        let found = find_config(temp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_walks_parents() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        let config_path = temp.path().join("gantry.toml");
        std::fs::write(&config_path, "[app]\nname = \"Demo\"\n").unwrap();

        let found = find_config(&nested);
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_plain_name_preferred_over_hidden() {
        let temp = TempDir::new().unwrap();
        let plain = temp.path().join("gantry.toml");
        let hidden = temp.path().join(".gantry.toml");
        std::fs::write(&plain, "[app]\nname = \"Plain\"\n").unwrap();
        std::fs::write(&hidden, "[app]\nname = \"Hidden\"\n").unwrap();

        assert_eq!(find_config(temp.path()), Some(plain));
    }

    #[test]
    fn test_load_config() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("gantry.toml");
        std::fs::write(
            &config_path,
            r#"
[app]
name = "Demo"
version = "1.2.3"

[mac]
identity = "Demo Team"

[mas]
entitlements = "build/entitlements.mas.plist"
"#,
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.app.name, "Demo");
        assert_eq!(config.app.version, "1.2.3");
        assert_eq!(
            config.mac.identity_preference().qualifier(),
            Some("Demo Team")
        );
        assert_eq!(
            config.mas.entitlements,
            Some(PathBuf::from("build/entitlements.mas.plist"))
        );
    }

    #[test]
    fn test_validate_rejects_padded_version() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("gantry.toml");
        std::fs::write(&config_path, "[app]\nname = \"Demo\"\nversion = \"1.0 \"\n").unwrap();

        let err = load_config(&config_path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_load_config_or_default_falls_back() {
        let temp = TempDir::new().unwrap();
        let (config, path) = load_config_or_default(temp.path());
        assert!(path.is_none());
        assert_eq!(config.app.name, "");
    }
}
