pub mod types;

use crate::error::{HardenerError, Result};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = ".chart-hardener.toml";

/// Get the local config file path (dir/.chart-hardener.toml)
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// Load configuration from an explicit file, else the local file in the
/// working directory, else defaults
pub fn load_config(explicit: Option<&Path>) -> Result<types::Config> {
    if let Some(path) = explicit {
        return read_config(path);
    }

    let local = local_config_path(Path::new("."));
    if local.is_file() {
        return read_config(&local);
    }

    Ok(types::Config::default())
}

fn read_config(path: &Path) -> Result<types::Config> {
    let content = fs::read_to_string(path).map_err(|e| {
        HardenerError::Config(format!("cannot read {}: {}", path.display(), e))
    })?;
    let config = toml::from_str(&content)
        .map_err(|e| HardenerError::Config(format!("{}: {}", path.display(), e)))?;
    log::debug!("loaded configuration from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::findings::Severity;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hardener.toml");
        fs::write(&path, "[tally]\nseverity_floor = \"high\"\n\n[layout]\nresults_dir = \"out\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.tally.severity_floor, Severity::High);
        assert!(!config.tally.fail_on_findings);
        assert_eq!(config.layout.results_dir, PathBuf::from("out"));
        assert_eq!(config.layout.fixed_dir, PathBuf::from("fixed_templates"));
    }

    #[test]
    fn test_bad_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[tally]\nseverity_floor = \"extreme\"\n").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(HardenerError::Config(_))));
        assert!(matches!(
            load_config(Some(&dir.path().join("absent.toml"))),
            Err(HardenerError::Config(_))
        ));
    }
}
