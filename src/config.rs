//! provisio configuration (`<config dir>/config.toml`)
//!
//! ```toml
//! default_profile = "default"
//!
//! [[phases]]
//! id = "collect"
//! weight = 100
//!
//! [profile]
//! installFolder = "~/apps"
//!
//! [context]
//! os = "linux"
//! ```
//!
//! Every section is optional. Without `phases` the standard five run with
//! their usual weights.

use crate::paths;
use anyhow::{Context, Result};
use provisioning::{PhaseSpec, standard_phase_specs};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisioConfig {
    /// Profile used when `--profile` is not given
    #[serde(default = "default_profile")]
    pub default_profile: String,

    /// Phases to run, in order
    #[serde(default = "standard_phase_specs")]
    pub phases: Vec<PhaseSpec>,

    /// Properties given to newly created profiles
    #[serde(default)]
    pub profile: BTreeMap<String, String>,

    /// Provisioning context properties for every run
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

fn default_profile() -> String {
    "default".to_string()
}

impl Default for ProvisioConfig {
    fn default() -> Self {
        Self {
            default_profile: default_profile(),
            phases: standard_phase_specs(),
            profile: BTreeMap::new(),
            context: BTreeMap::new(),
        }
    }
}

impl ProvisioConfig {
    pub fn path() -> Result<PathBuf> {
        Ok(paths::config_dir()?.join(CONFIG_FILE))
    }

    /// Load the config file, or defaults if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Config file {} does not exist, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config format: {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Properties for a new profile, with `~` and variables expanded
    pub fn profile_properties(&self) -> BTreeMap<String, String> {
        self.profile
            .iter()
            .map(|(key, value)| {
                let expanded = paths::expand(value).to_string_lossy().into_owned();
                (key.clone(), expanded)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ProvisioConfig::load_from(&temp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, ProvisioConfig::default());
        assert_eq!(config.phases.len(), 5);
    }

    #[test]
    fn test_parse_full_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
default_profile = "work"

[[phases]]
id = "install"
weight = 50

[[phases]]
id = "verify"
weight = 5

[profile]
installFolder = "/opt/apps"

[context]
os = "linux"
"#,
        )
        .unwrap();

        let config = ProvisioConfig::load_from(&path).unwrap();
        assert_eq!(config.default_profile, "work");
        assert_eq!(
            config.phases,
            vec![PhaseSpec::new("install", 50), PhaseSpec::new("verify", 5)]
        );
        assert_eq!(
            config.profile_properties().get("installFolder").map(String::as_str),
            Some("/opt/apps")
        );
        assert_eq!(config.context.get("os").map(String::as_str), Some("linux"));
    }

    #[test]
    fn test_phase_without_id_parses() {
        let config: ProvisioConfig = toml::from_str("[[phases]]\nweight = 3\n").unwrap();
        assert_eq!(config.phases[0].id, None);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "phases = 3").unwrap();
        assert!(ProvisioConfig::load_from(&path).is_err());
    }
}
