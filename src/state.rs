//! Profile persistence: one TOML file per profile under the state dir

use crate::paths;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use provisioning::Profile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A profile as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredProfile {
    /// Last time the profile was saved
    pub last_updated: DateTime<Utc>,

    pub profile: Profile,
}

impl StoredProfile {
    pub fn new(profile: Profile) -> Self {
        Self {
            last_updated: Utc::now(),
            profile,
        }
    }
}

/// Directory of `<id>.toml` profile files
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    /// Store in the default profiles directory
    pub fn open() -> Result<Self> {
        Ok(Self::at(paths::profiles_dir()?))
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.root.join(format!("{id}.toml")))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.path(id).is_ok_and(|path| path.exists())
    }

    pub fn load(&self, id: &str) -> Result<StoredProfile> {
        let path = self.path(id)?;
        if !path.exists() {
            bail!("Profile '{id}' does not exist");
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read profile file: {}", path.display()))?;
        let stored: StoredProfile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse profile file: {}", path.display()))?;

        if stored.profile.id() != id {
            bail!(
                "Profile file {} holds profile '{}'",
                path.display(),
                stored.profile.id()
            );
        }

        log::debug!("Loaded profile '{id}' from {}", path.display());
        Ok(stored)
    }

    /// Load a profile, or start a new one with `properties`
    ///
    /// A new profile is not written until [`save`](Self::save).
    pub fn load_or_create(
        &self,
        id: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<StoredProfile> {
        if self.exists(id) {
            return self.load(id);
        }
        validate_id(id)?;
        log::debug!("Profile '{id}' does not exist, starting a new one");

        let mut profile = Profile::new(id);
        for (key, value) in properties {
            profile.set_property(key.clone(), value.clone());
        }
        Ok(StoredProfile::new(profile))
    }

    /// Write the profile, updating its timestamp
    pub fn save(&self, stored: &mut StoredProfile) -> Result<()> {
        let path = self.path(stored.profile.id())?;
        fs::create_dir_all(&self.root).with_context(|| {
            format!("Failed to create profiles directory: {}", self.root.display())
        })?;

        stored.last_updated = Utc::now();
        let content =
            toml::to_string_pretty(&stored).context("Failed to serialize profile to TOML")?;
        fs::write(&path, &content)
            .with_context(|| format!("Failed to write profile file: {}", path.display()))?;

        log::debug!("Saved profile '{}' to {}", stored.profile.id(), path.display());
        Ok(())
    }

    /// Ids of all stored profiles, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read {}", self.root.display()))?
        {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                if let Some(stem) = path.file_stem() {
                    ids.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Profile ids double as file names
fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        bail!("Profile id cannot be empty");
    }
    if id.contains(['/', '\\']) || id.starts_with('.') {
        bail!("Invalid profile id '{id}'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use provisioning::InstallableUnit;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = ProfileStore::at(temp.path());

        let mut profile = Profile::new("work").with_property("installFolder", "/opt/work");
        profile.add_unit(
            InstallableUnit::new("app", "1.0.0")
                .with_instruction("install", "mkdir(path:${installFolder}/app);")
                .into_ref(),
        );
        let mut stored = StoredProfile::new(profile.clone());
        store.save(&mut stored).unwrap();

        let loaded = store.load("work").unwrap();
        assert_eq!(loaded.profile, profile);
        assert_eq!(loaded.last_updated, stored.last_updated);
    }

    #[test]
    fn test_load_or_create_applies_properties() {
        let temp = TempDir::new().unwrap();
        let store = ProfileStore::at(temp.path());
        let properties = BTreeMap::from([("installFolder".to_string(), "/opt".to_string())]);

        let stored = store.load_or_create("fresh", &properties).unwrap();
        assert_eq!(stored.profile.install_folder(), Some("/opt"));
        assert!(!store.exists("fresh"));
    }

    #[test]
    fn test_load_missing_profile_fails() {
        let temp = TempDir::new().unwrap();
        let store = ProfileStore::at(temp.path());
        assert!(store.load("ghost").is_err());
    }

    #[test]
    fn test_list_sorted() {
        let temp = TempDir::new().unwrap();
        let store = ProfileStore::at(temp.path());
        for id in ["zeta", "alpha"] {
            store.save(&mut StoredProfile::new(Profile::new(id))).unwrap();
        }
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(store.list().unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_invalid_ids_rejected() {
        let temp = TempDir::new().unwrap();
        let store = ProfileStore::at(temp.path());
        for id in ["", "../escape", "a/b", ".hidden"] {
            assert!(store.load_or_create(id, &BTreeMap::new()).is_err(), "{id}");
        }
    }

    #[test]
    fn test_list_without_directory() {
        let temp = TempDir::new().unwrap();
        let store = ProfileStore::at(temp.path().join("missing"));
        assert!(store.list().unwrap().is_empty());
    }
}
