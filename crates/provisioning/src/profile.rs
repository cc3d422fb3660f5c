//! The provisioning target: properties plus the set of installed units

use crate::unit::{InstallableUnit, UnitRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Property holding the install location
pub const PROP_INSTALL_FOLDER: &str = "installFolder";
/// Property holding the artifact cache location
pub const PROP_CACHE: &str = "cache";
/// Property holding environment descriptors (`os=linux,arch=x86_64`)
pub const PROP_ENVIRONMENTS: &str = "environments";

/// The installed state being changed.
///
/// The engine passes a profile through every hook and action but never
/// edits it itself; changes happen inside actions, which is what makes
/// them undoable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    id: String,
    #[serde(default)]
    properties: BTreeMap<String, String>,
    /// Installed units keyed by `id@version`
    #[serde(default)]
    units: BTreeMap<String, UnitRef>,
}

impl Profile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            properties: BTreeMap::new(),
            units: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn install_folder(&self) -> Option<&str> {
        self.property(PROP_INSTALL_FOLDER)
    }

    pub fn cache_folder(&self) -> Option<&str> {
        self.property(PROP_CACHE)
    }

    /// Add a unit; returns the unit previously stored under the same key
    pub fn add_unit(&mut self, unit: UnitRef) -> Option<UnitRef> {
        self.units.insert(unit.key(), unit)
    }

    /// Remove a unit; returns it if it was installed
    pub fn remove_unit(&mut self, unit: &InstallableUnit) -> Option<UnitRef> {
        self.units.remove(&unit.key())
    }

    pub fn contains_unit(&self, unit: &InstallableUnit) -> bool {
        self.units.contains_key(&unit.key())
    }

    /// Installed unit with the given id, any version
    pub fn find_unit(&self, id: &str) -> Option<&UnitRef> {
        self.units.values().find(|unit| unit.id == id)
    }

    pub fn units(&self) -> impl Iterator<Item = &UnitRef> {
        self.units.values()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Replace the installed units wholesale (used by profile stores)
    pub fn set_units(&mut self, units: impl IntoIterator<Item = InstallableUnit>) {
        self.units = units
            .into_iter()
            .map(|unit| (unit.key(), Arc::new(unit)))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties() {
        let profile = Profile::new("test")
            .with_property(PROP_INSTALL_FOLDER, "/opt/app")
            .with_property(PROP_CACHE, "/var/cache/app");
        assert_eq!(profile.install_folder(), Some("/opt/app"));
        assert_eq!(profile.cache_folder(), Some("/var/cache/app"));
        assert_eq!(profile.property(PROP_ENVIRONMENTS), None);
    }

    #[test]
    fn test_units() {
        let mut profile = Profile::new("test");
        let unit = InstallableUnit::new("a", "1.0.0").into_ref();

        assert!(profile.add_unit(unit.clone()).is_none());
        assert!(profile.contains_unit(&unit));
        assert_eq!(profile.find_unit("a").map(|u| u.version.as_str()), Some("1.0.0"));
        assert!(profile.add_unit(unit.clone()).is_some());
        assert_eq!(profile.unit_count(), 1);

        assert!(profile.remove_unit(&unit).is_some());
        assert!(!profile.contains_unit(&unit));
        assert!(profile.remove_unit(&unit).is_none());
    }
}
