//! Change request files
//!
//! ```toml
//! remove = ["old-tool", "legacy@0.9"]
//!
//! [[unit]]
//! id = "hello"
//! version = "1.0.0"
//! touchpoint = "native"
//!
//! [unit.instructions]
//! install = "mkdir(path:${installFolder}/hello);"
//! uninstall = "rmdir(path:${installFolder}/hello);"
//! ```
//!
//! Every `[[unit]]` is an addition; `remove` lists selectors (`id` or
//! `id@version`) of installed units.

use anyhow::{Context, Result, bail};
use provisioning::{InstallableUnit, ProfileChangeRequest, TouchpointType, UnitSelector};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestFile {
    #[serde(default)]
    pub remove: Vec<UnitSelector>,

    #[serde(default, rename = "unit")]
    pub units: Vec<UnitSpec>,
}

/// A unit as written in a request file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitSpec {
    pub id: String,
    pub version: String,

    /// Touchpoint type id; units without one only get profile bookkeeping
    #[serde(default)]
    pub touchpoint: Option<String>,

    #[serde(default)]
    pub touchpoint_version: Option<String>,

    /// Instruction bodies keyed by phase id
    #[serde(default)]
    pub instructions: BTreeMap<String, String>,

    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl UnitSpec {
    pub fn to_unit(&self) -> InstallableUnit {
        let touchpoint = match &self.touchpoint {
            Some(id) => TouchpointType {
                id: id.clone(),
                version: self.touchpoint_version.clone(),
            },
            None => TouchpointType::none(),
        };

        let mut unit = InstallableUnit::new(&self.id, &self.version).with_touchpoint(touchpoint);
        unit.instructions = self.instructions.clone();
        unit.properties = self.properties.clone();
        unit
    }
}

impl RequestFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid request file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let request: Self = toml::from_str(content)?;
        request.validate()?;
        Ok(request)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for unit in &self.units {
            if unit.id.trim().is_empty() {
                bail!("Unit id cannot be empty");
            }
            if unit.version.trim().is_empty() {
                bail!("Unit '{}' has an empty version", unit.id);
            }
            if !seen.insert(unit.id.as_str()) {
                bail!("Unit '{}' is listed more than once", unit.id);
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty() && self.remove.is_empty()
    }

    pub fn to_change_request(&self) -> ProfileChangeRequest {
        let mut request = ProfileChangeRequest::new();
        for selector in &self.remove {
            request.remove(selector.clone());
        }
        for unit in &self.units {
            request.add(unit.to_unit().into_ref());
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
remove = ["legacy@0.9"]

[[unit]]
id = "hello"
version = "1.0.0"
touchpoint = "native"

[unit.instructions]
install = "mkdir(path:${installFolder}/hello);"

[[unit]]
id = "meta"
version = "2"
"#;

    #[test]
    fn test_parse_request() {
        let file = RequestFile::parse(SAMPLE).unwrap();
        assert_eq!(file.units.len(), 2);
        assert_eq!(file.remove[0].to_string(), "legacy@0.9");

        let hello = file.units[0].to_unit();
        assert_eq!(hello.touchpoint_type.id, "native");
        assert_eq!(
            hello.instruction("install"),
            Some("mkdir(path:${installFolder}/hello);")
        );
        assert!(file.units[1].to_unit().touchpoint_type.is_none());
    }

    #[test]
    fn test_change_request() {
        let request = RequestFile::parse(SAMPLE).unwrap().to_change_request();
        assert_eq!(request.additions().len(), 2);
        assert_eq!(request.removals().len(), 1);
    }

    #[test]
    fn test_duplicate_unit_rejected() {
        let content = "[[unit]]\nid = \"a\"\nversion = \"1\"\n[[unit]]\nid = \"a\"\nversion = \"2\"\n";
        let err = RequestFile::parse(content).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_bad_selector_rejected() {
        assert!(RequestFile::parse("remove = [\"@1.0\"]").is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(RequestFile::parse("[[unit]]\nid = \"a\"\nversion = \"1\"\nversoin = \"2\"\n").is_err());
    }

    #[test]
    fn test_empty_request() {
        assert!(RequestFile::parse("").unwrap().is_empty());
    }
}
