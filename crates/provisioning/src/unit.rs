//! Installable unit metadata as far as the engine needs it

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Shared handle to an installable unit
pub type UnitRef = Arc<InstallableUnit>;

/// Identifies the touchpoint responsible for a unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TouchpointType {
    pub id: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl TouchpointType {
    /// Id of the type meaning "no touchpoint"
    pub const NONE_ID: &'static str = "none";

    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: None,
        }
    }

    pub fn none() -> Self {
        Self::new(Self::NONE_ID)
    }

    pub fn is_none(&self) -> bool {
        self.id == Self::NONE_ID
    }
}

impl Default for TouchpointType {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Display for TouchpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{} {}", self.id, version),
            None => f.write_str(&self.id),
        }
    }
}

/// A versioned piece of software with per-phase touchpoint instructions
///
/// Instructions are keyed by instruction key (usually the phase id) and
/// hold a statement list such as `mkdir(path:${installFolder}/bin);`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallableUnit {
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub touchpoint_type: TouchpointType,
    #[serde(default)]
    pub instructions: BTreeMap<String, String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl InstallableUnit {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            touchpoint_type: TouchpointType::none(),
            instructions: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_touchpoint(mut self, touchpoint_type: TouchpointType) -> Self {
        self.touchpoint_type = touchpoint_type;
        self
    }

    pub fn with_instruction(mut self, key: impl Into<String>, body: impl Into<String>) -> Self {
        self.instructions.insert(key.into(), body.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Wrap into a shared handle
    pub fn into_ref(self) -> UnitRef {
        Arc::new(self)
    }

    pub fn instruction(&self, key: &str) -> Option<&str> {
        self.instructions.get(key).map(String::as_str)
    }

    /// `id@version`, the key used for profile bookkeeping
    pub fn key(&self) -> String {
        format!("{}@{}", self.id, self.version)
    }
}

impl fmt::Display for InstallableUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}
