//! Provisioning plans and the planner seam
//!
//! A [`ProvisioningPlan`] is a status plus the ordered operands to apply.
//! It offers two read-only views: additions (every unit an operand adds)
//! and removals (every unit an operand removes). An update appears in
//! both.

use crate::operand::Operand;
use crate::profile::Profile;
use crate::status::Status;
use crate::unit::{InstallableUnit, UnitRef};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Computed operands for one profile change, with the planning outcome
#[derive(Debug, Clone)]
pub struct ProvisioningPlan {
    status: Status,
    operands: Vec<Operand>,
}

impl ProvisioningPlan {
    pub fn new(status: Status, operands: Vec<Operand>) -> Self {
        Self { status, operands }
    }

    /// A successful plan over `operands`
    pub fn from_operands(operands: Vec<Operand>) -> Self {
        Self::new(Status::ok(), operands)
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }

    /// Units added by the plan (`second` of each operand)
    pub fn additions(&self) -> PlanView<'_> {
        PlanView {
            units: self.operands.iter().filter_map(Operand::second).collect(),
        }
    }

    /// Units removed by the plan (`first` of each operand)
    pub fn removals(&self) -> PlanView<'_> {
        PlanView {
            units: self.operands.iter().filter_map(Operand::first).collect(),
        }
    }
}

/// Read-only view over one side of a plan
#[derive(Debug, Clone)]
pub struct PlanView<'a> {
    units: Vec<&'a UnitRef>,
}

impl<'a> PlanView<'a> {
    /// Units matching `predicate`, in plan order
    pub fn query(&self, predicate: impl Fn(&InstallableUnit) -> bool) -> Vec<&'a UnitRef> {
        self.units
            .iter()
            .copied()
            .filter(|unit| predicate(unit))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a UnitRef> + '_ {
        self.units.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.units.iter().any(|unit| unit.id == id)
    }
}

/// Selects installed units by id and optionally version (`id@version`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnitSelector {
    pub id: String,
    pub version: Option<String>,
}

impl UnitSelector {
    pub fn matches(&self, unit: &InstallableUnit) -> bool {
        unit.id == self.id && self.version.as_ref().is_none_or(|v| *v == unit.version)
    }
}

impl FromStr for UnitSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (id, version) = match s.split_once('@') {
            Some((id, version)) => (id.trim(), Some(version.trim())),
            None => (s, None),
        };
        if id.is_empty() {
            return Err(format!("invalid unit selector '{s}': missing id"));
        }
        if version.is_some_and(str::is_empty) {
            return Err(format!("invalid unit selector '{s}': empty version"));
        }
        Ok(Self {
            id: id.to_string(),
            version: version.map(str::to_string),
        })
    }
}

impl TryFrom<String> for UnitSelector {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UnitSelector> for String {
    fn from(selector: UnitSelector) -> Self {
        selector.to_string()
    }
}

impl fmt::Display for UnitSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{version}", self.id),
            None => f.write_str(&self.id),
        }
    }
}

/// What the caller wants changed in a profile
#[derive(Debug, Clone, Default)]
pub struct ProfileChangeRequest {
    add: Vec<UnitRef>,
    remove: Vec<UnitSelector>,
}

impl ProfileChangeRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, unit: UnitRef) -> &mut Self {
        self.add.push(unit);
        self
    }

    pub fn remove(&mut self, selector: UnitSelector) -> &mut Self {
        self.remove.push(selector);
        self
    }

    pub fn additions(&self) -> &[UnitRef] {
        &self.add
    }

    pub fn removals(&self) -> &[UnitSelector] {
        &self.remove
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Computes a plan for a change request
pub trait Planner {
    fn plan(&self, profile: &Profile, request: &ProfileChangeRequest) -> ProvisioningPlan;
}

/// Planner without dependency resolution
///
/// Removals come first, in request order. An addition whose id is already
/// installed in another version becomes an update; one already installed
/// in the same version is dropped. A removal that matches nothing is a
/// warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectPlanner;

impl Planner for DirectPlanner {
    fn plan(&self, profile: &Profile, request: &ProfileChangeRequest) -> ProvisioningPlan {
        let mut status = Status::multi(format!("Plan for profile '{}'", profile.id()));
        let mut operands = Vec::new();

        let updated: HashSet<&str> = request
            .additions()
            .iter()
            .filter(|unit| !profile.contains_unit(unit) && profile.find_unit(&unit.id).is_some())
            .map(|unit| unit.id.as_str())
            .collect();

        for selector in request.removals() {
            let matching: Vec<&UnitRef> = profile.units().filter(|unit| selector.matches(unit)).collect();
            if matching.is_empty() {
                status.merge(Status::warning(format!("{selector} is not installed")));
                continue;
            }
            for unit in matching {
                if updated.contains(unit.id.as_str()) {
                    status.merge(Status::warning(format!(
                        "{unit} is replaced by an addition; removal ignored"
                    )));
                    continue;
                }
                operands.push(Operand::uninstall(Arc::clone(unit)));
            }
        }

        for unit in request.additions() {
            if profile.contains_unit(unit) {
                status.merge(Status::info(format!("{unit} is already installed")));
                continue;
            }
            match profile.find_unit(&unit.id) {
                Some(installed) => operands.push(Operand::update(Arc::clone(installed), Arc::clone(unit))),
                None => operands.push(Operand::install(Arc::clone(unit))),
            }
        }

        log::debug!("Planned {} operand(s) for profile '{}'", operands.len(), profile.id());
        ProvisioningPlan::new(status, operands)
    }
}
