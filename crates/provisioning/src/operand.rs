//! Operands: one unit transition each

use crate::error::{Error, Result};
use crate::unit::UnitRef;
use std::fmt;
use std::sync::Arc;

/// Kind of transition an operand describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Install,
    Uninstall,
    Update,
}

#[derive(Debug)]
struct Transition {
    first: Option<UnitRef>,
    second: Option<UnitRef>,
}

/// An immutable `from → to` unit transition.
///
/// `Operand` is a cheap handle. Clones refer to the same operand; two
/// operands built separately from equal units are still different
/// operands as far as [`same_as`](Self::same_as) and the session ledger
/// are concerned.
#[derive(Clone)]
pub struct Operand {
    inner: Arc<Transition>,
}

impl Operand {
    /// Build an operand; fails if both sides are absent
    pub fn new(first: Option<UnitRef>, second: Option<UnitRef>) -> Result<Self> {
        if first.is_none() && second.is_none() {
            return Err(Error::InvalidOperand);
        }
        Ok(Self {
            inner: Arc::new(Transition { first, second }),
        })
    }

    pub fn install(unit: UnitRef) -> Self {
        Self {
            inner: Arc::new(Transition {
                first: None,
                second: Some(unit),
            }),
        }
    }

    pub fn uninstall(unit: UnitRef) -> Self {
        Self {
            inner: Arc::new(Transition {
                first: Some(unit),
                second: None,
            }),
        }
    }

    pub fn update(from: UnitRef, to: UnitRef) -> Self {
        Self {
            inner: Arc::new(Transition {
                first: Some(from),
                second: Some(to),
            }),
        }
    }

    /// The unit being replaced or removed
    pub fn first(&self) -> Option<&UnitRef> {
        self.inner.first.as_ref()
    }

    /// The unit being added
    pub fn second(&self) -> Option<&UnitRef> {
        self.inner.second.as_ref()
    }

    pub fn kind(&self) -> OperandKind {
        match (&self.inner.first, &self.inner.second) {
            (Some(_), Some(_)) => OperandKind::Update,
            (Some(_), None) => OperandKind::Uninstall,
            _ => OperandKind::Install,
        }
    }

    /// Reference identity
    pub fn same_as(&self, other: &Operand) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |unit: Option<&UnitRef>| unit.map_or_else(|| "null".to_string(), ToString::to_string);
        write!(f, "{} --> {}", side(self.first()), side(self.second()))
    }
}

impl fmt::Debug for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Operand({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::InstallableUnit;

    fn unit(id: &str) -> UnitRef {
        InstallableUnit::new(id, "1.0.0").into_ref()
    }

    #[test]
    fn test_empty_operand_rejected() {
        assert!(matches!(
            Operand::new(None, None),
            Err(Error::InvalidOperand)
        ));
    }

    #[test]
    fn test_kind() {
        assert_eq!(Operand::install(unit("a")).kind(), OperandKind::Install);
        assert_eq!(Operand::uninstall(unit("a")).kind(), OperandKind::Uninstall);
        assert_eq!(
            Operand::update(unit("a"), unit("b")).kind(),
            OperandKind::Update
        );
        assert_eq!(
            Operand::new(None, Some(unit("a"))).unwrap().kind(),
            OperandKind::Install
        );
    }

    #[test]
    fn test_identity_is_by_reference() {
        let a = unit("a");
        let x = Operand::install(a.clone());
        let y = Operand::install(a);

        assert!(x.same_as(&x.clone()));
        assert!(!x.same_as(&y));
    }

    #[test]
    fn test_display() {
        let op = Operand::update(unit("a"), unit("b"));
        assert_eq!(op.to_string(), "a 1.0.0 --> b 1.0.0");
        assert_eq!(Operand::install(unit("a")).to_string(), "null --> a 1.0.0");
    }
}
