//! Proposed changes to elements

use elements::{Element, PathId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a change within one planning cycle
pub type ChangeId = String;

/// What a change does to its element
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Add,
    Remove,
    Modify,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => f.write_str("add"),
            Self::Remove => f.write_str("remove"),
            Self::Modify => f.write_str("modify"),
        }
    }
}

/// One proposed operation on an element
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Element does not exist yet
    Add { after: Element },
    /// Element should go away
    Remove { before: Element },
    /// Element exists but differs from the desired state
    Modify { before: Element, after: Element },
}

impl Change {
    pub fn add(after: impl Into<Element>) -> Self {
        Self::Add { after: after.into() }
    }

    pub fn remove(before: impl Into<Element>) -> Self {
        Self::Remove {
            before: before.into(),
        }
    }

    pub fn modify(before: impl Into<Element>, after: impl Into<Element>) -> Self {
        Self::Modify {
            before: before.into(),
            after: after.into(),
        }
    }

    pub fn action(&self) -> ChangeAction {
        match self {
            Self::Add { .. } => ChangeAction::Add,
            Self::Remove { .. } => ChangeAction::Remove,
            Self::Modify { .. } => ChangeAction::Modify,
        }
    }

    /// The element the change is about (the desired state when there is one)
    pub fn element(&self) -> &Element {
        match self {
            Self::Add { after } | Self::Modify { after, .. } => after,
            Self::Remove { before } => before,
        }
    }

    pub fn before(&self) -> Option<&Element> {
        match self {
            Self::Remove { before } | Self::Modify { before, .. } => Some(before),
            Self::Add { .. } => None,
        }
    }

    pub fn after(&self) -> Option<&Element> {
        match self {
            Self::Add { after } | Self::Modify { after, .. } => Some(after),
            Self::Remove { .. } => None,
        }
    }

    pub fn element_id(&self) -> PathId {
        self.element().id()
    }

    /// Change id: the canonical name of the changed element
    pub fn id(&self) -> ChangeId {
        self.element_id().full_name()
    }

    /// Adapter namespace the change belongs to
    pub fn adapter(&self) -> &str {
        self.element().adapter()
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action(), self.element_id())
    }
}
