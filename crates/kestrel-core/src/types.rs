//! Common types used across the Kestrel fleet core.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of an allocatable plant resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A point (node) of the driving course.
    Point,
    /// A path (edge) between two points.
    Path,
    /// A location, e.g. a station or peripheral device.
    Location,
}

/// Reference to a point, path or location that can be claimed and allocated.
///
/// At most one vehicle may hold an allocation on a given resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Kind of the referenced resource.
    pub kind: ResourceKind,

    /// Name of the referenced resource.
    pub name: String,
}

impl ResourceRef {
    /// Reference to the point with the given name.
    pub fn point(name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Point,
            name: name.into(),
        }
    }

    /// Reference to the path with the given name.
    pub fn path(name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Path,
            name: name.into(),
        }
    }

    /// Reference to the location with the given name.
    pub fn location(name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Location,
            name: name.into(),
        }
    }

    /// Returns true if this references a point.
    pub fn is_point(&self) -> bool {
        self.kind == ResourceKind::Point
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An ordered set of resources.
pub type ResourceSet = BTreeSet<ResourceRef>;

/// A boolean carrying the reason it came out the way it did.
///
/// The reason is meant for diagnostics only, never for control flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainedBoolean {
    value: bool,
    reason: String,
}

impl ExplainedBoolean {
    /// Create a new explained boolean.
    pub fn new(value: bool, reason: impl Into<String>) -> Self {
        Self {
            value,
            reason: reason.into(),
        }
    }

    /// A positive answer without further explanation.
    pub fn yes() -> Self {
        Self::new(true, "")
    }

    /// A negative answer with the given reason.
    pub fn no(reason: impl Into<String>) -> Self {
        Self::new(false, reason)
    }

    /// The boolean value.
    pub fn value(&self) -> bool {
        self.value
    }

    /// The reason for the value.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Life cycle of a component that must be set up before use and torn down after.
///
/// Both `initialize` and `terminate` are idempotent.
pub trait Lifecycle {
    /// Prepare the component for use.
    fn initialize(&mut self);

    /// Whether the component is initialized.
    fn is_initialized(&self) -> bool;

    /// Release whatever the component set up in `initialize`.
    fn terminate(&mut self);
}

/// Implements [`Lifecycle`] for a type tracking its state in an `initialized: bool` field.
#[macro_export]
macro_rules! impl_lifecycle {
    ($component:ty) => {
        impl $crate::Lifecycle for $component {
            fn initialize(&mut self) {
                self.initialized = true;
            }

            fn is_initialized(&self) -> bool {
                self.initialized
            }

            fn terminate(&mut self) {
                self.initialized = false;
            }
        }
    };
}
