//! Hierarchical diagnostic tree produced by `probe()` walks over pipes,
//! filters, and retry policies.
//!
//! Deliberately small: a node has a name, a flat list of scalar
//! fields, and an ordered list of child nodes. `serde` (when enabled)
//! lets a caller serialize the tree for inspection without this crate
//! taking a position on the output format.

use crate::types::alloc_type::String;
use crate::types::Vec;
use core::time::Duration;

/// A scalar value attached to a [`ProbeSink`] node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ProbeValue {
    Str(String),
    Bool(bool),
    U32(u32),
    Duration(Duration),
}

impl From<&str> for ProbeValue {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}
impl From<bool> for ProbeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
impl From<u32> for ProbeValue {
    fn from(value: u32) -> Self {
        Self::U32(value)
    }
}
impl From<Duration> for ProbeValue {
    fn from(value: Duration) -> Self {
        Self::Duration(value)
    }
}

/// One node of the diagnostic tree: a name, scalar fields, and
/// children contributed by nested filters/policies.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ProbeSink {
    name: String,
    fields: Vec<(String, ProbeValue)>,
    children: Vec<ProbeSink>,
}

impl ProbeSink {
    /// Creates a new, empty node named `name`.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), fields: Vec::new(), children: Vec::new() }
    }

    /// Returns this node's name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attaches a scalar field, returning `self` for chaining.
    pub fn field<S: Into<String>, V: Into<ProbeValue>>(mut self, key: S, value: V) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Appends an already-built child node.
    pub fn push_child(&mut self, child: ProbeSink) {
        self.children.push(child);
    }

    /// Returns the attached scalar fields.
    pub fn fields(&self) -> &[(String, ProbeValue)] {
        &self.fields
    }

    /// Returns the attached child nodes, in contribution order.
    pub fn children(&self) -> &[ProbeSink] {
        &self.children
    }

    /// Looks up a single scalar field by key.
    pub fn field_value(&self, key: &str) -> Option<&ProbeValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}
