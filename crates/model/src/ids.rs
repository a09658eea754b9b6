//! Newtype wrappers for arena indices
//!
//! These types provide compile-time type safety to prevent mixing up
//! indices into the different arenas of a [`Document`](crate::Document).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a content node in the document's node arena
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    /// Creates a new NodeId from a raw arena index
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the raw arena index
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Index of a data object in the document's extracted-data arena
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataObjectId(usize);

impl DataObjectId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for DataObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data-object#{}", self.0)
    }
}

/// Index of a taxonomy registered on a document
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxonomyId(usize);

impl TaxonomyId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaxonomyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "taxonomy#{}", self.0)
    }
}
