//! The extracted-data hierarchy that lives alongside the content tree.

use crate::ids::{DataObjectId, NodeId, TaxonomyId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Points at one tag occurrence: `node.features[feature].tags[tag]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagRef {
    pub node: NodeId,
    pub feature: usize,
    pub tag: usize,
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum AttributeValue {
    String(String),
    Decimal(f64),
    Boolean(bool),
    /// ISO-8601 date as extracted, kept unparsed.
    Date(String),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) | AttributeValue::Date(s) => write!(f, "{s}"),
            AttributeValue::Decimal(d) => write!(f, "{d}"),
            AttributeValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// A named value on a data object, optionally traced back to the tag it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataAttribute {
    pub tag: String,
    pub value: AttributeValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<TagRef>,
}

impl DataAttribute {
    pub fn new(tag: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            tag: tag.into(),
            value,
            path: None,
            confidence: None,
            provenance: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn from_tag(mut self, tag: TagRef) -> Self {
        self.provenance = Some(tag);
        self
    }
}

/// A node of the extracted-data tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataObject {
    pub(crate) id: DataObjectId,
    pub(crate) parent: Option<DataObjectId>,
    #[serde(default)]
    pub(crate) children: Vec<DataObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<TaxonomyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_uuid: Option<String>,
    #[serde(default)]
    pub(crate) attributes: Vec<DataAttribute>,
}

impl DataObject {
    pub fn id(&self) -> DataObjectId {
        self.id
    }

    pub fn parent(&self) -> Option<DataObjectId> {
        self.parent
    }

    pub fn children(&self) -> &[DataObjectId] {
        &self.children
    }

    pub fn attributes(&self) -> &[DataAttribute] {
        &self.attributes
    }
}

/// The schema a data object was extracted against, identified by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub reference: String,
    pub name: String,
}

impl Taxonomy {
    pub fn new(reference: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            name: name.into(),
        }
    }
}
