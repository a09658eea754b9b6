//! Features and tags attached to content nodes.

use crate::error::ModelError;
use crate::geometry::BoundingBox;
use serde::{Deserialize, Serialize};

/// Namespace of the features that group tag occurrences.
pub const TAG_NAMESPACE: &str = "tag";

/// A typed annotation on a content node.
///
/// `feature_type` is a namespaced name such as `tag:ORG` or `spatial:bbox`.
/// A node carries at most one feature per type; repeated tagging with the same
/// name appends to that feature's `tags`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub feature_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bboxes: Vec<BoundingBox>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl Feature {
    pub fn new(feature_type: impl Into<String>) -> Self {
        Self {
            feature_type: feature_type.into(),
            ..Default::default()
        }
    }

    /// Builds the feature type for `namespace:name`.
    pub fn of(namespace: &str, name: &str) -> Self {
        Self::new(format!("{namespace}:{name}"))
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bboxes.push(bbox);
        self
    }

    /// The part of the feature type before the first `:`, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.feature_type.split_once(':').map(|(ns, _)| ns)
    }

    /// The part of the feature type after the first `:`, or the whole type.
    pub fn name(&self) -> &str {
        self.feature_type
            .split_once(':')
            .map_or(self.feature_type.as_str(), |(_, name)| name)
    }

    pub fn is_tag(&self) -> bool {
        self.namespace() == Some(TAG_NAMESPACE)
    }
}

/// One tag occurrence: a value with an optional byte span into the node's text.
///
/// A tag with no span covers the whole node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_pos: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_pos: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Tag {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tag covering `start..end` of the node's text.
    pub fn spanning(start: usize, end: usize) -> Result<Self, ModelError> {
        if end < start {
            return Err(ModelError::InvalidSpan {
                start,
                end,
                len: end,
            });
        }
        Ok(Self {
            start_pos: Some(start),
            end_pos: Some(end),
            ..Default::default()
        })
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    pub fn with_group(mut self, group_uuid: impl Into<String>) -> Self {
        self.group_uuid = Some(group_uuid.into());
        self
    }

    pub fn with_parent_group(mut self, parent_group_uuid: impl Into<String>) -> Self {
        self.parent_group_uuid = Some(parent_group_uuid.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Checks the span against the length of the text it points into.
    pub fn check_span(&self, text_len: usize) -> Result<(), ModelError> {
        let start = self.start_pos.unwrap_or(0);
        let end = self.end_pos.unwrap_or(text_len);
        if end < start || end > text_len || start > text_len {
            return Err(ModelError::InvalidSpan {
                start,
                end,
                len: text_len,
            });
        }
        Ok(())
    }

    /// The slice of `text` this tag covers, or the whole text when unspanned.
    pub fn covered<'t>(&self, text: &'t str) -> Option<&'t str> {
        let start = self.start_pos.unwrap_or(0);
        let end = self.end_pos.unwrap_or(text.len());
        text.get(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_type_split() {
        let feature = Feature::of("tag", "ORG");
        assert_eq!(feature.feature_type, "tag:ORG");
        assert_eq!(feature.namespace(), Some("tag"));
        assert_eq!(feature.name(), "ORG");
        assert!(feature.is_tag());

        let plain = Feature::new("bbox");
        assert_eq!(plain.namespace(), None);
        assert_eq!(plain.name(), "bbox");
        assert!(!plain.is_tag());
    }

    #[test]
    fn test_span_validation() {
        assert!(Tag::spanning(4, 2).is_err());
        let tag = Tag::spanning(0, 5).unwrap();
        assert!(tag.check_span(11).is_ok());
        assert!(tag.check_span(3).is_err());
        assert!(Tag::new().check_span(0).is_ok());
    }

    #[test]
    fn test_covered_text() {
        let tag = Tag::spanning(6, 11).unwrap();
        assert_eq!(tag.covered("Hello World"), Some("World"));
        assert_eq!(Tag::new().covered("Hello"), Some("Hello"));
    }
}
