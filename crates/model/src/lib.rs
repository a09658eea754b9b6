pub mod data;
pub mod document;
pub mod error;
pub mod feature;
pub mod geometry;
pub mod ids;

pub use data::{AttributeValue, DataAttribute, DataObject, TagRef, Taxonomy};
pub use document::{ContentNode, ContentPart, Document};
pub use error::ModelError;
pub use feature::{Feature, TAG_NAMESPACE, Tag};
pub use geometry::BoundingBox;
pub use ids::{DataObjectId, NodeId, TaxonomyId};
