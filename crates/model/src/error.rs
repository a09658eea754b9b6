use crate::ids::{DataObjectId, NodeId, TaxonomyId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Unknown content node {0}")]
    UnknownNode(NodeId),

    #[error("Unknown data object {0}")]
    UnknownDataObject(DataObjectId),

    #[error("Unknown taxonomy {0}")]
    UnknownTaxonomy(TaxonomyId),

    #[error("Invalid tag span {start}..{end} (text length {len})")]
    InvalidSpan { start: usize, end: usize, len: usize },

    #[error("Document already has a root node")]
    RootAlreadySet,

    #[error("Document has no root node")]
    NoRoot,

    #[error("Inconsistent document: {0}")]
    Inconsistent(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
