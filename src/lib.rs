//! Selectors over annotated document trees.
//!
//! A [`Document`] holds content nodes carrying text, features and tags. The
//! [`SelectorEngine`] compiles selector expressions, a path language in the
//! mould of XPath 1.0, and evaluates them against a [`DocNode`] view of the
//! document.
//!
//! ```no_run
//! use nodesel::{Document, SelectorEngine, Variables};
//!
//! let doc = Document::from_text("Invoice 42");
//! let engine = SelectorEngine::default();
//! let total = engine.evaluate(&doc, "string-length(.)", &Variables::new());
//! ```

pub mod config;
pub mod datasource;
pub mod engine;
pub mod error;

pub use config::SelectorOptions;
pub use datasource::{DocNode, NodeField, TagField};
pub use engine::{HostAxis, HostFunction, SelectorEngine, Variables};
pub use error::SelectError;

pub use nodesel_model as model;
pub use nodesel_selector as selector;

pub use nodesel_model::{
    AttributeValue, DataAttribute, DataObject, Document, Feature, ModelError, NodeId, Tag,
};
pub use nodesel_selector::{
    DocumentNode, EvalError, EvaluationContext, Expression, NodeKind, ParseError, Value,
    parse_selector,
};
