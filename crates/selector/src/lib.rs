//! A selector language for document trees, derived from XPath 1.0.
//!
//! Selectors are scanned (`lexer`), parsed into an AST (`parser`, `ast`) and
//! evaluated (`engine`) against any tree implementing [`DocumentNode`].

pub mod ast;
pub mod axes;
pub mod datasource;
pub mod engine;
pub mod error;
pub mod functions;
pub mod lexer;
pub mod operators;
pub mod parser;

pub use ast::{Axis, BinaryOperator, Expression, LocationPath, NodeTest, QualifiedName, Step};
pub use axes::{AxisRegistry, AxisResolver, BuiltinAxis, builtin_axis};
pub use datasource::{DocumentNode, NodeKind, QName};
pub use engine::{
    Environment, EvaluationContext, EvaluationOptions, Value, evaluate, format_number,
    parse_number, round_number,
};
pub use error::{EvalError, ParseError, ScanFault};
pub use functions::{
    BuiltinFunction, FunctionRegistry, FunctionResolver, PatternCache, SelectorFunction, builtin,
};
pub use parser::parse_selector;
