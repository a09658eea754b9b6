//! The function registry and the built-in function library.
//!
//! Built-ins come in three groups: the XPath 1.0 core library (`xpath`), the
//! document predicates over tags, features and content (`document`), and the
//! regex-backed predicates (`patterns`).

mod document;
mod patterns;
mod xpath;

pub use patterns::PatternCache;

use crate::datasource::DocumentNode;
use crate::engine::{EvaluationContext, Value};
use crate::error::EvalError;
use std::collections::HashMap;

/// Features recording tags live in this namespace.
pub(crate) const TAG_NAMESPACE: &str = "tag";

/// A callable selector function. Arguments arrive already evaluated.
pub type SelectorFunction<'a, N> = Box<
    dyn Fn(Vec<Value<N>>, &EvaluationContext<'a, '_, N>) -> Result<Value<N>, EvalError>
        + Send
        + Sync
        + 'a,
>;

/// A built-in function. Built-ins are plain function pointers, so looking one
/// up allocates nothing.
pub type BuiltinFunction<'a, N> =
    fn(Vec<Value<N>>, &EvaluationContext<'a, '_, N>) -> Result<Value<N>, EvalError>;

/// Resolves the function names of a selector during evaluation.
///
/// [`FunctionRegistry`] is the stock implementation. Hosts that keep their
/// functions for longer than one document implement it over their own table.
pub trait FunctionResolver<'a, N> {
    fn contains(&self, name: &str) -> bool;

    /// Calls `name` with already evaluated arguments. `None` when no function
    /// has that name.
    fn call(
        &self,
        name: &str,
        args: Vec<Value<N>>,
        e_ctx: &EvaluationContext<'a, '_, N>,
    ) -> Option<Result<Value<N>, EvalError>>;
}

/// Looks up a built-in function by name.
pub fn builtin<'a, N: DocumentNode<'a> + 'a>(name: &str) -> Option<BuiltinFunction<'a, N>> {
    xpath::lookup(name)
        .or_else(|| document::lookup(name))
        .or_else(|| patterns::lookup(name))
}

/// Maps function names, as written in selectors, to implementations.
/// Registered functions shadow built-ins of the same name.
pub struct FunctionRegistry<'a, N> {
    functions: HashMap<String, SelectorFunction<'a, N>>,
    builtins: bool,
}

impl<'a, N: DocumentNode<'a> + 'a> FunctionRegistry<'a, N> {
    /// A registry with no functions, not even the core library.
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
            builtins: false,
        }
    }

    /// Registers `function` under `name`, replacing any earlier registration.
    pub fn register<F>(&mut self, name: &str, function: F)
    where
        F: Fn(Vec<Value<N>>, &EvaluationContext<'a, '_, N>) -> Result<Value<N>, EvalError>
            + Send
            + Sync
            + 'a,
    {
        self.functions.insert(name.to_string(), Box::new(function));
    }
}

impl<'a, N: DocumentNode<'a> + 'a> Default for FunctionRegistry<'a, N> {
    /// A registry holding every built-in function.
    fn default() -> Self {
        Self {
            functions: HashMap::new(),
            builtins: true,
        }
    }
}

impl<'a, N: DocumentNode<'a> + 'a> FunctionResolver<'a, N> for FunctionRegistry<'a, N> {
    fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name) || (self.builtins && builtin::<N>(name).is_some())
    }

    fn call(
        &self,
        name: &str,
        args: Vec<Value<N>>,
        e_ctx: &EvaluationContext<'a, '_, N>,
    ) -> Option<Result<Value<N>, EvalError>> {
        if let Some(function) = self.functions.get(name) {
            return Some(function(args, e_ctx));
        }
        if !self.builtins {
            return None;
        }
        builtin::<N>(name).map(|function| function(args, e_ctx))
    }
}

/// Fails unless `min <= args.len() <= max`.
pub(crate) fn check_arity<N>(
    function: &str,
    args: &[Value<N>],
    min: usize,
    max: usize,
) -> Result<(), EvalError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = match (min, max) {
        (1, 1) => "Expected 1 argument".to_string(),
        (min, max) if min == max => format!("Expected {min} arguments"),
        (min, usize::MAX) => format!("Expected at least {min} arguments"),
        (min, max) if max == min + 1 => format!("Expected {min} or {max} arguments"),
        (min, max) => format!("Expected {min} to {max} arguments"),
    };
    Err(EvalError::function(
        function,
        format!("{expected}, got {}", args.len()),
    ))
}

/// An absent value reads as the empty node-set, which is false in a predicate.
pub(crate) fn absent<N>() -> Value<N> {
    Value::NodeSet(Vec::new())
}

/// Takes the single optional argument as a string, defaulting to the
/// context node's string value.
pub(crate) fn string_or_context<'a, N: DocumentNode<'a>>(
    mut args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> String {
    if args.is_empty() {
        e_ctx.context_node.string_value()
    } else {
        args.remove(0).to_string()
    }
}
