//! Regex-backed predicates: `tagRegex`, `contentRegex` and `typeRegex`.
//!
//! Patterns are anchored at the start of the tested text only; a trailing `$`
//! is needed to match the whole text.

use super::{BuiltinFunction, TAG_NAMESPACE, absent, check_arity};
use crate::datasource::DocumentNode;
use crate::engine::{EvaluationContext, Value};
use crate::error::EvalError;
use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;

/// Compiled patterns keyed by their source text. One cache lives for one
/// evaluation, so a predicate applied to many nodes compiles its pattern once.
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: RefCell<HashMap<String, Regex>>,
}

impl PatternCache {
    /// Returns the start-anchored regex for `pattern`, compiling it on first use.
    pub fn get(&self, pattern: &str) -> Result<Regex, regex::Error> {
        if let Some(regex) = self.compiled.borrow().get(pattern) {
            return Ok(regex.clone());
        }
        let regex = Regex::new(&format!("^(?:{pattern})"))?;
        self.compiled
            .borrow_mut()
            .insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    pub fn len(&self) -> usize {
        self.compiled.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(super) fn lookup<'a, N: DocumentNode<'a> + 'a>(
    name: &str,
) -> Option<BuiltinFunction<'a, N>> {
    let function: BuiltinFunction<'a, N> = match name {
        "tagRegex" => func_tag_regex::<N>,
        "contentRegex" => func_content_regex::<N>,
        "typeRegex" => func_type_regex::<N>,
        _ => return None,
    };
    Some(function)
}

fn compile<'a, N: DocumentNode<'a>>(
    function: &str,
    pattern: &Value<N>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Regex, EvalError> {
    e_ctx
        .env
        .patterns()
        .get(&pattern.to_string())
        .map_err(|e| EvalError::function(function, format!("Invalid regex pattern: {}", e)))
}

/// True when the name of any tag on the context node matches.
fn func_tag_regex<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("tagRegex", &args, 1, 1)?;
    let regex = compile("tagRegex", &args[0], e_ctx)?;
    let found = e_ctx.context_node.features().any(|feature| {
        feature.name().is_some_and(|q_name| {
            q_name.prefix == Some(TAG_NAMESPACE) && regex.is_match(q_name.local_part)
        })
    });
    Ok(Value::Boolean(found))
}

/// The tested content when it matches. With a true second argument the text
/// of descendant content nodes is included, space separated.
fn func_content_regex<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("contentRegex", &args, 1, 2)?;
    let regex = compile("contentRegex", &args[0], e_ctx)?;
    let include_children = args.get(1).is_some_and(Value::to_bool);
    let content = if include_children {
        e_ctx.context_node.all_text(" ")
    } else {
        e_ctx.context_node.string_value()
    };
    Ok(if regex.is_match(&content) {
        Value::String(content)
    } else {
        absent()
    })
}

/// The node type when it matches.
fn func_type_regex<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("typeRegex", &args, 1, 1)?;
    let regex = compile("typeRegex", &args[0], e_ctx)?;
    Ok(match e_ctx.context_node.node_type() {
        Some(node_type) if regex.is_match(node_type) => Value::String(node_type.to_string()),
        _ => absent(),
    })
}
