//! The XPath 1.0 core function library.

use super::{BuiltinFunction, check_arity, string_or_context};
use crate::datasource::DocumentNode;
use crate::engine::{EvaluationContext, Value, parse_number, round_number};
use crate::error::EvalError;

pub(super) fn lookup<'a, N: DocumentNode<'a> + 'a>(
    name: &str,
) -> Option<BuiltinFunction<'a, N>> {
    let function: BuiltinFunction<'a, N> = match name {
        // Node-set
        "position" => func_position::<N>,
        "last" => func_last::<N>,
        "count" => func_count::<N>,
        "name" => func_name::<N>,
        "local-name" => func_local_name::<N>,

        // Boolean
        "not" => func_not::<N>,
        "true" => func_true::<N>,
        "false" => func_false::<N>,
        "boolean" => func_boolean::<N>,

        // String
        "string" => func_string::<N>,
        "concat" => func_concat::<N>,
        "contains" => func_contains::<N>,
        "starts-with" => func_starts_with::<N>,
        "substring-before" => func_substring_before::<N>,
        "substring-after" => func_substring_after::<N>,
        "substring" => func_substring::<N>,
        "string-length" => func_string_length::<N>,
        "normalize-space" => func_normalize_space::<N>,
        "translate" => func_translate::<N>,

        // Number
        "number" => func_number::<N>,
        "sum" => func_sum::<N>,
        "floor" => func_floor::<N>,
        "ceiling" => func_ceiling::<N>,
        "round" => func_round::<N>,
        _ => return None,
    };
    Some(function)
}

// --- Node-Set Functions ---

fn func_position<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("position", &args, 0, 0)?;
    Ok(Value::Number(e_ctx.context_position as f64))
}

fn func_last<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("last", &args, 0, 0)?;
    Ok(Value::Number(e_ctx.context_size as f64))
}

fn func_count<'a, N: DocumentNode<'a>>(
    mut args: Vec<Value<N>>,
    _e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("count", &args, 1, 1)?;
    let nodes = args.remove(0).into_nodes("count()")?;
    Ok(Value::Number(nodes.len() as f64))
}

/// The node a name function reports on: the first of its argument, or the context node.
fn named_node<'a, N: DocumentNode<'a>>(
    function: &str,
    mut args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Option<N>, EvalError> {
    check_arity(function, &args, 0, 1)?;
    if args.is_empty() {
        return Ok(Some(e_ctx.context_node));
    }
    let nodes = args.remove(0).into_nodes(function)?;
    Ok(nodes.first().copied())
}

fn func_name<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    let name = named_node("name", args, e_ctx)?
        .and_then(|n| n.name())
        .map(|q_name| match q_name.prefix {
            Some(prefix) => format!("{}:{}", prefix, q_name.local_part),
            None => q_name.local_part.to_string(),
        })
        .unwrap_or_default();
    Ok(Value::String(name))
}

fn func_local_name<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    let name = named_node("local-name", args, e_ctx)?
        .and_then(|n| n.name())
        .map(|q_name| q_name.local_part.to_string())
        .unwrap_or_default();
    Ok(Value::String(name))
}

// --- Boolean Functions ---

fn func_not<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    _e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("not", &args, 1, 1)?;
    Ok(Value::Boolean(!args[0].to_bool()))
}

fn func_true<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    _e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("true", &args, 0, 0)?;
    Ok(Value::Boolean(true))
}

fn func_false<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    _e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("false", &args, 0, 0)?;
    Ok(Value::Boolean(false))
}

fn func_boolean<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    _e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("boolean", &args, 1, 1)?;
    Ok(Value::Boolean(args[0].to_bool()))
}

// --- String Functions ---

fn func_string<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("string", &args, 0, 1)?;
    Ok(Value::String(string_or_context(args, e_ctx)))
}

fn func_concat<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    _e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("concat", &args, 2, usize::MAX)?;
    Ok(Value::String(args.iter().map(ToString::to_string).collect()))
}

/// Both arguments of a two-string function, as strings.
fn string_pair<'a, N: DocumentNode<'a>>(
    function: &str,
    args: &[Value<N>],
) -> Result<(String, String), EvalError> {
    check_arity(function, args, 2, 2)?;
    Ok((args[0].to_string(), args[1].to_string()))
}

fn func_contains<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    _e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    let (haystack, needle) = string_pair("contains", &args)?;
    Ok(Value::Boolean(haystack.contains(&needle)))
}

fn func_starts_with<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    _e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    let (haystack, prefix) = string_pair("starts-with", &args)?;
    Ok(Value::Boolean(haystack.starts_with(&prefix)))
}

fn func_substring_before<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    _e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    let (haystack, needle) = string_pair("substring-before", &args)?;
    let before = haystack
        .split_once(&needle)
        .map(|(before, _)| before.to_string())
        .unwrap_or_default();
    Ok(Value::String(before))
}

fn func_substring_after<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    _e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    let (haystack, needle) = string_pair("substring-after", &args)?;
    let after = haystack
        .split_once(&needle)
        .map(|(_, after)| after.to_string())
        .unwrap_or_default();
    Ok(Value::String(after))
}

/// `substring(s, start, len?)` with XPath's rounding: the character at 1-based
/// position `p` is kept when `round(start) <= p < round(start) + round(len)`.
fn func_substring<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    _e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("substring", &args, 2, 3)?;
    let s = args[0].to_string();
    let start = round_number(args[1].to_number());
    let end = match args.get(2) {
        Some(len) => start + round_number(len.to_number()),
        None => f64::INFINITY,
    };
    let result = s
        .chars()
        .enumerate()
        .filter(|(i, _)| {
            let position = (*i + 1) as f64;
            position >= start && position < end
        })
        .map(|(_, c)| c)
        .collect();
    Ok(Value::String(result))
}

fn func_string_length<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("string-length", &args, 0, 1)?;
    let length = string_or_context(args, e_ctx).chars().count();
    Ok(Value::Number(length as f64))
}

fn func_normalize_space<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("normalize-space", &args, 0, 1)?;
    let s = string_or_context(args, e_ctx);
    Ok(Value::String(s.split_whitespace().collect::<Vec<_>>().join(" ")))
}

fn func_translate<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    _e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("translate", &args, 3, 3)?;
    let from: Vec<char> = args[1].to_string().chars().collect();
    let to: Vec<char> = args[2].to_string().chars().collect();
    let result = args[0]
        .to_string()
        .chars()
        .filter_map(|c| match from.iter().position(|&f| f == c) {
            // Characters without a counterpart in `to` are removed.
            Some(i) => to.get(i).copied(),
            None => Some(c),
        })
        .collect();
    Ok(Value::String(result))
}

// --- Number Functions ---

fn func_number<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("number", &args, 0, 1)?;
    let n = match args.first() {
        Some(value) => value.to_number(),
        None => parse_number(&e_ctx.context_node.string_value()),
    };
    Ok(Value::Number(n))
}

fn func_sum<'a, N: DocumentNode<'a>>(
    mut args: Vec<Value<N>>,
    _e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("sum", &args, 1, 1)?;
    let nodes = args.remove(0).into_nodes("sum()")?;
    let total = nodes
        .iter()
        .map(|n| parse_number(&n.string_value()))
        .sum();
    Ok(Value::Number(total))
}

fn func_floor<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    _e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("floor", &args, 1, 1)?;
    Ok(Value::Number(args[0].to_number().floor()))
}

fn func_ceiling<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    _e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("ceiling", &args, 1, 1)?;
    Ok(Value::Number(args[0].to_number().ceil()))
}

fn func_round<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    _e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("round", &args, 1, 1)?;
    Ok(Value::Number(round_number(args[0].to_number())))
}

/// Rounds half up, towards positive infinity. NaN and infinities pass through.
#[cfg(test)]
mod tests {
    use super::super::tests::eval_at;
    use crate::datasource::tests::create_test_tree;
    use crate::engine::Value;
    use crate::error::EvalError;

    fn string_at(context: usize, selector: &str) -> String {
        let tree = create_test_tree();
        eval_at(&tree, context, selector).unwrap().to_string()
    }

    fn number(selector: &str) -> f64 {
        let tree = create_test_tree();
        eval_at(&tree, 0, selector).unwrap().to_number()
    }

    #[test]
    fn test_node_set_functions() {
        assert_eq!(number("count(//line)"), 3.0);
        assert_eq!(number("count(//line[position() = last()])"), 1.0);
        assert_eq!(string_at(3, "name()"), "line");
        assert_eq!(string_at(3, "name(feature::*)"), "tag:ORG");
        assert_eq!(string_at(3, "local-name(feature::*)"), "ORG");
        assert_eq!(string_at(0, "name()"), "");
        assert_eq!(string_at(0, "name(//nothing)"), "");
    }

    #[test]
    fn test_count_requires_node_set() {
        let tree = create_test_tree();
        let err = eval_at(&tree, 0, "count('a')").unwrap_err();
        assert!(matches!(err, EvalError::TypeError(_)));
        let err = eval_at(&tree, 0, "count()").unwrap_err();
        assert!(matches!(err, EvalError::Function { .. }));
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(string_at(3, "string()"), "Acme Corp");
        assert_eq!(string_at(0, "concat('a', 1, true())"), "a1true");
        assert_eq!(string_at(3, "substring-before(., ' ')"), "Acme");
        assert_eq!(string_at(3, "substring-after(., ' ')"), "Corp");
        assert_eq!(string_at(0, "substring('12345', 1.5, 2.6)"), "234");
        assert_eq!(string_at(0, "substring('12345', 0, 3)"), "12");
        assert_eq!(string_at(0, "substring('12345', 2)"), "2345");
        assert_eq!(string_at(0, "normalize-space('  a \t b  ')"), "a b");
        assert_eq!(string_at(0, "translate('bar', 'abc', 'AB')"), "BAr");
        assert_eq!(number("string-length('héllo')"), 5.0);
    }

    #[test]
    fn test_boolean_functions() {
        let tree = create_test_tree();
        assert_eq!(
            eval_at(&tree, 3, "contains(., 'Corp') and starts-with(., 'Acme')").unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            eval_at(&tree, 0, "not(//nothing)").unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(eval_at(&tree, 0, "boolean('')").unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_number_functions() {
        assert_eq!(number("sum(//line/@confidence)"), 0.92);
        assert!(number("sum(//line)").is_nan());
        assert_eq!(number("floor(2.7)"), 2.0);
        assert_eq!(number("ceiling(2.1)"), 3.0);
        assert_eq!(number("round(2.5)"), 3.0);
        assert_eq!(number("round(-2.5)"), -2.0);
        assert!(number("number('abc')").is_nan());
        assert_eq!(number("number(' 7 ')"), 7.0);
    }
}
