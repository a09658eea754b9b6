//! Predicates and accessors over the document model: tags, features, node
//! identity and extracted data. All of them look at the context node.

use super::{BuiltinFunction, TAG_NAMESPACE, absent, check_arity};
use crate::datasource::DocumentNode;
use crate::engine::{EvaluationContext, Value, parse_number};
use crate::error::EvalError;

pub(super) fn lookup<'a, N: DocumentNode<'a> + 'a>(
    name: &str,
) -> Option<BuiltinFunction<'a, N>> {
    let function: BuiltinFunction<'a, N> = match name {
        "hasTag" => func_has_tag::<N>,
        "hasFeature" => func_has_feature::<N>,
        "hasFeatureValue" => func_has_feature_value::<N>,
        "content" => func_content::<N>,
        "id" => func_id::<N>,
        "node_type" => func_node_type::<N>,
        "index" => func_index::<N>,
        "dataValue" => func_data_value::<N>,
        _ => return None,
    };
    Some(function)
}

/// Features of `node` in namespace `namespace`, optionally restricted to one name.
fn matching_features<'a, N: DocumentNode<'a> + 'a>(
    node: N,
    namespace: Option<&str>,
    name: Option<&str>,
) -> impl Iterator<Item = N> {
    node.features().filter(move |feature| {
        feature.name().is_some_and(|q_name| {
            namespace.is_none_or(|ns| q_name.prefix == Some(ns))
                && name.is_none_or(|n| q_name.local_part == n)
        })
    })
}

fn attribute_value<'a, N: DocumentNode<'a>>(node: N, name: &str) -> Option<String> {
    node.attributes()
        .find(|attr| attr.name().is_some_and(|q_name| q_name.local_part == name))
        .map(|attr| attr.string_value())
}

fn func_has_tag<'a, N: DocumentNode<'a> + 'a>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("hasTag", &args, 0, 1)?;
    let name = args.first().map(ToString::to_string);
    let found = matching_features(e_ctx.context_node, Some(TAG_NAMESPACE), name.as_deref())
        .next()
        .is_some();
    Ok(Value::Boolean(found))
}

fn func_has_feature<'a, N: DocumentNode<'a> + 'a>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    if args.len() == 1 {
        return Err(EvalError::function(
            "hasFeature",
            "Expected 0 or 2 arguments, got 1",
        ));
    }
    check_arity("hasFeature", &args, 0, 2)?;
    let (namespace, name) = match args.as_slice() {
        [namespace, name] => (Some(namespace.to_string()), Some(name.to_string())),
        _ => (None, None),
    };
    let found = matching_features(e_ctx.context_node, namespace.as_deref(), name.as_deref())
        .next()
        .is_some();
    Ok(Value::Boolean(found))
}

/// True when a feature `type:name` carries `value`, either as its own value or
/// as the value of one of its tags.
fn func_has_feature_value<'a, N: DocumentNode<'a> + 'a>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("hasFeatureValue", &args, 3, 3)?;
    let namespace = args[0].to_string();
    let name = args[1].to_string();
    let value = args[2].to_string();
    let found = matching_features(
        e_ctx.context_node,
        Some(namespace.as_str()),
        Some(name.as_str()),
    )
    .any(|f| f.string_value() == value || f.children().any(|tag| tag.string_value() == value));
    Ok(Value::Boolean(found))
}

fn func_content<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("content", &args, 0, 0)?;
    Ok(Value::String(e_ctx.context_node.string_value()))
}

fn func_id<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("id", &args, 0, 0)?;
    Ok(match attribute_value(e_ctx.context_node, "id") {
        Some(id) => Value::Number(parse_number(&id)),
        None => absent(),
    })
}

fn func_node_type<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("node_type", &args, 0, 0)?;
    Ok(match e_ctx.context_node.node_type() {
        Some(node_type) => Value::String(node_type.to_string()),
        None => absent(),
    })
}

fn func_index<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("index", &args, 0, 0)?;
    Ok(match attribute_value(e_ctx.context_node, "index") {
        Some(index) => Value::Number(parse_number(&index)),
        None => absent(),
    })
}

fn func_data_value<'a, N: DocumentNode<'a>>(
    args: Vec<Value<N>>,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError> {
    check_arity("dataValue", &args, 1, 1)?;
    let name = args[0].to_string();
    Ok(match e_ctx.context_node.data_value(&name) {
        Some(value) => Value::String(value),
        None => absent(),
    })
}

#[cfg(test)]
mod tests {
    use super::super::tests::eval_at;
    use crate::datasource::tests::create_test_tree;
    use crate::engine::Value;
    use crate::error::EvalError;

    fn truth(context: usize, selector: &str) -> bool {
        let tree = create_test_tree();
        eval_at(&tree, context, selector).unwrap().to_bool()
    }

    #[test]
    fn test_has_tag() {
        assert!(truth(3, "hasTag()"));
        assert!(truth(3, "hasTag('ORG')"));
        assert!(!truth(3, "hasTag('PERSON')"));
        assert!(!truth(7, "hasTag()"));
    }

    #[test]
    fn test_has_feature() {
        assert!(truth(3, "hasFeature()"));
        assert!(truth(3, "hasFeature('tag', 'ORG')"));
        assert!(!truth(3, "hasFeature('spatial', 'ORG')"));
        let tree = create_test_tree();
        let err = eval_at(&tree, 3, "hasFeature('tag')").unwrap_err();
        assert!(
            matches!(err, EvalError::Function { ref function, .. } if function == "hasFeature")
        );
    }

    #[test]
    fn test_has_feature_value() {
        assert!(truth(3, "hasFeatureValue('tag', 'ORG', 'Acme')"));
        assert!(!truth(3, "hasFeatureValue('tag', 'ORG', 'Globex')"));
    }

    #[test]
    fn test_accessors() {
        let tree = create_test_tree();
        assert_eq!(
            eval_at(&tree, 7, "content()").unwrap(),
            Value::String("Invoice 42".into())
        );
        assert_eq!(
            eval_at(&tree, 7, "node_type()").unwrap(),
            Value::String("line".into())
        );
        assert!(!eval_at(&tree, 6, "node_type()").unwrap().to_bool());
        assert!(!eval_at(&tree, 7, "index()").unwrap().to_bool());
    }

    #[test]
    fn test_data_value() {
        assert!(truth(0, "//line[dataValue('vendor') = 'Acme Corp']"));
        assert!(!truth(7, "dataValue('vendor')"));
        let tree = create_test_tree();
        assert_eq!(
            eval_at(&tree, 3, "dataValue('vendor')").unwrap(),
            Value::String("Acme Corp".into())
        );
    }
}
