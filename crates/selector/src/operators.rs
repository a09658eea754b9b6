//! Comparison and arithmetic operators, following the XPath 1.0 coercion rules.

use crate::ast::BinaryOperator;
use crate::datasource::DocumentNode;
use crate::engine::{Value, parse_number};
use crate::error::EvalError;

/// A single atomic operand. Node-sets are compared member by member.
#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl Scalar {
    fn truthy(&self) -> bool {
        match self {
            Scalar::Str(s) => !s.is_empty(),
            Scalar::Num(n) => *n != 0.0 && !n.is_nan(),
            Scalar::Bool(b) => *b,
        }
    }

    fn number(&self) -> f64 {
        match self {
            Scalar::Str(s) => parse_number(s),
            Scalar::Num(n) => *n,
            Scalar::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Applies a comparison or arithmetic operator to two evaluated operands.
pub fn evaluate<'a, N: DocumentNode<'a>>(
    op: BinaryOperator,
    left: Value<N>,
    right: Value<N>,
) -> Result<Value<N>, EvalError> {
    match op {
        BinaryOperator::Equals
        | BinaryOperator::NotEquals
        | BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqual => Ok(Value::Boolean(compare(op, &left, &right))),
        BinaryOperator::Plus
        | BinaryOperator::Minus
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo => {
            let (l, r) = (left.to_number(), right.to_number());
            Ok(Value::Number(match op {
                BinaryOperator::Plus => l + r,
                BinaryOperator::Minus => l - r,
                BinaryOperator::Multiply => l * r,
                BinaryOperator::Divide => l / r,
                // Truncating remainder, sign follows the dividend.
                _ => l % r,
            }))
        }
        other => Err(EvalError::TypeError(format!(
            "'{}' does not operate on values",
            other.symbol()
        ))),
    }
}

/// Node-sets compare existentially: true if any member satisfies the
/// comparison. Against a boolean, the node-set is converted as a whole.
fn compare<'a, N: DocumentNode<'a>>(op: BinaryOperator, left: &Value<N>, right: &Value<N>) -> bool {
    match (left, right) {
        (Value::NodeSet(_), Value::Boolean(b)) => {
            compare_scalars(op, &Scalar::Bool(left.to_bool()), &Scalar::Bool(*b))
        }
        (Value::Boolean(b), Value::NodeSet(_)) => {
            compare_scalars(op, &Scalar::Bool(*b), &Scalar::Bool(right.to_bool()))
        }
        _ => {
            let l = scalars(left);
            let r = scalars(right);
            l.iter().any(|a| r.iter().any(|b| compare_scalars(op, a, b)))
        }
    }
}

fn scalars<'a, N: DocumentNode<'a>>(value: &Value<N>) -> Vec<Scalar> {
    match value {
        Value::NodeSet(nodes) => nodes.iter().map(|n| Scalar::Str(n.string_value())).collect(),
        Value::String(s) => vec![Scalar::Str(s.clone())],
        Value::Number(n) => vec![Scalar::Num(*n)],
        Value::Boolean(b) => vec![Scalar::Bool(*b)],
    }
}

fn compare_scalars(op: BinaryOperator, l: &Scalar, r: &Scalar) -> bool {
    match op {
        BinaryOperator::Equals | BinaryOperator::NotEquals => {
            let equal = match (l, r) {
                (Scalar::Str(a), Scalar::Str(b)) => a == b,
                (Scalar::Bool(_), _) | (_, Scalar::Bool(_)) => l.truthy() == r.truthy(),
                _ => l.number() == r.number(),
            };
            (op == BinaryOperator::Equals) == equal
        }
        BinaryOperator::LessThan => l.number() < r.number(),
        BinaryOperator::LessThanOrEqual => l.number() <= r.number(),
        BinaryOperator::GreaterThan => l.number() > r.number(),
        BinaryOperator::GreaterThanOrEqual => l.number() >= r.number(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::tests::{MockNode, create_test_tree};

    fn cmp(op: BinaryOperator, l: Value<MockNode>, r: Value<MockNode>) -> bool {
        evaluate(op, l, r).unwrap() == Value::Boolean(true)
    }

    #[test]
    fn test_scalar_equality_precedence() {
        use BinaryOperator::*;
        let s = |v: &str| Value::<MockNode>::String(v.to_string());
        // A boolean operand wins.
        assert!(cmp(Equals, Value::Boolean(true), s("false")));
        // Then a number.
        assert!(cmp(Equals, Value::Number(1.0), s(" 1.0 ")));
        assert!(!cmp(Equals, s("1"), s("1.0")));
        assert!(cmp(NotEquals, Value::Number(f64::NAN), Value::Number(f64::NAN)));
    }

    #[test]
    fn test_relational_uses_numbers() {
        use BinaryOperator::*;
        let s = |v: &str| Value::<MockNode>::String(v.to_string());
        assert!(cmp(LessThan, s("2"), s("10")));
        assert!(!cmp(LessThan, s("a"), s("b")));
        assert!(cmp(GreaterThanOrEqual, Value::Boolean(true), Value::Number(1.0)));
    }

    #[test]
    fn test_node_set_comparisons() {
        use BinaryOperator::*;
        let tree = create_test_tree();
        let lines = Value::NodeSet(vec![
            MockNode { id: 3, tree: &tree },
            MockNode { id: 7, tree: &tree },
        ]);
        let attr = Value::NodeSet(vec![MockNode { id: 12, tree: &tree }]);
        let empty: Value<MockNode> = Value::NodeSet(vec![]);

        assert!(cmp(Equals, lines.clone(), Value::String("Invoice 42".into())));
        assert!(cmp(NotEquals, lines.clone(), Value::String("Invoice 42".into())));
        assert!(cmp(GreaterThan, attr.clone(), Value::Number(0.9)));
        assert!(cmp(Equals, attr, Value::Number(0.92)));
        assert!(cmp(Equals, lines.clone(), Value::Boolean(true)));
        assert!(cmp(Equals, empty.clone(), Value::Boolean(false)));
        assert!(!cmp(Equals, empty.clone(), Value::String(String::new())));
        assert!(!cmp(NotEquals, empty, Value::String(String::new())));
        assert!(cmp(Equals, lines.clone(), lines));
    }

    #[test]
    fn test_arithmetic() {
        let n = |v: f64| Value::<MockNode>::Number(v);
        let eval = |op, l, r| evaluate(op, l, r).unwrap().to_number();
        assert_eq!(eval(BinaryOperator::Plus, n(1.5), Value::String("2".into())), 3.5);
        assert_eq!(eval(BinaryOperator::Modulo, n(-7.0), n(3.0)), -1.0);
        assert_eq!(eval(BinaryOperator::Divide, n(1.0), n(0.0)), f64::INFINITY);
        assert!(eval(BinaryOperator::Minus, Value::String("x".into()), n(1.0)).is_nan());
    }

    #[test]
    fn test_set_operators_are_not_value_operators() {
        let err = evaluate::<MockNode>(
            BinaryOperator::Union,
            Value::Number(1.0),
            Value::Number(2.0),
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::TypeError(_)));
    }
}
