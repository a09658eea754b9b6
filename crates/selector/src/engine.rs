//! The evaluation engine for executing a parsed selector AST against a generic `DocumentNode`.

use super::ast::{
    AbbreviatedStep, Axis, BinaryOperator, Expression, LocationPath, LocationStep, NodeTest,
    NodeTypeTest,
};
use super::axes::{self, AxisResolver};
use super::functions::{FunctionResolver, PatternCache};
use super::operators;
use crate::datasource::{DocumentNode, NodeKind};
use crate::error::EvalError;
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Represents the possible result types of a selector evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<N> {
    /// Duplicate-free, in document order.
    NodeSet(Vec<N>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl<'a, N: DocumentNode<'a>> Value<N> {
    /// Coerces the value to a boolean as per XPath 1.0 rules.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::NodeSet(nodes) => !nodes.is_empty(),
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Boolean(b) => *b,
        }
    }

    /// Coerces the value to a number as per XPath 1.0 rules.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s),
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::NodeSet(nodes) => {
                let s = nodes.first().map(|n| n.string_value()).unwrap_or_default();
                parse_number(&s)
            }
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::NodeSet(_) => "node-set",
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
        }
    }

    /// Unwraps a node-set, or fails naming the operation that needed one.
    pub fn into_nodes(self, operation: &str) -> Result<Vec<N>, EvalError> {
        match self {
            Value::NodeSet(nodes) => Ok(nodes),
            other => Err(EvalError::TypeError(format!(
                "{operation} requires a node-set, got {}",
                other.type_name()
            ))),
        }
    }
}

impl<'a, N: DocumentNode<'a>> fmt::Display for Value<N> {
    /// Coerces the value to a string as per XPath 1.0 rules.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::NodeSet(nodes) => write!(
                f,
                "{}",
                nodes.first().map(|n| n.string_value()).unwrap_or_default()
            ),
            Value::String(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Parses the XPath number syntax (`-? digits ('.' digits?)? | -? '.' digits`),
/// surrounding whitespace allowed. Anything else is NaN.
pub fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let mut seen_digit = false;
    let mut seen_dot = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return f64::NAN,
        }
    }
    if !seen_digit {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

/// Rounds half up, towards positive infinity. Non-finite values pass through.
pub fn round_number(n: f64) -> f64 {
    if n.is_finite() { (n + 0.5).floor() } else { n }
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

/// Knobs that change how strictly an evaluation runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluationOptions {
    /// Referencing an unbound variable is an error instead of the empty string.
    pub strict: bool,
    /// Upper bound on nodes produced by axis traversal in one evaluation.
    pub max_steps: Option<usize>,
}

/// Everything an evaluation shares across contexts: registries, bindings,
/// options and per-evaluation bookkeeping.
pub struct Environment<'a, 'e, N> {
    pub functions: &'e dyn FunctionResolver<'a, N>,
    pub axes: &'e dyn AxisResolver<'a, N>,
    pub variables: &'e HashMap<String, Value<N>>,
    pub options: EvaluationOptions,
    steps: Cell<usize>,
    patterns: PatternCache,
}

impl<'a, 'e, N> Environment<'a, 'e, N> {
    pub fn new(
        functions: &'e dyn FunctionResolver<'a, N>,
        axes: &'e dyn AxisResolver<'a, N>,
        variables: &'e HashMap<String, Value<N>>,
        options: EvaluationOptions,
    ) -> Self {
        Self {
            functions,
            axes,
            variables,
            options,
            steps: Cell::new(0),
            patterns: PatternCache::default(),
        }
    }

    /// Nodes produced by axis traversal so far.
    pub fn steps_taken(&self) -> usize {
        self.steps.get()
    }

    /// Compiled regexes, reused for the lifetime of this evaluation.
    pub fn patterns(&self) -> &PatternCache {
        &self.patterns
    }

    fn charge(&self, steps: usize) -> Result<(), EvalError> {
        let total = self.steps.get() + steps;
        self.steps.set(total);
        match self.options.max_steps {
            Some(limit) if total > limit => Err(EvalError::StepBudgetExceeded { limit }),
            _ => Ok(()),
        }
    }
}

/// The dynamic context of one evaluation point.
/// `'a` is the lifetime of the underlying document.
/// `'e` is the lifetime of the shared environment.
pub struct EvaluationContext<'a, 'e, N> {
    pub context_node: N,
    pub root_node: N,
    pub context_position: usize, // 1-based index
    pub context_size: usize,
    pub env: &'e Environment<'a, 'e, N>,
}

impl<'a, 'e, N: Copy> EvaluationContext<'a, 'e, N> {
    pub fn new(context_node: N, root_node: N, env: &'e Environment<'a, 'e, N>) -> Self {
        Self {
            context_node,
            root_node,
            context_position: 1,
            context_size: 1,
            env,
        }
    }

    /// A context for `node` at `position` of `size`, sharing this one's environment.
    pub fn at(&self, node: N, position: usize, size: usize) -> Self {
        Self {
            context_node: node,
            root_node: self.root_node,
            context_position: position,
            context_size: size,
            env: self.env,
        }
    }
}

/// Evaluates a compiled expression and returns a concrete `Value`.
pub fn evaluate<'a, N>(
    expr: &Expression,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError>
where
    N: DocumentNode<'a> + 'a,
{
    match expr {
        Expression::Literal(s) => Ok(Value::String(s.clone())),
        Expression::Number(n) => Ok(Value::Number(*n)),
        Expression::Path(path) => Ok(Value::NodeSet(evaluate_location_path(path, e_ctx)?)),
        Expression::Root => Ok(Value::NodeSet(vec![e_ctx.root_node])),
        Expression::RootUnion(rest) => {
            let nodes = evaluate(rest, e_ctx)?.into_nodes("union")?;
            Ok(Value::NodeSet(merge(vec![e_ctx.root_node], nodes)))
        }
        Expression::Variable(name) => {
            let key = name.to_string();
            match e_ctx.env.variables.get(&key) {
                Some(value) => Ok(value.clone()),
                None if e_ctx.env.options.strict => Err(EvalError::UnknownVariable(key)),
                None => Ok(Value::String(String::new())),
            }
        }
        Expression::FunctionCall { name, args } => {
            let key = name.to_string();
            if !e_ctx.env.functions.contains(&key) {
                return Err(EvalError::UnknownFunction { name: key });
            }
            let mut evaluated_args = Vec::with_capacity(args.len());
            for arg in args {
                evaluated_args.push(evaluate(arg, e_ctx)?);
            }
            e_ctx
                .env
                .functions
                .call(&key, evaluated_args, e_ctx)
                .unwrap_or(Err(EvalError::UnknownFunction { name: key }))
        }
        Expression::Filter {
            primary,
            predicates,
        } => {
            let mut nodes = evaluate(primary, e_ctx)?.into_nodes("a predicate")?;
            nodes.sort();
            nodes.dedup();
            Ok(Value::NodeSet(apply_predicates(nodes, predicates, e_ctx)?))
        }
        Expression::Binary { left, op, right } => evaluate_binary(left, *op, right, e_ctx),
        Expression::Negate(inner) => Ok(Value::Number(-evaluate(inner, e_ctx)?.to_number())),
    }
}

fn evaluate_binary<'a, N>(
    left: &Expression,
    op: BinaryOperator,
    right: &Expression,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Value<N>, EvalError>
where
    N: DocumentNode<'a> + 'a,
{
    match op {
        BinaryOperator::Or => Ok(Value::Boolean(
            evaluate(left, e_ctx)?.to_bool() || evaluate(right, e_ctx)?.to_bool(),
        )),
        BinaryOperator::And => Ok(Value::Boolean(
            evaluate(left, e_ctx)?.to_bool() && evaluate(right, e_ctx)?.to_bool(),
        )),
        BinaryOperator::Union => {
            let l = evaluate(left, e_ctx)?.into_nodes("union")?;
            let r = evaluate(right, e_ctx)?.into_nodes("union")?;
            Ok(Value::NodeSet(merge(l, r)))
        }
        BinaryOperator::Intersect => {
            let l = evaluate(left, e_ctx)?.into_nodes("intersect")?;
            let r: HashSet<N> = evaluate(right, e_ctx)?
                .into_nodes("intersect")?
                .into_iter()
                .collect();
            Ok(Value::NodeSet(merge(
                l.into_iter().filter(|n| r.contains(n)).collect(),
                Vec::new(),
            )))
        }
        BinaryOperator::Stream => {
            let sources = merge(evaluate(left, e_ctx)?.into_nodes("stream")?, Vec::new());
            let size = sources.len();
            let mut results = Vec::new();
            for (i, node) in sources.into_iter().enumerate() {
                let stream_ctx = e_ctx.at(node, i + 1, size);
                results.extend(evaluate(right, &stream_ctx)?.into_nodes("stream")?);
            }
            Ok(Value::NodeSet(merge(results, Vec::new())))
        }
        _ => {
            let l = evaluate(left, e_ctx)?;
            let r = evaluate(right, e_ctx)?;
            operators::evaluate(op, l, r)
        }
    }
}

/// Concatenates, then restores document order and uniqueness.
fn merge<N: Ord>(mut left: Vec<N>, right: Vec<N>) -> Vec<N> {
    left.extend(right);
    left.sort();
    left.dedup();
    left
}

fn evaluate_location_path<'a, N>(
    path: &LocationPath,
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, EvalError>
where
    N: DocumentNode<'a> + 'a,
{
    let initial_context = if let Some(start_expr) = &path.start_point {
        // The path starts from the result of another expression.
        evaluate(start_expr, e_ctx)?.into_nodes("a path step")?
    } else if path.is_absolute {
        vec![e_ctx.root_node]
    } else {
        vec![e_ctx.context_node]
    };

    let mut current_nodes = initial_context;
    for step in &path.steps {
        current_nodes = evaluate_step(step, &current_nodes, e_ctx)?;
    }
    Ok(merge(current_nodes, Vec::new()))
}

/// Evaluates a single step in a location path by chaining axis collection, node testing,
/// and predicate application. The result is in the axis' traversal order.
fn evaluate_step<'a, N>(
    step: &LocationStep,
    context_nodes: &[N],
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, EvalError>
where
    N: DocumentNode<'a> + 'a,
{
    match step {
        LocationStep::Abbreviated(AbbreviatedStep::SelfNode) => Ok(context_nodes.to_vec()),
        LocationStep::Abbreviated(AbbreviatedStep::Parent) => {
            let (nodes, _) = collect_axis_nodes(&Axis::Parent, context_nodes, e_ctx)?;
            Ok(nodes)
        }
        LocationStep::Step(step) => {
            let (axis_nodes, reverse) = collect_axis_nodes(&step.axis, context_nodes, e_ctx)
                .map_err(|e| match e {
                    EvalError::UnknownAxis { axis, .. } => EvalError::UnknownAxis {
                        axis,
                        step: step.to_string(),
                    },
                    other => other,
                })?;
            let tested_nodes = filter_by_node_test(&axis_nodes, &step.node_test);
            let result = apply_predicates(tested_nodes, &step.predicates, e_ctx)?;
            log::trace!(
                "Step '{}' {} -> {} nodes{}",
                step,
                context_nodes.len(),
                result.len(),
                if reverse { " (reverse)" } else { "" }
            );
            Ok(result)
        }
    }
}

/// Stage 1: Collects all unique nodes from the context set along a given axis, in
/// document order for forward axes and reverse document order for reverse ones.
fn collect_axis_nodes<'a, N>(
    axis: &Axis,
    context_nodes: &[N],
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<(Vec<N>, bool), EvalError>
where
    N: DocumentNode<'a> + 'a,
{
    let named_reverse = match axis {
        Axis::Named(name) => Some(e_ctx.env.axes.is_reverse(name).ok_or_else(|| {
            EvalError::UnknownAxis {
                axis: name.clone(),
                step: format!("{name}::"),
            }
        })?),
        _ => None,
    };

    let mut result_nodes = Vec::new();
    let mut seen = HashSet::new();
    for &node in context_nodes {
        let before = result_nodes.len();
        match axis {
            Axis::Child => axes::collect_child_nodes(node, &mut seen, &mut result_nodes),
            Axis::Attribute => axes::collect_attribute_nodes(node, &mut seen, &mut result_nodes),
            Axis::Descendant => axes::collect_descendant_nodes(node, &mut seen, &mut result_nodes),
            Axis::DescendantOrSelf => {
                axes::collect_descendant_or_self_nodes(node, &mut seen, &mut result_nodes)
            }
            Axis::Parent => axes::collect_parent_nodes(node, &mut seen, &mut result_nodes),
            Axis::SelfAxis => axes::collect_self_nodes(node, &mut seen, &mut result_nodes),
            Axis::Named(name) => {
                e_ctx
                    .env
                    .axes
                    .collect_nodes(name, node, &mut seen, &mut result_nodes)
            }
        }
        e_ctx.env.charge(result_nodes.len() - before)?;
    }

    let reverse = *axis == Axis::Parent || named_reverse == Some(true);
    result_nodes.sort();
    if reverse {
        result_nodes.reverse();
    }
    Ok((result_nodes, reverse))
}

/// Stage 2: Filters a set of nodes based on a `NodeTest`.
fn filter_by_node_test<'a, N>(nodes: &[N], test: &NodeTest) -> Vec<N>
where
    N: DocumentNode<'a> + 'a,
{
    nodes
        .iter()
        .filter(|&node| match test {
            NodeTest::Wildcard => node.name().is_some(),
            NodeTest::PrefixWildcard(prefix) => node
                .name()
                .is_some_and(|q_name| q_name.prefix == Some(prefix.as_str())),
            NodeTest::Name(name) => node.name().is_some_and(|q_name| {
                q_name.prefix == name.prefix.as_deref() && q_name.local_part == name.local
            }),
            NodeTest::NodeType(ntt) => match ntt {
                NodeTypeTest::Node => true,
                NodeTypeTest::Text => node.kind() == NodeKind::Text,
                // The document model has no comments.
                NodeTypeTest::Comment => false,
                NodeTypeTest::ProcessingInstruction(target) => {
                    node.kind() == NodeKind::Feature
                        && target.as_deref().is_none_or(|t| {
                            node.name().and_then(|q_name| q_name.prefix) == Some(t)
                        })
                }
            },
        })
        .copied()
        .collect()
}

/// Stage 3: Filters a set of nodes by applying a series of predicates.
fn apply_predicates<'a, N>(
    nodes: Vec<N>,
    predicates: &[Expression],
    e_ctx: &EvaluationContext<'a, '_, N>,
) -> Result<Vec<N>, EvalError>
where
    N: DocumentNode<'a> + 'a,
{
    let mut final_nodes = nodes;
    for predicate in predicates {
        let mut predicate_results = Vec::new();
        let context_size = final_nodes.len();
        for (i, node) in final_nodes.iter().enumerate() {
            let predicate_e_ctx = e_ctx.at(*node, i + 1, context_size);
            let keep = match evaluate(predicate, &predicate_e_ctx)? {
                Value::Number(n) => round_number(n) == (i + 1) as f64,
                other => other.to_bool(),
            };
            if keep {
                predicate_results.push(*node);
            }
        }
        final_nodes = predicate_results;
    }
    Ok(final_nodes)
}
