//! The host-facing entry point: compiles selectors once, evaluates them
//! against documents, and carries host-registered functions.

use crate::config::SelectorOptions;
use crate::datasource::DocNode;
use crate::error::SelectError;
use nodesel_model::{Document, ModelError, NodeId};
use nodesel_selector::{
    AxisResolver, Environment, EvalError, EvaluationContext, Expression, FunctionResolver, Value,
    builtin, builtin_axis, evaluate, parse_selector,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

/// Variable bindings for one evaluation, keyed by variable name without `$`.
pub type Variables<'a> = HashMap<String, Value<DocNode<'a>>>;

/// A function a host adds to the selector language. It works for documents
/// of any lifetime, so one registration serves every evaluation.
pub type HostFunction = dyn for<'a, 'e> Fn(
        Vec<Value<DocNode<'a>>>,
        &EvaluationContext<'a, 'e, DocNode<'a>>,
    ) -> Result<Value<DocNode<'a>>, EvalError>
    + Send
    + Sync;

/// A named axis a host adds: the nodes one context node reaches, written in
/// selectors as `name::test`.
pub type HostAxis = dyn for<'a> Fn(DocNode<'a>) -> Vec<DocNode<'a>> + Send + Sync;

struct AxisEntry {
    collect: Box<HostAxis>,
    reverse: bool,
}

/// Host functions and axes. Built as they are registered and shared by every
/// evaluation; names not found here fall through to the built-ins.
#[derive(Default)]
struct Extensions {
    functions: HashMap<String, Box<HostFunction>>,
    axes: HashMap<String, AxisEntry>,
}

impl<'a> FunctionResolver<'a, DocNode<'a>> for Extensions {
    fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name) || builtin::<DocNode<'a>>(name).is_some()
    }

    fn call(
        &self,
        name: &str,
        args: Vec<Value<DocNode<'a>>>,
        e_ctx: &EvaluationContext<'a, '_, DocNode<'a>>,
    ) -> Option<Result<Value<DocNode<'a>>, EvalError>> {
        if let Some(function) = self.functions.get(name) {
            return Some(function(args, e_ctx));
        }
        builtin::<DocNode<'a>>(name).map(|function| function(args, e_ctx))
    }
}

impl<'a> AxisResolver<'a, DocNode<'a>> for Extensions {
    fn is_reverse(&self, name: &str) -> Option<bool> {
        match self.axes.get(name) {
            Some(axis) => Some(axis.reverse),
            None => builtin_axis::<DocNode<'a>>(name).map(|(_, reverse)| reverse),
        }
    }

    fn collect_nodes(
        &self,
        name: &str,
        node: DocNode<'a>,
        seen: &mut HashSet<DocNode<'a>>,
        results: &mut Vec<DocNode<'a>>,
    ) {
        if let Some(axis) = self.axes.get(name) {
            for reached in (axis.collect)(node) {
                if seen.insert(reached) {
                    results.push(reached);
                }
            }
        } else if let Some((collect, _)) = builtin_axis::<DocNode<'a>>(name) {
            collect(node, seen, results);
        }
    }
}

/// Compiles and evaluates selectors against [`Document`]s.
///
/// The engine is `Send + Sync`; one instance can serve concurrent evaluations
/// and shares its compiled selectors between them.
pub struct SelectorEngine {
    options: SelectorOptions,
    compiled: RwLock<HashMap<String, Arc<Expression>>>,
    extensions: Extensions,
}

impl Default for SelectorEngine {
    fn default() -> Self {
        Self::new(SelectorOptions::default())
    }
}

impl SelectorEngine {
    pub fn new(options: SelectorOptions) -> Self {
        Self {
            options,
            compiled: RwLock::new(HashMap::new()),
            extensions: Extensions::default(),
        }
    }

    /// Builds an engine from options given as JSON.
    pub fn from_json_options(json: &str) -> Result<Self, SelectError> {
        Ok(Self::new(SelectorOptions::from_json(json)?))
    }

    pub fn options(&self) -> &SelectorOptions {
        &self.options
    }

    /// Adds `function` under `name`. Host functions take precedence over
    /// built-ins of the same name.
    pub fn register_function<F>(&mut self, name: &str, function: F)
    where
        F: for<'a, 'e> Fn(
                Vec<Value<DocNode<'a>>>,
                &EvaluationContext<'a, 'e, DocNode<'a>>,
            ) -> Result<Value<DocNode<'a>>, EvalError>
            + Send
            + Sync
            + 'static,
    {
        self.extensions
            .functions
            .insert(name.to_string(), Box::new(function));
    }

    /// Adds the axis `name`. `collect` returns the nodes one context node
    /// reaches; a reverse axis numbers them in reverse document order for
    /// predicates. Host axes take precedence over built-ins of the same name.
    pub fn register_axis<F>(&mut self, name: &str, reverse: bool, collect: F)
    where
        F: for<'a> Fn(DocNode<'a>) -> Vec<DocNode<'a>> + Send + Sync + 'static,
    {
        self.extensions.axes.insert(
            name.to_string(),
            AxisEntry {
                collect: Box::new(collect),
                reverse,
            },
        );
    }

    /// Parses `selector`, or returns the cached AST of an earlier compilation.
    pub fn compile(&self, selector: &str) -> Result<Arc<Expression>, SelectError> {
        if let Some(expr) = self
            .compiled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(selector)
        {
            return Ok(Arc::clone(expr));
        }

        let expr = Arc::new(parse_selector(selector)?);
        log::debug!("Compiled selector '{}' as '{}'", selector, expr);

        if self.options.cache_capacity > 0 {
            let mut compiled = self
                .compiled
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if compiled.len() >= self.options.cache_capacity {
                log::debug!("Selector cache full ({} entries), clearing", compiled.len());
                compiled.clear();
            }
            compiled.insert(selector.to_string(), Arc::clone(&expr));
        }
        Ok(expr)
    }

    /// Number of compiled selectors currently cached.
    pub fn cached_selectors(&self) -> usize {
        self.compiled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Evaluates `selector` with the document's root content node as context.
    pub fn evaluate<'a>(
        &self,
        doc: &'a Document,
        selector: &str,
        variables: &Variables<'a>,
    ) -> Result<Value<DocNode<'a>>, SelectError> {
        let root = doc.root().ok_or(ModelError::NoRoot)?;
        self.evaluate_at(DocNode::content(doc, root), 1, 1, selector, variables)
    }

    /// Evaluates `selector` with `context` at `position` of `size`.
    pub fn evaluate_at<'a>(
        &self,
        context: DocNode<'a>,
        position: usize,
        size: usize,
        selector: &str,
        variables: &Variables<'a>,
    ) -> Result<Value<DocNode<'a>>, SelectError> {
        let expr = self.compile(selector)?;
        Ok(self.evaluate_expression(&expr, context, position, size, variables)?)
    }

    /// Evaluates an already compiled expression.
    pub fn evaluate_expression<'a>(
        &self,
        expr: &Expression,
        context: DocNode<'a>,
        position: usize,
        size: usize,
        variables: &Variables<'a>,
    ) -> Result<Value<DocNode<'a>>, EvalError> {
        let env = Environment::new(
            &self.extensions,
            &self.extensions,
            variables,
            self.options.evaluation_options(),
        );
        let mut e_ctx = EvaluationContext::new(context, DocNode::root(context.document()), &env);
        e_ctx.context_position = position;
        e_ctx.context_size = size;

        let result = evaluate(expr, &e_ctx);
        match &result {
            Ok(value) => log::debug!(
                "Evaluated '{}' to a {} after {} steps",
                expr,
                value.type_name(),
                env.steps_taken()
            ),
            Err(e) => log::warn!("Evaluating '{}' failed: {}", expr, e),
        }
        result
    }

    /// Selects from the document's root content node. A document without a
    /// root selects nothing.
    pub fn select<'a>(
        &self,
        doc: &'a Document,
        selector: &str,
        variables: &Variables<'a>,
    ) -> Result<Vec<DocNode<'a>>, SelectError> {
        match doc.root() {
            Some(root) => self.select_from(DocNode::content(doc, root), selector, variables),
            None => Ok(Vec::new()),
        }
    }

    /// Selects relative to `context`. A selector yielding a node-set returns
    /// it; any other value selects the context node when it is true.
    pub fn select_from<'a>(
        &self,
        context: DocNode<'a>,
        selector: &str,
        variables: &Variables<'a>,
    ) -> Result<Vec<DocNode<'a>>, SelectError> {
        if let Some(id) = context.owner()
            && context.document().node(id).is_none()
        {
            return Err(ModelError::UnknownNode(id).into());
        }
        Ok(match self.evaluate_at(context, 1, 1, selector, variables)? {
            Value::NodeSet(nodes) => nodes,
            other if other.to_bool() => vec![context],
            _ => Vec::new(),
        })
    }

    pub fn select_first<'a>(
        &self,
        doc: &'a Document,
        selector: &str,
        variables: &Variables<'a>,
    ) -> Result<Option<DocNode<'a>>, SelectError> {
        Ok(self.select(doc, selector, variables)?.into_iter().next())
    }

    /// The content nodes among the selected nodes, in document order.
    pub fn select_ids(&self, doc: &Document, selector: &str) -> Result<Vec<NodeId>, SelectError> {
        Ok(self
            .select(doc, selector, &Variables::new())?
            .iter()
            .filter_map(DocNode::node_id)
            .collect())
    }
}
