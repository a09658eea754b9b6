//! Contains pure functions for collecting nodes along each axis, and the
//! registry that resolves named axes.

use crate::datasource::DocumentNode;
use std::collections::{HashMap, HashSet};

fn add_node<'a, N: DocumentNode<'a>>(node: N, seen: &mut HashSet<N>, results: &mut Vec<N>) {
    if seen.insert(node) {
        results.push(node);
    }
}

pub fn collect_self_nodes<'a, N: DocumentNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    add_node(node, seen, results);
}

pub fn collect_child_nodes<'a, N: DocumentNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    for child in node.children() {
        add_node(child, seen, results);
    }
}

pub fn collect_attribute_nodes<'a, N: DocumentNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    for attr in node.attributes() {
        add_node(attr, seen, results);
    }
}

pub fn collect_feature_nodes<'a, N: DocumentNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    for feature in node.features() {
        add_node(feature, seen, results);
    }
}

/// Descendants in pre-order.
pub fn collect_descendant_nodes<'a, N: DocumentNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    let mut stack: Vec<N> = node.children().collect();
    stack.reverse();
    while let Some(current) = stack.pop() {
        add_node(current, seen, results);
        let children: Vec<N> = current.children().collect();
        stack.extend(children.into_iter().rev());
    }
}

pub fn collect_descendant_or_self_nodes<'a, N: DocumentNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    add_node(node, seen, results);
    collect_descendant_nodes(node, seen, results);
}

pub fn collect_parent_nodes<'a, N: DocumentNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    if let Some(parent) = node.parent() {
        add_node(parent, seen, results);
    }
}

pub fn collect_ancestor_nodes<'a, N: DocumentNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    let mut current = node.parent();
    while let Some(p) = current {
        add_node(p, seen, results);
        current = p.parent();
    }
}

pub fn collect_ancestor_or_self_nodes<'a, N: DocumentNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    add_node(node, seen, results);
    collect_ancestor_nodes(node, seen, results);
}

/// The siblings of `node` before and after it, both in document order.
/// Nodes that are not among their parent's children, such as attributes and
/// features, have no siblings.
fn split_siblings<'a, N: DocumentNode<'a>>(node: N) -> (Vec<N>, Vec<N>) {
    let (mut before, mut after) = (Vec::new(), Vec::new());
    let Some(parent) = node.parent() else {
        return (before, after);
    };
    let mut passed = false;
    for sibling in parent.children() {
        if sibling == node {
            passed = true;
        } else if passed {
            after.push(sibling);
        } else {
            before.push(sibling);
        }
    }
    if !passed {
        before.clear();
    }
    (before, after)
}

pub fn collect_following_sibling_nodes<'a, N: DocumentNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    for sibling in split_siblings(node).1 {
        add_node(sibling, seen, results);
    }
}

/// Preceding siblings, nearest first.
pub fn collect_preceding_sibling_nodes<'a, N: DocumentNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    for sibling in split_siblings(node).0.into_iter().rev() {
        add_node(sibling, seen, results);
    }
}

/// Everything after `node` in document order, excluding its descendants.
pub fn collect_following_nodes<'a, N: DocumentNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    let mut current = Some(node);
    while let Some(c) = current {
        for sibling in split_siblings(c).1 {
            collect_descendant_or_self_nodes(sibling, seen, results);
        }
        current = c.parent();
    }
}

/// Everything before `node` in document order, excluding its ancestors.
pub fn collect_preceding_nodes<'a, N: DocumentNode<'a>>(
    node: N,
    seen: &mut HashSet<N>,
    results: &mut Vec<N>,
) {
    let mut current = Some(node);
    while let Some(c) = current {
        for sibling in split_siblings(c).0 {
            collect_descendant_or_self_nodes(sibling, seen, results);
        }
        current = c.parent();
    }
}

/// A built-in traversal for one context node.
pub type BuiltinAxis<N> = fn(N, &mut HashSet<N>, &mut Vec<N>);

/// Looks up a built-in named axis together with whether it is a reverse axis.
pub fn builtin_axis<'a, N: DocumentNode<'a>>(name: &str) -> Option<(BuiltinAxis<N>, bool)> {
    let collect: BuiltinAxis<N> = match name {
        "ancestor" => collect_ancestor_nodes::<N>,
        "ancestor-or-self" => collect_ancestor_or_self_nodes::<N>,
        "following-sibling" => collect_following_sibling_nodes::<N>,
        "preceding-sibling" => collect_preceding_sibling_nodes::<N>,
        "following" => collect_following_nodes::<N>,
        "preceding" => collect_preceding_nodes::<N>,
        "feature" => collect_feature_nodes::<N>,
        _ => return None,
    };
    let reverse = matches!(
        name,
        "ancestor" | "ancestor-or-self" | "preceding-sibling" | "preceding"
    );
    Some((collect, reverse))
}

/// Resolves the axes written as `name::` during evaluation.
pub trait AxisResolver<'a, N> {
    /// `Some(true)` for a reverse axis, `Some(false)` for a forward one and
    /// `None` when no axis has that name.
    fn is_reverse(&self, name: &str) -> Option<bool>;

    /// Adds the nodes `node` reaches along axis `name`.
    fn collect_nodes(&self, name: &str, node: N, seen: &mut HashSet<N>, results: &mut Vec<N>);
}

/// Collects the nodes one context node reaches along an axis.
pub type AxisCollector<'a, N> =
    Box<dyn Fn(N, &mut HashSet<N>, &mut Vec<N>) + Send + Sync + 'a>;

pub struct AxisDefinition<'a, N> {
    pub collect: AxisCollector<'a, N>,
    /// Reverse axes number their nodes in reverse document order.
    pub reverse: bool,
}

/// Named axes beyond the core set. Registered axes shadow built-ins.
pub struct AxisRegistry<'a, N> {
    axes: HashMap<String, AxisDefinition<'a, N>>,
    builtins: bool,
}

impl<'a, N: DocumentNode<'a> + 'a> AxisRegistry<'a, N> {
    /// A registry with no axes.
    pub fn new() -> Self {
        Self {
            axes: HashMap::new(),
            builtins: false,
        }
    }

    pub fn register<F>(&mut self, name: &str, reverse: bool, collect: F)
    where
        F: Fn(N, &mut HashSet<N>, &mut Vec<N>) + Send + Sync + 'a,
    {
        self.axes.insert(
            name.to_string(),
            AxisDefinition {
                collect: Box::new(collect),
                reverse,
            },
        );
    }
}

impl<'a, N: DocumentNode<'a> + 'a> Default for AxisRegistry<'a, N> {
    /// A registry resolving the built-in named axes.
    fn default() -> Self {
        Self {
            axes: HashMap::new(),
            builtins: true,
        }
    }
}

impl<'a, N: DocumentNode<'a> + 'a> AxisResolver<'a, N> for AxisRegistry<'a, N> {
    fn is_reverse(&self, name: &str) -> Option<bool> {
        match self.axes.get(name) {
            Some(definition) => Some(definition.reverse),
            None if self.builtins => builtin_axis::<N>(name).map(|(_, reverse)| reverse),
            None => None,
        }
    }

    fn collect_nodes(&self, name: &str, node: N, seen: &mut HashSet<N>, results: &mut Vec<N>) {
        if let Some(definition) = self.axes.get(name) {
            (definition.collect)(node, seen, results);
        } else if self.builtins
            && let Some((collect, _)) = builtin_axis::<N>(name)
        {
            collect(node, seen, results);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::tests::{MockNode, create_test_tree};

    fn collect<'a>(
        f: fn(MockNode<'a>, &mut HashSet<MockNode<'a>>, &mut Vec<MockNode<'a>>),
        node: MockNode<'a>,
    ) -> Vec<usize> {
        let mut seen = HashSet::new();
        let mut results = Vec::new();
        f(node, &mut seen, &mut results);
        results.into_iter().map(|n| n.id).collect()
    }

    #[test]
    fn test_collect_child() {
        let tree = create_test_tree();
        let page = MockNode { id: 2, tree: &tree };
        assert_eq!(collect(collect_child_nodes, page), vec![3, 7]);
    }

    #[test]
    fn test_collect_ancestor() {
        let tree = create_test_tree();
        let text = MockNode { id: 6, tree: &tree };
        assert_eq!(collect(collect_ancestor_nodes, text), vec![3, 2, 1, 0]);
        assert_eq!(
            collect(collect_ancestor_or_self_nodes, text),
            vec![6, 3, 2, 1, 0]
        );
    }

    #[test]
    fn test_collect_descendant_preorder() {
        let tree = create_test_tree();
        let document = MockNode { id: 1, tree: &tree };
        assert_eq!(
            collect(collect_descendant_nodes, document),
            vec![2, 3, 6, 7, 8, 9, 10, 11]
        );
    }

    #[test]
    fn test_collect_siblings() {
        let tree = create_test_tree();
        let first = MockNode { id: 3, tree: &tree };
        let second = MockNode { id: 7, tree: &tree };
        assert_eq!(collect(collect_following_sibling_nodes, first), vec![7]);
        assert_eq!(collect(collect_preceding_sibling_nodes, second), vec![3]);
        assert!(collect(collect_preceding_sibling_nodes, first).is_empty());
    }

    #[test]
    fn test_collect_following_preceding() {
        let tree = create_test_tree();
        let line = MockNode { id: 7, tree: &tree };
        assert_eq!(collect(collect_following_nodes, line), vec![9, 10, 11]);
        assert_eq!(collect(collect_preceding_nodes, line), vec![3, 6]);
    }

    #[test]
    fn test_collect_features() {
        let tree = create_test_tree();
        let line = MockNode { id: 3, tree: &tree };
        assert_eq!(collect(collect_feature_nodes, line), vec![4]);
        let other = MockNode { id: 7, tree: &tree };
        assert!(collect(collect_feature_nodes, other).is_empty());
    }

    #[test]
    fn test_siblings_of_a_feature() {
        let tree = create_test_tree();
        let feature = MockNode { id: 4, tree: &tree };
        assert!(collect(collect_preceding_sibling_nodes, feature).is_empty());
        assert!(collect(collect_following_sibling_nodes, feature).is_empty());
    }

    #[test]
    fn test_default_registry() {
        let registry: AxisRegistry<MockNode> = AxisRegistry::default();
        assert_eq!(registry.is_reverse("ancestor"), Some(true));
        assert_eq!(registry.is_reverse("feature"), Some(false));
        assert_eq!(registry.is_reverse("sideways"), None);
        assert_eq!(AxisRegistry::<MockNode>::new().is_reverse("ancestor"), None);
    }

    #[test]
    fn test_registered_axis_shadows_builtin() {
        let tree = create_test_tree();
        let mut registry: AxisRegistry<MockNode> = AxisRegistry::default();
        registry.register("ancestor", false, collect_child_nodes);
        registry.register("grandchild", false, |node, seen, results| {
            for child in node.children() {
                collect_child_nodes(child, seen, results);
            }
        });
        assert_eq!(registry.is_reverse("ancestor"), Some(false));

        let document = MockNode { id: 1, tree: &tree };
        let mut seen = HashSet::new();
        let mut results = Vec::new();
        registry.collect_nodes("grandchild", document, &mut seen, &mut results);
        assert_eq!(results.iter().map(|n| n.id).collect::<Vec<_>>(), vec![3, 7, 10]);
        results.clear();
        registry.collect_nodes("ancestor", document, &mut seen, &mut results);
        assert_eq!(results.iter().map(|n| n.id).collect::<Vec<_>>(), vec![2, 9]);
    }
}
