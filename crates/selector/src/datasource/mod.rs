//! Defines the core abstraction for a navigable, read-only document tree.
use std::hash::Hash;

/// A qualified name, consisting of an optional prefix and a local part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QName<'a> {
    pub prefix: Option<&'a str>,
    pub local_part: &'a str,
}

impl<'a> QName<'a> {
    /// Splits `prefix:local` at the first colon.
    pub fn parse(name: &'a str) -> Self {
        match name.split_once(':') {
            Some((prefix, local_part)) => QName {
                prefix: Some(prefix),
                local_part,
            },
            None => QName {
                prefix: None,
                local_part: name,
            },
        }
    }
}

/// The kind of a node in the document tree as selectors see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The document itself, parent of the root content node.
    Root,
    Content,
    /// One text fragment of a content node.
    Text,
    /// A feature attached to a content node, reached via the `feature` axis.
    Feature,
    /// A tag occurrence inside a feature.
    Tag,
    Attribute,
}

/// The universal contract for a node in a read-only document tree.
///
/// The selector engine is written exclusively against this trait. `Ord` must be
/// document order and `Eq`/`Hash` node identity.
///
/// `'a` is the lifetime of the underlying document.
pub trait DocumentNode<'a>:
    std::fmt::Debug + Clone + Copy + PartialEq + Eq + Hash + PartialOrd + Ord + 'a
{
    fn kind(&self) -> NodeKind;

    /// The qualified name of the node. Content nodes are named by their node
    /// type, features by their feature type, attributes by the attribute name.
    /// `None` for root, text and tag nodes.
    fn name(&self) -> Option<QName<'a>>;

    /// The unsplit node type string of a content node or feature.
    fn node_type(&self) -> Option<&'a str>;

    /// The string value: own text for content nodes, the fragment for text
    /// nodes, the value for attributes and tags.
    fn string_value(&self) -> String;

    /// An iterator over the attribute nodes of this node.
    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// An iterator over the child nodes of this node, in document order.
    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    fn parent(&self) -> Option<Self>;

    /// Features attached to a content node. Empty for every other kind.
    fn features(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        Box::new(std::iter::empty())
    }

    /// The node's text together with that of all descendant content nodes.
    fn all_text(&self, separator: &str) -> String {
        let mut pieces = Vec::new();
        let mut stack = vec![*self];
        while let Some(node) = stack.pop() {
            if node.kind() == NodeKind::Text {
                let text = node.string_value();
                if !text.is_empty() {
                    pieces.push(text);
                }
            }
            let children: Vec<Self> = node.children().collect();
            stack.extend(children.into_iter().rev());
        }
        pieces.join(separator)
    }

    /// Opaque access to extracted data linked to this node.
    fn data_value(&self, _name: &str) -> Option<String> {
        None
    }
}
