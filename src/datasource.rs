//! Presents a [`Document`] to the selector engine as a navigable node tree.
//!
//! Besides content nodes the view exposes their text parts, features, tags and
//! attributes as nodes of their own, so selectors can address them directly.

use nodesel_model::{ContentNode, Document, Feature, NodeId, Tag};
use nodesel_selector::{DocumentNode, NodeKind, QName, format_number};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Attributes every content node carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeField {
    Id,
    NodeType,
    Index,
}

const NODE_FIELDS: [NodeField; 3] = [NodeField::Id, NodeField::NodeType, NodeField::Index];

impl NodeField {
    pub fn name(self) -> &'static str {
        match self {
            NodeField::Id => "id",
            NodeField::NodeType => "node_type",
            NodeField::Index => "index",
        }
    }

    fn read(self, node: &ContentNode) -> String {
        match self {
            NodeField::Id => node.id().index().to_string(),
            NodeField::NodeType => node.node_type().to_string(),
            NodeField::Index => node.index().to_string(),
        }
    }
}

/// Tag fields surfaced as attributes, when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagField {
    Value,
    Start,
    End,
    Confidence,
    Uuid,
    GroupUuid,
    ParentGroupUuid,
    Status,
    Note,
}

const TAG_FIELDS: [TagField; 9] = [
    TagField::Value,
    TagField::Start,
    TagField::End,
    TagField::Confidence,
    TagField::Uuid,
    TagField::GroupUuid,
    TagField::ParentGroupUuid,
    TagField::Status,
    TagField::Note,
];

impl TagField {
    pub fn name(self) -> &'static str {
        match self {
            TagField::Value => "value",
            TagField::Start => "start",
            TagField::End => "end",
            TagField::Confidence => "confidence",
            TagField::Uuid => "uuid",
            TagField::GroupUuid => "group_uuid",
            TagField::ParentGroupUuid => "parent_group_uuid",
            TagField::Status => "status",
            TagField::Note => "note",
        }
    }

    fn read(self, tag: &Tag) -> Option<String> {
        match self {
            TagField::Value => tag.value.clone(),
            TagField::Start => tag.start_pos.map(|p| p.to_string()),
            TagField::End => tag.end_pos.map(|p| p.to_string()),
            TagField::Confidence => tag.confidence.map(format_number),
            TagField::Uuid => tag.uuid.clone(),
            TagField::GroupUuid => tag.group_uuid.clone(),
            TagField::ParentGroupUuid => tag.parent_group_uuid.clone(),
            TagField::Status => tag.status.clone(),
            TagField::Note => tag.note.clone(),
        }
    }
}

/// Where a [`DocNode`] sits in the document. Feature, tag and part positions
/// are indices into the owning content node's vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Address {
    Root,
    Content(NodeId),
    Text(NodeId, usize),
    Feature(NodeId, usize),
    Tag(NodeId, usize, usize),
    NodeField(NodeId, NodeField),
    /// A tag field. `owned` fields hang off the tag node, the others are
    /// flattened onto the content node carrying the tag.
    TagField {
        node: NodeId,
        feature: usize,
        tag: usize,
        field: TagField,
        owned: bool,
    },
}

/// A node of the selector view over a borrowed [`Document`].
#[derive(Clone, Copy)]
pub struct DocNode<'a> {
    doc: &'a Document,
    at: Address,
}

impl<'a> DocNode<'a> {
    /// The virtual root above the document's root content node.
    pub fn root(doc: &'a Document) -> Self {
        Self {
            doc,
            at: Address::Root,
        }
    }

    pub fn content(doc: &'a Document, id: NodeId) -> Self {
        Self {
            doc,
            at: Address::Content(id),
        }
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// The id of a content node; `None` for every other kind.
    pub fn node_id(&self) -> Option<NodeId> {
        match self.at {
            Address::Content(id) => Some(id),
            _ => None,
        }
    }

    /// The content node this node is, or belongs to. `None` for the root.
    pub fn owner(&self) -> Option<NodeId> {
        match self.at {
            Address::Root => None,
            Address::Content(id)
            | Address::Text(id, _)
            | Address::Feature(id, _)
            | Address::Tag(id, _, _)
            | Address::NodeField(id, _)
            | Address::TagField { node: id, .. } => Some(id),
        }
    }

    fn at(&self, at: Address) -> Self {
        Self { doc: self.doc, at }
    }

    fn content_node(&self, id: NodeId) -> Option<&'a ContentNode> {
        self.doc.node(id)
    }

    fn feature(&self, id: NodeId, feature: usize) -> Option<&'a Feature> {
        self.content_node(id)?.features().get(feature)
    }

    fn tag(&self, id: NodeId, feature: usize, tag: usize) -> Option<&'a Tag> {
        self.feature(id, feature)?.tags.get(tag)
    }

    /// Attributes of every present field of one tag.
    fn tag_fields(&self, node: NodeId, feature: usize, tag: usize, owned: bool) -> Vec<Self> {
        let Some(t) = self.tag(node, feature, tag) else {
            return Vec::new();
        };
        TAG_FIELDS
            .iter()
            .filter(|field| field.read(t).is_some())
            .map(|&field| {
                self.at(Address::TagField {
                    node,
                    feature,
                    tag,
                    field,
                    owned,
                })
            })
            .collect()
    }

    /// Sort key realising document order: the owning content node's rank,
    /// then the node, its attributes, its text, its features and their tags.
    fn order_key(&self) -> (usize, u8, usize, usize, usize) {
        let rank = |id: NodeId| self.doc.document_order(id).saturating_add(1);
        match self.at {
            Address::Root => (0, 0, 0, 0, 0),
            Address::Content(id) => (rank(id), 0, 0, 0, 0),
            Address::NodeField(id, field) => (rank(id), 1, field as usize, 0, 0),
            Address::TagField {
                node,
                feature,
                tag,
                field,
                owned: false,
            } => (rank(node), 2, feature, tag, field as usize),
            Address::Text(id, part) => (rank(id), 3, part, 0, 0),
            Address::Feature(id, feature) => (rank(id), 4, feature, 0, 0),
            Address::Tag(id, feature, tag) => (rank(id), 4, feature, tag + 1, 0),
            Address::TagField {
                node,
                feature,
                tag,
                field,
                owned: true,
            } => (rank(node), 4, feature, tag + 1, field as usize + 1),
        }
    }

    fn boxed(nodes: Vec<Self>) -> Box<dyn Iterator<Item = Self> + 'a> {
        Box::new(nodes.into_iter())
    }
}

impl fmt::Debug for DocNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocNode({:?})", self.at)
    }
}

impl PartialEq for DocNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.at == other.at
    }
}

impl Eq for DocNode<'_> {}

impl Hash for DocNode<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.at.hash(state);
    }
}

impl PartialOrd for DocNode<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DocNode<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Nodes of different documents only need a consistent order.
        let doc_addr = |n: &Self| n.doc as *const Document as usize;
        doc_addr(self)
            .cmp(&doc_addr(other))
            .then_with(|| self.order_key().cmp(&other.order_key()))
    }
}

impl<'a> DocumentNode<'a> for DocNode<'a> {
    fn kind(&self) -> NodeKind {
        match self.at {
            Address::Root => NodeKind::Root,
            Address::Content(_) => NodeKind::Content,
            Address::Text(..) => NodeKind::Text,
            Address::Feature(..) => NodeKind::Feature,
            Address::Tag(..) => NodeKind::Tag,
            Address::NodeField(..) | Address::TagField { .. } => NodeKind::Attribute,
        }
    }

    fn name(&self) -> Option<QName<'a>> {
        match self.at {
            Address::Content(id) => self.content_node(id).map(|n| QName::parse(n.node_type())),
            Address::Feature(id, feature) => self
                .feature(id, feature)
                .map(|f| QName::parse(&f.feature_type)),
            Address::NodeField(_, field) => Some(QName::parse(field.name())),
            Address::TagField { field, .. } => Some(QName::parse(field.name())),
            Address::Root | Address::Text(..) | Address::Tag(..) => None,
        }
    }

    fn node_type(&self) -> Option<&'a str> {
        match self.at {
            Address::Content(id) => self.content_node(id).map(ContentNode::node_type),
            Address::Feature(id, feature) => {
                self.feature(id, feature).map(|f| f.feature_type.as_str())
            }
            _ => None,
        }
    }

    fn string_value(&self) -> String {
        match self.at {
            Address::Root => self.all_text(" "),
            Address::Content(id) => self
                .content_node(id)
                .map(ContentNode::text)
                .unwrap_or_default(),
            Address::Text(id, part) => self
                .content_node(id)
                .and_then(|n| n.parts().get(part))
                .map(|p| p.text.clone())
                .unwrap_or_default(),
            Address::Feature(id, feature) => self
                .feature(id, feature)
                .map(|f| {
                    f.tags
                        .iter()
                        .filter_map(|t| t.value.as_deref())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default(),
            Address::Tag(id, feature, tag) => {
                let Some(t) = self.tag(id, feature, tag) else {
                    return String::new();
                };
                match &t.value {
                    Some(value) => value.clone(),
                    // An unvalued tag reads as the text it covers.
                    None => self
                        .content_node(id)
                        .and_then(|n| t.covered(&n.text()).map(str::to_string))
                        .unwrap_or_default(),
                }
            }
            Address::NodeField(id, field) => self
                .content_node(id)
                .map(|n| field.read(n))
                .unwrap_or_default(),
            Address::TagField {
                node,
                feature,
                tag,
                field,
                ..
            } => self
                .tag(node, feature, tag)
                .and_then(|t| field.read(t))
                .unwrap_or_default(),
        }
    }

    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        let nodes = match self.at {
            Address::Content(id) => {
                let Some(node) = self.content_node(id) else {
                    return Self::boxed(Vec::new());
                };
                let mut attrs: Vec<Self> = NODE_FIELDS
                    .iter()
                    .map(|&field| self.at(Address::NodeField(id, field)))
                    .collect();
                for (f, feature) in node.features().iter().enumerate() {
                    for t in 0..feature.tags.len() {
                        attrs.extend(self.tag_fields(id, f, t, false));
                    }
                }
                attrs
            }
            Address::Tag(id, feature, tag) => self.tag_fields(id, feature, tag, true),
            _ => Vec::new(),
        };
        Self::boxed(nodes)
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        let nodes = match self.at {
            Address::Root => self
                .doc
                .root()
                .map(|root| vec![self.at(Address::Content(root))])
                .unwrap_or_default(),
            Address::Content(id) => match self.content_node(id) {
                Some(node) => (0..node.parts().len())
                    .map(|part| self.at(Address::Text(id, part)))
                    .chain(
                        node.children()
                            .iter()
                            .map(|&child| self.at(Address::Content(child))),
                    )
                    .collect(),
                None => Vec::new(),
            },
            Address::Feature(id, feature) => match self.feature(id, feature) {
                Some(f) => (0..f.tags.len())
                    .map(|tag| self.at(Address::Tag(id, feature, tag)))
                    .collect(),
                None => Vec::new(),
            },
            _ => Vec::new(),
        };
        Self::boxed(nodes)
    }

    fn parent(&self) -> Option<Self> {
        match self.at {
            Address::Root => None,
            Address::Content(id) => match self.doc.parent(id) {
                Some(parent) => Some(self.at(Address::Content(parent))),
                None if self.doc.root() == Some(id) => Some(self.at(Address::Root)),
                None => None,
            },
            Address::Text(id, _)
            | Address::Feature(id, _)
            | Address::NodeField(id, _)
            | Address::TagField {
                node: id,
                owned: false,
                ..
            } => Some(self.at(Address::Content(id))),
            Address::Tag(id, feature, _) => Some(self.at(Address::Feature(id, feature))),
            Address::TagField {
                node,
                feature,
                tag,
                owned: true,
                ..
            } => Some(self.at(Address::Tag(node, feature, tag))),
        }
    }

    fn features(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        let nodes = match self.at {
            Address::Content(id) => (0..self.doc.features(id).len())
                .map(|feature| self.at(Address::Feature(id, feature)))
                .collect(),
            _ => Vec::new(),
        };
        Self::boxed(nodes)
    }

    fn all_text(&self, separator: &str) -> String {
        match self.at {
            Address::Root => self
                .doc
                .root()
                .map(|root| self.doc.all_text(root, separator))
                .unwrap_or_default(),
            Address::Content(id) => self.doc.all_text(id, separator),
            _ => self.string_value(),
        }
    }

    /// The first data attribute named `name` whose provenance tag sits on
    /// this content node.
    fn data_value(&self, name: &str) -> Option<String> {
        let id = self.node_id()?;
        self.doc
            .data_attributes_for(id)
            .find(|attr| attr.tag == name)
            .map(|attr| attr.value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodesel_model::{AttributeValue, DataAttribute, Taxonomy};

    /// `document > (line "Acme Corp" tagged ORG, line "Invoice 42")`
    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let root = doc.create_root("document", None).unwrap();
        let first = doc.add_child(root, "line", Some("Acme Corp")).unwrap();
        let second = doc.add_child(root, "line", Some("Invoice 42")).unwrap();
        let tag_ref = doc
            .tag(
                first,
                "ORG",
                Tag::spanning(0, 4).unwrap().with_confidence(0.92),
            )
            .unwrap();
        let taxonomy = doc.add_taxonomy(Taxonomy::new("invoices", "Invoices"));
        let object = doc.add_data_object(None, Some(taxonomy)).unwrap();
        doc.add_data_attribute(
            object,
            DataAttribute::new("vendor", AttributeValue::String("Acme".into())).from_tag(tag_ref),
        )
        .unwrap();
        (doc, root, first, second)
    }

    #[test]
    fn test_navigation() {
        let (doc, root, first, _) = sample();
        let top = DocNode::root(&doc);
        assert_eq!(top.kind(), NodeKind::Root);
        let children: Vec<_> = top.children().collect();
        assert_eq!(children, vec![DocNode::content(&doc, root)]);
        assert_eq!(children[0].parent(), Some(top));

        let line = DocNode::content(&doc, first);
        let kids: Vec<_> = line.children().collect();
        assert_eq!(kids.len(), 1);
        assert_eq!(kids[0].kind(), NodeKind::Text);
        assert_eq!(kids[0].string_value(), "Acme Corp");
        assert_eq!(kids[0].parent(), Some(line));
    }

    #[test]
    fn test_feature_and_tag_nodes() {
        let (doc, _, first, _) = sample();
        let line = DocNode::content(&doc, first);
        let features: Vec<_> = line.features().collect();
        assert_eq!(features.len(), 1);
        let feature = features[0];
        assert_eq!(
            feature.name(),
            Some(QName {
                prefix: Some("tag"),
                local_part: "ORG"
            })
        );
        let tags: Vec<_> = feature.children().collect();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].kind(), NodeKind::Tag);
        // No value: the tag reads as the text it covers.
        assert_eq!(tags[0].string_value(), "Acme");
        assert_eq!(tags[0].parent(), Some(feature));
        assert_eq!(feature.parent(), Some(line));
    }

    #[test]
    fn test_attributes() {
        let (doc, _, first, second) = sample();
        let line = DocNode::content(&doc, first);
        let attrs: Vec<(String, String)> = line
            .attributes()
            .map(|a| {
                (
                    a.name().map(|q| q.local_part).unwrap_or_default().to_string(),
                    a.string_value(),
                )
            })
            .collect();
        assert_eq!(
            attrs,
            vec![
                ("id".to_string(), first.index().to_string()),
                ("node_type".to_string(), "line".to_string()),
                ("index".to_string(), "0".to_string()),
                ("start".to_string(), "0".to_string()),
                ("end".to_string(), "4".to_string()),
                ("confidence".to_string(), "0.92".to_string()),
            ]
        );
        let other = DocNode::content(&doc, second);
        assert_eq!(other.attributes().count(), 3);
    }

    #[test]
    fn test_document_order() {
        let (doc, root, first, second) = sample();
        let top = DocNode::root(&doc);
        let document = DocNode::content(&doc, root);
        let line = DocNode::content(&doc, first);
        let attr = line.attributes().next().unwrap();
        let text = line.children().next().unwrap();
        let feature = line.features().next().unwrap();
        let tag = feature.children().next().unwrap();
        let next_line = DocNode::content(&doc, second);

        let mut nodes = vec![next_line, tag, feature, text, attr, line, document, top];
        nodes.sort();
        assert_eq!(
            nodes,
            vec![top, document, line, attr, text, feature, tag, next_line]
        );
    }

    #[test]
    fn test_data_value() {
        let (doc, _, first, second) = sample();
        assert_eq!(
            DocNode::content(&doc, first).data_value("vendor"),
            Some("Acme".to_string())
        );
        assert_eq!(DocNode::content(&doc, first).data_value("total"), None);
        assert_eq!(DocNode::content(&doc, second).data_value("vendor"), None);
    }

    #[test]
    fn test_identity_is_per_document() {
        let (a, root, ..) = sample();
        let (b, ..) = sample();
        assert_eq!(DocNode::content(&a, root), DocNode::content(&a, root));
        assert_ne!(DocNode::content(&a, root), DocNode::content(&b, root));
        assert_eq!(
            DocNode::content(&a, root).owner(),
            DocNode::content(&b, root).owner()
        );
    }
}
