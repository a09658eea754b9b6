//! The arena-backed document tree.
//!
//! All cross references are typed indices into the arenas owned by [`Document`];
//! a node's `parent` is a non-owning back reference while `children` is the
//! owning, ordered list.

use crate::data::{DataAttribute, DataObject, Taxonomy, TagRef};
use crate::error::ModelError;
use crate::feature::{Feature, TAG_NAMESPACE, Tag};
use crate::ids::{DataObjectId, NodeId, TaxonomyId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// A fragment of a node's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPart {
    /// Byte offset of this fragment within the node's concatenated text.
    pub offset: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentNode {
    pub(crate) id: NodeId,
    pub(crate) node_type: String,
    pub(crate) index: usize,
    #[serde(default)]
    pub(crate) parts: Vec<ContentPart>,
    #[serde(default)]
    pub(crate) parent: Option<NodeId>,
    #[serde(default)]
    pub(crate) children: Vec<NodeId>,
    #[serde(default)]
    pub(crate) features: Vec<Feature>,
}

impl ContentNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    /// Position of this node among its siblings.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn parts(&self) -> &[ContentPart] {
        &self.parts
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// The concatenation of this node's content parts.
    pub fn text(&self) -> String {
        self.parts.iter().map(|p| p.text.as_str()).collect()
    }

    fn text_len(&self) -> usize {
        self.parts.iter().map(|p| p.text.len()).sum()
    }

    pub fn feature(&self, feature_type: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.feature_type == feature_type)
    }

    /// All tags recorded under `tag:<name>`.
    pub fn tags(&self, name: &str) -> impl Iterator<Item = &Tag> {
        self.features
            .iter()
            .filter(move |f| f.namespace() == Some(TAG_NAMESPACE) && f.name() == name)
            .flat_map(|f| f.tags.iter())
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags(name).next().is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    nodes: Vec<ContentNode>,
    #[serde(default)]
    root: Option<NodeId>,
    #[serde(default)]
    data_objects: Vec<DataObject>,
    #[serde(default)]
    taxonomies: Vec<Taxonomy>,
    /// Pre-order rank of every node; rebuilt lazily after structural edits.
    #[serde(skip)]
    order: OnceLock<Vec<usize>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// A document holding a single `text` root node with the given content.
    pub fn from_text(text: &str) -> Self {
        let mut doc = Self::new();
        doc.nodes.push(ContentNode {
            id: NodeId::new(0),
            node_type: "text".to_string(),
            index: 0,
            parts: vec![ContentPart {
                offset: 0,
                text: text.to_string(),
            }],
            parent: None,
            children: Vec::new(),
            features: Vec::new(),
        });
        doc.root = Some(NodeId::new(0));
        doc
    }

    // --- Building ---

    pub fn create_root(
        &mut self,
        node_type: &str,
        content: Option<&str>,
    ) -> Result<NodeId, ModelError> {
        if self.root.is_some() {
            return Err(ModelError::RootAlreadySet);
        }
        let id = self.push_node(node_type, None, 0, content);
        self.root = Some(id);
        Ok(id)
    }

    pub fn add_child(
        &mut self,
        parent: NodeId,
        node_type: &str,
        content: Option<&str>,
    ) -> Result<NodeId, ModelError> {
        let index = self.node(parent).ok_or(ModelError::UnknownNode(parent))?.children.len();
        let id = self.push_node(node_type, Some(parent), index, content);
        self.nodes[parent.index()].children.push(id);
        Ok(id)
    }

    fn push_node(
        &mut self,
        node_type: &str,
        parent: Option<NodeId>,
        index: usize,
        content: Option<&str>,
    ) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        let parts = content
            .map(|text| {
                vec![ContentPart {
                    offset: 0,
                    text: text.to_string(),
                }]
            })
            .unwrap_or_default();
        self.nodes.push(ContentNode {
            id,
            node_type: node_type.to_string(),
            index,
            parts,
            parent,
            children: Vec::new(),
            features: Vec::new(),
        });
        self.order.take();
        id
    }

    /// Appends a text fragment to the node's content.
    pub fn add_content_part(&mut self, node: NodeId, text: &str) -> Result<(), ModelError> {
        let target = self
            .nodes
            .get_mut(node.index())
            .ok_or(ModelError::UnknownNode(node))?;
        let offset = target.text_len();
        target.parts.push(ContentPart {
            offset,
            text: text.to_string(),
        });
        Ok(())
    }

    /// Attaches a feature, merging into an existing feature of the same type.
    /// Returns the feature's index on the node.
    pub fn add_feature(&mut self, node: NodeId, feature: Feature) -> Result<usize, ModelError> {
        let target = self
            .nodes
            .get_mut(node.index())
            .ok_or(ModelError::UnknownNode(node))?;
        let text_len = target.text_len();
        for tag in &feature.tags {
            tag.check_span(text_len)?;
        }
        if let Some(pos) = target
            .features
            .iter()
            .position(|f| f.feature_type == feature.feature_type)
        {
            let existing = &mut target.features[pos];
            existing.tags.extend(feature.tags);
            existing.bboxes.extend(feature.bboxes);
            if feature.payload.is_some() {
                existing.payload = feature.payload;
            }
            return Ok(pos);
        }
        target.features.push(feature);
        Ok(target.features.len() - 1)
    }

    /// Records a tag occurrence under the `tag:<name>` feature of `node`.
    pub fn tag(&mut self, node: NodeId, name: &str, tag: Tag) -> Result<TagRef, ModelError> {
        let feature = self.add_feature(node, Feature::of(TAG_NAMESPACE, name).with_tag(tag))?;
        let tag_index = self.nodes[node.index()].features[feature].tags.len() - 1;
        log::trace!("Tagged {node} with '{name}' (feature {feature}, tag {tag_index})");
        Ok(TagRef {
            node,
            feature,
            tag: tag_index,
        })
    }

    pub fn add_taxonomy(&mut self, taxonomy: Taxonomy) -> TaxonomyId {
        self.taxonomies.push(taxonomy);
        TaxonomyId::new(self.taxonomies.len() - 1)
    }

    pub fn add_data_object(
        &mut self,
        parent: Option<DataObjectId>,
        taxonomy: Option<TaxonomyId>,
    ) -> Result<DataObjectId, ModelError> {
        if let Some(p) = parent
            && p.index() >= self.data_objects.len()
        {
            return Err(ModelError::UnknownDataObject(p));
        }
        if let Some(t) = taxonomy
            && t.index() >= self.taxonomies.len()
        {
            return Err(ModelError::UnknownTaxonomy(t));
        }
        let id = DataObjectId::new(self.data_objects.len());
        self.data_objects.push(DataObject {
            id,
            parent,
            children: Vec::new(),
            taxonomy,
            path: None,
            group_uuid: None,
            attributes: Vec::new(),
        });
        if let Some(p) = parent {
            self.data_objects[p.index()].children.push(id);
        }
        Ok(id)
    }

    pub fn add_data_attribute(
        &mut self,
        object: DataObjectId,
        attribute: DataAttribute,
    ) -> Result<(), ModelError> {
        if let Some(tag_ref) = attribute.provenance {
            self.resolve_tag(tag_ref)?;
        }
        self.data_objects
            .get_mut(object.index())
            .ok_or(ModelError::UnknownDataObject(object))?
            .attributes
            .push(attribute);
        Ok(())
    }

    // --- Reading ---

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&ContentNode> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> &[ContentNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |n| n.children.as_slice())
    }

    pub fn node_type(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| n.node_type.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<String> {
        self.node(id).map(ContentNode::text)
    }

    /// The node's own text followed by that of all descendants in document
    /// order, empty fragments skipped.
    pub fn all_text(&self, id: NodeId, separator: &str) -> String {
        let mut pieces = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            let text = node.text();
            if !text.is_empty() {
                pieces.push(text);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        pieces.join(separator)
    }

    pub fn features(&self, id: NodeId) -> &[Feature] {
        self.node(id).map_or(&[], |n| n.features.as_slice())
    }

    pub fn resolve_tag(&self, tag_ref: TagRef) -> Result<&Tag, ModelError> {
        self.node(tag_ref.node)
            .ok_or(ModelError::UnknownNode(tag_ref.node))?
            .features
            .get(tag_ref.feature)
            .and_then(|f| f.tags.get(tag_ref.tag))
            .ok_or_else(|| {
                ModelError::Inconsistent(format!(
                    "{} has no tag {}/{}",
                    tag_ref.node, tag_ref.feature, tag_ref.tag
                ))
            })
    }

    pub fn data_object(&self, id: DataObjectId) -> Option<&DataObject> {
        self.data_objects.get(id.index())
    }

    pub fn data_object_mut(&mut self, id: DataObjectId) -> Option<&mut DataObject> {
        self.data_objects.get_mut(id.index())
    }

    pub fn data_objects(&self) -> &[DataObject] {
        &self.data_objects
    }

    pub fn taxonomy(&self, id: TaxonomyId) -> Option<&Taxonomy> {
        self.taxonomies.get(id.index())
    }

    pub fn taxonomies(&self) -> &[Taxonomy] {
        &self.taxonomies
    }

    /// Data attributes whose provenance tag sits on `node`.
    pub fn data_attributes_for(&self, node: NodeId) -> impl Iterator<Item = &DataAttribute> {
        self.data_objects
            .iter()
            .flat_map(|obj| obj.attributes.iter())
            .filter(move |attr| attr.provenance.is_some_and(|p| p.node == node))
    }

    /// Pre-order rank of the node; nodes detached from the root sort last.
    pub fn document_order(&self, id: NodeId) -> usize {
        self.order().get(id.index()).copied().unwrap_or(usize::MAX)
    }

    fn order(&self) -> &[usize] {
        self.order.get_or_init(|| {
            let mut ranks = vec![usize::MAX; self.nodes.len()];
            let mut next = 0;
            let mut stack: Vec<NodeId> = self.root.into_iter().collect();
            while let Some(id) = stack.pop() {
                let Some(node) = self.nodes.get(id.index()) else {
                    continue;
                };
                if ranks[id.index()] != usize::MAX {
                    continue;
                }
                ranks[id.index()] = next;
                next += 1;
                stack.extend(node.children.iter().rev().copied());
            }
            for rank in ranks.iter_mut().filter(|r| **r == usize::MAX) {
                *rank = next;
                next += 1;
            }
            ranks
        })
    }

    // --- Interchange ---

    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads a document and checks that every arena reference resolves.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let doc: Document = serde_json::from_str(json)?;
        doc.validate()?;
        log::debug!(
            "Loaded document with {} content nodes and {} data objects",
            doc.nodes.len(),
            doc.data_objects.len()
        );
        Ok(doc)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if let Some(root) = self.root {
            let node = self.node(root).ok_or(ModelError::UnknownNode(root))?;
            if node.parent.is_some() {
                return Err(ModelError::Inconsistent(format!("root {root} has a parent")));
            }
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if node.id.index() != i {
                return Err(ModelError::Inconsistent(format!(
                    "node at slot {i} claims id {}",
                    node.id
                )));
            }
            if let Some(parent) = node.parent {
                let p = self.node(parent).ok_or(ModelError::UnknownNode(parent))?;
                if !p.children.contains(&node.id) {
                    return Err(ModelError::Inconsistent(format!(
                        "{} is not listed as a child of {parent}",
                        node.id
                    )));
                }
            }
            for (k, &child) in node.children.iter().enumerate() {
                if node.children[..k].contains(&child) {
                    return Err(ModelError::Inconsistent(format!(
                        "{child} is listed twice under {}",
                        node.id
                    )));
                }
                let c = self.node(child).ok_or(ModelError::UnknownNode(child))?;
                if c.parent != Some(node.id) {
                    return Err(ModelError::Inconsistent(format!(
                        "{child} does not point back to {}",
                        node.id
                    )));
                }
            }
            let text_len = node.text_len();
            for tag in node.features.iter().flat_map(|f| f.tags.iter()) {
                tag.check_span(text_len)?;
            }
        }
        self.check_acyclic()?;
        for (i, obj) in self.data_objects.iter().enumerate() {
            if obj.id.index() != i {
                return Err(ModelError::Inconsistent(format!(
                    "data object at slot {i} claims id {}",
                    obj.id
                )));
            }
            for id in obj.parent.iter().chain(obj.children.iter()) {
                if self.data_object(*id).is_none() {
                    return Err(ModelError::UnknownDataObject(*id));
                }
            }
            if let Some(t) = obj.taxonomy
                && self.taxonomy(t).is_none()
            {
                return Err(ModelError::UnknownTaxonomy(t));
            }
            for attr in &obj.attributes {
                if let Some(tag_ref) = attr.provenance {
                    self.resolve_tag(tag_ref)?;
                }
            }
        }
        Ok(())
    }

    /// Fails when following parent links from some node returns to it.
    /// Parent ids must already be known to resolve.
    fn check_acyclic(&self) -> Result<(), ModelError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Walk {
            Unseen,
            OnChain,
            ReachesTop,
        }

        let mut state = vec![Walk::Unseen; self.nodes.len()];
        for start in 0..self.nodes.len() {
            let mut chain = Vec::new();
            let mut at = Some(NodeId::new(start));
            while let Some(id) = at {
                match state[id.index()] {
                    Walk::ReachesTop => break,
                    Walk::OnChain => {
                        return Err(ModelError::Inconsistent(format!(
                            "{id} is its own ancestor"
                        )));
                    }
                    Walk::Unseen => {}
                }
                state[id.index()] = Walk::OnChain;
                chain.push(id);
                at = self.nodes.get(id.index()).and_then(|n| n.parent);
            }
            for id in chain {
                state[id.index()] = Walk::ReachesTop;
            }
        }
        Ok(())
    }
}
