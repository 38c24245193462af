//! Schema-free response graph.
//!
//! Every XML element becomes a [`Node`]. A node is either a *leaf*, holding
//! the element's text, or an *object* holding attributes and named child
//! lists. Children with the same tag collect into one [`NodeList`] under the
//! tag's snake_case field name, so
//! `<Items><Item/><Item/></Items>` reads as `items[0].item[0..2]`.
//!
//! Node kinds are discovered at run time. A [`Schema`] registers each tag
//! the first time it is seen and hands back the same [`NodeKind`] afterwards.

use crate::error::{EcsError, Result};
use indexmap::IndexMap;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, LazyLock};

static CAMEL_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.+?)([A-Z][a-z]|[A-Z]+$)").unwrap());

/// Converts a CamelCase tag into a snake_case field name.
///
/// An underscore goes before every capital that starts a word and before a
/// trailing run of capitals. Tags without any lowercase letter are only
/// lower-cased, so `ASIN` becomes `asin`.
pub fn uncamelise(tag: &str) -> String {
    if !tag.chars().any(|c| c.is_ascii_lowercase()) {
        return tag.to_lowercase();
    }
    CAMEL_RUN.replace_all(tag, "${1}_${2}").to_lowercase()
}

/// Descriptor for one element tag seen in a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeKind {
    pub id: usize,
    pub tag: String,
    pub field: String,
}

/// Registry of node kinds, grown as responses are read.
#[derive(Debug, Default)]
pub struct Schema {
    kinds: HashMap<String, Arc<NodeKind>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the kind for `tag`, registering it on first sight.
    pub fn register(&mut self, tag: &str) -> Arc<NodeKind> {
        let next_id = self.kinds.len();
        self.kinds
            .entry(tag.to_string())
            .or_insert_with(|| {
                Arc::new(NodeKind { id: next_id, tag: tag.to_string(), field: uncamelise(tag) })
            })
            .clone()
    }

    pub fn lookup(&self, tag: &str) -> Option<Arc<NodeKind>> {
        self.kinds.get(tag).cloned()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.kinds.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Registers the kind of every node in `root`, e.g. after loading a
    /// persisted tree.
    pub fn absorb(&mut self, root: &Node) {
        if !root.tag.is_empty() {
            self.register(&root.tag);
        }
        for list in root.children.values() {
            for node in list.iter() {
                self.absorb(node);
            }
        }
    }
}

/// One materialized XML element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attrib: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    children: IndexMap<String, NodeList>,
}

impl Node {
    /// Creates an empty node for `tag`. The document root has an empty tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), ..Self::default() }
    }

    /// Original element tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Text of a leaf node.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Attribute by lower-cased name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrib.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn attrib(&self) -> &BTreeMap<String, String> {
        &self.attrib
    }

    /// Child list by field name, or `None` when the element had no such
    /// children.
    pub fn get(&self, name: &str) -> Option<&NodeList> {
        self.children.get(name)
    }

    /// Follows `names` through the first node of each list.
    pub fn path(&self, names: &[&str]) -> Option<&NodeList> {
        let (last, init) = names.split_last()?;
        let mut node = self;
        for name in init {
            node = node.get(name)?.first()?;
        }
        node.get(last)
    }

    /// Field names of the child lists, in document order.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &NodeList)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True when the node carries text and no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty() && self.value.is_some()
    }

    /// Integer value of a leaf.
    pub fn to_int(&self) -> Result<i64> {
        let text = self.value.as_deref().unwrap_or("").trim();
        text.parse().map_err(|_| EcsError::NotInteger(text.to_string()))
    }

    /// Plain JSON view: leaves become strings, single-element lists collapse
    /// to their element and longer lists become arrays.
    pub fn to_value(&self) -> serde_json::Value {
        use serde_json::{Map, Value};

        if self.children.is_empty() && self.attrib.is_empty() {
            return self.value.clone().map_or(Value::Null, Value::String);
        }

        let mut map = Map::new();
        if !self.attrib.is_empty() {
            let attrib = self.attrib.iter().map(|(k, v)| (k.clone(), Value::String(v.clone())));
            map.insert("attrib".to_string(), Value::Object(attrib.collect()));
        }
        if let Some(value) = &self.value {
            map.insert("value".to_string(), Value::String(value.clone()));
        }
        for (name, list) in &self.children {
            let entry = match list.single() {
                Some(only) => only.to_value(),
                None => Value::Array(list.iter().map(Node::to_value).collect()),
            };
            map.insert(name.clone(), entry);
        }
        Value::Object(map)
    }

    pub(crate) fn set_value(&mut self, value: String) {
        self.value = Some(value);
    }

    pub(crate) fn set_attr(&mut self, name: &str, value: String) {
        self.attrib.insert(name.to_lowercase(), value);
    }

    /// Appends `child` to the list named `field`.
    pub(crate) fn push_child(&mut self, field: &str, child: Node) {
        // Value is only meaningful for childless nodes.
        self.value = None;
        self.children.entry(field.to_string()).or_default().0.push(child);
    }
}

impl fmt::Display for Node {
    /// Leaves print their text; objects print one `name = value` line per
    /// property.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.children.is_empty() {
            return write!(f, "{}", self.value.as_deref().unwrap_or(""));
        }
        for (name, list) in &self.children {
            let rendered: Vec<String> = list.iter().map(ToString::to_string).collect();
            writeln!(f, "{} = {}", name, rendered.join(", "))?;
        }
        Ok(())
    }
}

/// Ordered list of sibling nodes sharing a tag.
///
/// A list of exactly one node forwards lookups, conversions and comparisons
/// to that node. For any other length the scalar conversions return
/// [`EcsError::NotScalar`], comparisons are false and lookups are `None`;
/// index into the list instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeList(Vec<Node>);

impl NodeList {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self(nodes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Node] {
        &self.0
    }

    pub fn first(&self) -> Option<&Node> {
        self.0.first()
    }

    /// Node at `index`.
    pub fn at(&self, index: usize) -> Option<&Node> {
        self.0.get(index)
    }

    /// The sole node, if the list holds exactly one.
    pub fn single(&self) -> Option<&Node> {
        match self.0.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Child lookup on the sole node.
    pub fn get(&self, name: &str) -> Option<&NodeList> {
        self.single()?.get(name)
    }

    /// Attribute of the sole node.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.single()?.attr(name)
    }

    /// Text of the sole node.
    pub fn value(&self) -> Option<&str> {
        self.single()?.value()
    }

    /// String form of the sole node.
    pub fn to_text(&self) -> Result<String> {
        self.single().map(ToString::to_string).ok_or(EcsError::NotScalar(self.len()))
    }

    /// Integer form of the sole node.
    pub fn to_int(&self) -> Result<i64> {
        self.single().ok_or(EcsError::NotScalar(self.len()))?.to_int()
    }

    /// Compares the sole node's text with `other`.
    pub fn eq_text(&self, other: &str) -> bool {
        self.value() == Some(other)
    }

    /// Matches the sole node's text against `pattern`.
    pub fn is_match(&self, pattern: &Regex) -> bool {
        self.value().is_some_and(|v| pattern.is_match(v))
    }

    pub fn into_vec(self) -> Vec<Node> {
        self.0
    }
}

impl std::ops::Index<usize> for NodeList {
    type Output = Node;

    fn index(&self, index: usize) -> &Node {
        &self.0[index]
    }
}

impl<'a> IntoIterator for &'a NodeList {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<Node>> for NodeList {
    fn from(nodes: Vec<Node>) -> Self {
        Self(nodes)
    }
}
