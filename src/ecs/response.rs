//! A materialized service response.

use crate::ecs::fault::{response_element, result_sets};
use crate::ecs::node::{uncamelise, Node, NodeList};
use crate::error::{EcsError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// One page of results, tagged with the operation that produced it.
///
/// Dereferences to the document root, so `response.get("item_search_response")`
/// starts the walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    operation: String,
    root: Node,
}

impl Response {
    pub fn new(operation: impl Into<String>, root: Node) -> Self {
        Self { operation: operation.into(), root }
    }

    /// The `Operation` label the response answers, e.g. `ItemSearch`.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn into_root(self) -> Node {
        self.root
    }

    /// The outermost response element, e.g. `<ItemSearchResponse>`.
    pub fn response_element(&self) -> Option<&Node> {
        response_element(&self.root)
    }

    /// Number of result pages the service reports, 1 if it says nothing.
    pub fn total_pages(&self) -> u32 {
        self.response_element()
            .and_then(|response| result_sets(response).next())
            .and_then(NodeList::first)
            .and_then(|set| set.get("total_pages"))
            .and_then(|pages| pages.to_int().ok())
            .and_then(|pages| u32::try_from(pages).ok())
            .unwrap_or(1)
    }

    /// Shortcut to the records most callers want.
    ///
    /// For `ItemSearch` this is `item_search_response[0].items[0].item`;
    /// other operations follow the same naming pattern. Operations whose
    /// responses do not fit it fail with [`EcsError::Kernel`].
    pub fn kernel(&self) -> Result<&NodeList> {
        let stub = uncamelise(&self.operation);
        let outer = format!("{}_response", stub);
        let record = match stub.rfind('_') {
            Some(cut) => stub[..cut].to_string(),
            None => stub.clone(),
        };
        let collection = format!("{}s", record);
        let path = format!("{}.{}.{}", outer, collection, record);

        let missing = |step: &str| EcsError::Kernel { path: path.clone(), missing: step.to_string() };

        let outer_node = self.root.get(&outer).and_then(NodeList::first).ok_or_else(|| missing(&outer))?;
        let collection_node =
            outer_node.get(&collection).and_then(NodeList::first).ok_or_else(|| missing(&collection))?;
        collection_node.get(&record).ok_or_else(|| missing(&record))
    }
}

impl Deref for Response {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.root
    }
}
