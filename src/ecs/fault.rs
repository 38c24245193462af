//! Service fault mapping.
//!
//! The service reports problems as `<Errors><Error><Code/><Message/></Error></Errors>`
//! blocks at several depths of an otherwise normal response. Each distinct
//! fault code is registered as a [`FaultKind`] the first time it is seen, so
//! callers can compare kinds by identity without a fixed list of codes.

use crate::ecs::node::{Node, NodeList};
use crate::error::{EcsError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// One class of service fault, e.g. `InvalidParameterValue`.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct FaultKind {
    pub id: usize,
    pub name: String,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A fault reported by the service.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ServiceFault {
    pub kind: Arc<FaultKind>,
    pub message: String,
}

impl ServiceFault {
    /// Fault kind name, e.g. `InvalidParameterValue`.
    pub fn name(&self) -> &str {
        &self.kind.name
    }

    /// Returns true if this fault is of `kind`.
    pub fn is(&self, kind: &Arc<FaultKind>) -> bool {
        Arc::ptr_eq(&self.kind, kind)
    }
}

/// Strips the `AWS...` namespace from a fault code.
///
/// `AWS.ECommerceService.NoExactMatches` becomes `NoExactMatches`; codes not
/// starting with `AWS` are kept whole.
pub fn fault_kind_name(code: &str) -> &str {
    if !code.starts_with("AWS") {
        return code;
    }
    match code.rfind('.') {
        Some(dot) => &code[dot + 1..],
        None => code,
    }
}

/// Fault kinds seen so far.
#[derive(Debug, Default)]
pub struct FaultRegistry {
    kinds: HashMap<String, Arc<FaultKind>>,
}

impl FaultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the kind for `code`, registering it on first sight.
    pub fn register(&mut self, code: &str) -> Arc<FaultKind> {
        let name = fault_kind_name(code);
        let next_id = self.kinds.len();
        self.kinds
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Registering fault kind {}", name);
                Arc::new(FaultKind { id: next_id, name: name.to_string() })
            })
            .clone()
    }

    /// Kind registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<Arc<FaultKind>> {
        self.kinds.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Builds the fault for `code` and `message`.
    pub fn fault(&mut self, code: &str, message: &str) -> ServiceFault {
        ServiceFault { kind: self.register(code), message: message.to_string() }
    }

    /// Fails with the first `errors/error` found directly below `container`.
    /// A missing container is not an error.
    pub fn check(&mut self, container: Option<&Node>) -> Result<()> {
        let Some(error) = container
            .and_then(|node| node.path(&["errors", "error"]))
            .and_then(|list| list.first())
        else {
            return Ok(());
        };
        Err(self.raise(error))
    }

    fn raise(&mut self, error: &Node) -> EcsError {
        let code = error.get("code").and_then(|c| c.value()).unwrap_or("");
        let message = error.get("message").and_then(|m| m.value()).unwrap_or("");
        EcsError::Service(self.fault(code, message))
    }

    /// Fails when the response is an error document: a lone `<Error>` in
    /// place of any results, as sent for a rejected key or signature.
    fn check_error_response(&mut self, response: &Node) -> Result<()> {
        match response.get("error").and_then(|l| l.first()) {
            Some(error) => Err(self.raise(error)),
            None => Ok(()),
        }
    }

    /// Checks every place a first page can carry a fault.
    ///
    /// `document` is the materialized root. For a combined operation the
    /// result sets sit one level deeper, below each sub-response.
    pub fn check_document(&mut self, document: &Node, multiple: bool) -> Result<()> {
        self.check(Some(document))?;

        let Some(response) = response_element(document) else {
            return Ok(());
        };
        self.check_error_response(response)?;
        self.check(response.get("operation_request").and_then(|l| l.first()))?;

        if multiple {
            for sub in result_sets(response).filter_map(|list| list.first()) {
                self.check_result_sets(sub)?;
            }
            Ok(())
        } else {
            self.check_result_sets(response)
        }
    }

    /// Checks a follow-up page at the operation-request and request levels.
    pub fn check_page(&mut self, document: &Node) -> Result<()> {
        let Some(response) = response_element(document) else {
            return Ok(());
        };
        self.check_error_response(response)?;
        self.check(response.get("operation_request").and_then(|l| l.first()))?;
        let first_set = result_sets(response).next().and_then(|l| l.first());
        self.check(first_set.and_then(|set| set.get("request")).and_then(|l| l.first()))
    }

    /// Checks the request of the first result set and, for a batched
    /// operation, of the second.
    fn check_result_sets(&mut self, response: &Node) -> Result<()> {
        let Some(sets) = result_sets(response).next() else {
            return Ok(());
        };
        for set in sets.iter().take(2) {
            self.check(set.get("request").and_then(|l| l.first()))?;
        }
        Ok(())
    }
}

/// The outermost element of a response document.
pub(crate) fn response_element(document: &Node) -> Option<&Node> {
    document.children().next().and_then(|(_, list)| list.first())
}

/// Child lists of a response other than its echoed operation request.
pub(crate) fn result_sets(response: &Node) -> impl Iterator<Item = &NodeList> {
    response.children().filter(|(name, _)| *name != "operation_request").map(|(_, list)| list)
}
