//! amz-ecs - Schema-free client for the Amazon E-Commerce Service
//!
//! Typed operations go in, XML comes back and is materialized into a
//! generic node graph, with an optional disk cache in between and a
//! driver for remote shopping carts on top.

pub mod commands;
pub mod config;
pub mod ecs;
pub mod error;
pub mod format;

pub use config::Config;
pub use ecs::{
    Cart, Locale, Node, NodeList, Operation, OperationKind, PageCount, Request, Response,
    ResponseGroup, SearchResult,
};
pub use error::{EcsError, HttpError, Result};
