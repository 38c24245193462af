//! E-commerce service client: operations, transport, caching and the
//! schema-free response graph.

pub mod cache;
pub mod cart;
pub mod fault;
pub mod locale;
pub mod materialize;
pub mod node;
pub mod operation;
pub mod query;
pub mod request;
pub mod response;
pub mod transport;

pub use cache::Cache;
pub use cart::{Cart, CartItem, CartState};
pub use fault::{FaultKind, FaultRegistry, ServiceFault};
pub use locale::{localise, Endpoint, Locale};
pub use node::{uncamelise, Node, NodeKind, NodeList, Schema};
pub use operation::{params, Operation, OperationKind, Params, ResponseGroup};
pub use request::{PageCount, Request, SearchResult};
pub use response::Response;
pub use transport::{HttpTransport, Transport};
