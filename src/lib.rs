//! Shading network model and the filter chain that rewrites it for a render backend.
//!
//! A [`Network`] is built elsewhere, then passed through a [`FilterChain`]:
//! each appended [`Filter`] mutates the same network in turn and may report
//! diagnostics into a shared, optional error list.

pub mod chain;
pub mod context;
pub mod error_sink;
pub mod graph;
pub mod network;
pub mod path;

pub use chain::{Filter, FilterChain, FilterChainReport, FnFilter, filter_fn};
pub use context::{
    ContextValues, FilterContext, context_values_from_json_str, load_context_values_from_path,
};
pub use error_sink::ErrorSink;
pub use network::{Connection, Network, Node, Value, load_network_from_path};
pub use path::NodePath;
