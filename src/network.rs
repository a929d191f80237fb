use std::collections::{BTreeMap, HashMap};
use std::fmt;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::path::NodePath;

/// Parameter values carried by nodes and by the filter context.
pub type Value = serde_json::Value;

/// Reference to an output port of an upstream node.
///
/// The upstream node is not required to exist in the network.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    #[serde(rename = "upstreamNode")]
    pub upstream_node: NodePath,
    #[serde(rename = "upstreamOutput")]
    pub upstream_output: String,
}

impl Connection {
    pub fn new(upstream_node: NodePath, upstream_output: impl Into<String>) -> Self {
        Self {
            upstream_node,
            upstream_output: upstream_output.into(),
        }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.upstream_node, self.upstream_output)
    }
}

/// One shader instance in a network.
///
/// A single input may bind several upstream outputs; their order is the
/// array-element order.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Node {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    #[serde(default, rename = "inputConnections")]
    pub input_connections: BTreeMap<String, Vec<Connection>>,
}

impl Node {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            ..Default::default()
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn with_connection(mut self, input: impl Into<String>, connection: Connection) -> Self {
        self.push_connection(input, connection);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.parameters.insert(name.into(), value)
    }

    pub fn remove_parameter(&mut self, name: &str) -> Option<Value> {
        self.parameters.remove(name)
    }

    /// Connections bound to `input`, in array order. Empty if unconnected.
    pub fn connections(&self, input: &str) -> &[Connection] {
        self.input_connections
            .get(input)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn push_connection(&mut self, input: impl Into<String>, connection: Connection) {
        self.input_connections
            .entry(input.into())
            .or_default()
            .push(connection);
    }

    /// Inserts at `index`, clamped to the current length of the sequence.
    pub fn insert_connection(
        &mut self,
        input: impl Into<String>,
        index: usize,
        connection: Connection,
    ) {
        let conns = self.input_connections.entry(input.into()).or_default();
        let index = index.min(conns.len());
        conns.insert(index, connection);
    }

    /// Removes the connection at `index`. An input left with no connections
    /// is dropped from the map.
    pub fn remove_connection(&mut self, input: &str, index: usize) -> Option<Connection> {
        let conns = self.input_connections.get_mut(input)?;
        if index >= conns.len() {
            return None;
        }
        let removed = conns.remove(index);
        if conns.is_empty() {
            self.input_connections.remove(input);
        }
        Some(removed)
    }

    pub fn clear_connections(&mut self, input: &str) -> Vec<Connection> {
        self.input_connections.remove(input).unwrap_or_default()
    }
}

/// Mutable shading network handed from filter to filter.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Network {
    #[serde(default)]
    pub nodes: BTreeMap<NodePath, Node>,
    #[serde(default)]
    pub terminals: BTreeMap<String, Connection>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.terminals.is_empty()
    }

    /// Inserts or replaces the node at `path`, returning the previous one.
    pub fn insert_node(&mut self, path: NodePath, node: Node) -> Option<Node> {
        self.nodes.insert(path, node)
    }

    /// Removes only the node. Connections that referenced it are left as they are.
    pub fn remove_node(&mut self, path: &NodePath) -> Option<Node> {
        self.nodes.remove(path)
    }

    pub fn node(&self, path: &NodePath) -> Option<&Node> {
        self.nodes.get(path)
    }

    pub fn node_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        self.nodes.get_mut(path)
    }

    pub fn contains_node(&self, path: &NodePath) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&NodePath, &Node)> {
        self.nodes.iter()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = (&NodePath, &mut Node)> {
        self.nodes.iter_mut()
    }

    pub fn set_terminal(
        &mut self,
        name: impl Into<String>,
        connection: Connection,
    ) -> Option<Connection> {
        self.terminals.insert(name.into(), connection)
    }

    pub fn remove_terminal(&mut self, name: &str) -> Option<Connection> {
        self.terminals.remove(name)
    }

    pub fn terminal(&self, name: &str) -> Option<&Connection> {
        self.terminals.get(name)
    }

    pub fn terminals(&self) -> impl Iterator<Item = (&String, &Connection)> {
        self.terminals.iter()
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("failed to parse network json")
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize network json")
    }
}

pub fn load_network_from_path(path: impl AsRef<std::path::Path>) -> Result<Network> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read network json at {}", path.display()))?;
    Network::from_json_str(&text)
        .with_context(|| format!("invalid network json at {}", path.display()))
}
