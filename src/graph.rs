use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, bail};

use crate::{
    network::{Connection, Network},
    path::NodePath,
};

/// Where a connection whose upstream node is missing was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DanglingSite {
    Input { node: NodePath, input: String, index: usize },
    Terminal { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingConnection {
    pub site: DanglingSite,
    pub connection: Connection,
}

/// Existing nodes reachable upstream from any terminal.
pub fn upstream_reachable(network: &Network) -> BTreeSet<NodePath> {
    let mut visited: BTreeSet<NodePath> = BTreeSet::new();
    let mut stack: Vec<&NodePath> = network
        .terminals
        .values()
        .map(|c| &c.upstream_node)
        .collect();

    while let Some(path) = stack.pop() {
        // Dangling references are not reachable nodes.
        let Some(node) = network.nodes.get(path) else {
            continue;
        };
        if !visited.insert(path.clone()) {
            continue;
        }
        for conns in node.input_connections.values() {
            for c in conns {
                stack.push(&c.upstream_node);
            }
        }
    }
    visited
}

/// Nodes ordered upstream-first. Ties resolve in path order.
///
/// Connections to missing nodes are ignored; a cycle has no valid order and is an error.
pub fn topo_order(network: &Network) -> Result<Vec<NodePath>> {
    let mut indeg: BTreeMap<&NodePath, usize> =
        network.nodes.keys().map(|p| (p, 0usize)).collect();
    let mut outgoing: BTreeMap<&NodePath, Vec<&NodePath>> = BTreeMap::new();

    for (path, node) in &network.nodes {
        let upstream: BTreeSet<&NodePath> = node
            .input_connections
            .values()
            .flatten()
            .map(|c| &c.upstream_node)
            .filter(|up| network.nodes.contains_key(*up))
            .collect();
        for up in upstream {
            if let Some(d) = indeg.get_mut(path) {
                *d += 1;
            }
            outgoing.entry(up).or_default().push(path);
        }
    }

    let mut ready: BTreeSet<&NodePath> = indeg
        .iter()
        .filter_map(|(p, d)| if *d == 0 { Some(*p) } else { None })
        .collect();
    let mut order: Vec<NodePath> = Vec::with_capacity(network.nodes.len());

    while let Some(n) = ready.pop_first() {
        order.push(n.clone());
        if let Some(nexts) = outgoing.get(n) {
            for m in nexts {
                if let Some(entry) = indeg.get_mut(*m) {
                    *entry -= 1;
                    if *entry == 0 {
                        ready.insert(*m);
                    }
                }
            }
        }
    }

    if order.len() != network.nodes.len() {
        let stuck: Vec<&str> = indeg
            .iter()
            .filter(|(_, d)| **d > 0)
            .map(|(p, _)| p.as_str())
            .collect();
        bail!(
            "cycle detected in network (cannot order nodes): {}",
            stuck.join(", ")
        );
    }
    Ok(order)
}

/// Input and terminal connections whose upstream node is absent.
///
/// Informational only; the network is never rejected for these.
pub fn dangling_connections(network: &Network) -> Vec<DanglingConnection> {
    let mut out = Vec::new();
    for (path, node) in &network.nodes {
        for (input, conns) in &node.input_connections {
            for (index, c) in conns.iter().enumerate() {
                if !network.nodes.contains_key(&c.upstream_node) {
                    out.push(DanglingConnection {
                        site: DanglingSite::Input {
                            node: path.clone(),
                            input: input.clone(),
                            index,
                        },
                        connection: c.clone(),
                    });
                }
            }
        }
    }
    for (name, c) in &network.terminals {
        if !network.nodes.contains_key(&c.upstream_node) {
            out.push(DanglingConnection {
                site: DanglingSite::Terminal { name: name.clone() },
                connection: c.clone(),
            });
        }
    }
    out
}
