use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use material_filter_chain::{
    Connection, ContextValues, FilterChain, Network, Node, NodePath, filter_fn,
};
use proptest::prelude::*;
use serde_json::json;

fn p(s: &str) -> NodePath {
    NodePath::new(s).expect("valid test path")
}

fn single_surface_network() -> Network {
    let mut net = Network::new();
    net.insert_node(p("/mat/A"), Node::new("surfaceShader"));
    net.set_terminal("surface", Connection::new(p("/mat/A"), "out"));
    net
}

#[test]
fn rewire_surface_to_new_node() {
    let mut chain = FilterChain::new();
    chain.append_filter(filter_fn("add_b", |_, network, _, _| {
        let b = NodePath::new("/mat/B").expect("valid path");
        network.insert_node(b.clone(), Node::new("surfaceShader"));
        network.set_terminal("surface", Connection::new(b, "out"));
    }));

    let mut net = single_surface_network();
    let mut errors = Vec::new();
    chain.exec(
        &p("/mat"),
        &mut net,
        &ContextValues::new(),
        &[],
        Some(&mut errors),
    );

    assert_eq!(net.node_count(), 2);
    assert!(net.contains_node(&p("/mat/A")));
    assert!(net.contains_node(&p("/mat/B")));
    assert_eq!(net.terminal("surface").unwrap().to_string(), "/mat/B.out");
    assert!(errors.is_empty());
}

#[test]
fn errors_accumulate_in_filter_order_without_touching_network() {
    let chain = FilterChain::new()
        .with_filter(filter_fn("x", |_, _, _, errors| {
            errors.push("missing param X")
        }))
        .with_filter(filter_fn("y", |_, _, _, errors| {
            errors.push("missing param Y")
        }));

    let mut net = single_surface_network();
    let before = net.clone();
    let mut errors = Vec::new();
    chain.exec(
        &p("/mat"),
        &mut net,
        &ContextValues::new(),
        &[],
        Some(&mut errors),
    );

    assert_eq!(errors, ["missing param X", "missing param Y"]);
    assert_eq!(net, before);
}

#[test]
fn later_filters_run_after_errors_and_see_earlier_edits() {
    let chain = FilterChain::new()
        .with_filter(filter_fn("tag", |_, network, _, errors| {
            errors.push("first filter complains");
            for (_, node) in network.nodes_mut() {
                node.set_parameter("tagged", json!(true));
            }
        }))
        .with_filter(filter_fn("check", |_, network, _, errors| {
            let untagged = network
                .nodes()
                .filter(|(_, n)| n.parameter("tagged") != Some(&json!(true)))
                .count();
            errors.push(format!("untagged: {untagged}"));
        }));

    let mut net = single_surface_network();
    let report = chain.exec_with_report(&p("/mat"), &mut net, &ContextValues::new(), &[]);
    assert_eq!(report.filters_run, 2);
    assert_eq!(report.errors, ["first filter complains", "untagged: 0"]);
}

#[test]
fn new_nodes_are_scoped_under_network_id() {
    let chain = FilterChain::new().with_filter(filter_fn(
        "convert_preview",
        |network_id, network, context, errors| {
            let Some(surface) = network.terminal("surface").cloned() else {
                errors.push(format!("{network_id}: no surface terminal"));
                return;
            };
            let Some(shader) = context.preferred_shader_type(["glslfx", "OSL"]) else {
                errors.push(format!("{network_id}: no usable shader type"));
                return;
            };
            let path = match network_id.child("Converted") {
                Ok(path) => path,
                Err(err) => {
                    errors.push(err.to_string());
                    return;
                }
            };
            network.insert_node(
                path.clone(),
                Node::new(format!("{shader}Surface")).with_connection("base", surface),
            );
            network.set_terminal("surface", Connection::new(path, "out"));
        },
    ));

    let priority = vec!["OSL".to_string(), "glslfx".to_string()];
    let mut net = single_surface_network();
    let report = chain.exec_with_report(&p("/mat"), &mut net, &ContextValues::new(), &priority);
    assert!(report.is_clean());

    let converted = net.node(&p("/mat/Converted")).expect("converted node");
    assert_eq!(converted.node_type, "OSLSurface");
    assert_eq!(converted.connections("base")[0].to_string(), "/mat/A.out");
    assert_eq!(net.terminal("surface").unwrap().to_string(), "/mat/Converted.out");

    // Without a surface terminal the filter only reports.
    let mut empty = Network::new();
    let report = chain.exec_with_report(&p("/mat"), &mut empty, &ContextValues::new(), &priority);
    assert_eq!(report.errors, ["/mat: no surface terminal"]);
    assert!(empty.is_empty());
}

#[test]
fn dangling_connections_pass_through_untouched() {
    let mut net = single_surface_network();
    net.node_mut(&p("/mat/A"))
        .unwrap()
        .push_connection("color", Connection::new(p("/mat/Missing"), "rgb"));
    net.set_terminal("displacement", Connection::new(p("/mat/Nowhere"), "out"));
    let before = net.clone();

    let mut errors = Vec::new();
    FilterChain::new().exec(
        &p("/mat"),
        &mut net,
        &ContextValues::new(),
        &[],
        Some(&mut errors),
    );
    assert_eq!(net, before);
    assert!(errors.is_empty());
}

#[test]
fn same_chain_runs_on_distinct_networks_across_threads() {
    let calls = Arc::new(Mutex::new(0usize));
    let counter = calls.clone();
    let chain = FilterChain::new()
        .with_filter(filter_fn("count", move |_, _, _, _| {
            *counter.lock().unwrap() += 1;
        }))
        .with_filter(filter_fn("add_b", |network_id, network, _, _| {
            if let Ok(b) = network_id.child("B") {
                network.insert_node(b, Node::new("surfaceShader"));
            }
        }));

    let ids: Vec<NodePath> = (0..8).map(|i| p(&format!("/mat{i}"))).collect();
    let results: Vec<(Network, Vec<String>)> = std::thread::scope(|scope| {
        let handles: Vec<_> = ids
            .iter()
            .map(|id| {
                let chain = &chain;
                scope.spawn(move || {
                    let mut net = Network::new();
                    let mut errors = Vec::new();
                    chain.exec(id, &mut net, &ContextValues::new(), &[], Some(&mut errors));
                    (net, errors)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(*calls.lock().unwrap(), 8);
    for (id, (net, errors)) in ids.iter().zip(results) {
        assert_eq!(net.node_count(), 1);
        assert!(net.contains_node(&id.child("B").unwrap()));
        assert!(errors.is_empty());
    }
}

fn arb_path() -> impl Strategy<Value = NodePath> {
    "[a-e]".prop_map(|s| NodePath::new(format!("/n/{s}")).expect("valid generated path"))
}

fn arb_connection() -> impl Strategy<Value = Connection> {
    (arb_path(), "(out|rgb|a)").prop_map(|(up, port)| Connection::new(up, port))
}

fn arb_node() -> impl Strategy<Value = Node> {
    (
        "(surface|texture|mix)",
        prop::collection::hash_map("[a-c]", any::<i32>(), 0..3),
        prop::collection::btree_map(
            "(in|layers)",
            prop::collection::vec(arb_connection(), 1..4),
            0..2,
        ),
    )
        .prop_map(|(ty, params, inputs)| {
            let mut node = Node::new(ty);
            for (k, v) in params {
                node.set_parameter(k, json!(v));
            }
            node.input_connections = inputs;
            node
        })
}

fn arb_network() -> impl Strategy<Value = Network> {
    (
        prop::collection::btree_map(arb_path(), arb_node(), 0..5),
        prop::collection::btree_map("(surface|displacement)", arb_connection(), 0..2),
    )
        .prop_map(|(nodes, terminals): (BTreeMap<_, _>, BTreeMap<_, _>)| {
            Network { nodes, terminals }
        })
}

proptest! {
    #[test]
    fn empty_chain_leaves_network_unchanged(net in arb_network()) {
        let mut filtered = net.clone();
        let mut errors = Vec::new();
        let chain = FilterChain::new();
        chain.exec(&p("/n"), &mut filtered, &ContextValues::new(), &[], Some(&mut errors));
        prop_assert_eq!(filtered, net);
        prop_assert!(errors.is_empty());
    }

    #[test]
    fn filters_run_in_append_order(net in arb_network(), n in 1usize..8) {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut chain = FilterChain::new();
        for i in 0..n {
            let order = order.clone();
            chain.append_filter(filter_fn(format!("f{i}"), move |_, _, _, _| {
                order.lock().unwrap().push(i);
            }));
        }
        let mut net = net;
        chain.exec(&p("/n"), &mut net, &ContextValues::new(), &[], None);
        chain.exec(&p("/n"), &mut net, &ContextValues::new(), &[], None);
        let expected: Vec<usize> = (0..n).chain(0..n).collect();
        prop_assert_eq!(order.lock().unwrap().clone(), expected);
    }

    #[test]
    fn inserting_one_new_node_adds_exactly_one(net in arb_network()) {
        let chain = FilterChain::new().with_filter(filter_fn("add", |_, network, _, _| {
            network.insert_node(
                NodePath::new("/fresh/node").expect("valid path"),
                Node::new("surface"),
            );
        }));
        let before = net.node_count();
        let mut net = net;
        chain.exec(&p("/n"), &mut net, &ContextValues::new(), &[], None);
        prop_assert_eq!(net.node_count(), before + 1);
    }

    #[test]
    fn errors_without_sink_are_dropped(net in arb_network(), runs in 1usize..5) {
        let chain = FilterChain::new()
            .with_filter(filter_fn("e1", |_, _, _, errors| errors.push("always")))
            .with_filter(filter_fn("e2", |_, _, _, errors| errors.push("again")));
        let mut filtered = net.clone();
        for _ in 0..runs {
            chain.exec(&p("/n"), &mut filtered, &ContextValues::new(), &[], None);
        }
        prop_assert_eq!(filtered, net);
    }
}
