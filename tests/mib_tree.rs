//! MIB tree behavior across plugin boundaries: lookup, registration and
//! GetNext ordering.

mod common;

use std::collections::BTreeMap;

use common::MemoryAgent;
use proptest::prelude::*;
use snmp_mib_agent::mib::{Entry, Lookup, MibNode, Plugin, PluginData, Proxy};
use snmp_mib_agent::{Error, Oid, Value, oid};

fn plugin_tree(mounts: Vec<(Oid, PluginData)>) -> MibNode {
    let mut tree = MibNode::new();
    for (oid, data) in mounts {
        tree.register(&oid, Entry::Plugin(Plugin::constant(oid.clone(), data)))
            .unwrap();
    }
    tree
}

fn parse(s: &str) -> Vec<u32> {
    s.parse::<Oid>().unwrap().arcs().to_vec()
}

#[tokio::test]
async fn fibonacci_list() {
    let mut tree = plugin_tree(vec![(oid!(1, 2, 3), vec![1, 1, 2, 3, 5, 8, 13].into())]);

    assert_eq!(
        tree.lookup(&parse("1.2.3.4")).await,
        Lookup::Value(Value::Integer(5))
    );
    assert_eq!(tree.next_oid(&parse("1.2.3.4")).await, Some(parse("1.2.3.5")));
    // the mount itself is a subtree, not a value
    assert!(matches!(
        tree.lookup(&parse("1.2.3")).await,
        Lookup::Subtree(_)
    ));
    assert_eq!(tree.lookup(&parse("1.2.3.7")).await, Lookup::NoEntry);
}

#[tokio::test]
async fn next_oid_across_several_plugins() {
    let words: Vec<Option<Vec<&str>>> = vec![None, Some(vec!["the", "quick", "brown", "etc"])];
    let mut tree = plugin_tree(vec![
        (oid!(1, 1), words.into()),
        (oid!(1, 2, 3), vec![0, 1, 2].into()),
        (oid!(4, 5, 6), vec![5, 6, 7].into()),
    ]);

    assert_eq!(tree.next_oid(&parse("1.2")).await, Some(parse("1.2.3.0")));
    assert_eq!(
        tree.next_oid(&parse("2.3.4.5.6.78")).await,
        Some(parse("4.5.6.0"))
    );
    assert_eq!(tree.next_oid(&parse("4.5.6.2")).await, None);
    assert_eq!(tree.next_oid(&parse("5")).await, None);

    // the absent first element is skipped
    assert_eq!(tree.next_oid(&parse("1.1")).await, Some(parse("1.1.1.0")));
    assert_eq!(
        tree.lookup(&parse("1.1.1.2")).await,
        Lookup::Value(Value::from("brown"))
    );
    assert_eq!(tree.next_oid(&parse("1.1.1.3")).await, Some(parse("1.2.3.0")));
}

#[tokio::test]
async fn nested_lists_index_at_every_depth() {
    let grid = vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]];
    let mut tree = plugin_tree(vec![(oid!(1, 3, 6, 1, 4, 1, 99999), grid.into())]);

    for i in 0..3u32 {
        for j in 0..3u32 {
            let path = oid!(1, 3, 6, 1, 4, 1, 99999).concat(&[i, j]);
            assert_eq!(
                tree.lookup(path.arcs()).await,
                Lookup::Value(Value::Integer((i * 3 + j + 1) as i32)),
                "element [{i}][{j}]"
            );
        }
    }
}

#[tokio::test]
async fn sibling_plugins_do_not_interfere() {
    let mut left = BTreeMap::new();
    left.insert(1u32, "left");
    let mut tree = plugin_tree(vec![
        (oid!(1, 5, 1), left.into()),
        (oid!(1, 5, 2), vec!["right"].into()),
    ]);

    assert_eq!(
        tree.lookup(&parse("1.5.1.1")).await,
        Lookup::Value(Value::from("left"))
    );
    assert_eq!(tree.lookup(&parse("1.5.1.0")).await, Lookup::NoEntry);
    assert_eq!(
        tree.lookup(&parse("1.5.2.0")).await,
        Lookup::Value(Value::from("right"))
    );
    assert_eq!(tree.lookup(&parse("1.5.2.1")).await, Lookup::NoEntry);
}

#[test]
fn overlapping_plugins_conflict() {
    let mut tree = plugin_tree(vec![(oid!(1, 2, 3), vec![1].into())]);

    for overlapping in [oid!(1, 2), oid!(1, 2, 3), oid!(1, 2, 3, 0)] {
        let err = tree
            .register(
                &overlapping,
                Entry::Plugin(Plugin::constant(overlapping.clone(), 1)),
            )
            .unwrap_err();
        assert!(
            matches!(err, Error::RegistrationConflict { ref oid, .. } if *oid == overlapping),
            "{overlapping}: {err}"
        );
    }

    tree.register(&oid!(1, 2, 4), Entry::Plugin(Plugin::constant(oid!(1, 2, 4), 1)))
        .unwrap();
    tree.register(&oid!(7), Entry::Scalar(Value::Integer(7)))
        .unwrap();
}

#[tokio::test]
async fn scalar_registration_roundtrips() {
    let text = "1.3.6.1.4.1.99999.42.0";
    let oid: Oid = text.parse().unwrap();
    assert_eq!(oid.to_string(), text);

    let mut tree = MibNode::new();
    tree.register(&oid, Entry::Scalar(Value::Gauge32(9))).unwrap();
    assert_eq!(
        tree.lookup(oid.arcs()).await,
        Lookup::Value(Value::Gauge32(9))
    );
    assert_eq!(tree.lookup(oid.child(0).arcs()).await, Lookup::NoEntry);
}

// ============================================================================
// GetNext ordering properties
// ============================================================================

fn arc_path() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..4, 1..5)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

proptest! {
    /// next_oid returns the smallest registered value strictly after the
    /// query, or None when there is none.
    #[test]
    fn next_oid_is_the_least_greater_value(
        candidates in prop::collection::vec(arc_path(), 1..12),
        query in prop::collection::vec(0u32..5, 0..6),
    ) {
        let mut tree = MibNode::new();
        let mut registered: Vec<Vec<u32>> = Vec::new();
        for arcs in candidates {
            let oid = Oid::from_slice(&arcs);
            if tree.register(&oid, Entry::Scalar(Value::Integer(1))).is_ok() {
                registered.push(arcs);
            }
        }
        registered.sort();

        let expected = registered.iter().find(|r| **r > query).cloned();
        let got = runtime().block_on(tree.next_oid(&query));
        prop_assert_eq!(got, expected);
    }

    /// Walking from the root visits every registered value exactly once, in
    /// ascending order.
    #[test]
    fn walk_is_strictly_increasing_and_complete(
        candidates in prop::collection::vec(arc_path(), 1..12),
    ) {
        let mut tree = MibNode::new();
        let mut registered: Vec<Vec<u32>> = Vec::new();
        for arcs in candidates {
            let oid = Oid::from_slice(&arcs);
            if tree.register(&oid, Entry::Scalar(Value::Integer(1))).is_ok() {
                registered.push(arcs);
            }
        }
        registered.sort();

        let walked = runtime().block_on(async {
            let mut seen = Vec::new();
            let mut cursor = Vec::new();
            while let Some(next) = tree.next_oid(&cursor).await {
                seen.push(next.clone());
                cursor = next;
            }
            seen
        });
        prop_assert_eq!(walked, registered);
    }
}

// ============================================================================
// GetNext ordering across plugins, proxies and scalars
// ============================================================================

#[derive(Debug, Clone)]
enum Mount {
    Scalar(i32),
    Plugin(PluginData),
    /// Suffixes the remote serves below the mount.
    Proxy(Vec<Vec<u32>>),
}

fn plugin_data() -> impl Strategy<Value = PluginData> {
    let leaf = prop_oneof![
        4 => (0i32..100).prop_map(PluginData::from),
        1 => Just(PluginData::Absent),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(PluginData::List),
            prop::collection::btree_map(0u32..5, inner, 0..4).prop_map(PluginData::Map),
        ]
    })
}

fn mount_entry() -> impl Strategy<Value = Mount> {
    prop_oneof![
        (0i32..100).prop_map(Mount::Scalar),
        plugin_data().prop_map(Mount::Plugin),
        prop::collection::vec(prop::collection::vec(0u32..3, 1..3), 0..5).prop_map(Mount::Proxy),
    ]
}

fn child_path(prefix: &[u32], arc: u32) -> Vec<u32> {
    let mut path = prefix.to_vec();
    path.push(arc);
    path
}

/// Every path below `prefix` at which `data` holds a value.
fn value_paths(prefix: &[u32], data: &PluginData, out: &mut Vec<Vec<u32>>) {
    match data {
        PluginData::Value(_) => out.push(prefix.to_vec()),
        PluginData::Absent => {}
        PluginData::List(items) => {
            for (i, item) in items.iter().enumerate() {
                value_paths(&child_path(prefix, i as u32), item, out);
            }
        }
        PluginData::Map(entries) => {
            for (arc, item) in entries {
                value_paths(&child_path(prefix, *arc), item, out);
            }
        }
    }
}

/// Build a tree from the mounts that register cleanly, returning it with
/// every value path it serves, sorted.
fn mixed_tree(mounts: Vec<(Vec<u32>, Mount)>) -> (MibNode, Vec<Vec<u32>>) {
    let mut tree = MibNode::new();
    let mut expected = Vec::new();
    for (arcs, mount) in mounts {
        let oid = Oid::from_slice(&arcs);
        let mut paths = Vec::new();
        let entry = match mount {
            Mount::Scalar(v) => {
                paths.push(arcs.clone());
                Entry::Scalar(Value::Integer(v))
            }
            Mount::Plugin(data) => {
                value_paths(&arcs, &data, &mut paths);
                Entry::Plugin(Plugin::constant(oid.clone(), data))
            }
            Mount::Proxy(suffixes) => {
                let mut remote = MemoryAgent::default();
                for suffix in suffixes {
                    paths.push([&arcs[..], &suffix[..]].concat());
                    remote.0.insert(oid.concat(&suffix), Value::Integer(1));
                }
                // a neighbour outside the mount that the walk must not reach
                let mut neighbour = arcs.clone();
                if let Some(last) = neighbour.last_mut() {
                    *last += 1;
                }
                remote.0.insert(Oid::from(neighbour), Value::Integer(2));
                Entry::Proxy(Proxy::new(oid.clone(), "memory", remote))
            }
        };
        if tree.register(&oid, entry).is_ok() {
            expected.extend(paths);
        }
    }
    expected.sort();
    expected.dedup();
    (tree, expected)
}

proptest! {
    /// On trees mixing scalars, plugins and proxies, next_oid still returns
    /// the least greater value and never leaves a proxy's mount.
    #[test]
    fn mixed_next_oid_is_the_least_greater_value(
        mounts in prop::collection::vec((arc_path(), mount_entry()), 1..8),
        query in prop::collection::vec(0u32..5, 0..7),
    ) {
        let (mut tree, expected) = mixed_tree(mounts);
        let want = expected.iter().find(|p| **p > query).cloned();
        let got = runtime().block_on(tree.next_oid(&query));
        prop_assert_eq!(got, want);
    }

    /// A walk over a mixed tree is strictly increasing, visits every value
    /// once and every visited OID reads back as a value.
    #[test]
    fn mixed_walk_visits_every_value(
        mounts in prop::collection::vec((arc_path(), mount_entry()), 1..8),
    ) {
        let (mut tree, expected) = mixed_tree(mounts);
        let walked = runtime().block_on(async {
            let mut seen = Vec::new();
            let mut cursor = Vec::new();
            while let Some(next) = tree.next_oid(&cursor).await {
                assert!(next > cursor, "{next:?} after {cursor:?}");
                assert!(
                    tree.lookup(&next).await.into_value().is_some(),
                    "{next:?} is not a value"
                );
                seen.push(next.clone());
                cursor = next;
            }
            seen
        });
        prop_assert_eq!(walked, expected);
    }
}
