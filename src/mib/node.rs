//! Tree nodes and the lookup / successor walk.

use std::collections::BTreeMap;
use std::ops::Bound;

use super::{BoxFuture, Plugin, Proxy};
use crate::error::{Error, OidErrorKind, Result};
use crate::oid::Oid;
use crate::value::Value;

/// What an arc of a [`MibNode`] holds.
pub enum Entry {
    /// A fixed value.
    Scalar(Value),
    /// A nested node.
    SubTree(MibNode),
    /// A cached, computed subtree or value.
    Plugin(Plugin),
    /// A subtree served by another agent.
    Proxy(Proxy),
}

/// Result of [`MibNode::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The OID names a value.
    Value(Value),
    /// The OID names an interior node; carries the node's child arcs.
    Subtree(Vec<u32>),
    /// Nothing is registered at the OID.
    NoEntry,
}

impl Lookup {
    /// The value, if the lookup reached one.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Lookup::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Interior node of the MIB tree.
///
/// Children are kept in a `BTreeMap`, so iteration is always in ascending
/// arc order. That order is the GetNext order.
#[derive(Default)]
pub struct MibNode {
    children: BTreeMap<u32, Entry>,
}

impl MibNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Child arcs in ascending order.
    pub fn arcs(&self) -> impl Iterator<Item = u32> + '_ {
        self.children.keys().copied()
    }

    pub fn get(&self, arc: u32) -> Option<&Entry> {
        self.children.get(&arc)
    }

    /// Set a direct child, replacing whatever was there.
    pub fn insert(&mut self, arc: u32, entry: Entry) -> Option<Entry> {
        self.children.insert(arc, entry)
    }

    /// Register `entry` at `oid`, creating interior nodes as needed.
    ///
    /// Fails if `oid` is already occupied (by a value or by a subtree), or if
    /// the path runs through a scalar, plugin or proxy. Either way the new
    /// registration would overlap an existing one.
    pub fn register(&mut self, oid: &Oid, entry: Entry) -> Result<()> {
        let Some((&last, path)) = oid.arcs().split_last() else {
            return Err(Error::invalid_oid(OidErrorKind::Empty));
        };

        let mut node = self;
        for &arc in path {
            node = match node
                .children
                .entry(arc)
                .or_insert_with(|| Entry::SubTree(MibNode::new()))
            {
                Entry::SubTree(child) => child,
                Entry::Scalar(_) => return Err(Error::conflict(oid.clone(), "inside a value")),
                Entry::Plugin(_) => {
                    return Err(Error::conflict(oid.clone(), "inside an existing plugin"));
                }
                Entry::Proxy(_) => {
                    return Err(Error::conflict(oid.clone(), "a proxy cannot own children"));
                }
            };
        }

        if node.children.contains_key(&last) {
            return Err(Error::conflict(oid.clone(), "already registered"));
        }
        node.children.insert(last, entry);
        Ok(())
    }

    /// Resolve `arcs` relative to this node.
    ///
    /// Walking one arc past a value, or to an arc nobody registered, is
    /// [`Lookup::NoEntry`] rather than an error.
    pub fn lookup<'a>(&'a mut self, arcs: &'a [u32]) -> BoxFuture<'a, Lookup> {
        Box::pin(async move {
            let Some((&arc, rest)) = arcs.split_first() else {
                return Lookup::Subtree(self.arcs().collect());
            };
            match self.children.get_mut(&arc) {
                Some(entry) => entry.lookup(rest).await,
                None => Lookup::NoEntry,
            }
        })
    }

    /// Path to the first value below this node, in GetNext order.
    ///
    /// Empty subtrees are skipped; `None` means nothing below has a value.
    pub fn left_path(&mut self) -> BoxFuture<'_, Option<Vec<u32>>> {
        Box::pin(async move {
            for (&arc, entry) in self.children.iter_mut() {
                if let Some(path) = entry.left_path().await {
                    return Some(prepend(arc, path));
                }
            }
            None
        })
    }

    /// Path to the first value strictly after `arcs`, or `None` if this node
    /// holds nothing further.
    pub fn next_oid<'a>(&'a mut self, arcs: &'a [u32]) -> BoxFuture<'a, Option<Vec<u32>>> {
        Box::pin(async move {
            let Some((&arc, rest)) = arcs.split_first() else {
                // the request stopped at this node, so anything below follows it
                return self.left_path().await;
            };

            if let Some(entry) = self.children.get_mut(&arc)
                && let Some(path) = entry.next_oid(rest).await
            {
                return Some(prepend(arc, path));
            }

            let later = (Bound::Excluded(arc), Bound::Unbounded);
            for (&sibling, entry) in self.children.range_mut(later) {
                if let Some(path) = entry.left_path().await {
                    return Some(prepend(sibling, path));
                }
            }
            None
        })
    }
}

impl Entry {
    /// Resolve `rest` below this entry.
    pub fn lookup<'a>(&'a mut self, rest: &'a [u32]) -> BoxFuture<'a, Lookup> {
        Box::pin(async move {
            match self {
                Entry::Scalar(value) if rest.is_empty() => Lookup::Value(value.clone()),
                Entry::Scalar(_) => Lookup::NoEntry,
                Entry::SubTree(node) => node.lookup(rest).await,
                Entry::Plugin(plugin) => plugin.lookup(rest).await,
                Entry::Proxy(proxy) => proxy.lookup(rest).await,
            }
        })
    }

    /// First value at or below this entry.
    ///
    /// A scalar answers the empty path: the entry itself is the value.
    pub fn left_path(&mut self) -> BoxFuture<'_, Option<Vec<u32>>> {
        Box::pin(async move {
            match self {
                Entry::Scalar(_) => Some(Vec::new()),
                Entry::SubTree(node) => node.left_path().await,
                Entry::Plugin(plugin) => plugin.left_path().await,
                Entry::Proxy(proxy) => proxy.left_path().await,
            }
        })
    }

    /// First value strictly after `rest` within this entry.
    pub fn next_oid<'a>(&'a mut self, rest: &'a [u32]) -> BoxFuture<'a, Option<Vec<u32>>> {
        Box::pin(async move {
            match self {
                // a scalar has nothing below it
                Entry::Scalar(_) => None,
                Entry::SubTree(node) => node.next_oid(rest).await,
                Entry::Plugin(plugin) => plugin.next_oid(rest).await,
                Entry::Proxy(proxy) => proxy.next_oid(rest).await,
            }
        })
    }
}

pub(crate) fn prepend(arc: u32, mut path: Vec<u32>) -> Vec<u32> {
    path.insert(0, arc);
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    fn scalar(v: i32) -> Entry {
        Entry::Scalar(Value::Integer(v))
    }

    fn tree(entries: &[(&[u32], i32)]) -> MibNode {
        let mut node = MibNode::new();
        for (arcs, v) in entries {
            node.register(&Oid::from_slice(arcs), scalar(*v)).unwrap();
        }
        node
    }

    // ========================================================================
    // register
    // ========================================================================

    #[test]
    fn test_register_rejects_root() {
        let err = MibNode::new().register(&Oid::empty(), scalar(1)).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidOid {
                kind: OidErrorKind::Empty,
                ..
            }
        ));
    }

    #[test]
    fn test_register_conflicts() {
        let mut node = tree(&[(&[1, 2, 3], 1)]);
        // same OID
        assert!(matches!(
            node.register(&oid!(1, 2, 3), scalar(2)),
            Err(Error::RegistrationConflict { .. })
        ));
        // ancestor of an existing registration
        assert!(matches!(
            node.register(&oid!(1, 2), scalar(2)),
            Err(Error::RegistrationConflict { .. })
        ));
        // descendant of an existing registration
        assert!(matches!(
            node.register(&oid!(1, 2, 3, 4), scalar(2)),
            Err(Error::RegistrationConflict { .. })
        ));
        // siblings and disjoint branches are fine
        node.register(&oid!(1, 2, 4), scalar(3)).unwrap();
        node.register(&oid!(2), scalar(4)).unwrap();
        assert_eq!(node.arcs().collect::<Vec<_>>(), vec![1, 2]);
    }

    // ========================================================================
    // lookup
    // ========================================================================

    #[tokio::test]
    async fn test_lookup_values_and_interior_nodes() {
        let mut node = tree(&[(&[1, 2, 3], 7), (&[1, 2, 5], 8)]);
        assert_eq!(node.lookup(&[1, 2, 3]).await, Lookup::Value(Value::Integer(7)));
        assert_eq!(node.lookup(&[1, 2]).await, Lookup::Subtree(vec![3, 5]));
        assert_eq!(node.lookup(&[1, 2, 4]).await, Lookup::NoEntry);
        // one arc past a value
        assert_eq!(node.lookup(&[1, 2, 3, 0]).await, Lookup::NoEntry);
        assert_eq!(node.lookup(&[9]).await, Lookup::NoEntry);
    }

    // ========================================================================
    // left_path / next_oid
    // ========================================================================

    #[tokio::test]
    async fn test_left_path_skips_empty_subtrees() {
        let mut node = MibNode::new();
        node.insert(1, Entry::SubTree(MibNode::new()));
        node.insert(4, Entry::SubTree(tree(&[(&[2, 9], 1)])));
        assert_eq!(node.left_path().await, Some(vec![4, 2, 9]));
        assert_eq!(MibNode::new().left_path().await, None);
    }

    #[tokio::test]
    async fn test_next_oid_order() {
        let mut node = tree(&[(&[1, 1], 1), (&[1, 3, 0], 2), (&[2], 3)]);
        // before everything
        assert_eq!(node.next_oid(&[]).await, Some(vec![1, 1]));
        assert_eq!(node.next_oid(&[0, 99]).await, Some(vec![1, 1]));
        // exact value to next sibling, descending into it
        assert_eq!(node.next_oid(&[1, 1]).await, Some(vec![1, 3, 0]));
        // between siblings
        assert_eq!(node.next_oid(&[1, 2, 7]).await, Some(vec![1, 3, 0]));
        // interior node to its first value
        assert_eq!(node.next_oid(&[1, 3]).await, Some(vec![1, 3, 0]));
        // past a value at the end of a subtree climbs out
        assert_eq!(node.next_oid(&[1, 3, 0, 5]).await, Some(vec![2]));
        // past the end
        assert_eq!(node.next_oid(&[2]).await, None);
        assert_eq!(node.next_oid(&[3]).await, None);
    }

    #[tokio::test]
    async fn test_walk_visits_every_value_in_order() {
        let mut node = tree(&[(&[3], 0), (&[1, 9], 0), (&[1, 10, 2], 0), (&[2, 0], 0)]);
        let mut seen = Vec::new();
        let mut cursor = Vec::new();
        while let Some(next) = node.next_oid(&cursor).await {
            seen.push(next.clone());
            cursor = next;
        }
        assert_eq!(
            seen,
            vec![vec![1, 9], vec![1, 10, 2], vec![2, 0], vec![3]]
        );
    }
}
