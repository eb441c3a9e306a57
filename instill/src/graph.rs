use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Node of a [`Graph`].
#[derive(Debug)]
pub struct Node<T, K> {
    data: T,
    incoming: BTreeSet<K>,
    outgoing: BTreeSet<K>,
}

impl<T, K> Node<T, K> {
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Keys of the nodes with an edge to this node.
    pub fn incoming(&self) -> &BTreeSet<K> {
        &self.incoming
    }

    /// Keys of the nodes this node has an edge to.
    pub fn outgoing(&self) -> &BTreeSet<K> {
        &self.outgoing
    }
}

/// Directed graph over arbitrary payloads, deduplicated by a key function.
///
/// An edge `a -> b` means `a` needs `b` first, so roots are the nodes without
/// outgoing edges.
///
/// # Examples
///
/// ```rust
/// use instill::Graph;
///
/// let mut graph = Graph::new(|v: &&str| v.to_string());
/// graph.insert_edge("app", "db");
/// graph.insert_edge("db", "config");
///
/// assert_eq!(graph.roots(), vec![&"config"]);
/// graph.remove_node(&"config");
/// assert_eq!(graph.roots(), vec![&"db"]);
/// ```
pub struct Graph<T, K, F> {
    key_fn: F,
    nodes: BTreeMap<K, Node<T, K>>,
}

impl<T, K, F> Graph<T, K, F>
where
    K: Ord + Clone,
    F: Fn(&T) -> K,
{
    pub fn new(key_fn: F) -> Self {
        Self {
            key_fn,
            nodes: BTreeMap::new(),
        }
    }

    /// Returns the node keyed like `data`, inserting it if absent.
    pub fn lookup_or_insert_node(&mut self, data: T) -> &Node<T, K> {
        let key = (self.key_fn)(&data);
        self.nodes.entry(key).or_insert_with(|| Node {
            data,
            incoming: BTreeSet::new(),
            outgoing: BTreeSet::new(),
        })
    }

    pub fn lookup(&self, data: &T) -> Option<&Node<T, K>> {
        self.nodes.get(&(self.key_fn)(data))
    }

    /// Records the edge `from -> to`, inserting missing nodes.
    pub fn insert_edge(&mut self, from: T, to: T) {
        let from_key = (self.key_fn)(&from);
        let to_key = (self.key_fn)(&to);
        self.lookup_or_insert_node(from);
        self.lookup_or_insert_node(to);
        if let Some(node) = self.nodes.get_mut(&from_key) {
            node.outgoing.insert(to_key.clone());
        }
        if let Some(node) = self.nodes.get_mut(&to_key) {
            node.incoming.insert(from_key);
        }
    }

    /// Removes the node keyed like `data` together with its edges.
    pub fn remove_node(&mut self, data: &T) -> Option<T> {
        let key = (self.key_fn)(data);
        let node = self.nodes.remove(&key)?;
        for other in node.incoming.iter().chain(node.outgoing.iter()) {
            if let Some(other) = self.nodes.get_mut(other) {
                other.incoming.remove(&key);
                other.outgoing.remove(&key);
            }
        }
        Some(node.data)
    }

    /// Payloads of the nodes without outgoing edges, in key order.
    pub fn roots(&self) -> Vec<&T> {
        self.nodes
            .values()
            .filter(|v| v.outgoing.is_empty())
            .map(|v| &v.data)
            .collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node<T, K>> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the keys along one cycle, first key repeated at the end.
    pub fn find_cycle(&self) -> Option<Vec<K>> {
        let mut done = BTreeSet::new();
        let mut path = Vec::new();
        for key in self.nodes.keys() {
            if let Some(cycle) = self.visit(key, &mut path, &mut done) {
                return Some(cycle);
            }
        }
        None
    }

    fn visit(&self, key: &K, path: &mut Vec<K>, done: &mut BTreeSet<K>) -> Option<Vec<K>> {
        if done.contains(key) {
            return None;
        }
        if let Some(pos) = path.iter().position(|v| v == key) {
            let mut cycle = path[pos..].to_vec();
            cycle.push(key.clone());
            return Some(cycle);
        }
        path.push(key.clone());
        if let Some(node) = self.nodes.get(key) {
            for next in &node.outgoing {
                if let Some(cycle) = self.visit(next, path, done) {
                    return Some(cycle);
                }
            }
        }
        path.pop();
        done.insert(key.clone());
        None
    }
}

impl<T, K, F> fmt::Display for Graph<T, K, F>
where
    K: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, node)) in self.nodes.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{key}")?;
            writeln!(f, "\t(-> incoming)[{}]", join(&node.incoming, ", "))?;
            writeln!(f, "\t(outgoing ->)[{}]", join(&node.outgoing, ","))?;
        }
        Ok(())
    }
}

fn join<K: fmt::Display>(keys: &BTreeSet<K>, separator: &str) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}
