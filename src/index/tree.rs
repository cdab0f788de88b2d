//! AVL tree keyed by composite keys
//!
//! Each node holds a key, the set of row ids stored under it, and its cached
//! subtree height. Rebalancing happens on the way back up from a recursive
//! insert or delete; nodes have no parent links.
//!
//! # Invariants
//!
//! - `|height(left) - height(right)| <= 1` at every node after every mutation
//! - In-order traversal yields keys in comparator order
//! - A node whose row-id set becomes empty is pruned

use std::cmp::Ordering;
use std::collections::{BTreeSet, VecDeque};

use crate::expr::{RowId, SortDirection, Value};
use crate::observability::ExecutionStats;

use super::comparator::KeyComparator;
use super::sargs::{Bounds, IndexKey, SearchArgs};

type Link = Option<Box<Node>>;

#[derive(Debug)]
struct Node {
    key: IndexKey,
    rows: BTreeSet<RowId>,
    height: usize,
    left: Link,
    right: Link,
}

impl Node {
    fn leaf(key: IndexKey, row_id: RowId) -> Self {
        Self {
            key,
            rows: BTreeSet::from([row_id]),
            height: 1,
            left: None,
            right: None,
        }
    }

    fn update_height(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
    }

    fn balance_factor(&self) -> isize {
        height(&self.left) as isize - height(&self.right) as isize
    }
}

fn height(link: &Link) -> usize {
    link.as_ref().map_or(0, |n| n.height)
}

fn rotate_right(mut node: Box<Node>) -> Box<Node> {
    match node.left.take() {
        None => node,
        Some(mut pivot) => {
            node.left = pivot.right.take();
            node.update_height();
            pivot.right = Some(node);
            pivot.update_height();
            pivot
        }
    }
}

fn rotate_left(mut node: Box<Node>) -> Box<Node> {
    match node.right.take() {
        None => node,
        Some(mut pivot) => {
            node.right = pivot.left.take();
            node.update_height();
            pivot.left = Some(node);
            pivot.update_height();
            pivot
        }
    }
}

fn rebalance(mut node: Box<Node>) -> Box<Node> {
    node.update_height();
    let balance = node.balance_factor();

    if balance > 1 {
        // left-right: straighten the left child first
        if let Some(left) = node.left.take() {
            node.left = Some(if left.balance_factor() < 0 {
                rotate_left(left)
            } else {
                left
            });
        }
        return rotate_right(node);
    }

    if balance < -1 {
        // right-left
        if let Some(right) = node.right.take() {
            node.right = Some(if right.balance_factor() > 0 {
                rotate_right(right)
            } else {
                right
            });
        }
        return rotate_left(node);
    }

    node
}

/// Outcome of a single-row insertion
#[derive(Debug, Default)]
struct Insertion {
    row_added: bool,
    key_created: bool,
}

fn insert_node(
    link: Link,
    key: IndexKey,
    row_id: RowId,
    cmp: &dyn KeyComparator,
    outcome: &mut Insertion,
) -> Box<Node> {
    let mut node = match link {
        None => {
            outcome.row_added = true;
            outcome.key_created = true;
            return Box::new(Node::leaf(key, row_id));
        }
        Some(node) => node,
    };

    match cmp.compare(&key, &node.key) {
        Ordering::Less => {
            node.left = Some(insert_node(node.left.take(), key, row_id, cmp, outcome));
        }
        Ordering::Greater => {
            node.right = Some(insert_node(node.right.take(), key, row_id, cmp, outcome));
        }
        Ordering::Equal => {
            outcome.row_added = node.rows.insert(row_id);
            return node;
        }
    }

    rebalance(node)
}

/// Outcome of a single-row removal
#[derive(Debug, Default)]
struct Removal {
    row_removed: bool,
    key_pruned: bool,
}

fn remove_node(
    link: Link,
    key: &[Value],
    row_id: RowId,
    cmp: &dyn KeyComparator,
    outcome: &mut Removal,
) -> Link {
    let mut node = link?;

    match cmp.compare(key, &node.key) {
        Ordering::Less => {
            node.left = remove_node(node.left.take(), key, row_id, cmp, outcome);
        }
        Ordering::Greater => {
            node.right = remove_node(node.right.take(), key, row_id, cmp, outcome);
        }
        Ordering::Equal => {
            outcome.row_removed = node.rows.remove(&row_id);
            if !node.rows.is_empty() {
                return Some(node);
            }
            outcome.key_pruned = true;
            return match (node.left.take(), node.right.take()) {
                (None, None) => None,
                (Some(child), None) | (None, Some(child)) => Some(child),
                (Some(left), Some(right)) => {
                    let (mut successor, rest) = take_min(right);
                    successor.left = Some(left);
                    successor.right = rest;
                    Some(rebalance(successor))
                }
            };
        }
    }

    Some(rebalance(node))
}

/// Detaches the minimum node, returning it and the remaining subtree
fn take_min(mut node: Box<Node>) -> (Box<Node>, Link) {
    match node.left.take() {
        None => {
            let rest = node.right.take();
            (node, rest)
        }
        Some(left) => {
            let (min, rest) = take_min(left);
            node.left = rest;
            (min, Some(rebalance(node)))
        }
    }
}

/// Self-balancing ordered map from composite key to row-id set
#[derive(Debug)]
pub struct AvlTree {
    root: Link,
    comparator: Box<dyn KeyComparator>,
    keys: usize,
    rows: usize,
}

impl AvlTree {
    pub fn new(comparator: Box<dyn KeyComparator>) -> Self {
        Self {
            root: None,
            comparator,
            keys: 0,
            rows: 0,
        }
    }

    /// Adds `row_id` under `key`, creating the key if needed
    pub fn insert(&mut self, key: IndexKey, row_id: RowId) {
        let mut outcome = Insertion::default();
        let root = insert_node(
            self.root.take(),
            key,
            row_id,
            self.comparator.as_ref(),
            &mut outcome,
        );
        self.root = Some(root);
        if outcome.key_created {
            self.keys += 1;
        }
        if outcome.row_added {
            self.rows += 1;
        }
    }

    /// Removes `row_id` from `key`; returns whether it was present
    pub fn remove(&mut self, key: &[Value], row_id: RowId) -> bool {
        let mut outcome = Removal::default();
        self.root = remove_node(
            self.root.take(),
            key,
            row_id,
            self.comparator.as_ref(),
            &mut outcome,
        );
        if outcome.row_removed {
            self.rows -= 1;
        }
        if outcome.key_pruned {
            self.keys -= 1;
        }
        outcome.row_removed
    }

    /// Point lookup
    pub fn get(&self, key: &[Value]) -> Option<&BTreeSet<RowId>> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            current = match self.comparator.compare(key, &node.key) {
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
                Ordering::Equal => return Some(&node.rows),
            };
        }
        None
    }

    /// Lazily scans keys within `sargs` in `direction`
    pub fn scan<'a>(
        &'a self,
        sargs: &SearchArgs,
        direction: SortDirection,
        stats: &'a ExecutionStats,
    ) -> TreeScan<'a> {
        TreeScan::new(self, sargs.bounds(), direction, stats)
    }

    pub fn clear(&mut self) {
        self.root = None;
        self.keys = 0;
        self.rows = 0;
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys == 0
    }

    /// Number of (key, row id) entries
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Cached height of the root
    pub fn height(&self) -> usize {
        height(&self.root)
    }

    /// Checks the AVL invariant by recomputing every height from scratch
    pub fn is_balanced(&self) -> bool {
        fn check(link: &Link) -> Option<usize> {
            match link {
                None => Some(0),
                Some(node) => {
                    let l = check(&node.left)?;
                    let r = check(&node.right)?;
                    if l.abs_diff(r) > 1 {
                        return None;
                    }
                    Some(1 + l.max(r))
                }
            }
        }
        check(&self.root).is_some()
    }

    /// Keys in breadth-first order
    pub fn level_order(&self) -> Vec<IndexKey> {
        let mut out = Vec::new();
        let mut queue: VecDeque<&Node> = self.root.as_deref().into_iter().collect();
        while let Some(node) = queue.pop_front() {
            out.push(node.key.clone());
            queue.extend(node.left.as_deref());
            queue.extend(node.right.as_deref());
        }
        out
    }
}

enum Frame<'a> {
    Visit(&'a Node),
    Emit(&'a Node),
}

/// Lazy bounded traversal
///
/// Every node examined counts one comparison on the supplied stats, whether
/// or not its key ends up in range.
pub struct TreeScan<'a> {
    tree: &'a AvlTree,
    pending: VecDeque<Bounds>,
    current: Option<Bounds>,
    direction: SortDirection,
    stack: Vec<Frame<'a>>,
    stats: &'a ExecutionStats,
}

impl<'a> TreeScan<'a> {
    fn new(
        tree: &'a AvlTree,
        bounds: Vec<Bounds>,
        direction: SortDirection,
        stats: &'a ExecutionStats,
    ) -> Self {
        Self {
            tree,
            pending: bounds.into(),
            current: None,
            direction,
            stack: Vec::new(),
            stats,
        }
    }

    fn start_next(&mut self) -> bool {
        match self.pending.pop_front() {
            None => false,
            Some(bounds) => {
                self.current = Some(bounds);
                if let Some(root) = self.tree.root.as_deref() {
                    self.stack.push(Frame::Visit(root));
                }
                true
            }
        }
    }

    fn expand(&mut self, node: &'a Node) {
        let Some(bounds) = &self.current else {
            return;
        };
        self.stats.increment_index_comparisons();
        let verdict = bounds.evaluate(self.tree.comparator.as_ref(), &node.key);

        let low = node.left.as_deref().filter(|_| verdict.descend_low);
        let high = node.right.as_deref().filter(|_| verdict.descend_high);
        let (first, last) = match self.direction {
            SortDirection::Asc => (low, high),
            SortDirection::Desc => (high, low),
        };

        // stack order: `first` is popped before the node, `last` after
        if let Some(n) = last {
            self.stack.push(Frame::Visit(n));
        }
        if verdict.in_range {
            self.stack.push(Frame::Emit(node));
        }
        if let Some(n) = first {
            self.stack.push(Frame::Visit(n));
        }
    }
}

impl<'a> Iterator for TreeScan<'a> {
    type Item = (&'a [Value], &'a BTreeSet<RowId>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stack.pop() {
                Some(Frame::Emit(node)) => return Some((&node.key, &node.rows)),
                Some(Frame::Visit(node)) => self.expand(node),
                None => {
                    if !self.start_next() {
                        return None;
                    }
                }
            }
        }
    }
}
