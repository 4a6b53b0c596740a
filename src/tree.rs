// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::request::PickRequest;
use rustc_hash::FxHashMap;

/// Hard cap on arena slots; new nodes beyond it are created untracked
pub(crate) const MAX_NODES: usize = 1 << 20;

type NodeId = usize;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Child {
    Pruned,
    Branch(NodeId),
}

/// One level of the pick tree
///
/// The range `[min, max]` is that of the request issued at this position,
/// set on first visit and validated on every revisit. A prefix of fully
/// pruned children is absorbed by advancing `current_min`, so the live
/// window is `[current_min, max]`. Untracked nodes carry no children; only
/// their visit count is maintained.
#[derive(Debug)]
struct Node {
    min: i64,
    max: i64,
    current_min: i64,
    branches_left: u64,
    tracked: bool,
    visits: u64,
    children: FxHashMap<i64, Child>,
}

impl Node {
    fn new(tracked: bool) -> Self {
        Self {
            min: 0,
            max: -1, // range unset until first visit
            current_min: 0,
            branches_left: 0,
            tracked,
            visits: 0,
            children: FxHashMap::default(),
        }
    }

    fn has_range(&self) -> bool {
        self.min <= self.max
    }

    fn size(&self) -> u64 {
        self.max.abs_diff(self.min) + 1
    }

    fn set_range(&mut self, req: &PickRequest) {
        self.min = req.min();
        self.max = req.max();
        self.current_min = req.min();
        self.branches_left = req.size();
    }

    fn is_exhausted(&self) -> bool {
        self.has_range() && self.branches_left == 0
    }

    fn child(&self, reply: i64) -> Option<Child> {
        if reply < self.current_min || reply > self.max {
            return Some(Child::Pruned);
        }
        self.children.get(&reply).copied()
    }

    /// Reclaims map entries for the pruned prefix.
    fn advance_window(&mut self) {
        while self.current_min <= self.max
            && self.children.get(&self.current_min) == Some(&Child::Pruned)
        {
            self.children.remove(&self.current_min);
            self.current_min += 1;
        }
    }
}

/// Arena of visited pick prefixes
///
/// Conceptually a set of pruned playout prefixes; owned by exactly one
/// [`Walk`] for the duration of one search.
#[derive(Debug)]
struct PickTree {
    nodes: Vec<Node>,
    root_pruned: bool,
}

impl PickTree {
    fn new() -> Self {
        Self {
            nodes: vec![Node::new(true)],
            root_pruned: false,
        }
    }
}

/// The tree's single live cursor
///
/// Tracks a position via a stack of node ids and the replies taken to reach
/// it. Below an untracked node no ids exist; those stack slots hold `None`
/// and the subtree is invisible to pruning.
#[derive(Debug)]
pub(crate) struct Walk {
    tree: PickTree,
    stack: Vec<Option<NodeId>>,
    replies: Vec<i64>,
}

impl Walk {
    pub fn new() -> Self {
        Self {
            tree: PickTree::new(),
            stack: vec![Some(0)],
            replies: Vec::new(),
        }
    }

    /// Current depth: number of replies taken.
    pub fn depth(&self) -> usize {
        self.replies.len()
    }

    /// Replies taken so far, root first.
    #[cfg_attr(not(test), allow(unused))]
    pub fn replies(&self) -> &[i64] {
        &self.replies
    }

    /// Whether the whole tree is pruned, i.e. the search space is exhausted.
    #[allow(clippy::indexing_slicing)]
    pub fn pruned(&self) -> bool {
        self.tree.root_pruned || self.tree.nodes[0].is_exhausted()
    }

    fn current(&self) -> Option<NodeId> {
        self.stack.last().copied().flatten()
    }

    /// Sets or validates the request range at `id`.
    ///
    /// # Panics
    ///
    /// Panics if a revisit sees different bounds; the build script is not
    /// deterministic in its request shape at this depth.
    #[allow(clippy::indexing_slicing)]
    fn ensure_range(&mut self, id: NodeId, req: &PickRequest) {
        let node = &mut self.tree.nodes[id];

        if !node.has_range() {
            node.set_range(req);
            return;
        }

        assert!(
            req.same_range(node.min, node.max),
            "pick request [{}, {}] revisits a position created for [{}, {}]",
            req.min(),
            req.max(),
            node.min,
            node.max,
        );
    }

    fn descend(&mut self, child: Option<NodeId>, reply: i64) {
        self.stack.push(child);
        self.replies.push(reply);
    }

    /// Descends to the child for `reply`, creating a tracked node if absent
    /// and the parent is tracked.
    ///
    /// Returns `false` if the target child is already pruned.
    #[allow(clippy::indexing_slicing)]
    pub fn push(&mut self, req: &PickRequest, reply: i64) -> bool {
        debug_assert!(req.contains(reply));

        let Some(id) = self.current() else {
            // below the untracked frontier, nothing is recorded
            self.descend(None, reply);
            return true;
        };

        self.ensure_range(id, req);

        if !self.tree.nodes[id].tracked {
            self.descend(None, reply);
            return true;
        }

        match self.tree.nodes[id].child(reply) {
            Some(Child::Pruned) => false,
            Some(Child::Branch(child)) => {
                self.descend(Some(child), reply);
                true
            }
            None => {
                let child = self.new_node(true);
                self.tree.nodes[id].children.insert(reply, Child::Branch(child));
                self.descend(Some(child), reply);
                true
            }
        }
    }

    /// Like [`Walk::push`], but scans forward (wrapping within the live
    /// window) from `first_choice` to the first unpruned reply and takes it.
    ///
    /// `track = false` creates the child untracked, making the subtree below
    /// it invisible to the tree. A child that keeps getting revisited while
    /// untracked is upgraded once its visits exceed the sibling count.
    #[allow(clippy::indexing_slicing)]
    pub fn push_unpruned(
        &mut self,
        first_choice: i64,
        req: &PickRequest,
        track: bool,
    ) -> Option<i64> {
        debug_assert!(req.contains(first_choice));

        let Some(id) = self.current() else {
            self.descend(None, first_choice);
            return Some(first_choice);
        };

        self.ensure_range(id, req);

        if !self.tree.nodes[id].tracked {
            self.descend(None, first_choice);
            return Some(first_choice);
        }

        if self.tree.nodes[id].is_exhausted() {
            return None;
        }

        let node = &self.tree.nodes[id];
        let mut reply = first_choice.max(node.current_min);

        loop {
            match self.tree.nodes[id].child(reply) {
                Some(Child::Pruned) => {
                    reply += 1;
                    if reply > self.tree.nodes[id].max {
                        reply = self.tree.nodes[id].current_min;
                    }
                }
                Some(Child::Branch(child)) => {
                    let siblings = self.tree.nodes[id].size();
                    let child_node = &mut self.tree.nodes[child];

                    if !child_node.tracked {
                        child_node.visits += 1;
                        if track || child_node.visits > siblings {
                            // hot branch: start tracking from here on
                            child_node.tracked = true;
                            if child_node.has_range() {
                                child_node.branches_left = child_node.size();
                            }
                        }
                    }

                    self.descend(Some(child), reply);
                    return Some(reply);
                }
                None => {
                    let child = self.new_node(track);
                    self.tree.nodes[id].children.insert(reply, Child::Branch(child));
                    self.descend(Some(child), reply);
                    return Some(reply);
                }
            }
        }
    }

    /// Lowest unpruned reply in `[lo, hi]` at the current position.
    #[allow(clippy::indexing_slicing)]
    pub fn first_unpruned_in_range(&self, lo: i64, hi: i64) -> Option<i64> {
        let Some(id) = self.current() else {
            return Some(lo);
        };

        let node = &self.tree.nodes[id];

        if !node.has_range() || !node.tracked {
            return (lo <= hi).then_some(lo);
        }

        let lo = lo.max(node.current_min);
        let hi = hi.min(node.max);

        let mut reply = lo;
        while reply <= hi {
            if node.children.get(&reply) != Some(&Child::Pruned) {
                return Some(reply);
            }
            reply += 1;
        }

        None
    }

    /// Prunes the current leaf and propagates: a node losing its last branch
    /// prunes the corresponding edge in its parent.
    ///
    /// Trims the walk back to the deepest position that still has branches.
    pub fn prune(&mut self) {
        if self.replies.is_empty() {
            self.tree.root_pruned = true;
            return;
        }

        let stopped = self.propagate_exhausted(self.replies.len());
        self.trim(stopped.saturating_sub(1));
    }

    /// Prunes all children strictly below `reply` at the current position.
    #[cfg_attr(not(test), allow(unused))]
    #[allow(clippy::indexing_slicing)]
    pub fn prune_branch_to(&mut self, reply: i64) {
        let Some(id) = self.current() else {
            return;
        };

        let node = &mut self.tree.nodes[id];

        if !node.tracked || !node.has_range() || reply <= node.current_min {
            return;
        }

        let reply = reply.min(node.max + 1);
        let mut already_pruned = 0u64;

        node.children.retain(|&key, child| {
            if key >= reply {
                return true;
            }
            if *child == Child::Pruned {
                already_pruned += 1;
            }
            false
        });

        let window = reply.abs_diff(node.current_min);
        node.branches_left -= window - already_pruned;
        node.current_min = reply;
        node.advance_window();

        if node.is_exhausted() {
            let stopped = self.propagate_exhausted(self.depth());
            self.trim(stopped.saturating_sub(1));
        }
    }

    /// Discards the walk's position above `depth`; does not un-prune.
    pub fn trim(&mut self, depth: usize) {
        if depth < self.replies.len() {
            self.stack.truncate(depth + 1);
            self.replies.truncate(depth);
        }
    }

    /// The position at `level` just became exhausted: prune the edge leading
    /// to it and keep walking up while parents run out of branches.
    ///
    /// Returns the level at which pruning stopped.
    #[allow(clippy::indexing_slicing)]
    fn propagate_exhausted(&mut self, mut level: usize) -> usize {
        while level > 0 {
            let Some(parent) = self.stack[level - 1] else {
                break;
            };

            if !self.tree.nodes[parent].tracked {
                break;
            }

            let edge = self.replies[level - 1];
            self.prune_edge(parent, edge);

            if !self.tree.nodes[parent].is_exhausted() {
                break;
            }

            level -= 1;
        }

        if level == 0 {
            self.tree.root_pruned = true;
        }

        level
    }

    #[allow(clippy::indexing_slicing)]
    fn prune_edge(&mut self, parent: NodeId, edge: i64) {
        let node = &mut self.tree.nodes[parent];

        if edge < node.current_min || edge > node.max {
            return;
        }

        match node.children.insert(edge, Child::Pruned) {
            Some(Child::Pruned) => {}
            Some(Child::Branch(_)) | None => {
                node.branches_left -= 1;
            }
        }

        node.advance_window();
    }

    fn new_node(&mut self, tracked: bool) -> NodeId {
        let tracked = tracked && self.tree.nodes.len() < MAX_NODES;
        self.tree.nodes.push(Node::new(tracked));
        self.tree.nodes.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::Walk;
    use crate::request::PickRequest;
    use test_log::test;

    fn bit() -> PickRequest {
        PickRequest::new(0, 1).expect("valid")
    }

    #[test]
    fn fresh_walk_is_unpruned() {
        let walk = Walk::new();
        assert!(!walk.pruned());
        assert_eq!(0, walk.depth());
    }

    #[test]
    fn push_descends_and_records() {
        let mut walk = Walk::new();

        assert!(walk.push(&bit(), 0));
        assert!(walk.push(&bit(), 1));
        assert_eq!(2, walk.depth());
        assert_eq!(&[0, 1], walk.replies());
    }

    #[test]
    fn pruned_leaf_rejects_revisit() {
        let mut walk = Walk::new();

        assert!(walk.push(&bit(), 0));
        assert!(walk.push(&bit(), 0));
        walk.prune();

        walk.trim(0);
        assert!(walk.push(&bit(), 0));
        assert!(!walk.push(&bit(), 0));
        assert!(walk.push(&bit(), 1));
    }

    #[test]
    fn prune_propagates_to_root() {
        let mut walk = Walk::new();

        for reply in [0, 1] {
            walk.trim(0);
            assert!(walk.push(&bit(), reply));
            walk.prune();
        }

        assert!(walk.pruned());
    }

    #[test]
    fn prune_at_depth_zero_exhausts_tree() {
        let mut walk = Walk::new();
        walk.prune();
        assert!(walk.pruned());
    }

    #[test]
    fn push_unpruned_scans_forward() {
        let req = PickRequest::new(0, 3).expect("valid");
        let mut walk = Walk::new();

        assert_eq!(Some(1), walk.push_unpruned(1, &req, true));
        walk.prune();

        // 1 is gone; scanning from 1 lands on 2
        assert_eq!(Some(2), walk.push_unpruned(1, &req, true));
        walk.prune();

        // scanning from 3 wraps into the live window
        prune_reply(&mut walk, 3, &req);
        assert_eq!(Some(0), walk.push_unpruned(3, &req, true));
    }

    // prunes `reply` at the root, as a playout of its own
    fn prune_reply(walk: &mut Walk, reply: i64, req: &PickRequest) {
        walk.trim(0);
        assert!(walk.push(req, reply));
        walk.prune();
        walk.trim(0);
    }

    #[test]
    fn window_advances_past_pruned_prefix() {
        let req = PickRequest::new(0, 3).expect("valid");
        let mut walk = Walk::new();

        prune_reply(&mut walk, 0, &req);
        prune_reply(&mut walk, 1, &req);

        assert_eq!(Some(2), walk.first_unpruned_in_range(0, 3));
        assert_eq!(None, walk.first_unpruned_in_range(0, 1));
    }

    #[test]
    fn prune_branch_to_discards_lower_children() {
        let req = PickRequest::new(0, 9).expect("valid");
        let mut walk = Walk::new();

        assert!(walk.push(&req, 5));
        walk.trim(0);
        walk.prune_branch_to(5);

        assert_eq!(Some(5), walk.first_unpruned_in_range(0, 9));
        assert!(!walk.push(&req, 4));
        assert!(walk.push(&req, 5));
    }

    #[test]
    fn prune_branch_to_everything_exhausts() {
        let req = PickRequest::new(0, 3).expect("valid");
        let mut walk = Walk::new();

        assert!(walk.push(&req, 0));
        walk.trim(0);
        walk.prune_branch_to(4);

        assert!(walk.pruned());
    }

    #[test]
    fn trim_restarts_cheaply() {
        let mut walk = Walk::new();

        assert!(walk.push(&bit(), 1));
        assert!(walk.push(&bit(), 1));
        walk.trim(1);

        assert_eq!(1, walk.depth());
        assert!(walk.push(&bit(), 0));
        assert_eq!(&[1, 0], walk.replies());
    }

    #[test]
    fn untracked_subtree_is_invisible() {
        let mut walk = Walk::new();
        let req = PickRequest::new(0, 3).expect("valid");

        assert_eq!(Some(2), walk.push_unpruned(2, &req, false));
        assert!(walk.push(&bit(), 1));
        walk.prune();

        // nothing below the untracked node was recorded
        walk.trim(0);
        assert_eq!(Some(2), walk.push_unpruned(2, &req, true));
        assert!(walk.push(&bit(), 1));
    }

    #[test]
    fn hot_untracked_branch_gets_upgraded() {
        let req = PickRequest::new(0, 1).expect("valid");
        let mut walk = Walk::new();

        // size is 2, so the third revisit upgrades the child
        for _ in 0..3 {
            assert_eq!(Some(0), walk.push_unpruned(0, &req, false));
            assert!(walk.push(&bit(), 1));
            walk.prune();
            walk.trim(0);
        }

        assert_eq!(Some(0), walk.push_unpruned(0, &req, false));
        assert!(walk.push(&bit(), 1));
        walk.prune();
        walk.trim(0);

        // (0, 1) is now remembered as pruned
        assert_eq!(Some(0), walk.push_unpruned(0, &req, false));
        assert!(!walk.push(&bit(), 1));
    }

    #[test]
    #[should_panic(expected = "revisits a position")]
    fn range_mismatch_panics() {
        let mut walk = Walk::new();

        assert!(walk.push(&bit(), 0));
        walk.trim(0);

        let other = PickRequest::new(0, 5).expect("valid");
        walk.push(&other, 0);
    }
}
