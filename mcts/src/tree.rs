//! Arena-backed tree storage.
//!
//! Nodes live in a contiguous vector and reference each other through
//! indices, which sidesteps the cyclic parent links a pointer-based
//! tree would need. Released subtrees go back to a free list so long
//! searches recycle memory instead of growing without bound.

use crate::node::{NodeId, UctNode};

/// Search tree with arena-based node storage.
#[derive(Debug, Default)]
pub struct UctTree {
    /// Arena storing all nodes, including freed slots
    nodes: Vec<UctNode>,

    /// Slots available for recycling
    free: Vec<NodeId>,
}

impl UctTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn live_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Discards every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &UctNode {
        &self.nodes[id.0 as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut UctNode {
        &mut self.nodes[id.0 as usize]
    }

    /// Stores a node, recycling a freed slot when one is available.
    pub fn allocate(&mut self, node: UctNode) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.0 as usize] = node;
                id
            }
            None => {
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(node);
                id
            }
        }
    }

    /// Appends a child at the tail of a parent's child list, keeping
    /// the move generation order.
    pub fn push_child(&mut self, parent: NodeId, child: NodeId) {
        self.get_mut(child).parent = parent;
        self.get_mut(child).sibling = NodeId::NONE;

        let head = self.get(parent).child;

        if head.is_none() {
            self.get_mut(parent).child = child;
            return;
        }

        let mut last = head;
        while self.get(last).sibling.is_some() {
            last = self.get(last).sibling;
        }

        self.get_mut(last).sibling = child;
    }

    /// Recursive lookup of a node by position hash, bounded in depth.
    pub fn find_node(&self, node: NodeId, hash: u64, depth: u32) -> Option<NodeId> {
        if self.get(node).hash == hash {
            return Some(node);
        }

        if depth == 0 {
            return None;
        }

        let mut child = self.get(node).child;

        while child.is_some() {
            if let Some(found) = self.find_node(child, hash, depth - 1) {
                return Some(found);
            }

            child = self.get(child).sibling;
        }

        None
    }

    /// Releases a node and its whole subtree back to the free list.
    pub fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            let mut child = self.get(current).child;

            while child.is_some() {
                stack.push(child);
                child = self.get(child).sibling;
            }

            self.free.push(current);
        }
    }

    /// Detaches and releases the children of a node, rewinding its
    /// move generator so the node can expand again later.
    pub fn detach_children(&mut self, id: NodeId) {
        let mut child = self.get(id).child;

        while child.is_some() {
            let sibling = self.get(child).sibling;
            self.release(child);
            child = sibling;
        }

        let node = self.get_mut(id);
        node.child = NodeId::NONE;
        node.expanded = false;
        node.cursor = node.first_cursor;
    }

    /// Makes a node the new root, releasing every node outside its
    /// subtree. The former parent chain becomes free memory.
    pub fn reroot(&mut self, new_root: NodeId) {
        // Unlink the subtree, then release everything reachable from
        // the old top of the tree

        let parent = self.get(new_root).parent;

        if parent.is_none() {
            return;
        }

        let mut top = parent;
        while self.get(top).parent.is_some() {
            top = self.get(top).parent;
        }

        let previous = self.get(parent).child;

        if previous == new_root {
            self.get_mut(parent).child = self.get(new_root).sibling;
        } else {
            let mut node = previous;

            while self.get(node).sibling != new_root {
                node = self.get(node).sibling;
            }

            self.get_mut(node).sibling = self.get(new_root).sibling;
        }

        self.release(top);

        let root = self.get_mut(new_root);
        root.parent = NodeId::NONE;
        root.sibling = NodeId::NONE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(mv: i32, hash: u64) -> UctNode {
        UctNode::new(mv, hash, 1, 0, false)
    }

    /// Builds root -> (a, b), a -> (c)
    fn sample_tree() -> (UctTree, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = UctTree::new();

        let root = tree.allocate(leaf(-1, 100));
        let a = tree.allocate(leaf(0, 101));
        let b = tree.allocate(leaf(1, 102));
        let c = tree.allocate(leaf(2, 103));

        tree.push_child(root, a);
        tree.push_child(root, b);
        tree.push_child(a, c);

        (tree, root, a, b, c)
    }

    #[test]
    fn push_child_keeps_insertion_order() {
        let (tree, root, a, b, _) = sample_tree();

        assert_eq!(tree.get(root).child, a);
        assert_eq!(tree.get(a).sibling, b);
        assert!(tree.get(b).sibling.is_none());
        assert_eq!(tree.get(a).parent, root);
        assert_eq!(tree.get(b).parent, root);
    }

    #[test]
    fn find_node_respects_the_depth_bound() {
        let (tree, root, a, _, c) = sample_tree();

        assert_eq!(tree.find_node(root, 100, 0), Some(root));
        assert_eq!(tree.find_node(root, 103, 2), Some(c));
        assert_eq!(tree.find_node(root, 103, 1), None);
        assert_eq!(tree.find_node(a, 103, 1), Some(c));
        assert_eq!(tree.find_node(root, 999, 2), None);
    }

    #[test]
    fn release_recycles_whole_subtrees() {
        let (mut tree, _, a, _, _) = sample_tree();
        assert_eq!(tree.live_count(), 4);

        tree.release(a);
        assert_eq!(tree.live_count(), 2);

        // Freed slots are recycled before the arena grows
        let recycled = tree.allocate(leaf(7, 200));
        assert_eq!(tree.live_count(), 3);
        assert!(recycled == a || recycled.0 == 3);
    }

    #[test]
    fn detach_children_rewinds_the_generator() {
        let (mut tree, _, a, _, _) = sample_tree();

        tree.get_mut(a).expanded = true;
        tree.get_mut(a).cursor = 5;

        tree.detach_children(a);

        let node = tree.get(a);
        assert!(node.child.is_none());
        assert!(!node.expanded);
        assert_eq!(node.cursor, node.first_cursor);
        assert_eq!(tree.live_count(), 3);
    }

    #[test]
    fn reroot_releases_everything_outside_the_subtree() {
        let (mut tree, _, a, _, c) = sample_tree();

        tree.reroot(a);

        assert!(tree.get(a).parent.is_none());
        assert!(tree.get(a).sibling.is_none());
        assert_eq!(tree.get(a).child, c);
        assert_eq!(tree.live_count(), 2);
    }

    #[test]
    fn reroot_of_a_later_sibling() {
        let (mut tree, _, _, b, _) = sample_tree();

        tree.reroot(b);

        assert!(tree.get(b).parent.is_none());
        assert_eq!(tree.live_count(), 1);
    }

    #[test]
    fn reroot_of_the_current_root_is_a_no_op() {
        let (mut tree, root, _, _, _) = sample_tree();

        tree.reroot(root);
        assert_eq!(tree.live_count(), 4);
    }
}
