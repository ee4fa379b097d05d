//! Arena-backed rule forest.
//!
//! Nodes live in slots indexed by `NodeId`; removals push slots onto a
//! free list and never shift surviving indices, so node ids held by
//! readers of a published generation stay valid for that generation's
//! lifetime. Traversal is an explicit-stack preorder walk: roots left to
//! right, children before the next sibling. Every search and fan-out scan
//! uses this one order.

use std::fmt;
use std::sync::Arc;

use loghound_core::{Category, RuleId, Severity};

use crate::definition::RuleDefinition;

/// Index of a node slot within one forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One attachment point of a rule. A fanned-out rule owns several nodes,
/// all sharing one definition.
#[derive(Debug, Clone)]
pub struct RuleNode {
    definition: Arc<RuleDefinition>,
    children: Vec<NodeId>,
}

impl RuleNode {
    fn new(definition: Arc<RuleDefinition>) -> Self {
        Self {
            definition,
            children: Vec::new(),
        }
    }

    pub fn definition(&self) -> &Arc<RuleDefinition> {
        &self.definition
    }

    /// Child node ids, ordered by descending level.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Occupied(RuleNode),
    Vacant { next_free: Option<u32> },
}

/// The rule forest of one generation. Built single-threaded, then shared
/// read-only behind an `Arc` once published.
#[derive(Debug, Clone, Default)]
pub struct RuleForest {
    slots: Vec<Slot>,
    roots: Vec<NodeId>,
    free_head: Option<u32>,
    live: usize,
}

impl RuleForest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes (attachment points, not distinct rules).
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Root node ids, ordered by descending level.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Option<&RuleNode> {
        match self.slots.get(id.index()) {
            Some(Slot::Occupied(node)) => Some(node),
            _ => None,
        }
    }

    pub(crate) fn occupied(&self, id: NodeId) -> &RuleNode {
        self.node(id).expect("vacant forest slot")
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut RuleNode> {
        match self.slots.get_mut(id.index()) {
            Some(Slot::Occupied(node)) => Some(node),
            _ => None,
        }
    }

    /// First root of the given category, in root order.
    pub fn find_root_by_category(&self, category: Category) -> Option<NodeId> {
        self.roots
            .iter()
            .copied()
            .find(|&root| self.occupied(root).definition().category() == category)
    }

    /// First node carrying the given signature id, in preorder.
    pub fn find_by_signature(&self, id: RuleId) -> Option<NodeId> {
        self.iter()
            .find(|(_, node)| node.definition().id() == id)
            .map(|(node_id, _)| node_id)
    }

    /// Preorder traversal over the whole forest.
    pub fn iter(&self) -> DepthFirst<'_> {
        DepthFirst {
            forest: self,
            stack: self.roots.iter().rev().copied().collect(),
        }
    }

    // ── Mutation ──────────────────────────────────────────────

    fn alloc(&mut self, node: RuleNode) -> NodeId {
        if let Some(index) = self.free_head {
            if let Slot::Vacant { next_free } = &self.slots[index as usize] {
                self.free_head = *next_free;
                self.slots[index as usize] = Slot::Occupied(node);
                self.live += 1;
                return NodeId(index);
            }
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot::Occupied(node));
        self.live += 1;
        NodeId(index)
    }

    fn release(&mut self, id: NodeId) {
        let index = id.index();
        if matches!(self.slots.get(index), Some(Slot::Occupied(_))) {
            self.slots[index] = Slot::Vacant {
                next_free: self.free_head,
            };
            self.free_head = Some(index as u32);
            self.live -= 1;
        }
    }

    /// Insert position keeping a sibling list sorted by descending level:
    /// before the first sibling with a strictly lower level, after any
    /// sibling with an equal one.
    fn ordered_position(&self, siblings: &[NodeId], level: Severity) -> usize {
        siblings
            .iter()
            .position(|&sibling| level > self.occupied(sibling).definition().level())
            .unwrap_or(siblings.len())
    }

    pub(crate) fn insert_root(&mut self, definition: Arc<RuleDefinition>) -> NodeId {
        let level = definition.level();
        let id = self.alloc(RuleNode::new(definition));
        let position = self.ordered_position(&self.roots, level);
        self.roots.insert(position, id);
        id
    }

    pub(crate) fn insert_child(&mut self, parent: NodeId, definition: Arc<RuleDefinition>) -> NodeId {
        let level = definition.level();
        let id = self.alloc(RuleNode::new(definition));
        let position = {
            let siblings = self.occupied(parent).children();
            self.ordered_position(siblings, level)
        };
        self.node_mut(parent)
            .expect("vacant parent slot")
            .children
            .insert(position, id);
        id
    }

    /// The subtree rooted at `root`, in preorder.
    pub(crate) fn collect_subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut collected = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if self.node(id).is_none() {
                continue;
            }
            collected.push(id);
            for &child in self.occupied(id).children().iter().rev() {
                stack.push(child);
            }
        }
        collected
    }

    fn parent_of(&self, target: NodeId) -> Option<NodeId> {
        self.iter()
            .find(|(_, node)| node.children().contains(&target))
            .map(|(id, _)| id)
    }

    /// Detach the subtree rooted at `target` and release all its slots.
    /// A target that is already gone is a no-op.
    pub(crate) fn remove_subtree(&mut self, target: NodeId) {
        if self.node(target).is_none() {
            return;
        }
        if let Some(position) = self.roots.iter().position(|&root| root == target) {
            self.roots.remove(position);
        } else if let Some(parent) = self.parent_of(target) {
            let children = &mut self.node_mut(parent).expect("vacant parent slot").children;
            if let Some(position) = children.iter().position(|&child| child == target) {
                children.remove(position);
            }
        }
        for id in self.collect_subtree(target) {
            self.release(id);
        }
    }
}

/// Explicit-stack preorder iterator. No recursion: subtree depth never
/// touches the call stack.
pub struct DepthFirst<'a> {
    forest: &'a RuleForest,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = (NodeId, &'a RuleNode);

    fn next(&mut self) -> Option<Self::Item> {
        let forest: &'a RuleForest = self.forest;
        let id = self.stack.pop()?;
        let node = forest.occupied(id);
        for &child in node.children().iter().rev() {
            self.stack.push(child);
        }
        Some((id, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loghound_core::Severity;

    fn definition(id: RuleId, level: u16) -> Arc<RuleDefinition> {
        Arc::new(
            RuleDefinition::builder(id, Severity::from_level(level).unwrap(), Category::Syslog)
                .build()
                .unwrap(),
        )
    }

    fn definition_in(id: RuleId, level: u16, category: Category) -> Arc<RuleDefinition> {
        Arc::new(
            RuleDefinition::builder(id, Severity::from_level(level).unwrap(), category)
                .build()
                .unwrap(),
        )
    }

    fn ids(forest: &RuleForest, nodes: &[NodeId]) -> Vec<RuleId> {
        nodes
            .iter()
            .map(|&id| forest.occupied(id).definition().id())
            .collect()
    }

    #[test]
    fn roots_stay_sorted_by_descending_level() {
        let mut forest = RuleForest::new();
        forest.insert_root(definition(1, 5));
        forest.insert_root(definition(2, 7));
        forest.insert_root(definition(3, 3));
        forest.insert_root(definition(4, 7));
        forest.insert_root(definition(5, 10));

        assert_eq!(ids(&forest, forest.roots()), vec![5, 2, 4, 1, 3]);
    }

    #[test]
    fn equal_levels_keep_insertion_order() {
        let mut forest = RuleForest::new();
        forest.insert_root(definition(1, 5));
        forest.insert_root(definition(2, 5));
        forest.insert_root(definition(3, 5));

        assert_eq!(ids(&forest, forest.roots()), vec![1, 2, 3]);
    }

    #[test]
    fn children_are_level_ordered_too() {
        let mut forest = RuleForest::new();
        let root = forest.insert_root(definition(1, 10));
        forest.insert_child(root, definition(2, 3));
        forest.insert_child(root, definition(3, 8));
        forest.insert_child(root, definition(4, 3));

        assert_eq!(ids(&forest, forest.occupied(root).children()), vec![3, 2, 4]);
    }

    #[test]
    fn traversal_visits_children_before_next_sibling() {
        let mut forest = RuleForest::new();
        let a = forest.insert_root(definition(10, 5));
        let b = forest.insert_child(a, definition(11, 7));
        forest.insert_child(a, definition(12, 3));
        forest.insert_child(b, definition(13, 1));
        forest.insert_root(definition(14, 2));

        let order: Vec<RuleId> = forest
            .iter()
            .map(|(_, node)| node.definition().id())
            .collect();
        assert_eq!(order, vec![10, 11, 13, 12, 14]);
    }

    #[test]
    fn find_by_signature_reaches_nested_nodes() {
        let mut forest = RuleForest::new();
        let root = forest.insert_root(definition(100, 5));
        let child = forest.insert_child(root, definition(101, 3));

        assert_eq!(forest.find_by_signature(101), Some(child));
        assert_eq!(forest.find_by_signature(999), None);
    }

    #[test]
    fn find_root_by_category_scans_roots_only() {
        let mut forest = RuleForest::new();
        let syslog = forest.insert_root(definition_in(1, 5, Category::Syslog));
        let firewall = forest.insert_root(definition_in(2, 5, Category::Firewall));
        forest.insert_child(syslog, definition_in(3, 4, Category::Windows));

        assert_eq!(forest.find_root_by_category(Category::Firewall), Some(firewall));
        assert_eq!(forest.find_root_by_category(Category::Windows), None);
    }

    #[test]
    fn remove_subtree_splices_parent_and_releases_slots() {
        let mut forest = RuleForest::new();
        let root = forest.insert_root(definition(1, 10));
        let doomed = forest.insert_child(root, definition(2, 8));
        forest.insert_child(doomed, definition(3, 5));
        let kept = forest.insert_child(root, definition(4, 2));

        forest.remove_subtree(doomed);

        assert_eq!(forest.len(), 2);
        assert!(forest.node(doomed).is_none());
        assert_eq!(forest.occupied(root).children(), &[kept]);
        assert_eq!(forest.find_by_signature(3), None);
    }

    #[test]
    fn removing_a_root_updates_the_root_list() {
        let mut forest = RuleForest::new();
        let first = forest.insert_root(definition(1, 9));
        let second = forest.insert_root(definition(2, 5));
        forest.insert_child(first, definition(3, 4));

        forest.remove_subtree(first);

        assert_eq!(forest.roots(), &[second]);
        assert_eq!(forest.len(), 1);
    }

    #[test]
    fn released_slots_are_reused() {
        let mut forest = RuleForest::new();
        forest.insert_root(definition(1, 5));
        let doomed = forest.insert_root(definition(2, 5));
        forest.remove_subtree(doomed);

        let slots_before = forest.slots.len();
        forest.insert_root(definition(3, 5));
        assert_eq!(forest.slots.len(), slots_before);
        assert_eq!(forest.len(), 2);
    }
}
