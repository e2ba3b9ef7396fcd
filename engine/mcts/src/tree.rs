//! MCTS tree structure with arena allocation.
//!
//! The tree uses arena allocation for efficient node storage and
//! cache-friendly traversal. Nodes are stored in a contiguous Vec
//! and referenced by NodeId indices. A node is owned by the arena and
//! reachable only through its parent's child list, parent links are plain
//! indices, so the structure has no reference cycles.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::node::{MctsNode, NodeId};
use crate::state::{State, StateError};

/// Direction of the final action choice at the root.
///
/// Rewards are read from one global perspective, so a minimising agent
/// picks the child with the lowest mean reward instead of negating values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Objective {
    #[default]
    Maximize,
    Minimize,
}

impl Objective {
    /// Whether `candidate` strictly beats `incumbent`. Ties keep the incumbent.
    #[inline]
    fn prefers(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Maximize => candidate > incumbent,
            Self::Minimize => candidate < incumbent,
        }
    }
}

impl From<bool> for Objective {
    /// `true` maximises, `false` minimises.
    fn from(maximal: bool) -> Self {
        if maximal {
            Self::Maximize
        } else {
            Self::Minimize
        }
    }
}

/// MCTS tree with arena-based node storage.
#[derive(Debug, Clone)]
pub struct MctsTree<S: State> {
    /// Arena storing all nodes
    nodes: Vec<MctsNode<S>>,

    /// Root node index (always 0)
    root: NodeId,
}

impl<S: State> MctsTree<S> {
    /// Create a new tree with the given root state.
    pub fn new(root_state: S) -> Self {
        Self {
            nodes: vec![MctsNode::new_root(root_state)],
            root: NodeId(0),
        }
    }

    /// Get the root node ID.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a reference to a node by ID.
    #[inline]
    pub fn get(&self, id: NodeId) -> &MctsNode<S> {
        &self.nodes[id.index()]
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut MctsNode<S> {
        &mut self.nodes[id.index()]
    }

    fn allocate(&mut self, node: MctsNode<S>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Get the total number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty (never true after construction).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get the arena slice for read access.
    #[inline]
    pub fn arena(&self) -> &[MctsNode<S>] {
        &self.nodes
    }

    /// Select the child of `node_id` with the highest UCB1 score.
    ///
    /// Ties go to the child expanded first. Returns `None` for a frontier
    /// node.
    pub fn select_child(&self, node_id: NodeId, exploration_constant: f64) -> Option<NodeId> {
        let node = self.get(node_id);
        let parent_visits = node.num_visits;

        let mut best: Option<(NodeId, f64)> = None;
        for (_, id) in &node.children {
            let score = self.get(*id).ucb_score(parent_visits, exploration_constant);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((*id, score)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// Add a child to a parent node.
    /// Returns the new child's NodeId.
    pub fn add_child(&mut self, parent_id: NodeId, action: S::Action, state: S) -> NodeId {
        let child_id = self.allocate(MctsNode::new_child(parent_id, action.clone(), state));

        // Add to parent's children
        self.get_mut(parent_id).children.push((action, child_id));

        child_id
    }

    /// Grow the tree by one ply below `node_id`.
    ///
    /// Adds one child per legal action of the node's state, then returns one
    /// of the new children chosen uniformly at random. All child states are
    /// computed before any child is inserted, so a failing transition leaves
    /// the node on the frontier. Must be called on a frontier node.
    pub fn expand<R: Rng + ?Sized>(
        &mut self,
        node_id: NodeId,
        rng: &mut R,
    ) -> Result<NodeId, StateError> {
        let node = self.get(node_id);
        let actions = node.state.possible_actions();
        if actions.is_empty() {
            return Err(StateError::NoLegalActions);
        }

        let mut successors: Vec<(S::Action, S)> = Vec::with_capacity(actions.len());
        for action in actions {
            // Duplicate actions map to one child
            if successors.iter().any(|(a, _)| *a == action) {
                continue;
            }
            let next = node.state.take_action(&action)?;
            successors.push((action, next));
        }

        let new_children: Vec<NodeId> = successors
            .into_iter()
            .map(|(action, state)| self.add_child(node_id, action, state))
            .collect();

        new_children
            .choose(rng)
            .copied()
            .ok_or(StateError::NoLegalActions)
    }

    /// Backpropagate a reward from a node to the root.
    /// The reward is added unchanged at every level.
    pub fn backpropagate(&mut self, leaf_id: NodeId, reward: f64) {
        let mut current_id = leaf_id;

        while current_id.is_some() {
            let node = self.get_mut(current_id);
            node.num_visits += 1;
            node.total_reward += reward;
            current_id = node.parent;
        }
    }

    /// Get the root child with the extreme mean reward.
    ///
    /// Ranks by exploitation value only, not UCB1. Ties go to the child
    /// expanded first. Returns `None` if the root has no children.
    pub fn best_action(&self, objective: Objective) -> Option<(&S::Action, NodeId)> {
        let root = self.get(self.root);

        let mut best: Option<(&S::Action, NodeId, f64)> = None;
        for (action, id) in &root.children {
            let value = self.get(*id).exploitation_value();
            match best {
                Some((_, _, best_value)) if !objective.prefers(value, best_value) => {}
                _ => best = Some((action, *id, value)),
            }
        }
        best.map(|(action, id, _)| (action, id))
    }

    /// Root children as (action, visits, mean reward), in expansion order.
    pub fn root_children(&self) -> Vec<(S::Action, u32, f64)> {
        self.get(self.root)
            .children
            .iter()
            .map(|(action, id)| {
                let child = self.get(*id);
                (action.clone(), child.num_visits, child.exploitation_value())
            })
            .collect()
    }

    /// Deep-copy the subtree rooted at `node_id` into a new tree.
    ///
    /// The copied node becomes the root (its parent link is cleared) and
    /// keeps its statistics. Nodes outside the subtree are not copied.
    pub fn subtree(&self, node_id: NodeId) -> Self {
        let mut nodes: Vec<MctsNode<S>> = Vec::new();
        let mut queue: VecDeque<(NodeId, Option<(NodeId, S::Action)>)> =
            VecDeque::from([(node_id, None)]);

        while let Some((old_id, link)) = queue.pop_front() {
            let old = self.get(old_id);
            let new_id = NodeId(nodes.len() as u32);

            let (parent, action) = match link {
                Some((parent, action)) => {
                    nodes[parent.index()].children.push((action.clone(), new_id));
                    (parent, Some(action))
                }
                None => (NodeId::NONE, None),
            };

            nodes.push(MctsNode {
                parent,
                action,
                state: old.state.clone(),
                num_visits: old.num_visits,
                total_reward: old.total_reward,
                children: Vec::with_capacity(old.children.len()),
            });

            for (action, child_id) in &old.children {
                queue.push_back((*child_id, Some((new_id, action.clone()))));
            }
        }

        Self {
            nodes,
            root: NodeId(0),
        }
    }

    /// Get statistics about the tree for debugging.
    pub fn stats(&self) -> TreeStats {
        let root = self.get(self.root);
        TreeStats {
            total_nodes: self.nodes.len(),
            root_visits: root.num_visits,
            root_value: root.exploitation_value(),
            max_depth: self.compute_max_depth(self.root, 0),
        }
    }

    fn compute_max_depth(&self, node_id: NodeId, current_depth: u32) -> u32 {
        let node = self.get(node_id);
        if node.children.is_empty() {
            return current_depth;
        }

        node.children
            .iter()
            .map(|(_, id)| self.compute_max_depth(*id, current_depth + 1))
            .max()
            .unwrap_or(current_depth)
    }
}

/// Statistics about an MCTS tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_visits: u32,
    pub root_value: f64,
    pub max_depth: u32,
}
