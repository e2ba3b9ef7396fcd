//! MCTS tree node representation.
//!
//! Each node represents a state reached by taking an action from the parent.
//! Nodes store the visit statistics used for UCB1 selection and for the final
//! choice of action at the root.

use crate::state::State;

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node in the MCTS tree.
#[derive(Debug, Clone)]
pub struct MctsNode<S: State> {
    /// Parent node index (NONE for root). Navigation only.
    pub parent: NodeId,

    /// Action that led to this node from parent (None for root)
    pub action: Option<S::Action>,

    /// State this node represents
    pub state: S,

    /// Number of completed iterations whose path included this node
    pub num_visits: u32,

    /// Sum of terminal rewards backpropagated through this node
    pub total_reward: f64,

    /// Children in expansion order: (action, NodeId) pairs.
    /// Empty until the node is expanded.
    pub children: Vec<(S::Action, NodeId)>,
}

impl<S: State> MctsNode<S> {
    /// Create a new root node.
    pub fn new_root(state: S) -> Self {
        Self {
            parent: NodeId::NONE,
            action: None,
            state,
            num_visits: 0,
            total_reward: 0.0,
            children: Vec::new(),
        }
    }

    /// Create a new child node.
    pub fn new_child(parent: NodeId, action: S::Action, state: S) -> Self {
        Self {
            parent,
            action: Some(action),
            state,
            num_visits: 0,
            total_reward: 0.0,
            children: Vec::new(),
        }
    }

    /// Mean reward observed through this node.
    /// Returns 0.0 if never visited.
    #[inline]
    pub fn exploitation_value(&self) -> f64 {
        if self.num_visits == 0 {
            0.0
        } else {
            self.total_reward / f64::from(self.num_visits)
        }
    }

    /// UCB1 uncertainty bonus: sqrt(ln(N_parent) / N).
    ///
    /// Exactly `f64::INFINITY` for an unvisited node, so every sibling is
    /// tried once before any sibling is tried twice.
    #[inline]
    pub fn exploration_value(&self, parent_visits: u32) -> f64 {
        if self.num_visits == 0 {
            f64::INFINITY
        } else {
            (f64::from(parent_visits).ln() / f64::from(self.num_visits)).sqrt()
        }
    }

    /// UCB1 score = exploitation + C * exploration.
    ///
    /// Unvisited nodes score `f64::INFINITY` directly, which keeps the
    /// ordering intact for `C = 0` where `0 * inf` would be NaN.
    #[inline]
    pub fn ucb_score(&self, parent_visits: u32, exploration_constant: f64) -> f64 {
        if self.num_visits == 0 {
            return f64::INFINITY;
        }
        self.exploitation_value() + exploration_constant * self.exploration_value(parent_visits)
    }

    /// Check if this node has been expanded (has children).
    #[inline]
    pub fn is_expanded(&self) -> bool {
        !self.children.is_empty()
    }

    /// A frontier node has no children yet.
    ///
    /// This is a structural property of the tree, unrelated to
    /// [`State::is_terminal`]: terminal states stay on the frontier forever,
    /// but so does every node that simply has not been expanded yet.
    #[inline]
    pub fn is_frontier(&self) -> bool {
        self.children.is_empty()
    }

    /// Look up the child reached by `action`.
    pub fn child(&self, action: &S::Action) -> Option<NodeId> {
        self.children
            .iter()
            .find(|(a, _)| a == action)
            .map(|(_, id)| *id)
    }
}
