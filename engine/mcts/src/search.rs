//! MCTS search implementation.
//!
//! Implements the core UCT loop. Every iteration runs to completion before
//! the next one starts:
//! 1. Selection: Descend from the root by UCB1 until a frontier node
//! 2. Expansion: Add one child per legal action and pick one at random
//!    (terminal states are never expanded)
//! 3. Simulation: Play uniformly random actions until a terminal state
//! 4. Backpropagation: Add the terminal reward to every node on the path

use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::{ConfigError, MctsConfig, SearchBudget};
use crate::node::NodeId;
use crate::state::{State, StateError};
use crate::tree::{MctsTree, Objective};

/// Errors that can occur during MCTS search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("No legal actions available from a non-terminal state")]
    NoLegalActions,

    #[error("Invalid action applied: {0}")]
    InvalidAction(#[source] StateError),

    #[error("Root has no children to choose from")]
    EmptyRootChildren,

    #[error("Action {action} is not a child of the root")]
    UnknownAction { action: String },

    #[error("Rollout reached {depth} transitions without a terminal state")]
    RolloutDepthExceeded { depth: u32 },

    #[error("Invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl From<StateError> for SearchError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::NoLegalActions => Self::NoLegalActions,
            other => Self::InvalidAction(other),
        }
    }
}

/// Result of an MCTS search.
#[derive(Debug, Clone)]
pub struct SearchResult<A> {
    /// Best action to take
    pub action: A,

    /// Mean reward of the chosen child
    pub value: f64,

    /// Visits of the chosen child
    pub visits: u32,

    /// Number of iterations performed by this call
    pub iterations: u32,

    /// Wall-clock time spent iterating
    pub elapsed: Duration,
}

/// MCTS search state: a tree plus the configuration it was built with.
///
/// The exploration constant is fixed for the lifetime of the search and is
/// carried over by [`MctsSearch::create_tree_from_action`].
#[derive(Debug, Clone)]
pub struct MctsSearch<S: State> {
    tree: MctsTree<S>,
    config: MctsConfig,
}

impl<S: State> MctsSearch<S> {
    /// Create a new search from the given state with the default config.
    pub fn new(state: S) -> Self {
        Self {
            tree: MctsTree::new(state),
            config: MctsConfig::default(),
        }
    }

    /// Create a new search with a validated config.
    pub fn with_config(state: S, config: MctsConfig) -> Result<Self, SearchError> {
        config.validate()?;
        Ok(Self {
            tree: MctsTree::new(state),
            config,
        })
    }

    /// Exploration constant `C` used by UCB1.
    pub fn exploration_constant(&self) -> f64 {
        self.config.exploration_constant
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Get the search tree (for inspection/debugging).
    pub fn tree(&self) -> &MctsTree<S> {
        &self.tree
    }

    /// State at the root of the tree.
    pub fn root_state(&self) -> &S {
        &self.tree.get(self.tree.root()).state
    }

    /// Run one select -> expand -> simulate -> backpropagate iteration.
    pub fn iterate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), SearchError> {
        let leaf_id = self.select();
        let node_id = self.expand_node(leaf_id, rng)?;
        let reward = self.simulate(node_id, rng)?;
        self.tree.backpropagate(node_id, reward);

        trace!(
            leaf = leaf_id.0,
            simulated = node_id.0,
            reward,
            "MCTS iteration complete"
        );

        Ok(())
    }

    /// Select a frontier node by descending the tree using UCB1.
    fn select(&self) -> NodeId {
        let mut current = self.tree.root();

        while self.tree.get(current).is_expanded() {
            match self
                .tree
                .select_child(current, self.config.exploration_constant)
            {
                Some(child_id) => current = child_id,
                None => break,
            }
        }

        current
    }

    /// Expand a frontier node and return the node to simulate from.
    /// Terminal states are returned unchanged and stay on the frontier.
    fn expand_node<R: Rng + ?Sized>(
        &mut self,
        node_id: NodeId,
        rng: &mut R,
    ) -> Result<NodeId, SearchError> {
        if self.tree.get(node_id).state.is_terminal() {
            return Ok(node_id);
        }
        Ok(self.tree.expand(node_id, rng)?)
    }

    /// Play random actions from the node's state until a terminal state and
    /// return its reward. Does not touch the tree.
    fn simulate<R: Rng + ?Sized>(&self, node_id: NodeId, rng: &mut R) -> Result<f64, SearchError> {
        let start = &self.tree.get(node_id).state;
        let mut current: Option<S> = None;
        let mut depth = 0u32;

        loop {
            let state = current.as_ref().unwrap_or(start);
            if state.is_terminal() {
                return Ok(state.reward());
            }

            if let Some(max_depth) = self.config.max_rollout_depth {
                if depth >= max_depth {
                    return state
                        .estimated_reward()
                        .ok_or(SearchError::RolloutDepthExceeded { depth });
                }
            }

            let next = state.take_random_action(rng)?;
            current = Some(next);
            depth += 1;
        }
    }

    /// Run the search under `budget`, then pick the root child with the
    /// extreme mean reward.
    pub fn search<R: Rng + ?Sized>(
        &mut self,
        budget: SearchBudget,
        objective: impl Into<Objective>,
        rng: &mut R,
    ) -> Result<SearchResult<S::Action>, SearchError> {
        let objective = objective.into();
        let start = Instant::now();

        let iterations = match budget {
            SearchBudget::Iterations(n) => {
                for _ in 0..n {
                    self.iterate(rng)?;
                }
                n
            }
            SearchBudget::Time(limit) => {
                // No new iteration starts after the deadline; the last one
                // always runs to completion
                let deadline = start.checked_add(limit);
                let mut n = 0u32;
                while deadline.map_or(true, |d| Instant::now() < d) {
                    self.iterate(rng)?;
                    n += 1;
                }
                n
            }
        };
        let elapsed = start.elapsed();

        let (action, child_id) = self
            .tree
            .best_action(objective)
            .ok_or(SearchError::EmptyRootChildren)?;
        let child = self.tree.get(child_id);

        debug!(
            ?action,
            ?objective,
            iterations,
            elapsed_ms = elapsed.as_millis() as u64,
            value = child.exploitation_value(),
            visits = child.num_visits,
            nodes = self.tree.len(),
            "MCTS search complete"
        );

        Ok(SearchResult {
            action: action.clone(),
            value: child.exploitation_value(),
            visits: child.num_visits,
            iterations,
            elapsed,
        })
    }

    /// Run the search under the config's default budget.
    pub fn run<R: Rng + ?Sized>(
        &mut self,
        objective: impl Into<Objective>,
        rng: &mut R,
    ) -> Result<SearchResult<S::Action>, SearchError> {
        self.search(self.config.budget(), objective, rng)
    }

    /// Run exactly `iterations` iterations and return the best root action.
    pub fn select_best_action_iterations<R: Rng + ?Sized>(
        &mut self,
        iterations: u32,
        objective: impl Into<Objective>,
        rng: &mut R,
    ) -> Result<S::Action, SearchError> {
        self.search(SearchBudget::Iterations(iterations), objective, rng)
            .map(|result| result.action)
    }

    /// Iterate until `limit` has elapsed and return the best root action.
    pub fn select_best_action_time<R: Rng + ?Sized>(
        &mut self,
        limit: Duration,
        objective: impl Into<Objective>,
        rng: &mut R,
    ) -> Result<S::Action, SearchError> {
        self.search(SearchBudget::Time(limit), objective, rng)
            .map(|result| result.action)
    }

    /// Best root action under the current statistics, without iterating.
    pub fn best_action(&self, objective: impl Into<Objective>) -> Result<S::Action, SearchError> {
        self.tree
            .best_action(objective.into())
            .map(|(action, _)| action.clone())
            .ok_or(SearchError::EmptyRootChildren)
    }

    /// Build a new search rooted at the child reached by `action`.
    ///
    /// The child's subtree is deep-copied with its statistics and the same
    /// config; sibling subtrees are left behind.
    pub fn create_tree_from_action(&self, action: &S::Action) -> Result<Self, SearchError> {
        let child_id = self
            .tree
            .get(self.tree.root())
            .child(action)
            .ok_or_else(|| SearchError::UnknownAction {
                action: format!("{action:?}"),
            })?;

        let tree = self.tree.subtree(child_id);
        debug!(
            ?action,
            kept_nodes = tree.len(),
            dropped_nodes = self.tree.len() - tree.len(),
            "Re-rooted search tree"
        );

        Ok(Self {
            tree,
            config: self.config.clone(),
        })
    }
}

/// Convenience function to run a single MCTS search from a fresh tree.
pub fn run_mcts<S: State, R: Rng + ?Sized>(
    state: S,
    config: MctsConfig,
    objective: impl Into<Objective>,
    rng: &mut R,
) -> Result<SearchResult<S::Action>, SearchError> {
    let mut search = MctsSearch::with_config(state, config)?;
    search.run(objective, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Bandit, Dead, Endless, Liar, Walk};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(42)
    }

    #[test]
    fn test_two_actions_maximal() {
        let mut search = MctsSearch::new(Bandit::new(vec![1.0, -1.0]));
        let action = search
            .select_best_action_iterations(20, true, &mut rng())
            .unwrap();
        assert_eq!(action, 0);
    }

    #[test]
    fn test_two_actions_minimal() {
        let mut search = MctsSearch::new(Bandit::new(vec![1.0, -1.0]));
        let action = search
            .select_best_action_iterations(20, false, &mut rng())
            .unwrap();
        assert_eq!(action, 1);
    }

    #[test]
    fn test_two_actions_converge_to_true_means() {
        let mut search = MctsSearch::new(Bandit::new(vec![1.0, -1.0]));
        search
            .select_best_action_iterations(30, Objective::Maximize, &mut rng())
            .unwrap();

        for (action, visits, mean) in search.tree().root_children() {
            assert!(visits > 0);
            let expected = if action == 0 { 1.0 } else { -1.0 };
            assert!((mean - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_single_action() {
        for n in [1, 2, 10] {
            let mut search = MctsSearch::new(Bandit::new(vec![0.5]));
            let action = search
                .select_best_action_iterations(n, true, &mut rng())
                .unwrap();

            assert_eq!(action, 0);
            assert_eq!(search.tree().get(search.tree().root()).children.len(), 1);
        }
    }

    #[test]
    fn test_root_visits_equal_iterations() {
        for n in [1, 7, 100] {
            let mut search = MctsSearch::new(Walk::new(4));
            search
                .search(SearchBudget::Iterations(n), true, &mut rng())
                .unwrap();
            assert_eq!(search.tree().get(search.tree().root()).num_visits, n);
        }
    }

    #[test]
    fn test_child_visits_sum_to_parent_visits() {
        let mut search = MctsSearch::new(Walk::new(5));
        search.select_best_action_iterations(200, true, &mut rng()).unwrap();

        // Every iteration through an expanded node continues into one child,
        // except possibly the single iteration in which that node was the
        // freshly expanded child simulated from directly
        let tree = search.tree();
        let root = tree.get(tree.root());
        let root_child_visits: u32 = root.children.iter().map(|(_, id)| tree.get(*id).num_visits).sum();
        assert_eq!(root_child_visits, root.num_visits);

        for node in tree.arena() {
            if node.is_expanded() {
                let child_visits: u32 = node.children.iter().map(|(_, id)| tree.get(*id).num_visits).sum();
                assert!(child_visits <= node.num_visits);
                assert!(node.num_visits - child_visits <= 1);
            }
        }
    }

    #[test]
    fn test_unvisited_children_are_tried_first() {
        let mut search = MctsSearch::with_config(
            Bandit::new(vec![100.0, -5.0, 3.0, 0.0, 1.0]),
            MctsConfig::default().with_exploration_constant(0.0),
        )
        .unwrap();

        let mut rng = rng();
        for _ in 0..5 {
            search.iterate(&mut rng).unwrap();
        }

        // Even with no exploration bonus, every arm is pulled once before
        // the best one is revisited
        for (_, visits, _) in search.tree().root_children() {
            assert_eq!(visits, 1);
        }
    }

    #[test]
    fn test_terminal_nodes_are_never_expanded() {
        let mut search = MctsSearch::new(Bandit::new(vec![1.0, -1.0, 0.5]));
        search.select_best_action_iterations(50, true, &mut rng()).unwrap();

        let tree = search.tree();
        assert_eq!(tree.len(), 4);
        for (_, id) in &tree.get(tree.root()).children {
            let child = tree.get(*id);
            assert!(child.state.is_terminal());
            assert!(child.is_frontier());
        }
    }

    #[test]
    fn test_terminal_root() {
        let terminal = Bandit::new(vec![1.0]).take_action(&0).unwrap();
        let mut search = MctsSearch::new(terminal);

        let err = search
            .select_best_action_iterations(5, true, &mut rng())
            .unwrap_err();
        assert!(matches!(err, SearchError::EmptyRootChildren));

        // Every iteration still backpropagated the terminal reward
        let root = search.tree().get(search.tree().root());
        assert_eq!(root.num_visits, 5);
        assert!((root.total_reward - 5.0).abs() < 1e-9);
        assert!(root.is_frontier());
    }

    #[test]
    fn test_zero_iterations_on_fresh_tree() {
        let mut search = MctsSearch::new(Walk::new(2));
        let err = search
            .select_best_action_iterations(0, true, &mut rng())
            .unwrap_err();
        assert!(matches!(err, SearchError::EmptyRootChildren));
    }

    #[test]
    fn test_no_legal_actions() {
        let mut search = MctsSearch::new(Dead);
        let err = search.iterate(&mut rng()).unwrap_err();
        assert!(matches!(err, SearchError::NoLegalActions));
    }

    #[test]
    fn test_invalid_action() {
        let mut search = MctsSearch::new(Liar);
        let err = search.iterate(&mut rng()).unwrap_err();
        assert!(matches!(
            err,
            SearchError::InvalidAction(StateError::IllegalAction { .. })
        ));
    }

    #[test]
    fn test_rollout_depth_limit_uses_estimate() {
        let config = MctsConfig::default().with_max_rollout_depth(5);
        let mut search = MctsSearch::with_config(Endless { estimate: Some(0.25) }, config).unwrap();

        let result = search
            .search(SearchBudget::Iterations(4), true, &mut rng())
            .unwrap();

        assert!((result.value - 0.25).abs() < 1e-9);
        let root = search.tree().get(search.tree().root());
        assert!((root.total_reward - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rollout_depth_limit_without_estimate() {
        let config = MctsConfig::default().with_max_rollout_depth(5);
        let mut search = MctsSearch::with_config(Endless { estimate: None }, config).unwrap();

        let err = search.iterate(&mut rng()).unwrap_err();
        assert!(matches!(err, SearchError::RolloutDepthExceeded { depth: 5 }));
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let config = MctsConfig::default().with_exploration_constant(-1.0);
        let err = MctsSearch::with_config(Walk::new(2), config).unwrap_err();
        assert!(matches!(err, SearchError::InvalidConfig(_)));
    }

    #[test]
    fn test_walk_prefers_direction() {
        let mut search = MctsSearch::new(Walk::new(3));
        assert_eq!(
            search.select_best_action_iterations(500, true, &mut rng()).unwrap(),
            1
        );

        let mut search = MctsSearch::new(Walk::new(3));
        assert_eq!(
            search.select_best_action_iterations(500, false, &mut rng()).unwrap(),
            -1
        );
    }

    #[test]
    fn test_time_budget() {
        let mut search = MctsSearch::new(Walk::new(4));
        let result = search
            .search(SearchBudget::Time(Duration::from_millis(20)), true, &mut rng())
            .unwrap();

        assert!(result.iterations > 0);
        assert!(result.elapsed >= Duration::from_millis(20));
        assert_eq!(
            search.tree().get(search.tree().root()).num_visits,
            result.iterations
        );
    }

    #[test]
    fn test_select_best_action_time() {
        let mut search = MctsSearch::new(Bandit::new(vec![1.0, -1.0]));
        let action = search
            .select_best_action_time(Duration::from_millis(10), true, &mut rng())
            .unwrap();
        assert_eq!(action, 0);
    }

    #[test]
    fn test_run_uses_config_budget() {
        let result = run_mcts(Walk::new(3), MctsConfig::for_testing(), true, &mut rng()).unwrap();
        assert_eq!(result.iterations, 50);
    }

    #[test]
    fn test_determinism() {
        let run = |seed: u64| {
            let mut search = MctsSearch::new(Walk::new(6));
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            search.select_best_action_iterations(300, true, &mut rng).unwrap();
            search
        };

        let a = run(7);
        let b = run(7);

        assert_eq!(a.tree().len(), b.tree().len());
        for (x, y) in a.tree().arena().iter().zip(b.tree().arena()) {
            assert_eq!(x.parent, y.parent);
            assert_eq!(x.action, y.action);
            assert_eq!(x.children, y.children);
            assert_eq!(x.num_visits, y.num_visits);
            assert_eq!(x.total_reward.to_bits(), y.total_reward.to_bits());
        }
    }

    #[test]
    fn test_create_tree_from_action() {
        let mut search = MctsSearch::with_config(
            Walk::new(4),
            MctsConfig::default().with_exploration_constant(0.7),
        )
        .unwrap();
        search.select_best_action_iterations(100, true, &mut rng()).unwrap();

        let old_root = search.tree().get(search.tree().root());
        let kept_id = old_root.child(&1).unwrap();
        let dropped_id = old_root.child(&-1).unwrap();
        let kept = search.tree().get(kept_id);

        let next = search.create_tree_from_action(&1).unwrap();
        let new_root = next.tree().get(next.tree().root());

        assert!(new_root.parent.is_none());
        assert_eq!(new_root.num_visits, kept.num_visits);
        assert_eq!(new_root.total_reward.to_bits(), kept.total_reward.to_bits());
        assert_eq!(new_root.state, kept.state);
        assert!((next.exploration_constant() - 0.7).abs() < 1e-12);

        // Only the kept subtree survives
        let dropped = search.tree().get(dropped_id);
        assert!(dropped.num_visits > 0);
        let visits: u32 = next.tree().arena().iter().map(|n| n.num_visits).sum();
        let kept_visits: u32 = subtree_visits(search.tree(), kept_id);
        assert_eq!(visits, kept_visits);
        assert!(next.tree().len() < search.tree().len());
    }

    fn subtree_visits(tree: &MctsTree<Walk>, id: NodeId) -> u32 {
        let node = tree.get(id);
        node.num_visits
            + node
                .children
                .iter()
                .map(|(_, child)| subtree_visits(tree, *child))
                .sum::<u32>()
    }

    #[test]
    fn test_create_tree_from_action_keeps_searching() {
        let mut search = MctsSearch::new(Walk::new(4));
        search.select_best_action_iterations(60, true, &mut rng()).unwrap();

        let mut next = search.create_tree_from_action(&1).unwrap();
        let before = next.tree().get(next.tree().root()).num_visits;
        next.select_best_action_iterations(10, true, &mut rng()).unwrap();

        assert_eq!(next.tree().get(next.tree().root()).num_visits, before + 10);
        assert_eq!(next.root_state().position, 1);
    }

    #[test]
    fn test_create_tree_from_unknown_action() {
        let search = MctsSearch::new(Walk::new(2));
        let err = search.create_tree_from_action(&1).unwrap_err();
        assert!(matches!(err, SearchError::UnknownAction { .. }));
    }
}
