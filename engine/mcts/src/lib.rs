//! Game-agnostic Monte Carlo Tree Search (UCT) over a pluggable state contract.
//!
//! This crate searches any deterministic, perfect-information decision
//! problem that implements the [`State`] trait. It does not know about boards,
//! players or win conditions: it only enumerates actions, applies them, and
//! reads terminal rewards.
//!
//! # Overview
//!
//! MCTS builds a search tree by running iterations. Each iteration consists
//! of four phases:
//!
//! 1. **Selection**: Traverse the tree using UCB1 (Upper Confidence Bound) to
//!    balance exploration and exploitation
//! 2. **Expansion**: When reaching a frontier node, add one child per legal
//!    action and pick one of them uniformly at random
//! 3. **Simulation**: Play uniformly random actions from that child until the
//!    decision process ends
//! 4. **Backpropagation**: Add one visit and the terminal reward to every node
//!    on the path back to the root
//!
//! # Usage
//!
//! ```rust,ignore
//! use mcts_core::{MctsConfig, MctsSearch, Objective};
//! use rand_chacha::ChaCha20Rng;
//! use rand::SeedableRng;
//!
//! let config = MctsConfig::default().with_iterations(1000);
//! let mut search = MctsSearch::with_config(MyGame::new(), config)?;
//!
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//! let action = search.select_best_action_iterations(1000, Objective::Maximize, &mut rng)?;
//!
//! // Keep the statistics of the chosen branch for the next decision
//! let search = search.create_tree_from_action(&action)?;
//! ```
//!
//! # Configuration
//!
//! The [`MctsConfig`] struct controls search behavior:
//!
//! - `exploration_constant`: UCB1 constant `C` (default: sqrt(2))
//! - `iterations`: Default iteration budget (default: 1000)
//! - `time_limit_ms`: Optional wall-clock budget, preferred over `iterations`
//! - `max_rollout_depth`: Optional cap on rollout length
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MctsSearch                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  MctsTree   │  │ MctsConfig  │  │    impl State       │  │
//! │  │  (arena)    │  │ (C, budget) │  │ (actions, rewards)  │  │
//! │  └──────┬──────┘  └──────┬──────┘  └──────────┬──────────┘  │
//! │         │                │                    │             │
//! │         ▼                ▼                    ▼             │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │           select → expand → simulate →               │   │
//! │  │                     backpropagate                    │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod node;
pub mod search;
pub mod state;
pub mod tree;

#[cfg(test)]
mod testing;

// Re-export main types
pub use config::{ConfigError, MctsConfig, SearchBudget};
pub use node::{MctsNode, NodeId};
pub use search::{run_mcts, MctsSearch, SearchError, SearchResult};
pub use state::{State, StateError};
pub use tree::{MctsTree, Objective, TreeStats};
