//! Decision-process contract consumed by the search.
//!
//! A [`State`] describes one position of a deterministic, perfect-information
//! decision problem. The search never looks inside a state: it only asks for
//! the legal actions, applies them, and reads the reward once a terminal
//! position is reached.

use std::fmt::Debug;
use std::hash::Hash;

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

/// Contract violations reported by a [`State`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Illegal action: {action}")]
    IllegalAction { action: String },

    #[error("No legal actions available from a non-terminal state")]
    NoLegalActions,
}

impl StateError {
    /// Build an [`StateError::IllegalAction`] from the offending action.
    pub fn illegal(action: &impl Debug) -> Self {
        Self::IllegalAction {
            action: format!("{action:?}"),
        }
    }
}

/// A position in a sequential decision problem.
///
/// Transitions must be pure: [`State::take_action`] returns a fresh value and
/// leaves the receiver untouched. The tree keeps one state per node and
/// derives every child from its parent's state, so a state that mutates
/// shared interior data (for example through `Rc<RefCell<_>>`) silently
/// corrupts sibling subtrees. The engine cannot detect this at runtime.
///
/// Rewards are read from a single global perspective and are never negated
/// during backpropagation. Adversarial games pick a maximising or minimising
/// [`Objective`](crate::Objective) per mover instead.
///
/// # Example
///
/// ```rust
/// use mcts_core::{State, StateError};
///
/// #[derive(Debug, Clone)]
/// struct Coin {
///     flipped: Option<bool>,
/// }
///
/// impl State for Coin {
///     type Action = bool;
///     type Player = u8;
///
///     fn current_player(&self) -> u8 {
///         0
///     }
///
///     fn possible_actions(&self) -> Vec<bool> {
///         match self.flipped {
///             Some(_) => Vec::new(),
///             None => vec![true, false],
///         }
///     }
///
///     fn take_action(&self, action: &bool) -> Result<Self, StateError> {
///         if self.flipped.is_some() {
///             return Err(StateError::illegal(action));
///         }
///         Ok(Self { flipped: Some(*action) })
///     }
///
///     fn is_terminal(&self) -> bool {
///         self.flipped.is_some()
///     }
///
///     fn reward(&self) -> f64 {
///         if self.flipped == Some(true) { 1.0 } else { 0.0 }
///     }
/// }
/// ```
pub trait State: Clone + Debug {
    /// One legal move. Used as a key in each node's child list.
    type Action: Clone + Eq + Hash + Debug;

    /// Identifier of the agent to act. Informational only.
    type Player: Debug;

    /// The agent whose turn it is.
    fn current_player(&self) -> Self::Player;

    /// Legal actions from this state.
    ///
    /// Must be non-empty unless the state is terminal. The order is preserved
    /// as the child order of the expanded node and therefore decides ties.
    fn possible_actions(&self) -> Vec<Self::Action>;

    /// Apply `action` and return the resulting state.
    ///
    /// Returns [`StateError::IllegalAction`] when `action` is not currently
    /// legal.
    fn take_action(&self, action: &Self::Action) -> Result<Self, StateError>;

    /// Whether the decision process has ended.
    fn is_terminal(&self) -> bool;

    /// Outcome of a terminal state. Only read when [`State::is_terminal`]
    /// holds.
    fn reward(&self) -> f64;

    /// Reward estimate for a non-terminal state, used when a rollout is cut
    /// short by `max_rollout_depth`. `None` makes the cut-off an error.
    fn estimated_reward(&self) -> Option<f64> {
        None
    }

    /// Apply one uniformly sampled legal action. Used during rollouts.
    fn take_random_action<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Self, StateError> {
        let actions = self.possible_actions();
        let action = actions.choose(rng).ok_or(StateError::NoLegalActions)?;
        self.take_action(action)
    }
}
