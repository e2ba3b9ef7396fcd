//! Connect-Two game implementation for the mcts-core search engine
//!
//! A one-row board where two players take turns claiming empty cells. The
//! first player to own two adjacent cells wins; a full board without a pair is
//! a draw. Small enough to search exhaustively, which makes it a convenient
//! reference implementation of the [`State`] trait.
//!
//! # Usage
//!
//! ```rust
//! use games_connect_two::ConnectTwo;
//! use mcts_core::{MctsSearch, Objective};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let mut search = MctsSearch::new(ConnectTwo::default());
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//! let action = search
//!     .select_best_action_iterations(200, Objective::Maximize, &mut rng)
//!     .unwrap();
//! assert!(action.index < 4);
//! ```

use std::fmt;

use mcts_core::{State, StateError};

/// Board length used by [`ConnectTwo::default`].
pub const DEFAULT_BOARD_SIZE: usize = 4;

/// The two sides. X moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    X,
    O,
}

impl Player {
    /// Reward contributed by a win of this player: X = +1, O = -1.
    pub fn value(self) -> f64 {
        match self {
            Self::X => 1.0,
            Self::O => -1.0,
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }

    fn symbol(self) -> char {
        match self {
            Self::X => 'X',
            Self::O => 'O',
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A move: `player` claims the cell at `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Action {
    pub player: Player,
    pub index: usize,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player {} to index {}", self.player, self.index)
    }
}

/// Connect-Two game state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTwo {
    /// Cells from left to right: None=empty
    board: Vec<Option<Player>>,
    /// Player to move
    current_player: Player,
}

impl Default for ConnectTwo {
    fn default() -> Self {
        Self::new(DEFAULT_BOARD_SIZE)
    }
}

impl ConnectTwo {
    /// Create an empty board with `size` cells, X to move.
    pub fn new(size: usize) -> Self {
        Self {
            board: vec![None; size],
            current_player: Player::X,
        }
    }

    pub fn board(&self) -> &[Option<Player>] {
        &self.board
    }

    /// Owner of the leftmost adjacent pair, if any
    pub fn winner(&self) -> Option<Player> {
        self.board
            .windows(2)
            .find_map(|pair| match (pair[0], pair[1]) {
                (Some(a), Some(b)) if a == b => Some(a),
                _ => None,
            })
    }

    pub fn is_full(&self) -> bool {
        self.board.iter().all(Option::is_some)
    }

    /// Empty cells, left to right
    pub fn empty_cells(&self) -> Vec<usize> {
        self.board
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(index, _)| index)
            .collect()
    }
}

impl State for ConnectTwo {
    type Action = Action;
    type Player = Player;

    fn current_player(&self) -> Player {
        self.current_player
    }

    fn possible_actions(&self) -> Vec<Action> {
        if self.is_terminal() {
            return Vec::new();
        }

        self.empty_cells()
            .into_iter()
            .map(|index| Action {
                player: self.current_player,
                index,
            })
            .collect()
    }

    fn take_action(&self, action: &Action) -> Result<Self, StateError> {
        let legal = !self.is_terminal()
            && action.player == self.current_player
            && matches!(self.board.get(action.index), Some(None));
        if !legal {
            return Err(StateError::illegal(action));
        }

        let mut next = self.clone();
        next.board[action.index] = Some(action.player);
        next.current_player = action.player.opponent();
        Ok(next)
    }

    fn is_terminal(&self) -> bool {
        self.winner().is_some() || self.is_full()
    }

    fn reward(&self) -> f64 {
        self.winner().map_or(0.0, Player::value)
    }
}

impl fmt::Display for ConnectTwo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<String> = self
            .board
            .iter()
            .map(|cell| cell.map_or('-', Player::symbol).to_string())
            .collect();
        write!(f, "[{}]", cells.join(", "))
    }
}
