//! Small decision problems used by the unit tests.

use crate::state::{State, StateError};

/// One decision among fixed payoffs. Pulling an arm ends the episode.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Bandit {
    pub(crate) rewards: Vec<f64>,
    pub(crate) pulled: Option<usize>,
}

impl Bandit {
    pub(crate) fn new(rewards: Vec<f64>) -> Self {
        Self {
            rewards,
            pulled: None,
        }
    }
}

impl State for Bandit {
    type Action = usize;
    type Player = u8;

    fn current_player(&self) -> u8 {
        1
    }

    fn possible_actions(&self) -> Vec<usize> {
        if self.is_terminal() {
            return Vec::new();
        }
        (0..self.rewards.len()).collect()
    }

    fn take_action(&self, action: &usize) -> Result<Self, StateError> {
        if self.is_terminal() || *action >= self.rewards.len() {
            return Err(StateError::illegal(action));
        }
        Ok(Self {
            rewards: self.rewards.clone(),
            pulled: Some(*action),
        })
    }

    fn is_terminal(&self) -> bool {
        self.pulled.is_some()
    }

    fn reward(&self) -> f64 {
        self.pulled.map_or(0.0, |arm| self.rewards[arm])
    }
}

/// Random walk on the integers: each step moves by -1 or +1, the reward is
/// the final position.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Walk {
    pub(crate) steps_left: u8,
    pub(crate) position: i32,
}

impl Walk {
    pub(crate) fn new(steps: u8) -> Self {
        Self {
            steps_left: steps,
            position: 0,
        }
    }
}

impl State for Walk {
    type Action = i32;
    type Player = u8;

    fn current_player(&self) -> u8 {
        1
    }

    fn possible_actions(&self) -> Vec<i32> {
        if self.is_terminal() {
            return Vec::new();
        }
        vec![-1, 1]
    }

    fn take_action(&self, action: &i32) -> Result<Self, StateError> {
        if self.is_terminal() || !matches!(action, -1 | 1) {
            return Err(StateError::illegal(action));
        }
        Ok(Self {
            steps_left: self.steps_left - 1,
            position: self.position + action,
        })
    }

    fn is_terminal(&self) -> bool {
        self.steps_left == 0
    }

    fn reward(&self) -> f64 {
        f64::from(self.position)
    }
}

/// A process that never terminates.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Endless {
    pub(crate) estimate: Option<f64>,
}

impl State for Endless {
    type Action = ();
    type Player = u8;

    fn current_player(&self) -> u8 {
        1
    }

    fn possible_actions(&self) -> Vec<()> {
        vec![()]
    }

    fn take_action(&self, _action: &()) -> Result<Self, StateError> {
        Ok(self.clone())
    }

    fn is_terminal(&self) -> bool {
        false
    }

    fn reward(&self) -> f64 {
        0.0
    }

    fn estimated_reward(&self) -> Option<f64> {
        self.estimate
    }
}

/// Non-terminal state without any legal action.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Dead;

impl State for Dead {
    type Action = u8;
    type Player = u8;

    fn current_player(&self) -> u8 {
        1
    }

    fn possible_actions(&self) -> Vec<u8> {
        Vec::new()
    }

    fn take_action(&self, action: &u8) -> Result<Self, StateError> {
        Err(StateError::illegal(action))
    }

    fn is_terminal(&self) -> bool {
        false
    }

    fn reward(&self) -> f64 {
        0.0
    }
}

/// Advertises an action it then refuses to apply.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Liar;

impl State for Liar {
    type Action = u8;
    type Player = u8;

    fn current_player(&self) -> u8 {
        1
    }

    fn possible_actions(&self) -> Vec<u8> {
        vec![0, 1]
    }

    fn take_action(&self, action: &u8) -> Result<Self, StateError> {
        match action {
            0 => Ok(Liar),
            _ => Err(StateError::illegal(action)),
        }
    }

    fn is_terminal(&self) -> bool {
        false
    }

    fn reward(&self) -> f64 {
        0.0
    }
}
