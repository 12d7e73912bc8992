use serde::{Deserialize, Serialize};

/// Discrete action index understood by an environment.
pub type ActionIndex = usize;

/// Action index meaning "do nothing" for either actor.
pub const NO_OP: ActionIndex = 0;

/// Movement available to an actor in the orchard game.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Move {
    Stay,
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    pub const COUNT: usize = 5;

    pub const ALL: [Move; Move::COUNT] =
        [Move::Stay, Move::Up, Move::Down, Move::Left, Move::Right];

    pub fn from_index(index: ActionIndex) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> ActionIndex {
        self as ActionIndex
    }

    /// Row/column offset applied by the move.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Move::Stay => (0, 0),
            Move::Up => (-1, 0),
            Move::Down => (1, 0),
            Move::Left => (0, -1),
            Move::Right => (0, 1),
        }
    }
}

/// Actions submitted to a two-actor environment in one step.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct JointAction {
    /// Action chosen by the learning agent.
    pub agent: ActionIndex,
    /// Action chosen by the other actor.
    pub partner: ActionIndex,
}

impl JointAction {
    pub fn new(agent: ActionIndex, partner: ActionIndex) -> Self {
        Self { agent, partner }
    }

    /// Pairs the agent's action with a no-op for the other actor.
    pub fn solo(agent: ActionIndex) -> Self {
        Self::new(agent, NO_OP)
    }
}
