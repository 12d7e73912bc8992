//! Double DQN training engine for cooperative two-actor grid games, with a small
//! orchard game as the reference environment.

pub mod action;
pub mod env;
pub mod error;
pub mod game;
pub mod grid;
pub mod ml;
pub mod state;
pub mod visualize;

pub use crate::action::{ActionIndex, JointAction, Move, NO_OP};
pub use crate::env::Environment;
pub use crate::error::{AgentError, GameError, GridError};
pub use crate::game::{GameBuilder, Layout, OrchardGame};
pub use crate::grid::Grid;
pub use crate::ml::{
    AgentConfig, Demonstration, DqnAgent, EncodedState, QNetwork, QNetworkConfig, ReplayBuffer,
    StateEncoder, TargetRule, TracingObserver, TrainingLog, TrainingObserver, Transition,
    ValueFunction,
};
pub use crate::state::{EpisodeStatus, ObservationSpace, StepInfo, StepOutcome};
pub use crate::visualize::{VisualOptions, describe_outcome, render_grid};
