use serde::{Deserialize, Serialize};

use crate::grid::Grid;

/// Shape and value range of the raw observations an environment emits.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObservationSpace {
    pub height: usize,
    pub width: usize,
    /// Largest cell value that can appear in an observation.
    pub max_value: u8,
}

impl ObservationSpace {
    pub fn new(height: usize, width: usize, max_value: u8) -> Self {
        Self {
            height,
            width,
            max_value,
        }
    }

    /// Number of one-hot channels needed to encode every cell category.
    pub fn channel_count(&self) -> usize {
        self.max_value as usize + 1
    }
}

/// Auxiliary per-step details reported by an environment.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct StepInfo {
    /// Reward earned by the partner actor during the step.
    pub partner_reward: f32,
    /// Steps taken since the last reset.
    pub steps: usize,
    /// Set when the episode ended because of the step limit rather than completion.
    pub truncated: bool,
}

/// Result of advancing an environment by one step.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StepOutcome {
    pub state: Grid,
    pub reward: f32,
    pub done: bool,
    pub info: StepInfo,
}

/// Status of an orchard episode.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum EpisodeStatus {
    Running,
    Cleared,
    OutOfTime,
}

impl EpisodeStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, EpisodeStatus::Running)
    }
}
