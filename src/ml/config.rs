use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::target::TargetRule;
use crate::error::AgentError;

pub const BATCH_SIZE: usize = 256;
pub const BUFFER_CAPACITY: usize = 100_000;
pub const DISCOUNT_FACTOR: f32 = 0.99;
pub const EPSILON_DECAY: f64 = 0.999_999;
pub const EPSILON_END: f64 = 0.01;
pub const EPSILON_START: f64 = 1.0;
pub const LEARNING_RATE: f64 = 0.001;
pub const TARGET_UPDATE: usize = 2500;
pub const TOTAL_EPISODES: usize = 250_000;

/// Hyperparameters of a DQN training or evaluation run.
///
/// Defaults reproduce the reference setup; the struct is immutable once handed to
/// the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Transitions per optimization step.
    pub batch_size: usize,
    /// Replay buffer capacity.
    pub buffer_capacity: usize,
    pub discount_factor: f32,
    pub epsilon_start: f64,
    /// Floor of the exploration schedule, also used as the evaluation epsilon.
    pub epsilon_end: f64,
    /// Multiplier applied to epsilon on every action request.
    pub epsilon_decay: f64,
    /// Adam learning rate.
    pub learning_rate: f64,
    /// Gradients are clamped element-wise to `[-gradient_clip, gradient_clip]`.
    pub gradient_clip: f32,
    /// Episodes (training) or optimizer steps (pretraining) between target syncs
    /// and checkpoint writes.
    pub target_update: usize,
    pub total_episodes: usize,
    pub evaluation_episodes: usize,
    pub evaluation_report_interval: usize,
    /// Episodes between progress reports.
    pub log_interval: usize,
    /// Copies of each demonstrated transition inserted into the buffer.
    pub demonstration_copies: usize,
    /// Optimizer steps performed after ingesting a demonstration.
    pub pretrain_steps: usize,
    pub target_rule: TargetRule,
    /// Append-only log of episodes with positive reward.
    pub winner_log: PathBuf,
    pub seed: u64,
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_file(path: &Path) -> Result<Self, AgentError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        let invalid = |message: String| Err(AgentError::InvalidConfiguration(message));
        if self.batch_size == 0 {
            return invalid("batch_size must be at least 1".to_string());
        }
        if self.buffer_capacity == 0 {
            return invalid("buffer_capacity must be at least 1".to_string());
        }
        if self.batch_size > self.buffer_capacity {
            return invalid(format!(
                "batch_size ({}) cannot exceed buffer_capacity ({})",
                self.batch_size, self.buffer_capacity
            ));
        }
        if !(0.0..=1.0).contains(&self.discount_factor) {
            return invalid(format!(
                "discount_factor must be in [0, 1], got {}",
                self.discount_factor
            ));
        }
        if !(0.0..=1.0).contains(&self.epsilon_end) || !(0.0..=1.0).contains(&self.epsilon_start)
        {
            return invalid("epsilon bounds must lie in [0, 1]".to_string());
        }
        if self.epsilon_end > self.epsilon_start {
            return invalid(format!(
                "epsilon_end ({}) cannot exceed epsilon_start ({})",
                self.epsilon_end, self.epsilon_start
            ));
        }
        if !(self.epsilon_decay > 0.0 && self.epsilon_decay <= 1.0) {
            return invalid(format!(
                "epsilon_decay must be in (0, 1], got {}",
                self.epsilon_decay
            ));
        }
        if self.learning_rate <= 0.0 {
            return invalid(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }
        if self.gradient_clip <= 0.0 {
            return invalid(format!(
                "gradient_clip must be positive, got {}",
                self.gradient_clip
            ));
        }
        if self.target_update == 0 {
            return invalid("target_update must be at least 1".to_string());
        }
        if self.log_interval == 0 || self.evaluation_report_interval == 0 {
            return invalid("report intervals must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            batch_size: BATCH_SIZE,
            buffer_capacity: BUFFER_CAPACITY,
            discount_factor: DISCOUNT_FACTOR,
            epsilon_start: EPSILON_START,
            epsilon_end: EPSILON_END,
            epsilon_decay: EPSILON_DECAY,
            learning_rate: LEARNING_RATE,
            gradient_clip: 1.0,
            target_update: TARGET_UPDATE,
            total_episodes: TOTAL_EPISODES,
            evaluation_episodes: 1000,
            evaluation_report_interval: TARGET_UPDATE,
            log_interval: 100,
            demonstration_copies: 1000,
            pretrain_steps: 10_000,
            target_rule: TargetRule::Double,
            winner_log: PathBuf::from("winner.txt"),
            seed: 0x5EED_D0B1_E0D0_0001,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_reference_constants() {
        let config = AgentConfig::default();
        assert_eq!(config.batch_size, 256);
        assert_eq!(config.buffer_capacity, 100_000);
        assert_eq!(config.discount_factor, 0.99);
        assert_eq!(config.epsilon_decay, 0.999_999);
        assert_eq!(config.target_update, 2500);
        assert_eq!(config.total_episodes, 250_000);
        assert_eq!(config.target_rule, TargetRule::Double);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn batch_larger_than_buffer_is_rejected() {
        let config = AgentConfig {
            batch_size: 64,
            buffer_capacity: 32,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AgentError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn inverted_epsilon_bounds_are_rejected() {
        let mut config = AgentConfig::default();
        config.epsilon_start = 0.005;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let mut config = AgentConfig::default();
        config.target_update = 0;
        assert!(config.validate().is_err());

        let mut config = AgentConfig::default();
        config.log_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: AgentConfig =
            serde_json::from_str(r#"{ "batch_size": 32, "target_rule": "Vanilla" }"#)
                .expect("parse");
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.target_rule, TargetRule::Vanilla);
        assert_eq!(config.buffer_capacity, BUFFER_CAPACITY);
    }
}
