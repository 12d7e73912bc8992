pub mod agent;
pub mod checkpoint;
pub mod config;
pub mod demonstration;
pub mod encoding;
pub mod exploration;
pub mod metrics;
pub mod network;
pub mod replay;
pub mod target;

pub use agent::DqnAgent;
pub use checkpoint::{CheckpointMetadata, PolicyCheckpoint, load_policy, save_policy};
pub use config::AgentConfig;
pub use demonstration::Demonstration;
pub use encoding::{EncodedState, StateEncoder};
pub use exploration::ExplorationPolicy;
pub use metrics::{
    EvaluationProgress, EvaluationSummary, TracingObserver, TrainingLog, TrainingObserver,
    TrainingProgress, TrainingSummary, WinnerLog,
};
pub use network::{DEFAULT_CONV_CHANNELS, DEFAULT_HIDDEN, QNetwork, QNetworkConfig, ValueFunction};
pub use replay::{ReplayBuffer, Transition, TransitionBatch};
pub use target::TargetRule;
