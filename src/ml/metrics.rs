use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

use tracing::info;

/// Snapshot emitted every `log_interval` training episodes.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingProgress {
    pub episode: usize,
    pub total_episodes: usize,
    /// Mean of per-episode summed losses over every episode so far.
    pub average_loss: f32,
    /// Mean cumulative episode reward over every episode so far.
    pub average_reward: f32,
    pub epsilon: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationProgress {
    pub episode: usize,
    pub total_episodes: usize,
    pub average_reward: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrainingSummary {
    pub episodes: usize,
    pub average_loss: f32,
    pub average_reward: f32,
    /// Episodes that ended with positive cumulative reward.
    pub winning_episodes: usize,
    pub optimizer_steps: usize,
    pub final_epsilon: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationSummary {
    pub episodes: usize,
    pub average_reward: f32,
    pub winning_episodes: usize,
}

/// Sink for periodic progress reports.
pub trait TrainingObserver {
    fn on_progress(&mut self, progress: &TrainingProgress);

    fn on_evaluation(&mut self, progress: &EvaluationProgress);
}

/// Forwards reports to `tracing` at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl TrainingObserver for TracingObserver {
    fn on_progress(&mut self, progress: &TrainingProgress) {
        info!(
            "Training in progress... {:06}/{:06}  Loss: {:.6}  Reward: {:.6}  Epsilon: {:.6}",
            progress.episode,
            progress.total_episodes,
            progress.average_loss,
            progress.average_reward,
            progress.epsilon
        );
    }

    fn on_evaluation(&mut self, progress: &EvaluationProgress) {
        info!(
            "Evaluation in progress... {:06}/{:06}  Reward: {:.6}",
            progress.episode, progress.total_episodes, progress.average_reward
        );
    }
}

/// Keeps every report in memory.
#[derive(Clone, Debug, Default)]
pub struct TrainingLog {
    pub progress: Vec<TrainingProgress>,
    pub evaluations: Vec<EvaluationProgress>,
}

impl TrainingObserver for TrainingLog {
    fn on_progress(&mut self, progress: &TrainingProgress) {
        self.progress.push(progress.clone());
    }

    fn on_evaluation(&mut self, progress: &EvaluationProgress) {
        self.evaluations.push(progress.clone());
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RunningMean {
    sum: f64,
    count: usize,
}

impl RunningMean {
    pub fn push(&mut self, value: f32) {
        self.sum += value as f64;
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            (self.sum / self.count as f64) as f32
        }
    }
}

/// Append-only record of winning episodes, one `"{episode:06}   {reward}"` line each.
#[derive(Clone, Debug)]
pub struct WinnerLog {
    path: PathBuf,
}

impl WinnerLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, episode: usize, reward: f32) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", Self::format_line(episode, reward))
    }

    /// Reward is truncated toward zero.
    pub fn format_line(episode: usize, reward: f32) -> String {
        format!("{episode:06}   {}", reward.trunc() as i64)
    }
}
