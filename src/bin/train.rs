use std::error::Error;
use std::path::PathBuf;

use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use juiced_dqn::ml::{
    AgentConfig, DEFAULT_HIDDEN, DqnAgent, QNetworkConfig, StateEncoder, TargetRule,
    TracingObserver,
};
use juiced_dqn::{Environment, OrchardGame};

type TrainBackend = Autodiff<NdArray<f32>>;

#[derive(Parser, Debug)]
#[command(
    about = "Train a Double DQN robot for the cooperative orchard game",
    version
)]
struct TrainArgs {
    /// Built-in level to train on (small, medium).
    #[arg(long, default_value = "small")]
    level: String,
    /// Step limit per episode.
    #[arg(long, default_value_t = 100)]
    max_steps: usize,
    /// Checkpoint path, overwritten at every target sync.
    #[arg(long, default_value = "checkpoints/policy.bin")]
    checkpoint: PathBuf,
    /// Resume from a checkpoint created by this program.
    #[arg(long)]
    resume: Option<PathBuf>,
    /// Demonstration JSON replayed into the buffer for pretraining.
    #[arg(long)]
    demo: Option<PathBuf>,
    /// JSON file with agent hyperparameters. Flags below take precedence.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of training episodes.
    #[arg(long)]
    episodes: Option<usize>,
    /// Mini-batch size used during optimization.
    #[arg(long)]
    batch_size: Option<usize>,
    /// Bootstrap rule for non-terminal next states.
    #[arg(long, value_enum)]
    rule: Option<RuleArg>,
    /// File receiving one line per winning episode.
    #[arg(long)]
    winner_log: Option<PathBuf>,
    /// Seed for exploration and replay sampling.
    #[arg(long)]
    seed: Option<u64>,
    /// Width of the fully connected layer.
    #[arg(long, default_value_t = DEFAULT_HIDDEN)]
    hidden: usize,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RuleArg {
    Vanilla,
    Double,
}

impl From<RuleArg> for TargetRule {
    fn from(rule: RuleArg) -> Self {
        match rule {
            RuleArg::Vanilla => TargetRule::Vanilla,
            RuleArg::Double => TargetRule::Double,
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    init_tracing()?;
    let args = TrainArgs::parse();
    let config = resolve_config(&args)?;

    let game = OrchardGame::builder()
        .with_level(args.level.as_str())
        .with_max_steps(args.max_steps)
        .build()?;
    let device = Default::default();
    let encoder = StateEncoder::new(game.observation_space());
    let network = QNetworkConfig::for_encoder(&encoder, game.action_count())
        .with_hidden(args.hidden)
        .init::<TrainBackend>(&device);

    let mut agent = DqnAgent::new(game, network, config, device)?;
    if let Some(path) = &args.resume {
        agent.load_policy(path)?;
    }
    agent.initialize_training();
    if let Some(path) = &args.demo {
        agent.pretrain_from_file(path)?;
    }

    info!(
        "training on level {} for {} episodes",
        args.level,
        agent.config().total_episodes
    );
    let summary = agent.train(&args.checkpoint, &mut TracingObserver)?;
    info!(
        "finished {} episodes: average reward {:.4}, {} winners, {} optimizer steps, epsilon {:.6}",
        summary.episodes,
        summary.average_reward,
        summary.winning_episodes,
        summary.optimizer_steps,
        summary.final_epsilon
    );
    agent.save_policy(&args.checkpoint)?;
    info!("policy written to {}", args.checkpoint.display());
    Ok(())
}

fn resolve_config(args: &TrainArgs) -> Result<AgentConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => AgentConfig::from_json_file(path)?,
        None => AgentConfig::default(),
    };
    if let Some(episodes) = args.episodes {
        config.total_episodes = episodes;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(rule) = args.rule {
        config.target_rule = rule.into();
    }
    if let Some(path) = &args.winner_log {
        config.winner_log = path.clone();
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate()?;
    Ok(config)
}

fn init_tracing() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("juiced_dqn=info,info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
