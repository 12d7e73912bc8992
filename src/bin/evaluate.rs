use std::error::Error;
use std::path::PathBuf;

use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use juiced_dqn::ml::{
    AgentConfig, DEFAULT_HIDDEN, DqnAgent, QNetworkConfig, StateEncoder, TracingObserver,
};
use juiced_dqn::visualize::{VisualOptions, describe_outcome, render_grid_with_options};
use juiced_dqn::{Environment, OrchardGame};

type Backend = Autodiff<NdArray<f32>>;

#[derive(Parser, Debug)]
#[command(about = "Evaluate a trained orchard policy", version)]
struct EvaluateArgs {
    /// Checkpoint produced by the train binary.
    #[arg(long)]
    checkpoint: PathBuf,
    /// Number of evaluation episodes.
    #[arg(long, default_value_t = 1000)]
    episodes: usize,
    /// Built-in level to play (small, medium).
    #[arg(long, default_value = "small")]
    level: String,
    /// Step limit per episode.
    #[arg(long, default_value_t = 100)]
    max_steps: usize,
    /// Hidden width the checkpoint was trained with.
    #[arg(long, default_value_t = DEFAULT_HIDDEN)]
    hidden: usize,
    /// Exploration rate held fixed during evaluation.
    #[arg(long, default_value_t = 0.01)]
    epsilon: f64,
    /// Print every observed grid instead of periodic averages.
    #[arg(long)]
    render: bool,
    /// Label rows and columns when rendering.
    #[arg(long)]
    coordinates: bool,
    /// Seed for the exploration draws.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("juiced_dqn=info,info"));
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_target(false)
            .finish(),
    )?;
    let args = EvaluateArgs::parse();

    let config = AgentConfig {
        epsilon_end: args.epsilon,
        evaluation_episodes: args.episodes,
        seed: args.seed,
        ..AgentConfig::default()
    };
    let game = OrchardGame::builder()
        .with_level(args.level.as_str())
        .with_max_steps(args.max_steps)
        .build()?;
    let device = Default::default();
    let encoder = StateEncoder::new(game.observation_space());
    let network = QNetworkConfig::for_encoder(&encoder, game.action_count())
        .with_hidden(args.hidden)
        .init::<Backend>(&device);
    let mut agent = DqnAgent::new(game, network, config, device)?;
    agent.load_policy(&args.checkpoint)?;
    agent.initialize_testing();

    if args.render {
        let options = VisualOptions {
            show_coordinates: args.coordinates,
        };
        for episode in 0..args.episodes {
            println!("=== episode {episode} ===");
            let reward = agent.play_episode(|grid, outcome| {
                if let Some(outcome) = outcome {
                    println!("{}", describe_outcome(outcome));
                }
                println!("{}", render_grid_with_options(grid, options));
            })?;
            println!("reward {reward}");
        }
        return Ok(());
    }

    let episodes = agent.config().evaluation_episodes;
    let summary = agent.evaluate(episodes, &mut TracingObserver)?;
    info!(
        "evaluated {} episodes: average reward {:.4}, {} winners",
        summary.episodes, summary.average_reward, summary.winning_episodes
    );
    Ok(())
}
