use std::fs;
use std::path::{Path, PathBuf};

use burn::module::AutodiffModule;
use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;

use juiced_dqn::ml::{
    AgentConfig, Demonstration, DqnAgent, EncodedState, QNetwork, QNetworkConfig, StateEncoder,
    TrainingLog, Transition, ValueFunction,
};
use juiced_dqn::{AgentError, Environment, JointAction, Layout, OrchardGame};

type TrainBackend = Autodiff<NdArray<f32>>;
type InferenceBackend = NdArray<f32>;
type Agent = DqnAgent<TrainBackend, QNetwork<TrainBackend>, OrchardGame>;

/// Robot, fruit and a motionless human in a one-row corridor. Moving right
/// clears the orchard.
fn corridor() -> OrchardGame {
    let layout = Layout::parse(&["#####", "#RFH#", "#####"]).expect("layout");
    OrchardGame::builder()
        .with_layout(layout)
        .with_max_steps(200)
        .build()
        .expect("game")
}

fn small_level() -> OrchardGame {
    OrchardGame::builder().build().expect("game")
}

fn quick_config() -> AgentConfig {
    AgentConfig {
        batch_size: 8,
        buffer_capacity: 256,
        target_update: 2,
        log_interval: 1,
        evaluation_report_interval: 2,
        pretrain_steps: 4,
        demonstration_copies: 10,
        seed: 7,
        ..AgentConfig::default()
    }
}

fn build_agent(game: OrchardGame, config: AgentConfig, hidden: usize) -> Agent {
    let device = Default::default();
    let encoder = StateEncoder::new(game.observation_space());
    let network = QNetworkConfig::for_encoder(&encoder, game.action_count())
        .with_conv_channels([4, 4])
        .with_hidden(hidden)
        .init::<TrainBackend>(&device);
    DqnAgent::new(game, network, config, device).expect("agent")
}

fn temp_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("juiced-dqn-{}-{name}", std::process::id()));
    let _ = fs::remove_file(&path);
    path
}

fn reset_state(agent: &Agent) -> EncodedState {
    let mut game = corridor();
    agent.encode(&game.reset()).expect("encode")
}

fn policy_values(agent: &Agent, state: &EncodedState) -> Vec<f32> {
    agent
        .policy_network()
        .valid()
        .forward(state.to_batch::<InferenceBackend>(agent.device()))
        .into_data()
        .to_vec::<f32>()
        .expect("values")
}

fn target_values(agent: &Agent, state: &EncodedState) -> Vec<f32> {
    agent
        .target_network()
        .forward(state.to_batch::<InferenceBackend>(agent.device()))
        .into_data()
        .to_vec::<f32>()
        .expect("values")
}

/// Pushes `count` transitions gathered by cycling through every action.
fn fill(agent: &mut Agent, count: usize) {
    let mut game = corridor();
    let encoder = *agent.encoder();
    let mut state = encoder.encode(&game.reset()).expect("encode");
    for step in 0..count {
        let action = step % 5;
        let outcome = game.step(JointAction::solo(action));
        let next_state = encoder.encode(&outcome.state).expect("encode");
        agent
            .remember(Transition::new(
                state,
                action,
                outcome.reward,
                next_state.clone(),
                outcome.done,
            ))
            .expect("remember");
        state = if outcome.done {
            encoder.encode(&game.reset()).expect("encode")
        } else {
            next_state
        };
    }
}

#[test]
fn underfilled_buffer_skips_optimization() {
    let mut agent = build_agent(corridor(), quick_config(), 16);
    agent.initialize_training();
    fill(&mut agent, 7);
    let state = reset_state(&agent);
    let policy_before = policy_values(&agent, &state);
    let target_before = target_values(&agent, &state);

    assert_eq!(agent.optimize().expect("optimize"), None);

    assert_eq!(agent.optimizer_steps(), 0);
    assert_eq!(policy_values(&agent, &state), policy_before);
    assert_eq!(target_values(&agent, &state), target_before);
}

#[test]
fn target_matches_policy_after_sync_and_stays_frozen() {
    let mut agent = build_agent(corridor(), quick_config(), 16);
    agent.initialize_training();
    fill(&mut agent, 40);
    let state = reset_state(&agent);

    for _ in 0..3 {
        assert!(agent.optimize().expect("optimize").is_some());
    }
    agent.sync_target();
    let synced = target_values(&agent, &state);
    assert_eq!(synced, policy_values(&agent, &state));

    for _ in 0..3 {
        let loss = agent.optimize().expect("optimize").expect("loss");
        assert!(loss.is_finite());
    }
    assert_eq!(agent.optimizer_steps(), 6);
    assert_eq!(target_values(&agent, &state), synced);
    assert_ne!(policy_values(&agent, &state), synced);
}

#[test]
fn three_step_demonstration_is_replicated() {
    let config = AgentConfig {
        buffer_capacity: 5000,
        demonstration_copies: 1000,
        ..quick_config()
    };
    let mut agent = build_agent(small_level(), config, 16);
    agent.initialize_training();
    // right, then two moves into walls: the episode keeps running.
    let pushed = agent
        .ingest_demonstration(&Demonstration::from_actions(vec![4, 2, 1]))
        .expect("ingest");
    assert_eq!(pushed, 3000);
    assert_eq!(agent.buffer().map(|buffer| buffer.len()), Some(3000));
}

#[test]
fn demonstration_larger_than_buffer_keeps_capacity() {
    let config = AgentConfig {
        buffer_capacity: 2000,
        demonstration_copies: 1000,
        ..quick_config()
    };
    let mut agent = build_agent(small_level(), config, 16);
    agent.initialize_training();
    agent
        .ingest_demonstration(&Demonstration::from_actions(vec![4, 2, 1]))
        .expect("ingest");
    let buffer = agent.buffer().expect("buffer");
    assert_eq!(buffer.len(), 2000);
    assert!(buffer.is_full());
}

#[test]
fn demonstration_stops_at_terminal_step() {
    let mut agent = build_agent(small_level(), quick_config(), 16);
    agent.initialize_training();
    // Clears both fruits on the sixth step; the trailing actions are ignored.
    let demo = Demonstration::from_actions(vec![4, 4, 3, 3, 2, 2, 0, 0]);
    let pushed = agent.ingest_demonstration(&demo).expect("ingest");
    assert_eq!(pushed, 60);
    let buffer = agent.buffer().expect("buffer");
    assert_eq!(buffer.iter().filter(|transition| transition.done).count(), 10);
    assert_eq!(buffer.iter().map(|transition| transition.reward).sum::<f32>(), 20.0);
}

/// Agent on the small level whose policy starts from the checkpoint at `path`,
/// with the demonstration already in its buffer.
fn restored_learner(config: AgentConfig, path: &Path, demo: &Demonstration) -> Agent {
    let mut agent = build_agent(small_level(), config, 16);
    agent.load_policy(path).expect("load");
    agent.initialize_training();
    agent.ingest_demonstration(demo).expect("ingest");
    agent
}

#[test]
fn pretraining_syncs_between_steps_and_at_the_end() {
    let path = temp_path("pretrain-start.bin");
    let config = AgentConfig {
        pretrain_steps: 3,
        target_update: 2,
        ..quick_config()
    };
    let demo = Demonstration::from_actions(vec![4, 4, 3]);
    let mut pretrained = build_agent(small_level(), config.clone(), 16);
    pretrained.save_policy(&path).expect("save");
    pretrained.initialize_training();
    let loss = pretrained.pretrain(&demo).expect("pretrain").expect("loss");
    assert_eq!(pretrained.optimizer_steps(), 3);

    // Same start, same samples: two steps, a sync, then the step pretraining ended on.
    let mut stepped = restored_learner(config.clone(), &path, &demo);
    for _ in 0..2 {
        assert!(stepped.optimize().expect("optimize").is_some());
    }
    stepped.sync_target();
    let synced_loss = stepped.optimize().expect("optimize").expect("loss");
    assert_eq!(synced_loss, loss);

    let mut unsynced = restored_learner(config, &path, &demo);
    for _ in 0..2 {
        assert!(unsynced.optimize().expect("optimize").is_some());
    }
    let unsynced_loss = unsynced.optimize().expect("optimize").expect("loss");
    assert_ne!(unsynced_loss, loss);

    stepped.sync_target();
    let mut game = small_level();
    let state = pretrained.encode(&game.reset()).expect("encode");
    assert_eq!(target_values(&pretrained, &state), policy_values(&pretrained, &state));
    assert_eq!(target_values(&pretrained, &state), target_values(&stepped, &state));
    let _ = fs::remove_file(&path);
}

#[test]
fn pretraining_from_malformed_file_fails() {
    let path = temp_path("bad-demo.json");
    fs::write(&path, r#"{ "room_id": "r1" }"#).expect("write demo");
    let mut agent = build_agent(small_level(), quick_config(), 16);
    agent.initialize_training();
    assert!(matches!(
        agent.pretrain_from_file(&path),
        Err(AgentError::Demonstration(_))
    ));
    let _ = fs::remove_file(&path);
}

#[test]
fn training_logs_winners_and_writes_checkpoint() {
    let winners = temp_path("winners.txt");
    let checkpoint = temp_path("policy.bin");
    let config = AgentConfig {
        total_episodes: 3,
        epsilon_start: 1.0,
        epsilon_end: 1.0,
        winner_log: winners.clone(),
        ..quick_config()
    };
    let mut agent = build_agent(corridor(), config, 16);
    agent.initialize_training();
    let mut log = TrainingLog::default();

    let summary = agent.train(&checkpoint, &mut log).expect("train");

    assert_eq!(summary.episodes, 3);
    assert_eq!(summary.winning_episodes, 3);
    assert!((summary.average_reward - 1.0).abs() < 1e-6);
    let episodes: Vec<usize> = log.progress.iter().map(|p| p.episode).collect();
    assert_eq!(episodes, vec![0, 1, 2]);
    let lines = fs::read_to_string(&winners).expect("winner log");
    assert_eq!(lines, "000000   1\n000001   1\n000002   1\n");
    assert!(checkpoint.exists());

    let _ = fs::remove_file(&winners);
    let _ = fs::remove_file(&checkpoint);
}

#[test]
fn training_requires_initialized_state() {
    let mut agent = build_agent(corridor(), quick_config(), 16);
    let mut log = TrainingLog::default();
    assert!(matches!(
        agent.train(&temp_path("unused.bin"), &mut log),
        Err(AgentError::NotTraining)
    ));
    assert!(log.progress.is_empty());
}

#[test]
fn checkpoint_restores_policy_and_target() {
    let path = temp_path("restore.bin");
    let source = build_agent(corridor(), quick_config(), 16);
    source.save_policy(&path).expect("save");

    let mut restored = build_agent(corridor(), quick_config(), 16);
    restored.load_policy(&path).expect("load");
    let state = reset_state(&source);
    assert_eq!(policy_values(&restored, &state), policy_values(&source, &state));
    assert_eq!(target_values(&restored, &state), policy_values(&source, &state));
    let _ = fs::remove_file(&path);
}

#[test]
fn checkpoint_with_other_architecture_is_refused() {
    let path = temp_path("mismatch.bin");
    build_agent(corridor(), quick_config(), 16)
        .save_policy(&path)
        .expect("save");

    let mut wider = build_agent(corridor(), quick_config(), 32);
    let state = reset_state(&wider);
    let before = policy_values(&wider, &state);
    assert!(matches!(
        wider.load_policy(&path),
        Err(AgentError::CheckpointMismatch { .. })
    ));
    assert_eq!(policy_values(&wider, &state), before);
    let _ = fs::remove_file(&path);
}

#[test]
fn evaluation_reports_without_learning() {
    let config = AgentConfig {
        epsilon_start: 1.0,
        epsilon_end: 1.0,
        ..quick_config()
    };
    let mut agent = build_agent(corridor(), config, 16);
    let mut log = TrainingLog::default();

    let summary = agent.evaluate(5, &mut log).expect("evaluate");

    assert_eq!(summary.episodes, 5);
    assert_eq!(summary.winning_episodes, 5);
    assert_eq!(agent.optimizer_steps(), 0);
    assert!(agent.buffer().is_none());
    let reported: Vec<usize> = log.evaluations.iter().map(|e| e.episode).collect();
    assert_eq!(reported, vec![0, 2, 4]);
}

#[test]
fn evaluation_refuses_to_discard_training_state() {
    let mut agent = build_agent(corridor(), quick_config(), 16);
    agent.initialize_training();
    fill(&mut agent, 12);
    let mut log = TrainingLog::default();

    let refused = agent.evaluate(3, &mut log);
    assert!(matches!(refused, Err(AgentError::TrainingActive)));
    assert!(log.evaluations.is_empty());
    assert_eq!(agent.buffer().map(|buffer| buffer.len()), Some(12));
    assert!(agent.optimize().expect("optimize").is_some());

    agent.initialize_testing();
    let summary = agent.evaluate(3, &mut log).expect("evaluate");
    assert_eq!(summary.episodes, 3);
}
