use crate::action::JointAction;
use crate::grid::Grid;
use crate::state::{ObservationSpace, StepOutcome};

/// Interface the training engine uses to drive a two-actor grid game.
pub trait Environment {
    fn observation_space(&self) -> ObservationSpace;

    /// Number of discrete actions available to the learning agent.
    fn action_count(&self) -> usize;

    fn reset(&mut self) -> Grid;

    fn step(&mut self, action: JointAction) -> StepOutcome;
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    fn observation_space(&self) -> ObservationSpace {
        (**self).observation_space()
    }

    fn action_count(&self) -> usize {
        (**self).action_count()
    }

    fn reset(&mut self) -> Grid {
        (**self).reset()
    }

    fn step(&mut self, action: JointAction) -> StepOutcome {
        (**self).step(action)
    }
}
