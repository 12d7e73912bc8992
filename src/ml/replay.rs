use rand::Rng;
use rand::seq::index;

use super::encoding::EncodedState;
use crate::action::ActionIndex;

/// One recorded interaction step.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: EncodedState,
    pub action: ActionIndex,
    pub reward: f32,
    pub next_state: EncodedState,
    pub done: bool,
}

impl Transition {
    pub fn new(
        state: EncodedState,
        action: ActionIndex,
        reward: f32,
        next_state: EncodedState,
        done: bool,
    ) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            done,
        }
    }
}

/// Fixed-capacity experience store. Once full, every push overwrites the oldest
/// surviving entry.
#[derive(Clone, Debug)]
pub struct ReplayBuffer<T = Transition> {
    entries: Vec<T>,
    capacity: usize,
    next: usize,
}

impl<T> ReplayBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "replay buffer capacity must be positive");
        Self {
            entries: Vec::with_capacity(capacity.min(1 << 16)),
            capacity,
            next: 0,
        }
    }

    pub fn push(&mut self, entry: T) {
        if self.entries.len() < self.capacity {
            self.entries.push(entry);
        } else {
            self.entries[self.next] = entry;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    /// Draws `count` distinct resident entries uniformly at random. Returns `None`
    /// when fewer than `count` entries are resident.
    pub fn sample<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Option<Vec<&T>> {
        if count > self.entries.len() {
            return None;
        }
        let picks = index::sample(rng, self.entries.len(), count);
        Some(picks.into_iter().map(|i| &self.entries[i]).collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Resident entries in storage order (not insertion order once wrapped).
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }
}

/// Column-wise view of a sampled batch, ready for tensor construction.
#[derive(Clone, Debug)]
pub struct TransitionBatch {
    pub states: Vec<f32>,
    pub actions: Vec<i32>,
    pub rewards: Vec<f32>,
    pub next_states: Vec<f32>,
    pub dones: Vec<bool>,
    pub state_shape: [usize; 3],
}

impl TransitionBatch {
    pub fn from_transitions(transitions: &[&Transition]) -> Self {
        assert!(
            !transitions.is_empty(),
            "cannot construct a transition batch from an empty slice"
        );
        let state_shape = transitions[0].state.shape();
        let features: usize = state_shape.iter().product();
        let batch = transitions.len();
        let mut states = Vec::with_capacity(batch * features);
        let mut next_states = Vec::with_capacity(batch * features);
        let mut actions = Vec::with_capacity(batch);
        let mut rewards = Vec::with_capacity(batch);
        let mut dones = Vec::with_capacity(batch);
        for transition in transitions {
            states.extend_from_slice(transition.state.data());
            next_states.extend_from_slice(transition.next_state.data());
            actions.push(transition.action as i32);
            rewards.push(transition.reward);
            dones.push(transition.done);
        }
        Self {
            states,
            actions,
            rewards,
            next_states,
            dones,
            state_shape,
        }
    }

    /// Number of transitions in the batch.
    pub fn rows(&self) -> usize {
        self.rewards.len()
    }

    pub fn features(&self) -> usize {
        self.state_shape.iter().product()
    }

    /// Indices of transitions whose episode continued past the step.
    pub fn non_terminal(&self) -> Vec<usize> {
        self.dones
            .iter()
            .enumerate()
            .filter_map(|(index, &done)| (!done).then_some(index))
            .collect()
    }

    /// Flattened next states for the given batch rows.
    pub fn next_states_for(&self, rows: &[usize]) -> Vec<f32> {
        let features = self.features();
        let mut out = Vec::with_capacity(rows.len() * features);
        for &row in rows {
            out.extend_from_slice(&self.next_states[row * features..(row + 1) * features]);
        }
        out
    }
}
