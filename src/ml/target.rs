use serde::{Deserialize, Serialize};

/// How the bootstrap value of a non-terminal next state is computed.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum TargetRule {
    /// `max_a target(s')[a]`.
    Vanilla,
    /// `target(s')[argmax_a policy(s')[a]]`: the policy network selects, the
    /// target network evaluates.
    #[default]
    Double,
}

impl TargetRule {
    /// Bootstrap value per row. `online` and `target` hold row-major action values
    /// of the same next states, `action_count` values per row.
    pub fn bootstrap(self, online: &[f32], target: &[f32], action_count: usize) -> Vec<f32> {
        debug_assert_eq!(online.len(), target.len());
        debug_assert!(action_count > 0);
        target
            .chunks(action_count)
            .zip(online.chunks(action_count))
            .map(|(target_row, online_row)| match self {
                TargetRule::Vanilla => target_row[argmax(target_row)],
                TargetRule::Double => target_row[argmax(online_row)],
            })
            .collect()
    }
}

/// Index of the first maximum.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (index, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] {
            best = index;
        }
    }
    best
}

/// `reward + discount * bootstrap`, with the bootstrap forced to zero for
/// terminal rows.
pub fn expected_values(
    rewards: &[f32],
    bootstrap: &[f32],
    dones: &[bool],
    discount: f32,
) -> Vec<f32> {
    rewards
        .iter()
        .zip(bootstrap)
        .zip(dones)
        .map(|((&reward, &next), &done)| {
            if done {
                reward
            } else {
                reward + discount * next
            }
        })
        .collect()
}
