use rand::Rng;

/// Multiplicative epsilon schedule for epsilon-greedy action selection.
#[derive(Clone, Debug, PartialEq)]
pub struct ExplorationPolicy {
    epsilon: f64,
    floor: f64,
    decay: f64,
}

impl ExplorationPolicy {
    pub fn new(start: f64, floor: f64, decay: f64) -> Self {
        debug_assert!(floor <= start);
        Self {
            epsilon: start,
            floor,
            decay,
        }
    }

    /// Schedule pinned to its floor, used for evaluation runs.
    pub fn pinned(floor: f64) -> Self {
        Self::new(floor, floor, 1.0)
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Applies one decay step; a no-op once the floor is reached.
    pub fn decay(&mut self) -> f64 {
        if self.epsilon > self.floor {
            self.epsilon = (self.epsilon * self.decay).max(self.floor);
        }
        self.epsilon
    }

    /// Decays, then draws `r` in `[0, 1)`; exploits when `r > epsilon`.
    pub fn should_explore<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        let epsilon = self.decay();
        let draw: f64 = rng.gen_range(0.0..1.0);
        draw <= epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn decay_matches_closed_form() {
        let mut policy = ExplorationPolicy::new(1.0, 0.01, 0.999999);
        let mut rng = StdRng::seed_from_u64(5);
        let calls = 10_000;
        let mut previous = policy.epsilon();
        for _ in 0..calls {
            policy.should_explore(&mut rng);
            assert!(policy.epsilon() <= previous);
            previous = policy.epsilon();
        }
        let expected = (1.0f64 * 0.999999f64.powi(calls)).max(0.01);
        assert!((policy.epsilon() - expected).abs() < 1e-9);
    }

    #[test]
    fn epsilon_never_drops_below_floor() {
        let mut policy = ExplorationPolicy::new(1.0, 0.1, 0.5);
        for _ in 0..64 {
            policy.decay();
            assert!(policy.epsilon() >= 0.1);
        }
        assert_eq!(policy.epsilon(), 0.1);
    }

    #[test]
    fn pinned_policy_stays_greedy_most_of_the_time() {
        let mut policy = ExplorationPolicy::pinned(0.01);
        let mut rng = StdRng::seed_from_u64(17);
        let explored = (0..10_000)
            .filter(|_| policy.should_explore(&mut rng))
            .count();
        assert_eq!(policy.epsilon(), 0.01);
        assert!(explored < 300, "explored {explored} times");
    }

    #[test]
    fn full_epsilon_always_explores() {
        let mut policy = ExplorationPolicy::new(1.0, 1.0, 0.9);
        let mut rng = StdRng::seed_from_u64(2);
        assert!((0..1000).all(|_| policy.should_explore(&mut rng)));
    }
}
