use crate::core::player::{AppraisalState, PlayerId};
use rand::Rng;

/// Decay base for weighted-random successor selection: each step down the
/// heuristic-sorted list is this much less likely than the one before it.
const WEIGHTED_RANDOM_DECAY: f64 = 0.8;

/// What the searches need from a game: whose turn it is, how the game ends,
/// and how to enumerate and apply turns. States are persistent; `after_turn`
/// returns a successor that remembers its predecessor.
pub trait GameState<TTurn>: AppraisalState<TTurn> + Clone + PartialEq {
    fn current_player_id(&self) -> PlayerId;
    fn num_players(&self) -> usize;
    fn winner(&self) -> Option<PlayerId>;
    fn prev_state(&self) -> Option<&Self>;
    fn possible_turns(&self) -> Vec<TTurn>;
    fn after_turn(&self, turn: &TTurn) -> Self;

    fn has_winner(&self) -> bool {
        self.winner().is_some()
    }

    /// All successor states, ordered by the current player's heuristic.
    /// Ascending order puts the best candidate last, ready to pop.
    fn next_states(&self, sort_ascending: bool) -> Vec<Self> {
        let viewpoint = self.current_player_id();
        let mut states: Vec<Self> = self
            .possible_turns()
            .iter()
            .map(|turn| self.after_turn(turn))
            .collect();

        states.sort_by(|a, b| {
            let ordering = a
                .heuristic_score(viewpoint)
                .total_cmp(&b.heuristic_score(viewpoint));
            if sort_ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });

        states
    }

    /// A random successor biased toward good ones: index drawn from an
    /// exponential distribution over the descending-sorted successors. An
    /// immediately winning successor is always taken.
    fn weighted_random_next_state<R: Rng>(&self, rng: &mut R) -> Option<Self> {
        let states = self.next_states(false);

        if states.is_empty() {
            return None;
        }

        if states[0].winner() == Some(self.current_player_id()) {
            return states.into_iter().next();
        }

        let num_states = states.len();
        let uniform: f64 = rng.gen();
        let decay_to_n = WEIGHTED_RANDOM_DECAY.powi(num_states as i32);
        let idx = ((1.0 + uniform * (decay_to_n - 1.0)).ln() / WEIGHTED_RANDOM_DECAY.ln()) as usize;
        let idx = idx.min(num_states - 1);

        states.into_iter().nth(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::player::AppraisalState;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    // A one-player counting game: from n, moves go to n+1 or n+2; reaching
    // 10 or more wins. Heuristic is just the counter.
    #[derive(Clone, Debug, PartialEq)]
    struct CountingState {
        value: i32,
        prev: Option<Box<CountingState>>,
        last_step: Option<i32>,
    }

    impl CountingState {
        fn start() -> Self {
            Self {
                value: 0,
                prev: None,
                last_step: None,
            }
        }
    }

    impl AppraisalState<i32> for CountingState {
        fn heuristic_score(&self, _analysis_player_id: PlayerId) -> f64 {
            self.value as f64
        }

        fn prev_turn(&self) -> Option<i32> {
            self.last_step
        }
    }

    impl GameState<i32> for CountingState {
        fn current_player_id(&self) -> PlayerId {
            PlayerId(0)
        }

        fn num_players(&self) -> usize {
            1
        }

        fn winner(&self) -> Option<PlayerId> {
            (self.value >= 10).then_some(PlayerId(0))
        }

        fn prev_state(&self) -> Option<&Self> {
            self.prev.as_deref()
        }

        fn possible_turns(&self) -> Vec<i32> {
            if self.has_winner() {
                Vec::new()
            } else {
                vec![1, 2]
            }
        }

        fn after_turn(&self, turn: &i32) -> Self {
            Self {
                value: self.value + turn,
                prev: Some(Box::new(self.clone())),
                last_step: Some(*turn),
            }
        }
    }

    #[test]
    fn next_states_sorts_by_current_player_heuristic() {
        let start = CountingState::start();

        let ascending = start.next_states(true);
        assert_eq!(
            ascending.iter().map(|s| s.value).collect::<Vec<_>>(),
            vec![1, 2]
        );

        let descending = start.next_states(false);
        assert_eq!(
            descending.iter().map(|s| s.value).collect::<Vec<_>>(),
            vec![2, 1]
        );
    }

    #[test]
    fn weighted_random_takes_an_immediate_win() {
        let state = CountingState {
            value: 9,
            prev: None,
            last_step: None,
        };

        let mut rng = SmallRng::seed_from_u64(0);
        for _ in 0..20 {
            let next = state.weighted_random_next_state(&mut rng).unwrap();
            assert!(next.has_winner());
        }
    }

    #[test]
    fn weighted_random_favors_better_states() {
        let start = CountingState::start();
        let mut rng = SmallRng::seed_from_u64(7);

        let mut best_count = 0;
        let trials = 500;
        for _ in 0..trials {
            let next = start.weighted_random_next_state(&mut rng).unwrap();
            if next.value == 2 {
                best_count += 1;
            }
        }

        assert!(best_count > trials / 2, "best state chosen {best_count}/{trials}");
    }

    #[test]
    fn weighted_random_of_terminal_state_is_none() {
        let done = CountingState {
            value: 10,
            prev: None,
            last_step: None,
        };
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(done.weighted_random_next_state(&mut rng).is_none());
    }
}
