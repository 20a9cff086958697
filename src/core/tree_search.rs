use crate::core::game_state::GameState;
use crate::core::player::AppraisedPlayerTurn;
use crate::util::cancellation::CancellationToken;
use std::marker::PhantomData;

/// Depth-bounded search for the best turn from a state. `descend_proportion`
/// may narrow the frontier to the heuristically best fraction of children at
/// any level with more than one ply remaining; the final ply is always fully
/// enumerated.
pub struct TreeSearch<TTurn, TGameState> {
    _phantom: PhantomData<(TTurn, TGameState)>,
}

impl<TTurn, TGameState> TreeSearch<TTurn, TGameState>
where
    TGameState: GameState<TTurn>,
{
    pub fn find_best_turn(
        state: &TGameState,
        analysis_level: i32,
        cancellation_token: &impl CancellationToken,
        num_states_visited: &mut usize,
        descend_proportion: f64,
    ) -> AppraisedPlayerTurn<TTurn, TGameState> {
        *num_states_visited = 0;
        Self::find_best_turn_inner(
            state.clone(),
            analysis_level,
            cancellation_token,
            num_states_visited,
            descend_proportion,
        )
    }

    fn find_best_turn_inner(
        curr_state: TGameState,
        analysis_level: i32,
        cancellation_token: &impl CancellationToken,
        num_states_visited: &mut usize,
        descend_proportion: f64,
    ) -> AppraisedPlayerTurn<TTurn, TGameState> {
        *num_states_visited += 1;

        if curr_state.has_winner() || analysis_level == 0 {
            return AppraisedPlayerTurn::from_state(curr_state.current_player_id(), curr_state);
        }

        let curr_player_id = curr_state.current_player_id();
        let mut best_turn = AppraisedPlayerTurn::empty_minimum();

        let mut child_states: Vec<TGameState> = curr_state
            .possible_turns()
            .iter()
            .map(|turn| curr_state.after_turn(turn))
            .collect();

        if descend_proportion < 1.0 && analysis_level > 1 {
            let num_kept = 1 + (descend_proportion * child_states.len() as f64) as usize;
            child_states.sort_by(|a, b| {
                b.heuristic_score(curr_player_id)
                    .total_cmp(&a.heuristic_score(curr_player_id))
            });
            child_states.truncate(num_kept);
        }

        for child_state in child_states {
            let child_player_id = child_state.current_player_id();
            let child_turn = child_state.prev_turn();

            let mut hypo_appraised_turn = Self::find_best_turn_inner(
                child_state,
                analysis_level - 1,
                cancellation_token,
                num_states_visited,
                descend_proportion,
            );

            // a forced sub-turn changed the mover; re-read the leaf from
            // our own viewpoint instead of trusting the child's appraisal
            if curr_player_id != child_player_id {
                if let Some(ending_state) = hypo_appraised_turn.ending_state.as_ref() {
                    hypo_appraised_turn.appraisal = ending_state.heuristic_score(curr_player_id);
                }
            }

            if best_turn.appraisal < hypo_appraised_turn.appraisal {
                best_turn = hypo_appraised_turn;
                best_turn.turn = child_turn;
            }

            if cancellation_token.is_cancellation_requested() {
                return best_turn;
            }
        }

        best_turn
    }
}
