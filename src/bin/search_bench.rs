use luckless::core::board::Board;
use luckless::core::immutable_game_state::{CommonConfig, ImmutableGameState};
use luckless::core::rule_helper;
use luckless::core::simple_turn::SimpleTurn;
use luckless::core::tree_search::TreeSearch;
use luckless::util::cancellation::{DeadlineToken, NeverCancelToken};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::{Duration, Instant};

type Search = TreeSearch<SimpleTurn, ImmutableGameState>;
type GameMcts = luckless::core::mcts::Mcts<SimpleTurn, ImmutableGameState>;

fn main() {
    let board = match Board::from_embedded("Manor") {
        Ok(board) => board,
        Err(err) => {
            eprintln!("failed to load board: {err}");
            return;
        }
    };
    let game = ImmutableGameState::at_start(Arc::new(CommonConfig::new(board, 2)));

    for analysis_level in 1..=3 {
        let mut num_states_visited = 0usize;
        let watch = Instant::now();
        let appraised_turn = Search::find_best_turn(
            &game,
            analysis_level,
            &NeverCancelToken,
            &mut num_states_visited,
            1.0,
        );
        let elapsed = watch.elapsed();

        let score_text = if appraised_turn.appraisal == rule_helper::HEURISTIC_SCORE_WIN {
            "WIN".to_string()
        } else if appraised_turn.appraisal == rule_helper::HEURISTIC_SCORE_LOSS {
            "LOSE".to_string()
        } else {
            format!("{:+0.6}", appraised_turn.appraisal)
        };

        println!(
            "bestTurn={:<10} level={} appraisal={} states={} timeSec={:.4}",
            appraised_turn
                .turn
                .as_ref()
                .map(|turn| turn.to_string())
                .unwrap_or_default(),
            analysis_level,
            score_text,
            num_states_visited,
            elapsed.as_secs_f64()
        );
    }

    let mcts = GameMcts::new(game);
    let token = DeadlineToken::after(Duration::from_secs(2));
    let mut rng = SmallRng::seed_from_u64(0);
    let watch = Instant::now();
    mcts.build_tree(&token, &mut rng);
    let elapsed = watch.elapsed();

    let best_turn_text = mcts
        .top_turns()
        .first()
        .and_then(|node| node.state().prev_turn.clone())
        .map(|turn| turn.to_string())
        .unwrap_or_default();

    println!(
        "mctsBestTurn={:<10} runs={} timeSec={:.4}",
        best_turn_text,
        mcts.num_runs(),
        elapsed.as_secs_f64()
    );
}
