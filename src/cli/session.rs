use luckless::core::{
    board::Board,
    immutable_game_state::{CommonConfig, ImmutableGameState},
    mcts::Mcts,
    player::{PlayerId, PlayerMove},
    room::RoomId,
    rule_helper,
    simple_turn::SimpleTurn,
    tree_search::TreeSearch,
};
use luckless::util::cancellation::{DeadlineToken, NeverCancelToken};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

type GameMcts = Mcts<SimpleTurn, ImmutableGameState>;

pub struct Session {
    num_normal_players: i32,
    num_normal_players_old: i32,
    board_name: String,
    board_name_old: String,
    closed_wing_names: Vec<String>,
    closed_wing_names_old: Vec<String>,
    game: Option<ImmutableGameState>,
    mcts: Option<GameMcts>,
    should_quit: bool,
    analysis_level: f64,
    descend_proportion: f64,
    mcts_seconds: f64,
    recent_analyzed_turn: Option<SimpleTurn>,
}

impl Session {
    pub fn new(_cli_args: impl IntoIterator<Item = String>) -> Self {
        Self {
            num_normal_players: 2,
            num_normal_players_old: 0,
            board_name: "Manor".to_string(),
            board_name_old: String::new(),
            closed_wing_names: Vec::new(),
            closed_wing_names_old: Vec::new(),
            game: None,
            mcts: None,
            should_quit: false,
            analysis_level: 1.0,
            descend_proportion: 1.0,
            mcts_seconds: 5.0,
            recent_analyzed_turn: None,
        }
    }

    pub fn start(&mut self) {
        self.reset_game();
        self.interpretation_loop();
    }

    fn interpretation_loop(&mut self) {
        let stdin = io::stdin();

        loop {
            let prompt = self.user_prompt_text();
            print!("{prompt}");
            let _ = io::stdout().flush();

            let mut line = String::new();
            match stdin.read_line(&mut line) {
                Ok(0) => return,
                Ok(_) => {
                    let line = line.trim_end_matches(['\r', '\n']).to_string();
                    for subline in line.split(';') {
                        self.interpret_directive(subline);
                        if self.should_quit {
                            return;
                        }
                    }
                }
                Err(_) => return,
            }
        }
    }

    // parenthesized spans are inline comments
    fn without_comments(&self, directive: &str) -> String {
        let mut working = directive.to_string();
        while let Some(start_idx) = working.find('(') {
            if let Some(end_rel) = working[start_idx..].find(')') {
                let end_idx = start_idx + end_rel;
                working.replace_range(start_idx..=end_idx, "");
            } else {
                working.truncate(start_idx);
                break;
            }
        }
        working
    }

    fn interpret_directive(&mut self, directive: &str) {
        const TAG_QUIT: &str = "q";
        const TAG_DISPLAY: &str = "d";
        const TAG_RESET: &str = "r";
        const TAG_REPEAT: &str = "x";
        const TAG_HISTORY: &str = "h";
        const TAG_UNDO: &str = "u";
        const TAG_ANALYZE: &str = "a";
        const TAG_ANALYZE_ASCENDING: &str = "aa";
        const TAG_EXECUTE_ANALYSIS: &str = "e";
        const TAG_EXECUTE_PREVIOUS_ANALYSIS: &str = "ep";
        const TAG_MCTS: &str = "m";
        const TAG_BOARD: &str = "b";
        const TAG_BOARD_LONG: &str = "board";
        const TAG_PLAYERS: &str = "p";
        const TAG_PLAYERS_LONG: &str = "numplayers";
        const TAG_CLOSED_WINGS: &str = "w";
        const TAG_CLOSED_WINGS_LONG: &str = "closedwings";

        let directive = self.without_comments(directive);
        let tokens = directive
            .split_whitespace()
            .map(|token| token.to_string())
            .collect::<Vec<_>>();
        let directive_tag = tokens
            .first()
            .map(|token| token.to_lowercase())
            .unwrap_or_default();

        if directive.trim().is_empty() {
            return;
        }

        if directive_tag == TAG_QUIT {
            self.should_quit = true;
        } else if directive_tag == TAG_DISPLAY {
            self.print_game_settings();
            if let Some(game) = self.game.as_ref() {
                println!("{}", game.state_summary("  "));
            }
        } else if directive_tag == TAG_RESET {
            println!("(RESET)");
            self.reset_game();
        } else if directive_tag == TAG_UNDO {
            println!("(UNDO)");
            loop {
                let prev_state = self
                    .game
                    .as_ref()
                    .and_then(|game| game.prev_state.as_deref())
                    .cloned();
                let Some(prev_state) = prev_state else {
                    break;
                };
                self.game = Some(prev_state);
                if self
                    .game
                    .as_ref()
                    .map(|game| game.is_normal_turn())
                    .unwrap_or(true)
                {
                    break;
                }
            }

            if let Some(game) = self.game.as_ref() {
                println!("{}", game.state_summary("  "));
            }
        } else if directive_tag == TAG_REPEAT {
            if tokens.len() > 1 {
                if let Ok(num_repeats) = tokens[1].parse::<usize>() {
                    let directive_text = tokens[2..].join(" ");
                    println!("(REPEAT {num_repeats}: {directive_text})");
                    for _ in 0..num_repeats {
                        self.interpret_directive(&directive_text);
                    }
                } else {
                    println!("directive {directive_tag} needs repetition count and directive to repeat");
                }
            } else {
                println!("directive {directive_tag} needs repetition count and directive to repeat");
            }
        } else if directive_tag == TAG_HISTORY {
            println!("{TAG_PLAYERS} {};", self.num_normal_players_old);
            println!("{TAG_BOARD} {};", self.board_name_old);
            println!(
                "{TAG_CLOSED_WINGS} {};",
                self.closed_wing_names_old.join(" ")
            );
            println!("{TAG_RESET};");

            if let Some(game) = self.game.as_ref() {
                println!("{}", game.normal_turn_hist());
            }
        } else if directive_tag == TAG_ANALYZE
            || directive_tag == TAG_ANALYZE_ASCENDING
            || directive_tag == TAG_EXECUTE_ANALYSIS
        {
            if let Some(token) = tokens.get(1) {
                if let Ok(level) = token.parse::<f64>() {
                    self.analysis_level = level;
                }
            }
            if let Some(token) = tokens.get(2) {
                if let Ok(proportion) = token.parse::<f64>() {
                    self.descend_proportion = proportion.clamp(0.0, 1.0);
                }
            }

            let do_suggested_move = directive_tag == TAG_EXECUTE_ANALYSIS;
            let start_level = if directive_tag == TAG_ANALYZE_ASCENDING {
                1
            } else {
                self.analysis_level as i32
            };

            let mut level = start_level;
            while (level as f64) <= self.analysis_level {
                self.analyze(do_suggested_move, level);
                level += 1;
            }
        } else if directive_tag == TAG_MCTS {
            if let Some(token) = tokens.get(1) {
                if let Ok(seconds) = token.parse::<f64>() {
                    self.mcts_seconds = seconds;
                }
            }
            self.analyze_mcts();
        } else if directive_tag == TAG_EXECUTE_PREVIOUS_ANALYSIS {
            if let Some(turn) = self.recent_analyzed_turn.clone() {
                self.do_moves_turn(turn);
            } else {
                println!("no recent analyzed move");
            }
        } else if directive_tag == TAG_BOARD || directive_tag == TAG_BOARD_LONG {
            if tokens.len() != 2 {
                println!("  board directive needs two tokens");
                println!(
                    "  embedded boards: {}",
                    Board::embedded_board_names().collect::<Vec<_>>().join(", ")
                );
            } else {
                self.board_name = tokens[1].clone();
            }

            self.print_game_settings();
        } else if directive_tag == TAG_CLOSED_WINGS || directive_tag == TAG_CLOSED_WINGS_LONG {
            self.closed_wing_names = tokens[1..].to_vec();
            self.print_game_settings();
        } else if directive_tag == TAG_PLAYERS || directive_tag == TAG_PLAYERS_LONG {
            if tokens.len() != 2 {
                println!("  {TAG_PLAYERS_LONG} directive needs one integer token");
            } else if let Ok(new_val) = tokens[1].parse::<i32>() {
                self.num_normal_players = new_val;
            } else {
                println!("  {TAG_PLAYERS_LONG} directive needs one integer token");
            }

            self.print_game_settings();
        } else if directive_tag
            .chars()
            .next()
            .map(|ch| ch.is_ascii_digit())
            .unwrap_or(false)
        {
            self.do_moves_tokens(&tokens);
        } else {
            let mut explanations = vec![
                "a [int] [prop] | analyze next move [int] deep, keeping [prop] of children below the root",
                "aa [int] | analyze levels 1..[int]",
                "b/board [boardName] | set board",
                "closedwings/w [wing1] [wing2] [...] | set closed wings",
                "d       | display game state",
                "e [int] | analyze then execute suggested move",
                "ep      | execute last analyzed move",
                "h       | display user-turn history",
                "m [sec] | mcts analysis for [sec] seconds",
                "numplayers/p [int] | set number of normal players",
                "q       | quit",
                "r       | reset game",
                "u       | undo to previous normal turn",
                "x [n] [cmd] | repeat [cmd] n times",
                "[playerNum@destRoomId] [destRoomIdForCurrentPlayer] submit turn of those moves",
            ];
            explanations.sort();
            println!("  unrecognized directive '{directive}'");
            for explanation in explanations {
                println!("  {explanation}");
            }
        }
    }

    fn print_game_settings(&self) {
        println!("  NormalPlayers(p): {}", self.num_normal_players);
        println!("  Board(b):         {}", self.board_name);
        println!("  ClosedWings(w):   {}", self.closed_wing_names.join(", "));
        println!("  AnalysisLevel(a): {}", self.analysis_level);
        println!("  MctsSeconds(m):   {}", self.mcts_seconds);
    }

    fn analyze(&mut self, do_suggested_move: bool, analysis_level: i32) {
        let Some(game) = self.game.as_ref() else {
            return;
        };

        let mut num_states_visited = 0usize;
        let watch = Instant::now();
        let appraised_turn = TreeSearch::find_best_turn(
            game,
            analysis_level,
            &NeverCancelToken,
            &mut num_states_visited,
            self.descend_proportion,
        );
        let elapsed = watch.elapsed();

        if let Some(turn) = appraised_turn.turn.clone() {
            self.recent_analyzed_turn = Some(turn);
        }

        let score_text = if appraised_turn.appraisal == rule_helper::HEURISTIC_SCORE_WIN {
            "WIN".to_string()
        } else if appraised_turn.appraisal == rule_helper::HEURISTIC_SCORE_LOSS {
            "LOSE".to_string()
        } else {
            format!("{:+0.4}", appraised_turn.appraisal)
        };

        let best_turn_text = appraised_turn
            .turn
            .as_ref()
            .map(|turn| turn.to_string())
            .unwrap_or_default();

        println!(
            "bestTurn={:<10} level={} appraisal={} states={} timeSec={:.2}",
            best_turn_text,
            analysis_level,
            score_text,
            num_states_visited,
            elapsed.as_secs_f64()
        );

        if do_suggested_move {
            if let Some(turn) = appraised_turn.turn {
                self.do_moves_turn(turn);
            }
        }
    }

    fn analyze_mcts(&mut self) {
        let Some(game) = self.game.clone() else {
            return;
        };

        if game.has_winner() {
            println!("game is already decided");
            return;
        }

        // reuse the tree built on earlier turns when the played moves match
        let mut mcts = match self.mcts.take() {
            Some(mut existing) => {
                let reused = existing.reroot(&game);
                log::debug!("mcts reroot reused existing tree: {reused}");
                existing
            }
            None => GameMcts::new(game),
        };

        let watch = Instant::now();
        let token = DeadlineToken::after(Duration::from_secs_f64(self.mcts_seconds));
        let mut rng = SmallRng::from_entropy();
        mcts.build_tree(&token, &mut rng);
        let elapsed = watch.elapsed();

        if !mcts.is_tree_valid() {
            log::warn!("mcts tree failed its bookkeeping check");
        }

        let top_turns = mcts.top_turns();
        println!(
            "mcts runs={} candidates={} timeSec={:.2}",
            mcts.num_runs(),
            top_turns.len(),
            elapsed.as_secs_f64()
        );

        for node in top_turns.iter().take(5) {
            let turn_text = node
                .state()
                .prev_turn
                .as_ref()
                .map(|turn| turn.to_string())
                .unwrap_or_default();
            println!(
                "  turn={:<10} runs={:<7} winRate={:.3}",
                turn_text,
                node.num_runs(),
                node.exploitation_value()
            );
        }

        self.recent_analyzed_turn = top_turns
            .first()
            .and_then(|node| node.state().prev_turn.clone());
        self.mcts = Some(mcts);
    }

    fn do_moves_tokens(&mut self, tokens: &[String]) {
        let Some(game) = self.game.as_ref() else {
            return;
        };

        if game.has_winner() {
            if let Some(winner) = game.winner {
                println!(
                    "{} won already.  Moves not accepted.",
                    game.player_text(winner)
                );
            }
            return;
        }

        let mut moves = Vec::new();
        let mut has_parse_errors = false;
        let default_player_display_num = game.current_player_id.display_num();

        for token in tokens {
            let subtokens = token
                .split(|ch| ch == ',' || ch == '@')
                .collect::<Vec<_>>();
            let dest_room_subtoken = if subtokens.len() == 1 {
                subtokens[0]
            } else {
                subtokens[1]
            };

            if let Ok(dest_room_id) = dest_room_subtoken.parse::<usize>() {
                let mut player_display_num = default_player_display_num;
                if subtokens.len() >= 2 {
                    if let Ok(parsed_num) = subtokens[0].parse::<i32>() {
                        player_display_num = parsed_num;
                    } else {
                        println!(
                            "  failed parse for player num from '{}' subtoken of '{}'",
                            subtokens[0], token
                        );
                        has_parse_errors = true;
                        continue;
                    }
                }

                if player_display_num <= 0 {
                    println!("  failed parse for player num from '{token}'");
                    has_parse_errors = true;
                    continue;
                }

                let player_id = PlayerId(player_display_num - 1);
                moves.push(PlayerMove::new(player_id, RoomId(dest_room_id)));
            } else {
                println!("  failed parse for room id from '{token}'");
                has_parse_errors = true;
            }
        }

        if !has_parse_errors {
            self.do_moves_turn(SimpleTurn::new(moves));
        }
    }

    fn do_moves_turn(&mut self, turn: SimpleTurn) {
        self.recent_analyzed_turn = None;

        let Some(game) = self.game.as_ref() else {
            println!("  invalid turn: game not initialized");
            return;
        };

        match game.try_after_turn(&turn) {
            Ok(new_state) => {
                // one summary per sub-turn, oldest first, back to the turn
                // just entered
                let mut summaries = Vec::new();
                let mut cursor: Option<&ImmutableGameState> = Some(&new_state);
                while let Some(state) = cursor {
                    summaries.push(state.prev_turn_summary(true));
                    let prev = state.prev_state.as_deref();
                    if prev.map(|p| p.is_normal_turn()).unwrap_or(true) {
                        break;
                    }
                    cursor = prev;
                }
                for summary in summaries.iter().rev() {
                    println!("{summary}");
                }

                println!("{}", new_state.state_summary("  "));
                self.game = Some(new_state);
            }
            Err(error_msg) => {
                println!("  invalid turn: {error_msg}");
            }
        }
    }

    fn reset_game_with_problems(&mut self) -> Result<(), Vec<String>> {
        let board = Board::from_embedded_with_options(
            &self.board_name,
            self.closed_wing_names.iter().map(String::as_str),
        )
        .map_err(|err| vec![err.to_string()])?;

        board.is_valid()?;

        let common = Arc::new(CommonConfig::new(board, self.num_normal_players));
        self.game = Some(ImmutableGameState::at_start(common));
        self.mcts = None;
        self.board_name_old = self.board_name.clone();
        self.num_normal_players_old = self.num_normal_players;
        self.closed_wing_names_old = self.closed_wing_names.clone();

        Ok(())
    }

    fn reset_game(&mut self) -> bool {
        match self.reset_game_with_problems() {
            Ok(()) => {
                self.print_game_settings();
                if let Some(game) = self.game.as_ref() {
                    println!("{}", game.state_summary("  "));
                }
                true
            }
            Err(problems) => {
                println!("problems resetting game");
                for problem in problems {
                    println!("  {problem}");
                }
                false
            }
        }
    }

    fn user_prompt_text(&self) -> String {
        let Some(game) = self.game.as_ref() else {
            return "> ".to_string();
        };

        match game.winner {
            Some(winner) => format!("{} WON> ", game.player_text(winner)),
            None => format!("{}> ", game.player_text(game.current_player_id)),
        }
    }
}
