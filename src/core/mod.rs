pub mod board;
pub mod game_state;
pub mod immutable_game_state;
pub mod mcts;
pub mod player;
pub mod room;
pub mod rule_helper;
pub mod simple_turn;
pub mod tree_search;
pub mod wing;
