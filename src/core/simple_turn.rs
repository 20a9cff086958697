use crate::core::{
    player::{player_moves_to_nice_string, PlayerId, PlayerMove},
    room::RoomId,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A turn as chosen by a player: one move normally, two in the dual-move
/// opening turn of a stranger game.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
#[readonly::make]
pub struct SimpleTurn {
    pub moves: Vec<PlayerMove>,
}

impl SimpleTurn {
    pub fn new(moves: impl IntoIterator<Item = PlayerMove>) -> Self {
        Self {
            moves: moves.into_iter().collect(),
        }
    }

    pub fn single(player_id: PlayerId, dest_room_id: RoomId) -> Self {
        Self::new([PlayerMove::new(player_id, dest_room_id)])
    }

    pub fn from_move(player_move: PlayerMove) -> Self {
        Self::new([player_move])
    }
}

impl From<SimpleTurn> for Vec<PlayerMove> {
    fn from(simple_turn: SimpleTurn) -> Self {
        simple_turn.moves
    }
}

impl fmt::Display for SimpleTurn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            player_moves_to_nice_string(self.moves.iter().copied())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_constructor_creates_one_move() {
        let turn = SimpleTurn::single(PlayerId(2), RoomId(5));
        assert_eq!(turn.moves, vec![PlayerMove::new(PlayerId(2), RoomId(5))]);
    }

    #[test]
    fn display_joins_moves_with_trailing_semicolon() {
        let turn = SimpleTurn::new([
            PlayerMove::new(PlayerId(0), RoomId(2)),
            PlayerMove::new(PlayerId(1), RoomId(7)),
        ]);
        assert_eq!(turn.to_string(), "1@2 2@7;");
    }

    #[test]
    fn serde_round_trip_keeps_moves() {
        let turn = SimpleTurn::new([PlayerMove::new(PlayerId(3), RoomId(8))]);
        let json = serde_json::to_string(&turn).unwrap();
        assert_eq!(serde_json::from_str::<SimpleTurn>(&json).unwrap(), turn);
    }
}
