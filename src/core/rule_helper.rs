use crate::core::player::PlayerId;

/// Resource tuning for the simplified deck: loot accrues fractional cards
/// instead of drawing from a real deck, and each card kind has a fixed
/// clover (defense) and strength (attack) exchange rate.
pub mod simple {
    pub const JUST_OVER_ONE_THIRD: f64 = 11.0 / 32.0;

    pub const PLAYER_STARTING_MOVE_CARDS: f64 = 2.0;
    pub const MOVE_CARDS_PER_LOOT: f64 = JUST_OVER_ONE_THIRD;
    pub const CLOVERS_PER_MOVE_CARD: f64 = 1.0;

    pub const PLAYER_STARTING_WEAPONS: f64 = 2.0;
    pub const WEAPONS_PER_LOOT: f64 = JUST_OVER_ONE_THIRD;
    pub const STRENGTH_PER_WEAPON: f64 = 53.0 / 24.0;
    pub const CLOVERS_PER_WEAPON: f64 = 1.0;

    pub const PLAYER_STARTING_FAILURES: f64 = 4.0;
    pub const FAILURES_PER_LOOT: f64 = JUST_OVER_ONE_THIRD;
    pub const CLOVERS_PER_FAILURE: f64 = 50.0 / 24.0;

    pub const CLOVERS_CONTRIBUTED_PER_STRANGER: f64 = 1.0;
}

pub const PLAYER_STARTING_STRENGTH: i32 = 1;

// A two-seat game gets a stranger teammate per seat, interleaved so that
// seat order alternates sides.
pub const NUM_NORMAL_PLAYERS_WHEN_HAVE_STRANGERS: i32 = 2;
pub const NUM_ALL_PLAYERS_WHEN_HAVE_STRANGERS: i32 = 4;

pub const SIDE_A_NORMAL_PLAYER_ID: PlayerId = PlayerId(0);
pub const SIDE_B_STRANGER_PLAYER_ID: PlayerId = PlayerId(1);
pub const SIDE_B_NORMAL_PLAYER_ID: PlayerId = PlayerId(2);
pub const SIDE_A_STRANGER_PLAYER_ID: PlayerId = PlayerId(3);

/// Exact sentinel appraisals for decided states; finite so that search
/// arithmetic (negation, atan) stays well-behaved.
pub const HEURISTIC_SCORE_WIN: f64 = 1.0e9;
pub const HEURISTIC_SCORE_LOSS: f64 = -1.0e9;

pub fn num_all_players(num_normal_players: i32) -> i32 {
    if num_normal_players == NUM_NORMAL_PLAYERS_WHEN_HAVE_STRANGERS {
        NUM_ALL_PLAYERS_WHEN_HAVE_STRANGERS
    } else {
        num_normal_players
    }
}

/// Collapses a stranger onto the normal player it fights for; identity in
/// games without strangers.
pub fn to_normal_player_id(player_id: PlayerId, num_normal_players: i32) -> PlayerId {
    if num_normal_players != NUM_NORMAL_PLAYERS_WHEN_HAVE_STRANGERS {
        return player_id;
    }

    if player_id == SIDE_A_NORMAL_PLAYER_ID || player_id == SIDE_A_STRANGER_PLAYER_ID {
        SIDE_A_NORMAL_PLAYER_ID
    } else {
        SIDE_B_NORMAL_PLAYER_ID
    }
}

pub fn allied_stranger(player_id: PlayerId) -> PlayerId {
    match player_id {
        SIDE_A_NORMAL_PLAYER_ID | SIDE_A_STRANGER_PLAYER_ID => SIDE_A_STRANGER_PLAYER_ID,
        SIDE_B_NORMAL_PLAYER_ID | SIDE_B_STRANGER_PLAYER_ID => SIDE_B_STRANGER_PLAYER_ID,
        _ => PlayerId::INVALID,
    }
}

pub fn opposing_normal_player(player_id: PlayerId) -> PlayerId {
    if player_id == SIDE_A_NORMAL_PLAYER_ID || player_id == SIDE_A_STRANGER_PLAYER_ID {
        SIDE_B_NORMAL_PLAYER_ID
    } else {
        SIDE_A_NORMAL_PLAYER_ID
    }
}

pub fn opposing_stranger(player_id: PlayerId) -> PlayerId {
    allied_stranger(opposing_normal_player(player_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_all_players_adds_strangers_only_for_two_seats() {
        assert_eq!(num_all_players(2), 4);
        assert_eq!(num_all_players(3), 3);
        assert_eq!(num_all_players(5), 5);
    }

    #[test]
    fn to_normal_player_id_maps_strangers_to_their_side() {
        assert_eq!(to_normal_player_id(PlayerId(1), 2), SIDE_B_NORMAL_PLAYER_ID);
        assert_eq!(to_normal_player_id(PlayerId(3), 2), SIDE_A_NORMAL_PLAYER_ID);
        assert_eq!(to_normal_player_id(PlayerId(1), 3), PlayerId(1));
    }

    #[test]
    fn side_helpers_pair_up_consistently() {
        assert_eq!(allied_stranger(SIDE_A_NORMAL_PLAYER_ID), SIDE_A_STRANGER_PLAYER_ID);
        assert_eq!(allied_stranger(SIDE_B_NORMAL_PLAYER_ID), SIDE_B_STRANGER_PLAYER_ID);
        assert_eq!(
            opposing_normal_player(SIDE_B_STRANGER_PLAYER_ID),
            SIDE_A_NORMAL_PLAYER_ID
        );
        assert_eq!(
            opposing_stranger(SIDE_B_NORMAL_PLAYER_ID),
            SIDE_A_STRANGER_PLAYER_ID
        );
    }
}
