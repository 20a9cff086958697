use crate::core::{
    board::{self, Board},
    game_state::GameState,
    player::{AppraisalState, PlayerAction, PlayerId, PlayerType},
    rule_helper::{self, simple},
    room::RoomId,
    simple_turn::SimpleTurn,
};
use itertools::Itertools;
use std::fmt;
use std::sync::Arc;

/// Game-wide configuration shared by every state of one game. Compared by
/// board identity and player counts, not by board contents.
#[derive(Clone, Debug)]
#[readonly::make]
pub struct CommonConfig {
    pub board: Board,
    pub num_normal_players: i32,
    pub num_all_players: i32,
}

impl PartialEq for CommonConfig {
    fn eq(&self, other: &Self) -> bool {
        self.board.name == other.board.name
            && self.num_normal_players == other.num_normal_players
            && self.num_all_players == other.num_all_players
    }
}

impl CommonConfig {
    pub fn new(board: Board, num_normal_players: i32) -> Self {
        let num_all_players = rule_helper::num_all_players(num_normal_players);
        Self {
            board,
            num_normal_players,
            num_all_players,
        }
    }

    pub fn has_strangers(&self) -> bool {
        self.num_normal_players == rule_helper::NUM_NORMAL_PLAYERS_WHEN_HAVE_STRANGERS
    }

    // Stranger seats are interleaved: odd ids are strangers when present.
    pub fn player_type(&self, player_id: PlayerId) -> PlayerType {
        if self.has_strangers() && player_id.0 % 2 == 1 {
            PlayerType::Stranger
        } else {
            PlayerType::Normal
        }
    }

    pub fn player_text(&self, player_id: PlayerId) -> String {
        let prefix = match self.player_type(player_id) {
            PlayerType::Normal => 'P',
            PlayerType::Stranger => 'p',
        };
        format!("{prefix}{}", player_id.display_num())
    }

    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> {
        (0..self.num_all_players).map(PlayerId)
    }

    pub fn to_normal_player_id(&self, player_id: PlayerId) -> PlayerId {
        rule_helper::to_normal_player_id(player_id, self.num_normal_players)
    }
}

/// One point in a game's history. Never mutated after construction; each
/// state keeps its predecessor alive through a shared reference, so search
/// branches form a tree of states over a common ancestry.
#[derive(Clone, Debug)]
#[readonly::make]
pub struct ImmutableGameState {
    pub common: Arc<CommonConfig>,
    pub turn_id: i32,
    pub current_player_id: PlayerId,
    pub doctor_room_id: RoomId,
    pub player_room_ids: Vec<RoomId>,
    pub players_had_turn: Vec<bool>,
    pub player_move_cards: Vec<f64>,
    pub player_weapons: Vec<f64>,
    pub player_failures: Vec<f64>,
    pub player_strengths: Vec<i32>,
    pub attacker_hist: Vec<PlayerId>,
    pub winner: Option<PlayerId>,
    pub prev_turn: Option<SimpleTurn>,
    pub prev_state: Option<Arc<ImmutableGameState>>,
}

// Turn counter and history are bookkeeping; two states are the same
// position when the pieces and resources agree.
impl PartialEq for ImmutableGameState {
    fn eq(&self, other: &Self) -> bool {
        self.common == other.common
            && self.current_player_id == other.current_player_id
            && self.doctor_room_id == other.doctor_room_id
            && self.player_room_ids == other.player_room_ids
            && self.players_had_turn == other.players_had_turn
            && self.player_move_cards == other.player_move_cards
            && self.player_weapons == other.player_weapons
            && self.player_failures == other.player_failures
            && self.player_strengths == other.player_strengths
            && self.winner == other.winner
    }
}

impl ImmutableGameState {
    pub fn at_start(common: Arc<CommonConfig>) -> Self {
        let n = common.num_all_players as usize;
        let player_start = common.board.player_start_room_id;
        let doctor_start = common.board.doctor_start_room_id;

        Self {
            common,
            turn_id: 1,
            current_player_id: PlayerId(0),
            doctor_room_id: doctor_start,
            player_room_ids: vec![player_start; n],
            players_had_turn: vec![false; n],
            player_move_cards: vec![simple::PLAYER_STARTING_MOVE_CARDS; n],
            player_weapons: vec![simple::PLAYER_STARTING_WEAPONS; n],
            player_failures: vec![simple::PLAYER_STARTING_FAILURES; n],
            player_strengths: vec![rule_helper::PLAYER_STARTING_STRENGTH; n],
            attacker_hist: Vec::new(),
            winner: None,
            prev_turn: None,
            prev_state: None,
        }
    }

    pub fn has_winner(&self) -> bool {
        self.winner.is_some()
    }

    pub fn is_normal_turn(&self) -> bool {
        self.common.player_type(self.current_player_id) == PlayerType::Normal
    }

    pub fn player_text(&self, player_id: PlayerId) -> String {
        self.common.player_text(player_id)
    }

    /// Number of normal-player turns taken so far.
    pub fn ply(&self) -> usize {
        let mut ply = 0;
        let mut state = self.prev_state.as_deref();

        while let Some(s) = state {
            if s.is_normal_turn() {
                ply += 1;
            }
            state = s.prev_state.as_deref();
        }

        ply
    }

    pub fn player_sees_player(&self, player_id1: PlayerId, player_id2: PlayerId) -> bool {
        self.common.board.sight[self.player_room_ids[player_id1.idx()].idx()]
            [self.player_room_ids[player_id2.idx()].idx()]
    }

    /// Clovers the table can muster against the current player in the
    /// free-for-all variant. Failures count as single clovers here; the
    /// full exchange rate applies only when they are actually spent.
    pub fn num_defensive_clovers(&self) -> f64 {
        let mut clovers = 0.0;
        let attacking_side = self.common.to_normal_player_id(self.current_player_id);

        for pid in (0..self.common.num_normal_players).map(PlayerId) {
            if pid == self.current_player_id {
                continue;
            }

            if self.common.player_type(pid) == PlayerType::Normal {
                if pid != attacking_side {
                    clovers += self.player_failures[pid.idx()] * simple::CLOVERS_PER_WEAPON
                        + self.player_weapons[pid.idx()] * simple::CLOVERS_PER_WEAPON
                        + self.player_move_cards[pid.idx()] * simple::CLOVERS_PER_MOVE_CARD;
                }
            } else {
                clovers += simple::CLOVERS_CONTRIBUTED_PER_STRANGER;
            }
        }

        clovers
    }

    /// Rule-level validity of a proposed turn. The state is untouched
    /// either way; on rejection the caller retries with a legal turn.
    pub fn check_normal_turn(&self, turn: &SimpleTurn) -> Result<(), String> {
        for player_move in &turn.moves {
            if player_move.player_id.0 < 0
                || player_move.player_id.0 >= self.common.num_all_players
            {
                return Err(format!("invalid player id {}", player_move.player_id.0));
            }
            if !self.common.board.room_ids.contains(&player_move.dest_room_id) {
                return Err(format!("invalid room id {}", player_move.dest_room_id));
            }
        }

        let total_dist: i32 = turn
            .moves
            .iter()
            .map(|m| {
                self.common.board.distance[self.player_room_ids[m.player_id.idx()].idx()]
                    [m.dest_room_id.idx()]
            })
            .sum();

        if self.player_move_cards[self.current_player_id.idx()] < (total_dist - 1) as f64 {
            return Err(format!(
                "player {} used too many move points ({total_dist})",
                self.player_text(self.current_player_id)
            ));
        }

        for player_move in &turn.moves {
            if player_move.player_id != self.current_player_id
                && self.common.player_type(player_move.player_id) != PlayerType::Stranger
            {
                return Err(format!(
                    "player {} tried to move non-stranger {}",
                    self.player_text(self.current_player_id),
                    self.player_text(player_move.player_id)
                ));
            }
        }

        Ok(())
    }

    /// Validated turn application for external callers.
    pub fn try_after_turn(&self, turn: &SimpleTurn) -> Result<Self, String> {
        self.check_normal_turn(turn)?;
        Ok(self.after_normal_turn(turn))
    }

    /// Applies an already-validated turn: move phase, action phase, doctor
    /// phase, then stranger auto-play until a normal player is up or the
    /// game is decided.
    pub fn after_normal_turn(&self, turn: &SimpleTurn) -> Self {
        // move phase
        let total_dist: i32 = turn
            .moves
            .iter()
            .map(|m| {
                self.common.board.distance[self.player_room_ids[m.player_id.idx()].idx()]
                    [m.dest_room_id.idx()]
            })
            .sum();
        let move_cards_spent = (total_dist - 1).max(0) as f64;

        let mut new_player_move_cards = self.player_move_cards.clone();
        new_player_move_cards[self.current_player_id.idx()] -= move_cards_spent;

        let mut new_player_room_ids = self.player_room_ids.clone();
        let mut moved_stranger_that_saw_current_player = false;

        for player_move in &turn.moves {
            new_player_room_ids[player_move.player_id.idx()] = player_move.dest_room_id;

            if player_move.player_id != self.current_player_id
                && self.player_sees_player(player_move.player_id, self.current_player_id)
            {
                moved_stranger_that_saw_current_player = true;
            }
        }

        // action phase
        let mut new_player_weapons = self.player_weapons.clone();
        let mut new_player_failures = self.player_failures.clone();
        let mut new_player_strengths = self.player_strengths.clone();
        let mut new_attacker_hist = self.attacker_hist.clone();
        let mut new_winner = self.winner;

        let action = self.best_action_allowed(
            self.current_player_id,
            self.doctor_room_id,
            &new_player_room_ids,
            moved_stranger_that_saw_current_player,
        );

        match action {
            PlayerAction::Attack => {
                if self.process_attack(
                    &mut new_player_move_cards,
                    &mut new_player_weapons,
                    &mut new_player_failures,
                    &mut new_player_strengths,
                    &mut new_attacker_hist,
                ) {
                    new_winner = Some(self.current_player_id);
                }
            }
            PlayerAction::Loot => {
                let pid = self.current_player_id.idx();
                new_player_move_cards[pid] += simple::MOVE_CARDS_PER_LOOT;
                new_player_weapons[pid] += simple::WEAPONS_PER_LOOT;
                new_player_failures[pid] += simple::FAILURES_PER_LOOT;
            }
            PlayerAction::None => {}
        }

        // doctor phase
        let (new_players_had_turn, new_current_player_id, new_doctor_room_id) =
            if new_winner.is_none() {
                self.do_doctor_phase(&new_player_room_ids)
            } else {
                (
                    self.players_had_turn.clone(),
                    self.current_player_id,
                    self.doctor_room_id,
                )
            };

        let new_state = Self {
            common: Arc::clone(&self.common),
            turn_id: self.turn_id + 1,
            current_player_id: new_current_player_id,
            doctor_room_id: new_doctor_room_id,
            player_room_ids: new_player_room_ids,
            players_had_turn: new_players_had_turn,
            player_move_cards: new_player_move_cards,
            player_weapons: new_player_weapons,
            player_failures: new_player_failures,
            player_strengths: new_player_strengths,
            attacker_hist: new_attacker_hist,
            winner: new_winner,
            prev_turn: Some(turn.clone()),
            prev_state: Some(Arc::new(self.clone())),
        };

        if !new_state.has_winner() && !new_state.is_normal_turn() {
            return new_state.after_stranger_turn(turn);
        }

        new_state
    }

    /// A stranger's forced turn: attack if already allowed, otherwise
    /// retreat one room and re-check.
    fn after_stranger_turn(&self, normal_turn: &SimpleTurn) -> Self {
        let mut best_action = self.best_action_allowed(
            self.current_player_id,
            self.doctor_room_id,
            &self.player_room_ids,
            false,
        );

        // move phase
        let new_current_player_room_id = if best_action == PlayerAction::Attack {
            self.player_room_ids[self.current_player_id.idx()]
        } else {
            self.common
                .board
                .next_room_id(self.player_room_ids[self.current_player_id.idx()], -1)
        };

        let mut new_player_room_ids = self.player_room_ids.clone();
        new_player_room_ids[self.current_player_id.idx()] = new_current_player_room_id;

        if best_action != PlayerAction::Attack {
            best_action = self.best_action_allowed(
                self.current_player_id,
                self.doctor_room_id,
                &new_player_room_ids,
                false,
            );
        }

        // action phase
        let mut new_player_move_cards = self.player_move_cards.clone();
        let mut new_player_weapons = self.player_weapons.clone();
        let mut new_player_failures = self.player_failures.clone();
        let mut new_player_strengths = self.player_strengths.clone();
        let mut new_attacker_hist = self.attacker_hist.clone();
        let mut new_winner = self.winner;

        if best_action == PlayerAction::Attack
            && self.process_attack(
                &mut new_player_move_cards,
                &mut new_player_weapons,
                &mut new_player_failures,
                &mut new_player_strengths,
                &mut new_attacker_hist,
            )
        {
            new_winner = Some(self.common.to_normal_player_id(self.current_player_id));
        }

        // doctor phase
        let (new_players_had_turn, new_current_player_id, new_doctor_room_id) =
            if new_winner.is_none() {
                self.do_doctor_phase(&new_player_room_ids)
            } else {
                (
                    self.players_had_turn.clone(),
                    self.current_player_id,
                    self.doctor_room_id,
                )
            };

        let new_state = Self {
            common: Arc::clone(&self.common),
            turn_id: self.turn_id + 1,
            current_player_id: new_current_player_id,
            doctor_room_id: new_doctor_room_id,
            player_room_ids: new_player_room_ids,
            players_had_turn: new_players_had_turn,
            player_move_cards: new_player_move_cards,
            player_weapons: new_player_weapons,
            player_failures: new_player_failures,
            player_strengths: new_player_strengths,
            attacker_hist: new_attacker_hist,
            winner: new_winner,
            prev_turn: Some(normal_turn.clone()),
            prev_state: Some(Arc::new(self.clone())),
        };

        if !new_state.has_winner() && !new_state.is_normal_turn() {
            return new_state.after_stranger_turn(normal_turn);
        }

        new_state
    }

    /// Returns true when the attack succeeds and the attacker's side wins.
    /// The attacker's strength increments and the attack is recorded in
    /// history whatever the outcome.
    fn process_attack(
        &self,
        player_move_cards: &mut [f64],
        player_weapons: &mut [f64],
        player_failures: &mut [f64],
        player_strengths: &mut [i32],
        attacker_hist: &mut Vec<PlayerId>,
    ) -> bool {
        let attacker = self.current_player_id;
        let mut attack_strength = player_strengths[attacker.idx()] as f64;

        player_strengths[attacker.idx()] += 1;
        attacker_hist.push(attacker);

        fn use_weapon(attacker: usize, attack_strength: &mut f64, player_weapons: &mut [f64]) {
            if player_weapons[attacker] >= 1.0 {
                *attack_strength += simple::STRENGTH_PER_WEAPON;
                player_weapons[attacker] -= 1.0;
            }
        }

        fn defend_with_card_type(
            defender: usize,
            attack_strength: &mut f64,
            player_cards: &mut [f64],
            clovers_per_card: f64,
        ) {
            if *attack_strength > 0.0 && player_cards[defender] > 0.0 {
                let num_used_cards =
                    player_cards[defender].min(*attack_strength / clovers_per_card);
                player_cards[defender] -= num_used_cards;
                *attack_strength -= num_used_cards * clovers_per_card;
            }
        }

        if self.common.has_strangers() {
            attack_strength -= simple::CLOVERS_CONTRIBUTED_PER_STRANGER;

            if attack_strength < 0.0 {
                return false;
            }

            if self.is_normal_turn() {
                use_weapon(attacker.idx(), &mut attack_strength, player_weapons);
            }

            let defender = rule_helper::opposing_normal_player(attacker).idx();

            defend_with_card_type(
                defender,
                &mut attack_strength,
                player_failures,
                simple::CLOVERS_PER_FAILURE,
            );
            defend_with_card_type(
                defender,
                &mut attack_strength,
                player_weapons,
                simple::CLOVERS_PER_WEAPON,
            );
            defend_with_card_type(
                defender,
                &mut attack_strength,
                player_move_cards,
                simple::CLOVERS_PER_MOVE_CARD,
            );

            attack_strength > 0.0
        } else {
            let num_defensive_clovers = self.num_defensive_clovers();

            if num_defensive_clovers <= 2.0 * attack_strength {
                use_weapon(attacker.idx(), &mut attack_strength, player_weapons);
            }

            if num_defensive_clovers < attack_strength {
                return true;
            }

            // defense sweeps counter-clockwise from the attacker; wrapping
            // all the way around means nobody could stop it
            let mut defender = attacker.idx();

            while attack_strength > 0.0 {
                defender = board::positive_remainder(
                    defender as i32 - 1,
                    self.common.num_all_players as usize,
                );

                if defender == attacker.idx() {
                    return true;
                }

                defend_with_card_type(
                    defender,
                    &mut attack_strength,
                    player_failures,
                    simple::CLOVERS_PER_FAILURE,
                );
                defend_with_card_type(
                    defender,
                    &mut attack_strength,
                    player_weapons,
                    simple::CLOVERS_PER_WEAPON,
                );
                defend_with_card_type(
                    defender,
                    &mut attack_strength,
                    player_move_cards,
                    simple::CLOVERS_PER_MOVE_CARD,
                );
            }

            false
        }
    }

    fn do_doctor_phase(&self, player_room_ids: &[RoomId]) -> (Vec<bool>, PlayerId, RoomId) {
        let mut new_players_had_turn = self.players_had_turn.clone();
        new_players_had_turn[self.current_player_id.idx()] = true;

        let new_doctor_room_id = self.common.board.next_room_id(self.doctor_room_id, 1);

        let num_all = self.common.num_all_players;
        let mut new_current_player_id = PlayerId((self.current_player_id.0 + 1) % num_all);

        // doctor activation: once everyone has had a first turn, the first
        // occupant of the doctor's new room (scanning forward) goes next
        if new_players_had_turn.iter().all(|had_turn| *had_turn) {
            for player_offset in 1..=num_all {
                let player_id = PlayerId((self.current_player_id.0 + player_offset) % num_all);
                if player_room_ids[player_id.idx()] == new_doctor_room_id {
                    new_current_player_id = player_id;
                    break;
                }
            }
        }

        (new_players_had_turn, new_current_player_id, new_doctor_room_id)
    }

    fn best_action_allowed(
        &self,
        current_player_id: PlayerId,
        doctor_room_id: RoomId,
        player_room_ids: &[RoomId],
        moved_stranger_that_saw_current_player: bool,
    ) -> PlayerAction {
        let current_player_room_id = player_room_ids[current_player_id.idx()];

        let seen_by_other_players = self.common.board.room_is_seen_by(
            current_player_room_id,
            player_room_ids
                .iter()
                .enumerate()
                .filter(|(pid, _)| *pid != current_player_id.idx())
                .map(|(_, room_id)| *room_id),
        );

        if seen_by_other_players {
            return PlayerAction::None;
        }

        if current_player_room_id == doctor_room_id && !moved_stranger_that_saw_current_player {
            return PlayerAction::Attack;
        }

        if self.common.board.sight[current_player_room_id.idx()][doctor_room_id.idx()] {
            PlayerAction::None
        } else {
            PlayerAction::Loot
        }
    }

    /// Doctor-proximity score from one side's perspective: how soon each
    /// tracked piece can intercept the doctor's projected path, combined
    /// with power decay (closer is better, strangers matter less).
    pub fn doctor_score(
        &self,
        my_room: RoomId,
        stranger_ally_room: RoomId,
        normal_enemy_room: RoomId,
        stranger_enemy_room: RoomId,
    ) -> f64 {
        const DECAY_FACTOR_NORMAL: f64 = 0.9;
        const DECAY_FACTOR_STRANGER: f64 = 0.5;

        let num_players_not_had_turn =
            self.players_had_turn.iter().filter(|had| !**had).count() as i32;
        let doctor_delta_for_activation = num_players_not_had_turn.max(1);
        let next_doctor_room_id = self
            .common
            .board
            .next_room_id(self.doctor_room_id, doctor_delta_for_activation);

        let mut doctor_rooms = self
            .common
            .board
            .room_ids_in_doctor_visit_order(next_doctor_room_id);
        doctor_rooms.insert(0, self.doctor_room_id);

        let my_starting_search_idx = if num_players_not_had_turn > 0 { 1 } else { 0 };
        let mut my_doctor_dist = 999;
        for (i, room) in doctor_rooms
            .iter()
            .enumerate()
            .skip(my_starting_search_idx)
        {
            let adjoins = i > 0
                && self.common.board.distance[my_room.idx()][room.idx()] <= 1;
            if *room == my_room || adjoins {
                my_doctor_dist = i as i32;
                break;
            }
        }

        // not on the path at all reads as index -1, i.e. factor^-1
        let dist_from_1 = |room: RoomId| -> i32 {
            doctor_rooms
                .iter()
                .skip(1)
                .position(|r| *r == room)
                .map(|p| (p + 1) as i32)
                .unwrap_or(-1)
        };

        DECAY_FACTOR_NORMAL.powi(my_doctor_dist)
            + DECAY_FACTOR_STRANGER.powi(dist_from_1(stranger_ally_room))
            - DECAY_FACTOR_NORMAL.powi(dist_from_1(normal_enemy_room))
            - DECAY_FACTOR_STRANGER.powi(dist_from_1(stranger_enemy_room))
    }

    /// Appraisal of this position for a (never-stranger) viewpoint player:
    /// exact win/loss sentinel once decided, otherwise strength and
    /// resources weighted by tempo and doctor proximity.
    pub fn heuristic_score(&self, analysis_player_id: PlayerId) -> f64 {
        if let Some(winner) = self.winner {
            return if analysis_player_id == self.common.to_normal_player_id(winner) {
                rule_helper::HEURISTIC_SCORE_WIN
            } else {
                rule_helper::HEURISTIC_SCORE_LOSS
            };
        }

        let misc_score = |player_id: PlayerId,
                          allied_strength: f64,
                          is_allied_turn: bool,
                          allied_doctor_advantage: f64| {
            allied_strength
                + 0.5
                    * allied_strength
                    * (self.player_move_cards[player_id.idx()]
                        + if is_allied_turn { 0.95 } else { 0.0 }
                        + allied_doctor_advantage * 0.9)
                + 0.5 * self.player_weapons[player_id.idx()]
                + 0.125 * self.player_failures[player_id.idx()]
        };

        if self.common.has_strangers() {
            let stranger_ally = rule_helper::allied_stranger(analysis_player_id);
            let normal_opponent = rule_helper::opposing_normal_player(analysis_player_id);
            let stranger_opponent = rule_helper::allied_stranger(normal_opponent);
            let allied_strength = (self.player_strengths[analysis_player_id.idx()]
                + self.player_strengths[stranger_ally.idx()]) as f64;
            let opponent_strength = (self.player_strengths[normal_opponent.idx()]
                + self.player_strengths[stranger_opponent.idx()]) as f64;
            let is_my_turn = analysis_player_id == self.current_player_id;

            let room = |pid: PlayerId| self.player_room_ids[pid.idx()];
            let allied_doctor_advantage = self.doctor_score(
                room(if is_my_turn { analysis_player_id } else { normal_opponent }),
                room(if is_my_turn { stranger_ally } else { stranger_opponent }),
                room(if is_my_turn { normal_opponent } else { analysis_player_id }),
                room(if is_my_turn { stranger_opponent } else { stranger_ally }),
            ) * if is_my_turn { 1.0 } else { -1.0 };

            misc_score(
                analysis_player_id,
                allied_strength,
                is_my_turn,
                allied_doctor_advantage,
            ) - misc_score(
                normal_opponent,
                opponent_strength,
                !is_my_turn,
                -allied_doctor_advantage,
            )
        } else {
            let mut overall_score = 0.0;

            for pid in self.common.player_ids() {
                let weight = if self.common.to_normal_player_id(pid) == analysis_player_id {
                    1.0
                } else {
                    -1.0 / (self.common.num_normal_players - 1) as f64
                };
                let player_misc_score = misc_score(
                    pid,
                    self.player_strengths[pid.idx()] as f64,
                    pid == self.current_player_id,
                    0.0,
                );
                overall_score += weight * player_misc_score;
            }

            overall_score
        }
    }

    /// Every legal turn for the current player: move only itself, or one
    /// stranger, or (with budget to spare) itself plus a stranger or both
    /// strangers. No turns from a decided state.
    pub fn possible_turns(&self) -> Vec<SimpleTurn> {
        if self.has_winner() {
            return Vec::new();
        }

        let current = self.current_player_id;
        let dist_allowed = self.player_move_cards[current.idx()] as i32 + 1;

        let mut movable_player_subsets: Vec<Vec<PlayerId>> = vec![vec![current]];

        if self.common.has_strangers() {
            let allied_stranger = rule_helper::allied_stranger(current);
            let opposing_stranger = rule_helper::opposing_stranger(current);

            movable_player_subsets.push(vec![allied_stranger]);
            movable_player_subsets.push(vec![opposing_stranger]);

            if self.player_move_cards[current.idx()] > 0.0 {
                movable_player_subsets.push(vec![current, allied_stranger]);
                movable_player_subsets.push(vec![current, opposing_stranger]);
                movable_player_subsets.push(vec![allied_stranger, opposing_stranger]);
            }
        }

        let mut turns = Vec::new();

        for subset in &movable_player_subsets {
            match subset.as_slice() {
                [mover] => self.push_single_move_turns(dist_allowed, *mover, &mut turns),
                [mover_a, mover_b] => {
                    self.push_dual_move_turns(dist_allowed, *mover_a, *mover_b, &mut turns)
                }
                _ => {}
            }
        }

        turns
    }

    fn push_single_move_turns(
        &self,
        dist_allowed: i32,
        movable_player: PlayerId,
        turns: &mut Vec<SimpleTurn>,
    ) {
        let src_room = self.player_room_ids[movable_player.idx()];

        for &dest_room in &self.common.board.room_ids {
            if self.common.board.distance[src_room.idx()][dest_room.idx()] <= dist_allowed {
                turns.push(SimpleTurn::single(movable_player, dest_room));
            }
        }
    }

    fn push_dual_move_turns(
        &self,
        dist_allowed: i32,
        movable_player_a: PlayerId,
        movable_player_b: PlayerId,
        turns: &mut Vec<SimpleTurn>,
    ) {
        use crate::core::player::PlayerMove;

        let src_room_a = self.player_room_ids[movable_player_a.idx()];
        let src_room_b = self.player_room_ids[movable_player_b.idx()];

        for &dest_room_a in &self.common.board.room_ids {
            let dist_remaining =
                dist_allowed - self.common.board.distance[src_room_a.idx()][dest_room_a.idx()];

            if dist_remaining <= 0 || src_room_a == dest_room_a {
                continue;
            }

            let move_a = PlayerMove::new(movable_player_a, dest_room_a);

            for &dest_room_b in &self.common.board.room_ids {
                if self.common.board.distance[src_room_b.idx()][dest_room_b.idx()]
                    > dist_remaining
                    || src_room_b == dest_room_b
                {
                    continue;
                }

                let move_b = PlayerMove::new(movable_player_b, dest_room_b);
                turns.push(SimpleTurn::new([move_a, move_b]));
            }
        }
    }

    pub fn player_text_long(&self, player_id: PlayerId) -> String {
        let pid = player_id.idx();
        let resources = if self.common.player_type(player_id) == PlayerType::Stranger {
            String::new()
        } else {
            format!(
                ",M{:.1},W{:.1},F{:.1}",
                self.player_move_cards[pid], self.player_weapons[pid], self.player_failures[pid]
            )
        };
        format!(
            "{}(R{:02},S{}{})",
            self.player_text(player_id),
            self.player_room_ids[pid],
            self.player_strengths[pid],
            resources
        )
    }

    /// Multi-line human-readable summary, each line prefixed by
    /// `leading_text`.
    pub fn state_summary(&self, leading_text: &str) -> String {
        let mut text = format!(
            "{leading_text}Turn {}, {}, HeuScore={:.2}",
            self.turn_id,
            self.player_text(self.current_player_id),
            self.heuristic_score(self.common.to_normal_player_id(self.current_player_id)),
        );

        text += &format!(
            "\n{leading_text}  AttackHist={{{}}}",
            self.attacker_hist.iter().map(|pid| pid.display_num()).join(",")
        );

        text += &format!("\n{leading_text}  Dr@R{}", self.doctor_room_id);

        let players_who_see_doctor = self
            .common
            .player_ids()
            .filter(|pid| {
                self.common.board.sight[self.player_room_ids[pid.idx()].idx()]
                    [self.doctor_room_id.idx()]
            })
            .map(|pid| pid.display_num())
            .collect::<Vec<_>>();

        if players_who_see_doctor.is_empty() {
            text += ", unseen by players";
        } else {
            text += &format!(
                ", seen by players{{{}}}",
                players_who_see_doctor.iter().join(",")
            );
        }

        for player_id in self.common.player_ids() {
            text += &format!("\n{leading_text}  {}", self.player_text_long(player_id));

            if player_id == self.current_player_id {
                text += " *";
            }
            if self.player_room_ids[player_id.idx()] == self.doctor_room_id {
                text += " D";
            }
        }

        if let Some(winner) = self.winner {
            text += &format!("\n{leading_text}  WINNER: {}", self.player_text(winner));
        }

        text
    }

    /// One sub-turn rendered from the diff against the predecessor: mover,
    /// spent move points, action, and the room changes. The action is
    /// recovered from the resource deltas; loot is the only thing that
    /// changes the fractional part of the mover's move cards.
    pub fn prev_turn_summary(&self, verbose: bool) -> String {
        let Some(prev_state) = self.prev_state.as_deref() else {
            return "PrevStateNull".to_string();
        };

        let prev_player = prev_state.current_player_id;
        let mut verbose_move_texts = Vec::new();
        let mut short_move_texts = Vec::new();
        let mut total_dist = 0;

        for player_id in self.common.player_ids() {
            let prev_room_id = prev_state.player_room_ids[player_id.idx()];
            let room_id = self.player_room_ids[player_id.idx()];

            if prev_room_id != room_id {
                let dist = self.common.board.distance[prev_room_id.idx()][room_id.idx()];
                let dist_text = if dist == 0 {
                    String::new()
                } else {
                    format!(" ({dist}mp)")
                };

                total_dist += dist;
                short_move_texts.push(format!(
                    "{}@{room_id}<{prev_room_id}",
                    player_id.display_num()
                ));
                verbose_move_texts.push(format!(
                    "    MOVE {}: R{prev_room_id} to R{room_id}{dist_text}",
                    self.player_text(player_id)
                ));
            }
        }

        if short_move_texts.is_empty() {
            let room_id = self.player_room_ids[prev_player.idx()];
            short_move_texts.push(format!(
                "{}@{room_id}({room_id})",
                prev_player.display_num()
            ));
            verbose_move_texts.push(format!(
                "    MOVE {}: stayed at R{room_id}",
                self.player_text(prev_player)
            ));
        }

        let action = if prev_state.attacker_hist.len() != self.attacker_hist.len() {
            PlayerAction::Attack
        } else if prev_state.player_move_cards[prev_player.idx()] % 1.0
            != self.player_move_cards[prev_player.idx()] % 1.0
        {
            PlayerAction::Loot
        } else {
            PlayerAction::None
        };

        let move_signifier = if prev_state.is_normal_turn() {
            "M".repeat((total_dist - 1).max(0) as usize)
        } else {
            String::new()
        };
        let action_signifier = match action {
            PlayerAction::Attack => "A",
            PlayerAction::Loot => "L",
            PlayerAction::None => "",
        };
        let win_text = match self.winner {
            Some(winner) => format!("({} won)", self.player_text(winner)),
            None => String::new(),
        };

        let short_summary = format!(
            "({}{move_signifier}{action_signifier}){}{win_text};",
            self.player_text(prev_player),
            short_move_texts.join(" ")
        );

        if !verbose {
            return short_summary;
        }

        let mut text = String::new();
        let ply_text = if prev_state.is_normal_turn() {
            format!("/{}", prev_state.ply())
        } else {
            String::new()
        };
        text += &format!("  Turn{}{ply_text}, {short_summary}", prev_state.turn_id);

        for move_text in verbose_move_texts {
            text += &format!("\n{move_text}");
        }

        match action {
            PlayerAction::Loot => {
                text += &format!(
                    "\n    LOOT {}: now {}",
                    self.player_text(prev_player),
                    self.player_text_long(prev_player)
                );
            }
            PlayerAction::Attack => {
                let weapon_bonus = if prev_state.player_weapons[prev_player.idx()]
                    == self.player_weapons[prev_player.idx()]
                {
                    0.0
                } else {
                    simple::STRENGTH_PER_WEAPON
                };
                let attack_strength =
                    prev_state.player_strengths[prev_player.idx()] as f64 + weapon_bonus;
                text += &format!(
                    "\n    ATTACK: strength={attack_strength:.1} hist={}",
                    self.attacker_hist.iter().map(|pid| pid.display_num()).join(",")
                );
            }
            PlayerAction::None => {}
        }

        match self.winner {
            Some(winner) => {
                text += &format!("\n    WINNER: {}", self.player_text(winner));
            }
            None => {
                text += &format!(
                    "\n    DR MOVE: R{} to R{}",
                    prev_state.doctor_room_id, self.doctor_room_id
                );
            }
        }

        text
    }

    /// Short summaries of every normal-player turn since the start, in
    /// play order.
    pub fn normal_turn_hist(&self) -> String {
        let mut states = Vec::new();
        let mut state_for_traversal = Some(self);

        while let Some(state) = state_for_traversal {
            states.push(state);
            state_for_traversal = state.prev_state.as_deref();
        }

        states.reverse();
        let mut text = String::new();

        for state in states.iter().skip(1) {
            if let Some(prev_state) = state.prev_state.as_deref() {
                if !prev_state.is_normal_turn() {
                    continue;
                }
            }

            text.push_str(&state.prev_turn_summary(false));
            text.push(' ');
        }

        text
    }
}

impl fmt::Display for ImmutableGameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "T{},{},[{},{}]",
            self.turn_id,
            self.player_text(self.current_player_id),
            self.doctor_room_id,
            self.player_room_ids.iter().join(","),
        )?;

        if let Some(prev_turn) = &self.prev_turn {
            write!(f, ",{prev_turn}")?;
        }

        Ok(())
    }
}

impl AppraisalState<SimpleTurn> for ImmutableGameState {
    fn heuristic_score(&self, analysis_player_id: PlayerId) -> f64 {
        ImmutableGameState::heuristic_score(self, analysis_player_id)
    }

    fn prev_turn(&self) -> Option<SimpleTurn> {
        self.prev_turn.clone()
    }
}

impl GameState<SimpleTurn> for ImmutableGameState {
    fn current_player_id(&self) -> PlayerId {
        self.current_player_id
    }

    fn num_players(&self) -> usize {
        self.common.num_all_players as usize
    }

    fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    fn prev_state(&self) -> Option<&Self> {
        self.prev_state.as_deref()
    }

    fn possible_turns(&self) -> Vec<SimpleTurn> {
        ImmutableGameState::possible_turns(self)
    }

    fn after_turn(&self, turn: &SimpleTurn) -> Self {
        self.after_normal_turn(turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::player::PlayerMove;

    fn config(board_name: &str, num_normal_players: i32) -> Arc<CommonConfig> {
        let board = Board::from_embedded(board_name).unwrap();
        Arc::new(CommonConfig::new(board, num_normal_players))
    }

    fn ring5_solo() -> ImmutableGameState {
        ImmutableGameState::at_start(config("Ring5", 1))
    }

    #[test]
    fn start_state_matches_board_and_counts() {
        let state = ImmutableGameState::at_start(config("Manor", 2));

        assert_eq!(state.common.num_all_players, 4);
        assert_eq!(state.current_player_id, PlayerId(0));
        assert_eq!(state.doctor_room_id, RoomId(7));
        assert_eq!(state.player_room_ids, vec![RoomId(1); 4]);
        assert!(!state.has_winner());
        assert!(state.prev_state.is_none());
    }

    #[test]
    fn stranger_seats_are_odd_ids_only_with_two_normal_players() {
        let with_strangers = config("Manor", 2);
        assert_eq!(with_strangers.player_type(PlayerId(0)), PlayerType::Normal);
        assert_eq!(with_strangers.player_type(PlayerId(1)), PlayerType::Stranger);
        assert_eq!(with_strangers.player_type(PlayerId(3)), PlayerType::Stranger);
        assert_eq!(with_strangers.player_text(PlayerId(1)), "p2");

        let free_for_all = config("Manor", 3);
        assert_eq!(free_for_all.player_type(PlayerId(1)), PlayerType::Normal);
        assert_eq!(free_for_all.player_text(PlayerId(1)), "P2");
    }

    #[test]
    fn move_budget_boundary_allows_exactly_one_free_point() {
        let mut state = ring5_solo();
        state.player_move_cards[0] = 1.0;

        // distance(1,3) == 2; budget 1 + one free point covers it exactly
        let turn = SimpleTurn::single(PlayerId(0), RoomId(3));
        assert!(state.check_normal_turn(&turn).is_ok());

        state.player_move_cards[0] = 0.5;
        assert!(state.check_normal_turn(&turn).is_err());
    }

    #[test]
    fn check_rejects_bad_ids_and_illegal_movers() {
        let state = ImmutableGameState::at_start(config("Ring5", 3));

        let bad_room = SimpleTurn::single(PlayerId(0), RoomId(99));
        assert!(state.check_normal_turn(&bad_room).unwrap_err().contains("room"));

        let bad_player = SimpleTurn::single(PlayerId(7), RoomId(2));
        assert!(state.check_normal_turn(&bad_player).unwrap_err().contains("player id"));

        // without strangers no one may move another piece
        let other_normal = SimpleTurn::single(PlayerId(1), RoomId(2));
        assert!(state
            .check_normal_turn(&other_normal)
            .unwrap_err()
            .contains("non-stranger"));
    }

    #[test]
    fn transition_is_pure_and_repeatable() {
        let state = ring5_solo();
        let turn = SimpleTurn::single(PlayerId(0), RoomId(2));

        let a = state.after_normal_turn(&turn);
        let b = state.after_normal_turn(&turn);

        assert_eq!(a, b);
        assert_eq!(state.player_room_ids, vec![RoomId(1)]);
        assert_eq!(state.player_move_cards, vec![2.0]);
    }

    #[test]
    fn reaching_the_doctor_unseen_wins_for_a_lone_player() {
        let state = ring5_solo();

        // room 3 holds the doctor; nobody else is there to watch
        let next = state.after_normal_turn(&SimpleTurn::single(PlayerId(0), RoomId(3)));

        assert_eq!(next.winner, Some(PlayerId(0)));
        assert_eq!(next.player_strengths, vec![2]);
        assert_eq!(next.attacker_hist, vec![PlayerId(0)]);
        // doctor phase is skipped once the game is decided
        assert_eq!(next.doctor_room_id, RoomId(3));
        assert_eq!(next.turn_id, 2);
    }

    #[test]
    fn stranger_attack_spends_defender_cards_and_wins_on_leftover_strength() {
        let mut state = ImmutableGameState::at_start(config("Manor", 2));
        state.player_strengths[0] = 3;
        state.player_failures[2] = 1.0;
        state.player_weapons[2] = 1.0;
        state.player_move_cards[2] = 1.0;

        // room 7 holds the doctor and nobody in room 1 watches it
        let next = state.after_normal_turn(&SimpleTurn::single(PlayerId(0), RoomId(7)));

        // one stranger clover soaks first, the attacker's weapon adds its
        // bonus, and the opposing normal player spends every card without
        // covering the rest
        assert_eq!(next.winner, Some(PlayerId(0)));
        assert_eq!(next.player_strengths[0], 4);
        assert_eq!(next.player_weapons[0], 1.0);
        assert_eq!(next.attacker_hist, vec![PlayerId(0)]);
        assert_eq!(next.player_failures[2], 0.0);
        assert_eq!(next.player_weapons[2], 0.0);
        assert_eq!(next.player_move_cards[2], 0.0);
        assert_eq!(next.player_move_cards[0], 1.0);
        assert_eq!(next.doctor_room_id, RoomId(7));
    }

    #[test]
    fn stranger_defense_spends_failures_before_weapons_before_move_cards() {
        let mut state = ImmutableGameState::at_start(config("Manor", 2));
        state.player_strengths[0] = 5;
        state.player_weapons[0] = 0.0;
        state.player_failures[2] = 1.0;
        state.player_weapons[2] = 1.0;
        state.player_move_cards[2] = 5.0;

        let next = state.after_normal_turn(&SimpleTurn::single(PlayerId(0), RoomId(7)));

        // failures absorb 50/24 clovers each and go first; the remainder is
        // paid from weapons, then from move cards at one clover apiece
        assert!(!next.has_winner());
        assert_eq!(next.player_strengths[0], 6);
        assert_eq!(next.player_failures[2], 0.0);
        assert_eq!(next.player_weapons[2], 0.0);
        let expected_move_cards = 5.0 - (4.0 - simple::CLOVERS_PER_FAILURE - 1.0);
        assert!((next.player_move_cards[2] - expected_move_cards).abs() < 1e-9);
    }

    #[test]
    fn stranger_attack_without_net_strength_fails_before_any_defense() {
        // the stranger clover cancels a strength-1 attack with no weapon;
        // net zero is not yet a loss, but it cannot win either
        let mut state = ImmutableGameState::at_start(config("Manor", 2));
        state.player_weapons[0] = 0.0;

        let next = state.after_normal_turn(&SimpleTurn::single(PlayerId(0), RoomId(7)));

        assert!(!next.has_winner());
        assert_eq!(next.player_strengths[0], 2);
        assert_eq!(next.attacker_hist, vec![PlayerId(0)]);
        assert_eq!(next.player_failures[2], 4.0);
        assert_eq!(next.player_weapons[2], 2.0);
        assert_eq!(next.player_move_cards[2], 2.0);

        // negative net strength exits before the weapon bonus is considered
        let mut weak = ImmutableGameState::at_start(config("Manor", 2));
        weak.player_strengths[0] = 0;
        let next = weak.after_normal_turn(&SimpleTurn::single(PlayerId(0), RoomId(7)));
        assert!(!next.has_winner());
        assert_eq!(next.player_strengths[0], 1);
        assert_eq!(next.player_weapons[0], 2.0);
        assert_eq!(next.attacker_hist, vec![PlayerId(0)]);
    }

    #[test]
    fn free_for_all_defense_sweeps_counter_clockwise_from_attacker() {
        let mut state = ImmutableGameState::at_start(config("Ring5", 3));
        state.current_player_id = PlayerId(1);
        state.player_room_ids = vec![RoomId(1), RoomId(3), RoomId(5)];
        state.player_strengths[1] = 4;
        state.player_failures[0] = 1.0;
        state.player_weapons[0] = 1.0;
        state.player_move_cards[0] = 1.0;
        state.player_failures[2] = 0.0;

        let next = state.after_normal_turn(&SimpleTurn::single(PlayerId(1), RoomId(3)));

        // seven defensive clovers sit within twice the strength, so the
        // weapon bonus applies; the table still absorbs the attack
        assert!(!next.has_winner());
        assert_eq!(next.player_weapons[1], 1.0);
        assert_eq!(next.player_strengths[1], 5);
        assert_eq!(next.attacker_hist, vec![PlayerId(1)]);

        // seat 1 defends first and is drained; seat 3 only pays the rest
        assert_eq!(next.player_failures[0], 0.0);
        assert_eq!(next.player_weapons[0], 0.0);
        assert_eq!(next.player_move_cards[0], 0.0);
        assert_eq!(next.player_weapons[2], 0.0);
        assert!((next.player_move_cards[2] - 1.875).abs() < 1e-9);

        assert_eq!(next.doctor_room_id, RoomId(4));
        assert_eq!(next.current_player_id, PlayerId(2));
    }

    #[test]
    fn outnumbered_attacker_gets_no_weapon_bonus_and_nearest_defender_pays() {
        let state = ImmutableGameState::at_start(config("Ring5", 3));

        let next = state.after_normal_turn(&SimpleTurn::single(PlayerId(0), RoomId(3)));

        // sixteen defensive clovers exceed twice the attack strength: the
        // attacker's weapons stay untouched and the attack fails
        assert!(!next.has_winner());
        assert_eq!(next.player_weapons[0], 2.0);
        assert_eq!(next.player_strengths[0], 2);
        assert_eq!(next.attacker_hist, vec![PlayerId(0)]);

        // counter-clockwise from seat 1 reaches seat 3 first; seat 2 pays
        // nothing before the strength runs out
        assert_eq!(next.player_failures[1], 4.0);
        assert_eq!(next.player_weapons[1], 2.0);
        assert_eq!(next.player_move_cards[1], 2.0);
        let expected_failures = 4.0 - 1.0 / simple::CLOVERS_PER_FAILURE;
        assert!((next.player_failures[2] - expected_failures).abs() < 1e-9);
        assert!((next.player_weapons[2] - 2.0).abs() < 1e-9);

        assert_eq!(next.player_move_cards[0], 1.0);
        assert_eq!(next.current_player_id, PlayerId(1));
    }

    #[test]
    fn winner_carries_through_any_further_transition() {
        let won = ring5_solo().after_normal_turn(&SimpleTurn::single(PlayerId(0), RoomId(3)));
        assert!(won.has_winner());
        assert!(won.possible_turns().is_empty());

        let after = won.after_normal_turn(&SimpleTurn::single(PlayerId(0), RoomId(3)));
        assert_eq!(after.winner, won.winner);
    }

    #[test]
    fn staying_out_of_sight_loots() {
        let state = ImmutableGameState::at_start(config("Tiny", 1));
        // player in room 1, doctor in room 3, no line of sight between them

        let next = state.after_normal_turn(&SimpleTurn::single(PlayerId(0), RoomId(1)));

        assert_eq!(
            next.player_move_cards[0],
            simple::PLAYER_STARTING_MOVE_CARDS + simple::MOVE_CARDS_PER_LOOT
        );
        assert_eq!(
            next.player_weapons[0],
            simple::PLAYER_STARTING_WEAPONS + simple::WEAPONS_PER_LOOT
        );
        assert_eq!(next.doctor_room_id, RoomId(4));
        assert!(next.players_had_turn[0]);
    }

    #[test]
    fn seeing_the_doctor_denies_looting() {
        let mut state = ImmutableGameState::at_start(config("Tiny", 1));
        state.player_room_ids[0] = RoomId(2);
        // rooms 2 and 3 adjoin, so the player watches the doctor

        let next = state.after_normal_turn(&SimpleTurn::single(PlayerId(0), RoomId(2)));

        assert_eq!(next.player_move_cards[0], simple::PLAYER_STARTING_MOVE_CARDS);
        assert_eq!(next.player_weapons[0], simple::PLAYER_STARTING_WEAPONS);
    }

    #[test]
    fn stranger_turns_play_out_automatically() {
        let state = ImmutableGameState::at_start(config("Manor", 2));

        let next = state.after_normal_turn(&SimpleTurn::single(PlayerId(0), RoomId(2)));

        // the stranger in seat 1 was watched, retreated, and play reached
        // the second normal player; the doctor stepped once per turn taken
        assert_eq!(next.current_player_id, PlayerId(2));
        assert_eq!(next.player_room_ids[1], RoomId(12));
        assert_eq!(next.doctor_room_id, RoomId(9));
        assert_eq!(next.turn_id, 3);
        assert!(next.players_had_turn[0]);
        assert!(next.players_had_turn[1]);
    }

    #[test]
    fn doctor_activation_hands_turn_to_first_occupant_forward() {
        let mut state = ImmutableGameState::at_start(config("Ring5", 3));
        state.players_had_turn = vec![true, true, true];
        state.player_room_ids = vec![RoomId(1), RoomId(5), RoomId(4)];
        // doctor in 3 steps to 4, where player 3 (not player 2) stands

        let next = state.after_normal_turn(&SimpleTurn::single(PlayerId(0), RoomId(1)));

        assert_eq!(next.doctor_room_id, RoomId(4));
        assert_eq!(next.current_player_id, PlayerId(2));
    }

    #[test]
    fn heuristic_sentinel_is_exact_for_decided_states() {
        let won = ring5_solo().after_normal_turn(&SimpleTurn::single(PlayerId(0), RoomId(3)));
        assert_eq!(won.heuristic_score(PlayerId(0)), rule_helper::HEURISTIC_SCORE_WIN);

        let two_sided = ImmutableGameState::at_start(config("Manor", 2));
        let mut decided = two_sided.clone();
        decided.winner = Some(PlayerId(3));
        // seat 3 is the stranger allied with seat 0
        assert_eq!(decided.heuristic_score(PlayerId(0)), rule_helper::HEURISTIC_SCORE_WIN);
        assert_eq!(decided.heuristic_score(PlayerId(2)), rule_helper::HEURISTIC_SCORE_LOSS);
    }

    #[test]
    fn heuristic_of_undecided_state_is_finite_and_antisymmetricish() {
        let state = ImmutableGameState::at_start(config("Manor", 3));
        let score = state.heuristic_score(PlayerId(0));
        assert!(score.is_finite());
        assert!(score.abs() < rule_helper::HEURISTIC_SCORE_WIN);
    }

    #[test]
    fn num_defensive_clovers_counts_other_players() {
        let state = ImmutableGameState::at_start(config("Ring5", 3));
        // each opponent: 4 failures + 2 weapons + 2 move cards at unit rates
        assert_eq!(state.num_defensive_clovers(), 16.0);
    }

    #[test]
    fn possible_turns_solo_covers_all_reachable_rooms() {
        let state = ring5_solo();
        let turns = state.possible_turns();

        // budget 2 + 1 free reaches every room on a 5-ring, including staying
        assert_eq!(turns.len(), 5);
        assert!(turns.contains(&SimpleTurn::single(PlayerId(0), RoomId(1))));
    }

    #[test]
    fn possible_turns_with_strangers_include_dual_moves_without_noops() {
        let state = ImmutableGameState::at_start(config("Manor", 2));
        let turns = state.possible_turns();

        assert!(turns
            .iter()
            .any(|turn| turn.moves.len() == 1 && turn.moves[0].player_id == PlayerId(3)));

        let dual_turns = turns.iter().filter(|t| t.moves.len() == 2).collect::<Vec<_>>();
        assert!(!dual_turns.is_empty());

        for turn in dual_turns {
            for player_move in &turn.moves {
                assert_ne!(
                    player_move.dest_room_id,
                    state.player_room_ids[player_move.player_id.idx()],
                    "dual turns must not contain stay-in-place moves"
                );
            }
        }
    }

    #[test]
    fn dual_moves_respect_the_shared_budget() {
        let state = ImmutableGameState::at_start(config("Manor", 2));
        let dist_allowed = state.player_move_cards[0] as i32 + 1;

        for turn in state.possible_turns() {
            let total: i32 = turn
                .moves
                .iter()
                .map(|m| {
                    state.common.board.distance
                        [state.player_room_ids[m.player_id.idx()].idx()][m.dest_room_id.idx()]
                })
                .sum();
            assert!(total <= dist_allowed, "turn {turn} exceeds budget");
        }
    }

    #[test]
    fn dual_move_turn_applies_both_moves() {
        let state = ImmutableGameState::at_start(config("Manor", 2));
        let turn = SimpleTurn::new([
            PlayerMove::new(PlayerId(0), RoomId(2)),
            PlayerMove::new(PlayerId(3), RoomId(12)),
        ]);
        assert!(state.check_normal_turn(&turn).is_ok());

        let next = state.after_normal_turn(&turn);
        assert_eq!(next.player_room_ids[0], RoomId(2));
        assert_eq!(next.player_room_ids[3], RoomId(12));
    }

    #[test]
    fn state_summary_mentions_doctor_and_current_player() {
        let state = ring5_solo();
        let summary = state.state_summary("  ");

        assert!(summary.contains("Dr@R3"));
        assert!(summary.contains("P1"));
        assert!(summary.contains('*'));
    }

    #[test]
    fn prev_turn_summary_and_hist_describe_real_turns() {
        let start = ring5_solo();
        assert_eq!(start.prev_turn_summary(false), "PrevStateNull");

        let mid = start.after_normal_turn(&SimpleTurn::single(PlayerId(0), RoomId(2)));
        assert_eq!(mid.prev_turn_summary(false), "(P1)1@2<1;");

        // doctor stepped to 4 after the first turn; reaching it wins
        let won = mid.after_normal_turn(&SimpleTurn::single(PlayerId(0), RoomId(4)));
        assert_eq!(won.prev_turn_summary(false), "(P1MA)1@4<2(P1 won);");
        assert_eq!(won.normal_turn_hist(), "(P1)1@2<1; (P1MA)1@4<2(P1 won); ");

        let verbose = won.prev_turn_summary(true);
        assert!(verbose.contains("ATTACK"));
        assert!(verbose.contains("WINNER: P1"));
    }

    #[test]
    fn ply_counts_normal_turns_only() {
        let state = ImmutableGameState::at_start(config("Manor", 2));
        let next = state.after_normal_turn(&SimpleTurn::single(PlayerId(0), RoomId(2)));
        // one normal turn plus one stranger sub-turn elapsed
        assert_eq!(next.ply(), 1);
    }
}
