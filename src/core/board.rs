use crate::core::{room::Room, room::RoomId, wing::Wing};
use itertools::Itertools;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

/// Distance sentinel for room pairs with no connecting path.
pub const UNREACHABLE_DIST: i32 = 999;

/// A board definition document, as parsed from JSON. Start-room lists are
/// candidates in preference order; the first id still open after wing
/// closing is used.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[readonly::make]
pub struct BoardDocument {
    pub name: String,
    pub player_start_room_ids: Vec<RoomId>,
    pub doctor_start_room_ids: Vec<RoomId>,
    pub wings: Vec<Wing>,
    pub rooms: Vec<Room>,
}

impl BoardDocument {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// Boards compiled into the binary, selectable by case-insensitive name.
const EMBEDDED_BOARDS: &[(&str, &str)] = &[
    ("Manor", include_str!("../../data/board_manor.json")),
    ("Tiny", include_str!("../../data/board_tiny.json")),
    ("Ring5", include_str!("../../data/board_ring5.json")),
];

/// The immutable board graph: rooms keyed by id, sorted id list, reflexive
/// adjacency and sight matrices indexed by room id, and the all-pairs
/// distance matrix in move points.
#[derive(Clone, Debug, PartialEq)]
#[readonly::make]
pub struct Board {
    pub name: String,
    pub rooms: HashMap<RoomId, Room>,
    pub room_ids: Vec<RoomId>, // sorted ascending
    pub adjacency: Vec<Vec<bool>>,
    pub sight: Vec<Vec<bool>>,
    pub distance: Vec<Vec<i32>>,
    pub player_start_room_id: RoomId,
    pub doctor_start_room_id: RoomId,
}

impl Board {
    pub fn new(
        name: impl Into<String>,
        rooms: impl IntoIterator<Item = Room>,
        player_start_room_id: RoomId,
        doctor_start_room_id: RoomId,
    ) -> Self {
        let rooms: HashMap<RoomId, Room> =
            rooms.into_iter().map(|room| (room.id, room)).collect();

        let room_ids = rooms.keys().copied().sorted().collect::<Vec<_>>();

        let matrix_dim = room_ids
            .last()
            .map(|id| id.idx() + 1)
            .unwrap_or(0);

        let mut adjacency = vec![vec![false; matrix_dim]; matrix_dim];
        let mut sight = vec![vec![false; matrix_dim]; matrix_dim];

        for room in rooms.values() {
            let id = room.id.idx();
            adjacency[id][id] = true;
            sight[id][id] = true;

            for neighbor in &room.adjacent {
                adjacency[id][neighbor.idx()] = true;
            }

            for seen in &room.visible {
                sight[id][seen.idx()] = true;
            }
        }

        let distance = adjacency_to_distance(&adjacency);

        Board {
            name: name.into(),
            rooms,
            room_ids,
            adjacency,
            sight,
            distance,
            player_start_room_id,
            doctor_start_room_id,
        }
    }

    pub fn from_document(
        document: BoardDocument,
        closed_wing_names: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Self, BoardError> {
        let closed_wing_names: HashSet<String> = closed_wing_names
            .into_iter()
            .map(|name| name.as_ref().to_lowercase())
            .collect();

        let closed_room_ids: Vec<RoomId> = document
            .wings
            .iter()
            .filter(|wing| closed_wing_names.contains(&wing.name.to_lowercase()))
            .flat_map(|wing| wing.room_ids.iter().copied())
            .collect();

        let open_rooms: Vec<Room> = document
            .rooms
            .iter()
            .filter(|room| !closed_room_ids.contains(&room.id))
            .map(|room| room.without_closed(&closed_room_ids))
            .collect();

        let open_room_ids: HashSet<RoomId> = open_rooms.iter().map(|room| room.id).collect();

        let first_open = |candidates: &[RoomId], role: &'static str| {
            candidates
                .iter()
                .copied()
                .find(|id| open_room_ids.contains(id))
                .ok_or(BoardError::MissingStartRoom { role })
        };

        let player_start = first_open(&document.player_start_room_ids, "player")?;
        let doctor_start = first_open(&document.doctor_start_room_ids, "doctor")?;

        log::debug!(
            "board '{}' built with {} open rooms ({} closed)",
            document.name,
            open_rooms.len(),
            closed_room_ids.len(),
        );

        Ok(Board::new(
            document.name.clone(),
            open_rooms,
            player_start,
            doctor_start,
        ))
    }

    pub fn from_json_str(
        json: &str,
        closed_wing_names: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Self, BoardError> {
        let document = BoardDocument::from_json_str(json)?;
        Self::from_document(document, closed_wing_names)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, BoardError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json, std::iter::empty::<&str>())
    }

    pub fn from_embedded(name: &str) -> Result<Self, BoardError> {
        Self::from_embedded_with_options(name, std::iter::empty::<&str>())
    }

    pub fn from_embedded_with_options(
        name: &str,
        closed_wing_names: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Self, BoardError> {
        let json = EMBEDDED_BOARDS
            .iter()
            .find(|(board_name, _)| board_name.eq_ignore_ascii_case(name))
            .map(|(_, json)| *json)
            .ok_or_else(|| BoardError::UnknownEmbeddedBoard(name.to_string()))?;
        Self::from_json_str(json, closed_wing_names)
    }

    pub fn embedded_board_names() -> impl Iterator<Item = &'static str> {
        EMBEDDED_BOARDS.iter().map(|(name, _)| *name)
    }

    /// Structural validity: pass, or a list of human-readable mistakes.
    /// An invalid board must not be used to play.
    pub fn is_valid(&self) -> Result<(), Vec<String>> {
        let mut mistakes = Vec::new();

        for (role, start_id) in [
            ("player", self.player_start_room_id),
            ("doctor", self.doctor_start_room_id),
        ] {
            if start_id.idx() == 0 || !self.room_ids.contains(&start_id) {
                mistakes.push(format!("bad {role} start room id {start_id}"));
            }
        }

        for room in self.rooms.values() {
            if room.adjacent.contains(&room.id) {
                mistakes.push(format!("room {} is in its own adjacent list", room.id));
            }
            if room.visible.contains(&room.id) {
                mistakes.push(format!("room {} is in its own visible list", room.id));
            }

            for (kind, referenced) in [("adjacent", &room.adjacent), ("visible", &room.visible)] {
                let missing = referenced
                    .iter()
                    .filter(|id| !self.rooms.contains_key(id))
                    .join(",");
                if !missing.is_empty() {
                    mistakes.push(format!(
                        "room {} lists nonexistent {kind} rooms {missing}",
                        room.id
                    ));
                }
            }
        }

        let dim = self.adjacency.len();
        for r in 0..dim {
            for c in 0..dim {
                if self.adjacency[r][c] != self.adjacency[c][r] {
                    mistakes.push(format!("Adjacency[{r},{c}] contradiction"));
                }
                if self.sight[r][c] != self.sight[c][r] {
                    mistakes.push(format!("Visibility[{r},{c}] contradiction"));
                }
            }
        }

        if mistakes.is_empty() {
            Ok(())
        } else {
            Err(mistakes)
        }
    }

    /// True iff any of the other rooms has line of sight to `room_of_concern`.
    pub fn room_is_seen_by(
        &self,
        room_of_concern: RoomId,
        rooms_with_other_people: impl IntoIterator<Item = RoomId>,
    ) -> bool {
        rooms_with_other_people
            .into_iter()
            .any(|room_id| self.sight[room_of_concern.idx()][room_id.idx()])
    }

    /// Step `delta` positions through the sorted room-id cycle; `delta` may
    /// be negative and the result index is always a positive remainder.
    pub fn next_room_id(&self, room_id: RoomId, delta: i32) -> RoomId {
        next_in_cycle(&self.room_ids, room_id, delta)
    }

    /// All room ids in the order the doctor will visit them, starting at
    /// `start_room_id` and wrapping once around the cycle.
    pub fn room_ids_in_doctor_visit_order(&self, start_room_id: RoomId) -> Vec<RoomId> {
        let start_idx = self
            .room_ids
            .iter()
            .position(|id| *id == start_room_id)
            .expect("start room not on board");

        (0..self.room_ids.len())
            .map(|offset| self.room_ids[(start_idx + offset) % self.room_ids.len()])
            .collect()
    }
}

#[derive(Debug)]
pub enum BoardError {
    Io(std::io::Error),
    Json(serde_json::Error),
    MissingStartRoom { role: &'static str },
    UnknownEmbeddedBoard(String),
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::Io(err) => write!(f, "board file error: {err}"),
            BoardError::Json(err) => write!(f, "board document error: {err}"),
            BoardError::MissingStartRoom { role } => {
                write!(f, "no open start room for role '{role}'")
            }
            BoardError::UnknownEmbeddedBoard(name) => {
                write!(f, "no embedded board named '{name}'")
            }
        }
    }
}

impl std::error::Error for BoardError {}

impl From<std::io::Error> for BoardError {
    fn from(err: std::io::Error) -> Self {
        BoardError::Io(err)
    }
}

impl From<serde_json::Error> for BoardError {
    fn from(err: serde_json::Error) -> Self {
        BoardError::Json(err)
    }
}

/// Fixed-point relaxation of the adjacency matrix into shortest-path
/// distances. Row/column 0 is the reserved slot and excluded. Full passes
/// repeat until no entry improves, which reaches the same fixed point as
/// Floyd-Warshall.
fn adjacency_to_distance(adjacency: &[Vec<bool>]) -> Vec<Vec<i32>> {
    let dim = adjacency.len();
    let mut distance = vec![vec![0; dim]; dim];

    for r in 0..dim {
        for c in 0..dim {
            distance[r][c] = if r == c {
                0
            } else if adjacency[r][c] {
                1
            } else {
                UNREACHABLE_DIST
            };
        }
    }

    let mut improved = true;
    while improved {
        improved = false;

        for source in 1..dim {
            for dest in 1..dim {
                if source == dest {
                    continue;
                }

                for via in 1..dim {
                    let through = distance[source][via] + distance[via][dest];
                    if through < distance[source][dest] {
                        distance[source][dest] = through;
                        improved = true;
                    }
                }
            }
        }
    }

    distance
}

pub(crate) fn next_in_cycle(room_ids: &[RoomId], room_id: RoomId, delta: i32) -> RoomId {
    let idx = room_ids
        .iter()
        .position(|id| *id == room_id)
        .expect("room id not on board");
    room_ids[positive_remainder(idx as i32 + delta, room_ids.len())]
}

pub(crate) fn positive_remainder(value: i32, modulus: usize) -> usize {
    let modulus = modulus as i32;
    let remainder = value % modulus;
    if remainder >= 0 {
        remainder as usize
    } else {
        (remainder + modulus) as usize
    }
}
