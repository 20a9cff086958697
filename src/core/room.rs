use itertools::Itertools;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifier of a room on the board. Id 0 is reserved and never names a
/// real room; matrices are indexed directly by id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RoomId(pub usize);

impl RoomId {
    pub fn idx(self) -> usize {
        self.0
    }
}

// Board documents sometimes carry room ids as numeric strings; accept both.
impl<'de> Deserialize<'de> for RoomId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RoomIdVisitor;

        impl<'de> Visitor<'de> for RoomIdVisitor {
            type Value = RoomId;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a room id as a number or numeric string")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<RoomId, E> {
                usize::try_from(value)
                    .map(RoomId)
                    .map_err(|_| E::custom("room id out of range"))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<RoomId, E> {
                if value < 0 {
                    return Err(E::custom("room id must be non-negative"));
                }
                self.visit_u64(value as u64)
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<RoomId, E> {
                value.trim().parse::<usize>().map(RoomId).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(RoomIdVisitor)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One room of a board document. Adjacency and sight lists name other rooms
/// by id; a room never lists itself. Symmetry across the room set is checked
/// by board validation, not assumed here.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
#[readonly::make]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub adjacent: Vec<RoomId>,
    pub visible: Vec<RoomId>,
}

impl Room {
    pub fn new(
        id: RoomId,
        name: impl Into<String>,
        adjacent: impl IntoIterator<Item = RoomId>,
        visible: impl IntoIterator<Item = RoomId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            adjacent: adjacent.into_iter().collect(),
            visible: visible.into_iter().collect(),
        }
    }

    /// Copy of this room with all references to closed rooms stripped.
    pub fn without_closed(&self, closed_room_ids: &[RoomId]) -> Self {
        let keep = |ids: &[RoomId]| {
            ids.iter()
                .copied()
                .filter(|id| !closed_room_ids.contains(id))
                .collect::<Vec<_>>()
        };

        Room::new(
            self.id,
            self.name.clone(),
            keep(&self.adjacent),
            keep(&self.visible),
        )
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};A:{};V:{}",
            self.id,
            self.name,
            self.adjacent.iter().join(","),
            self.visible.iter().join(","),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_id_deserializes_from_number_or_string() {
        assert_eq!(serde_json::from_str::<RoomId>("7").unwrap(), RoomId(7));
        assert_eq!(
            serde_json::from_str::<RoomId>("\" 7 \"").unwrap(),
            RoomId(7)
        );
        assert!(serde_json::from_str::<RoomId>("-1").is_err());
    }

    #[test]
    fn without_closed_strips_both_lists() {
        let room = Room::new(
            RoomId(5),
            "Parlor",
            [RoomId(1), RoomId(2), RoomId(3)],
            [RoomId(2), RoomId(4)],
        );

        let filtered = room.without_closed(&[RoomId(2), RoomId(4)]);

        assert_eq!(filtered.adjacent, vec![RoomId(1), RoomId(3)]);
        assert_eq!(filtered.visible, Vec::<RoomId>::new());
        assert_eq!(filtered.name, "Parlor");
    }

    #[test]
    fn display_lists_adjacency_and_sight() {
        let room = Room::new(RoomId(1), "Hall", [RoomId(2), RoomId(3)], [RoomId(4)]);
        assert_eq!(room.to_string(), "1;Hall;A:2,3;V:4");
    }
}
