use crate::core::room::RoomId;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named group of rooms that can be closed off before play, removing its
/// rooms (and references to them) from the board.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
#[readonly::make]
pub struct Wing {
    pub name: String,
    pub room_ids: Vec<RoomId>,
}

impl Wing {
    pub fn new(name: impl Into<String>, room_ids: impl IntoIterator<Item = RoomId>) -> Self {
        Self {
            name: name.into(),
            room_ids: room_ids.into_iter().collect(),
        }
    }
}

impl fmt::Display for Wing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.name, self.room_ids.iter().join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_room_ids() {
        let wing = Wing::new("East", [RoomId(5), RoomId(6), RoomId(7)]);
        assert_eq!(wing.to_string(), "East;5,6,7");
    }
}
