use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Character team. Only used to pick the gradient that recolors the token.
///
/// Deserializes leniently: saved data naming a team this crate does not know loads as
/// townsfolk instead of failing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Team {
    #[default]
    Townsfolk,
    Outsider,
    Minion,
    Demon,
    Traveler,
}

impl Team {
    pub const ALL: [Team; 5] = [
        Team::Townsfolk,
        Team::Outsider,
        Team::Minion,
        Team::Demon,
        Team::Traveler,
    ];

    /// Lenient parse: case-insensitive, accepts "traveller", anything unknown is townsfolk.
    pub fn parse_lenient(s: &str) -> Team {
        s.parse().unwrap_or_default()
    }

    pub fn id(self) -> &'static str {
        match self {
            Team::Townsfolk => "townsfolk",
            Team::Outsider => "outsider",
            Team::Minion => "minion",
            Team::Demon => "demon",
            Team::Traveler => "traveler",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Team::Townsfolk => "Townsfolk",
            Team::Outsider => "Outsider",
            Team::Minion => "Minion",
            Team::Demon => "Demon",
            Team::Traveler => "Traveler",
        }
    }
}

impl FromStr for Team {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "townsfolk" => Ok(Team::Townsfolk),
            "outsider" => Ok(Team::Outsider),
            "minion" => Ok(Team::Minion),
            "demon" => Ok(Team::Demon),
            "traveler" | "traveller" => Ok(Team::Traveler),
            other => Err(format!("unknown team: {other}")),
        }
    }
}

impl From<String> for Team {
    fn from(s: String) -> Self {
        Team::parse_lenient(&s)
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/team.rs"]
mod tests;
