use kibitz_types::User;
use serde::Serialize;

/// Something observers of the bot may want to show.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "command", content = "data", rename_all = "snake_case")]
pub enum Notice {
    /// Ratings to append to the rating chart, oldest first.
    #[serde(rename = "add_rating")]
    RatingAdded(Vec<i64>),
    Info(InfoSnapshot),
}

/// Where the bot is and how its current game stands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InfoSnapshot {
    pub player: User,
    pub section: String,
    pub seat: i64,
    /// Movetext of the current game, empty when none has started.
    pub movetext: String,
    pub matches: usize,
    pub net_elo: i64,
}
