use std::ops::{Index, IndexMut};

use serde::{Deserialize, Deserializer, Serialize};

/// A half of the court as seen from the referee's device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Parses the `"left"`/`"right"` strings the touch layer sends.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(Side::Left),
            "right" => Some(Side::Right),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Singles,
    Doubles,
}

impl GameMode {
    /// Players per team for this mode.
    pub fn team_size(self) -> usize {
        match self {
            GameMode::Singles => 1,
            GameMode::Doubles => 2,
        }
    }
}

/// Physical court half a doubles player stands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourtPosition {
    Top,
    Bottom,
}

impl CourtPosition {
    pub fn opposite(self) -> Self {
        match self {
            CourtPosition::Top => CourtPosition::Bottom,
            CourtPosition::Bottom => CourtPosition::Top,
        }
    }
}

/// Doubles server number. Serialized as the integers 1 and 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ServerNumber {
    One,
    Two,
}

impl ServerNumber {
    /// Array slot of this server on the serving team.
    pub fn index(self) -> usize {
        match self {
            ServerNumber::One => 0,
            ServerNumber::Two => 1,
        }
    }
}

impl TryFrom<u8> for ServerNumber {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ServerNumber::One),
            2 => Ok(ServerNumber::Two),
            other => Err(format!("server number must be 1 or 2, got {other}")),
        }
    }
}

impl From<ServerNumber> for u8 {
    fn from(value: ServerNumber) -> Self {
        match value {
            ServerNumber::One => 1,
            ServerNumber::Two => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    pub name: String,
    /// Always set in doubles, never in singles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<CourtPosition>,
}

impl Player {
    pub fn singles(player_id: Option<String>, name: impl Into<String>) -> Self {
        Self {
            player_id,
            name: name.into(),
            position: None,
        }
    }

    pub fn doubles(
        player_id: Option<String>,
        name: impl Into<String>,
        position: CourtPosition,
    ) -> Self {
        Self {
            player_id,
            name: name.into(),
            position: Some(position),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub score: u32,
    pub players: Vec<Player>,
}

impl Team {
    /// Index of the player standing at `position`, if any.
    pub fn index_at(&self, position: CourtPosition) -> Option<usize> {
        self.players
            .iter()
            .position(|player| player.position == Some(position))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teams {
    pub left: Team,
    pub right: Team,
}

impl Index<Side> for Teams {
    type Output = Team;

    fn index(&self, side: Side) -> &Team {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

impl IndexMut<Side> for Teams {
    fn index_mut(&mut self, side: Side) -> &mut Team {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Serving {
    pub team: Side,
    /// Number shown in the score call ("5-3-1").
    pub player: ServerNumber,
    /// Service court to serve from, derived from the serving team's score parity.
    pub side: Side,
    /// Slot highlighted as server after a manual correction. Independent of `player`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_server: Option<ServerNumber>,
}

impl Default for Serving {
    fn default() -> Self {
        Self {
            team: Side::Left,
            player: ServerNumber::One,
            side: Side::Right,
            active_server: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    #[default]
    Setup,
    Active,
    Completed,
}

/// Match-specific overrides carried by the loaded match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchConfiguration {
    #[serde(
        default,
        deserialize_with = "lenient_max_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_score: Option<u32>,
}

/// Accepts any JSON value and keeps only finite positive numbers.
/// Fractions round up: `score >= 15.5` and `score >= 16` agree on integers.
pub(crate) fn lenient_max_score<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(max_score_from_value(&value))
}

pub(crate) fn max_score_from_value(value: &serde_json::Value) -> Option<u32> {
    let number = value.as_f64()?;
    if !number.is_finite() || number <= 0.0 {
        return None;
    }
    let rounded = number.ceil();
    if rounded > u32::MAX as f64 {
        return None;
    }
    Some(rounded as u32)
}

/// Live state of the match on this device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub match_id: Option<String>,
    pub game_mode: GameMode,
    pub teams: Teams,
    pub serving: Serving,
    pub game_status: GameStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_configuration: Option<MatchConfiguration>,
}

impl GameState {
    pub fn receiving_team(&self) -> Side {
        self.serving.team.opposite()
    }

    pub fn serving_score(&self) -> u32 {
        self.teams[self.serving.team].score
    }

    pub fn is_active(&self) -> bool {
        self.game_status == GameStatus::Active
    }
}

/// Final result reported when a game completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    pub winner: Side,
    pub left_score: u32,
    pub right_score: u32,
}

impl GameResult {
    pub fn from_scores(left_score: u32, right_score: u32) -> Self {
        Self {
            winner: if left_score > right_score {
                Side::Left
            } else {
                Side::Right
            },
            left_score,
            right_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_serializes_with_camel_case_keys() {
        let json = serde_json::to_value(GameState::default()).unwrap();

        assert_eq!(json["matchId"], serde_json::Value::Null);
        assert_eq!(json["gameMode"], "singles");
        assert_eq!(json["gameStatus"], "setup");
        assert_eq!(json["serving"]["team"], "left");
        assert_eq!(json["serving"]["player"], 1);
        assert_eq!(json["serving"]["side"], "right");
        assert!(json["serving"].get("activeServer").is_none());
    }

    #[test]
    fn server_number_rejects_values_outside_one_and_two() {
        assert_eq!(
            serde_json::from_str::<ServerNumber>("2").unwrap(),
            ServerNumber::Two
        );
        assert!(serde_json::from_str::<ServerNumber>("0").is_err());
        assert!(serde_json::from_str::<ServerNumber>("3").is_err());
    }

    #[test]
    fn lenient_max_score_keeps_only_positive_numbers() {
        let parse = |json: &str| {
            serde_json::from_str::<MatchConfiguration>(json)
                .unwrap()
                .max_score
        };

        assert_eq!(parse(r#"{"maxScore": 15}"#), Some(15));
        assert_eq!(parse(r#"{"maxScore": 15.5}"#), Some(16));
        assert_eq!(parse(r#"{"maxScore": 0}"#), None);
        assert_eq!(parse(r#"{"maxScore": -3}"#), None);
        assert_eq!(parse(r#"{"maxScore": "21"}"#), None);
        assert_eq!(parse(r#"{"maxScore": null}"#), None);
        assert_eq!(parse(r#"{}"#), None);
    }

    #[test]
    fn game_result_winner_is_higher_score_and_ties_go_right() {
        assert_eq!(GameResult::from_scores(11, 5).winner, Side::Left);
        assert_eq!(GameResult::from_scores(9, 11).winner, Side::Right);
        assert_eq!(GameResult::from_scores(4, 4).winner, Side::Right);
    }
}
