//! Pure court geometry: who serves from where, and who receives.
//!
//! Nothing here mutates state. The render layer calls these after every
//! engine update to place names and the server highlight.

use serde::{Deserialize, Serialize};

use crate::types::{CourtPosition, GameMode, GameState, ServerNumber, Side};

/// Service court for a serving score: even serves from the right, odd from the left.
pub fn serving_side_for(score: u32) -> Side {
    if score % 2 == 0 { Side::Right } else { Side::Left }
}

/// Position a team's server #1 takes when it gains the serve at an even score.
/// Left team serves from the bottom half, right team from the top half.
pub fn cross_court_start(team: Side) -> CourtPosition {
    match team {
        Side::Left => CourtPosition::Bottom,
        Side::Right => CourtPosition::Top,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SinglesLayout {
    pub server: CourtPosition,
    pub receiver: CourtPosition,
}

/// Singles positions are not stored. They follow the server's score parity and
/// the receiver always stands diagonally opposite.
pub fn singles_layout(serving_team: Side, server_score: u32) -> SinglesLayout {
    let even_position = cross_court_start(serving_team);
    let server = if server_score % 2 == 0 {
        even_position
    } else {
        even_position.opposite()
    };
    SinglesLayout {
        server,
        receiver: server.opposite(),
    }
}

/// One player's spot on the court.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourtSlot {
    pub team: Side,
    pub position: CourtPosition,
    pub player_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServeSlots {
    pub server: CourtSlot,
    pub receiver: CourtSlot,
}

/// Derives the highlighted server and the cross-court receiver.
///
/// Doubles highlights `active_server` when set, otherwise `serving.player`.
/// The score call keeps showing `serving.player` either way, so a corrected
/// game can read "5-3-1" while server #2 is highlighted.
///
/// Returns `None` when the roster does not have the expected players.
pub fn derive_positions(state: &GameState) -> Option<ServeSlots> {
    let serving_team = state.serving.team;
    let receiving_team = serving_team.opposite();

    match state.game_mode {
        GameMode::Singles => {
            let layout = singles_layout(serving_team, state.serving_score());
            state.teams[serving_team].players.first()?;
            state.teams[receiving_team].players.first()?;
            Some(ServeSlots {
                server: CourtSlot {
                    team: serving_team,
                    position: layout.server,
                    player_index: 0,
                },
                receiver: CourtSlot {
                    team: receiving_team,
                    position: layout.receiver,
                    player_index: 0,
                },
            })
        }
        GameMode::Doubles => {
            let highlighted = state.serving.active_server.unwrap_or(state.serving.player);
            let server_index = highlighted.index();
            let server_position = state.teams[serving_team]
                .players
                .get(server_index)?
                .position?;
            let receiver_position = server_position.opposite();
            let receiver_index = state.teams[receiving_team].index_at(receiver_position)?;
            Some(ServeSlots {
                server: CourtSlot {
                    team: serving_team,
                    position: server_position,
                    player_index: server_index,
                },
                receiver: CourtSlot {
                    team: receiving_team,
                    position: receiver_position,
                    player_index: receiver_index,
                },
            })
        }
    }
}

/// Player indices standing on each half of one side of the net.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HalfLayout {
    pub top: Option<usize>,
    pub bottom: Option<usize>,
}

impl HalfLayout {
    fn place(&mut self, position: CourtPosition, index: usize) {
        match position {
            CourtPosition::Top => self.top = Some(index),
            CourtPosition::Bottom => self.bottom = Some(index),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CourtLayout {
    pub left: HalfLayout,
    pub right: HalfLayout,
}

/// Where every player's name goes on screen.
pub fn court_layout(state: &GameState) -> CourtLayout {
    let mut layout = CourtLayout::default();

    match state.game_mode {
        GameMode::Singles => {
            let singles = singles_layout(state.serving.team, state.serving_score());
            for side in [Side::Left, Side::Right] {
                if state.teams[side].players.is_empty() {
                    continue;
                }
                let position = if side == state.serving.team {
                    singles.server
                } else {
                    singles.receiver
                };
                half_mut(&mut layout, side).place(position, 0);
            }
        }
        GameMode::Doubles => {
            for side in [Side::Left, Side::Right] {
                for (index, player) in state.teams[side].players.iter().enumerate() {
                    if let Some(position) = player.position {
                        half_mut(&mut layout, side).place(position, index);
                    }
                }
            }
        }
    }

    layout
}

fn half_mut(layout: &mut CourtLayout, side: Side) -> &mut HalfLayout {
    match side {
        Side::Left => &mut layout.left,
        Side::Right => &mut layout.right,
    }
}

/// Score line as the referee reads it out: `"L - R"` or `"L - R - N"` in doubles.
pub fn score_call(state: &GameState) -> String {
    let left = state.teams.left.score;
    let right = state.teams.right.score;
    match state.game_mode {
        GameMode::Singles => format!("{left} - {right}"),
        GameMode::Doubles => {
            let number: u8 = state.serving.player.into();
            format!("{left} - {right} - {number}")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartingPlayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    pub name: String,
    pub team: Side,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<CourtPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_number: Option<ServerNumber>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartingConfiguration {
    pub starting_server: StartingPlayer,
    pub starting_receiver: StartingPlayer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_court_serving: Option<bool>,
}

/// Who served first and who received it, for the audit trail.
///
/// Doubles always opens with server #2 (array index 1). The receiver is the
/// opponent diagonally across: top when the left team serves, bottom when
/// the right team serves.
pub fn starting_server_info(state: &GameState) -> Option<StartingConfiguration> {
    let serving_team = state.serving.team;
    let receiving_team = serving_team.opposite();
    let servers = &state.teams[serving_team].players;
    let receivers = &state.teams[receiving_team].players;

    match state.game_mode {
        GameMode::Singles => {
            let server = servers.first()?;
            let receiver = receivers.first()?;
            Some(StartingConfiguration {
                starting_server: StartingPlayer {
                    player_id: server.player_id.clone(),
                    name: server.name.clone(),
                    team: serving_team,
                    position: None,
                    server_number: None,
                },
                starting_receiver: StartingPlayer {
                    player_id: receiver.player_id.clone(),
                    name: receiver.name.clone(),
                    team: receiving_team,
                    position: None,
                    server_number: None,
                },
                cross_court_serving: None,
            })
        }
        GameMode::Doubles => {
            let server = servers.get(ServerNumber::Two.index())?;
            let receiver_position = cross_court_start(serving_team).opposite();
            let receiver = &receivers[state.teams[receiving_team].index_at(receiver_position)?];
            Some(StartingConfiguration {
                starting_server: StartingPlayer {
                    player_id: server.player_id.clone(),
                    name: server.name.clone(),
                    team: serving_team,
                    position: server.position,
                    server_number: Some(ServerNumber::Two),
                },
                starting_receiver: StartingPlayer {
                    player_id: receiver.player_id.clone(),
                    name: receiver.name.clone(),
                    team: receiving_team,
                    position: receiver.position,
                    server_number: None,
                },
                cross_court_serving: Some(true),
            })
        }
    }
}
