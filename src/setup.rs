//! Pre-game configuration: which roster team plays on which half, who serves
//! first, and where each doubles player starts.

use serde::Serialize;

use crate::court::cross_court_start;
use crate::error::SetupError;
use crate::source::{MatchData, RosterEntry, RosterTeam};
use crate::types::{CourtPosition, GameMode, Player, Side};

/// Half of the court team A plays on. Team B takes the other half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamAssignment {
    pub team_a: Side,
}

impl TeamAssignment {
    pub fn team_b(&self) -> Side {
        self.team_a.opposite()
    }

    pub fn side_of(&self, team: RosterTeam) -> Side {
        match team {
            RosterTeam::A => self.team_a,
            RosterTeam::B => self.team_b(),
        }
    }

    pub fn swapped(self) -> Self {
        Self {
            team_a: self.team_a.opposite(),
        }
    }
}

impl Default for TeamAssignment {
    fn default() -> Self {
        Self { team_a: Side::Left }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickedPlayer {
    pub side: Side,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PickStatus {
    AwaitingServer,
    AwaitingReceiver,
    Ready,
}

/// Players and first server handed to `MatchEngine::start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lineup {
    pub game_mode: GameMode,
    pub serving_team: Side,
    pub left: Vec<Player>,
    pub right: Vec<Player>,
}

impl Lineup {
    pub fn players(&self, side: Side) -> &[Player] {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

/// Referee choices made between loading a match and starting play.
#[derive(Debug, Clone)]
pub struct MatchSetup {
    data: MatchData,
    assignment: TeamAssignment,
    serving_team: Option<Side>,
    server: Option<PickedPlayer>,
    receiver: Option<PickedPlayer>,
}

impl MatchSetup {
    pub fn new(data: MatchData) -> Self {
        Self {
            data,
            assignment: TeamAssignment::default(),
            serving_team: None,
            server: None,
            receiver: None,
        }
    }

    pub fn data(&self) -> &MatchData {
        &self.data
    }

    pub fn assignment(&self) -> TeamAssignment {
        self.assignment
    }

    /// Serving team chosen so far; left when nothing was picked.
    pub fn serving_team(&self) -> Side {
        self.serving_team.unwrap_or(Side::Left)
    }

    pub fn set_serving_team(&mut self, side: Side) {
        self.serving_team = Some(side);
    }

    pub fn server(&self) -> Option<&PickedPlayer> {
        self.server.as_ref()
    }

    pub fn receiver(&self) -> Option<&PickedPlayer> {
        self.receiver.as_ref()
    }

    /// Roster entries playing on `side` under the current assignment, roster order.
    pub fn roster_for(&self, side: Side) -> Vec<&RosterEntry> {
        let team = if self.assignment.team_a == side {
            RosterTeam::A
        } else {
            RosterTeam::B
        };
        self.data.team(team)
    }

    /// Two-tap server/receiver pick.
    ///
    /// The first tap picks the server and its team serves. A tap on the other
    /// half then picks the receiver. Any other tap starts over with that
    /// player as server.
    pub fn select_player(&mut self, side: Side, name: &str) -> PickStatus {
        let picked = PickedPlayer {
            side,
            name: name.to_string(),
        };

        match (&self.server, &self.receiver) {
            (Some(server), None) if server.side != side => {
                self.receiver = Some(picked);
            }
            _ => {
                self.server = Some(picked);
                self.receiver = None;
                self.serving_team = Some(side);
            }
        }

        self.pick_status()
    }

    pub fn pick_status(&self) -> PickStatus {
        match (&self.server, &self.receiver) {
            (None, _) => PickStatus::AwaitingServer,
            (Some(_), None) => PickStatus::AwaitingReceiver,
            (Some(_), Some(_)) => PickStatus::Ready,
        }
    }

    /// Swaps which half each roster team plays on. Any pick in progress is
    /// cleared since it named players by their old half.
    pub fn switch_sides(&mut self) {
        self.assignment = self.assignment.swapped();
        self.serving_team = None;
        self.server = None;
        self.receiver = None;
    }

    pub fn build_lineup(&self) -> Result<Lineup, SetupError> {
        let mode = self.data.game_mode;
        let left = self.roster_for(Side::Left);
        let right = self.roster_for(Side::Right);
        check_roster("left", &left, mode.team_size())?;
        check_roster("right", &right, mode.team_size())?;

        let serving_team = self.serving_team();
        let (left, right) = match mode {
            GameMode::Singles => (
                vec![singles_player(left[0])],
                vec![singles_player(right[0])],
            ),
            GameMode::Doubles => match (&self.server, &self.receiver) {
                (Some(server), Some(receiver)) => {
                    self.picked_doubles_layout(server, receiver, &left, &right)?
                }
                _ => default_doubles_layout(serving_team, &left, &right),
            },
        };

        Ok(Lineup {
            game_mode: mode,
            serving_team,
            left,
            right,
        })
    }

    /// Layout from a server/receiver pick: the server takes slot 1 (server #2)
    /// on the cross-court start position and the receiver stands diagonally
    /// across from them.
    fn picked_doubles_layout(
        &self,
        server: &PickedPlayer,
        receiver: &PickedPlayer,
        left: &[&RosterEntry],
        right: &[&RosterEntry],
    ) -> Result<(Vec<Player>, Vec<Player>), SetupError> {
        let roster = |side: Side| if side == Side::Left { left } else { right };
        let (server_entry, server_partner) = split_pick(roster(server.side), server)?;
        let (receiver_entry, receiver_partner) = split_pick(roster(receiver.side), receiver)?;

        let server_position = cross_court_start(server.side);
        let receiver_position = server_position.opposite();

        let serving = vec![
            doubles_player(server_partner, server_position.opposite()),
            doubles_player(server_entry, server_position),
        ];
        let mut receiving = vec![
            doubles_player(receiver_entry, receiver_position),
            doubles_player(receiver_partner, receiver_position.opposite()),
        ];
        receiving.sort_by_key(|p| p.position != Some(CourtPosition::Top));

        Ok(match server.side {
            Side::Left => (serving, receiving),
            Side::Right => (receiving, serving),
        })
    }
}

fn check_roster(
    team: &'static str,
    roster: &[&RosterEntry],
    expected: usize,
) -> Result<(), SetupError> {
    if roster.len() != expected {
        return Err(SetupError::RosterSize {
            team,
            expected,
            found: roster.len(),
        });
    }
    Ok(())
}

fn split_pick<'a>(
    roster: &[&'a RosterEntry],
    pick: &PickedPlayer,
) -> Result<(&'a RosterEntry, &'a RosterEntry), SetupError> {
    let unknown = || SetupError::UnknownPlayer {
        name: pick.name.clone(),
        side: pick.side,
    };
    let index = roster
        .iter()
        .position(|entry| entry.name == pick.name)
        .ok_or_else(unknown)?;
    let partner = roster.get(1 - index).ok_or_else(unknown)?;
    Ok((roster[index], partner))
}

/// Roster-order layout. Slot 1 of the serving team (server #2) starts on the
/// cross-court position; every other team keeps slot 0 on top.
fn default_doubles_layout(
    serving_team: Side,
    left: &[&RosterEntry],
    right: &[&RosterEntry],
) -> (Vec<Player>, Vec<Player>) {
    let layout = |side: Side, roster: &[&RosterEntry]| {
        let second = if side == serving_team {
            cross_court_start(side)
        } else {
            CourtPosition::Bottom
        };
        vec![
            doubles_player(roster[0], second.opposite()),
            doubles_player(roster[1], second),
        ]
    };
    (layout(Side::Left, left), layout(Side::Right, right))
}

fn singles_player(entry: &RosterEntry) -> Player {
    Player::singles(Some(entry.player_id.clone()), entry.name.clone())
}

fn doubles_player(entry: &RosterEntry, position: CourtPosition) -> Player {
    Player::doubles(Some(entry.player_id.clone()), entry.name.clone(), position)
}
