//! Where match rosters come from.

use std::collections::BTreeMap;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;
use crate::error::SourceError;
use crate::transport::{HttpRequest, Method, Transport};
use crate::types::{GameMode, MatchConfiguration, lenient_max_score};

/// Roster team label used by the tournament backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RosterTeam {
    A,
    B,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub player_id: String,
    pub name: String,
    pub team: RosterTeam,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking: Option<f64>,
}

/// A match as delivered by a `MatchSource`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchData {
    pub match_id: String,
    pub game_mode: GameMode,
    pub players: Vec<RosterEntry>,
    #[serde(default)]
    pub tournament: String,
    #[serde(default)]
    pub round: String,
    #[serde(
        default,
        deserialize_with = "lenient_max_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_score: Option<u32>,
}

impl MatchData {
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn team(&self, team: RosterTeam) -> Vec<&RosterEntry> {
        self.players.iter().filter(|p| p.team == team).collect()
    }

    pub fn configuration(&self) -> MatchConfiguration {
        MatchConfiguration {
            max_score: self.max_score,
        }
    }
}

pub trait MatchSource {
    /// Fails with `SourceError::NotFound` for unknown ids.
    fn load_match(&self, match_id: &str) -> Result<MatchData, SourceError>;
}

fn roster(player_id: &str, name: &str, team: RosterTeam, ranking: f64) -> RosterEntry {
    RosterEntry {
        player_id: player_id.to_string(),
        name: name.to_string(),
        team,
        ranking: Some(ranking),
    }
}

static DEMO_MATCHES: Lazy<BTreeMap<String, MatchData>> = Lazy::new(|| {
    let matches = [
        MatchData {
            match_id: "MATCH-001".to_string(),
            game_mode: GameMode::Singles,
            players: vec![
                roster("P001", "John Smith", RosterTeam::A, 4.2),
                roster("P002", "Sarah Johnson", RosterTeam::B, 4.1),
            ],
            tournament: "Summer Championship".to_string(),
            round: "Quarterfinals".to_string(),
            max_score: Some(15),
        },
        MatchData {
            match_id: "MATCH-002".to_string(),
            game_mode: GameMode::Doubles,
            players: vec![
                roster("P101", "Mike Wilson", RosterTeam::A, 4.5),
                roster("P102", "Lisa Chen", RosterTeam::A, 4.3),
                roster("P201", "David Brown", RosterTeam::B, 4.4),
                roster("P202", "Emma Davis", RosterTeam::B, 4.2),
            ],
            tournament: "Doubles Tournament".to_string(),
            round: "Semifinals".to_string(),
            max_score: Some(21),
        },
        MatchData {
            match_id: "MATCH-003".to_string(),
            game_mode: GameMode::Singles,
            players: vec![
                roster("P301", "Alex Rodriguez", RosterTeam::A, 4.0),
                roster("P302", "Maria Garcia", RosterTeam::B, 3.8),
            ],
            tournament: "Default Rules Tournament".to_string(),
            round: "Finals".to_string(),
            max_score: None,
        },
    ];
    matches
        .into_iter()
        .map(|m| (m.match_id.clone(), m))
        .collect()
});

/// In-memory fixtures for demos and training sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct DemoMatchSource;

impl DemoMatchSource {
    pub fn match_ids(&self) -> Vec<&'static str> {
        DEMO_MATCHES.keys().map(String::as_str).collect()
    }
}

impl MatchSource for DemoMatchSource {
    fn load_match(&self, match_id: &str) -> Result<MatchData, SourceError> {
        let id = match_id.trim().to_uppercase();
        DEMO_MATCHES
            .get(id.as_str())
            .cloned()
            .ok_or(SourceError::NotFound(id))
    }
}

/// Fetches matches from the tournament backend: `GET {endpoint}/{id}`.
pub struct RemoteMatchSource<T> {
    transport: T,
    endpoint: String,
    timeout: Duration,
    token: Option<String>,
}

impl<T: Transport> RemoteMatchSource<T> {
    pub fn new(transport: T, api: &ApiConfig) -> Self {
        Self {
            transport,
            endpoint: api.matches_endpoint.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(api.timeout_ms),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

impl<T: Transport> MatchSource for RemoteMatchSource<T> {
    fn load_match(&self, match_id: &str) -> Result<MatchData, SourceError> {
        let id = match_id.trim().to_uppercase();
        let request = HttpRequest {
            method: Method::Get,
            url: format!("{}/{}", self.endpoint, id),
            bearer_token: self.token.clone(),
            body: None,
            timeout: self.timeout,
        };

        let response = self.transport.send(&request)?;
        match response.status {
            404 => Err(SourceError::NotFound(id)),
            status if !response.is_success() => Err(SourceError::Status(status)),
            _ => MatchData::from_json(&response.body),
        }
    }
}
