use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::config::GameConfig;
use crate::court::{self, ServeSlots, StartingConfiguration, cross_court_start, serving_side_for};
use crate::error::{SetupError, ValidationError};
use crate::history::GameHistory;
use crate::setup::Lineup;
use crate::source::MatchData;
use crate::types::{GameMode, GameResult, GameState, GameStatus, ServerNumber, Side, Teams};

/// What a single court touch did to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RallyOutcome {
    /// Game not active, nothing changed.
    Ignored,
    Point { team: Side, score: u32 },
    /// Doubles server #1 lost the rally; server #2 on the same team serves next.
    SecondServer { team: Side },
    /// Serve passed to `team`.
    SideOut { team: Side },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MatchEvent {
    GameFinished(GameResult),
}

/// Operator correction entered from the adjustment dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreAdjustment {
    pub left_score: i64,
    pub right_score: i64,
    pub serving_team: Side,
    /// Number shown in the score call.
    pub display_server: ServerNumber,
    /// Highlighted server slot, doubles only.
    #[serde(default)]
    pub active_server: Option<ServerNumber>,
}

/// Owns the live `GameState` of one match and applies every rule to it.
pub struct MatchEngine {
    state: GameState,
    history: GameHistory,
    config: GameConfig,
    starting_state: Option<GameState>,
    started_at: Option<Instant>,
    finished_after: Option<Duration>,
    events: Vec<MatchEvent>,
}

impl MatchEngine {
    pub fn new(config: GameConfig) -> Self {
        let history = GameHistory::new(config.history_limit);
        Self {
            state: GameState::default(),
            history,
            config,
            starting_state: None,
            started_at: None,
            finished_after: None,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Target score: the match override when present, otherwise the configured default.
    pub fn max_score(&self) -> u32 {
        self.state
            .match_configuration
            .and_then(|c| c.max_score)
            .filter(|&max| max > 0)
            .unwrap_or(self.config.winning_score)
    }

    /// Replaces everything with a fresh `setup` state for `data`.
    pub fn load_match(&mut self, data: &MatchData) {
        self.reset_to_setup();
        self.state.match_id = Some(data.match_id.clone());
        self.state.game_mode = data.game_mode;
        self.state.match_configuration = Some(data.configuration());
        info!(
            "loaded match {} ({:?}, max score {})",
            data.match_id,
            data.game_mode,
            self.max_score()
        );
    }

    /// Back to an empty `setup` state, as after logout or "new game".
    pub fn clear(&mut self) {
        self.reset_to_setup();
    }

    fn reset_to_setup(&mut self) {
        self.state = GameState::default();
        self.history.clear();
        self.starting_state = None;
        self.started_at = None;
        self.finished_after = None;
        self.events.clear();
    }

    /// Puts the lineup on court and opens play.
    pub fn start(&mut self, lineup: Lineup) -> Result<(), SetupError> {
        if self.state.match_id.is_none() {
            return Err(SetupError::NoMatchLoaded);
        }

        let mode = self.state.game_mode;
        for (team, side) in [("left", Side::Left), ("right", Side::Right)] {
            let found = lineup.players(side).len();
            if found != mode.team_size() {
                return Err(SetupError::RosterSize {
                    team,
                    expected: mode.team_size(),
                    found,
                });
            }
        }

        self.state.teams = Teams::default();
        self.state.teams.left.players = lineup.left;
        self.state.teams.right.players = lineup.right;
        self.state.serving.team = lineup.serving_team;
        // Doubles opens with server #2: the first serving team only gets one server.
        self.state.serving.player = match mode {
            GameMode::Singles => ServerNumber::One,
            GameMode::Doubles => ServerNumber::Two,
        };
        self.state.serving.active_server = None;
        self.refresh_serving_side();
        self.state.game_status = GameStatus::Active;

        self.history.clear();
        self.events.clear();
        self.starting_state = Some(self.state.clone());
        self.started_at = Some(Instant::now());
        self.finished_after = None;

        info!(
            "match {} started, {:?} serving",
            self.state.match_id.as_deref().unwrap_or("?"),
            self.state.serving.team
        );
        Ok(())
    }

    /// Resolves a rally from a touch on `side` of the court.
    pub fn apply_touch(&mut self, side: Side) -> RallyOutcome {
        if !self.state.is_active() {
            return RallyOutcome::Ignored;
        }

        self.history.push(self.state.clone());

        let outcome = if side == self.state.serving.team {
            self.score_point(side)
        } else {
            self.side_out()
        };
        self.refresh_serving_side();

        debug!("{:?} -> {}", outcome, court::score_call(&self.state));
        self.check_completion();
        outcome
    }

    fn score_point(&mut self, team: Side) -> RallyOutcome {
        let scoring = &mut self.state.teams[team];
        scoring.score += 1;
        if self.state.game_mode == GameMode::Doubles
            && let [first, second] = scoring.players.as_mut_slice()
        {
            std::mem::swap(&mut first.position, &mut second.position);
        }
        RallyOutcome::Point {
            team,
            score: scoring.score,
        }
    }

    fn side_out(&mut self) -> RallyOutcome {
        let current = self.state.serving.team;
        self.state.serving.active_server = None;

        match self.state.game_mode {
            GameMode::Singles => {
                self.state.serving.team = current.opposite();
                RallyOutcome::SideOut {
                    team: current.opposite(),
                }
            }
            GameMode::Doubles if self.state.serving.player == ServerNumber::One => {
                self.state.serving.player = ServerNumber::Two;
                RallyOutcome::SecondServer { team: current }
            }
            GameMode::Doubles => {
                let next = current.opposite();
                self.state.serving.team = next;
                self.promote_cross_court_server(next);
                self.state.serving.player = ServerNumber::One;
                RallyOutcome::SideOut { team: next }
            }
        }
    }

    /// Moves whoever stands on `team`'s cross-court start position into slot 0
    /// so that server #1 is always index 0.
    fn promote_cross_court_server(&mut self, team: Side) {
        let players = &mut self.state.teams[team].players;
        let start = cross_court_start(team);
        if players.len() == 2 && players[1].position == Some(start) {
            players.swap(0, 1);
        }
    }

    fn refresh_serving_side(&mut self) {
        self.state.serving.side = serving_side_for(self.state.serving_score());
    }

    /// Applies the win-by-margin rule. Emits `GameFinished` once per transition
    /// into `completed`.
    pub fn check_completion(&mut self) -> bool {
        if self.state.game_status == GameStatus::Setup {
            return false;
        }

        let left = self.state.teams.left.score;
        let right = self.state.teams.right.score;
        let max = self.max_score();
        // A tie never closes a game, whatever the configured margin.
        let margin = self.config.win_by_margin.max(1);
        let won = (left >= max || right >= max) && left.abs_diff(right) >= margin;

        match (won, self.state.game_status) {
            (true, GameStatus::Active) => {
                self.state.game_status = GameStatus::Completed;
                self.finished_after = Some(self.elapsed());
                let result = GameResult::from_scores(left, right);
                info!(
                    "match {} completed {}-{}, {:?} wins",
                    self.state.match_id.as_deref().unwrap_or("?"),
                    left,
                    right,
                    result.winner
                );
                self.events.push(MatchEvent::GameFinished(result));
            }
            (false, GameStatus::Completed) => {
                self.state.game_status = GameStatus::Active;
                self.finished_after = None;
            }
            _ => {}
        }

        won
    }

    /// Operator override for scores and server. Out-of-range scores are rejected
    /// and the state is left exactly as it was.
    pub fn apply_adjustment(&mut self, adjustment: ScoreAdjustment) -> Result<(), ValidationError> {
        if self.state.game_status == GameStatus::Setup {
            return Err(ValidationError::GameNotInProgress);
        }
        let left = self.validate_score("leftScore", adjustment.left_score)?;
        let right = self.validate_score("rightScore", adjustment.right_score)?;

        self.history.push(self.state.clone());

        self.state.teams.left.score = left;
        self.state.teams.right.score = right;
        self.state.serving.team = adjustment.serving_team;
        self.state.serving.player = adjustment.display_server;
        self.state.serving.active_server = match self.state.game_mode {
            GameMode::Doubles => adjustment.active_server,
            GameMode::Singles => None,
        };
        self.refresh_serving_side();

        info!(
            "manual adjustment: {} ({:?} serving)",
            court::score_call(&self.state),
            adjustment.serving_team
        );
        self.check_completion();
        Ok(())
    }

    fn validate_score(&self, field: &'static str, value: i64) -> Result<u32, ValidationError> {
        let max = i64::from(self.config.max_adjust_score);
        if !(0..=max).contains(&value) {
            return Err(ValidationError::OutOfRange {
                field,
                value,
                min: 0,
                max,
            });
        }
        Ok(value as u32)
    }

    /// Restores the snapshot taken before the last touch or adjustment.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.pop() else {
            return false;
        };
        self.state = previous;
        self.finished_after = match self.state.game_status {
            GameStatus::Completed => self.finished_after.or_else(|| Some(self.elapsed())),
            _ => None,
        };
        debug!("undo -> {}", court::score_call(&self.state));
        true
    }

    /// Restarts the current match at 0-0 with the opening lineup.
    pub fn reset_game(&mut self) -> bool {
        let Some(start) = self.starting_state.clone() else {
            return false;
        };
        self.state = start;
        self.history.clear();
        self.events.clear();
        self.started_at = Some(Instant::now());
        self.finished_after = None;
        info!("game reset to 0-0");
        true
    }

    /// Puts back a previously saved live state, e.g. after the app was reloaded offline.
    /// Undo history does not survive the round trip.
    pub fn resume(&mut self, state: GameState) {
        self.reset_to_setup();
        self.state = state;
        if self.state.game_status != GameStatus::Setup {
            self.started_at = Some(Instant::now());
        }
    }

    pub fn take_events(&mut self) -> Vec<MatchEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn game_result(&self) -> Option<GameResult> {
        (self.state.game_status == GameStatus::Completed).then(|| {
            GameResult::from_scores(self.state.teams.left.score, self.state.teams.right.score)
        })
    }

    /// Time since `start`, frozen once the game completes.
    pub fn game_duration(&self) -> Duration {
        self.finished_after.unwrap_or_else(|| self.elapsed())
    }

    fn elapsed(&self) -> Duration {
        self.started_at
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    pub fn serve_slots(&self) -> Option<ServeSlots> {
        court::derive_positions(&self.state)
    }

    pub fn score_call(&self) -> String {
        court::score_call(&self.state)
    }

    /// First server and receiver of this game, taken from the opening lineup.
    pub fn starting_configuration(&self) -> Option<StartingConfiguration> {
        court::starting_server_info(self.starting_state.as_ref().unwrap_or(&self.state))
    }

    #[cfg(test)]
    fn set_state_for_test(&mut self, state: GameState) {
        self.state = state;
    }
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}

/// Formats a duration as `m:ss`.
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::setup::MatchSetup;
    use crate::source::{DemoMatchSource, MatchSource};
    use crate::types::CourtPosition;

    fn started(match_id: &str, serving: Side) -> MatchEngine {
        let data = DemoMatchSource.load_match(match_id).unwrap();
        let mut setup = MatchSetup::new(data.clone());
        setup.set_serving_team(serving);
        let mut engine = MatchEngine::default();
        engine.load_match(&data);
        engine.start(setup.build_lineup().unwrap()).unwrap();
        engine
    }

    fn singles(serving: Side) -> MatchEngine {
        started("MATCH-001", serving)
    }

    fn doubles(serving: Side) -> MatchEngine {
        started("MATCH-002", serving)
    }

    fn names_by_slot(engine: &MatchEngine, side: Side) -> Vec<(String, Option<CourtPosition>)> {
        engine.state().teams[side]
            .players
            .iter()
            .map(|p| (p.name.clone(), p.position))
            .collect()
    }

    fn adjustment(left: i64, right: i64, serving: Side) -> ScoreAdjustment {
        ScoreAdjustment {
            left_score: left,
            right_score: right,
            serving_team: serving,
            display_server: ServerNumber::One,
            active_server: None,
        }
    }

    #[test]
    fn t01_singles_point_for_left_moves_serve_to_left_court() {
        let mut engine = singles(Side::Left);

        let outcome = engine.apply_touch(Side::Left);
        let state = engine.state();

        assert_eq!(
            outcome,
            RallyOutcome::Point {
                team: Side::Left,
                score: 1
            }
        );
        assert_eq!(state.teams.left.score, 1);
        assert_eq!(state.teams.right.score, 0);
        assert_eq!(state.serving.team, Side::Left);
        assert_eq!(state.serving.side, Side::Left);
    }

    #[test]
    fn t02_singles_side_out_swaps_serving_team() {
        let mut engine = singles(Side::Left);
        engine.apply_touch(Side::Left);

        let outcome = engine.apply_touch(Side::Right);

        assert_eq!(outcome, RallyOutcome::SideOut { team: Side::Right });
        assert_eq!(engine.state().serving.team, Side::Right);
        assert_eq!(engine.state().serving.side, Side::Right);
        assert_eq!(engine.state().teams.left.score, 1);
    }

    #[test]
    fn t03_fresh_doubles_game_starts_with_server_two() {
        for serving in [Side::Left, Side::Right] {
            let engine = doubles(serving);
            assert_eq!(engine.state().serving.player, ServerNumber::Two);
            assert_eq!(engine.state().serving.side, Side::Right);
            assert_eq!(engine.score_call(), "0 - 0 - 2");
        }
    }

    #[test]
    fn t04_doubles_server_one_side_out_promotes_server_two() {
        let mut engine = doubles(Side::Left);
        let mut state = engine.state().clone();
        state.serving.player = ServerNumber::One;
        engine.set_state_for_test(state);

        let outcome = engine.apply_touch(Side::Right);

        assert_eq!(outcome, RallyOutcome::SecondServer { team: Side::Left });
        assert_eq!(engine.state().serving.player, ServerNumber::Two);
        assert_eq!(engine.state().serving.team, Side::Left);
    }

    #[test]
    fn t05_doubles_server_two_side_out_passes_serve_with_top_player_first() {
        let mut engine = doubles(Side::Left);
        assert_eq!(
            names_by_slot(&engine, Side::Right),
            vec![
                ("David Brown".to_string(), Some(CourtPosition::Top)),
                ("Emma Davis".to_string(), Some(CourtPosition::Bottom)),
            ]
        );
        // Put the right team's top player in slot 1 to exercise the swap.
        let mut state = engine.state().clone();
        state.teams.right.players.swap(0, 1);
        engine.set_state_for_test(state);

        let outcome = engine.apply_touch(Side::Right);
        let state = engine.state();

        assert_eq!(outcome, RallyOutcome::SideOut { team: Side::Right });
        assert_eq!(state.serving.team, Side::Right);
        assert_eq!(state.serving.player, ServerNumber::One);
        assert_eq!(state.teams.right.players[0].name, "David Brown");
        assert_eq!(state.teams.right.players[0].position, Some(CourtPosition::Top));
    }

    #[test]
    fn t06_doubles_point_swaps_scoring_team_positions_only() {
        let mut engine = doubles(Side::Left);

        engine.apply_touch(Side::Left);

        assert_eq!(
            names_by_slot(&engine, Side::Left),
            vec![
                ("Mike Wilson".to_string(), Some(CourtPosition::Bottom)),
                ("Lisa Chen".to_string(), Some(CourtPosition::Top)),
            ]
        );
        assert_eq!(
            names_by_slot(&engine, Side::Right),
            vec![
                ("David Brown".to_string(), Some(CourtPosition::Top)),
                ("Emma Davis".to_string(), Some(CourtPosition::Bottom)),
            ]
        );
        assert_eq!(engine.state().serving.side, Side::Left);
    }

    #[test]
    fn t07_full_doubles_rotation_returns_serve_to_first_team() {
        let mut engine = doubles(Side::Left);

        // Opening server #2 loses: serve to right, server #1.
        engine.apply_touch(Side::Right);
        assert_eq!(engine.state().serving.team, Side::Right);
        assert_eq!(engine.state().serving.player, ServerNumber::One);
        // Right server #1 loses: right server #2.
        engine.apply_touch(Side::Left);
        assert_eq!(engine.state().serving.team, Side::Right);
        assert_eq!(engine.state().serving.player, ServerNumber::Two);
        // Right server #2 loses: back to left server #1 on the bottom half.
        engine.apply_touch(Side::Left);
        let state = engine.state();
        assert_eq!(state.serving.team, Side::Left);
        assert_eq!(state.serving.player, ServerNumber::One);
        assert_eq!(state.teams.left.players[0].position, Some(CourtPosition::Bottom));
        assert_eq!(state.teams.left.score, 0);
        assert_eq!(state.teams.right.score, 0);
    }

    #[test]
    fn t08_touch_is_ignored_outside_active_play() {
        let mut engine = MatchEngine::default();
        assert_eq!(engine.apply_touch(Side::Left), RallyOutcome::Ignored);
        assert_eq!(engine.history_len(), 0);
        assert_eq!(engine.state(), &GameState::default());
    }

    #[test]
    fn t09_completion_at_fifteen_needs_two_point_lead() {
        let mut engine = singles(Side::Left);
        assert_eq!(engine.max_score(), 15);

        let mut state = engine.state().clone();
        state.teams.left.score = 15;
        state.teams.right.score = 14;
        engine.set_state_for_test(state.clone());
        assert!(!engine.check_completion());
        assert_eq!(engine.state().game_status, GameStatus::Active);

        state.teams.right.score = 13;
        engine.set_state_for_test(state);
        assert!(engine.check_completion());
        assert_eq!(engine.state().game_status, GameStatus::Completed);
    }

    #[test]
    fn t10_completion_fires_finish_event_once() {
        let mut engine = singles(Side::Left);
        let mut state = engine.state().clone();
        state.teams.left.score = 15;
        state.teams.right.score = 3;
        engine.set_state_for_test(state);

        assert!(engine.check_completion());
        assert!(engine.check_completion());

        let events = engine.take_events();
        assert_eq!(
            events,
            vec![MatchEvent::GameFinished(GameResult {
                winner: Side::Left,
                left_score: 15,
                right_score: 3,
            })]
        );
        assert_eq!(engine.state().game_status, GameStatus::Completed);
    }

    #[test]
    fn t11_default_max_score_applies_without_override() {
        let mut engine = started("MATCH-003", Side::Left);
        assert_eq!(engine.max_score(), 11);

        for _ in 0..11 {
            engine.apply_touch(Side::Left);
        }

        assert_eq!(engine.state().game_status, GameStatus::Completed);
        assert_eq!(engine.game_result().unwrap().left_score, 11);
        assert_eq!(engine.apply_touch(Side::Left), RallyOutcome::Ignored);
    }

    #[test]
    fn t12_negative_adjustment_is_rejected_and_state_unchanged() {
        let mut engine = doubles(Side::Left);
        engine.apply_touch(Side::Left);
        let before = engine.state().clone();
        let history_before = engine.history_len();

        let err = engine
            .apply_adjustment(adjustment(-1, 3, Side::Left))
            .unwrap_err();

        assert!(matches!(
            err,
            ValidationError::OutOfRange {
                field: "leftScore",
                value: -1,
                ..
            }
        ));
        assert_eq!(engine.state(), &before);
        assert_eq!(engine.history_len(), history_before);
        assert!(engine.apply_adjustment(adjustment(4, 31, Side::Left)).is_err());
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn t13_adjustment_sets_display_and_active_server_independently() {
        let mut engine = doubles(Side::Left);

        engine
            .apply_adjustment(ScoreAdjustment {
                left_score: 5,
                right_score: 3,
                serving_team: Side::Left,
                display_server: ServerNumber::One,
                active_server: Some(ServerNumber::Two),
            })
            .unwrap();

        let state = engine.state();
        assert_eq!(state.serving.player, ServerNumber::One);
        assert_eq!(state.serving.active_server, Some(ServerNumber::Two));
        assert_eq!(state.serving.side, Side::Left);
        assert_eq!(engine.score_call(), "5 - 3 - 1");
        assert_eq!(engine.serve_slots().unwrap().server.player_index, 1);
    }

    #[test]
    fn t14_adjustment_can_complete_and_reopen_a_game() {
        let mut engine = singles(Side::Right);

        engine.apply_adjustment(adjustment(15, 10, Side::Left)).unwrap();
        assert_eq!(engine.state().game_status, GameStatus::Completed);
        assert_eq!(engine.take_events().len(), 1);

        engine.apply_adjustment(adjustment(14, 10, Side::Left)).unwrap();
        assert_eq!(engine.state().game_status, GameStatus::Active);
        assert_eq!(engine.state().serving.active_server, None);
    }

    #[test]
    fn singles_adjustment_drops_requested_active_server() {
        let mut engine = singles(Side::Left);

        engine
            .apply_adjustment(ScoreAdjustment {
                left_score: 3,
                right_score: 1,
                serving_team: Side::Right,
                display_server: ServerNumber::Two,
                active_server: Some(ServerNumber::Two),
            })
            .unwrap();

        assert_eq!(engine.state().serving.team, Side::Right);
        assert_eq!(engine.state().serving.active_server, None);
    }

    #[test]
    fn tied_score_never_completes_even_with_zero_margin() {
        let data = DemoMatchSource.load_match("MATCH-003").unwrap();
        let mut engine = MatchEngine::new(GameConfig {
            win_by_margin: 0,
            ..GameConfig::default()
        });
        engine.load_match(&data);
        engine
            .start(MatchSetup::new(data).build_lineup().unwrap())
            .unwrap();

        engine.apply_adjustment(adjustment(11, 11, Side::Left)).unwrap();
        assert_eq!(engine.state().game_status, GameStatus::Active);
        assert!(engine.game_result().is_none());

        engine.apply_adjustment(adjustment(12, 11, Side::Left)).unwrap();
        assert_eq!(engine.state().game_status, GameStatus::Completed);
    }

    #[test]
    fn t15_adjustment_before_start_is_rejected() {
        let mut engine = MatchEngine::default();
        assert_eq!(
            engine.apply_adjustment(adjustment(1, 1, Side::Left)),
            Err(ValidationError::GameNotInProgress)
        );
    }

    #[test]
    fn t16_side_out_clears_highlight_override_but_points_keep_it() {
        let mut engine = doubles(Side::Left);
        engine
            .apply_adjustment(ScoreAdjustment {
                left_score: 2,
                right_score: 2,
                serving_team: Side::Left,
                display_server: ServerNumber::One,
                active_server: Some(ServerNumber::Two),
            })
            .unwrap();

        engine.apply_touch(Side::Left);
        assert_eq!(engine.state().serving.active_server, Some(ServerNumber::Two));

        engine.apply_touch(Side::Right);
        assert_eq!(engine.state().serving.active_server, None);
    }

    #[test]
    fn t17_undo_restores_previous_state_exactly() {
        let mut engine = doubles(Side::Right);
        engine.apply_touch(Side::Right);
        let before = engine.state().clone();
        let len_before = engine.history_len();

        engine.apply_touch(Side::Left);
        assert_eq!(engine.history_len(), len_before + 1);
        assert!(engine.undo());

        assert_eq!(engine.state(), &before);
        assert_eq!(engine.history_len(), len_before);
    }

    #[test]
    fn t18_undo_reopens_completed_game() {
        let mut engine = started("MATCH-003", Side::Left);
        for _ in 0..11 {
            engine.apply_touch(Side::Left);
        }
        assert_eq!(engine.state().game_status, GameStatus::Completed);

        assert!(engine.undo());
        assert_eq!(engine.state().game_status, GameStatus::Active);
        assert_eq!(engine.state().teams.left.score, 10);

        engine.apply_touch(Side::Left);
        assert_eq!(engine.take_events().len(), 2);
    }

    #[test]
    fn t19_reset_returns_to_opening_lineup() {
        let mut engine = doubles(Side::Right);
        let opening = engine.state().clone();
        for side in [Side::Right, Side::Left, Side::Left, Side::Right] {
            engine.apply_touch(side);
        }

        assert!(engine.reset_game());

        assert_eq!(engine.state(), &opening);
        assert_eq!(engine.history_len(), 0);
    }

    #[test]
    fn t20_start_without_loaded_match_fails() {
        let data = DemoMatchSource.load_match("MATCH-001").unwrap();
        let lineup = MatchSetup::new(data).build_lineup().unwrap();

        let mut engine = MatchEngine::default();
        assert_eq!(engine.start(lineup), Err(SetupError::NoMatchLoaded));
    }

    #[test]
    fn t21_starting_configuration_reports_opening_serve_after_play() {
        let mut engine = doubles(Side::Left);
        for side in [Side::Right, Side::Right, Side::Left, Side::Left, Side::Left] {
            engine.apply_touch(side);
        }

        let info = engine.starting_configuration().unwrap();
        assert_eq!(info.starting_server.name, "Lisa Chen");
        assert_eq!(info.starting_receiver.name, "David Brown");
    }

    #[test]
    fn t22_load_match_resets_to_setup() {
        let mut engine = doubles(Side::Left);
        engine.apply_touch(Side::Left);

        let data = DemoMatchSource.load_match("MATCH-001").unwrap();
        engine.load_match(&data);

        let state = engine.state();
        assert_eq!(state.game_status, GameStatus::Setup);
        assert_eq!(state.match_id.as_deref(), Some("MATCH-001"));
        assert_eq!(state.game_mode, GameMode::Singles);
        assert!(state.teams.left.players.is_empty());
        assert_eq!(engine.history_len(), 0);
    }

    #[test]
    fn format_duration_pads_seconds() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0:00");
        assert_eq!(format_duration(Duration::from_secs(754)), "12:34");
    }

    fn assert_invariants(state: &GameState) {
        let serving_score = state.teams[state.serving.team].score;
        assert_eq!(state.serving.side == Side::Right, serving_score % 2 == 0);
        if state.game_mode == GameMode::Doubles {
            for side in [Side::Left, Side::Right] {
                let players = &state.teams[side].players;
                assert_eq!(players.len(), 2);
                assert_ne!(players[0].position, players[1].position);
            }
        }
    }

    proptest! {
        #[test]
        fn scores_only_grow_by_one_per_point(
            touches in prop::collection::vec(any::<bool>(), 0..120),
            doubles_game in any::<bool>(),
        ) {
            let mut engine = if doubles_game { doubles(Side::Left) } else { singles(Side::Left) };
            for left in touches {
                let side = if left { Side::Left } else { Side::Right };
                let before = engine.state().clone();
                let outcome = engine.apply_touch(side);
                let after = engine.state();

                match outcome {
                    RallyOutcome::Point { team, score } => {
                        prop_assert_eq!(after.teams[team].score, before.teams[team].score + 1);
                        prop_assert_eq!(score, after.teams[team].score);
                        prop_assert_eq!(after.teams[team.opposite()].score, before.teams[team.opposite()].score);
                    }
                    _ => {
                        prop_assert_eq!(after.teams.left.score, before.teams.left.score);
                        prop_assert_eq!(after.teams.right.score, before.teams.right.score);
                    }
                }
                assert_invariants(after);
            }
        }

        #[test]
        fn touch_then_undo_round_trips(
            prefix in prop::collection::vec(any::<bool>(), 0..40),
            last in any::<bool>(),
        ) {
            let mut engine = doubles(Side::Right);
            for left in prefix {
                engine.apply_touch(if left { Side::Left } else { Side::Right });
            }
            let before = engine.state().clone();

            let outcome = engine.apply_touch(if last { Side::Left } else { Side::Right });
            prop_assume!(outcome != RallyOutcome::Ignored);
            let len_after_touch = engine.history_len();

            prop_assert!(engine.undo());
            prop_assert_eq!(engine.state(), &before);
            prop_assert_eq!(engine.history_len(), len_after_touch - 1);
        }

        #[test]
        fn history_never_exceeds_limit(touches in prop::collection::vec(any::<bool>(), 21..80)) {
            let mut engine = started("MATCH-002", Side::Left);
            let mut snapshots = Vec::new();
            for left in touches {
                let before = engine.state().clone();
                if engine.apply_touch(if left { Side::Left } else { Side::Right }) != RallyOutcome::Ignored {
                    snapshots.push(before);
                }
                prop_assert!(engine.history_len() <= 20);
            }

            let expected: Vec<GameState> = snapshots.iter().rev().take(engine.history_len()).cloned().collect();
            prop_assert_eq!(engine.history_len(), snapshots.len().min(20));
            for snapshot in expected {
                prop_assert!(engine.undo());
                prop_assert_eq!(engine.state(), &snapshot);
            }
        }
    }
}
