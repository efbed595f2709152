//! One referee's device: load a match, set it up, score it, report it.

use chrono::Utc;
use log::{info, warn};

use crate::config::ScorerConfig;
use crate::error::{SessionError, SetupError};
use crate::game::{MatchEngine, MatchEvent, RallyOutcome, ScoreAdjustment};
use crate::setup::MatchSetup;
use crate::source::MatchSource;
use crate::storage::{KeyValueStore, clear_game_state, restore_game_state, save_game_state};
use crate::submission::{
    DEFAULT_REFEREE_ID, RetryReport, ScoreSubmitter, SubmissionPayload, SubmissionSink,
    SubmissionStatus,
};
use crate::types::{GameResult, Side};

pub struct RefereeSession<Src, Sink, Store> {
    source: Src,
    engine: MatchEngine,
    setup: Option<MatchSetup>,
    submitter: ScoreSubmitter<Store, Sink>,
    referee_id: String,
    last_result: Option<GameResult>,
    last_submission: Option<SubmissionStatus>,
}

impl<Src, Sink, Store> RefereeSession<Src, Sink, Store>
where
    Src: MatchSource,
    Sink: SubmissionSink,
    Store: KeyValueStore,
{
    pub fn new(source: Src, sink: Sink, store: Store, config: &ScorerConfig) -> Self {
        Self {
            source,
            engine: MatchEngine::new(config.game.clone()),
            setup: None,
            submitter: ScoreSubmitter::new(store, sink, config.api.retry_attempts),
            referee_id: DEFAULT_REFEREE_ID.to_string(),
            last_result: None,
            last_submission: None,
        }
    }

    pub fn with_referee(mut self, referee_id: impl Into<String>) -> Self {
        self.referee_id = referee_id.into();
        self
    }

    pub fn referee_id(&self) -> &str {
        &self.referee_id
    }

    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    pub fn setup(&self) -> Option<&MatchSetup> {
        self.setup.as_ref()
    }

    pub fn setup_mut(&mut self) -> Option<&mut MatchSetup> {
        self.setup.as_mut()
    }

    pub fn submitter(&self) -> &ScoreSubmitter<Store, Sink> {
        &self.submitter
    }

    /// Result of the last completed game, kept until the next match is loaded.
    pub fn last_result(&self) -> Option<GameResult> {
        self.last_result
    }

    pub fn last_submission(&self) -> Option<SubmissionStatus> {
        self.last_submission
    }

    /// Fetches a match and opens setup for it. A match still waiting in the
    /// offline queue is refused so it cannot be scored twice.
    pub fn load_match(&mut self, match_id: &str) -> Result<&MatchSetup, SessionError> {
        let id = match_id.trim().to_uppercase();
        if self.submitter.is_queued(&id)? {
            warn!("refusing to load {id}: a result is still queued");
            return Err(SessionError::AlreadyQueued(id));
        }

        let data = self.source.load_match(&id)?;
        self.engine.load_match(&data);
        self.last_result = None;
        self.last_submission = None;
        clear_game_state(self.submitter.store_mut());
        Ok(self.setup.insert(MatchSetup::new(data)))
    }

    pub fn start_game(&mut self) -> Result<(), SessionError> {
        let setup = self.setup.as_ref().ok_or(SetupError::NoMatchLoaded)?;
        let lineup = setup.build_lineup()?;
        self.engine.start(lineup)?;
        Ok(())
    }

    pub fn touch(&mut self, side: Side) -> Result<RallyOutcome, SessionError> {
        let outcome = self.engine.apply_touch(side);
        if outcome != RallyOutcome::Ignored {
            self.after_update()?;
        }
        Ok(outcome)
    }

    pub fn adjust(&mut self, adjustment: ScoreAdjustment) -> Result<(), SessionError> {
        self.engine.apply_adjustment(adjustment)?;
        self.after_update()
    }

    pub fn undo(&mut self) -> Result<bool, SessionError> {
        if !self.engine.undo() {
            return Ok(false);
        }
        self.after_update()?;
        Ok(true)
    }

    pub fn reset_game(&mut self) -> Result<bool, SessionError> {
        if !self.engine.reset_game() {
            return Ok(false);
        }
        self.after_update()?;
        Ok(true)
    }

    /// Drops the current match and returns to match entry.
    pub fn new_game(&mut self) {
        self.engine.clear();
        self.setup = None;
        self.last_result = None;
        self.last_submission = None;
        clear_game_state(self.submitter.store_mut());
    }

    /// Like `new_game`, and forgets the referee. Queued and pending submissions stay.
    pub fn logout(&mut self) {
        info!("referee {} logged out", self.referee_id);
        self.new_game();
        self.referee_id = DEFAULT_REFEREE_ID.to_string();
    }

    /// Saves the live game so it survives a reload.
    pub fn suspend(&mut self) -> Result<(), SessionError> {
        save_game_state(self.submitter.store_mut(), self.engine.state())?;
        Ok(())
    }

    /// Picks up a game saved by `suspend`. Returns `false` when nothing was saved.
    pub fn resume(&mut self) -> Result<bool, SessionError> {
        let Some(state) = restore_game_state(self.submitter.store())? else {
            return Ok(false);
        };
        info!(
            "resuming {} at {}",
            state.match_id.as_deref().unwrap_or("?"),
            crate::court::score_call(&state)
        );
        self.engine.resume(state);
        self.setup = None;
        Ok(true)
    }

    /// Queues the finished game for later instead of sending it now.
    pub fn submit_later(&mut self) -> Result<bool, SessionError> {
        let Some(payload) = self.payload() else {
            return Ok(false);
        };
        self.submitter.queue(payload)?;
        self.last_submission = Some(SubmissionStatus::Queued);
        Ok(true)
    }

    pub fn process_queue(&mut self) -> Result<RetryReport, SessionError> {
        Ok(self.submitter.process_queue()?)
    }

    pub fn retry_pending(&mut self) -> Result<RetryReport, SessionError> {
        Ok(self.submitter.retry_pending()?)
    }

    /// Report for the current game, if it is complete.
    pub fn payload(&self) -> Option<SubmissionPayload> {
        SubmissionPayload::from_engine(&self.engine, &self.referee_id, Utc::now())
    }

    fn after_update(&mut self) -> Result<(), SessionError> {
        if !self.submitter.sink().is_online() {
            self.suspend()?;
        }

        for event in self.engine.take_events() {
            let MatchEvent::GameFinished(result) = event;
            self.last_result = Some(result);
            if let Some(payload) = self.payload() {
                let status = self.submitter.submit_on_game_end(payload)?;
                self.last_submission = Some(status);
            }
        }
        Ok(())
    }
}
