//! JavaScript surface for the scoring UI.

use std::fmt::Display;

use chrono::Utc;
use serde::Serialize;
use serde_wasm_bindgen::Serializer;
use wasm_bindgen::prelude::*;

use crate::config::ScorerConfig;
use crate::court;
use crate::game::{MatchEngine, RallyOutcome, ScoreAdjustment, format_duration};
use crate::setup::MatchSetup;
use crate::source::MatchData;
use crate::submission::SubmissionPayload;
use crate::types::{GameState, GameStatus, ServerNumber, Side};

fn js_error(err: impl Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(|e| js_error(format!("Failed to serialize: {e}")))
}

fn parse_side(value: &str) -> Result<Side, JsValue> {
    Side::parse(value).ok_or_else(|| js_error(format!("unknown side: {value}")))
}

fn parse_server(value: u8) -> Result<ServerNumber, JsValue> {
    ServerNumber::try_from(value).map_err(js_error)
}

#[wasm_bindgen]
pub struct WasmMatchEngine {
    engine: MatchEngine,
    setup: Option<MatchSetup>,
}

#[wasm_bindgen]
impl WasmMatchEngine {
    /// `config_json` may be omitted or partial; missing keys use the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WasmMatchEngine, JsValue> {
        let config = match config_json.as_deref() {
            Some(json) => ScorerConfig::from_json(json).map_err(js_error)?,
            None => ScorerConfig::default(),
        };
        Ok(Self {
            engine: MatchEngine::new(config.game),
            setup: None,
        })
    }

    #[wasm_bindgen(js_name = loadMatch)]
    pub fn load_match(&mut self, match_json: &str) -> Result<(), JsValue> {
        let data = MatchData::from_json(match_json).map_err(js_error)?;
        self.engine.load_match(&data);
        self.setup = Some(MatchSetup::new(data));
        Ok(())
    }

    #[wasm_bindgen(js_name = selectPlayer)]
    pub fn select_player(&mut self, side: &str, name: &str) -> Result<JsValue, JsValue> {
        let side = parse_side(side)?;
        let setup = self.setup_mut()?;
        to_js(&setup.select_player(side, name))
    }

    #[wasm_bindgen(js_name = switchSides)]
    pub fn switch_sides(&mut self) -> Result<(), JsValue> {
        self.setup_mut()?.switch_sides();
        Ok(())
    }

    /// Starts with whatever the setup screen holds.
    pub fn start(&mut self) -> Result<(), JsValue> {
        let lineup = self.setup_mut()?.build_lineup().map_err(js_error)?;
        self.engine.start(lineup).map_err(js_error)
    }

    /// Starts with the default roster-order layout and `serving_team` serving.
    #[wasm_bindgen(js_name = startDefault)]
    pub fn start_default(&mut self, serving_team: &str) -> Result<(), JsValue> {
        let serving_team = parse_side(serving_team)?;
        let setup = self.setup_mut()?;
        let mut fresh = MatchSetup::new(setup.data().clone());
        if setup.assignment() != fresh.assignment() {
            fresh.switch_sides();
        }
        fresh.set_serving_team(serving_team);
        *setup = fresh;
        self.start()
    }

    /// Unknown side strings are ignored like any other out-of-phase touch.
    pub fn touch(&mut self, side: &str) -> Result<JsValue, JsValue> {
        let outcome = match Side::parse(side) {
            Some(side) => self.engine.apply_touch(side),
            None => RallyOutcome::Ignored,
        };
        to_js(&outcome)
    }

    pub fn adjust(
        &mut self,
        left_score: i32,
        right_score: i32,
        serving_team: &str,
        display_server: u8,
        active_server: Option<u8>,
    ) -> Result<(), JsValue> {
        let adjustment = ScoreAdjustment {
            left_score: i64::from(left_score),
            right_score: i64::from(right_score),
            serving_team: parse_side(serving_team)?,
            display_server: parse_server(display_server)?,
            active_server: active_server.map(parse_server).transpose()?,
        };
        self.engine.apply_adjustment(adjustment).map_err(js_error)
    }

    pub fn undo(&mut self) -> bool {
        self.engine.undo()
    }

    pub fn reset(&mut self) -> bool {
        self.engine.reset_game()
    }

    #[wasm_bindgen(js_name = newGame)]
    pub fn new_game(&mut self) {
        self.engine.clear();
        self.setup = None;
    }

    pub fn state(&self) -> Result<JsValue, JsValue> {
        to_js(self.engine.state())
    }

    /// Highlighted server and receiver, or `null` before play.
    pub fn positions(&self) -> Result<JsValue, JsValue> {
        to_js(&self.engine.serve_slots())
    }

    pub fn layout(&self) -> Result<JsValue, JsValue> {
        to_js(&court::court_layout(self.engine.state()))
    }

    #[wasm_bindgen(js_name = scoreCall)]
    pub fn score_call(&self) -> String {
        self.engine.score_call()
    }

    #[wasm_bindgen(js_name = maxScore)]
    pub fn max_score(&self) -> u32 {
        self.engine.max_score()
    }

    #[wasm_bindgen(js_name = isCompleted)]
    pub fn is_completed(&self) -> bool {
        self.engine.state().game_status == GameStatus::Completed
    }

    #[wasm_bindgen(js_name = takeEvents)]
    pub fn take_events(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.engine.take_events())
    }

    #[wasm_bindgen(js_name = gameDuration)]
    pub fn game_duration(&self) -> String {
        format_duration(self.engine.game_duration())
    }

    /// Submission body for the finished game, or `undefined` while it is open.
    #[wasm_bindgen(js_name = payloadJson)]
    pub fn payload_json(&self, referee_id: &str) -> Result<Option<String>, JsValue> {
        SubmissionPayload::from_engine(&self.engine, referee_id, Utc::now())
            .map(|payload| serde_json::to_string(&payload).map_err(js_error))
            .transpose()
    }

    /// Live state as JSON for offline persistence on the JS side.
    #[wasm_bindgen(js_name = exportState)]
    pub fn export_state(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.engine.state()).map_err(js_error)
    }

    #[wasm_bindgen(js_name = importState)]
    pub fn import_state(&mut self, state_json: &str) -> Result<(), JsValue> {
        let state: GameState = serde_json::from_str(state_json).map_err(js_error)?;
        self.engine.resume(state);
        self.setup = None;
        Ok(())
    }
}

impl WasmMatchEngine {
    fn setup_mut(&mut self) -> Result<&mut MatchSetup, JsValue> {
        self.setup
            .as_mut()
            .ok_or_else(|| js_error("no match loaded"))
    }
}
