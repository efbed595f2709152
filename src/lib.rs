use wasm_bindgen::prelude::*;

pub mod config;
pub mod court;
pub mod error;
pub mod game;
pub mod history;
pub mod session;
pub mod setup;
pub mod source;
pub mod storage;
pub mod submission;
pub mod transport;
pub mod types;
pub mod wasm;

pub use config::{ApiConfig, GameConfig, ScorerConfig};
pub use game::{MatchEngine, MatchEvent, RallyOutcome, ScoreAdjustment};
pub use session::RefereeSession;
pub use types::{GameMode, GameState, GameStatus, ServerNumber, Side};

#[wasm_bindgen]
pub fn wasm_ready() -> bool {
    true
}
