//! WebAssembly bindings for the Intrigue round engine.
//!
//! This module exposes the engine to JavaScript through wasm-bindgen, for
//! local play where a single browser holds the whole room.

use wasm_bindgen::prelude::*;

use crate::actions::{SubmitNightAction, SubmitVote};
use crate::deadlock::{Signature, WINDOW};
use crate::game::{GameError, GameState, RoleAssignment, RulesConfig};
use crate::player::PlayerId;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn to_js_error(e: GameError) -> JsValue {
    JsValue::from_str(&format!("Action failed: {}", e))
}

fn to_json<T: Serialize>(value: &T, fallback: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| fallback.to_string())
}

/// WASM-exposed game wrapper
#[wasm_bindgen]
pub struct WasmGame {
    state: GameState,
    /// Local signature history, most recent last
    signatures: Vec<Signature>,
    rng: StdRng,
}

#[wasm_bindgen]
impl WasmGame {
    /// Create a new room in the lobby
    #[wasm_bindgen(constructor)]
    pub fn new(room_code: &str) -> WasmGame {
        WasmGame {
            state: GameState::new(room_code, RulesConfig::default()),
            signatures: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Start the game from a JSON array of role assignments
    pub fn start(&mut self, assignments_json: &str) -> Result<(), JsValue> {
        let assignments: Vec<RoleAssignment> = serde_json::from_str(assignments_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid assignments: {}", e)))?;
        self.state.start(assignments).map_err(to_js_error)?;
        self.signatures.clear();
        Ok(())
    }

    #[wasm_bindgen(js_name = submitNightAction)]
    pub fn submit_night_action(&mut self, action_json: &str) -> Result<(), JsValue> {
        let request: SubmitNightAction = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action JSON: {}", e)))?;
        self.state.submit_night_action(request).map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = submitVote)]
    pub fn submit_vote(&mut self, vote_json: &str) -> Result<(), JsValue> {
        let request: SubmitVote = serde_json::from_str(vote_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid vote JSON: {}", e)))?;
        self.state.submit_vote(request).map_err(to_js_error)
    }

    /// Bank today's vote, returns the new bank size
    #[wasm_bindgen(js_name = bankVote)]
    pub fn bank_vote(&mut self, voter: PlayerId) -> Result<u32, JsValue> {
        self.state.bank_vote(voter).map_err(to_js_error)
    }

    /// Resolve the night, returns the night outcome as JSON
    #[wasm_bindgen(js_name = processNight)]
    pub fn process_night(&mut self) -> Result<String, JsValue> {
        let outcome = self.state.process_night().map_err(to_js_error)?;
        Ok(to_json(&outcome, "{}"))
    }

    /// Resolve the day, returns the day report as JSON
    #[wasm_bindgen(js_name = processDay)]
    pub fn process_day(&mut self) -> Result<String, JsValue> {
        let report = self
            .state
            .process_day(&self.signatures, &mut self.rng)
            .map_err(to_js_error)?;
        if let Some(signature) = &report.signature {
            self.signatures.push(signature.clone());
            let excess = self.signatures.len().saturating_sub(WINDOW);
            self.signatures.drain(..excess);
        }
        Ok(to_json(&report, "{}"))
    }

    #[wasm_bindgen(js_name = breakTie)]
    pub fn break_tie(&mut self, guardian: PlayerId, target: PlayerId) -> Result<String, JsValue> {
        let report = self.state.break_tie(guardian, target).map_err(to_js_error)?;
        Ok(to_json(&report, "{}"))
    }

    /// Tied candidates as a JSON array, or null when no tie-break is pending
    #[wasm_bindgen(js_name = getTieCandidates)]
    pub fn get_tie_candidates(&self) -> String {
        to_json(&self.state.tie_candidates(), "null")
    }

    /// Log entries visible to a player as JSON
    #[wasm_bindgen(js_name = getLogsFor)]
    pub fn get_logs_for(&self, viewer: PlayerId) -> String {
        to_json(&self.state.logs_for(viewer), "[]")
    }

    /// Get the current game state as JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        to_json(&self.state, "{}")
    }

    /// Get the current phase as JSON
    #[wasm_bindgen(js_name = getPhase)]
    pub fn get_phase(&self) -> String {
        to_json(&self.state.phase, "\"Unknown\"")
    }

    #[wasm_bindgen(js_name = isFinished)]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Get the winner's id (if the game has one)
    #[wasm_bindgen(js_name = getWinner)]
    pub fn get_winner(&self) -> Option<PlayerId> {
        self.state.winner().map(|v| v.winner)
    }
}
